pub mod file_store;
pub mod in_memory;
pub mod sqlite_store;

pub use file_store::FileStore;
pub use in_memory::InMemoryStore;
pub use sqlite_store::SqliteStore;
