pub mod kv_store;

pub use kv_store::{validate_key, KeyValueStore, StoreError};
