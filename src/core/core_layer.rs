// The core module contains all business logic.
// Each feature gets its own submodule; the traits they depend on are
// implemented in `infra`.

#[path = "ai/mod.rs"]
pub mod ai;

#[path = "auth/mod.rs"]
pub mod auth;

#[path = "canvas/mod.rs"]
pub mod canvas;

#[path = "chat/mod.rs"]
pub mod chat;

#[path = "clock.rs"]
pub mod clock;

#[path = "errors.rs"]
pub mod errors;

#[path = "store/mod.rs"]
pub mod store;

#[path = "tools/mod.rs"]
pub mod tools;

#[path = "workspace/mod.rs"]
pub mod workspace;
