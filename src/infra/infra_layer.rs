// The infra module contains implementations of core traits.
// Each external service gets its own submodule.

#[path = "ai/mod.rs"]
pub mod ai;

#[path = "canvas/mod.rs"]
pub mod canvas;

#[path = "google/mod.rs"]
pub mod google;

#[path = "store/mod.rs"]
pub mod store;

#[path = "upstream.rs"]
pub mod upstream;
