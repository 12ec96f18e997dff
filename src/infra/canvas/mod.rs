pub mod canvas_client;

pub use canvas_client::{CanvasClient, DEFAULT_CANVAS_URL};
