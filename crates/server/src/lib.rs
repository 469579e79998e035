#![forbid(unsafe_code)]

pub mod api;

pub use api::{AppState, create_router};
