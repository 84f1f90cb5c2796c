//! HTTP API
//!
//! `POST /chat` drives a session; the session routes are read-only.

mod handlers;
mod types;

pub use handlers::create_router;

use crate::runtime::ProductionEngine;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ProductionEngine>,
}

impl AppState {
    pub fn new(engine: ProductionEngine) -> Self {
        Self {
            engine: Arc::new(engine),
        }
    }
}
