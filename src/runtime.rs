//! Runtime for executing sessions
//!
//! The engine owns the effect loop; the steps and the store sit behind
//! traits so tests can swap them for mocks.

mod engine;
mod error;
mod memory;
mod reasoning;
mod tool_step;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use engine::{WorkflowConfig, WorkflowEngine, WorkflowResponse, REVIEW_PLACEHOLDER};
pub use error::WorkflowError;
pub use memory::MemoryStore;
pub use traits::*;

use crate::llm::LlmService;
use std::sync::Arc;

/// Engine with its collaborators chosen at startup
pub type ProductionEngine =
    WorkflowEngine<Arc<dyn CheckpointStore>, Arc<dyn LlmService>, Arc<dyn ToolExecutor>>;
