//! Query routing engine
//!
//! Classifies each query, maps the intent to an execution plan and runs the
//! plan against the retrieval, generation and vision services, keeping a
//! bounded conversation history per user.

pub mod calculator;
pub mod classifier;
pub mod config;
pub mod history;
pub mod planner;
pub mod prompt;
pub mod router;
pub mod templates;

#[cfg(test)]
mod tests;

pub use calculator::{CalcError, evaluate, format_number};
pub use classifier::{Classification, Intent, IntentClassifier, IntentRule};
pub use config::{RouterConfig, ServiceIds};
pub use history::{ConversationState, ConversationStore};
pub use planner::{Action, ExecutionPlan, GenerationContext, LatencyClass, PlanBuilder, PlanCost, Service, Step};
pub use router::{ExecutionResult, FailureKind, QueryInput, Router, RouterStats, Services};
pub use templates::TemplateKind;

// Re-export core types
pub use qr_core::{ConversationTurn, Error, Result, Role};
