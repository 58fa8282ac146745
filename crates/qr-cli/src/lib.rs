//! Terminal interface for the query router

mod commands;
mod render;
mod ui;


pub use commands::CliCommand;
pub use render::{format_history, format_plan, format_result, format_stats};
pub use ui::{display_banner, handle_input_with_history, print_help};

// Re-export core types
pub use qr_core::{Error, Result};
