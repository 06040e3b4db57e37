//! Starlight Bank Support Assistant
//!
//! A customer-support chat that:
//! - Answers known questions instantly from a static FAQ table
//! - Delegates everything else to a remote model with account tools
//! - Runs the model's tool calls locally and feeds results back
//! - Attaches balance snapshots to the answer that fetched them
//! - Never surfaces a raw error in the transcript
//!
//! TURN LOOP:
//! INPUT → FAQ? → MODEL ⇄ TOOLS → APPEND

pub mod assistant;
pub mod config;
pub mod controller;
pub mod error;
pub mod faq;
pub mod gemini;
pub mod models;
pub mod shell;
pub mod speech;
pub mod tools;

pub use error::{Result, SupportError};

// Re-export common types
pub use assistant::{AssistantSession, SessionLimits};
pub use config::SupportConfig;
pub use controller::TurnController;
pub use faq::FaqResolver;
pub use models::*;
pub use tools::ToolRegistry;
