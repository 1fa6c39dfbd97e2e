//! Hookwarden - policy hook for AI coding assistants.
//!
//! Invoked before and after the assistant edits files or runs shell
//! commands. Rule checkers scan the text about to be written, tool checkers
//! inspect the action itself, and the engine folds their violations into a
//! single allow/warn/block decision.

pub mod cancel;
pub mod config;
pub mod decision;
pub mod engine;
pub mod exceptions;
pub mod input;
pub mod logging;
pub mod matcher;
pub mod output;
pub mod rules;
pub mod snapshot;
pub mod tools;

pub use cancel::CancelToken;
pub use config::Config;
pub use decision::{Action, Decision, Severity, Violation};
pub use engine::{Engine, EngineError};
pub use input::{HookInput, ToolInvocationEvent};
pub use logging::Logger;
