//! Tool registry and the built-in self-repair tools.

pub mod builtin;
pub mod registry;

pub use registry::{ToolDefinition, ToolSchema};
