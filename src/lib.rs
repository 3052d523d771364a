//! evolve: a self-modifying agent plugin.
//!
//! Sits between an LLM chat host and a user-controlled hook subprocess.
//! For each session the plugin synthesizes and freezes a system prompt by
//! calling the hook, observes assistant turns (and may force
//! continuation), ticks a heartbeat that injects synthetic prompts into a
//! background session, exposes tools that let the agent rewrite the hook
//! script itself behind sandbox-validated test runs, and propagates
//! notifications across concurrent sessions through the FIFO-correlated
//! `messages-transform` / `system-transform` callback pair.
//!
//! The chat host is an external collaborator behind the [`host::Host`]
//! trait; the hook is an executable under `<workspace>/hooks/` speaking
//! JSON on stdin and newline-delimited JSON on stdout.

pub mod actions;
pub mod config;
pub mod error;
pub mod heartbeat;
pub mod hook;
pub mod host;
pub mod logging;
pub mod plugin;
pub mod sandbox;
pub mod snapshot;
pub mod state;
pub mod tools;
pub mod util;

pub use config::Config;
pub use error::{Error, Result};
pub use heartbeat::spawn_heartbeat;
pub use plugin::{Plugin, AGENT_MARKER};
