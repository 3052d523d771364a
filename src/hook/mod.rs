//! The hook lifecycle engine: subprocess IPC, named dispatch, and the
//! recover-cascade failure policy.

pub mod caller;
pub mod ipc;
pub mod output;

pub use caller::{HookCaller, HookKind};
pub use output::HookOutput;
