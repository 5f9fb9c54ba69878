//! Console text helpers
//!
//! Output meant for the operator (the editor URL banner) goes to stdout; logs
//! go to stderr through `tracing`.

pub mod boxing;
