//! The autonomous agent loop and world-state projector.
//!
//! `AgentLoop::run` drives one instruction to completion: it streams
//! model turns through a provider, dispatches requested tool calls in
//! order, folds results back into the conversation, projects them onto
//! the world state, and emits live events until a final `Done`.

pub mod loop_runner;
pub mod projector;
pub mod run_event;

pub use loop_runner::{AgentLoop, RunSummary};
pub use run_event::RunEvent;
