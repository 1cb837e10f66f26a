//! # Loomweave Core
//!
//! Domain types, traits, and error definitions for the loomweave agent
//! runtime. This crate carries no transport or provider dependencies — it
//! defines the domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every subsystem is defined as a trait here. Implementations live in their
//! respective crates. This enables:
//! - Swapping streaming providers via configuration
//! - Easy testing with mock/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod error;
pub mod graph;
pub mod message;
pub mod provider;
pub mod run;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{Error, ProviderError, Result, ToolError};
pub use graph::{
    EdgeRecord, GraphRecord, GroupRecord, NodeInstance, NodePrototype, WorldStateProjection,
};
pub use message::{Conversation, Message, Role};
pub use provider::{
    ModelEvent, Provider, ToolCallRequest, ToolDefinition, TurnRequest, sentinel_arguments,
};
pub use run::RunConfig;
pub use tool::{EffectStarter, GraphTool, ToolOutcome, ToolRegistry, noop_effect_starter};
