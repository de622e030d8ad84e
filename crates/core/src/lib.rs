//! # agentbridge core
//!
//! Domain types, traits, and error definitions for the agentbridge
//! orchestration runtime. This crate has **no framework dependencies**: it
//! defines the domain model that every other crate implements against.
//!
//! ## Design Philosophy
//!
//! Both external collaborators of the orchestration loop are traits here:
//! - [`Provider`]: the language-model backend
//! - [`ActionProvider`]: the system exposing callable tools and readable resources
//!
//! Implementations live in their respective crates (`agentbridge-providers`,
//! `agentbridge-mcp`), so the loop can be tested against scripted stand-ins.

pub mod action;
pub mod error;
pub mod event;
pub mod message;
pub mod provider;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use action::{
    ActionProvider, ActionRequest, ActionResult, ParamSpec, RawResource, RawTool, ResourceSpec,
    ToolSpec,
};
pub use error::{ActionError, ConnectionError, Error, ProviderError, Result, ToolError};
pub use event::{DomainEvent, EventBus};
pub use message::{Conversation, ConversationId, Message, MessageToolCall, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse, ToolChoice, ToolDefinition};
pub use tool::{Resource, ResourceRegistry, Tool, ToolRegistry};
