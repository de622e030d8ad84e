//! The orchestration loop: lets a language model drive tools and resources
//! exposed by an [`ActionProvider`](agentbridge_core::action::ActionProvider).
//!
//! Each request follows the same cycle:
//!
//! 1. **Catalog** the provider's tools (and resources) into an action menu
//! 2. **Seed** the conversation with the system message and the prompt
//! 3. **Ask** the model backend with the full transcript and the menu
//! 4. **If a resource trigger or tool calls**: dispatch them, append the
//!    results, and go back to step 3
//! 5. **If plain text**: that is the final answer
//!
//! The loop stops at the iteration budget and falls back to the last
//! assistant text the model produced.

pub mod catalog;
pub mod conversation;
pub mod dispatcher;
pub mod fallback;
pub mod loop_runner;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use catalog::{Catalog, build_catalog};
pub use conversation::{ResourceTrigger, normalize_resource_uri};
pub use dispatcher::{Dispatched, Dispatcher, ResourceReadRecord, ToolCallRecord};
pub use fallback::EXHAUSTED_SENTINEL;
pub use loop_runner::{AgentLoop, AgentOutcome, AgentRequest};
