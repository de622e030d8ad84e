//! Answer resolution when the iteration budget runs out.

use agentbridge_core::message::{Conversation, Role};

/// Returned when no assistant turn produced any text.
pub const EXHAUSTED_SENTINEL: &str =
    "The agent reached the maximum number of iterations without completing the request.";

/// The most recent non-empty assistant text, or the sentinel.
pub fn resolve(conversation: &Conversation) -> String {
    conversation
        .messages()
        .iter()
        .rev()
        .find(|m| m.role == Role::Assistant && !m.content.trim().is_empty())
        .map(|m| m.content.clone())
        .unwrap_or_else(|| EXHAUSTED_SENTINEL.to_string())
}
