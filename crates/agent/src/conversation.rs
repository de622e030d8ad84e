//! Conversation seeding and resource-read trigger detection.

use agentbridge_core::action::ResourceSpec;
use agentbridge_core::error::Error;
use agentbridge_core::message::{Conversation, Message};
use regex_lite::Regex;
use std::fmt::Write as _;

/// Seed a conversation with `[system?, user]`.
pub fn seed_tools_only(prompt: &str, system_message: Option<&str>) -> Conversation {
    let mut conversation = Conversation::new();
    if let Some(system) = system_message.filter(|s| !s.is_empty()) {
        conversation.push(Message::system(system));
    }
    conversation.push(Message::user(prompt));
    conversation
}

/// Seed a conversation whose single system message advertises the
/// resources and the trigger syntax, followed by the user message.
pub fn seed_with_resources(
    prompt: &str,
    system_message: Option<&str>,
    resources: &[ResourceSpec],
    trigger: &ResourceTrigger,
) -> Conversation {
    let mut conversation = Conversation::new();
    conversation.push(Message::system(resource_system_prompt(
        system_message.unwrap_or_default(),
        resources,
        trigger.token(),
    )));
    conversation.push(Message::user(prompt));
    conversation
}

fn resource_system_prompt(base: &str, resources: &[ResourceSpec], token: &str) -> String {
    let mut text = String::from(base);
    if !text.is_empty() {
        text.push_str("\n\n");
    }

    if resources.is_empty() {
        text.push_str("No resources are currently available.\n");
    } else {
        text.push_str("Available resources:\n");
        for (i, resource) in resources.iter().enumerate() {
            let _ = writeln!(text, "{}. {} ({})", i + 1, resource.uri, resource.mime_type);
        }
    }

    let _ = write!(
        text,
        "\nTo read a resource, reply with a single line containing exactly \
         `{token} <uri>` and nothing else, for example:\n{token} {example}\n\
         The resource content will be sent back to you in the next message.",
        example = resources
            .first()
            .map(|r| r.uri.as_str())
            .unwrap_or("data://example/greeting"),
    );
    text
}

/// Prepend `scheme` to a caller-supplied resource path unless it is already
/// present.
pub fn normalize_resource_uri(uri: &str, scheme: &str) -> String {
    let uri = uri.trim();
    if uri.starts_with(scheme) {
        uri.to_string()
    } else {
        format!("{scheme}{}", uri.trim_start_matches('/'))
    }
}

/// Detects the textual resource-read request in model output.
///
/// Matching is line-anchored and permissive: the first line that starts with
/// the token wins, even when other text surrounds it.
#[derive(Debug, Clone)]
pub struct ResourceTrigger {
    token: String,
    pattern: Regex,
}

impl ResourceTrigger {
    pub fn new(token: &str) -> Result<Self, Error> {
        if token.trim().is_empty() {
            return Err(Error::Config {
                message: "resource trigger token must not be empty".into(),
            });
        }
        let pattern = format!(r"(?m)^[ \t]*{}[ \t]*(\S+)", regex_lite::escape(token));
        let pattern = Regex::new(&pattern).map_err(|e| Error::Config {
            message: format!("invalid resource trigger token '{token}': {e}"),
        })?;
        Ok(Self {
            token: token.to_string(),
            pattern,
        })
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// The URI named by the first trigger line, if any.
    pub fn detect(&self, text: &str) -> Option<String> {
        let captures = self.pattern.captures(text)?;
        let uri = captures
            .get(1)?
            .as_str()
            .trim_matches(|c| matches!(c, '`' | '"' | '\'' | '<' | '>'));
        (!uri.is_empty()).then(|| uri.to_string())
    }
}
