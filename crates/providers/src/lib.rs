//! Model backend implementations for agentbridge.
//!
//! All providers implement the `agentbridge_core::Provider` trait.
//! [`build_from_config`] selects the backend from the `[model]` section.

pub mod openai_compat;
pub mod router;

pub use openai_compat::OpenAiCompatProvider;
pub use router::{build_from_config, default_base_url};
