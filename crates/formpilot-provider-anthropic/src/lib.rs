//! # Formpilot Anthropic Provider
//!
//! Implements the completion and vision collaborator traits against the
//! Anthropic Messages API.

mod api;
mod provider;

pub use provider::AnthropicProvider;
