//! Chat Sieve: forwards the chat messages that match your interests.

pub mod channels;
pub mod commands;
pub mod config;
pub mod error;
pub mod llm;
pub mod metrics;
pub mod pipeline;
pub mod settings;

#[cfg(test)]
pub(crate) mod test_support;
