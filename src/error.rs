//! Error types for chat-sieve.

use std::time::Duration;

/// Configuration-related errors.
///
/// Relevance analysis raises these instead of guessing, so the user gets an
/// explicit diagnostic in the command chat.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("No interests configured. Use !set interests=<topic>, <topic> to add some.")]
    MissingInterests,

    #[error("No relevance providers configured. Set PERPLEXITY_API_KEY or OPENAI_API_KEY and restart.")]
    NoProviders,

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Relevance provider errors. Absorbed by the orchestrator's fallback.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Provider {provider} returned HTTP {status}: {body}")]
    Http {
        provider: String,
        status: u16,
        body: String,
    },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Provider {provider} timed out after {timeout:?}")]
    Timeout { provider: String, timeout: Duration },
}

/// Settings file errors. Logged; processing continues on in-memory state.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Settings file {path} is not valid JSON: {source}")]
    Corrupt {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Unexpected replies during the group wizard. The session survives these.
#[derive(Debug, thiserror::Error)]
pub enum WizardError {
    #[error("No group setup in progress. Send !set groups to start.")]
    NoSession,

    #[error("Unknown list type \"{0}\". Reply !set groups 1 (inclusion) or !set groups 2 (exclusion).")]
    UnknownMode(String),

    #[error("No valid group numbers in \"{input}\". Pick numbers between 1 and {max}, separated by commas.")]
    NoValidSelection { input: String, max: usize },

    #[error("No group chats found to choose from.")]
    NoGroups,
}

/// Messaging collaborator errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Failed to send message to {chat_id}: {reason}")]
    SendFailed { chat_id: String, reason: String },

    #[error("Lookup failed for {id}: {reason}")]
    LookupFailed { id: String, reason: String },

    #[error("Invalid event: {0}")]
    InvalidEvent(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
