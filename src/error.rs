//! Error types for the ContextGraph client and adapters.

use thiserror::Error;

/// Errors returned by the decisions API client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport failure (DNS, connect, timeout, TLS).
    #[error("HTTP request failed: {0}")]
    Transport(#[from] ureq::Error),

    /// The service answered with a non-success status.
    #[error("ContextGraph API returned {code}: {body}")]
    Status { code: u16, body: String },

    /// The response body was not the JSON we expected.
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Missing or invalid adapter configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("ContextGraph API key required. Set CG_API_KEY env var or pass api_key.")]
    MissingApiKey,

    #[error("ContextGraph agent ID required. Set CG_AGENT_ID env var or pass agent_id.")]
    MissingAgentId,

    #[error("ContextGraph crew ID required. Set CG_CREW_ID env var or pass crew_id.")]
    MissingCrewId,
}

/// Returned in place of a tool's output when the gate refused the call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("action '{action}' blocked by ContextGraph: {message}")]
pub struct ActionBlocked {
    pub action: String,
    pub decision_id: Option<String>,
    pub message: String,
}
