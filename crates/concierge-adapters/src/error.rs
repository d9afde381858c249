//! Adapter error types.
//!
//! Every failure inside the adapters crate is an [`AdapterError`].  The
//! public tool operations never let one escape to the calling host; they
//! collapse it into a display string at the boundary.  The variants exist
//! so the boundary can tell failure kinds apart without inspecting opaque
//! strings -- an SMTP credential rejection reads differently to the user
//! than a dead socket.

/// Unified error type for Concierge adapters.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    /// An I/O operation failed within the adapter.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The requested tool does not exist on this adapter.
    #[error("tool not found: `{tool_name}` on adapter `{adapter_id}`")]
    ToolNotFound {
        adapter_id: String,
        tool_name: String,
    },

    /// The parameters supplied to a tool are invalid.
    #[error("invalid parameters for tool `{tool_name}`: {reason}")]
    InvalidParams { tool_name: String, reason: String },

    /// A tool invocation failed in transit (connect, TLS, read, write).
    #[error("execution failed for tool `{tool_name}`: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    /// The upstream HTTP service answered with a non-success status.
    #[error("tool `{tool_name}` received upstream status {status}")]
    UpstreamStatus { tool_name: String, status: u16 },

    /// The SMTP server rejected our credentials during the AUTH exchange.
    #[error("smtp authentication failed: {reason}")]
    AuthenticationFailed { reason: String },

    /// The SMTP server answered a command with an unexpected status code.
    #[error("smtp protocol error (status {status}): {reason}")]
    Protocol { status: u16, reason: String },

    /// JSON serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An operation exceeded its time limit.
    #[error("timeout after {seconds}s: {reason}")]
    Timeout { seconds: u64, reason: String },

    /// Required configuration is missing or malformed.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Convenience alias used throughout the adapters crate.
pub type Result<T> = std::result::Result<T, AdapterError>;
