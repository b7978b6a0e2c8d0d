use thiserror::Error;

/// Application-wide error type - single point of truth
#[derive(Error, Debug)]
pub enum AppError {
    /// Checkpoint database operations
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Bitcoin RPC operations
    #[error("RPC error: {0}")]
    Rpc(#[from] RpcError),

    /// Custody core operations
    #[error("Custody error: {0}")]
    Custody(#[from] CustodyError),

    /// File I/O operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration issues
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation/parsing
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Checkpoint errors
    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    /// Background worker errors
    #[error("Worker error: {0}")]
    Worker(String),
}

/// RPC error types
#[derive(Error, Debug)]
pub enum RpcError {
    /// Failed to establish connection to Bitcoin Core RPC server
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// RPC method call failed (covers network errors, authentication, etc.)
    #[error("RPC call failed: {method} - {message}")]
    CallFailed { method: String, message: String },

    /// Failed to deserialise RPC response data
    #[error("Deserialisation failed: {0}")]
    DeserialisationFailed(String),

    /// RPC request timed out
    #[error("Request timeout: {timeout_seconds}s for {operation}")]
    Timeout {
        timeout_seconds: u64,
        operation: String,
    },

    /// RPC returned unexpected or malformed response data
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Which external trust domain a transport failure came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportSource {
    Ledger,
    BitcoinNode,
}

impl std::fmt::Display for TransportSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportSource::Ledger => write!(f, "ledger"),
            TransportSource::BitcoinNode => write!(f, "bitcoin node"),
        }
    }
}

/// Failure kinds of the custody core.
///
/// Callers match on the variant to pick a reaction: transport failures are
/// retried on the caller's own schedule, decode failures need an operator,
/// and rejected membership updates leave the previous signatory set active.
/// Chain reorganisations are not errors; they show up as reverted outputs in
/// [`crate::tracker::RefreshReport`].
#[derive(Error, Debug)]
pub enum CustodyError {
    /// Ledger or Bitcoin node unreachable
    #[error("Transport failure ({source_kind}): {message}")]
    Transport {
        source_kind: TransportSource,
        message: String,
    },

    /// Malformed address info or membership event payload
    #[error("Decode failure for '{key}': {reason}")]
    Decode { key: String, reason: String },

    /// Resulting signatory set fails validity constraints
    #[error("Invalid membership update at block {block}: {reason}")]
    InvalidMembershipUpdate { block: u64, reason: String },
}

impl CustodyError {
    pub fn ledger(message: impl Into<String>) -> Self {
        CustodyError::Transport {
            source_kind: TransportSource::Ledger,
            message: message.into(),
        }
    }

    pub fn node(message: impl Into<String>) -> Self {
        CustodyError::Transport {
            source_kind: TransportSource::BitcoinNode,
            message: message.into(),
        }
    }

    pub fn decode(key: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        CustodyError::Decode {
            key: key.into(),
            reason: reason.to_string(),
        }
    }

    /// True for failures worth retrying on the next scheduled cycle
    pub fn is_transient(&self) -> bool {
        matches!(self, CustodyError::Transport { .. })
    }
}

impl From<RpcError> for CustodyError {
    fn from(err: RpcError) -> Self {
        CustodyError::node(err.to_string())
    }
}

/// Application-wide result type - single point of truth
pub type AppResult<T> = Result<T, AppError>;

/// Result type for RPC operations
pub type RpcResult<T> = Result<T, RpcError>;

/// Result type for custody core operations
pub type CustodyResult<T> = Result<T, CustodyError>;

// Additional From implementations for common error types
impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidData(format!("JSON error: {}", err))
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}
