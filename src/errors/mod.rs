/// Error taxonomy for the gateway
///
/// Provider, queue, cache and ledger failures each have their own enum;
/// `GatewayError` is what domain query functions fold into their envelope.
use thiserror::Error;

// =============================================================================
// DISPATCH QUEUE
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    #[error("{provider} queue is full ({depth} pending)")]
    QueueFull { provider: String, depth: usize },

    #[error("{0} queue is closed")]
    Closed(String),

    #[error("no dispatch queue registered for provider '{0}'")]
    UnknownProvider(String),

    #[error("{provider} call timed out after {timeout_ms}ms")]
    Timeout { provider: String, timeout_ms: u64 },

    /// The task was drained or aborted before producing a result
    #[error("{0} task was cancelled before completing")]
    Cancelled(String),
}

// =============================================================================
// PROVIDERS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProviderError {
    #[error("{provider} network error: {message}")]
    Network { provider: String, message: String },

    #[error("{provider} returned HTTP {status}: {message}")]
    Status {
        provider: String,
        status: u16,
        message: String,
    },

    #[error("{provider} payload could not be decoded: {message}")]
    Decode { provider: String, message: String },

    #[error("{0} is disabled via configuration")]
    Disabled(String),

    #[error(transparent)]
    Queue(#[from] QueueError),
}

impl ProviderError {
    /// HTTP status for `Status` errors
    pub fn status(&self) -> Option<u16> {
        match self {
            ProviderError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ProviderError::Queue(QueueError::Timeout { .. }))
    }
}

// =============================================================================
// CACHE
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    /// Backing store unreachable; callers treat this as a miss
    #[error("cache unavailable: {0}")]
    Unavailable(String),

    #[error("cache value could not be (de)serialized: {0}")]
    Serialization(String),
}

// =============================================================================
// VOTE LEDGER
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VoteError {
    #[error("{voter_key} already voted for {subject_id} on {day}")]
    AlreadyVoted {
        subject_id: String,
        voter_key: String,
        day: String,
    },

    #[error("invalid vote input: {0}")]
    InvalidInput(String),

    #[error("vote storage error: {0}")]
    Storage(String),
}

impl From<rusqlite::Error> for VoteError {
    fn from(err: rusqlite::Error) -> Self {
        VoteError::Storage(err.to_string())
    }
}

// =============================================================================
// GATEWAY
// =============================================================================

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Vote(#[from] VoteError),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl From<QueueError> for GatewayError {
    fn from(err: QueueError) -> Self {
        GatewayError::Provider(ProviderError::Queue(err))
    }
}

impl GatewayError {
    pub fn is_already_voted(&self) -> bool {
        matches!(self, GatewayError::Vote(VoteError::AlreadyVoted { .. }))
    }
}
