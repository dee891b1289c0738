/// Errors raised by a cache backend.
///
/// These never leave [`BestEffortCache`](crate::BestEffortCache); they exist
/// so backends can report what went wrong before it is logged and discarded.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Could not obtain a connection.
    #[error("Cache connection error: {0}")]
    Connection(String),

    /// The backend rejected or failed a command.
    #[error("Cache command error: {0}")]
    Command(#[from] redis::RedisError),

    /// A stored value could not be encoded or decoded.
    #[error("Cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CacheError {
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }
}

impl From<deadpool_redis::PoolError> for CacheError {
    fn from(err: deadpool_redis::PoolError) -> Self {
        Self::connection(err.to_string())
    }
}
