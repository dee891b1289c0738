use thiserror::Error;

/// Core error types for item validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Name cannot be empty")]
    EmptyName,

    #[error("Invalid priority {priority}: must be between 1 and {max}")]
    PriorityOutOfRange { priority: i64, max: i64 },

    #[error("Invalid item data: {message}")]
    InvalidItem { message: String },
}

impl CoreError {
    /// Create a new PriorityOutOfRange error
    pub fn priority_out_of_range(priority: i64, max: i64) -> Self {
        Self::PriorityOutOfRange { priority, max }
    }

    /// Create a new InvalidItem error
    pub fn invalid_item(message: impl Into<String>) -> Self {
        Self::InvalidItem {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
