use ordinal_core::{CoreError, ItemKey};
use ordinal_storage::StorageError;
use thiserror::Error;

/// Errors surfaced to callers of [`ItemService`](crate::ItemService).
///
/// Only `NotFound` and `Validation` are distinct domain outcomes. Every other
/// store failure is `Store`. Cache and relay failures never appear here.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("item {id} not found in scope {scope}")]
    NotFound { id: i64, scope: i64 },

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Store(StorageError),
}

impl ServiceError {
    pub fn not_found(key: ItemKey) -> Self {
        Self::NotFound {
            id: key.id,
            scope: key.scope,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound { id, scope } => Self::NotFound { id, scope },
            StorageError::InvalidItem { message } => Self::Validation(message),
            other => Self::Store(other),
        }
    }
}

impl From<CoreError> for ServiceError {
    fn from(err: CoreError) -> Self {
        Self::Validation(err.to_string())
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_errors_collapse_to_three_outcomes() {
        assert!(ServiceError::from(StorageError::not_found(ItemKey::new(1, 2))).is_not_found());
        assert!(ServiceError::from(StorageError::invalid_item("bad")).is_validation());
        assert!(matches!(
            ServiceError::from(StorageError::connection_error("refused")),
            ServiceError::Store(_)
        ));
        assert_eq!(
            ServiceError::from(CoreError::EmptyName).to_string(),
            "Name cannot be empty"
        );
    }
}
