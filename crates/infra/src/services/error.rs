use thiserror::Error;

use almox_core::DomainError;

use crate::repository::RepositoryError;

/// Error surfaced by the application services.
///
/// Domain and repository failures pass through unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// Publication failed after a successful write; the state change stands.
    #[error("event publication failed: {0}")]
    Publish(String),
}

impl ServiceError {
    pub fn is_invalid_transition(&self) -> bool {
        matches!(self, ServiceError::Domain(err) if err.is_invalid_transition())
    }

    /// Another writer changed the record between load and write.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            ServiceError::Repository(RepositoryError::Conflict { .. })
                | ServiceError::Domain(DomainError::Conflict(_))
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ServiceError::Repository(RepositoryError::NotFound { .. })
                | ServiceError::Domain(DomainError::NotFound)
        )
    }
}
