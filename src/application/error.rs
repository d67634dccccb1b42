use thiserror::Error;

use crate::domain::ValidationError;
use crate::storage::StoreError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("No group found. Create one first with `paytogether group create`")]
    GroupNotFound,

    #[error("Participant not found: {0}")]
    ParticipantNotFound(String),

    #[error("Participant already exists: {0}")]
    ParticipantAlreadyExists(String),

    #[error("Cannot remove {name} as they have associated expenses ({count})")]
    HasExpenses { name: String, count: usize },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NoGroup => AppError::GroupNotFound,
            StoreError::ParticipantNotFound(name) => AppError::ParticipantNotFound(name),
            StoreError::HasExpenses { name, count } => AppError::HasExpenses { name, count },
            StoreError::Invalid(err) => AppError::Validation(err),
            StoreError::Backend(err) => AppError::Database(err),
        }
    }
}
