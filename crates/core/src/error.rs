use crate::types::JobId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: JobId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Execution failed: {0}")]
    Execution(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Shorthand for the "unknown job id" case shared by every lookup.
    pub fn job_not_found(id: JobId) -> Self {
        CoreError::NotFound { entity: "Job", id }
    }
}
