use sewa_core::WorkflowError;
use sewa_persistence::PersistenceError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error(transparent)]
    Workflow(#[from] WorkflowError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error("output error: {0}")]
    Output(#[from] serde_json::Error),
}

impl CliError {
    /// 2 uso, 4 rechazado, 5 backend.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Usage(_) => 2,
            CliError::Workflow(WorkflowError::NotFound { .. }) | CliError::Workflow(WorkflowError::Validation(_)) => 4,
            CliError::Workflow(WorkflowError::Store(_)) | CliError::Persistence(_) | CliError::Output(_) => 5,
        }
    }
}

pub type CliResult<T> = Result<T, CliError>;
