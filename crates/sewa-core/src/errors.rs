//! Errores del core.
//!
//! - `StoreError`: fallas de la capa de almacenamiento (cualquier backend).
//! - `ValidationFailure`: rechazos visibles para el usuario, con detalle
//!   suficiente para identificar a las entidades culpables.
//! - `WorkflowError`: error público de todas las operaciones del motor.
//!
//! Las transiciones pedidas fuera de su etapa de origen NO son errores: el
//! motor devuelve el estado sin cambios. Las fallas de entrega de
//! notificaciones tampoco llegan aquí (se registran y se descartan).

use sewa_domain::DomainError;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("store unavailable (retryable): {0}")]
    Unavailable(String),
    #[error("corrupt row: {0}")]
    Corrupt(String),
    #[error("store error: {0}")]
    Backend(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationFailure {
    #[error("caller {account_id} lacks the incharge capability")]
    MissingCapability { account_id: Uuid },
    #[error("capacity exceeded: {active} active + {requested} requested > limit {limit}")]
    CapacityExceeded { limit: u32, active: u32, requested: u32 },
    #[error("approved participants without details submission: {participants:?}")]
    MissingSubmissions { participants: Vec<Uuid> },
    #[error("invalid state: {0}")]
    InvalidState(String),
    #[error("duplicate: {0}")]
    Duplicate(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: Uuid },
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationFailure),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl WorkflowError {
    pub fn not_found(entity: &'static str, id: Uuid) -> Self {
        WorkflowError::NotFound { entity, id }
    }

    /// Participantes que bloquean una transición, si el error es de envíos
    /// faltantes.
    pub fn missing_participants(&self) -> Option<&[Uuid]> {
        match self {
            WorkflowError::Validation(ValidationFailure::MissingSubmissions { participants }) => Some(participants),
            _ => None,
        }
    }
}

impl From<DomainError> for WorkflowError {
    fn from(e: DomainError) -> Self {
        WorkflowError::Validation(ValidationFailure::InvalidState(e.to_string()))
    }
}
