use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("{0}")]
    ValidationError(String),
    #[error("stage fuera de rango: {0} (esperado 1..=6)")]
    InvalidStage(i32),
    #[error("estado desconocido para {kind}: {value}")]
    UnknownStatus { kind: &'static str, value: String },
}
