// application.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Rejected,
    DropRequested,
    Dropped,
}

impl ApplicationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::DropRequested => "drop_requested",
            ApplicationStatus::Dropped => "dropped",
        }
    }
}

impl FromStr for ApplicationStatus {
    type Err = DomainError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ApplicationStatus::Pending),
            "approved" => Ok(ApplicationStatus::Approved),
            "rejected" => Ok(ApplicationStatus::Rejected),
            "drop_requested" => Ok(ApplicationStatus::DropRequested),
            "dropped" => Ok(ApplicationStatus::Dropped),
            other => Err(DomainError::UnknownStatus { kind: "application",
                                                      value: other.to_string() }),
        }
    }
}

/// Solicitud de un sewadar para participar en un programa.
///
/// Máquina de estados:
/// `Pending → Approved | Rejected`, `Approved → DropRequested`,
/// `DropRequested → Dropped | Approved`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramApplication {
    pub id: Uuid,
    pub program_id: Uuid,
    pub sewadar_id: Uuid,
    pub status: ApplicationStatus,
    pub applied_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProgramApplication {
    pub fn new(program_id: Uuid, sewadar_id: Uuid) -> Self {
        let now = Utc::now();
        Self { id: Uuid::new_v4(),
               program_id,
               sewadar_id,
               status: ApplicationStatus::Pending,
               applied_at: now,
               updated_at: now }
    }

    /// Aplica una transición de estado validando que esté permitida.
    pub fn transition(&mut self, to: ApplicationStatus) -> Result<(), DomainError> {
        use ApplicationStatus::*;
        let allowed = matches!((self.status, to),
                               (Pending, Approved)
                               | (Pending, Rejected)
                               | (Approved, DropRequested)
                               | (DropRequested, Dropped)
                               | (DropRequested, Approved));
        if !allowed {
            return Err(DomainError::ValidationError(format!("Transición inválida de solicitud: {} -> {}",
                                                            self.status.as_str(),
                                                            to.as_str())));
        }
        self.status = to;
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// Envío de detalles de un participante aprobado (formulario liberado en la
/// etapa 3→4). El contenido es opaco para el motor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailsSubmission {
    pub id: Uuid,
    pub program_id: Uuid,
    pub sewadar_id: Uuid,
    pub details: serde_json::Value,
    pub submitted_at: DateTime<Utc>,
}

impl DetailsSubmission {
    pub fn new(program_id: Uuid, sewadar_id: Uuid, details: serde_json::Value) -> Self {
        Self { id: Uuid::new_v4(),
               program_id,
               sewadar_id,
               details,
               submitted_at: Utc::now() }
    }
}
