// program.rs
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::DomainError;

/// Estado de publicación del programa. `Active` es el marcador que dispara el
/// avance automático 1→2 del workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProgramStatus {
    Draft,
    Active,
    Closed,
}

impl ProgramStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ProgramStatus::Draft => "draft",
            ProgramStatus::Active => "active",
            ProgramStatus::Closed => "closed",
        }
    }
}

impl FromStr for ProgramStatus {
    type Err = DomainError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(ProgramStatus::Draft),
            "active" => Ok(ProgramStatus::Active),
            "closed" => Ok(ProgramStatus::Closed),
            other => Err(DomainError::UnknownStatus { kind: "program",
                                                      value: other.to_string() }),
        }
    }
}

/// Categoría de ubicación: la ubicación designada (primaria) frente a todas
/// las demás.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LocationCategory {
    Primary,
    Other,
}

impl LocationCategory {
    /// Clasifica una ubicación de texto libre comparándola (sin distinguir
    /// mayúsculas, ignorando espacios exteriores) con el token primario.
    pub fn classify(location: &str, primary_token: &str) -> Self {
        if location.trim().eq_ignore_ascii_case(primary_token.trim()) {
            LocationCategory::Primary
        } else {
            LocationCategory::Other
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    pub id: Uuid,
    pub title: String,
    pub location: String,
    pub status: ProgramStatus,
    /// Cupo máximo de participantes; `None` = sin límite.
    pub capacity_limit: Option<u32>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Program {
    /// Crea un programa en borrador validando título y cupo.
    pub fn new(title: impl Into<String>,
               location: impl Into<String>,
               capacity_limit: Option<u32>,
               created_by: Uuid)
               -> Result<Self, DomainError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(DomainError::ValidationError("El título del programa no puede estar vacío".to_string()));
        }
        if capacity_limit == Some(0) {
            return Err(DomainError::ValidationError("El cupo del programa debe ser mayor que cero".to_string()));
        }
        Ok(Program { id: Uuid::new_v4(),
                     title,
                     location: location.into(),
                     status: ProgramStatus::Draft,
                     capacity_limit,
                     created_by,
                     created_at: Utc::now() })
    }

    pub fn category(&self, primary_token: &str) -> LocationCategory {
        LocationCategory::classify(&self.location, primary_token)
    }

    pub fn is_active(&self) -> bool {
        self.status == ProgramStatus::Active
    }
}

/// Fecha calendario perteneciente a un programa.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramDate {
    pub id: Uuid,
    pub program_id: Uuid,
    pub date: NaiveDate,
}

impl ProgramDate {
    pub fn new(program_id: Uuid, date: NaiveDate) -> Self {
        Self { id: Uuid::new_v4(),
               program_id,
               date }
    }
}
