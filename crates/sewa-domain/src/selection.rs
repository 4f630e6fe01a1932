// selection.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionStatus {
    Selected,
    Confirmed,
    Dropped,
    Replaced,
}

impl SelectionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SelectionStatus::Selected => "selected",
            SelectionStatus::Confirmed => "confirmed",
            SelectionStatus::Dropped => "dropped",
            SelectionStatus::Replaced => "replaced",
        }
    }

    /// Toda selección no `Dropped` es activa: cuenta para el cupo y para la
    /// unicidad (programa, sewadar).
    pub fn is_active(self) -> bool {
        self != SelectionStatus::Dropped
    }
}

impl FromStr for SelectionStatus {
    type Err = DomainError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "selected" => Ok(SelectionStatus::Selected),
            "confirmed" => Ok(SelectionStatus::Confirmed),
            "dropped" => Ok(SelectionStatus::Dropped),
            "replaced" => Ok(SelectionStatus::Replaced),
            other => Err(DomainError::UnknownStatus { kind: "selection",
                                                      value: other.to_string() }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramSelection {
    pub id: Uuid,
    pub program_id: Uuid,
    pub sewadar_id: Uuid,
    pub selected_by: Uuid,
    pub status: SelectionStatus,
    pub priority_score: i64,
    pub reason: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProgramSelection {
    pub fn new(program_id: Uuid, sewadar_id: Uuid, selected_by: Uuid, priority_score: i64, reason: impl Into<String>) -> Self {
        let now = Utc::now();
        Self { id: Uuid::new_v4(),
               program_id,
               sewadar_id,
               selected_by,
               status: SelectionStatus::Selected,
               priority_score,
               reason: reason.into(),
               created_at: now,
               updated_at: now }
    }

    /// Sólo `Selected` admite transición (a `Confirmed`, `Dropped` o
    /// `Replaced`); los demás estados son finales.
    pub fn transition(&mut self, to: SelectionStatus) -> Result<(), DomainError> {
        if self.status != SelectionStatus::Selected || to == SelectionStatus::Selected {
            return Err(DomainError::ValidationError(format!("Transición inválida de selección: {} -> {}",
                                                            self.status.as_str(),
                                                            to.as_str())));
        }
        self.status = to;
        self.updated_at = Utc::now();
        Ok(())
    }
}
