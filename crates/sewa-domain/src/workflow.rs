//! Workflow de un programa: seis etapas fijas y ordenadas, más dos compuertas
//! (`form_released`, `details_collected`) de escritura única.
//!
//! Invariantes que este tipo protege (campos privados, sólo mutables vía
//! métodos):
//! - `current_stage` nunca retrocede.
//! - `form_released` sólo pasa a `true` en la transición 3→4 de
//!   `release_form`; `details_collected` sólo en la 4→5 de
//!   `mark_details_collected`. Ninguna vuelve a `false`.
//!
//! Los métodos de transición son puros: devuelven `Some(etapa_nueva)` cuando
//! hubo cambio y `None` cuando la transición no aplica (no-op silencioso). La
//! validación de precondiciones que requieren datos externos (envíos de
//! detalles) la hace el motor antes de invocarlos.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::DomainError;

/// Etapas del workflow, en orden.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Stage {
    ActivateProgram = 1,
    PostApplicationCall = 2,
    ReleaseForm = 3,
    CollectDetails = 4,
    NotifyAreaSecretary = 5,
    PostGeneralInstructions = 6,
}

impl Stage {
    pub const ALL: [Stage; 6] = [Stage::ActivateProgram,
                                 Stage::PostApplicationCall,
                                 Stage::ReleaseForm,
                                 Stage::CollectDetails,
                                 Stage::NotifyAreaSecretary,
                                 Stage::PostGeneralInstructions];

    pub fn number(self) -> i32 {
        self as i32
    }

    pub fn from_number(n: i32) -> Result<Self, DomainError> {
        Stage::ALL.iter()
                  .copied()
                  .find(|s| s.number() == n)
                  .ok_or(DomainError::InvalidStage(n))
    }

    pub fn name(self) -> &'static str {
        match self {
            Stage::ActivateProgram => "Activate Program",
            Stage::PostApplicationCall => "Post Application Call",
            Stage::ReleaseForm => "Release Form",
            Stage::CollectDetails => "Collect Details",
            Stage::NotifyAreaSecretary => "Notify Area Secretary",
            Stage::PostGeneralInstructions => "Post General Instructions",
        }
    }

    /// Siguiente etapa; `None` en la terminal.
    pub fn next(self) -> Option<Stage> {
        Stage::from_number(self.number() + 1).ok()
    }

    pub fn is_terminal(self) -> bool {
        self == Stage::PostGeneralInstructions
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.number(), self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramWorkflow {
    id: Uuid,
    program_id: Uuid,
    current_stage: Stage,
    form_released: bool,
    details_collected: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ProgramWorkflow {
    /// Workflow recién creado: etapa 1, compuertas cerradas.
    pub fn new(program_id: Uuid) -> Self {
        let now = Utc::now();
        Self { id: Uuid::new_v4(),
               program_id,
               current_stage: Stage::ActivateProgram,
               form_released: false,
               details_collected: false,
               created_at: now,
               updated_at: now }
    }

    /// Reconstruye un workflow persistido (lectura desde la store).
    pub fn restore(id: Uuid,
                   program_id: Uuid,
                   current_stage: Stage,
                   form_released: bool,
                   details_collected: bool,
                   created_at: DateTime<Utc>,
                   updated_at: DateTime<Utc>)
                   -> Self {
        Self { id,
               program_id,
               current_stage,
               form_released,
               details_collected,
               created_at,
               updated_at }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }
    pub fn program_id(&self) -> Uuid {
        self.program_id
    }
    pub fn current_stage(&self) -> Stage {
        self.current_stage
    }
    pub fn form_released(&self) -> bool {
        self.form_released
    }
    pub fn details_collected(&self) -> bool {
        self.details_collected
    }
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn enter(&mut self, stage: Stage) -> Option<Stage> {
        if stage <= self.current_stage {
            return None;
        }
        self.current_stage = stage;
        self.updated_at = Utc::now();
        Some(stage)
    }

    /// Avance manual incondicional; no-op en la etapa terminal.
    pub fn advance(&mut self) -> Option<Stage> {
        let next = self.current_stage.next()?;
        self.enter(next)
    }

    /// 3→4 abriendo la compuerta del formulario.
    pub fn release_form(&mut self) -> Option<Stage> {
        if self.current_stage != Stage::ReleaseForm {
            return None;
        }
        self.form_released = true;
        self.enter(Stage::CollectDetails)
    }

    /// 4→5 marcando los detalles como recolectados. El llamador debe haber
    /// verificado que no faltan envíos.
    pub fn mark_details_collected(&mut self) -> Option<Stage> {
        if self.current_stage != Stage::CollectDetails {
            return None;
        }
        self.details_collected = true;
        self.enter(Stage::NotifyAreaSecretary)
    }

    /// Avance automático a la etapa siguiente a `from`, sólo si el workflow
    /// está exactamente en `from`.
    pub fn auto_advance_from(&mut self, from: Stage) -> Option<Stage> {
        if self.current_stage != from {
            return None;
        }
        self.advance()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_numbers_roundtrip_and_reject_out_of_range() {
        for s in Stage::ALL {
            assert_eq!(Stage::from_number(s.number()).unwrap(), s);
        }
        assert_eq!(Stage::from_number(0), Err(DomainError::InvalidStage(0)));
        assert_eq!(Stage::from_number(7), Err(DomainError::InvalidStage(7)));
    }

    #[test]
    fn advance_stops_at_terminal_stage() {
        let mut wf = ProgramWorkflow::new(Uuid::new_v4());
        let mut entered = vec![];
        while let Some(s) = wf.advance() {
            entered.push(s.number());
        }
        assert_eq!(entered, vec![2, 3, 4, 5, 6]);
        assert!(wf.current_stage().is_terminal());
        assert_eq!(wf.advance(), None);
        // avance manual no toca compuertas
        assert!(!wf.form_released() && !wf.details_collected());
    }

    #[test]
    fn release_form_only_from_stage_three() {
        let mut wf = ProgramWorkflow::new(Uuid::new_v4());
        assert_eq!(wf.release_form(), None);
        assert!(!wf.form_released());
        wf.advance();
        wf.advance();
        assert_eq!(wf.release_form(), Some(Stage::CollectDetails));
        assert!(wf.form_released());
        assert_eq!(wf.release_form(), None);
        assert!(wf.form_released());
    }

    #[test]
    fn gates_stay_true_after_further_advances() {
        let mut wf = ProgramWorkflow::new(Uuid::new_v4());
        wf.advance();
        wf.advance();
        wf.release_form();
        assert_eq!(wf.mark_details_collected(), Some(Stage::NotifyAreaSecretary));
        wf.advance();
        assert_eq!(wf.current_stage(), Stage::PostGeneralInstructions);
        assert!(wf.form_released() && wf.details_collected());
    }
}
