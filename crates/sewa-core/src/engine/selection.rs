//! Selección de participantes con control de cupo.
//!
//! El chequeo de cupo y las inserciones ocurren en una sola unidad de la
//! store (`create_selections`): un lote que excede el cupo no crea ninguna
//! fila. Los avisos a los seleccionados salen después.
use log::{info, warn};
use serde::Serialize;
use sewa_domain::{Caller, Program, ProgramSelection, SelectionStatus, Sewadar};
use sewa_policies::{PrioritizationPolicy, SelectionPriorityPolicy};
use uuid::Uuid;

use super::core::WorkflowEngine;
use crate::errors::{ValidationFailure, WorkflowError};
use crate::notify::policy::require_incharge;
use crate::repo::{ReplaceOutcome, SelectionInsert, Store};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectionResult {
    pub created: Vec<ProgramSelection>,
    /// Participantes rechazados por tener ya una selección activa.
    pub duplicates: Vec<Uuid>,
}

impl<S: Store> WorkflowEngine<S> {
    pub fn select(&self, caller: &Caller, program_id: Uuid, participants: &[Uuid]) -> Result<SelectionResult, WorkflowError> {
        require_incharge(caller)?;
        let program = self.load_program(program_id)?;
        let policy = SelectionPriorityPolicy::new(self.today());
        let mut rows = Vec::with_capacity(participants.len());
        for &sewadar_id in participants {
            self.load_sewadar(sewadar_id)?;
            let scored = policy.score(&self.score_input(sewadar_id)?);
            rows.push(ProgramSelection::new(program_id, sewadar_id, caller.account_id, scored.score, scored.reason));
        }

        let outcome = self.store
                          .create_selections(program_id, program.capacity_limit, participants.len(), &rows)?;
        let (created, duplicates) = match outcome {
            SelectionInsert::Created { created, duplicates } => (created, duplicates),
            SelectionInsert::CapacityExceeded { active } => {
                let limit = program.capacity_limit.unwrap_or_default();
                warn!("select:capacity_exceeded program_id={} limit={} active={} requested={}",
                      program_id,
                      limit,
                      active,
                      participants.len());
                return Err(ValidationFailure::CapacityExceeded { limit,
                                                                 active,
                                                                 requested: participants.len() as u32 }.into());
            }
        };
        info!("select:committed program_id={} created={} duplicates={}",
              program_id,
              created.len(),
              duplicates.len());
        for sel in &created {
            self.notify_selected(&program, sel.sewadar_id);
        }
        Ok(SelectionResult { created, duplicates })
    }

    pub fn confirm_selection(&self, caller: &Caller, selection_id: Uuid) -> Result<ProgramSelection, WorkflowError> {
        self.finish_selection(caller, selection_id, SelectionStatus::Confirmed)
    }

    pub fn drop_selection(&self, caller: &Caller, selection_id: Uuid) -> Result<ProgramSelection, WorkflowError> {
        self.finish_selection(caller, selection_id, SelectionStatus::Dropped)
    }

    /// La selección original pasa a `Replaced` y `replacement` recibe una
    /// nueva fila `Selected`. La original sigue activa, así que el reemplazo
    /// necesita un lugar libre; con el cupo lleno hay que soltar (drop) y
    /// seleccionar.
    pub fn replace_selection(&self,
                             caller: &Caller,
                             selection_id: Uuid,
                             replacement: Uuid)
                             -> Result<(ProgramSelection, ProgramSelection), WorkflowError> {
        require_incharge(caller)?;
        let old = self.load_selection(selection_id)?;
        if old.status != SelectionStatus::Selected {
            return Err(ValidationFailure::InvalidState(format!("selection {} is {}", old.id, old.status.as_str())).into());
        }
        let program = self.load_program(old.program_id)?;
        self.load_sewadar(replacement)?;
        let scored = self.selection_score(replacement)?;
        let row = ProgramSelection::new(old.program_id, replacement, caller.account_id, scored.score, scored.reason);
        match self.store.replace_selection(selection_id, program.capacity_limit, &row)? {
            ReplaceOutcome::Replaced { old, new } => {
                info!("select:replaced program_id={} old={} new={}", program.id, old.sewadar_id, new.sewadar_id);
                self.notify_selected(&program, new.sewadar_id);
                Ok((old, new))
            }
            ReplaceOutcome::Stale => Err(ValidationFailure::InvalidState(format!("selection {} changed concurrently", selection_id)).into()),
            ReplaceOutcome::AlreadySelected => {
                Err(ValidationFailure::Duplicate(format!("sewadar {} already selected for program {}", replacement, program.id)).into())
            }
            ReplaceOutcome::CapacityExceeded { active } => {
                let limit = program.capacity_limit.unwrap_or_default();
                warn!("select:replace_capacity_exceeded program_id={} limit={} active={}", program.id, limit, active);
                Err(ValidationFailure::CapacityExceeded { limit,
                                                          active,
                                                          requested: 1 }.into())
            }
        }
    }

    fn finish_selection(&self, caller: &Caller, selection_id: Uuid, to: SelectionStatus) -> Result<ProgramSelection, WorkflowError> {
        require_incharge(caller)?;
        let current = self.load_selection(selection_id)?;
        // valida la transición antes de tocar la store
        current.clone().transition(to)?;
        let updated = self.store
                          .transition_selection(selection_id, current.status, to)?
                          .ok_or_else(|| ValidationFailure::InvalidState(format!("selection {} changed concurrently", selection_id)))?;
        info!("select:{} selection_id={} program_id={}", to.as_str(), selection_id, updated.program_id);
        Ok(updated)
    }

    fn load_selection(&self, selection_id: Uuid) -> Result<ProgramSelection, WorkflowError> {
        self.store
            .get_selection(selection_id)?
            .ok_or_else(|| WorkflowError::not_found("selection", selection_id))
    }

    pub(crate) fn load_sewadar(&self, sewadar_id: Uuid) -> Result<Sewadar, WorkflowError> {
        self.store
            .get_sewadar(sewadar_id)?
            .ok_or_else(|| WorkflowError::not_found("sewadar", sewadar_id))
    }

    fn notify_selected(&self, program: &Program, sewadar_id: Uuid) {
        match self.store.get_sewadar(sewadar_id) {
            Ok(Some(sewadar)) => {
                let text = format!("You have been selected for '{}'.", program.title);
                self.dispatcher.notify_participant(&sewadar, &text);
            }
            Ok(None) => {}
            Err(e) => warn!("select:notify_failed sewadar_id={} err={}", sewadar_id, e),
        }
    }
}
