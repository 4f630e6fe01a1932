//! Ciclo de vida de las solicitudes y envío de detalles.
use log::{info, warn};
use sewa_domain::{ApplicationStatus, Caller, DetailsSubmission, ProgramApplication};
use uuid::Uuid;

use super::core::WorkflowEngine;
use crate::errors::{StoreError, ValidationFailure, WorkflowError};
use crate::notify::policy::require_incharge;
use crate::repo::Store;

impl<S: Store> WorkflowEngine<S> {
    /// Una solicitud por (programa, sewadar); el programa debe estar activo.
    pub fn apply(&self, sewadar_id: Uuid, program_id: Uuid) -> Result<ProgramApplication, WorkflowError> {
        let program = self.load_program(program_id)?;
        self.load_sewadar(sewadar_id)?;
        if !program.is_active() {
            return Err(ValidationFailure::InvalidState(format!("program {} is {}", program_id, program.status.as_str())).into());
        }
        let application = ProgramApplication::new(program_id, sewadar_id);
        self.store.insert_application(&application).map_err(as_duplicate)?;
        info!("apply:created program_id={} sewadar_id={}", program_id, sewadar_id);
        Ok(application)
    }

    /// Aprueba y reevalúa los avances automáticos (el cupo puede haberse
    /// alcanzado). La aprobación ya está guardada cuando corre el avance: si
    /// éste falla se registra y la aprobación se devuelve igual.
    pub fn approve_application(&self, caller: &Caller, application_id: Uuid) -> Result<ProgramApplication, WorkflowError> {
        require_incharge(caller)?;
        let updated = self.move_application(application_id, ApplicationStatus::Approved)?;
        if let Err(e) = self.auto_advance_on_program_state(updated.program_id) {
            warn!("approve:auto_advance_failed program_id={} application_id={} err={}", updated.program_id, updated.id, e);
        }
        Ok(updated)
    }

    pub fn reject_application(&self, caller: &Caller, application_id: Uuid) -> Result<ProgramApplication, WorkflowError> {
        require_incharge(caller)?;
        self.move_application(application_id, ApplicationStatus::Rejected)
    }

    /// El propio solicitante pide retirarse de una solicitud aprobada.
    pub fn request_drop(&self, sewadar_id: Uuid, application_id: Uuid) -> Result<ProgramApplication, WorkflowError> {
        let current = self.load_application(application_id)?;
        if current.sewadar_id != sewadar_id {
            return Err(ValidationFailure::InvalidState(format!("application {} belongs to another sewadar", application_id)).into());
        }
        self.move_application(application_id, ApplicationStatus::DropRequested)
    }

    /// `approve = true` retira al solicitante; `false` lo devuelve a
    /// `Approved`.
    pub fn decide_drop(&self, caller: &Caller, application_id: Uuid, approve: bool) -> Result<ProgramApplication, WorkflowError> {
        require_incharge(caller)?;
        let to = if approve { ApplicationStatus::Dropped } else { ApplicationStatus::Approved };
        self.move_application(application_id, to)
    }

    /// Requiere solicitud aprobada y formulario liberado. Reenviar reemplaza
    /// el contenido anterior.
    pub fn submit_details(&self, sewadar_id: Uuid, program_id: Uuid, details: serde_json::Value) -> Result<DetailsSubmission, WorkflowError> {
        self.load_program(program_id)?;
        let application = self.store
                              .find_application(program_id, sewadar_id)?
                              .ok_or_else(|| ValidationFailure::InvalidState(format!("sewadar {} has not applied to program {}", sewadar_id, program_id)))?;
        if application.status != ApplicationStatus::Approved {
            return Err(ValidationFailure::InvalidState(format!("application {} is {}", application.id, application.status.as_str())).into());
        }
        let workflow = self.get_or_initialize(program_id)?;
        if !workflow.form_released() {
            return Err(ValidationFailure::InvalidState(format!("details form for program {} is not released", program_id)).into());
        }
        let submission = DetailsSubmission::new(program_id, sewadar_id, details);
        self.store.upsert_submission(&submission)?;
        info!("details:submitted program_id={} sewadar_id={}", program_id, sewadar_id);
        Ok(submission)
    }

    fn load_application(&self, application_id: Uuid) -> Result<ProgramApplication, WorkflowError> {
        self.store
            .get_application(application_id)?
            .ok_or_else(|| WorkflowError::not_found("application", application_id))
    }

    fn move_application(&self, application_id: Uuid, to: ApplicationStatus) -> Result<ProgramApplication, WorkflowError> {
        let current = self.load_application(application_id)?;
        current.clone().transition(to)?;
        let updated = self.store
                          .transition_application(application_id, current.status, to)?
                          .ok_or_else(|| ValidationFailure::InvalidState(format!("application {} changed concurrently", application_id)))?;
        info!("application:{} application_id={} program_id={}", to.as_str(), application_id, updated.program_id);
        Ok(updated)
    }
}

pub(crate) fn as_duplicate(e: StoreError) -> WorkflowError {
    match e {
        StoreError::Conflict(msg) => ValidationFailure::Duplicate(msg).into(),
        other => other.into(),
    }
}
