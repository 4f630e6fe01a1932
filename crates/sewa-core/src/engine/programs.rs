//! Programas, fechas, asistencia y directorio.
use chrono::NaiveDate;
use log::{info, warn};
use sewa_domain::{Account, Attendance, Caller, Program, ProgramDate, ProgramStatus, ProgramWorkflow, Role, Sewadar};
use uuid::Uuid;

use super::applications::as_duplicate;
use super::core::WorkflowEngine;
use crate::errors::WorkflowError;
use crate::notify::policy::require_incharge;
use crate::repo::Store;

impl<S: Store> WorkflowEngine<S> {
    /// Crea el programa en `Draft`. El workflow se crea en el primer acceso.
    pub fn create_program(&self,
                          caller: &Caller,
                          title: &str,
                          location: &str,
                          capacity_limit: Option<u32>)
                          -> Result<Program, WorkflowError> {
        require_incharge(caller)?;
        let program = Program::new(title, location, capacity_limit, caller.account_id)?;
        self.store.insert_program(&program)?;
        info!("program:created program_id={} location={:?}", program.id, program.location);
        Ok(program)
    }

    pub fn add_program_date(&self, caller: &Caller, program_id: Uuid, date: NaiveDate) -> Result<ProgramDate, WorkflowError> {
        require_incharge(caller)?;
        self.load_program(program_id)?;
        let row = ProgramDate::new(program_id, date);
        self.store.insert_program_date(&row)?;
        Ok(row)
    }

    /// Cambia el estado del programa y reevalúa los avances automáticos.
    /// El estado nuevo ya está guardado cuando corre el avance: si éste falla
    /// se registra y se devuelve el workflow vigente sin avanzar.
    pub fn set_program_status(&self, caller: &Caller, program_id: Uuid, status: ProgramStatus) -> Result<ProgramWorkflow, WorkflowError> {
        require_incharge(caller)?;
        if !self.store.update_program_status(program_id, status)? {
            return Err(WorkflowError::not_found("program", program_id));
        }
        info!("program:status program_id={} status={}", program_id, status.as_str());
        match self.auto_advance_on_program_state(program_id) {
            Ok(wf) => Ok(wf),
            Err(e) => {
                warn!("program:auto_advance_failed program_id={} err={}", program_id, e);
                self.get_or_initialize(program_id)
            }
        }
    }

    /// Borrado en cascada. `false` si el programa no existía.
    pub fn delete_program(&self, caller: &Caller, program_id: Uuid) -> Result<bool, WorkflowError> {
        require_incharge(caller)?;
        let removed = self.store.delete_program(program_id)?;
        if removed {
            info!("program:deleted program_id={}", program_id);
        }
        Ok(removed)
    }

    pub fn delete_program_date(&self, caller: &Caller, program_date_id: Uuid) -> Result<bool, WorkflowError> {
        require_incharge(caller)?;
        Ok(self.store.delete_program_date(program_date_id)?)
    }

    pub fn record_attendance(&self, caller: &Caller, sewadar_id: Uuid, program_date_id: Uuid) -> Result<Attendance, WorkflowError> {
        require_incharge(caller)?;
        self.load_sewadar(sewadar_id)?;
        let row = Attendance::new(sewadar_id, program_date_id);
        self.store.record_attendance(&row).map_err(as_duplicate)?;
        Ok(row)
    }

    pub fn register_sewadar(&self, name: &str, contact: Option<String>, joined_on: NaiveDate) -> Result<Sewadar, WorkflowError> {
        let sewadar = Sewadar::new(name, contact, joined_on);
        self.store.insert_sewadar(&sewadar)?;
        Ok(sewadar)
    }

    pub fn register_account(&self, name: &str, role: Role, contact: Option<String>) -> Result<Account, WorkflowError> {
        let account = Account::new(name, role, contact);
        self.store.insert_account(&account)?;
        Ok(account)
    }
}
