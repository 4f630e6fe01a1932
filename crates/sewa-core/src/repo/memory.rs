//! Backend en memoria con la misma semántica que el de Postgres.
//!
//! - Las tablas planas viven tras un único `RwLock` (orden de inserción
//!   estable vía `IndexMap`).
//! - Las filas de workflow viven en un `DashMap`: la guarda de la entrada es
//!   el lock por fila que serializa a los escritores de un mismo programa.
//!
//! Orden de locks: entrada del `DashMap` primero, tablas después. Ningún
//! camino toma una entrada del mapa mientras sostiene el lock de tablas.
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use indexmap::IndexMap;
use sewa_domain::{Account, ApplicationStatus, Attendance, AttendanceRecord, DetailsSubmission, NotificationPreference, Program, ProgramApplication,
                  ProgramDate, ProgramNotificationPreference, ProgramSelection, ProgramStatus, ProgramWorkflow, SelectionStatus, Sewadar, Stage};
use uuid::Uuid;

use super::types::*;
use crate::errors::{StoreError, WorkflowError};

#[derive(Default)]
struct Tables {
    programs: IndexMap<Uuid, Program>,
    dates: IndexMap<Uuid, ProgramDate>,
    sewadars: IndexMap<Uuid, Sewadar>,
    accounts: IndexMap<Uuid, Account>,
    applications: IndexMap<Uuid, ProgramApplication>,
    submissions: IndexMap<(Uuid, Uuid), DetailsSubmission>,
    selections: IndexMap<Uuid, ProgramSelection>,
    attendance: IndexMap<Uuid, Attendance>,
    preferences: BTreeMap<Stage, NotificationPreference>,
    overrides: HashMap<(Uuid, Stage), ProgramNotificationPreference>,
}

impl Tables {
    fn has_active_selection(&self, program_id: Uuid, sewadar_id: Uuid) -> bool {
        self.selections
            .values()
            .any(|s| s.program_id == program_id && s.sewadar_id == sewadar_id && s.status.is_active())
    }

    fn active_selections(&self, program_id: Uuid) -> u32 {
        self.selections
            .values()
            .filter(|s| s.program_id == program_id && s.status.is_active())
            .count() as u32
    }

    fn facts(&self, program: Program) -> WorkflowFacts {
        let approved = self.applications
                           .values()
                           .filter(|a| a.program_id == program.id && a.status == ApplicationStatus::Approved)
                           .map(|a| a.sewadar_id)
                           .collect();
        let submitted: HashSet<Uuid> = self.submissions
                                           .keys()
                                           .filter(|(p, _)| *p == program.id)
                                           .map(|(_, s)| *s)
                                           .collect();
        WorkflowFacts { program,
                        approved,
                        submitted }
    }
}

#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
    workflows: DashMap<Uuid, ProgramWorkflow>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, StoreError> {
        self.tables
            .read()
            .map_err(|_| StoreError::Unavailable("in-memory tables lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, StoreError> {
        self.tables
            .write()
            .map_err(|_| StoreError::Unavailable("in-memory tables lock poisoned".into()))
    }
}

impl ProgramStore for InMemoryStore {
    fn insert_program(&self, program: &Program) -> Result<(), StoreError> {
        let mut t = self.write()?;
        if t.programs.contains_key(&program.id) {
            return Err(StoreError::Conflict(format!("program {} already exists", program.id)));
        }
        t.programs.insert(program.id, program.clone());
        Ok(())
    }

    fn get_program(&self, id: Uuid) -> Result<Option<Program>, StoreError> {
        Ok(self.read()?.programs.get(&id).cloned())
    }

    fn update_program_status(&self, id: Uuid, status: ProgramStatus) -> Result<bool, StoreError> {
        let mut t = self.write()?;
        match t.programs.get_mut(&id) {
            Some(p) => {
                p.status = status;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn delete_program(&self, id: Uuid) -> Result<bool, StoreError> {
        // workflow primero: respeta el orden de locks (mapa → tablas)
        self.workflows.remove(&id);
        let mut t = self.write()?;
        if t.programs.shift_remove(&id).is_none() {
            return Ok(false);
        }
        let date_ids: HashSet<Uuid> = t.dates.values().filter(|d| d.program_id == id).map(|d| d.id).collect();
        t.dates.retain(|_, d| d.program_id != id);
        t.attendance.retain(|_, a| !date_ids.contains(&a.program_date_id));
        t.applications.retain(|_, a| a.program_id != id);
        t.submissions.retain(|(p, _), _| *p != id);
        t.selections.retain(|_, s| s.program_id != id);
        t.overrides.retain(|(p, _), _| *p != id);
        Ok(true)
    }

    fn insert_program_date(&self, date: &ProgramDate) -> Result<(), StoreError> {
        let mut t = self.write()?;
        if !t.programs.contains_key(&date.program_id) {
            return Err(StoreError::Conflict(format!("program {} does not exist", date.program_id)));
        }
        t.dates.insert(date.id, date.clone());
        Ok(())
    }

    fn list_program_dates(&self, program_id: Uuid) -> Result<Vec<ProgramDate>, StoreError> {
        let mut dates: Vec<ProgramDate> = self.read()?.dates.values().filter(|d| d.program_id == program_id).cloned().collect();
        dates.sort_by_key(|d| d.date);
        Ok(dates)
    }

    fn delete_program_date(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut t = self.write()?;
        if t.dates.shift_remove(&id).is_none() {
            return Ok(false);
        }
        t.attendance.retain(|_, a| a.program_date_id != id);
        Ok(true)
    }
}

impl DirectoryStore for InMemoryStore {
    fn insert_sewadar(&self, sewadar: &Sewadar) -> Result<(), StoreError> {
        self.write()?.sewadars.insert(sewadar.id, sewadar.clone());
        Ok(())
    }

    fn get_sewadar(&self, id: Uuid) -> Result<Option<Sewadar>, StoreError> {
        Ok(self.read()?.sewadars.get(&id).cloned())
    }

    fn insert_account(&self, account: &Account) -> Result<(), StoreError> {
        self.write()?.accounts.insert(account.id, account.clone());
        Ok(())
    }

    fn list_incharge_accounts(&self) -> Result<Vec<Account>, StoreError> {
        Ok(self.read()?
               .accounts
               .values()
               .filter(|a| a.role.has_incharge_capability())
               .cloned()
               .collect())
    }
}

impl ApplicationStore for InMemoryStore {
    fn insert_application(&self, application: &ProgramApplication) -> Result<(), StoreError> {
        let mut t = self.write()?;
        if !t.programs.contains_key(&application.program_id) {
            return Err(StoreError::Conflict(format!("program {} does not exist", application.program_id)));
        }
        let duplicate = t.applications
                         .values()
                         .any(|a| a.program_id == application.program_id && a.sewadar_id == application.sewadar_id);
        if duplicate {
            return Err(StoreError::Conflict(format!("sewadar {} already applied to program {}",
                                                    application.sewadar_id, application.program_id)));
        }
        t.applications.insert(application.id, application.clone());
        Ok(())
    }

    fn get_application(&self, id: Uuid) -> Result<Option<ProgramApplication>, StoreError> {
        Ok(self.read()?.applications.get(&id).cloned())
    }

    fn find_application(&self, program_id: Uuid, sewadar_id: Uuid) -> Result<Option<ProgramApplication>, StoreError> {
        Ok(self.read()?
               .applications
               .values()
               .find(|a| a.program_id == program_id && a.sewadar_id == sewadar_id)
               .cloned())
    }

    fn transition_application(&self, id: Uuid, from: ApplicationStatus, to: ApplicationStatus) -> Result<Option<ProgramApplication>, StoreError> {
        let mut t = self.write()?;
        match t.applications.get_mut(&id) {
            Some(a) if a.status == from => {
                a.status = to;
                a.updated_at = chrono::Utc::now();
                Ok(Some(a.clone()))
            }
            _ => Ok(None),
        }
    }

    fn list_applications(&self, program_id: Uuid) -> Result<Vec<ProgramApplication>, StoreError> {
        Ok(self.read()?.applications.values().filter(|a| a.program_id == program_id).cloned().collect())
    }

    fn upsert_submission(&self, submission: &DetailsSubmission) -> Result<(), StoreError> {
        self.write()?
            .submissions
            .insert((submission.program_id, submission.sewadar_id), submission.clone());
        Ok(())
    }

    fn list_submissions(&self, program_id: Uuid) -> Result<Vec<DetailsSubmission>, StoreError> {
        Ok(self.read()?.submissions.values().filter(|s| s.program_id == program_id).cloned().collect())
    }
}

impl SelectionStore for InMemoryStore {
    fn create_selections(&self,
                         program_id: Uuid,
                         capacity_limit: Option<u32>,
                         batch_size: usize,
                         rows: &[ProgramSelection])
                         -> Result<SelectionInsert, StoreError> {
        let mut t = self.write()?;
        let active = t.active_selections(program_id);
        if exceeds_capacity(capacity_limit, active, batch_size) {
            return Ok(SelectionInsert::CapacityExceeded { active });
        }
        let mut created = Vec::new();
        let mut duplicates = Vec::new();
        for row in rows {
            if t.has_active_selection(program_id, row.sewadar_id) {
                duplicates.push(row.sewadar_id);
                continue;
            }
            t.selections.insert(row.id, row.clone());
            created.push(row.clone());
        }
        Ok(SelectionInsert::Created { created, duplicates })
    }

    fn get_selection(&self, id: Uuid) -> Result<Option<ProgramSelection>, StoreError> {
        Ok(self.read()?.selections.get(&id).cloned())
    }

    fn transition_selection(&self, id: Uuid, from: SelectionStatus, to: SelectionStatus) -> Result<Option<ProgramSelection>, StoreError> {
        let mut t = self.write()?;
        match t.selections.get_mut(&id) {
            Some(s) if s.status == from => {
                s.status = to;
                s.updated_at = chrono::Utc::now();
                Ok(Some(s.clone()))
            }
            _ => Ok(None),
        }
    }

    fn replace_selection(&self, old_id: Uuid, capacity_limit: Option<u32>, replacement: &ProgramSelection)
                         -> Result<ReplaceOutcome, StoreError> {
        let mut t = self.write()?;
        let old = match t.selections.get(&old_id) {
            Some(s) if s.status == SelectionStatus::Selected => s.clone(),
            _ => return Ok(ReplaceOutcome::Stale),
        };
        if t.has_active_selection(old.program_id, replacement.sewadar_id) {
            return Ok(ReplaceOutcome::AlreadySelected);
        }
        let active = t.active_selections(old.program_id);
        if exceeds_capacity(capacity_limit, active, 1) {
            return Ok(ReplaceOutcome::CapacityExceeded { active });
        }
        let mut replaced = old;
        replaced.status = SelectionStatus::Replaced;
        replaced.updated_at = chrono::Utc::now();
        t.selections.insert(replaced.id, replaced.clone());
        t.selections.insert(replacement.id, replacement.clone());
        Ok(ReplaceOutcome::Replaced { old: replaced,
                                      new: replacement.clone() })
    }

    fn list_selections(&self, program_id: Uuid) -> Result<Vec<ProgramSelection>, StoreError> {
        Ok(self.read()?.selections.values().filter(|s| s.program_id == program_id).cloned().collect())
    }
}

impl AttendanceStore for InMemoryStore {
    fn record_attendance(&self, attendance: &Attendance) -> Result<(), StoreError> {
        let mut t = self.write()?;
        if !t.dates.contains_key(&attendance.program_date_id) {
            return Err(StoreError::Conflict(format!("program date {} does not exist", attendance.program_date_id)));
        }
        let duplicate = t.attendance
                         .values()
                         .any(|a| a.sewadar_id == attendance.sewadar_id && a.program_date_id == attendance.program_date_id);
        if duplicate {
            return Err(StoreError::Conflict(format!("attendance already recorded for sewadar {} on date {}",
                                                    attendance.sewadar_id, attendance.program_date_id)));
        }
        t.attendance.insert(attendance.id, attendance.clone());
        Ok(())
    }

    fn attendance_history(&self, sewadar_id: Uuid) -> Result<Vec<AttendanceRecord>, StoreError> {
        let t = self.read()?;
        let records = t.attendance
                       .values()
                       .filter(|a| a.sewadar_id == sewadar_id)
                       .filter_map(|a| {
                           let date = t.dates.get(&a.program_date_id)?;
                           let program = t.programs.get(&date.program_id)?;
                           Some(AttendanceRecord { program_id: program.id,
                                                   location: program.location.clone(),
                                                   date: date.date })
                       })
                       .collect();
        Ok(records)
    }
}

impl WorkflowStore for InMemoryStore {
    fn find_workflow(&self, program_id: Uuid) -> Result<Option<ProgramWorkflow>, StoreError> {
        Ok(self.workflows.get(&program_id).map(|w| w.value().clone()))
    }

    fn insert_workflow_if_absent(&self, workflow: &ProgramWorkflow) -> Result<ProgramWorkflow, StoreError> {
        match self.workflows.entry(workflow.program_id()) {
            Entry::Occupied(e) => Ok(e.get().clone()),
            Entry::Vacant(e) => {
                if !self.read()?.programs.contains_key(&workflow.program_id()) {
                    return Err(StoreError::Conflict(format!("program {} does not exist", workflow.program_id())));
                }
                Ok(e.insert(workflow.clone()).value().clone())
            }
        }
    }

    fn list_workflows(&self) -> Result<Vec<ProgramWorkflow>, StoreError> {
        let mut all: Vec<ProgramWorkflow> = self.workflows.iter().map(|w| w.value().clone()).collect();
        all.sort_by_key(|w| w.created_at());
        Ok(all)
    }

    fn transact_workflow(&self, program_id: Uuid, apply: &mut WorkflowMutation<'_>) -> Result<ProgramWorkflow, WorkflowError> {
        let mut row = self.workflows
                          .get_mut(&program_id)
                          .ok_or_else(|| WorkflowError::not_found("workflow", program_id))?;
        let facts = {
            let t = self.read()?;
            let program = t.programs
                           .get(&program_id)
                           .cloned()
                           .ok_or_else(|| WorkflowError::not_found("program", program_id))?;
            t.facts(program)
        };
        // se muta una copia: un error deja la fila intacta
        let mut draft = row.value().clone();
        if apply(&mut draft, &facts)? {
            *row.value_mut() = draft;
        }
        Ok(row.value().clone())
    }
}

impl PreferenceStore for InMemoryStore {
    fn seed_preferences(&self, defaults: &[NotificationPreference]) -> Result<usize, StoreError> {
        let mut t = self.write()?;
        let mut inserted = 0;
        for pref in defaults {
            if let std::collections::btree_map::Entry::Vacant(e) = t.preferences.entry(pref.stage) {
                e.insert(pref.clone());
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    fn get_preference(&self, stage: Stage) -> Result<Option<NotificationPreference>, StoreError> {
        Ok(self.read()?.preferences.get(&stage).cloned())
    }

    fn list_preferences(&self) -> Result<Vec<NotificationPreference>, StoreError> {
        Ok(self.read()?.preferences.values().cloned().collect())
    }

    fn upsert_preference(&self, preference: &NotificationPreference) -> Result<(), StoreError> {
        self.write()?.preferences.insert(preference.stage, preference.clone());
        Ok(())
    }

    fn get_program_override(&self, program_id: Uuid, stage: Stage) -> Result<Option<ProgramNotificationPreference>, StoreError> {
        Ok(self.read()?.overrides.get(&(program_id, stage)).cloned())
    }

    fn upsert_program_override(&self, preference: &ProgramNotificationPreference) -> Result<(), StoreError> {
        let mut t = self.write()?;
        if !t.programs.contains_key(&preference.program_id) {
            return Err(StoreError::Conflict(format!("program {} does not exist", preference.program_id)));
        }
        t.overrides.insert((preference.program_id, preference.stage), preference.clone());
        Ok(())
    }

    fn delete_program_override(&self, program_id: Uuid, stage: Stage) -> Result<bool, StoreError> {
        Ok(self.write()?.overrides.remove(&(program_id, stage)).is_some())
    }
}
