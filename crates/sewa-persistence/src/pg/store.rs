//! `PgStore`: implementación Postgres de todos los traits de `sewa_core::repo`.
use std::collections::HashSet;

use chrono::{NaiveDate, Utc};
use diesel::dsl::exists;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::upsert::excluded;
use log::{debug, error};
use sewa_core::repo::{exceeds_capacity, ApplicationStore, AttendanceStore, DirectoryStore, PreferenceStore, ProgramStore, ReplaceOutcome, SelectionInsert,
                      SelectionStore, WorkflowFacts, WorkflowMutation, WorkflowStore};
use sewa_core::{StoreError, WorkflowError};
use sewa_domain::{Account, ApplicationStatus, Attendance, AttendanceRecord, DetailsSubmission, NotificationPreference, Program,
                  ProgramApplication, ProgramDate, ProgramNotificationPreference, ProgramSelection, ProgramStatus, ProgramWorkflow, Role,
                  SelectionStatus, Sewadar, Stage};
use uuid::Uuid;

use super::rows::*;
use super::{with_retry, ConnectionProvider, Retryable};
use crate::error::PersistenceError;
use crate::schema::*;

pub struct PgStore<P: ConnectionProvider> {
    provider: P,
}

impl<P: ConnectionProvider> PgStore<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Unidad de trabajo con reintento; errores mapeados a `StoreError`.
    fn run<T, F>(&self, op: &'static str, mut f: F) -> Result<T, StoreError>
        where F: FnMut(&mut PgConnection) -> Result<T, PersistenceError>
    {
        with_retry(|| {
            let mut conn = self.provider.connection()?;
            f(&mut conn)
        }).map_err(|e| {
              error!("{}:failed err={}", op, e);
              StoreError::from(e)
          })
    }

    /// Igual que `run` pero dentro de una transacción read-write.
    fn run_tx<T, F>(&self, op: &'static str, mut f: F) -> Result<T, StoreError>
        where F: FnMut(&mut PgConnection) -> Result<T, PersistenceError>
    {
        self.run(op, |conn| conn.build_transaction().read_write().run(|tx| f(tx)))
    }
}

/// Error interno de `transact_workflow`: separa el rechazo de la mutación
/// (no se reintenta) de las fallas de base de datos.
#[derive(Debug)]
enum TxError {
    Db(PersistenceError),
    Rejected(WorkflowError),
}

impl From<diesel::result::Error> for TxError {
    fn from(e: diesel::result::Error) -> Self {
        TxError::Db(e.into())
    }
}

impl From<PersistenceError> for TxError {
    fn from(e: PersistenceError) -> Self {
        TxError::Db(e)
    }
}

impl Retryable for TxError {
    fn is_retryable(&self) -> bool {
        match self {
            TxError::Db(e) => e.is_retryable(),
            TxError::Rejected(_) => false,
        }
    }
}

fn lock_program(tx: &mut PgConnection, program_id: Uuid) -> Result<(), PersistenceError> {
    programs::table.find(program_id)
                   .select(programs::id)
                   .for_update()
                   .first::<Uuid>(tx)
                   .optional()?
                   .map(|_| ())
                   .ok_or_else(|| PersistenceError::ForeignKeyViolation(format!("program {program_id} does not exist")))
}

fn has_active_selection(tx: &mut PgConnection, program_id: Uuid, sewadar_id: Uuid) -> Result<bool, PersistenceError> {
    let found = diesel::select(exists(program_selections::table.filter(program_selections::program_id.eq(program_id))
                                                               .filter(program_selections::sewadar_id.eq(sewadar_id))
                                                               .filter(program_selections::status.ne(SelectionStatus::Dropped.as_str()))))
                    .get_result::<bool>(tx)?;
    Ok(found)
}

fn count_active_selections(tx: &mut PgConnection, program_id: Uuid) -> Result<u32, PersistenceError> {
    let n = program_selections::table.filter(program_selections::program_id.eq(program_id))
                                     .filter(program_selections::status.ne(SelectionStatus::Dropped.as_str()))
                                     .count()
                                     .get_result::<i64>(tx)?;
    Ok(n as u32)
}

fn load_facts(tx: &mut PgConnection, program: Program) -> Result<WorkflowFacts, PersistenceError> {
    let approved = program_applications::table.filter(program_applications::program_id.eq(program.id))
                                              .filter(program_applications::status.eq(ApplicationStatus::Approved.as_str()))
                                              .order((program_applications::applied_at.asc(), program_applications::id.asc()))
                                              .select(program_applications::sewadar_id)
                                              .load::<Uuid>(tx)?;
    let submitted: HashSet<Uuid> = details_submissions::table.filter(details_submissions::program_id.eq(program.id))
                                                             .select(details_submissions::sewadar_id)
                                                             .load::<Uuid>(tx)?
                                                             .into_iter()
                                                             .collect();
    Ok(WorkflowFacts { program,
                       approved,
                       submitted })
}

impl<P: ConnectionProvider> ProgramStore for PgStore<P> {
    fn insert_program(&self, program: &Program) -> Result<(), StoreError> {
        self.run("insert_program", |conn| {
                let row = NewProgramRow::from_domain(program)?;
                diesel::insert_into(programs::table).values(&row).execute(conn)?;
                Ok(())
            })
    }

    fn get_program(&self, id: Uuid) -> Result<Option<Program>, StoreError> {
        self.run("get_program", |conn| {
                programs::table.find(id)
                               .first::<ProgramRow>(conn)
                               .optional()?
                               .map(Program::try_from)
                               .transpose()
            })
    }

    fn update_program_status(&self, id: Uuid, status: ProgramStatus) -> Result<bool, StoreError> {
        self.run("update_program_status", |conn| {
                let n = diesel::update(programs::table.find(id)).set(programs::status.eq(status.as_str()))
                                                                 .execute(conn)?;
                Ok(n > 0)
            })
    }

    fn delete_program(&self, id: Uuid) -> Result<bool, StoreError> {
        // el resto cae por ON DELETE CASCADE
        self.run("delete_program", |conn| Ok(diesel::delete(programs::table.find(id)).execute(conn)? > 0))
    }

    fn insert_program_date(&self, date: &ProgramDate) -> Result<(), StoreError> {
        self.run("insert_program_date", |conn| {
                diesel::insert_into(program_dates::table).values(&ProgramDateRow::from(date))
                                                         .execute(conn)?;
                Ok(())
            })
    }

    fn list_program_dates(&self, program_id: Uuid) -> Result<Vec<ProgramDate>, StoreError> {
        self.run("list_program_dates", |conn| {
                let rows = program_dates::table.filter(program_dates::program_id.eq(program_id))
                                               .order((program_dates::date.asc(), program_dates::id.asc()))
                                               .load::<ProgramDateRow>(conn)?;
                Ok(rows.into_iter().map(ProgramDate::from).collect())
            })
    }

    fn delete_program_date(&self, id: Uuid) -> Result<bool, StoreError> {
        self.run("delete_program_date", |conn| Ok(diesel::delete(program_dates::table.find(id)).execute(conn)? > 0))
    }
}

impl<P: ConnectionProvider> DirectoryStore for PgStore<P> {
    fn insert_sewadar(&self, sewadar: &Sewadar) -> Result<(), StoreError> {
        self.run("insert_sewadar", |conn| {
                diesel::insert_into(sewadars::table).values(&SewadarRow::from(sewadar))
                                                    .execute(conn)?;
                Ok(())
            })
    }

    fn get_sewadar(&self, id: Uuid) -> Result<Option<Sewadar>, StoreError> {
        self.run("get_sewadar", |conn| {
                Ok(sewadars::table.find(id)
                                  .first::<SewadarRow>(conn)
                                  .optional()?
                                  .map(Sewadar::from))
            })
    }

    fn insert_account(&self, account: &Account) -> Result<(), StoreError> {
        self.run("insert_account", |conn| {
                diesel::insert_into(accounts::table).values(&AccountRow::from(account))
                                                    .execute(conn)?;
                Ok(())
            })
    }

    fn list_incharge_accounts(&self) -> Result<Vec<Account>, StoreError> {
        self.run("list_incharge_accounts", |conn| {
                let rows = accounts::table.filter(accounts::role.eq_any(vec![Role::Incharge.as_str(), Role::Admin.as_str()]))
                                          .order(accounts::name.asc())
                                          .load::<AccountRow>(conn)?;
                convert_all(rows)
            })
    }
}

impl<P: ConnectionProvider> ApplicationStore for PgStore<P> {
    fn insert_application(&self, application: &ProgramApplication) -> Result<(), StoreError> {
        self.run("insert_application", |conn| {
                diesel::insert_into(program_applications::table).values(&ApplicationRow::from(application))
                                                                 .execute(conn)?;
                Ok(())
            })
    }

    fn get_application(&self, id: Uuid) -> Result<Option<ProgramApplication>, StoreError> {
        self.run("get_application", |conn| {
                program_applications::table.find(id)
                                           .first::<ApplicationRow>(conn)
                                           .optional()?
                                           .map(ProgramApplication::try_from)
                                           .transpose()
            })
    }

    fn find_application(&self, program_id: Uuid, sewadar_id: Uuid) -> Result<Option<ProgramApplication>, StoreError> {
        self.run("find_application", |conn| {
                program_applications::table.filter(program_applications::program_id.eq(program_id))
                                           .filter(program_applications::sewadar_id.eq(sewadar_id))
                                           .first::<ApplicationRow>(conn)
                                           .optional()?
                                           .map(ProgramApplication::try_from)
                                           .transpose()
            })
    }

    fn transition_application(&self, id: Uuid, from: ApplicationStatus, to: ApplicationStatus) -> Result<Option<ProgramApplication>, StoreError> {
        self.run("transition_application", |conn| {
                diesel::update(program_applications::table.filter(program_applications::id.eq(id))
                                                          .filter(program_applications::status.eq(from.as_str())))
                .set((program_applications::status.eq(to.as_str()), program_applications::updated_at.eq(Utc::now())))
                .get_result::<ApplicationRow>(conn)
                .optional()?
                .map(ProgramApplication::try_from)
                .transpose()
            })
    }

    fn list_applications(&self, program_id: Uuid) -> Result<Vec<ProgramApplication>, StoreError> {
        self.run("list_applications", |conn| {
                let rows = program_applications::table.filter(program_applications::program_id.eq(program_id))
                                                      .order((program_applications::applied_at.asc(), program_applications::id.asc()))
                                                      .load::<ApplicationRow>(conn)?;
                convert_all(rows)
            })
    }

    fn upsert_submission(&self, submission: &DetailsSubmission) -> Result<(), StoreError> {
        self.run("upsert_submission", |conn| {
                diesel::insert_into(details_submissions::table).values(&SubmissionRow::from(submission))
                                                               .on_conflict((details_submissions::program_id, details_submissions::sewadar_id))
                                                               .do_update()
                                                               .set((details_submissions::details.eq(excluded(details_submissions::details)),
                                                                     details_submissions::submitted_at.eq(excluded(details_submissions::submitted_at))))
                                                               .execute(conn)?;
                Ok(())
            })
    }

    fn list_submissions(&self, program_id: Uuid) -> Result<Vec<DetailsSubmission>, StoreError> {
        self.run("list_submissions", |conn| {
                let rows = details_submissions::table.filter(details_submissions::program_id.eq(program_id))
                                                     .order(details_submissions::submitted_at.asc())
                                                     .load::<SubmissionRow>(conn)?;
                Ok(rows.into_iter().map(DetailsSubmission::from).collect())
            })
    }
}

impl<P: ConnectionProvider> SelectionStore for PgStore<P> {
    fn create_selections(&self,
                         program_id: Uuid,
                         capacity_limit: Option<u32>,
                         batch_size: usize,
                         rows: &[ProgramSelection])
                         -> Result<SelectionInsert, StoreError> {
        self.run_tx("create_selections", |tx| {
                // serializa lotes concurrentes del mismo programa
                lock_program(tx, program_id)?;
                let active = count_active_selections(tx, program_id)?;
                if exceeds_capacity(capacity_limit, active, batch_size) {
                    debug!("create_selections:capacity program_id={} active={} batch={}", program_id, active, batch_size);
                    return Ok(SelectionInsert::CapacityExceeded { active });
                }
                let mut created = Vec::new();
                let mut duplicates = Vec::new();
                for row in rows {
                    if has_active_selection(tx, program_id, row.sewadar_id)? {
                        duplicates.push(row.sewadar_id);
                        continue;
                    }
                    diesel::insert_into(program_selections::table).values(&SelectionRow::from(row))
                                                                  .execute(tx)?;
                    created.push(row.clone());
                }
                Ok(SelectionInsert::Created { created, duplicates })
            })
    }

    fn get_selection(&self, id: Uuid) -> Result<Option<ProgramSelection>, StoreError> {
        self.run("get_selection", |conn| {
                program_selections::table.find(id)
                                         .first::<SelectionRow>(conn)
                                         .optional()?
                                         .map(ProgramSelection::try_from)
                                         .transpose()
            })
    }

    fn transition_selection(&self, id: Uuid, from: SelectionStatus, to: SelectionStatus) -> Result<Option<ProgramSelection>, StoreError> {
        self.run("transition_selection", |conn| {
                diesel::update(program_selections::table.filter(program_selections::id.eq(id))
                                                        .filter(program_selections::status.eq(from.as_str())))
                .set((program_selections::status.eq(to.as_str()), program_selections::updated_at.eq(Utc::now())))
                .get_result::<SelectionRow>(conn)
                .optional()?
                .map(ProgramSelection::try_from)
                .transpose()
            })
    }

    fn replace_selection(&self, old_id: Uuid, capacity_limit: Option<u32>, replacement: &ProgramSelection)
                         -> Result<ReplaceOutcome, StoreError> {
        self.run_tx("replace_selection", |tx| {
                lock_program(tx, replacement.program_id)?;
                let old = program_selections::table.find(old_id)
                                                   .for_update()
                                                   .first::<SelectionRow>(tx)
                                                   .optional()?;
                match old {
                    Some(r) if r.status == SelectionStatus::Selected.as_str() => {}
                    _ => return Ok(ReplaceOutcome::Stale),
                }
                if has_active_selection(tx, replacement.program_id, replacement.sewadar_id)? {
                    return Ok(ReplaceOutcome::AlreadySelected);
                }
                let active = count_active_selections(tx, replacement.program_id)?;
                if exceeds_capacity(capacity_limit, active, 1) {
                    return Ok(ReplaceOutcome::CapacityExceeded { active });
                }
                let old = diesel::update(program_selections::table.find(old_id))
                    .set((program_selections::status.eq(SelectionStatus::Replaced.as_str()), program_selections::updated_at.eq(Utc::now())))
                    .get_result::<SelectionRow>(tx)?;
                diesel::insert_into(program_selections::table).values(&SelectionRow::from(replacement))
                                                              .execute(tx)?;
                Ok(ReplaceOutcome::Replaced { old: ProgramSelection::try_from(old)?,
                                              new: replacement.clone() })
            })
    }

    fn list_selections(&self, program_id: Uuid) -> Result<Vec<ProgramSelection>, StoreError> {
        self.run("list_selections", |conn| {
                let rows = program_selections::table.filter(program_selections::program_id.eq(program_id))
                                                    .order((program_selections::created_at.asc(), program_selections::id.asc()))
                                                    .load::<SelectionRow>(conn)?;
                convert_all(rows)
            })
    }
}

impl<P: ConnectionProvider> AttendanceStore for PgStore<P> {
    fn record_attendance(&self, row: &Attendance) -> Result<(), StoreError> {
        self.run("record_attendance", |conn| {
                diesel::insert_into(attendance::table).values(&AttendanceRow::from(row))
                                                      .execute(conn)?;
                Ok(())
            })
    }

    fn attendance_history(&self, sewadar_id: Uuid) -> Result<Vec<AttendanceRecord>, StoreError> {
        self.run("attendance_history", |conn| {
                let rows = attendance::table.inner_join(program_dates::table.inner_join(programs::table))
                                            .filter(attendance::sewadar_id.eq(sewadar_id))
                                            .order(program_dates::date.asc())
                                            .select((programs::id, programs::location, program_dates::date))
                                            .load::<(Uuid, String, NaiveDate)>(conn)?;
                Ok(rows.into_iter()
                       .map(|(program_id, location, date)| AttendanceRecord { program_id, location, date })
                       .collect())
            })
    }
}

impl<P: ConnectionProvider> WorkflowStore for PgStore<P> {
    fn find_workflow(&self, program_id: Uuid) -> Result<Option<ProgramWorkflow>, StoreError> {
        self.run("find_workflow", |conn| {
                program_workflows::table.filter(program_workflows::program_id.eq(program_id))
                                        .first::<WorkflowRow>(conn)
                                        .optional()?
                                        .map(ProgramWorkflow::try_from)
                                        .transpose()
            })
    }

    fn insert_workflow_if_absent(&self, workflow: &ProgramWorkflow) -> Result<ProgramWorkflow, StoreError> {
        self.run("insert_workflow_if_absent", |conn| {
                let inserted = diesel::insert_into(program_workflows::table).values(&WorkflowRow::from(workflow))
                                                                            .on_conflict(program_workflows::program_id)
                                                                            .do_nothing()
                                                                            .execute(conn)?;
                debug!("insert_workflow_if_absent program_id={} inserted={}", workflow.program_id(), inserted);
                let row = program_workflows::table.filter(program_workflows::program_id.eq(workflow.program_id()))
                                                  .first::<WorkflowRow>(conn)?;
                ProgramWorkflow::try_from(row)
            })
    }

    fn list_workflows(&self) -> Result<Vec<ProgramWorkflow>, StoreError> {
        self.run("list_workflows", |conn| {
                let rows = program_workflows::table.order((program_workflows::created_at.asc(), program_workflows::id.asc()))
                                                   .load::<WorkflowRow>(conn)?;
                convert_all(rows)
            })
    }

    fn transact_workflow(&self, program_id: Uuid, apply: &mut WorkflowMutation<'_>) -> Result<ProgramWorkflow, WorkflowError> {
        let result = with_retry(|| -> Result<ProgramWorkflow, TxError> {
            let mut conn = self.provider.connection()?;
            conn.build_transaction().read_write().run(|tx| {
                    let row = program_workflows::table.filter(program_workflows::program_id.eq(program_id))
                                                      .for_update()
                                                      .first::<WorkflowRow>(tx)
                                                      .optional()?
                                                      .ok_or_else(|| TxError::Rejected(WorkflowError::not_found("workflow", program_id)))?;
                    let program = programs::table.find(program_id)
                                                 .first::<ProgramRow>(tx)
                                                 .optional()?
                                                 .ok_or_else(|| TxError::Rejected(WorkflowError::not_found("program", program_id)))?;
                    let facts = load_facts(tx, Program::try_from(program)?)?;
                    let mut draft = ProgramWorkflow::try_from(row)?;
                    if !apply(&mut draft, &facts).map_err(TxError::Rejected)? {
                        return Ok(draft);
                    }
                    diesel::update(program_workflows::table.find(draft.id()))
                        .set((program_workflows::current_stage.eq(draft.current_stage().number()),
                              program_workflows::form_released.eq(draft.form_released()),
                              program_workflows::details_collected.eq(draft.details_collected()),
                              program_workflows::updated_at.eq(draft.updated_at())))
                        .execute(tx)?;
                    Ok(draft)
                })
        });
        match result {
            Ok(wf) => Ok(wf),
            Err(TxError::Rejected(e)) => Err(e),
            Err(TxError::Db(e)) => {
                error!("transact_workflow:failed program_id={} err={}", program_id, e);
                Err(WorkflowError::Store(e.into()))
            }
        }
    }
}

impl<P: ConnectionProvider> PreferenceStore for PgStore<P> {
    fn seed_preferences(&self, defaults: &[NotificationPreference]) -> Result<usize, StoreError> {
        self.run("seed_preferences", |conn| {
                let mut inserted = 0;
                for pref in defaults {
                    inserted += diesel::insert_into(notification_preferences::table).values(&PreferenceRow::from(pref))
                                                                                    .on_conflict(notification_preferences::stage)
                                                                                    .do_nothing()
                                                                                    .execute(conn)?;
                }
                Ok(inserted)
            })
    }

    fn get_preference(&self, stage: Stage) -> Result<Option<NotificationPreference>, StoreError> {
        self.run("get_preference", |conn| {
                notification_preferences::table.find(stage.number())
                                               .first::<PreferenceRow>(conn)
                                               .optional()?
                                               .map(NotificationPreference::try_from)
                                               .transpose()
            })
    }

    fn list_preferences(&self) -> Result<Vec<NotificationPreference>, StoreError> {
        self.run("list_preferences", |conn| {
                let rows = notification_preferences::table.order(notification_preferences::stage.asc())
                                                          .load::<PreferenceRow>(conn)?;
                convert_all(rows)
            })
    }

    fn upsert_preference(&self, preference: &NotificationPreference) -> Result<(), StoreError> {
        self.run("upsert_preference", |conn| {
                diesel::insert_into(notification_preferences::table)
                    .values(&PreferenceRow::from(preference))
                    .on_conflict(notification_preferences::stage)
                    .do_update()
                    .set((notification_preferences::enabled.eq(excluded(notification_preferences::enabled)),
                          notification_preferences::message_template.eq(excluded(notification_preferences::message_template))))
                    .execute(conn)?;
                Ok(())
            })
    }

    fn get_program_override(&self, program_id: Uuid, stage: Stage) -> Result<Option<ProgramNotificationPreference>, StoreError> {
        self.run("get_program_override", |conn| {
                program_notification_preferences::table.find((program_id, stage.number()))
                                                       .first::<OverrideRow>(conn)
                                                       .optional()?
                                                       .map(ProgramNotificationPreference::try_from)
                                                       .transpose()
            })
    }

    fn upsert_program_override(&self, preference: &ProgramNotificationPreference) -> Result<(), StoreError> {
        self.run("upsert_program_override", |conn| {
                diesel::insert_into(program_notification_preferences::table)
                    .values(&OverrideRow::from(preference))
                    .on_conflict((program_notification_preferences::program_id, program_notification_preferences::stage))
                    .do_update()
                    .set((program_notification_preferences::enabled.eq(excluded(program_notification_preferences::enabled)),
                          program_notification_preferences::message.eq(excluded(program_notification_preferences::message))))
                    .execute(conn)?;
                Ok(())
            })
    }

    fn delete_program_override(&self, program_id: Uuid, stage: Stage) -> Result<bool, StoreError> {
        self.run("delete_program_override", |conn| {
                let n = diesel::delete(program_notification_preferences::table.find((program_id, stage.number()))).execute(conn)?;
                Ok(n > 0)
            })
    }
}
