//! Filas Diesel y su mapeo a tipos de dominio.
//!
//! Los estados se guardan como texto en minúsculas (`as_str`) y las etapas
//! como su número 1..6. Una fila que no mapea se reporta como
//! `PersistenceError::Corrupt`.
use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use serde_json::Value;
use sewa_domain::{Account, ApplicationStatus, Attendance, DetailsSubmission, NotificationPreference, Program, ProgramApplication, ProgramDate,
                  ProgramNotificationPreference, ProgramSelection, ProgramStatus, ProgramWorkflow, Role, SelectionStatus, Sewadar, Stage};
use uuid::Uuid;

use crate::error::PersistenceError;
use crate::schema::*;

fn corrupt(e: impl std::fmt::Display) -> PersistenceError {
    PersistenceError::Corrupt(e.to_string())
}

pub(crate) fn stage_from_db(n: i32) -> Result<Stage, PersistenceError> {
    Stage::from_number(n).map_err(corrupt)
}

#[derive(Queryable, Debug)]
pub(crate) struct ProgramRow {
    pub id: Uuid,
    pub title: String,
    pub location: String,
    pub status: String,
    pub capacity_limit: Option<i32>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<ProgramRow> for Program {
    type Error = PersistenceError;
    fn try_from(r: ProgramRow) -> Result<Self, Self::Error> {
        let capacity_limit = r.capacity_limit
                              .map(u32::try_from)
                              .transpose()
                              .map_err(|_| corrupt(format!("negative capacity for program {}", r.id)))?;
        Ok(Program { id: r.id,
                     title: r.title,
                     location: r.location,
                     status: r.status.parse::<ProgramStatus>().map_err(corrupt)?,
                     capacity_limit,
                     created_by: r.created_by,
                     created_at: r.created_at })
    }
}

#[derive(Insertable)]
#[diesel(table_name = programs)]
pub(crate) struct NewProgramRow<'a> {
    pub id: Uuid,
    pub title: &'a str,
    pub location: &'a str,
    pub status: &'a str,
    pub capacity_limit: Option<i32>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

impl<'a> NewProgramRow<'a> {
    pub fn from_domain(p: &'a Program) -> Result<Self, PersistenceError> {
        let capacity_limit = p.capacity_limit
                              .map(i32::try_from)
                              .transpose()
                              .map_err(|_| PersistenceError::CheckViolation(format!("capacity out of range for program {}", p.id)))?;
        Ok(Self { id: p.id,
                  title: &p.title,
                  location: &p.location,
                  status: p.status.as_str(),
                  capacity_limit,
                  created_by: p.created_by,
                  created_at: p.created_at })
    }
}

#[derive(Queryable, Insertable, Debug)]
#[diesel(table_name = program_dates)]
pub(crate) struct ProgramDateRow {
    pub id: Uuid,
    pub program_id: Uuid,
    pub date: NaiveDate,
}

impl From<ProgramDateRow> for ProgramDate {
    fn from(r: ProgramDateRow) -> Self {
        ProgramDate { id: r.id,
                      program_id: r.program_id,
                      date: r.date }
    }
}

impl From<&ProgramDate> for ProgramDateRow {
    fn from(d: &ProgramDate) -> Self {
        ProgramDateRow { id: d.id,
                         program_id: d.program_id,
                         date: d.date }
    }
}

#[derive(Queryable, Insertable, Debug)]
#[diesel(table_name = sewadars)]
pub(crate) struct SewadarRow {
    pub id: Uuid,
    pub name: String,
    pub contact: Option<String>,
    pub joined_on: NaiveDate,
}

impl From<SewadarRow> for Sewadar {
    fn from(r: SewadarRow) -> Self {
        Sewadar { id: r.id,
                  name: r.name,
                  contact: r.contact,
                  joined_on: r.joined_on }
    }
}

impl From<&Sewadar> for SewadarRow {
    fn from(s: &Sewadar) -> Self {
        SewadarRow { id: s.id,
                     name: s.name.clone(),
                     contact: s.contact.clone(),
                     joined_on: s.joined_on }
    }
}

#[derive(Queryable, Insertable, Debug)]
#[diesel(table_name = accounts)]
pub(crate) struct AccountRow {
    pub id: Uuid,
    pub name: String,
    pub role: String,
    pub contact: Option<String>,
}

impl TryFrom<AccountRow> for Account {
    type Error = PersistenceError;
    fn try_from(r: AccountRow) -> Result<Self, Self::Error> {
        Ok(Account { id: r.id,
                     name: r.name,
                     role: r.role.parse::<Role>().map_err(corrupt)?,
                     contact: r.contact })
    }
}

impl From<&Account> for AccountRow {
    fn from(a: &Account) -> Self {
        AccountRow { id: a.id,
                     name: a.name.clone(),
                     role: a.role.as_str().to_string(),
                     contact: a.contact.clone() }
    }
}

#[derive(Queryable, Insertable, Debug)]
#[diesel(table_name = program_applications)]
pub(crate) struct ApplicationRow {
    pub id: Uuid,
    pub program_id: Uuid,
    pub sewadar_id: Uuid,
    pub status: String,
    pub applied_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<ApplicationRow> for ProgramApplication {
    type Error = PersistenceError;
    fn try_from(r: ApplicationRow) -> Result<Self, Self::Error> {
        Ok(ProgramApplication { id: r.id,
                                program_id: r.program_id,
                                sewadar_id: r.sewadar_id,
                                status: r.status.parse::<ApplicationStatus>().map_err(corrupt)?,
                                applied_at: r.applied_at,
                                updated_at: r.updated_at })
    }
}

impl From<&ProgramApplication> for ApplicationRow {
    fn from(a: &ProgramApplication) -> Self {
        ApplicationRow { id: a.id,
                         program_id: a.program_id,
                         sewadar_id: a.sewadar_id,
                         status: a.status.as_str().to_string(),
                         applied_at: a.applied_at,
                         updated_at: a.updated_at }
    }
}

#[derive(Queryable, Insertable, Debug)]
#[diesel(table_name = details_submissions)]
pub(crate) struct SubmissionRow {
    pub id: Uuid,
    pub program_id: Uuid,
    pub sewadar_id: Uuid,
    pub details: Value,
    pub submitted_at: DateTime<Utc>,
}

impl From<SubmissionRow> for DetailsSubmission {
    fn from(r: SubmissionRow) -> Self {
        DetailsSubmission { id: r.id,
                            program_id: r.program_id,
                            sewadar_id: r.sewadar_id,
                            details: r.details,
                            submitted_at: r.submitted_at }
    }
}

impl From<&DetailsSubmission> for SubmissionRow {
    fn from(s: &DetailsSubmission) -> Self {
        SubmissionRow { id: s.id,
                        program_id: s.program_id,
                        sewadar_id: s.sewadar_id,
                        details: s.details.clone(),
                        submitted_at: s.submitted_at }
    }
}

#[derive(Queryable, Insertable, Debug)]
#[diesel(table_name = program_selections)]
pub(crate) struct SelectionRow {
    pub id: Uuid,
    pub program_id: Uuid,
    pub sewadar_id: Uuid,
    pub selected_by: Uuid,
    pub status: String,
    pub priority_score: i64,
    pub reason: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<SelectionRow> for ProgramSelection {
    type Error = PersistenceError;
    fn try_from(r: SelectionRow) -> Result<Self, Self::Error> {
        Ok(ProgramSelection { id: r.id,
                              program_id: r.program_id,
                              sewadar_id: r.sewadar_id,
                              selected_by: r.selected_by,
                              status: r.status.parse::<SelectionStatus>().map_err(corrupt)?,
                              priority_score: r.priority_score,
                              reason: r.reason,
                              created_at: r.created_at,
                              updated_at: r.updated_at })
    }
}

impl From<&ProgramSelection> for SelectionRow {
    fn from(s: &ProgramSelection) -> Self {
        SelectionRow { id: s.id,
                       program_id: s.program_id,
                       sewadar_id: s.sewadar_id,
                       selected_by: s.selected_by,
                       status: s.status.as_str().to_string(),
                       priority_score: s.priority_score,
                       reason: s.reason.clone(),
                       created_at: s.created_at,
                       updated_at: s.updated_at }
    }
}

#[derive(Queryable, Insertable, Debug)]
#[diesel(table_name = program_workflows)]
pub(crate) struct WorkflowRow {
    pub id: Uuid,
    pub program_id: Uuid,
    pub current_stage: i32,
    pub form_released: bool,
    pub details_collected: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<WorkflowRow> for ProgramWorkflow {
    type Error = PersistenceError;
    fn try_from(r: WorkflowRow) -> Result<Self, Self::Error> {
        Ok(ProgramWorkflow::restore(r.id,
                                    r.program_id,
                                    stage_from_db(r.current_stage)?,
                                    r.form_released,
                                    r.details_collected,
                                    r.created_at,
                                    r.updated_at))
    }
}

impl From<&ProgramWorkflow> for WorkflowRow {
    fn from(w: &ProgramWorkflow) -> Self {
        WorkflowRow { id: w.id(),
                      program_id: w.program_id(),
                      current_stage: w.current_stage().number(),
                      form_released: w.form_released(),
                      details_collected: w.details_collected(),
                      created_at: w.created_at(),
                      updated_at: w.updated_at() }
    }
}

#[derive(Queryable, Insertable, Debug)]
#[diesel(table_name = notification_preferences)]
pub(crate) struct PreferenceRow {
    pub stage: i32,
    pub enabled: bool,
    pub message_template: String,
}

impl TryFrom<PreferenceRow> for NotificationPreference {
    type Error = PersistenceError;
    fn try_from(r: PreferenceRow) -> Result<Self, Self::Error> {
        Ok(NotificationPreference { stage: stage_from_db(r.stage)?,
                                    enabled: r.enabled,
                                    message_template: r.message_template })
    }
}

impl From<&NotificationPreference> for PreferenceRow {
    fn from(p: &NotificationPreference) -> Self {
        PreferenceRow { stage: p.stage.number(),
                        enabled: p.enabled,
                        message_template: p.message_template.clone() }
    }
}

#[derive(Queryable, Insertable, Debug)]
#[diesel(table_name = program_notification_preferences)]
pub(crate) struct OverrideRow {
    pub program_id: Uuid,
    pub stage: i32,
    pub enabled: Option<bool>,
    pub message: Option<String>,
}

impl TryFrom<OverrideRow> for ProgramNotificationPreference {
    type Error = PersistenceError;
    fn try_from(r: OverrideRow) -> Result<Self, Self::Error> {
        Ok(ProgramNotificationPreference { program_id: r.program_id,
                                           stage: stage_from_db(r.stage)?,
                                           enabled: r.enabled,
                                           message: r.message })
    }
}

impl From<&ProgramNotificationPreference> for OverrideRow {
    fn from(o: &ProgramNotificationPreference) -> Self {
        OverrideRow { program_id: o.program_id,
                      stage: o.stage.number(),
                      enabled: o.enabled,
                      message: o.message.clone() }
    }
}

#[derive(Insertable, Debug)]
#[diesel(table_name = attendance)]
pub(crate) struct AttendanceRow {
    pub id: Uuid,
    pub sewadar_id: Uuid,
    pub program_date_id: Uuid,
}

impl From<&Attendance> for AttendanceRow {
    fn from(a: &Attendance) -> Self {
        AttendanceRow { id: a.id,
                        sewadar_id: a.sewadar_id,
                        program_date_id: a.program_date_id }
    }
}

/// Convierte un lote de filas, abortando en la primera corrupta.
pub(crate) fn convert_all<R, T>(rows: Vec<R>) -> Result<Vec<T>, PersistenceError>
    where T: TryFrom<R, Error = PersistenceError>
{
    rows.into_iter().map(T::try_from).collect()
}
