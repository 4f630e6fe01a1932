//! Contratos de almacenamiento que consume el motor.
//!
//! Cada trait agrupa las lecturas/escrituras de una entidad. Los backends
//! (in-memory en este crate, Postgres en `sewa-persistence`) implementan todos
//! y quedan agrupados por el supertrait `Store`.
//!
//! Contratos transaccionales relevantes:
//! - `WorkflowStore::transact_workflow`: read-modify-write atómico sobre UNA
//!   fila de workflow, serializando escritores concurrentes del mismo
//!   programa. Los hechos (`WorkflowFacts`) se leen dentro de la misma unidad.
//! - `SelectionStore::create_selections`: chequeo de cupo + inserciones en una
//!   sola unidad (todo o nada frente al cupo).
//! - Cambios de estado de solicitudes/selecciones son compare-and-set: devuelven
//!   `None` si el estado actual ya no es el esperado.
use std::collections::HashSet;

use sewa_domain::{Account, ApplicationStatus, Attendance, AttendanceRecord, DetailsSubmission, NotificationPreference, Program, ProgramApplication,
                  ProgramDate, ProgramNotificationPreference, ProgramSelection, ProgramStatus, ProgramWorkflow, SelectionStatus, Sewadar, Stage};
use uuid::Uuid;

use crate::errors::{StoreError, WorkflowError};

pub trait ProgramStore {
    fn insert_program(&self, program: &Program) -> Result<(), StoreError>;
    fn get_program(&self, id: Uuid) -> Result<Option<Program>, StoreError>;
    /// `false` si el programa no existe.
    fn update_program_status(&self, id: Uuid, status: ProgramStatus) -> Result<bool, StoreError>;
    /// Borra en cascada fechas, solicitudes, envíos, selecciones, asistencia,
    /// overrides y workflow. `false` si no existía.
    fn delete_program(&self, id: Uuid) -> Result<bool, StoreError>;
    fn insert_program_date(&self, date: &ProgramDate) -> Result<(), StoreError>;
    fn list_program_dates(&self, program_id: Uuid) -> Result<Vec<ProgramDate>, StoreError>;
    /// Borra la fecha y sólo la asistencia de esa fecha.
    fn delete_program_date(&self, id: Uuid) -> Result<bool, StoreError>;
}

pub trait DirectoryStore {
    fn insert_sewadar(&self, sewadar: &Sewadar) -> Result<(), StoreError>;
    fn get_sewadar(&self, id: Uuid) -> Result<Option<Sewadar>, StoreError>;
    fn insert_account(&self, account: &Account) -> Result<(), StoreError>;
    /// Cuentas con capacidad incharge (con o sin contacto).
    fn list_incharge_accounts(&self) -> Result<Vec<Account>, StoreError>;
}

pub trait ApplicationStore {
    /// `Conflict` si ya existe una solicitud para (programa, sewadar).
    fn insert_application(&self, application: &ProgramApplication) -> Result<(), StoreError>;
    fn get_application(&self, id: Uuid) -> Result<Option<ProgramApplication>, StoreError>;
    fn find_application(&self, program_id: Uuid, sewadar_id: Uuid) -> Result<Option<ProgramApplication>, StoreError>;
    fn transition_application(&self, id: Uuid, from: ApplicationStatus, to: ApplicationStatus) -> Result<Option<ProgramApplication>, StoreError>;
    fn list_applications(&self, program_id: Uuid) -> Result<Vec<ProgramApplication>, StoreError>;
    /// Un envío por (programa, sewadar); reenviar reemplaza el contenido.
    fn upsert_submission(&self, submission: &DetailsSubmission) -> Result<(), StoreError>;
    fn list_submissions(&self, program_id: Uuid) -> Result<Vec<DetailsSubmission>, StoreError>;
}

/// Resultado de `create_selections`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionInsert {
    Created {
        created: Vec<ProgramSelection>,
        /// Sewadars rechazados individualmente por tener ya una selección
        /// activa.
        duplicates: Vec<Uuid>,
    },
    /// Nada fue insertado.
    CapacityExceeded { active: u32 },
}

/// Resultado de `replace_selection`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplaceOutcome {
    Replaced { old: ProgramSelection, new: ProgramSelection },
    /// La selección original ya no está en `Selected`.
    Stale,
    /// El reemplazo ya tiene una selección activa en el programa.
    AlreadySelected,
    /// La fila nueva excedería el cupo; nada cambió.
    CapacityExceeded { active: u32 },
}

/// Regla de cupo compartida por los backends: `active + requested > limit`.
/// Sin límite nunca se excede.
pub fn exceeds_capacity(limit: Option<u32>, active: u32, requested: usize) -> bool {
    limit.is_some_and(|l| active as usize + requested > l as usize)
}

pub trait SelectionStore {
    /// Atómico: si `capacity_limit` está definido y `selecciones activas +
    /// batch_size > capacity_limit` no inserta nada. Si no, inserta cada fila
    /// cuyo sewadar no tenga selección activa. Activa = no `Dropped`.
    fn create_selections(&self, program_id: Uuid, capacity_limit: Option<u32>, batch_size: usize, rows: &[ProgramSelection])
                         -> Result<SelectionInsert, StoreError>;
    fn get_selection(&self, id: Uuid) -> Result<Option<ProgramSelection>, StoreError>;
    fn transition_selection(&self, id: Uuid, from: SelectionStatus, to: SelectionStatus) -> Result<Option<ProgramSelection>, StoreError>;
    /// Atómico: la original pasa a `Replaced` (sigue activa) y se inserta
    /// `replacement`, con el mismo chequeo de cupo que un lote de uno.
    fn replace_selection(&self, old_id: Uuid, capacity_limit: Option<u32>, replacement: &ProgramSelection)
                         -> Result<ReplaceOutcome, StoreError>;
    fn list_selections(&self, program_id: Uuid) -> Result<Vec<ProgramSelection>, StoreError>;
}

pub trait AttendanceStore {
    /// `Conflict` si ya existe asistencia para (sewadar, fecha).
    fn record_attendance(&self, attendance: &Attendance) -> Result<(), StoreError>;
    /// Historial del sewadar unido con la ubicación de cada programa.
    fn attendance_history(&self, sewadar_id: Uuid) -> Result<Vec<AttendanceRecord>, StoreError>;
}

/// Hechos del programa leídos dentro de la transacción del workflow.
#[derive(Debug, Clone)]
pub struct WorkflowFacts {
    pub program: Program,
    /// Sewadars con solicitud `Approved`, en orden de solicitud.
    pub approved: Vec<Uuid>,
    /// Sewadars con envío de detalles.
    pub submitted: HashSet<Uuid>,
}

impl WorkflowFacts {
    pub fn approved_count(&self) -> usize {
        self.approved.len()
    }

    /// Aprobados sin envío, conservando el orden de `approved`.
    pub fn missing_submissions(&self) -> Vec<Uuid> {
        self.approved
            .iter()
            .filter(|id| !self.submitted.contains(id))
            .copied()
            .collect()
    }
}

/// Mutación aplicada bajo lock. Devuelve `Ok(true)` si modificó el workflow
/// (se persiste), `Ok(false)` si no (nada se escribe) o un error (rollback).
pub type WorkflowMutation<'a> = dyn FnMut(&mut ProgramWorkflow, &WorkflowFacts) -> Result<bool, WorkflowError> + 'a;

pub trait WorkflowStore {
    fn find_workflow(&self, program_id: Uuid) -> Result<Option<ProgramWorkflow>, StoreError>;
    /// Inserta si no existe fila para el programa (FK única) y devuelve la
    /// fila vigente, sea la recién creada o la de un escritor concurrente.
    fn insert_workflow_if_absent(&self, workflow: &ProgramWorkflow) -> Result<ProgramWorkflow, StoreError>;
    fn list_workflows(&self) -> Result<Vec<ProgramWorkflow>, StoreError>;
    /// Read-modify-write atómico de la fila del programa. `NotFound` si no
    /// existe el workflow o el programa.
    fn transact_workflow(&self, program_id: Uuid, apply: &mut WorkflowMutation<'_>) -> Result<ProgramWorkflow, WorkflowError>;
}

pub trait PreferenceStore {
    /// Siembra idempotente (respeta filas existentes). Devuelve cuántas
    /// insertó.
    fn seed_preferences(&self, defaults: &[NotificationPreference]) -> Result<usize, StoreError>;
    fn get_preference(&self, stage: Stage) -> Result<Option<NotificationPreference>, StoreError>;
    fn list_preferences(&self) -> Result<Vec<NotificationPreference>, StoreError>;
    fn upsert_preference(&self, preference: &NotificationPreference) -> Result<(), StoreError>;
    fn get_program_override(&self, program_id: Uuid, stage: Stage) -> Result<Option<ProgramNotificationPreference>, StoreError>;
    fn upsert_program_override(&self, preference: &ProgramNotificationPreference) -> Result<(), StoreError>;
    fn delete_program_override(&self, program_id: Uuid, stage: Stage) -> Result<bool, StoreError>;
}

/// Backend completo requerido por el motor.
pub trait Store:
    ProgramStore + DirectoryStore + ApplicationStore + SelectionStore + AttendanceStore + WorkflowStore + PreferenceStore + Send + Sync
{
}

impl<T> Store for T where T: ProgramStore
                             + DirectoryStore
                             + ApplicationStore
                             + SelectionStore
                             + AttendanceStore
                             + WorkflowStore
                             + PreferenceStore
                             + Send
                             + Sync
{
}
