//! sewa-policies – Elegibilidad y priorización de sewadars
//!
//! Provee el índice de asistencia por categoría de ubicación y dos políticas
//! de puntuación deterministas (enteras):
//! - `AttendanceRankPolicy`: `10 × programas asistidos + días asistidos`, para
//!   ordenar solicitantes.
//! - `SelectionPriorityPolicy`: `10 × programas asistidos + ajuste por
//!   antigüedad`, usada al crear selecciones.
//!
//! Los empates conservan el orden de entrada (orden estable).

pub mod eligibility;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use eligibility::{AttendanceSummary, EligibilityIndex};

/// Peso de cada programa asistido en ambas puntuaciones.
pub const PROGRAM_WEIGHT: i64 = 10;

/// Datos de entrada para puntuar a un participante.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ScoreInput {
    pub sewadar_id: Uuid,
    pub attendance: AttendanceSummary,
    pub joined_on: Option<NaiveDate>,
}

/// Puntuación calculada con su explicación legible.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScoredCandidate {
    pub sewadar_id: Uuid,
    pub score: i64,
    pub policy_id: String,
    pub reason: String,
}

/// Contrato de políticas de priorización deterministas.
pub trait PrioritizationPolicy {
    fn id(&self) -> &'static str;
    fn score(&self, input: &ScoreInput) -> ScoredCandidate;

    /// Puntúa y ordena de mayor a menor; empates en orden de entrada.
    fn rank(&self, inputs: &[ScoreInput]) -> Vec<ScoredCandidate> {
        let mut scored: Vec<ScoredCandidate> = inputs.iter().map(|i| self.score(i)).collect();
        // sort_by es estable
        scored.sort_by(|a, b| b.score.cmp(&a.score));
        scored
    }
}

/// Política de ranking de solicitantes.
pub struct AttendanceRankPolicy;

impl PrioritizationPolicy for AttendanceRankPolicy {
    fn id(&self) -> &'static str {
        "attendance_rank"
    }

    fn score(&self, input: &ScoreInput) -> ScoredCandidate {
        let programs = input.attendance.total_programs() as i64;
        let days = input.attendance.total_days() as i64;
        ScoredCandidate { sewadar_id: input.sewadar_id,
                          score: PROGRAM_WEIGHT * programs + days,
                          policy_id: self.id().into(),
                          reason: format!("{programs} programs attended, {days} days") }
    }
}

/// Política de prioridad al seleccionar. `today` fija la fecha de referencia
/// para la antigüedad (inyectada para mantener determinismo en tests).
pub struct SelectionPriorityPolicy {
    pub today: NaiveDate,
}

impl SelectionPriorityPolicy {
    pub fn new(today: NaiveDate) -> Self {
        Self { today }
    }

    /// Años completos de servicio (nunca negativo). Crece con la antigüedad,
    /// favoreciendo a los sewadars más antiguos.
    pub fn tenure_adjustment(&self, joined_on: Option<NaiveDate>) -> i64 {
        // un punto por año completo: sube con la antigüedad, nunca decrece
        match joined_on {
            Some(joined) => ((self.today - joined).num_days() / 365).max(0),
            None => 0,
        }
    }
}

impl PrioritizationPolicy for SelectionPriorityPolicy {
    fn id(&self) -> &'static str {
        "selection_priority"
    }

    fn score(&self, input: &ScoreInput) -> ScoredCandidate {
        let programs = input.attendance.total_programs() as i64;
        let tenure = self.tenure_adjustment(input.joined_on);
        ScoredCandidate { sewadar_id: input.sewadar_id,
                          score: PROGRAM_WEIGHT * programs + tenure,
                          policy_id: self.id().into(),
                          reason: format!("{programs} programs attended, {tenure} years of service") }
    }
}
