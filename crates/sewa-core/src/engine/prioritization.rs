//! Lado de lectura: índice de asistencia por categoría y puntuaciones.
use sewa_domain::{ApplicationStatus, LocationCategory};
use sewa_policies::{AttendanceRankPolicy, AttendanceSummary, EligibilityIndex, PrioritizationPolicy, ScoreInput, ScoredCandidate,
                    SelectionPriorityPolicy};
use uuid::Uuid;

use super::core::WorkflowEngine;
use crate::errors::WorkflowError;
use crate::repo::Store;

impl<S: Store> WorkflowEngine<S> {
    fn eligibility_index(&self, sewadar_id: Uuid) -> Result<EligibilityIndex, WorkflowError> {
        let history = self.store.attendance_history(sewadar_id)?;
        Ok(EligibilityIndex::build(&self.settings.primary_location, &history))
    }

    /// Programas distintos asistidos en la categoría.
    pub fn count_programs_by_category(&self, sewadar_id: Uuid, category: LocationCategory) -> Result<u32, WorkflowError> {
        Ok(self.eligibility_index(sewadar_id)?.count_programs_by_category(category))
    }

    /// Fechas asistidas en la categoría.
    pub fn sum_days_by_category(&self, sewadar_id: Uuid, category: LocationCategory) -> Result<u32, WorkflowError> {
        Ok(self.eligibility_index(sewadar_id)?.sum_days_by_category(category))
    }

    pub fn attendance_summary(&self, sewadar_id: Uuid) -> Result<AttendanceSummary, WorkflowError> {
        Ok(self.eligibility_index(sewadar_id)?.summary())
    }

    pub(crate) fn score_input(&self, sewadar_id: Uuid) -> Result<ScoreInput, WorkflowError> {
        let joined_on = self.store.get_sewadar(sewadar_id)?.map(|s| s.joined_on);
        Ok(ScoreInput { sewadar_id,
                        attendance: self.attendance_summary(sewadar_id)?,
                        joined_on })
    }

    /// Puntuación de selección (asistencia + antigüedad) de un participante.
    pub fn selection_score(&self, sewadar_id: Uuid) -> Result<ScoredCandidate, WorkflowError> {
        let policy = SelectionPriorityPolicy::new(self.today());
        Ok(policy.score(&self.score_input(sewadar_id)?))
    }

    /// Solicitantes `Pending` y `Approved` ordenados por puntuación de
    /// asistencia, de mayor a menor; empates en orden de solicitud.
    pub fn rank_applicants(&self, program_id: Uuid) -> Result<Vec<ScoredCandidate>, WorkflowError> {
        self.load_program(program_id)?;
        let inputs = self.store
                         .list_applications(program_id)?
                         .into_iter()
                         .filter(|a| matches!(a.status, ApplicationStatus::Pending | ApplicationStatus::Approved))
                         .map(|a| self.score_input(a.sewadar_id))
                         .collect::<Result<Vec<_>, _>>()?;
        Ok(AttendanceRankPolicy.rank(&inputs))
    }
}
