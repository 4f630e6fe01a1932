//! Índice de asistencia por categoría de ubicación.
//!
//! Agregación de sólo lectura sobre el historial de asistencia de un
//! participante: cuántos programas distintos y cuántos días asistió, separado
//! en la ubicación primaria frente al resto.
use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use sewa_domain::{AttendanceRecord, LocationCategory};
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
pub struct EligibilityIndex {
    primary_programs: HashSet<Uuid>,
    other_programs: HashSet<Uuid>,
    primary_days: u32,
    other_days: u32,
}

/// Resumen de los cuatro contadores (uso en tablero).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AttendanceSummary {
    pub primary_programs: u32,
    pub primary_days: u32,
    pub other_programs: u32,
    pub other_days: u32,
}

impl AttendanceSummary {
    pub fn total_programs(&self) -> u32 {
        self.primary_programs + self.other_programs
    }
    pub fn total_days(&self) -> u32 {
        self.primary_days + self.other_days
    }
}

impl EligibilityIndex {
    /// Construye el índice. Cada registro es una fecha asistida; un mismo
    /// programa con varias fechas cuenta una vez como programa.
    pub fn build(primary_token: &str, records: &[AttendanceRecord]) -> Self {
        let mut idx = EligibilityIndex::default();
        for r in records {
            match LocationCategory::classify(&r.location, primary_token) {
                LocationCategory::Primary => {
                    idx.primary_programs.insert(r.program_id);
                    idx.primary_days += 1;
                }
                LocationCategory::Other => {
                    idx.other_programs.insert(r.program_id);
                    idx.other_days += 1;
                }
            }
        }
        idx
    }

    pub fn count_programs_by_category(&self, category: LocationCategory) -> u32 {
        match category {
            LocationCategory::Primary => self.primary_programs.len() as u32,
            LocationCategory::Other => self.other_programs.len() as u32,
        }
    }

    pub fn sum_days_by_category(&self, category: LocationCategory) -> u32 {
        match category {
            LocationCategory::Primary => self.primary_days,
            LocationCategory::Other => self.other_days,
        }
    }

    pub fn summary(&self) -> AttendanceSummary {
        AttendanceSummary { primary_programs: self.count_programs_by_category(LocationCategory::Primary),
                            primary_days: self.primary_days,
                            other_programs: self.count_programs_by_category(LocationCategory::Other),
                            other_days: self.other_days }
    }
}
