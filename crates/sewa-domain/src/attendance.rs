// attendance.rs
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Presencia de un sewadar en una fecha de programa.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attendance {
    pub id: Uuid,
    pub sewadar_id: Uuid,
    pub program_date_id: Uuid,
}

impl Attendance {
    pub fn new(sewadar_id: Uuid, program_date_id: Uuid) -> Self {
        Self { id: Uuid::new_v4(),
               sewadar_id,
               program_date_id }
    }
}

/// Vista de lectura: una asistencia ya unida con su programa (lo que
/// necesitan el índice de elegibilidad y el scorer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub program_id: Uuid,
    pub location: String,
    pub date: NaiveDate,
}
