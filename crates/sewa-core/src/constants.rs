//! Constantes del motor core.

/// Token de ubicación primaria usado cuando la configuración no define otro.
/// Las ubicaciones de programa se comparan contra él sin distinguir
/// mayúsculas.
pub const DEFAULT_PRIMARY_LOCATION: &str = "BEAS";

/// Hora (UTC) por defecto del barrido diario de notificaciones.
pub const DEFAULT_SWEEP_HOUR: u32 = 6;
