//! sewaflow
//!
//! Servicio que acompaña al motor de workflow de programas:
//! - `config`: variables de la aplicación (ubicación primaria, hora del
//!   barrido) cargadas desde `.env`.
//! - `scheduler`: disparador diario del barrido de notificaciones.
//!
//! El motor vive en `sewa-core`; el backend Postgres en `sewa-persistence`.

pub mod config;
pub mod scheduler;

pub use config::{AppConfig, ConfigError};
pub use scheduler::{run, sweep_once, DailyTrigger, SchedulerError};
