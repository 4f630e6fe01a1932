//! sewa-persistence
//!
//! Backend Postgres (Diesel + r2d2) de los traits de almacenamiento de
//! `sewa-core`, más utilidades de conexión y migraciones embebidas.
//!
//! Módulos:
//! - `pg`: `PgStore`, pool y reintentos.
//! - `migrations`: runner embebido de migraciones Diesel.
//! - `config`: carga de configuración desde .env.
//! - `schema`: tablas Diesel (en paridad con `migrations/`).

pub mod config;
pub mod error;
pub mod migrations;
pub mod pg;
pub mod schema;

pub use config::{init_dotenv, DbConfig};
pub use error::PersistenceError;
pub use pg::{build_pool, build_pool_from_env, ConnectionProvider, PgPool, PgStore, PoolProvider};
