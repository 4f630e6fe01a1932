//! Backend Postgres (Diesel) de los traits de almacenamiento del core.
//!
//! - Cada operación toma una conexión del pool y corre dentro de
//!   `with_retry` (conflictos de serialización / IO transitorio).
//! - Las unidades atómicas (`transact_workflow`, `create_selections`,
//!   `replace_selection`) usan `build_transaction().read_write()` y bloquean
//!   la fila relevante con `SELECT … FOR UPDATE`.
//! - Borrados en cascada delegados a las FKs `ON DELETE CASCADE`.

mod rows;
mod store;

use std::time::Duration;

use diesel::pg::PgConnection;
use diesel::r2d2::{self, ConnectionManager};
use log::warn;

use crate::error::PersistenceError;
use crate::migrations::run_pending_migrations;

pub use store::PgStore;

/// Pool r2d2 de conexiones Postgres.
pub type PgPool = r2d2::Pool<ConnectionManager<PgConnection>>;
pub type PgPooledConnection = r2d2::PooledConnection<ConnectionManager<PgConnection>>;

/// Proveedor abstracto de conexiones (pool real o doble de test).
pub trait ConnectionProvider: Send + Sync + 'static {
    fn connection(&self) -> Result<PgPooledConnection, PersistenceError>;
}

pub struct PoolProvider {
    pub pool: PgPool,
}

impl ConnectionProvider for PoolProvider {
    fn connection(&self) -> Result<PgPooledConnection, PersistenceError> {
        self.pool
            .get()
            .map_err(|e| PersistenceError::TransientIo(format!("pool error: {e}")))
    }
}

/// Errores que admiten reintento de la unidad de trabajo.
pub(crate) trait Retryable {
    fn is_retryable(&self) -> bool;
}

impl Retryable for PersistenceError {
    fn is_retryable(&self) -> bool {
        match self {
            PersistenceError::SerializationConflict | PersistenceError::TransientIo(_) => true,
            // algunos drivers sólo reportan texto
            PersistenceError::Unknown(msg) => {
                let m = msg.to_lowercase();
                m.contains("deadlock detected")
                || m.contains("could not serialize access")
                || m.contains("connection closed")
                || m.contains("terminating connection")
            }
            _ => false,
        }
    }
}

/// Reintenta `f` hasta 3 veces con backoff 15/30/45 ms.
pub(crate) fn with_retry<F, T, E>(mut f: F) -> Result<T, E>
    where F: FnMut() -> Result<T, E>,
          E: Retryable + std::fmt::Debug
{
    let mut attempts = 0u64;
    loop {
        match f() {
            Err(e) if e.is_retryable() && attempts < 3 => {
                attempts += 1;
                let delay_ms = 15 * attempts;
                warn!("retry:attempt n={} err={:?} sleep_ms={}", attempts, e, delay_ms);
                std::thread::sleep(Duration::from_millis(delay_ms));
            }
            r => return r,
        }
    }
}

/// Construye el pool y aplica migraciones pendientes en el primer checkout.
pub fn build_pool(database_url: &str, min_size: u32, max_size: u32) -> Result<PgPool, PersistenceError> {
    let max = max_size.max(1);
    let min = min_size.max(1).min(max);
    if min_size > max_size {
        warn!("pool:adjust min={} > max={}, using min=max", min_size, max_size);
    }
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    let pool = r2d2::Pool::builder().min_idle(Some(min))
                                    .max_size(max)
                                    .build(manager)
                                    .map_err(|e| PersistenceError::TransientIo(format!("pool build: {e}")))?;
    {
        let mut conn = pool.get()
                           .map_err(|e| PersistenceError::TransientIo(format!("pool get for migrations: {e}")))?;
        run_pending_migrations(&mut conn)?;
    }
    Ok(pool)
}

/// Carga `.env`, lee `DbConfig` y construye un pool ya migrado.
pub fn build_pool_from_env() -> Result<PgPool, PersistenceError> {
    let cfg = crate::config::DbConfig::from_env()?;
    build_pool(&cfg.url, cfg.min_connections, cfg.max_connections)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn retries_transient_errors_then_succeeds() {
        let calls = Cell::new(0);
        let r: Result<u32, PersistenceError> = with_retry(|| {
            calls.set(calls.get() + 1);
            if calls.get() < 3 {
                Err(PersistenceError::SerializationConflict)
            } else {
                Ok(7)
            }
        });
        assert_eq!(r.unwrap(), 7);
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn gives_up_after_three_retries() {
        let calls = Cell::new(0);
        let r: Result<(), PersistenceError> = with_retry(|| {
            calls.set(calls.get() + 1);
            Err(PersistenceError::TransientIo("down".into()))
        });
        assert!(r.is_err());
        assert_eq!(calls.get(), 4);
    }

    #[test]
    fn constraint_errors_are_not_retried() {
        let calls = Cell::new(0);
        let r: Result<(), PersistenceError> = with_retry(|| {
            calls.set(calls.get() + 1);
            Err(PersistenceError::UniqueViolation("dup".into()))
        });
        assert!(r.is_err());
        assert_eq!(calls.get(), 1);
    }
}
