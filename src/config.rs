//! Configuración del scheduler.
//! Carga `.env` una sola vez y valida las variables propias de la aplicación;
//! la conexión a la base la resuelve `sewa_persistence::DbConfig`.
use std::env;

use once_cell::sync::Lazy;
use sewa_core::constants::{DEFAULT_PRIMARY_LOCATION, DEFAULT_SWEEP_HOUR};
use thiserror::Error;

static DOTENV_LOADED: Lazy<()> = Lazy::new(|| {
    let _ = dotenvy::dotenv(); // ignora error si no existe .env
});

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid {key}: {value:?} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Token que identifica la ubicación primaria (`SEWA_PRIMARY_LOCATION`).
    pub primary_location: String,
    /// Hora UTC del barrido diario, 0..=23 (`SEWA_SWEEP_HOUR`).
    pub sweep_hour: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self { primary_location: DEFAULT_PRIMARY_LOCATION.to_string(),
               sweep_hour: DEFAULT_SWEEP_HOUR }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Lazy::force(&DOTENV_LOADED);
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Igual que `from_env` con una fuente de variables arbitraria.
    pub fn from_lookup<F>(get: F) -> Result<Self, ConfigError>
        where F: Fn(&str) -> Option<String>
    {
        let mut cfg = AppConfig::default();
        if let Some(token) = get("SEWA_PRIMARY_LOCATION") {
            let token = token.trim();
            if !token.is_empty() {
                cfg.primary_location = token.to_string();
            }
        }
        if let Some(raw) = get("SEWA_SWEEP_HOUR") {
            cfg.sweep_hour = match raw.trim().parse::<u32>() {
                Ok(h) if h <= 23 => h,
                Ok(_) => return Err(ConfigError::Invalid { key: "SEWA_SWEEP_HOUR",
                                                           value: raw,
                                                           reason: "hour must be 0..=23" }),
                Err(_) => return Err(ConfigError::Invalid { key: "SEWA_SWEEP_HOUR",
                                                            value: raw,
                                                            reason: "not a number" }),
            };
        }
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        assert_eq!(AppConfig::from_lookup(lookup(&[])).unwrap(), AppConfig::default());
    }

    #[test]
    fn reads_overrides() {
        let cfg = AppConfig::from_lookup(lookup(&[("SEWA_PRIMARY_LOCATION", " Dera "), ("SEWA_SWEEP_HOUR", "23")])).unwrap();
        assert_eq!(cfg.primary_location, "Dera");
        assert_eq!(cfg.sweep_hour, 23);
    }

    #[test]
    fn rejects_out_of_range_hour() {
        let err = AppConfig::from_lookup(lookup(&[("SEWA_SWEEP_HOUR", "24")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "SEWA_SWEEP_HOUR", .. }));
        assert!(AppConfig::from_lookup(lookup(&[("SEWA_SWEEP_HOUR", "six")])).is_err());
    }
}
