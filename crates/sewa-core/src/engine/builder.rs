//! Builder del `WorkflowEngine`.
use std::sync::Arc;

use chrono::NaiveDate;

use super::core::WorkflowEngine;
use crate::constants::DEFAULT_PRIMARY_LOCATION;
use crate::notify::{LogNotifier, Notifier};
use crate::repo::Store;

/// Parámetros de ejecución del motor.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Token de ubicación primaria para la partición de asistencia.
    pub primary_location: String,
    /// Fecha de referencia fija para la antigüedad; `None` = hoy (UTC).
    pub today: Option<NaiveDate>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self { primary_location: DEFAULT_PRIMARY_LOCATION.to_string(),
               today: None }
    }
}

pub struct EngineBuilder<S: Store> {
    store: Arc<S>,
    notifier: Option<Arc<dyn Notifier>>,
    settings: EngineSettings,
}

impl<S: Store> EngineBuilder<S> {
    pub(crate) fn new(store: Arc<S>) -> Self {
        Self { store,
               notifier: None,
               settings: EngineSettings::default() }
    }

    /// Transporte de salida. Por defecto `LogNotifier`.
    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn primary_location(mut self, token: impl Into<String>) -> Self {
        self.settings.primary_location = token.into();
        self
    }

    pub fn today(mut self, today: NaiveDate) -> Self {
        self.settings.today = Some(today);
        self
    }

    pub fn settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn build(self) -> WorkflowEngine<S> {
        let notifier = self.notifier.unwrap_or_else(|| Arc::new(LogNotifier));
        WorkflowEngine::from_parts(self.store, notifier, self.settings)
    }
}
