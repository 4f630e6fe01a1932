//! Transporte saliente abstracto.
//!
//! El motor sólo conoce `Notifier::send`; el transporte real (SMS, correo)
//! vive fuera del workspace. `LogNotifier` es el transporte por defecto de
//! los binarios y `RecordingNotifier` el de los tests.
use std::collections::HashSet;
use std::sync::Mutex;

use log::info;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NotifyError {
    #[error("delivery to {address} failed: {reason}")]
    Delivery { address: String, reason: String },
    #[error("notifier unavailable: {0}")]
    Unavailable(String),
}

pub trait Notifier: Send + Sync {
    fn send(&self, address: &str, text: &str) -> Result<(), NotifyError>;
}

/// Registra cada envío en el log y siempre tiene éxito.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn send(&self, address: &str, text: &str) -> Result<(), NotifyError> {
        info!("notify:send address={} text={:?}", address, text);
        Ok(())
    }
}

/// Mensaje entregado por `RecordingNotifier`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub address: String,
    pub text: String,
}

/// Guarda los envíos en memoria. Las direcciones marcadas con `fail_for`
/// devuelven error sin registrarse.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<SentMessage>>,
    failing: Mutex<HashSet<String>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_for(&self, address: impl Into<String>) {
        if let Ok(mut f) = self.failing.lock() {
            f.insert(address.into());
        }
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn sent_to(&self, address: &str) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter(|m| m.address == address)
            .map(|m| m.text)
            .collect()
    }

    pub fn clear(&self) {
        if let Ok(mut s) = self.sent.lock() {
            s.clear();
        }
    }
}

impl Notifier for RecordingNotifier {
    fn send(&self, address: &str, text: &str) -> Result<(), NotifyError> {
        let failing = self.failing
                          .lock()
                          .map_err(|_| NotifyError::Unavailable("recording notifier poisoned".into()))?;
        if failing.contains(address) {
            return Err(NotifyError::Delivery { address: address.to_string(),
                                               reason: "configured to fail".into() });
        }
        drop(failing);
        self.sent
            .lock()
            .map_err(|_| NotifyError::Unavailable("recording notifier poisoned".into()))?
            .push(SentMessage { address: address.to_string(),
                                text: text.to_string() });
        Ok(())
    }
}
