//! Envío de una política ya resuelta a los destinatarios.
//!
//! Ninguna falla sale de aquí: ni la de listar destinatarios ni la de un
//! envío individual. Se registran y quedan contadas en el `DispatchReport`.
use std::ops::AddAssign;
use std::sync::Arc;

use log::{debug, warn};
use serde::Serialize;
use sewa_domain::{EffectivePolicy, Sewadar};

use super::notifier::Notifier;
use crate::repo::Store;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub attempted: usize,
    pub delivered: usize,
    pub failed: usize,
}

impl AddAssign for DispatchReport {
    fn add_assign(&mut self, rhs: Self) {
        self.attempted += rhs.attempted;
        self.delivered += rhs.delivered;
        self.failed += rhs.failed;
    }
}

pub struct NotificationDispatcher<S: Store> {
    store: Arc<S>,
    notifier: Arc<dyn Notifier>,
}

impl<S: Store> NotificationDispatcher<S> {
    pub fn new(store: Arc<S>, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, notifier }
    }

    /// Fan-out del mensaje a cada cuenta incharge con contacto.
    pub fn dispatch(&self, policy: &EffectivePolicy) -> DispatchReport {
        let mut report = DispatchReport::default();
        if !policy.is_deliverable() {
            debug!("dispatch:skip program_id={} stage={} enabled={}",
                   policy.program_id,
                   policy.stage.number(),
                   policy.enabled);
            return report;
        }
        let text = match policy.message.as_deref() {
            Some(t) => t,
            None => return report,
        };
        let accounts = match self.store.list_incharge_accounts() {
            Ok(a) => a,
            Err(e) => {
                warn!("dispatch:recipients_failed program_id={} stage={} err={}",
                      policy.program_id,
                      policy.stage.number(),
                      e);
                return report;
            }
        };
        for address in accounts.iter().filter_map(|a| a.incharge_contact()) {
            report += self.deliver(address, text);
        }
        debug!("dispatch:done program_id={} stage={} attempted={} delivered={} failed={}",
               policy.program_id,
               policy.stage.number(),
               report.attempted,
               report.delivered,
               report.failed);
        report
    }

    /// Aviso directo a un participante (p. ej. selección). Sin contacto no se
    /// intenta nada.
    pub fn notify_participant(&self, sewadar: &Sewadar, text: &str) -> DispatchReport {
        match sewadar.contact.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
            Some(address) => self.deliver(address, text),
            None => {
                debug!("dispatch:participant_no_contact sewadar_id={}", sewadar.id);
                DispatchReport::default()
            }
        }
    }

    fn deliver(&self, address: &str, text: &str) -> DispatchReport {
        match self.notifier.send(address, text) {
            Ok(()) => DispatchReport { attempted: 1,
                                       delivered: 1,
                                       failed: 0 },
            Err(e) => {
                warn!("dispatch:delivery_failed address={} err={}", address, e);
                DispatchReport { attempted: 1,
                                 delivered: 0,
                                 failed: 1 }
            }
        }
    }
}
