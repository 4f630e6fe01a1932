//! Resolución de la política efectiva de notificación por (programa, etapa).
//!
//! Reglas:
//! - `enabled` efectivo = existe override Y su `enabled == Some(true)`. El
//!   flag global no participa.
//! - Texto: mensaje del override tal cual (sin sustituir marcadores) o, si no
//!   hay, la plantilla global con `{programTitle}` sustituido.
//! - Sin fila global para la etapa no hay texto, aunque esté habilitada.
use std::sync::Arc;

use log::{debug, info};
use once_cell::sync::OnceCell;
use sewa_domain::{Caller, EffectivePolicy, NotificationPreference, Program, ProgramNotificationPreference, Stage};
use uuid::Uuid;

use crate::errors::{StoreError, ValidationFailure, WorkflowError};
use crate::repo::Store;

pub struct NotificationPolicyResolver<S: Store> {
    store: Arc<S>,
    seeded: OnceCell<usize>,
}

impl<S: Store> NotificationPolicyResolver<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store,
               seeded: OnceCell::new() }
    }

    /// Siembra las seis preferencias por defecto una sola vez por proceso.
    /// La unicidad por etapa hace que repetirla (otro proceso) sea inocua.
    pub fn ensure_seeded(&self) -> Result<usize, StoreError> {
        self.seeded
            .get_or_try_init(|| {
                let inserted = self.store.seed_preferences(&NotificationPreference::defaults())?;
                if inserted > 0 {
                    info!("preferences:seed inserted={}", inserted);
                }
                Ok(inserted)
            })
            .copied()
    }

    pub fn resolve(&self, program: &Program, stage: Stage) -> Result<EffectivePolicy, StoreError> {
        self.ensure_seeded()?;
        let over = self.store.get_program_override(program.id, stage)?;
        let global = self.store.get_preference(stage)?;
        Ok(merge(program, stage, over.as_ref(), global.as_ref()))
    }

    /// Las seis políticas efectivas del programa, en orden de etapa.
    pub fn effective_policies(&self, program: &Program) -> Result<Vec<EffectivePolicy>, StoreError> {
        Stage::ALL.iter().map(|&s| self.resolve(program, s)).collect()
    }

    pub fn set_global_preference(&self, stage: Stage, enabled: bool, template: impl Into<String>) -> Result<NotificationPreference, WorkflowError> {
        let template = template.into();
        if template.trim().is_empty() {
            return Err(ValidationFailure::InvalidState("message template must not be empty".into()).into());
        }
        self.ensure_seeded()?;
        let pref = NotificationPreference { stage,
                                            enabled,
                                            message_template: template };
        self.store.upsert_preference(&pref)?;
        info!("preferences:set stage={} enabled={}", stage.number(), enabled);
        Ok(pref)
    }

    pub fn set_program_override(&self,
                                caller: &Caller,
                                program_id: Uuid,
                                stage: Stage,
                                enabled: Option<bool>,
                                message: Option<String>)
                                -> Result<ProgramNotificationPreference, WorkflowError> {
        require_incharge(caller)?;
        if self.store.get_program(program_id)?.is_none() {
            return Err(WorkflowError::not_found("program", program_id));
        }
        let over = ProgramNotificationPreference { program_id,
                                                   stage,
                                                   enabled,
                                                   message };
        self.store.upsert_program_override(&over)?;
        info!("override:set program_id={} stage={} enabled={:?}", program_id, stage.number(), enabled);
        Ok(over)
    }

    /// `true` si existía un override.
    pub fn clear_program_override(&self, caller: &Caller, program_id: Uuid, stage: Stage) -> Result<bool, WorkflowError> {
        require_incharge(caller)?;
        let removed = self.store.delete_program_override(program_id, stage)?;
        debug!("override:clear program_id={} stage={} removed={}", program_id, stage.number(), removed);
        Ok(removed)
    }
}

pub(crate) fn require_incharge(caller: &Caller) -> Result<(), WorkflowError> {
    if caller.is_incharge() {
        Ok(())
    } else {
        Err(ValidationFailure::MissingCapability { account_id: caller.account_id }.into())
    }
}

fn merge(program: &Program,
         stage: Stage,
         over: Option<&ProgramNotificationPreference>,
         global: Option<&NotificationPreference>)
         -> EffectivePolicy {
    let enabled = over.and_then(|o| o.enabled) == Some(true);
    let message = global.map(|g| match over.and_then(|o| o.message.clone()) {
                            Some(custom) => custom,
                            None => g.render(&program.title),
                        });
    EffectivePolicy { program_id: program.id,
                      stage,
                      enabled,
                      message }
}
