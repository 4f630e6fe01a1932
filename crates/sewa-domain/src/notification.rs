// notification.rs
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Stage;

/// Marcador sustituido por el título del programa en las plantillas globales.
pub const PROGRAM_TITLE_PLACEHOLDER: &str = "{programTitle}";

/// Preferencia global por etapa (una fila por etapa).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPreference {
    pub stage: Stage,
    pub enabled: bool,
    pub message_template: String,
}

impl NotificationPreference {
    pub fn render(&self, program_title: &str) -> String {
        self.message_template.replace(PROGRAM_TITLE_PLACEHOLDER, program_title)
    }

    /// Las seis preferencias por defecto que se siembran cuando la tabla está
    /// vacía.
    pub fn defaults() -> Vec<NotificationPreference> {
        Stage::ALL.iter()
                  .map(|&stage| NotificationPreference { stage,
                                                         enabled: true,
                                                         message_template: default_template(stage).to_string() })
                  .collect()
    }
}

fn default_template(stage: Stage) -> &'static str {
    match stage {
        Stage::ActivateProgram => "Program '{programTitle}' is now active. Please review the program details.",
        Stage::PostApplicationCall => "Applications are open for '{programTitle}'. Please share the call with sewadars.",
        Stage::ReleaseForm => "Applications for '{programTitle}' are complete. Please release the details form.",
        Stage::CollectDetails => "The details form for '{programTitle}' is released. Please collect details from approved sewadars.",
        Stage::NotifyAreaSecretary => "Details for '{programTitle}' are collected. Please notify the area secretary.",
        Stage::PostGeneralInstructions => "Please post the general instructions for '{programTitle}'.",
    }
}

/// Override de un programa para una etapa. `None` significa "sin valor
/// propio" en cada campo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramNotificationPreference {
    pub program_id: Uuid,
    pub stage: Stage,
    pub enabled: Option<bool>,
    pub message: Option<String>,
}

/// Política efectiva ya resuelta para (programa, etapa).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectivePolicy {
    pub program_id: Uuid,
    pub stage: Stage,
    pub enabled: bool,
    /// `None` cuando no hay preferencia global para la etapa.
    pub message: Option<String>,
}

impl EffectivePolicy {
    /// Hay algo que enviar: habilitada y con texto no vacío.
    pub fn is_deliverable(&self) -> bool {
        self.enabled && self.message.as_deref().is_some_and(|m| !m.trim().is_empty())
    }
}
