//! Motor del workflow de programas.
//!
//! Cada operación que muta el workflow sigue el mismo ciclo:
//! 1. carga el programa (`NotFound` si no existe) e inicializa el workflow de
//!    forma perezosa;
//! 2. aplica la transición dentro de `transact_workflow` (lock de fila);
//! 3. tras el commit, despacha la notificación de cada etapa nueva.
//!
//! El despacho nunca hace fallar la transición: sus errores se registran y se
//! descartan.
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use log::{debug, info, warn};
use serde::Serialize;
use sewa_domain::{Caller, EffectivePolicy, Program, ProgramWorkflow, Stage};
use uuid::Uuid;

use super::builder::{EngineBuilder, EngineSettings};
use crate::errors::{ValidationFailure, WorkflowError};
use crate::notify::policy::require_incharge;
use crate::notify::{DispatchReport, NotificationDispatcher, NotificationPolicyResolver, Notifier};
use crate::repo::{Store, WorkflowFacts};

/// Vista para operadores: fila de workflow, nombre de la etapa y las seis
/// políticas efectivas del programa.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowStatus {
    pub program: Program,
    pub workflow: ProgramWorkflow,
    pub stage_name: &'static str,
    pub policies: Vec<EffectivePolicy>,
}

pub struct WorkflowEngine<S: Store> {
    pub(crate) store: Arc<S>,
    pub(crate) resolver: NotificationPolicyResolver<S>,
    pub(crate) dispatcher: NotificationDispatcher<S>,
    pub(crate) settings: EngineSettings,
}

impl<S: Store> WorkflowEngine<S> {
    #[inline]
    pub fn builder(store: Arc<S>) -> EngineBuilder<S> {
        EngineBuilder::new(store)
    }

    pub(crate) fn from_parts(store: Arc<S>, notifier: Arc<dyn Notifier>, settings: EngineSettings) -> Self {
        Self { resolver: NotificationPolicyResolver::new(store.clone()),
               dispatcher: NotificationDispatcher::new(store.clone(), notifier),
               store,
               settings }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn resolver(&self) -> &NotificationPolicyResolver<S> {
        &self.resolver
    }

    pub fn dispatcher(&self) -> &NotificationDispatcher<S> {
        &self.dispatcher
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub(crate) fn today(&self) -> NaiveDate {
        self.settings.today.unwrap_or_else(|| Utc::now().date_naive())
    }

    pub(crate) fn load_program(&self, program_id: Uuid) -> Result<Program, WorkflowError> {
        self.store
            .get_program(program_id)?
            .ok_or_else(|| WorkflowError::not_found("program", program_id))
    }

    /// Workflow del programa, creándolo en la etapa 1 si no existe. Seguro
    /// ante llamadas concurrentes: gana la primera inserción.
    pub fn get_or_initialize(&self, program_id: Uuid) -> Result<ProgramWorkflow, WorkflowError> {
        self.load_program(program_id)?;
        if let Some(wf) = self.store.find_workflow(program_id)? {
            return Ok(wf);
        }
        let wf = self.store.insert_workflow_if_absent(&ProgramWorkflow::new(program_id))?;
        debug!("workflow:init program_id={} workflow_id={}", program_id, wf.id());
        Ok(wf)
    }

    /// Avance manual a la etapa siguiente. En la etapa 6 devuelve el workflow
    /// sin cambios.
    pub fn advance(&self, caller: &Caller, program_id: Uuid) -> Result<ProgramWorkflow, WorkflowError> {
        require_incharge(caller)?;
        self.transition(program_id, "advance", |wf, _, entered| {
                entered.extend(wf.advance());
                Ok(())
            })
    }

    /// 3→4 abriendo el formulario. Fuera de la etapa 3 es un no-op.
    pub fn release_form(&self, caller: &Caller, program_id: Uuid) -> Result<ProgramWorkflow, WorkflowError> {
        require_incharge(caller)?;
        self.transition(program_id, "release_form", |wf, _, entered| {
                entered.extend(wf.release_form());
                Ok(())
            })
    }

    /// 4→5 si todo participante aprobado envió sus detalles; si no, falla
    /// nombrando a los que faltan y nada cambia. Fuera de la etapa 4 es un
    /// no-op.
    pub fn mark_details_collected(&self, caller: &Caller, program_id: Uuid) -> Result<ProgramWorkflow, WorkflowError> {
        require_incharge(caller)?;
        self.transition(program_id, "mark_details_collected", |wf, facts, entered| {
                if wf.current_stage() != Stage::CollectDetails {
                    return Ok(());
                }
                let missing = facts.missing_submissions();
                if !missing.is_empty() {
                    return Err(ValidationFailure::MissingSubmissions { participants: missing }.into());
                }
                entered.extend(wf.mark_details_collected());
                Ok(())
            })
    }

    /// Avances automáticos según el estado del programa:
    /// - 1→2 cuando el programa está `Active`;
    /// - 2→3 cuando los aprobados alcanzan el cupo (sólo con cupo definido).
    ///
    /// Las reglas se reevalúan hasta que ninguna aplica.
    pub fn auto_advance_on_program_state(&self, program_id: Uuid) -> Result<ProgramWorkflow, WorkflowError> {
        self.transition(program_id, "auto_advance", |wf, facts, entered| {
                while let Some(stage) = next_auto_stage(wf, facts) {
                    entered.push(stage);
                }
                Ok(())
            })
    }

    pub fn status(&self, program_id: Uuid) -> Result<WorkflowStatus, WorkflowError> {
        let program = self.load_program(program_id)?;
        let workflow = self.get_or_initialize(program_id)?;
        let policies = self.resolver.effective_policies(&program)?;
        Ok(WorkflowStatus { stage_name: workflow.current_stage().name(),
                            program,
                            workflow,
                            policies })
    }

    /// Resuelve y despacha la notificación de `stage`. Las fallas se
    /// registran; el informe vacío indica que no se envió nada.
    pub fn dispatch_stage(&self, program: &Program, stage: Stage) -> DispatchReport {
        match self.resolver.resolve(program, stage) {
            Ok(policy) => self.dispatcher.dispatch(&policy),
            Err(e) => {
                warn!("dispatch:resolve_failed program_id={} stage={} err={}", program.id, stage.number(), e);
                DispatchReport::default()
            }
        }
    }

    fn transition<F>(&self, program_id: Uuid, op: &'static str, mut step: F) -> Result<ProgramWorkflow, WorkflowError>
        where F: FnMut(&mut ProgramWorkflow, &WorkflowFacts, &mut Vec<Stage>) -> Result<(), WorkflowError>
    {
        self.get_or_initialize(program_id)?;
        let mut entered: Vec<Stage> = Vec::new();
        let result = self.store
                         .transact_workflow(program_id, &mut |wf: &mut ProgramWorkflow, facts: &WorkflowFacts| {
                             // el backend puede reintentar la unidad
                             entered.clear();
                             step(wf, facts, &mut entered)?;
                             Ok(!entered.is_empty())
                         });
        let wf = match result {
            Ok(wf) => wf,
            Err(e) => {
                warn!("{}:rejected program_id={} err={}", op, program_id, e);
                return Err(e);
            }
        };
        if entered.is_empty() {
            debug!("{}:noop program_id={} stage={}", op, program_id, wf.current_stage().number());
            return Ok(wf);
        }
        info!("{}:committed program_id={} entered={:?} stage={}",
              op,
              program_id,
              entered.iter().map(|s| s.number()).collect::<Vec<_>>(),
              wf.current_stage().number());
        // tras el commit; el programa se relee por si cambió su título
        match self.load_program(program_id) {
            Ok(program) => {
                for stage in entered {
                    self.dispatch_stage(&program, stage);
                }
            }
            Err(e) => warn!("{}:dispatch_skipped program_id={} err={}", op, program_id, e),
        }
        Ok(wf)
    }
}

fn next_auto_stage(wf: &mut ProgramWorkflow, facts: &WorkflowFacts) -> Option<Stage> {
    match wf.current_stage() {
        Stage::ActivateProgram if facts.program.is_active() => wf.auto_advance_from(Stage::ActivateProgram),
        Stage::PostApplicationCall => {
            let limit = facts.program.capacity_limit?;
            if facts.approved_count() >= limit as usize {
                wf.auto_advance_from(Stage::PostApplicationCall)
            } else {
                None
            }
        }
        _ => None,
    }
}
