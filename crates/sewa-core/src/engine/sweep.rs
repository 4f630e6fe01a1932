//! Barrido diario: re-despacha la notificación de la etapa actual de cada
//! workflow. No modifica ningún workflow.
use log::{info, warn};
use rayon::prelude::*;
use serde::Serialize;

use super::core::WorkflowEngine;
use crate::errors::WorkflowError;
use crate::notify::DispatchReport;
use crate::repo::Store;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Workflows visitados.
    pub workflows: usize,
    /// Workflows cuyo programa ya no existe o no pudo leerse.
    pub skipped: usize,
    pub dispatch: DispatchReport,
}

impl SweepReport {
    fn merge(mut self, other: SweepReport) -> SweepReport {
        self.workflows += other.workflows;
        self.skipped += other.skipped;
        self.dispatch += other.dispatch;
        self
    }
}

impl<S: Store> WorkflowEngine<S> {
    pub fn run_daily_notification_sweep(&self) -> Result<SweepReport, WorkflowError> {
        self.resolver.ensure_seeded()?;
        let workflows = self.store.list_workflows()?;
        let report = workflows.par_iter()
                              .map(|wf| {
                                  let mut row = SweepReport { workflows: 1,
                                                              ..SweepReport::default() };
                                  match self.store.get_program(wf.program_id()) {
                                      Ok(Some(program)) => row.dispatch = self.dispatch_stage(&program, wf.current_stage()),
                                      Ok(None) => row.skipped = 1,
                                      Err(e) => {
                                          warn!("sweep:program_failed program_id={} err={}", wf.program_id(), e);
                                          row.skipped = 1;
                                      }
                                  }
                                  row
                              })
                              .reduce(SweepReport::default, SweepReport::merge);
        info!("sweep:done workflows={} skipped={} attempted={} delivered={} failed={}",
              report.workflows,
              report.skipped,
              report.dispatch.attempted,
              report.dispatch.delivered,
              report.dispatch.failed);
        Ok(report)
    }
}
