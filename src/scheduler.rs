//! Disparador diario del barrido de notificaciones.
//!
//! `DailyTrigger` decide cuándo corresponde barrer (una vez por día UTC, a
//! partir de la hora configurada); `run` lo conduce sobre tokio y ejecuta el
//! barrido, que es síncrono, en el pool bloqueante.
use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use log::{error, info};
use sewa_core::{Store, SweepReport, WorkflowEngine, WorkflowError};
use thiserror::Error;
use tokio::task::JoinError;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("sweep failed: {0}")]
    Sweep(#[from] WorkflowError),
    #[error("sweep task aborted: {0}")]
    Join(#[from] JoinError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyTrigger {
    hour: u32,
    last_run: Option<NaiveDate>,
}

impl DailyTrigger {
    /// Horas fuera de 0..=23 se recortan a 23.
    pub fn new(hour: u32) -> Self {
        Self { hour: hour.min(23),
               last_run: None }
    }

    pub fn hour(&self) -> u32 {
        self.hour
    }

    pub fn last_run(&self) -> Option<NaiveDate> {
        self.last_run
    }

    fn fire_time(&self, date: NaiveDate) -> DateTime<Utc> {
        let at = NaiveTime::from_hms_opt(self.hour, 0, 0).unwrap_or(NaiveTime::MIN);
        date.and_time(at).and_utc()
    }

    /// Pasó la hora de hoy y todavía no se barrió hoy.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        let today = now.date_naive();
        now >= self.fire_time(today) && self.last_run != Some(today)
    }

    /// Próximo instante de disparo; `now` si ya corresponde.
    pub fn next_fire(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        if self.is_due(now) {
            return now;
        }
        let today = now.date_naive();
        let today_fire = self.fire_time(today);
        if now < today_fire {
            return today_fire;
        }
        let tomorrow = today.checked_add_days(Days::new(1)).unwrap_or(today);
        self.fire_time(tomorrow)
    }

    pub fn mark_run(&mut self, date: NaiveDate) {
        self.last_run = Some(date);
    }
}

/// Un barrido en el pool bloqueante de tokio.
pub async fn sweep_once<S: Store + 'static>(engine: Arc<WorkflowEngine<S>>) -> Result<SweepReport, SchedulerError> {
    let report = tokio::task::spawn_blocking(move || engine.run_daily_notification_sweep()).await??;
    Ok(report)
}

/// Bucle del scheduler hasta que `shutdown` se resuelva. Un barrido fallido
/// se registra y el día queda marcado igual: no se reintenta hasta mañana.
pub async fn run<S, F>(engine: Arc<WorkflowEngine<S>>, mut trigger: DailyTrigger, shutdown: F)
    where S: Store + 'static,
          F: Future<Output = ()>
{
    tokio::pin!(shutdown);
    info!("scheduler:start hour={}", trigger.hour());
    loop {
        let now = Utc::now();
        let next = trigger.next_fire(now);
        let wait = (next - now).to_std().unwrap_or_default();
        tokio::select! {
            _ = &mut shutdown => {
                info!("scheduler:shutdown last_run={:?}", trigger.last_run());
                return;
            }
            _ = tokio::time::sleep(wait) => {}
        }
        let now = Utc::now();
        if !trigger.is_due(now) {
            continue;
        }
        trigger.mark_run(now.date_naive());
        match sweep_once(engine.clone()).await {
            Ok(report) => info!("scheduler:swept date={} workflows={} delivered={}",
                                now.date_naive(),
                                report.workflows,
                                report.dispatch.delivered),
            Err(e) => error!("scheduler:sweep_failed date={} err={}", now.date_naive(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(d: u32, h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, d, h, m, 0).unwrap()
    }

    #[test]
    fn waits_for_the_configured_hour() {
        let t = DailyTrigger::new(6);
        assert!(!t.is_due(at(10, 5, 59)));
        assert_eq!(t.next_fire(at(10, 5, 59)), at(10, 6, 0));
        assert!(t.is_due(at(10, 6, 0)));
    }

    #[test]
    fn fires_once_per_day() {
        let mut t = DailyTrigger::new(6);
        t.mark_run(at(10, 7, 0).date_naive());
        assert!(!t.is_due(at(10, 23, 0)));
        assert_eq!(t.next_fire(at(10, 23, 0)), at(11, 6, 0));
        assert!(t.is_due(at(11, 6, 30)));
    }

    #[test]
    fn late_start_fires_immediately() {
        let t = DailyTrigger::new(0);
        let now = at(10, 15, 0);
        assert_eq!(t.next_fire(now), now);
    }

    #[test]
    fn clamps_hour() {
        assert_eq!(DailyTrigger::new(40).hour(), 23);
    }
}
