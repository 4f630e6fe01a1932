use std::sync::Arc;

use chrono::NaiveDate;
use sewa_core::{InMemoryStore, RecordingNotifier, WorkflowEngine};
use sewa_domain::{Caller, ProgramStatus, Role, Stage};
use sewaflow::{run, sweep_once};

fn engine() -> (Arc<WorkflowEngine<InMemoryStore>>, Arc<RecordingNotifier>, Caller) {
    let store = Arc::new(InMemoryStore::new());
    let notifier = Arc::new(RecordingNotifier::new());
    let engine = WorkflowEngine::builder(store).notifier(notifier.clone())
                                               .today(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap())
                                               .build();
    let account = engine.register_account("Incharge", Role::Incharge, Some("incharge@sewa.test".into()))
                        .unwrap();
    (Arc::new(engine), notifier, Caller::from(&account))
}

#[test]
fn sweep_runs_on_the_blocking_pool() {
    let (engine, notifier, incharge) = engine();
    let p = engine.create_program(&incharge, "Bhandara", "Beas", None).unwrap();
    engine.resolver()
          .set_program_override(&incharge, p.id, Stage::PostApplicationCall, Some(true), None)
          .unwrap();
    engine.set_program_status(&incharge, p.id, ProgramStatus::Active).unwrap();
    notifier.clear();

    let report = tokio_test::block_on(sweep_once(engine.clone())).unwrap();
    assert_eq!(report.workflows, 1);
    assert_eq!(report.dispatch.delivered, 1);
    assert_eq!(notifier.sent_to("incharge@sewa.test").len(), 1);
    // el barrido no mueve el workflow
    assert_eq!(engine.get_or_initialize(p.id).unwrap().current_stage(), Stage::PostApplicationCall);
}

#[test]
fn scheduler_stops_on_shutdown() {
    let (engine, notifier, _) = engine();
    // sin workflows: aunque el barrido llegue a correr no envía nada
    let trigger = sewaflow::DailyTrigger::new(23);
    tokio_test::block_on(run(engine, trigger, async {}));
    assert!(notifier.sent().is_empty());
}
