mod support;

use serde_json::json;
use sewa_core::{ValidationFailure, WorkflowError};
use sewa_domain::{ApplicationStatus, LocationCategory, ProgramStatus};
use support::{date, Fixture};

#[test]
fn apply_requires_active_program_and_is_unique() {
    let f = Fixture::new();
    let p = f.program(None);
    let s = f.sewadar("ravi");
    assert!(matches!(f.engine.apply(s.id, p.id),
                     Err(WorkflowError::Validation(ValidationFailure::InvalidState(_)))));
    f.activate(p.id);
    f.engine.apply(s.id, p.id).unwrap();
    assert!(matches!(f.engine.apply(s.id, p.id),
                     Err(WorkflowError::Validation(ValidationFailure::Duplicate(_)))));
}

#[test]
fn drop_request_round_trip() {
    let f = Fixture::new();
    let p = f.program(None);
    f.activate(p.id);
    let s = f.sewadar("ravi");
    let app = f.engine.apply(s.id, p.id).unwrap();
    f.engine.approve_application(&f.incharge, app.id).unwrap();

    let other = f.sewadar("meena");
    assert!(f.engine.request_drop(other.id, app.id).is_err());

    let req = f.engine.request_drop(s.id, app.id).unwrap();
    assert_eq!(req.status, ApplicationStatus::DropRequested);
    let denied = f.engine.decide_drop(&f.incharge, app.id, false).unwrap();
    assert_eq!(denied.status, ApplicationStatus::Approved);
    f.engine.request_drop(s.id, app.id).unwrap();
    let dropped = f.engine.decide_drop(&f.incharge, app.id, true).unwrap();
    assert_eq!(dropped.status, ApplicationStatus::Dropped);
    // final
    assert!(f.engine.decide_drop(&f.incharge, app.id, false).is_err());
}

#[test]
fn rejected_application_cannot_be_approved() {
    let f = Fixture::new();
    let p = f.program(None);
    f.activate(p.id);
    let s = f.sewadar("ravi");
    let app = f.engine.apply(s.id, p.id).unwrap();
    f.engine.reject_application(&f.incharge, app.id).unwrap();
    assert!(f.engine.approve_application(&f.incharge, app.id).is_err());
}

#[test]
fn dropped_applicants_do_not_block_details_gate() {
    let f = Fixture::new();
    let p = f.program(None);
    f.activate(p.id);
    let ids = f.approved(p.id, &["ravi", "meena"]);
    let meena_app = f.store_application(p.id, ids[1]);
    f.engine.request_drop(ids[1], meena_app).unwrap();
    f.engine.decide_drop(&f.incharge, meena_app, true).unwrap();

    f.advance_to(p.id, sewa_domain::Stage::ReleaseForm);
    f.engine.release_form(&f.incharge, p.id).unwrap();
    f.engine.submit_details(ids[0], p.id, json!({"ok": true})).unwrap();
    let wf = f.engine.mark_details_collected(&f.incharge, p.id).unwrap();
    assert!(wf.details_collected());
}

#[test]
fn attendance_is_partitioned_by_primary_location() {
    let f = Fixture::new();
    let beas = f.engine.create_program(&f.incharge, "Bhandara", "  beas ", None).unwrap();
    let delhi = f.engine.create_program(&f.incharge, "Satsang", "Delhi", None).unwrap();
    let s = f.sewadar("ravi");
    for day in 1..=3 {
        let d = f.engine.add_program_date(&f.incharge, beas.id, date(2024, 5, day)).unwrap();
        f.engine.record_attendance(&f.incharge, s.id, d.id).unwrap();
    }
    let d = f.engine.add_program_date(&f.incharge, delhi.id, date(2024, 6, 1)).unwrap();
    f.engine.record_attendance(&f.incharge, s.id, d.id).unwrap();
    assert!(matches!(f.engine.record_attendance(&f.incharge, s.id, d.id),
                     Err(WorkflowError::Validation(ValidationFailure::Duplicate(_)))));

    assert_eq!(f.engine.count_programs_by_category(s.id, LocationCategory::Primary).unwrap(), 1);
    assert_eq!(f.engine.sum_days_by_category(s.id, LocationCategory::Primary).unwrap(), 3);
    assert_eq!(f.engine.count_programs_by_category(s.id, LocationCategory::Other).unwrap(), 1);
    assert_eq!(f.engine.sum_days_by_category(s.id, LocationCategory::Other).unwrap(), 1);

    // borrar la fecha de Delhi borra sólo su asistencia
    assert!(f.engine.delete_program_date(&f.incharge, d.id).unwrap());
    let summary = f.engine.attendance_summary(s.id).unwrap();
    assert_eq!((summary.primary_days, summary.other_days), (3, 0));
}

#[test]
fn rank_applicants_orders_by_attendance_stable_on_ties() {
    let f = Fixture::new();
    let past = f.program(None);
    let dates: Vec<_> = (1..=2).map(|d| f.engine.add_program_date(&f.incharge, past.id, date(2024, 1, d)).unwrap())
                               .collect();
    let p = f.program(None);
    f.activate(p.id);
    let first = f.sewadar("first");
    let busy = f.sewadar("busy");
    let second = f.sewadar("second");
    let rejected = f.sewadar("rejected");
    for d in &dates {
        f.engine.record_attendance(&f.incharge, busy.id, d.id).unwrap();
    }
    for s in [&first, &busy, &second, &rejected] {
        f.engine.apply(s.id, p.id).unwrap();
    }
    let rej_app = f.store_application(p.id, rejected.id);
    f.engine.reject_application(&f.incharge, rej_app).unwrap();

    let ranked = f.engine.rank_applicants(p.id).unwrap();
    let order: Vec<_> = ranked.iter().map(|r| r.sewadar_id).collect();
    assert_eq!(order, vec![busy.id, first.id, second.id]);
    // 1 programa × 10 + 2 días
    assert_eq!(ranked[0].score, 12);
}

#[test]
fn closing_program_keeps_workflow_stage() {
    let f = Fixture::new();
    let p = f.program(None);
    f.activate(p.id);
    let wf = f.engine
              .set_program_status(&f.incharge, p.id, ProgramStatus::Closed)
              .unwrap();
    assert_eq!(wf.current_stage(), sewa_domain::Stage::PostApplicationCall);
}
