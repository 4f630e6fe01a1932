mod support;

use serde_json::json;
use sewa_core::repo::ProgramStore;
use sewa_core::{ValidationFailure, WorkflowError};
use sewa_domain::{Caller, ProgramStatus, Role, Stage};
use support::Fixture;
use uuid::Uuid;

#[test]
fn lazy_init_starts_at_stage_one_with_closed_gates() {
    let f = Fixture::new();
    let p = f.program(None);
    let wf = f.engine.get_or_initialize(p.id).unwrap();
    assert_eq!(wf.current_stage(), Stage::ActivateProgram);
    assert!(!wf.form_released() && !wf.details_collected());
    // segunda llamada devuelve la misma fila
    assert_eq!(f.engine.get_or_initialize(p.id).unwrap().id(), wf.id());
}

#[test]
fn unknown_program_is_not_found() {
    let f = Fixture::new();
    let missing = Uuid::new_v4();
    let err = f.engine.get_or_initialize(missing).unwrap_err();
    assert_eq!(err, WorkflowError::not_found("program", missing));
    assert!(matches!(f.engine.advance(&f.incharge, missing), Err(WorkflowError::NotFound { .. })));
}

#[test]
fn advance_is_monotonic_and_stops_at_terminal() {
    let f = Fixture::new();
    let p = f.program(None);
    let mut last = f.engine.get_or_initialize(p.id).unwrap().current_stage();
    for _ in 0..8 {
        let now = f.engine.advance(&f.incharge, p.id).unwrap().current_stage();
        assert!(now >= last);
        last = now;
    }
    assert_eq!(last, Stage::PostGeneralInstructions);
}

#[test]
fn advance_requires_incharge_capability() {
    let f = Fixture::new();
    let p = f.program(None);
    let volunteer = Caller::new(Uuid::new_v4(), Role::Sewadar);
    let err = f.engine.advance(&volunteer, p.id).unwrap_err();
    assert_eq!(err,
               WorkflowError::Validation(ValidationFailure::MissingCapability { account_id: volunteer.account_id }));
    assert_eq!(f.engine.get_or_initialize(p.id).unwrap().current_stage(), Stage::ActivateProgram);
}

#[test]
fn release_form_is_noop_outside_stage_three() {
    let f = Fixture::new();
    let p = f.program(None);
    for stage in [Stage::ActivateProgram, Stage::PostApplicationCall] {
        f.advance_to(p.id, stage);
        let before = f.engine.get_or_initialize(p.id).unwrap();
        let after = f.engine.release_form(&f.incharge, p.id).unwrap();
        assert_eq!(before, after);
    }
    f.advance_to(p.id, Stage::ReleaseForm);
    let wf = f.engine.release_form(&f.incharge, p.id).unwrap();
    assert_eq!(wf.current_stage(), Stage::CollectDetails);
    assert!(wf.form_released());
    for stage in [Stage::CollectDetails, Stage::NotifyAreaSecretary, Stage::PostGeneralInstructions] {
        f.advance_to(p.id, stage);
        let before = f.engine.get_or_initialize(p.id).unwrap();
        assert_eq!(f.engine.release_form(&f.incharge, p.id).unwrap(), before);
        assert!(before.form_released());
    }
}

#[test]
fn manual_advance_does_not_open_gates() {
    let f = Fixture::new();
    let p = f.program(None);
    f.advance_to(p.id, Stage::PostGeneralInstructions);
    let wf = f.engine.get_or_initialize(p.id).unwrap();
    assert!(!wf.form_released() && !wf.details_collected());
}

#[test]
fn details_gate_names_missing_participant_then_succeeds() {
    let f = Fixture::new();
    let p = f.program(None);
    f.enable_all(p.id);
    f.activate(p.id);
    let ids = f.approved(p.id, &["ravi", "meena"]);
    f.advance_to(p.id, Stage::ReleaseForm);
    f.engine.release_form(&f.incharge, p.id).unwrap();

    f.engine.submit_details(ids[0], p.id, json!({"shirt": "M"})).unwrap();
    let err = f.engine.mark_details_collected(&f.incharge, p.id).unwrap_err();
    assert_eq!(err.missing_participants(), Some(&[ids[1]][..]));
    let wf = f.engine.get_or_initialize(p.id).unwrap();
    assert_eq!(wf.current_stage(), Stage::CollectDetails);
    assert!(!wf.details_collected());

    f.notifier.clear();
    f.engine.submit_details(ids[1], p.id, json!({"shirt": "L"})).unwrap();
    let wf = f.engine.mark_details_collected(&f.incharge, p.id).unwrap();
    assert_eq!(wf.current_stage(), Stage::NotifyAreaSecretary);
    assert!(wf.details_collected() && wf.form_released());
    let sent = f.incharge_messages();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].contains("Bhandara"));
}

#[test]
fn mark_details_collected_is_noop_outside_stage_four() {
    let f = Fixture::new();
    let p = f.program(None);
    let before = f.engine.get_or_initialize(p.id).unwrap();
    assert_eq!(f.engine.mark_details_collected(&f.incharge, p.id).unwrap(), before);
}

#[test]
fn submit_details_requires_released_form_and_approval() {
    let f = Fixture::new();
    let p = f.program(None);
    f.activate(p.id);
    let ids = f.approved(p.id, &["ravi"]);
    let err = f.engine.submit_details(ids[0], p.id, json!({})).unwrap_err();
    assert!(matches!(err, WorkflowError::Validation(ValidationFailure::InvalidState(_))));

    let pending = f.sewadar("asha");
    f.engine.apply(pending.id, p.id).unwrap();
    f.advance_to(p.id, Stage::ReleaseForm);
    f.engine.release_form(&f.incharge, p.id).unwrap();
    assert!(f.engine.submit_details(pending.id, p.id, json!({})).is_err());
    assert!(f.engine.submit_details(ids[0], p.id, json!({})).is_ok());
}

#[test]
fn activation_auto_advances_to_stage_two() {
    let f = Fixture::new();
    let p = f.program(Some(5));
    f.enable_all(p.id);
    let wf = f.engine
              .set_program_status(&f.incharge, p.id, ProgramStatus::Active)
              .unwrap();
    assert_eq!(wf.current_stage(), Stage::PostApplicationCall);
    assert_eq!(f.incharge_messages().len(), 1);
    // sin cambios: no vuelve a despachar
    f.engine.auto_advance_on_program_state(p.id).unwrap();
    assert_eq!(f.incharge_messages().len(), 1);
}

#[test]
fn reaching_capacity_with_approvals_moves_to_stage_three() {
    let f = Fixture::new();
    let p = f.program(Some(2));
    f.activate(p.id);
    f.approved(p.id, &["ravi"]);
    assert_eq!(f.engine.get_or_initialize(p.id).unwrap().current_stage(), Stage::PostApplicationCall);
    f.approved(p.id, &["meena"]);
    assert_eq!(f.engine.get_or_initialize(p.id).unwrap().current_stage(), Stage::ReleaseForm);
}

#[test]
fn auto_advance_without_capacity_stays_at_stage_two() {
    let f = Fixture::new();
    let p = f.program(None);
    f.activate(p.id);
    f.approved(p.id, &["ravi", "meena", "asha"]);
    assert_eq!(f.engine.get_or_initialize(p.id).unwrap().current_stage(), Stage::PostApplicationCall);
}

#[test]
fn auto_advance_chains_both_rules_in_one_call() {
    let f = Fixture::new();
    let p = f.program(Some(1));
    f.enable_all(p.id);
    let s = f.sewadar("kiran");
    // estado cambiado por fuera del motor: el workflow aún no existe
    f.store.update_program_status(p.id, ProgramStatus::Active).unwrap();
    let app = f.engine.apply(s.id, p.id).unwrap();
    f.engine.approve_application(&f.incharge, app.id).unwrap();

    let wf = f.engine.get_or_initialize(p.id).unwrap();
    assert_eq!(wf.current_stage(), Stage::ReleaseForm);
    assert!(!wf.form_released());
    // un despacho por cada etapa atravesada (2 y 3)
    assert_eq!(f.incharge_messages().len(), 2);
}

#[test]
fn status_reports_stage_name_and_six_policies() {
    let f = Fixture::new();
    let p = f.program(None);
    let st = f.engine.status(p.id).unwrap();
    assert_eq!(st.stage_name, "Activate Program");
    assert_eq!(st.policies.len(), 6);
    assert!(st.policies.iter().all(|pol| !pol.enabled));
}

#[test]
fn deleting_program_drops_workflow() {
    let f = Fixture::new();
    let p = f.program(None);
    f.engine.get_or_initialize(p.id).unwrap();
    assert!(f.engine.delete_program(&f.incharge, p.id).unwrap());
    assert!(matches!(f.engine.status(p.id), Err(WorkflowError::NotFound { .. })));
}
