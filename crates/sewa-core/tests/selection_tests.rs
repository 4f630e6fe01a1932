mod support;

use sewa_core::repo::SelectionStore;
use sewa_core::{ValidationFailure, WorkflowError};
use sewa_domain::{Caller, Role, SelectionStatus};
use support::{date, Fixture};
use uuid::Uuid;

#[test]
fn batch_over_capacity_creates_nothing() {
    let f = Fixture::new();
    let p = f.program(Some(2));
    let ids: Vec<Uuid> = ["a", "b", "c"].iter().map(|n| f.sewadar(n).id).collect();

    let err = f.engine.select(&f.incharge, p.id, &ids).unwrap_err();
    assert_eq!(err,
               WorkflowError::Validation(ValidationFailure::CapacityExceeded { limit: 2,
                                                                               active: 0,
                                                                               requested: 3 }));
    assert!(f.store.list_selections(p.id).unwrap().is_empty());
    assert!(f.notifier.sent().is_empty());
}

#[test]
fn batch_within_capacity_creates_scored_rows_and_notifies() {
    let f = Fixture::new();
    let p = f.program(Some(2));
    let a = f.sewadar("a");
    let b = f.sewadar("b");

    let res = f.engine.select(&f.incharge, p.id, &[a.id, b.id]).unwrap();
    assert_eq!(res.created.len(), 2);
    assert!(res.duplicates.is_empty());
    for sel in &res.created {
        assert_eq!(sel.status, SelectionStatus::Selected);
        assert_eq!(sel.selected_by, f.incharge.account_id);
        // 0 programas, 10 años de servicio
        assert_eq!(sel.priority_score, 10);
        assert!(!sel.reason.is_empty());
    }
    assert_eq!(f.notifier.sent_to("a@sewa.test").len(), 1);
    assert_eq!(f.notifier.sent_to("b@sewa.test").len(), 1);

    // cupo lleno: uno más falla
    let c = f.sewadar("c");
    let err = f.engine.select(&f.incharge, p.id, &[c.id]).unwrap_err();
    assert!(matches!(err, WorkflowError::Validation(ValidationFailure::CapacityExceeded { active: 2, .. })));
}

#[test]
fn already_selected_participant_is_rejected_individually() {
    let f = Fixture::new();
    let p = f.program(None);
    let a = f.sewadar("a");
    let b = f.sewadar("b");
    f.engine.select(&f.incharge, p.id, &[a.id]).unwrap();

    let res = f.engine.select(&f.incharge, p.id, &[a.id, b.id]).unwrap();
    assert_eq!(res.duplicates, vec![a.id]);
    assert_eq!(res.created.len(), 1);
    assert_eq!(res.created[0].sewadar_id, b.id);
}

#[test]
fn dropped_selection_can_be_superseded() {
    let f = Fixture::new();
    let p = f.program(Some(1));
    let a = f.sewadar("a");
    let first = f.engine.select(&f.incharge, p.id, &[a.id]).unwrap().created.remove(0);
    let dropped = f.engine.drop_selection(&f.incharge, first.id).unwrap();
    assert_eq!(dropped.status, SelectionStatus::Dropped);

    let again = f.engine.select(&f.incharge, p.id, &[a.id]).unwrap();
    assert_eq!(again.created.len(), 1);
    assert_ne!(again.created[0].id, first.id);
}

#[test]
fn final_states_reject_further_transitions() {
    let f = Fixture::new();
    let p = f.program(None);
    let a = f.sewadar("a");
    let sel = f.engine.select(&f.incharge, p.id, &[a.id]).unwrap().created.remove(0);
    assert_eq!(f.engine.confirm_selection(&f.incharge, sel.id).unwrap().status, SelectionStatus::Confirmed);
    assert!(matches!(f.engine.drop_selection(&f.incharge, sel.id),
                     Err(WorkflowError::Validation(ValidationFailure::InvalidState(_)))));
}

#[test]
fn replace_marks_old_row_and_notifies_replacement() {
    let f = Fixture::new();
    let p = f.program(None);
    let a = f.sewadar("a");
    let b = f.sewadar("b");
    let sel = f.engine.select(&f.incharge, p.id, &[a.id]).unwrap().created.remove(0);

    let (old, new) = f.engine.replace_selection(&f.incharge, sel.id, b.id).unwrap();
    assert_eq!(old.status, SelectionStatus::Replaced);
    assert_eq!(new.status, SelectionStatus::Selected);
    assert_eq!(new.sewadar_id, b.id);
    assert_eq!(f.notifier.sent_to("b@sewa.test").len(), 1);

    // la reemplazada sigue activa: a no puede volver a entrar
    let res = f.engine.select(&f.incharge, p.id, &[a.id]).unwrap();
    assert!(res.created.is_empty());
    assert_eq!(res.duplicates, vec![a.id]);
    // el reemplazo de una selección ya reemplazada es inválido
    let c = f.sewadar("c");
    assert!(matches!(f.engine.replace_selection(&f.incharge, sel.id, c.id),
                     Err(WorkflowError::Validation(ValidationFailure::InvalidState(_)))));
}

#[test]
fn replaced_rows_count_against_capacity() {
    let f = Fixture::new();
    let p = f.program(Some(3));
    let ids: Vec<Uuid> = ["a", "b", "c", "d"].iter().map(|n| f.sewadar(n).id).collect();
    let res = f.engine.select(&f.incharge, p.id, &ids[..2]).unwrap();
    f.engine.replace_selection(&f.incharge, res.created[0].id, ids[2]).unwrap();

    let err = f.engine.select(&f.incharge, p.id, &[ids[3]]).unwrap_err();
    assert_eq!(err,
               WorkflowError::Validation(ValidationFailure::CapacityExceeded { limit: 3,
                                                                               active: 3,
                                                                               requested: 1 }));
    let active = f.store
                  .list_selections(p.id)
                  .unwrap()
                  .into_iter()
                  .filter(|s| s.status.is_active())
                  .count();
    assert_eq!(active, 3);
}

#[test]
fn replace_needs_a_free_seat() {
    let f = Fixture::new();
    let p = f.program(Some(1));
    let a = f.sewadar("a");
    let b = f.sewadar("b");
    let sel = f.engine.select(&f.incharge, p.id, &[a.id]).unwrap().created.remove(0);

    let err = f.engine.replace_selection(&f.incharge, sel.id, b.id).unwrap_err();
    assert_eq!(err,
               WorkflowError::Validation(ValidationFailure::CapacityExceeded { limit: 1,
                                                                               active: 1,
                                                                               requested: 1 }));
    // nada cambió
    assert_eq!(f.store.get_selection(sel.id).unwrap().unwrap().status, SelectionStatus::Selected);
    assert!(f.notifier.sent_to("b@sewa.test").is_empty());

    // con cupo lleno se suelta y se selecciona
    f.engine.drop_selection(&f.incharge, sel.id).unwrap();
    let res = f.engine.select(&f.incharge, p.id, &[b.id]).unwrap();
    assert_eq!(res.created[0].sewadar_id, b.id);
}

#[test]
fn replace_with_already_selected_participant_is_duplicate() {
    let f = Fixture::new();
    let p = f.program(None);
    let a = f.sewadar("a");
    let b = f.sewadar("b");
    let res = f.engine.select(&f.incharge, p.id, &[a.id, b.id]).unwrap();
    let err = f.engine.replace_selection(&f.incharge, res.created[0].id, b.id).unwrap_err();
    assert!(matches!(err, WorkflowError::Validation(ValidationFailure::Duplicate(_))));
}

#[test]
fn selection_requires_incharge_and_known_participants() {
    let f = Fixture::new();
    let p = f.program(None);
    let a = f.sewadar("a");
    let volunteer = Caller::new(a.id, Role::Sewadar);
    assert!(matches!(f.engine.select(&volunteer, p.id, &[a.id]),
                     Err(WorkflowError::Validation(ValidationFailure::MissingCapability { .. }))));
    assert!(matches!(f.engine.select(&f.incharge, p.id, &[Uuid::new_v4()]),
                     Err(WorkflowError::NotFound { entity: "sewadar", .. })));
}

#[test]
fn selection_score_adds_tenure_to_program_weight() {
    let f = Fixture::new();
    let p = f.program(None);
    let other = f.engine
                 .create_program(&f.incharge, "Satsang", "Delhi", None)
                 .unwrap();
    let veteran = f.sewadar("veteran");
    for (prog, day) in [(p.id, 1), (p.id, 2), (other.id, 3)] {
        let d = f.engine.add_program_date(&f.incharge, prog, date(2024, 3, day)).unwrap();
        f.engine.record_attendance(&f.incharge, veteran.id, d.id).unwrap();
    }
    let scored = f.engine.selection_score(veteran.id).unwrap();
    // 2 programas distintos × 10 + 10 años
    assert_eq!(scored.score, 30);
}
