use sewa_domain::{Account, ApplicationStatus, Caller, DomainError, LocationCategory, Program, ProgramApplication, ProgramSelection, ProgramStatus, Role,
                  SelectionStatus};
use std::str::FromStr;
use uuid::Uuid;

#[test]
fn test_location_category_is_case_insensitive() {
    assert_eq!(LocationCategory::classify("beas", "BEAS"), LocationCategory::Primary);
    assert_eq!(LocationCategory::classify("  Beas ", "BEAS"), LocationCategory::Primary);
    assert_eq!(LocationCategory::classify("Delhi", "BEAS"), LocationCategory::Other);
    // el token debe coincidir completo, no como prefijo
    assert_eq!(LocationCategory::classify("Beas Road", "BEAS"), LocationCategory::Other);
}

#[test]
fn test_program_validation() {
    let creator = Uuid::new_v4();
    assert!(matches!(Program::new("  ", "Beas", None, creator), Err(DomainError::ValidationError(_))));
    assert!(matches!(Program::new("Bhandara", "Beas", Some(0), creator), Err(DomainError::ValidationError(_))));
    let p = Program::new("Bhandara", "Beas", Some(40), creator).unwrap();
    assert_eq!(p.status, ProgramStatus::Draft);
    assert!(!p.is_active());
    assert_eq!(p.category("BEAS"), LocationCategory::Primary);
}

#[test]
fn test_application_state_machine() {
    let mut app = ProgramApplication::new(Uuid::new_v4(), Uuid::new_v4());
    assert!(app.transition(ApplicationStatus::DropRequested).is_err());
    app.transition(ApplicationStatus::Approved).unwrap();
    app.transition(ApplicationStatus::DropRequested).unwrap();
    // drop denegado: vuelve a aprobado
    app.transition(ApplicationStatus::Approved).unwrap();
    app.transition(ApplicationStatus::DropRequested).unwrap();
    app.transition(ApplicationStatus::Dropped).unwrap();
    assert!(app.transition(ApplicationStatus::Approved).is_err());
    assert_eq!(app.status, ApplicationStatus::Dropped);
}

#[test]
fn test_selection_final_states() {
    let mut sel = ProgramSelection::new(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), 42, "test");
    assert!(sel.status.is_active());
    sel.transition(SelectionStatus::Replaced).unwrap();
    // reemplazada sigue activa
    assert!(sel.status.is_active());
    assert!(sel.transition(SelectionStatus::Dropped).is_err());

    let mut other = ProgramSelection::new(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), 0, "test");
    other.transition(SelectionStatus::Dropped).unwrap();
    assert!(!other.status.is_active());
}

#[test]
fn test_status_strings_roundtrip() {
    for s in ["pending", "approved", "rejected", "drop_requested", "dropped"] {
        assert_eq!(ApplicationStatus::from_str(s).unwrap().as_str(), s);
    }
    for s in ["selected", "confirmed", "dropped", "replaced"] {
        assert_eq!(SelectionStatus::from_str(s).unwrap().as_str(), s);
    }
    assert!(matches!(Role::from_str("root"), Err(DomainError::UnknownStatus { kind: "role", .. })));
}

#[test]
fn test_incharge_contact_requires_role_and_address() {
    let inc = Account::new("A", Role::Incharge, Some(" a@x.org ".into()));
    assert_eq!(inc.incharge_contact(), Some("a@x.org"));
    let blank = Account::new("B", Role::Admin, Some("   ".into()));
    assert_eq!(blank.incharge_contact(), None);
    let sew = Account::new("C", Role::Sewadar, Some("c@x.org".into()));
    assert_eq!(sew.incharge_contact(), None);
    assert!(Caller::from(&inc).is_incharge());
    assert!(!Caller::from(&sew).is_incharge());
}
