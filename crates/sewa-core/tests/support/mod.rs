//! Fixture compartida: motor en memoria con notificador que registra envíos.
#![allow(dead_code)]

use std::sync::Arc;

use chrono::NaiveDate;
use sewa_core::repo::ApplicationStore;
use sewa_core::{InMemoryStore, RecordingNotifier, WorkflowEngine};
use sewa_domain::{Caller, Program, ProgramStatus, Role, Sewadar, Stage};
use uuid::Uuid;

pub const INCHARGE_CONTACT: &str = "incharge@sewa.test";

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub struct Fixture {
    pub store: Arc<InMemoryStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub engine: Arc<WorkflowEngine<InMemoryStore>>,
    pub incharge: Caller,
}

impl Fixture {
    pub fn new() -> Self {
        let store = Arc::new(InMemoryStore::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let engine = WorkflowEngine::builder(store.clone()).notifier(notifier.clone())
                                                           .primary_location("Beas")
                                                           .today(date(2025, 1, 1))
                                                           .build();
        let account = engine.register_account("Incharge", Role::Incharge, Some(INCHARGE_CONTACT.into()))
                            .unwrap();
        Fixture { store,
                  notifier,
                  engine: Arc::new(engine),
                  incharge: Caller::from(&account) }
    }

    pub fn program(&self, capacity: Option<u32>) -> Program {
        self.engine
            .create_program(&self.incharge, "Bhandara", "Beas", capacity)
            .unwrap()
    }

    /// Habilita la notificación de todas las etapas para el programa.
    pub fn enable_all(&self, program_id: Uuid) {
        for stage in Stage::ALL {
            self.engine
                .resolver()
                .set_program_override(&self.incharge, program_id, stage, Some(true), None)
                .unwrap();
        }
    }

    pub fn sewadar(&self, name: &str) -> Sewadar {
        self.engine
            .register_sewadar(name, Some(format!("{name}@sewa.test")), date(2015, 1, 1))
            .unwrap()
    }

    pub fn activate(&self, program_id: Uuid) {
        self.engine
            .set_program_status(&self.incharge, program_id, ProgramStatus::Active)
            .unwrap();
    }

    /// Solicitud aprobada para cada nombre; el programa debe estar activo.
    pub fn approved(&self, program_id: Uuid, names: &[&str]) -> Vec<Uuid> {
        names.iter()
             .map(|n| {
                 let s = self.sewadar(n);
                 let app = self.engine.apply(s.id, program_id).unwrap();
                 self.engine.approve_application(&self.incharge, app.id).unwrap();
                 s.id
             })
             .collect()
    }

    /// Avances manuales hasta `stage` (sin pasar por release_form).
    pub fn advance_to(&self, program_id: Uuid, stage: Stage) {
        while self.engine.get_or_initialize(program_id).unwrap().current_stage() < stage {
            self.engine.advance(&self.incharge, program_id).unwrap();
        }
    }

    /// Id de la solicitud de `sewadar_id` en el programa.
    pub fn store_application(&self, program_id: Uuid, sewadar_id: Uuid) -> Uuid {
        self.store
            .find_application(program_id, sewadar_id)
            .unwrap()
            .unwrap()
            .id
    }

    pub fn incharge_messages(&self) -> Vec<String> {
        self.notifier.sent_to(INCHARGE_CONTACT)
    }
}
