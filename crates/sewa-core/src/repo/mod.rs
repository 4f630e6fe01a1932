pub mod memory;
pub mod types;
pub use memory::InMemoryStore;
pub use types::{exceeds_capacity, ApplicationStore, AttendanceStore, DirectoryStore, PreferenceStore, ProgramStore, ReplaceOutcome, SelectionInsert, SelectionStore, Store,
                WorkflowFacts, WorkflowMutation, WorkflowStore};
