//! sewa-core: motor de workflow de programas y selección de participantes
pub mod constants;
pub mod engine;
pub mod errors;
pub mod notify;
pub mod repo;

pub use engine::{EngineBuilder, EngineSettings, SelectionResult, SweepReport, WorkflowEngine, WorkflowStatus};
pub use errors::{StoreError, ValidationFailure, WorkflowError};
pub use notify::{DispatchReport, LogNotifier, NotificationDispatcher, NotificationPolicyResolver, Notifier, NotifyError, RecordingNotifier,
                 SentMessage};
pub use repo::{InMemoryStore, Store, WorkflowFacts};
