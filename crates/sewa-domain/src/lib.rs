// sewa-domain library entry point
pub mod application;
pub mod attendance;
pub mod error;
pub mod notification;
pub mod people;
pub mod program;
pub mod selection;
pub mod workflow;
pub use application::{ApplicationStatus, DetailsSubmission, ProgramApplication};
pub use attendance::{Attendance, AttendanceRecord};
pub use error::DomainError;
pub use notification::{EffectivePolicy, NotificationPreference, ProgramNotificationPreference, PROGRAM_TITLE_PLACEHOLDER};
pub use people::{Account, Caller, Role, Sewadar};
pub use program::{LocationCategory, Program, ProgramDate, ProgramStatus};
pub use selection::{ProgramSelection, SelectionStatus};
pub use workflow::{ProgramWorkflow, Stage};
