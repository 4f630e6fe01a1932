pub mod dispatch;
pub mod notifier;
pub mod policy;

pub use dispatch::{DispatchReport, NotificationDispatcher};
pub use notifier::{LogNotifier, Notifier, NotifyError, RecordingNotifier, SentMessage};
pub use policy::NotificationPolicyResolver;
