pub mod conflict;
pub mod follow_up;
pub mod lifecycle;
pub mod notification;
pub mod workflow;

pub use conflict::ConflictDetectionService;
pub use follow_up::FollowUpChainService;
pub use lifecycle::{AppointmentAction, AppointmentLifecycleService, FollowUpAction};
pub use notification::{Notification, NotificationKind, NotificationSink, TracingNotificationSink};
pub use workflow::AppointmentWorkflow;
