mod broadcaster;
mod notification;
mod sink;

pub use broadcaster::{Broadcaster, Subscriber, SubscriberError, Subscription, HISTORY_CAPACITY};
pub use notification::{Notification, NotificationDraft, NotificationKind};
pub use sink::{NoopSink, NotificationSink, SinkError, Toast, TracingSink};
