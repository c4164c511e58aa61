//! Notification domain: per-account subscriptions and the messages they yield.

pub mod events;
pub mod message;
pub mod notification;
pub mod subscription;

pub use events::NotificationEvent;
pub use notification::{Notification, NotificationEventType};
pub use subscription::NotificationSubscription;
