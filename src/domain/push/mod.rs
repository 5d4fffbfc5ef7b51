//! Push domain - stored subscriptions and the notification payload built
//! from events.

mod notification;
mod subscription;

pub use notification::{NotificationData, PushNotification};
pub use subscription::{PushKeys, PushSubscription, Recipient, Subscriber};
