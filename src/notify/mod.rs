//! Notification Dispatcher
//!
//! Renders one status message per configured channel and delivers each
//! independently; the [`DeliveryPolicy`] decides what counts as success.

pub mod channel;
pub mod dispatcher;
pub mod message;

pub use channel::{Channel, CHANNEL_NAMES};
pub use dispatcher::{ChannelResult, DeliveryPolicy, DeliveryReport, Notifier};
pub use message::{BuildContext, Message, NotifyStatus};
