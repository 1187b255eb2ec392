//! Notification fan-out

mod dispatcher;
mod templates;

pub use dispatcher::{DispatcherConfig, NotificationDispatcher, OutboundSender};
pub use templates::{PlainTemplates, Templates};
