//! Notification fan-out with per-channel retry and isolation.
//!
//! The dispatcher delivers one [`NotificationEvent`] to every configured
//! channel independently: a failure in one channel never prevents, or gets
//! conflated with, another channel's outcome. Concrete channels (webhook,
//! chat platforms, email, OS toasts) are external collaborators that
//! implement the single-method [`Channel`] trait; this crate ships only the
//! file/JSON-append channel, which has no wire protocol.
//!
//! [`NotificationEvent`]: crate::types::NotificationEvent

mod channel;
mod dispatch;
mod file;

pub use channel::{Channel, DeliveryError};
pub use dispatch::{DispatchOutcome, Dispatcher};
pub use file::FileChannel;
