//! The channel trait and delivery errors.

use async_trait::async_trait;
use thiserror::Error;

use crate::types::NotificationEvent;

/// A failed delivery attempt on one channel.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The send did not complete within the per-attempt timeout.
    #[error("delivery timed out")]
    Timeout,

    /// The receiving end rejected the notification.
    #[error("delivery rejected: {0}")]
    Rejected(String),

    /// IO failure while delivering.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serializing the payload failed.
    #[error("payload serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// One independent notification delivery mechanism.
///
/// The dispatcher is written once against this trait and is agnostic to
/// how many or which channels exist. Implementations must be safe to call
/// concurrently; the dispatcher may retry `send` after a failure.
#[async_trait]
pub trait Channel: Send + Sync {
    /// A stable name identifying the channel in outcomes and history.
    fn name(&self) -> &str;

    /// Delivers one notification event.
    async fn send(&self, event: &NotificationEvent) -> Result<(), DeliveryError>;
}
