//! Web Push delivery.
//!
//! Provides:
//! - [`VapidKeys`] for the server's VAPID keypair (RFC 8292)
//! - [`PushTransport`] and its production [`WebPushTransport`]
//! - [`SubscriptionRegistrar`] for admitting new subscriptions
//! - [`NotificationRelay`] for fanning a message out to every subscription

pub mod fanout;
pub mod registrar;
pub mod transport;
pub mod vapid;

#[cfg(test)]
pub(crate) mod testing;

use std::time::Duration;

pub use fanout::{BroadcastSummary, DeliveryOutcome, NotificationRelay};
pub use registrar::SubscriptionRegistrar;
pub use transport::{PushTransport, WebPushTransport};
pub use vapid::VapidKeys;

/// Errors from a single delivery attempt to one subscription.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// The push service says the subscription no longer exists.
    #[error("subscription gone (status {status})")]
    Gone {
        /// HTTP status code returned by the push service.
        status: u16,
    },

    /// The push service returned some other non-success status.
    #[error("push service error (status {status}): {body}")]
    Rejected {
        /// HTTP status code returned by the push service.
        status: u16,
        /// Response body from the push service.
        body: String,
    },

    /// HTTP request to the push service failed before a status came back.
    #[error("push request error: {0}")]
    Request(String),

    /// No answer within the per-attempt bound.
    #[error("push delivery timed out after {0:?}")]
    Timeout(Duration),

    /// Payload encryption or VAPID signing failed.
    #[error("push message encoding error: {0}")]
    Encoding(String),
}

impl DeliveryError {
    /// Classify a non-success push service response.
    ///
    /// 404 and 410 both mean the subscription has expired or the user
    /// unsubscribed; anything else may succeed on a later attempt.
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            404 | 410 => Self::Gone { status },
            _ => Self::Rejected { status, body },
        }
    }

    /// Whether the subscription should be dropped.
    pub const fn is_permanent(&self) -> bool {
        matches!(self, Self::Gone { .. })
    }

    /// HTTP status from the push service, if one was received.
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Gone { status } | Self::Rejected { status, .. } => Some(*status),
            Self::Request(_) | Self::Timeout(_) | Self::Encoding(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gone_and_not_found_are_permanent() {
        assert!(DeliveryError::from_status(410, String::new()).is_permanent());
        assert!(DeliveryError::from_status(404, String::new()).is_permanent());
    }

    #[test]
    fn other_statuses_are_transient() {
        for status in [400, 413, 429, 500, 503] {
            let err = DeliveryError::from_status(status, "nope".into());
            assert!(!err.is_permanent(), "status {status} should be transient");
            assert_eq!(err.status(), Some(status));
        }
    }

    #[test]
    fn transport_failures_have_no_status() {
        assert_eq!(DeliveryError::Request("refused".into()).status(), None);
        assert_eq!(
            DeliveryError::Timeout(Duration::from_secs(5)).status(),
            None
        );
        assert!(!DeliveryError::Timeout(Duration::from_secs(5)).is_permanent());
    }
}
