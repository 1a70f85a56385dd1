//! Notification fan-out.
//!
//! One broadcast takes a snapshot of the store, spawns one delivery task per
//! subscription into a [`JoinSet`], joins them all, and only then evicts the
//! subscriptions the push service reported as gone. A failed or hung attempt
//! never affects its siblings.

use std::sync::Arc;
use std::time::Duration;

use pwapush_core::{NotificationMessage, SubscriptionRepository, ValidationError};
use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{Instrument, info, instrument, warn};

use super::{DeliveryError, PushTransport};

/// Default bound on a single delivery attempt.
pub const DEFAULT_DELIVERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Result of one delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    /// Retained; a later broadcast may succeed.
    TransientFailure { status: Option<u16> },
    /// Scheduled for eviction.
    PermanentFailure { status: u16 },
}

impl DeliveryOutcome {
    pub const fn is_permanent(&self) -> bool {
        matches!(self, Self::PermanentFailure { .. })
    }
}

impl From<&DeliveryError> for DeliveryOutcome {
    fn from(err: &DeliveryError) -> Self {
        match err {
            DeliveryError::Gone { status } => Self::PermanentFailure { status: *status },
            other => Self::TransientFailure {
                status: other.status(),
            },
        }
    }
}

/// Aggregate of one broadcast. `delivered + failed == attempted`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BroadcastSummary {
    pub attempted: usize,
    pub delivered: usize,
    pub failed: usize,
    /// Subscriptions removed from the store after the pass.
    pub evicted: usize,
}

impl BroadcastSummary {
    fn record(&mut self, outcome: DeliveryOutcome) {
        match outcome {
            DeliveryOutcome::Delivered => self.delivered += 1,
            DeliveryOutcome::TransientFailure { .. } | DeliveryOutcome::PermanentFailure { .. } => {
                self.failed += 1;
            }
        }
    }
}

/// Sends one message to every stored subscription.
pub struct NotificationRelay {
    store: Arc<dyn SubscriptionRepository>,
    transport: Arc<dyn PushTransport>,
    delivery_timeout: Duration,
}

impl NotificationRelay {
    pub fn new(store: Arc<dyn SubscriptionRepository>, transport: Arc<dyn PushTransport>) -> Self {
        Self {
            store,
            transport,
            delivery_timeout: DEFAULT_DELIVERY_TIMEOUT,
        }
    }

    #[must_use]
    pub const fn with_delivery_timeout(mut self, timeout: Duration) -> Self {
        self.delivery_timeout = timeout;
        self
    }

    /// Deliver `message` to every current subscription.
    ///
    /// Per-subscription failures are counted, never returned. An empty store
    /// yields an all-zero summary.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] if the title or body is empty; nothing is
    /// sent in that case.
    #[instrument(skip_all, fields(broadcast_id = %uuid::Uuid::new_v4(), tag = %message.tag))]
    pub async fn broadcast(
        &self,
        message: &NotificationMessage,
    ) -> Result<BroadcastSummary, ValidationError> {
        message.validate()?;

        let subscriptions = self.store.list().await;
        if subscriptions.is_empty() {
            info!("No active subscriptions to send notifications to");
            return Ok(BroadcastSummary::default());
        }

        let payload: Arc<[u8]> = message.to_payload().into();
        let mut summary = BroadcastSummary {
            attempted: subscriptions.len(),
            ..BroadcastSummary::default()
        };

        let mut tasks = JoinSet::new();
        for subscription in subscriptions {
            let transport = Arc::clone(&self.transport);
            let payload = Arc::clone(&payload);
            let timeout = self.delivery_timeout;
            tasks.spawn(
                async move {
                    let result =
                        match tokio::time::timeout(timeout, transport.send(&subscription, &payload))
                            .await
                        {
                            Ok(result) => result,
                            Err(_elapsed) => Err(DeliveryError::Timeout(timeout)),
                        };
                    let outcome = match &result {
                        Ok(()) => DeliveryOutcome::Delivered,
                        Err(e) => {
                            warn!(
                                endpoint = %subscription.endpoint,
                                error = %e,
                                permanent = e.is_permanent(),
                                "Error sending notification"
                            );
                            DeliveryOutcome::from(e)
                        }
                    };
                    (subscription.endpoint, outcome)
                }
                .in_current_span(),
            );
        }

        // Eviction waits until every attempt has finished.
        let mut gone = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((endpoint, outcome)) => {
                    summary.record(outcome);
                    if outcome.is_permanent() {
                        gone.push(endpoint);
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Delivery task aborted");
                    summary.failed += 1;
                }
            }
        }

        for endpoint in gone {
            if self.store.remove(&endpoint).await {
                summary.evicted += 1;
                info!(endpoint = %endpoint, "Evicted expired subscription");
            }
        }

        info!(
            attempted = summary.attempted,
            delivered = summary.delivered,
            failed = summary.failed,
            evicted = summary.evicted,
            "Broadcast complete"
        );
        Ok(summary)
    }
}
