//! Subscription admission.

use std::sync::Arc;

use pwapush_core::{
    NotificationMessage, Subscription, SubscriptionCandidate, SubscriptionRepository,
    ValidationError,
};
use tracing::{debug, info, instrument, warn};

use super::PushTransport;

/// Validates incoming subscriptions and stores them.
///
/// Optionally greets each new subscription with a welcome notification. The
/// greeting is sent in the background and never affects the result of
/// [`register`](Self::register).
pub struct SubscriptionRegistrar {
    store: Arc<dyn SubscriptionRepository>,
    transport: Arc<dyn PushTransport>,
    welcome: Option<NotificationMessage>,
}

impl SubscriptionRegistrar {
    pub fn new(store: Arc<dyn SubscriptionRepository>, transport: Arc<dyn PushTransport>) -> Self {
        Self {
            store,
            transport,
            welcome: Some(NotificationMessage::welcome()),
        }
    }

    /// Replace (or with `None`, disable) the welcome notification.
    #[must_use]
    pub fn with_welcome(mut self, welcome: Option<NotificationMessage>) -> Self {
        self.welcome = welcome;
        self
    }

    /// Admit `candidate` into the store.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] when the endpoint or keys are missing; the
    /// store is left untouched.
    #[instrument(skip_all)]
    pub async fn register(
        &self,
        candidate: SubscriptionCandidate,
    ) -> Result<Subscription, ValidationError> {
        let subscription = candidate.validate().inspect_err(|e| {
            warn!(error = %e, "Rejected subscription");
        })?;

        self.store.add(subscription.clone()).await;
        info!(endpoint = %subscription.endpoint, "Subscription registered");

        if let Some(welcome) = &self.welcome {
            self.spawn_welcome(subscription.clone(), welcome);
        }

        Ok(subscription)
    }

    /// Fire-and-forget the welcome message to one subscription.
    fn spawn_welcome(
        &self,
        subscription: Subscription,
        welcome: &NotificationMessage,
    ) {
        let transport = Arc::clone(&self.transport);
        let payload = welcome.to_payload();
        tokio::spawn(async move {
            match transport.send(&subscription, &payload).await {
                Ok(()) => debug!(endpoint = %subscription.endpoint, "Welcome notification sent"),
                Err(e) => warn!(
                    endpoint = %subscription.endpoint,
                    error = %e,
                    "Error sending welcome notification"
                ),
            }
        });
    }
}
