//! Subscription storage.
//!
//! [`SubscriptionRepository`] is the only way the registrar and the relay
//! touch the set of subscriptions, so a persistent backend can replace
//! [`InMemorySubscriptionStore`] without changing either of them.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::subscription::Subscription;

/// Storage interface for admitted subscriptions.
///
/// Duplicate endpoints are allowed. `remove` is keyed by endpoint and drops
/// the first matching record only, so with duplicates present it is not
/// guaranteed to hit the exact record that failed.
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// Append a validated subscription.
    async fn add(&self, subscription: Subscription);

    /// Snapshot of the current subscriptions.
    async fn list(&self) -> Vec<Subscription>;

    /// Remove one record with the given endpoint. Returns `false` if none
    /// matched.
    async fn remove(&self, endpoint: &str) -> bool;

    /// Number of stored subscriptions.
    async fn count(&self) -> usize;
}

/// Process-lifetime, unbounded subscription list.
///
/// Writers are serialized by the lock; [`list`](SubscriptionRepository::list)
/// clones, so a fan-out pass never holds the lock while sending.
#[derive(Clone, Default)]
pub struct InMemorySubscriptionStore {
    subscriptions: Arc<RwLock<Vec<Subscription>>>,
}

impl InMemorySubscriptionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SubscriptionRepository for InMemorySubscriptionStore {
    async fn add(&self, subscription: Subscription) {
        let mut subs = self.subscriptions.write().await;
        debug!(endpoint = %subscription.endpoint, "Subscription stored");
        subs.push(subscription);
    }

    async fn list(&self) -> Vec<Subscription> {
        self.subscriptions.read().await.clone()
    }

    async fn remove(&self, endpoint: &str) -> bool {
        let mut subs = self.subscriptions.write().await;
        let Some(idx) = subs.iter().position(|s| s.has_endpoint(endpoint)) else {
            return false;
        };
        subs.remove(idx);
        info!(endpoint = %endpoint, remaining = subs.len(), "Subscription removed");
        true
    }

    async fn count(&self) -> usize {
        self.subscriptions.read().await.len()
    }
}
