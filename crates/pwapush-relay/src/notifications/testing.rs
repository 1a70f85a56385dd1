//! Scripted push transport for unit tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use pwapush_core::Subscription;
use tokio::sync::Notify;

use super::{DeliveryError, PushTransport};

/// What the fake push service does for one endpoint.
#[derive(Debug, Clone, Copy)]
pub enum Behavior {
    Deliver,
    Status(u16),
    NetworkError,
    Hang,
    /// Answer with the status only after [`ScriptedTransport::release`].
    Gated(u16),
    Panic,
}

/// Transport that answers per endpoint and records every attempt.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    behaviors: HashMap<String, Behavior>,
    calls: Mutex<Vec<(String, Vec<u8>)>>,
    entered: Notify,
    released: Notify,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, endpoint: &str, behavior: Behavior) -> Self {
        self.behaviors.insert(endpoint.to_string(), behavior);
        self
    }

    /// Endpoints attempted so far, in completion-independent order.
    #[allow(clippy::unwrap_used)]
    pub fn attempted(&self) -> Vec<String> {
        let mut endpoints: Vec<_> = self
            .calls
            .lock()
            .unwrap()
            .iter()
            .map(|(e, _)| e.clone())
            .collect();
        endpoints.sort();
        endpoints
    }

    /// Wait until a `Gated` send is in flight.
    pub async fn wait_entered(&self) {
        self.entered.notified().await;
    }

    /// Let one `Gated` send answer.
    pub fn release(&self) {
        self.released.notify_one();
    }

    #[allow(clippy::unwrap_used)]
    pub fn payloads(&self) -> Vec<Vec<u8>> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(_, p)| p.clone())
            .collect()
    }
}

#[async_trait]
impl PushTransport for ScriptedTransport {
    #[allow(clippy::unwrap_used, clippy::panic)]
    async fn send(&self, subscription: &Subscription, payload: &[u8]) -> Result<(), DeliveryError> {
        self.calls
            .lock()
            .unwrap()
            .push((subscription.endpoint.clone(), payload.to_vec()));

        match self
            .behaviors
            .get(&subscription.endpoint)
            .copied()
            .unwrap_or(Behavior::Deliver)
        {
            Behavior::Deliver => Ok(()),
            Behavior::Status(status) => Err(DeliveryError::from_status(status, String::new())),
            Behavior::NetworkError => Err(DeliveryError::Request("connection refused".into())),
            Behavior::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(())
            }
            Behavior::Gated(status) => {
                self.entered.notify_one();
                self.released.notified().await;
                Err(DeliveryError::from_status(status, String::new()))
            }
            Behavior::Panic => panic!("push service client blew up"),
        }
    }
}

/// Poll until `cond` holds, for tasks spawned in the background.
pub async fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    cond()
}
