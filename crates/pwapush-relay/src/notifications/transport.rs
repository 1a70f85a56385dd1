//! Push transport: encrypt, sign and POST one payload to one subscription.
//!
//! [`WebPushTransport`] uses the `web-push` crate for RFC 8291 `aes128gcm`
//! payload encryption and the VAPID JWT, then sends the request itself via
//! `reqwest` so the HTTP client (timeouts, connection pooling, TLS) is ours.

use std::time::Duration;

use async_trait::async_trait;
use pwapush_core::{Error, Subscription};
use tracing::debug;
use web_push::{ContentEncoding, SubscriptionInfo, VapidSignatureBuilder, WebPushMessageBuilder};

use super::{DeliveryError, VapidKeys};

/// Default VAPID `sub` claim when none is configured.
pub const DEFAULT_VAPID_SUBJECT: &str = "mailto:test@example.com";
/// Default time the push service may hold an undelivered message.
pub const DEFAULT_TTL_SECS: u32 = 86_400;

/// Delivers one payload to one subscription.
#[async_trait]
pub trait PushTransport: Send + Sync {
    async fn send(&self, subscription: &Subscription, payload: &[u8]) -> Result<(), DeliveryError>;
}

/// Production transport speaking RFC 8030 to browser push services.
#[derive(Debug)]
pub struct WebPushTransport {
    http: reqwest::Client,
    keys: VapidKeys,
    /// VAPID `sub` claim, a `mailto:` or `https:` contact for the push service.
    subject: String,
    ttl_secs: u32,
    timeout: Duration,
}

impl WebPushTransport {
    /// Build a transport whose HTTP requests are bounded by `timeout`.
    pub fn new(
        keys: VapidKeys,
        subject: impl Into<String>,
        ttl_secs: u32,
        timeout: Duration,
    ) -> pwapush_core::Result<Self> {
        // reqwest is built with rustls-no-provider; an `Err` here only means
        // a provider is already installed.
        let _ = rustls::crypto::ring::default_provider().install_default();

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to build push HTTP client: {e}")))?;

        Ok(Self {
            http,
            keys,
            subject: subject.into(),
            ttl_secs,
            timeout,
        })
    }

    /// Encrypt and sign `payload` for `subscription`.
    fn build_message(
        &self,
        subscription: &Subscription,
        payload: &[u8],
    ) -> Result<web_push::WebPushMessage, DeliveryError> {
        let sub_info = SubscriptionInfo::new(
            &subscription.endpoint,
            &subscription.keys.p256dh,
            &subscription.keys.auth,
        );

        let mut sig_builder = VapidSignatureBuilder::from_base64(self.keys.private_key(), &sub_info)
            .map_err(|e| DeliveryError::Encoding(format!("VAPID signature: {e}")))?;
        sig_builder.add_claim("sub", self.subject.as_str());
        let signature = sig_builder
            .build()
            .map_err(|e| DeliveryError::Encoding(format!("VAPID signing: {e}")))?;

        let mut builder = WebPushMessageBuilder::new(&sub_info);
        builder.set_payload(ContentEncoding::Aes128Gcm, payload);
        builder.set_vapid_signature(signature);
        builder.set_ttl(self.ttl_secs);

        builder
            .build()
            .map_err(|e| DeliveryError::Encoding(format!("payload encryption: {e}")))
    }
}

#[async_trait]
impl PushTransport for WebPushTransport {
    async fn send(&self, subscription: &Subscription, payload: &[u8]) -> Result<(), DeliveryError> {
        let message = self.build_message(subscription, payload)?;

        let mut request = self
            .http
            .post(message.endpoint.to_string())
            .header("TTL", message.ttl.to_string());

        if let Some(urgency) = message.urgency {
            request = request.header("Urgency", urgency.to_string());
        }
        if let Some(topic) = message.topic {
            request = request.header("Topic", topic);
        }
        if let Some(push_payload) = message.payload {
            request = request
                .header("Content-Encoding", push_payload.content_encoding.to_str())
                .header("Content-Type", "application/octet-stream");
            for (key, value) in &push_payload.crypto_headers {
                request = request.header(*key, value.as_str());
            }
            request = request.body(push_payload.content);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                DeliveryError::Timeout(self.timeout)
            } else {
                DeliveryError::Request(e.to_string())
            }
        })?;

        let status = response.status();
        if status.is_success() {
            debug!(status = status.as_u16(), "Push service accepted message");
            return Ok(());
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<failed to read body>".to_string());
        Err(DeliveryError::from_status(status.as_u16(), body))
    }
}
