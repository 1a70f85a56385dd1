//! Browser push subscriptions.
//!
//! A [`Subscription`] is what `PushManager.subscribe()` hands back to the
//! browser: the push service endpoint plus the key material needed to
//! encrypt payloads for it. Inbound records arrive as a
//! [`SubscriptionCandidate`] and only become a `Subscription` after
//! [`SubscriptionCandidate::validate`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Name of the client ECDH public key in the `keys` map.
pub const P256DH_KEY: &str = "p256dh";
/// Name of the client auth secret in the `keys` map.
pub const AUTH_KEY: &str = "auth";

/// Key material a push service requires to encrypt a payload (RFC 8291).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionKeys {
    /// Client P-256 ECDH public key (base64url).
    pub p256dh: String,
    /// Client authentication secret (base64url).
    pub auth: String,
}

/// An admitted push subscription.
///
/// Identity is the endpoint string. Two records with the same endpoint are
/// the same client installation as far as eviction is concerned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    /// Push service channel URI, unique per client installation.
    pub endpoint: String,
    pub keys: SubscriptionKeys,
}

impl Subscription {
    pub fn new(endpoint: impl Into<String>, p256dh: impl Into<String>, auth: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            keys: SubscriptionKeys {
                p256dh: p256dh.into(),
                auth: auth.into(),
            },
        }
    }

    /// Whether `endpoint` identifies this subscription.
    pub fn has_endpoint(&self, endpoint: &str) -> bool {
        self.endpoint == endpoint
    }
}

/// An unvalidated subscription as posted by a client.
///
/// Every field is optional so a missing field surfaces as a
/// [`ValidationError`] rather than a decode failure. `expirationTime` and any
/// unknown fields are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionCandidate {
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub keys: Option<BTreeMap<String, String>>,
}

impl SubscriptionCandidate {
    /// Check the admission invariant and produce a [`Subscription`].
    ///
    /// The endpoint must be non-empty and `keys` must carry non-empty
    /// `p256dh` and `auth` entries. Extra key entries are dropped.
    pub fn validate(self) -> Result<Subscription, ValidationError> {
        let endpoint = self
            .endpoint
            .filter(|e| !e.trim().is_empty())
            .ok_or(ValidationError::MissingEndpoint)?;

        let mut keys = self
            .keys
            .filter(|k| !k.is_empty())
            .ok_or(ValidationError::MissingKeys)?;

        let p256dh = take_key(&mut keys, P256DH_KEY)?;
        let auth = take_key(&mut keys, AUTH_KEY)?;

        Ok(Subscription {
            endpoint,
            keys: SubscriptionKeys { p256dh, auth },
        })
    }
}

fn take_key(
    keys: &mut BTreeMap<String, String>,
    name: &'static str,
) -> Result<String, ValidationError> {
    keys.remove(name)
        .filter(|v| !v.is_empty())
        .ok_or(ValidationError::MissingKey(name))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn candidate(json: &str) -> SubscriptionCandidate {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn browser_subscription_json_is_admitted() {
        let sub = candidate(
            r#"{
                "endpoint": "https://fcm.googleapis.com/fcm/send/abc",
                "expirationTime": null,
                "keys": {"p256dh": "k1", "auth": "k2"}
            }"#,
        )
        .validate()
        .unwrap();

        assert_eq!(sub.endpoint, "https://fcm.googleapis.com/fcm/send/abc");
        assert_eq!(sub.keys.p256dh, "k1");
        assert_eq!(sub.keys.auth, "k2");
    }

    #[test]
    fn empty_endpoint_and_keys_rejected() {
        let err = candidate(r#"{"endpoint": "", "keys": {}}"#)
            .validate()
            .unwrap_err();
        assert_eq!(err, ValidationError::MissingEndpoint);
    }

    #[test]
    fn missing_keys_rejected() {
        let err = candidate(r#"{"endpoint": "e1"}"#).validate().unwrap_err();
        assert_eq!(err, ValidationError::MissingKeys);
    }

    #[test]
    fn empty_keys_rejected() {
        let err = candidate(r#"{"endpoint": "e1", "keys": {}}"#)
            .validate()
            .unwrap_err();
        assert_eq!(err, ValidationError::MissingKeys);
    }

    #[test]
    fn missing_auth_secret_rejected() {
        let err = candidate(r#"{"endpoint": "e1", "keys": {"p256dh": "k1"}}"#)
            .validate()
            .unwrap_err();
        assert_eq!(err, ValidationError::MissingKey(AUTH_KEY));
    }

    #[test]
    fn whitespace_endpoint_rejected() {
        let err = candidate(r#"{"endpoint": "  ", "keys": {"p256dh": "k1", "auth": "k2"}}"#)
            .validate()
            .unwrap_err();
        assert_eq!(err, ValidationError::MissingEndpoint);
    }

    #[test]
    fn empty_object_rejected() {
        let err = candidate("{}").validate().unwrap_err();
        assert_eq!(err, ValidationError::MissingEndpoint);
    }
}
