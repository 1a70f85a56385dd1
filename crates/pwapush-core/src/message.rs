//! Notification payloads relayed to subscribers.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Tag used when a request does not name one.
pub const DEFAULT_TAG: &str = "default";
/// Click-through target used when a request does not name one.
pub const DEFAULT_URL: &str = "/";

/// One broadcast request.
///
/// Deserializing never fails on missing `title`/`body`; those are caught by
/// [`NotificationMessage::validate`] so callers can answer with a 4xx.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationMessage {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default = "default_tag", deserialize_with = "or_default_tag")]
    pub tag: String,
    #[serde(default = "default_url", deserialize_with = "or_default_url")]
    pub url: String,
}

fn default_tag() -> String {
    DEFAULT_TAG.to_string()
}

fn default_url() -> String {
    DEFAULT_URL.to_string()
}

// `null` and `""` fall back to the default just like an absent field.
fn or_default_tag<'de, D: serde::Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    let v: Option<String> = Option::deserialize(d)?;
    Ok(v.filter(|s| !s.is_empty()).unwrap_or_else(default_tag))
}

fn or_default_url<'de, D: serde::Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    let v: Option<String> = Option::deserialize(d)?;
    Ok(v.filter(|s| !s.is_empty()).unwrap_or_else(default_url))
}

impl NotificationMessage {
    /// Message with the default tag and url.
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            tag: default_tag(),
            url: default_url(),
        }
    }

    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// The greeting sent to a freshly registered subscription.
    pub fn welcome() -> Self {
        Self::new(
            "Welcome to Simple PWA",
            "You are now subscribed to notifications!",
        )
    }

    /// Title and body must both be non-empty.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::MissingTitle);
        }
        if self.body.trim().is_empty() {
            return Err(ValidationError::MissingBody);
        }
        Ok(())
    }

    /// The bytes encrypted for every subscription.
    pub fn to_payload(&self) -> Vec<u8> {
        serde_json::json!({
            "title": self.title,
            "body": self.body,
            "tag": self.tag,
            "url": self.url,
        })
        .to_string()
        .into_bytes()
    }
}
