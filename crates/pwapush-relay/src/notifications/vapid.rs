//! VAPID keypair provisioning (RFC 8292).
//!
//! The keypair is read once at startup. Both halves must be present and
//! well-formed, and the public key must belong to the private key;
//! anything else is a configuration error and the relay refuses to start.

use std::fmt;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD as BASE64URL};
use p256::ecdsa::SigningKey;
use pwapush_core::{Error, Result};

/// Length of an uncompressed SEC1 P-256 point (`0x04 || x || y`).
const PUBLIC_KEY_LEN: usize = 65;
/// Length of a raw P-256 private scalar.
const PRIVATE_KEY_LEN: usize = 32;

/// The server's VAPID keypair.
///
/// Both keys are kept as unpadded base64url: the public key is what browsers
/// pass as `applicationServerKey`, the private scalar is what
/// `web_push::VapidSignatureBuilder::from_base64` expects.
#[derive(Clone)]
pub struct VapidKeys {
    public_key_b64: String,
    private_key_b64: String,
    public_key_bytes: Vec<u8>,
}

impl fmt::Debug for VapidKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VapidKeys")
            .field("public_key", &self.public_key_b64)
            .finish_non_exhaustive()
    }
}

impl VapidKeys {
    /// Generate a fresh keypair.
    pub fn generate() -> Self {
        let signing_key = SigningKey::random(&mut rand::rngs::OsRng);
        let public_key_bytes = signing_key
            .verifying_key()
            .to_encoded_point(false)
            .as_bytes()
            .to_vec();

        Self {
            public_key_b64: BASE64URL.encode(&public_key_bytes),
            private_key_b64: BASE64URL.encode(signing_key.to_bytes().as_slice()),
            public_key_bytes,
        }
    }

    /// Load and validate a keypair from its base64url halves.
    ///
    /// An empty string counts as missing.
    pub fn from_base64url(public_key: &str, private_key: &str) -> Result<Self> {
        if public_key.trim().is_empty() {
            return Err(Error::Config("VAPID public key is missing".into()));
        }
        if private_key.trim().is_empty() {
            return Err(Error::Config("VAPID private key is missing".into()));
        }

        let public_key_bytes = decode_base64url(public_key)
            .map_err(|e| Error::Config(format!("Invalid base64url for VAPID public key: {e}")))?;
        if public_key_bytes.len() != PUBLIC_KEY_LEN || public_key_bytes[0] != 0x04 {
            return Err(Error::Config(format!(
                "VAPID public key must be a {PUBLIC_KEY_LEN}-byte uncompressed P-256 point, got {} bytes",
                public_key_bytes.len()
            )));
        }

        let private_key_bytes = decode_base64url(private_key)
            .map_err(|e| Error::Config(format!("Invalid base64url for VAPID private key: {e}")))?;
        if private_key_bytes.len() != PRIVATE_KEY_LEN {
            return Err(Error::Config(format!(
                "VAPID private key must be a {PRIVATE_KEY_LEN}-byte P-256 scalar, got {} bytes",
                private_key_bytes.len()
            )));
        }
        let signing_key = SigningKey::from_bytes(private_key_bytes.as_slice().into())
            .map_err(|e| Error::Config(format!("VAPID private key is not a valid P-256 scalar: {e}")))?;

        let derived = signing_key.verifying_key().to_encoded_point(false);
        if derived.as_bytes() != public_key_bytes.as_slice() {
            return Err(Error::Config(
                "VAPID public key does not match the private key".into(),
            ));
        }

        Ok(Self {
            public_key_b64: BASE64URL.encode(&public_key_bytes),
            private_key_b64: BASE64URL.encode(&private_key_bytes),
            public_key_bytes,
        })
    }

    /// Base64url public key, served to browsers.
    pub fn public_key(&self) -> &str {
        &self.public_key_b64
    }

    /// Raw uncompressed public key bytes.
    pub fn public_key_bytes(&self) -> &[u8] {
        &self.public_key_bytes
    }

    /// Base64url private scalar.
    pub fn private_key(&self) -> &str {
        &self.private_key_b64
    }
}

/// Decode base64url, tolerating padding and the standard `+`/`/` alphabet.
///
/// Browsers and key generators disagree on both, so a key copied from
/// either should load.
fn decode_base64url(input: &str) -> std::result::Result<Vec<u8>, base64::DecodeError> {
    let normalized: String = input
        .trim()
        .trim_end_matches('=')
        .chars()
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            other => other,
        })
        .collect();
    BASE64URL.decode(normalized)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn generated_keys_have_expected_shape() {
        let keys = VapidKeys::generate();

        assert_eq!(keys.public_key_bytes().len(), PUBLIC_KEY_LEN);
        assert_eq!(keys.public_key_bytes()[0], 0x04);
        let priv_bytes = BASE64URL.decode(keys.private_key()).unwrap();
        assert_eq!(priv_bytes.len(), PRIVATE_KEY_LEN);
    }

    #[test]
    fn generated_keys_reload() {
        let keys = VapidKeys::generate();
        let loaded = VapidKeys::from_base64url(keys.public_key(), keys.private_key()).unwrap();

        assert_eq!(loaded.public_key(), keys.public_key());
        assert_eq!(loaded.private_key(), keys.private_key());
    }

    #[test]
    fn padded_standard_alphabet_is_accepted() {
        let keys = VapidKeys::generate();
        let std_b64 =
            base64::engine::general_purpose::STANDARD.encode(keys.public_key_bytes());

        let loaded = VapidKeys::from_base64url(&std_b64, keys.private_key()).unwrap();
        assert_eq!(loaded.public_key(), keys.public_key());
    }

    #[test]
    fn missing_public_key_is_config_error() {
        let keys = VapidKeys::generate();
        let err = VapidKeys::from_base64url("", keys.private_key()).unwrap_err();
        assert!(matches!(err, Error::Config(ref m) if m.contains("public")), "{err}");
    }

    #[test]
    fn missing_private_key_is_config_error() {
        let keys = VapidKeys::generate();
        let err = VapidKeys::from_base64url(keys.public_key(), "  ").unwrap_err();
        assert!(matches!(err, Error::Config(ref m) if m.contains("private")), "{err}");
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(VapidKeys::from_base64url("not-valid-key!", "also-bad").is_err());
    }

    #[test]
    fn short_private_key_is_rejected() {
        let keys = VapidKeys::generate();
        let err =
            VapidKeys::from_base64url(keys.public_key(), &BASE64URL.encode([1u8; 16])).unwrap_err();
        assert!(matches!(err, Error::Config(ref m) if m.contains("32-byte")), "{err}");
    }

    #[test]
    fn mismatched_halves_are_rejected() {
        let a = VapidKeys::generate();
        let b = VapidKeys::generate();
        let err = VapidKeys::from_base64url(a.public_key(), b.private_key()).unwrap_err();
        assert!(matches!(err, Error::Config(ref m) if m.contains("does not match")), "{err}");
    }

    #[test]
    fn debug_hides_private_key() {
        let keys = VapidKeys::generate();
        let dbg = format!("{keys:?}");
        assert!(!dbg.contains(keys.private_key()));
    }

    #[test]
    fn generated_key_is_accepted_by_web_push() {
        use web_push::{SubscriptionInfo, VapidSignatureBuilder};

        let keys = VapidKeys::generate();
        let sub = SubscriptionInfo::new(
            "https://push.example.com/test",
            "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA",
            "AAAAAAAAAAAAAAAAAAAAAA",
        );
        assert!(VapidSignatureBuilder::from_base64(keys.private_key(), &sub).is_ok());
    }
}
