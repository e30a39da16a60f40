//! Salted seed derivation.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Caller-supplied identifier of a single decision.
///
/// Only [`key`](UniqueEventId::key) takes part in seed derivation. The timestamp is carried
/// through to the recorder so that interactions can later be joined with rewards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UniqueEventId {
    /// Unique decision key.
    pub key: String,
    /// When the event happened, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl UniqueEventId {
    /// Create an id stamped with the current time.
    pub fn now(key: impl Into<String>) -> UniqueEventId {
        UniqueEventId {
            key: key.into(),
            timestamp: Some(Utc::now()),
        }
    }
}

impl From<String> for UniqueEventId {
    fn from(key: String) -> Self {
        UniqueEventId {
            key,
            timestamp: None,
        }
    }
}

impl From<&str> for UniqueEventId {
    fn from(key: &str) -> Self {
        key.to_owned().into()
    }
}

impl std::fmt::Display for UniqueEventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.key)
    }
}

/// Derive the per-decision seed from an application id and a unique key.
///
/// The seed is the first 8 bytes (big-endian) of `md5("{app_id}-{unique_key}")`. This is a
/// compatibility surface: logs are replayed by external evaluators that must derive the same
/// seed.
pub fn salted_seed(app_id: &str, unique_key: &str) -> u64 {
    let mut context = md5::Context::new();
    context.consume(app_id.as_bytes());
    context.consume(b"-");
    context.consume(unique_key.as_bytes());
    let digest = context.compute();

    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest.0[..8]);
    u64::from_be_bytes(bytes)
}
