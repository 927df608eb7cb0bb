//! Actor - the subject of a statement (a person or system)

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use std::sync::OnceLock;

/// Default xAPI object type for actors
pub const DEFAULT_OBJECT_TYPE: &str = "Agent";

static MBOX_RE: OnceLock<Regex> = OnceLock::new();

/// Check that an mbox is a `mailto:` email address
pub fn is_valid_mbox(mbox: &str) -> bool {
    let re = MBOX_RE.get_or_init(|| {
        Regex::new(r"^mailto:.+@.+\..+$").expect("mbox regex is valid")
    });
    re.is_match(mbox)
}

/// Hex-encoded SHA-1 digest of an mbox, stored for xAPI parity
pub fn mbox_sha1sum(mbox: &str) -> String {
    hex::encode(Sha1::digest(mbox.as_bytes()))
}

/// A stored actor row.
///
/// `mbox` is the natural key: resolution is always by exact mbox match, and
/// the remaining fields are frozen at creation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Actor {
    pub id: i64,
    pub name: String,
    pub mbox: String,
    pub mbox_sha1sum: Option<String>,
    pub object_type: String,
    pub account_homepage: Option<String>,
    pub account_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields for creating an actor. `mbox` is required; everything else is a
/// creation-time default that later resolutions never overwrite.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewActor {
    pub mbox: String,
    pub name: Option<String>,
    pub object_type: Option<String>,
    pub account_homepage: Option<String>,
    pub account_name: Option<String>,
}

impl NewActor {
    pub fn new(mbox: impl Into<String>) -> Self {
        Self {
            mbox: mbox.into(),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mbox_validation() {
        assert!(is_valid_mbox("mailto:alice@example.com"));
        assert!(!is_valid_mbox("alice@example.com"));
        assert!(!is_valid_mbox("mailto:not-an-email"));
        assert!(!is_valid_mbox(""));
    }

    #[test]
    fn test_mbox_sha1sum() {
        let sum = mbox_sha1sum("mailto:alice@example.com");
        assert_eq!(sum.len(), 40);
        assert_eq!(sum, mbox_sha1sum("mailto:alice@example.com"));
        assert_ne!(sum, mbox_sha1sum("mailto:bob@example.com"));
    }
}
