//! Collections: named, ordered groupings of items.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const COLLECTION_ID_LEN: usize = 6;
const COLLECTION_ID_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Generates a fresh 6-character collection id.
pub fn generate_collection_id() -> String {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    (0..COLLECTION_ID_LEN)
        .map(|_| {
            let idx = rng.gen_range(0..COLLECTION_ID_ALPHABET.len());
            COLLECTION_ID_ALPHABET[idx] as char
        })
        .collect()
}

/// A shallow, ordered view over a set of items. The core never mutates
/// items through a collection; re-submitting one only re-enters the
/// pipeline for its member tiids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collection {
    pub cid: String,
    pub title: String,
    pub owner_ip: String,
    pub tiids: Vec<String>,
    pub created: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

impl Collection {
    pub fn new(
        cid: impl Into<String>,
        title: impl Into<String>,
        owner_ip: impl Into<String>,
        tiids: Vec<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            cid: cid.into(),
            title: title.into(),
            owner_ip: owner_ip.into(),
            tiids,
            created: now,
            last_modified: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collection_id_has_expected_length() {
        let cid = generate_collection_id();
        assert_eq!(cid.len(), COLLECTION_ID_LEN);
    }
}
