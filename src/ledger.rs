// Event journal: append-only, hash-linked record of every committed event.
// Each entry commits to its predecessor, so a replayed snapshot can be checked end to end.

use crate::event::SuretyEvent;
use crate::types::Hash;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Genesis marker: prev_hash = all-zeroes means no parent.
pub const ZERO_HASH: Hash = [0u8; 32];

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub seq: u64,
    #[serde(with = "hex_hash")]
    pub prev_hash: Hash,
    #[serde(with = "hex_hash")]
    pub hash: Hash,
    pub event: SuretyEvent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JournalError {
    BrokenLink { seq: u64 },
    BadHash { seq: u64 },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventJournal {
    entries: Vec<JournalEntry>,
}

impl EventJournal {
    pub fn new() -> Self {
        EventJournal { entries: Vec::new() }
    }

    pub fn hash_entry(seq: u64, prev_hash: &Hash, event: &SuretyEvent) -> Hash {
        let mut hasher = Sha256::new();
        hasher.update(seq.to_le_bytes());
        hasher.update(prev_hash);
        hasher.update(event.canonical_bytes());
        hasher.finalize().into()
    }

    pub fn head(&self) -> Hash {
        self.entries.last().map(|e| e.hash).unwrap_or(ZERO_HASH)
    }

    pub fn append(&mut self, event: SuretyEvent) -> Hash {
        let seq = self.entries.len() as u64;
        let prev_hash = self.head();
        let hash = Self::hash_entry(seq, &prev_hash, &event);
        self.entries.push(JournalEntry {
            seq,
            prev_hash,
            hash,
            event,
        });
        hash
    }

    /// Drop entries appended after `len` (uncommitted tail).
    pub(crate) fn truncate(&mut self, len: usize) {
        self.entries.truncate(len);
    }

    pub fn entries(&self) -> &[JournalEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Re-derive every hash and link; used after loading a snapshot.
    pub fn verify(&self) -> Result<(), JournalError> {
        let mut prev = ZERO_HASH;
        for (i, e) in self.entries.iter().enumerate() {
            let seq = i as u64;
            if e.seq != seq || e.prev_hash != prev {
                return Err(JournalError::BrokenLink { seq });
            }
            if Self::hash_entry(seq, &e.prev_hash, &e.event) != e.hash {
                return Err(JournalError::BadHash { seq });
            }
            prev = e.hash;
        }
        Ok(())
    }

    /// Deterministic Merkle root over entry hashes in journal order.
    /// None iff the journal is empty.
    pub fn merkle_root(&self) -> Option<Hash> {
        if self.entries.is_empty() {
            return None;
        }
        let mut level: Vec<Hash> = self.entries.iter().map(|e| e.hash).collect();

        while level.len() > 1 {
            let mut next: Vec<Hash> = Vec::with_capacity(level.len().div_ceil(2));
            let mut i = 0;
            while i < level.len() {
                let a = level[i];
                let b = if i + 1 < level.len() {
                    level[i + 1]
                } else {
                    level[i]
                };
                let mut hasher = Sha256::new();
                hasher.update(a);
                hasher.update(b);
                next.push(hasher.finalize().into());
                i += 2;
            }
            level = next;
        }

        level.first().copied()
    }
}

mod hex_hash {
    use crate::types::Hash;
    use hex::FromHex;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(h: &Hash, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&hex::encode(h))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Hash, D::Error> {
        let s = String::deserialize(d)?;
        <Hash>::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
