use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use facematch_codec::Signature;
use serde::{Deserialize, Serialize};

use crate::StoreError;

/// An identity and the signatures enrolled for it.
///
/// A record always holds at least one signature. Records are immutable:
/// the store replaces the whole record on every change, so a reader
/// holding an `Arc<EnrolledRecord>` never observes a partial update.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrolledRecord {
    identity: String,
    signatures: Vec<Signature>,
    enrolled_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl EnrolledRecord {
    pub(crate) fn new(identity: &str, signature: Signature, now: DateTime<Utc>) -> Self {
        Self {
            identity: identity.to_string(),
            signatures: vec![signature],
            enrolled_at: now,
            updated_at: now,
        }
    }

    /// Returns a copy with `signature` appended.
    pub(crate) fn with_signature(&self, signature: Signature, now: DateTime<Utc>) -> Self {
        let mut next = self.clone();
        next.signatures.push(signature);
        next.updated_at = now;
        next
    }

    /// Returns a copy without the signature at `index`, or `None` if that
    /// was the last one.
    pub(crate) fn without_signature(&self, index: usize, now: DateTime<Utc>) -> Option<Self> {
        if self.signatures.len() <= 1 {
            return None;
        }
        let mut next = self.clone();
        next.signatures.remove(index);
        next.updated_at = now;
        Some(next)
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Enrolled signatures in insertion order. Never empty.
    pub fn signatures(&self) -> &[Signature] {
        &self.signatures
    }

    /// When the identity was first enrolled.
    pub fn enrolled_at(&self) -> DateTime<Utc> {
        self.enrolled_at
    }

    /// When a signature was last added or removed.
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Checks the record invariants against the store dimension.
    pub(crate) fn validate(&self, dim: usize) -> Result<(), StoreError> {
        if self.signatures.is_empty() {
            return Err(StoreError::Corrupted {
                identity: self.identity.clone(),
                reason: "record has no signatures".into(),
            });
        }
        for sig in &self.signatures {
            if sig.dimension() != dim {
                return Err(StoreError::Corrupted {
                    identity: self.identity.clone(),
                    reason: format!(
                        "signature dimension {} does not match store dimension {}",
                        sig.dimension(),
                        dim
                    ),
                });
            }
        }
        Ok(())
    }
}

impl fmt::Debug for EnrolledRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnrolledRecord")
            .field("identity", &self.identity)
            .field("signatures", &self.signatures.len())
            .field("enrolled_at", &self.enrolled_at)
            .finish()
    }
}

pub(crate) type RecordMap = BTreeMap<String, Arc<EnrolledRecord>>;

/// A point-in-time view of every enrolled record.
///
/// Cloning is cheap. The snapshot is unaffected by writes that happen
/// after it was taken.
#[derive(Clone, Default)]
pub struct Snapshot {
    records: Arc<RecordMap>,
}

impl Snapshot {
    pub(crate) fn new(records: Arc<RecordMap>) -> Self {
        Self { records }
    }

    /// Iterates records in identity order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<EnrolledRecord>> {
        self.records.values()
    }

    /// Iterates every `(identity, signature)` pair.
    pub fn candidates(&self) -> impl Iterator<Item = (&str, &Signature)> {
        self.records.values().flat_map(|r| {
            r.signatures
                .iter()
                .map(move |sig| (r.identity.as_str(), sig))
        })
    }

    pub fn get(&self, identity: &str) -> Option<&Arc<EnrolledRecord>> {
        self.records.get(identity)
    }

    /// Number of identities.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl<'a> IntoIterator for &'a Snapshot {
    type Item = &'a Arc<EnrolledRecord>;
    type IntoIter = std::collections::btree_map::Values<'a, String, Arc<EnrolledRecord>>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.values()
    }
}

impl fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Snapshot")
            .field("records", &self.records.len())
            .finish()
    }
}
