use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use facematch_codec::Signature;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use crate::record::{EnrolledRecord, RecordMap, Snapshot};
use crate::StoreError;

/// What `enroll` does when the identity already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollPolicy {
    /// Append the signature to the existing record.
    #[default]
    Append,
    /// Fail with [`StoreError::DuplicateIdentity`].
    RejectExisting,
}

/// Controls store behavior.
#[derive(Debug, Clone, Copy)]
pub struct StoreConfig {
    /// Signature dimension every enrolled signature must have.
    pub dimension: usize,

    /// Behavior when enrolling an existing identity. Default: append.
    pub policy: EnrollPolicy,
}

impl StoreConfig {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            policy: EnrollPolicy::default(),
        }
    }
}

/// Repository of enrolled identities and their signatures.
///
/// Implementations must be safe for concurrent use. Readers get an
/// immutable [`Snapshot`]; a write is either fully visible in later
/// snapshots or not at all.
pub trait SignatureStore: Send + Sync {
    /// Enrolls a signature for `identity`, creating the record if needed.
    fn enroll(&self, identity: &str, signature: Signature) -> Result<(), StoreError>;

    /// Removes the whole record. Returns the removed record.
    fn remove(&self, identity: &str) -> Result<Arc<EnrolledRecord>, StoreError>;

    /// Removes a single signature. Removing the last signature removes
    /// the record.
    fn remove_signature(&self, identity: &str, index: usize) -> Result<(), StoreError>;

    /// Returns a consistent snapshot of all records.
    fn all(&self) -> Result<Snapshot, StoreError>;

    /// Signature dimension enforced by this store.
    fn dimension(&self) -> usize;

    /// Returns the record for `identity`, if enrolled.
    fn get(&self, identity: &str) -> Result<Option<Arc<EnrolledRecord>>, StoreError> {
        Ok(self.all()?.get(identity).cloned())
    }

    /// Returns the number of enrolled identities.
    fn len(&self) -> Result<usize, StoreError> {
        Ok(self.all()?.len())
    }

    fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }
}

impl fmt::Debug for dyn SignatureStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SignatureStore {{ dim: {} }}", self.dimension())
    }
}

/// A single record-level mutation, handed to the persistence hook before
/// it becomes visible to readers.
pub(crate) enum Change {
    Put(Arc<EnrolledRecord>),
    Delete(String),
}

/// Copy-on-write record collection shared by the store implementations.
///
/// Readers clone the current `Arc` under a short read lock. Writers are
/// serialized by `writer`, build the next map off to the side, run the
/// commit hook, and only then swap the `Arc`. A failed commit leaves the
/// published map unchanged.
pub(crate) struct RecordSet {
    current: RwLock<Arc<RecordMap>>,
    writer: Mutex<()>,
    cfg: StoreConfig,
}

impl RecordSet {
    pub(crate) fn new(cfg: StoreConfig, records: RecordMap) -> Self {
        Self {
            current: RwLock::new(Arc::new(records)),
            writer: Mutex::new(()),
            cfg,
        }
    }

    pub(crate) fn dimension(&self) -> usize {
        self.cfg.dimension
    }

    pub(crate) fn snapshot(&self) -> Snapshot {
        Snapshot::new(self.current.read().clone())
    }

    pub(crate) fn enroll<C>(
        &self,
        identity: &str,
        signature: Signature,
        commit: C,
    ) -> Result<Arc<EnrolledRecord>, StoreError>
    where
        C: FnOnce(&Change) -> Result<(), StoreError>,
    {
        validate_identity(identity)?;
        if signature.dimension() != self.cfg.dimension {
            return Err(StoreError::DimensionMismatch {
                expected: self.cfg.dimension,
                got: signature.dimension(),
            });
        }
        let policy = self.cfg.policy;
        self.write(
            |map| {
                let now = Utc::now();
                let record = match map.get(identity) {
                    Some(_) if policy == EnrollPolicy::RejectExisting => {
                        return Err(StoreError::DuplicateIdentity(identity.to_string()));
                    }
                    Some(existing) => existing.with_signature(signature, now),
                    None => EnrolledRecord::new(identity, signature, now),
                };
                let record = Arc::new(record);
                Ok((Change::Put(record.clone()), record))
            },
            commit,
        )
    }

    pub(crate) fn remove<C>(&self, identity: &str, commit: C) -> Result<Arc<EnrolledRecord>, StoreError>
    where
        C: FnOnce(&Change) -> Result<(), StoreError>,
    {
        self.write(
            |map| match map.get(identity) {
                Some(existing) => Ok((Change::Delete(identity.to_string()), existing.clone())),
                None => Err(StoreError::NotFound(identity.to_string())),
            },
            commit,
        )
    }

    pub(crate) fn remove_signature<C>(
        &self,
        identity: &str,
        index: usize,
        commit: C,
    ) -> Result<(), StoreError>
    where
        C: FnOnce(&Change) -> Result<(), StoreError>,
    {
        self.write(
            |map| {
                let existing = map
                    .get(identity)
                    .ok_or_else(|| StoreError::NotFound(identity.to_string()))?;
                if index >= existing.signatures().len() {
                    return Err(StoreError::SignatureNotFound {
                        identity: identity.to_string(),
                        index,
                    });
                }
                let change = match existing.without_signature(index, Utc::now()) {
                    Some(next) => Change::Put(Arc::new(next)),
                    None => Change::Delete(identity.to_string()),
                };
                Ok((change, ()))
            },
            commit,
        )
    }

    fn write<T, P, C>(&self, plan: P, commit: C) -> Result<T, StoreError>
    where
        P: FnOnce(&RecordMap) -> Result<(Change, T), StoreError>,
        C: FnOnce(&Change) -> Result<(), StoreError>,
    {
        let _guard = self.writer.lock();
        let current = self.current.read().clone();

        let (change, out) = plan(current.as_ref())?;
        commit(&change)?;

        let mut next = (*current).clone();
        match change {
            Change::Put(record) => {
                next.insert(record.identity().to_string(), record);
            }
            Change::Delete(identity) => {
                next.remove(&identity);
            }
        }
        *self.current.write() = Arc::new(next);
        Ok(out)
    }
}

fn validate_identity(identity: &str) -> Result<(), StoreError> {
    if identity.trim().is_empty() {
        return Err(StoreError::InvalidIdentity(identity.to_string()));
    }
    Ok(())
}
