//! Redb-backed persistent signature store.

use std::path::Path;
use std::sync::Arc;

use facematch_codec::Signature;
use redb::{Database, ReadableTable, TableDefinition};
use tracing::{info, warn};

use crate::record::{EnrolledRecord, RecordMap, Snapshot};
use crate::store::{Change, RecordSet, SignatureStore, StoreConfig};
use crate::StoreError;

/// identity -> JSON-encoded [`EnrolledRecord`].
const RECORDS: TableDefinition<&str, &[u8]> = TableDefinition::new("records");

/// A durable [`SignatureStore`] backed by redb.
///
/// Reads are served from an in-memory snapshot loaded at open time. Every
/// write commits a redb transaction first and publishes the new snapshot
/// only after the commit succeeds, so disk and memory never disagree.
pub struct RedbStore {
    db: Database,
    records: RecordSet,
}

impl RedbStore {
    /// Opens or creates a store at the given path and loads all records.
    ///
    /// Every stored record is validated against `cfg.dimension`; a record
    /// that fails is reported as [`StoreError::Corrupted`].
    pub fn open<P: AsRef<Path>>(path: P, cfg: StoreConfig) -> Result<Self, StoreError> {
        let db = Database::create(path.as_ref()).map_err(storage)?;

        // Create the table if it doesn't exist.
        let tx = db.begin_write().map_err(storage)?;
        {
            let _ = tx.open_table(RECORDS).map_err(storage)?;
        }
        tx.commit().map_err(storage)?;

        let records = load(&db, cfg.dimension)?;
        info!(
            "opened signature store {} ({} identities)",
            path.as_ref().display(),
            records.len()
        );

        Ok(Self {
            db,
            records: RecordSet::new(cfg, records),
        })
    }

    fn persist(&self, change: &Change) -> Result<(), StoreError> {
        let tx = self.db.begin_write().map_err(storage)?;
        {
            let mut table = tx.open_table(RECORDS).map_err(storage)?;
            match change {
                Change::Put(record) => {
                    let value = serde_json::to_vec(record.as_ref())
                        .map_err(|e| StoreError::Storage(format!("encode record: {e}")))?;
                    table
                        .insert(record.identity(), value.as_slice())
                        .map_err(storage)?;
                }
                Change::Delete(identity) => {
                    table.remove(identity.as_str()).map_err(storage)?;
                }
            }
        }
        tx.commit().map_err(storage)?;
        Ok(())
    }
}

impl SignatureStore for RedbStore {
    fn enroll(&self, identity: &str, signature: Signature) -> Result<(), StoreError> {
        let record = self
            .records
            .enroll(identity, signature, |c| self.persist(c))
            .inspect_err(|e| warn!("enroll {} failed: {}", identity, e))?;
        info!(
            "enrolled {} ({} signature(s))",
            identity,
            record.signatures().len()
        );
        Ok(())
    }

    fn remove(&self, identity: &str) -> Result<Arc<EnrolledRecord>, StoreError> {
        let removed = self.records.remove(identity, |c| self.persist(c))?;
        info!("removed {}", identity);
        Ok(removed)
    }

    fn remove_signature(&self, identity: &str, index: usize) -> Result<(), StoreError> {
        self.records
            .remove_signature(identity, index, |c| self.persist(c))
            .inspect_err(|e| warn!("remove signature {} of {} failed: {}", index, identity, e))?;
        info!("removed signature {} of {}", index, identity);
        Ok(())
    }

    fn all(&self) -> Result<Snapshot, StoreError> {
        Ok(self.records.snapshot())
    }

    fn dimension(&self) -> usize {
        self.records.dimension()
    }
}

fn load(db: &Database, dim: usize) -> Result<RecordMap, StoreError> {
    let tx = db.begin_read().map_err(storage)?;
    let table = tx.open_table(RECORDS).map_err(storage)?;

    let mut records = RecordMap::new();
    for item in table.iter().map_err(storage)? {
        let (key, value) = item.map_err(storage)?;
        let identity = key.value().to_string();
        let record: EnrolledRecord =
            serde_json::from_slice(value.value()).map_err(|e| StoreError::Corrupted {
                identity: identity.clone(),
                reason: e.to_string(),
            })?;
        if record.identity() != identity {
            return Err(StoreError::Corrupted {
                reason: format!("key does not match record identity {:?}", record.identity()),
                identity,
            });
        }
        record.validate(dim)?;
        records.insert(identity, Arc::new(record));
    }
    Ok(records)
}

fn storage<E: std::fmt::Display>(e: E) -> StoreError {
    StoreError::Storage(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EnrollPolicy;
    use tempfile::tempdir;

    fn sig(v: &[f32]) -> Signature {
        Signature::new(v.to_vec(), v.len()).unwrap()
    }

    #[test]
    fn test_redb_enroll_and_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("faces.redb");

        {
            let store = RedbStore::open(&path, StoreConfig::new(3)).unwrap();
            store.enroll("alice", sig(&[1.0, 0.0, 0.0])).unwrap();
            store.enroll("alice", sig(&[0.9, 0.1, 0.0])).unwrap();
            store.enroll("bob", sig(&[0.0, 1.0, 0.0])).unwrap();
        }

        let store = RedbStore::open(&path, StoreConfig::new(3)).unwrap();
        let snap = store.all().unwrap();
        assert_eq!(snap.len(), 2);
        let alice = snap.get("alice").unwrap();
        assert_eq!(alice.signatures().len(), 2);
        assert_eq!(alice.signatures()[1].as_slice(), &[0.9, 0.1, 0.0]);
    }

    #[test]
    fn test_redb_remove_is_durable() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("faces.redb");

        {
            let store = RedbStore::open(&path, StoreConfig::new(2)).unwrap();
            store.enroll("alice", sig(&[1.0, 0.0])).unwrap();
            store.enroll("bob", sig(&[0.0, 1.0])).unwrap();
            store.remove("alice").unwrap();
        }

        let store = RedbStore::open(&path, StoreConfig::new(2)).unwrap();
        assert!(store.get("alice").unwrap().is_none());
        assert!(store.get("bob").unwrap().is_some());
        assert!(matches!(
            store.remove("alice"),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_redb_remove_signature_is_durable() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("faces.redb");

        {
            let store = RedbStore::open(&path, StoreConfig::new(2)).unwrap();
            store.enroll("alice", sig(&[1.0, 0.0])).unwrap();
            store.enroll("alice", sig(&[0.0, 1.0])).unwrap();
            store.remove_signature("alice", 1).unwrap();
        }

        let store = RedbStore::open(&path, StoreConfig::new(2)).unwrap();
        let rec = store.get("alice").unwrap().unwrap();
        assert_eq!(rec.signatures().len(), 1);
        assert_eq!(rec.signatures()[0].as_slice(), &[1.0, 0.0]);
    }

    #[test]
    fn test_redb_reopen_with_other_dimension_is_corrupted() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("faces.redb");

        {
            let store = RedbStore::open(&path, StoreConfig::new(2)).unwrap();
            store.enroll("alice", sig(&[1.0, 0.0])).unwrap();
        }

        let res = RedbStore::open(&path, StoreConfig::new(3));
        assert!(matches!(res, Err(StoreError::Corrupted { identity, .. }) if identity == "alice"));
    }

    #[test]
    fn test_redb_rejected_enroll_is_not_persisted() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("faces.redb");
        let cfg = StoreConfig {
            dimension: 2,
            policy: EnrollPolicy::RejectExisting,
        };

        {
            let store = RedbStore::open(&path, cfg).unwrap();
            store.enroll("alice", sig(&[1.0, 0.0])).unwrap();
            assert!(store.enroll("alice", sig(&[0.0, 1.0])).is_err());
            assert!(store.enroll("bob", sig(&[0.0, 1.0, 0.0])).is_err());
        }

        let store = RedbStore::open(&path, cfg).unwrap();
        assert_eq!(store.len().unwrap(), 1);
        assert_eq!(store.get("alice").unwrap().unwrap().signatures().len(), 1);
    }
}
