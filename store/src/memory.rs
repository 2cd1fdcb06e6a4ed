//! In-memory signature store.

use std::sync::Arc;

use facematch_codec::Signature;
use tracing::info;

use crate::record::{EnrolledRecord, RecordMap, Snapshot};
use crate::store::{RecordSet, SignatureStore, StoreConfig};
use crate::StoreError;

/// In-memory [`SignatureStore`] implementation.
/// Data is lost on restart. Suitable for testing or ephemeral use.
pub struct MemoryStore {
    records: RecordSet,
}

impl MemoryStore {
    /// Creates an empty store with the default enroll policy.
    pub fn new(dimension: usize) -> Self {
        Self::with_config(StoreConfig::new(dimension))
    }

    pub fn with_config(cfg: StoreConfig) -> Self {
        Self {
            records: RecordSet::new(cfg, RecordMap::new()),
        }
    }
}

impl SignatureStore for MemoryStore {
    fn enroll(&self, identity: &str, signature: Signature) -> Result<(), StoreError> {
        let record = self.records.enroll(identity, signature, |_| Ok(()))?;
        info!(
            "enrolled {} ({} signature(s))",
            identity,
            record.signatures().len()
        );
        Ok(())
    }

    fn remove(&self, identity: &str) -> Result<Arc<EnrolledRecord>, StoreError> {
        let removed = self.records.remove(identity, |_| Ok(()))?;
        info!("removed {}", identity);
        Ok(removed)
    }

    fn remove_signature(&self, identity: &str, index: usize) -> Result<(), StoreError> {
        self.records.remove_signature(identity, index, |_| Ok(()))?;
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
