//! Concurrent repository of enrolled face signatures.
//!
//! Provides the [`SignatureStore`] trait with an in-memory implementation
//! for testing and a redb-based implementation for persistence.
//!
//! # Consistency
//!
//! Both stores keep records in a copy-on-write map. [`SignatureStore::all`]
//! hands out an immutable [`Snapshot`]; writers never modify a record in
//! place, they publish a new map. A reader therefore sees every record
//! either before or after a given write, never halfway through it.
//!
//! ```
//! use facematch_codec::Signature;
//! use facematch_store::{MemoryStore, SignatureStore};
//!
//! let store = MemoryStore::new(3);
//! store.enroll("alice", Signature::new(vec![1.0, 0.0, 0.0], 3)?)?;
//! store.enroll("alice", Signature::new(vec![0.9, 0.1, 0.0], 3)?)?;
//!
//! let snapshot = store.all()?;
//! assert_eq!(snapshot.len(), 1);
//! assert_eq!(snapshot.candidates().count(), 2);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod error;
pub mod memory;
mod record;
pub mod redb;
mod store;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use record::{EnrolledRecord, Snapshot};
pub use crate::redb::RedbStore;
pub use store::{EnrollPolicy, SignatureStore, StoreConfig};
