//! Face match service.
//!
//! Wires a [`facematch_codec::FaceEncoder`], a
//! [`facematch_store::SignatureStore`] and a [`facematch_matcher::Matcher`]
//! into a single entry point, [`MatchService::evaluate`], which takes image
//! bytes and returns a [`MatchDecision`].
//!
//! # Usage
//!
//! ```ignore
//! let cfg = ServiceConfig::load("facematch.yaml")?;
//! let store = Arc::new(RedbStore::open("faces.redb", cfg.store_config())?);
//! let service = MatchService::new(&cfg, encoder, store)?;
//!
//! service.enroll_image("alice", &std::fs::read("alice.jpg")?)?;
//! match service.evaluate(&std::fs::read("visitor.jpg")?)? {
//!     MatchDecision::Matched { identity, distance } => println!("{identity} ({distance})"),
//!     other => println!("{other}"),
//! }
//! ```

mod config;
mod error;
mod service;

pub use config::{MultiFacePolicy, ServiceConfig};
pub use error::ServiceError;
pub use service::MatchService;

pub use facematch_matcher::{MatchDecision, MatchQuery};
