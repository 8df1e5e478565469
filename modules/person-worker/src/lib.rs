//! Person worker library
//!
//! Consumer side of the person pipeline: subscription lifecycle, trace
//! context extraction, envelope decoding with per-message error isolation,
//! and transactional persistence of record + provenance.

pub mod config;
pub mod consumer;
pub mod heartbeat;
pub mod store;

pub use consumer::{run_consumer, WorkerError};
pub use store::{PersistError, PersonStore, PgPersonStore};
