//! # Person Contracts
//!
//! Canonical wire contract for the person pipeline, shared by the ingress
//! producer and the consumer worker:
//!
//! - [`Person`] — the domain record carried through the system
//! - [`PersonEnvelope`] — the unit transported on the bus, with the
//!   tolerant [`PersonEnvelope::from_bytes`] / canonical
//!   [`PersonEnvelope::to_bytes`] codec
//! - [`DecodeError`] — typed decode failures
//! - [`ProcessInfo`] — per-process provenance, built once at startup

mod envelope;
mod process;

pub use envelope::{DecodeError, Person, PersonEnvelope};
pub use process::ProcessInfo;
