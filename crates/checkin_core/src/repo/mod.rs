//! Repository layer for device-local persistence.
//!
//! # Responsibility
//! - Define use-case oriented storage contracts for queued check-ins and
//!   cached reference data.
//! - Isolate SQLite query details from sync and session orchestration.
//!
//! # Invariants
//! - Repository writes validate payloads before persistence.
//! - Reads reject invalid persisted rows instead of masking them.

pub mod owner_cache_repo;
pub mod queue_repo;
