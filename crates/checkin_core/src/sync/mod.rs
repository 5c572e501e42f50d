//! Offline-first synchronization with the central attendance store.
//!
//! # Responsibility
//! - Define the remote gateway port and its in-process implementation.
//! - Reconcile confirmed and pending attendance.
//! - Flush the submission queue on a schedule or on demand.
//!
//! # Invariants
//! - Sync code touches queued data only through `SubmissionQueue`.

pub mod engine;
pub mod gateway;
pub mod memory_store;
pub mod reconciler;
pub mod schedule;
