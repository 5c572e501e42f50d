//! Domain model for meeting check-in, attendance and owner reference data.
//!
//! # Responsibility
//! - Define the records shared by queue, reconciler, sync engine and FFI.
//! - Keep validation rules next to the shapes they protect.
//!
//! # Invariants
//! - Every queued check-in is identified by a stable `SubmissionId`.
//! - Lot numbers are unique only within one plan + meeting scope.

pub mod attendance;
pub mod meeting;
pub mod owner;
pub mod submission;
