//! Owner identity heuristics.
//!
//! # Responsibility
//! - Turn raw owners-directory strings into selectable attendee identities.
//!
//! # Invariants
//! - Classification is pure and never fails; bad input degrades to empty or
//!   `Unknown` results.

pub mod owner_classifier;
