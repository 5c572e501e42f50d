//! Check-in use-case services.
//!
//! # Responsibility
//! - Orchestrate repositories, classification and sync into screen-level
//!   operations.
//! - Keep UI/FFI layers decoupled from storage and transport details.

pub mod attendance_view;
pub mod checkin_service;
pub mod owner_directory;
pub mod session;
