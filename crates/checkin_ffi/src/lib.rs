//! Flutter-facing bindings for the check-in core.

pub mod api;
