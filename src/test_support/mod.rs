//! Shared helpers for unit tests.

pub mod fake_kb;
pub mod socket_guard;
