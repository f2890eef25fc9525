//! Shared helpers

pub mod helpers;
