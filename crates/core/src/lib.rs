//! Domain types and rules for the mu2mi studio backend.
//!
//! This crate performs no I/O. Everything that touches Postgres, object
//! storage or the inference provider lives in the sibling crates and depends
//! on the vocabulary defined here.

pub mod asset;
pub mod error;
pub mod job;
pub mod params;
pub mod quota;
pub mod status;
pub mod types;
