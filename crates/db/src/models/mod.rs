//! Row structs and DTOs.
//!
//! Each submodule contains a `FromRow` entity matching the table row and the
//! create/update DTOs the repositories accept.

pub mod asset;
pub mod job;
pub mod quota;
