//! Shared plumbing for the `explain-contract` and `generate-contract` binaries.

pub mod commands;
pub mod common;
