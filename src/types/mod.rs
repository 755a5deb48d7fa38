//! Core type definitions using newtype patterns for type safety.
//!
//! A [`ValidatedTarget`] can only be produced by the validator, so nothing
//! unchecked can reach the scan tool's argument list.

mod scan_id;
mod target;

pub use scan_id::{ScanId, ScanIdError};
pub use target::{validate, TargetKind, ValidatedTarget, MAX_CIDR_HOSTS, MAX_TARGET_LEN};
