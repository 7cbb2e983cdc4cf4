//! Support functions shared across the engine.
mod transfer_ref;

pub use transfer_ref::{format_reference, is_valid_reference, parse_sequence, REFERENCE_PREFIX};
