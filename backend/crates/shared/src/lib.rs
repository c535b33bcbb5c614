//! Shared Kernel - Domain-crossing minimal core
//!
//! This crate contains the vocabulary every promotion-facing crate agrees on:
//! - The unified error type and its HTTP classification
//! - Typed identifiers for promotion entities
//!
//! Anything that only one bounded context needs belongs in that context's crate.

pub mod error {
    pub mod app_error;
    pub mod conversions;
    pub mod kind;
}
pub mod id;
