//! Infrastructure Layer - Promotion store implementations

pub mod memory;
pub mod postgres;
