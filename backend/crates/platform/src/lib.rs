//! Platform Crate - Technical Infrastructure
//!
//! This crate provides shared technical foundations:
//! - Admission control (per-client sliding-window rate limiting)
//! - Client identification from HTTP requests
//! - Environment-backed configuration helpers

pub mod client;
pub mod config;
pub mod rate_limit;
