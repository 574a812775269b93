//! Blogd Infrastructure Library
//!
//! Cross-cutting infrastructure: disk capacity guard, HTTP middleware
//! (security headers, CSRF, request ids, injection scanning), and telemetry
//! initialization.

pub mod capacity;
pub mod middleware;
pub mod telemetry;

pub use capacity::{DiskSpaceGuard, DiskSpaceReport};
