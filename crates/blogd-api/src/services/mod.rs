//! Application services.

pub mod upload;
