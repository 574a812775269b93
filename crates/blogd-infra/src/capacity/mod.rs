//! Disk capacity checking for the upload pipeline.

pub use guard::{DiskSpaceGuard, DiskSpaceReport};

mod guard;
