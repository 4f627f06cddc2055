//! # segwal Testkit
//!
//! Test utilities for segwal.
//!
//! This crate provides:
//! - Test fixtures and filer helpers
//! - Crash simulation and recovery scenarios
//! - Property-based test generators using proptest
//! - Stress testing utilities
//!
//! ## Usage
//!
//! ```rust
//! use segwal_testkit::prelude::*;
//!
//! with_mem_filer(|filer| {
//!     let info = sample_info(1, 1);
//!     let payloads = payloads(3, 16);
//!     let reader = sealed_segment(filer, &info, &payloads);
//!     assert_eq!(reader.len(), 3);
//! });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod crash;
pub mod fixtures;
pub mod generators;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::crash::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::stress::*;
}

pub use crash::*;
pub use fixtures::*;
pub use generators::*;
pub use stress::*;
