//! Structured logging facility for migrun
//!
//! This module provides a canonical logging facility with:
//! - Single initialization point via `init(profile)`
//! - Structured logging macros (`log_op_start!`, `log_op_end!`, `log_op_error!`)
//! - Test capture mode for deterministic assertions
//!
//! Log output goes to stderr so that the per-script report printed on
//! stdout stays machine-readable.
//!
//! # Usage
//!
//! ```rust
//! use migrun_core::logging_facility::{init, Profile};
//!
//! // Initialize once at process start
//! init(Profile::Development);
//! ```

pub mod init;
pub mod macros;
pub mod test_capture;

pub use init::{init, Profile};
pub use test_capture::{init_test_capture, CapturedEvent, TestCapture};
