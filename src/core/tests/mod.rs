//! Core module tests
//!
//! Contains test suites for core functionality:
//! - Burst detection tests (gap segmentation, terminator handling)
//! - Payload parser tests (all five stages and their precedence)
//! - Duplicate detection tests

#[cfg(test)]
mod detector_tests;
