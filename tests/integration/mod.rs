//! Integration test suite for Kiln.
//!
//! These tests exercise the full path from a manifest on disk to
//! executed task units, including parallel execution.
//!
//! # Test Categories
//!
//! - `planning`: Plan computation from real manifests
//! - `execution`: Sequential scheduling with real file side effects
//! - `parallel`: Parallel execution correctness
//!
//! # CI Compatibility
//!
//! All tests run against temporary directories and shell builtins, so
//! they are safe to run in CI environments.

mod fixtures;

mod execution;
mod parallel;
mod planning;
