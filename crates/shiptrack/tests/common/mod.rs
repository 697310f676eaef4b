//! Shared test utilities for shiptrack integration tests.
//!
//! This module provides:
//! - `TestHarness` wiring all services over an isolated database
//! - Builders for configs and status changes
//! - `MemoryMailer` capturing password-reset tokens

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::{MemoryMailer, TestHarness, TEST_PASSWORD};
