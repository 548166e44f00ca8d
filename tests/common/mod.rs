//! Common test utilities and helpers
//!
//! This module provides shared test infrastructure including:
//! - Test fixtures and factories
//! - A counting mock of the tenant record store
//! - Test database setup
//! - API test client with request signing

#![allow(dead_code)]

pub mod factories;

pub use factories::*;
pub use fixtures::*;
pub use mocks::*;
pub use test_app::*;
