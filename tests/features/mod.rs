//! Cucumber feature support and step definitions


pub use support::TestWorld;
