//! Data models

mod enterprise;

pub use enterprise::*;
