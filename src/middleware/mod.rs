//! Middleware components
//!
//! This module contains middleware for:
//! - Signed enterprise requests (API key + HMAC signature)
//! - Admin bearer-token authentication

pub mod admin_auth;
pub mod enterprise_auth;

pub use admin_auth::admin_auth_middleware;
pub use enterprise_auth::enterprise_auth_middleware;
