//! Bearer token authentication
//!
//! Tokens are issued elsewhere; this service only verifies them.

pub mod middleware;
pub mod models;

pub use middleware::{auth_middleware, AuthState};
pub use models::{AuthUser, JwtClaims};
