//! Pixshrink API Library
//!
//! HTTP handlers, middleware and application setup for the image optimizer.

mod api_doc;
mod handlers;
mod middleware;
mod utils;

pub mod auth;
pub mod error;
pub mod setup;
pub mod state;

pub use error::{HttpAppError, ValidatedJson};
pub use pixshrink_infra::ErrorResponse;
