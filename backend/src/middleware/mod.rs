//! Request middleware.
//!
//! Purpose: Define middleware components for request lifecycle concerns such as
//! tracing and token revocation.

pub mod token_guard;
pub mod trace;

pub use token_guard::TokenGuard;
pub use trace::Trace;
