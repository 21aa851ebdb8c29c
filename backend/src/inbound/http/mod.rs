//! HTTP inbound adapter exposing REST endpoints.

pub mod auth;
pub mod cart_history;
pub mod challenges;
pub mod content;
pub mod emissions;
pub mod error;
pub mod groups;
pub mod health;
pub mod idempotency;
pub mod logs;
pub mod notifications;
pub mod products;
pub mod schemas;
pub mod state;
pub mod tokens;
pub mod validation;

pub use error::ApiResult;
