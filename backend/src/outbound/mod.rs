//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **persistence**: PostgreSQL-backed repositories using Diesel ORM
//! - **token**: JWT signing behind the `TokenCodec` port
//! - **notifications**: notification delivery (logging only)
//!
//! Adapters are thin translators that convert between domain types and
//! infrastructure-specific representations. They contain no business logic.

pub mod notifications;
pub mod persistence;
pub mod token;
