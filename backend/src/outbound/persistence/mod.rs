//! PostgreSQL persistence adapters using Diesel ORM.
//!
//! This module provides concrete implementations of domain repository ports
//! backed by PostgreSQL via the Diesel ORM with async support through
//! `diesel-async` and `bb8` connection pooling.
//!
//! # Architecture
//!
//! - **Thin adapters**: Repository implementations only translate between
//!   Diesel models and domain types. Business rules stay in the domain.
//! - **Internal models**: Diesel row structs (`models.rs`) and schema
//!   definitions (`schema.rs`) are never exposed to the domain layer.
//! - **Strongly typed errors**: Database errors are mapped to the port error
//!   of each repository.
//! - **Embedded migrations**: [`run_pending_migrations`] brings the schema
//!   up to date before the pool is handed to adapters.
//!
//! # Example
//!
//! ```ignore
//! use carbon_tracker::outbound::persistence::{DbPool, PoolConfig, DieselProductRepository};
//!
//! let config = PoolConfig::new("postgres://localhost/carbon");
//! let pool = DbPool::new(config).await?;
//! let repo = DieselProductRepository::new(pool);
//! ```

pub(crate) mod diesel_basic_error_mapping;
mod diesel_audit_repository;
mod diesel_cart_history_repository;
mod diesel_challenge_repository;
mod diesel_emission_aggregate_repository;
mod diesel_emission_repository;
mod diesel_group_repository;
mod diesel_notification_preferences_repository;
mod diesel_product_repository;
mod diesel_token_ledger_repository;
mod migrations;
mod models;
mod pool;
mod schema;

pub use diesel_audit_repository::DieselAuditRepository;
pub use diesel_cart_history_repository::DieselCartHistoryRepository;
pub use diesel_challenge_repository::DieselChallengeRepository;
pub use diesel_emission_aggregate_repository::DieselEmissionAggregateRepository;
pub use diesel_emission_repository::DieselEmissionRepository;
pub use diesel_group_repository::DieselGroupRepository;
pub use diesel_notification_preferences_repository::DieselNotificationPreferencesRepository;
pub use diesel_product_repository::DieselProductRepository;
pub use diesel_token_ledger_repository::DieselTokenLedgerRepository;
pub use migrations::{MIGRATIONS, MigrationError, run_pending_migrations};
pub use pool::{DEFAULT_POOL_MAX_SIZE, DbPool, PoolConfig, PoolError};
