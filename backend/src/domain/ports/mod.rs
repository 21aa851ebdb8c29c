//! Domain ports and supporting types for the hexagonal boundary.
//!
//! Driven ports (`*Repository`, [`TokenCodec`], [`NotificationSender`]) are
//! implemented by outbound adapters. Driving ports (`*Command`, `*Query`,
//! [`RevocationCheck`]) are implemented by domain services and consumed by
//! inbound adapters. Every port ships a `Fixture*` implementation so the
//! server can run without a database.

mod macros;
pub(crate) use macros::define_port_error;

mod audit_query;
mod audit_repository;
mod cart_history_command;
mod cart_history_repository;
mod challenge_command;
mod challenge_query;
mod challenge_repository;
mod emission_aggregate_repository;
mod emission_command;
mod emission_report_query;
mod emission_repository;
mod group_command;
mod group_repository;
mod notification_command;
mod notification_preferences_repository;
mod notification_sender;
mod product_command;
mod product_query;
mod product_repository;
mod token_codec;
mod token_command;
mod token_ledger_repository;

pub use audit_query::AuditQuery;
#[cfg(test)]
pub use audit_query::MockAuditQuery;
#[cfg(test)]
pub use audit_repository::MockAuditRepository;
pub use audit_repository::{
    AuditRepository, AuditRepositoryError, FixtureAuditRepository, record_best_effort,
};
pub use cart_history_command::{
    CartHistoryCommand, CartHistoryQuery, FixtureCartHistoryService,
};
#[cfg(test)]
pub use cart_history_command::{MockCartHistoryCommand, MockCartHistoryQuery};
#[cfg(test)]
pub use cart_history_repository::MockCartHistoryRepository;
pub use cart_history_repository::{
    CartHistoryRepository, CartHistoryRepositoryError, FixtureCartHistoryRepository,
};
#[cfg(test)]
pub use challenge_command::MockChallengeCommand;
pub use challenge_command::{
    ActivateChallengeRequest, ActivateChallengeResponse, ChallengeCommand, ChallengeEvaluation,
    EvaluateChallengeRequest, FixtureChallengeCommand,
};
#[cfg(test)]
pub use challenge_query::MockChallengeQuery;
pub use challenge_query::{ChallengeQuery, FixtureChallengeQuery};
#[cfg(test)]
pub use challenge_repository::MockChallengeRepository;
pub use challenge_repository::{
    ActivationRecord, ChallengeRepository, ChallengeRepositoryError, EvaluationUpdate,
    FixtureChallengeRepository, NewChallengeInstance, seeded_co2_challenge,
};
#[cfg(test)]
pub use emission_aggregate_repository::MockEmissionAggregateRepository;
pub use emission_aggregate_repository::{
    EmissionAggregateRepository, EmissionAggregateRepositoryError,
    FixtureEmissionAggregateRepository,
};
#[cfg(test)]
pub use emission_command::MockEmissionCommand;
pub use emission_command::{
    CalculateEmissionRequest, CalculateEmissionResponse, EmissionCommand, FixtureEmissionCommand,
};
#[cfg(test)]
pub use emission_report_query::MockEmissionReportQuery;
pub use emission_report_query::{EmissionReportQuery, FixtureEmissionReportQuery};
#[cfg(test)]
pub use emission_repository::MockEmissionRepository;
pub use emission_repository::{
    EmissionRepository, EmissionRepositoryError, FixtureEmissionRepository,
};
pub use group_command::{FixtureGroupService, GroupCommand, GroupQuery};
#[cfg(test)]
pub use group_command::{MockGroupCommand, MockGroupQuery};
#[cfg(test)]
pub use group_repository::MockGroupRepository;
pub use group_repository::{FixtureGroupRepository, GroupRepository, GroupRepositoryError};
#[cfg(test)]
pub use notification_command::MockNotificationCommand;
pub use notification_command::{FixtureNotificationCommand, NotificationCommand};
#[cfg(test)]
pub use notification_preferences_repository::MockNotificationPreferencesRepository;
pub use notification_preferences_repository::{
    FixtureNotificationPreferencesRepository, NotificationPreferencesRepository,
    NotificationPreferencesRepositoryError,
};
#[cfg(test)]
pub use notification_sender::MockNotificationSender;
pub use notification_sender::{NotificationSender, NotificationSenderError};
#[cfg(test)]
pub use product_command::MockProductCommand;
pub use product_command::{FixtureProductCommand, ProductCommand};
#[cfg(test)]
pub use product_query::MockProductQuery;
pub use product_query::{CompareProductsRequest, FixtureProductQuery, ProductPage, ProductQuery};
#[cfg(test)]
pub use product_repository::MockProductRepository;
pub use product_repository::{
    FixtureProductRepository, ProductRepository, ProductRepositoryError,
};
#[cfg(test)]
pub use token_codec::MockTokenCodec;
pub use token_codec::{TokenCodec, TokenCodecError};
pub use token_command::{FixtureTokenService, RevocationCheck, TokenCommand, TokenIntrospection};
#[cfg(test)]
pub use token_command::{MockRevocationCheck, MockTokenCommand, MockTokenIntrospection};
#[cfg(test)]
pub use token_ledger_repository::MockTokenLedgerRepository;
pub use token_ledger_repository::{
    FixtureTokenLedgerRepository, TokenLedgerRepository, TokenLedgerRepositoryError,
};
