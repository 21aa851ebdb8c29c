//! Internal Diesel row structs for database operations.
//!
//! These types are implementation details of the persistence layer and must
//! never be exposed to the domain. They exist solely to satisfy Diesel's
//! type requirements for queries and mutations.

use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use super::schema::{
    audit_events, challenge_instances, challenges, co2_cart_history, emission_calculations,
    emission_factors, products, token_blacklist, token_ledger, user_group_sessions, user_groups,
    user_notification_preferences,
};

// ---------------------------------------------------------------------------
// Products
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = products)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct ProductRow {
    pub id: i64,
    pub ean: String,
    pub name: String,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub carbon_product_kgco2e: Option<f64>,
    pub carbon_pack_kgco2e: Option<f64>,
    pub net_weight_kg: Option<f64>,
    pub origin_country: Option<String>,
    pub origin_lat: Option<f64>,
    pub origin_lon: Option<f64>,
    pub coef_trans: Option<f64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = products)]
pub(crate) struct NewProductRow<'a> {
    pub ean: &'a str,
    pub name: &'a str,
    pub brand: Option<&'a str>,
    pub category: Option<&'a str>,
    pub carbon_product_kgco2e: Option<f64>,
    pub carbon_pack_kgco2e: Option<f64>,
    pub net_weight_kg: Option<f64>,
    pub origin_country: Option<&'a str>,
    pub origin_lat: Option<f64>,
    pub origin_lon: Option<f64>,
    pub coef_trans: Option<f64>,
}

// ---------------------------------------------------------------------------
// Emissions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = emission_factors)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct EmissionFactorRow {
    pub id: i64,
    pub category_code: String,
    pub unit: String,
    pub factor_gco2e_per_unit: f64,
    pub source: Option<String>,
    pub version: Option<String>,
    pub valid_from: Option<NaiveDate>,
    pub valid_to: Option<NaiveDate>,
}

/// Readable and insertable: calculations are written once and read back
/// verbatim on replay.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = emission_calculations)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct EmissionCalculationRow {
    pub id: Uuid,
    pub product_id: Option<String>,
    pub category_code: String,
    pub quantity: f64,
    pub quantity_unit: String,
    pub normalized_qty: f64,
    pub factor_id: i64,
    pub emissions_gco2e: f64,
    pub method: String,
    pub session_id: Option<String>,
    pub idempotency_key: String,
    pub payload_hash: String,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Challenges
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = challenges)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct ChallengeRow {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub metric: String,
    pub logic_type: String,
    pub period_type: String,
    pub default_target_value: f64,
    pub scope_type: String,
    pub active: bool,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = challenge_instances)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct ChallengeInstanceRow {
    pub id: i64,
    pub user_id: Uuid,
    pub challenge_id: i64,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub status: String,
    pub reference_value: Option<f64>,
    pub current_value: Option<f64>,
    pub target_value: Option<f64>,
    pub progress_percent: Option<f64>,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_evaluated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = challenge_instances)]
pub(crate) struct NewChallengeInstanceRow<'a> {
    pub user_id: Uuid,
    pub challenge_id: i64,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub status: &'a str,
    pub target_value: Option<f64>,
    pub created_at: DateTime<Utc>,
}

/// Full evaluation changeset. `None` values are written as `NULL`.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = challenge_instances)]
#[diesel(treat_none_as_null = true)]
pub(crate) struct EvaluationChangeset<'a> {
    pub status: &'a str,
    pub reference_value: Option<f64>,
    pub current_value: Option<f64>,
    pub target_value: Option<f64>,
    pub progress_percent: Option<f64>,
    pub message: Option<&'a str>,
    pub last_evaluated_at: Option<DateTime<Utc>>,
}

/// Evaluation changeset for schemas that lack the `message` column.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = challenge_instances)]
#[diesel(treat_none_as_null = true)]
pub(crate) struct EvaluationWithoutMessageChangeset<'a> {
    pub status: &'a str,
    pub reference_value: Option<f64>,
    pub current_value: Option<f64>,
    pub target_value: Option<f64>,
    pub progress_percent: Option<f64>,
    pub last_evaluated_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Cart history
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = co2_cart_history)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct CartHistoryRow {
    pub id: i64,
    pub user_id: Uuid,
    pub total_co2_g: i64,
    pub nb_articles: i32,
    pub nb_distinct_products: i32,
    pub total_distance_km: f64,
    pub days_captured_by_tree: f64,
    pub tree_equivalent: f64,
    pub period_type: String,
    pub period_label: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = co2_cart_history)]
pub(crate) struct NewCartHistoryRow<'a> {
    pub user_id: Uuid,
    pub total_co2_g: i64,
    pub nb_articles: i32,
    pub nb_distinct_products: i32,
    pub total_distance_km: f64,
    pub days_captured_by_tree: f64,
    pub tree_equivalent: f64,
    pub period_type: &'a str,
    pub period_label: &'a str,
    pub period_week: &'a str,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Groups
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = user_groups)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct GroupRow {
    pub id: i64,
    pub owner_id: Option<String>,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = user_groups)]
pub(crate) struct NewGroupRow<'a> {
    pub owner_id: Option<&'a str>,
    pub name: &'a str,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = user_group_sessions)]
pub(crate) struct NewGroupSessionRow<'a> {
    pub group_id: i64,
    pub session_id: &'a str,
}

// ---------------------------------------------------------------------------
// Notification preferences
// ---------------------------------------------------------------------------

/// Readable and insertable: preferences are upserted as a whole row.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = user_notification_preferences)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct NotificationPreferencesRow {
    pub user_id: Uuid,
    pub enabled: bool,
    pub frequency: String,
    pub types: serde_json::Value,
    pub allow_email: bool,
    pub allow_push: bool,
    pub allow_sms: bool,
    pub last_notified_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Tokens and audit
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = token_ledger)]
pub(crate) struct NewTokenLedgerRow<'a> {
    pub user_id: &'a str,
    pub jti: &'a str,
    pub issued_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub ip: Option<&'a str>,
    pub user_agent: Option<&'a str>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = token_blacklist)]
pub(crate) struct NewBlacklistRow<'a> {
    pub jti: &'a str,
    pub revoked_at: DateTime<Utc>,
    pub reason: Option<&'a str>,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = audit_events)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct AuditEventRow {
    pub id: i64,
    pub event_type: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = audit_events)]
pub(crate) struct NewAuditEventRow<'a> {
    pub event_type: &'a str,
    pub message: &'a str,
}
