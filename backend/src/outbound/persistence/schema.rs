//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match the database migrations exactly. They are used
//! by Diesel for compile-time query validation and type-safe SQL generation.
//!
//! # Maintenance
//!
//! When migrations change the schema, this file should be regenerated or
//! manually updated to reflect those changes. The `diesel print-schema`
//! command can generate these definitions from a live database.

diesel::table! {
    /// Product catalogue with per-kilogram footprint factors.
    products (id) {
        id -> Int8,
        /// Barcode, unique across the catalogue.
        ean -> Varchar,
        name -> Varchar,
        brand -> Nullable<Varchar>,
        category -> Nullable<Varchar>,
        /// Production footprint in kgCO2e per kg.
        carbon_product_kgco2e -> Nullable<Float8>,
        /// Packaging footprint in kgCO2e per kg.
        carbon_pack_kgco2e -> Nullable<Float8>,
        net_weight_kg -> Nullable<Float8>,
        origin_country -> Nullable<Varchar>,
        origin_lat -> Nullable<Float8>,
        origin_lon -> Nullable<Float8>,
        /// Transport coefficient in kgCO2e per kg·km.
        coef_trans -> Nullable<Float8>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Per-category emission factors with optional validity dates.
    emission_factors (id) {
        id -> Int8,
        category_code -> Text,
        /// One of `g`, `kg`, `ml`, `l` or `piece`.
        unit -> Text,
        factor_gco2e_per_unit -> Float8,
        source -> Nullable<Text>,
        version -> Nullable<Text>,
        valid_from -> Nullable<Date>,
        valid_to -> Nullable<Date>,
    }
}

diesel::table! {
    /// Immutable computed emissions, unique per idempotency key.
    emission_calculations (id) {
        id -> Uuid,
        product_id -> Nullable<Text>,
        category_code -> Text,
        quantity -> Float8,
        quantity_unit -> Text,
        normalized_qty -> Float8,
        factor_id -> Int8,
        emissions_gco2e -> Float8,
        method -> Text,
        session_id -> Nullable<Text>,
        idempotency_key -> Varchar,
        /// Lowercase hex SHA-256 of the canonical request payload.
        payload_hash -> Varchar,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Challenge catalogue. Seeded by migration and treated as read-only.
    challenges (id) {
        id -> Int8,
        code -> Varchar,
        name -> Varchar,
        description -> Nullable<Text>,
        metric -> Varchar,
        logic_type -> Varchar,
        period_type -> Varchar,
        default_target_value -> Float8,
        scope_type -> Varchar,
        active -> Bool,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Per-user activations of a challenge.
    ///
    /// A partial unique index keeps one `ACTIVE` row per (user, challenge).
    challenge_instances (id) {
        id -> Int8,
        user_id -> Uuid,
        challenge_id -> Int8,
        start_date -> Timestamptz,
        end_date -> Timestamptz,
        /// `ACTIVE`, `SUCCESS` or `FAILED`.
        status -> Varchar,
        reference_value -> Nullable<Float8>,
        current_value -> Nullable<Float8>,
        target_value -> Nullable<Float8>,
        progress_percent -> Nullable<Float8>,
        message -> Nullable<Text>,
        created_at -> Timestamptz,
        last_evaluated_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    /// Append-only validated cart summaries.
    co2_cart_history (id) {
        id -> Int8,
        user_id -> Uuid,
        total_co2_g -> Int8,
        nb_articles -> Int4,
        nb_distinct_products -> Int4,
        total_distance_km -> Float8,
        days_captured_by_tree -> Float8,
        tree_equivalent -> Float8,
        period_type -> Varchar,
        /// `YYYY-MM`.
        period_label -> Varchar,
        /// `YYYY-Www`.
        period_week -> Varchar,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    user_groups (id) {
        id -> Int8,
        owner_id -> Nullable<Varchar>,
        name -> Varchar,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Session membership; rows cascade with their group.
    user_group_sessions (group_id, session_id) {
        group_id -> Int8,
        session_id -> Text,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// One preferences row per user.
    user_notification_preferences (user_id) {
        user_id -> Uuid,
        enabled -> Bool,
        frequency -> Varchar,
        /// JSON array of notification type strings.
        types -> Jsonb,
        allow_email -> Bool,
        allow_push -> Bool,
        allow_sms -> Bool,
        last_notified_at -> Nullable<Timestamptz>,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Every issued access token and its revocation state.
    token_ledger (id) {
        id -> Int8,
        user_id -> Varchar,
        jti -> Varchar,
        issued_at -> Timestamptz,
        expires_at -> Nullable<Timestamptz>,
        replaced_by_jti -> Nullable<Varchar>,
        revoked_at -> Nullable<Timestamptz>,
        revoked_reason -> Nullable<Varchar>,
        ip -> Nullable<Varchar>,
        user_agent -> Nullable<Varchar>,
    }
}

diesel::table! {
    /// Revoked token identifiers consulted by the guard middleware.
    token_blacklist (jti) {
        jti -> Varchar,
        revoked_at -> Timestamptz,
        reason -> Nullable<Varchar>,
    }
}

diesel::table! {
    audit_events (id) {
        id -> Int8,
        event_type -> Varchar,
        message -> Varchar,
        created_at -> Timestamptz,
    }
}

diesel::joinable!(challenge_instances -> challenges (challenge_id));
diesel::joinable!(emission_calculations -> emission_factors (factor_id));
diesel::joinable!(user_group_sessions -> user_groups (group_id));

diesel::allow_tables_to_appear_in_same_query!(
    audit_events,
    challenge_instances,
    challenges,
    co2_cart_history,
    emission_calculations,
    emission_factors,
    products,
    token_blacklist,
    token_ledger,
    user_group_sessions,
    user_groups,
    user_notification_preferences,
);
