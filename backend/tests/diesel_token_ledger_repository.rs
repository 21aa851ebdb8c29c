//! Integration tests for `DieselTokenLedgerRepository` against embedded PostgreSQL.

use carbon_tracker::domain::ports::{TokenLedgerRepository, TokenLedgerRepositoryError};
use carbon_tracker::domain::token::{ClientMeta, LedgerEntry, TokenRotation};
use carbon_tracker::outbound::persistence::{DbPool, DieselTokenLedgerRepository, PoolConfig};
use chrono::{DateTime, Duration, TimeZone, Utc};
use pg_embedded_setup_unpriv::TestCluster;
use rstest::{fixture, rstest};
use tokio::runtime::Runtime;

#[path = "support/pg_embed.rs"]
mod pg_embed;

mod support;

use pg_embed::test_cluster;
use support::{handle_cluster_setup_failure, migrate_schema, reset_database};

const TEST_DB: &str = "diesel_token_ledger_repo_test";

struct TestContext {
    runtime: Runtime,
    _cluster: TestCluster,
    repository: DieselTokenLedgerRepository,
}

fn setup_context() -> Result<TestContext, String> {
    let runtime = Runtime::new().map_err(|err| err.to_string())?;
    let cluster = test_cluster()?;
    reset_database(&cluster, TEST_DB)?;
    let database_url = cluster.connection().database_url(TEST_DB);
    migrate_schema(&database_url)?;

    let pool = runtime
        .block_on(async { DbPool::new(PoolConfig::new(&database_url).with_max_size(2)).await })
        .map_err(|err| err.to_string())?;

    Ok(TestContext {
        runtime,
        _cluster: cluster,
        repository: DieselTokenLedgerRepository::new(pool),
    })
}

#[fixture]
fn repo_context() -> Option<TestContext> {
    match setup_context() {
        Ok(ctx) => Some(ctx),
        Err(reason) => handle_cluster_setup_failure(reason),
    }
}

fn issued_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 5, 1, 12, 0, 0)
        .single()
        .expect("valid instant")
}

fn entry(jti: &str) -> LedgerEntry {
    LedgerEntry {
        user_id: "user-42".to_owned(),
        jti: jti.to_owned(),
        issued_at: issued_at(),
        expires_at: Some(issued_at() + Duration::hours(1)),
        client: ClientMeta::new(Some("203.0.113.7"), Some("integration-test")),
    }
}

fn rotation(old: &str, new: &str) -> TokenRotation {
    TokenRotation {
        old_jti: old.to_owned(),
        replacement: entry(new),
        revoked_at: issued_at() + Duration::minutes(5),
        reason: "rotated".to_owned(),
    }
}

#[rstest]
fn rotation_blacklists_the_old_token(repo_context: Option<TestContext>) {
    let Some(context) = repo_context else {
        eprintln!("SKIP-TEST-CLUSTER: rotation_blacklists_the_old_token skipped");
        return;
    };
    let repository = &context.repository;

    let (old_revoked, new_revoked) = context.runtime.block_on(async {
        repository
            .record_issued(&entry("jti-old"))
            .await
            .expect("record issued");
        repository
            .rotate(&rotation("jti-old", "jti-new"))
            .await
            .expect("rotate");
        (
            repository.is_revoked("jti-old").await.expect("check old"),
            repository.is_revoked("jti-new").await.expect("check new"),
        )
    });

    assert!(old_revoked);
    assert!(!new_revoked);
}

#[rstest]
fn second_rotation_of_the_same_token_is_refused(repo_context: Option<TestContext>) {
    let Some(context) = repo_context else {
        eprintln!("SKIP-TEST-CLUSTER: second_rotation_of_the_same_token_is_refused skipped");
        return;
    };
    let repository = &context.repository;

    let (second, replay_revoked) = context.runtime.block_on(async {
        repository
            .record_issued(&entry("jti-a"))
            .await
            .expect("record issued");
        repository
            .rotate(&rotation("jti-a", "jti-b"))
            .await
            .expect("first rotation");
        let second = repository.rotate(&rotation("jti-a", "jti-c")).await;
        let replay_revoked = repository.is_revoked("jti-c").await.expect("check c");
        (second, replay_revoked)
    });

    assert!(matches!(
        second,
        Err(TokenLedgerRepositoryError::AlreadyRevoked { ref jti }) if jti == "jti-a"
    ));
    assert!(!replay_revoked);
}

#[rstest]
fn unknown_tokens_are_not_revoked(repo_context: Option<TestContext>) {
    let Some(context) = repo_context else {
        eprintln!("SKIP-TEST-CLUSTER: unknown_tokens_are_not_revoked skipped");
        return;
    };

    let revoked = context
        .runtime
        .block_on(async { context.repository.is_revoked("never-issued").await })
        .expect("check");
    assert!(!revoked);
}
