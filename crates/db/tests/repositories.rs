//! Repository tests against a live Postgres.
//!
//! Run with `DATABASE_URL` set and `cargo test -p mu2mi-db -- --ignored`.

use std::time::Duration;

use mu2mi_core::asset::AssetRole;
use mu2mi_core::job::JobKind;
use mu2mi_core::status::JobStatus;
use mu2mi_db::models::asset::NewAsset;
use mu2mi_db::models::job::{NewJob, UpdateJob};
use mu2mi_db::repositories::{AssetRepo, JobRepo, QuotaRepo};
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn new_job(user: &str, kind: JobKind) -> NewJob {
    NewJob {
        user_id: user.to_string(),
        name: "demo".to_string(),
        is_public: false,
        kind,
    }
}

fn upload(user: &str, key: &str) -> NewAsset {
    NewAsset {
        user_id: user.to_string(),
        job_id: None,
        object_key: key.to_string(),
        mime_type: "audio/mpeg".to_string(),
        role: AssetRole::Original,
    }
}

async fn job_rows(pool: &PgPool) -> i64 {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM jobs")
        .fetch_one(pool)
        .await
        .unwrap();
    count
}

// ---------------------------------------------------------------------------
// Jobs
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn bootstrap_seeds_statuses(pool: PgPool) {
    mu2mi_db::health_check(&pool).await.unwrap();

    let names: Vec<(i16, String)> = sqlx::query_as("SELECT id, name FROM job_statuses ORDER BY id")
        .fetch_all(&pool)
        .await
        .unwrap();
    for (id, name) in names {
        assert_eq!(JobStatus::from_id(id).map(|s| s.as_str()), Some(name.as_str()));
    }
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn create_binds_asset_in_same_transaction(pool: PgPool) {
    let asset = AssetRepo::create(&pool, &upload("alice", "key-1")).await.unwrap();

    let job = JobRepo::create_with_asset(&pool, &new_job("alice", JobKind::Separate), Some(asset.id))
        .await
        .unwrap()
        .expect("binding should succeed");

    let asset = AssetRepo::find_by_id(&pool, asset.id).await.unwrap().unwrap();
    assert_eq!(asset.job_id, Some(job.id));
    assert_eq!(job.status(), Some(JobStatus::Processing));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn failed_binding_rolls_back_job(pool: PgPool) {
    let asset = AssetRepo::create(&pool, &upload("alice", "key-1")).await.unwrap();

    let created = JobRepo::create_with_asset(&pool, &new_job("mallory", JobKind::Separate), Some(asset.id))
        .await
        .unwrap();

    assert!(created.is_none());
    assert_eq!(job_rows(&pool).await, 0);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn conditional_transition_has_one_winner(pool: PgPool) {
    let job = JobRepo::create_with_asset(&pool, &new_job("alice", JobKind::Generate), None)
        .await
        .unwrap()
        .unwrap();

    let (a, b) = tokio::join!(
        JobRepo::transition_from_processing(&pool, job.id, JobStatus::Succeeded),
        JobRepo::transition_from_processing(&pool, job.id, JobStatus::Canceled),
    );
    assert!(a.unwrap() ^ b.unwrap());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn list_update_and_cascade_delete(pool: PgPool) {
    let asset = AssetRepo::create(&pool, &upload("alice", "key-1")).await.unwrap();
    let first = JobRepo::create_with_asset(&pool, &new_job("alice", JobKind::Analyze), Some(asset.id))
        .await
        .unwrap()
        .unwrap();
    let second = JobRepo::create_with_asset(&pool, &new_job("alice", JobKind::Generate), None)
        .await
        .unwrap()
        .unwrap();

    let listed = JobRepo::list_for_user(&pool, "alice").await.unwrap();
    assert_eq!(listed.iter().map(|j| j.id).collect::<Vec<_>>(), vec![second.id, first.id]);

    let patch = UpdateJob {
        name: Some("renamed".to_string()),
        is_public: Some(true),
    };
    let updated = JobRepo::update(&pool, first.id, &patch).await.unwrap().unwrap();
    assert_eq!(updated.name, "renamed");
    assert!(updated.is_public);

    assert!(JobRepo::delete(&pool, first.id).await.unwrap());
    assert!(AssetRepo::find_by_id(&pool, asset.id).await.unwrap().is_none());
}

// ---------------------------------------------------------------------------
// Quota
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn quota_counter_increments_and_resets(pool: PgPool) {
    let window = Duration::from_millis(300);

    assert!(QuotaRepo::find_live(&pool, "k").await.unwrap().is_none());
    assert_eq!(QuotaRepo::consume(&pool, "k", window).await.unwrap().points, 1);
    assert_eq!(QuotaRepo::consume(&pool, "k", window).await.unwrap().points, 2);

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert!(QuotaRepo::find_live(&pool, "k").await.unwrap().is_none());
    assert_eq!(QuotaRepo::consume(&pool, "k", window).await.unwrap().points, 1);
}
