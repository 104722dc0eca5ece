//! Shared test helpers for integration tests.

#![allow(dead_code)]

use adventide::config::{
    AppConfig, PointsPolicy, RewardTables, RewardTarget, SeasonConfig, UploadPolicy,
};
use adventide::db::tasks::TaskSeed;
use adventide::db::Database;
use adventide::submission::{CreditBucket, ResponseType};
use chrono::{Duration, NaiveDate, Utc};

/// Returns the test database URL from the `TEST_DATABASE_URL` environment
/// variable. Panics if the variable is not set.
pub fn test_db_url() -> String {
    std::env::var("TEST_DATABASE_URL")
        .expect("TEST_DATABASE_URL must be set for integration tests")
}

/// Returns true if the test database URL is configured.
pub fn has_test_db() -> bool {
    std::env::var("TEST_DATABASE_URL").is_ok()
}

/// Connect to the test database, apply the (idempotent) schema, and wipe all
/// tables so every test starts from a known-clean state.
pub async fn setup_test_db() -> Database {
    let db = Database::connect(&test_db_url())
        .await
        .expect("Failed to connect to test database");
    db.migrate().await.expect("Failed to apply schema");
    truncate_all_tables(&db).await;
    db
}

/// Truncate all tables and restore the global counter singleton.
pub async fn truncate_all_tables(db: &Database) {
    sqlx::raw_sql("TRUNCATE TABLE users, tasks, points, submissions, progress, rewards, global_progress CASCADE")
        .execute(db.pool())
        .await
        .unwrap();
    sqlx::raw_sql("INSERT INTO global_progress (id, total_points) VALUES (1, 0)")
        .execute(db.pool())
        .await
        .unwrap();
}

/// Register a user row the way the auth collaborator would.
pub async fn insert_user(db: &Database, user_id: i64, username: &str) {
    sqlx::query("INSERT INTO users (id, username) VALUES ($1, $2)")
        .bind(user_id)
        .bind(username)
        .execute(db.pool())
        .await
        .unwrap();
}

fn seed(day: u32, title: &str, response: ResponseType, personal: i32, global: i32) -> TaskSeed {
    TaskSeed {
        day,
        title: title.to_string(),
        body: format!("task for day {day}"),
        hint: None,
        image_url: None,
        video_url: None,
        published: true,
        response,
        points_personal: personal,
        points_global: global,
        bucket: CreditBucket::Free,
    }
}

/// Seed the catalog used across tests:
/// day 1 text 30/5, day 2 file 25/5, day 3 text 100/5 into the paid bucket,
/// day 4 unpublished, day 5 text 600/30, day 7 published but behind a door
/// that has not opened yet in either test season.
pub async fn seed_demo_tasks(db: &Database) {
    let mut tasks = vec![
        seed(1, "Warm-up questions", ResponseType::Text, 30, 5),
        seed(2, "Draw a tree", ResponseType::File, 25, 5),
        seed(3, "Place an order", ResponseType::Text, 100, 5),
        seed(4, "Hidden for now", ResponseType::Text, 10, 5),
        seed(5, "Grand finale", ResponseType::Text, 600, 30),
        seed(7, "Coming soon", ResponseType::Text, 20, 5),
    ];
    tasks[2].bucket = CreditBucket::Paid;
    tasks[3].published = false;
    db.seed_tasks(&tasks).await.unwrap();
}

pub fn reward_tables() -> RewardTables {
    RewardTables {
        personal: vec![
            RewardTarget {
                key: "starter".into(),
                name: "Free item".into(),
                threshold: 555,
            },
            RewardTarget {
                key: "small".into(),
                name: "Small prize".into(),
                threshold: 1276,
            },
            RewardTarget {
                key: "merch".into(),
                name: "Keychain".into(),
                threshold: 1444,
            },
        ],
        global: vec![
            RewardTarget {
                key: "sale".into(),
                name: "Community discount".into(),
                threshold: 226,
            },
            RewardTarget {
                key: "halfoff".into(),
                name: "50% off".into(),
                threshold: 777,
            },
        ],
    }
}

fn base_config(season: SeasonConfig) -> AppConfig {
    AppConfig {
        season,
        points: PointsPolicy {
            free_cap: 1015,
            paid_cap: 1001,
            global_cap: 2026,
        },
        rewards: reward_tables(),
        uploads: UploadPolicy {
            allowed_extensions: vec!["png".into(), "jpg".into(), "pdf".into(), "txt".into()],
        },
    }
}

/// Fixed observed-season config for database tests that pass `today`
/// explicitly.
pub fn fixed_config() -> AppConfig {
    base_config(SeasonConfig {
        start: NaiveDate::from_ymd_opt(2025, 12, 15).unwrap(),
        end: NaiveDate::from_ymd_opt(2026, 1, 14).unwrap(),
        days: 31,
    })
}

/// A date in the fixed season on which days 1..=6 are open.
pub fn fixed_today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 12, 20).unwrap()
}

/// Config whose season straddles the real current date, for router tests
/// where handlers read the wall clock: doors 1..=5 are open right now.
pub fn live_config() -> AppConfig {
    let today = Utc::now().date_naive();
    base_config(SeasonConfig {
        start: today - Duration::days(4),
        end: today + Duration::days(20),
        days: 24,
    })
}

/// Build an Axum test app router connected to the test database.
pub async fn build_test_app(config: AppConfig) -> axum::Router {
    let db = setup_test_db().await;
    seed_demo_tasks(&db).await;
    let state = adventide::server::AppState::new(db, config);
    adventide::server::build_router(state)
}

#[derive(serde::Serialize)]
struct TestClaims {
    sub: String,
    admin: bool,
    exp: i64,
}

/// Mint an identity token the way the auth collaborator would. Tests run
/// without `ADVENTIDE_JWT_SECRET`, so the server decodes it unverified.
pub fn mint_token(user_id: i64, admin: bool) -> String {
    let claims = TestClaims {
        sub: user_id.to_string(),
        admin,
        exp: (Utc::now() + Duration::days(1)).timestamp(),
    };
    jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(b"test-secret"),
    )
    .unwrap()
}
