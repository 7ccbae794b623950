//! Test database helper utilities
//!
//! Integration tests run against a real Postgres instance named by the
//! `TEST_DATABASE_URL` environment variable. When the variable is not set
//! the DB-backed tests skip themselves, so the suite stays runnable on
//! machines without a database.

use sqlx::PgPool;
use std::sync::Once;

static INIT: Once = Once::new();

/// Test database handle with migrations applied
pub struct TestDatabase {
    pub pool: PgPool,
    pub database_url: String,
}

impl TestDatabase {
    /// Connect to the test database, or `None` when `TEST_DATABASE_URL`
    /// is not configured.
    pub async fn connect() -> Option<Self> {
        INIT.call_once(|| {
            dotenv::dotenv().ok();
            let _ = tracing_subscriber::fmt::try_init();
        });

        let database_url = match std::env::var("TEST_DATABASE_URL") {
            Ok(url) => url,
            Err(_) => {
                eprintln!("TEST_DATABASE_URL not set, skipping database-backed test");
                return None;
            }
        };

        let pool = PgPool::connect(&database_url)
            .await
            .expect("Failed to connect to test database");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run migrations on test database");

        Some(Self { pool, database_url })
    }

    /// Delete all rows, children before parents
    pub async fn reset(&self) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM registrations").execute(&self.pool).await?;
        sqlx::query("DELETE FROM event_instances").execute(&self.pool).await?;
        sqlx::query("DELETE FROM event_templates").execute(&self.pool).await?;
        sqlx::query("DELETE FROM subscriptions").execute(&self.pool).await?;
        sqlx::query("DELETE FROM archived_users").execute(&self.pool).await?;
        sqlx::query("DELETE FROM user_accounts").execute(&self.pool).await?;
        sqlx::query("DELETE FROM legacy_meetings").execute(&self.pool).await?;

        Ok(())
    }

    /// Insert a legacy meeting row with a raw `scheduled` JSON value
    pub async fn insert_legacy_meeting(
        &self,
        title: &str,
        scheduled: Option<serde_json::Value>,
    ) -> Result<i64, sqlx::Error> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO legacy_meetings (title, scheduled) VALUES ($1, $2) RETURNING id",
        )
        .bind(title)
        .bind(scheduled)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    /// Count records in a table
    pub async fn count_records(&self, table: &str) -> Result<i64, sqlx::Error> {
        let count = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
