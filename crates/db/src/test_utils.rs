//! Test utilities for database operations.
//!
//! Most tests run against a migrated in-memory SQLite database from
//! [`sqlite_memory`]. [`TestDatabase`] connects to a real `PostgreSQL`
//! instance for the tests that need one.

use chrono::{DateTime, Duration, FixedOffset, Utc};
use sea_orm::{
    ActiveModelTrait, ConnectOptions, ConnectionTrait, Database, DatabaseBackend,
    DatabaseConnection, DbErr, Set, Statement,
};
use sea_orm_migration::MigratorTrait;
use tracing::info;

use crate::entities::{comment, follow, group, post, user};
use crate::migrations::Migrator;

/// Open a fresh in-memory SQLite database with all migrations applied.
///
/// The pool is capped at one connection: every SQLite `:memory:` connection
/// is a separate database.
pub async fn sqlite_memory() -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new("sqlite::memory:");
    opt.max_connections(1).min_connections(1).sqlx_logging(false);

    let conn = Database::connect(opt).await?;
    conn.execute(Statement::from_string(
        DatabaseBackend::Sqlite,
        "PRAGMA foreign_keys = ON".to_string(),
    ))
    .await?;
    Migrator::up(&conn, None).await?;
    Ok(conn)
}

/// A fixed reference instant; `at(n)` is `n` minutes after it.
#[must_use]
pub fn at(minutes: i64) -> DateTime<FixedOffset> {
    let base = DateTime::parse_from_rfc3339("2025-01-01T12:00:00+00:00")
        .unwrap_or_else(|_| Utc::now().fixed_offset());
    base + Duration::minutes(minutes)
}

/// Insert a user with an unusable password.
pub async fn insert_user<C: ConnectionTrait>(db: &C, username: &str) -> Result<user::Model, DbErr> {
    user::ActiveModel {
        username: Set(username.to_string()),
        email: Set(None),
        first_name: Set(String::new()),
        last_name: Set(String::new()),
        password_hash: Set("!".to_string()),
        token: Set(Some(format!("token-{username}"))),
        is_staff: Set(false),
        date_joined: Set(Utc::now().fixed_offset()),
        ..Default::default()
    }
    .insert(db)
    .await
}

/// Insert a group.
pub async fn insert_group<C: ConnectionTrait>(db: &C, slug: &str) -> Result<group::Model, DbErr> {
    group::ActiveModel {
        title: Set(format!("Group {slug}")),
        slug: Set(slug.to_string()),
        description: Set(format!("All about {slug}")),
        ..Default::default()
    }
    .insert(db)
    .await
}

/// Insert a post published at `pub_date`.
pub async fn insert_post<C: ConnectionTrait>(
    db: &C,
    author_id: i32,
    group_id: Option<i32>,
    text: &str,
    pub_date: DateTime<FixedOffset>,
) -> Result<post::Model, DbErr> {
    post::ActiveModel {
        text: Set(text.to_string()),
        pub_date: Set(pub_date),
        author_id: Set(author_id),
        group_id: Set(group_id),
        image: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await
}

/// Insert a comment.
pub async fn insert_comment<C: ConnectionTrait>(
    db: &C,
    post_id: i32,
    author_id: i32,
    text: &str,
) -> Result<comment::Model, DbErr> {
    comment::ActiveModel {
        post_id: Set(post_id),
        author_id: Set(author_id),
        text: Set(text.to_string()),
        created: Set(Utc::now().fixed_offset()),
        ..Default::default()
    }
    .insert(db)
    .await
}

/// Insert a follow edge directly, bypassing any guard.
pub async fn insert_follow<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    author_id: i32,
) -> Result<follow::Model, DbErr> {
    follow::ActiveModel {
        user_id: Set(user_id),
        author_id: Set(author_id),
        ..Default::default()
    }
    .insert(db)
    .await
}

/// Test database configuration.
#[derive(Debug, Clone)]
pub struct TestDbConfig {
    /// Database host.
    pub host: String,
    /// Database port.
    pub port: u16,
    /// Database username.
    pub username: String,
    /// Database password.
    pub password: String,
    /// Database name.
    pub database: String,
}

impl Default for TestDbConfig {
    fn default() -> Self {
        Self {
            host: std::env::var("TEST_DB_HOST").unwrap_or_else(|_| "localhost".to_string()),
            port: std::env::var("TEST_DB_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(5433),
            username: std::env::var("TEST_DB_USER")
                .unwrap_or_else(|_| "postboard_test".to_string()),
            password: std::env::var("TEST_DB_PASSWORD")
                .unwrap_or_else(|_| "postboard_test".to_string()),
            database: std::env::var("TEST_DB_NAME")
                .unwrap_or_else(|_| "postboard_test".to_string()),
        }
    }
}

impl TestDbConfig {
    /// Get the database URL.
    #[must_use]
    pub fn database_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database
        )
    }
}

/// A connection to a `PostgreSQL` test database.
pub struct TestDatabase {
    /// Database connection.
    pub conn: DatabaseConnection,
    /// Database configuration.
    pub config: TestDbConfig,
}

impl TestDatabase {
    /// Connect to the configured test database and apply migrations.
    pub async fn new() -> Result<Self, DbErr> {
        let config = TestDbConfig::default();
        let conn = Database::connect(&config.database_url()).await?;
        Migrator::up(&conn, None).await?;

        info!(database = %config.database, "Connected to test database");

        Ok(Self { conn, config })
    }

    /// Get the database connection.
    #[must_use]
    pub const fn connection(&self) -> &DatabaseConnection {
        &self.conn
    }

    /// Remove all rows from every application table.
    pub async fn cleanup(&self) -> Result<(), DbErr> {
        self.conn
            .execute(Statement::from_string(
                DatabaseBackend::Postgres,
                r#"TRUNCATE TABLE "follow", "comment", "post", "group", "user_profile", "user" RESTART IDENTITY CASCADE"#
                    .to_string(),
            ))
            .await?;

        info!("Cleaned up test database");
        Ok(())
    }
}
