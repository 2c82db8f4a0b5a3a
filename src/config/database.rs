//! Database configuration module.
//!
//! This module handles `SQLite` database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with
//! `Schema::create_table_from_entity`, so the schema always matches the Rust models,
//! including the unique saver name and the cascading saver foreign keys.

use crate::entities::{AuditRecord, Deposit, Saver, Setting, Withdrawal};
use crate::errors::Result;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Schema};
use tracing::{debug, info, instrument};

/// Default database location when neither `DATABASE_URL` nor config.toml provide one.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://data/qurban_savings.sqlite?mode=rwc";

/// Gets the database URL from the `DATABASE_URL` environment variable, then the
/// configured value, then [`DEFAULT_DATABASE_URL`].
#[must_use]
pub fn get_database_url(configured: Option<&str>) -> String {
    std::env::var("DATABASE_URL")
        .ok()
        .or_else(|| configured.map(str::to_string))
        .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string())
}

/// Establishes a connection to the database at `database_url`.
#[instrument]
pub async fn create_connection(database_url: &str) -> Result<DatabaseConnection> {
    debug!("Connecting to database");
    Database::connect(database_url).await.map_err(Into::into)
}

/// Creates all tables if they do not already exist.
///
/// Savers are created first so the foreign keys on `transactions` and
/// `withdrawals` resolve.
#[instrument(skip(db))]
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let mut statements = vec![
        schema.create_table_from_entity(Saver),
        schema.create_table_from_entity(Deposit),
        schema.create_table_from_entity(Withdrawal),
        schema.create_table_from_entity(Setting),
        schema.create_table_from_entity(AuditRecord),
    ];

    for statement in &mut statements {
        statement.if_not_exists();
        db.execute(builder.build(&*statement)).await?;
    }

    info!("Database tables ensured");
    Ok(())
}
