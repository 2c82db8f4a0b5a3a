//! Shared test utilities.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test savers and deposits with sensible defaults.

use crate::{
    config::database::create_tables,
    core::{
        Actor, LedgerContext,
        ledger::{deposits_for_saver, record_deposit},
        saver::create_saver,
        withdrawal::withdrawals_for_saver,
    },
    entities::{self, DepositMethod, Role},
    errors::Result,
};
use rust_decimal::Decimal;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};

/// Creates an in-memory `SQLite` database with all tables initialized,
/// wrapped in a context using the default stored target (3,600,000).
///
/// The pool holds a single connection, so concurrent units of work queue for it.
pub async fn setup_test_context() -> Result<LedgerContext> {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1).sqlx_logging(false);
    let db = Database::connect(options).await?;
    create_tables(&db).await?;
    Ok(LedgerContext::new(db))
}

/// Administrator actor (id 1).
#[must_use]
pub const fn admin() -> Actor {
    Actor::new(1, Role::Admin)
}

/// Teller actor (id 2).
#[must_use]
pub const fn teller() -> Actor {
    Actor::new(2, Role::Teller)
}

/// Registers a saver as the test teller.
pub async fn create_test_saver(ctx: &LedgerContext, name: &str) -> Result<entities::saver::Model> {
    create_saver(ctx, name, &teller()).await
}

/// Records a cash deposit as the test teller.
pub async fn deposit_cash(
    ctx: &LedgerContext,
    saver_id: i64,
    amount: Decimal,
) -> Result<entities::deposit::Model> {
    record_deposit(ctx, saver_id, amount, DepositMethod::Cash, &teller()).await
}

/// Balance implied by the full history: deposits minus withdrawals.
/// Used to check the incrementally maintained balance.
pub async fn computed_balance(db: &DatabaseConnection, saver_id: i64) -> Result<Decimal> {
    let deposited: Decimal = deposits_for_saver(db, saver_id)
        .await?
        .iter()
        .map(|d| d.amount)
        .sum();
    let withdrawn: Decimal = withdrawals_for_saver(db, saver_id)
        .await?
        .iter()
        .map(|w| w.total_amount)
        .sum();
    Ok(deposited - withdrawn)
}

/// Reads a decimal serialized into an audit snapshot.
#[must_use]
pub fn json_decimal(value: &serde_json::Value) -> Option<Decimal> {
    value.as_str().and_then(|s| s.parse().ok())
}
