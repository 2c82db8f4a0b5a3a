//! Saver store - registration, renaming and the two removal paths.
//!
//! Soft deletion only hides a saver from active listings and can be undone.
//! Purging is permanent, restricted to administrators, and removes the
//! saver's transactions and withdrawals with it.

use crate::{
    core::{
        audit::{AuditEntry, snapshot, tables},
        balance::{load_active_saver, load_saver},
        context::{Actor, LedgerContext},
        status::is_paid_off,
    },
    entities::{AuditAction, Deposit, Saver, Withdrawal, deposit, saver, withdrawal},
    errors::{Error, Result},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    DbErr, PaginatorTrait, QueryOrder, Set, SqlErr, TransactionTrait, prelude::*,
};
use serde_json::json;
use tracing::{info, instrument, warn};

fn normalize_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::invalid("saver name cannot be empty"));
    }
    Ok(trimmed.to_string())
}

fn duplicate_name(name: &str) -> Error {
    Error::conflict(format!("a saver named '{name}' already exists"))
}

fn map_unique_violation(err: DbErr, name: &str) -> Error {
    if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
        duplicate_name(name)
    } else {
        err.into()
    }
}

/// Finds a saver by ID, including soft-deleted ones.
pub async fn get_saver(db: &DatabaseConnection, saver_id: i64) -> Result<Option<saver::Model>> {
    Saver::find_by_id(saver_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds a saver by exact (trimmed) name, including soft-deleted ones.
pub async fn find_saver_by_name(
    db: &DatabaseConnection,
    name: &str,
) -> Result<Option<saver::Model>> {
    Saver::find()
        .filter(saver::Column::Name.eq(name.trim()))
        .one(db)
        .await
        .map_err(Into::into)
}

/// All savers not soft-deleted, ordered by name.
pub async fn list_active_savers(db: &DatabaseConnection) -> Result<Vec<saver::Model>> {
    Saver::find()
        .filter(saver::Column::DeletedAt.is_null())
        .order_by_asc(saver::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Active savers whose stored flag says they reached the target.
pub async fn list_paid_off_savers(db: &DatabaseConnection) -> Result<Vec<saver::Model>> {
    Saver::find()
        .filter(saver::Column::DeletedAt.is_null())
        .filter(saver::Column::PaidOff.eq(true))
        .order_by_asc(saver::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Registers a saver with a zero balance.
///
/// # Errors
/// * `InvalidArgument` - the name is empty after trimming
/// * `Conflict` - another saver (live or soft-deleted) has the name
#[instrument(skip(ctx, actor), fields(actor_id = actor.id))]
pub async fn create_saver(ctx: &LedgerContext, name: &str, actor: &Actor) -> Result<saver::Model> {
    let name = normalize_name(name)?;

    if find_saver_by_name(&ctx.database, &name).await?.is_some() {
        return Err(duplicate_name(&name));
    }

    let target = ctx.target.resolve(&ctx.database).await?;
    let now = Utc::now();
    let created = saver::ActiveModel {
        name: Set(name.clone()),
        balance: Set(Decimal::ZERO),
        paid_off: Set(is_paid_off(Decimal::ZERO, target)),
        version: Set(0),
        deleted_at: Set(None),
        created_by: Set(actor.id),
        updated_by: Set(actor.id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&ctx.database)
    .await
    .map_err(|e| map_unique_violation(e, &name))?;

    info!(saver_id = created.id, name = %created.name, "Saver registered");

    ctx.audit
        .append(
            AuditEntry::new(
                actor,
                AuditAction::Create,
                tables::SAVERS,
                Some(created.id),
                format!("Registered saver '{}'", created.name),
            )
            .after(snapshot(&created)),
        )
        .await;

    Ok(created)
}

/// Renames an active saver.
///
/// # Errors
/// * `InvalidArgument` - the name is empty after trimming
/// * `NotFound` - the saver does not exist or is soft-deleted
/// * `Conflict` - another saver has the name
#[instrument(skip(ctx, actor), fields(actor_id = actor.id))]
pub async fn rename_saver(
    ctx: &LedgerContext,
    saver_id: i64,
    new_name: &str,
    actor: &Actor,
) -> Result<saver::Model> {
    let new_name = normalize_name(new_name)?;
    let current = load_active_saver(&ctx.database, saver_id).await?;

    if let Some(other) = find_saver_by_name(&ctx.database, &new_name).await?
        && other.id != saver_id
    {
        return Err(duplicate_name(&new_name));
    }

    let mut active: saver::ActiveModel = current.clone().into();
    active.name = Set(new_name.clone());
    active.updated_by = Set(actor.id);
    active.updated_at = Set(Utc::now());
    let renamed = active
        .update(&ctx.database)
        .await
        .map_err(|e| map_unique_violation(e, &new_name))?;

    info!(saver_id, from = %current.name, to = %renamed.name, "Saver renamed");

    ctx.audit
        .append(
            AuditEntry::new(
                actor,
                AuditAction::Update,
                tables::SAVERS,
                Some(saver_id),
                format!("Renamed saver '{}' to '{}'", current.name, renamed.name),
            )
            .before(snapshot(&current))
            .after(snapshot(&renamed)),
        )
        .await;

    Ok(renamed)
}

/// Hides a saver from active listings. Its history and balance are kept.
///
/// # Errors
/// * `NotFound` - the saver does not exist or is already soft-deleted
#[instrument(skip(ctx, actor), fields(actor_id = actor.id))]
pub async fn soft_delete_saver(
    ctx: &LedgerContext,
    saver_id: i64,
    actor: &Actor,
) -> Result<saver::Model> {
    let current = load_active_saver(&ctx.database, saver_id).await?;

    let now = Utc::now();
    let mut active: saver::ActiveModel = current.clone().into();
    active.deleted_at = Set(Some(now));
    active.updated_by = Set(actor.id);
    active.updated_at = Set(now);
    let deleted = active.update(&ctx.database).await?;

    info!(saver_id, name = %deleted.name, "Saver soft-deleted");

    ctx.audit
        .append(
            AuditEntry::new(
                actor,
                AuditAction::Delete,
                tables::SAVERS,
                Some(saver_id),
                format!("Removed saver '{}' from active listings", deleted.name),
            )
            .before(snapshot(&current))
            .after(snapshot(&deleted)),
        )
        .await;

    Ok(deleted)
}

/// Brings a soft-deleted saver back into active listings.
///
/// # Errors
/// * `NotFound` - the saver does not exist
/// * `InvalidArgument` - the saver is not soft-deleted
#[instrument(skip(ctx, actor), fields(actor_id = actor.id))]
pub async fn restore_saver(
    ctx: &LedgerContext,
    saver_id: i64,
    actor: &Actor,
) -> Result<saver::Model> {
    let current = load_saver(&ctx.database, saver_id).await?;
    if !current.is_deleted() {
        return Err(Error::invalid(format!(
            "saver '{}' is not deleted",
            current.name
        )));
    }

    let mut active: saver::ActiveModel = current.clone().into();
    active.deleted_at = Set(None);
    active.updated_by = Set(actor.id);
    active.updated_at = Set(Utc::now());
    let restored = active.update(&ctx.database).await?;

    info!(saver_id, name = %restored.name, "Saver restored");

    ctx.audit
        .append(
            AuditEntry::new(
                actor,
                AuditAction::Update,
                tables::SAVERS,
                Some(saver_id),
                format!("Restored saver '{}'", restored.name),
            )
            .before(snapshot(&current))
            .after(snapshot(&restored)),
        )
        .await;

    Ok(restored)
}

/// Permanently removes a saver with all of its transactions and withdrawals.
/// Returns the removed saver.
///
/// # Errors
/// * `Forbidden` - the actor is not an administrator
/// * `NotFound` - the saver does not exist
#[instrument(skip(ctx, actor), fields(actor_id = actor.id))]
pub async fn purge_saver(
    ctx: &LedgerContext,
    saver_id: i64,
    actor: &Actor,
) -> Result<saver::Model> {
    actor.require_elevated("permanently delete savers")?;

    let txn = ctx.database.begin().await?;
    let removed = load_saver(&txn, saver_id).await?;

    let deposit_count = Deposit::find()
        .filter(deposit::Column::SaverId.eq(saver_id))
        .count(&txn)
        .await?;
    let withdrawal_count = Withdrawal::find()
        .filter(withdrawal::Column::SaverId.eq(saver_id))
        .count(&txn)
        .await?;

    Deposit::delete_many()
        .filter(deposit::Column::SaverId.eq(saver_id))
        .exec(&txn)
        .await?;
    Withdrawal::delete_many()
        .filter(withdrawal::Column::SaverId.eq(saver_id))
        .exec(&txn)
        .await?;
    Saver::delete_by_id(saver_id).exec(&txn).await?;
    txn.commit().await?;

    warn!(
        saver_id,
        name = %removed.name,
        deposit_count,
        withdrawal_count,
        "Saver permanently deleted"
    );

    ctx.audit
        .append(
            AuditEntry::new(
                actor,
                AuditAction::Delete,
                tables::SAVERS,
                Some(saver_id),
                format!(
                    "PERMANENT delete of saver '{}': purged {deposit_count} transactions and {withdrawal_count} withdrawals (balance {})",
                    removed.name, removed.balance
                ),
            )
            .before(json!({
                "saver": snapshot(&removed),
                "purged_transactions": deposit_count,
                "purged_withdrawals": withdrawal_count,
            })),
        )
        .await;

    Ok(removed)
}
