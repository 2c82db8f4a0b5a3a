//! Withdrawal processor - qurban lump-sum debits.
//!
//! The balance check happens before any write; an insufficient balance leaves
//! every row untouched. Withdrawal rows are immutable once written.

use crate::{
    core::{
        audit::{AuditEntry, snapshot, tables},
        balance::{apply_balance_delta, load_active_saver},
        calendar::business_date,
        context::{Actor, LedgerContext},
    },
    entities::{AuditAction, Withdrawal, withdrawal},
    errors::{Error, Result},
};
use chrono::{Datelike, Utc};
use rust_decimal::Decimal;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::{info, instrument};

/// Smallest number of heads per withdrawal.
pub const MIN_HEADCOUNT: i32 = 1;
/// Largest number of heads per withdrawal.
pub const MAX_HEADCOUNT: i32 = 10;
/// Smallest accepted price per head.
pub const MIN_PER_HEAD_AMOUNT: Decimal = Decimal::from_parts(1000, 0, 0, false, 0);

/// Validates a request and returns `headcount * per_head_amount`.
pub fn withdrawal_total(headcount: i32, per_head_amount: Decimal) -> Result<Decimal> {
    if !(MIN_HEADCOUNT..=MAX_HEADCOUNT).contains(&headcount) {
        return Err(Error::invalid(format!(
            "headcount must be between {MIN_HEADCOUNT} and {MAX_HEADCOUNT}, got {headcount}"
        )));
    }
    if per_head_amount < MIN_PER_HEAD_AMOUNT {
        return Err(Error::invalid(format!(
            "amount per head must be at least {MIN_PER_HEAD_AMOUNT}, got {per_head_amount}"
        )));
    }
    per_head_amount
        .checked_mul(Decimal::from(headcount))
        .ok_or_else(|| Error::invalid("withdrawal total is too large"))
}

/// Debits `headcount * per_head_amount` from an active saver and records the withdrawal.
///
/// # Errors
/// * `InvalidArgument` - headcount outside 1..=10 or amount per head below the minimum
/// * `NotFound` - the saver does not exist or is soft-deleted
/// * `InsufficientBalance` - the saver holds less than the total
/// * `Conflict` - the saver changed while the withdrawal was being written
#[instrument(skip(ctx, actor), fields(actor_id = actor.id))]
pub async fn process_withdrawal(
    ctx: &LedgerContext,
    saver_id: i64,
    headcount: i32,
    per_head_amount: Decimal,
    actor: &Actor,
) -> Result<withdrawal::Model> {
    let total = withdrawal_total(headcount, per_head_amount)?;

    let txn = ctx.database.begin().await?;
    let target = ctx.target.resolve(&txn).await?;
    let saver = load_active_saver(&txn, saver_id).await?;

    if saver.balance < total {
        return Err(Error::InsufficientBalance {
            balance: saver.balance,
            required: total,
        });
    }

    let now = Utc::now();
    let processed_date = business_date(now);
    let created = withdrawal::ActiveModel {
        saver_id: Set(saver.id),
        period_year: Set(processed_date.year()),
        headcount: Set(headcount),
        per_head_amount: Set(per_head_amount),
        total_amount: Set(total),
        processed_date: Set(processed_date),
        actor_id: Set(actor.id),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let updated = apply_balance_delta(&txn, &saver, -total, target, actor.id).await?;
    txn.commit().await?;

    info!(
        withdrawal_id = created.id,
        saver_id,
        %total,
        balance = %updated.balance,
        "Withdrawal processed"
    );

    ctx.audit
        .append(
            AuditEntry::new(
                actor,
                AuditAction::Create,
                tables::WITHDRAWALS,
                Some(created.id),
                format!(
                    "Processed qurban withdrawal for saver '{}': {headcount} x {per_head_amount} = {total} (balance {} -> {})",
                    saver.name, saver.balance, updated.balance
                ),
            )
            .after(snapshot(&created)),
        )
        .await;

    Ok(created)
}

/// Finds a withdrawal by ID.
pub async fn get_withdrawal(
    db: &DatabaseConnection,
    withdrawal_id: i64,
) -> Result<Option<withdrawal::Model>> {
    Withdrawal::find_by_id(withdrawal_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// All withdrawals of a saver, most recent first.
pub async fn withdrawals_for_saver(
    db: &DatabaseConnection,
    saver_id: i64,
) -> Result<Vec<withdrawal::Model>> {
    Withdrawal::find()
        .filter(withdrawal::Column::SaverId.eq(saver_id))
        .order_by_desc(withdrawal::Column::ProcessedDate)
        .order_by_desc(withdrawal::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}
