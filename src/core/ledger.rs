//! Ledger engine - records, corrects and removes deposits.
//!
//! Each operation writes the deposit row and the owning saver's new balance in
//! one database transaction, then appends an audit record. Corrections are
//! allowed for deposits of any age. Edits and deletes do not guard against the
//! balance going negative; such adjustments are logged at `warn`.

use crate::{
    core::{
        audit::{AuditEntry, snapshot, tables},
        balance::{apply_balance_delta, load_active_saver, load_saver},
        calendar::business_date,
        context::{Actor, LedgerContext},
    },
    entities::{AuditAction, Deposit, DepositMethod, deposit},
    errors::{Error, Result},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::{info, instrument};

fn validate_amount(amount: Decimal) -> Result<()> {
    if amount <= Decimal::ZERO {
        return Err(Error::invalid(format!(
            "deposit amount must be greater than zero, got {amount}"
        )));
    }
    Ok(())
}

async fn load_deposit<C>(db: &C, transaction_id: i64) -> Result<deposit::Model>
where
    C: ConnectionTrait,
{
    Deposit::find_by_id(transaction_id)
        .one(db)
        .await?
        .ok_or(Error::NotFound {
            entity: "transaction",
            id: transaction_id,
        })
}

/// Records a deposit for an active saver, dated to today's business date.
///
/// # Errors
/// * `InvalidArgument` - `amount` is zero or negative
/// * `NotFound` - the saver does not exist or is soft-deleted
/// * `Conflict` - the saver changed while the deposit was being written
#[instrument(skip(ctx, actor), fields(actor_id = actor.id))]
pub async fn record_deposit(
    ctx: &LedgerContext,
    saver_id: i64,
    amount: Decimal,
    method: DepositMethod,
    actor: &Actor,
) -> Result<deposit::Model> {
    validate_amount(amount)?;

    let txn = ctx.database.begin().await?;
    let target = ctx.target.resolve(&txn).await?;
    let saver = load_active_saver(&txn, saver_id).await?;

    let now = Utc::now();
    let created = deposit::ActiveModel {
        saver_id: Set(saver.id),
        amount: Set(amount),
        method: Set(method),
        entry_date: Set(business_date(now)),
        created_at: Set(now),
        actor_id: Set(actor.id),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let updated = apply_balance_delta(&txn, &saver, amount, target, actor.id).await?;
    txn.commit().await?;

    info!(
        transaction_id = created.id,
        saver_id,
        balance = %updated.balance,
        paid_off = updated.paid_off,
        "Deposit recorded"
    );

    ctx.audit
        .append(
            AuditEntry::new(
                actor,
                AuditAction::Create,
                tables::TRANSACTIONS,
                Some(created.id),
                format!(
                    "Recorded {method} deposit of {amount} for saver '{}' (balance {} -> {})",
                    saver.name, saver.balance, updated.balance
                ),
            )
            .after(snapshot(&created)),
        )
        .await;

    Ok(created)
}

/// Corrects the amount and method of an existing deposit.
///
/// The saver's balance moves by exactly `new_amount - old_amount`.
///
/// # Errors
/// * `InvalidArgument` - `new_amount` is zero or negative
/// * `NotFound` - the deposit or its saver does not exist
/// * `Conflict` - the saver changed while the correction was being written
#[instrument(skip(ctx, actor), fields(actor_id = actor.id))]
pub async fn edit_deposit(
    ctx: &LedgerContext,
    transaction_id: i64,
    new_amount: Decimal,
    new_method: DepositMethod,
    actor: &Actor,
) -> Result<deposit::Model> {
    validate_amount(new_amount)?;

    let txn = ctx.database.begin().await?;
    let target = ctx.target.resolve(&txn).await?;
    let original = load_deposit(&txn, transaction_id).await?;
    let saver = load_saver(&txn, original.saver_id).await?;

    let delta = new_amount - original.amount;

    let mut active: deposit::ActiveModel = original.clone().into();
    active.amount = Set(new_amount);
    active.method = Set(new_method);
    let edited = active.update(&txn).await?;

    let updated = apply_balance_delta(&txn, &saver, delta, target, actor.id).await?;
    txn.commit().await?;

    info!(
        transaction_id,
        saver_id = saver.id,
        %delta,
        balance = %updated.balance,
        paid_off = updated.paid_off,
        "Deposit corrected"
    );

    ctx.audit
        .append(
            AuditEntry::new(
                actor,
                AuditAction::Update,
                tables::TRANSACTIONS,
                Some(edited.id),
                format!(
                    "Corrected deposit #{} for saver '{}': {} {} -> {} {} (balance {} -> {})",
                    edited.id,
                    saver.name,
                    original.method,
                    original.amount,
                    edited.method,
                    edited.amount,
                    saver.balance,
                    updated.balance
                ),
            )
            .before(snapshot(&original))
            .after(snapshot(&edited)),
        )
        .await;

    Ok(edited)
}

/// Removes a deposit and reverses it from the saver's balance.
/// Returns the deleted row.
///
/// # Errors
/// * `Forbidden` - the actor is not an administrator
/// * `NotFound` - the deposit or its saver does not exist
/// * `Conflict` - the saver changed while the removal was being written
#[instrument(skip(ctx, actor), fields(actor_id = actor.id))]
pub async fn delete_deposit(
    ctx: &LedgerContext,
    transaction_id: i64,
    actor: &Actor,
) -> Result<deposit::Model> {
    actor.require_elevated("delete deposits")?;

    let txn = ctx.database.begin().await?;
    let target = ctx.target.resolve(&txn).await?;
    let removed = load_deposit(&txn, transaction_id).await?;
    let saver = load_saver(&txn, removed.saver_id).await?;

    Deposit::delete_by_id(removed.id).exec(&txn).await?;
    let updated = apply_balance_delta(&txn, &saver, -removed.amount, target, actor.id).await?;
    txn.commit().await?;

    info!(
        transaction_id,
        saver_id = saver.id,
        balance = %updated.balance,
        paid_off = updated.paid_off,
        "Deposit deleted"
    );

    ctx.audit
        .append(
            AuditEntry::new(
                actor,
                AuditAction::Delete,
                tables::TRANSACTIONS,
                Some(removed.id),
                format!(
                    "Deleted {} deposit #{} of {} for saver '{}' (balance {} -> {})",
                    removed.method,
                    removed.id,
                    removed.amount,
                    saver.name,
                    saver.balance,
                    updated.balance
                ),
            )
            .before(snapshot(&removed)),
        )
        .await;

    Ok(removed)
}

/// Finds a deposit by ID.
pub async fn get_deposit(
    db: &DatabaseConnection,
    transaction_id: i64,
) -> Result<Option<deposit::Model>> {
    Deposit::find_by_id(transaction_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// All deposits of a saver, newest entry first.
pub async fn deposits_for_saver(
    db: &DatabaseConnection,
    saver_id: i64,
) -> Result<Vec<deposit::Model>> {
    Deposit::find()
        .filter(deposit::Column::SaverId.eq(saver_id))
        .order_by_desc(deposit::Column::EntryDate)
        .order_by_desc(deposit::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::{
        audit::records_for_entity,
        calendar::today,
        saver::{get_saver, soft_delete_saver},
        status::{TargetSetting, set_target},
        withdrawal::process_withdrawal,
    };
    use crate::entities::{AuditRecord, Role};
    use crate::test_utils::*;
    use rust_decimal_macros::dec;
    use sea_orm::{ConnectionTrait, DatabaseBackend, MockDatabase, PaginatorTrait};

    #[tokio::test]
    async fn test_record_deposit_validation() -> Result<()> {
        let ctx = LedgerContext::new(MockDatabase::new(DatabaseBackend::Sqlite).into_connection());

        let result = record_deposit(&ctx, 1, Decimal::ZERO, DepositMethod::Cash, &teller()).await;
        assert!(matches!(result, Err(Error::InvalidArgument { .. })));

        let result = record_deposit(&ctx, 1, dec!(-1000), DepositMethod::Cash, &teller()).await;
        assert!(matches!(result, Err(Error::InvalidArgument { .. })));

        Ok(())
    }

    #[test]
    fn test_method_parsing() {
        assert_eq!("cash".parse::<DepositMethod>().unwrap(), DepositMethod::Cash);
        assert_eq!(" Transfer ".parse::<DepositMethod>().unwrap(), DepositMethod::Transfer);
        assert!(matches!(
            "cheque".parse::<DepositMethod>(),
            Err(Error::InvalidArgument { .. })
        ));
    }

    #[tokio::test]
    async fn test_deposit_reaching_target_marks_paid_off() -> Result<()> {
        let ctx = setup_test_context().await?;
        let saver = create_test_saver(&ctx, "Ahmad").await?;
        assert_eq!(saver.balance, Decimal::ZERO);

        let deposit = record_deposit(
            &ctx,
            saver.id,
            dec!(3600000),
            DepositMethod::Cash,
            &teller(),
        )
        .await?;
        assert_eq!(deposit.amount, dec!(3600000));
        assert_eq!(deposit.entry_date, today());
        assert_eq!(deposit.actor_id, teller().id);

        let saver = get_saver(&ctx.database, saver.id).await?.unwrap();
        assert_eq!(saver.balance, dec!(3600000));
        assert!(saver.paid_off);

        Ok(())
    }

    #[tokio::test]
    async fn test_record_deposit_unknown_or_deleted_saver() -> Result<()> {
        let ctx = setup_test_context().await?;

        let result = record_deposit(&ctx, 999, dec!(1000), DepositMethod::Cash, &teller()).await;
        assert!(matches!(result, Err(Error::NotFound { entity: "saver", id: 999 })));

        let saver = create_test_saver(&ctx, "Ahmad").await?;
        soft_delete_saver(&ctx, saver.id, &teller()).await?;
        let result =
            record_deposit(&ctx, saver.id, dec!(1000), DepositMethod::Cash, &teller()).await;
        assert!(matches!(result, Err(Error::NotFound { .. })));
        assert!(deposits_for_saver(&ctx.database, saver.id).await?.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_edit_changes_balance_by_delta() -> Result<()> {
        let ctx = setup_test_context().await?;
        let saver = create_test_saver(&ctx, "Ahmad").await?;
        deposit_cash(&ctx, saver.id, dec!(500000)).await?;
        let second = deposit_cash(&ctx, saver.id, dec!(200000)).await?;

        let edited = edit_deposit(
            &ctx,
            second.id,
            dec!(250000),
            DepositMethod::Transfer,
            &teller(),
        )
        .await?;
        assert_eq!(edited.amount, dec!(250000));
        assert_eq!(edited.method, DepositMethod::Transfer);
        assert_eq!(edited.entry_date, second.entry_date);

        let saver = get_saver(&ctx.database, saver.id).await?.unwrap();
        assert_eq!(saver.balance, dec!(750000));

        let edited = edit_deposit(&ctx, second.id, dec!(100000), DepositMethod::Cash, &teller())
            .await?;
        assert_eq!(edited.amount, dec!(100000));
        let saver = get_saver(&ctx.database, saver.id).await?.unwrap();
        assert_eq!(saver.balance, dec!(600000));
        assert_eq!(saver.balance, computed_balance(&ctx.database, saver.id).await?);

        Ok(())
    }

    #[tokio::test]
    async fn test_edit_to_zero_is_rejected_without_changes() -> Result<()> {
        let ctx = setup_test_context().await?;
        let saver = create_test_saver(&ctx, "Ahmad").await?;
        let deposit = deposit_cash(&ctx, saver.id, dec!(1000)).await?;

        let result = edit_deposit(&ctx, deposit.id, Decimal::ZERO, DepositMethod::Cash, &teller())
            .await;
        assert!(matches!(result, Err(Error::InvalidArgument { .. })));

        let stored = get_deposit(&ctx.database, deposit.id).await?.unwrap();
        assert_eq!(stored.amount, dec!(1000));
        let saver = get_saver(&ctx.database, saver.id).await?.unwrap();
        assert_eq!(saver.balance, dec!(1000));

        Ok(())
    }

    #[tokio::test]
    async fn test_edit_unknown_deposit() -> Result<()> {
        let ctx = setup_test_context().await?;
        let result = edit_deposit(&ctx, 42, dec!(1000), DepositMethod::Cash, &teller()).await;
        assert!(matches!(
            result,
            Err(Error::NotFound {
                entity: "transaction",
                id: 42
            })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_edit_uses_live_target() -> Result<()> {
        let ctx = setup_test_context().await?;
        let saver = create_test_saver(&ctx, "Ahmad").await?;
        let deposit = deposit_cash(&ctx, saver.id, dec!(3000000)).await?;
        assert!(!get_saver(&ctx.database, saver.id).await?.unwrap().paid_off);

        // Lowering the target does not touch existing flags...
        set_target(&ctx, dec!(3000000), &admin()).await?;
        assert!(!get_saver(&ctx.database, saver.id).await?.unwrap().paid_off);

        // ...the next balance change re-derives against the new value
        edit_deposit(&ctx, deposit.id, dec!(3000000), DepositMethod::Transfer, &teller())
            .await?;
        assert!(get_saver(&ctx.database, saver.id).await?.unwrap().paid_off);

        Ok(())
    }

    #[tokio::test]
    async fn test_delete_requires_admin() -> Result<()> {
        let ctx = setup_test_context().await?;
        let saver = create_test_saver(&ctx, "Ahmad").await?;
        let deposit = deposit_cash(&ctx, saver.id, dec!(1000)).await?;

        let result = delete_deposit(&ctx, deposit.id, &teller()).await;
        assert!(matches!(result, Err(Error::Forbidden { .. })));
        assert!(get_deposit(&ctx.database, deposit.id).await?.is_some());
        assert_eq!(
            get_saver(&ctx.database, saver.id).await?.unwrap().balance,
            dec!(1000)
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_delete_reverses_deposit() -> Result<()> {
        let ctx = setup_test_context().await?;
        let saver = create_test_saver(&ctx, "Ahmad").await?;
        deposit_cash(&ctx, saver.id, dec!(500)).await?;
        let deposit = deposit_cash(&ctx, saver.id, dec!(1000)).await?;

        let removed = delete_deposit(&ctx, deposit.id, &admin()).await?;
        assert_eq!(removed, deposit);
        assert!(get_deposit(&ctx.database, deposit.id).await?.is_none());

        let saver = get_saver(&ctx.database, saver.id).await?.unwrap();
        assert_eq!(saver.balance, dec!(500));
        assert_eq!(saver.balance, computed_balance(&ctx.database, saver.id).await?);

        Ok(())
    }

    #[tokio::test]
    async fn test_delete_after_withdrawal_can_drive_balance_negative() -> Result<()> {
        let ctx = setup_test_context()
            .await?
            .with_target(TargetSetting::Fixed(dec!(2000)));
        let saver = create_test_saver(&ctx, "Ahmad").await?;
        deposit_cash(&ctx, saver.id, dec!(500)).await?;
        let large = deposit_cash(&ctx, saver.id, dec!(1000)).await?;
        process_withdrawal(&ctx, saver.id, 1, dec!(1400), &admin()).await?;

        // Nothing stops a correction from leaving the saver below zero
        delete_deposit(&ctx, large.id, &admin()).await?;

        let saver = get_saver(&ctx.database, saver.id).await?.unwrap();
        assert_eq!(saver.balance, dec!(-900));
        assert!(!saver.paid_off);
        assert_eq!(saver.balance, computed_balance(&ctx.database, saver.id).await?);

        Ok(())
    }

    #[tokio::test]
    async fn test_corrections_on_soft_deleted_saver_allowed() -> Result<()> {
        let ctx = setup_test_context().await?;
        let saver = create_test_saver(&ctx, "Ahmad").await?;
        let deposit = deposit_cash(&ctx, saver.id, dec!(1000)).await?;
        soft_delete_saver(&ctx, saver.id, &teller()).await?;

        edit_deposit(&ctx, deposit.id, dec!(1500), DepositMethod::Cash, &teller()).await?;
        let saver = get_saver(&ctx.database, saver.id).await?.unwrap();
        assert_eq!(saver.balance, dec!(1500));

        Ok(())
    }

    #[tokio::test]
    async fn test_balance_conservation_over_mixed_sequence() -> Result<()> {
        let ctx = setup_test_context().await?;
        let saver = create_test_saver(&ctx, "Ahmad").await?;

        let a = deposit_cash(&ctx, saver.id, dec!(1200000)).await?;
        let b = deposit_cash(&ctx, saver.id, dec!(800000)).await?;
        let c = deposit_cash(&ctx, saver.id, dec!(2000000)).await?;
        edit_deposit(&ctx, a.id, dec!(1000000), DepositMethod::Transfer, &teller()).await?;
        delete_deposit(&ctx, b.id, &admin()).await?;
        process_withdrawal(&ctx, saver.id, 1, dec!(2500000), &admin()).await?;
        edit_deposit(&ctx, c.id, dec!(2100000), DepositMethod::Cash, &teller()).await?;

        // 1_000_000 + 2_100_000 - 2_500_000
        let saver = get_saver(&ctx.database, saver.id).await?.unwrap();
        assert_eq!(saver.balance, dec!(600000));
        assert_eq!(saver.balance, computed_balance(&ctx.database, saver.id).await?);
        assert!(!saver.paid_off);

        Ok(())
    }

    #[tokio::test]
    async fn test_concurrent_deposits_are_serialized() -> Result<()> {
        let ctx = setup_test_context().await?;
        let saver = create_test_saver(&ctx, "Ahmad").await?;
        let actor = teller();

        let (first, second) = tokio::join!(
            record_deposit(&ctx, saver.id, dec!(100000), DepositMethod::Cash, &actor),
            record_deposit(&ctx, saver.id, dec!(250000), DepositMethod::Transfer, &actor),
        );
        first?;
        second?;

        let saver = get_saver(&ctx.database, saver.id).await?.unwrap();
        assert_eq!(saver.balance, dec!(350000));
        assert_eq!(saver.balance, computed_balance(&ctx.database, saver.id).await?);

        Ok(())
    }

    #[tokio::test]
    async fn test_each_operation_writes_one_audit_record() -> Result<()> {
        let ctx = setup_test_context().await?;
        let saver = create_test_saver(&ctx, "Ahmad").await?;
        let actor = teller().with_client_address("10.1.2.3");

        let deposit =
            record_deposit(&ctx, saver.id, dec!(50000), DepositMethod::Cash, &actor).await?;
        edit_deposit(&ctx, deposit.id, dec!(75000), DepositMethod::Cash, &actor).await?;
        delete_deposit(&ctx, deposit.id, &admin()).await?;

        let records =
            records_for_entity(&ctx.database, tables::TRANSACTIONS, deposit.id).await?;
        assert_eq!(records.len(), 3);

        assert_eq!(records[0].action, AuditAction::Create);
        assert!(records[0].before.is_none());
        assert_eq!(
            json_decimal(&records[0].after.as_ref().unwrap()["amount"]),
            Some(dec!(50000))
        );
        assert_eq!(records[0].client_address.as_deref(), Some("10.1.2.3"));
        assert_eq!(records[0].actor_role, Role::Teller);

        assert_eq!(records[1].action, AuditAction::Update);
        assert_eq!(
            json_decimal(&records[1].before.as_ref().unwrap()["amount"]),
            Some(dec!(50000))
        );
        assert_eq!(
            json_decimal(&records[1].after.as_ref().unwrap()["amount"]),
            Some(dec!(75000))
        );
        assert!(records[1].description.contains("Ahmad"));

        assert_eq!(records[2].action, AuditAction::Delete);
        assert_eq!(records[2].actor_role, Role::Admin);
        assert_eq!(
            json_decimal(&records[2].before.as_ref().unwrap()["amount"]),
            Some(dec!(75000))
        );
        assert!(records[2].after.is_none());

        Ok(())
    }

    #[tokio::test]
    async fn test_deposit_commits_when_audit_store_fails() -> Result<()> {
        let ctx = setup_test_context().await?;
        let saver = create_test_saver(&ctx, "Ahmad").await?;
        let audited_before = AuditRecord::find().count(&ctx.database).await?;
        assert_eq!(audited_before, 1);

        ctx.database
            .execute_unprepared("DROP TABLE audit_records")
            .await?;

        let deposit = record_deposit(
            &ctx,
            saver.id,
            dec!(3600000),
            DepositMethod::Transfer,
            &teller(),
        )
        .await?;

        assert!(get_deposit(&ctx.database, deposit.id).await?.is_some());
        let saver = get_saver(&ctx.database, saver.id).await?.unwrap();
        assert_eq!(saver.balance, dec!(3600000));
        assert!(saver.paid_off);

        Ok(())
    }

    #[tokio::test]
    async fn test_deposits_for_saver_ordering() -> Result<()> {
        let ctx = setup_test_context().await?;
        let ahmad = create_test_saver(&ctx, "Ahmad").await?;
        let siti = create_test_saver(&ctx, "Siti").await?;

        let first = deposit_cash(&ctx, ahmad.id, dec!(1000)).await?;
        let second = deposit_cash(&ctx, ahmad.id, dec!(2000)).await?;
        deposit_cash(&ctx, siti.id, dec!(3000)).await?;

        let deposits = deposits_for_saver(&ctx.database, ahmad.id).await?;
        assert_eq!(deposits, vec![second, first]);

        Ok(())
    }
}
