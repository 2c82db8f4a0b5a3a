//! Saver balance writes.
//!
//! Balances are adjusted by a delta, never recomputed from history, so every
//! ledger entry write must be paired with exactly one call to
//! [`apply_balance_delta`] inside the same database transaction.
//!
//! The saver row is written with a compare-and-swap on `version`: if another
//! unit of work changed the saver after it was read, the update matches no
//! rows and the whole transaction is abandoned with [`Error::Conflict`].

use crate::{
    core::status::is_paid_off,
    entities::{Saver, saver},
    errors::{Error, Result},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{prelude::*, sea_query::Expr};
use tracing::{debug, warn};

/// Loads a saver inside the current unit of work.
pub(crate) async fn load_saver<C>(db: &C, saver_id: i64) -> Result<saver::Model>
where
    C: ConnectionTrait,
{
    Saver::find_by_id(saver_id)
        .one(db)
        .await?
        .ok_or(Error::NotFound {
            entity: "saver",
            id: saver_id,
        })
}

/// Loads a saver that has not been soft-deleted.
pub(crate) async fn load_active_saver<C>(db: &C, saver_id: i64) -> Result<saver::Model>
where
    C: ConnectionTrait,
{
    let saver = load_saver(db, saver_id).await?;
    if saver.is_deleted() {
        return Err(Error::NotFound {
            entity: "saver",
            id: saver_id,
        });
    }
    Ok(saver)
}

/// Adds `delta` to the balance of `saver` (as read earlier in this unit of
/// work), re-derives `paid_off` against `target`, and returns the new row.
///
/// No lower bound is enforced here; callers that need one check before calling.
pub(crate) async fn apply_balance_delta<C>(
    db: &C,
    saver: &saver::Model,
    delta: Decimal,
    target: Decimal,
    actor_id: i64,
) -> Result<saver::Model>
where
    C: ConnectionTrait,
{
    let balance = saver.balance + delta;
    let paid_off = is_paid_off(balance, target);
    let now = Utc::now();

    let result = Saver::update_many()
        .col_expr(saver::Column::Balance, Expr::value(balance))
        .col_expr(saver::Column::PaidOff, Expr::value(paid_off))
        .col_expr(
            saver::Column::Version,
            Expr::col(saver::Column::Version).add(1),
        )
        .col_expr(saver::Column::UpdatedBy, Expr::value(actor_id))
        .col_expr(saver::Column::UpdatedAt, Expr::value(now))
        .filter(saver::Column::Id.eq(saver.id))
        .filter(saver::Column::Version.eq(saver.version))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(Error::conflict(format!(
            "saver {} was modified concurrently; reload and retry",
            saver.id
        )));
    }

    if balance < Decimal::ZERO {
        warn!(
            saver_id = saver.id,
            %balance,
            %delta,
            "Saver balance is negative after adjustment"
        );
    }
    debug!(saver_id = saver.id, old = %saver.balance, new = %balance, paid_off, "Balance adjusted");

    Ok(saver::Model {
        balance,
        paid_off,
        version: saver.version + 1,
        updated_by: actor_id,
        updated_at: now,
        ..saver.clone()
    })
}
