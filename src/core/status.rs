//! Paid-off derivation and the target threshold.
//!
//! A saver is paid off when its balance is at or above the target. The target
//! lives in the `settings` table under [`TARGET_KEY`] and is resolved through the
//! [`TargetSetting`] held by the [`LedgerContext`], on every balance-changing call.

use crate::{
    core::{
        audit::{AuditEntry, tables},
        context::{Actor, LedgerContext},
    },
    entities::{AuditAction, Setting, setting},
    errors::{Error, Result},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{Set, prelude::*};
use serde_json::json;
use std::str::FromStr;
use tracing::{info, instrument};

/// Settings key holding the paid-off threshold.
pub const TARGET_KEY: &str = "target";

/// `balance >= target`
#[must_use]
pub fn is_paid_off(balance: Decimal, target: Decimal) -> bool {
    balance >= target
}

/// Where the paid-off threshold comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TargetSetting {
    /// Read the stored `target` setting on every call, using `default` when unset.
    Stored {
        /// Value used while no target is stored
        default: Decimal,
    },
    /// Always use this value.
    Fixed(Decimal),
}

impl TargetSetting {
    /// Resolves the threshold in effect right now.
    pub async fn resolve<C>(&self, db: &C) -> Result<Decimal>
    where
        C: ConnectionTrait,
    {
        match *self {
            Self::Fixed(value) => Ok(value),
            Self::Stored { default } => Ok(get_stored_target(db).await?.unwrap_or(default)),
        }
    }
}

fn parse_target(raw: &str) -> Result<Decimal> {
    Decimal::from_str(raw.trim()).map_err(|e| Error::Config {
        message: format!("Stored target '{raw}' is not a decimal number: {e}"),
    })
}

/// Reads the stored target, `None` if it was never set.
pub async fn get_stored_target<C>(db: &C) -> Result<Option<Decimal>>
where
    C: ConnectionTrait,
{
    let row = Setting::find()
        .filter(setting::Column::Key.eq(TARGET_KEY))
        .one(db)
        .await?;

    row.map(|s| parse_target(&s.value)).transpose()
}

/// Stores `default` as the target unless one is already present.
/// Returns the target in effect afterwards.
#[instrument(skip(db))]
pub async fn seed_target(db: &DatabaseConnection, default: Decimal) -> Result<Decimal> {
    if let Some(existing) = get_stored_target(db).await? {
        return Ok(existing);
    }

    setting::ActiveModel {
        key: Set(TARGET_KEY.to_string()),
        value: Set(default.to_string()),
        updated_at: Set(Utc::now()),
        updated_by: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!(%default, "Seeded target setting");
    Ok(default)
}

/// Changes the stored target. Existing savers keep their `paid_off` flag until
/// their next balance change.
#[instrument(skip(ctx, actor), fields(actor_id = actor.id))]
pub async fn set_target(ctx: &LedgerContext, value: Decimal, actor: &Actor) -> Result<Decimal> {
    if value <= Decimal::ZERO {
        return Err(Error::invalid(format!(
            "target must be greater than zero, got {value}"
        )));
    }

    let now = Utc::now();
    let existing = Setting::find()
        .filter(setting::Column::Key.eq(TARGET_KEY))
        .one(&ctx.database)
        .await?;

    let (stored, before) = if let Some(row) = existing {
        let before = json!({ "key": TARGET_KEY, "value": row.value.clone() });
        let mut active: setting::ActiveModel = row.into();
        active.value = Set(value.to_string());
        active.updated_at = Set(now);
        active.updated_by = Set(Some(actor.id));
        (active.update(&ctx.database).await?, Some(before))
    } else {
        let inserted = setting::ActiveModel {
            key: Set(TARGET_KEY.to_string()),
            value: Set(value.to_string()),
            updated_at: Set(now),
            updated_by: Set(Some(actor.id)),
            ..Default::default()
        }
        .insert(&ctx.database)
        .await?;
        (inserted, None)
    };

    info!(%value, "Target updated");

    let action = if before.is_some() {
        AuditAction::Update
    } else {
        AuditAction::Create
    };
    let mut entry = AuditEntry::new(
        actor,
        action,
        tables::SETTINGS,
        Some(i64::from(stored.id)),
        format!("Set savings target to {value}"),
    )
    .after(json!({ "key": TARGET_KEY, "value": stored.value }));
    if let Some(before) = before {
        entry = entry.before(before);
    }
    ctx.audit.append(entry).await;

    Ok(value)
}
