//! Saver entity - one balance record per participant in the savings program.
//!
//! `balance` is maintained incrementally by the ledger and withdrawal paths and
//! `paid_off` is derived from it against the target threshold. `version` is
//! bumped on every balance write and guards the compare-and-swap update.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Saver database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "savers")]
pub struct Model {
    /// Unique identifier for the saver
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name, trimmed and unique across live and soft-deleted savers
    #[sea_orm(unique)]
    pub name: String,
    /// Running balance (deposits minus withdrawals)
    pub balance: Decimal,
    /// Whether `balance` met the target when it was last written
    pub paid_off: bool,
    /// Optimistic concurrency counter
    pub version: i64,
    /// Soft delete marker - set savers are hidden from active listings
    pub deleted_at: Option<DateTimeUtc>,
    /// Actor who registered the saver
    pub created_by: i64,
    /// Actor who last modified the saver
    pub updated_by: i64,
    /// When the saver was registered
    pub created_at: DateTimeUtc,
    /// When the saver was last modified
    pub updated_at: DateTimeUtc,
}

impl Model {
    /// Whether the saver has been soft-deleted.
    #[must_use]
    pub const fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Defines relationships between Saver and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One saver has many deposits
    #[sea_orm(has_many = "super::deposit::Entity")]
    Deposits,
    /// One saver has many withdrawals
    #[sea_orm(has_many = "super::withdrawal::Entity")]
    Withdrawals,
}

impl Related<super::deposit::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Deposits.def()
    }
}

impl Related<super::withdrawal::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Withdrawals.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
