//! Withdrawal entity - one qurban processing event debiting a saver.
//!
//! Rows are written once and never edited or deleted except by purging the
//! owning saver.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Withdrawal database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "withdrawals")]
pub struct Model {
    /// Unique identifier for the withdrawal
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning saver
    pub saver_id: i64,
    /// Qurban period (business-calendar year)
    pub period_year: i32,
    /// Number of animals/shares, 1 to 10
    pub headcount: i32,
    /// Price per head
    pub per_head_amount: Decimal,
    /// `headcount * per_head_amount`
    pub total_amount: Decimal,
    /// Business date of processing (UTC+7)
    pub processed_date: Date,
    /// Actor who processed the withdrawal
    pub actor_id: i64,
    /// When the row was written
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Withdrawal and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each withdrawal belongs to one saver
    #[sea_orm(
        belongs_to = "super::saver::Entity",
        from = "Column::SaverId",
        to = "super::saver::Column::Id",
        on_delete = "Cascade"
    )]
    Saver,
}

impl Related<super::saver::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Saver.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
