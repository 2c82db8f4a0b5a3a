//! Deposit entity - one recorded payment from a saver.
//!
//! Stored in the `transactions` table. `entry_date` is the business date in the
//! fixed UTC+7 calendar and is independent of `created_at`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// How a deposit was paid
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum DepositMethod {
    /// Paid in cash to a teller
    #[sea_orm(string_value = "cash")]
    Cash,
    /// Paid by bank transfer
    #[sea_orm(string_value = "transfer")]
    Transfer,
}

impl DepositMethod {
    /// Lower-case wire name (`"cash"` / `"transfer"`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cash => "cash",
            Self::Transfer => "transfer",
        }
    }
}

impl std::fmt::Display for DepositMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DepositMethod {
    type Err = crate::errors::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cash" => Ok(Self::Cash),
            "transfer" => Ok(Self::Transfer),
            other => Err(crate::errors::Error::invalid(format!(
                "payment method must be 'cash' or 'transfer', got '{other}'"
            ))),
        }
    }
}

/// Deposit database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    /// Unique identifier for the deposit
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Owning saver
    pub saver_id: i64,
    /// Amount paid, always positive
    pub amount: Decimal,
    /// Payment method
    pub method: DepositMethod,
    /// Business date of the entry (UTC+7)
    pub entry_date: Date,
    /// When the row was written
    pub created_at: DateTimeUtc,
    /// Teller who recorded the deposit
    pub actor_id: i64,
}

/// Defines relationships between Deposit and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each deposit belongs to one saver
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
