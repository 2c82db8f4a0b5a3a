//! Setting entity - key-value configuration rows.
//! Only the `target` key is read by the ledger.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Setting database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "settings")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Setting key (e.g., `"target"`)
    #[sea_orm(unique)]
    pub key: String,
    /// Value stored as string
    pub value: String,
    /// When this setting was last modified
    pub updated_at: DateTimeUtc,
    /// Actor who last modified it, None when seeded at bootstrap
    pub updated_by: Option<i64>,
}

/// `Setting` has no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
