//! Audit record entity - append-only trail of every mutating action.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Kind of action being audited
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum AuditAction {
    /// A row was created
    #[sea_orm(string_value = "create")]
    Create,
    /// A row was modified
    #[sea_orm(string_value = "update")]
    Update,
    /// A row was removed (soft or hard)
    #[sea_orm(string_value = "delete")]
    Delete,
    /// An actor signed in
    #[sea_orm(string_value = "login")]
    Login,
    /// An actor signed out
    #[sea_orm(string_value = "logout")]
    Logout,
}

/// Staff role of the actor performing an action
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Program administrator, allowed destructive corrections
    #[sea_orm(string_value = "admin")]
    Admin,
    /// Teller recording day-to-day deposits
    #[sea_orm(string_value = "teller")]
    Teller,
}

impl Role {
    /// Whether this role may delete deposits and purge savers.
    #[must_use]
    pub const fn is_elevated(self) -> bool {
        matches!(self, Self::Admin)
    }
}

/// Audit record database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "audit_records")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Actor who performed the action
    pub actor_id: i64,
    /// Actor's role at the time
    pub actor_role: Role,
    /// What happened
    pub action: AuditAction,
    /// Table of the affected row (e.g., `"transactions"`)
    pub entity_table: String,
    /// Identifier of the affected row
    pub entity_id: Option<i64>,
    /// Human-readable summary
    pub description: String,
    /// Redacted snapshot before the change
    pub before: Option<Json>,
    /// Redacted snapshot after the change
    pub after: Option<Json>,
    /// Client address reported by the calling layer
    pub client_address: Option<String>,
    /// When the record was written
    pub created_at: DateTimeUtc,
}

/// `AuditRecord` has no relationships; it outlives the rows it describes
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
