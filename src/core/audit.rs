//! Audit trail - append-only records of every mutating action.
//!
//! Records are written after the business operation has committed. A failed
//! write is logged on the `audit` tracing target and swallowed, so the
//! operation that triggered it still succeeds; the trail is therefore not a
//! reliable reconstruction source when the audit store is failing.
//!
//! Snapshots pass through [`redact`] before storage so credential fields never
//! reach the trail.

use crate::{
    core::context::Actor,
    entities::{AuditAction, AuditRecord, Role, audit_record},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{QueryOrder, Set, prelude::*};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, error};

/// Table names recorded in `entity_table`.
pub mod tables {
    /// Saver rows
    pub const SAVERS: &str = "savers";
    /// Deposit rows
    pub const TRANSACTIONS: &str = "transactions";
    /// Withdrawal rows
    pub const WITHDRAWALS: &str = "withdrawals";
    /// Setting rows
    pub const SETTINGS: &str = "settings";
    /// Session events (login/logout)
    pub const SESSIONS: &str = "sessions";
}

/// Replacement written in place of sensitive values.
pub const REDACTED: &str = "[REDACTED]";

const SENSITIVE_KEYS: &[&str] = &[
    "password",
    "password_hash",
    "remember_token",
    "token",
    "secret",
    "api_key",
];

fn is_sensitive(key: &str) -> bool {
    SENSITIVE_KEYS
        .iter()
        .any(|sensitive| key.eq_ignore_ascii_case(sensitive))
}

/// Masks sensitive keys anywhere inside `value`.
#[must_use]
pub fn redact(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, inner)| {
                    if is_sensitive(&key) {
                        (key, Value::String(REDACTED.to_string()))
                    } else {
                        (key, redact(inner))
                    }
                })
                .collect::<Map<String, Value>>(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(redact).collect()),
        other => other,
    }
}

/// Serializes a row for the trail.
///
/// Entity models always serialize; a failure would only lose the snapshot, so
/// it is recorded inline instead of failing the caller.
#[must_use]
pub fn snapshot<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value)
        .unwrap_or_else(|e| serde_json::json!({ "snapshot_error": e.to_string() }))
}

/// One audit record waiting to be appended.
#[derive(Clone, Debug, PartialEq)]
pub struct AuditEntry {
    /// Actor who performed the action
    pub actor_id: i64,
    /// Actor's role
    pub actor_role: Role,
    /// What happened
    pub action: AuditAction,
    /// Table of the affected row
    pub entity_table: String,
    /// Identifier of the affected row
    pub entity_id: Option<i64>,
    /// Human-readable summary
    pub description: String,
    /// State before the change
    pub before: Option<Value>,
    /// State after the change
    pub after: Option<Value>,
    /// Client address of the actor
    pub client_address: Option<String>,
}

impl AuditEntry {
    /// Starts an entry for `actor` acting on `entity_table`/`entity_id`.
    #[must_use]
    pub fn new(
        actor: &Actor,
        action: AuditAction,
        entity_table: &str,
        entity_id: Option<i64>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            actor_id: actor.id,
            actor_role: actor.role,
            action,
            entity_table: entity_table.to_string(),
            entity_id,
            description: description.into(),
            before: None,
            after: None,
            client_address: actor.client_address.clone(),
        }
    }

    /// Sets the `before` snapshot.
    #[must_use]
    pub fn before(mut self, value: Value) -> Self {
        self.before = Some(value);
        self
    }

    /// Sets the `after` snapshot.
    #[must_use]
    pub fn after(mut self, value: Value) -> Self {
        self.after = Some(value);
        self
    }
}

/// Writes audit records to the `audit_records` table.
#[derive(Clone, Debug)]
pub struct AuditLogger {
    database: DatabaseConnection,
}

impl AuditLogger {
    /// Creates a logger writing through `database`.
    #[must_use]
    pub const fn new(database: DatabaseConnection) -> Self {
        Self { database }
    }

    /// Appends `entry`, logging and swallowing any failure.
    pub async fn append(&self, entry: AuditEntry) {
        let action = entry.action;
        let entity_table = entry.entity_table.clone();
        let entity_id = entry.entity_id;
        let actor_id = entry.actor_id;

        if let Err(e) = self.try_append(entry).await {
            error!(
                target: "audit",
                ?action,
                %entity_table,
                ?entity_id,
                actor_id,
                error = %e,
                "Audit write failed after the business operation committed; the operation stands"
            );
        }
    }

    /// Appends `entry`, returning the stored record.
    pub async fn try_append(&self, entry: AuditEntry) -> Result<audit_record::Model> {
        let record = audit_record::ActiveModel {
            actor_id: Set(entry.actor_id),
            actor_role: Set(entry.actor_role),
            action: Set(entry.action),
            entity_table: Set(entry.entity_table),
            entity_id: Set(entry.entity_id),
            description: Set(entry.description),
            before: Set(entry.before.map(redact)),
            after: Set(entry.after.map(redact)),
            client_address: Set(entry.client_address),
            created_at: Set(Utc::now()),
            ..Default::default()
        };

        let stored = record.insert(&self.database).await?;
        debug!(
            target: "audit",
            record_id = stored.id,
            action = ?stored.action,
            entity_table = %stored.entity_table,
            "Audit record appended"
        );
        Ok(stored)
    }

    /// Records a login or logout by `actor`.
    pub async fn record_session(&self, actor: &Actor, action: AuditAction) -> Result<()> {
        let description = match action {
            AuditAction::Login => format!("Actor {} signed in", actor.id),
            AuditAction::Logout => format!("Actor {} signed out", actor.id),
            other => {
                return Err(Error::invalid(format!(
                    "session events must be login or logout, got {other:?}"
                )));
            }
        };

        self.append(AuditEntry::new(
            actor,
            action,
            tables::SESSIONS,
            Some(actor.id),
            description,
        ))
        .await;
        Ok(())
    }
}

/// Returns the trail for one row, oldest first.
pub async fn records_for_entity(
    db: &DatabaseConnection,
    entity_table: &str,
    entity_id: i64,
) -> Result<Vec<audit_record::Model>> {
    AuditRecord::find()
        .filter(audit_record::Column::EntityTable.eq(entity_table))
        .filter(audit_record::Column::EntityId.eq(entity_id))
        .order_by_asc(audit_record::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}
