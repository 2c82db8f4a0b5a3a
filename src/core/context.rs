//! Shared services handed to every core operation, plus the identity of the
//! staff member performing it.

use crate::{
    config::app::DEFAULT_TARGET,
    core::{audit::AuditLogger, status::TargetSetting},
    entities::Role,
    errors::{Error, Result},
};
use sea_orm::DatabaseConnection;

/// Authenticated staff member performing an operation.
///
/// Identity is verified by the calling layer; the core only checks the role.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Actor {
    /// Staff identifier
    pub id: i64,
    /// Staff role
    pub role: Role,
    /// Client address reported by the calling layer, stored on audit records
    pub client_address: Option<String>,
}

impl Actor {
    /// Creates an actor without a client address.
    #[must_use]
    pub const fn new(id: i64, role: Role) -> Self {
        Self {
            id,
            role,
            client_address: None,
        }
    }

    /// Attaches the client address recorded in the audit trail.
    #[must_use]
    pub fn with_client_address(mut self, address: impl Into<String>) -> Self {
        self.client_address = Some(address.into());
        self
    }

    /// Fails with [`Error::Forbidden`] unless the actor holds the elevated role.
    pub fn require_elevated(&self, operation: &str) -> Result<()> {
        if self.role.is_elevated() {
            Ok(())
        } else {
            Err(Error::forbidden(format!(
                "only administrators may {operation}"
            )))
        }
    }
}

/// Services shared by the ledger engine and the withdrawal processor.
#[derive(Clone, Debug)]
pub struct LedgerContext {
    /// Database connection for all reads and writes
    pub database: DatabaseConnection,
    /// Source of the paid-off threshold
    pub target: TargetSetting,
    /// Audit trail writer
    pub audit: AuditLogger,
}

impl LedgerContext {
    /// Creates a context reading the stored target, falling back to [`DEFAULT_TARGET`].
    #[must_use]
    pub fn new(database: DatabaseConnection) -> Self {
        let audit = AuditLogger::new(database.clone());
        Self {
            database,
            target: TargetSetting::Stored {
                default: DEFAULT_TARGET,
            },
            audit,
        }
    }

    /// Replaces the threshold source.
    #[must_use]
    pub fn with_target(mut self, target: TargetSetting) -> Self {
        self.target = target;
        self
    }
}
