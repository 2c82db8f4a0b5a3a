//! Core business logic - framework-agnostic ledger, withdrawal, saver and audit operations.
//!
//! Every mutating operation takes a [`LedgerContext`] and the [`Actor`] performing it,
//! writes its rows inside one database transaction, and appends an audit record after
//! the commit.

/// Best-effort audit trail
pub mod audit;
/// Optimistic balance writes shared by the ledger and withdrawal paths
pub(crate) mod balance;
/// Fixed UTC+7 business calendar
pub mod calendar;
/// Shared services and actor identity
pub mod context;
/// Deposit recording, correction and removal
pub mod ledger;
/// Saver registration and lifecycle
pub mod saver;
/// Paid-off derivation and the target threshold setting
pub mod status;
/// Qurban withdrawal processing
pub mod withdrawal;

pub use context::{Actor, LedgerContext};
