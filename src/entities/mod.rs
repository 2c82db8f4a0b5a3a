//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod audit_record;
pub mod deposit;
pub mod saver;
pub mod setting;
pub mod withdrawal;

// Re-export specific types to avoid conflicts
pub use audit_record::{
    AuditAction, Column as AuditRecordColumn, Entity as AuditRecord, Model as AuditRecordModel,
    Role,
};
pub use deposit::{Column as DepositColumn, DepositMethod, Entity as Deposit, Model as DepositModel};
pub use saver::{Column as SaverColumn, Entity as Saver, Model as SaverModel};
pub use setting::{Column as SettingColumn, Entity as Setting, Model as SettingModel};
pub use withdrawal::{
    Column as WithdrawalColumn, Entity as Withdrawal, Model as WithdrawalModel,
};
