//! `shopledger-core`: shared building blocks for the shop ledger.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, money, the domain error model and typed store settings.

pub mod entity;
pub mod error;
pub mod id;
pub mod money;
pub mod settings;
pub mod value_object;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{AttendanceId, CustomerId, EmployeeId, LotId, ProductId, SaleId, SaleItemId, TransactionId, UserId};
pub use money::Money;
pub use settings::{Settings, SettingsMap};
pub use value_object::ValueObject;
