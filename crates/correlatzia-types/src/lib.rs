//! # correlatzia-types
//!
//! Shared types, errors, and configuration for the **Correlatzia**
//! forward-settlement ledger.
//!
//! This crate is the leaf dependency of the workspace. It defines:
//!
//! - **Identifiers**: [`AccountId`], [`OrderIndex`]
//! - **Balance model**: [`BalanceRecord`], [`Amount`], [`Strike`]
//! - **Order model**: [`ForwardOrder`], [`OrderStatus`]
//! - **Notifications**: [`LedgerEvent`], [`SettlementReceipt`]
//! - **Payout policy**: [`PayoutPolicy`]
//! - **Configuration**: [`LedgerConfig`]
//! - **Errors**: [`LedgerError`] with `CZ_ERR_` prefix codes, [`TransferError`]
//! - **Constants**: system-wide defaults

pub mod balance;
pub mod config;
pub mod constants;
pub mod error;
pub mod event;
pub mod ids;
pub mod order;
pub mod payout;

// Re-export all primary types at crate root for ergonomic imports:
//   use correlatzia_types::{AccountId, ForwardOrder, LedgerError, ...};

pub use balance::*;
pub use config::*;
pub use error::*;
pub use event::*;
pub use ids::*;
pub use order::*;
pub use payout::*;

// Constants are accessed via `correlatzia_types::constants::FOO`
// (not re-exported to avoid name collisions).
