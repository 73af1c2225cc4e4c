//! Error types for the Correlatzia ledger.
//!
//! All errors use the `CZ_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Order errors
//! - 2xx: Balance errors
//! - 3xx: Asset transfer errors
//! - 6xx: Settlement errors
//! - 8xx: Invariant errors
//! - 9xx: General / internal errors
//!
//! Every error is fatal for the call that produced it and leaves the ledger
//! exactly as it was before the call.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::{AccountId, Amount, OrderIndex};

/// Failure reported by the asset-transfer collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferError {
    /// `from` has not authorized the spender for this much.
    #[error("allowance of {allowed} for {spender} below {needed}")]
    InsufficientAllowance {
        spender: AccountId,
        needed: Amount,
        allowed: Amount,
    },

    /// `from` does not hold enough of the asset.
    #[error("balance of {account} is {available}, need {needed}")]
    InsufficientFunds {
        account: AccountId,
        needed: Amount,
        available: Amount,
    },

    /// The collaborator refused the transfer for its own reasons.
    #[error("transfer rejected: {0}")]
    Rejected(String),
}

/// Central error enum for all ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    // =================================================================
    // Order Errors (1xx)
    // =================================================================
    /// No order exists at this index.
    #[error("CZ_ERR_100: Order not found: {0}")]
    OrderNotFound(OrderIndex),

    /// A purchase of zero was requested.
    #[error("CZ_ERR_101: Invalid amount")]
    InvalidAmount,

    /// The order's lock period has not elapsed.
    #[error("CZ_ERR_102: Maturity not reached yet: {index} matures at {maturity}, now {now}")]
    MaturityNotReached {
        index: OrderIndex,
        maturity: DateTime<Utc>,
        now: DateTime<Utc>,
    },

    /// The order was already settled.
    #[error("CZ_ERR_103: Order already redeemed: {0}")]
    OrderAlreadyRedeemed(OrderIndex),

    // =================================================================
    // Balance Errors (2xx)
    // =================================================================
    /// The seller's balance cannot cover the requested purchase.
    #[error("CZ_ERR_200: Invalid seller amount: requested {requested}, seller has {available}")]
    InvalidSellerAmount { requested: Amount, available: Amount },

    /// The caller's balance cannot cover the requested withdrawal.
    #[error("CZ_ERR_201: Insufficient balance: requested {requested}, have {available}")]
    InsufficientBalance { requested: Amount, available: Amount },

    /// A credit would exceed the representable amount.
    #[error("CZ_ERR_202: Balance overflow for {0}")]
    BalanceOverflow(AccountId),

    // =================================================================
    // Asset Transfer Errors (3xx)
    // =================================================================
    /// The asset collaborator refused a transfer.
    #[error("CZ_ERR_300: Asset transfer failed: {0}")]
    Transfer(#[from] TransferError),

    // =================================================================
    // Settlement Errors (6xx)
    // =================================================================
    /// Settlement could not be computed or executed.
    #[error("CZ_ERR_600: Settlement failed: {reason}")]
    SettlementFailed { reason: String },

    // =================================================================
    // Invariant Errors (8xx)
    // =================================================================
    /// Custody holdings no longer match ledger liabilities.
    #[error("CZ_ERR_801: Supply invariant violation: {reason}")]
    SupplyInvariantViolation { reason: String },

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Unrecoverable internal error.
    #[error("CZ_ERR_900: Internal error: {0}")]
    Internal(String),

    /// Serialization / deserialization error.
    #[error("CZ_ERR_901: Serialization error: {0}")]
    Serialization(String),

    /// Configuration error (invalid document, out-of-range values, etc.).
    #[error("CZ_ERR_902: Configuration error: {0}")]
    Configuration(String),

    /// A thread panicked while holding the shared ledger lock.
    #[error("CZ_ERR_903: Ledger lock poisoned")]
    LockPoisoned,
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, LedgerError>;

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
