//! Balance tracking types for the escrow model.
//!
//! Every seller has a lockable `amount` (what buyers can purchase against
//! and what the seller can withdraw) and the `strike` set by their most
//! recent deposit.

use serde::{Deserialize, Serialize};

/// Quantity of the ledger's single fungible asset.
pub type Amount = u64;

/// Price parameter attached to a seller's deposit.
pub type Strike = u64;

/// A seller's balance record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct BalanceRecord {
    /// Lockable / withdrawable deposit.
    pub amount: Amount,
    /// Strike set (or overwritten) by the last deposit.
    pub strike: Strike,
}

impl BalanceRecord {
    /// Whether the record holds no lockable funds.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.amount == 0
    }

    /// Whether `requested` can be taken from this balance.
    #[must_use]
    pub fn covers(&self, requested: Amount) -> bool {
        self.amount >= requested
    }
}
