//! Notifications emitted by the ledger.
//!
//! Every successful mutating call appends exactly one [`LedgerEvent`] to the
//! ledger's journal. Failed calls emit nothing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AccountId, Amount, OrderIndex, Strike};

/// One notification per successful state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LedgerEvent {
    /// A seller moved funds into custody.
    Deposited {
        who: AccountId,
        amount: Amount,
        strike: Strike,
    },
    /// A seller took funds back out of their balance.
    Withdrawn { who: AccountId, amount: Amount },
    /// A buyer purchased against a seller's balance.
    OrderPlaced {
        index: OrderIndex,
        seller: AccountId,
        buyer: AccountId,
        amount: Amount,
    },
    /// A matured order was settled.
    OrderRedeemed(SettlementReceipt),
}

impl LedgerEvent {
    /// Short upper-case label, used in log fields.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Deposited { .. } => "DEPOSITED",
            Self::Withdrawn { .. } => "WITHDRAWN",
            Self::OrderPlaced { .. } => "ORDER_PLACED",
            Self::OrderRedeemed(_) => "ORDER_REDEEMED",
        }
    }
}

impl std::fmt::Display for LedgerEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Outcome of settling one order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementReceipt {
    pub index: OrderIndex,
    /// Whoever triggered settlement. Not necessarily the buyer.
    pub caller: AccountId,
    pub buyer: AccountId,
    pub seller: AccountId,
    /// Returned to the buyer's wallet.
    pub buyer_amount: Amount,
    /// Paid to the seller's wallet.
    pub seller_proceeds: Amount,
    /// Escrow remainder credited back to the seller's ledger balance.
    pub seller_credit: Amount,
    pub settled_at: DateTime<Utc>,
}
