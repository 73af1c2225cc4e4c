//! Order types for the forward-settlement book.
//!
//! An order links a buyer to the seller whose balance it consumed. It is
//! immutable once placed except for the `redeemed` flag.
//!
//! ## State Machine
//!
//! ```text
//!   ┌─────────┐  now >= maturity  ┌─────────┐  withdraw_at_maturity  ┌──────────┐
//!   │ PENDING ├──────────────────▶│ MATURED ├───────────────────────▶│ REDEEMED │
//!   └─────────┘                   └─────────┘                        └──────────┘
//! ```
//!
//! `Redeemed` is terminal. There is no cancellation and no expiry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AccountId, Amount, OrderIndex, Strike};

/// Lifecycle status of an order, evaluated at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    /// Placed, lock period still running.
    Pending,
    /// Lock period elapsed, not yet redeemed.
    Matured,
    /// Settled. **Irreversible.**
    Redeemed,
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Matured => write!(f, "MATURED"),
            Self::Redeemed => write!(f, "REDEEMED"),
        }
    }
}

/// A recorded match between a buyer and a seller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwardOrder {
    /// Position in the order book.
    pub index: OrderIndex,
    /// Quantity purchased (and locked from the seller's balance).
    pub amount: Amount,
    /// Quantity the buyer paid into escrow.
    pub premium: Amount,
    pub buyer: AccountId,
    pub seller: AccountId,
    /// Seller's strike when the order was placed.
    pub strike: Strike,
    pub created_at: DateTime<Utc>,
    /// Earliest instant at which the order can be redeemed.
    pub maturity: DateTime<Utc>,
    pub redeemed: bool,
}

impl ForwardOrder {
    /// Whether the lock period has elapsed at `now`.
    #[must_use]
    pub fn is_mature_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.maturity
    }

    #[must_use]
    pub fn status_at(&self, now: DateTime<Utc>) -> OrderStatus {
        if self.redeemed {
            OrderStatus::Redeemed
        } else if self.is_mature_at(now) {
            OrderStatus::Matured
        } else {
            OrderStatus::Pending
        }
    }

    /// Total held in custody for this order while it is open:
    /// the seller's locked collateral plus the buyer's payment.
    #[must_use]
    pub fn escrowed(&self) -> u128 {
        u128::from(self.amount) + u128::from(self.premium)
    }

    /// The `(amount, seller)` pair exposed by the order accessor.
    #[must_use]
    pub fn summary(&self) -> (Amount, AccountId) {
        (self.amount, self.seller)
    }
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl ForwardOrder {
    pub fn dummy(index: u64, amount: Amount, maturity: DateTime<Utc>) -> Self {
        Self {
            index: OrderIndex(index),
            amount,
            premium: amount,
            buyer: AccountId::new(),
            seller: AccountId::new(),
            strike: 10,
            created_at: maturity - chrono::Duration::days(30),
            maturity,
            redeemed: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_follows_clock_and_flag() {
        let maturity = Utc::now();
        let mut order = ForwardOrder::dummy(0, 100, maturity);

        let before = maturity - chrono::Duration::seconds(1);
        assert_eq!(order.status_at(before), OrderStatus::Pending);
        assert_eq!(order.status_at(maturity), OrderStatus::Matured);

        order.redeemed = true;
        assert_eq!(order.status_at(before), OrderStatus::Redeemed);
        assert_eq!(order.status_at(maturity), OrderStatus::Redeemed);
    }

    #[test]
    fn escrowed_includes_premium() {
        let order = ForwardOrder::dummy(0, u64::MAX, Utc::now());
        assert_eq!(order.escrowed(), u128::from(u64::MAX) * 2);
    }

    #[test]
    fn order_status_display() {
        assert_eq!(format!("{}", OrderStatus::Pending), "PENDING");
        assert_eq!(format!("{}", OrderStatus::Matured), "MATURED");
        assert_eq!(format!("{}", OrderStatus::Redeemed), "REDEEMED");
    }
}
