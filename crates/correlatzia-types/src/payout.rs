//! Seller payout policy applied at settlement.
//!
//! When an order is redeemed, the buyer gets `amount` back and the seller
//! is paid out of the buyer's escrowed premium. How much of the premium
//! reaches the seller's wallet is a configured policy; whatever is not paid
//! out is credited back to the seller's ledger balance.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::{Amount, Strike};

/// How the seller's proceeds are derived from an order and its strike.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PayoutPolicy {
    /// The seller receives the buyer's entire premium.
    ///
    /// The strike plays no part in the payout under this policy; use
    /// [`PayoutPolicy::StrikeRate`] for strike-priced proceeds.
    #[default]
    FullPremium,
    /// The seller receives `floor(amount * strike * rate)`, capped at the premium.
    StrikeRate { rate: Decimal },
}

impl PayoutPolicy {
    /// Proceeds paid to the seller's wallet. Never exceeds `premium`.
    #[must_use]
    pub fn seller_proceeds(&self, amount: Amount, strike: Strike, premium: Amount) -> Amount {
        match self {
            Self::FullPremium => premium,
            Self::StrikeRate { rate } => {
                let gross = Decimal::from(amount)
                    .checked_mul(Decimal::from(strike))
                    .and_then(|v| v.checked_mul(*rate));
                match gross {
                    // Overflowing the decimal range is certainly above the cap.
                    None => premium,
                    Some(v) if v.is_sign_negative() => 0,
                    Some(v) => v.floor().to_u64().unwrap_or(Amount::MAX).min(premium),
                }
            }
        }
    }

    /// Reject rates that could never produce a sensible payout.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        match self {
            Self::FullPremium => true,
            Self::StrikeRate { rate } => !rate.is_sign_negative(),
        }
    }
}

impl std::fmt::Display for PayoutPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FullPremium => write!(f, "FULL_PREMIUM"),
            Self::StrikeRate { rate } => write!(f, "STRIKE_RATE({rate})"),
        }
    }
}
