//! Supply conservation invariant checker.
//!
//! The ledger's own accounting must satisfy, after every operation:
//! ```text
//! Σ inflows - Σ outflows == Σ balance.amount + Σ open (amount + premium)
//! ```
//! and the custody account at the asset collaborator must hold at least
//! that much. Custody may hold more (anyone can send the asset to it), but
//! never less.

use correlatzia_types::{Amount, LedgerError, Result};

/// Running totals of everything that entered and left custody.
#[derive(Debug, Clone, Default)]
pub struct SupplyConservation {
    /// Holdings the ledger started with (non-zero after a restore).
    opening: u128,
    /// Seller deposits.
    deposits: u128,
    /// Buyer payments collected by purchases.
    premiums: u128,
    /// Seller withdrawals.
    withdrawals: u128,
    /// Amounts paid out at settlement (buyer returns plus seller proceeds).
    payouts: u128,
}

impl SupplyConservation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from existing liabilities, as when restoring a snapshot.
    #[must_use]
    pub fn with_opening(opening: u128) -> Self {
        Self {
            opening,
            ..Self::default()
        }
    }

    pub fn record_deposit(&mut self, amount: Amount) {
        self.deposits += u128::from(amount);
    }

    pub fn record_premium(&mut self, amount: Amount) {
        self.premiums += u128::from(amount);
    }

    pub fn record_withdrawal(&mut self, amount: Amount) {
        self.withdrawals += u128::from(amount);
    }

    pub fn record_payout(&mut self, amount: u128) {
        self.payouts += amount;
    }

    /// What custody should hold according to recorded flows.
    ///
    /// # Errors
    /// Returns `SupplyInvariantViolation` if more left than ever entered.
    pub fn expected_holdings(&self) -> Result<u128> {
        let inflow = self.opening + self.deposits + self.premiums;
        let outflow = self.withdrawals + self.payouts;
        inflow
            .checked_sub(outflow)
            .ok_or_else(|| LedgerError::SupplyInvariantViolation {
                reason: format!("outflow {outflow} exceeds inflow {inflow}"),
            })
    }

    /// Check recorded flows against current liabilities and custody holdings.
    ///
    /// # Errors
    /// Returns `SupplyInvariantViolation` if flows disagree with liabilities
    /// or custody holds less than is owed.
    pub fn verify(&self, liabilities: u128, custody_holdings: Amount) -> Result<()> {
        let expected = self.expected_holdings()?;
        if expected != liabilities {
            return Err(LedgerError::SupplyInvariantViolation {
                reason: format!(
                    "liabilities {liabilities} != recorded flows {expected} \
                     (deposits={}, premiums={}, withdrawals={}, payouts={})",
                    self.deposits, self.premiums, self.withdrawals, self.payouts
                ),
            });
        }
        if u128::from(custody_holdings) < liabilities {
            return Err(LedgerError::SupplyInvariantViolation {
                reason: format!(
                    "custody holds {custody_holdings}, ledger owes {liabilities}"
                ),
            });
        }
        Ok(())
    }
}
