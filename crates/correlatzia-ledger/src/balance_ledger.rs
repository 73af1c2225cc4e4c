//! Seller balances.
//!
//! Tracks each seller's lockable amount and strike. Every decrement is
//! checked before it is applied, so a failed call leaves the record as it
//! was. Records are never removed once created; a fully drained seller keeps
//! a zero record.

use std::collections::BTreeMap;

use correlatzia_types::{AccountId, Amount, BalanceRecord, LedgerError, Result, Strike};

/// Source of truth for seller balances.
///
/// Ordered by account so digests and snapshots are deterministic.
#[derive(Debug, Clone, Default)]
pub struct BalanceLedger {
    balances: BTreeMap<AccountId, BalanceRecord>,
}

impl BalanceLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `amount` to the account's balance, returning the new amount.
    ///
    /// # Errors
    /// Returns `BalanceOverflow` if the sum is not representable.
    pub fn credit(&mut self, who: AccountId, amount: Amount) -> Result<Amount> {
        let current = self.balance(who).amount;
        let updated = current
            .checked_add(amount)
            .ok_or(LedgerError::BalanceOverflow(who))?;
        self.balances.entry(who).or_default().amount = updated;
        Ok(updated)
    }

    /// Overwrite the account's strike.
    pub fn set_strike(&mut self, who: AccountId, strike: Strike) {
        self.balances.entry(who).or_default().strike = strike;
    }

    /// Take `amount` out of the account's own balance (withdrawal).
    ///
    /// # Errors
    /// Returns `InsufficientBalance` if the balance is smaller than `amount`.
    pub fn debit(&mut self, who: AccountId, amount: Amount) -> Result<Amount> {
        let available = self.balance(who).amount;
        if available < amount {
            return Err(LedgerError::InsufficientBalance {
                requested: amount,
                available,
            });
        }
        let entry = self.balances.entry(who).or_default();
        entry.amount = available - amount;
        Ok(entry.amount)
    }

    /// Lock `amount` of the seller's balance against a purchase.
    ///
    /// # Errors
    /// Returns `InvalidSellerAmount` if the seller cannot cover `amount`.
    pub fn lock_for_sale(&mut self, seller: AccountId, amount: Amount) -> Result<BalanceRecord> {
        let record = self.balance(seller);
        if !record.covers(amount) {
            return Err(LedgerError::InvalidSellerAmount {
                requested: amount,
                available: record.amount,
            });
        }
        let entry = self.balances.entry(seller).or_default();
        entry.amount = record.amount - amount;
        Ok(*entry)
    }

    /// Balance for an account; unknown accounts read as zero.
    #[must_use]
    pub fn balance(&self, who: AccountId) -> BalanceRecord {
        self.balances.get(&who).copied().unwrap_or_default()
    }

    /// The raw record, `None` if the account never had one.
    #[must_use]
    pub fn snapshot(&self, who: AccountId) -> Option<BalanceRecord> {
        self.balances.get(&who).copied()
    }

    /// Put an account back to a state captured by [`Self::snapshot`].
    pub(crate) fn restore(&mut self, who: AccountId, previous: Option<BalanceRecord>) {
        match previous {
            Some(record) => {
                self.balances.insert(who, record);
            }
            None => {
                self.balances.remove(&who);
            }
        }
    }

    /// Sum of every lockable amount.
    #[must_use]
    pub fn total_liabilities(&self) -> u128 {
        self.balances.values().map(|r| u128::from(r.amount)).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&AccountId, &BalanceRecord)> {
        self.balances.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.balances.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.balances.is_empty()
    }
}

impl FromIterator<(AccountId, BalanceRecord)> for BalanceLedger {
    fn from_iter<T: IntoIterator<Item = (AccountId, BalanceRecord)>>(iter: T) -> Self {
        Self {
            balances: iter.into_iter().collect(),
        }
    }
}
