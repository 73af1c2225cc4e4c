//! The asset-transfer boundary.
//!
//! The ledger never holds assets itself: it keeps accounts of who is owed
//! what, and moves the actual asset through an [`AssetTransfer`]
//! implementation (a token contract, a custody API, ...). The collaborator
//! is untrusted, so the ledger always finishes its own bookkeeping before
//! calling into it and undoes that bookkeeping if the call fails.
//!
//! [`InMemoryAsset`] is a complete reference implementation used by tests
//! and by embedders that keep the asset in-process.

use std::collections::{HashMap, HashSet};

use correlatzia_types::{AccountId, Amount, TransferError};
use serde::{Deserialize, Serialize};

/// One outbound payment of a multi-leg transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferLeg {
    pub to: AccountId,
    pub amount: Amount,
}

impl TransferLeg {
    #[must_use]
    pub fn new(to: AccountId, amount: Amount) -> Self {
        Self { to, amount }
    }
}

/// Fungible-asset operations the ledger consumes.
///
/// Amounts recorded by the ledger equal amounts nominally moved; fee-on-transfer
/// or rebasing behavior is not accounted for.
pub trait AssetTransfer {
    /// Current holdings of `account`.
    fn balance_of(&self, account: AccountId) -> Amount;

    /// How much `spender` may still pull from `owner`.
    fn allowance(&self, owner: AccountId, spender: AccountId) -> Amount;

    /// Move `amount` from `from` to `to` on the authority of `spender`,
    /// consuming `from`'s allowance for `spender`.
    fn transfer_from(
        &mut self,
        spender: AccountId,
        from: AccountId,
        to: AccountId,
        amount: Amount,
    ) -> Result<(), TransferError>;

    /// Move `amount` out of `from`'s own holdings.
    fn transfer(&mut self, from: AccountId, to: AccountId, amount: Amount)
    -> Result<(), TransferError>;

    /// Pay every leg out of `from`. All-or-nothing: if any leg fails, no
    /// leg takes effect.
    fn transfer_many(&mut self, from: AccountId, legs: &[TransferLeg])
    -> Result<(), TransferError>;
}

/// In-process fungible asset with allowances and failure injection.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAsset {
    balances: HashMap<AccountId, Amount>,
    /// `(owner, spender) -> remaining allowance`.
    allowances: HashMap<(AccountId, AccountId), Amount>,
    /// Accounts whose transfers (in either direction) are refused.
    blocked: HashSet<AccountId>,
    /// Reason for refusing the next mutating call, if armed.
    fail_next: Option<String>,
    total_supply: u128,
    transfers: u64,
}

impl InMemoryAsset {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create `amount` out of thin air for `account`.
    ///
    /// # Errors
    /// Returns `Rejected` if the account's holdings would overflow.
    pub fn mint(&mut self, account: AccountId, amount: Amount) -> Result<(), TransferError> {
        let current = self.balance_of(account);
        let updated = current
            .checked_add(amount)
            .ok_or_else(|| TransferError::Rejected(format!("mint overflows {account}")))?;
        self.balances.insert(account, updated);
        self.total_supply += u128::from(amount);
        Ok(())
    }

    /// Set (not add to) the allowance `owner` grants `spender`.
    pub fn approve(&mut self, owner: AccountId, spender: AccountId, amount: Amount) {
        self.allowances.insert((owner, spender), amount);
    }

    /// Refuse every transfer touching `account` until unblocked.
    pub fn block(&mut self, account: AccountId) {
        self.blocked.insert(account);
    }

    pub fn unblock(&mut self, account: AccountId) {
        self.blocked.remove(&account);
    }

    /// Refuse the next `transfer_from`, `transfer` or `transfer_many` call.
    pub fn fail_next_transfer(&mut self, reason: impl Into<String>) {
        self.fail_next = Some(reason.into());
    }

    /// Sum of everything ever minted.
    #[must_use]
    pub fn total_supply(&self) -> u128 {
        self.total_supply
    }

    /// Number of successful transfer calls (a multi-leg call counts once).
    #[must_use]
    pub fn transfer_count(&self) -> u64 {
        self.transfers
    }

    fn preflight(&mut self, accounts: &[AccountId]) -> Result<(), TransferError> {
        if let Some(reason) = self.fail_next.take() {
            return Err(TransferError::Rejected(reason));
        }
        if let Some(blocked) = accounts.iter().find(|a| self.blocked.contains(a)) {
            return Err(TransferError::Rejected(format!("account {blocked} is blocked")));
        }
        Ok(())
    }

    fn move_funds(
        &mut self,
        from: AccountId,
        to: AccountId,
        amount: Amount,
    ) -> Result<(), TransferError> {
        let available = self.balance_of(from);
        if available < amount {
            return Err(TransferError::InsufficientFunds {
                account: from,
                needed: amount,
                available,
            });
        }
        if from == to {
            return Ok(());
        }
        let credited = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or_else(|| TransferError::Rejected(format!("balance of {to} would overflow")))?;
        self.balances.insert(from, available - amount);
        self.balances.insert(to, credited);
        Ok(())
    }
}

impl AssetTransfer for InMemoryAsset {
    fn balance_of(&self, account: AccountId) -> Amount {
        self.balances.get(&account).copied().unwrap_or(0)
    }

    fn allowance(&self, owner: AccountId, spender: AccountId) -> Amount {
        self.allowances.get(&(owner, spender)).copied().unwrap_or(0)
    }

    fn transfer_from(
        &mut self,
        spender: AccountId,
        from: AccountId,
        to: AccountId,
        amount: Amount,
    ) -> Result<(), TransferError> {
        self.preflight(&[from, to])?;

        let allowed = self.allowance(from, spender);
        if allowed < amount {
            return Err(TransferError::InsufficientAllowance {
                spender,
                needed: amount,
                allowed,
            });
        }

        self.move_funds(from, to, amount)?;
        self.allowances.insert((from, spender), allowed - amount);
        self.transfers += 1;
        Ok(())
    }

    fn transfer(
        &mut self,
        from: AccountId,
        to: AccountId,
        amount: Amount,
    ) -> Result<(), TransferError> {
        self.preflight(&[from, to])?;
        self.move_funds(from, to, amount)?;
        self.transfers += 1;
        Ok(())
    }

    fn transfer_many(
        &mut self,
        from: AccountId,
        legs: &[TransferLeg],
    ) -> Result<(), TransferError> {
        let mut touched = Vec::with_capacity(legs.len() + 1);
        touched.push(from);
        touched.extend(legs.iter().map(|leg| leg.to));
        self.preflight(&touched)?;

        let checkpoint = self.balances.clone();
        for leg in legs {
            if let Err(err) = self.move_funds(from, leg.to, leg.amount) {
                self.balances = checkpoint;
                return Err(err);
            }
        }
        self.transfers += 1;
        Ok(())
    }
}
