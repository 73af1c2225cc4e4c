//! Thread-safe handle over a ledger and its asset.
//!
//! Every operation runs under one lock that covers both the ledger and
//! the asset collaborator, so mutations are serialized and a caller never
//! observes a half-applied operation.

use std::sync::{Arc, Mutex, MutexGuard};

use correlatzia_types::{
    AccountId, Amount, BalanceRecord, ForwardOrder, LedgerError, OrderIndex, Result,
    SettlementReceipt, Strike,
};

use crate::asset::AssetTransfer;
use crate::clock::Clock;
use crate::ledger::ForwardLedger;

#[derive(Debug)]
struct Inner<A, C> {
    ledger: ForwardLedger<C>,
    asset: A,
}

/// Cloneable, `Send + Sync` ledger handle.
#[derive(Debug)]
pub struct SharedLedger<A, C> {
    inner: Arc<Mutex<Inner<A, C>>>,
}

impl<A, C> Clone for SharedLedger<A, C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A: AssetTransfer, C: Clock> SharedLedger<A, C> {
    #[must_use]
    pub fn new(ledger: ForwardLedger<C>, asset: A) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner { ledger, asset })),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner<A, C>>> {
        self.inner.lock().map_err(|_| LedgerError::LockPoisoned)
    }

    /// Run `f` with exclusive access to the ledger and asset.
    pub fn with<R>(&self, f: impl FnOnce(&mut ForwardLedger<C>, &mut A) -> R) -> Result<R> {
        let mut guard = self.lock()?;
        let Inner { ledger, asset } = &mut *guard;
        Ok(f(ledger, asset))
    }

    pub fn deposit(&self, caller: AccountId, strike: Strike) -> Result<Amount> {
        self.with(|ledger, asset| ledger.deposit(asset, caller, strike))?
    }

    pub fn withdraw_funds(&self, caller: AccountId, amount: Amount) -> Result<()> {
        self.with(|ledger, asset| ledger.withdraw_funds(asset, caller, amount))?
    }

    pub fn buy(&self, caller: AccountId, amount: Amount, seller: AccountId) -> Result<OrderIndex> {
        self.with(|ledger, asset| ledger.buy(asset, caller, amount, seller))?
    }

    pub fn withdraw_at_maturity(
        &self,
        caller: AccountId,
        index: OrderIndex,
    ) -> Result<SettlementReceipt> {
        self.with(|ledger, asset| ledger.withdraw_at_maturity(asset, caller, index))?
    }

    /// Copy of the order at `index`.
    pub fn get_order(&self, index: OrderIndex) -> Result<ForwardOrder> {
        self.with(|ledger, _| ledger.get_order(index).cloned())?
    }

    pub fn balance_of(&self, who: AccountId) -> Result<BalanceRecord> {
        self.with(|ledger, _| ledger.balance_of(who))
    }

    pub fn order_count(&self) -> Result<usize> {
        self.with(|ledger, _| ledger.order_count())
    }

    pub fn verify_conservation(&self) -> Result<()> {
        self.with(|ledger, asset| ledger.verify_conservation(&*asset))?
    }
}
