//! The forward-settlement ledger.
//!
//! [`ForwardLedger`] owns the balance ledger and the order book and is the
//! only way to mutate either. Each operation follows the same shape:
//!
//! 1. Refuse if custody already holds less than the ledger owes
//! 2. Validate (no state touched on failure)
//! 3. Apply internal bookkeeping
//! 4. Call the asset collaborator
//! 5. If the collaborator refuses, undo step 3 and return its error
//! 6. Record flows, log, emit exactly one [`LedgerEvent`]
//! 7. Audit conservation; a breach is logged, never returned
//!
//! Step 3 always precedes step 4, so an order is already marked redeemed
//! by the time any payout leaves custody. Once step 4 succeeds the call
//! has committed and returns `Ok`. A breach found in step 7 (for example
//! a collaborator that skims transfers) is caught by step 1 of the next
//! mutating call, so the ledger stops accepting mutations until custody
//! is topped up.

use chrono::{DateTime, Utc};
use correlatzia_types::{
    AccountId, Amount, BalanceRecord, ForwardOrder, LedgerConfig, LedgerError, LedgerEvent,
    OrderIndex, OrderStatus, Result, SettlementReceipt, Strike, constants,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, error, info, warn};

use crate::asset::{AssetTransfer, TransferLeg};
use crate::balance_ledger::BalanceLedger;
use crate::clock::{Clock, SystemClock};
use crate::order_book::{NewOrder, OrderBook};
use crate::supply_conservation::SupplyConservation;

/// Persistable ledger state: the balance map and the order sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub custody: AccountId,
    pub config: LedgerConfig,
    pub balances: Vec<(AccountId, BalanceRecord)>,
    pub orders: Vec<ForwardOrder>,
}

impl LedgerSnapshot {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Time-locked escrow ledger for a single fungible asset.
#[derive(Debug)]
pub struct ForwardLedger<C = SystemClock> {
    config: LedgerConfig,
    /// Account holding the ledger's assets at the collaborator.
    custody: AccountId,
    clock: C,
    balances: BalanceLedger,
    orders: OrderBook,
    supply: SupplyConservation,
    events: Vec<LedgerEvent>,
}

impl ForwardLedger<SystemClock> {
    /// Ledger driven by wall-clock time.
    pub fn with_system_clock(config: LedgerConfig, custody: AccountId) -> Result<Self> {
        Self::new(config, custody, SystemClock)
    }
}

impl<C: Clock> ForwardLedger<C> {
    /// Create an empty ledger.
    ///
    /// # Errors
    /// Returns `Configuration` if `config` does not validate.
    pub fn new(config: LedgerConfig, custody: AccountId, clock: C) -> Result<Self> {
        config.validate()?;
        info!(
            engine = constants::ENGINE_NAME,
            version = constants::VERSION,
            custody = %custody,
            lock_period_secs = config.lock_period_secs,
            payout = %config.payout,
            "Ledger created"
        );
        Ok(Self {
            config,
            custody,
            clock,
            balances: BalanceLedger::new(),
            orders: OrderBook::new(),
            supply: SupplyConservation::new(),
            events: Vec::new(),
        })
    }

    /// Rebuild a ledger from persisted state. Current liabilities become the
    /// opening balance of the conservation tracker.
    pub fn from_snapshot(snapshot: LedgerSnapshot, clock: C) -> Result<Self> {
        snapshot.config.validate()?;
        let balances: BalanceLedger = snapshot.balances.into_iter().collect();
        let orders = OrderBook::from_orders(snapshot.orders)?;
        let opening = balances.total_liabilities() + orders.open_escrow();
        info!(
            custody = %snapshot.custody,
            accounts = balances.len(),
            orders = orders.len(),
            opening = %opening,
            "Ledger restored from snapshot"
        );
        Ok(Self {
            config: snapshot.config,
            custody: snapshot.custody,
            clock,
            balances,
            orders,
            supply: SupplyConservation::with_opening(opening),
            events: Vec::new(),
        })
    }

    // =================================================================
    // Balance ledger
    // =================================================================

    /// Pull the caller's entire asset holdings into custody and credit them
    /// to the caller's balance, setting the caller's strike.
    ///
    /// The quantity is whatever the caller holds at the collaborator, never
    /// a caller-supplied number, so the recorded balance always matches what
    /// moved. The caller must have authorized the custody account to pull at
    /// least that much. Holding nothing makes this a no-op deposit that
    /// still updates the strike.
    ///
    /// # Errors
    /// - `SupplyInvariantViolation` if custody already holds less than the
    ///   ledger owes (nothing is attempted)
    /// - `Transfer` if the collaborator refuses the pull
    /// - `BalanceOverflow` if the credit is not representable
    pub fn deposit<A: AssetTransfer + ?Sized>(
        &mut self,
        asset: &mut A,
        caller: AccountId,
        strike: Strike,
    ) -> Result<Amount> {
        self.ensure_solvent(&*asset, "deposit")?;

        let amount = asset.balance_of(caller);
        let previous = self.balances.snapshot(caller);

        self.balances.credit(caller, amount)?;
        self.balances.set_strike(caller, strike);

        if let Err(err) = asset.transfer_from(self.custody, caller, self.custody, amount) {
            self.balances.restore(caller, previous);
            warn!(who = %caller, amount, error = %err, "Deposit transfer rejected");
            return Err(err.into());
        }

        self.supply.record_deposit(amount);
        info!(who = %caller, amount, strike, "Deposit recorded");
        self.emit(LedgerEvent::Deposited {
            who: caller,
            amount,
            strike,
        });
        self.audit_conservation(&*asset, "deposit");
        Ok(amount)
    }

    /// Withdraw `amount` from the caller's own balance to their wallet.
    ///
    /// # Errors
    /// - `SupplyInvariantViolation` if custody already holds less than the
    ///   ledger owes (nothing is attempted)
    /// - `InsufficientBalance` if `amount` exceeds the caller's balance
    /// - `Transfer` if the collaborator refuses the payout
    pub fn withdraw_funds<A: AssetTransfer + ?Sized>(
        &mut self,
        asset: &mut A,
        caller: AccountId,
        amount: Amount,
    ) -> Result<()> {
        self.ensure_solvent(&*asset, "withdraw_funds")?;

        let previous = self.balances.snapshot(caller);

        if let Err(err) = self.balances.debit(caller, amount) {
            debug!(who = %caller, amount, error = %err, "Withdrawal rejected");
            return Err(err);
        }

        if let Err(err) = asset.transfer(self.custody, caller, amount) {
            self.balances.restore(caller, previous);
            warn!(who = %caller, amount, error = %err, "Withdrawal transfer rejected");
            return Err(err.into());
        }

        self.supply.record_withdrawal(amount);
        info!(who = %caller, amount, "Withdrawal paid");
        self.emit(LedgerEvent::Withdrawn {
            who: caller,
            amount,
        });
        self.audit_conservation(&*asset, "withdraw_funds");
        Ok(())
    }

    // =================================================================
    // Order book
    // =================================================================

    /// Purchase `amount` against `seller`'s balance, paying `amount` into
    /// custody. Returns the new order's index.
    ///
    /// # Errors
    /// - `SupplyInvariantViolation` if custody already holds less than the
    ///   ledger owes (nothing is attempted)
    /// - `InvalidAmount` if `amount` is zero
    /// - `InvalidSellerAmount` if the seller's balance is below `amount`
    /// - `Transfer` if the buyer's payment cannot be pulled
    pub fn buy<A: AssetTransfer + ?Sized>(
        &mut self,
        asset: &mut A,
        caller: AccountId,
        amount: Amount,
        seller: AccountId,
    ) -> Result<OrderIndex> {
        self.ensure_solvent(&*asset, "buy")?;

        if amount == 0 {
            debug!(buyer = %caller, seller = %seller, "Purchase rejected: zero amount");
            return Err(LedgerError::InvalidAmount);
        }

        let previous = self.balances.snapshot(seller);
        let locked = match self.balances.lock_for_sale(seller, amount) {
            Ok(record) => record,
            Err(err) => {
                debug!(buyer = %caller, seller = %seller, amount, error = %err, "Purchase rejected");
                return Err(err);
            }
        };

        let now = self.clock.now();
        let Some(maturity) = now.checked_add_signed(self.config.lock_period()) else {
            self.balances.restore(seller, previous);
            return Err(LedgerError::Internal(format!(
                "maturity out of range for order placed at {now}"
            )));
        };

        let placed = self.orders.append(NewOrder {
            amount,
            premium: amount,
            buyer: caller,
            seller,
            strike: locked.strike,
            created_at: now,
            maturity,
        });
        let index = match placed {
            Ok(index) => index,
            Err(err) => {
                self.balances.restore(seller, previous);
                return Err(err);
            }
        };

        if let Err(err) = asset.transfer_from(self.custody, caller, self.custody, amount) {
            self.orders.discard(index);
            self.balances.restore(seller, previous);
            warn!(buyer = %caller, seller = %seller, amount, error = %err, "Purchase payment rejected");
            return Err(err.into());
        }

        self.supply.record_premium(amount);
        info!(
            order = %index,
            buyer = %caller,
            seller = %seller,
            amount,
            maturity = %maturity,
            "Order placed"
        );
        self.emit(LedgerEvent::OrderPlaced {
            index,
            seller,
            buyer: caller,
            amount,
        });
        self.audit_conservation(&*asset, "buy");
        Ok(index)
    }

    // =================================================================
    // Settlement
    // =================================================================

    /// Settle a matured order: return `amount` to the buyer and pay the
    /// seller's proceeds, in one all-or-nothing transfer out of custody.
    ///
    /// Anyone may trigger settlement; funds always go to the buyer and
    /// seller recorded on the order. Proceeds come from the configured
    /// payout policy; any part of the premium not paid out is credited to
    /// the seller's balance.
    ///
    /// # Errors
    /// - `SupplyInvariantViolation` if custody already holds less than the
    ///   ledger owes (nothing is attempted)
    /// - `OrderNotFound` if `index` is out of range
    /// - `MaturityNotReached` if the lock period has not elapsed
    /// - `OrderAlreadyRedeemed` on any second attempt
    /// - `Transfer` if the payout is refused (the order stays redeemable)
    pub fn withdraw_at_maturity<A: AssetTransfer + ?Sized>(
        &mut self,
        asset: &mut A,
        caller: AccountId,
        index: OrderIndex,
    ) -> Result<SettlementReceipt> {
        self.ensure_solvent(&*asset, "withdraw_at_maturity")?;

        let now = self.clock.now();
        let order = self.orders.get(index)?;

        if !order.is_mature_at(now) {
            debug!(order = %index, caller = %caller, maturity = %order.maturity, "Settlement rejected: not mature");
            return Err(LedgerError::MaturityNotReached {
                index,
                maturity: order.maturity,
                now,
            });
        }
        if order.redeemed {
            debug!(order = %index, caller = %caller, "Settlement rejected: already redeemed");
            return Err(LedgerError::OrderAlreadyRedeemed(index));
        }

        let (buyer, seller, amount) = (order.buyer, order.seller, order.amount);
        let proceeds = self
            .config
            .payout
            .seller_proceeds(order.amount, order.strike, order.premium);
        let credit = order
            .premium
            .checked_sub(proceeds)
            .ok_or_else(|| LedgerError::SettlementFailed {
                reason: format!("proceeds {proceeds} exceed premium {}", order.premium),
            })?;

        // Flag before any funds move.
        self.orders.mark_redeemed(index)?;

        let previous = self.balances.snapshot(seller);
        if let Err(err) = self.balances.credit(seller, credit) {
            self.orders.unmark_redeemed(index);
            return Err(err);
        }

        let legs = [
            TransferLeg::new(buyer, amount),
            TransferLeg::new(seller, proceeds),
        ];
        if let Err(err) = asset.transfer_many(self.custody, &legs) {
            self.balances.restore(seller, previous);
            self.orders.unmark_redeemed(index);
            warn!(order = %index, buyer = %buyer, seller = %seller, error = %err, "Settlement transfer rejected");
            return Err(err.into());
        }

        self.supply
            .record_payout(u128::from(amount) + u128::from(proceeds));

        let receipt = SettlementReceipt {
            index,
            caller,
            buyer,
            seller,
            buyer_amount: amount,
            seller_proceeds: proceeds,
            seller_credit: credit,
            settled_at: now,
        };
        info!(
            order = %index,
            caller = %caller,
            buyer = %buyer,
            seller = %seller,
            buyer_amount = amount,
            seller_proceeds = proceeds,
            seller_credit = credit,
            "Order redeemed"
        );
        self.emit(LedgerEvent::OrderRedeemed(receipt.clone()));
        self.audit_conservation(&*asset, "withdraw_at_maturity");
        Ok(receipt)
    }

    // =================================================================
    // Read surface
    // =================================================================

    /// Balance and strike for an account; unknown accounts read as zero.
    #[must_use]
    pub fn balance_of(&self, who: AccountId) -> BalanceRecord {
        self.balances.balance(who)
    }

    /// # Errors
    /// Returns `OrderNotFound` if `index` is out of range.
    pub fn get_order(&self, index: OrderIndex) -> Result<&ForwardOrder> {
        self.orders.get(index)
    }

    /// The `(amount, seller)` pair of an order.
    pub fn order_summary(&self, index: OrderIndex) -> Result<(Amount, AccountId)> {
        self.orders.get(index).map(ForwardOrder::summary)
    }

    /// Status of an order at the ledger's current time.
    pub fn order_status(&self, index: OrderIndex) -> Result<OrderStatus> {
        let now = self.clock.now();
        self.orders.get(index).map(|o| o.status_at(now))
    }

    #[must_use]
    pub fn order_count(&self) -> usize {
        self.orders.len()
    }

    pub fn orders_for_buyer(&self, buyer: AccountId) -> impl Iterator<Item = &ForwardOrder> {
        self.orders.for_buyer(buyer)
    }

    pub fn orders_for_seller(&self, seller: AccountId) -> impl Iterator<Item = &ForwardOrder> {
        self.orders.for_seller(seller)
    }

    /// Notifications emitted so far, oldest first.
    #[must_use]
    pub fn events(&self) -> &[LedgerEvent] {
        &self.events
    }

    /// Take the emitted notifications, leaving the journal empty.
    pub fn drain_events(&mut self) -> Vec<LedgerEvent> {
        std::mem::take(&mut self.events)
    }

    #[must_use]
    pub fn custody(&self) -> AccountId {
        self.custody
    }

    #[must_use]
    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    #[must_use]
    pub fn clock(&self) -> &C {
        &self.clock
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Everything custody owes: seller balances plus open order escrow.
    #[must_use]
    pub fn liabilities(&self) -> u128 {
        self.balances.total_liabilities() + self.orders.open_escrow()
    }

    // =================================================================
    // Invariants & persistence
    // =================================================================

    /// Check recorded flows, liabilities and custody holdings agree.
    ///
    /// # Errors
    /// Returns `SupplyInvariantViolation` on any disagreement.
    pub fn verify_conservation<A: AssetTransfer + ?Sized>(&self, asset: &A) -> Result<()> {
        let result = self
            .supply
            .verify(self.liabilities(), asset.balance_of(self.custody));
        if let Err(err) = &result {
            error!(custody = %self.custody, error = %err, "Supply conservation violated");
        }
        result
    }

    /// Deterministic hash over balances and orders.
    ///
    /// Two ledgers that processed the same operations at the same instants
    /// have the same digest. The event journal is not included.
    #[must_use]
    pub fn state_digest(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(constants::STATE_DIGEST_DOMAIN);
        hasher.update(self.custody.as_bytes());

        hasher.update((self.balances.len() as u64).to_le_bytes());
        for (account, record) in self.balances.iter() {
            hasher.update(account.as_bytes());
            hasher.update(record.amount.to_le_bytes());
            hasher.update(record.strike.to_le_bytes());
        }

        hasher.update((self.orders.len() as u64).to_le_bytes());
        for order in self.orders.iter() {
            hasher.update(order.index.0.to_le_bytes());
            hasher.update(order.amount.to_le_bytes());
            hasher.update(order.premium.to_le_bytes());
            hasher.update(order.buyer.as_bytes());
            hasher.update(order.seller.as_bytes());
            hasher.update(order.strike.to_le_bytes());
            hasher.update(order.created_at.timestamp_millis().to_le_bytes());
            hasher.update(order.maturity.timestamp_millis().to_le_bytes());
            hasher.update([u8::from(order.redeemed)]);
        }

        hasher.finalize().into()
    }

    #[must_use]
    pub fn state_digest_hex(&self) -> String {
        hex::encode(self.state_digest())
    }

    /// Capture the persistable state.
    #[must_use]
    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            custody: self.custody,
            config: self.config.clone(),
            balances: self.balances.iter().map(|(a, r)| (*a, *r)).collect(),
            orders: self.orders.as_slice().to_vec(),
        }
    }

    fn emit(&mut self, event: LedgerEvent) {
        self.events.push(event);
    }

    /// Refuse a mutation while custody cannot cover what the ledger owes.
    fn ensure_solvent<A: AssetTransfer + ?Sized>(
        &self,
        asset: &A,
        operation: &'static str,
    ) -> Result<()> {
        if !self.config.verify_conservation {
            return Ok(());
        }
        self.supply
            .verify(self.liabilities(), asset.balance_of(self.custody))
            .inspect_err(|err| {
                warn!(operation, custody = %self.custody, error = %err, "Mutation refused: custody short");
            })
    }

    /// Post-commit check. The call already succeeded, so a breach is only
    /// logged; the next mutating call will refuse to run.
    fn audit_conservation<A: AssetTransfer + ?Sized>(&self, asset: &A, operation: &'static str) {
        if self.config.verify_conservation && self.verify_conservation(asset).is_err() {
            error!(operation, custody = %self.custody, "Committed operation left custody short; halting mutations");
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use correlatzia_types::{PayoutPolicy, TransferError};
    use rust_decimal::Decimal;

    use super::*;
    use crate::asset::InMemoryAsset;
    use crate::clock::ManualClock;

    struct Fixture {
        ledger: ForwardLedger<ManualClock>,
        asset: InMemoryAsset,
        clock: ManualClock,
    }

    fn setup_with(config: LedgerConfig) -> Fixture {
        let clock = ManualClock::new(DateTime::from_timestamp(1_700_000_000, 0).unwrap());
        let ledger = ForwardLedger::new(config, AccountId::new(), clock.clone()).unwrap();
        Fixture {
            ledger,
            asset: InMemoryAsset::new(),
            clock,
        }
    }

    fn setup() -> Fixture {
        setup_with(LedgerConfig::default())
    }

    impl Fixture {
        fn fund(&mut self, who: AccountId, amount: Amount) {
            self.asset.mint(who, amount).unwrap();
            self.asset.approve(who, self.ledger.custody(), amount);
        }

        fn seller_with(&mut self, amount: Amount, strike: Strike) -> AccountId {
            let seller = AccountId::new();
            self.fund(seller, amount);
            self.ledger.deposit(&mut self.asset, seller, strike).unwrap();
            seller
        }
    }

    #[test]
    fn deposit_pulls_wallet_and_sets_strike() {
        let mut f = setup();
        let seller = AccountId::new();
        f.fund(seller, 100);

        let moved = f.ledger.deposit(&mut f.asset, seller, 10).unwrap();
        assert_eq!(moved, 100);
        assert_eq!(
            f.ledger.balance_of(seller),
            BalanceRecord {
                amount: 100,
                strike: 10
            }
        );
        assert_eq!(f.asset.balance_of(f.ledger.custody()), 100);
        assert_eq!(f.asset.balance_of(seller), 0);
        assert_eq!(
            f.ledger.events(),
            &[LedgerEvent::Deposited {
                who: seller,
                amount: 100,
                strike: 10
            }]
        );
    }

    #[test]
    fn deposit_without_approval_changes_nothing() {
        let mut f = setup();
        let seller = AccountId::new();
        f.asset.mint(seller, 100).unwrap();

        let err = f.ledger.deposit(&mut f.asset, seller, 10).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Transfer(TransferError::InsufficientAllowance { .. })
        ));
        assert_eq!(f.asset.balance_of(seller), 100);
        assert!(f.ledger.balances.snapshot(seller).is_none());
        assert!(f.ledger.events().is_empty());
    }

    #[test]
    fn empty_wallet_deposit_is_noop_but_sets_strike() {
        let mut f = setup();
        let seller = AccountId::new();
        assert_eq!(f.ledger.deposit(&mut f.asset, seller, 7).unwrap(), 0);
        assert_eq!(f.ledger.balance_of(seller).amount, 0);
        assert_eq!(f.ledger.balance_of(seller).strike, 7);
    }

    #[test]
    fn redeposit_accumulates_and_overwrites_strike() {
        let mut f = setup();
        let seller = f.seller_with(100, 10);
        f.fund(seller, 40);
        f.ledger.deposit(&mut f.asset, seller, 12).unwrap();
        assert_eq!(
            f.ledger.balance_of(seller),
            BalanceRecord {
                amount: 140,
                strike: 12
            }
        );
    }

    #[test]
    fn withdraw_split_in_two() {
        let mut f = setup();
        let seller = f.seller_with(100, 10);

        f.ledger.withdraw_funds(&mut f.asset, seller, 50).unwrap();
        assert_eq!(f.ledger.balance_of(seller).amount, 50);
        assert_eq!(f.asset.balance_of(seller), 50);

        f.ledger.withdraw_funds(&mut f.asset, seller, 50).unwrap();
        assert_eq!(f.ledger.balance_of(seller).amount, 0);
        assert_eq!(f.asset.balance_of(seller), 100);
        assert_eq!(f.asset.balance_of(f.ledger.custody()), 0);
    }

    #[test]
    fn overdraw_is_rejected_before_mutation() {
        let mut f = setup();
        let seller = f.seller_with(100, 10);
        let err = f.ledger.withdraw_funds(&mut f.asset, seller, 101).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InsufficientBalance {
                requested: 101,
                available: 100
            }
        ));
        assert_eq!(f.ledger.balance_of(seller).amount, 100);
    }

    #[test]
    fn refused_withdrawal_restores_balance() {
        let mut f = setup();
        let seller = f.seller_with(100, 10);
        f.asset.fail_next_transfer("paused");

        assert!(f.ledger.withdraw_funds(&mut f.asset, seller, 60).is_err());
        assert_eq!(f.ledger.balance_of(seller).amount, 100);
        assert_eq!(f.ledger.events().len(), 1);
    }

    #[test]
    fn buy_validation_order() {
        let mut f = setup();
        let seller = AccountId::new();
        let buyer = AccountId::new();

        // Zero is rejected even though the seller has nothing either.
        let err = f.ledger.buy(&mut f.asset, buyer, 0, seller).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmount));

        let err = f.ledger.buy(&mut f.asset, buyer, 100, seller).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidSellerAmount { .. }));
        assert_eq!(f.ledger.order_count(), 0);
    }

    #[test]
    fn buy_records_order_with_maturity() {
        let mut f = setup();
        let seller = f.seller_with(100, 10);
        let buyer = AccountId::new();
        f.fund(buyer, 100);

        let idx = f.ledger.buy(&mut f.asset, buyer, 100, seller).unwrap();
        assert_eq!(idx, OrderIndex(0));

        let order = f.ledger.get_order(idx).unwrap();
        assert_eq!(order.amount, 100);
        assert_eq!(order.premium, 100);
        assert_eq!(order.strike, 10);
        assert!(!order.redeemed);
        assert_eq!(order.maturity, f.clock.now() + Duration::days(30));
        assert_eq!(f.ledger.order_summary(idx).unwrap(), (100, seller));
        assert_eq!(f.ledger.balance_of(seller).amount, 0);
        assert_eq!(f.asset.balance_of(f.ledger.custody()), 200);
    }

    #[test]
    fn refused_payment_unwinds_purchase() {
        let mut f = setup();
        let seller = f.seller_with(100, 10);
        let buyer = AccountId::new();
        f.asset.mint(buyer, 100).unwrap(); // no approval

        let err = f.ledger.buy(&mut f.asset, buyer, 60, seller).unwrap_err();
        assert!(matches!(err, LedgerError::Transfer(_)));
        assert_eq!(f.ledger.balance_of(seller).amount, 100);
        assert_eq!(f.ledger.order_count(), 0);
        assert_eq!(f.asset.balance_of(buyer), 100);
    }

    #[test]
    fn redeem_pays_both_sides_once() {
        let mut f = setup();
        let seller = f.seller_with(100, 10);
        let buyer = AccountId::new();
        f.fund(buyer, 100);
        let idx = f.ledger.buy(&mut f.asset, buyer, 100, seller).unwrap();

        let err = f
            .ledger
            .withdraw_at_maturity(&mut f.asset, buyer, idx)
            .unwrap_err();
        assert!(matches!(err, LedgerError::MaturityNotReached { .. }));
        assert_eq!(f.ledger.order_status(idx).unwrap(), OrderStatus::Pending);

        f.clock.advance(Duration::days(30));
        assert_eq!(f.ledger.order_status(idx).unwrap(), OrderStatus::Matured);

        let receipt = f.ledger.withdraw_at_maturity(&mut f.asset, buyer, idx).unwrap();
        assert_eq!(receipt.buyer_amount, 100);
        assert_eq!(receipt.seller_proceeds, 100);
        assert_eq!(receipt.seller_credit, 0);
        assert_eq!(f.asset.balance_of(buyer), 100);
        assert_eq!(f.asset.balance_of(seller), 100);
        assert_eq!(f.ledger.order_status(idx).unwrap(), OrderStatus::Redeemed);

        let transfers = f.asset.transfer_count();
        let err = f
            .ledger
            .withdraw_at_maturity(&mut f.asset, buyer, idx)
            .unwrap_err();
        assert!(matches!(err, LedgerError::OrderAlreadyRedeemed(i) if i == idx));
        assert_eq!(f.asset.transfer_count(), transfers);
    }

    #[test]
    fn strike_rate_remainder_credited_to_seller() {
        let mut f = setup_with(LedgerConfig {
            payout: PayoutPolicy::StrikeRate {
                rate: Decimal::new(3, 2), // 0.03
            },
            ..LedgerConfig::default()
        });
        let seller = f.seller_with(100, 10);
        let buyer = AccountId::new();
        f.fund(buyer, 100);
        let idx = f.ledger.buy(&mut f.asset, buyer, 100, seller).unwrap();
        f.clock.advance(Duration::days(31));

        // 100 * 10 * 0.03 = 30 paid out, 70 credited back.
        let receipt = f.ledger.withdraw_at_maturity(&mut f.asset, buyer, idx).unwrap();
        assert_eq!(receipt.seller_proceeds, 30);
        assert_eq!(receipt.seller_credit, 70);
        assert_eq!(f.asset.balance_of(seller), 30);
        assert_eq!(f.ledger.balance_of(seller).amount, 70);
        f.ledger.verify_conservation(&f.asset).unwrap();
    }

    #[test]
    fn refused_payout_keeps_order_redeemable() {
        let mut f = setup();
        let seller = f.seller_with(100, 10);
        let buyer = AccountId::new();
        f.fund(buyer, 100);
        let idx = f.ledger.buy(&mut f.asset, buyer, 100, seller).unwrap();
        f.clock.advance(Duration::days(30));

        f.asset.block(seller);
        let err = f
            .ledger
            .withdraw_at_maturity(&mut f.asset, buyer, idx)
            .unwrap_err();
        assert!(matches!(err, LedgerError::Transfer(TransferError::Rejected(_))));
        assert!(!f.ledger.get_order(idx).unwrap().redeemed);
        assert_eq!(f.asset.balance_of(buyer), 0);

        f.asset.unblock(seller);
        f.ledger.withdraw_at_maturity(&mut f.asset, buyer, idx).unwrap();
        assert_eq!(f.asset.balance_of(buyer), 100);
    }

    #[test]
    fn unknown_order_index() {
        let mut f = setup();
        let err = f
            .ledger
            .withdraw_at_maturity(&mut f.asset, AccountId::new(), OrderIndex(3))
            .unwrap_err();
        assert!(matches!(err, LedgerError::OrderNotFound(OrderIndex(3))));
        assert!(f.ledger.get_order(OrderIndex(0)).is_err());
    }

    #[test]
    fn custody_shortfall_is_detected() {
        let mut f = setup();
        let seller = f.seller_with(100, 10);
        // Drain custody behind the ledger's back.
        let custody = f.ledger.custody();
        f.asset.transfer(custody, AccountId::new(), 1).unwrap();

        let err = f.ledger.verify_conservation(&f.asset).unwrap_err();
        assert!(matches!(err, LedgerError::SupplyInvariantViolation { .. }));
        assert_eq!(f.ledger.balance_of(seller).amount, 100);
    }

    #[test]
    fn drained_custody_refuses_purchase_untouched() {
        let mut f = setup();
        let seller = f.seller_with(100, 10);
        let buyer = AccountId::new();
        f.fund(buyer, 50);
        let custody = f.ledger.custody();
        f.asset.transfer(custody, AccountId::new(), 1).unwrap();

        let digest = f.ledger.state_digest();
        let err = f.ledger.buy(&mut f.asset, buyer, 50, seller).unwrap_err();
        assert!(matches!(err, LedgerError::SupplyInvariantViolation { .. }));
        assert_eq!(f.ledger.order_count(), 0);
        assert_eq!(f.ledger.balance_of(seller).amount, 100);
        assert_eq!(f.asset.balance_of(buyer), 50);
        assert_eq!(f.ledger.events().len(), 1);
        assert_eq!(f.ledger.state_digest(), digest);
    }

    #[test]
    fn topped_up_custody_resumes_mutations() {
        let mut f = setup();
        let seller = f.seller_with(100, 10);
        let custody = f.ledger.custody();
        let sink = AccountId::new();
        f.asset.transfer(custody, sink, 1).unwrap();
        assert!(f.ledger.withdraw_funds(&mut f.asset, seller, 10).is_err());

        f.asset.transfer(sink, custody, 1).unwrap();
        f.ledger.withdraw_funds(&mut f.asset, seller, 10).unwrap();
        assert_eq!(f.ledger.balance_of(seller).amount, 90);
    }

    #[test]
    fn unchecked_ledger_ignores_shortfall() {
        let mut f = setup_with(LedgerConfig {
            verify_conservation: false,
            ..LedgerConfig::default()
        });
        let seller = f.seller_with(100, 10);
        let custody = f.ledger.custody();
        f.asset.transfer(custody, AccountId::new(), 1).unwrap();

        f.ledger.withdraw_funds(&mut f.asset, seller, 10).unwrap();
        assert!(f.ledger.verify_conservation(&f.asset).is_err());
    }

    #[test]
    fn system_clock_ledger_stamps_current_time() {
        let mut ledger =
            ForwardLedger::with_system_clock(LedgerConfig::default(), AccountId::new()).unwrap();
        let mut asset = InMemoryAsset::new();
        let seller = AccountId::new();
        asset.mint(seller, 10).unwrap();
        asset.approve(seller, ledger.custody(), 10);
        ledger.deposit(&mut asset, seller, 1).unwrap();

        let buyer = AccountId::new();
        asset.mint(buyer, 10).unwrap();
        asset.approve(buyer, ledger.custody(), 10);
        let before = Utc::now();
        let idx = ledger.buy(&mut asset, buyer, 10, seller).unwrap();
        let order = ledger.get_order(idx).unwrap();
        assert!(order.created_at >= before && order.created_at <= Utc::now());
        assert_eq!(ledger.order_status(idx).unwrap(), OrderStatus::Pending);
    }

    #[test]
    fn snapshot_restores_same_digest() {
        let mut f = setup();
        let seller = f.seller_with(100, 10);
        let buyer = AccountId::new();
        f.fund(buyer, 40);
        f.ledger.buy(&mut f.asset, buyer, 40, seller).unwrap();

        let json = f.ledger.snapshot().to_json().unwrap();
        let restored =
            ForwardLedger::from_snapshot(LedgerSnapshot::from_json(&json).unwrap(), f.clock.clone())
                .unwrap();
        assert_eq!(restored.state_digest(), f.ledger.state_digest());
        assert_eq!(restored.liabilities(), 140);
        restored.verify_conservation(&f.asset).unwrap();
    }

    #[test]
    fn drain_events_empties_journal() {
        let mut f = setup();
        f.seller_with(5, 1);
        assert_eq!(f.ledger.drain_events().len(), 1);
        assert!(f.ledger.events().is_empty());
    }
}
