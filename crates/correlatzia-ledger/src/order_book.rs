//! Append-only, index-addressed order book.
//!
//! The index of a new order is the number of orders placed before it.
//! Orders are never removed; the only mutation after placement is the
//! one-way `redeemed` flag.

use chrono::{DateTime, Utc};
use correlatzia_types::{
    AccountId, Amount, ForwardOrder, LedgerError, OrderIndex, Result, Strike,
};

/// Fields of an order about to be placed.
#[derive(Debug, Clone, Copy)]
pub struct NewOrder {
    pub amount: Amount,
    pub premium: Amount,
    pub buyer: AccountId,
    pub seller: AccountId,
    pub strike: Strike,
    pub created_at: DateTime<Utc>,
    pub maturity: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct OrderBook {
    orders: Vec<ForwardOrder>,
}

impl OrderBook {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from persisted orders.
    ///
    /// # Errors
    /// Returns `Serialization` if indices are not `0, 1, 2, ...`.
    pub fn from_orders(orders: Vec<ForwardOrder>) -> Result<Self> {
        for (position, order) in orders.iter().enumerate() {
            if usize::try_from(order.index.0).ok() != Some(position) {
                return Err(LedgerError::Serialization(format!(
                    "{} stored at position {position}",
                    order.index
                )));
            }
        }
        Ok(Self { orders })
    }

    /// Index the next placed order will receive.
    pub fn next_index(&self) -> Result<OrderIndex> {
        u64::try_from(self.orders.len())
            .map(OrderIndex)
            .map_err(|_| LedgerError::Internal("order book index overflow".into()))
    }

    /// Append a new unredeemed order and return its index.
    pub fn append(&mut self, new: NewOrder) -> Result<OrderIndex> {
        let index = self.next_index()?;
        self.orders.push(ForwardOrder {
            index,
            amount: new.amount,
            premium: new.premium,
            buyer: new.buyer,
            seller: new.seller,
            strike: new.strike,
            created_at: new.created_at,
            maturity: new.maturity,
            redeemed: false,
        });
        Ok(index)
    }

    /// Undo the most recent [`Self::append`] if it produced `index`.
    pub(crate) fn discard(&mut self, index: OrderIndex) {
        if self.orders.last().is_some_and(|o| o.index == index) {
            self.orders.pop();
        }
    }

    /// # Errors
    /// Returns `OrderNotFound` if `index` is out of range.
    pub fn get(&self, index: OrderIndex) -> Result<&ForwardOrder> {
        usize::try_from(index.0)
            .ok()
            .and_then(|i| self.orders.get(i))
            .ok_or(LedgerError::OrderNotFound(index))
    }

    /// Flip the order to redeemed. Fails if it already is.
    ///
    /// # Errors
    /// - `OrderNotFound` if `index` is out of range
    /// - `OrderAlreadyRedeemed` if the flag is already set
    pub fn mark_redeemed(&mut self, index: OrderIndex) -> Result<&ForwardOrder> {
        let order = self.get_mut(index)?;
        if order.redeemed {
            return Err(LedgerError::OrderAlreadyRedeemed(index));
        }
        order.redeemed = true;
        Ok(&*order)
    }

    /// Roll back a [`Self::mark_redeemed`] whose settlement failed.
    pub(crate) fn unmark_redeemed(&mut self, index: OrderIndex) {
        if let Ok(order) = self.get_mut(index) {
            order.redeemed = false;
        }
    }

    fn get_mut(&mut self, index: OrderIndex) -> Result<&mut ForwardOrder> {
        usize::try_from(index.0)
            .ok()
            .and_then(|i| self.orders.get_mut(i))
            .ok_or(LedgerError::OrderNotFound(index))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ForwardOrder> {
        self.orders.iter()
    }

    pub fn for_buyer(&self, buyer: AccountId) -> impl Iterator<Item = &ForwardOrder> {
        self.orders.iter().filter(move |o| o.buyer == buyer)
    }

    pub fn for_seller(&self, seller: AccountId) -> impl Iterator<Item = &ForwardOrder> {
        self.orders.iter().filter(move |o| o.seller == seller)
    }

    /// Number of orders not yet redeemed.
    #[must_use]
    pub fn open_count(&self) -> usize {
        self.orders.iter().filter(|o| !o.redeemed).count()
    }

    /// Custody owed to open orders: collateral plus premium of each.
    #[must_use]
    pub fn open_escrow(&self) -> u128 {
        self.orders
            .iter()
            .filter(|o| !o.redeemed)
            .map(ForwardOrder::escrowed)
            .sum()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[ForwardOrder] {
        &self.orders
    }
}
