//! # correlatzia-ledger
//!
//! Time-locked escrow and forward-settlement ledger for a single fungible
//! asset.
//!
//! Sellers deposit the asset and declare a strike. Buyers purchase part of
//! a seller's balance by paying an equal premium into custody; the purchase
//! becomes an indexed order that matures after a fixed lock period. After
//! maturity anyone can settle the order, which returns the collateral to
//! the buyer and pays the seller, exactly once.
//!
//! - [`ForwardLedger`]: the ledger itself (deposit, withdraw, buy, settle)
//! - [`BalanceLedger`]: per-seller amount and strike
//! - [`OrderBook`]: append-only, index-addressed orders
//! - [`SupplyConservation`]: flow accounting checked after every mutation
//! - [`AssetTransfer`]: the boundary to whatever actually holds the asset
//! - [`SharedLedger`]: mutex-guarded handle for concurrent callers
//!
//! ## Order Lifecycle
//!
//! ```text
//! buy ──▶ PENDING ──(lock period)──▶ MATURED ──withdraw_at_maturity──▶ REDEEMED
//! ```

pub mod asset;
pub mod balance_ledger;
pub mod clock;
pub mod ledger;
pub mod order_book;
pub mod shared;
pub mod supply_conservation;

pub use asset::{AssetTransfer, InMemoryAsset, TransferLeg};
pub use balance_ledger::BalanceLedger;
pub use clock::{Clock, ManualClock, SystemClock};
pub use ledger::{ForwardLedger, LedgerSnapshot};
pub use order_book::{NewOrder, OrderBook};
pub use shared::SharedLedger;
pub use supply_conservation::SupplyConservation;
