//! Replaying the same operations at the same instants yields the same state.

use chrono::{DateTime, Duration};
use correlatzia_ledger::{ForwardLedger, InMemoryAsset, LedgerSnapshot, ManualClock};
use correlatzia_types::*;

fn account(tag: u8) -> AccountId {
    AccountId::from_bytes([tag; 16])
}

fn replay() -> ForwardLedger<ManualClock> {
    let clock = ManualClock::new(DateTime::from_timestamp(1_700_000_000, 0).unwrap());
    let custody = account(0xCC);
    let mut ledger = ForwardLedger::new(LedgerConfig::default(), custody, clock.clone()).unwrap();
    let mut asset = InMemoryAsset::new();

    for (tag, amount) in [(1_u8, 500_u64), (2, 300), (3, 200), (4, 200)] {
        asset.mint(account(tag), amount).unwrap();
        asset.approve(account(tag), custody, amount);
    }

    ledger.deposit(&mut asset, account(1), 10).unwrap();
    ledger.deposit(&mut asset, account(2), 12).unwrap();
    ledger.buy(&mut asset, account(3), 150, account(1)).unwrap();
    clock.advance(Duration::days(3));
    ledger.buy(&mut asset, account(4), 200, account(2)).unwrap();
    ledger.withdraw_funds(&mut asset, account(1), 50).unwrap();
    clock.advance(Duration::days(28));
    ledger
        .withdraw_at_maturity(&mut asset, account(3), OrderIndex(0))
        .unwrap();
    ledger
}

#[test]
fn identical_replays_share_a_digest() {
    let a = replay();
    let b = replay();
    assert_eq!(a.state_digest(), b.state_digest());
    assert_eq!(a.state_digest_hex().len(), 64);
    assert_eq!(a.events(), b.events());
}

#[test]
fn digest_tracks_redemption_flag() {
    let a = replay();
    let mut snapshot = a.snapshot();
    snapshot.orders[1].redeemed = true;
    let b = ForwardLedger::from_snapshot(snapshot, a.clock().clone()).unwrap();
    assert_ne!(a.state_digest(), b.state_digest());
}

#[test]
fn snapshot_survives_json() {
    let a = replay();
    let json = a.snapshot().to_json().unwrap();
    let restored = LedgerSnapshot::from_json(&json).unwrap();
    assert_eq!(restored, a.snapshot());

    let b = ForwardLedger::from_snapshot(restored, a.clock().clone()).unwrap();
    assert_eq!(b.state_digest(), a.state_digest());
    assert_eq!(b.order_count(), 2);
    assert!(b.events().is_empty());
}

#[test]
fn corrupt_snapshot_is_rejected() {
    let a = replay();
    let mut snapshot = a.snapshot();
    snapshot.orders.remove(0);
    assert!(matches!(
        ForwardLedger::from_snapshot(snapshot, a.clock().clone()),
        Err(LedgerError::Serialization(_))
    ));

    assert!(LedgerSnapshot::from_json("{not json").is_err());
}
