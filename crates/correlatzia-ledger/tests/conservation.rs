//! Randomized operation sequences.
//!
//! Drives a ledger with a seeded mix of valid and invalid calls, including
//! injected transfer failures, and checks after every step that custody
//! holdings match what the ledger owes and that no asset was created or
//! destroyed.

use chrono::Duration;
use correlatzia_ledger::{AssetTransfer, ForwardLedger, InMemoryAsset, ManualClock};
use correlatzia_types::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;

const ACCOUNTS: usize = 6;
const STEPS: usize = 400;

fn run(seed: u64, payout: PayoutPolicy) {
    let mut rng = StdRng::seed_from_u64(seed);
    let clock = ManualClock::starting_now();
    let config = LedgerConfig {
        payout,
        ..LedgerConfig::default()
    };
    let mut ledger = ForwardLedger::new(config, AccountId::new(), clock.clone()).unwrap();
    let custody = ledger.custody();
    let mut asset = InMemoryAsset::new();

    let accounts: Vec<AccountId> = (0..ACCOUNTS).map(|_| AccountId::new()).collect();
    for who in &accounts {
        asset.mint(*who, rng.gen_range(0..1_000)).unwrap();
    }
    let supply = asset.total_supply();

    for _ in 0..STEPS {
        let who = accounts[rng.gen_range(0..ACCOUNTS)];
        let other = accounts[rng.gen_range(0..ACCOUNTS)];

        if rng.gen_bool(0.05) {
            asset.fail_next_transfer("injected");
        }

        let before = ledger.state_digest();
        let outcome = match rng.gen_range(0..5) {
            0 => {
                let held = asset.balance_of(who);
                asset.approve(who, custody, held);
                ledger.deposit(&mut asset, who, rng.gen_range(0..20)).map(|_| ())
            }
            1 => {
                let amount = rng.gen_range(0..=ledger.balance_of(who).amount + 5);
                ledger.withdraw_funds(&mut asset, who, amount)
            }
            2 => {
                let amount = rng.gen_range(0..=ledger.balance_of(other).amount + 5);
                let held = asset.balance_of(who);
                asset.approve(who, custody, held);
                ledger.buy(&mut asset, who, amount, other).map(|_| ())
            }
            3 if ledger.order_count() > 0 => {
                let index = OrderIndex(rng.gen_range(0..ledger.order_count() as u64));
                ledger
                    .withdraw_at_maturity(&mut asset, who, index)
                    .map(|_| ())
            }
            _ => {
                clock.advance(Duration::days(rng.gen_range(0..20)));
                Ok(())
            }
        };

        if let Err(err) = outcome {
            assert!(
                !matches!(err, LedgerError::SupplyInvariantViolation { .. }),
                "seed {seed}: {err}"
            );
            assert_eq!(ledger.state_digest(), before, "seed {seed}: failed call mutated state");
        }
        ledger.verify_conservation(&asset).unwrap();
        assert_eq!(asset.total_supply(), supply);
        assert_eq!(u128::from(asset.balance_of(custody)), ledger.liabilities());
    }
}

#[test]
fn full_premium_sequences_conserve() {
    for seed in 0..8 {
        run(seed, PayoutPolicy::FullPremium);
    }
}

#[test]
fn strike_rate_sequences_conserve() {
    for seed in 100..108 {
        run(
            seed,
            PayoutPolicy::StrikeRate {
                rate: Decimal::new(5, 2),
            },
        );
    }
}
