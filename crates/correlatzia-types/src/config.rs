//! Configuration for a ledger instance.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::{LedgerError, PayoutPolicy, Result, constants};

/// Tunables for one ledger instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Time between order placement and maturity, in seconds.
    pub lock_period_secs: i64,
    /// How seller proceeds are computed at settlement.
    pub payout: PayoutPolicy,
    /// Verify custody holdings against ledger liabilities after every
    /// successful mutation.
    pub verify_conservation: bool,
}

impl LedgerConfig {
    /// Lock period as a chrono duration.
    #[must_use]
    pub fn lock_period(&self) -> Duration {
        Duration::seconds(self.lock_period_secs)
    }

    /// Check that the configuration describes a usable ledger.
    ///
    /// # Errors
    /// Returns [`LedgerError::Configuration`] for a non-positive lock period
    /// or a payout policy with a negative rate.
    pub fn validate(&self) -> Result<()> {
        if self.lock_period_secs <= 0 {
            return Err(LedgerError::Configuration(format!(
                "lock_period_secs must be positive, got {}",
                self.lock_period_secs
            )));
        }
        // chrono panics on durations beyond ~292 million years
        if Duration::try_seconds(self.lock_period_secs).is_none() {
            return Err(LedgerError::Configuration(format!(
                "lock_period_secs out of range: {}",
                self.lock_period_secs
            )));
        }
        if !self.payout.is_valid() {
            return Err(LedgerError::Configuration(format!(
                "invalid payout policy: {}",
                self.payout
            )));
        }
        Ok(())
    }

    /// Parse and validate a JSON configuration document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            lock_period_secs: constants::DEFAULT_LOCK_PERIOD_SECS,
            payout: PayoutPolicy::default(),
            verify_conservation: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    #[test]
    fn defaults_are_thirty_days_full_premium() {
        let cfg = LedgerConfig::default();
        assert_eq!(cfg.lock_period(), Duration::days(30));
        assert_eq!(cfg.payout, PayoutPolicy::FullPremium);
        assert!(cfg.verify_conservation);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn json_roundtrip() {
        let cfg = LedgerConfig {
            lock_period_secs: 3600,
            payout: PayoutPolicy::StrikeRate {
                rate: Decimal::new(5, 2),
            },
            verify_conservation: false,
        };
        let json = cfg.to_json_string().unwrap();
        let back = LedgerConfig::from_json_str(&json).unwrap();
        assert_eq!(cfg, back);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let cfg = LedgerConfig::from_json_str(r#"{"lock_period_secs": 60}"#).unwrap();
        assert_eq!(cfg.lock_period_secs, 60);
        assert_eq!(cfg.payout, PayoutPolicy::FullPremium);
    }

    #[test]
    fn zero_lock_period_rejected() {
        let err = LedgerConfig::from_json_str(r#"{"lock_period_secs": 0}"#).unwrap_err();
        assert!(matches!(err, LedgerError::Configuration(_)), "Got: {err:?}");
    }

    #[test]
    fn negative_rate_rejected() {
        let cfg = LedgerConfig {
            payout: PayoutPolicy::StrikeRate {
                rate: Decimal::new(-5, 2),
            },
            ..LedgerConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(LedgerError::Configuration(_))
        ));
    }

    #[test]
    fn malformed_json_is_serialization_error() {
        let err = LedgerConfig::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, LedgerError::Serialization(_)));
    }
}
