//! System-wide constants for the Correlatzia ledger.

/// Seconds in one day.
pub const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// Default lock period between order placement and maturity (days).
pub const DEFAULT_LOCK_PERIOD_DAYS: i64 = 30;

/// Default lock period in seconds.
pub const DEFAULT_LOCK_PERIOD_SECS: i64 = DEFAULT_LOCK_PERIOD_DAYS * SECONDS_PER_DAY;

/// Domain separator for the ledger state digest.
pub const STATE_DIGEST_DOMAIN: &[u8] = b"correlatzia:state:v1:";

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name.
pub const ENGINE_NAME: &str = "Correlatzia";
