//! Wall-clock helpers
//!
//! All expirations in the KV engine are absolute nanosecond timestamps in
//! the wall-clock domain. Comparisons are strict: `now > expires_at` means
//! expired, `now <= expires_at` means live.

use std::time::{SystemTime, UNIX_EPOCH};

/// Horizon, in years, used for entries stored without a positive TTL.
///
/// A TTL of zero or below means "effectively forever"; rather than carry a
/// special case through every expiry comparison, such entries get an
/// absolute expiration a century out.
pub const FOREVER_TTL_YEARS: i64 = 100;

const NANOS_PER_SEC: i64 = 1_000_000_000;
const SECS_PER_YEAR: i64 = 365 * 24 * 60 * 60;

/// Current wall-clock time in nanoseconds since the Unix epoch.
pub fn now_nanos() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before Unix epoch")
        .as_nanos() as i64
}

/// Current wall-clock time in whole seconds since the Unix epoch.
pub fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before Unix epoch")
        .as_secs() as i64
}

/// Compute the absolute expiration for a caller-supplied TTL in seconds.
///
/// A positive TTL expires `ttl_seconds` from now; zero or negative is
/// normalized to the century-scale sentinel so the result is always
/// strictly positive and strictly in the future.
pub fn expiry_for_ttl(ttl_seconds: i64) -> i64 {
    let now = now_nanos();
    if ttl_seconds > 0 {
        now + ttl_seconds * NANOS_PER_SEC
    } else {
        now + FOREVER_TTL_YEARS * SECS_PER_YEAR * NANOS_PER_SEC
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positive_ttl_lands_in_the_future() {
        let before = now_nanos();
        let expires = expiry_for_ttl(10);
        assert!(expires > before);
        // Within [10s, 11s] of the pre-call clock reading
        assert!(expires - before >= 10 * NANOS_PER_SEC);
        assert!(expires - before < 11 * NANOS_PER_SEC);
    }

    #[test]
    fn zero_ttl_normalizes_to_century_sentinel() {
        let now = now_nanos();
        let expires = expiry_for_ttl(0);
        let years = (expires - now) / (SECS_PER_YEAR * NANOS_PER_SEC);
        assert!(years >= 99, "sentinel should be century-scale, got {years}y");
    }

    #[test]
    fn negative_ttl_matches_zero() {
        let a = expiry_for_ttl(-5);
        let b = expiry_for_ttl(0);
        // Both hit the sentinel path; clock drift between calls is tiny
        assert!((a - b).abs() < NANOS_PER_SEC);
    }

    #[test]
    fn sentinel_does_not_overflow() {
        let expires = expiry_for_ttl(0);
        assert!(expires > 0);
        assert!(expires < i64::MAX);
    }
}
