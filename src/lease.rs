//! Lease arithmetic shared by both renewal cycles.

use std::time::Duration;

/// Fraction of a lease that may elapse before it is renewed, as a ratio.
const RENEW_NUMERATOR: u32 = 9;
const RENEW_DENOMINATOR: u32 = 10;

/// Delay before renewing a resource granted `lease`: 90% of the lease.
///
/// Computed on the nanosecond representation, so whole-second leases map to
/// exact results (3600s -> 3240s, 86400s -> 77760s). `renewal_delay(0) == 0`.
pub fn renewal_delay(lease: Duration) -> Duration {
    lease * RENEW_NUMERATOR / RENEW_DENOMINATOR
}

/// Delay until the next renewal, or `None` if the resource must not be
/// auto-renewed.
///
/// A zero lease means "does not expire" (or "Vault granted no lease"). Feeding
/// it to [`renewal_delay`] would yield a zero delay and a tight renewal loop.
pub fn schedule(lease: Duration) -> Option<Duration> {
    if lease.is_zero() {
        None
    } else {
        Some(renewal_delay(lease))
    }
}
