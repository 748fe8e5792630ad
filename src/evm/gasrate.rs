//! Gas-rate control: base-fee recurrence and effective gas limits
//!
//! The base fee follows an exponential update against a target throughput:
//!
//! ```text
//! num = used_gas · 1e9 − target_rate · duration_nanos
//! den = 128 · target_rate · 1e9
//! new = old · e^(num / den)
//! ```
//!
//! computed with an exact integer Taylor expansion, so every node derives
//! the same price without floating point.

use alloy_primitives::U256;
use num_bigint::{BigInt, Sign};

const NANOS_PER_SEC: u64 = 1_000_000_000;

/// Ceiling on the block duration credited to the gas limit integral
const MAX_GAS_LIMIT_DELTA_NANOS: i64 = 2 * NANOS_PER_SEC as i64;

/// Durations outside `(0, 60 s]` leave the base fee unchanged
const MAX_BASE_FEE_DURATION_NANOS: i64 = 60 * NANOS_PER_SEC as i64;

/// Effective gas limit for a block produced `delta_nanos` after its
/// parent: `rate · min(delta, 2 s) / 1 s`, zero for non-positive deltas.
pub fn effective_gas_limit(delta_nanos: i64, rate: u64) -> u64 {
    if delta_nanos <= 0 {
        return 0;
    }
    let delta = delta_nanos.min(MAX_GAS_LIMIT_DELTA_NANOS) as u128;
    ((rate as u128 * delta) / NANOS_PER_SEC as u128) as u64
}

/// Base fee of the next block.
///
/// `used_gas` is clamped at `target_rate · duration`; durations outside
/// `(0, 60 s]` or a zero target rate leave the fee unchanged. When usage
/// exceeded the target but the integer update rounds to no change, the fee
/// still rises by one wei. The result is lifted to `min_base_fee`.
pub fn base_fee_for_next_block(
    old: U256,
    used_gas: u64,
    duration_nanos: i64,
    target_rate: u64,
    min_base_fee: U256,
) -> U256 {
    if duration_nanos <= 0 || duration_nanos > MAX_BASE_FEE_DURATION_NANOS || target_rate == 0 {
        return lift(old, min_base_fee);
    }

    let duration = duration_nanos as u128;
    let max_used = (target_rate as u128 * duration) / NANOS_PER_SEC as u128 * 2;
    let used = (used_gas as u128).min(max_used);

    let num = BigInt::from(used) * BigInt::from(NANOS_PER_SEC)
        - BigInt::from(target_rate) * BigInt::from(duration);
    let den = BigInt::from(128u32) * BigInt::from(target_rate) * BigInt::from(NANOS_PER_SEC);

    let old_big = u256_to_bigint(old);
    let new_big = approximate_exponential(&old_big, &num, &den);
    let mut new = bigint_to_u256(&new_big);

    if new == old && num.sign() == Sign::Plus {
        // Monotone price discovery in the low-price regime.
        new = new.saturating_add(U256::from(1u8));
    }

    lift(new, min_base_fee)
}

/// Base fee of the first block of an epoch chain: `max(10 gwei, floor)`
pub fn initial_base_fee(min_base_fee: U256) -> U256 {
    lift(U256::from(10_000_000_000u64), min_base_fee)
}

fn lift(fee: U256, min_base_fee: U256) -> U256 {
    fee.max(min_base_fee)
}

/// Exact integer `factor · e^(num / den)`.
///
/// Taylor series with `a_1 = factor · den` and
/// `a_{i+1} = a_i · num / den / i`, summed until a term reaches zero,
/// finally divided by `den`. Negative `num` alternates the term signs.
fn approximate_exponential(factor: &BigInt, num: &BigInt, den: &BigInt) -> BigInt {
    let mut output = BigInt::from(0u8);
    let mut accum = factor * den;
    let mut i = 1u32;
    while accum.sign() != Sign::NoSign {
        output += &accum;
        accum = accum * num / den / BigInt::from(i);
        i += 1;
    }
    output / den
}

fn u256_to_bigint(v: U256) -> BigInt {
    BigInt::from_bytes_be(Sign::Plus, &v.to_be_bytes::<32>())
}

fn bigint_to_u256(v: &BigInt) -> U256 {
    if v.sign() == Sign::Minus {
        return U256::ZERO;
    }
    let (_, bytes) = v.to_bytes_be();
    if bytes.len() > 32 {
        return U256::MAX;
    }
    U256::from_be_slice(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    const GWEI: u64 = 1_000_000_000;

    #[test]
    fn test_gas_limit_scales_with_duration() {
        let rate = 10_000_000;
        assert_eq!(effective_gas_limit(NANOS_PER_SEC as i64, rate), rate);
        assert_eq!(
            effective_gas_limit(NANOS_PER_SEC as i64 / 2, rate),
            rate / 2
        );
    }

    #[test]
    fn test_gas_limit_capped_at_two_seconds() {
        let rate = 10_000_000;
        let capped = effective_gas_limit(2 * NANOS_PER_SEC as i64, rate);
        assert_eq!(capped, 2 * rate);
        assert_eq!(effective_gas_limit(10 * NANOS_PER_SEC as i64, rate), capped);
    }

    #[test]
    fn test_gas_limit_zero_for_non_positive_delta() {
        assert_eq!(effective_gas_limit(0, 10_000_000), 0);
        assert_eq!(effective_gas_limit(-5, 10_000_000), 0);
    }

    #[test]
    fn test_base_fee_unchanged_outside_valid_duration() {
        let old = U256::from(50 * GWEI);
        let rate = 10_000_000;
        assert_eq!(
            base_fee_for_next_block(old, 1_000_000, 0, rate, U256::ZERO),
            old
        );
        assert_eq!(
            base_fee_for_next_block(old, 1_000_000, -1, rate, U256::ZERO),
            old
        );
        assert_eq!(
            base_fee_for_next_block(old, 1_000_000, 61 * NANOS_PER_SEC as i64, rate, U256::ZERO),
            old
        );
    }

    #[test]
    fn test_base_fee_unchanged_for_zero_target_rate() {
        let old = U256::from(50 * GWEI);
        assert_eq!(
            base_fee_for_next_block(old, 1_000_000, NANOS_PER_SEC as i64, 0, U256::ZERO),
            old
        );
    }

    #[test]
    fn test_base_fee_rises_when_above_target() {
        let old = U256::from(50 * GWEI);
        let rate = 10_000_000;
        // Full second at twice the target rate.
        let new = base_fee_for_next_block(old, 2 * rate, NANOS_PER_SEC as i64, rate, U256::ZERO);
        assert!(new > old, "expected rise, got {new} from {old}");
    }

    #[test]
    fn test_base_fee_falls_when_below_target() {
        let old = U256::from(50 * GWEI);
        let rate = 10_000_000;
        let new = base_fee_for_next_block(old, 0, NANOS_PER_SEC as i64, rate, U256::ZERO);
        assert!(new < old, "expected fall, got {new} from {old}");
    }

    #[test]
    fn test_base_fee_rises_at_least_one_wei() {
        // A tiny old fee with usage above target: the exponential update
        // rounds to zero change, but the fee must still move up.
        let old = U256::from(1u8);
        let rate = 10_000_000;
        let new = base_fee_for_next_block(old, 2 * rate, NANOS_PER_SEC as i64, rate, U256::ZERO);
        assert!(new >= old + U256::from(1u8));
    }

    #[test]
    fn test_base_fee_lifted_to_floor() {
        let old = U256::from(1u8);
        let floor = U256::from(5 * GWEI);
        let rate = 10_000_000;
        let new = base_fee_for_next_block(old, 0, NANOS_PER_SEC as i64, rate, floor);
        assert_eq!(new, floor);
    }

    #[test]
    fn test_base_fee_at_target_is_stable() {
        let old = U256::from(50 * GWEI);
        let rate = 10_000_000;
        let new = base_fee_for_next_block(old, rate, NANOS_PER_SEC as i64, rate, U256::ZERO);
        assert_eq!(new, old);
    }

    #[test]
    fn test_initial_base_fee() {
        assert_eq!(initial_base_fee(U256::ZERO), U256::from(10 * GWEI));
        assert_eq!(
            initial_base_fee(U256::from(20 * GWEI)),
            U256::from(20 * GWEI)
        );
    }
}
