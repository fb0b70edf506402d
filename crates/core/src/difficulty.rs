//! Relay mining difficulty arithmetic
//!
//! A target hash is read as a 256-bit big-endian unsigned integer. The
//! all-ones hash is the easiest difficulty; a smaller target means fewer
//! relays are mineable and each mined relay stands for more work. All
//! scaling is done on `BigUint` with floor rounding.

use num_bigint::BigUint;
use num_traits::{ToPrimitive, Zero};

use crate::error::{CoreError, Result};
use crate::params::EmaSmoothing;
use crate::types::TargetHash;

/// Easiest possible target: every relay is mineable.
pub const BASE_RELAY_DIFFICULTY_HASH: TargetHash = [0xFF; 32];

pub fn target_hash_to_biguint(hash: &TargetHash) -> BigUint {
    BigUint::from_bytes_be(hash)
}

/// Re-encode to exactly 32 bytes, clamped to `[1, all-ones]`.
pub fn biguint_to_target_hash(value: &BigUint) -> TargetHash {
    if value.is_zero() {
        let mut lowest = [0u8; 32];
        lowest[31] = 1;
        return lowest;
    }

    let bytes = value.to_bytes_be();
    if bytes.len() > 32 {
        return BASE_RELAY_DIFFICULTY_HASH;
    }

    let mut out = [0u8; 32];
    out[32 - bytes.len()..].copy_from_slice(&bytes);
    out
}

/// Scale `hash` by `numerator / denominator`, flooring the result.
pub fn scale_target_hash(hash: &TargetHash, numerator: u64, denominator: u64) -> TargetHash {
    if denominator == 0 {
        return BASE_RELAY_DIFFICULTY_HASH;
    }
    let scaled = target_hash_to_biguint(hash) * BigUint::from(numerator) / BigUint::from(denominator);
    biguint_to_target_hash(&scaled)
}

/// Target hash for a given relay volume.
///
/// Always scales from the base hash so that the result depends only on the
/// EMA: a volume at or below target yields the base hash, anything above
/// shrinks it by `target_num_relays / new_relays_ema`.
pub fn compute_new_target_hash(target_num_relays: u64, new_relays_ema: u64) -> TargetHash {
    if new_relays_ema <= target_num_relays {
        return BASE_RELAY_DIFFICULTY_HASH;
    }
    scale_target_hash(&BASE_RELAY_DIFFICULTY_HASH, target_num_relays, new_relays_ema)
}

/// `alpha * current + (1 - alpha) * previous`, floored.
pub fn compute_ema(smoothing: &EmaSmoothing, prev_ema: u64, current: u64) -> u64 {
    let numerator = smoothing.numerator as u128;
    let denominator = smoothing.denominator.max(1) as u128;
    let weight_prev = denominator.saturating_sub(numerator);
    let value = (numerator * current as u128 + weight_prev * prev_ema as u128) / denominator;
    // Convex combination of two u64 values, cannot exceed u64::MAX.
    value.min(u64::MAX as u128) as u64
}

/// Scale claimed compute units by `base / target` to the network-wide estimate.
pub fn estimated_compute_units(claimed_compute_units: u64, target_hash: &TargetHash) -> Result<u64> {
    let target = target_hash_to_biguint(target_hash);
    if target.is_zero() {
        return Err(CoreError::InvalidTargetHash("target hash is zero".to_string()));
    }

    let base = target_hash_to_biguint(&BASE_RELAY_DIFFICULTY_HASH);
    let estimated = BigUint::from(claimed_compute_units) * base / target;
    estimated.to_u64().ok_or_else(|| {
        CoreError::ArithmeticOverflow(format!(
            "estimated compute units for {} claimed at target {}",
            claimed_compute_units,
            hex::encode(target_hash)
        ))
    })
}

/// Leading zero bits of a target hash, for logging.
pub fn difficulty_bits(hash: &TargetHash) -> u32 {
    let value = target_hash_to_biguint(hash);
    if value.is_zero() {
        return 256;
    }
    256 - value.bits() as u32
}

/// True when `hash` is the easiest target.
pub fn is_base_difficulty(hash: &TargetHash) -> bool {
    hash == &BASE_RELAY_DIFFICULTY_HASH
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alpha_tenth() -> EmaSmoothing {
        EmaSmoothing {
            numerator: 1,
            denominator: 10,
        }
    }

    fn max() -> BigUint {
        target_hash_to_biguint(&BASE_RELAY_DIFFICULTY_HASH)
    }

    #[test]
    fn test_round_trip_preserves_length() {
        let mut hash = [0u8; 32];
        hash[0] = 0x00;
        hash[1] = 0x01;
        let back = biguint_to_target_hash(&target_hash_to_biguint(&hash));
        assert_eq!(back, hash);
    }

    #[test]
    fn test_encode_clamps_to_bounds() {
        let lowest = biguint_to_target_hash(&BigUint::zero());
        assert_eq!(lowest[31], 1);
        assert!(lowest[..31].iter().all(|b| *b == 0));

        let too_big = max() + BigUint::from(1u8);
        assert_eq!(biguint_to_target_hash(&too_big), BASE_RELAY_DIFFICULTY_HASH);
    }

    #[test]
    fn test_volume_at_or_below_target_keeps_base() {
        assert_eq!(compute_new_target_hash(50, 0), BASE_RELAY_DIFFICULTY_HASH);
        assert_eq!(compute_new_target_hash(50, 10), BASE_RELAY_DIFFICULTY_HASH);
        assert_eq!(compute_new_target_hash(50, 50), BASE_RELAY_DIFFICULTY_HASH);
    }

    #[test]
    fn test_scaling_is_target_over_ema() {
        let quarter = compute_new_target_hash(50, 200);
        assert_eq!(target_hash_to_biguint(&quarter), max() / BigUint::from(4u8));

        let two_hundredth = compute_new_target_hash(50, 10_000);
        assert_eq!(target_hash_to_biguint(&two_hundredth), max() / BigUint::from(200u8));
    }

    #[test]
    fn test_target_strictly_decreases_with_ema() {
        let mut prev = target_hash_to_biguint(&compute_new_target_hash(100, 101));
        for ema in [150u64, 1_000, 10_000, 1_000_000, u64::MAX] {
            let next = target_hash_to_biguint(&compute_new_target_hash(100, ema));
            assert!(next < prev, "ema {} did not decrease the target", ema);
            prev = next;
        }
    }

    #[test]
    fn test_extreme_ratio_stays_non_zero() {
        let hash = compute_new_target_hash(1, u64::MAX);
        assert!(!target_hash_to_biguint(&hash).is_zero());
        let tiny = scale_target_hash(&biguint_to_target_hash(&BigUint::from(1u8)), 1, u64::MAX);
        assert_eq!(target_hash_to_biguint(&tiny), BigUint::from(1u8));
    }

    #[test]
    fn test_compute_ema() {
        assert_eq!(compute_ema(&alpha_tenth(), 0, 100), 10);
        assert_eq!(compute_ema(&alpha_tenth(), 100, 100), 100);
        assert_eq!(compute_ema(&alpha_tenth(), 1_000, 0), 900);
        // 0.1 * 7 + 0.9 * 3 = 3.4 -> 3
        assert_eq!(compute_ema(&alpha_tenth(), 3, 7), 3);
        assert_eq!(compute_ema(&alpha_tenth(), u64::MAX, u64::MAX), u64::MAX);
    }

    #[test]
    fn test_estimated_compute_units_at_base_is_identity() {
        assert_eq!(estimated_compute_units(1_234, &BASE_RELAY_DIFFICULTY_HASH).unwrap(), 1_234);
    }

    #[test]
    fn test_estimated_compute_units_scales_with_difficulty() {
        let quarter = compute_new_target_hash(50, 200);
        // base / floor(base / 4) is slightly above 4, floored result is 4 * cu
        assert_eq!(estimated_compute_units(100, &quarter).unwrap(), 400);
    }

    #[test]
    fn test_estimated_compute_units_rejects_zero_target() {
        let err = estimated_compute_units(1, &[0u8; 32]).unwrap_err();
        assert!(matches!(err, CoreError::InvalidTargetHash(_)));
    }

    #[test]
    fn test_estimated_compute_units_overflow() {
        let hardest = biguint_to_target_hash(&BigUint::from(1u8));
        let err = estimated_compute_units(2, &hardest).unwrap_err();
        assert!(matches!(err, CoreError::ArithmeticOverflow(_)));
    }

    #[test]
    fn test_difficulty_bits() {
        assert_eq!(difficulty_bits(&BASE_RELAY_DIFFICULTY_HASH), 0);
        let quarter = compute_new_target_hash(50, 200);
        assert_eq!(difficulty_bits(&quarter), 2);
        assert!(is_base_difficulty(&BASE_RELAY_DIFFICULTY_HASH));
        assert!(!is_base_difficulty(&quarter));
    }
}
