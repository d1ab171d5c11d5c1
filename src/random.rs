//! Keyed pseudo-random values for deterministic, order-independent sampling.
//!
//! Every value is a pure function of a string key:
//! - no generator state survives between calls
//! - wrapping 32-bit integer math only, so results are identical on every platform
//! - the string hash and the mulberry32 mix match the keyed `random()` used by
//!   browser-side motion tooling, so schedules line up with those renders

/// Fold a key into a signed 32-bit hash (`h = h * 31 + unit` over UTF-16 units).
pub fn hash_key(key: &str) -> i32 {
    key.encode_utf16().fold(0_i32, |hash, unit| {
        (hash << 5).wrapping_sub(hash).wrapping_add(i32::from(unit))
    })
}

/// Uniform value in `[0, 1)` derived from `key` alone.
#[inline]
pub fn random_key(key: &str) -> f64 {
    mulberry32(hash_key(key) as u32)
}

/// Keyed value for a `"{tag}-{seed}"` key.
#[inline]
pub fn tagged(tag: &str, seed: i64) -> f64 {
    random_key(&format!("{tag}-{seed}"))
}

#[inline(always)]
fn mulberry32(seed: u32) -> f64 {
    let mut t = seed.wrapping_add(0x6D2B_79F5);
    t = (t ^ (t >> 15)).wrapping_mul(t | 1);
    t ^= t.wrapping_add((t ^ (t >> 7)).wrapping_mul(t | 61));
    f64::from(t ^ (t >> 14)) / 4_294_967_296.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_matches_reference_values() {
        assert_eq!(hash_key(""), 0);
        assert_eq!(hash_key("a"), 97);
        assert_eq!(hash_key("burst-jitter-42"), 2_009_467_538);
    }

    #[test]
    fn keyed_values_are_locked() {
        assert_eq!(random_key("burst-jitter-42"), 0.40957291005179286);
        assert_eq!(random_key("burst-dur-42"), 0.8508656530175358);
        assert_eq!(random_key("burst-peak-42"), 0.7004579294007272);
        assert_eq!(random_key(""), 0.26642920868471265);
        assert_eq!(random_key("a"), 0.5655837582889944);
    }

    #[test]
    fn tagged_formats_negative_seeds_plainly() {
        assert_eq!(tagged("scale", -7), random_key("scale--7"));
        assert_eq!(tagged("burst-dur", 42), random_key("burst-dur-42"));
    }

    #[test]
    fn values_stay_in_unit_interval() {
        for index in 0..2_000 {
            let value = tagged("probe", index);
            assert!((0.0..1.0).contains(&value), "value {value} out of range");
        }
    }
}
