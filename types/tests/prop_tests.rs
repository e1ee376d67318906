use proptest::prelude::*;

use oracle_types::{apply_bps, mul_div, EntityType, Timestamp, ValidationId};

proptest! {
    /// Timestamp ordering: new(a) <= new(b) iff a <= b.
    #[test]
    fn timestamp_ordering(a in 0u64..u64::MAX, b in 0u64..u64::MAX) {
        let ta = Timestamp::new(a);
        let tb = Timestamp::new(b);
        prop_assert_eq!(ta <= tb, a <= b);
        prop_assert_eq!(ta == tb, a == b);
    }

    /// Timestamp elapsed_since: elapsed_since(now) = now - self (saturating).
    #[test]
    fn timestamp_elapsed_since(base in 0u64..1_000_000, offset in 0u64..1_000_000) {
        let t = Timestamp::new(base);
        let now = Timestamp::new(base + offset);
        prop_assert_eq!(t.elapsed_since(now), offset);
    }

    /// window_elapsed flips exactly one second after the window length.
    #[test]
    fn window_elapsed_matches_strict_comparison(
        start in 0u64..500_000,
        window in 1u64..500_000,
        offset in 0u64..1_000_000,
    ) {
        let t = Timestamp::new(start);
        let now = Timestamp::new(start + offset);
        prop_assert_eq!(t.window_elapsed(window, now), offset > window);
    }

    /// apply_bps never exceeds the original amount for rates up to 100%.
    #[test]
    fn apply_bps_bounded(amount in 0u128..u128::MAX / 10_001, bps in 0u32..=10_000) {
        prop_assert!(apply_bps(amount, bps) <= amount);
    }

    /// mul_div agrees with exact arithmetic when nothing overflows.
    #[test]
    fn mul_div_exact(a in 0u128..1u128 << 60, b in 0u128..1u128 << 60, c in 1u128..1u128 << 60) {
        prop_assert_eq!(mul_div(a, b, c), a * b / c);
    }

    /// ValidationId bincode serialization roundtrip.
    #[test]
    fn validation_id_bincode_roundtrip(raw in 0u64..u64::MAX) {
        let id = ValidationId::new(raw);
        let encoded = bincode::serialize(&id).unwrap();
        let decoded: ValidationId = bincode::deserialize(&encoded).unwrap();
        prop_assert_eq!(decoded, id);
    }
}

#[test]
fn every_entity_type_round_trips_through_its_name() {
    for t in EntityType::ALL {
        assert_eq!(t.as_str().parse::<EntityType>().unwrap(), t);
    }
}
