use proptest::prelude::*;

use oracle_sectors::{SectorConfigStore, SectorPolicy};
use oracle_types::{Address, OracleParams, SectorId, Timestamp};
use oracle_validators::{derive_seed, StakeDelta, StakeReason, ValidatorRegistry};

#[derive(Clone, Debug)]
enum Op {
    Deposit(u128),
    Withdraw(u128),
    Slash(u128),
    Correct,
    Incorrect,
    Absent,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u128..5_000).prop_map(Op::Deposit),
        (0u128..5_000).prop_map(Op::Withdraw),
        (0u128..5_000).prop_map(Op::Slash),
        Just(Op::Correct),
        Just(Op::Incorrect),
        Just(Op::Absent),
    ]
}

fn registry(stake: u128) -> (ValidatorRegistry, Address) {
    let sectors = SectorConfigStore::new();
    sectors.upsert_sector(SectorPolicy::new("market", 0)).unwrap();
    let mut registry = ValidatorRegistry::new(OracleParams::default());
    let address = Address::from("alice");
    registry
        .register(address.clone(), stake, &[SectorId::from("market")], &sectors, Timestamp::EPOCH)
        .unwrap();
    (registry, address)
}

fn run(registry: &mut ValidatorRegistry, address: &Address, op: &Op, at: Timestamp) {
    match op {
        Op::Deposit(a) => {
            registry
                .apply_stake_delta(address, StakeDelta::Increase(*a), StakeReason::Deposit, at)
                .unwrap();
        }
        // May fail; a failure must leave the stake untouched.
        Op::Withdraw(a) => {
            let _ = registry.apply_stake_delta(address, StakeDelta::Decrease(*a), StakeReason::Withdrawal, at);
        }
        Op::Slash(a) => {
            registry.slash_capped(address, *a, at).unwrap();
        }
        Op::Correct => {
            registry.record_correct(address, at).unwrap();
        }
        Op::Incorrect => {
            registry.record_incorrect(address, at).unwrap();
        }
        Op::Absent => {
            registry.penalize_absence(address, at).unwrap();
        }
    }
}

proptest! {
    /// Stake and accuracy stay in range under any sequence of operations,
    /// and a slash never removes more than the stake held.
    #[test]
    fn stake_never_negative_and_accuracy_bounded(
        initial in 0u128..10_000,
        ops in prop::collection::vec(op(), 0..60),
    ) {
        let (mut registry, address) = registry(initial);
        for (i, op) in ops.iter().enumerate() {
            let before = registry.get(&address).unwrap().staked_amount;
            if let Op::Slash(requested) = op {
                let actual = registry.slash_capped(&address, *requested, Timestamp::new(i as u64)).unwrap();
                prop_assert_eq!(actual, (*requested).min(before));
                prop_assert_eq!(registry.get(&address).unwrap().staked_amount, before - actual);
            } else {
                run(&mut registry, &address, op, Timestamp::new(i as u64));
            }
            let v = registry.get(&address).unwrap();
            prop_assert!(v.accuracy_bps <= 10_000);
            let mult = v.reputation_multiplier_bps();
            prop_assert!((5_000..=15_000).contains(&mult));
        }
    }

    /// Replaying the journal yields the same validators and the same journal.
    #[test]
    fn journal_replay_is_identical(
        initial in 0u128..10_000,
        ops in prop::collection::vec(op(), 0..60),
    ) {
        let (mut registry, address) = registry(initial);
        for (i, op) in ops.iter().enumerate() {
            run(&mut registry, &address, op, Timestamp::new(i as u64));
        }
        let replayed = ValidatorRegistry::replay(OracleParams::default(), registry.journal()).unwrap();
        prop_assert_eq!(registry.get(&address), replayed.get(&address));
        prop_assert_eq!(registry.journal(), replayed.journal());
    }

    /// The journal survives serialization and still replays.
    #[test]
    fn journal_bincode_roundtrip_replays(ops in prop::collection::vec(op(), 0..30)) {
        let (mut registry, address) = registry(1_000);
        for (i, op) in ops.iter().enumerate() {
            run(&mut registry, &address, op, Timestamp::new(i as u64));
        }
        let bytes = bincode::serialize(registry.journal()).unwrap();
        let decoded: Vec<oracle_validators::RegistryEntry> = bincode::deserialize(&bytes).unwrap();
        let replayed = ValidatorRegistry::replay(OracleParams::default(), &decoded).unwrap();
        prop_assert_eq!(registry.get(&address), replayed.get(&address));
    }

    /// Assignment never returns duplicates or more than requested.
    #[test]
    fn assignment_is_unique_and_bounded(n in 0usize..30, count in 0usize..40, salt in any::<u64>()) {
        let sectors = SectorConfigStore::new();
        sectors.upsert_sector(SectorPolicy::new("market", 1)).unwrap();
        let mut registry = ValidatorRegistry::new(OracleParams::default());
        for i in 0..n {
            registry
                .register(Address::new(format!("v{i}")), 10, &[SectorId::from("market")], &sectors, Timestamp::EPOCH)
                .unwrap();
        }
        let seed = derive_seed(&[&salt.to_le_bytes()]);
        let mut picked = registry.assignable(&SectorId::from("market"), &seed, count);
        prop_assert_eq!(picked.len(), count.min(n));
        picked.sort();
        picked.dedup();
        prop_assert_eq!(picked.len(), count.min(n));
    }
}
