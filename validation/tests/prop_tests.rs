use oracle_sectors::EntityTypeConfig;
use oracle_types::{Address, EntityId, EntityType, SectorId, Timestamp, ValidationId};
use oracle_validation::settlement::plan_finalization;
use oracle_validation::{Assignment, Outcome, Tally, Validation, Vote, VoteChoice, WeightedVotingEngine};
use proptest::prelude::*;

fn validation(fee: u128, votes: &[(u64, Option<bool>)]) -> Validation {
    let config = EntityTypeConfig {
        validation_fee: fee,
        ..EntityTypeConfig::defaults_for(SectorId::from("s"), EntityType::Service)
    };
    let assigned = votes
        .iter()
        .enumerate()
        .map(|(i, (w, _))| Assignment {
            validator: Address::new(format!("v{i}")),
            weight: *w as u128,
        })
        .collect();
    let mut v = Validation::new(
        ValidationId::new(1),
        EntityId::from("e"),
        config,
        None,
        assigned,
        Timestamp::EPOCH,
    );
    for (i, (w, choice)) in votes.iter().enumerate() {
        if let Some(approve) = choice {
            let validator = Address::new(format!("v{i}"));
            v.votes.insert(
                validator.clone(),
                Vote {
                    validator,
                    choice: if *approve { VoteChoice::Approve } else { VoteChoice::Reject },
                    weight: *w as u128,
                    reason: String::new(),
                    cast_at: Timestamp::EPOCH,
                },
            );
        }
    }
    v
}

fn votes() -> impl Strategy<Value = Vec<(u64, Option<bool>)>> {
    prop::collection::vec((1u64..10_000_000, prop::option::of(any::<bool>())), 1..12)
}

proptest! {
    #[test]
    fn fee_payouts_never_exceed_fee(fee in 0u128..1_000_000_000_000, votes in votes(), approve in any::<bool>()) {
        let v = validation(fee, &votes);
        let outcome = if approve { Outcome::Approved } else { Outcome::Rejected };
        let plan = plan_finalization(&v, outcome);
        let paid: u128 = plan.ledger.iter().map(|s| s.amount).sum();
        prop_assert!(paid <= fee);
        prop_assert_eq!(paid, plan.summary.fees_paid);
        // Every assigned validator gets exactly one accuracy update.
        prop_assert_eq!(plan.registry.len(), votes.len());
    }

    #[test]
    fn full_participation_always_decides(votes in prop::collection::vec((1u64..1_000_000, any::<bool>()), 1..12)) {
        let votes: Vec<(u64, Option<bool>)> = votes.into_iter().map(|(w, c)| (w, Some(c))).collect();
        let v = validation(0, &votes);
        let tally = Tally::of(&v);
        let outcome = WeightedVotingEngine::new(1).evaluate(&tally, true);
        prop_assert!(outcome.is_some());
        if tally.approve == tally.reject {
            prop_assert_eq!(outcome, Some(Outcome::Rejected));
        }
    }

    #[test]
    fn early_decision_needs_a_strict_majority(votes in votes()) {
        let v = validation(0, &votes);
        let tally = Tally::of(&v);
        if let Some(outcome) = WeightedVotingEngine::new(1).evaluate(&tally, false) {
            let side = match outcome {
                Outcome::Approved => tally.approve,
                Outcome::Rejected => tally.reject,
            };
            prop_assert!(side * 2 > tally.total);
        }
    }
}
