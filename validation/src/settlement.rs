//! Settlement: fee payouts, accuracy updates and slashing.
//!
//! Settling is split in two. A pure plan is computed from the validation
//! (ledger steps with deterministic idempotency keys, plus registry updates),
//! then executed: every ledger step first, registry updates only once all
//! ledger steps succeeded. A failed plan is kept on the validation and
//! re-executed verbatim on retry, so the ledger sees the same keys and
//! amounts and dedups what already went through.
//!
//! On finalization with outcome O:
//! - voters with O: accuracy up, share of the validation fee by weight
//! - voters against O: accuracy down, nothing slashed
//! - non-voters: flat absence penalty
//!
//! On a dispute:
//! - Overturned: voters with the original outcome are slashed and marked
//!   incorrect, voters with the new outcome are marked correct; the
//!   challenger gets the stake back plus a bonus from the slashed total and
//!   the rest is burned. Fees already paid stay paid.
//! - Upheld: the challenger's escrowed stake is forfeited.

use crate::dispute::{Dispute, DisputeResolution};
use crate::state::{Outcome, Validation};
use oracle_ledger::{IdempotencyKey, LedgerError, TokenLedger};
use oracle_types::{apply_bps, mul_div, Address, DisputeId, OracleParams, Timestamp, ValidationId};
use oracle_validators::ValidatorRegistry;
use serde::{Deserialize, Serialize};

const FINALIZE_PHASE: &str = "finalize";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettlementKind {
    Finalization,
    Dispute {
        dispute: DisputeId,
        resolution: DisputeResolution,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerAction {
    Release,
    Slash,
    PayFee,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerStep {
    pub key: IdempotencyKey,
    pub action: LedgerAction,
    pub account: Address,
    pub amount: u128,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegistryUpdate {
    Correct(Address),
    Incorrect(Address),
    Absent(Address),
    Slash { validator: Address, amount: u128 },
}

/// Planned totals, reported in events.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementSummary {
    pub fees_paid: u128,
    pub slashed: u128,
    pub challenger_bonus: u128,
    pub burned: u128,
    pub challenger_forfeit: u128,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementPlan {
    pub validation: ValidationId,
    pub kind: SettlementKind,
    /// Outcome being settled.
    pub outcome: Outcome,
    pub ledger: Vec<LedgerStep>,
    pub registry: Vec<RegistryUpdate>,
    pub summary: SettlementSummary,
}

/// Plan the settlement of a decided validation.
pub fn plan_finalization(validation: &Validation, outcome: Outcome) -> SettlementPlan {
    let winning_weight: u128 = validation
        .votes
        .values()
        .filter(|v| outcome.backed_by(v.choice))
        .map(|v| v.weight)
        .sum();
    let fee = validation.config.validation_fee;

    let mut ledger = Vec::new();
    let mut registry = Vec::new();
    let mut fees_paid = 0u128;

    // Assignment order keeps plans stable across recomputation.
    for assignment in &validation.assigned {
        let address = &assignment.validator;
        match validation.votes.get(address) {
            Some(vote) if outcome.backed_by(vote.choice) => {
                let share = mul_div(fee, vote.weight, winning_weight);
                if share > 0 {
                    ledger.push(LedgerStep {
                        key: IdempotencyKey::settlement(validation.id, FINALIZE_PHASE, "fee", address),
                        action: LedgerAction::PayFee,
                        account: address.clone(),
                        amount: share,
                    });
                    fees_paid += share;
                }
                registry.push(RegistryUpdate::Correct(address.clone()));
            }
            Some(_) => registry.push(RegistryUpdate::Incorrect(address.clone())),
            None => registry.push(RegistryUpdate::Absent(address.clone())),
        }
    }

    SettlementPlan {
        validation: validation.id,
        kind: SettlementKind::Finalization,
        outcome,
        ledger,
        registry,
        summary: SettlementSummary {
            fees_paid,
            ..SettlementSummary::default()
        },
    }
}

/// Plan the settlement of a resolved dispute.
///
/// `original` is the outcome the dispute was raised against; `stake_of`
/// reports each validator's current registry stake.
pub fn plan_dispute(
    validation: &Validation,
    dispute: &Dispute,
    resolution: DisputeResolution,
    original: Outcome,
    stake_of: impl Fn(&Address) -> u128,
    params: &OracleParams,
) -> SettlementPlan {
    let phase = dispute.id.to_string();
    let key = |op: &str, account: &Address| IdempotencyKey::settlement(validation.id, &phase, op, account);
    let challenger = &dispute.raised_by;

    let mut ledger = Vec::new();
    let mut registry = Vec::new();
    let mut summary = SettlementSummary::default();

    let outcome = match resolution {
        DisputeResolution::Upheld => {
            ledger.push(LedgerStep {
                key: key("forfeit", challenger),
                action: LedgerAction::Slash,
                account: challenger.clone(),
                amount: dispute.challenger_stake,
            });
            summary.challenger_forfeit = dispute.challenger_stake;
            original
        }
        DisputeResolution::Overturned => {
            for assignment in &validation.assigned {
                let address = &assignment.validator;
                let Some(vote) = validation.votes.get(address) else {
                    continue;
                };
                if original.backed_by(vote.choice) {
                    let amount = apply_bps(stake_of(address), params.slash_bps);
                    // A slash that rounds to zero leaves stake and status alone.
                    if amount > 0 {
                        ledger.push(LedgerStep {
                            key: key("slash", address),
                            action: LedgerAction::Slash,
                            account: address.clone(),
                            amount,
                        });
                        registry.push(RegistryUpdate::Slash {
                            validator: address.clone(),
                            amount,
                        });
                    }
                    summary.slashed += amount;
                    registry.push(RegistryUpdate::Incorrect(address.clone()));
                } else {
                    registry.push(RegistryUpdate::Correct(address.clone()));
                }
            }

            summary.challenger_bonus = apply_bps(summary.slashed, params.slash_redistribution_bps);
            summary.burned = summary.slashed - summary.challenger_bonus;
            ledger.push(LedgerStep {
                key: key("release", challenger),
                action: LedgerAction::Release,
                account: challenger.clone(),
                amount: dispute.challenger_stake,
            });
            if summary.challenger_bonus > 0 {
                ledger.push(LedgerStep {
                    key: key("bonus", challenger),
                    action: LedgerAction::PayFee,
                    account: challenger.clone(),
                    amount: summary.challenger_bonus,
                });
            }
            original.flipped()
        }
    };

    SettlementPlan {
        validation: validation.id,
        kind: SettlementKind::Dispute {
            dispute: dispute.id,
            resolution,
        },
        outcome,
        ledger,
        registry,
        summary,
    }
}

/// Run every ledger step in order, stopping at the first failure.
pub fn execute_ledger(plan: &SettlementPlan, ledger: &dyn TokenLedger) -> Result<(), LedgerError> {
    for step in &plan.ledger {
        match step.action {
            LedgerAction::Release => ledger.release_stake(&step.key, &step.account, step.amount)?,
            LedgerAction::PayFee => ledger.pay_fee(&step.key, &step.account, step.amount)?,
            LedgerAction::Slash => {
                let actual = ledger.slash(&step.key, &step.account, step.amount)?;
                if actual < step.amount {
                    tracing::warn!(
                        validation = %plan.validation,
                        account = %step.account,
                        planned = step.amount,
                        actual,
                        "ledger slashed less than planned"
                    );
                }
            }
        }
    }
    Ok(())
}

/// Apply the registry side of a plan. Call only after the ledger side succeeded.
///
/// Updates for validators missing from the registry are skipped and logged.
pub fn apply_registry(plan: &SettlementPlan, registry: &mut ValidatorRegistry, now: Timestamp) {
    for update in &plan.registry {
        let result = match update {
            RegistryUpdate::Correct(a) => registry.record_correct(a, now).map(|_| ()),
            RegistryUpdate::Incorrect(a) => registry.record_incorrect(a, now).map(|_| ()),
            RegistryUpdate::Absent(a) => registry.penalize_absence(a, now).map(|_| ()),
            RegistryUpdate::Slash { validator, amount } => {
                registry.slash_capped(validator, *amount, now).map(|_| ())
            }
        };
        if let Err(e) = result {
            tracing::error!(validation = %plan.validation, ?update, error = %e, "registry update skipped");
        }
    }
}
