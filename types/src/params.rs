//! Engine parameters: the tunable constants of voting, reputation and slashing.
//!
//! Per-sector policy (quorum, fees, windows) lives in the sector configuration;
//! these values apply to every sector.

use serde::{Deserialize, Serialize};

/// Tunable constants shared by every sector.
///
/// All ratios are basis points (10 000 = 100%).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleParams {
    // ── Reputation ───────────────────────────────────────────────────────
    /// Accuracy assigned to newly registered validators (5000 = 50/100).
    pub initial_accuracy_bps: u32,

    /// EWMA smoothing factor applied when a vote is scored correct or incorrect.
    /// `new = old + (target - old) * alpha`, where target is 100% or 0%.
    pub accuracy_ewma_alpha_bps: u32,

    /// Flat accuracy deduction for an assigned validator that never voted.
    pub absence_penalty_bps: u32,

    /// Floor added to every validator's selection weight so that validators
    /// with low or fresh accuracy can still be drawn.
    pub min_selection_weight_bps: u32,

    // ── Voting ───────────────────────────────────────────────────────────
    /// Margin above 50% a side must reach to finalize before every assigned
    /// validator has voted. Keeps an exact split from finalizing early.
    pub early_finalization_epsilon_bps: u32,

    // ── Disputes ─────────────────────────────────────────────────────────
    /// Share of stake slashed from each validator that voted with an outcome
    /// later overturned by dispute.
    pub slash_bps: u32,

    /// Share of the slashed total paid to the successful challenger as a bonus.
    /// The remainder is burned.
    pub slash_redistribution_bps: u32,
}

impl OracleParams {
    pub fn oracle_defaults() -> Self {
        Self {
            initial_accuracy_bps: 5_000,
            accuracy_ewma_alpha_bps: 1_000,
            absence_penalty_bps: 200,
            min_selection_weight_bps: 500,
            early_finalization_epsilon_bps: 1,
            slash_bps: 1_000,
            slash_redistribution_bps: 10_000,
        }
    }

    /// Check that every basis-point field is within `0..=10_000`.
    pub fn validate(&self) -> Result<(), String> {
        let fields = [
            ("initial_accuracy_bps", self.initial_accuracy_bps),
            ("accuracy_ewma_alpha_bps", self.accuracy_ewma_alpha_bps),
            ("absence_penalty_bps", self.absence_penalty_bps),
            ("min_selection_weight_bps", self.min_selection_weight_bps),
            (
                "early_finalization_epsilon_bps",
                self.early_finalization_epsilon_bps,
            ),
            ("slash_bps", self.slash_bps),
            ("slash_redistribution_bps", self.slash_redistribution_bps),
        ];
        for (name, value) in fields {
            if value > 10_000 {
                return Err(format!("{name} must be at most 10000, got {value}"));
            }
        }
        if self.early_finalization_epsilon_bps == 0 {
            return Err("early_finalization_epsilon_bps must be positive".into());
        }
        Ok(())
    }
}

impl Default for OracleParams {
    fn default() -> Self {
        Self::oracle_defaults()
    }
}
