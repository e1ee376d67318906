//! The validator registry: the single owner of stake, status and accuracy.

use crate::error::RegistryError;
use crate::journal::{RegistryChange, RegistryEntry, StakeDelta, StakeReason};
use crate::selection::weighted_sample;
use crate::validator::{Validator, ValidatorStatus};
use oracle_sectors::SectorConfigStore;
use oracle_types::{apply_bps, Address, OracleParams, SectorId, Timestamp};
use std::collections::{BTreeMap, BTreeSet};

/// Registry of every validator ever registered, plus its mutation journal.
///
/// Not internally synchronized; the oracle keeps it behind a lock.
pub struct ValidatorRegistry {
    params: OracleParams,
    validators: BTreeMap<Address, Validator>,
    journal: Vec<RegistryEntry>,
}

impl ValidatorRegistry {
    pub fn new(params: OracleParams) -> Self {
        Self {
            params,
            validators: BTreeMap::new(),
            journal: Vec::new(),
        }
    }

    /// Rebuild a registry by applying `entries` in order.
    ///
    /// Fails on gaps in the sequence or on changes that could not have been
    /// produced by a live registry (unknown validator, negative stake).
    pub fn replay(params: OracleParams, entries: &[RegistryEntry]) -> Result<Self, RegistryError> {
        let mut registry = Self::new(params);
        for entry in entries {
            if entry.seq != registry.journal.len() as u64 {
                return Err(RegistryError::CorruptJournal {
                    seq: entry.seq,
                    reason: format!("expected seq {}", registry.journal.len()),
                });
            }
            registry
                .apply(&entry.address, &entry.change, entry.at)
                .map_err(|reason| RegistryError::CorruptJournal {
                    seq: entry.seq,
                    reason,
                })?;
            registry.journal.push(entry.clone());
        }
        Ok(registry)
    }

    // ── Queries ─────────────────────────────────────────────────────────

    pub fn params(&self) -> &OracleParams {
        &self.params
    }

    pub fn get(&self, address: &Address) -> Option<&Validator> {
        self.validators.get(address)
    }

    /// All validators ordered by address.
    pub fn validators(&self) -> impl Iterator<Item = &Validator> {
        self.validators.values()
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    pub fn journal(&self) -> &[RegistryEntry] {
        &self.journal
    }

    /// Current voting power of a validator.
    pub fn vote_weight(&self, address: &Address) -> Result<u128, RegistryError> {
        Ok(self.require(address)?.vote_weight())
    }

    /// Select up to `count` active validators serving `sector`.
    ///
    /// Sampling is weighted by `accuracy_bps + min_selection_weight_bps` and
    /// fully determined by `seed` and the registry contents.
    pub fn assignable(&self, sector: &SectorId, seed: &[u8; 32], count: usize) -> Vec<Address> {
        let floor = self.params.min_selection_weight_bps as u64;
        let candidates: Vec<(Address, u64)> = self
            .validators
            .values()
            .filter(|v| v.is_active() && v.serves(sector) && v.staked_amount > 0)
            .map(|v| (v.address.clone(), v.accuracy_bps as u64 + floor))
            .collect();
        weighted_sample(&candidates, seed, count)
    }

    // ── Membership ──────────────────────────────────────────────────────

    /// Check that `register` would accept these arguments without changing anything.
    ///
    /// Lets callers escrow the stake externally before committing the record.
    pub fn check_registration(
        &self,
        address: &Address,
        stake: u128,
        sectors: &[SectorId],
        sector_store: &SectorConfigStore,
    ) -> Result<(), RegistryError> {
        if !address.is_valid() {
            return Err(RegistryError::InvalidAddress(address.clone()));
        }
        if sectors.is_empty() {
            return Err(RegistryError::NoSectors);
        }
        if self.validators.contains_key(address) {
            return Err(RegistryError::AlreadyRegistered(address.clone()));
        }
        let sectors: BTreeSet<SectorId> = sectors.iter().cloned().collect();
        check_stake_covers(&sectors, stake, sector_store)
    }

    /// Register a new validator serving `sectors` with an initial stake.
    ///
    /// The stake must meet the minimum of every listed sector.
    pub fn register(
        &mut self,
        address: Address,
        stake: u128,
        sectors: &[SectorId],
        sector_store: &SectorConfigStore,
        now: Timestamp,
    ) -> Result<&Validator, RegistryError> {
        self.check_registration(&address, stake, sectors, sector_store)?;
        let sectors: BTreeSet<SectorId> = sectors.iter().cloned().collect();
        let change = RegistryChange::Registered {
            stake,
            sectors: sectors.into_iter().collect(),
            accuracy_bps: self.params.initial_accuracy_bps,
        };
        self.commit(&address, change, now)?;
        tracing::info!(validator = %address, stake, "validator registered");
        self.require(&address)
    }

    /// Remove a validator from assignment. Returns `false` if it was not active.
    pub fn suspend(&mut self, address: &Address, now: Timestamp) -> Result<bool, RegistryError> {
        let status = self.require(address)?.status;
        if status != ValidatorStatus::Active {
            return Ok(false);
        }
        self.set_status(address, ValidatorStatus::Suspended, now)?;
        tracing::info!(validator = %address, "validator suspended");
        Ok(true)
    }

    /// Return a suspended or slashed validator to the active pool.
    ///
    /// The remaining stake must still meet every served sector's minimum.
    /// Returns `false` if the validator was already active.
    pub fn reactivate(
        &mut self,
        address: &Address,
        sector_store: &SectorConfigStore,
        now: Timestamp,
    ) -> Result<bool, RegistryError> {
        let validator = self.require(address)?;
        if validator.is_active() {
            return Ok(false);
        }
        check_stake_covers(&validator.sectors, validator.staked_amount, sector_store)?;
        self.set_status(address, ValidatorStatus::Active, now)?;
        tracing::info!(validator = %address, "validator reactivated");
        Ok(true)
    }

    // ── Stake ───────────────────────────────────────────────────────────

    /// Change a validator's stake. Returns the new stake.
    ///
    /// A decrease larger than the current stake fails; it is never clamped.
    pub fn apply_stake_delta(
        &mut self,
        address: &Address,
        delta: StakeDelta,
        reason: StakeReason,
        now: Timestamp,
    ) -> Result<u128, RegistryError> {
        let stake = self.require(address)?.staked_amount;
        if let StakeDelta::Decrease(requested) = delta {
            if requested > stake {
                return Err(RegistryError::StakeWouldGoNegative {
                    address: address.clone(),
                    stake,
                    requested,
                });
            }
        }
        if delta.amount() == 0 {
            return Ok(stake);
        }
        self.commit(address, RegistryChange::Stake { delta, reason }, now)?;
        let new_stake = self.require(address)?.staked_amount;
        tracing::debug!(validator = %address, %reason, ?delta, new_stake, "stake changed");
        Ok(new_stake)
    }

    /// Slash up to `amount` and mark the validator `Slashed`.
    ///
    /// Returns the amount actually removed, which is `min(amount, stake)`.
    /// Nothing changes, status included, when that amount is zero.
    pub fn slash_capped(
        &mut self,
        address: &Address,
        amount: u128,
        now: Timestamp,
    ) -> Result<u128, RegistryError> {
        let stake = self.require(address)?.staked_amount;
        let actual = amount.min(stake);
        if actual == 0 {
            return Ok(0);
        }
        self.apply_stake_delta(address, StakeDelta::Decrease(actual), StakeReason::Slash, now)?;
        if self.require(address)?.status != ValidatorStatus::Slashed {
            self.set_status(address, ValidatorStatus::Slashed, now)?;
        }
        tracing::warn!(validator = %address, requested = amount, slashed = actual, "validator slashed");
        Ok(actual)
    }

    // ── Accuracy ────────────────────────────────────────────────────────

    /// Move accuracy toward 100 by the EWMA factor. Returns the new value in bps.
    pub fn record_correct(&mut self, address: &Address, now: Timestamp) -> Result<u32, RegistryError> {
        let old = self.require(address)?.accuracy_bps;
        let step = apply_bps((10_000 - old.min(10_000)) as u128, self.params.accuracy_ewma_alpha_bps) as u32;
        self.set_accuracy(address, old + step, now)
    }

    /// Move accuracy toward 0 by the EWMA factor. Returns the new value in bps.
    pub fn record_incorrect(&mut self, address: &Address, now: Timestamp) -> Result<u32, RegistryError> {
        let old = self.require(address)?.accuracy_bps;
        let step = apply_bps(old as u128, self.params.accuracy_ewma_alpha_bps) as u32;
        self.set_accuracy(address, old - step, now)
    }

    /// Subtract the flat absence penalty, floored at zero.
    pub fn penalize_absence(&mut self, address: &Address, now: Timestamp) -> Result<u32, RegistryError> {
        let old = self.require(address)?.accuracy_bps;
        let new = old.saturating_sub(self.params.absence_penalty_bps);
        self.set_accuracy(address, new, now)
    }

    // ── Internals ───────────────────────────────────────────────────────

    fn require(&self, address: &Address) -> Result<&Validator, RegistryError> {
        self.validators
            .get(address)
            .ok_or_else(|| RegistryError::NotFound(address.clone()))
    }

    fn set_status(
        &mut self,
        address: &Address,
        to: ValidatorStatus,
        now: Timestamp,
    ) -> Result<(), RegistryError> {
        let from = self.require(address)?.status;
        self.commit(address, RegistryChange::Status { from, to }, now)
    }

    fn set_accuracy(&mut self, address: &Address, to_bps: u32, now: Timestamp) -> Result<u32, RegistryError> {
        let from_bps = self.require(address)?.accuracy_bps;
        if from_bps != to_bps {
            self.commit(address, RegistryChange::Accuracy { from_bps, to_bps }, now)?;
        }
        Ok(to_bps)
    }

    /// Apply a change and append it to the journal.
    fn commit(&mut self, address: &Address, change: RegistryChange, now: Timestamp) -> Result<(), RegistryError> {
        let seq = self.journal.len() as u64;
        self.apply(address, &change, now)
            .map_err(|reason| RegistryError::CorruptJournal { seq, reason })?;
        self.journal.push(RegistryEntry {
            seq,
            address: address.clone(),
            change,
            at: now,
        });
        Ok(())
    }

    fn apply(&mut self, address: &Address, change: &RegistryChange, at: Timestamp) -> Result<(), String> {
        match change {
            RegistryChange::Registered {
                stake,
                sectors,
                accuracy_bps,
            } => {
                if self.validators.contains_key(address) {
                    return Err(format!("{address} registered twice"));
                }
                self.validators.insert(
                    address.clone(),
                    Validator {
                        address: address.clone(),
                        staked_amount: *stake,
                        sectors: sectors.iter().cloned().collect(),
                        accuracy_bps: *accuracy_bps,
                        status: ValidatorStatus::Active,
                        joined_at: at,
                    },
                );
            }
            RegistryChange::Stake { delta, .. } => {
                let validator = self.existing_mut(address)?;
                validator.staked_amount = match delta {
                    StakeDelta::Increase(a) => validator
                        .staked_amount
                        .checked_add(*a)
                        .ok_or_else(|| format!("stake of {address} overflows"))?,
                    StakeDelta::Decrease(a) => validator
                        .staked_amount
                        .checked_sub(*a)
                        .ok_or_else(|| format!("stake of {address} goes negative"))?,
                };
            }
            RegistryChange::Status { to, .. } => self.existing_mut(address)?.status = *to,
            RegistryChange::Accuracy { to_bps, .. } => {
                self.existing_mut(address)?.accuracy_bps = *to_bps
            }
        }
        Ok(())
    }

    fn existing_mut(&mut self, address: &Address) -> Result<&mut Validator, String> {
        self.validators
            .get_mut(address)
            .ok_or_else(|| format!("{address} not registered"))
    }
}

fn check_stake_covers(
    sectors: &BTreeSet<SectorId>,
    stake: u128,
    sector_store: &SectorConfigStore,
) -> Result<(), RegistryError> {
    for sector in sectors {
        let needed = sector_store.min_validator_stake(sector)?;
        if stake < needed {
            return Err(RegistryError::InsufficientStake {
                sector: sector.clone(),
                needed,
                provided: stake,
            });
        }
    }
    Ok(())
}
