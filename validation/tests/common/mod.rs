#![allow(dead_code)]

use oracle_nullables::{NullClock, NullLedger};
use oracle_sectors::{EntityTypeConfig, SectorConfigStore, SectorPolicy};
use oracle_types::{Address, EntityType, OracleParams, SectorId, Timestamp, SECS_PER_DAY};
use oracle_validation::{OracleEvent, OracleSettings, QualityOracle, SubmitRequest, Validation, VoteChoice};
use std::sync::Arc;

pub const SECTOR: &str = "market";
pub const STAKE: u128 = 1_000;
pub const FEE: u128 = 900;
pub const COLLATERAL: u128 = 50;
pub const VOTING_WINDOW: u64 = 3_600;
pub const DISPUTE_DAYS: u32 = 7;
pub const START: u64 = 1_700_000_000;

pub struct Harness {
    pub oracle: Arc<QualityOracle>,
    pub ledger: Arc<NullLedger>,
    pub clock: Arc<NullClock>,
    pub validators: Vec<Address>,
}

pub fn judge() -> Address {
    Address::from("judge")
}

pub fn settings() -> OracleSettings {
    settings_with(OracleParams::default())
}

pub fn settings_with(params: OracleParams) -> OracleSettings {
    OracleSettings {
        params,
        selection_seed: [7u8; 32],
        arbitrators: vec![judge()],
    }
}

pub fn product_config(quorum_size: u32) -> EntityTypeConfig {
    EntityTypeConfig {
        quorum_size,
        validation_fee: FEE,
        required_collateral: COLLATERAL,
        dispute_timeout_days: DISPUTE_DAYS,
        voting_window_secs: VOTING_WINDOW,
        ..EntityTypeConfig::defaults_for(SectorId::from(SECTOR), EntityType::Product)
    }
}

/// An oracle with one sector, `validators` funded and registered validators,
/// and a product config with the given quorum.
pub fn harness(quorum_size: u32, validators: usize) -> Harness {
    harness_with(OracleParams::default(), quorum_size, validators)
}

pub fn harness_with(params: OracleParams, quorum_size: u32, validators: usize) -> Harness {
    let ledger = Arc::new(NullLedger::new());
    let clock = Arc::new(NullClock::new(START));
    let sectors = Arc::new(SectorConfigStore::new());
    let oracle = QualityOracle::new(settings_with(params), sectors, ledger.clone(), clock.clone())
        .expect("valid settings");
    oracle
        .upsert_sector(SectorPolicy::new(SECTOR, 100))
        .expect("sector");
    oracle
        .upsert_entity_type_config(product_config(quorum_size))
        .expect("config");

    let validators: Vec<Address> = (0..validators)
        .map(|i| Address::new(format!("val{i:02}")))
        .collect();
    for address in &validators {
        ledger.fund(address, STAKE);
        oracle
            .register_validator(address.clone(), STAKE, &[SectorId::from(SECTOR)])
            .expect("register");
    }
    oracle.drain_events();

    Harness {
        oracle: Arc::new(oracle),
        ledger,
        clock,
        validators,
    }
}

impl Harness {
    pub fn submit(&self, entity: &str) -> Validation {
        self.oracle
            .submit_entity(SubmitRequest::new(entity, SECTOR, EntityType::Product))
            .expect("submit")
    }

    pub fn vote(&self, validation: &Validation, index: usize, choice: VoteChoice) {
        self.oracle
            .cast_vote(validation.id, &validation.assigned[index].validator, choice, "checked")
            .expect("vote");
    }

    /// Submit and decide with the first `approvals` assigned voting Approve.
    pub fn finalized(&self, entity: &str, approvals: usize) -> Validation {
        let v = self.submit(entity);
        for i in 0..approvals {
            self.vote(&v, i, VoteChoice::Approve);
        }
        self.oracle.validation(v.id).expect("validation")
    }

    pub fn now(&self) -> Timestamp {
        Timestamp::new(self.clock_secs())
    }

    pub fn clock_secs(&self) -> u64 {
        use oracle_types::Clock;
        self.clock.now().as_secs()
    }

    pub fn accuracy(&self, address: &Address) -> u32 {
        self.oracle.validator(address).expect("validator").accuracy_bps
    }

    pub fn stake(&self, address: &Address) -> u128 {
        self.oracle.validator(address).expect("validator").staked_amount
    }

    pub fn challenger(&self, name: &str, funds: u128) -> Address {
        let address = Address::new(name);
        self.ledger.fund(&address, funds);
        address
    }

    pub fn decided_events(&self) -> usize {
        self.oracle
            .drain_events()
            .iter()
            .filter(|e| matches!(e, OracleEvent::ValidationDecided { .. }))
            .count()
    }
}

pub fn dispute_window_secs() -> u64 {
    DISPUTE_DAYS as u64 * SECS_PER_DAY
}
