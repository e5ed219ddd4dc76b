// `FlightSurety`: the request/response surface of the registry.
//
// Each mutating method is one atomic transaction against the Registry Store.
// The facade relays into the data layer under its own identity (`app_id`), which
// must be on the caller allow-list; the real invoker is passed explicitly as
// `caller`. Read methods never fail and never mutate.

use crate::access;
use crate::airline::{self, AirlineRegistration};
use crate::config::DeploymentConfig;
use crate::error::{ConfigError, StoreError, SuretyError};
use crate::event::SuretyEvent;
use crate::flight::{self, FlightBuffer};
use crate::insurance::{self, PayoutSink, PolicyView};
use crate::ledger::{EventJournal, JournalError, JournalEntry};
use crate::oracle::{self, IndexSource, ResponseOutcome, SeededIndexSource};
use crate::storage::SnapshotStore;
use crate::store::{Registry, RegistryState, Txn};
use crate::types::{Address, Amount, FlightKey, Hash, flight_key};
use tracing::{info, warn};

/// Result of a committed operation plus the events it emitted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Receipt<T> {
    pub value: T,
    pub events: Vec<SuretyEvent>,
}

impl<T> Receipt<T> {
    pub fn emitted(&self, name: &str) -> bool {
        self.events.iter().any(|e| e.name() == name)
    }
}

pub struct FlightSurety {
    config: DeploymentConfig,
    registry: Registry,
    indexes: Box<dyn IndexSource + Send>,
}

impl FlightSurety {
    /// Fresh in-memory deployment.
    pub fn deploy(config: DeploymentConfig) -> Result<Self, SuretyError> {
        Self::deploy_into(config, None)
    }

    /// Restore from `store` if it holds a snapshot, otherwise deploy fresh and persist.
    pub fn open(config: DeploymentConfig, store: SnapshotStore) -> Result<Self, SuretyError> {
        config.validate()?;
        let Some(snap) = store.load()? else {
            return Self::deploy_into(config, Some(store));
        };
        snap.journal.verify().map_err(|e| match e {
            JournalError::BrokenLink { seq } | JournalError::BadHash { seq } => {
                StoreError::Corrupt(seq)
            }
        })?;
        if snap.state.owner != config.owner {
            return Err(ConfigError::OwnerMismatch {
                configured: config.owner,
                restored: snap.state.owner,
            }
            .into());
        }
        info!(
            path = %store.path().display(),
            events = snap.journal.len(),
            "registry restored from snapshot"
        );
        let indexes = Box::new(SeededIndexSource::new(config.rng_seed ^ snap.journal.len() as u64));
        let mut registry = Registry::new(snap.state, snap.journal, Some(store));

        // The allow-list is restored as persisted; a new app_id must be admitted by the owner.
        let owner = config.owner;
        let app_id = config.app_id;
        if !registry.state().authorized_callers.contains(&app_id) {
            if config.authorize_app {
                registry.transact("authorize_app", |tx| access::authorize_caller(tx, app_id, owner))?;
            } else {
                warn!(%app_id, "restored registry does not authorize this app; mutations will be rejected");
            }
        }
        Ok(Self {
            config,
            registry,
            indexes,
        })
    }

    fn deploy_into(config: DeploymentConfig, store: Option<SnapshotStore>) -> Result<Self, SuretyError> {
        config.validate()?;
        let mut registry = Registry::new(RegistryState::new(config.owner), EventJournal::new(), store);
        let owner = config.owner;
        let first = config.first_airline();
        let app_id = config.app_id;
        let authorize_app = config.authorize_app;
        registry.transact("deploy", |tx| {
            if authorize_app {
                access::authorize_caller(tx, app_id, owner)?;
            }
            airline::register_genesis(tx, first, owner);
            Ok(())
        })?;
        info!(%owner, first_airline = %first, "registry deployed");
        let indexes = Box::new(SeededIndexSource::new(config.rng_seed));
        Ok(Self {
            config,
            registry,
            indexes,
        })
    }

    /// Swap the oracle index randomness, e.g. for scripted tests.
    pub fn with_index_source(mut self, source: Box<dyn IndexSource + Send>) -> Self {
        self.indexes = source;
        self
    }

    pub fn config(&self) -> &DeploymentConfig {
        &self.config
    }

    pub fn state(&self) -> &RegistryState {
        self.registry.state()
    }

    fn relay<T>(
        &mut self,
        op: &'static str,
        f: impl FnOnce(&mut Txn) -> Result<T, SuretyError>,
    ) -> Result<Receipt<T>, SuretyError> {
        let app_id = self.config.app_id;
        let (value, events) = self.registry.transact(op, |tx| {
            access::guard(tx.state(), app_id)?;
            f(tx)
        })?;
        Ok(Receipt { value, events })
    }

    // ---- operations and settings ----

    pub fn is_operational(&self) -> bool {
        self.state().operational
    }

    pub fn set_operating_status(&mut self, operational: bool, caller: Address) -> Result<Receipt<()>, SuretyError> {
        let (value, events) = self
            .registry
            .transact("set_operating_status", |tx| access::set_operational(tx, operational, caller))?;
        Ok(Receipt { value, events })
    }

    pub fn authorize_caller(&mut self, target: Address, caller: Address) -> Result<Receipt<()>, SuretyError> {
        let (value, events) = self
            .registry
            .transact("authorize_caller", |tx| access::authorize_caller(tx, target, caller))?;
        Ok(Receipt { value, events })
    }

    pub fn deauthorize_caller(&mut self, target: Address, caller: Address) -> Result<Receipt<()>, SuretyError> {
        let (value, events) = self
            .registry
            .transact("deauthorize_caller", |tx| access::deauthorize_caller(tx, target, caller))?;
        Ok(Receipt { value, events })
    }

    pub fn is_authorized_caller(&self, addr: &Address) -> bool {
        self.state().authorized_callers.contains(addr)
    }

    pub fn fund_contract(&mut self, value: Amount, caller: Address) -> Result<Receipt<Amount>, SuretyError> {
        self.relay("fund_contract", |tx| {
            if value == 0 {
                return Err(SuretyError::InvalidAmount { got: 0, max: Amount::MAX });
            }
            let state = tx.state_mut();
            state.treasury = state.treasury.saturating_add(value);
            let treasury = state.treasury;
            info!(funder = %caller, value, treasury, "contract funded");
            tx.emit(SuretyEvent::Fund { funder: caller, value });
            Ok(treasury)
        })
    }

    pub fn treasury_balance(&self) -> Amount {
        self.state().treasury
    }

    // ---- airlines ----

    pub fn register_airline(
        &mut self,
        candidate: Address,
        caller: Address,
    ) -> Result<Receipt<AirlineRegistration>, SuretyError> {
        let consensus = self.config.consensus.clone();
        self.relay("register_airline", |tx| {
            airline::register_airline(tx, &consensus, candidate, caller)
        })
    }

    pub fn activate_airline(&mut self, stake: Amount, caller: Address) -> Result<Receipt<()>, SuretyError> {
        let fees = self.config.fees.clone();
        self.relay("activate_airline", |tx| airline::activate_airline(tx, &fees, caller, stake))
    }

    pub fn is_airline(&self, addr: &Address) -> bool {
        self.state().is_airline(addr)
    }

    pub fn is_active(&self, addr: &Address) -> bool {
        self.state().is_active(addr)
    }

    /// Registration status of `airline`.
    pub fn fetch_airline_status(&self, airline: &Address) -> bool {
        self.is_airline(airline)
    }

    /// (votes cast, votes required) for a candidate airline.
    pub fn airline_votes(&self, candidate: &Address) -> (usize, usize) {
        airline::vote_progress(self.state(), &self.config.consensus, candidate)
    }

    // ---- flights ----

    pub fn register_flight(
        &mut self,
        airline: Address,
        designator: &str,
        timestamp: u64,
        caller: Address,
    ) -> Result<Receipt<FlightKey>, SuretyError> {
        self.relay("register_flight", |tx| {
            flight::register_flight(tx, airline, designator, timestamp, caller)
        })
    }

    pub fn fetch_flight_buffer(&self, airline: &Address, designator: &str) -> FlightBuffer {
        flight::fetch_flight(self.state(), airline, designator)
    }

    pub fn get_flight_key(&self, airline: &Address, designator: &str, timestamp: u64) -> FlightKey {
        flight_key(airline, designator, timestamp)
    }

    // ---- insurance ----

    pub fn buy(
        &mut self,
        airline: Address,
        designator: &str,
        payment: Amount,
        caller: Address,
    ) -> Result<Receipt<FlightKey>, SuretyError> {
        let fees = self.config.fees.clone();
        self.relay("buy", |tx| insurance::buy(tx, &fees, airline, designator, payment, caller))
    }

    pub fn fetch_flight_insured(&self, passenger: &Address, airline: &Address, designator: &str) -> PolicyView {
        insurance::fetch_flight_insured(self.state(), passenger, airline, designator)
    }

    pub fn get_balance(&self, caller: &Address) -> Amount {
        self.state().balance(caller)
    }

    pub fn withdraw_funds(
        &mut self,
        caller: Address,
        sink: &mut dyn PayoutSink,
    ) -> Result<Receipt<Amount>, SuretyError> {
        self.relay("withdraw_funds", |tx| insurance::withdraw_funds(tx, caller, sink))
    }

    // ---- oracles ----

    pub fn register_oracle(&mut self, fee: Amount, caller: Address) -> Result<Receipt<[u8; 3]>, SuretyError> {
        let app_id = self.config.app_id;
        let fees = &self.config.fees;
        let consensus = &self.config.consensus;
        let source = self.indexes.as_mut();
        let (value, events) = self.registry.transact("register_oracle", |tx| {
            access::guard(tx.state(), app_id)?;
            oracle::register_oracle(tx, fees, consensus, source, caller, fee)
        })?;
        Ok(Receipt { value, events })
    }

    pub fn get_my_indexes(&self, caller: &Address) -> Result<[u8; 3], SuretyError> {
        oracle::get_my_indexes(self.state(), caller)
    }

    pub fn is_oracle(&self, addr: &Address) -> bool {
        self.state().oracle(addr).is_some()
    }

    /// Opens a status request; the receipt carries the drawn index.
    pub fn fetch_flight_status(
        &mut self,
        airline: Address,
        designator: &str,
        timestamp: u64,
        caller: Address,
    ) -> Result<Receipt<u8>, SuretyError> {
        let app_id = self.config.app_id;
        let consensus = &self.config.consensus;
        let source = self.indexes.as_mut();
        let (value, events) = self.registry.transact("fetch_flight_status", |tx| {
            access::guard(tx.state(), app_id)?;
            oracle::fetch_flight_status(tx, consensus, source, airline, designator, timestamp, caller)
                .map(|(index, _)| index)
        })?;
        Ok(Receipt { value, events })
    }

    #[allow(clippy::too_many_arguments)]
    pub fn submit_oracle_response(
        &mut self,
        index: u8,
        airline: Address,
        designator: &str,
        timestamp: u64,
        status_code: u8,
        caller: Address,
    ) -> Result<Receipt<ResponseOutcome>, SuretyError> {
        let consensus = self.config.consensus.clone();
        let fees = self.config.fees.clone();
        self.relay("submit_oracle_response", |tx| {
            oracle::submit_oracle_response(
                tx,
                &consensus,
                &fees,
                index,
                airline,
                designator,
                timestamp,
                status_code,
                caller,
            )
        })
    }

    // ---- audit ----

    pub fn journal(&self) -> &[JournalEntry] {
        self.registry.journal().entries()
    }

    pub fn journal_root(&self) -> Option<Hash> {
        self.registry.journal().merkle_root()
    }
}
