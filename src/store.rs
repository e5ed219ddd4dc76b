// Registry Store: the single owned, mutable state of the registry.
//
// Mutations happen only inside `Registry::transact`, which runs an operation
// against a working copy of `RegistryState` inside a `Txn`. The working copy
// (and the events it buffered) replaces the committed state only when the
// operation returns `Ok`; any error drops it, so a failed operation never leaves
// partial state behind.

use crate::error::SuretyError;
use crate::event::SuretyEvent;
use crate::ledger::EventJournal;
use crate::storage::SnapshotStore;
use crate::types::{Address, Amount, FlightKey, RequestKey, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AirlineRecord {
    pub registered: bool,
    pub active: bool,
    /// Active airlines that sponsored this airline's registration.
    pub votes: BTreeSet<Address>,
    pub stake: Amount,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightRecord {
    pub is_registered: bool,
    pub status: StatusCode,
    pub timestamp: u64,
    pub airline: Address,
    pub designator: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    pub is_insured: bool,
    pub amount_paid: Amount,
    pub credited_amount: Amount,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleRecord {
    pub is_registered: bool,
    pub indexes: [u8; 3],
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRequest {
    pub index: u8,
    pub airline: Address,
    pub designator: String,
    pub timestamp: u64,
    pub requester: Address,
    pub open: bool,
    /// One entry per responding oracle; tallied per status code.
    pub responses: BTreeMap<Address, StatusCode>,
    pub resolved: Option<StatusCode>,
}

impl StatusRequest {
    pub fn votes_for(&self, status: StatusCode) -> usize {
        self.responses.values().filter(|s| **s == status).count()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryState {
    pub owner: Address,
    pub operational: bool,
    pub authorized_callers: BTreeSet<Address>,
    pub airlines: BTreeMap<Address, AirlineRecord>,
    pub registered_airlines: usize,
    pub flights: BTreeMap<FlightKey, FlightRecord>,
    /// Latest registered schedule per (airline, designator).
    pub flight_index: BTreeMap<Address, BTreeMap<String, FlightKey>>,
    pub policies: BTreeMap<FlightKey, BTreeMap<Address, Policy>>,
    pub balances: BTreeMap<Address, Amount>,
    pub treasury: Amount,
    pub oracles: BTreeMap<Address, OracleRecord>,
    pub requests: BTreeMap<RequestKey, StatusRequest>,
}

impl RegistryState {
    pub fn new(owner: Address) -> Self {
        Self {
            owner,
            operational: true,
            authorized_callers: BTreeSet::new(),
            airlines: BTreeMap::new(),
            registered_airlines: 0,
            flights: BTreeMap::new(),
            flight_index: BTreeMap::new(),
            policies: BTreeMap::new(),
            balances: BTreeMap::new(),
            treasury: 0,
            oracles: BTreeMap::new(),
            requests: BTreeMap::new(),
        }
    }

    pub fn airline(&self, addr: &Address) -> Option<&AirlineRecord> {
        self.airlines.get(addr)
    }

    pub fn is_airline(&self, addr: &Address) -> bool {
        self.airline(addr).is_some_and(|a| a.registered)
    }

    pub fn is_active(&self, addr: &Address) -> bool {
        self.airline(addr).is_some_and(|a| a.active)
    }

    pub fn flight(&self, key: &FlightKey) -> Option<&FlightRecord> {
        self.flights.get(key)
    }

    pub fn lookup_flight(&self, airline: &Address, designator: &str) -> Option<FlightKey> {
        self.flight_index.get(airline)?.get(designator).copied()
    }

    pub fn policy(&self, flight: &FlightKey, passenger: &Address) -> Option<&Policy> {
        self.policies.get(flight)?.get(passenger)
    }

    pub fn balance(&self, addr: &Address) -> Amount {
        self.balances.get(addr).copied().unwrap_or(0)
    }

    pub fn oracle(&self, addr: &Address) -> Option<&OracleRecord> {
        self.oracles.get(addr).filter(|o| o.is_registered)
    }
}

/// An open transaction: a working copy of the state plus the events it emitted.
pub struct Txn {
    state: RegistryState,
    events: Vec<SuretyEvent>,
}

impl Txn {
    fn begin(state: &RegistryState) -> Self {
        Self {
            state: state.clone(),
            events: Vec::new(),
        }
    }

    pub fn state(&self) -> &RegistryState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut RegistryState {
        &mut self.state
    }

    pub fn emit(&mut self, event: SuretyEvent) {
        debug!(event = event.name(), "emit");
        self.events.push(event);
    }

    pub fn events(&self) -> &[SuretyEvent] {
        &self.events
    }
}

pub struct Registry {
    state: RegistryState,
    journal: EventJournal,
    store: Option<SnapshotStore>,
}

impl Registry {
    pub fn new(state: RegistryState, journal: EventJournal, store: Option<SnapshotStore>) -> Self {
        Self {
            state,
            journal,
            store,
        }
    }

    pub fn state(&self) -> &RegistryState {
        &self.state
    }

    pub fn journal(&self) -> &EventJournal {
        &self.journal
    }

    /// Run `f` as one atomic operation. Returns the operation's value together
    /// with the events it emitted once they are committed.
    pub fn transact<T>(
        &mut self,
        op: &'static str,
        f: impl FnOnce(&mut Txn) -> Result<T, SuretyError>,
    ) -> Result<(T, Vec<SuretyEvent>), SuretyError> {
        let mut txn = Txn::begin(&self.state);
        match f(&mut txn) {
            Ok(value) => {
                let events = self.commit(txn)?;
                debug!(op, events = events.len(), "commit");
                Ok((value, events))
            }
            Err(e) => {
                debug!(op, error = %e, "rollback");
                Err(e)
            }
        }
    }

    fn commit(&mut self, txn: Txn) -> Result<Vec<SuretyEvent>, SuretyError> {
        let Txn { state, events } = txn;
        // Ignored oracle answers and repeat calls land here: nothing to persist.
        if events.is_empty() && state == self.state {
            return Ok(events);
        }
        let mark = self.journal.len();
        for e in &events {
            self.journal.append(e.clone());
        }
        if let Some(store) = &self.store
            && let Err(e) = store.save(&state, &self.journal)
        {
            warn!(error = %e, "snapshot write failed; rolling back");
            self.journal.truncate(mark);
            return Err(e.into());
        }
        self.state = state;
        Ok(events)
    }
}
