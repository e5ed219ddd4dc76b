// Oracle Consensus Engine.
//
// Oracles pay a fee to register and receive three distinct indexes from a small
// index space. A status request for `(airline, flight, timestamp)` is opened under
// one drawn index; only oracles holding that index may answer it. When one status
// code collects `oracle_quorum` answers the request is finalized: the flight status
// is written and, for airline-fault delays, every policy on the flight is credited.
//
// Answers that cannot count (wrong index, no such request, already finalized,
// repeat answer) are reported as `ResponseOutcome::Ignored`, not as errors:
// oracles cannot know in advance which requests they are eligible for.

use crate::config::{ConsensusConfig, FeeSchedule};
use crate::error::SuretyError;
use crate::event::SuretyEvent;
use crate::flight;
use crate::insurance;
use crate::store::{OracleRecord, RegistryState, StatusRequest, Txn};
use crate::types::{Address, Amount, RequestKey, StatusCode, flight_key, request_key, sha256};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

pub const INDEXES_PER_ORACLE: usize = 3;

/// Source of pseudorandom oracle indexes, injected so runs are reproducible.
pub trait IndexSource {
    /// Draw an index in `0..bound` for `caller`. `bound` is never zero.
    fn draw(&mut self, caller: &Address, bound: u8) -> u8;
}

/// Seeded RNG entropy mixed with the caller's identity.
#[derive(Clone, Debug)]
pub struct SeededIndexSource {
    rng: StdRng,
}

impl SeededIndexSource {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl IndexSource for SeededIndexSource {
    fn draw(&mut self, caller: &Address, bound: u8) -> u8 {
        let entropy: u64 = self.rng.random();
        let digest = sha256(&[&entropy.to_be_bytes(), caller.as_bytes()]);
        let mut word = [0u8; 8];
        word.copy_from_slice(&digest[..8]);
        (u64::from_be_bytes(word) % u64::from(bound)) as u8
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IgnoreReason {
    NotAnOracle,
    IndexMismatch,
    NoRequest,
    RequestClosed,
    DuplicateResponse,
    UnknownStatus,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ResponseOutcome {
    /// Counted; the request is still open.
    Accepted { votes: usize, quorum: usize },
    /// This answer completed the quorum.
    Finalized {
        status: StatusCode,
        /// False if the flight already carried a final status from another request.
        applied: bool,
        policies_credited: usize,
        credited: Amount,
    },
    Ignored { reason: IgnoreReason },
}

impl ResponseOutcome {
    fn ignored(reason: IgnoreReason) -> Self {
        ResponseOutcome::Ignored { reason }
    }
}

/// Three distinct indexes; collisions step forward through the index space.
pub fn generate_indexes(source: &mut dyn IndexSource, caller: &Address, bound: u8) -> [u8; 3] {
    let mut out = [0u8; INDEXES_PER_ORACLE];
    for i in 0..INDEXES_PER_ORACLE {
        let mut idx = source.draw(caller, bound);
        while out[..i].contains(&idx) {
            idx = (idx + 1) % bound;
        }
        out[i] = idx;
    }
    out
}

pub fn register_oracle(
    tx: &mut Txn,
    fees: &FeeSchedule,
    consensus: &ConsensusConfig,
    source: &mut dyn IndexSource,
    oracle: Address,
    fee: Amount,
) -> Result<[u8; 3], SuretyError> {
    if fee != fees.oracle_registration_fee {
        return Err(SuretyError::InvalidFunding {
            expected: fees.oracle_registration_fee,
            got: fee,
        });
    }
    if tx.state().oracle(&oracle).is_some() {
        return Err(SuretyError::AlreadyRegistered(oracle));
    }

    let indexes = generate_indexes(source, &oracle, consensus.oracle_index_space);
    let state = tx.state_mut();
    state.oracles.insert(
        oracle,
        OracleRecord {
            is_registered: true,
            indexes,
        },
    );
    state.treasury = state.treasury.saturating_add(fee);
    info!(%oracle, ?indexes, "oracle registered");
    tx.emit(SuretyEvent::OracleRegistered { oracle, indexes });
    Ok(indexes)
}

pub fn get_my_indexes(state: &RegistryState, caller: &Address) -> Result<[u8; 3], SuretyError> {
    state
        .oracle(caller)
        .map(|o| o.indexes)
        .ok_or_else(|| SuretyError::unauthorized(*caller, "not a registered oracle"))
}

/// Open a status request under a freshly drawn index. An existing request for the
/// same key is left as it is, finalized or not.
pub fn fetch_flight_status(
    tx: &mut Txn,
    consensus: &ConsensusConfig,
    source: &mut dyn IndexSource,
    airline: Address,
    designator: &str,
    timestamp: u64,
    requester: Address,
) -> Result<(u8, RequestKey), SuretyError> {
    let fkey = flight_key(&airline, designator, timestamp);
    if tx.state().flight(&fkey).is_none() {
        return Err(SuretyError::UnknownFlight {
            airline,
            designator: designator.to_string(),
        });
    }

    let index = source.draw(&requester, consensus.oracle_index_space);
    let key = request_key(index, &airline, designator, timestamp);
    tx.state_mut()
        .requests
        .entry(key)
        .or_insert_with(|| StatusRequest {
            index,
            airline,
            designator: designator.to_string(),
            timestamp,
            requester,
            open: true,
            responses: BTreeMap::new(),
            resolved: None,
        });

    info!(index, %airline, designator, timestamp, %requester, "flight status requested");
    tx.emit(SuretyEvent::OracleRequest {
        index,
        airline,
        designator: designator.to_string(),
        timestamp,
        key,
    });
    Ok((index, key))
}

#[allow(clippy::too_many_arguments)]
pub fn submit_oracle_response(
    tx: &mut Txn,
    consensus: &ConsensusConfig,
    fees: &FeeSchedule,
    index: u8,
    airline: Address,
    designator: &str,
    timestamp: u64,
    status_code: u8,
    oracle: Address,
) -> Result<ResponseOutcome, SuretyError> {
    let Some(record) = tx.state().oracle(&oracle) else {
        debug!(%oracle, "response from unregistered oracle ignored");
        return Ok(ResponseOutcome::ignored(IgnoreReason::NotAnOracle));
    };
    if !record.indexes.contains(&index) {
        debug!(%oracle, index, "response index not assigned to oracle");
        return Ok(ResponseOutcome::ignored(IgnoreReason::IndexMismatch));
    }
    // Eligible oracles get a hard error for codes outside the table.
    let status = StatusCode::try_from(status_code).map_err(SuretyError::InvalidStatusCode)?;
    if status == StatusCode::Unknown {
        return Ok(ResponseOutcome::ignored(IgnoreReason::UnknownStatus));
    }

    let key = request_key(index, &airline, designator, timestamp);
    let quorum = consensus.oracle_quorum;
    let Some(request) = tx.state_mut().requests.get_mut(&key) else {
        debug!(%oracle, index, designator, "no request for response");
        return Ok(ResponseOutcome::ignored(IgnoreReason::NoRequest));
    };
    if !request.open {
        debug!(%oracle, index, designator, "response after finalization ignored");
        return Ok(ResponseOutcome::ignored(IgnoreReason::RequestClosed));
    }
    if request.responses.contains_key(&oracle) {
        debug!(%oracle, index, designator, "repeat response ignored");
        return Ok(ResponseOutcome::ignored(IgnoreReason::DuplicateResponse));
    }

    request.responses.insert(oracle, status);
    let votes = request.votes_for(status);
    let finalized = votes >= quorum;
    if finalized {
        request.open = false;
        request.resolved = Some(status);
    }

    debug!(%oracle, index, designator, status = status.code(), votes, "oracle response accepted");
    tx.emit(SuretyEvent::OracleReport {
        oracle,
        index,
        airline,
        designator: designator.to_string(),
        timestamp,
        status,
    });
    if !finalized {
        return Ok(ResponseOutcome::Accepted { votes, quorum });
    }

    tx.emit(SuretyEvent::FlightStatusInfo {
        airline,
        designator: designator.to_string(),
        timestamp,
        status,
    });
    let fkey = flight_key(&airline, designator, timestamp);
    let applied = match flight::update_status(tx, &fkey, status) {
        Ok(()) => true,
        Err(SuretyError::FlightResolved(_)) => {
            warn!(designator, timestamp, "flight already resolved by an earlier request");
            false
        }
        Err(e) => return Err(e),
    };

    let (policies_credited, credited) = if applied && status.is_airline_fault() {
        insurance::credit_insurees(tx, fees, &fkey)
    } else {
        (0, 0)
    };
    info!(
        %airline,
        designator,
        timestamp,
        status = status.code(),
        applied,
        policies_credited,
        "status request finalized"
    );
    Ok(ResponseOutcome::Finalized {
        status,
        applied,
        policies_credited,
        credited,
    })
}
