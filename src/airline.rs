// Airline Consensus Engine.
//
// Per-airline lifecycle: `Unregistered -> Registered -> Active`.
//
// - While fewer than `bootstrap_airlines` airlines are registered, one active
//   sponsor admits a candidate immediately.
// - After that, each active sponsor's call is a vote; the candidate is admitted
//   once its votes reach `ceil(registered / 2)`. Repeat votes are not counted.
// - A registered airline becomes active by paying exactly the activation fee, once.

use crate::config::{ConsensusConfig, FeeSchedule};
use crate::error::SuretyError;
use crate::event::SuretyEvent;
use crate::store::{AirlineRecord, RegistryState, Txn};
use crate::types::{Address, Amount};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AirlineRegistration {
    Registered { votes: usize },
    Pending { votes: usize, required: usize },
}

impl AirlineRegistration {
    pub fn is_registered(&self) -> bool {
        matches!(self, AirlineRegistration::Registered { .. })
    }
}

/// Votes required to admit a candidate given the current registered count.
pub fn required_votes(consensus: &ConsensusConfig, registered: usize) -> usize {
    if registered < consensus.bootstrap_airlines {
        1
    } else {
        registered.div_ceil(2)
    }
}

/// Progress of a pending candidate: (votes cast, votes required).
pub fn vote_progress(
    state: &RegistryState,
    consensus: &ConsensusConfig,
    candidate: &Address,
) -> (usize, usize) {
    let votes = state.airline(candidate).map(|a| a.votes.len()).unwrap_or(0);
    (votes, required_votes(consensus, state.registered_airlines))
}

/// Genesis: the first airline is registered without a sponsor and starts inactive.
pub(crate) fn register_genesis(tx: &mut Txn, airline: Address, owner: Address) {
    let state = tx.state_mut();
    state.airlines.insert(
        airline,
        AirlineRecord {
            registered: true,
            ..AirlineRecord::default()
        },
    );
    state.registered_airlines = 1;
    info!(%airline, "first airline registered at deployment");
    tx.emit(SuretyEvent::RegisterAirline {
        airline,
        sponsor: owner,
        votes: 0,
    });
}

pub fn register_airline(
    tx: &mut Txn,
    consensus: &ConsensusConfig,
    candidate: Address,
    sponsor: Address,
) -> Result<AirlineRegistration, SuretyError> {
    let state = tx.state();
    if !state.is_active(&sponsor) {
        return Err(SuretyError::NotActive(sponsor));
    }
    if state.is_airline(&candidate) {
        return Err(SuretyError::AlreadyRegistered(candidate));
    }

    let required = required_votes(consensus, state.registered_airlines);
    let record = tx.state_mut().airlines.entry(candidate).or_default();
    let counted = record.votes.insert(sponsor);
    let votes = record.votes.len();

    if votes < required {
        if counted {
            debug!(%candidate, %sponsor, votes, required, "airline vote recorded");
            tx.emit(SuretyEvent::AirlineVote {
                candidate,
                voter: sponsor,
                votes,
                required,
            });
        } else {
            debug!(%candidate, %sponsor, "repeat vote ignored");
        }
        return Ok(AirlineRegistration::Pending { votes, required });
    }

    record.registered = true;
    tx.state_mut().registered_airlines += 1;
    info!(%candidate, %sponsor, votes, "airline registered");
    tx.emit(SuretyEvent::RegisterAirline {
        airline: candidate,
        sponsor,
        votes,
    });
    Ok(AirlineRegistration::Registered { votes })
}

pub fn activate_airline(
    tx: &mut Txn,
    fees: &FeeSchedule,
    airline: Address,
    stake: Amount,
) -> Result<(), SuretyError> {
    let record = tx
        .state()
        .airline(&airline)
        .filter(|a| a.registered)
        .ok_or(SuretyError::NotRegistered(airline))?;
    if record.active {
        return Err(SuretyError::AlreadyActive(airline));
    }
    if stake != fees.activation_fee {
        return Err(SuretyError::InvalidFunding {
            expected: fees.activation_fee,
            got: stake,
        });
    }

    let state = tx.state_mut();
    if let Some(record) = state.airlines.get_mut(&airline) {
        record.active = true;
        record.stake = stake;
    }
    state.treasury = state.treasury.saturating_add(stake);
    info!(%airline, stake, "airline activated");
    tx.emit(SuretyEvent::AirlineActivated { airline, stake });
    Ok(())
}
