// Flight Registry: flights owned by active airlines, keyed by hash(airline, designator, timestamp).
// A registered flight never changes except for its status, which moves away from Unknown once.

use crate::error::SuretyError;
use crate::event::SuretyEvent;
use crate::store::{FlightRecord, RegistryState, Txn};
use crate::types::{Address, FlightKey, StatusCode, flight_key};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Read view returned by `fetchFlightBuffer`. Unregistered flights read as all-defaults.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightBuffer {
    pub is_registered: bool,
    pub status: StatusCode,
    pub timestamp: u64,
    pub airline: Address,
}

impl FlightBuffer {
    fn unregistered() -> Self {
        Self {
            is_registered: false,
            status: StatusCode::Unknown,
            timestamp: 0,
            airline: Address::ZERO,
        }
    }
}

pub fn register_flight(
    tx: &mut Txn,
    airline: Address,
    designator: &str,
    timestamp: u64,
    caller: Address,
) -> Result<FlightKey, SuretyError> {
    // Only the active airline itself may register; anyone else reads as not active.
    if caller != airline || !tx.state().is_active(&airline) {
        return Err(SuretyError::NotActive(caller));
    }
    let key = flight_key(&airline, designator, timestamp);
    if tx.state().flights.contains_key(&key) {
        return Err(SuretyError::FlightAlreadyRegistered {
            airline,
            designator: designator.to_string(),
        });
    }

    let state = tx.state_mut();
    state.flights.insert(
        key,
        FlightRecord {
            is_registered: true,
            status: StatusCode::Unknown,
            timestamp,
            airline,
            designator: designator.to_string(),
        },
    );
    state
        .flight_index
        .entry(airline)
        .or_default()
        .insert(designator.to_string(), key);

    info!(%airline, designator, timestamp, "flight registered");
    tx.emit(SuretyEvent::RegisterFlight {
        airline,
        designator: designator.to_string(),
        timestamp,
        key,
    });
    Ok(key)
}

pub fn fetch_flight(state: &RegistryState, airline: &Address, designator: &str) -> FlightBuffer {
    state
        .lookup_flight(airline, designator)
        .and_then(|key| state.flight(&key))
        .map(|f| FlightBuffer {
            is_registered: f.is_registered,
            status: f.status,
            timestamp: f.timestamp,
            airline: f.airline,
        })
        .unwrap_or_else(FlightBuffer::unregistered)
}

/// Oracle finalization only. Rejects unknown flights and any second resolution.
pub(crate) fn update_status(
    tx: &mut Txn,
    key: &FlightKey,
    status: StatusCode,
) -> Result<(), SuretyError> {
    let flight = tx
        .state_mut()
        .flights
        .get_mut(key)
        .filter(|f| f.is_registered)
        .ok_or_else(|| SuretyError::UnknownFlight {
            airline: Address::ZERO,
            designator: key.to_string(),
        })?;
    if flight.status != StatusCode::Unknown {
        return Err(SuretyError::FlightResolved(flight.designator.clone()));
    }
    flight.status = status;
    info!(designator = %flight.designator, status = status.code(), "flight status finalized");
    Ok(())
}
