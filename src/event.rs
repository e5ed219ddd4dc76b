// Observable side effects of committed operations. Callers read them back for confirmation.

use crate::types::{Address, Amount, FlightKey, RequestKey, StatusCode};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum SuretyEvent {
    OperatingStatusChanged {
        operational: bool,
    },
    CallerAuthorized {
        caller: Address,
    },
    CallerDeauthorized {
        caller: Address,
    },
    RegisterAirline {
        airline: Address,
        sponsor: Address,
        votes: usize,
    },
    AirlineVote {
        candidate: Address,
        voter: Address,
        votes: usize,
        required: usize,
    },
    AirlineActivated {
        airline: Address,
        stake: Amount,
    },
    RegisterFlight {
        airline: Address,
        designator: String,
        timestamp: u64,
        key: FlightKey,
    },
    Fund {
        funder: Address,
        value: Amount,
    },
    InsurancePurchased {
        passenger: Address,
        flight: FlightKey,
        amount: Amount,
    },
    OracleRegistered {
        oracle: Address,
        indexes: [u8; 3],
    },
    OracleRequest {
        index: u8,
        airline: Address,
        designator: String,
        timestamp: u64,
        key: RequestKey,
    },
    OracleReport {
        oracle: Address,
        index: u8,
        airline: Address,
        designator: String,
        timestamp: u64,
        status: StatusCode,
    },
    FlightStatusInfo {
        airline: Address,
        designator: String,
        timestamp: u64,
        status: StatusCode,
    },
    InsureesCredited {
        flight: FlightKey,
        policies: usize,
        total: Amount,
    },
    Withdrawal {
        passenger: Address,
        amount: Amount,
    },
}

impl SuretyEvent {
    pub fn name(&self) -> &'static str {
        match self {
            SuretyEvent::OperatingStatusChanged { .. } => "OperatingStatusChanged",
            SuretyEvent::CallerAuthorized { .. } => "CallerAuthorized",
            SuretyEvent::CallerDeauthorized { .. } => "CallerDeauthorized",
            SuretyEvent::RegisterAirline { .. } => "RegisterAirline",
            SuretyEvent::AirlineVote { .. } => "AirlineVote",
            SuretyEvent::AirlineActivated { .. } => "AirlineActivated",
            SuretyEvent::RegisterFlight { .. } => "RegisterFlight",
            SuretyEvent::Fund { .. } => "Fund",
            SuretyEvent::InsurancePurchased { .. } => "InsurancePurchased",
            SuretyEvent::OracleRegistered { .. } => "OracleRegistered",
            SuretyEvent::OracleRequest { .. } => "OracleRequest",
            SuretyEvent::OracleReport { .. } => "OracleReport",
            SuretyEvent::FlightStatusInfo { .. } => "FlightStatusInfo",
            SuretyEvent::InsureesCredited { .. } => "InsureesCredited",
            SuretyEvent::Withdrawal { .. } => "Withdrawal",
        }
    }

    /// Canonical bytes for journal hashing.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        // serde_json over a tagged enum with fixed field order is stable.
        serde_json::to_vec(self).expect("events hold only strings, integers and string-keyed data")
    }
}
