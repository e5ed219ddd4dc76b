// JSON request/response envelope over the FlightSurety operations.
// One request in, one response out; used by the node binary's script runner.

use crate::app::{FlightSurety, Receipt};
use crate::error::SuretyError;
use crate::event::SuretyEvent;
use crate::insurance::PayoutSink;
use crate::types::{Address, Amount};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    IsOperational,
    SetOperatingStatus { operational: bool, caller: Address },
    AuthorizeCaller { address: Address, caller: Address },
    DeauthorizeCaller { address: Address, caller: Address },
    RegisterAirline { airline: Address, caller: Address },
    ActivateAirline { stake: Amount, caller: Address },
    FetchAirlineStatus { airline: Address },
    IsActive { airline: Address },
    RegisterFlight { airline: Address, flight: String, timestamp: u64, caller: Address },
    FetchFlightBuffer { airline: Address, flight: String },
    Buy { airline: Address, flight: String, payment: Amount, caller: Address },
    FetchFlightInsured { passenger: Address, airline: Address, flight: String },
    FundContract { value: Amount, caller: Address },
    RegisterOracle { fee: Amount, caller: Address },
    GetMyIndexes { caller: Address },
    FetchFlightStatus { airline: Address, flight: String, timestamp: u64, caller: Address },
    SubmitOracleResponse {
        index: u8,
        airline: Address,
        flight: String,
        timestamp: u64,
        status_code: u8,
        caller: Address,
    },
    GetBalance { caller: Address },
    WithdrawFunds { caller: Address },
    IsAirline { airline: Address },
    IsOracle { address: Address },
    IsAuthorizedCaller { address: Address },
    AirlineVotes { airline: Address },
    GetFlightKey { airline: Address, flight: String, timestamp: u64 },
    TreasuryBalance,
    JournalRoot,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<SuretyEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl Response {
    fn value<T: Serialize>(v: T) -> Self {
        match serde_json::to_value(v) {
            Ok(result) => Response {
                ok: true,
                result: Some(result),
                events: Vec::new(),
                error: None,
                kind: None,
            },
            Err(e) => Response {
                ok: false,
                result: None,
                events: Vec::new(),
                error: Some(e.to_string()),
                kind: Some("EncodingError".into()),
            },
        }
    }

    fn receipt<T: Serialize>(r: Result<Receipt<T>, SuretyError>) -> Self {
        match r {
            Ok(receipt) => {
                let mut resp = Response::value(receipt.value);
                resp.events = receipt.events;
                resp
            }
            Err(e) => Response::failure(&e),
        }
    }

    fn failure(e: &SuretyError) -> Self {
        Response {
            ok: false,
            result: None,
            events: Vec::new(),
            error: Some(e.to_string()),
            kind: Some(e.kind().to_string()),
        }
    }
}

pub fn dispatch(app: &mut FlightSurety, payouts: &mut dyn PayoutSink, req: Request) -> Response {
    match req {
        Request::IsOperational => Response::value(app.is_operational()),
        Request::SetOperatingStatus { operational, caller } => {
            Response::receipt(app.set_operating_status(operational, caller))
        }
        Request::AuthorizeCaller { address, caller } => {
            Response::receipt(app.authorize_caller(address, caller))
        }
        Request::DeauthorizeCaller { address, caller } => {
            Response::receipt(app.deauthorize_caller(address, caller))
        }
        Request::RegisterAirline { airline, caller } => {
            Response::receipt(app.register_airline(airline, caller))
        }
        Request::ActivateAirline { stake, caller } => {
            Response::receipt(app.activate_airline(stake, caller))
        }
        Request::FetchAirlineStatus { airline } => Response::value(app.fetch_airline_status(&airline)),
        Request::IsActive { airline } => Response::value(app.is_active(&airline)),
        Request::RegisterFlight {
            airline,
            flight,
            timestamp,
            caller,
        } => Response::receipt(app.register_flight(airline, &flight, timestamp, caller)),
        Request::FetchFlightBuffer { airline, flight } => {
            Response::value(app.fetch_flight_buffer(&airline, &flight))
        }
        Request::Buy {
            airline,
            flight,
            payment,
            caller,
        } => Response::receipt(app.buy(airline, &flight, payment, caller)),
        Request::FetchFlightInsured {
            passenger,
            airline,
            flight,
        } => Response::value(app.fetch_flight_insured(&passenger, &airline, &flight)),
        Request::FundContract { value, caller } => Response::receipt(app.fund_contract(value, caller)),
        Request::RegisterOracle { fee, caller } => Response::receipt(app.register_oracle(fee, caller)),
        Request::GetMyIndexes { caller } => match app.get_my_indexes(&caller) {
            Ok(idx) => Response::value(idx),
            Err(e) => Response::failure(&e),
        },
        Request::FetchFlightStatus {
            airline,
            flight,
            timestamp,
            caller,
        } => Response::receipt(app.fetch_flight_status(airline, &flight, timestamp, caller)),
        Request::SubmitOracleResponse {
            index,
            airline,
            flight,
            timestamp,
            status_code,
            caller,
        } => Response::receipt(app.submit_oracle_response(
            index,
            airline,
            &flight,
            timestamp,
            status_code,
            caller,
        )),
        Request::GetBalance { caller } => Response::value(app.get_balance(&caller)),
        Request::WithdrawFunds { caller } => Response::receipt(app.withdraw_funds(caller, payouts)),
        Request::IsAirline { airline } => Response::value(app.is_airline(&airline)),
        Request::IsOracle { address } => Response::value(app.is_oracle(&address)),
        Request::IsAuthorizedCaller { address } => Response::value(app.is_authorized_caller(&address)),
        Request::AirlineVotes { airline } => {
            let (votes, required) = app.airline_votes(&airline);
            Response::value(serde_json::json!({ "votes": votes, "required": required }))
        }
        Request::GetFlightKey {
            airline,
            flight,
            timestamp,
        } => Response::value(app.get_flight_key(&airline, &flight, timestamp)),
        Request::TreasuryBalance => Response::value(app.treasury_balance()),
        Request::JournalRoot => Response::value(app.journal_root().map(hex::encode)),
    }
}
