// Flight-insurance registry core: deterministic, in-memory, audit-first.

pub mod access;
pub mod airline;
pub mod app;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod flight;
pub mod insurance;
pub mod ledger;
pub mod oracle;
pub mod storage;
pub mod store;
pub mod types;

pub use app::{FlightSurety, Receipt};
pub use config::DeploymentConfig;
pub use error::SuretyError;
pub use types::{Address, Amount, StatusCode, UNIT};

/*
Intentionally avoids:
- async
- global mutable state
- wall clock access (timestamps are supplied by callers)
- ambient randomness (oracle indexes come from an injected IndexSource)
*/
