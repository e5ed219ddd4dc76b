use crate::types::{Address, Amount};
use thiserror::Error;

/// Failures of a registry operation. Every variant aborts the operation with no state change.
#[derive(Debug, Error)]
pub enum SuretyError {
    #[error("contract is not operational")]
    Operational,

    #[error("caller {caller} is not authorized: {reason}")]
    Authorization { caller: Address, reason: &'static str },

    #[error("airline {0} is not active (activation stake not paid)")]
    NotActive(Address),

    #[error("{0} is already registered")]
    AlreadyRegistered(Address),

    #[error("airline {0} is already active")]
    AlreadyActive(Address),

    #[error("airline {0} is not registered")]
    NotRegistered(Address),

    #[error("invalid funding: expected {expected}, got {got}")]
    InvalidFunding { expected: Amount, got: Amount },

    #[error("invalid amount {got} (must be between 1 and {max})")]
    InvalidAmount { got: Amount, max: Amount },

    #[error("unknown flight {designator} for airline {airline}")]
    UnknownFlight { airline: Address, designator: String },

    #[error("flight {designator} already registered for airline {airline}")]
    FlightAlreadyRegistered { airline: Address, designator: String },

    #[error("flight {0} already has a final status")]
    FlightResolved(String),

    #[error("passenger {0} already holds a policy on this flight")]
    AlreadyInsured(Address),

    #[error("invalid status code {0}")]
    InvalidStatusCode(u8),

    #[error("no withdrawable balance for {0}")]
    InsufficientBalance(Address),

    #[error("treasury holds {available}, cannot pay {requested}")]
    TreasuryInsolvent { available: Amount, requested: Amount },

    #[error("transfer to {to} failed: {reason}")]
    Transfer { to: Address, reason: String },

    #[error(transparent)]
    Storage(#[from] StoreError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl SuretyError {
    pub(crate) fn unauthorized(caller: Address, reason: &'static str) -> Self {
        SuretyError::Authorization { caller, reason }
    }

    /// Stable name of the failure class, as reported to callers.
    pub fn kind(&self) -> &'static str {
        match self {
            SuretyError::Operational => "OperationalError",
            SuretyError::Authorization { .. } => "AuthorizationError",
            SuretyError::NotActive(_) => "NotActiveError",
            SuretyError::AlreadyRegistered(_) | SuretyError::FlightAlreadyRegistered { .. } => {
                "AlreadyRegisteredError"
            }
            SuretyError::AlreadyActive(_) => "AlreadyActiveError",
            SuretyError::NotRegistered(_) => "NotRegisteredError",
            SuretyError::InvalidFunding { .. } => "InvalidFundingError",
            SuretyError::InvalidAmount { .. } => "InvalidAmountError",
            SuretyError::UnknownFlight { .. } => "UnknownFlightError",
            SuretyError::FlightResolved(_) => "FlightResolvedError",
            SuretyError::AlreadyInsured(_) => "AlreadyInsuredError",
            SuretyError::InvalidStatusCode(_) => "InvalidStatusCodeError",
            SuretyError::InsufficientBalance(_) => "InsufficientBalanceError",
            SuretyError::TreasuryInsolvent { .. } => "TreasuryInsolventError",
            SuretyError::Transfer { .. } => "TransferError",
            SuretyError::Storage(_) => "StorageError",
            SuretyError::Config(_) => "ConfigError",
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("snapshot io: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot encoding: {0}")]
    Json(#[from] serde_json::Error),

    #[error("snapshot journal is corrupt at entry {0}")]
    Corrupt(u64),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("oracle index space {space} cannot hold {per_oracle} distinct indexes")]
    IndexSpaceTooSmall { space: u8, per_oracle: usize },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("owner address must not be zero")]
    ZeroOwner,

    #[error("configured owner {configured} does not own the restored registry (owner {restored})")]
    OwnerMismatch { configured: Address, restored: Address },
}
