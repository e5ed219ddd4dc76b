// Access Controller: operational flag, owner checks and the caller allow-list.
// Every mutating operation runs these guards before touching the store.

use crate::error::SuretyError;
use crate::event::SuretyEvent;
use crate::store::{RegistryState, Txn};
use crate::types::Address;
use tracing::info;

pub fn require_operational(state: &RegistryState) -> Result<(), SuretyError> {
    if state.operational {
        Ok(())
    } else {
        Err(SuretyError::Operational)
    }
}

pub fn require_owner(state: &RegistryState, caller: Address) -> Result<(), SuretyError> {
    if caller == state.owner {
        Ok(())
    } else {
        Err(SuretyError::unauthorized(caller, "not the contract owner"))
    }
}

/// The data layer only accepts mutations relayed by allow-listed callers.
pub fn require_authorized_caller(state: &RegistryState, caller: Address) -> Result<(), SuretyError> {
    if state.authorized_callers.contains(&caller) {
        Ok(())
    } else {
        Err(SuretyError::unauthorized(caller, "not on the authorized caller list"))
    }
}

/// Both guards a relayed mutation needs.
pub fn guard(state: &RegistryState, relay: Address) -> Result<(), SuretyError> {
    require_operational(state)?;
    require_authorized_caller(state, relay)
}

pub fn set_operational(tx: &mut Txn, operational: bool, caller: Address) -> Result<(), SuretyError> {
    require_owner(tx.state(), caller)?;
    if tx.state().operational == operational {
        return Ok(());
    }
    tx.state_mut().operational = operational;
    info!(operational, "operating status changed");
    tx.emit(SuretyEvent::OperatingStatusChanged { operational });
    Ok(())
}

pub fn authorize_caller(tx: &mut Txn, target: Address, caller: Address) -> Result<(), SuretyError> {
    require_owner(tx.state(), caller)?;
    if tx.state_mut().authorized_callers.insert(target) {
        info!(caller = %target, "caller authorized");
        tx.emit(SuretyEvent::CallerAuthorized { caller: target });
    }
    Ok(())
}

pub fn deauthorize_caller(tx: &mut Txn, target: Address, caller: Address) -> Result<(), SuretyError> {
    require_owner(tx.state(), caller)?;
    if tx.state_mut().authorized_callers.remove(&target) {
        info!(caller = %target, "caller deauthorized");
        tx.emit(SuretyEvent::CallerDeauthorized { caller: target });
    }
    Ok(())
}
