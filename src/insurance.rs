// Insurance Ledger: passenger policies, payout credits and withdrawals.
//
// A policy's paid amount is fixed at purchase. Its credit moves from zero to
// `paid * 3/2` at most once, when the flight resolves to an airline-fault delay,
// and is added to the passenger's withdrawable balance at the same moment.
// Withdrawal zeroes the balance before the transfer is attempted; the registry
// transaction rolls both back if the transfer fails.

use crate::config::FeeSchedule;
use crate::error::SuretyError;
use crate::event::SuretyEvent;
use crate::store::{Policy, RegistryState, Txn};
use crate::types::{Address, Amount, FlightKey, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Outbound value transfer to a passenger. The ledger transport is the implementor's concern.
pub trait PayoutSink {
    fn transfer(&mut self, to: Address, amount: Amount) -> Result<(), String>;
}

/// Keeps transfers in memory; used by the node binary and tests.
#[derive(Clone, Debug, Default)]
pub struct RecordedPayouts {
    pub transfers: Vec<(Address, Amount)>,
}

impl PayoutSink for RecordedPayouts {
    fn transfer(&mut self, to: Address, amount: Amount) -> Result<(), String> {
        self.transfers.push((to, amount));
        Ok(())
    }
}

impl RecordedPayouts {
    pub fn total_to(&self, to: &Address) -> Amount {
        self.transfers
            .iter()
            .filter(|(a, _)| a == to)
            .map(|(_, v)| *v)
            .sum()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyView {
    pub is_insured: bool,
    pub amount_paid: Amount,
    pub credited_amount: Amount,
}

impl From<&Policy> for PolicyView {
    fn from(p: &Policy) -> Self {
        Self {
            is_insured: p.is_insured,
            amount_paid: p.amount_paid,
            credited_amount: p.credited_amount,
        }
    }
}

pub fn buy(
    tx: &mut Txn,
    fees: &FeeSchedule,
    airline: Address,
    designator: &str,
    payment: Amount,
    passenger: Address,
) -> Result<FlightKey, SuretyError> {
    if payment == 0 || payment > fees.max_insurance {
        return Err(SuretyError::InvalidAmount {
            got: payment,
            max: fees.max_insurance,
        });
    }
    let state = tx.state();
    let key = state
        .lookup_flight(&airline, designator)
        .filter(|k| state.flight(k).is_some_and(|f| f.is_registered))
        .ok_or_else(|| SuretyError::UnknownFlight {
            airline,
            designator: designator.to_string(),
        })?;
    if state.flight(&key).is_some_and(|f| f.status != StatusCode::Unknown) {
        return Err(SuretyError::FlightResolved(designator.to_string()));
    }
    if state.policy(&key, &passenger).is_some() {
        return Err(SuretyError::AlreadyInsured(passenger));
    }

    let state = tx.state_mut();
    state.policies.entry(key).or_default().insert(
        passenger,
        Policy {
            is_insured: true,
            amount_paid: payment,
            credited_amount: 0,
        },
    );
    state.treasury = state.treasury.saturating_add(payment);
    info!(%passenger, %airline, designator, payment, "insurance purchased");
    tx.emit(SuretyEvent::InsurancePurchased {
        passenger,
        flight: key,
        amount: payment,
    });
    Ok(key)
}

pub fn fetch_flight_insured(
    state: &RegistryState,
    passenger: &Address,
    airline: &Address,
    designator: &str,
) -> PolicyView {
    state
        .lookup_flight(airline, designator)
        .and_then(|key| state.policy(&key, passenger))
        .map(PolicyView::from)
        .unwrap_or_default()
}

/// Credit every not-yet-credited policy on `flight`. Returns (policies credited, total).
/// Safe to call repeatedly: already-credited policies are skipped.
pub(crate) fn credit_insurees(tx: &mut Txn, fees: &FeeSchedule, flight: &FlightKey) -> (usize, Amount) {
    let RegistryState {
        policies, balances, ..
    } = tx.state_mut();
    let Some(by_passenger) = policies.get_mut(flight) else {
        return (0, 0);
    };

    let mut count = 0usize;
    let mut total: Amount = 0;
    for (passenger, policy) in by_passenger.iter_mut() {
        if !policy.is_insured || policy.credited_amount != 0 {
            continue;
        }
        let credit = fees.payout_for(policy.amount_paid);
        policy.credited_amount = credit;
        let bal = balances.entry(*passenger).or_insert(0);
        *bal = bal.saturating_add(credit);
        count += 1;
        total = total.saturating_add(credit);
        debug!(%passenger, credit, "policy credited");
    }

    if count > 0 {
        info!(%flight, policies = count, total, "insurees credited");
        tx.emit(SuretyEvent::InsureesCredited {
            flight: *flight,
            policies: count,
            total,
        });
    }
    (count, total)
}

pub fn withdraw_funds(
    tx: &mut Txn,
    passenger: Address,
    sink: &mut dyn PayoutSink,
) -> Result<Amount, SuretyError> {
    let amount = tx.state().balance(&passenger);
    if amount == 0 {
        return Err(SuretyError::InsufficientBalance(passenger));
    }
    let treasury = tx.state().treasury;
    if treasury < amount {
        return Err(SuretyError::TreasuryInsolvent {
            available: treasury,
            requested: amount,
        });
    }

    // Effects before interaction: the balance is gone before the sink runs.
    let state = tx.state_mut();
    state.balances.remove(&passenger);
    state.treasury = treasury - amount;

    sink.transfer(passenger, amount)
        .map_err(|reason| SuretyError::Transfer {
            to: passenger,
            reason,
        })?;
    info!(%passenger, amount, "funds withdrawn");
    tx.emit(SuretyEvent::Withdrawal { passenger, amount });
    Ok(amount)
}
