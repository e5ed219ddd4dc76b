use flightsurety_core::airline::AirlineRegistration;
use flightsurety_core::event::SuretyEvent;
use flightsurety_core::flight::FlightBuffer;
use flightsurety_core::insurance::{PolicyView, RecordedPayouts};
use flightsurety_core::oracle::{IgnoreReason, IndexSource, ResponseOutcome};
use flightsurety_core::storage::SnapshotStore;
use flightsurety_core::{Address, DeploymentConfig, FlightSurety, StatusCode, SuretyError, UNIT};

const FLIGHT: &str = "ND1309";
const TIMESTAMP: u64 = 1_587_924_461;

/// Hands out 0, 1, 2, ... modulo the bound, so index assignment is predictable.
struct CyclingSource(u64);

impl IndexSource for CyclingSource {
    fn draw(&mut self, _caller: &Address, bound: u8) -> u8 {
        let v = (self.0 % u64::from(bound)) as u8;
        self.0 += 1;
        v
    }
}

fn account(n: u64) -> Address {
    Address::from_low_u64(n)
}

fn owner() -> Address {
    account(0)
}

fn first_airline() -> Address {
    account(1)
}

fn deploy() -> FlightSurety {
    let mut cfg = DeploymentConfig::new(owner());
    cfg.first_airline = Some(first_airline());
    FlightSurety::deploy(cfg)
        .expect("deploy")
        .with_index_source(Box::new(CyclingSource(0)))
}

/// First airline active with flight ND1309 registered.
fn deploy_with_flight() -> FlightSurety {
    let mut app = deploy();
    app.activate_airline(10 * UNIT, first_airline()).expect("activate");
    app.register_flight(first_airline(), FLIGHT, TIMESTAMP, first_airline())
        .expect("register flight");
    app
}

fn register_oracles(app: &mut FlightSurety, accounts: std::ops::Range<u64>) {
    for a in accounts {
        let r = app.register_oracle(UNIT, account(a)).expect("register oracle");
        assert!(r.emitted("OracleRegistered"));
    }
}

/// Every oracle answers on every one of its indexes, like an oracle farm that
/// cannot tell which request it is eligible for.
fn answer_all(app: &mut FlightSurety, accounts: std::ops::Range<u64>, status: u8) -> Vec<ResponseOutcome> {
    let mut outcomes = Vec::new();
    for a in accounts {
        let indexes = app.get_my_indexes(&account(a)).expect("indexes");
        for idx in indexes {
            let r = app
                .submit_oracle_response(idx, first_airline(), FLIGHT, TIMESTAMP, status, account(a))
                .expect("response never hard-fails");
            outcomes.push(r.value);
        }
    }
    outcomes
}

#[test]
fn initial_operational_status() {
    let app = deploy();
    assert!(app.is_operational());
}

#[test]
fn only_owner_sets_operating_status() {
    let mut app = deploy();
    let err = app.set_operating_status(false, account(2)).unwrap_err();
    assert!(matches!(err, SuretyError::Authorization { .. }));
    assert!(app.is_operational());

    app.set_operating_status(false, owner()).expect("owner may pause");
    assert!(!app.is_operational());
}

#[test]
fn paused_registry_rejects_mutations() {
    let mut app = deploy();
    app.set_operating_status(false, owner()).unwrap();

    let err = app.activate_airline(10 * UNIT, first_airline()).unwrap_err();
    assert!(matches!(err, SuretyError::Operational));
    assert!(!app.is_active(&first_airline()));
    let err = app.fund_contract(UNIT, owner()).unwrap_err();
    assert!(matches!(err, SuretyError::Operational));

    app.set_operating_status(true, owner()).unwrap();
    app.activate_airline(10 * UNIT, first_airline()).expect("resumed");
}

#[test]
fn deauthorized_app_cannot_mutate() {
    let mut app = deploy();
    let app_id = app.config().app_id;
    assert!(app.is_authorized_caller(&app_id));

    let err = app.deauthorize_caller(app_id, account(5)).unwrap_err();
    assert!(matches!(err, SuretyError::Authorization { .. }));

    app.deauthorize_caller(app_id, owner()).unwrap();
    let err = app.activate_airline(10 * UNIT, first_airline()).unwrap_err();
    assert!(matches!(err, SuretyError::Authorization { .. }));

    let r = app.authorize_caller(app_id, owner()).unwrap();
    assert!(r.emitted("CallerAuthorized"));
    app.activate_airline(10 * UNIT, first_airline()).unwrap();
}

#[test]
fn unfunded_airline_cannot_register_another() {
    let mut app = deploy();
    let err = app.register_airline(account(2), first_airline()).unwrap_err();
    assert!(matches!(err, SuretyError::NotActive(_)));
    assert!(!app.is_airline(&account(2)));
}

#[test]
fn first_airline_registered_at_deploy_and_activates_with_stake() {
    let mut app = deploy();
    assert!(app.is_airline(&first_airline()));
    assert!(!app.is_active(&first_airline()));

    app.activate_airline(10 * UNIT, first_airline()).unwrap();
    assert!(app.is_active(&first_airline()));
    assert!(app.fetch_airline_status(&first_airline()));
}

#[test]
fn multiparty_airline_registration() {
    let mut app = deploy();
    let (a1, a2, a3, a4) = (account(2), account(3), account(4), account(5));
    app.activate_airline(10 * UNIT, first_airline()).unwrap();

    // Bootstrap: one sponsor is enough.
    let r = app.register_airline(a1, first_airline()).unwrap();
    assert!(r.emitted("RegisterAirline"));
    assert!(app.is_airline(&a1));
    app.register_airline(a2, first_airline()).unwrap();
    assert!(app.is_airline(&a2));

    // Registered but unfunded airlines cannot sponsor.
    assert!(matches!(
        app.register_airline(a3, a2).unwrap_err(),
        SuretyError::NotActive(_)
    ));
    assert!(!app.is_airline(&a3));

    app.activate_airline(10 * UNIT, a1).unwrap();
    app.activate_airline(10 * UNIT, a2).unwrap();

    // Fourth airline still inside the bootstrap window.
    app.register_airline(a3, a2).unwrap();
    assert!(app.is_airline(&a3));
    app.activate_airline(10 * UNIT, a3).unwrap();

    // Fifth needs ceil(4 / 2) = 2 votes.
    let r = app.register_airline(a4, first_airline()).unwrap();
    assert_eq!(r.value, AirlineRegistration::Pending { votes: 1, required: 2 });
    assert!(r.emitted("AirlineVote"));
    assert!(!app.is_airline(&a4));
    assert_eq!(app.airline_votes(&a4), (1, 2));

    let r = app.register_airline(a4, a1).unwrap();
    assert_eq!(r.value, AirlineRegistration::Registered { votes: 2 });
    assert!(app.is_airline(&a4));
    assert!(!app.is_active(&a4));

    let err = app.register_airline(a4, a2).unwrap_err();
    assert!(matches!(err, SuretyError::AlreadyRegistered(_)));

    app.activate_airline(10 * UNIT, a4).unwrap();
    assert!(app.is_active(&a4));
}

#[test]
fn airline_registers_flight() {
    let mut app = deploy();
    app.activate_airline(10 * UNIT, first_airline()).unwrap();
    let r = app
        .register_flight(first_airline(), FLIGHT, TIMESTAMP, first_airline())
        .unwrap();
    assert!(matches!(r.events[0], SuretyEvent::RegisterFlight { .. }));
    assert_eq!(r.value, app.get_flight_key(&first_airline(), FLIGHT, TIMESTAMP));

    assert_eq!(
        app.fetch_flight_buffer(&first_airline(), FLIGHT),
        FlightBuffer {
            is_registered: true,
            status: StatusCode::Unknown,
            timestamp: TIMESTAMP,
            airline: first_airline(),
        }
    );
}

#[test]
fn passenger_buys_insurance_up_to_cap() {
    let mut app = deploy_with_flight();
    let passenger = account(6);

    let err = app.buy(first_airline(), FLIGHT, UNIT + 1, passenger).unwrap_err();
    assert!(matches!(err, SuretyError::InvalidAmount { .. }));
    let err = app.buy(first_airline(), "XX0001", UNIT / 2, passenger).unwrap_err();
    assert!(matches!(err, SuretyError::UnknownFlight { .. }));

    app.buy(first_airline(), FLIGHT, UNIT / 2, passenger).unwrap();
    assert_eq!(
        app.fetch_flight_insured(&passenger, &first_airline(), FLIGHT),
        PolicyView {
            is_insured: true,
            amount_paid: UNIT / 2,
            credited_amount: 0,
        }
    );
}

#[test]
fn oracle_registration_requires_exact_fee() {
    let mut app = deploy();
    let err = app.register_oracle(UNIT / 2, account(30)).unwrap_err();
    assert!(matches!(err, SuretyError::InvalidFunding { .. }));
    assert!(app.get_my_indexes(&account(30)).is_err());

    let r = app.register_oracle(UNIT, account(30)).unwrap();
    assert_eq!(app.get_my_indexes(&account(30)).unwrap(), r.value);
    let err = app.register_oracle(UNIT, account(30)).unwrap_err();
    assert!(matches!(err, SuretyError::AlreadyRegistered(_)));
}

#[test]
fn end_to_end_delay_payout() {
    let mut app = deploy_with_flight();
    let passenger = account(6);
    assert_eq!(app.fetch_flight_buffer(&first_airline(), FLIGHT).status, StatusCode::Unknown);

    app.buy(first_airline(), FLIGHT, UNIT / 2, passenger).unwrap();
    register_oracles(&mut app, 1..20);

    let r = app
        .fetch_flight_status(first_airline(), FLIGHT, TIMESTAMP, owner())
        .unwrap();
    assert!(r.emitted("OracleRequest"));

    let outcomes = answer_all(&mut app, 1..20, 20);
    let finalized: Vec<_> = outcomes
        .iter()
        .filter(|o| matches!(o, ResponseOutcome::Finalized { .. }))
        .collect();
    assert_eq!(finalized.len(), 1);
    assert_eq!(
        *finalized[0],
        ResponseOutcome::Finalized {
            status: StatusCode::LateAirline,
            applied: true,
            policies_credited: 1,
            credited: 3 * UNIT / 4,
        }
    );
    assert!(outcomes.contains(&ResponseOutcome::Ignored {
        reason: IgnoreReason::RequestClosed
    }));
    assert!(outcomes.contains(&ResponseOutcome::Ignored {
        reason: IgnoreReason::NoRequest
    }));

    assert_eq!(
        app.fetch_flight_buffer(&first_airline(), FLIGHT).status,
        StatusCode::LateAirline
    );
    assert_eq!(
        app.fetch_flight_insured(&passenger, &first_airline(), FLIGHT).credited_amount,
        3 * UNIT / 4
    );
    assert_eq!(app.get_balance(&passenger), 3 * UNIT / 4);

    let mut payouts = RecordedPayouts::default();
    let r = app.withdraw_funds(passenger, &mut payouts).unwrap();
    assert_eq!(r.value, 3 * UNIT / 4);
    assert_eq!(payouts.total_to(&passenger), 3 * UNIT / 4);
    assert_eq!(app.get_balance(&passenger), 0);

    let err = app.withdraw_funds(passenger, &mut payouts).unwrap_err();
    assert!(matches!(err, SuretyError::InsufficientBalance(_)));

    // A fresh request for the resolved flight cannot credit again.
    app.fetch_flight_status(first_airline(), FLIGHT, TIMESTAMP, owner())
        .unwrap();
    answer_all(&mut app, 1..20, 20);
    assert_eq!(app.get_balance(&passenger), 0);
}

#[test]
fn non_fault_delay_credits_nobody() {
    let mut app = deploy_with_flight();
    let passenger = account(6);
    app.buy(first_airline(), FLIGHT, UNIT, passenger).unwrap();
    register_oracles(&mut app, 1..20);
    app.fetch_flight_status(first_airline(), FLIGHT, TIMESTAMP, owner())
        .unwrap();

    answer_all(&mut app, 1..20, 30);
    assert_eq!(
        app.fetch_flight_buffer(&first_airline(), FLIGHT).status,
        StatusCode::LateWeather
    );
    assert_eq!(app.get_balance(&passenger), 0);

    // Resolved flights no longer sell policies.
    let err = app.buy(first_airline(), FLIGHT, UNIT, account(7)).unwrap_err();
    assert!(matches!(err, SuretyError::FlightResolved(_)));
}

#[test]
fn minority_disagreement_does_not_block_quorum() {
    let mut app = deploy_with_flight();
    register_oracles(&mut app, 1..20);
    let index = app
        .fetch_flight_status(first_airline(), FLIGHT, TIMESTAMP, owner())
        .unwrap()
        .value;

    let holders: Vec<Address> = (1..20)
        .map(account)
        .filter(|a| app.get_my_indexes(a).unwrap().contains(&index))
        .collect();
    assert!(holders.len() >= 5, "cycling source spreads indexes evenly");

    let submit = |app: &mut FlightSurety, who: Address, code: u8| {
        app.submit_oracle_response(index, first_airline(), FLIGHT, TIMESTAMP, code, who)
            .unwrap()
            .value
    };

    assert_eq!(
        submit(&mut app, holders[0], 10),
        ResponseOutcome::Accepted { votes: 1, quorum: 3 }
    );
    assert_eq!(
        submit(&mut app, holders[1], 20),
        ResponseOutcome::Accepted { votes: 1, quorum: 3 }
    );
    // Same oracle again, even with a different code, is not counted.
    assert_eq!(
        submit(&mut app, holders[1], 10),
        ResponseOutcome::Ignored {
            reason: IgnoreReason::DuplicateResponse
        }
    );
    assert_eq!(
        submit(&mut app, holders[2], 10),
        ResponseOutcome::Accepted { votes: 2, quorum: 3 }
    );
    assert!(matches!(
        submit(&mut app, holders[3], 10),
        ResponseOutcome::Finalized {
            status: StatusCode::OnTime,
            ..
        }
    ));
    assert_eq!(
        submit(&mut app, holders[4], 20),
        ResponseOutcome::Ignored {
            reason: IgnoreReason::RequestClosed
        }
    );

    // Non-oracles and unknown codes.
    assert_eq!(
        submit(&mut app, account(99), 20),
        ResponseOutcome::Ignored {
            reason: IgnoreReason::NotAnOracle
        }
    );
    let err = app
        .submit_oracle_response(index, first_airline(), FLIGHT, TIMESTAMP, 21, holders[0])
        .unwrap_err();
    assert!(matches!(err, SuretyError::InvalidStatusCode(21)));
}

#[test]
fn fund_contract_emits_fund() {
    let mut app = deploy();
    let r = app.fund_contract(10 * UNIT, owner()).unwrap();
    assert!(r.emitted("Fund"));
    assert_eq!(app.treasury_balance(), 10 * UNIT);
}

#[test]
fn seeded_indexes_reach_quorum_with_a_large_oracle_pool() {
    let mut app = FlightSurety::deploy(DeploymentConfig {
        rng_seed: 1309,
        first_airline: Some(first_airline()),
        ..DeploymentConfig::new(owner())
    })
    .unwrap();
    app.activate_airline(10 * UNIT, first_airline()).unwrap();
    app.register_flight(first_airline(), FLIGHT, TIMESTAMP, first_airline())
        .unwrap();
    register_oracles(&mut app, 100..160);
    app.fetch_flight_status(first_airline(), FLIGHT, TIMESTAMP, owner())
        .unwrap();
    answer_all(&mut app, 100..160, 20);
    assert_eq!(
        app.fetch_flight_buffer(&first_airline(), FLIGHT).status,
        StatusCode::LateAirline
    );
}

#[test]
fn snapshot_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = DeploymentConfig::new(owner());
    cfg.first_airline = Some(first_airline());

    {
        let store = SnapshotStore::new(dir.path()).unwrap();
        let mut app = FlightSurety::open(cfg.clone(), store).unwrap();
        app.activate_airline(10 * UNIT, first_airline()).unwrap();
        app.register_flight(first_airline(), FLIGHT, TIMESTAMP, first_airline())
            .unwrap();
        app.buy(first_airline(), FLIGHT, UNIT / 4, account(6)).unwrap();
        // Rolled back: must not reach disk either.
        assert!(app.buy(first_airline(), FLIGHT, 2 * UNIT, account(7)).is_err());
    }

    let store = SnapshotStore::new(dir.path()).unwrap();
    let app = FlightSurety::open(cfg, store).unwrap();
    assert!(app.is_active(&first_airline()));
    assert!(app.fetch_flight_buffer(&first_airline(), FLIGHT).is_registered);
    assert_eq!(
        app.fetch_flight_insured(&account(6), &first_airline(), FLIGHT).amount_paid,
        UNIT / 4
    );
    assert!(!app.fetch_flight_insured(&account(7), &first_airline(), FLIGHT).is_insured);
    assert!(app.journal_root().is_some());
    assert_eq!(app.treasury_balance(), 10 * UNIT + UNIT / 4);
}

#[test]
fn oracles_without_the_request_index_are_not_counted() {
    let mut app = deploy_with_flight();
    register_oracles(&mut app, 1..20);
    let index = app
        .fetch_flight_status(first_airline(), FLIGHT, TIMESTAMP, owner())
        .unwrap()
        .value;

    let (holders, outsiders): (Vec<Address>, Vec<Address>) = (1..20)
        .map(account)
        .partition(|a| app.get_my_indexes(a).unwrap().contains(&index));
    assert!(outsiders.len() >= 10);

    let journal_len = app.journal().len();
    for who in &outsiders {
        let r = app
            .submit_oracle_response(index, first_airline(), FLIGHT, TIMESTAMP, 20, *who)
            .unwrap();
        assert_eq!(
            r.value,
            ResponseOutcome::Ignored {
                reason: IgnoreReason::IndexMismatch
            }
        );
        assert!(r.events.is_empty());
        // Out-of-table codes from ineligible oracles are ignored the same way.
        let r = app
            .submit_oracle_response(index, first_airline(), FLIGHT, TIMESTAMP, 21, *who)
            .unwrap();
        assert!(matches!(r.value, ResponseOutcome::Ignored { .. }));
    }
    assert_eq!(app.journal().len(), journal_len);
    assert_eq!(
        app.fetch_flight_buffer(&first_airline(), FLIGHT).status,
        StatusCode::Unknown
    );

    // The request is still open for the oracles that do hold the index.
    for who in holders.iter().take(3) {
        app.submit_oracle_response(index, first_airline(), FLIGHT, TIMESTAMP, 20, *who)
            .unwrap();
    }
    assert_eq!(
        app.fetch_flight_buffer(&first_airline(), FLIGHT).status,
        StatusCode::LateAirline
    );
}

#[test]
fn only_the_airline_itself_registers_its_flights() {
    let mut app = deploy();
    app.activate_airline(10 * UNIT, first_airline()).unwrap();
    let err = app
        .register_flight(first_airline(), FLIGHT, TIMESTAMP, account(9))
        .unwrap_err();
    assert_eq!(err.kind(), "NotActiveError");
    assert!(!app.fetch_flight_buffer(&first_airline(), FLIGHT).is_registered);
}

#[test]
fn restart_under_a_new_app_id_keeps_the_registry_usable() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = DeploymentConfig::new(owner());
    cfg.first_airline = Some(first_airline());
    {
        let store = SnapshotStore::new(dir.path()).unwrap();
        let mut app = FlightSurety::open(cfg.clone(), store).unwrap();
        app.activate_airline(10 * UNIT, first_airline()).unwrap();
    }

    let new_app = account(0xB00);
    let mut moved = cfg.clone();
    moved.app_id = new_app;
    {
        let store = SnapshotStore::new(dir.path()).unwrap();
        let mut app = FlightSurety::open(moved, store).unwrap();
        assert!(app.is_authorized_caller(&new_app));
        app.register_flight(first_airline(), FLIGHT, TIMESTAMP, first_airline())
            .expect("new app id is admitted on restore");
        app.buy(first_airline(), FLIGHT, UNIT / 2, account(6)).unwrap();
    }

    // Opting out of authorization leaves the persisted allow-list alone.
    let mut locked = cfg.clone();
    locked.app_id = account(0xC00);
    locked.authorize_app = false;
    let store = SnapshotStore::new(dir.path()).unwrap();
    let mut app = FlightSurety::open(locked, store).unwrap();
    assert!(!app.is_authorized_caller(&account(0xC00)));
    assert!(app.is_authorized_caller(&new_app));
    let err = app.fund_contract(UNIT, owner()).unwrap_err();
    assert!(matches!(err, SuretyError::Authorization { .. }));

    // Someone else's config cannot take over the restored registry.
    let mut stranger = cfg;
    stranger.owner = account(77);
    let store = SnapshotStore::new(dir.path()).unwrap();
    let err = FlightSurety::open(stranger, store).err().unwrap();
    assert_eq!(err.kind(), "ConfigError");
}
