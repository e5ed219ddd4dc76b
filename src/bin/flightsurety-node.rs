use flightsurety_core::dispatch::{Request, Response, dispatch};
use flightsurety_core::insurance::RecordedPayouts;
use flightsurety_core::storage::SnapshotStore;
use flightsurety_core::{DeploymentConfig, FlightSurety};
use std::env;
use std::fs;
use std::io::{self, BufRead, BufReader, Write};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let mut config_path: Option<String> = None;
    let mut data_dir: Option<String> = None;
    let mut script_path: Option<String> = None;

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => config_path = args.next(),
            "--data-dir" => data_dir = args.next(),
            "--script" => script_path = args.next(),
            _ => {
                eprintln!("unknown arg {}", arg);
                eprintln!("usage: flightsurety-node --config <json> [--data-dir <dir>] [--script <jsonl>]");
                std::process::exit(2);
            }
        }
    }

    let config_path = config_path.expect("missing --config");
    let config_json = fs::read_to_string(&config_path).expect("read config");
    let config: DeploymentConfig = serde_json::from_str(&config_json).expect("parse config json");

    let mut app = match data_dir {
        Some(dir) => {
            let store = SnapshotStore::new(&dir).expect("open data dir");
            FlightSurety::open(config, store).expect("open registry")
        }
        None => FlightSurety::deploy(config).expect("deploy registry"),
    };

    let input: Box<dyn BufRead> = match script_path {
        Some(path) => Box::new(BufReader::new(fs::File::open(path).expect("open script"))),
        None => Box::new(BufReader::new(io::stdin())),
    };

    let mut payouts = RecordedPayouts::default();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut handled = 0usize;
    for (lineno, line) in input.lines().enumerate() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                warn!(error = %e, "read failed; stopping");
                break;
            }
        };
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let resp = match serde_json::from_str::<Request>(line) {
            Ok(req) => dispatch(&mut app, &mut payouts, req),
            Err(e) => {
                warn!(line = lineno + 1, error = %e, "bad request");
                Response {
                    ok: false,
                    result: None,
                    events: Vec::new(),
                    error: Some(e.to_string()),
                    kind: Some("BadRequest".into()),
                }
            }
        };
        handled += 1;
        let encoded = serde_json::to_string(&resp).unwrap_or_else(|e| format!(r#"{{"ok":false,"error":"{}"}}"#, e));
        if writeln!(out, "{}", encoded).is_err() {
            break;
        }
    }

    info!(
        requests = handled,
        payouts = payouts.transfers.len(),
        journal = app.journal().len(),
        "script complete"
    );
}
