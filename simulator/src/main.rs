mod telemetry;

use clap::Parser;
use rand::Rng;
use std::time::Duration;
use telemetry::{encode, Device};
use tracing::{error, info, warn};

/// Highest rate the microsecond ticker can pace.
const MAX_RATE: u64 = 1_000_000;

/// Posts synthetic RuuviTag measurements to an edge receiver.
#[derive(Debug, Parser)]
#[command(name = "simulator", version)]
struct Args {
    /// Ingestion endpoint of the receiver
    #[arg(long, env = "RECEIVER_URL", default_value = "http://localhost:8088/event")]
    url: String,

    /// Events per second
    #[arg(long, env = "RATE", default_value_t = 50)]
    rate: u64,

    /// Number of simulated devices
    #[arg(long, env = "DEVICES", default_value_t = 10)]
    devices: usize,

    /// Stop after this many events (runs forever if unset)
    #[arg(long, env = "COUNT")]
    count: Option<u64>,

    /// Fraction of events sent with a missing measurement field
    #[arg(long, env = "INVALID_RATIO", default_value_t = 0.0)]
    invalid_ratio: f64,
}

impl Args {
    fn validate(&self) -> Result<(), String> {
        if !(1..=MAX_RATE).contains(&self.rate) {
            return Err(format!("rate must be within [1, {}]", MAX_RATE));
        }
        if self.devices == 0 {
            return Err("devices must be positive".to_string());
        }
        if !(0.0..=1.0).contains(&self.invalid_ratio) {
            return Err("invalid-ratio must be within [0, 1]".to_string());
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    if let Err(e) = args.validate() {
        error!("{}", e);
        std::process::exit(2);
    }

    info!("Starting sensor simulator");
    info!(
        "Target: {}, Rate: {} events/s, Devices: {}",
        args.url, args.rate, args.devices
    );

    let client = match reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to build HTTP client: {}", e);
            std::process::exit(1);
        }
    };

    let mut rng = rand::thread_rng();
    let mut devices: Vec<Device> = (0..args.devices).map(|_| Device::random(&mut rng)).collect();

    let interval = Duration::from_micros(1_000_000 / args.rate);
    let mut ticker = tokio::time::interval(interval);

    let mut sent = 0u64;
    let mut accepted = 0u64;
    let mut rejected = 0u64;

    loop {
        if args.count.is_some_and(|count| sent >= count) {
            break;
        }
        ticker.tick().await;

        let device = &mut devices[(sent % args.devices as u64) as usize];
        let event = device.next_event(&mut rng);
        let incomplete = rng.gen_bool(args.invalid_ratio);

        let body = match encode(&event, incomplete, &mut rng) {
            Ok(body) => body,
            Err(e) => {
                error!("Failed to serialize event: {}", e);
                continue;
            }
        };
        sent += 1;

        match client
            .post(&args.url)
            .header("content-type", "application/json")
            .body(body)
            .send()
            .await
        {
            Ok(resp) if resp.status().is_success() => accepted += 1,
            Ok(resp) => {
                rejected += 1;
                if !incomplete {
                    warn!(
                        "Event from {} rejected with {}",
                        event.source_uuid,
                        resp.status()
                    );
                }
            }
            Err(e) => {
                rejected += 1;
                warn!("Failed to post event: {}", e);
            }
        }

        if sent % 1000 == 0 {
            info!(
                "Sent {} events ({} accepted, {} rejected)",
                sent, accepted, rejected
            );
        }
    }

    info!(
        "Done: {} events sent, {} accepted, {} rejected",
        sent, accepted, rejected
    );
}
