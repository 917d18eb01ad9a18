use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tokio::time::MissedTickBehavior;
use tracing::info;
use tracing_subscriber::EnvFilter;

use xaal_beacon::clock::{ClockSource, SystemClock};
use xaal_beacon::config;
use xaal_beacon::link::InterfaceLink;
use xaal_beacon::publisher::{Publisher, UdpTransport};
use xaal_beacon::scheduler::{ScheduleState, Scheduler};
use xaal_beacon::sensor::SimulatedLoadCell;
use xaal_beacon::transmitter::Transmitter;
use xaal_beacon::{Result, MULTICAST_GROUP};

#[derive(Parser, Debug)]
#[command(name = "xaal-beacon")]
#[command(about = "Periodic xAAL presence and load-cell telemetry over encrypted multicast")]
struct Cli {
    #[arg(long, env = "XAAL_BEACON_CONFIG", default_value = "xaal-beacon.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,xaal_beacon=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
    let cli = Cli::parse();

    let cfg = config::load_from_file(&cli.config)?;
    let link = InterfaceLink::new(MULTICAST_GROUP, cfg.port);
    let transport = UdpTransport::multicast(MULTICAST_GROUP, cfg.port, cfg.multicast_ttl)?;
    let mut tx = Transmitter::new(cfg.key.clone(), SystemClock::new(), Publisher::new(transport, link.clone()));

    let scheduler = Scheduler::new(cfg.identity(), cfg.intervals());
    let mut sensor = SimulatedLoadCell::new(cfg.sensor.calibration_factor, cfg.sensor.load, cfg.sensor.noise)?;
    let mut state = ScheduleState::default();

    info!(
        address = %cfg.device_uuid,
        device_type = %cfg.device_type,
        group = %MULTICAST_GROUP,
        port = cfg.port,
        "xaal beacon started"
    );

    let mut ticker = tokio::time::interval(Duration::from_millis(cfg.schedule.tick_millis));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let now = tx.clock().now_seconds();
                let info = if scheduler.due(&state, now).presence {
                    link.local_ip().map(|ip| ip.to_string())
                } else {
                    None
                };
                state = scheduler.tick(state, now, info.as_deref(), &mut tx, &mut sensor);
            }
            _ = &mut shutdown => {
                info!("shutting down");
                break;
            }
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
