//! Prints what a StageLinq player is doing, one JSON line per event.
//!
//! ```text
//! now-playing <address:port> <device-id> [PLAYER|CONTROLLER|MIXER] [deck-count]
//! ```
//!
//! The address is the device's StateMap service. Set `STAGELINQ_LOG=debug`
//! to see the protocol traffic.

use stagelinq::logging::init_logging;
use stagelinq::prelude::*;
use tokio::sync::broadcast::error::RecvError;

// ---------------------------------------------------------------------------
// Arguments
// ---------------------------------------------------------------------------

const USAGE: &str = "usage: now-playing <address:port> <device-id> [unit-type] [deck-count]";

fn parse_args() -> Result<DeviceInfo, Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let address = args.next().ok_or(USAGE)?.parse()?;
    let device_id: DeviceId = args.next().ok_or(USAGE)?.parse()?;
    let unit_type = args
        .next()
        .map(|name| UnitType::from_name(&name.to_ascii_uppercase()))
        .unwrap_or(UnitType::Player);
    let deck_count = match args.next() {
        Some(n) => n.parse()?,
        None => 4,
    };

    Ok(DeviceInfo {
        device_id,
        unit_type,
        deck_count,
        address,
    })
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging()?;
    let info = parse_args()?;

    let client = StageLinq::new();
    let mut status = client.subscribe_status();
    let mut devices = client.subscribe_devices();

    eprintln!("connecting to {} ({}) at {}", info.device_id, info.unit_type, info.address);
    client.connect(info).await?;

    loop {
        tokio::select! {
            event = status.recv() => match event {
                Ok(event) => println!(
                    "{}",
                    serde_json::json!({ "event": event.kind.name(), "status": event.status })
                ),
                Err(RecvError::Lagged(n)) => eprintln!("skipped {n} events"),
                Err(RecvError::Closed) => break,
            },
            event = devices.recv() => {
                if let Ok(DeviceEvent::Disconnected(id)) = event {
                    eprintln!("{id} disconnected");
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    client.shutdown().await;
    Ok(())
}
