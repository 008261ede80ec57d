use clap::{Parser, Subcommand};
use llamador_client::{CallerClient, MonitorController};
use llamador_types::{CallEvent, CallEventInput, MonitorId};
use std::sync::{Arc, Mutex};

#[derive(Parser)]
#[command(name = "llamador")]
#[command(about = "Patient-calling bridge CLI")]
struct Cli {
    /// Bridge endpoint URL
    #[arg(long, default_value = "http://127.0.0.1:3000/api/calls")]
    bridge: String,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Call a patient to a room
    Call {
        /// Patient identifier
        patient_id: String,
        /// Patient display name
        patient_name: String,
        /// Destination room/office label
        room_label: String,
        /// Target monitor (defaults to GENERAL)
        #[arg(long)]
        monitor: Option<String>,
    },
    /// Watch call announcements for a monitor
    Watch {
        /// Monitor to subscribe as (defaults to GENERAL)
        #[arg(long)]
        monitor: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = CallerClient::new(&cli.bridge)?;

    match cli.command {
        Some(Commands::Call {
            patient_id,
            patient_name,
            room_label,
            monitor,
        }) => {
            let input = CallEventInput {
                patient_id,
                patient_name,
                room_label,
                monitor_id: MonitorId::new(monitor.unwrap_or_default()),
            };
            match client.call_patient(input).await {
                Some(event) => println!(
                    "Called {} ({} -> monitor {})",
                    event,
                    format_timestamp(event.timestamp),
                    event.monitor_id
                ),
                None => eprintln!("Call could not be delivered to the bridge."),
            }
        }
        Some(Commands::Watch { monitor }) => {
            let monitor_id = MonitorId::new(monitor.unwrap_or_default());
            println!("Watching calls for {monitor_id}. Press Ctrl-C to stop.");

            let controller = Arc::new(Mutex::new(MonitorController::new(monitor_id.clone())));

            let push_controller = controller.clone();
            let _push = client.subscribe_to_calls(monitor_id, move |event| {
                announce(&push_controller, event);
            });

            let local_controller = controller.clone();
            let _local = client.on_local_call_received(move |event| {
                announce(&local_controller, event);
            });

            tokio::signal::ctrl_c().await?;
            println!("Stopped.");
        }
        None => {
            println!("No command given. Try `llamador call` or `llamador watch`.");
        }
    }

    Ok(())
}

/// Feeds one event into the shared controller and prints it when it becomes
/// the current call. Events arriving over both channels are printed once.
fn announce(controller: &Arc<Mutex<MonitorController>>, event: CallEvent) {
    let mut controller = controller.lock().unwrap_or_else(|e| e.into_inner());
    if controller.offer(event) {
        if let Some(current) = controller.current_call() {
            println!(
                "[{}] LLAMANDO {}",
                format_timestamp(current.timestamp),
                current
            );
        }
    }
}

fn format_timestamp(timestamp: i64) -> String {
    chrono::DateTime::from_timestamp_millis(timestamp)
        .map(|moment| moment.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| timestamp.to_string())
}
