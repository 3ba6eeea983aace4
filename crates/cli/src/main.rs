//! faucet-two CLI: command-line FaucetTwo lighting tool.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use faucet_two_core::device::discover_devices;
use faucet_two_core::hid::HidApiBackend;
use faucet_two_core::profile::{self, LightingProfile};
use faucet_two_core::report::{Button, ReportState, Rgb, Side};
use faucet_two_core::session::DeviceSession;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::warn;

/// Host update cadence while holding a report on the device.
const TICK_INTERVAL: Duration = Duration::from_millis(16);

#[derive(Parser)]
#[command(name = "faucet-two", version, about = "FaucetTwo controller lighting")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List connected FaucetTwo controllers.
    ListDevices,
    /// Color one zone and send the report.
    SetLight {
        /// Side: left or right.
        side: String,
        /// Zone position: 0 = main, 1 = inner top, 2 = outer top.
        position: u8,
        /// Color as #RRGGBB.
        color: String,
        /// Keep sending the report for this many seconds.
        #[arg(long, default_value_t = 0)]
        hold: u64,
    },
    /// Set the seven button lights from a string like 1010101.
    SetButtons {
        /// One digit per button: A, B, C, D, FX-L, FX-R, Start.
        bits: String,
        /// Keep sending the report for this many seconds.
        #[arg(long, default_value_t = 0)]
        hold: u64,
    },
    /// Load a lighting profile and send it.
    Apply {
        /// Profile JSON file.
        path: PathBuf,
        /// Keep sending the report for this many seconds.
        #[arg(long, default_value_t = 0)]
        hold: u64,
    },
    /// Print the encoded report for a profile without touching a device.
    Dump {
        /// Profile JSON file; the default profile if omitted.
        path: Option<PathBuf>,
    },
    /// Write the default profile to a file.
    SaveProfile {
        /// Destination JSON file.
        path: PathBuf,
    },
}

fn parse_bits(bits: &str) -> Result<Vec<u8>> {
    bits.chars()
        .map(|c| {
            c.to_digit(10)
                .map(|d| d as u8)
                .ok_or_else(|| anyhow::anyhow!("'{c}' in '{bits}' is not a digit"))
        })
        .collect()
}

/// Connect, apply `update` to the report, then keep ticking for `hold`
/// seconds (at least one tick). Returns the report that was sent.
fn send(hold: u64, update: impl FnOnce(&mut ReportState) -> Result<()>) -> Result<ReportState> {
    let backend = HidApiBackend::new()?;
    let mut session = DeviceSession::new();
    session.connect(&backend)?;
    session.report().update(update)?;

    let deadline = Instant::now() + Duration::from_secs(hold);
    loop {
        if let Err(e) = session.tick() {
            warn!(error = %e, "Tick failed");
        }
        if Instant::now() >= deadline {
            break;
        }
        std::thread::sleep(TICK_INTERVAL);
    }

    let sent = session.report().snapshot();
    session.disconnect();
    Ok(sent)
}

/// One `label=on/off` entry per button, in wire order.
fn button_summary(state: &ReportState) -> String {
    Button::ALL
        .iter()
        .map(|b| format!("{}={}", b.label(), if state.button(*b) { "on" } else { "off" }))
        .collect::<Vec<_>>()
        .join(" ")
}

fn load_or_default(path: Option<&Path>) -> Result<LightingProfile> {
    match path {
        Some(path) => Ok(profile::load_profile(path)?),
        None => Ok(LightingProfile::default()),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::ListDevices => {
            let backend = HidApiBackend::new()?;
            let devices = discover_devices(&backend)?;
            if devices.is_empty() {
                println!("No FaucetTwo controllers found.");
                println!("Ensure the controller is connected and you have access to its hidraw node.");
            } else {
                for dev in &devices {
                    println!(
                        "{} (VID: 0x{:04X}, PID: 0x{:04X}, path: {})",
                        dev.product.as_deref().unwrap_or("FaucetTwo"),
                        dev.vid,
                        dev.pid,
                        dev.path
                    );
                }
            }
        }
        Commands::SetLight {
            side,
            position,
            color,
            hold,
        } => {
            let parsed_side = Side::from_name(&side).ok_or_else(|| {
                anyhow::anyhow!("Unknown side '{}'. Valid sides: left, right", side)
            })?;
            let parsed_color: Rgb = color.parse()?;
            send(hold, |state| {
                if !state.set_lights(parsed_side, position, parsed_color) {
                    warn!(position, "Zone position out of range, ignored");
                }
                Ok(())
            })?;
            println!("Set {parsed_side} zone {position} to {parsed_color}");
        }
        Commands::SetButtons { bits, hold } => {
            let parsed = parse_bits(&bits)?;
            let sent = send(hold, |state| Ok(state.set_buttons(&parsed)?))?;
            println!("Button lights: {}", button_summary(&sent));
        }
        Commands::Apply { path, hold } => {
            let profile = profile::load_profile(&path)?;
            send(hold, |state| Ok(profile.apply(state)?))?;
            println!("Applied profile: {}", profile.name);
        }
        Commands::Dump { path } => {
            let profile = load_or_default(path.as_deref())?;
            let mut state = ReportState::new();
            state.init_modes();
            profile.apply(&mut state)?;
            let hex: Vec<String> = state.encode().iter().map(|b| format!("{b:02X}")).collect();
            println!("{}", hex.join(" "));
            println!("{}", button_summary(&state));
        }
        Commands::SaveProfile { path } => {
            profile::save_profile(&LightingProfile::default(), &path)
                .with_context(|| format!("saving default profile to {}", path.display()))?;
            println!("Profile saved to {:?}", path);
        }
    }

    Ok(())
}
