//! Command-line front end for the YM2149 MIDI synthesizer.
//!
//! Without `--hardware` every command runs against a simulated chip, which is
//! enough to check a MIDI stream or a configuration file on a development
//! machine.

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use ym2149_midi::bus::sim::SimulatedPsg;
use ym2149_midi::config::DEFAULT_CONFIG_FILE;
use ym2149_midi::synth::{ByteSource, ChannelSource, SliceSource};
use ym2149_midi::ym2149::demo;
use ym2149_midi::{
    AllocationClock, ChipKind, PortConfig, PortIo, Synth, SynthesisBackend, Ym2149Driver,
};

/// Idle time between polls when no byte is waiting
const IDLE_BACKOFF: Duration = Duration::from_millis(1);

#[derive(Parser)]
#[command(name = "ym2149-midi")]
#[command(about = "MIDI synthesizer for a YM2149 PSG on a two-port I/O bus")]
struct Cli {
    /// Port configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE, global = true)]
    config: PathBuf,

    /// Drive the real chip through /dev/port instead of the simulator
    #[arg(long, global = true)]
    hardware: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Detect sound chips and report what answered
    Detect {
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Play a raw MIDI byte stream
    Play {
        /// Input file, `-` for stdin
        #[arg(short, long, default_value = "-")]
        input: String,
        /// Chip to play on (1 = YM2149, 2 = OPL3) instead of the default
        #[arg(long)]
        chip: Option<u8>,
    },
    /// Run the audible self-test
    Selftest {
        /// Also play a C major scale
        #[arg(long)]
        scale: bool,
        /// Also play a C major arpeggio
        #[arg(long)]
        arpeggio: bool,
    },
    /// Show the effective port configuration
    Ports {
        /// Print the configuration as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Serialize)]
struct DetectReport {
    ports: PortConfig,
    detected: Vec<ChipKind>,
    active: Option<ChipKind>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let ports = PortConfig::resolve(&cli.config)?;

    match cli.command {
        Command::Detect { json } => run_detect(open_io(cli.hardware, ports)?, ports, json),
        Command::Play { input, chip } => {
            run_play(open_io(cli.hardware, ports)?, ports, &input, chip)
        }
        Command::Selftest { scale, arpeggio } => {
            run_selftest(open_io(cli.hardware, ports)?, ports, scale, arpeggio)
        }
        Command::Ports { json } => run_ports(ports, json),
    }
}

fn open_io(hardware: bool, ports: PortConfig) -> Result<Box<dyn PortIo>> {
    if !hardware {
        return Ok(Box::new(SimulatedPsg::with_ports(ports).without_op_log()));
    }

    #[cfg(unix)]
    {
        let port = ym2149_midi::bus::devport::DevPort::open()
            .context("Failed to open /dev/port (root privileges required)")?;
        Ok(Box::new(port))
    }
    #[cfg(not(unix))]
    {
        bail!("Hardware port access is only available on Unix")
    }
}

fn run_detect(bus_io: Box<dyn PortIo>, ports: PortConfig, json: bool) -> Result<()> {
    let mut synth = Synth::with_ym2149(bus_io, ports);
    let detected = synth.reinit();
    let report = DetectReport {
        ports,
        detected: detected.kinds().collect(),
        active: synth.registry().active_kind(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!(
        "Ports: address 0x{:02X}, data 0x{:02X}",
        ports.addr_port, ports.data_port
    );
    for kind in ChipKind::ALL {
        let status = if detected.has(kind) {
            "detected"
        } else {
            "not found"
        };
        println!("  {:<12} {}", kind.name(), status);
    }
    match report.active {
        Some(kind) => println!("Active: {kind}"),
        None => println!("Active: none"),
    }
    Ok(())
}

fn run_play(
    bus_io: Box<dyn PortIo>,
    ports: PortConfig,
    input: &str,
    chip: Option<u8>,
) -> Result<()> {
    let mut synth = Synth::with_ym2149(bus_io, ports);
    synth.reinit();
    if synth.registry().active_kind().is_none() {
        bail!(
            "No sound chip detected on ports 0x{:02X}/0x{:02X}",
            ports.addr_port,
            ports.data_port
        );
    }
    if let Some(id) = chip {
        let kind = synth.select_id(id)?;
        tracing::info!(chip = %kind, "playing on requested chip");
    }

    if input == "-" {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let mut buf = [0u8; 256];
            let mut stdin = io::stdin().lock();
            loop {
                match stdin.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => {
                        if buf[..n].iter().any(|&b| tx.send(b).is_err()) {
                            break;
                        }
                    }
                    Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                    Err(err) => {
                        tracing::error!("stdin read failed: {err}");
                        break;
                    }
                }
            }
        });
        let mut source = ChannelSource::new(rx);
        drive(&mut synth, &mut source, |s| s.is_closed());
    } else {
        let bytes = fs::read(input).with_context(|| format!("Failed to read '{input}'"))?;
        tracing::info!(bytes = bytes.len(), "playing {input}");
        let mut source = SliceSource::new(&bytes);
        drive(&mut synth, &mut source, |s| s.remaining() == 0);
    }

    synth.panic();
    Ok(())
}

/// Poll until `finished` reports the source is exhausted.
fn drive<S, F>(synth: &mut Synth, source: &mut S, finished: F)
where
    S: ByteSource,
    F: Fn(&S) -> bool,
{
    let mut bytes = 0usize;
    loop {
        if synth.poll(source) {
            bytes += 1;
            continue;
        }
        if finished(source) {
            break;
        }
        thread::sleep(IDLE_BACKOFF);
    }
    tracing::info!(bytes, "input finished");
}

fn run_selftest(
    bus_io: Box<dyn PortIo>,
    ports: PortConfig,
    scale: bool,
    arpeggio: bool,
) -> Result<()> {
    let mut drv = Ym2149Driver::new(bus_io, ports, AllocationClock::new());
    if !drv.detect() {
        bail!(
            "YM2149 not detected on ports 0x{:02X}/0x{:02X}",
            ports.addr_port,
            ports.data_port
        );
    }
    drv.init();

    demo::play_test_sequence(&mut drv, thread::sleep);
    if scale {
        demo::play_scale(&mut drv, thread::sleep);
    }
    if arpeggio {
        demo::play_arpeggio(&mut drv, thread::sleep);
    }

    drv.panic();
    println!("Self-test complete");
    Ok(())
}

fn run_ports(ports: PortConfig, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&ports)?);
    } else {
        println!("addr_port=0x{:02X}", ports.addr_port);
        println!("data_port=0x{:02X}", ports.data_port);
    }
    Ok(())
}
