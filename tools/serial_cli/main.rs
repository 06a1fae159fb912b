// tools/serial_cli/main.rs
//
// Command-line driver for the serial connection manager.
// Lists ports, or connects and bridges stdin lines to the device while
// printing inbound data as a timestamped transcript.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};

use serial_debug_lib::{
    init_logging, load_settings, scan_ports, BaudRate, ConnectionState, DataBits,
    InboundEvent, LineConfig, LineEnding, ManagerSettings, ManagerUpdate, Parity,
    PortIdentifier, SerialError, SerialManager, StopBits,
};

#[derive(Parser, Debug)]
#[command(version, about = "SerialDebug command-line driver")]
struct Cli {
    /// Settings file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand, Debug)]
enum CliCommand {
    /// List serial ports
    List,
    /// Connect to a port; stdin lines are sent, Ctrl-D disconnects
    Connect {
        /// Port identifier as shown by `list` (e.g. cu.usbserial-0001)
        port: String,
        #[arg(short, long)]
        baud: Option<u32>,
        #[arg(long)]
        data_bits: Option<u8>,
        /// none | odd | even
        #[arg(long)]
        parity: Option<Parity>,
        /// 1 | 1.5 | 2
        #[arg(long)]
        stop_bits: Option<StopBits>,
        /// none | cr | lf | crlf
        #[arg(long)]
        line_ending: Option<LineEnding>,
        /// Print received bytes as hex
        #[arg(long)]
        hex: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => match load_settings(path) {
            Ok(settings) => settings,
            Err(e) => {
                eprintln!("{}", e);
                return ExitCode::FAILURE;
            }
        },
        None => ManagerSettings::default(),
    };

    if let Err(e) = init_logging(&settings) {
        eprintln!("{}", e);
    }

    match cli.command {
        CliCommand::List => list(settings).await,
        CliCommand::Connect {
            port,
            baud,
            data_bits,
            parity,
            stop_bits,
            line_ending,
            hex,
        } => {
            let defaults = settings.default_line;
            let config = LineConfig {
                baud_rate: baud.map(BaudRate::from_rate).unwrap_or(defaults.baud_rate),
                data_bits: data_bits.map(DataBits::from_bits).unwrap_or(defaults.data_bits),
                parity: parity.unwrap_or(defaults.parity),
                stop_bits: stop_bits.unwrap_or(defaults.stop_bits),
            };
            let ending = line_ending.unwrap_or(settings.default_line_ending);
            session(settings, PortIdentifier::from(port), config, ending, hex).await
        }
    }
}

async fn list(settings: ManagerSettings) -> ExitCode {
    match tokio::task::spawn_blocking(move || scan_ports(&settings)).await {
        Ok(scan) => {
            for port in &scan.ports {
                println!("{}", port);
            }
            if scan.placeholder {
                eprintln!("(no serial ports found; placeholder names shown)");
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Port scan failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn render(bytes: &[u8], hex: bool) -> String {
    if hex {
        bytes
            .iter()
            .map(|b| hex::encode_upper([*b]))
            .collect::<Vec<_>>()
            .join(" ")
    } else {
        String::from_utf8_lossy(bytes).into_owned()
    }
}

fn print_inbound(event: &InboundEvent, hex: bool) {
    println!(
        "{} RX {}",
        event.received_at.format("%H:%M:%S%.3f"),
        render(&event.bytes, hex)
    );
}

async fn session(
    settings: ManagerSettings,
    port: PortIdentifier,
    config: LineConfig,
    ending: LineEnding,
    hex: bool,
) -> ExitCode {
    let mut manager = SerialManager::new(settings);
    let Some(mut inbound) = manager.take_inbound() else {
        return ExitCode::FAILURE;
    };

    manager.connect(port, config);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut exit = ExitCode::SUCCESS;

    loop {
        tokio::select! {
            update = manager.next_update() => match update {
                Some(ManagerUpdate::State(state)) => {
                    eprintln!("-- {}", state);
                    match state {
                        ConnectionState::Failed(_) => {
                            exit = ExitCode::FAILURE;
                            break;
                        }
                        ConnectionState::Disconnected if !stdin_open => break,
                        _ => {}
                    }
                }
                Some(ManagerUpdate::Error(e)) => {
                    eprintln!("-- error: {}", e);
                    if matches!(e, SerialError::DeviceNotFound(_)) {
                        exit = ExitCode::FAILURE;
                        break;
                    }
                }
                Some(_) => {}
                None => break,
            },
            Some(event) = inbound.recv() => print_inbound(&event, hex),
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(text)) => {
                    if manager.is_connected() {
                        println!(
                            "{} TX {}",
                            chrono::Local::now().format("%H:%M:%S%.3f"),
                            render(&ending.encode(&text), hex)
                        );
                    }
                    manager.send_text(&text, ending);
                    if let Some(e) = manager.last_error() {
                        if !manager.is_connected() {
                            eprintln!("-- error: {}", e);
                        }
                    }
                }
                Ok(None) | Err(_) => {
                    stdin_open = false;
                    manager.disconnect();
                }
            },
        }
    }

    manager.shutdown().await;
    exit
}
