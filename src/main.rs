use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

use micronix_serial::config::{DEFAULT_POLL_INTERVAL, DataBits, Parity, SerialSettings, StopBits};
use micronix_serial::controller::{Command, ErrorCode, list_ports};
use micronix_serial::{PollEvent, Poller, Reading, Session};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Talk to a Micronix MMC motion controller over serial
#[derive(Debug, Parser)]
#[command(name = "micronix", version)]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,

    #[command(subcommand)]
    action: Action,
}

#[derive(Debug, Args)]
struct ConnectionArgs {
    /// JSON settings file; flags below override its values
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Serial port, e.g. /dev/ttyUSB0 or COM3
    #[arg(long, short, global = true)]
    port: Option<String>,

    #[arg(long, global = true)]
    baud: Option<u32>,

    #[arg(long, global = true)]
    data_bits: Option<DataBits>,

    #[arg(long, global = true)]
    parity: Option<Parity>,

    #[arg(long, global = true)]
    stop_bits: Option<StopBits>,

    /// Read timeout in milliseconds
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,
}

#[derive(Debug, Subcommand)]
enum Action {
    /// Send a command and print the controller's reply
    Exec {
        axis: String,
        command: String,
        #[arg(allow_negative_numbers = true)]
        params: Vec<String>,
    },
    /// Send a read-only query (`<axis><command>?`) once
    Query { axis: String, command: String },
    /// Repeat a query until Ctrl-C or the link fails
    Poll {
        axis: String,
        command: String,
        #[arg(
            long,
            default_value_t = DEFAULT_POLL_INTERVAL.as_millis() as u64,
            value_parser = clap::value_parser!(u64).range(1..)
        )]
        interval_ms: u64,
        /// Print one JSON object per reading
        #[arg(long)]
        json: bool,
    },
    /// List the instruction set
    Commands,
    /// List the controller error codes
    Errors,
    /// List serial ports
    Ports {
        /// Include non-FTDI ports
        #[arg(long)]
        all: bool,
    },
}

impl ConnectionArgs {
    fn settings(&self) -> Result<SerialSettings, BoxError> {
        let mut settings = match (&self.config, &self.port) {
            (Some(path), _) => SerialSettings::load(path)?,
            (None, Some(port)) => SerialSettings::new(port.clone()),
            (None, None) => return Err("no serial port given (use --port or --config)".into()),
        };

        if let Some(port) = &self.port {
            settings.port = port.clone();
        }
        if let Some(baud) = self.baud {
            settings = settings.with_baud_rate(baud);
        }
        if let Some(bits) = self.data_bits {
            settings.data_bits = bits;
        }
        if let Some(parity) = self.parity {
            settings.parity = parity;
        }
        if let Some(bits) = self.stop_bits {
            settings.stop_bits = bits;
        }
        if let Some(ms) = self.timeout_ms {
            settings = settings.with_timeout(Duration::from_millis(ms));
        }
        Ok(settings)
    }

    fn open(&self) -> Result<Session, BoxError> {
        let mut session = Session::new(self.settings()?);
        session.open()?;
        Ok(session)
    }
}

fn print_reading(reading: &Reading) {
    match reading.value() {
        Some(v) => println!("{}", v),
        None => println!("No response or invalid"),
    }
}

async fn run(cli: Cli) -> Result<(), BoxError> {
    match cli.action {
        Action::Exec {
            axis,
            command,
            params,
        } => {
            let mut session = cli.connection.open()?;
            let params: Vec<&dyn std::fmt::Display> =
                params.iter().map(|p| p as &dyn std::fmt::Display).collect();
            let response = session.execute_command(&axis, command.as_str(), &params)?;
            println!("{}", response);
        }
        Action::Query { axis, command } => {
            let mut session = cli.connection.open()?;
            let reading = session.poll_value(&axis, command.as_str())?;
            print_reading(&reading);
        }
        Action::Poll {
            axis,
            command,
            interval_ms,
            json,
        } => {
            // reject typos before touching the port
            let command: Command = command.parse()?;
            let session = cli.connection.open()?;

            let mut poller = Poller::start(
                session,
                axis,
                command,
                Duration::from_millis(interval_ms),
                move |event| match event {
                    PollEvent::Reading(result) if json => match serde_json::to_string(&result) {
                        Ok(line) => println!("{}", line),
                        Err(e) => error!("Failed to encode reading: {}", e),
                    },
                    PollEvent::Reading(result) => print_reading(&result.reading),
                    PollEvent::DeviceError { code, .. } => eprintln!("{}", code.message()),
                    PollEvent::Failed(e) => eprintln!("Polling stopped: {}", e),
                },
            );

            // a failed link ends the loop without waiting for Ctrl-C
            let target = format!("{}{}", poller.axis(), poller.command());
            tokio::select! {
                interrupted = tokio::signal::ctrl_c() => {
                    interrupted?;
                    info!("Interrupted, stopping poll of {}", target);
                }
                _ = poller.finished() => info!("Poll of {} ended", target),
            }
            let mut session = poller.stop().await?;
            session.close();
        }
        Action::Commands => {
            for cmd in Command::ALL {
                println!("{} - {}", cmd.mnemonic(), cmd.description());
            }
        }
        Action::Errors => {
            for code in ErrorCode::ALL {
                println!("{:>3} {}", code.code(), code.message());
            }
        }
        Action::Ports { all } => {
            let ports = list_ports(!all)?;
            if ports.is_empty() {
                println!("No matching serial ports found");
            }
            for port in ports {
                match (&port.manufacturer, &port.product) {
                    (Some(m), Some(p)) => println!("{}  ({} {})", port.name, m, p),
                    (Some(m), None) => println!("{}  ({})", port.name, m),
                    _ => println!("{}", port.name),
                }
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    // Setup logging (set RUST_LOG=debug for per-query detail)
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exec_accepts_negative_params() {
        let cli = Cli::try_parse_from(["micronix", "-p", "COM3", "exec", "1", "MVR", "-5", "-0.25"]).unwrap();
        match cli.action {
            Action::Exec { axis, command, params } => {
                assert_eq!(axis, "1");
                assert_eq!(command, "MVR");
                assert_eq!(params, vec!["-5", "-0.25"]);
            }
            other => panic!("unexpected action {other:?}"),
        }
    }

    #[test]
    fn test_poll_rejects_zero_interval() {
        assert!(Cli::try_parse_from(["micronix", "poll", "1", "POS", "--interval-ms", "0"]).is_err());
        let cli = Cli::try_parse_from(["micronix", "poll", "1", "POS", "--interval-ms", "5"]).unwrap();
        assert!(matches!(cli.action, Action::Poll { interval_ms: 5, .. }));
    }

    #[test]
    fn test_flags_override_settings() {
        let cli = Cli::try_parse_from([
            "micronix", "--port", "COM3", "--baud", "9600", "--timeout-ms", "50", "commands",
        ])
        .unwrap();
        let settings = cli.connection.settings().unwrap();
        assert_eq!(settings.port, "COM3");
        assert_eq!(settings.baud_rate, 9600);
        assert_eq!(settings.timeout, Duration::from_millis(50));
    }
}
