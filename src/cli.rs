// src/cli.rs
//
// Command-line surface: argument parsing and the subcommand handlers.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::io::serial::{list_serial_ports, open_serial, prompt_for_port};
use crate::io::{run_decoder_loop, ByteSource, CaptureFormat, CaptureSource};
use crate::logging::{init_file_logging, set_verbose};
use crate::protocol::{AssemblerConfig, ReceiveAssembler, ValidationMode};
use crate::settings::{default_settings_path, load_settings, save_settings, OutputFormat, Settings};
use crate::sink::{ConsoleSink, DecodeSink, JsonSink};

/// Battery tester link decoder: status reports and cranking voltage charts.
#[derive(Parser, Debug)]
#[command(name = "kbtinfo", version)]
pub struct Cli {
    /// Settings file (default: <config dir>/kbtinfo/settings.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Also write the log to a timestamped file in this directory.
    #[arg(long, global = true)]
    pub log_dir: Option<PathBuf>,
    /// Log every delivery and frame as hex.
    #[arg(long, short, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub cmd: Cmd,
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// Open the tester's serial port and decode until interrupted.
    Listen {
        /// Serial port; prompts when neither this nor auto-connect names one.
        #[arg(long)]
        port: Option<String>,
        #[arg(long)]
        baud: Option<u32>,
        /// Decode frames whose checksum or trailer is wrong.
        #[arg(long)]
        permissive: bool,
        /// Print one JSON object per decoded frame.
        #[arg(long)]
        json: bool,
    },
    /// List available serial ports.
    Ports,
    /// Replay a capture file through the decoder.
    Decode {
        file: PathBuf,
        /// File holds hex text instead of raw bytes.
        #[arg(long)]
        hex: bool,
        /// Bytes per delivery, to mimic a live link (default: whole file at once).
        #[arg(long)]
        chunk: Option<usize>,
        #[arg(long)]
        permissive: bool,
        #[arg(long)]
        json: bool,
    },
    /// Change or print the saved settings.
    Config {
        /// Port to remember.
        #[arg(long)]
        port: Option<String>,
        /// Connect to the remembered port without prompting.
        #[arg(long)]
        auto_connect: Option<bool>,
        #[arg(long)]
        show: bool,
    },
}

// ============================================================================
// Execution
// ============================================================================

pub fn execute(cli: Cli) -> Result<(), String> {
    set_verbose(cli.verbose);

    let settings_path = match cli.config {
        Some(path) => path,
        None => default_settings_path()?,
    };
    let settings = load_settings(&settings_path)?;

    if let Some(dir) = cli
        .log_dir
        .or_else(|| settings.log_dir.as_ref().map(PathBuf::from))
    {
        init_file_logging(&dir)?;
    }

    match cli.cmd {
        Cmd::Listen {
            port,
            baud,
            permissive,
            json,
        } => listen(&settings, port, baud, permissive, json),
        Cmd::Ports => print_ports(),
        Cmd::Decode {
            file,
            hex,
            chunk,
            permissive,
            json,
        } => decode_file(&settings, &file, hex, chunk, permissive, json),
        Cmd::Config {
            port,
            auto_connect,
            show,
        } => configure(&settings_path, settings, port, auto_connect, show),
    }
}

fn assembler_config(settings: &Settings, permissive: bool) -> AssemblerConfig {
    let mut config = settings.assembler_config();
    if permissive {
        config.validation = ValidationMode::Permissive;
    }
    config
}

fn make_sink(settings: &Settings, json: bool) -> Box<dyn DecodeSink> {
    let format = if json {
        OutputFormat::Json
    } else {
        settings.output
    };
    match format {
        OutputFormat::Text => Box::new(ConsoleSink::new(std::io::stdout())),
        OutputFormat::Json => Box::new(JsonSink::new(std::io::stdout())),
    }
}

fn run_source(
    source: &mut dyn ByteSource,
    config: AssemblerConfig,
    sink: &mut dyn DecodeSink,
    idle_sleep: Duration,
) -> Result<(), String> {
    tlog!(
        "[decoder] validation={:?} retry_policy={:?} retry_limit={} time_axis={:?}",
        config.validation,
        config.retry_policy,
        config.retry_limit,
        config.time_axis
    );
    let mut assembler = ReceiveAssembler::new(config);
    run_decoder_loop(source, &mut assembler, sink, idle_sleep)?;
    Ok(())
}

fn listen(
    settings: &Settings,
    port: Option<String>,
    baud: Option<u32>,
    permissive: bool,
    json: bool,
) -> Result<(), String> {
    let port = match port.or_else(|| settings.auto_connect_port().map(str::to_string)) {
        Some(port) => port,
        None => {
            let ports = list_serial_ports()?;
            prompt_for_port(&ports, std::io::stdin().lock(), std::io::stdout())?
        }
    };
    let baud = baud.unwrap_or(settings.baud_rate);

    let mut source = open_serial(&port, baud)?;
    let mut sink = make_sink(settings, json);
    run_source(
        &mut source,
        assembler_config(settings, permissive),
        sink.as_mut(),
        Duration::from_millis(settings.poll_interval_ms),
    )
}

fn print_ports() -> Result<(), String> {
    let ports = list_serial_ports()?;
    if ports.is_empty() {
        println!("No serial ports available");
    }
    for port in &ports {
        match (port.vid, port.pid) {
            (Some(vid), Some(pid)) => println!(
                "{} ({}) [{} {:04x}:{:04x}]",
                port.port_name,
                port.description(),
                port.port_type,
                vid,
                pid
            ),
            _ => println!(
                "{} ({}) [{}]",
                port.port_name,
                port.description(),
                port.port_type
            ),
        }
    }
    Ok(())
}

fn decode_file(
    settings: &Settings,
    file: &Path,
    hex: bool,
    chunk: Option<usize>,
    permissive: bool,
    json: bool,
) -> Result<(), String> {
    let format = if hex {
        CaptureFormat::Hex
    } else {
        CaptureFormat::Raw
    };
    let mut source = CaptureSource::open(file, format, chunk)?;
    let mut sink = make_sink(settings, json);
    run_source(
        &mut source,
        assembler_config(settings, permissive),
        sink.as_mut(),
        Duration::ZERO,
    )
}

fn configure(
    path: &Path,
    mut settings: Settings,
    port: Option<String>,
    auto_connect: Option<bool>,
    show: bool,
) -> Result<(), String> {
    let changed = port.is_some() || auto_connect.is_some();

    if let Some(port) = port {
        // Remember what the port was when it was chosen
        settings.port_description = list_serial_ports()
            .ok()
            .and_then(|ports| ports.into_iter().find(|p| p.port_name == port))
            .map(|p| p.description());
        settings.port = Some(port);
    }
    if let Some(auto_connect) = auto_connect {
        settings.auto_connect = auto_connect;
    }
    if changed {
        save_settings(path, &settings)?;
    }

    if show || !changed {
        let content = toml::to_string_pretty(&settings)
            .map_err(|e| format!("Failed to serialize settings: {}", e))?;
        println!("# {}", path.display());
        print!("{}", content);
    }
    Ok(())
}
