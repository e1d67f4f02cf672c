//! Command-line interface for the Hearth hub.

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use hearth_api::HearthConfig;
use hearth_api::config::ENV_SYNC_KEY;
use hearth_core::{DeviceStateSnapshot, ObfuscationKey, Obfuscator};
use hearth_storage::RecordStore;

/// Hearth - home-automation hub with live controller sync.
#[derive(Parser, Debug)]
#[command(name = "hearth")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Action to perform.
    #[command(subcommand)]
    command: Command,

    /// Config file (defaults to ./hearth.toml when present).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP and sync server.
    Serve {
        /// Host to bind to.
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on.
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Decode a captured sync payload.
    ///
    /// Pass "-" to read the payload from stdin. Payloads can contain bytes
    /// that cannot be passed as an argument, so stdin is the reliable input.
    Decode {
        /// The payload, or "-" for stdin.
        payload: String,

        /// Obfuscation key (defaults to HEARTH_SYNC_KEY, then the built-in key).
        #[arg(short, long)]
        key: Option<String>,
    },

    /// Encode a JSON device mapping as a sync payload.
    Encode {
        /// Mapping such as {"lamp":true}.
        json: String,

        /// Obfuscation key (defaults to HEARTH_SYNC_KEY, then the built-in key).
        #[arg(short, long)]
        key: Option<String>,
    },

    /// Manage registered devices.
    Devices {
        #[command(subcommand)]
        devices_cmd: DevicesCommand,
    },
}

#[derive(Subcommand, Debug)]
enum DevicesCommand {
    /// Register devices. Already registered names are left untouched.
    Add {
        #[arg(required = true)]
        names: Vec<String>,

        /// Database path (overrides the config).
        #[arg(long)]
        db: Option<PathBuf>,
    },

    /// List registered devices with their current state.
    List {
        /// Database path (overrides the config).
        #[arg(long)]
        db: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let json_logging = std::env::var("HEARTH_LOG_JSON")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(false);

    let default_filter = if args.verbose { "hearth=debug" } else { "hearth=info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));

    if json_logging {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .compact()
            .with_writer(std::io::stderr)
            .init();
    }

    match args.command {
        Command::Serve { host, port } => run_server(args.config.as_deref(), host, port).await,
        Command::Decode { payload, key } => decode(&payload, key),
        Command::Encode { json, key } => encode(&json, key),
        Command::Devices { devices_cmd } => run_devices_cmd(args.config.as_deref(), devices_cmd),
    }
}

async fn run_server(config: Option<&Path>, host: Option<String>, port: Option<u16>) -> Result<()> {
    let mut config = HearthConfig::load(config)?;
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    hearth_api::run(config).await
}

fn obfuscator(key: Option<String>) -> Result<Obfuscator> {
    match key.or_else(|| std::env::var(ENV_SYNC_KEY).ok()) {
        Some(key) => Ok(Obfuscator::new(
            ObfuscationKey::new(&key).context("invalid obfuscation key")?,
        )),
        None => Ok(Obfuscator::default()),
    }
}

fn decode(payload: &str, key: Option<String>) -> Result<()> {
    let obfuscator = obfuscator(key)?;
    let decoded = if payload == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("reading payload from stdin")?;
        decode_piped(&obfuscator, &buf)
    } else {
        obfuscator.deobfuscate_snapshot(payload)
    };
    let snapshot = decoded.context("payload does not decode to a device mapping")?;

    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}

/// Decode stdin input. A payload may itself end in a newline byte, so the
/// trailing newline a shell pipe adds is only dropped when the input does
/// not decode as given.
fn decode_piped(obfuscator: &Obfuscator, input: &str) -> hearth_core::Result<DeviceStateSnapshot> {
    match obfuscator.deobfuscate_snapshot(input) {
        Ok(snapshot) => Ok(snapshot),
        Err(e) => match input.strip_suffix('\n') {
            Some(trimmed) => obfuscator.deobfuscate_snapshot(trimmed),
            None => Err(e),
        },
    }
}

fn encode(json: &str, key: Option<String>) -> Result<()> {
    let snapshot = DeviceStateSnapshot::from_wire(json).context("expected a JSON object of booleans")?;
    let payload = obfuscator(key)?.obfuscate_snapshot(&snapshot)?;
    // No trailing newline: it would become part of the payload on stdin.
    print!("{}", payload);
    Ok(())
}

fn run_devices_cmd(config: Option<&Path>, cmd: DevicesCommand) -> Result<()> {
    match cmd {
        DevicesCommand::Add { names, db } => {
            let store = open_store(config, db)?;
            for name in &names {
                if store.register_device(name)? {
                    println!("Registered {}", name);
                } else {
                    println!("{} already registered", name);
                }
            }
        }
        DevicesCommand::List { db } => {
            let store = open_store(config, db)?;
            let states = store.states()?;
            if states.is_empty() {
                println!("No devices registered.");
            }
            for (device, state) in states.iter() {
                println!("{}\t{}", device, if state { "on" } else { "off" });
            }
        }
    }
    Ok(())
}

fn open_store(config: Option<&Path>, db: Option<PathBuf>) -> Result<RecordStore> {
    let path = match db {
        Some(path) => path,
        None => HearthConfig::load(config)?.storage.path,
    };
    RecordStore::open(&path).with_context(|| format!("opening store at {}", path.display()))
}
