//! usb-cmdb
//!
//! Configuration management for USB card readers: inventory reports,
//! snapshot-based change auditing and serial number provisioning.

use agent::config::AgentConfig;
use agent::host::host_name;
use agent::usb::{DeviceManager, RusbTransport};
use anyhow::{Context, Result, bail};
use clap::{CommandFactory, Parser, Subcommand};
use common::{ReportFormat, render, setup_logging};
use device::{MagtekDevice, Session};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "usb-cmdb")]
#[command(
    author,
    version,
    about = "USB card reader configuration and audit tool"
)]
#[command(long_about = "
Inventories MagTek card readers attached to this host, records their
configuration as JSON snapshots, reports changes since the last snapshot,
and provisions configurable serial numbers.

EXAMPLES:
    # List attached readers
    usb-cmdb list

    # Print an inventory report as name:value pairs
    usb-cmdb report --format nvp

    # Full record as indented XML
    usb-cmdb report --format pretty-xml

    # Record the current state, then later check for changes
    usb-cmdb save
    usb-cmdb audit

    # Use the first 7 characters of the factory serial number
    usb-cmdb serial copy --length 7

CONFIGURATION:
    The agent looks for configuration files in the following order:
    1. Path specified with --config
    2. ~/.config/usb-cmdb/agent.toml
    3. /etc/usb-cmdb/agent.toml
    4. Built-in defaults
")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Save default configuration to default location and exit
    #[arg(long)]
    save_config: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, value_name = "LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List matching devices
    List,

    /// Print a report for each device
    Report {
        /// Output format (csv, nvp, legacy, json, pretty-json, xml, pretty-xml)
        #[arg(short, long, default_value_t = ReportFormat::Csv)]
        format: ReportFormat,
    },

    /// Write a snapshot of each device to the snapshot directory
    Save,

    /// Compare each device to its saved snapshot
    ///
    /// Exits with status 1 if any change is found.
    Audit,

    /// Configure serial numbers
    #[command(subcommand)]
    Serial(SerialCommand),

    /// Issue a vendor reset to each reader
    Reset,
}

#[derive(Subcommand, Debug)]
enum SerialCommand {
    /// Set the configurable serial number
    Set { serial: String },

    /// Erase the configurable serial number
    Erase,

    /// Copy the leading characters of the factory serial number
    Copy {
        /// Number of characters (defaults to snapshot.serial_length)
        #[arg(short = 'n', long)]
        length: Option<usize>,
    },

    /// Set the factory serial number (only succeeds once per reader)
    Factory { serial: String },
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();

    // Handle --save-config flag early (before loading config)
    if args.save_config {
        let config = AgentConfig::default();
        let path = AgentConfig::default_path();
        config.save(&path).context("Failed to save configuration")?;
        println!("Configuration saved to: {}", path.display());
        return Ok(ExitCode::SUCCESS);
    }

    let Some(command) = args.command else {
        Args::command().print_help()?;
        return Ok(ExitCode::FAILURE);
    };

    let config = if let Some(ref path) = args.config {
        AgentConfig::load(Some(path.clone())).context("Failed to load configuration")?
    } else {
        AgentConfig::load_or_default()
    };

    // Use CLI log level if specified, otherwise use config value
    let log_level = args
        .log_level
        .as_deref()
        .unwrap_or(&config.agent.log_level);

    setup_logging(log_level).context("Failed to setup logging")?;

    info!("usb-cmdb v{}", env!("CARGO_PKG_VERSION"));

    let manager = DeviceManager::new(config.usb.clone())?;

    match command {
        Command::List => list(&manager),
        Command::Report { format } => report(&manager, format),
        Command::Save => save(&manager, &config),
        Command::Audit => audit(&manager, &config),
        Command::Serial(cmd) => serial(&manager, &config, cmd),
        Command::Reset => reset(&manager),
    }
}

fn open_sessions(manager: &DeviceManager) -> Result<Vec<Session<RusbTransport>>> {
    let sessions = manager.open_all(&host_name())?;
    if sessions.is_empty() {
        bail!("No matching devices found");
    }
    Ok(sessions)
}

fn list(manager: &DeviceManager) -> Result<ExitCode> {
    let devices = manager.list()?;
    if devices.is_empty() {
        println!("No matching devices found");
    }
    for device in devices {
        println!("{}", device);
    }
    Ok(ExitCode::SUCCESS)
}

fn report(manager: &DeviceManager, format: ReportFormat) -> Result<ExitCode> {
    for session in open_sessions(manager)? {
        let output = render(session.record(), format).context("Failed to render report")?;
        print!("{}", output);
        // serialized documents carry no trailing newline
        if matches!(
            format,
            ReportFormat::Json
                | ReportFormat::PrettyJson
                | ReportFormat::Xml
                | ReportFormat::PrettyXml
        ) {
            println!();
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn snapshot_path(dir: &Path, session: &Session<RusbTransport>) -> PathBuf {
    dir.join(format!("{}.json", session.record().filename()))
}

fn save(manager: &DeviceManager, config: &AgentConfig) -> Result<ExitCode> {
    let dir = config.snapshot.resolved_directory()?;
    for session in open_sessions(manager)? {
        let path = snapshot_path(&dir, &session);
        session
            .record()
            .save(&path)
            .with_context(|| format!("Failed to save snapshot: {}", path.display()))?;
        println!("Saved {}", path.display());
    }
    Ok(ExitCode::SUCCESS)
}

fn audit(manager: &DeviceManager, config: &AgentConfig) -> Result<ExitCode> {
    let dir = config.snapshot.resolved_directory()?;
    let mut changed = false;

    for mut session in open_sessions(manager)? {
        let path = snapshot_path(&dir, &session);
        if !path.exists() {
            warn!("No snapshot for {}, run `usb-cmdb save` first", path.display());
            continue;
        }

        let record = session.record_mut();
        let count = record
            .audit_file(&path)
            .with_context(|| format!("Failed to audit against {}", path.display()))?;

        if count == 0 {
            println!("{} ({}): no changes", record.filename(), record.id());
            continue;
        }

        changed = true;
        println!("{} ({}): {} change(s)", record.filename(), record.id(), count);
        for change in record.changes() {
            println!("  {}", change);
        }
    }

    Ok(if changed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

/// Run `op` on every reader that supports vendor commands
fn for_each_reader(
    manager: &DeviceManager,
    mut op: impl FnMut(&mut MagtekDevice<RusbTransport>) -> device::Result<()>,
) -> Result<ExitCode> {
    let mut failed = false;

    for mut session in open_sessions(manager)? {
        let filename = session.record().filename();
        let reader = match session.magtek_mut() {
            Ok(reader) => reader,
            Err(e) => {
                warn!("{}: {}", filename, e);
                failed = true;
                continue;
            }
        };

        match op(&mut *reader) {
            Ok(()) => println!("{}: serial number {:?}", filename, reader.record().id()),
            Err(e) => {
                warn!("{}: {}", filename, e);
                failed = true;
            }
        }
    }

    Ok(if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn serial(manager: &DeviceManager, config: &AgentConfig, cmd: SerialCommand) -> Result<ExitCode> {
    match cmd {
        SerialCommand::Set { serial } => for_each_reader(manager, |r| r.set_device_sn(&serial)),
        SerialCommand::Erase => for_each_reader(manager, |r| r.erase_device_sn()),
        SerialCommand::Copy { length } => {
            let length = length.unwrap_or(config.snapshot.serial_length);
            for_each_reader(manager, |r| r.copy_factory_sn(length))
        }
        SerialCommand::Factory { serial } => {
            for_each_reader(manager, |r| r.set_factory_sn(&serial))
        }
    }
}

fn reset(manager: &DeviceManager) -> Result<ExitCode> {
    for_each_reader(manager, |r| {
        r.reset()?;
        let errors = r.refresh();
        if !errors.is_empty() {
            warn!("{}", errors);
        }
        Ok(())
    })
}
