//! `switchboot` command-line front end.
//!
//! Loads a YAML device catalog, resolves credentials, drives every device
//! through a bring-up or maintenance task and prints a report.
//!
//! # Usage
//!
//! ```bash
//! switchboot --catalog devices.yaml enable-ssh --gateway 192.168.10.1
//! SWITCHBOOT_SECRET=... switchboot --json vlan-backup --tftp-server 192.168.10.5
//! ```
//!
//! Exit status is 0 when every device succeeded, 1 when any device failed or
//! was cancelled, and 2 when the batch could not run at all.

mod prompt;
mod report;

use std::io;
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use clap::{Parser, Subcommand};
use log::{error, info, warn};
use switchboot::device::{Globals, normalize};
use switchboot::driver::PasswordRotationPolicy;
use switchboot::error::ValidationError;
use switchboot::fleet::DEFAULT_CONCURRENCY;
use switchboot::script::{VlanBackup, VlanRange};
use switchboot::{
    BatchResult, CancelToken, Catalog, CredentialPolicy, DriverSettings, FleetBuilder,
    ScriptParams, Task,
};

use crate::prompt::TerminalPrompt;

type BoxError = Box<dyn std::error::Error>;

#[derive(Parser)]
#[command(name = "switchboot", version)]
#[command(about = "Bring up and maintain switches over console and SSH", long_about = None)]
struct Cli {
    /// Device catalog (YAML)
    #[arg(long, default_value = "devices.yaml")]
    catalog: PathBuf,

    /// Devices driven at once
    #[arg(long, default_value_t = DEFAULT_CONCURRENCY)]
    concurrency: usize,

    /// Print the batch result as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Configure identity, management addressing and SSH
    EnableSsh(EnableSshArgs),

    /// Create VLANs and back up the startup config over TFTP
    VlanBackup(VlanBackupArgs),
}

#[derive(clap::Args)]
struct EnableSshArgs {
    /// Prompt for a secret per device instead of one shared identity
    #[arg(long)]
    per_device_credentials: bool,

    /// Management gateway (default: Globals.mgt_gateway)
    #[arg(long)]
    gateway: Option<Ipv4Addr>,

    /// Domain name applied to every device (default: each device's own)
    #[arg(long)]
    domain: Option<String>,

    /// Erase and reload Cisco devices before configuring them
    #[arg(long)]
    factory_reset: bool,

    /// Seconds to wait for a reloading device
    #[arg(long)]
    reload_window: Option<u64>,

    /// Quiet period ending a timing-sensitive read, in milliseconds
    #[arg(long)]
    settle_ms: Option<u64>,

    /// Fail on unexpected prompts and rejected commands
    #[arg(long)]
    strict: bool,

    /// Fail a device that demands a password change
    #[arg(long)]
    fail_on_password_rotation: bool,

    /// Batch time limit in seconds
    #[arg(long)]
    deadline: Option<u64>,
}

#[derive(clap::Args)]
struct VlanBackupArgs {
    #[arg(long)]
    per_device_credentials: bool,

    #[arg(long, default_value_t = 10)]
    vlan_start: u16,

    #[arg(long, default_value_t = 50)]
    vlan_end: u16,

    #[arg(long, default_value_t = 10)]
    vlan_step: u16,

    /// TFTP server receiving the backups (default: Globals.tftp_server)
    #[arg(long)]
    tftp_server: Option<Ipv4Addr>,

    /// Batch time limit in seconds
    #[arg(long)]
    deadline: Option<u64>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let json = cli.json;
    let result = match run(cli).await {
        Ok(result) => result,
        Err(e) => {
            error!("{e}");
            return ExitCode::from(2);
        }
    };

    let mut stdout = io::stdout().lock();
    let written = if json {
        report::render_json(&result, &mut stdout)
    } else {
        report::render_text(&result, &mut stdout)
    };
    if let Err(e) = written {
        error!("failed to write report: {e}");
        return ExitCode::from(2);
    }

    if result.all_succeeded() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}

async fn run(cli: Cli) -> Result<BatchResult, BoxError> {
    let catalog = Catalog::load(&cli.catalog)?;
    info!("loaded {} devices from {}", catalog.len(), cli.catalog.display());

    let cancel = CancelToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupted, cancelling outstanding devices");
                cancel.cancel();
            }
        }
    });

    let prompt = TerminalPrompt::from_env();
    let globals = catalog.globals();

    match cli.command {
        Command::EnableSsh(args) => {
            let policy = credential_policy(args.per_device_credentials, globals)?;
            let mgt_gateway = match args.gateway {
                Some(gateway) => Some(gateway),
                None => global_ip(globals.mgt_gateway.as_deref(), "mgt_gateway")?,
            };
            let params = ScriptParams {
                task: Task::EnableSsh,
                domain: args.domain,
                mgt_gateway,
                factory_reset: args.factory_reset,
            };

            let mut settings = DriverSettings::default().strict(args.strict);
            if let Some(secs) = args.reload_window {
                settings = settings.reload_window(Duration::from_secs(secs));
            }
            if let Some(ms) = args.settle_ms {
                settings = settings.settle_delay(Duration::from_millis(ms));
            }
            if args.fail_on_password_rotation {
                settings = settings.password_rotation(PasswordRotationPolicy::Fail);
            }

            let mut fleet = FleetBuilder::new()
                .concurrency(cli.concurrency)
                .driver_settings(settings);
            if let Some(secs) = args.deadline {
                fleet = fleet.deadline(Duration::from_secs(secs));
            }

            let result = fleet
                .build()
                .run_entries(&catalog.entries(), &policy, prompt, &params, &cancel)
                .await?;
            Ok(result)
        }
        Command::VlanBackup(args) => {
            let policy = credential_policy(args.per_device_credentials, globals)?;
            let tftp_server = match args.tftp_server {
                Some(server) => server,
                None => global_ip(globals.tftp_server.as_deref(), "tftp_server")?
                    .ok_or(ValidationError::MissingField {
                        field: "tftp_server",
                    })?,
            };
            let params = ScriptParams {
                task: Task::VlanBackup(VlanBackup {
                    vlans: VlanRange::new(args.vlan_start, args.vlan_end, args.vlan_step)?,
                    tftp_server,
                    backup_label: backup_label(),
                }),
                ..ScriptParams::default()
            };

            // maintenance runs against the management address configured at bring-up
            let devices = catalog
                .entries()
                .iter()
                .map(|(name, entry)| {
                    let target = normalize(name, entry)
                        .and_then(|device| device.management_target().map_err(Into::into));
                    (name.clone(), target)
                })
                .collect();

            let mut fleet = FleetBuilder::new().concurrency(cli.concurrency);
            if let Some(secs) = args.deadline {
                fleet = fleet.deadline(Duration::from_secs(secs));
            }

            let result = fleet
                .build()
                .run_checked(devices, &policy, prompt, &params, &cancel)
                .await?;
            Ok(result)
        }
    }
}

fn credential_policy(
    per_device: bool,
    globals: &Globals,
) -> Result<CredentialPolicy, ValidationError> {
    if per_device {
        return Ok(CredentialPolicy::PerDevice);
    }
    let username = globals
        .username
        .clone()
        .ok_or(ValidationError::MissingField { field: "username" })?;
    Ok(CredentialPolicy::Universal { username })
}

fn global_ip(
    value: Option<&str>,
    field: &'static str,
) -> Result<Option<Ipv4Addr>, ValidationError> {
    value
        .map(|ip| {
            ip.trim().parse().map_err(|_| ValidationError::InvalidField {
                field,
                reason: format!("'{ip}' is not an IPv4 address"),
            })
        })
        .transpose()
}

/// Seconds since the epoch, used to keep backup file names unique.
fn backup_label() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default()
        .to_string()
}
