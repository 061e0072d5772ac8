//! redfish-raidctl
//!
//! Command-line front end for the RAID controller configuration engine.
//! Each invocation runs exactly one operation against the management
//! endpoint and prints the normalized outcome as JSON. The process exits
//! non-zero when the operation failed after submission.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use redfish_raidctl::{
    ApplyTime, AttributeRequest, BlinkDevice, Command, Dispatcher, EncryptionMode, ExecOptions,
    Expansion, HttpConfig, HttpTransport, MaintenanceWindow, Operation, ReKeyMode,
};

// =============================================================================
// CLI Arguments
// =============================================================================

/// RAID controller configuration via the Redfish management endpoint
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Management endpoint base URL, e.g. https://192.168.0.1
    #[arg(long, env = "IDRAC_BASE_URL")]
    base_url: String,

    /// Management account user name
    #[arg(long, env = "IDRAC_USERNAME")]
    username: String,

    /// Management account password
    #[arg(long, env = "IDRAC_PASSWORD", hide_env_values = true)]
    password: String,

    /// Accept self-signed management certificates
    #[arg(long, env = "IDRAC_INSECURE")]
    insecure: bool,

    /// Per-request timeout in seconds
    #[arg(long, default_value = "30")]
    timeout_secs: u64,

    /// Evaluate and report without changing anything
    #[arg(long)]
    check: bool,

    /// Wait for the submitted job to reach a terminal state
    #[arg(long)]
    job_wait: bool,

    /// Job wait budget in seconds
    #[arg(long, default_value = "120")]
    job_wait_timeout: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand, Debug)]
enum CliCommand {
    /// Delete every virtual disk on a controller
    ResetConfig { controller_id: String },

    /// Assign a drive as a global or dedicated hot spare
    AssignSpare {
        target: String,
        /// Volumes the spare is dedicated to; global when omitted
        #[arg(long = "volume")]
        volume_ids: Vec<String>,
    },

    /// Release a drive from hot spare duty
    UnassignSpare { target: String },

    /// Assign the controller encryption key
    SetControllerKey {
        controller_id: String,
        #[arg(long)]
        key: String,
        #[arg(long)]
        key_id: String,
    },

    /// Remove the controller encryption key
    RemoveControllerKey { controller_id: String },

    /// Rotate the controller encryption key
    ReKey {
        controller_id: String,
        /// Use the Secure Enterprise Key Manager instead of a local key
        #[arg(long)]
        sekm: bool,
        #[arg(long)]
        key: Option<String>,
        #[arg(long)]
        key_id: Option<String>,
        #[arg(long)]
        old_key: Option<String>,
    },

    /// Turn on controller encryption
    EnableControllerEncryption {
        controller_id: String,
        /// Use the Secure Enterprise Key Manager instead of a local key
        #[arg(long)]
        sekm: bool,
        #[arg(long)]
        key: Option<String>,
        #[arg(long)]
        key_id: Option<String>,
    },

    /// Start blinking the identification LED of a drive or volume
    BlinkTarget {
        #[arg(long, conflicts_with = "volume")]
        drive: Option<String>,
        #[arg(long)]
        volume: Option<String>,
    },

    /// Stop blinking the identification LED of a drive or volume
    UnblinkTarget {
        #[arg(long, conflicts_with = "volume")]
        drive: Option<String>,
        #[arg(long)]
        volume: Option<String>,
    },

    /// Convert drives to RAID-capable state
    ConvertToRaid {
        #[arg(required = true)]
        targets: Vec<String>,
    },

    /// Convert drives to non-RAID state
    ConvertToNonRaid {
        #[arg(required = true)]
        targets: Vec<String>,
    },

    /// Bring a physical drive online
    ChangePdStateToOnline { target: String },

    /// Take a physical drive offline
    ChangePdStateToOffline { target: String },

    /// Lock a virtual disk built from self-encrypting drives
    LockVirtualDisk { volume_id: String },

    /// Grow a virtual disk by drives or to an absolute size
    OnlineCapacityExpansion {
        volume_id: String,
        /// Drives to add to the span
        #[arg(long = "target", conflicts_with = "size_mb")]
        targets: Vec<String>,
        /// Absolute size to grow to, in MB
        #[arg(long)]
        size_mb: Option<u64>,
    },

    /// Cryptographically erase a drive
    SecureErase {
        controller_id: String,
        target: String,
    },

    /// Apply controller attribute settings
    SetAttributes {
        controller_id: String,
        /// Attribute values as NAME=VALUE pairs
        #[arg(required = true, value_parser = parse_attribute)]
        attributes: Vec<(String, Value)>,
        /// Apply-time policy for the settings job
        #[arg(long, default_value = "Immediate")]
        apply_time: String,
        /// Maintenance window start, RFC 3339 with the manager's UTC offset
        #[arg(long)]
        window_start: Option<String>,
        /// Maintenance window duration in seconds
        #[arg(long, default_value = "900")]
        window_duration: u64,
    },
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(&args);

    let operation = build_operation(&args.command)?;

    let transport = HttpTransport::new(HttpConfig {
        base_url: args.base_url.clone(),
        username: args.username.clone(),
        password: args.password.clone(),
        accept_invalid_certs: args.insecure,
        timeout: Duration::from_secs(args.timeout_secs),
    })
    .context("failed to build the management transport")?;

    info!(
        endpoint = %args.base_url,
        check = args.check,
        job_wait = args.job_wait,
        "running storage operation"
    );

    let dispatcher = Dispatcher::new(Arc::new(transport));
    let opts = ExecOptions {
        dry_run: args.check,
        job_wait: args.job_wait,
        job_wait_timeout: args.job_wait_timeout,
    };

    let outcome = dispatcher.run(&operation, &opts).await?;
    println!("{}", serde_json::to_string_pretty(&outcome)?);

    if outcome.failed {
        std::process::exit(1);
    }
    Ok(())
}

// =============================================================================
// Operation Construction
// =============================================================================

fn build_operation(cli: &CliCommand) -> anyhow::Result<Operation> {
    let op = match cli {
        CliCommand::ResetConfig { controller_id } => Operation::Command(Command::ResetConfig {
            controller_id: controller_id.clone(),
        }),
        CliCommand::AssignSpare { target, volume_ids } => {
            Operation::Command(Command::AssignSpare {
                target: target.clone(),
                volume_ids: volume_ids.clone(),
            })
        }
        CliCommand::UnassignSpare { target } => Operation::Command(Command::UnassignSpare {
            target: target.clone(),
        }),
        CliCommand::SetControllerKey {
            controller_id,
            key,
            key_id,
        } => Operation::Command(Command::SetControllerKey {
            controller_id: controller_id.clone(),
            key: key.clone(),
            key_id: key_id.clone(),
        }),
        CliCommand::RemoveControllerKey { controller_id } => {
            Operation::Command(Command::RemoveControllerKey {
                controller_id: controller_id.clone(),
            })
        }
        CliCommand::ReKey {
            controller_id,
            sekm,
            key,
            key_id,
            old_key,
        } => {
            let mode = if *sekm {
                ReKeyMode::Sekm
            } else {
                match (key, key_id, old_key) {
                    (Some(key), Some(key_id), Some(old_key)) => ReKeyMode::Lkm {
                        key: key.clone(),
                        key_id: key_id.clone(),
                        old_key: old_key.clone(),
                    },
                    _ => bail!("re-key requires --key, --key-id and --old-key, or --sekm"),
                }
            };
            Operation::Command(Command::ReKey {
                controller_id: controller_id.clone(),
                mode,
            })
        }
        CliCommand::EnableControllerEncryption {
            controller_id,
            sekm,
            key,
            key_id,
        } => {
            let mode = if *sekm {
                EncryptionMode::Sekm
            } else {
                match (key, key_id) {
                    (Some(key), Some(key_id)) => EncryptionMode::Lkm {
                        key: key.clone(),
                        key_id: key_id.clone(),
                    },
                    _ => bail!("enabling encryption requires --key and --key-id, or --sekm"),
                }
            };
            Operation::Command(Command::EnableControllerEncryption {
                controller_id: controller_id.clone(),
                mode,
            })
        }
        CliCommand::BlinkTarget { drive, volume } => Operation::Command(Command::BlinkTarget {
            device: blink_device(drive, volume)?,
        }),
        CliCommand::UnblinkTarget { drive, volume } => {
            Operation::Command(Command::UnBlinkTarget {
                device: blink_device(drive, volume)?,
            })
        }
        CliCommand::ConvertToRaid { targets } => Operation::Command(Command::ConvertToRaid {
            targets: targets.clone(),
        }),
        CliCommand::ConvertToNonRaid { targets } => {
            Operation::Command(Command::ConvertToNonRaid {
                targets: targets.clone(),
            })
        }
        CliCommand::ChangePdStateToOnline { target } => {
            Operation::Command(Command::ChangePdStateToOnline {
                target: target.clone(),
            })
        }
        CliCommand::ChangePdStateToOffline { target } => {
            Operation::Command(Command::ChangePdStateToOffline {
                target: target.clone(),
            })
        }
        CliCommand::LockVirtualDisk { volume_id } => {
            Operation::Command(Command::LockVirtualDisk {
                volume_id: volume_id.clone(),
            })
        }
        CliCommand::OnlineCapacityExpansion {
            volume_id,
            targets,
            size_mb,
        } => {
            let expansion = match (targets.is_empty(), size_mb) {
                (false, None) => Expansion::ByTargets(targets.clone()),
                (true, Some(size_mb)) => Expansion::BySize(*size_mb),
                _ => bail!("capacity expansion takes either --target drives or --size-mb"),
            };
            Operation::Command(Command::OnlineCapacityExpansion {
                volume_id: volume_id.clone(),
                expansion,
            })
        }
        CliCommand::SecureErase {
            controller_id,
            target,
        } => Operation::Command(Command::SecureErase {
            controller_id: controller_id.clone(),
            target: target.clone(),
        }),
        CliCommand::SetAttributes {
            controller_id,
            attributes,
            apply_time,
            window_start,
            window_duration,
        } => {
            let apply_time = parse_apply_time(apply_time)?;
            if apply_time.requires_maintenance_window() && window_start.is_none() {
                bail!("apply time {apply_time} requires --window-start");
            }
            Operation::Attributes(AttributeRequest {
                controller_id: controller_id.clone(),
                attributes: attributes.iter().cloned().collect::<BTreeMap<_, _>>(),
                apply_time,
                maintenance_window: window_start
                    .as_ref()
                    .map(|start| MaintenanceWindow::new(start.clone(), *window_duration)),
            })
        }
    };
    Ok(op)
}

fn blink_device(drive: &Option<String>, volume: &Option<String>) -> anyhow::Result<BlinkDevice> {
    match (drive, volume) {
        (Some(drive), None) => Ok(BlinkDevice::Drive(drive.clone())),
        (None, Some(volume)) => Ok(BlinkDevice::Volume(volume.clone())),
        _ => bail!("blink takes exactly one of --drive or --volume"),
    }
}

fn parse_apply_time(s: &str) -> anyhow::Result<ApplyTime> {
    match s {
        "Immediate" => Ok(ApplyTime::Immediate),
        "OnReset" => Ok(ApplyTime::OnReset),
        "AtMaintenanceWindowStart" => Ok(ApplyTime::AtMaintenanceWindowStart),
        "InMaintenanceWindowOnReset" => Ok(ApplyTime::InMaintenanceWindowOnReset),
        other => bail!("unsupported apply time '{other}'"),
    }
}

/// Parse a NAME=VALUE attribute. The value is taken as JSON when it
/// parses as such (numbers, booleans), and as a plain string otherwise.
fn parse_attribute(s: &str) -> Result<(String, Value), String> {
    let (name, raw) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{s}'"))?;
    if name.is_empty() {
        return Err(format!("attribute name missing in '{s}'"));
    }
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((name.to_string(), value))
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env()
        .add_directive(level.into())
        .add_directive("hyper=warn".parse().unwrap())
        .add_directive("reqwest=warn".parse().unwrap());

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_attribute_values() {
        assert_eq!(
            parse_attribute("CopybackMode=Off").unwrap(),
            ("CopybackMode".to_string(), Value::String("Off".into()))
        );
        assert_eq!(
            parse_attribute("RebuildRate=30").unwrap(),
            ("RebuildRate".to_string(), Value::from(30))
        );
        assert!(parse_attribute("NoEqualsSign").is_err());
        assert!(parse_attribute("=Off").is_err());
    }

    #[test]
    fn test_blink_device_requires_exactly_one_target() {
        assert!(blink_device(&None, &None).is_err());
        assert!(blink_device(&Some("d".into()), &Some("v".into())).is_err());
        assert_matches::assert_matches!(
            blink_device(&Some("d".into()), &None),
            Ok(BlinkDevice::Drive(_))
        );
    }

    #[test]
    fn test_maintenance_window_apply_time_needs_a_window() {
        let cli = CliCommand::SetAttributes {
            controller_id: "RAID.Slot.1-1".into(),
            attributes: vec![("CopybackMode".into(), Value::String("Off".into()))],
            apply_time: "AtMaintenanceWindowStart".into(),
            window_start: None,
            window_duration: 900,
        };
        assert!(build_operation(&cli).is_err());
    }
}
