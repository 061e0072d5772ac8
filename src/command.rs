//! Command model for storage configuration operations
//!
//! Each supported operation is one variant carrying only the parameters
//! it needs, so a command can never be built with fields that belong to
//! a different operation. The attribute-settings path is deliberately a
//! separate request type: it is mutually exclusive with every command.

use crate::model::{ApplyTime, MaintenanceWindow};
use serde_json::Value;
use std::collections::BTreeMap;

// =============================================================================
// Encryption Parameters
// =============================================================================

/// Key parameters for enabling encryption or setting the controller key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncryptionMode {
    /// Local Key Management: passphrase plus its user-supplied label.
    Lkm { key: String, key_id: String },
    /// Secure Enterprise Key Manager (licensed, no local passphrase).
    Sekm,
}

/// Key parameters for rotating the controller key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReKeyMode {
    Lkm {
        key: String,
        key_id: String,
        old_key: String,
    },
    Sekm,
}

/// Target of a blink/unblink request: one drive or one volume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlinkDevice {
    Drive(String),
    Volume(String),
}

impl BlinkDevice {
    pub fn fqdd(&self) -> &str {
        match self {
            BlinkDevice::Drive(id) | BlinkDevice::Volume(id) => id,
        }
    }
}

/// How an online capacity expansion grows the volume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expansion {
    /// Add physical drives to the span.
    ByTargets(Vec<String>),
    /// Grow to an absolute size in MB.
    BySize(u64),
}

// =============================================================================
// Command
// =============================================================================

/// A validated storage configuration command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    ResetConfig {
        controller_id: String,
    },
    AssignSpare {
        target: String,
        /// Volumes the spare is dedicated to; global hot spare when empty.
        volume_ids: Vec<String>,
    },
    UnassignSpare {
        target: String,
    },
    SetControllerKey {
        controller_id: String,
        key: String,
        key_id: String,
    },
    RemoveControllerKey {
        controller_id: String,
    },
    ReKey {
        controller_id: String,
        mode: ReKeyMode,
    },
    EnableControllerEncryption {
        controller_id: String,
        mode: EncryptionMode,
    },
    BlinkTarget {
        device: BlinkDevice,
    },
    UnBlinkTarget {
        device: BlinkDevice,
    },
    ConvertToRaid {
        targets: Vec<String>,
    },
    ConvertToNonRaid {
        targets: Vec<String>,
    },
    ChangePdStateToOnline {
        target: String,
    },
    ChangePdStateToOffline {
        target: String,
    },
    LockVirtualDisk {
        volume_id: String,
    },
    OnlineCapacityExpansion {
        volume_id: String,
        expansion: Expansion,
    },
    SecureErase {
        controller_id: String,
        target: String,
    },
}

impl Command {
    /// Operation label used in messages and as the remote action name for
    /// the commands dispatched through the RAID service.
    pub fn name(&self) -> &'static str {
        match self {
            Command::ResetConfig { .. } => "ResetConfig",
            Command::AssignSpare { .. } => "AssignSpare",
            Command::UnassignSpare { .. } => "UnassignSpare",
            Command::SetControllerKey { .. } => "SetControllerKey",
            Command::RemoveControllerKey { .. } => "RemoveControllerKey",
            Command::ReKey { .. } => "ReKey",
            Command::EnableControllerEncryption { .. } => "EnableControllerEncryption",
            Command::BlinkTarget { .. } => "BlinkTarget",
            Command::UnBlinkTarget { .. } => "UnBlinkTarget",
            Command::ConvertToRaid { .. } => "ConvertToRAID",
            Command::ConvertToNonRaid { .. } => "ConvertToNonRAID",
            Command::ChangePdStateToOnline { .. } => "ChangePDStateToOnline",
            Command::ChangePdStateToOffline { .. } => "ChangePDStateToOffline",
            Command::LockVirtualDisk { .. } => "LockVirtualDisk",
            Command::OnlineCapacityExpansion { .. } => "OnlineCapacityExpansion",
            Command::SecureErase { .. } => "SecureErase",
        }
    }
}

// =============================================================================
// Attribute Settings Request
// =============================================================================

/// Bulk controller attribute change, scheduled by apply-time policy.
#[derive(Debug, Clone)]
pub struct AttributeRequest {
    pub controller_id: String,
    /// Desired attribute values, keyed by OEM attribute name.
    pub attributes: BTreeMap<String, Value>,
    pub apply_time: ApplyTime,
    /// Required when the apply time targets a maintenance window.
    pub maintenance_window: Option<MaintenanceWindow>,
}

/// One invocation: either a command or an attribute-settings request.
#[derive(Debug, Clone)]
pub enum Operation {
    Command(Command),
    Attributes(AttributeRequest),
}

// =============================================================================
// Execution Options
// =============================================================================

/// Caller-facing execution switches, validated upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecOptions {
    /// Evaluate and report without mutating anything.
    pub dry_run: bool,
    /// Block until the submitted job reaches a terminal state.
    pub job_wait: bool,
    /// Wait budget in seconds when `job_wait` is set.
    pub job_wait_timeout: u64,
}

impl Default for ExecOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            job_wait: false,
            job_wait_timeout: 120,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_names_match_remote_actions() {
        let cmd = Command::ConvertToRaid {
            targets: vec!["Disk.Bay.0:Enclosure.Internal.0-1:RAID.Slot.1-1".into()],
        };
        assert_eq!(cmd.name(), "ConvertToRAID");

        let cmd = Command::ChangePdStateToOffline {
            target: "Disk.Bay.0:Enclosure.Internal.0-1:RAID.Slot.1-1".into(),
        };
        assert_eq!(cmd.name(), "ChangePDStateToOffline");
    }

    #[test]
    fn test_default_exec_options() {
        let opts = ExecOptions::default();
        assert!(!opts.dry_run);
        assert!(!opts.job_wait);
        assert_eq!(opts.job_wait_timeout, 120);
    }
}
