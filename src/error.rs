//! Error types for the RAID configuration engine
//!
//! Provides structured error types for resource resolution, local
//! validation, action submission, scheduling, and job tracking. The
//! taxonomy separates infrastructure failures (the management endpoint
//! is unreachable) from configuration failures so callers can tell
//! connectivity problems apart from bad requests.

use serde_json::Value;
use thiserror::Error;

/// Kind of a remote resource looked up by the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Controller,
    PhysicalDisk,
    VirtualDisk,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceKind::Controller => write!(f, "storage controller"),
            ResourceKind::PhysicalDisk => write!(f, "physical disk"),
            ResourceKind::VirtualDisk => write!(f, "virtual disk"),
        }
    }
}

/// Unified error type for the configuration engine
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Resource Resolution
    // =========================================================================
    #[error("Unable to locate the {kind} with the ID: {id}")]
    NotFound { kind: ResourceKind, id: String },

    #[error("Device identifier '{0}' does not carry a controller segment")]
    MalformedDeviceId(String),

    // =========================================================================
    // Remote Action
    // =========================================================================
    #[error("The remote system rejected the '{action}' action")]
    ActionRejected { action: String, error_info: Value },

    // =========================================================================
    // Local Validation
    // =========================================================================
    #[error("The storage controller '{0}' does not support encryption.")]
    EncryptionNotSupported(String),

    #[error("Volume is not encryption capable.")]
    VolumeNotEncryptionCapable,

    #[error("Online Capacity Expansion is not supported for {0} virtual disks.")]
    ExpansionUnsupportedRaidType(String),

    #[error("Cannot add more than two disks to RAID1 virtual disk.")]
    ExpansionRaid1Target,

    #[error("Provided list of targets is empty.")]
    ExpansionTargetsEmpty,

    #[error("Minimum Online Capacity Expansion size must be greater than 100 MB of the current size {0}.")]
    ExpansionBelowMinimum(u64),

    #[error("The following attributes are invalid: {}", .0.join(", "))]
    InvalidAttributes(Vec<String>),

    #[error("Other attributes cannot be updated when ControllerMode is provided as input.")]
    HbaModeConflict,

    // =========================================================================
    // Apply-Time Scheduling
    // =========================================================================
    #[error("Apply time {0} is not supported.")]
    UnsupportedApplyTime(String),

    #[error("The maintenance time must be post-fixed with local offset to {0}.")]
    MaintenanceWindowOffset(String),

    #[error("The specified maintenance time window occurs in the past, \
             provide a future time to schedule the maintenance window.")]
    MaintenanceWindowPast,

    // =========================================================================
    // Job Tracking
    // =========================================================================
    #[error("Job {job_id} did not reach a terminal state within {timeout_secs} seconds")]
    JobWaitTimeout { job_id: String, timeout_secs: u64 },

    // =========================================================================
    // Transport
    // =========================================================================
    #[error("Remote system unreachable: {0}")]
    Unreachable(String),

    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected response from {path}: {reason}")]
    UnexpectedResponse { path: String, reason: String },

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl Error {
    /// Infrastructure failures: the endpoint could not be reached at all.
    pub fn is_infrastructure(&self) -> bool {
        matches!(self, Error::Unreachable(_) | Error::Transport(_))
    }

    /// Local validation failures, reported before any network mutation.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::EncryptionNotSupported(_)
                | Error::VolumeNotEncryptionCapable
                | Error::ExpansionUnsupportedRaidType(_)
                | Error::ExpansionRaid1Target
                | Error::ExpansionTargetsEmpty
                | Error::ExpansionBelowMinimum(_)
                | Error::InvalidAttributes(_)
                | Error::HbaModeConflict
                | Error::UnsupportedApplyTime(_)
                | Error::MaintenanceWindowOffset(_)
                | Error::MaintenanceWindowPast
                | Error::MalformedDeviceId(_)
        )
    }

    /// The remote error payload, when the remote system rejected an action.
    pub fn error_info(&self) -> Option<&Value> {
        match self {
            Error::ActionRejected { error_info, .. } => Some(error_info),
            _ => None,
        }
    }
}

/// Result type alias for the configuration engine
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_messages() {
        let err = Error::NotFound {
            kind: ResourceKind::PhysicalDisk,
            id: "Disk.Bay.0:Enclosure.Internal.0-1:RAID.Slot.1-1".into(),
        };
        assert_eq!(
            err.to_string(),
            "Unable to locate the physical disk with the ID: \
             Disk.Bay.0:Enclosure.Internal.0-1:RAID.Slot.1-1"
        );

        let err = Error::NotFound {
            kind: ResourceKind::Controller,
            id: "RAID.Slot.1-1".into(),
        };
        assert!(err.to_string().contains("storage controller"));
    }

    #[test]
    fn test_error_classification() {
        assert!(Error::Unreachable("connect refused".into()).is_infrastructure());
        assert!(Error::HbaModeConflict.is_validation());
        assert!(!Error::HbaModeConflict.is_infrastructure());

        let rejected = Error::ActionRejected {
            action: "AssignSpare".into(),
            error_info: serde_json::json!({"error": {"code": "Base.1.0.GeneralError"}}),
        };
        assert!(rejected.error_info().is_some());
        assert!(!rejected.is_validation());
    }

    #[test]
    fn test_invalid_attributes_lists_all_names() {
        let err = Error::InvalidAttributes(vec!["Alpha".into(), "Beta".into()]);
        assert_eq!(
            err.to_string(),
            "The following attributes are invalid: Alpha, Beta"
        );
    }
}
