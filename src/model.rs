//! Request-scoped snapshots of remote storage resources
//!
//! Every type here is read fresh from the remote system per command
//! invocation and never cached; the remote controller stays the sole
//! source of truth. Wire names follow the Redfish/OEM schema.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// =============================================================================
// Controller
// =============================================================================

/// Security capability of a storage controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SecurityStatus {
    EncryptionNotCapable,
    EncryptionCapable,
    SecurityKeyAssigned,
    #[serde(other)]
    Unknown,
}

/// Snapshot of a storage controller's security state.
#[derive(Debug, Clone)]
pub struct ControllerSnapshot {
    pub id: String,
    pub security_status: SecurityStatus,
    /// Label of the currently assigned encryption key, if any.
    pub key_id: Option<String>,
}

impl ControllerSnapshot {
    pub fn from_response(id: &str, body: &Value) -> Self {
        let security_status = body
            .get("SecurityStatus")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or(SecurityStatus::Unknown);
        let key_id = body
            .get("KeyID")
            .and_then(Value::as_str)
            .map(str::to_string);
        Self {
            id: id.to_string(),
            security_status,
            key_id,
        }
    }

    pub fn has_key(&self) -> bool {
        self.key_id.is_some()
    }
}

// =============================================================================
// Physical Drive
// =============================================================================

/// Hot-spare assignment of a physical drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HotSpareType {
    None,
    Dedicated,
    Global,
    #[serde(other)]
    Unknown,
}

/// RAID readiness reported for a physical drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RaidStatus {
    Ready,
    #[serde(rename = "NonRAID")]
    NonRaid,
    Online,
    Offline,
    Degraded,
    Failed,
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for RaidStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RaidStatus::Ready => write!(f, "Ready"),
            RaidStatus::NonRaid => write!(f, "NonRAID"),
            RaidStatus::Online => write!(f, "Online"),
            RaidStatus::Offline => write!(f, "Offline"),
            RaidStatus::Degraded => write!(f, "Degraded"),
            RaidStatus::Failed => write!(f, "Failed"),
            RaidStatus::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Encryption capability of a physical drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EncryptionAbility {
    None,
    SelfEncryptingDrive,
    Other,
    #[serde(other)]
    Unknown,
}

/// Snapshot of a physical drive's configurable state.
#[derive(Debug, Clone)]
pub struct DriveSnapshot {
    pub id: String,
    pub controller_id: String,
    pub hot_spare: HotSpareType,
    pub raid_status: RaidStatus,
    pub encryption_ability: EncryptionAbility,
    /// OEM erase capability token; `CryptographicErasePD` marks erase-capable drives.
    pub erase_capability: Option<String>,
    /// Resource path of the drive's own SecureErase action, when advertised.
    pub secure_erase_target: Option<String>,
}

impl DriveSnapshot {
    pub fn from_response(id: &str, controller_id: &str, body: &Value) -> Self {
        let hot_spare = body
            .get("HotspareType")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or(HotSpareType::Unknown);
        let encryption_ability = body
            .get("EncryptionAbility")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or(EncryptionAbility::Unknown);

        // PCIe SSDs report their OEM block under DellPCIeSSD instead of
        // DellPhysicalDisk.
        let oem = body.pointer("/Oem/Dell/DellPhysicalDisk").or_else(|| {
            body.pointer("/Oem/Dell/DellPCIeSSD")
        });
        let raid_status = oem
            .and_then(|d| d.get("RaidStatus"))
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or(RaidStatus::Unknown);
        let erase_capability = oem
            .and_then(|d| d.get("SystemEraseCapability"))
            .and_then(Value::as_str)
            .map(str::to_string);
        let secure_erase_target = body
            .pointer("/Actions/#Drive.SecureErase/target")
            .and_then(Value::as_str)
            .map(str::to_string);

        Self {
            id: id.to_string(),
            controller_id: controller_id.to_string(),
            hot_spare,
            raid_status,
            encryption_ability,
            erase_capability,
            secure_erase_target,
        }
    }

    pub fn is_erase_capable(&self) -> bool {
        self.erase_capability.as_deref() == Some("CryptographicErasePD")
    }
}

// =============================================================================
// Virtual Disk
// =============================================================================

/// RAID level of a virtual disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RaidType {
    #[serde(rename = "RAID0")]
    Raid0,
    #[serde(rename = "RAID1")]
    Raid1,
    #[serde(rename = "RAID5")]
    Raid5,
    #[serde(rename = "RAID6")]
    Raid6,
    #[serde(rename = "RAID10")]
    Raid10,
    #[serde(rename = "RAID50")]
    Raid50,
    #[serde(rename = "RAID60")]
    Raid60,
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for RaidType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RaidType::Raid0 => "RAID0",
            RaidType::Raid1 => "RAID1",
            RaidType::Raid5 => "RAID5",
            RaidType::Raid6 => "RAID6",
            RaidType::Raid10 => "RAID10",
            RaidType::Raid50 => "RAID50",
            RaidType::Raid60 => "RAID60",
            RaidType::Unknown => "Unknown",
        };
        write!(f, "{name}")
    }
}

impl RaidType {
    /// Minimum member-count increment for online capacity expansion,
    /// `None` when expansion by target is not defined for the level.
    pub fn expansion_increment(&self) -> Option<usize> {
        match self {
            RaidType::Raid0 | RaidType::Raid5 | RaidType::Raid6 => Some(1),
            RaidType::Raid10 => Some(2),
            _ => None,
        }
    }
}

/// Encryption lock state of a virtual disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LockStatus {
    Locked,
    Unlocked,
    #[serde(other)]
    Unknown,
}

/// Snapshot of a virtual disk.
#[derive(Debug, Clone)]
pub struct VolumeSnapshot {
    pub id: String,
    pub controller_id: String,
    pub raid_type: RaidType,
    pub lock_status: LockStatus,
    pub capacity_bytes: u64,
    /// Resource paths of the member drives, from the volume's links.
    pub member_drive_uris: Vec<String>,
}

impl VolumeSnapshot {
    pub fn from_response(id: &str, controller_id: &str, body: &Value) -> Self {
        let raid_type = body
            .get("RAIDType")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or(RaidType::Unknown);
        let lock_status = body
            .pointer("/Oem/Dell/DellVolume/LockStatus")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or(LockStatus::Unknown);
        let capacity_bytes = body
            .get("CapacityBytes")
            .and_then(Value::as_u64)
            .unwrap_or(0);
        let member_drive_uris = body
            .pointer("/Links/Drives")
            .and_then(Value::as_array)
            .map(|drives| {
                drives
                    .iter()
                    .filter_map(|d| d.get("@odata.id"))
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Self {
            id: id.to_string(),
            controller_id: controller_id.to_string(),
            raid_type,
            lock_status,
            capacity_bytes,
            member_drive_uris,
        }
    }

    /// Identifiers of the member drives (trailing path segments).
    pub fn member_drive_ids(&self) -> Vec<String> {
        self.member_drive_uris
            .iter()
            .filter_map(|uri| uri.rsplit('/').next())
            .map(str::to_string)
            .collect()
    }

    pub fn capacity_mb(&self) -> u64 {
        self.capacity_bytes / (1024 * 1024)
    }
}

// =============================================================================
// Jobs
// =============================================================================

/// Handle to an asynchronous job tracked by the remote system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobHandle {
    pub id: String,
    pub uri: String,
}

/// Lifecycle state of a remote job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobState {
    New,
    Scheduled,
    Running,
    Completed,
    Failed,
    #[serde(other)]
    Unknown,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }

    /// States that mark a job as pending or active on the remote system.
    pub fn is_pending_or_active(&self) -> bool {
        matches!(self, JobState::New | JobState::Scheduled | JobState::Running)
    }
}

/// Observed status of a remote job. Mutated only by the remote system.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct JobStatus {
    pub id: String,
    pub job_state: JobState,
    pub job_type: String,
    pub message: String,
    pub message_id: String,
    pub name: String,
    pub percent_complete: u8,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

impl Default for JobStatus {
    fn default() -> Self {
        Self {
            id: String::new(),
            job_state: JobState::Unknown,
            job_type: String::new(),
            message: String::new(),
            message_id: String::new(),
            name: String::new(),
            percent_complete: 0,
            start_time: None,
            end_time: None,
        }
    }
}

// =============================================================================
// Apply Time
// =============================================================================

/// When a settings change takes effect on the remote system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplyTime {
    Immediate,
    OnReset,
    AtMaintenanceWindowStart,
    InMaintenanceWindowOnReset,
}

impl std::fmt::Display for ApplyTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ApplyTime::Immediate => "Immediate",
            ApplyTime::OnReset => "OnReset",
            ApplyTime::AtMaintenanceWindowStart => "AtMaintenanceWindowStart",
            ApplyTime::InMaintenanceWindowOnReset => "InMaintenanceWindowOnReset",
        };
        write!(f, "{name}")
    }
}

impl ApplyTime {
    pub fn requires_maintenance_window(&self) -> bool {
        matches!(
            self,
            ApplyTime::AtMaintenanceWindowStart | ApplyTime::InMaintenanceWindowOnReset
        )
    }
}

/// Maintenance window during which a deferred settings change applies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaintenanceWindow {
    /// Absolute start time, post-fixed with the remote system's UTC offset,
    /// e.g. `2022-09-30T05:15:40-05:00`.
    pub start_time: String,
    /// Window duration in seconds.
    pub duration: u64,
}

impl MaintenanceWindow {
    pub fn new(start_time: impl Into<String>, duration: u64) -> Self {
        Self {
            start_time: start_time.into(),
            duration,
        }
    }
}

/// The remote manager's clock, read before scheduling validation so the
/// caller's clock skew cannot affect the checks.
#[derive(Debug, Clone)]
pub struct ManagerClock {
    /// Current time as reported by the manager.
    pub date_time: String,
    /// Manager's local UTC offset, e.g. `-05:00`.
    pub offset: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_controller_snapshot_parses_security_fields() {
        let body = json!({
            "SecurityStatus": "SecurityKeyAssigned",
            "KeyID": "mykeyid123"
        });
        let snap = ControllerSnapshot::from_response("RAID.Slot.1-1", &body);
        assert_eq!(snap.security_status, SecurityStatus::SecurityKeyAssigned);
        assert!(snap.has_key());

        let body = json!({"SecurityStatus": "EncryptionCapable", "KeyID": null});
        let snap = ControllerSnapshot::from_response("RAID.Slot.1-1", &body);
        assert!(!snap.has_key());
    }

    #[test]
    fn test_drive_snapshot_reads_oem_block() {
        let body = json!({
            "HotspareType": "None",
            "EncryptionAbility": "SelfEncryptingDrive",
            "Oem": {"Dell": {"DellPhysicalDisk": {
                "RaidStatus": "NonRAID",
                "SystemEraseCapability": "CryptographicErasePD"
            }}},
            "Actions": {"#Drive.SecureErase": {
                "target": "/redfish/v1/Systems/System.Embedded.1/Storage/RAID.Slot.1-1\
                           /Drives/Disk.Bay.1/Actions/Drive.SecureErase"
            }}
        });
        let snap = DriveSnapshot::from_response("Disk.Bay.1", "RAID.Slot.1-1", &body);
        assert_eq!(snap.hot_spare, HotSpareType::None);
        assert_eq!(snap.raid_status, RaidStatus::NonRaid);
        assert!(snap.is_erase_capable());
        assert!(snap.secure_erase_target.is_some());
    }

    #[test]
    fn test_drive_snapshot_falls_back_to_pcie_ssd_block() {
        let body = json!({
            "Oem": {"Dell": {"DellPCIeSSD": {"RaidStatus": "Ready"}}}
        });
        let snap = DriveSnapshot::from_response("Disk.Bay.2", "RAID.Slot.1-1", &body);
        assert_eq!(snap.raid_status, RaidStatus::Ready);
        assert!(!snap.is_erase_capable());
    }

    #[test]
    fn test_volume_snapshot_members_and_capacity() {
        let body = json!({
            "RAIDType": "RAID10",
            "CapacityBytes": 379_584_512_000u64,
            "Oem": {"Dell": {"DellVolume": {"LockStatus": "Unlocked"}}},
            "Links": {"Drives": [
                {"@odata.id": "/redfish/v1/Systems/System.Embedded.1/Storage/RAID.Slot.1-1/Drives/Disk.Bay.0:Enclosure.Internal.0-1:RAID.Slot.1-1"},
                {"@odata.id": "/redfish/v1/Systems/System.Embedded.1/Storage/RAID.Slot.1-1/Drives/Disk.Bay.1:Enclosure.Internal.0-1:RAID.Slot.1-1"}
            ]}
        });
        let snap = VolumeSnapshot::from_response("Disk.Virtual.0:RAID.Slot.1-1", "RAID.Slot.1-1", &body);
        assert_eq!(snap.raid_type, RaidType::Raid10);
        assert_eq!(snap.lock_status, LockStatus::Unlocked);
        assert_eq!(
            snap.member_drive_ids(),
            vec![
                "Disk.Bay.0:Enclosure.Internal.0-1:RAID.Slot.1-1",
                "Disk.Bay.1:Enclosure.Internal.0-1:RAID.Slot.1-1"
            ]
        );
        assert_eq!(snap.capacity_mb(), 362_000);
    }

    #[test]
    fn test_job_status_deserializes_wire_names() {
        let status: JobStatus = serde_json::from_value(json!({
            "Id": "JID_444033604418",
            "JobState": "Completed",
            "JobType": "RealTimeNoRebootConfiguration",
            "Message": "Job completed successfully.",
            "MessageId": "PR19",
            "Name": "Configure: RAID.Integrated.1-1",
            "PercentComplete": 100
        }))
        .unwrap();
        assert_eq!(status.job_state, JobState::Completed);
        assert!(status.job_state.is_terminal());
        assert_eq!(status.percent_complete, 100);
    }

    #[test]
    fn test_unknown_wire_values_do_not_fail() {
        let status: JobStatus =
            serde_json::from_value(json!({"Id": "JID_1", "JobState": "Paused"})).unwrap();
        assert_eq!(status.job_state, JobState::Unknown);
        assert!(!status.job_state.is_terminal());
    }

    #[test]
    fn test_expansion_increment_table() {
        assert_eq!(RaidType::Raid0.expansion_increment(), Some(1));
        assert_eq!(RaidType::Raid5.expansion_increment(), Some(1));
        assert_eq!(RaidType::Raid6.expansion_increment(), Some(1));
        assert_eq!(RaidType::Raid10.expansion_increment(), Some(2));
        assert_eq!(RaidType::Raid50.expansion_increment(), None);
    }

    #[test]
    fn test_apply_time_window_requirement() {
        assert!(ApplyTime::AtMaintenanceWindowStart.requires_maintenance_window());
        assert!(ApplyTime::InMaintenanceWindowOnReset.requires_maintenance_window());
        assert!(!ApplyTime::Immediate.requires_maintenance_window());
        assert!(!ApplyTime::OnReset.requires_maintenance_window());
    }
}
