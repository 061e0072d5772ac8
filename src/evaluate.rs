//! Idempotency predicates for storage configuration commands
//!
//! Every predicate here is pure: it compares a fresh snapshot against the
//! desired outcome and never performs I/O. The dispatcher fetches the
//! snapshots, asks for a [`Decision`], and only then talks to the action
//! submitter.
//!
//! ReKey and Blink/UnBlink are declared always-mutating: their effect
//! cannot be observed beforehand, so they report a pending change under
//! dry-run and execute otherwise.

use crate::error::{Error, Result};
use crate::model::{
    ControllerSnapshot, DriveSnapshot, EncryptionAbility, HotSpareType, LockStatus, RaidStatus,
    RaidType, SecurityStatus, VolumeSnapshot,
};

/// Outcome of an idempotency check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The system is already at the target state.
    NoOp,
    /// A change would occur; dry-run stops here.
    WouldChange,
    /// A change is needed and should be submitted.
    MustApply,
}

impl Decision {
    /// Fold a would-change predicate with the dry-run flag.
    pub fn from_pending(pending: bool, dry_run: bool) -> Self {
        match (pending, dry_run) {
            (false, _) => Decision::NoOp,
            (true, true) => Decision::WouldChange,
            (true, false) => Decision::MustApply,
        }
    }

    pub fn is_noop(&self) -> bool {
        matches!(self, Decision::NoOp)
    }
}

// =============================================================================
// Controller Key Commands
// =============================================================================

/// Commands that manage the controller encryption key fail outright on
/// controllers that cannot encrypt.
pub fn assert_encryption_capable(ctrl: &ControllerSnapshot) -> Result<()> {
    if ctrl.security_status == SecurityStatus::EncryptionNotCapable {
        return Err(Error::EncryptionNotSupported(ctrl.id.clone()));
    }
    Ok(())
}

/// SetControllerKey mutates only when no key is assigned yet.
pub fn set_controller_key(ctrl: &ControllerSnapshot, dry_run: bool) -> Decision {
    Decision::from_pending(!ctrl.has_key(), dry_run)
}

/// RemoveControllerKey mutates only when a key is assigned.
pub fn remove_controller_key(ctrl: &ControllerSnapshot, dry_run: bool) -> Decision {
    Decision::from_pending(ctrl.has_key(), dry_run)
}

/// EnableControllerEncryption is a no-op once a security key is assigned.
pub fn enable_controller_encryption(ctrl: &ControllerSnapshot, dry_run: bool) -> Decision {
    Decision::from_pending(
        ctrl.security_status != SecurityStatus::SecurityKeyAssigned,
        dry_run,
    )
}

/// ReKey always mutates; its effect is not observable beforehand.
pub fn re_key(dry_run: bool) -> Decision {
    Decision::from_pending(true, dry_run)
}

// =============================================================================
// Hot Spare
// =============================================================================

pub fn assign_spare(drive: &DriveSnapshot, dry_run: bool) -> Decision {
    let assigned = matches!(
        drive.hot_spare,
        HotSpareType::Dedicated | HotSpareType::Global
    );
    Decision::from_pending(!assigned, dry_run)
}

pub fn unassign_spare(drive: &DriveSnapshot, dry_run: bool) -> Decision {
    Decision::from_pending(drive.hot_spare != HotSpareType::None, dry_run)
}

// =============================================================================
// RAID Readiness
// =============================================================================

/// Convert commands compare every targeted drive against the target
/// readiness: `Ready` for ConvertToRAID, `NonRAID` for ConvertToNonRAID.
pub fn convert_raid_status(
    statuses: &[RaidStatus],
    target: RaidStatus,
    dry_run: bool,
) -> Decision {
    let pending = statuses.iter().any(|s| *s != target);
    Decision::from_pending(pending, dry_run)
}

pub fn change_pd_state(drive: &DriveSnapshot, target: RaidStatus, dry_run: bool) -> Decision {
    Decision::from_pending(drive.raid_status != target, dry_run)
}

// =============================================================================
// Virtual Disk
// =============================================================================

/// LockVirtualDisk requires every member drive to be self-encrypting;
/// a non-SED member is a failure, not a no-op.
pub fn lock_virtual_disk(
    volume: &VolumeSnapshot,
    member_abilities: &[EncryptionAbility],
    dry_run: bool,
) -> Result<Decision> {
    if member_abilities
        .iter()
        .any(|a| *a != EncryptionAbility::SelfEncryptingDrive)
    {
        return Err(Error::VolumeNotEncryptionCapable);
    }
    Ok(Decision::from_pending(
        volume.lock_status != LockStatus::Locked,
        dry_run,
    ))
}

/// ResetConfig mutates only when the controller still has virtual disks.
pub fn reset_config(member_count: usize, dry_run: bool) -> Decision {
    Decision::from_pending(member_count > 0, dry_run)
}

/// Blink and UnBlink always mutate.
pub fn blink(dry_run: bool) -> Decision {
    Decision::from_pending(true, dry_run)
}

// =============================================================================
// Online Capacity Expansion
// =============================================================================

/// Drives that would actually join the span, with the expansion decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpansionPlan {
    pub drives_to_add: Vec<String>,
    pub decision: Decision,
}

/// Expansion by target: reject unsupported RAID levels, then apply the
/// minimum member-increment rule. A remainder leaves the volume as-is.
pub fn expand_by_targets(
    volume: &VolumeSnapshot,
    requested: &[String],
    dry_run: bool,
) -> Result<ExpansionPlan> {
    if matches!(volume.raid_type, RaidType::Raid50 | RaidType::Raid60) {
        return Err(Error::ExpansionUnsupportedRaidType(
            volume.raid_type.to_string(),
        ));
    }
    if requested.is_empty() {
        return Err(Error::ExpansionTargetsEmpty);
    }
    if volume.raid_type == RaidType::Raid1 {
        return Err(Error::ExpansionRaid1Target);
    }

    let current = volume.member_drive_ids();
    let drives_to_add: Vec<String> = requested
        .iter()
        .filter(|d| !current.contains(d))
        .cloned()
        .collect();

    let increment = volume.raid_type.expansion_increment().unwrap_or(1);
    let pending = !drives_to_add.is_empty() && drives_to_add.len() % increment == 0;
    Ok(ExpansionPlan {
        drives_to_add,
        decision: Decision::from_pending(pending, dry_run),
    })
}

/// Expansion by size: the requested size must exceed the current size by
/// more than 100 MB, otherwise the request is a hard failure. There is no
/// dry-run distinction for size-based expansion.
pub fn expand_by_size(volume: &VolumeSnapshot, requested_mb: u64) -> Result<()> {
    if matches!(volume.raid_type, RaidType::Raid50 | RaidType::Raid60) {
        return Err(Error::ExpansionUnsupportedRaidType(
            volume.raid_type.to_string(),
        ));
    }
    let current_mb = volume.capacity_mb();
    if requested_mb.saturating_sub(current_mb) < 100 {
        return Err(Error::ExpansionBelowMinimum(current_mb));
    }
    Ok(())
}

// =============================================================================
// Secure Erase
// =============================================================================

/// Why a secure erase is skipped rather than submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EraseSkip {
    NotReady,
    NotCapable,
}

/// SecureErase skips (distinct from no-op) when the drive is not in the
/// ready state or does not advertise cryptographic erase.
pub fn secure_erase_precondition(drive: &DriveSnapshot) -> Option<EraseSkip> {
    if drive.raid_status != RaidStatus::Ready {
        return Some(EraseSkip::NotReady);
    }
    if !drive.is_erase_capable() {
        return Some(EraseSkip::NotCapable);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn controller(status: SecurityStatus, key_id: Option<&str>) -> ControllerSnapshot {
        ControllerSnapshot {
            id: "RAID.Slot.1-1".into(),
            security_status: status,
            key_id: key_id.map(str::to_string),
        }
    }

    fn drive(hot_spare: HotSpareType, raid_status: RaidStatus) -> DriveSnapshot {
        DriveSnapshot {
            id: "Disk.Bay.0:Enclosure.Internal.0-1:RAID.Slot.1-1".into(),
            controller_id: "RAID.Slot.1-1".into(),
            hot_spare,
            raid_status,
            encryption_ability: EncryptionAbility::None,
            erase_capability: None,
            secure_erase_target: None,
        }
    }

    fn volume(raid_type: RaidType, members: &[&str], capacity_mb: u64) -> VolumeSnapshot {
        VolumeSnapshot {
            id: "Disk.Virtual.0:RAID.Slot.1-1".into(),
            controller_id: "RAID.Slot.1-1".into(),
            raid_type,
            lock_status: LockStatus::Unlocked,
            capacity_bytes: capacity_mb * 1024 * 1024,
            member_drive_uris: members
                .iter()
                .map(|m| format!("/redfish/v1/Systems/System.Embedded.1/Storage/RAID.Slot.1-1/Drives/{m}"))
                .collect(),
        }
    }

    #[test]
    fn test_set_controller_key_idempotent_when_key_present() {
        let ctrl = controller(SecurityStatus::SecurityKeyAssigned, Some("mykeyid"));
        assert_eq!(set_controller_key(&ctrl, false), Decision::NoOp);
        assert_eq!(set_controller_key(&ctrl, true), Decision::NoOp);

        let ctrl = controller(SecurityStatus::EncryptionCapable, None);
        assert_eq!(set_controller_key(&ctrl, true), Decision::WouldChange);
        assert_eq!(set_controller_key(&ctrl, false), Decision::MustApply);
    }

    #[test]
    fn test_remove_controller_key_mirrors_set() {
        let ctrl = controller(SecurityStatus::EncryptionCapable, None);
        assert_eq!(remove_controller_key(&ctrl, false), Decision::NoOp);

        let ctrl = controller(SecurityStatus::SecurityKeyAssigned, Some("mykeyid"));
        assert_eq!(remove_controller_key(&ctrl, false), Decision::MustApply);
    }

    #[test]
    fn test_enable_encryption_noop_once_key_assigned() {
        let ctrl = controller(SecurityStatus::SecurityKeyAssigned, Some("mykeyid"));
        assert_eq!(enable_controller_encryption(&ctrl, false), Decision::NoOp);

        let ctrl = controller(SecurityStatus::EncryptionCapable, None);
        assert_eq!(
            enable_controller_encryption(&ctrl, true),
            Decision::WouldChange
        );
    }

    #[test]
    fn test_encryption_capability_guard() {
        let ctrl = controller(SecurityStatus::EncryptionNotCapable, None);
        assert_matches!(
            assert_encryption_capable(&ctrl),
            Err(Error::EncryptionNotSupported(_))
        );
        assert!(assert_encryption_capable(&controller(
            SecurityStatus::EncryptionCapable,
            None
        ))
        .is_ok());
    }

    #[test]
    fn test_rekey_always_reports_pending_change() {
        assert_eq!(re_key(true), Decision::WouldChange);
        assert_eq!(re_key(false), Decision::MustApply);
    }

    #[test]
    fn test_spare_assignment_predicates() {
        let unassigned = drive(HotSpareType::None, RaidStatus::Online);
        assert_eq!(assign_spare(&unassigned, true), Decision::WouldChange);
        assert_eq!(unassign_spare(&unassigned, false), Decision::NoOp);

        let dedicated = drive(HotSpareType::Dedicated, RaidStatus::Online);
        assert_eq!(assign_spare(&dedicated, false), Decision::NoOp);
        assert_eq!(unassign_spare(&dedicated, false), Decision::MustApply);

        let global = drive(HotSpareType::Global, RaidStatus::Online);
        assert_eq!(assign_spare(&global, true), Decision::NoOp);
    }

    #[test]
    fn test_convert_raid_considers_every_drive() {
        let statuses = [RaidStatus::Ready, RaidStatus::Ready];
        assert_eq!(
            convert_raid_status(&statuses, RaidStatus::Ready, false),
            Decision::NoOp
        );

        let statuses = [RaidStatus::Ready, RaidStatus::NonRaid];
        assert_eq!(
            convert_raid_status(&statuses, RaidStatus::Ready, true),
            Decision::WouldChange
        );
        assert_eq!(
            convert_raid_status(&statuses, RaidStatus::NonRaid, false),
            Decision::MustApply
        );
    }

    #[test]
    fn test_pd_state_change() {
        let online = drive(HotSpareType::None, RaidStatus::Online);
        assert_eq!(
            change_pd_state(&online, RaidStatus::Online, false),
            Decision::NoOp
        );
        assert_eq!(
            change_pd_state(&online, RaidStatus::Offline, true),
            Decision::WouldChange
        );
    }

    #[test]
    fn test_lock_requires_self_encrypting_members() {
        let vol = volume(RaidType::Raid1, &["d0", "d1"], 100_000);
        let abilities = [
            EncryptionAbility::SelfEncryptingDrive,
            EncryptionAbility::None,
        ];
        assert_matches!(
            lock_virtual_disk(&vol, &abilities, false),
            Err(Error::VolumeNotEncryptionCapable)
        );

        let abilities = [EncryptionAbility::SelfEncryptingDrive; 2];
        assert_eq!(
            lock_virtual_disk(&vol, &abilities, false).unwrap(),
            Decision::MustApply
        );

        let mut locked = vol.clone();
        locked.lock_status = LockStatus::Locked;
        assert_eq!(
            lock_virtual_disk(&locked, &abilities, false).unwrap(),
            Decision::NoOp
        );
    }

    #[test]
    fn test_reset_config_noop_without_volumes() {
        assert_eq!(reset_config(0, false), Decision::NoOp);
        assert_eq!(reset_config(2, true), Decision::WouldChange);
        assert_eq!(reset_config(1, false), Decision::MustApply);
    }

    #[test]
    fn test_expansion_raid10_needs_pairs() {
        let vol = volume(RaidType::Raid10, &["d0", "d1", "d2", "d3"], 362_000);

        // One new drive: remainder 1, not divisible by 2.
        let plan = expand_by_targets(&vol, &["d4".into()], false).unwrap();
        assert_eq!(plan.decision, Decision::NoOp);

        let plan = expand_by_targets(&vol, &["d4".into(), "d5".into()], false).unwrap();
        assert_eq!(plan.decision, Decision::MustApply);
        assert_eq!(plan.drives_to_add, vec!["d4", "d5"]);

        let plan = expand_by_targets(&vol, &["d4".into(), "d5".into()], true).unwrap();
        assert_eq!(plan.decision, Decision::WouldChange);
    }

    #[test]
    fn test_expansion_ignores_existing_members() {
        let vol = volume(RaidType::Raid5, &["d0", "d1", "d2"], 362_000);
        let plan = expand_by_targets(&vol, &["d0".into(), "d1".into()], false).unwrap();
        assert!(plan.drives_to_add.is_empty());
        assert_eq!(plan.decision, Decision::NoOp);
    }

    #[test]
    fn test_expansion_rejects_unsupported_levels() {
        let vol = volume(RaidType::Raid50, &["d0"], 362_000);
        assert_matches!(
            expand_by_targets(&vol, &["d1".into()], false),
            Err(Error::ExpansionUnsupportedRaidType(_))
        );

        let vol = volume(RaidType::Raid1, &["d0", "d1"], 362_000);
        assert_matches!(
            expand_by_targets(&vol, &["d2".into()], false),
            Err(Error::ExpansionRaid1Target)
        );

        let vol = volume(RaidType::Raid5, &["d0"], 362_000);
        assert_matches!(
            expand_by_targets(&vol, &[], false),
            Err(Error::ExpansionTargetsEmpty)
        );
    }

    #[test]
    fn test_expansion_by_size_enforces_floor() {
        let vol = volume(RaidType::Raid5, &["d0"], 362_000);
        assert_matches!(
            expand_by_size(&vol, 362_050),
            Err(Error::ExpansionBelowMinimum(362_000))
        );
        assert!(expand_by_size(&vol, 362_785).is_ok());
        assert_matches!(expand_by_size(&vol, 361_000), Err(Error::ExpansionBelowMinimum(_)));
    }

    #[test]
    fn test_secure_erase_preconditions() {
        let not_ready = drive(HotSpareType::None, RaidStatus::Online);
        assert_eq!(
            secure_erase_precondition(&not_ready),
            Some(EraseSkip::NotReady)
        );

        let mut ready = drive(HotSpareType::None, RaidStatus::Ready);
        assert_eq!(
            secure_erase_precondition(&ready),
            Some(EraseSkip::NotCapable)
        );

        ready.erase_capability = Some("CryptographicErasePD".into());
        assert_eq!(secure_erase_precondition(&ready), None);
    }
}
