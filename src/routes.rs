//! Redfish resource routes for the iDRAC management endpoint
//!
//! URI templates are a hard external contract with the remote system and
//! are kept verbatim. All helpers return fully formatted resource paths;
//! the transport prepends the endpoint base URL.

/// Embedded system identifier used by every storage resource path.
pub const SYSTEM_ID: &str = "System.Embedded.1";

/// Embedded manager identifier (job and clock resources live here).
pub const MANAGER_ID: &str = "iDRAC.Embedded.1";

/// Systems collection root.
pub const SYSTEMS_URI: &str = "/redfish/v1/Systems/";

/// Manager resource, the source of the remote system's clock and offset.
pub const MANAGER_URI: &str = "/redfish/v1/Managers/iDRAC.Embedded.1";

/// Manager job collection, expanded one level so job members carry state.
pub const JOBS_EXPANDED_URI: &str =
    "/redfish/v1/Managers/iDRAC.Embedded.1/Jobs?$expand=*($levels=1)";

/// RAID service action dispatcher for a named action.
pub fn raid_action(action: &str) -> String {
    format!(
        "/redfish/v1/Systems/{SYSTEM_ID}/Oem/Dell/DellRaidService/Actions/DellRaidService.{action}"
    )
}

/// OEM controller resource (security status, key id).
pub fn controller(controller_id: &str) -> String {
    format!("/redfish/v1/Dell/Systems/{SYSTEM_ID}/Storage/DellController/{controller_id}")
}

/// Volume collection of a controller.
pub fn volumes(controller_id: &str) -> String {
    format!("/redfish/v1/Systems/{SYSTEM_ID}/Storage/{controller_id}/Volumes")
}

/// A single volume resource.
pub fn volume(controller_id: &str, volume_id: &str) -> String {
    format!("{}/{volume_id}", volumes(controller_id))
}

/// A physical drive resource under its owning controller.
pub fn drive(controller_id: &str, drive_id: &str) -> String {
    format!("/redfish/v1/Systems/{SYSTEM_ID}/Storage/{controller_id}/Drives/{drive_id}")
}

/// OEM job resource for a submitted job id.
pub fn oem_job(job_id: &str) -> String {
    format!("/redfish/v1/Managers/{MANAGER_ID}/Oem/Dell/Jobs/{job_id}")
}

/// Controller resource carrying the OEM attribute map and supported apply times.
pub fn controller_attributes(controller_id: &str) -> String {
    format!(
        "/redfish/v1/Systems/{SYSTEM_ID}/Storage/{controller_id}/Controllers/{controller_id}"
    )
}

/// Pending-settings resource of a controller, target of attribute PATCHes.
pub fn controller_settings(controller_id: &str) -> String {
    format!("{}/Settings", controller_attributes(controller_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_uri() {
        assert_eq!(
            raid_action("AssignSpare"),
            "/redfish/v1/Systems/System.Embedded.1/Oem/Dell/DellRaidService\
             /Actions/DellRaidService.AssignSpare"
        );
    }

    #[test]
    fn test_storage_uris() {
        assert_eq!(
            controller("RAID.Slot.1-1"),
            "/redfish/v1/Dell/Systems/System.Embedded.1/Storage/DellController/RAID.Slot.1-1"
        );
        assert_eq!(
            drive("RAID.Slot.1-1", "Disk.Bay.0:Enclosure.Internal.0-1:RAID.Slot.1-1"),
            "/redfish/v1/Systems/System.Embedded.1/Storage/RAID.Slot.1-1\
             /Drives/Disk.Bay.0:Enclosure.Internal.0-1:RAID.Slot.1-1"
        );
        assert_eq!(
            volume("RAID.Slot.1-1", "Disk.Virtual.0:RAID.Slot.1-1"),
            "/redfish/v1/Systems/System.Embedded.1/Storage/RAID.Slot.1-1\
             /Volumes/Disk.Virtual.0:RAID.Slot.1-1"
        );
        assert_eq!(
            controller_settings("RAID.Slot.1-1"),
            "/redfish/v1/Systems/System.Embedded.1/Storage/RAID.Slot.1-1\
             /Controllers/RAID.Slot.1-1/Settings"
        );
    }

    #[test]
    fn test_job_uri() {
        assert_eq!(
            oem_job("JID_444033604418"),
            "/redfish/v1/Managers/iDRAC.Embedded.1/Oem/Dell/Jobs/JID_444033604418"
        );
    }
}
