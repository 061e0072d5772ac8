//! Resource resolution against the remote system
//!
//! Turns user-supplied identifiers into verified snapshots. One read per
//! resolution, no caching: every command invocation sees fresh state.
//!
//! Drive and volume identifiers carry their owning controller as the
//! trailing `:`-separated segment (`Disk.Bay.0:Enclosure.Internal.0-1:
//! RAID.Slot.1-1`). That parsing rule is an external contract.

use crate::error::{Error, ResourceKind, Result};
use crate::model::{ControllerSnapshot, DriveSnapshot, ManagerClock, VolumeSnapshot};
use crate::routes;
use crate::transport::RedfishTransport;
use serde_json::Value;
use tracing::debug;

/// Owning controller id of a drive or volume identifier.
pub fn controller_id_of(device_id: &str) -> Result<&str> {
    match device_id.rsplit(':').next() {
        Some(segment) if !segment.is_empty() && segment != device_id => Ok(segment),
        _ => Err(Error::MalformedDeviceId(device_id.to_string())),
    }
}

/// Verify that a controller exists, without reading its state.
pub async fn assert_controller_exists(
    transport: &dyn RedfishTransport,
    controller_id: &str,
) -> Result<()> {
    let resp = transport.get(&routes::controller(controller_id)).await?;
    if resp.is_success() {
        Ok(())
    } else {
        Err(Error::NotFound {
            kind: ResourceKind::Controller,
            id: controller_id.to_string(),
        })
    }
}

/// Fetch the security snapshot of a controller.
pub async fn get_controller(
    transport: &dyn RedfishTransport,
    controller_id: &str,
) -> Result<ControllerSnapshot> {
    let path = routes::controller(controller_id);
    let resp = transport.get(&path).await?;
    if !resp.is_success() {
        return Err(Error::NotFound {
            kind: ResourceKind::Controller,
            id: controller_id.to_string(),
        });
    }
    debug!(controller_id, "fetched controller snapshot");
    Ok(ControllerSnapshot::from_response(controller_id, &resp.body))
}

/// Fetch the snapshot of a physical drive, deriving its controller from
/// the identifier's trailing segment.
pub async fn get_drive(
    transport: &dyn RedfishTransport,
    drive_id: &str,
) -> Result<DriveSnapshot> {
    let controller_id = controller_id_of(drive_id)?;
    get_drive_on(transport, controller_id, drive_id).await
}

/// Fetch a drive snapshot under an explicitly named controller.
pub async fn get_drive_on(
    transport: &dyn RedfishTransport,
    controller_id: &str,
    drive_id: &str,
) -> Result<DriveSnapshot> {
    let resp = transport.get(&routes::drive(controller_id, drive_id)).await?;
    if !resp.is_success() {
        return Err(Error::NotFound {
            kind: ResourceKind::PhysicalDisk,
            id: drive_id.to_string(),
        });
    }
    debug!(drive_id, controller_id, "fetched drive snapshot");
    Ok(DriveSnapshot::from_response(drive_id, controller_id, &resp.body))
}

/// Fetch a drive snapshot by its full resource path (member links).
pub async fn get_drive_by_uri(
    transport: &dyn RedfishTransport,
    drive_uri: &str,
) -> Result<DriveSnapshot> {
    let drive_id = drive_uri.rsplit('/').next().unwrap_or(drive_uri);
    let controller_id = controller_id_of(drive_id).unwrap_or("");
    let resp = transport.get(drive_uri).await?;
    if !resp.is_success() {
        return Err(Error::NotFound {
            kind: ResourceKind::PhysicalDisk,
            id: drive_id.to_string(),
        });
    }
    Ok(DriveSnapshot::from_response(drive_id, controller_id, &resp.body))
}

/// Fetch the snapshot of a virtual disk.
pub async fn get_volume(
    transport: &dyn RedfishTransport,
    volume_id: &str,
) -> Result<VolumeSnapshot> {
    let controller_id = controller_id_of(volume_id)?;
    let resp = transport
        .get(&routes::volume(controller_id, volume_id))
        .await?;
    if !resp.is_success() {
        return Err(Error::NotFound {
            kind: ResourceKind::VirtualDisk,
            id: volume_id.to_string(),
        });
    }
    debug!(volume_id, controller_id, "fetched volume snapshot");
    Ok(VolumeSnapshot::from_response(volume_id, controller_id, &resp.body))
}

/// Member entries of a controller's volume collection.
pub async fn get_volume_members(
    transport: &dyn RedfishTransport,
    controller_id: &str,
) -> Result<Vec<Value>> {
    let resp = transport.get(&routes::volumes(controller_id)).await?;
    if !resp.is_success() {
        return Err(Error::NotFound {
            kind: ResourceKind::Controller,
            id: controller_id.to_string(),
        });
    }
    Ok(resp
        .body
        .get("Members")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default())
}

/// Read the remote manager's clock and local offset.
pub async fn get_manager_clock(transport: &dyn RedfishTransport) -> Result<ManagerClock> {
    let resp = transport.get(routes::MANAGER_URI).await?;
    let date_time = resp
        .body
        .get("DateTime")
        .and_then(Value::as_str)
        .map(str::to_string);
    let offset = resp
        .body
        .get("DateTimeLocalOffset")
        .and_then(Value::as_str)
        .map(str::to_string);
    match (date_time, offset) {
        (Some(date_time), Some(offset)) => Ok(ManagerClock { date_time, offset }),
        _ => Err(Error::UnexpectedResponse {
            path: routes::MANAGER_URI.to_string(),
            reason: "manager clock fields missing".to_string(),
        }),
    }
}
