//! Action submission against the RAID service dispatcher
//!
//! Builds the flat, wire-named payload for each command and issues the
//! asynchronous action request. Exactly one action is submitted per
//! command invocation; nothing is retried here. The resulting job handle
//! is read from the response's `Location` header.

use crate::command::{BlinkDevice, Command, EncryptionMode, ReKeyMode};
use crate::error::{Error, Result};
use crate::model::JobHandle;
use crate::routes;
use crate::transport::{ApiResponse, RedfishTransport};
use serde_json::{json, Value};
use tracing::info;

/// Payload for commands whose fields map directly onto the wire.
///
/// Online capacity expansion is built separately because its `PDArray`
/// holds the computed drives-to-add, not the raw command input.
pub fn build_payload(cmd: &Command) -> Value {
    match cmd {
        Command::ResetConfig { controller_id } => json!({"TargetFQDD": controller_id}),
        Command::AssignSpare { target, volume_ids } => {
            let mut payload = json!({"TargetFQDD": target});
            if !volume_ids.is_empty() {
                payload["VirtualDiskArray"] = json!(volume_ids);
            }
            payload
        }
        Command::UnassignSpare { target } => json!({"TargetFQDD": target}),
        Command::SetControllerKey {
            controller_id,
            key,
            key_id,
        } => json!({"TargetFQDD": controller_id, "Key": key, "Keyid": key_id}),
        Command::RemoveControllerKey { controller_id } => json!({"TargetFQDD": controller_id}),
        Command::ReKey {
            controller_id,
            mode,
        } => match mode {
            ReKeyMode::Lkm {
                key,
                key_id,
                old_key,
            } => json!({
                "TargetFQDD": controller_id,
                "Mode": "LKM",
                "NewKey": key,
                "Keyid": key_id,
                "OldKey": old_key,
            }),
            ReKeyMode::Sekm => json!({"TargetFQDD": controller_id, "Mode": "SEKM"}),
        },
        Command::EnableControllerEncryption {
            controller_id,
            mode,
        } => match mode {
            EncryptionMode::Lkm { key, key_id } => json!({
                "TargetFQDD": controller_id,
                "Mode": "LKM",
                "Key": key,
                "Keyid": key_id,
            }),
            EncryptionMode::Sekm => json!({"TargetFQDD": controller_id, "Mode": "SEKM"}),
        },
        Command::BlinkTarget { device } | Command::UnBlinkTarget { device } => {
            let fqdd = match device {
                BlinkDevice::Drive(id) | BlinkDevice::Volume(id) => id,
            };
            json!({"TargetFQDD": fqdd})
        }
        Command::ConvertToRaid { targets } | Command::ConvertToNonRaid { targets } => {
            json!({"PDArray": targets})
        }
        Command::ChangePdStateToOnline { target } => {
            json!({"TargetFQDD": target, "State": "Online"})
        }
        Command::ChangePdStateToOffline { target } => {
            json!({"TargetFQDD": target, "State": "Offline"})
        }
        Command::LockVirtualDisk { volume_id } => json!({"TargetFQDD": volume_id}),
        Command::OnlineCapacityExpansion { volume_id, .. } => json!({"TargetFQDD": volume_id}),
        Command::SecureErase { .. } => json!({}),
    }
}

/// Remote action name for a command. Both PD state changes dispatch the
/// same `ChangePDState` action, distinguished by the `State` field.
pub fn action_name(cmd: &Command) -> &'static str {
    match cmd {
        Command::ChangePdStateToOnline { .. } | Command::ChangePdStateToOffline { .. } => {
            "ChangePDState"
        }
        other => other.name(),
    }
}

/// Expansion payload carrying the computed drives to add.
pub fn expansion_targets_payload(volume_id: &str, drives_to_add: &[String]) -> Value {
    json!({"TargetFQDD": volume_id, "PDArray": drives_to_add})
}

/// Expansion payload for size-based growth (size in MB).
pub fn expansion_size_payload(volume_id: &str, size_mb: u64) -> Value {
    json!({"TargetFQDD": volume_id, "Size": size_mb})
}

/// Submit a RAID-service action and return the job handle.
pub async fn submit(
    transport: &dyn RedfishTransport,
    action: &str,
    payload: Value,
) -> Result<JobHandle> {
    submit_to(transport, &routes::raid_action(action), action, payload).await
}

/// Submit an action to an explicit resource path (drive-level actions
/// such as SecureErase advertise their own target).
pub async fn submit_to(
    transport: &dyn RedfishTransport,
    path: &str,
    action: &str,
    payload: Value,
) -> Result<JobHandle> {
    let resp = transport.post(path, payload).await?;
    if !resp.is_success() {
        return Err(Error::ActionRejected {
            action: action.to_string(),
            error_info: resp.body,
        });
    }
    let handle = job_handle_from(&resp, path)?;
    info!(action, job_id = %handle.id, "submitted asynchronous action");
    Ok(handle)
}

/// Raw submission for actions that may complete synchronously (blink).
pub async fn submit_raw(
    transport: &dyn RedfishTransport,
    action: &str,
    payload: Value,
) -> Result<ApiResponse> {
    let path = routes::raid_action(action);
    let resp = transport.post(&path, payload).await?;
    if !resp.is_success() {
        return Err(Error::ActionRejected {
            action: action.to_string(),
            error_info: resp.body,
        });
    }
    Ok(resp)
}

/// Extract the job handle from an accepted action response.
pub fn job_handle_from(resp: &ApiResponse, path: &str) -> Result<JobHandle> {
    let location = resp
        .location
        .as_deref()
        .ok_or_else(|| Error::UnexpectedResponse {
            path: path.to_string(),
            reason: "accepted action carries no Location header".to_string(),
        })?;
    let id = location
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| Error::UnexpectedResponse {
            path: path.to_string(),
            reason: format!("job id missing from location '{location}'"),
        })?;
    Ok(JobHandle {
        id: id.to_string(),
        uri: location.to_string(),
    })
}
