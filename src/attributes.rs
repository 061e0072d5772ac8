//! Controller attribute settings engine
//!
//! Computes the minimal diff between the controller's current OEM
//! attribute map and the requested values, validates mutual-exclusion
//! and scheduling rules, and issues the settings PATCH with the chosen
//! apply-time directive. All scheduling checks run against the remote
//! manager's own clock so caller-side clock skew cannot slip a past
//! window through.

use crate::actions::job_handle_from;
use crate::error::{Error, Result};
use crate::model::{ApplyTime, JobHandle, MaintenanceWindow, ManagerClock};
use crate::routes;
use crate::transport::RedfishTransport;
use chrono::DateTime;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Current attribute state of a controller.
#[derive(Debug, Clone, Default)]
pub struct AttributeState {
    /// Current OEM attribute values.
    pub current: Map<String, Value>,
    /// Apply-time policies the controller advertises for its settings
    /// resource; empty when the firmware does not report any.
    pub supported_apply_times: Vec<String>,
}

/// Fetch the controller's attribute map and supported apply times.
pub async fn fetch_state(
    transport: &dyn RedfishTransport,
    controller_id: &str,
) -> Result<AttributeState> {
    let path = routes::controller_attributes(controller_id);
    let resp = transport.get(&path).await?;
    if !resp.is_success() {
        return Err(Error::UnexpectedResponse {
            path,
            reason: format!("attribute read returned HTTP {}", resp.status),
        });
    }

    let current = resp
        .body
        .pointer("/Oem/Dell/DellStorageController")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    let supported_apply_times = resp
        .body
        .pointer("/@Redfish.Settings/SupportedApplyTimes")
        .and_then(Value::as_array)
        .map(|times| {
            times
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    debug!(
        controller_id,
        attributes = current.len(),
        "fetched controller attribute state"
    );
    Ok(AttributeState {
        current,
        supported_apply_times,
    })
}

/// `ControllerMode` switches the controller between RAID and HBA
/// personalities; it must travel alone.
pub fn validate_controller_mode_exclusive(requested: &BTreeMap<String, Value>) -> Result<()> {
    if requested.contains_key("ControllerMode") && requested.len() > 1 {
        return Err(Error::HbaModeConflict);
    }
    Ok(())
}

/// Diff requested values against the current map. Names absent from the
/// current map are rejected together, before any mutation is attempted.
pub fn diff(
    current: &Map<String, Value>,
    requested: &BTreeMap<String, Value>,
) -> Result<BTreeMap<String, Value>> {
    let mut invalid = Vec::new();
    let mut pending = BTreeMap::new();
    for (name, desired) in requested {
        match current.get(name) {
            None => invalid.push(name.clone()),
            Some(value) if value != desired => {
                pending.insert(name.clone(), desired.clone());
            }
            Some(_) => {}
        }
    }
    if !invalid.is_empty() {
        return Err(Error::InvalidAttributes(invalid));
    }
    Ok(pending)
}

/// Validate a maintenance window against the manager's clock: the start
/// time must carry the manager's exact UTC offset and must not be in the
/// past relative to the manager's own reported time.
pub fn validate_window(window: &MaintenanceWindow, clock: &ManagerClock) -> Result<()> {
    if !window.start_time.ends_with(&clock.offset) {
        return Err(Error::MaintenanceWindowOffset(clock.offset.clone()));
    }
    let start = DateTime::parse_from_rfc3339(&window.start_time).map_err(|err| {
        Error::Configuration(format!("invalid maintenance window start time: {err}"))
    })?;
    let now = DateTime::parse_from_rfc3339(&clock.date_time).map_err(|err| {
        Error::Configuration(format!("manager clock is not RFC 3339: {err}"))
    })?;
    if start < now {
        return Err(Error::MaintenanceWindowPast);
    }
    Ok(())
}

/// Build the `@Redfish.SettingsApplyTime` directive. Returns `None` when
/// the controller advertises no supported apply times at all. The manager
/// clock is only consulted (and thus only needs to be fetched) for
/// maintenance-window apply times.
pub fn apply_time_directive(
    apply_time: ApplyTime,
    window: Option<&MaintenanceWindow>,
    supported: &[String],
    clock: Option<&ManagerClock>,
) -> Result<Option<Value>> {
    if supported.is_empty() {
        return Ok(None);
    }
    if !supported.iter().any(|s| s == &apply_time.to_string()) {
        return Err(Error::UnsupportedApplyTime(apply_time.to_string()));
    }

    if apply_time.requires_maintenance_window() {
        let window = window.ok_or_else(|| {
            Error::Configuration(format!(
                "apply time {apply_time} requires a maintenance window"
            ))
        })?;
        let clock = clock.ok_or_else(|| {
            Error::Configuration("manager clock is required for maintenance windows".to_string())
        })?;
        validate_window(window, clock)?;
        Ok(Some(json!({
            "ApplyTime": apply_time.to_string(),
            "MaintenanceWindowStartTime": window.start_time,
            "MaintenanceWindowDurationInSeconds": window.duration,
        })))
    } else {
        Ok(Some(json!({"ApplyTime": apply_time.to_string()})))
    }
}

/// PATCH the pending diff to the controller settings resource and return
/// the configuration job handle.
pub async fn submit_settings(
    transport: &dyn RedfishTransport,
    controller_id: &str,
    pending: &BTreeMap<String, Value>,
    directive: Option<Value>,
) -> Result<JobHandle> {
    let mut payload = json!({"Oem": {"Dell": {"DellStorageController": pending}}});
    if let Some(directive) = directive {
        payload["@Redfish.SettingsApplyTime"] = directive;
    }

    let path = routes::controller_settings(controller_id);
    let resp = transport.patch(&path, payload).await?;
    if !resp.is_success() {
        return Err(Error::ActionRejected {
            action: "ApplyAttributes".to_string(),
            error_info: resp.body,
        });
    }

    // An accepted settings PATCH can still carry a rejection in its body;
    // only a "Created" message id marks a scheduled configuration job.
    if let Some(err) = resp.body.get("error") {
        let message_id = err
            .pointer("/@Message.ExtendedInfo/0/MessageId")
            .and_then(Value::as_str)
            .unwrap_or_default();
        if !message_id.contains("Created") {
            return Err(Error::ActionRejected {
                action: "ApplyAttributes".to_string(),
                error_info: resp.body.clone(),
            });
        }
    }

    let handle = job_handle_from(&resp, &path)?;
    info!(controller_id, job_id = %handle.id, "submitted controller settings change");
    Ok(handle)
}
