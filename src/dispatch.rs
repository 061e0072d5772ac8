//! Command dispatcher
//!
//! Composes resolution, idempotency evaluation, action submission and
//! job tracking into one normalized [`Outcome`] per invocation. The
//! ordering is strict: resolve, snapshot, evaluate, submit, then poll.
//! A `NoOp` decision and a dry run both stop before anything is
//! submitted, so the remote system is never mutated in either case.

use crate::actions;
use crate::attributes;
use crate::command::{AttributeRequest, Command, ExecOptions, Expansion, Operation};
use crate::error::{Error, Result};
use crate::evaluate::{self, Decision, EraseSkip};
use crate::jobs::{self, DEFAULT_POLL_INTERVAL};
use crate::messages;
use crate::model::{ApplyTime, JobHandle, JobState, RaidStatus};
use crate::resolver;
use crate::routes;
use crate::transport::RedfishTransport;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Job type of real-time controller configuration work; SecureErase must
/// not queue behind a pending job of this type.
const REALTIME_CONFIG_JOB_TYPE: &str = "RealTimeNoRebootConfiguration";

// =============================================================================
// Outcome
// =============================================================================

/// Normalized result of one operation, shaped for calling automation.
#[derive(Debug, Clone, Serialize)]
pub struct Outcome {
    /// Human-readable result from the message catalog or the job itself.
    pub message: String,
    /// Whether the remote system was (or would be) mutated.
    pub changed: bool,
    /// Whether the operation failed after submission.
    pub failed: bool,
    /// Whether the operation was skipped due to an unmet precondition.
    pub skipped: bool,
    /// Handle of the submitted configuration job, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job: Option<JobHandle>,
    /// Last observed job status payload, protocol keys scrubbed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Value>,
    /// Remote error payload when the endpoint rejected the request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_info: Option<Value>,
}

impl Outcome {
    fn message_only(message: impl Into<String>, changed: bool) -> Self {
        Self {
            message: message.into(),
            changed,
            failed: false,
            skipped: false,
            job: None,
            status: None,
            error_info: None,
        }
    }

    /// The system is already at the target state.
    pub fn no_changes() -> Self {
        Self::message_only(messages::NO_CHANGES_FOUND, false)
    }

    /// Dry run found a pending change.
    pub fn changes_found() -> Self {
        Self::message_only(messages::CHANGES_FOUND, true)
    }

    /// Precondition not met; nothing was submitted.
    pub fn skipped(message: impl Into<String>) -> Self {
        Self {
            skipped: true,
            ..Self::message_only(message, false)
        }
    }
}

// =============================================================================
// Dispatcher
// =============================================================================

/// Executes operations against a management endpoint via the transport
/// seam. One dispatcher per session; each call sees fresh remote state.
pub struct Dispatcher {
    transport: Arc<dyn RedfishTransport>,
    poll_interval: Duration,
}

impl Dispatcher {
    pub fn new(transport: Arc<dyn RedfishTransport>) -> Self {
        Self {
            transport,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Run one operation to completion.
    pub async fn run(&self, operation: &Operation, opts: &ExecOptions) -> Result<Outcome> {
        match operation {
            Operation::Command(cmd) => self.run_command(cmd, opts).await,
            Operation::Attributes(req) => self.apply_attributes(req, opts).await,
        }
    }

    pub async fn run_command(&self, cmd: &Command, opts: &ExecOptions) -> Result<Outcome> {
        info!(
            command = cmd.name(),
            dry_run = opts.dry_run,
            "dispatching storage command"
        );
        match cmd {
            Command::ResetConfig { controller_id } => {
                self.reset_config(cmd, controller_id, opts).await
            }
            Command::SetControllerKey { controller_id, .. }
            | Command::RemoveControllerKey { controller_id }
            | Command::ReKey { controller_id, .. }
            | Command::EnableControllerEncryption { controller_id, .. } => {
                self.controller_key(cmd, controller_id, opts).await
            }
            Command::AssignSpare { target, .. } | Command::UnassignSpare { target } => {
                self.hot_spare(cmd, target, opts).await
            }
            Command::BlinkTarget { .. } | Command::UnBlinkTarget { .. } => {
                self.blink(cmd, opts).await
            }
            Command::ConvertToRaid { targets } | Command::ConvertToNonRaid { targets } => {
                self.convert_raid(cmd, targets, opts).await
            }
            Command::ChangePdStateToOnline { target } => {
                self.pd_state(cmd, target, RaidStatus::Online, opts).await
            }
            Command::ChangePdStateToOffline { target } => {
                self.pd_state(cmd, target, RaidStatus::Offline, opts).await
            }
            Command::LockVirtualDisk { volume_id } => {
                self.lock_virtual_disk(cmd, volume_id, opts).await
            }
            Command::OnlineCapacityExpansion {
                volume_id,
                expansion,
            } => self.capacity_expansion(volume_id, expansion, opts).await,
            Command::SecureErase {
                controller_id,
                target,
            } => self.secure_erase(controller_id, target, opts).await,
        }
    }

    // -------------------------------------------------------------------------
    // Command families
    // -------------------------------------------------------------------------

    async fn reset_config(
        &self,
        cmd: &Command,
        controller_id: &str,
        opts: &ExecOptions,
    ) -> Result<Outcome> {
        let t = self.transport.as_ref();
        resolver::assert_controller_exists(t, controller_id).await?;
        let members = resolver::get_volume_members(t, controller_id).await?;
        let decision = evaluate::reset_config(members.len(), opts.dry_run);
        self.conclude(cmd, decision, opts).await
    }

    async fn controller_key(
        &self,
        cmd: &Command,
        controller_id: &str,
        opts: &ExecOptions,
    ) -> Result<Outcome> {
        let t = self.transport.as_ref();
        let ctrl = resolver::get_controller(t, controller_id).await?;
        evaluate::assert_encryption_capable(&ctrl)?;
        let decision = match cmd {
            Command::SetControllerKey { .. } => evaluate::set_controller_key(&ctrl, opts.dry_run),
            Command::RemoveControllerKey { .. } => {
                evaluate::remove_controller_key(&ctrl, opts.dry_run)
            }
            Command::EnableControllerEncryption { .. } => {
                evaluate::enable_controller_encryption(&ctrl, opts.dry_run)
            }
            // only key commands are routed here; the remaining one is ReKey
            _ => evaluate::re_key(opts.dry_run),
        };
        self.conclude(cmd, decision, opts).await
    }

    async fn hot_spare(&self, cmd: &Command, target: &str, opts: &ExecOptions) -> Result<Outcome> {
        let drive = resolver::get_drive(self.transport.as_ref(), target).await?;
        let decision = match cmd {
            Command::AssignSpare { .. } => evaluate::assign_spare(&drive, opts.dry_run),
            _ => evaluate::unassign_spare(&drive, opts.dry_run),
        };
        self.conclude(cmd, decision, opts).await
    }

    async fn convert_raid(
        &self,
        cmd: &Command,
        targets: &[String],
        opts: &ExecOptions,
    ) -> Result<Outcome> {
        let target_status = match cmd {
            Command::ConvertToRaid { .. } => RaidStatus::Ready,
            _ => RaidStatus::NonRaid,
        };
        let mut statuses = Vec::with_capacity(targets.len());
        for drive_id in targets {
            let drive = resolver::get_drive(self.transport.as_ref(), drive_id).await?;
            statuses.push(drive.raid_status);
        }
        let decision = evaluate::convert_raid_status(&statuses, target_status, opts.dry_run);
        self.conclude(cmd, decision, opts).await
    }

    async fn pd_state(
        &self,
        cmd: &Command,
        target: &str,
        target_status: RaidStatus,
        opts: &ExecOptions,
    ) -> Result<Outcome> {
        let drive = resolver::get_drive(self.transport.as_ref(), target).await?;
        let decision = evaluate::change_pd_state(&drive, target_status, opts.dry_run);
        self.conclude(cmd, decision, opts).await
    }

    /// Blink and UnBlink complete synchronously: a successful response
    /// means the identification LED already changed, so no job is tracked.
    async fn blink(&self, cmd: &Command, opts: &ExecOptions) -> Result<Outcome> {
        if opts.dry_run {
            return Ok(Outcome::changes_found());
        }
        actions::submit_raw(
            self.transport.as_ref(),
            cmd.name(),
            actions::build_payload(cmd),
        )
        .await?;
        Ok(Outcome::message_only(
            messages::job_completion(cmd.name()),
            true,
        ))
    }

    async fn lock_virtual_disk(
        &self,
        cmd: &Command,
        volume_id: &str,
        opts: &ExecOptions,
    ) -> Result<Outcome> {
        let t = self.transport.as_ref();
        let volume = resolver::get_volume(t, volume_id).await?;
        let mut abilities = Vec::with_capacity(volume.member_drive_uris.len());
        for uri in &volume.member_drive_uris {
            let member = resolver::get_drive_by_uri(t, uri).await?;
            abilities.push(member.encryption_ability);
        }
        let decision = evaluate::lock_virtual_disk(&volume, &abilities, opts.dry_run)?;
        self.conclude(cmd, decision, opts).await
    }

    async fn capacity_expansion(
        &self,
        volume_id: &str,
        expansion: &Expansion,
        opts: &ExecOptions,
    ) -> Result<Outcome> {
        let t = self.transport.as_ref();
        let volume = resolver::get_volume(t, volume_id).await?;
        let label = "OnlineCapacityExpansion";

        let payload = match expansion {
            Expansion::ByTargets(targets) => {
                let plan = evaluate::expand_by_targets(&volume, targets, opts.dry_run)?;
                match plan.decision {
                    Decision::NoOp => return Ok(Outcome::no_changes()),
                    Decision::WouldChange => return Ok(Outcome::changes_found()),
                    Decision::MustApply => {
                        actions::expansion_targets_payload(volume_id, &plan.drives_to_add)
                    }
                }
            }
            Expansion::BySize(size_mb) => {
                evaluate::expand_by_size(&volume, *size_mb)?;
                if opts.dry_run {
                    return Ok(Outcome::changes_found());
                }
                actions::expansion_size_payload(volume_id, *size_mb)
            }
        };

        let handle = actions::submit(t, label, payload).await?;
        self.track(
            handle,
            opts,
            messages::job_completion(label),
            messages::job_submission(label),
        )
        .await
    }

    async fn secure_erase(
        &self,
        controller_id: &str,
        target: &str,
        opts: &ExecOptions,
    ) -> Result<Outcome> {
        let t = self.transport.as_ref();
        resolver::assert_controller_exists(t, controller_id).await?;
        let drive = resolver::get_drive_on(t, controller_id, target).await?;

        if let Some(skip) = evaluate::secure_erase_precondition(&drive) {
            let message = match skip {
                EraseSkip::NotReady => messages::drive_not_ready(target),
                EraseSkip::NotCapable => messages::drive_not_secure_erase(target),
            };
            warn!(drive_id = target, reason = ?skip, "secure erase skipped");
            return Ok(Outcome::skipped(message));
        }

        if jobs::find_active_of_type(t, REALTIME_CONFIG_JOB_TYPE)
            .await?
            .is_some()
        {
            return Ok(Outcome::message_only(messages::JOB_EXISTS, false));
        }

        if opts.dry_run {
            return Ok(Outcome::changes_found());
        }

        let action_uri =
            drive
                .secure_erase_target
                .clone()
                .ok_or_else(|| Error::UnexpectedResponse {
                    path: routes::drive(controller_id, target),
                    reason: "drive does not advertise a SecureErase action target".to_string(),
                })?;
        let handle = actions::submit_to(t, &action_uri, "SecureErase", json!({})).await?;
        self.track(
            handle,
            opts,
            messages::job_completion("SecureErase"),
            messages::job_submission("SecureErase"),
        )
        .await
    }

    // -------------------------------------------------------------------------
    // Attribute settings
    // -------------------------------------------------------------------------

    async fn apply_attributes(
        &self,
        req: &AttributeRequest,
        opts: &ExecOptions,
    ) -> Result<Outcome> {
        let t = self.transport.as_ref();
        resolver::assert_controller_exists(t, &req.controller_id).await?;
        attributes::validate_controller_mode_exclusive(&req.attributes)?;

        let state = attributes::fetch_state(t, &req.controller_id).await?;
        let pending = attributes::diff(&state.current, &req.attributes)?;
        if pending.is_empty() {
            return Ok(Outcome::no_changes());
        }
        if opts.dry_run {
            return Ok(Outcome::changes_found());
        }

        let clock = if req.apply_time.requires_maintenance_window()
            && !state.supported_apply_times.is_empty()
        {
            Some(resolver::get_manager_clock(t).await?)
        } else {
            None
        };
        let directive = attributes::apply_time_directive(
            req.apply_time,
            req.maintenance_window.as_ref(),
            &state.supported_apply_times,
            clock.as_ref(),
        )?;

        let handle =
            match attributes::submit_settings(t, &req.controller_id, &pending, directive).await {
                Ok(handle) => handle,
                Err(Error::ActionRejected { error_info, .. }) => {
                    return Ok(Outcome {
                        message: messages::ATTRIBUTES_ERR.to_string(),
                        changed: false,
                        failed: true,
                        skipped: false,
                        job: None,
                        status: None,
                        error_info: Some(error_info),
                    });
                }
                Err(err) => return Err(err),
            };

        // Deferred apply times leave the job pending until the reset or
        // the window, so waiting only makes sense for an immediate apply.
        let effective = ExecOptions {
            job_wait: opts.job_wait && req.apply_time == ApplyTime::Immediate,
            ..*opts
        };
        self.track(
            handle,
            &effective,
            messages::JOB_COMPLETION_ATTRIBUTES.to_string(),
            messages::JOB_SUBMISSION_ATTRIBUTES.to_string(),
        )
        .await
    }

    // -------------------------------------------------------------------------
    // Shared tail
    // -------------------------------------------------------------------------

    /// Fold a decision into an outcome, submitting the action only for
    /// `MustApply`.
    async fn conclude(
        &self,
        cmd: &Command,
        decision: Decision,
        opts: &ExecOptions,
    ) -> Result<Outcome> {
        match decision {
            Decision::NoOp => Ok(Outcome::no_changes()),
            Decision::WouldChange => Ok(Outcome::changes_found()),
            Decision::MustApply => {
                let handle = actions::submit(
                    self.transport.as_ref(),
                    actions::action_name(cmd),
                    actions::build_payload(cmd),
                )
                .await?;
                self.track(
                    handle,
                    opts,
                    messages::job_completion(cmd.name()),
                    messages::job_submission(cmd.name()),
                )
                .await
            }
        }
    }

    /// Track a submitted job: either wait for a terminal state or take a
    /// single status snapshot. A wait timeout is folded into a failed
    /// outcome that still carries the job handle; the job keeps running
    /// on the remote system.
    async fn track(
        &self,
        handle: JobHandle,
        opts: &ExecOptions,
        completion_message: String,
        submission_message: String,
    ) -> Result<Outcome> {
        let t = self.transport.as_ref();
        let job_uri = routes::oem_job(&handle.id);
        let handle = JobHandle {
            id: handle.id,
            uri: job_uri.clone(),
        };

        if !opts.job_wait {
            let status = jobs::snapshot(t, &job_uri).await.ok().map(|obs| obs.raw);
            return Ok(Outcome {
                message: submission_message,
                changed: true,
                failed: false,
                skipped: false,
                job: Some(handle),
                status,
                error_info: None,
            });
        }

        let timeout = Duration::from_secs(opts.job_wait_timeout);
        match jobs::wait(t, &job_uri, timeout, self.poll_interval).await {
            Ok(obs) if obs.status.job_state == JobState::Failed => {
                warn!(job_id = %handle.id, message = %obs.status.message, "configuration job failed");
                Ok(Outcome {
                    message: obs.status.message.clone(),
                    changed: false,
                    failed: true,
                    skipped: false,
                    job: Some(handle),
                    status: Some(obs.raw),
                    error_info: None,
                })
            }
            Ok(obs) => Ok(Outcome {
                message: completion_message,
                changed: true,
                failed: false,
                skipped: false,
                job: Some(handle),
                status: Some(obs.raw),
                error_info: None,
            }),
            Err(err @ Error::JobWaitTimeout { .. }) => {
                warn!(job_id = %handle.id, "job wait budget exhausted");
                let status = jobs::snapshot(t, &job_uri).await.ok().map(|obs| obs.raw);
                Ok(Outcome {
                    message: err.to_string(),
                    changed: true,
                    failed: true,
                    skipped: false,
                    job: Some(handle),
                    status,
                    error_info: None,
                })
            }
            Err(err) => Err(err),
        }
    }
}
