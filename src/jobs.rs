//! Job polling state machine
//!
//! A submitted action yields a job the remote system drives through
//! `New`/`Scheduled` -> `Running` -> `Completed`/`Failed`. This module only
//! observes that lifecycle: a single status snapshot when the caller is
//! not waiting, or a fixed-interval loop against an absolute deadline
//! when it is. Exceeding the deadline stops observation without touching
//! the job; no cancellation is ever issued.

use crate::error::{Error, Result};
use crate::model::{JobState, JobStatus};
use crate::routes;
use crate::transport::RedfishTransport;
use serde_json::Value;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info};

/// Interval between status reads while waiting.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// One observation of a job: the typed status plus the scrubbed raw
/// payload handed back to the caller.
#[derive(Debug, Clone)]
pub struct JobObservation {
    pub status: JobStatus,
    pub raw: Value,
}

/// Read the job status once, without polling.
pub async fn snapshot(
    transport: &dyn RedfishTransport,
    job_uri: &str,
) -> Result<JobObservation> {
    let resp = transport.get(job_uri).await?;
    if !resp.is_success() {
        return Err(Error::UnexpectedResponse {
            path: job_uri.to_string(),
            reason: format!("job status read returned HTTP {}", resp.status),
        });
    }
    let status: JobStatus = serde_json::from_value(resp.body.clone())?;
    Ok(JobObservation {
        status,
        raw: scrub_odata(resp.body),
    })
}

/// Poll until the job reaches a terminal state or the wait budget runs
/// out. A `Failed` terminal state is returned as an observation, not an
/// error; the dispatcher folds it into a failed outcome carrying the
/// job's message. Timeout does not imply the job failed.
pub async fn wait(
    transport: &dyn RedfishTransport,
    job_uri: &str,
    timeout: Duration,
    interval: Duration,
) -> Result<JobObservation> {
    let deadline = Instant::now() + timeout;
    loop {
        let observation = snapshot(transport, job_uri).await?;
        let state = observation.status.job_state;
        debug!(
            job_id = %observation.status.id,
            state = ?state,
            percent = observation.status.percent_complete,
            "polled job status"
        );

        if state.is_terminal() {
            info!(job_id = %observation.status.id, state = ?state, "job reached terminal state");
            return Ok(observation);
        }
        if Instant::now() + interval > deadline {
            return Err(Error::JobWaitTimeout {
                job_id: observation.status.id.clone(),
                timeout_secs: timeout.as_secs(),
            });
        }
        sleep(interval).await;
    }
}

/// Whether a job of the given type is already pending or active on the
/// remote system. Checked before SecureErase so the engine never queues a
/// duplicate behind an existing job.
pub async fn find_active_of_type(
    transport: &dyn RedfishTransport,
    job_type: &str,
) -> Result<Option<JobStatus>> {
    let resp = transport.get(routes::JOBS_EXPANDED_URI).await?;
    if !resp.is_success() {
        return Ok(None);
    }
    let members = resp
        .body
        .get("Members")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    for member in members {
        if let Ok(status) = serde_json::from_value::<JobStatus>(member) {
            if status.job_type == job_type && status.job_state.is_pending_or_active() {
                return Ok(Some(status));
            }
        }
    }
    Ok(None)
}

/// Strip Redfish protocol decorations (`@odata.*`, extended-info blobs)
/// from a payload surfaced to the caller.
pub fn scrub_odata(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(k, _)| !k.contains("@odata") && !k.contains("@Message"))
                .map(|(k, v)| (k, scrub_odata(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(scrub_odata).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::MockTransport;
    use crate::transport::Method;
    use assert_matches::assert_matches;
    use serde_json::json;

    const JOB_URI: &str = "/redfish/v1/Managers/iDRAC.Embedded.1/Oem/Dell/Jobs/JID_1";

    fn job_body(state: &str, percent: u8) -> Value {
        json!({
            "@odata.id": JOB_URI,
            "@odata.type": "#DellJob.v1_0_0.DellJob",
            "Id": "JID_1",
            "JobState": state,
            "JobType": "RealTimeNoRebootConfiguration",
            "Message": if state == "Failed" { "Job failed." } else { "Job in progress." },
            "MessageId": "PR19",
            "Name": "Configure: RAID.Slot.1-1",
            "PercentComplete": percent
        })
    }

    #[tokio::test]
    async fn test_snapshot_scrubs_protocol_keys() {
        let mock = MockTransport::new();
        mock.respond_json(Method::GET, JOB_URI, job_body("Running", 40));

        let obs = snapshot(&mock, JOB_URI).await.unwrap();
        assert_eq!(obs.status.job_state, JobState::Running);
        assert!(obs.raw.get("@odata.id").is_none());
        assert_eq!(obs.raw["Id"], "JID_1");
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_returns_on_completion() {
        let mock = MockTransport::new();
        mock.respond_json(Method::GET, JOB_URI, job_body("Running", 40));
        mock.respond_json(Method::GET, JOB_URI, job_body("Running", 90));
        mock.respond_json(Method::GET, JOB_URI, job_body("Completed", 100));

        let obs = wait(
            &mock,
            JOB_URI,
            Duration::from_secs(120),
            Duration::from_secs(10),
        )
        .await
        .unwrap();
        assert_eq!(obs.status.job_state, JobState::Completed);
        assert_eq!(mock.calls().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_surfaces_failed_terminal_state() {
        let mock = MockTransport::new();
        mock.respond_json(Method::GET, JOB_URI, job_body("Failed", 100));

        let obs = wait(
            &mock,
            JOB_URI,
            Duration::from_secs(120),
            Duration::from_secs(10),
        )
        .await
        .unwrap();
        assert_eq!(obs.status.job_state, JobState::Failed);
        assert_eq!(obs.status.message, "Job failed.");
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_times_out_without_failing_the_job() {
        let mock = MockTransport::new();
        mock.respond_json(Method::GET, JOB_URI, job_body("Running", 10));

        let err = wait(
            &mock,
            JOB_URI,
            Duration::from_secs(30),
            Duration::from_secs(10),
        )
        .await
        .unwrap_err();
        assert_matches!(
            err,
            Error::JobWaitTimeout {
                ref job_id,
                timeout_secs: 30
            } if job_id == "JID_1"
        );
    }

    #[tokio::test]
    async fn test_find_active_of_type_matches_pending_jobs() {
        let mock = MockTransport::new();
        mock.respond_json(
            Method::GET,
            routes::JOBS_EXPANDED_URI,
            json!({"Members": [
                {"Id": "JID_0", "JobState": "Completed", "JobType": "RealTimeNoRebootConfiguration"},
                {"Id": "JID_2", "JobState": "Scheduled", "JobType": "RealTimeNoRebootConfiguration"}
            ]}),
        );

        let active = find_active_of_type(&mock, "RealTimeNoRebootConfiguration")
            .await
            .unwrap();
        assert_eq!(active.unwrap().id, "JID_2");

        let none = find_active_of_type(&mock, "FirmwareUpdate").await.unwrap();
        assert!(none.is_none());
    }
}
