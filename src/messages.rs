//! Operator-facing message catalog
//!
//! Fixed strings surfaced in normalized outcomes. These are part of the
//! observable contract with calling automation and must not drift.

pub const CHANGES_FOUND: &str = "Changes found to be applied.";
pub const NO_CHANGES_FOUND: &str = "No changes found to be applied.";
pub const JOB_EXISTS: &str = "Unable to complete the operation because another job already \
                              exists. Wait for the pending job to complete and retry the operation.";
pub const JOB_COMPLETION_ATTRIBUTES: &str = "Successfully applied the controller attributes.";
pub const JOB_SUBMISSION_ATTRIBUTES: &str =
    "Successfully submitted the job that configures the controller attributes.";
pub const ATTRIBUTES_ERR: &str = "Unable to configure the controller attribute(s) settings.";

pub fn job_submission(operation: &str) -> String {
    format!("Successfully submitted the job that performs the '{operation}' operation.")
}

pub fn job_completion(operation: &str) -> String {
    format!("Successfully performed the '{operation}' operation.")
}

pub fn drive_not_ready(drive_id: &str) -> String {
    format!("Drive {drive_id} is not in ready state.")
}

pub fn drive_not_secure_erase(drive_id: &str) -> String {
    format!("Drive {drive_id} does not support secure erase operation.")
}
