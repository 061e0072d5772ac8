//! redfish-raidctl - RAID Controller Configuration Engine
//!
//! Command orchestration for the storage subsystem of a Redfish-capable
//! hardware management controller (iDRAC). Every operation follows the
//! same path: resolve the targeted resources, snapshot their state,
//! evaluate whether a change is actually needed, submit at most one
//! asynchronous action, then optionally poll the resulting job.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       Command Dispatcher                        │
//! │      resolve -> snapshot -> evaluate -> submit -> poll          │
//! ├──────────────┬──────────────┬───────────────┬───────────────────┤
//! │   Resolver   │  Idempotency │    Action     │   Job Poller      │
//! │  (snapshots) │  Predicates  │   Submitter   │  (lifecycle)      │
//! ├──────────────┴──────────────┴───────────────┴───────────────────┤
//! │                    Attribute Settings Engine                    │
//! │        diff -> apply-time directive -> settings PATCH           │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                  Redfish Transport (HTTP/JSON)                  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`dispatch`]: Command dispatcher and normalized outcomes
//! - [`command`]: The command model and execution options
//! - [`evaluate`]: Pure idempotency predicates
//! - [`actions`]: Action payloads and submission
//! - [`attributes`]: Controller attribute settings engine
//! - [`jobs`]: Job polling state machine
//! - [`resolver`]: Resource resolution and snapshots
//! - [`transport`]: HTTP transport seam
//! - [`error`]: Error types and handling

pub mod actions;
pub mod attributes;
pub mod command;
pub mod dispatch;
pub mod error;
pub mod evaluate;
pub mod jobs;
pub mod messages;
pub mod model;
pub mod resolver;
pub mod routes;
pub mod transport;

// Re-export commonly used types
pub use command::{
    AttributeRequest, BlinkDevice, Command, EncryptionMode, ExecOptions, Expansion, Operation,
    ReKeyMode,
};

pub use dispatch::{Dispatcher, Outcome};

pub use error::{Error, ResourceKind, Result};

pub use model::{
    ApplyTime, ControllerSnapshot, DriveSnapshot, JobHandle, JobState, JobStatus, MaintenanceWindow,
    RaidStatus, RaidType, SecurityStatus, VolumeSnapshot,
};

pub use transport::{ApiResponse, HttpConfig, HttpTransport, RedfishTransport};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
