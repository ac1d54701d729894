//! Task resource trait definition.
//!
//! A task resource is anything auxiliary the agent must provision before
//! a task's containers start and tear down afterwards: a cgroup
//! hierarchy, materialized credential-spec files. The engine is generic
//! over this capability set.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::status::{ResourceStatus, TaskStatus};
use crate::error::Result;

/// Capability set implemented by every concrete task resource.
///
/// # State machine
///
/// ```text
///   NONE ──create──▶ CREATED ──cleanup──▶ REMOVED
/// ```
///
/// The engine progresses `known_status` toward `desired_status` one
/// transition at a time. `set_applied_status` gates reentry: the engine
/// must not invoke a second transition while one is applied and not yet
/// reflected in `known_status`.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; all accessors are safe under
/// concurrent reads and writes.
#[async_trait]
pub trait TaskResource: Send + Sync {
    /// Returns the resource type name used in logs and error messages.
    fn name(&self) -> &'static str;

    /// The status at which the resource is ready for container use.
    fn steady_state(&self) -> ResourceStatus {
        ResourceStatus::Created
    }

    /// The last transition state of the resource.
    fn terminal_state(&self) -> ResourceStatus {
        ResourceStatus::Removed
    }

    /// The status the resource should progress to next.
    fn next_known_state(&self) -> ResourceStatus {
        self.known_status().next()
    }

    /// Invokes the operation bound to `next_state` in the resource's
    /// transition table.
    ///
    /// # Errors
    ///
    /// `UnknownTransition` when no operation is bound to `next_state`;
    /// otherwise whatever the bound operation fails with.
    async fn apply_transition(&self, next_state: ResourceStatus) -> Result<()>;

    /// Releases everything the resource holds on task teardown.
    async fn cleanup(&self) -> Result<()>;

    /// Paths of artifacts the resource materialized on the host.
    ///
    /// The engine removes them best-effort on teardown; resources without
    /// on-disk artifacts report none.
    fn materialized_paths(&self) -> Vec<std::path::PathBuf> {
        Vec::new()
    }

    /// Returns the desired status.
    fn desired_status(&self) -> ResourceStatus;

    /// Sets the desired status.
    fn set_desired_status(&self, status: ResourceStatus);

    /// Returns true if the resource's desired status is terminal.
    fn desired_terminal(&self) -> bool {
        self.desired_status() == self.terminal_state()
    }

    /// Returns the currently known status.
    fn known_status(&self) -> ResourceStatus;

    /// Advances the known status (monotone; see [`super::ResourceState`]).
    fn set_known_status(&self, status: ResourceStatus);

    /// Returns the applied (in-flight) status.
    fn applied_status(&self) -> ResourceStatus;

    /// Marks a transition as applied; returns `false` if one is already
    /// in flight.
    fn set_applied_status(&self, status: ResourceStatus) -> bool;

    /// Returns the creation timestamp, if the resource has been created.
    fn created_at(&self) -> Option<DateTime<Utc>>;

    /// Stamps the creation timestamp (write-once).
    fn set_created_at(&self, created_at: DateTime<Utc>);

    /// Records the first failure reason (first write wins).
    fn set_terminal_reason(&self, reason: &str);

    /// Returns the recorded failure reason, if any.
    fn terminal_reason(&self) -> Option<String>;

    /// Prepares a restored resource for progression.
    ///
    /// A task that never reached `CREATED` has its resources reset to
    /// `NONE` so external artifacts are fetched again.
    fn initialize(&self, task_known_status: TaskStatus, task_desired_status: TaskStatus);

    /// Serializes the resource's checkpoint to JSON bytes.
    fn marshal(&self) -> Result<Vec<u8>>;
}
