//! Cgroup task resource.
//!
//! Creates a task-scoped kernel cgroup at `<prefix>/<taskID>` before the
//! task's containers start and removes it on teardown.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cgroup::{CgroupController, CgroupSpec};
use crate::constants::SEP_FORWARD_SLASH;
use crate::error::{Error, Result};

use super::state::ResourceState;
use super::status::{ResourceStatus, TaskStatus};
use super::task::task_id_from_arn;
use super::traits::TaskResource;

/// Resource type name used in logs and error messages.
pub const CGROUP_RESOURCE_NAME: &str = "cgroup";

/// Task resource owning the task's cgroup hierarchy.
pub struct CgroupResource {
    task_arn: String,
    cgroup_root: String,
    state: ResourceState,
    controller: Arc<dyn CgroupController>,
}

impl CgroupResource {
    /// Creates a cgroup resource rooted at `<task_cgroup_prefix>/<taskID>`.
    pub fn new(
        task_arn: impl Into<String>,
        task_cgroup_prefix: &str,
        controller: Arc<dyn CgroupController>,
    ) -> Result<Self> {
        let task_arn = task_arn.into();
        let task_id = task_id_from_arn(&task_arn)?;
        let cgroup_root = [task_cgroup_prefix, &task_id].join(SEP_FORWARD_SLASH);
        Ok(Self {
            task_arn,
            cgroup_root,
            state: ResourceState::new(),
            controller,
        })
    }

    /// Returns the cgroup root this resource owns.
    pub fn cgroup_root(&self) -> &str {
        &self.cgroup_root
    }

    /// Creates the task cgroup with empty resource limits.
    ///
    /// Limits are populated by a later control-plane feature; the
    /// hierarchy itself is what containers join.
    pub fn create(&self) -> Result<()> {
        if self.controller.exists(&self.cgroup_root) {
            debug!(root = %self.cgroup_root, "cgroup already exists, skipping creation");
            return Ok(());
        }

        let spec = CgroupSpec {
            root: self.cgroup_root.clone(),
            resources: Some(cgroups_rs::Resources::default()),
        };
        let result = self.controller.create(&spec);
        if let Err(ref err) = result {
            self.state
                .set_terminal_reason(CGROUP_RESOURCE_NAME, &err.to_string());
        }
        result
    }

    /// Builds the checkpoint representation of this resource.
    pub fn snapshot(&self) -> CgroupSnapshot {
        CgroupSnapshot {
            task_arn: self.task_arn.clone(),
            created_at: self.state.created_at(),
            desired_status: self.state.desired_status(),
            known_status: self.state.known_status(),
            cgroup_root: self.cgroup_root.clone(),
        }
    }

    /// Restores a resource from its checkpoint.
    pub fn from_snapshot(
        snapshot: CgroupSnapshot,
        controller: Arc<dyn CgroupController>,
    ) -> Self {
        let resource = Self {
            task_arn: snapshot.task_arn,
            cgroup_root: snapshot.cgroup_root,
            state: ResourceState::new(),
            controller,
        };
        resource.state.set_desired_status(snapshot.desired_status);
        resource.state.set_known_status(snapshot.known_status);
        if let Some(created_at) = snapshot.created_at {
            resource.state.set_created_at(created_at);
        }
        resource
    }
}

#[async_trait]
impl TaskResource for CgroupResource {
    fn name(&self) -> &'static str {
        CGROUP_RESOURCE_NAME
    }

    async fn apply_transition(&self, next_state: ResourceStatus) -> Result<()> {
        match next_state {
            ResourceStatus::Created => self.create(),
            other => Err(Error::UnknownTransition {
                resource: self.name().to_string(),
                status: other.to_string(),
            }),
        }
    }

    async fn cleanup(&self) -> Result<()> {
        match self.controller.remove(&self.cgroup_root) {
            // A cgroup that is already gone is a successful cleanup.
            Err(Error::CgroupNotFound { .. }) => Ok(()),
            other => other,
        }
    }

    fn desired_status(&self) -> ResourceStatus {
        self.state.desired_status()
    }

    fn set_desired_status(&self, status: ResourceStatus) {
        self.state.set_desired_status(status);
    }

    fn known_status(&self) -> ResourceStatus {
        self.state.known_status()
    }

    fn set_known_status(&self, status: ResourceStatus) {
        self.state.set_known_status(status);
    }

    fn applied_status(&self) -> ResourceStatus {
        self.state.applied_status()
    }

    fn set_applied_status(&self, status: ResourceStatus) -> bool {
        self.state.set_applied_status(status)
    }

    fn created_at(&self) -> Option<DateTime<Utc>> {
        self.state.created_at()
    }

    fn set_created_at(&self, created_at: DateTime<Utc>) {
        self.state.set_created_at(created_at);
    }

    fn set_terminal_reason(&self, reason: &str) {
        self.state.set_terminal_reason(self.name(), reason);
    }

    fn terminal_reason(&self) -> Option<String> {
        self.state.terminal_reason()
    }

    fn initialize(&self, task_known_status: TaskStatus, task_desired_status: TaskStatus) {
        if task_known_status < TaskStatus::Created && task_desired_status <= TaskStatus::Running {
            self.state.reset_known_status();
        }
    }

    fn marshal(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(&self.snapshot())?)
    }
}

/// JSON checkpoint of a cgroup resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CgroupSnapshot {
    #[serde(rename = "taskARN")]
    pub task_arn: String,
    #[serde(
        rename = "createdAt",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "desiredStatus")]
    pub desired_status: ResourceStatus,
    #[serde(rename = "knownStatus")]
    pub known_status: ResourceStatus,
    #[serde(rename = "cgroupRoot")]
    pub cgroup_root: String,
}
