//! Shared status bookkeeping for task resources.
//!
//! Every concrete resource embeds a [`ResourceState`]: desired, known, and
//! applied statuses under one reader-writer lock, a write-once creation
//! timestamp, and a first-write-wins terminal reason. Accessors never
//! block on I/O.

use std::sync::{OnceLock, RwLock};

use chrono::{DateTime, Utc};
use tracing::info;

use super::status::ResourceStatus;

#[derive(Debug, Default, Clone, Copy)]
struct StatusSnapshot {
    desired: ResourceStatus,
    known: ResourceStatus,
    // Status applied to the resource (a transition has been invoked) whose
    // outcome is not yet reflected in `known`. `None` means idle.
    applied: ResourceStatus,
    created_at: Option<DateTime<Utc>>,
}

/// Lock-guarded status fields shared by all resource implementations.
#[derive(Debug, Default)]
pub struct ResourceState {
    inner: RwLock<StatusSnapshot>,
    terminal_reason: OnceLock<String>,
}

impl ResourceState {
    /// Creates bookkeeping in the initial `NONE` state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the desired status.
    pub fn desired_status(&self) -> ResourceStatus {
        self.inner.read().expect("resource state poisoned").desired
    }

    /// Sets the desired status.
    pub fn set_desired_status(&self, status: ResourceStatus) {
        self.inner.write().expect("resource state poisoned").desired = status;
    }

    /// Returns the currently known status.
    pub fn known_status(&self) -> ResourceStatus {
        self.inner.read().expect("resource state poisoned").known
    }

    /// Advances the known status.
    ///
    /// The known status is monotone: an older status is ignored. When the
    /// applied status has been caught up (`applied <= known`), it is
    /// cleared so the next transition may begin.
    pub fn set_known_status(&self, status: ResourceStatus) {
        let mut inner = self.inner.write().expect("resource state poisoned");
        if status < inner.known {
            return;
        }
        inner.known = status;
        if inner.applied != ResourceStatus::None && inner.applied <= inner.known {
            inner.applied = ResourceStatus::None;
        }
    }

    /// Resets the known status to `NONE` so artifacts are re-created.
    ///
    /// Used on restore for tasks that never reached `CREATED`; the only
    /// allowed move against the monotone order.
    pub fn reset_known_status(&self) {
        let mut inner = self.inner.write().expect("resource state poisoned");
        inner.known = ResourceStatus::None;
        inner.applied = ResourceStatus::None;
    }

    /// Returns the applied (in-flight) status.
    pub fn applied_status(&self) -> ResourceStatus {
        self.inner.read().expect("resource state poisoned").applied
    }

    /// Marks a transition as applied.
    ///
    /// Returns `false` without mutating when a transition is already in
    /// flight.
    pub fn set_applied_status(&self, status: ResourceStatus) -> bool {
        let mut inner = self.inner.write().expect("resource state poisoned");
        if inner.applied != ResourceStatus::None {
            return false;
        }
        inner.applied = status;
        true
    }

    /// Returns the creation timestamp, if the resource has been created.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.inner
            .read()
            .expect("resource state poisoned")
            .created_at
    }

    /// Stamps the creation timestamp. Once set it is immutable.
    pub fn set_created_at(&self, created_at: DateTime<Utc>) {
        let mut inner = self.inner.write().expect("resource state poisoned");
        if inner.created_at.is_none() {
            inner.created_at = Some(created_at);
        }
    }

    /// Records the first failure reason. Later writes are ignored.
    pub fn set_terminal_reason(&self, resource: &str, reason: &str) {
        if self.terminal_reason.set(reason.to_string()).is_ok() {
            info!(resource, reason, "setting terminal reason for resource");
        }
    }

    /// Returns the recorded failure reason, if any.
    pub fn terminal_reason(&self) -> Option<String> {
        self.terminal_reason.get().cloned()
    }
}
