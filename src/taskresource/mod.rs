//! Per-task resource lifecycle engine.
//!
//! This module defines the generic resource state machine and its
//! concrete implementations:
//! - [`ResourceStatus`] / [`TaskStatus`]: ordered lifecycle statuses
//! - [`ResourceState`]: shared lock-guarded status bookkeeping
//! - [`TaskResource`]: the capability set every resource implements
//! - [`CgroupResource`]: task-scoped kernel cgroup hierarchy
//! - [`CredentialSpecResource`]: materialized credential artifacts
//! - [`ResourceEngine`]: derives resource sets and drives transitions
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                       ResourceEngine                          │
//! │        setup(task)                    cleanup(task)           │
//! │            │                               │                  │
//! │   ┌────────┴────────┐             ┌────────┴────────┐         │
//! │   ▼                 ▼             ▼                 ▼         │
//! │ CgroupResource  CredentialSpec  (remove cgroup)  (clear map,  │
//! │ (create root)   (fetch + write                    remove      │
//! │                  artifacts)                       artifacts)  │
//! └───────────────────────────────────────────────────────────────┘
//! ```

mod cgroup;
mod credentialspec;
mod engine;
mod state;
mod status;
mod task;
mod traits;

pub use cgroup::{CgroupResource, CgroupSnapshot, CGROUP_RESOURCE_NAME};
pub use credentialspec::{
    CredentialSpecResource, CredentialSpecSnapshot, CREDENTIALSPEC_RESOURCE_NAME,
};
pub use engine::ResourceEngine;
pub use state::ResourceState;
pub use status::{ResourceStatus, TaskStatus};
pub use task::{task_id_from_arn, TaskDescription};
pub use traits::TaskResource;
