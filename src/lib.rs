//! # hostplane
//!
//! **Host-Side Resource Plane for a Container Orchestration Agent**
//!
//! This crate provides the node-local resource machinery an orchestration
//! agent needs between a control-plane scheduler and a container runtime.
//! Two subsystems form the core:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                           hostplane                                 │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────────────────────────────────────────────┐    │
//! │  │                     ResourceEngine                          │    │
//! │  │        setup(task)  ──────────────▶  cleanup(task)          │    │
//! │  │                                                             │    │
//! │  │   TaskResource state machine:  NONE ─▶ CREATED ─▶ REMOVED   │    │
//! │  │   ┌──────────────┐        ┌───────────────────────┐         │    │
//! │  │   │CgroupResource│        │CredentialSpecResource │         │    │
//! │  │   │ v1 hierarchy │        │ s3/ssm fetch + atomic │         │    │
//! │  │   │ per task     │        │ file materialization  │         │    │
//! │  │   └──────────────┘        └───────────────────────┘         │    │
//! │  └─────────────────────────────────────────────────────────────┘    │
//! │  ┌─────────────────────────────────────────────────────────────┐    │
//! │  │                    EniStateManager                          │    │
//! │  │   sysfs watcher events  +  periodic reconciliation          │    │
//! │  │   ──▶ reconciled MAC → device-name map                      │    │
//! │  └─────────────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Resource Lifecycle
//!
//! The scheduler calls [`ResourceEngine::setup`] when a task enters its
//! resource-provisioning phase. The engine derives a resource set from
//! the task description (a cgroup hierarchy, materialized credential
//! specs) and drives each resource's state machine forward, one gated
//! transition at a time. The first failure latches the resource's
//! terminal reason, which becomes the task's user-visible error. On
//! teardown, [`ResourceEngine::cleanup`] removes what was provisioned;
//! already-absent resources are treated as cleaned.
//!
//! # ENI Reconciliation
//!
//! Independently and continuously, [`EniStateManager`] mirrors the
//! kernel's view of hot-plugged interfaces. Filesystem events give low
//! latency; the periodic reconciler is authoritative and repairs any
//! missed event on the next tick. Transient errors are logged and never
//! terminate the manager.
//!
//! # Collaborator Seams
//!
//! External I/O sits behind capability traits so the core is testable
//! without network, kernel, or directory-service access:
//!
//! | Seam | Production implementation |
//! |------|---------------------------|
//! | [`S3ClientCreator`] | AWS object-store client per bucket |
//! | [`SsmClientCreator`] | injected by the control-plane wiring |
//! | [`CgroupController`] | kernel v1 hierarchy |
//! | [`CredentialsManager`] | in-memory execution-role store |
//! | [`eni::LinkEnumerator`] | sysfs link enumeration |
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use hostplane::{
//!     Config, EniStateManager, InMemoryCredentialsManager, ResourceEngine,
//!     TaskDescription, V1CgroupController,
//! };
//! use hostplane::s3::DefaultS3ClientCreator;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> hostplane::Result<()> {
//!     let config = Arc::new(Config::default());
//!
//!     // ENI plane: initialize, then reconcile until shutdown.
//!     let eni = EniStateManager::new(&config);
//!     eni.init()?;
//!     let shutdown = CancellationToken::new();
//!     tokio::spawn(Arc::clone(&eni).begin_update(shutdown.clone()));
//!
//!     // Resource plane: provision a task's auxiliary resources.
//!     let engine = ResourceEngine::new(
//!         Arc::clone(&config),
//!         Arc::new(InMemoryCredentialsManager::new()),
//!         Arc::new(V1CgroupController::new(config.task_cgroup_prefix.clone())),
//!         Arc::new(DefaultS3ClientCreator),
//!         ssm_client_creator,
//!     );
//!     let task = TaskDescription::default();
//!     engine.setup(&task).await?;
//!
//!     Ok(())
//! }
//! ```

// =============================================================================
// Internal Modules
// =============================================================================

mod atomicfile;
mod config;
mod constants;
mod error;

// =============================================================================
// Public Modules
// =============================================================================

/// ARN decomposition (`arn:partition:service:region:account:resource`).
pub mod arn;

/// Execution-role credential store consumed by artifact fetchers.
pub mod credentials;

/// Kernel cgroup controller and spec validation.
pub mod cgroup;

/// ENI state manager: event-driven plus reconciled interface tracking.
pub mod eni;

/// Object-store artifact fetcher.
pub mod s3;

/// Parameter-store artifact fetcher.
pub mod ssm;

/// Per-task resource lifecycle engine.
pub mod taskresource;

// =============================================================================
// Facade Re-exports
// =============================================================================

pub use arn::Arn;
pub use atomicfile::write_atomic;
pub use cgroup::{validate_cgroup_spec, CgroupController, CgroupSpec, V1CgroupController};
pub use config::Config;
pub use constants::{
    CREDENTIALSPEC_FILE_MODE, CREDENTIALSPEC_PREFIX, CREDENTIALSPEC_RUNTIME_PREFIX,
    DEFAULT_RECONCILIATION_INTERVAL, DEFAULT_TASK_CGROUP_PREFIX, DEVICE_NAME_PREFIX,
    OBJECT_DOWNLOAD_TIMEOUT, SYSFS_NET_DIR,
};
pub use credentials::{
    CredentialsManager, IamRoleCredentials, InMemoryCredentialsManager, TaskCredentials,
};
pub use eni::EniStateManager;
pub use error::{Error, Result};
pub use s3::{DefaultS3ClientCreator, S3ClientCreator};
pub use ssm::{ParameterResults, SsmClient, SsmClientCreator};
pub use taskresource::{
    task_id_from_arn, CgroupResource, CgroupSnapshot, CredentialSpecResource,
    CredentialSpecSnapshot, ResourceEngine, ResourceState, ResourceStatus, TaskDescription,
    TaskResource, TaskStatus,
};
