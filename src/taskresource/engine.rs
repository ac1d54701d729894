//! Resource engine.
//!
//! The scheduler calls [`ResourceEngine::setup`] when a task enters the
//! resource-setup phase and [`ResourceEngine::cleanup`] on teardown. The
//! engine derives a resource set from the task description and drives
//! each resource's state machine to its steady state:
//!
//! ```text
//!   loop per resource:
//!     next  = known + 1
//!     gate  = set_applied_status(next)      // refuses a second in-flight transition
//!     apply = transition table[next]()      // create, fetch, materialize
//!     ok    → set_known_status(next)        // clears the applied gate
//!     err   → latch terminal reason, stop   // reason is the task's user-visible error
//! ```
//!
//! Resources within a task progress in parallel; no cross-resource
//! ordering is asserted here.

use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use tracing::{debug, error, info, warn};

use crate::cgroup::CgroupController;
use crate::config::Config;
use crate::credentials::CredentialsManager;
use crate::error::{Error, Result};
use crate::s3::S3ClientCreator;
use crate::ssm::SsmClientCreator;

use super::cgroup::CgroupResource;
use super::credentialspec::CredentialSpecResource;
use super::status::ResourceStatus;
use super::task::TaskDescription;
use super::traits::TaskResource;

/// Drives auxiliary task resources through their lifecycle.
pub struct ResourceEngine {
    config: Arc<Config>,
    credentials_manager: Arc<dyn CredentialsManager>,
    cgroup_controller: Arc<dyn CgroupController>,
    s3_client_creator: Arc<dyn S3ClientCreator>,
    ssm_client_creator: Arc<dyn SsmClientCreator>,
}

impl ResourceEngine {
    /// Creates an engine with the given collaborators.
    pub fn new(
        config: Arc<Config>,
        credentials_manager: Arc<dyn CredentialsManager>,
        cgroup_controller: Arc<dyn CgroupController>,
        s3_client_creator: Arc<dyn S3ClientCreator>,
        ssm_client_creator: Arc<dyn SsmClientCreator>,
    ) -> Self {
        Self {
            config,
            credentials_manager,
            cgroup_controller,
            s3_client_creator,
            ssm_client_creator,
        }
    }

    /// Derives the resource set for a task.
    ///
    /// Cgroup setup is gated by `cgroup_enabled`; the credential-spec
    /// resource by `gmsa_supported` and the task actually declaring
    /// credential specs.
    pub fn resources_for(&self, task: &TaskDescription) -> Result<Vec<Arc<dyn TaskResource>>> {
        let mut resources: Vec<Arc<dyn TaskResource>> = Vec::new();

        if self.config.cgroup_enabled {
            resources.push(Arc::new(CgroupResource::new(
                task.task_arn.as_str(),
                &self.config.task_cgroup_prefix,
                Arc::clone(&self.cgroup_controller),
            )?));
        }

        if self.config.gmsa_supported && !task.credential_specs.is_empty() {
            resources.push(Arc::new(CredentialSpecResource::new(
                task.task_arn.as_str(),
                self.config.region.as_str(),
                task.credential_specs.clone(),
                task.execution_credentials_id.as_str(),
                &self.config.resource_dir,
                Arc::clone(&self.credentials_manager),
                Arc::clone(&self.s3_client_creator),
                Arc::clone(&self.ssm_client_creator),
            )?));
        }

        Ok(resources)
    }

    /// Provisions every resource the task needs, in parallel.
    ///
    /// Fails with the first latched terminal reason; a failed resource
    /// stops advancing but other resources run to completion.
    pub async fn setup(&self, task: &TaskDescription) -> Result<()> {
        let resources = self.resources_for(task)?;
        self.setup_resources(task, &resources).await
    }

    /// Provisions an already-derived (possibly restored) resource set.
    pub async fn setup_resources(
        &self,
        task: &TaskDescription,
        resources: &[Arc<dyn TaskResource>],
    ) -> Result<()> {
        for resource in resources {
            resource.initialize(task.known_status, task.desired_status);
            if resource.desired_status() == ResourceStatus::None {
                resource.set_desired_status(resource.steady_state());
            }
        }

        let outcomes = join_all(
            resources
                .iter()
                .map(|resource| self.progress_to_steady_state(task, resource)),
        )
        .await;

        for outcome in outcomes {
            outcome?;
        }
        info!(task_arn = %task.task_arn, "task resources ready");
        Ok(())
    }

    async fn progress_to_steady_state(
        &self,
        task: &TaskDescription,
        resource: &Arc<dyn TaskResource>,
    ) -> Result<()> {
        while resource.known_status() < resource.steady_state() {
            let next = resource.next_known_state();
            if !resource.set_applied_status(next) {
                return Err(Error::AlreadyInTransition {
                    resource: resource.name().to_string(),
                });
            }

            debug!(
                task_arn = %task.task_arn,
                resource = resource.name(),
                target = %next,
                "applying resource transition"
            );
            match resource.apply_transition(next).await {
                Ok(()) => {
                    if next == ResourceStatus::Created {
                        resource.set_created_at(Utc::now());
                    }
                    resource.set_known_status(next);
                }
                Err(err) => {
                    resource.set_terminal_reason(&err.to_string());
                    error!(
                        task_arn = %task.task_arn,
                        resource = resource.name(),
                        %err,
                        "resource transition failed"
                    );
                    return Err(err);
                }
            }
        }
        Ok(())
    }

    /// Tears down every resource the task holds.
    ///
    /// Cleanup is best-effort across resources: every resource is
    /// attempted, failures are logged, and the first hard error is
    /// returned.
    pub async fn cleanup(&self, task: &TaskDescription) -> Result<()> {
        let resources = self.resources_for(task)?;
        self.cleanup_resources(task, &resources).await
    }

    /// Tears down an already-derived (possibly restored) resource set.
    pub async fn cleanup_resources(
        &self,
        task: &TaskDescription,
        resources: &[Arc<dyn TaskResource>],
    ) -> Result<()> {
        let mut first_error = None;

        for resource in resources {
            resource.set_desired_status(resource.terminal_state());

            self.remove_materialized_files(resource).await;

            match resource.cleanup().await {
                Ok(()) => {
                    resource.set_known_status(resource.terminal_state());
                }
                Err(err) => {
                    warn!(
                        task_arn = %task.task_arn,
                        resource = resource.name(),
                        %err,
                        "resource cleanup failed"
                    );
                    first_error.get_or_insert(err);
                }
            }
        }

        match first_error {
            None => Ok(()),
            Some(err) => Err(err),
        }
    }

    /// Best-effort removal of artifacts a resource materialized under
    /// the resource directory.
    async fn remove_materialized_files(&self, resource: &Arc<dyn TaskResource>) {
        for path in resource.materialized_paths() {
            if let Err(err) = tokio::fs::remove_file(&path).await {
                if err.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %path.display(), %err, "unable to remove materialized file");
                }
            }
        }
    }
}
