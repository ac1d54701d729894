//! Credential-spec task resource.
//!
//! Materializes per-container credential artifacts so the container
//! runtime can join containers to a directory-service identity. Each
//! required source is resolved to a local-file reference:
//!
//! ```text
//! credentialspec:file://spec.json   → credentialspec=file://spec.json
//! credentialspec:<s3 ARN>           → credentialspec=file://<dir>/s3_<task>_<name>.json
//! credentialspec:<ssm ARN>          → credentialspec=file://<dir>/ssm_<task>_<name>.json
//! ```
//!
//! Remote artifacts are fetched with the task's execution-role
//! credentials and persisted through the atomic writer, so a mapping
//! entry is only ever published for a fully fsynced file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use tokio::io::AsyncWriteExt;

use crate::arn::Arn;
use crate::atomicfile::write_atomic;
use crate::constants::{
    CREDENTIALSPEC_FILE_MODE, CREDENTIALSPEC_PREFIX, CREDENTIALSPEC_RUNTIME_PREFIX,
    CREDENTIALSPEC_S3_SERVICE, CREDENTIALSPEC_SSM_SERVICE, OBJECT_DOWNLOAD_TIMEOUT,
};
use crate::credentials::{CredentialsManager, IamRoleCredentials};
use crate::error::{Error, Result};
use crate::s3::{download_object, parse_s3_arn, S3ClientCreator};
use crate::ssm::{fetch_parameters, SsmClientCreator};

use super::state::ResourceState;
use super::status::{ResourceStatus, TaskStatus};
use super::task::task_id_from_arn;
use super::traits::TaskResource;

/// Resource type name used in logs and error messages.
pub const CREDENTIALSPEC_RESOURCE_NAME: &str = "credentialspec";

const FILE_SCHEME_PREFIX: &str = "file://";

/// Task resource that materializes credential-spec artifacts.
pub struct CredentialSpecResource {
    task_arn: String,
    task_id: String,
    region: String,
    execution_credentials_id: String,
    resource_dir: PathBuf,

    /// Source-spec string → dependent container names. Keys are never
    /// removed.
    required: HashMap<String, Vec<String>>,
    /// Source-spec string → runtime-consumable form. Guarded: published
    /// concurrently with reader lookups.
    mapping: RwLock<HashMap<String, String>>,

    state: ResourceState,

    credentials_manager: Arc<dyn CredentialsManager>,
    s3_client_creator: Arc<dyn S3ClientCreator>,
    ssm_client_creator: Arc<dyn SsmClientCreator>,
}

impl CredentialSpecResource {
    /// Creates a new credential-spec resource for one task.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        task_arn: impl Into<String>,
        region: impl Into<String>,
        required: HashMap<String, Vec<String>>,
        execution_credentials_id: impl Into<String>,
        resource_dir: impl Into<PathBuf>,
        credentials_manager: Arc<dyn CredentialsManager>,
        s3_client_creator: Arc<dyn S3ClientCreator>,
        ssm_client_creator: Arc<dyn SsmClientCreator>,
    ) -> Result<Self> {
        let task_arn = task_arn.into();
        let task_id = task_id_from_arn(&task_arn)?;
        Ok(Self {
            task_arn,
            task_id,
            region: region.into(),
            execution_credentials_id: execution_credentials_id.into(),
            resource_dir: resource_dir.into(),
            required,
            mapping: RwLock::new(HashMap::new()),
            state: ResourceState::new(),
            credentials_manager,
            s3_client_creator,
            ssm_client_creator,
        })
    }

    /// Resolves every required source into a published mapping entry.
    ///
    /// Stops at the first failure, latching the terminal reason; mapping
    /// entries published for earlier sources remain, since they reference
    /// fully persisted files.
    pub async fn create(&self) -> Result<()> {
        let result = self.create_all().await;
        if let Err(ref err) = result {
            self.state
                .set_terminal_reason(CREDENTIALSPEC_RESOURCE_NAME, &err.to_string());
        }
        result
    }

    async fn create_all(&self) -> Result<()> {
        // Fail fast when the execution role is gone.
        let credentials = self
            .credentials_manager
            .task_credentials(&self.execution_credentials_id)
            .ok_or_else(|| Error::CredentialsNotFound {
                id: self.execution_credentials_id.clone(),
            })?;
        let iam = credentials.iam_role;

        let mut sources: Vec<&String> = self.required.keys().collect();
        sources.sort();

        for source in sources {
            let value = source
                .strip_prefix(CREDENTIALSPEC_PREFIX)
                .ok_or_else(|| Error::InvalidCredentialSpec(source.clone()))?;

            if value.starts_with(FILE_SCHEME_PREFIX) {
                // Host-local file; publish as-is, no I/O.
                self.publish_mapping(source, format!("{CREDENTIALSPEC_RUNTIME_PREFIX}{value}"));
                continue;
            }

            let arn = Arn::parse(value)?;
            match arn.service.as_str() {
                CREDENTIALSPEC_S3_SERVICE => self.fetch_from_s3(source, &arn, &iam).await?,
                CREDENTIALSPEC_SSM_SERVICE => self.fetch_from_ssm(source, &arn, &iam).await?,
                other => {
                    return Err(Error::UnsupportedCredentialSpecSource {
                        service: other.to_string(),
                    })
                }
            }
        }
        Ok(())
    }

    async fn fetch_from_s3(&self, source: &str, arn: &Arn, iam: &IamRoleCredentials) -> Result<()> {
        let (bucket, key) = parse_s3_arn(arn)?;
        let client = self
            .s3_client_creator
            .client_for_bucket(&bucket, &self.region, iam)?;

        let base = resource_basename(&arn.resource);
        let final_path = self
            .resource_dir
            .join(artifact_file_name("s3", &self.task_id, &base));

        write_atomic(
            &self.resource_dir,
            &final_path,
            CREDENTIALSPEC_FILE_MODE,
            |sink| {
                let client = Arc::clone(&client);
                let bucket = bucket.clone();
                let key = key.clone();
                async move {
                    download_object(client, &bucket, &key, sink, OBJECT_DOWNLOAD_TIMEOUT).await
                }
            },
        )
        .await?;

        self.publish_file_mapping(source, &final_path);
        Ok(())
    }

    async fn fetch_from_ssm(
        &self,
        source: &str,
        arn: &Arn,
        iam: &IamRoleCredentials,
    ) -> Result<()> {
        let client = self.ssm_client_creator.client(&self.region, iam);

        let param = resource_basename(&arn.resource);
        let values = fetch_parameters(std::slice::from_ref(&param), client.as_ref()).await?;
        let data = values
            .get(&param)
            .cloned()
            .ok_or_else(|| Error::ParameterNotFound {
                names: vec![param.clone()],
            })?;

        let final_path = self
            .resource_dir
            .join(artifact_file_name("ssm", &self.task_id, &param));

        write_atomic(
            &self.resource_dir,
            &final_path,
            CREDENTIALSPEC_FILE_MODE,
            |mut sink| async move {
                sink.write_all(data.as_bytes()).await?;
                sink.flush().await?;
                Ok(())
            },
        )
        .await?;

        self.publish_file_mapping(source, &final_path);
        Ok(())
    }

    fn publish_file_mapping(&self, source: &str, path: &Path) {
        self.publish_mapping(
            source,
            format!(
                "{CREDENTIALSPEC_RUNTIME_PREFIX}{FILE_SCHEME_PREFIX}{}",
                path.display()
            ),
        );
    }

    fn publish_mapping(&self, source: &str, mapped: String) {
        debug!(source, %mapped, "publishing credentialspec mapping");
        self.mapping
            .write()
            .expect("credentialspec mapping poisoned")
            .insert(source.to_string(), mapped);
    }

    /// Returns the runtime-consumable form published for `source`.
    pub fn target_mapping(&self, source: &str) -> Result<String> {
        self.mapping
            .read()
            .expect("credentialspec mapping poisoned")
            .get(source)
            .cloned()
            .ok_or_else(|| Error::CredSpecNotMapped(source.to_string()))
    }

    /// Returns the required sources and their dependent containers.
    pub fn required_credential_specs(&self) -> &HashMap<String, Vec<String>> {
        &self.required
    }

    fn clear_mapping(&self) {
        self.mapping
            .write()
            .expect("credentialspec mapping poisoned")
            .clear();
    }

    /// Builds the checkpoint representation of this resource.
    pub fn snapshot(&self) -> CredentialSpecSnapshot {
        CredentialSpecSnapshot {
            task_arn: self.task_arn.clone(),
            created_at: self.state.created_at(),
            desired_status: self.state.desired_status(),
            known_status: self.state.known_status(),
            required: self.required.clone(),
            mapping: self
                .mapping
                .read()
                .expect("credentialspec mapping poisoned")
                .clone(),
            execution_credentials_id: self.execution_credentials_id.clone(),
        }
    }

    /// Restores a resource from its checkpoint, re-injecting the
    /// collaborators that are never serialized.
    pub fn from_snapshot(
        snapshot: CredentialSpecSnapshot,
        region: impl Into<String>,
        resource_dir: impl Into<PathBuf>,
        credentials_manager: Arc<dyn CredentialsManager>,
        s3_client_creator: Arc<dyn S3ClientCreator>,
        ssm_client_creator: Arc<dyn SsmClientCreator>,
    ) -> Result<Self> {
        let resource = Self::new(
            snapshot.task_arn,
            region,
            snapshot.required,
            snapshot.execution_credentials_id,
            resource_dir,
            credentials_manager,
            s3_client_creator,
            ssm_client_creator,
        )?;

        resource.state.set_desired_status(snapshot.desired_status);
        resource.state.set_known_status(snapshot.known_status);
        if let Some(created_at) = snapshot.created_at {
            resource.state.set_created_at(created_at);
        }
        *resource
            .mapping
            .write()
            .expect("credentialspec mapping poisoned") = snapshot.mapping;
        Ok(resource)
    }
}

#[async_trait]
impl TaskResource for CredentialSpecResource {
    fn name(&self) -> &'static str {
        CREDENTIALSPEC_RESOURCE_NAME
    }

    async fn apply_transition(&self, next_state: ResourceStatus) -> Result<()> {
        match next_state {
            ResourceStatus::Created => self.create().await,
            other => Err(Error::UnknownTransition {
                resource: self.name().to_string(),
                status: other.to_string(),
            }),
        }
    }

    async fn cleanup(&self) -> Result<()> {
        self.clear_mapping();
        Ok(())
    }

    /// Published artifacts under the resource directory. Pass-through
    /// `file://` sources are outside it and are never removed.
    fn materialized_paths(&self) -> Vec<PathBuf> {
        self.mapping
            .read()
            .expect("credentialspec mapping poisoned")
            .values()
            .filter_map(|target| {
                target
                    .strip_prefix(CREDENTIALSPEC_RUNTIME_PREFIX)
                    .and_then(|v| v.strip_prefix(FILE_SCHEME_PREFIX))
                    .map(PathBuf::from)
            })
            .filter(|path| path.starts_with(&self.resource_dir))
            .collect()
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

/// JSON checkpoint of a credential-spec resource.
///
/// Unknown fields are ignored on read; `createdAt` is omitted when the
/// resource has never been created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialSpecSnapshot {
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
    #[serde(rename = "credentialSpecResources")]
    pub required: HashMap<String, Vec<String>>,
    #[serde(rename = "credSpecMap")]
    pub mapping: HashMap<String, String>,
    #[serde(rename = "executionCredentialsID")]
    pub execution_credentials_id: String,
}

fn resource_basename(resource: &str) -> String {
    Path::new(resource)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| resource.to_string())
}

fn artifact_file_name(scheme: &str, task_id: &str, base: &str) -> String {
    let stem = base.strip_suffix(".json").unwrap_or(base);
    format!("{scheme}_{task_id}_{stem}.json")
}
