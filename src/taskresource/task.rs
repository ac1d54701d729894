//! Task description consumed by the resource engine.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::arn::Arn;
use crate::error::{Error, Result};

use super::status::TaskStatus;

/// The slice of a scheduler task the resource plane needs.
///
/// The scheduler above owns the full task model; the engine derives a
/// resource set from these fields alone.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskDescription {
    /// Full task ARN.
    pub task_arn: String,
    /// Credentials ID of the task's execution role.
    pub execution_credentials_id: String,
    /// Credential-spec source string → dependent container names.
    #[serde(default)]
    pub credential_specs: HashMap<String, Vec<String>>,
    /// Last status the scheduler knows the task reached.
    #[serde(default)]
    pub known_status: TaskStatus,
    /// Status the scheduler wants the task in.
    #[serde(default)]
    pub desired_status: TaskStatus,
}

impl TaskDescription {
    /// Extracts the globally unique task ID from the task ARN.
    pub fn id(&self) -> Result<String> {
        task_id_from_arn(&self.task_arn)
    }
}

/// Extracts the task ID from a task ARN.
///
/// The resource field is `task/<id>` or `task/<cluster>/<id>`; the ID is
/// the final segment.
pub fn task_id_from_arn(task_arn: &str) -> Result<String> {
    let arn = Arn::parse(task_arn).map_err(|e| Error::InvalidTaskArn {
        arn: task_arn.to_string(),
        reason: e.to_string(),
    })?;

    match arn.resource.rsplit('/').next() {
        Some(id) if !id.is_empty() && id != arn.resource => Ok(id.to_string()),
        _ => Err(Error::InvalidTaskArn {
            arn: task_arn.to_string(),
            reason: "resource field carries no task ID".to_string(),
        }),
    }
}
