//! Execution-role credential store.
//!
//! Task resources fetch external artifacts with per-task execution role
//! credentials, resolved by ID at transition time. Registration and
//! refresh are driven by the control plane above this crate; the resource
//! plane only reads.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A set of IAM role credentials scoped to one task role.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IamRoleCredentials {
    /// Access key ID.
    pub access_key_id: String,
    /// Secret access key.
    pub secret_access_key: String,
    /// Session token for temporary credentials.
    pub session_token: String,
    /// When the credentials expire, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration: Option<DateTime<Utc>>,
}

/// Credentials registered for a task, addressed by credentials ID.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskCredentials {
    /// Opaque ID the scheduler hands to the resource plane.
    pub credentials_id: String,
    /// The IAM role credentials themselves.
    pub iam_role: IamRoleCredentials,
}

/// Read-side contract the resource plane consumes.
///
/// Any store honouring this contract is a valid collaborator; tests use an
/// in-memory one.
pub trait CredentialsManager: Send + Sync {
    /// Returns the credentials registered under `id`, if any.
    fn task_credentials(&self, id: &str) -> Option<TaskCredentials>;
}

/// In-memory credentials store keyed by credentials ID.
#[derive(Default)]
pub struct InMemoryCredentialsManager {
    credentials: RwLock<HashMap<String, TaskCredentials>>,
}

impl InMemoryCredentialsManager {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) credentials under their ID.
    pub fn set_task_credentials(&self, credentials: TaskCredentials) {
        self.credentials
            .write()
            .expect("credentials lock poisoned")
            .insert(credentials.credentials_id.clone(), credentials);
    }

    /// Removes the credentials registered under `id`.
    pub fn remove_credentials(&self, id: &str) {
        self.credentials
            .write()
            .expect("credentials lock poisoned")
            .remove(id);
    }
}

impl CredentialsManager for InMemoryCredentialsManager {
    fn task_credentials(&self, id: &str) -> Option<TaskCredentials> {
        self.credentials
            .read()
            .expect("credentials lock poisoned")
            .get(id)
            .cloned()
    }
}
