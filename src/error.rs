//! Error types for the resource plane.

use std::path::PathBuf;
use std::time::Duration;

/// Result type alias for resource-plane operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the resource plane.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    // =========================================================================
    // ARN Errors
    // =========================================================================
    /// ARN string does not start with the `arn:` prefix.
    #[error("arn: invalid prefix")]
    ArnInvalidPrefix,

    /// ARN string has fewer than six colon-separated sections.
    #[error("arn: not enough sections")]
    ArnNotEnoughSections,

    /// Task ARN does not carry a recognizable task ID.
    #[error("invalid task ARN '{arn}': {reason}")]
    InvalidTaskArn { arn: String, reason: String },

    // =========================================================================
    // ENI Errors
    // =========================================================================
    /// Device name does not carry the configured interface prefix.
    #[error("invalid device name: {0}")]
    InvalidDeviceName(String),

    /// MAC address is not a canonical IEEE 48-bit address.
    #[error("invalid MAC address: {0}")]
    InvalidMacAddress(String),

    // =========================================================================
    // Credential Errors
    // =========================================================================
    /// Execution role credentials are not registered under the given ID.
    #[error("unable to find execution role credentials for ID '{id}'")]
    CredentialsNotFound { id: String },

    // =========================================================================
    // Fetch Errors
    // =========================================================================
    /// Object key does not exist in the bucket.
    #[error("object '{key}' not found in bucket '{bucket}'")]
    ObjectNotFound { bucket: String, key: String },

    /// One or more parameter names do not exist in the parameter store.
    #[error("parameters not found: {names:?}")]
    ParameterNotFound { names: Vec<String> },

    /// Remote store denied access to the requested resource.
    #[error("access denied: {0}")]
    AccessDenied(String),

    /// Network failure talking to a remote store.
    #[error("transport error: {0}")]
    Transport(String),

    /// Remote operation exceeded its per-call timeout.
    #[error("operation timed out after {duration:?}: {operation}")]
    Timeout {
        operation: String,
        duration: Duration,
    },

    // =========================================================================
    // Credential-Spec Errors
    // =========================================================================
    /// Source string is not of the form `credentialspec:<value>`.
    #[error("invalid credentialspec source '{0}'")]
    InvalidCredentialSpec(String),

    /// ARN service is neither s3 nor ssm.
    #[error(
        "unsupported credentialspec ARN dependency, only s3/ssm ARNs are valid (got '{service}')"
    )]
    UnsupportedCredentialSpecSource { service: String },

    /// S3 ARN resource field does not decompose into bucket and key.
    #[error("invalid s3 ARN resource '{0}': expected bucket/key")]
    InvalidS3Arn(String),

    /// No mapping has been published for the requested source.
    #[error("unable to obtain credentialspec mapping for '{0}'")]
    CredSpecNotMapped(String),

    // =========================================================================
    // Cgroup Errors
    // =========================================================================
    /// Cgroup spec failed validation.
    #[error("cgroup spec validator: {0}")]
    InvalidCgroupSpec(String),

    /// No cgroup hierarchy exists at the given root.
    #[error("cgroup not found: {root}")]
    CgroupNotFound { root: String },

    /// Kernel cgroup layer rejected the operation.
    #[error("cgroup {op} failed for '{root}': {reason}")]
    CgroupError {
        op: &'static str,
        root: String,
        reason: String,
    },

    // =========================================================================
    // Resource State-Machine Errors
    // =========================================================================
    /// Target status has no bound operation in the resource's transition table.
    #[error("resource [{resource}]: transition to {status} impossible")]
    UnknownTransition { resource: String, status: String },

    /// A transition is already applied and has not caught up yet.
    #[error("resource [{resource}]: already in transition")]
    AlreadyInTransition { resource: String },

    // =========================================================================
    // Filesystem / I/O Errors
    // =========================================================================
    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Filesystem operation failed at a known path.
    #[error("filesystem error at {path}: {reason}")]
    Filesystem { path: PathBuf, reason: String },

    /// Checkpoint (de)serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
