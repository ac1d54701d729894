//! Constants for the resource plane.
//!
//! All prefixes, intervals, and file modes are defined here to ensure
//! consistency and prevent magic numbers throughout the codebase.

use std::time::Duration;

// =============================================================================
// ENI State Manager
// =============================================================================

/// Prefix carried by every hot-plugged interface device name.
pub const DEVICE_NAME_PREFIX: &str = "eth";

/// Directory watched for interface creation/removal events.
pub const SYSFS_NET_DIR: &str = "/sys/class/net";

/// Interval between periodic ENI reconciliation passes.
pub const DEFAULT_RECONCILIATION_INTERVAL: Duration = Duration::from_secs(30);

// =============================================================================
// Cgroups
// =============================================================================

/// Required prefix for every task cgroup root.
pub const DEFAULT_TASK_CGROUP_PREFIX: &str = "/hostplane";

// =============================================================================
// Credential Specs
// =============================================================================

/// Prefix carried by every credential-spec source string.
pub const CREDENTIALSPEC_PREFIX: &str = "credentialspec:";

/// Prefix of the runtime-consumable form published in the mapping.
pub const CREDENTIALSPEC_RUNTIME_PREFIX: &str = "credentialspec=";

/// ARN service handled by the object-store path.
pub const CREDENTIALSPEC_S3_SERVICE: &str = "s3";

/// ARN service handled by the parameter-store path.
pub const CREDENTIALSPEC_SSM_SERVICE: &str = "ssm";

/// Mode of materialized credential-spec files.
pub const CREDENTIALSPEC_FILE_MODE: u32 = 0o644;

/// Per-call timeout for object-store downloads.
pub const OBJECT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30);

// =============================================================================
// Resource Engine
// =============================================================================

/// Default base directory for materialized task artifacts.
pub const DEFAULT_RESOURCE_DIR: &str = "/var/lib/hostplane/resources";

/// Path separator used when joining cgroup roots.
pub const SEP_FORWARD_SLASH: &str = "/";
