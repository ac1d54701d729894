//! Resource-plane configuration.
//!
//! A plain settings struct consumed by the engine and the ENI manager.
//! Loading (file, env, CLI) is the caller's concern; values are treated
//! as immutable after startup.

use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{
    DEFAULT_RECONCILIATION_INTERVAL, DEFAULT_RESOURCE_DIR, DEFAULT_TASK_CGROUP_PREFIX,
    DEVICE_NAME_PREFIX, SYSFS_NET_DIR,
};

/// Settings consumed by the resource engine and the ENI state manager.
#[derive(Debug, Clone)]
pub struct Config {
    /// If false, cgroup setup and cleanup are no-ops.
    pub cgroup_enabled: bool,
    /// Gates credential-spec resource activation.
    pub gmsa_supported: bool,
    /// Base directory for materialized artifacts. Assumed pre-created.
    pub resource_dir: PathBuf,
    /// Required prefix for all task cgroup roots.
    pub task_cgroup_prefix: String,
    /// ENI reconciliation period.
    pub reconciliation_interval: Duration,
    /// Prefix carried by hot-plugged interface device names.
    pub device_name_prefix: String,
    /// Directory watched for interface events.
    pub sysfs_net_dir: PathBuf,
    /// Region the artifact fetchers operate in.
    pub region: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cgroup_enabled: true,
            gmsa_supported: false,
            resource_dir: PathBuf::from(DEFAULT_RESOURCE_DIR),
            task_cgroup_prefix: DEFAULT_TASK_CGROUP_PREFIX.to_string(),
            reconciliation_interval: DEFAULT_RECONCILIATION_INTERVAL,
            device_name_prefix: DEVICE_NAME_PREFIX.to_string(),
            sysfs_net_dir: PathBuf::from(SYSFS_NET_DIR),
            region: String::new(),
        }
    }
}
