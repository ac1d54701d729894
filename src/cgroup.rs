//! Cgroup controller.
//!
//! Validates cgroup specs and drives the kernel v1 hierarchy. The
//! controller sits behind a trait so the resource layer can be exercised
//! without touching `/sys/fs/cgroup`.

use std::path::Path;

use cgroups_rs::{hierarchies, Cgroup, Hierarchy, Resources};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// V1 subsystem mounts probed when checking for an existing hierarchy.
const PROBE_SUBSYSTEMS: &[&str] = &["cpu", "memory", "pids"];

const CGROUP_MOUNT: &str = "/sys/fs/cgroup";

/// Abstraction for creating a new cgroup from a root path and resource
/// limits.
#[derive(Debug, Clone, Default)]
pub struct CgroupSpec {
    /// The cgroup path. Must carry the configured task-cgroup prefix.
    pub root: String,
    /// Linux resource limits. Must be present even if empty.
    pub resources: Option<Resources>,
}

/// Checks a cgroup spec for a valid root and resource limits.
pub fn validate_cgroup_spec(spec: &CgroupSpec, required_prefix: &str) -> Result<()> {
    if spec.root.is_empty() {
        return Err(Error::InvalidCgroupSpec("invalid cgroup root".to_string()));
    }
    if !spec.root.starts_with(required_prefix) {
        return Err(Error::InvalidCgroupSpec(format!(
            "root '{}' must begin with '{}'",
            spec.root, required_prefix
        )));
    }
    if spec.resources.is_none() {
        return Err(Error::InvalidCgroupSpec(
            "empty linux resource spec".to_string(),
        ));
    }
    Ok(())
}

/// Kernel cgroup operations consumed by the resource layer.
pub trait CgroupController: Send + Sync {
    /// Validates `spec` and instantiates a hierarchy at its root.
    fn create(&self, spec: &CgroupSpec) -> Result<()>;

    /// Returns true if a hierarchy exists at `root`.
    fn exists(&self, root: &str) -> bool;

    /// Loads and deletes the hierarchy at `root`.
    ///
    /// A missing root is `CgroupNotFound`; the resource layer treats that
    /// as success on cleanup.
    fn remove(&self, root: &str) -> Result<()>;
}

/// Controller backed by the kernel v1 hierarchy.
pub struct V1CgroupController {
    task_cgroup_prefix: String,
}

impl V1CgroupController {
    /// Creates a controller enforcing `task_cgroup_prefix` on all roots.
    pub fn new(task_cgroup_prefix: impl Into<String>) -> Self {
        Self {
            task_cgroup_prefix: task_cgroup_prefix.into(),
        }
    }

    fn hierarchy() -> Box<dyn Hierarchy> {
        Box::new(hierarchies::V1::new())
    }
}

impl CgroupController for V1CgroupController {
    fn create(&self, spec: &CgroupSpec) -> Result<()> {
        validate_cgroup_spec(spec, &self.task_cgroup_prefix)?;

        info!(root = %spec.root, "creating cgroup");
        let relative = spec.root.trim_start_matches('/');
        let cgroup =
            Cgroup::new(Self::hierarchy(), relative).map_err(|e| Error::CgroupError {
                op: "create",
                root: spec.root.clone(),
                reason: e.to_string(),
            })?;

        // Validation guarantees resources are present.
        let resources = spec.resources.as_ref().expect("validated resources");
        if let Err(e) = cgroup.apply(resources) {
            let _ = cgroup.delete();
            return Err(Error::CgroupError {
                op: "apply",
                root: spec.root.clone(),
                reason: e.to_string(),
            });
        }
        Ok(())
    }

    fn exists(&self, root: &str) -> bool {
        let relative = root.trim_start_matches('/');
        PROBE_SUBSYSTEMS
            .iter()
            .any(|subsystem| Path::new(CGROUP_MOUNT).join(subsystem).join(relative).exists())
    }

    fn remove(&self, root: &str) -> Result<()> {
        if !self.exists(root) {
            return Err(Error::CgroupNotFound {
                root: root.to_string(),
            });
        }

        debug!(root, "removing cgroup");
        let relative = root.trim_start_matches('/');
        let cgroup = Cgroup::load(Self::hierarchy(), relative);
        cgroup.delete().map_err(|e| Error::CgroupError {
            op: "remove",
            root: root.to_string(),
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PREFIX: &str = "/hostplane";

    #[test]
    fn test_validate_rejects_foreign_root() {
        let spec = CgroupSpec {
            root: "/non-managed/root".to_string(),
            resources: Some(Resources::default()),
        };

        assert!(matches!(
            validate_cgroup_spec(&spec, PREFIX),
            Err(Error::InvalidCgroupSpec(_))
        ));
    }

    #[test]
    fn test_validate_rejects_missing_resources() {
        let spec = CgroupSpec {
            root: format!("{PREFIX}/task-id"),
            resources: None,
        };

        assert!(matches!(
            validate_cgroup_spec(&spec, PREFIX),
            Err(Error::InvalidCgroupSpec(_))
        ));
    }

    #[test]
    fn test_validate_rejects_empty_root() {
        let spec = CgroupSpec {
            root: String::new(),
            resources: Some(Resources::default()),
        };

        assert!(validate_cgroup_spec(&spec, PREFIX).is_err());
    }

    #[test]
    fn test_validate_accepts_empty_resources() {
        let spec = CgroupSpec {
            root: format!("{PREFIX}/task-id"),
            resources: Some(Resources::default()),
        };

        assert!(validate_cgroup_spec(&spec, PREFIX).is_ok());
    }
}
