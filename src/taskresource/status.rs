//! Resource and task status types.

use serde::{Deserialize, Serialize};

/// Lifecycle status of an auxiliary task resource.
///
/// Ordered progression:
///
/// ```text
///   None ──▶ Created ──▶ Removed
/// ```
///
/// `known_status` only ever moves forward through this order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceStatus {
    /// Resource has not been created yet.
    #[default]
    None,
    /// Resource exists and is usable by containers.
    Created,
    /// Resource has been torn down.
    Removed,
}

impl ResourceStatus {
    /// Returns the next status in the progression, saturating at
    /// `Removed`.
    #[must_use]
    pub fn next(self) -> Self {
        match self {
            Self::None => Self::Created,
            Self::Created | Self::Removed => Self::Removed,
        }
    }
}

impl std::fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "NONE"),
            Self::Created => write!(f, "CREATED"),
            Self::Removed => write!(f, "REMOVED"),
        }
    }
}

/// Coarse task lifecycle status handed down by the scheduler.
///
/// The engine only consults it when restoring checkpointed resources: a
/// task that never reached `Created` gets its resources reset so
/// artifacts are fetched again.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    /// Task is known to the agent but nothing has been provisioned.
    #[default]
    None,
    /// Task resources and containers have been created.
    Created,
    /// Task containers are running.
    Running,
    /// Task has stopped.
    Stopped,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_ordering() {
        assert!(ResourceStatus::None < ResourceStatus::Created);
        assert!(ResourceStatus::Created < ResourceStatus::Removed);
    }

    #[test]
    fn test_status_progression() {
        assert_eq!(ResourceStatus::None.next(), ResourceStatus::Created);
        assert_eq!(ResourceStatus::Created.next(), ResourceStatus::Removed);
        assert_eq!(ResourceStatus::Removed.next(), ResourceStatus::Removed);
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&ResourceStatus::Created).unwrap();
        assert_eq!(json, "\"CREATED\"");

        let status: ResourceStatus = serde_json::from_str("\"REMOVED\"").unwrap();
        assert_eq!(status, ResourceStatus::Removed);
    }
}
