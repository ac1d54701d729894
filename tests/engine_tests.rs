//! Tests for the resource engine.
//!
//! Drives real resource types against stub collaborators: transition
//! gating, parallel setup, failure latching, restore semantics, and
//! best-effort cleanup.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use object_store::memory::InMemory;
use object_store::ObjectStore;
use tempfile::TempDir;

use hostplane::ssm::ParameterResults;
use hostplane::{
    validate_cgroup_spec, CgroupController, CgroupSpec, Config, CredentialSpecResource,
    CredentialSpecSnapshot, CredentialsManager, Error, IamRoleCredentials,
    InMemoryCredentialsManager, ResourceEngine,
    ResourceStatus, S3ClientCreator, SsmClient, SsmClientCreator, TaskCredentials,
    TaskDescription, TaskResource, TaskStatus,
};

const TASK_ARN: &str = "arn:aws:ecs:us-west-2:123456789012:task/t-9";
const CREDENTIALS_ID: &str = "exec-creds-9";
const PREFIX: &str = "/hostplane";

// =============================================================================
// Stub Collaborators
// =============================================================================

#[derive(Default)]
struct StubController {
    existing: Mutex<Vec<String>>,
    create_calls: Mutex<usize>,
    fail_create: bool,
}

impl CgroupController for StubController {
    fn create(&self, spec: &CgroupSpec) -> hostplane::Result<()> {
        validate_cgroup_spec(spec, PREFIX)?;
        *self.create_calls.lock().unwrap() += 1;
        if self.fail_create {
            return Err(Error::CgroupError {
                op: "create",
                root: spec.root.clone(),
                reason: "hierarchy unavailable".to_string(),
            });
        }
        self.existing.lock().unwrap().push(spec.root.clone());
        Ok(())
    }

    fn exists(&self, root: &str) -> bool {
        self.existing.lock().unwrap().iter().any(|r| r == root)
    }

    fn remove(&self, root: &str) -> hostplane::Result<()> {
        let mut existing = self.existing.lock().unwrap();
        match existing.iter().position(|r| r == root) {
            Some(index) => {
                existing.remove(index);
                Ok(())
            }
            None => Err(Error::CgroupNotFound {
                root: root.to_string(),
            }),
        }
    }
}

struct StubS3ClientCreator {
    store: Arc<InMemory>,
}

impl S3ClientCreator for StubS3ClientCreator {
    fn client_for_bucket(
        &self,
        _bucket: &str,
        _region: &str,
        _credentials: &IamRoleCredentials,
    ) -> hostplane::Result<Arc<dyn ObjectStore>> {
        Ok(Arc::clone(&self.store) as Arc<dyn ObjectStore>)
    }
}

struct StubSsmClient;

#[async_trait::async_trait]
impl SsmClient for StubSsmClient {
    async fn get_parameters(&self, names: &[String]) -> hostplane::Result<ParameterResults> {
        Ok(ParameterResults {
            parameters: HashMap::new(),
            invalid_names: names.to_vec(),
        })
    }
}

struct StubSsmClientCreator;

impl SsmClientCreator for StubSsmClientCreator {
    fn client(
        &self,
        _region: &str,
        _credentials: &IamRoleCredentials,
    ) -> Arc<dyn SsmClient> {
        Arc::new(StubSsmClient)
    }
}

struct Fixture {
    resource_dir: TempDir,
    config: Arc<Config>,
    controller: Arc<StubController>,
    credentials: Arc<InMemoryCredentialsManager>,
    store: Arc<InMemory>,
}

impl Fixture {
    fn new() -> Self {
        Self::with_controller(StubController::default())
    }

    fn with_controller(controller: StubController) -> Self {
        let resource_dir = TempDir::new().unwrap();
        let config = Arc::new(Config {
            cgroup_enabled: true,
            gmsa_supported: true,
            resource_dir: resource_dir.path().to_path_buf(),
            task_cgroup_prefix: PREFIX.to_string(),
            region: "us-west-2".to_string(),
            ..Config::default()
        });

        let credentials = Arc::new(InMemoryCredentialsManager::new());
        credentials.set_task_credentials(TaskCredentials {
            credentials_id: CREDENTIALS_ID.to_string(),
            iam_role: IamRoleCredentials::default(),
        });

        Self {
            resource_dir,
            config,
            controller: Arc::new(controller),
            credentials,
            store: Arc::new(InMemory::new()),
        }
    }

    fn engine(&self) -> ResourceEngine {
        ResourceEngine::new(
            Arc::clone(&self.config),
            Arc::clone(&self.credentials) as Arc<dyn CredentialsManager>,
            Arc::clone(&self.controller) as Arc<dyn CgroupController>,
            Arc::new(StubS3ClientCreator {
                store: Arc::clone(&self.store),
            }),
            Arc::new(StubSsmClientCreator),
        )
    }

    async fn seed_object(&self, key: &str, body: &'static [u8]) {
        self.store
            .put(&object_store::path::Path::from(key), Bytes::from_static(body).into())
            .await
            .unwrap();
    }
}

fn task_with_specs(specs: HashMap<String, Vec<String>>) -> TaskDescription {
    TaskDescription {
        task_arn: TASK_ARN.to_string(),
        execution_credentials_id: CREDENTIALS_ID.to_string(),
        credential_specs: specs,
        known_status: TaskStatus::None,
        desired_status: TaskStatus::Running,
    }
}

fn s3_task() -> TaskDescription {
    task_with_specs(HashMap::from([(
        "credentialspec:arn:aws:s3:::bucket/spec.json".to_string(),
        vec!["container-1".to_string()],
    )]))
}

// =============================================================================
// Setup Tests
// =============================================================================

#[tokio::test]
async fn test_setup_provisions_all_resources() {
    let fixture = Fixture::new();
    fixture.seed_object("spec.json", b"{}").await;
    let engine = fixture.engine();
    let task = s3_task();

    let resources = engine.resources_for(&task).unwrap();
    assert_eq!(resources.len(), 2);

    engine.setup_resources(&task, &resources).await.unwrap();

    for resource in &resources {
        assert_eq!(resource.known_status(), ResourceStatus::Created);
        assert_eq!(resource.applied_status(), ResourceStatus::None);
        assert!(resource.created_at().is_some());
        assert!(resource.terminal_reason().is_none());
    }
    assert!(fixture.controller.exists("/hostplane/t-9"));
    assert!(fixture.resource_dir.path().join("s3_t-9_spec.json").exists());
}

#[tokio::test]
async fn test_setup_derives_no_resources_when_gated_off() {
    let fixture = Fixture::new();
    let config = Arc::new(Config {
        cgroup_enabled: false,
        gmsa_supported: false,
        ..(*fixture.config).clone()
    });
    let engine = ResourceEngine::new(
        config,
        Arc::clone(&fixture.credentials) as Arc<dyn CredentialsManager>,
        Arc::clone(&fixture.controller) as Arc<dyn CgroupController>,
        Arc::new(StubS3ClientCreator {
            store: Arc::clone(&fixture.store),
        }),
        Arc::new(StubSsmClientCreator),
    );
    let task = s3_task();

    assert!(engine.resources_for(&task).unwrap().is_empty());
    engine.setup(&task).await.unwrap();
    assert_eq!(*fixture.controller.create_calls.lock().unwrap(), 0);
}

#[tokio::test]
async fn test_setup_failure_latches_terminal_reason() {
    let fixture = Fixture::with_controller(StubController {
        fail_create: true,
        ..StubController::default()
    });
    fixture.seed_object("spec.json", b"{}").await;
    let engine = fixture.engine();
    let task = s3_task();

    let resources = engine.resources_for(&task).unwrap();
    let err = engine.setup_resources(&task, &resources).await.unwrap_err();
    assert!(matches!(err, Error::CgroupError { .. }));

    // The failed resource carries the reason; the other resource still
    // ran to completion.
    let cgroup = &resources[0];
    assert_eq!(cgroup.known_status(), ResourceStatus::None);
    assert!(cgroup.terminal_reason().unwrap().contains("hierarchy unavailable"));

    let credspec = &resources[1];
    assert_eq!(credspec.known_status(), ResourceStatus::Created);
}

#[tokio::test]
async fn test_setup_refuses_in_flight_transition() {
    let fixture = Fixture::new();
    let engine = fixture.engine();
    let task = task_with_specs(HashMap::new());

    let resources = engine.resources_for(&task).unwrap();
    assert_eq!(resources.len(), 1);
    assert!(resources[0].set_applied_status(ResourceStatus::Created));

    let err = engine.setup_resources(&task, &resources).await.unwrap_err();
    assert!(matches!(err, Error::AlreadyInTransition { .. }));
}

// =============================================================================
// Restore Tests
// =============================================================================

fn restored_credspec(fixture: &Fixture, known: ResourceStatus) -> Arc<dyn TaskResource> {
    let snapshot = CredentialSpecSnapshot {
        task_arn: TASK_ARN.to_string(),
        created_at: None,
        desired_status: ResourceStatus::Created,
        known_status: known,
        required: HashMap::from([(
            "credentialspec:arn:aws:s3:::bucket/spec.json".to_string(),
            vec!["container-1".to_string()],
        )]),
        mapping: HashMap::new(),
        execution_credentials_id: CREDENTIALS_ID.to_string(),
    };
    Arc::new(
        CredentialSpecResource::from_snapshot(
            snapshot,
            "us-west-2",
            fixture.resource_dir.path(),
            Arc::clone(&fixture.credentials) as Arc<dyn CredentialsManager>,
            Arc::new(StubS3ClientCreator {
                store: Arc::clone(&fixture.store),
            }),
            Arc::new(StubSsmClientCreator),
        )
        .unwrap(),
    )
}

#[tokio::test]
async fn test_restore_before_task_created_refetches() {
    let fixture = Fixture::new();
    fixture.seed_object("spec.json", b"{}").await;
    let engine = fixture.engine();

    // Checkpoint says CREATED, but the task itself never got there: the
    // resource is reset and artifacts fetched again.
    let resources = vec![restored_credspec(&fixture, ResourceStatus::Created)];
    let task = task_with_specs(HashMap::new());

    engine.setup_resources(&task, &resources).await.unwrap();

    assert!(fixture.resource_dir.path().join("s3_t-9_spec.json").exists());
}

#[tokio::test]
async fn test_restore_after_task_created_keeps_state() {
    let fixture = Fixture::new();
    let engine = fixture.engine();

    let resources = vec![restored_credspec(&fixture, ResourceStatus::Created)];
    let task = TaskDescription {
        known_status: TaskStatus::Running,
        desired_status: TaskStatus::Running,
        ..task_with_specs(HashMap::new())
    };

    // Already at steady state; nothing is fetched.
    engine.setup_resources(&task, &resources).await.unwrap();

    assert!(!fixture.resource_dir.path().join("s3_t-9_spec.json").exists());
}

// =============================================================================
// Cleanup Tests
// =============================================================================

#[tokio::test]
async fn test_cleanup_tears_everything_down() {
    let fixture = Fixture::new();
    fixture.seed_object("spec.json", b"{}").await;
    let engine = fixture.engine();
    let task = s3_task();

    let resources = engine.resources_for(&task).unwrap();
    engine.setup_resources(&task, &resources).await.unwrap();
    let artifact = fixture.resource_dir.path().join("s3_t-9_spec.json");
    assert!(artifact.exists());

    engine.cleanup_resources(&task, &resources).await.unwrap();

    assert!(!fixture.controller.exists("/hostplane/t-9"));
    assert!(!artifact.exists());
    for resource in &resources {
        assert!(resource.desired_terminal());
        assert_eq!(resource.known_status(), ResourceStatus::Removed);
    }
}

#[tokio::test]
async fn test_cleanup_of_unprovisioned_task_succeeds() {
    let fixture = Fixture::new();
    let engine = fixture.engine();
    let task = task_with_specs(HashMap::new());

    // Nothing was set up; a missing cgroup is treated as removed.
    engine.cleanup(&task).await.unwrap();
}

// =============================================================================
// State-Machine Invariants
// =============================================================================

#[tokio::test]
async fn test_known_status_monotone_through_engine() {
    let fixture = Fixture::new();
    let engine = fixture.engine();
    let task = task_with_specs(HashMap::new());

    let resources = engine.resources_for(&task).unwrap();
    engine.setup_resources(&task, &resources).await.unwrap();

    let resource = &resources[0];
    assert_eq!(resource.known_status(), ResourceStatus::Created);

    // A stale write cannot roll the status back.
    resource.set_known_status(ResourceStatus::None);
    assert_eq!(resource.known_status(), ResourceStatus::Created);
}

#[tokio::test]
async fn test_applied_status_cleared_after_catchup() {
    let fixture = Fixture::new();
    let engine = fixture.engine();
    let task = task_with_specs(HashMap::new());

    let resources = engine.resources_for(&task).unwrap();
    let resource = &resources[0];

    assert!(resource.set_applied_status(ResourceStatus::Created));
    resource.set_known_status(ResourceStatus::Created);
    assert_eq!(resource.applied_status(), ResourceStatus::None);

    // The gate is open again.
    assert!(resource.set_applied_status(ResourceStatus::Removed));
}
