use async_trait::async_trait;
use k8s_openapi::api::batch::v1::{Job, JobCondition, JobStatus};
use pman_openshift::{
    config::{Config, DeletePropagation},
    get_state, remove, schedule, ClusterHandle, Error, JobApi, JobSpec, JobState, Result,
};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};

/// Control plane stand-in: stores jobs per project and advances each job one
/// lifecycle step (Pending, Running, Succeeded) every time it is read.
#[derive(Default)]
struct FakeControlPlane {
    jobs: Mutex<BTreeMap<(String, String), Job>>,
    calls: AtomicUsize,
}

impl FakeControlPlane {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn advance(job: &mut Job) {
        let status = job.status.get_or_insert_with(JobStatus::default);
        if status.active.unwrap_or(0) > 0 {
            status.active = Some(0);
            status.succeeded = Some(1);
            status.conditions = Some(vec![JobCondition {
                type_: "Complete".to_string(),
                status: "True".to_string(),
                ..Default::default()
            }]);
        } else if status.succeeded.is_none() {
            status.active = Some(1);
        }
    }
}

#[async_trait]
impl JobApi for FakeControlPlane {
    async fn create_job(&self, project: &str, job: &Job) -> Result<Job> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let name = job.metadata.name.clone().unwrap_or_default();
        let mut jobs = self.jobs.lock().unwrap();
        let key = (project.to_string(), name.clone());
        if jobs.contains_key(&key) {
            return Err(Error::AlreadyExists(format!("job {}/{}", project, name)));
        }
        let mut created = job.clone();
        created.metadata.uid = Some(format!("uid-{}", jobs.len()));
        created.status = Some(JobStatus::default());
        jobs.insert(key, created.clone());
        Ok(created)
    }

    async fn get_job(&self, project: &str, name: &str) -> Result<Job> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut jobs = self.jobs.lock().unwrap();
        let job = jobs
            .get_mut(&(project.to_string(), name.to_string()))
            .ok_or_else(|| Error::NotFound(format!("job {}/{}", project, name)))?;
        let observed = job.clone();
        Self::advance(job);
        Ok(observed)
    }

    async fn delete_job(&self, project: &str, name: &str, _propagation: DeletePropagation) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.jobs
            .lock()
            .unwrap()
            .remove(&(project.to_string(), name.to_string()))
            .map(|_| ())
            .ok_or_else(|| Error::NotFound(format!("job {}/{}", project, name)))
    }
}

fn fedora_echo(name: &str) -> JobSpec {
    JobSpec::new(name, "myproject", "fedora", vec!["echo test".to_string()])
}

#[tokio::test]
async fn scheduled_job_is_observable() {
    let cluster = FakeControlPlane::default();

    assert_ok!(schedule(&cluster, &fedora_echo("job-abc123")).await);
    let state = JobState::from_lookup(get_state(&cluster, "job-abc123", "myproject").await).unwrap();
    assert_ne!(state, JobState::Unknown);
}

#[tokio::test]
async fn removed_job_is_not_found() {
    let cluster = FakeControlPlane::default();
    schedule(&cluster, &fedora_echo("job-abc123")).await.unwrap();

    assert_ok!(remove(&cluster, "job-abc123", "myproject", DeletePropagation::Background).await);

    let err = get_state(&cluster, "job-abc123", "myproject").await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
    let err = remove(&cluster, "job-abc123", "myproject", DeletePropagation::Background)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn duplicate_schedule_leaves_the_first_job_alone() {
    let cluster = FakeControlPlane::default();
    let first = schedule(&cluster, &fedora_echo("job-abc123")).await.unwrap();

    let mut second = fedora_echo("job-abc123");
    second.image = "alpine".to_string();
    let err = schedule(&cluster, &second).await.unwrap_err();
    assert!(matches!(err, Error::AlreadyExists(_)));

    let job = get_state(&cluster, "job-abc123", "myproject").await.unwrap();
    assert_eq!(job.metadata.uid, first.metadata.uid);
    let container = &job.spec.unwrap().template.spec.unwrap().containers[0];
    assert_eq!(container.image.as_deref(), Some("fedora"));
}

#[tokio::test]
async fn same_name_in_another_project_is_independent() {
    let cluster = FakeControlPlane::default();
    schedule(&cluster, &fedora_echo("job-abc123")).await.unwrap();

    let mut other = fedora_echo("job-abc123");
    other.project = "otherproject".to_string();
    assert_ok!(schedule(&cluster, &other).await);
}

#[tokio::test]
async fn invalid_spec_makes_no_calls() {
    let cluster = FakeControlPlane::default();

    let mut no_image = fedora_echo("job-abc123");
    no_image.image = String::new();
    let err = schedule(&cluster, &no_image).await.unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));

    let mut no_command = fedora_echo("job-abc123");
    no_command.command.clear();
    let err = schedule(&cluster, &no_command).await.unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));

    assert_eq!(cluster.calls(), 0);
}

#[tokio::test]
async fn removing_a_missing_job_fails() {
    let cluster = FakeControlPlane::default();
    let err = remove(&cluster, "nope", "myproject", DeletePropagation::Orphan)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
    assert_eq!(cluster.calls(), 1);
}

#[tokio::test]
async fn concurrent_operations_on_distinct_names() {
    let cluster = FakeControlPlane::default();

    let specs = [fedora_echo("job-a"), fedora_echo("job-b"), fedora_echo("job-c")];
    let (a, b, c) = tokio::join!(
        schedule(&cluster, &specs[0]),
        schedule(&cluster, &specs[1]),
        schedule(&cluster, &specs[2]),
    );
    assert_ok!(a);
    assert_ok!(b);
    assert_ok!(c);

    let (a, b) = tokio::join!(
        get_state(&cluster, "job-a", "myproject"),
        remove(&cluster, "job-b", "myproject", DeletePropagation::Background),
    );
    assert_ok!(a);
    assert_ok!(b);
    assert_err!(get_state(&cluster, "job-b", "myproject").await);
}

async fn poll_until_finished<A: JobApi + ?Sized>(
    api: &A,
    name: &str,
    project: &str,
    interval: Duration,
    attempts: usize,
) -> Vec<JobState> {
    let mut seen = Vec::new();
    for _ in 0..attempts {
        let state = JobState::from_job(&get_state(api, name, project).await.unwrap());
        if seen.last() != Some(&state) {
            seen.push(state);
        }
        if state.is_finished() {
            break;
        }
        tokio::time::sleep(interval).await;
    }
    seen
}

#[tokio::test]
async fn echo_job_runs_to_completion() {
    let cluster = FakeControlPlane::default();
    schedule(&cluster, &fedora_echo("job-abc123")).await.unwrap();

    let seen = poll_until_finished(&cluster, "job-abc123", "myproject", Duration::from_millis(1), 10).await;
    assert_eq!(seen, vec![JobState::Pending, JobState::Running, JobState::Succeeded]);

    remove(&cluster, "job-abc123", "myproject", DeletePropagation::Background)
        .await
        .unwrap();
    let state = JobState::from_lookup(get_state(&cluster, "job-abc123", "myproject").await).unwrap();
    assert_eq!(state, JobState::Unknown);
}

/// Runs against the cluster selected by the ambient kubeconfig.
/// Set PMAN_TEST_PROJECT to a project the current user may create jobs in.
#[tokio::test]
#[ignore = "requires a reachable cluster"]
async fn echo_job_on_a_live_cluster() {
    let project = std::env::var("PMAN_TEST_PROJECT").unwrap_or_else(|_| "myproject".to_string());
    let config = Config::load().unwrap();
    let cluster = ClusterHandle::connect(&config.cluster).await.unwrap();

    let name = format!("job-pman-{}", std::process::id());
    let spec = JobSpec::new(name.as_str(), project.as_str(), "fedora", vec!["echo test".to_string()]);
    schedule(&cluster, &spec).await.unwrap();

    let seen = poll_until_finished(&cluster, &name, &project, Duration::from_secs(2), 90).await;
    assert_eq!(seen.last(), Some(&JobState::Succeeded), "observed {:?}", seen);

    remove(&cluster, &name, &project, DeletePropagation::Background)
        .await
        .unwrap();
    // Background deletion may leave the object visible for a moment with a deletion timestamp.
    let mut state = JobState::Deleted;
    for _ in 0..30 {
        state = JobState::from_lookup(get_state(&cluster, &name, &project).await).unwrap();
        if state == JobState::Unknown {
            break;
        }
        tokio::time::sleep(Duration::from_secs(1)).await;
    }
    assert_eq!(state, JobState::Unknown);
}
