//! Job lifecycle: schedule, inspect and remove a single batch job.
//!
//! Each operation validates its input, then issues exactly one call to the
//! control plane through [`JobApi`]. Nothing is retried or recovered here;
//! errors reach the caller as the control plane reported them.

use k8s_openapi::api::batch::v1::Job;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info};

use crate::{
    config::DeletePropagation,
    kubernetes::{build_job_manifest, normalize_command, JobApi},
    Error, Result,
};

/// A unit of work to run once in a container.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JobSpec {
    /// Unique within `project` while the job object exists.
    pub name: String,
    /// Target namespace.
    pub project: String,
    pub image: String,
    /// Command tokens; a lone token is split on whitespace.
    pub command: Vec<String>,
    /// Host directory bound read-write at `/share`.
    pub mount_dir: Option<PathBuf>,
}

impl JobSpec {
    pub fn new(
        name: impl Into<String>,
        project: impl Into<String>,
        image: impl Into<String>,
        command: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            project: project.into(),
            image: image.into(),
            command,
            mount_dir: None,
        }
    }

    pub fn with_mount_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.mount_dir = Some(dir.into());
        self
    }

    /// Checks the fields required to build a submittable manifest.
    pub fn validate(&self) -> Result<()> {
        require("name", &self.name)?;
        require("project", &self.project)?;
        require("image", &self.image)?;
        if normalize_command(&self.command).iter().all(|t| t.trim().is_empty()) {
            return Err(Error::InvalidArgument("command must not be empty".to_string()));
        }
        if let Some(dir) = &self.mount_dir {
            if dir.as_os_str().is_empty() {
                return Err(Error::InvalidArgument("mount directory must not be empty".to_string()));
            }
        }
        Ok(())
    }
}

/// Checks the `(name, project)` pair that addresses an existing job.
pub fn validate_target(name: &str, project: &str) -> Result<()> {
    require("name", name)?;
    require("project", project)
}

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::InvalidArgument(format!("{} must not be empty", field)));
    }
    Ok(())
}

/// Submits `spec` as a new job and returns the object the control plane created.
///
/// Returns once the create request is accepted; it does not wait for the pod.
pub async fn schedule<A: JobApi + ?Sized>(api: &A, spec: &JobSpec) -> Result<Job> {
    spec.validate()?;

    let manifest = build_job_manifest(spec);
    debug!(manifest = ?manifest, "Built job manifest");

    let job = api.create_job(&spec.project, &manifest).await?;
    info!(
        name = %spec.name,
        project = %spec.project,
        image = %spec.image,
        uid = job.metadata.uid.as_deref().unwrap_or("<unknown>"),
        "Scheduled job"
    );
    Ok(job)
}

/// Reads the job object as the control plane currently reports it.
pub async fn get_state<A: JobApi + ?Sized>(api: &A, name: &str, project: &str) -> Result<Job> {
    validate_target(name, project)?;

    api.get_job(project, name).await
}

/// Deletes the job; a second removal of the same name fails with `NotFound`.
pub async fn remove<A: JobApi + ?Sized>(
    api: &A,
    name: &str,
    project: &str,
    propagation: DeletePropagation,
) -> Result<()> {
    validate_target(name, project)?;

    api.delete_job(project, name, propagation).await?;
    info!(name, project, propagation = ?propagation, "Removed job");
    Ok(())
}
