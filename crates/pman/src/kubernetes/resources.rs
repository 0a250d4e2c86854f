use k8s_openapi::api::batch::v1::Job;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Error, Result};

/// Lifecycle stage of a job as observed on the control plane.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Running,
    Succeeded,
    Failed,
    /// No job object was found.
    Unknown,
    /// The job object is still present but marked for deletion.
    Deleted,
}

impl JobState {
    pub fn from_job(job: &Job) -> Self {
        if job.metadata.deletion_timestamp.is_some() {
            return JobState::Deleted;
        }

        let Some(status) = job.status.as_ref() else {
            return JobState::Pending;
        };

        let condition = |kind: &str| {
            status
                .conditions
                .as_ref()
                .map(|conds| conds.iter().any(|c| c.type_ == kind && c.status == "True"))
                .unwrap_or(false)
        };

        if condition("Complete") || status.succeeded.unwrap_or(0) > 0 {
            JobState::Succeeded
        } else if condition("Failed") || status.failed.unwrap_or(0) > 0 {
            JobState::Failed
        } else if status.active.unwrap_or(0) > 0 {
            JobState::Running
        } else {
            JobState::Pending
        }
    }

    /// Interprets a `get_state` result, treating a missing job as `Unknown`.
    pub fn from_lookup(lookup: Result<Job>) -> Result<Self> {
        match lookup {
            Ok(job) => Ok(JobState::from_job(&job)),
            Err(Error::NotFound(_)) => Ok(JobState::Unknown),
            Err(e) => Err(e),
        }
    }

    pub fn is_finished(self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobState::Pending => "Pending",
            JobState::Running => "Running",
            JobState::Succeeded => "Succeeded",
            JobState::Failed => "Failed",
            JobState::Unknown => "Unknown",
            JobState::Deleted => "Deleted",
        };
        f.write_str(s)
    }
}
