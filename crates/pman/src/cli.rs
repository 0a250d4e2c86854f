//! Command-line surface: one verb per invocation against one project.

use clap::{Args, Parser, ValueEnum};
use k8s_openapi::api::batch::v1::Job;
use std::path::PathBuf;
use tracing::info;

use crate::{
    config::{Config, DeletePropagation},
    kubernetes::{JobApi, JobState},
    lifecycle::{self, JobSpec},
    Result,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Manage jobs on an OpenShift cluster", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub action: Action,

    /// The OpenShift project to manage jobs in
    #[arg(short, long)]
    pub project: String,

    /// OpenShift cluster configuration file
    #[arg(long, value_name = "PATH")]
    pub conffile: Option<PathBuf>,

    /// Kubeconfig context to use (from --conffile, or the default kubeconfig)
    #[arg(long)]
    pub context: Option<String>,

    /// Container image for the scheduled job
    #[arg(short, long)]
    pub image: Option<String>,

    /// Command to run inside the scheduled job container
    #[arg(short, long, allow_hyphen_values = true)]
    pub command: Option<String>,

    /// Host directory to mount at /share in the container
    #[arg(short, long, value_name = "DIR")]
    pub mount: Option<PathBuf>,

    /// What happens to the job's pods on removal
    #[arg(long, value_enum)]
    pub propagation: Option<DeletePropagation>,

    /// Format of the --state dump
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Yaml)]
    pub output: OutputFormat,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    pub log_level: String,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
pub struct Action {
    /// Schedule a new job
    #[arg(short, long, value_name = "NAME", requires_all = ["image", "command"])]
    pub schedule: Option<String>,

    /// Remove a previously scheduled job
    #[arg(short, long, value_name = "NAME")]
    pub remove: Option<String>,

    /// Print the state of a scheduled job
    #[arg(long, value_name = "NAME")]
    pub state: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Yaml,
    Json,
}

/// A validated request, ready to run against the cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verb {
    Schedule(JobSpec),
    Remove { name: String, project: String },
    State { name: String, project: String },
}

impl Cli {
    /// Lets command-line flags override the loaded configuration.
    pub fn apply(&self, config: &mut Config) {
        if let Some(path) = &self.conffile {
            config.cluster.conffile = Some(path.clone());
        }
        if let Some(context) = &self.context {
            config.cluster.context = Some(context.clone());
        }
        if let Some(propagation) = self.propagation {
            config.delete_propagation = propagation;
        }
    }

    /// Resolves the selected verb, validating it before any cluster is contacted.
    pub fn verb(&self) -> Result<Verb> {
        let project = self.project.clone();
        let verb = match (&self.action.schedule, &self.action.remove, &self.action.state) {
            (Some(name), _, _) => {
                let spec = JobSpec {
                    name: name.clone(),
                    project,
                    image: self.image.clone().unwrap_or_default(),
                    command: self.command.clone().into_iter().collect(),
                    mount_dir: self.mount.clone(),
                };
                spec.validate()?;
                Verb::Schedule(spec)
            }
            (None, Some(name), _) => {
                lifecycle::validate_target(name, &project)?;
                Verb::Remove { name: name.clone(), project }
            }
            (None, None, Some(name)) => {
                lifecycle::validate_target(name, &project)?;
                Verb::State { name: name.clone(), project }
            }
            (None, None, None) => {
                return Err(crate::Error::InvalidArgument(
                    "one of --schedule, --remove or --state is required".to_string(),
                ))
            }
        };
        Ok(verb)
    }
}

/// Runs `verb` and returns what should be printed on stdout, if anything.
pub async fn dispatch<A: JobApi + ?Sized>(
    api: &A,
    verb: &Verb,
    propagation: DeletePropagation,
    output: OutputFormat,
) -> Result<Option<String>> {
    match verb {
        Verb::Schedule(spec) => {
            lifecycle::schedule(api, spec).await?;
            Ok(None)
        }
        Verb::Remove { name, project } => {
            lifecycle::remove(api, name, project, propagation).await?;
            Ok(None)
        }
        Verb::State { name, project } => {
            let job = lifecycle::get_state(api, name, project).await?;
            info!(name = %name, project = %project, state = %JobState::from_job(&job), "Fetched job");
            render_job(&job, output).map(Some)
        }
    }
}

pub fn render_job(job: &Job, format: OutputFormat) -> Result<String> {
    let rendered = match format {
        OutputFormat::Yaml => serde_yaml::to_string(job)?,
        OutputFormat::Json => serde_json::to_string_pretty(job)? + "\n",
    };
    Ok(rendered)
}
