use async_trait::async_trait;
use k8s_openapi::api::batch::v1::Job;
use kube::{
    api::{Api, PostParams},
    config::{KubeConfigOptions, Kubeconfig},
    Client,
};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::{
    config::{ClusterConfig, DeletePropagation},
    Error, Result,
};

/// The three control-plane calls the job lifecycle is built on.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait JobApi: Send + Sync {
    async fn create_job(&self, project: &str, job: &Job) -> Result<Job>;
    async fn get_job(&self, project: &str, name: &str) -> Result<Job>;
    async fn delete_job(&self, project: &str, name: &str, propagation: DeletePropagation) -> Result<()>;
}

/// Authenticated session against one cluster's API server.
///
/// Cheap to clone; all clones share the same connection pool and carry no
/// per-call state, so one handle can serve concurrent operations.
#[derive(Clone)]
pub struct ClusterHandle {
    client: Client,
}

impl ClusterHandle {
    /// Loads cluster connection parameters and verifies the API server answers.
    ///
    /// With `conffile` set only that kubeconfig is read. A context without a
    /// file is looked up in `$KUBECONFIG` or `~/.kube/config`; with neither,
    /// the configuration is inferred (in-cluster first).
    pub async fn connect(config: &ClusterConfig) -> Result<Self> {
        let mut kube_config = match ConfigSource::select(config) {
            ConfigSource::File { path, context } => {
                let kubeconfig = Kubeconfig::read_from(path).map_err(|e| {
                    Error::Connection(format!(
                        "Failed to read kubeconfig from {}: {}",
                        path.display(),
                        e
                    ))
                })?;
                kube::Config::from_custom_kubeconfig(kubeconfig, &context_options(context))
                    .await
                    .map_err(|e| Error::Connection(format!("Failed to create Kubernetes config: {}", e)))?
            }
            ConfigSource::DefaultKubeconfig { context } => {
                kube::Config::from_kubeconfig(&context_options(Some(context)))
                    .await
                    .map_err(|e| {
                        Error::Connection(format!(
                            "Failed to load context '{}' from the default kubeconfig: {}",
                            context, e
                        ))
                    })?
            }
            ConfigSource::Infer => kube::Config::infer()
                .await
                .map_err(|e| Error::Connection(format!("Failed to infer Kubernetes config: {}", e)))?,
        };
        kube_config.connect_timeout = Some(config.connect_timeout);
        kube_config.read_timeout = Some(config.read_timeout);
        debug!(cluster_url = %kube_config.cluster_url, "Using cluster configuration");

        let client = Client::try_from(kube_config)
            .map_err(|e| Error::Connection(format!("Failed to create Kubernetes client: {}", e)))?;

        let version = client
            .apiserver_version()
            .await
            .map_err(|e| Error::Connection(format!("API server is not reachable: {}", e)))?;
        info!(version = %version.git_version, "Connected to cluster");

        Ok(Self { client })
    }

    fn jobs(&self, project: &str) -> Api<Job> {
        Api::namespaced(self.client.clone(), project)
    }
}

/// Where connection parameters come from.
#[derive(Debug, PartialEq, Eq)]
enum ConfigSource<'a> {
    File { path: &'a Path, context: Option<&'a str> },
    DefaultKubeconfig { context: &'a str },
    Infer,
}

impl<'a> ConfigSource<'a> {
    fn select(config: &'a ClusterConfig) -> Self {
        match (config.conffile.as_deref(), config.context.as_deref()) {
            (Some(path), context) => ConfigSource::File { path, context },
            (None, Some(context)) => ConfigSource::DefaultKubeconfig { context },
            (None, None) => ConfigSource::Infer,
        }
    }
}

fn context_options(context: Option<&str>) -> KubeConfigOptions {
    KubeConfigOptions {
        context: context.map(str::to_string),
        cluster: None,
        user: None,
    }
}

#[async_trait]
impl JobApi for ClusterHandle {
    async fn create_job(&self, project: &str, job: &Job) -> Result<Job> {
        let name = job.metadata.name.as_deref().unwrap_or_default();
        self.jobs(project)
            .create(&PostParams::default(), job)
            .await
            .map_err(|e| map_kube_error(e, project, name))
    }

    async fn get_job(&self, project: &str, name: &str) -> Result<Job> {
        self.jobs(project)
            .get(name)
            .await
            .map_err(|e| map_kube_error(e, project, name))
    }

    async fn delete_job(&self, project: &str, name: &str, propagation: DeletePropagation) -> Result<()> {
        self.jobs(project)
            .delete(name, &propagation.delete_params())
            .await
            .map(|_| ())
            .map_err(|e| map_kube_error(e, project, name))
    }
}

/// Translates a kube error for job `project/name` into the crate taxonomy.
pub(crate) fn map_kube_error(err: kube::Error, project: &str, name: &str) -> Error {
    match err {
        kube::Error::Api(ae) => {
            let target = format!("job {}/{}", project, name);
            match ae.code {
                409 => Error::AlreadyExists(format!("{}: {}", target, ae.message)),
                404 => Error::NotFound(format!("{}: {}", target, ae.message)),
                400 | 422 => {
                    warn!(code = ae.code, reason = %ae.reason, "Control plane rejected request for {}", target);
                    Error::InvalidArgument(format!("{}: {}", target, ae.message))
                }
                401 | 403 => Error::Connection(format!("{}: {} ({})", target, ae.message, ae.reason)),
                code => Error::Kubernetes(format!("{}: {} (HTTP {})", target, ae.message, code)),
            }
        }
        other => Error::Connection(other.to_string()),
    }
}
