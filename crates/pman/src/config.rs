use clap::ValueEnum;
use kube::api::DeleteParams;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_READ_TIMEOUT_SECS: u64 = 30;

/// What the control plane does with a job's pods when the job is deleted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ValueEnum)]
pub enum DeletePropagation {
    /// Delete the job now, garbage-collect its pods afterwards.
    #[serde(rename = "background")]
    Background,
    /// Delete the pods first, then the job.
    #[serde(rename = "foreground")]
    Foreground,
    /// Delete the job and leave its pods running.
    #[serde(rename = "orphan")]
    Orphan,
    /// Send no policy and let the API server pick its version-specific default.
    #[serde(rename = "server-default")]
    ServerDefault,
}

impl Default for DeletePropagation {
    fn default() -> Self {
        DeletePropagation::Background
    }
}

impl DeletePropagation {
    pub fn delete_params(self) -> DeleteParams {
        match self {
            DeletePropagation::Background => DeleteParams::background(),
            DeletePropagation::Foreground => DeleteParams::foreground(),
            DeletePropagation::Orphan => DeleteParams::orphan(),
            DeletePropagation::ServerDefault => DeleteParams::default(),
        }
    }
}

impl FromStr for DeletePropagation {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        <DeletePropagation as ValueEnum>::from_str(s, true).map_err(|_| {
            crate::Error::Config(format!(
                "unknown delete propagation '{}' (expected background, foreground, orphan or server-default)",
                s
            ))
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Kubeconfig file to load; `None` falls back to the ambient configuration.
    pub conffile: Option<PathBuf>,
    /// Named kubeconfig context, from `conffile` or the default kubeconfig.
    pub context: Option<String>,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            conffile: None,
            context: None,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            read_timeout: Duration::from_secs(DEFAULT_READ_TIMEOUT_SECS),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub cluster: ClusterConfig,
    #[serde(default)]
    pub delete_propagation: DeletePropagation,
}

impl Config {
    pub fn load() -> crate::Result<Self> {
        // Load environment variables from .env file if it exists
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> crate::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let config = Config {
            cluster: ClusterConfig {
                conffile: non_empty("PMAN_CONFFILE").map(PathBuf::from),
                context: non_empty("PMAN_CONTEXT"),
                connect_timeout: parse_secs(
                    "PMAN_CONNECT_TIMEOUT_SECS",
                    non_empty("PMAN_CONNECT_TIMEOUT_SECS"),
                    DEFAULT_CONNECT_TIMEOUT_SECS,
                )?,
                read_timeout: parse_secs(
                    "PMAN_READ_TIMEOUT_SECS",
                    non_empty("PMAN_READ_TIMEOUT_SECS"),
                    DEFAULT_READ_TIMEOUT_SECS,
                )?,
            },
            delete_propagation: match non_empty("PMAN_DELETE_PROPAGATION") {
                Some(value) => value.parse()?,
                None => DeletePropagation::default(),
            },
        };

        Ok(config)
    }
}

fn parse_secs(key: &str, value: Option<String>, default: u64) -> crate::Result<Duration> {
    match value {
        None => Ok(Duration::from_secs(default)),
        Some(raw) => match raw.trim().parse::<u64>() {
            Ok(0) => Err(crate::Error::Config(format!("{} must be greater than zero", key))),
            Ok(secs) => Ok(Duration::from_secs(secs)),
            Err(_) => Err(crate::Error::Config(format!(
                "{} must be a whole number of seconds, got '{}'",
                key, raw
            ))),
        },
    }
}
