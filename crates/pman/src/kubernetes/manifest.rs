use k8s_openapi::api::batch::v1::{Job, JobSpec as K8sJobSpec};
use k8s_openapi::api::core::v1::{
    Container, HostPathVolumeSource, PodSpec, PodTemplateSpec, Volume, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::BTreeMap;

use crate::lifecycle::JobSpec;

/// In-container path the optional host directory is bound to.
pub const SHARE_MOUNT_PATH: &str = "/share";
pub const SHARE_VOLUME_NAME: &str = "share";
pub const MANAGED_BY: &str = "pman-openshift";

/// Splits a single-token command on whitespace; longer commands pass through.
///
/// `["echo test"]` becomes `["echo", "test"]`, while
/// `["sh", "-c", "echo test"]` is kept as given. No shell is involved.
pub fn normalize_command(command: &[String]) -> Vec<String> {
    match command {
        [single] => single.split_whitespace().map(str::to_string).collect(),
        tokens => tokens.to_vec(),
    }
}

fn labels(name: &str) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    labels.insert("app.kubernetes.io/name".to_string(), name.to_string());
    labels.insert("app.kubernetes.io/managed-by".to_string(), MANAGED_BY.to_string());
    labels
}

/// Builds the run-once `batch/v1` Job for `spec`.
///
/// One pod, one completion, never restarted and never replaced: a failing
/// container leaves the job `Failed`.
pub fn build_job_manifest(spec: &JobSpec) -> Job {
    let (volumes, volume_mounts) = match &spec.mount_dir {
        Some(dir) => (
            Some(vec![Volume {
                name: SHARE_VOLUME_NAME.to_string(),
                host_path: Some(HostPathVolumeSource {
                    path: dir.to_string_lossy().into_owned(),
                    ..Default::default()
                }),
                ..Default::default()
            }]),
            Some(vec![VolumeMount {
                name: SHARE_VOLUME_NAME.to_string(),
                mount_path: SHARE_MOUNT_PATH.to_string(),
                read_only: Some(false),
                ..Default::default()
            }]),
        ),
        None => (None, None),
    };

    Job {
        metadata: ObjectMeta {
            name: Some(spec.name.clone()),
            namespace: Some(spec.project.clone()),
            labels: Some(labels(&spec.name)),
            ..Default::default()
        },
        spec: Some(K8sJobSpec {
            parallelism: Some(1),
            completions: Some(1),
            backoff_limit: Some(0),
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    name: Some(spec.name.clone()),
                    labels: Some(labels(&spec.name)),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![Container {
                        name: spec.name.clone(),
                        image: Some(spec.image.clone()),
                        command: Some(normalize_command(&spec.command)),
                        volume_mounts,
                        ..Default::default()
                    }],
                    volumes,
                    restart_policy: Some("Never".to_string()),
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}
