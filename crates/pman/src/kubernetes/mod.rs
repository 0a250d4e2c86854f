mod client;
mod manifest;
mod resources;

pub use client::{ClusterHandle, JobApi};
pub use manifest::{build_job_manifest, normalize_command, MANAGED_BY, SHARE_MOUNT_PATH, SHARE_VOLUME_NAME};
pub use resources::JobState;

#[cfg(test)]
pub use client::MockJobApi;
