// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BootError {
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("Failed to load kubeconfig: {0}")]
    KubeconfigError(String),

    #[error("Failed to read manifests: {0}")]
    ManifestSource(String),

    #[error("Failed to parse manifest {source_name}: {message}")]
    ManifestParse { source_name: String, message: String },

    #[error(
        "{} manifest source(s) failed to parse: {}",
        .0.len(),
        .0.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
    )]
    InvalidManifests(Vec<BootError>),

    #[error("Discovery failed for {group_version}: {message}")]
    Discovery {
        group_version: String,
        message: String,
    },

    #[error("Resource not found: kind {kind} is not served by {group_version}")]
    ResourceNotFound { group_version: String, kind: String },

    #[error("Failed to create {manifest}: {source}")]
    CreateFailed {
        manifest: String,
        #[source]
        source: Box<BootError>,
    },

    #[error("Cannot determine served version of CRD {0}")]
    CrdVersion(String),

    #[error("Timed out after {timeout:?}: {message}")]
    Timeout { message: String, timeout: Duration },

    #[error("API server not ready: {0}")]
    ApiNotReady(String),

    #[error("Failed to create one or more assets")]
    AssetsFailed,

    #[error("Nodes not ready: {0}")]
    NodesNotReady(String),

    #[error("Unsupported update strategy {strategy:?} for {resource}")]
    UnsupportedUpdateStrategy { resource: String, strategy: String },

    #[error("Deployment {0} exceeded its progress deadline")]
    ProgressDeadlineExceeded(String),

    #[error("{0} was deleted while waiting for rollout")]
    ObjectDeleted(String),

    #[error("Unexpected watch event for {resource}: {event}")]
    UnexpectedWatchEvent { resource: String, event: String },

    #[error("Timed out waiting for rollout of {0}")]
    RolloutTimeout(String),
}

pub type Result<T> = std::result::Result<T, BootError>;
