// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Waiting for DaemonSet and Deployment rollouts to converge.
//!
//! The named object is listed once and then watched from the list's
//! resourceVersion. Each added or modified object is checked against its
//! kind's convergence predicate; a deletion always aborts the wait.

use crate::constants::rollout::{REWATCH_INTERVAL, WATCH_TIMEOUT_SECS};
use crate::error::{BootError, Result};
use futures::{pin_mut, TryStreamExt};
use k8s_openapi::api::apps::v1::{DaemonSet, Deployment};
use kube::api::{ListParams, WatchEvent, WatchParams};
use kube::{Api, Client, Resource, ResourceExt};
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use std::time::Duration;
use tracing::{debug, info, instrument};

const ROLLING_UPDATE: &str = "RollingUpdate";
const CONDITION_PROGRESSING: &str = "Progressing";
const REASON_PROGRESS_DEADLINE_EXCEEDED: &str = "ProgressDeadlineExceeded";

/// Bounds for a rollout wait
#[derive(Debug, Clone)]
pub struct WaitOptions {
    /// Status observed before this generation is stale; 0 disables the check
    pub expected_generation: i64,
    pub timeout: Duration,
    /// Pause before reopening a watch the server closed
    pub rewatch_interval: Duration,
}

impl WaitOptions {
    pub fn new(expected_generation: i64, timeout: Duration) -> Self {
        Self {
            expected_generation,
            timeout,
            rewatch_interval: REWATCH_INTERVAL,
        }
    }
}

/// Workload kinds whose rollout can be awaited
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkloadKind {
    DaemonSet,
    Deployment,
}

/// A workload exposing enough status to decide whether its rollout is done
pub trait RolloutStatus {
    fn observed_generation(&self) -> i64;

    /// `Ok(false)` means keep waiting; an error means waiting is pointless
    fn is_converged(&self, fence: i64) -> Result<bool>;
}

impl RolloutStatus for Deployment {
    fn observed_generation(&self) -> i64 {
        self.status
            .as_ref()
            .and_then(|s| s.observed_generation)
            .unwrap_or_default()
    }

    fn is_converged(&self, fence: i64) -> Result<bool> {
        if self.observed_generation() < fence {
            return Ok(false);
        }
        let Some(status) = &self.status else {
            return Ok(false);
        };

        let deadline_exceeded = status.conditions.iter().flatten().any(|c| {
            c.type_ == CONDITION_PROGRESSING
                && c.reason.as_deref() == Some(REASON_PROGRESS_DEADLINE_EXCEEDED)
        });
        if deadline_exceeded {
            return Err(BootError::ProgressDeadlineExceeded(self.name_any()));
        }

        let updated = status.updated_replicas.unwrap_or_default();
        let desired = self.spec.as_ref().and_then(|s| s.replicas);
        if desired.is_some_and(|desired| updated < desired) {
            debug!("{} of {:?} replicas updated", updated, desired);
            return Ok(false);
        }
        if status.replicas.unwrap_or_default() > updated {
            debug!("old replicas are still terminating");
            return Ok(false);
        }
        if status.available_replicas.unwrap_or_default() < updated {
            debug!("updated replicas are not all available");
            return Ok(false);
        }

        Ok(true)
    }
}

impl RolloutStatus for DaemonSet {
    fn observed_generation(&self) -> i64 {
        self.status
            .as_ref()
            .and_then(|s| s.observed_generation)
            .unwrap_or_default()
    }

    fn is_converged(&self, fence: i64) -> Result<bool> {
        let strategy = self
            .spec
            .as_ref()
            .and_then(|s| s.update_strategy.as_ref())
            .and_then(|u| u.type_.as_deref())
            .unwrap_or(ROLLING_UPDATE);
        if strategy != ROLLING_UPDATE {
            return Err(BootError::UnsupportedUpdateStrategy {
                resource: self.name_any(),
                strategy: strategy.to_string(),
            });
        }

        if fence > 0 && self.observed_generation() < fence {
            return Ok(false);
        }
        let Some(status) = &self.status else {
            return Ok(false);
        };

        let desired = status.desired_number_scheduled;
        if desired == 0 {
            return Ok(false);
        }

        Ok(status.number_ready == desired
            && status.updated_number_scheduled.unwrap_or_default() == desired)
    }
}

/// Decide what a single watch event means for the wait
fn evaluate<K: RolloutStatus>(event: &WatchEvent<K>, fence: i64, resource: &str) -> Result<bool> {
    match event {
        WatchEvent::Added(obj) | WatchEvent::Modified(obj) => obj.is_converged(fence),
        WatchEvent::Deleted(_) => Err(BootError::ObjectDeleted(resource.to_string())),
        WatchEvent::Bookmark(_) => Err(BootError::UnexpectedWatchEvent {
            resource: resource.to_string(),
            event: "Bookmark".to_string(),
        }),
        WatchEvent::Error(e) => Err(BootError::UnexpectedWatchEvent {
            resource: resource.to_string(),
            event: format!("Error: {}", e.message),
        }),
    }
}

/// Wait for the named workload of `kind` to converge
pub async fn wait_for_convergence(
    client: &Client,
    kind: WorkloadKind,
    namespace: &str,
    name: &str,
    options: &WaitOptions,
) -> Result<()> {
    match kind {
        WorkloadKind::DaemonSet => wait_for_daemonset(client, namespace, name, options).await,
        WorkloadKind::Deployment => wait_for_deployment(client, namespace, name, options).await,
    }
}

pub async fn wait_for_daemonset(
    client: &Client,
    namespace: &str,
    name: &str,
    options: &WaitOptions,
) -> Result<()> {
    let api: Api<DaemonSet> = Api::namespaced(client.clone(), namespace);
    wait_for_rollout(api, namespace, name, options).await
}

pub async fn wait_for_deployment(
    client: &Client,
    namespace: &str,
    name: &str,
    options: &WaitOptions,
) -> Result<()> {
    let api: Api<Deployment> = Api::namespaced(client.clone(), namespace);
    wait_for_rollout(api, namespace, name, options).await
}

#[instrument(skip(api, options), fields(kind = %K::kind(&()), fence = options.expected_generation))]
async fn wait_for_rollout<K>(
    api: Api<K>,
    namespace: &str,
    name: &str,
    options: &WaitOptions,
) -> Result<()>
where
    K: Resource<DynamicType = ()> + RolloutStatus + Clone + DeserializeOwned + Debug,
{
    let resource = format!("{} {}/{}", K::kind(&()), namespace, name);

    match tokio::time::timeout(
        options.timeout,
        watch_until_converged(&api, name, options, &resource),
    )
    .await
    {
        Ok(result) => result,
        Err(_) => Err(BootError::RolloutTimeout(resource)),
    }
}

async fn watch_until_converged<K>(
    api: &Api<K>,
    name: &str,
    options: &WaitOptions,
    resource: &str,
) -> Result<()>
where
    K: Resource<DynamicType = ()> + RolloutStatus + Clone + DeserializeOwned + Debug,
{
    let selector = format!("metadata.name={}", name);
    let fence = options.expected_generation;

    let list = api.list(&ListParams::default().fields(&selector)).await?;
    for obj in &list.items {
        if obj.is_converged(fence)? {
            info!("{} rolled out", resource);
            return Ok(());
        }
    }
    let mut version = list
        .metadata
        .resource_version
        .unwrap_or_else(|| "0".to_string());

    loop {
        let params = WatchParams::default()
            .fields(&selector)
            .timeout(WATCH_TIMEOUT_SECS)
            .disable_bookmarks();
        let stream = api.watch(&params, &version).await?;
        pin_mut!(stream);

        while let Some(event) = stream.try_next().await? {
            if let WatchEvent::Added(obj) | WatchEvent::Modified(obj) = &event {
                if let Some(rv) = obj.resource_version() {
                    version = rv;
                }
            }

            if evaluate(&event, fence, resource)? {
                info!("{} rolled out", resource);
                return Ok(());
            }
        }

        debug!(
            "Watch on {} closed, resuming from version {} in {:?}",
            resource, version, options.rewatch_interval
        );
        tokio::time::sleep(options.rewatch_interval).await;
    }
}
