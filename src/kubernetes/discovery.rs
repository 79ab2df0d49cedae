// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Resolution of group/version/kind to REST resource paths, with a per-run cache

use crate::error::{BootError, Result};
use async_trait::async_trait;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::APIResourceList;
use kube::Client;
use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::{debug, instrument};

/// A resource served under some group-version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceInfo {
    pub kind: String,
    pub plural_name: String,
    pub namespaced: bool,
}

/// Source of discovery information for one group-version at a time
#[async_trait]
pub trait DiscoveryClient: Send + Sync {
    /// List every top-level resource served under `group_version`
    async fn server_resources(&self, group_version: &str) -> Result<Vec<ResourceInfo>>;
}

/// Discovery backed by the API server
pub struct KubeDiscovery {
    client: Client,
}

impl KubeDiscovery {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DiscoveryClient for KubeDiscovery {
    async fn server_resources(&self, group_version: &str) -> Result<Vec<ResourceInfo>> {
        let list = if group_version.contains('/') {
            self.client.list_api_group_resources(group_version).await
        } else {
            self.client.list_core_api_resources(group_version).await
        }
        .map_err(|e| BootError::Discovery {
            group_version: group_version.to_string(),
            message: e.to_string(),
        })?;

        Ok(resource_infos(list))
    }
}

fn resource_infos(list: APIResourceList) -> Vec<ResourceInfo> {
    list.resources
        .into_iter()
        .filter(|r| !r.name.contains('/'))
        .map(|r| ResourceInfo {
            kind: r.kind,
            plural_name: r.name,
            namespaced: r.namespaced,
        })
        .collect()
}

/// Maps (groupVersion, kind) to [`ResourceInfo`], caching whole group-versions.
///
/// Entries are only ever added. The discovery call runs outside the lock, so
/// concurrent misses for one group-version may both query; the last insert wins.
pub struct ResourceMapper<D> {
    discovery: D,
    cache: Mutex<HashMap<String, Vec<ResourceInfo>>>,
}

impl<D: DiscoveryClient> ResourceMapper<D> {
    pub fn new(discovery: D) -> Self {
        Self {
            discovery,
            cache: Mutex::new(HashMap::new()),
        }
    }

    #[instrument(skip(self))]
    pub async fn resource_info(&self, group_version: &str, kind: &str) -> Result<ResourceInfo> {
        if let Some(info) = self.cached(group_version, kind) {
            return Ok(info);
        }

        debug!("Discovering resources for {}", group_version);
        let resources = self.discovery.server_resources(group_version).await?;
        let found = find_kind(&resources, kind);

        self.cache.lock().insert(group_version.to_string(), resources);

        found.ok_or_else(|| BootError::ResourceNotFound {
            group_version: group_version.to_string(),
            kind: kind.to_string(),
        })
    }

    fn cached(&self, group_version: &str, kind: &str) -> Option<ResourceInfo> {
        let cache = self.cache.lock();
        cache
            .get(group_version)
            .and_then(|resources| find_kind(resources, kind))
    }
}

fn find_kind(resources: &[ResourceInfo], kind: &str) -> Option<ResourceInfo> {
    resources.iter().find(|r| r.kind == kind).cloned()
}
