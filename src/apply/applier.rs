// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Tiered creation of parsed manifests.

use crate::apply::crd::wait_for_crd;
use crate::constants::crd;
use crate::error::{BootError, Result};
use crate::kubernetes::discovery::{DiscoveryClient, ResourceInfo, ResourceMapper};
use crate::manifest::{Manifest, ResourceClass};
use http::header::CONTENT_TYPE;
use kube::Client;
use std::time::Duration;
use tracing::{debug, error, info, instrument};

/// Creates manifests in three tiers: namespaces, then CRDs (waiting until each
/// is served), then everything else.
pub struct Applier<'a, D> {
    client: Client,
    mapper: &'a ResourceMapper<D>,
    crd_poll_interval: Duration,
    crd_timeout: Duration,
}

/// Manifests split by creation tier
#[derive(Debug, Default)]
struct Tiers {
    namespaces: Vec<Manifest>,
    crds: Vec<Manifest>,
    others: Vec<Manifest>,
}

impl Tiers {
    fn partition(manifests: Vec<Manifest>) -> Self {
        let mut tiers = Tiers::default();
        for manifest in manifests {
            match manifest.class {
                ResourceClass::Namespace => tiers.namespaces.push(manifest),
                ResourceClass::CustomResourceDefinition => tiers.crds.push(manifest),
                ResourceClass::Other => tiers.others.push(manifest),
            }
        }
        tiers
            .others
            .sort_by(|a, b| a.source_path.cmp(&b.source_path));
        tiers
    }
}

impl<'a, D: DiscoveryClient> Applier<'a, D> {
    pub fn new(client: Client, mapper: &'a ResourceMapper<D>) -> Self {
        Self {
            client,
            mapper,
            crd_poll_interval: crd::POLL_INTERVAL,
            crd_timeout: crd::TIMEOUT,
        }
    }

    pub fn with_crd_wait(mut self, interval: Duration, timeout: Duration) -> Self {
        self.crd_poll_interval = interval;
        self.crd_timeout = timeout;
        self
    }

    /// Create all manifests, returning whether every creation succeeded.
    ///
    /// A failure among namespaces or CRDs, or a CRD that never gets served,
    /// stops the run. Failures among the remaining resources are logged and
    /// the rest are still attempted.
    #[instrument(skip_all, fields(manifests = manifests.len()))]
    pub async fn apply(&self, manifests: Vec<Manifest>) -> bool {
        let tiers = Tiers::partition(manifests);
        info!(
            "Creating {} namespaces, {} CRDs and {} other resources",
            tiers.namespaces.len(),
            tiers.crds.len(),
            tiers.others.len()
        );

        for manifest in tiers.namespaces.iter().chain(&tiers.crds) {
            if let Err(e) = self.create(manifest).await {
                error!("{}", e);
                return false;
            }
        }

        for manifest in &tiers.crds {
            if let Err(e) =
                wait_for_crd(&self.client, manifest, self.crd_poll_interval, self.crd_timeout).await
            {
                error!("Failed waiting for {}: {}", manifest, e);
                return false;
            }
        }

        let mut failed = 0usize;
        for manifest in &tiers.others {
            if let Err(e) = self.create(manifest).await {
                error!("{}", e);
                failed += 1;
            }
        }

        if failed > 0 {
            error!(
                "Failed to create {} of {} resources",
                failed,
                tiers.others.len()
            );
            return false;
        }

        info!("All resources created");
        true
    }

    /// Create a single manifest through the API server
    pub async fn create(&self, manifest: &Manifest) -> Result<()> {
        self.post(manifest)
            .await
            .map_err(|e| BootError::CreateFailed {
                manifest: manifest.to_string(),
                source: Box::new(e),
            })
    }

    async fn post(&self, manifest: &Manifest) -> Result<()> {
        let info = self
            .mapper
            .resource_info(&manifest.api_version, &manifest.kind)
            .await?;
        let url = resource_url(manifest, &info);

        let request = http::Request::post(&url)
            .header(CONTENT_TYPE, "application/json")
            .body(manifest.raw.clone())
            .map_err(kube::Error::HttpError)?;
        self.client.request_text(request).await?;

        debug!("Created {}", manifest);
        Ok(())
    }
}

/// Collection URL to POST `manifest` to
pub fn resource_url(manifest: &Manifest, info: &ResourceInfo) -> String {
    let mut url = match manifest.group_version() {
        ("", version) => format!("/api/{}", version),
        (group, version) => format!("/apis/{}/{}", group, version),
    };

    if let (true, Some(ns)) = (info.namespaced, manifest.namespace.as_deref()) {
        url.push_str("/namespaces/");
        url.push_str(ns);
    }

    url.push('/');
    url.push_str(&info.plural_name);
    url
}
