// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Creating bootstrap assets on a fresh API server.

pub mod applier;
pub mod crd;

pub use applier::Applier;
pub use crd::wait_for_crd;

use crate::constants::{api, SYSTEM_NAMESPACE};
use crate::error::{BootError, Result};
use crate::kubernetes::discovery::{KubeDiscovery, ResourceMapper};
use crate::manifest::parse_manifests;
use crate::retry::poll_immediate;
use k8s_openapi::api::core::v1::Namespace;
use kube::{Api, Client};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Wait for the API server, then parse and create every manifest in `manifests`.
///
/// `timeout` bounds the wait for the API server to become usable.
#[instrument(skip(client, manifests), fields(sources = manifests.len()))]
pub async fn create_assets(
    client: &Client,
    manifests: &BTreeMap<String, String>,
    timeout: Duration,
) -> Result<()> {
    info!("Waiting for the API server to become ready...");
    wait_for_api(client, api::POLL_INTERVAL, timeout).await?;

    let manifests = parse_manifests(manifests)?;

    let mapper = ResourceMapper::new(KubeDiscovery::new(client.clone()));
    if !Applier::new(client.clone(), &mapper).apply(manifests).await {
        return Err(BootError::AssetsFailed);
    }

    info!("All assets created");
    Ok(())
}

/// Wait until `/healthz` reports ok and the system namespace exists
pub async fn wait_for_api(client: &Client, interval: Duration, timeout: Duration) -> Result<()> {
    poll_immediate(
        interval,
        timeout,
        format!("{} namespace not available", SYSTEM_NAMESPACE),
        || {
            let client = client.clone();
            async move { Ok(api_ready(&client).await) }
        },
    )
    .await
    .map_err(|e| BootError::ApiNotReady(e.to_string()))
}

async fn api_ready(client: &Client) -> bool {
    let healthy = match http::Request::get("/healthz").body(Vec::new()) {
        Ok(request) => client
            .request_text(request)
            .await
            .is_ok_and(|body| body.trim() == "ok"),
        Err(_) => false,
    };
    if !healthy {
        debug!("API server not healthy yet");
        return false;
    }

    let namespaces: Api<Namespace> = Api::all(client.clone());
    match namespaces.get(SYSTEM_NAMESPACE).await {
        Ok(_) => true,
        Err(e) => {
            debug!("{} namespace not available yet: {}", SYSTEM_NAMESPACE, e);
            false
        }
    }
}
