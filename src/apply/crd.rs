// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Waiting for freshly created CRDs to be served

use crate::error::{BootError, Result};
use crate::manifest::Manifest;
use crate::retry::poll_immediate;
use kube::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{info, instrument, trace};

#[derive(Deserialize, Debug)]
struct CrdDocument {
    #[serde(default)]
    metadata: CrdMetadata,
    spec: CrdSpec,
}

#[derive(Deserialize, Debug, Default)]
struct CrdMetadata {
    #[serde(default)]
    name: String,
}

#[derive(Deserialize, Debug)]
struct CrdSpec {
    group: String,
    names: CrdNames,
    /// Single version field of v1beta1 definitions
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    versions: Vec<CrdVersion>,
}

#[derive(Deserialize, Debug)]
struct CrdNames {
    plural: String,
}

#[derive(Deserialize, Debug)]
struct CrdVersion {
    name: String,
    #[serde(default)]
    served: bool,
}

impl CrdSpec {
    fn served_version(&self) -> Option<&str> {
        if self.versions.is_empty() {
            return self.version.as_deref().filter(|v| !v.is_empty());
        }
        self.versions
            .iter()
            .find(|v| v.served)
            .map(|v| v.name.as_str())
    }
}

/// Collection URL that answers once the CRD is served
fn collection_url(manifest: &Manifest) -> Result<(String, String)> {
    let doc: CrdDocument = serde_json::from_slice(&manifest.raw)
        .map_err(|e| BootError::CrdVersion(format!("{}: {}", manifest, e)))?;
    let version = doc
        .spec
        .served_version()
        .ok_or_else(|| BootError::CrdVersion(manifest.to_string()))?;

    let url = format!("/apis/{}/{}/{}", doc.spec.group, version, doc.spec.names.plural);
    Ok((doc.metadata.name, url))
}

/// Block until the collection endpoint of `manifest`'s CRD stops returning 404.
///
/// Any other API error aborts the wait.
#[instrument(skip(client, manifest), fields(manifest = %manifest))]
pub async fn wait_for_crd(
    client: &Client,
    manifest: &Manifest,
    interval: Duration,
    timeout: Duration,
) -> Result<()> {
    let (name, url) = collection_url(manifest)?;

    poll_immediate(
        interval,
        timeout,
        format!("CRD {} was not served at {}", name, url),
        || {
            let client = client.clone();
            let url = url.clone();
            async move {
                let request = http::Request::get(&url)
                    .body(Vec::new())
                    .map_err(kube::Error::HttpError)?;
                match client.request_text(request).await {
                    Ok(_) => Ok(true),
                    Err(kube::Error::Api(err)) if err.code == 404 => {
                        trace!("{} not served yet", url);
                        Ok(false)
                    }
                    Err(e) => Err(e.into()),
                }
            }
        },
    )
    .await?;

    info!("CRD {} is served", name);
    Ok(())
}
