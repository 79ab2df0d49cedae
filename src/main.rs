// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use clusterboot::config::Config;
use clusterboot::kubernetes::create_client;
use clusterboot::manifest::load_manifest_dir;
use clusterboot::{create_assets, Cluster};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;
    info!(
        "Configuration loaded: assets_dir={}, expected_nodes={}",
        config.assets_dir.display(),
        config.expected_nodes
    );

    let client = create_client(config.kubeconfig.as_deref()).await?;

    let manifests = load_manifest_dir(&config.assets_dir)
        .with_context(|| format!("loading manifests from {}", config.assets_dir.display()))?;
    info!("Loaded {} manifest files", manifests.len());

    create_assets(&client, &manifests, config.assets_timeout)
        .await
        .context("creating bootstrap assets")?;

    Cluster::new(client, config.expected_nodes)
        .verify()
        .await
        .context("verifying cluster health")?;

    info!("Cluster is up");
    Ok(())
}
