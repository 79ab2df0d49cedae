// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Client creation from kubeconfig files

use crate::error::{BootError, Result};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config as KConfig};
use std::path::Path;
use tracing::{debug, info, instrument};

/// Create a client from an explicit kubeconfig, or infer one from the environment
#[instrument]
pub async fn create_client(kubeconfig: Option<&Path>) -> Result<Client> {
    let config = match kubeconfig {
        Some(path) => {
            info!("Loading kubeconfig from {}", path.display());
            config_from_file(path).await?
        }
        None => {
            debug!("No kubeconfig given, inferring configuration");
            KConfig::infer()
                .await
                .map_err(|e| BootError::KubeconfigError(format!("Failed to infer config: {}", e)))?
        }
    };

    Client::try_from(config)
        .map_err(|e| BootError::KubeconfigError(format!("Failed to create client: {}", e)))
}

async fn config_from_file(path: &Path) -> Result<KConfig> {
    let kubeconfig = Kubeconfig::read_from(path).map_err(|e| {
        BootError::KubeconfigError(format!("Failed to read {}: {}", path.display(), e))
    })?;

    KConfig::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
        .await
        .map_err(|e| BootError::KubeconfigError(format!("Failed to create config: {}", e)))
}
