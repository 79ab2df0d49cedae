// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_EXPECTED_NODES: usize = 1;
const DEFAULT_ASSETS_TIMEOUT_SECS: u64 = 1200;

/// Bootstrap configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding rendered manifests
    pub assets_dir: PathBuf,
    /// Explicit kubeconfig path, inferred when unset
    pub kubeconfig: Option<PathBuf>,
    pub expected_nodes: usize,
    /// Bound for the API server to come up before assets are created
    pub assets_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let assets_dir = env::var("ASSETS_DIR")
            .context("ASSETS_DIR environment variable not set")?
            .into();
        let kubeconfig = env::var_os("KUBECONFIG")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);

        let expected_nodes = match env::var("EXPECTED_NODES") {
            Ok(v) => v
                .parse()
                .with_context(|| format!("EXPECTED_NODES is not a number: {}", v))?,
            Err(_) => DEFAULT_EXPECTED_NODES,
        };
        let timeout_secs = match env::var("ASSETS_TIMEOUT_SECS") {
            Ok(v) => v
                .parse()
                .with_context(|| format!("ASSETS_TIMEOUT_SECS is not a number: {}", v))?,
            Err(_) => DEFAULT_ASSETS_TIMEOUT_SECS,
        };

        Ok(Config {
            assets_dir,
            kubeconfig,
            expected_nodes,
            assets_timeout: Duration::from_secs(timeout_secs),
        })
    }
}
