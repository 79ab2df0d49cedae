// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Loading rendered manifests from disk

use crate::error::{BootError, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, instrument};

const MANIFEST_EXTENSIONS: &[&str] = &["yaml", "yml", "json"];

/// Read every manifest file below `dir`, keyed by its path relative to `dir`
#[instrument]
pub fn load_manifest_dir(dir: &Path) -> Result<BTreeMap<String, String>> {
    let mut manifests = BTreeMap::new();
    let mut pending = vec![dir.to_path_buf()];

    while let Some(current) = pending.pop() {
        let entries = fs::read_dir(&current).map_err(|e| {
            BootError::ManifestSource(format!("cannot list {}: {}", current.display(), e))
        })?;

        for entry in entries {
            let path = entry
                .map_err(|e| BootError::ManifestSource(e.to_string()))?
                .path();

            if path.is_dir() {
                pending.push(path);
                continue;
            }

            let is_manifest = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| MANIFEST_EXTENSIONS.contains(&ext));
            if !is_manifest {
                continue;
            }

            let text = fs::read_to_string(&path).map_err(|e| {
                BootError::ManifestSource(format!("cannot read {}: {}", path.display(), e))
            })?;
            let key = path
                .strip_prefix(dir)
                .unwrap_or(&path)
                .to_string_lossy()
                .into_owned();

            debug!("Loaded manifest source {}", key);
            manifests.insert(key, text);
        }
    }

    Ok(manifests)
}
