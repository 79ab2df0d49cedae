// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Manifest parsing, classification and loading.

pub mod parser;
pub mod source;

pub use parser::{parse_manifests, Manifest, ResourceClass};
pub use source::load_manifest_dir;
