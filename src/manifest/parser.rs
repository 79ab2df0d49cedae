// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Multi-document manifest parsing and tier classification

use crate::constants::CRD_GROUP;
use crate::error::{BootError, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, instrument};

/// Creation tier a manifest belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceClass {
    Namespace,
    CustomResourceDefinition,
    Other,
}

impl ResourceClass {
    fn classify(api_version: &str, kind: &str) -> Self {
        match (api_version, kind) {
            ("v1", "Namespace") => ResourceClass::Namespace,
            (api_version, "CustomResourceDefinition")
                if api_version
                    .split_once('/')
                    .is_some_and(|(group, _)| group == CRD_GROUP) =>
            {
                ResourceClass::CustomResourceDefinition
            }
            _ => ResourceClass::Other,
        }
    }
}

/// A single resource read from a manifest source
#[derive(Debug, Clone)]
pub struct Manifest {
    pub kind: String,
    pub api_version: String,
    pub namespace: Option<String>,
    pub name: String,
    /// JSON encoding of the document, posted as-is
    pub raw: Vec<u8>,
    pub source_path: String,
    pub class: ResourceClass,
}

impl Manifest {
    fn from_value(value: &Value, source_path: &str) -> Result<Self> {
        let field = |pointer: &str| value.pointer(pointer).and_then(Value::as_str);
        let malformed = |message: &str| BootError::ManifestParse {
            source_name: source_path.to_string(),
            message: message.to_string(),
        };

        let api_version = field("/apiVersion").ok_or_else(|| malformed("missing apiVersion"))?;
        let kind = field("/kind").ok_or_else(|| malformed("missing kind"))?;
        let raw = serde_json::to_vec(value).map_err(|e| malformed(&e.to_string()))?;

        Ok(Manifest {
            kind: kind.to_string(),
            api_version: api_version.to_string(),
            namespace: field("/metadata/namespace")
                .filter(|ns| !ns.is_empty())
                .map(str::to_string),
            name: field("/metadata/name").unwrap_or_default().to_string(),
            raw,
            source_path: source_path.to_string(),
            class: ResourceClass::classify(api_version, kind),
        })
    }

    /// Split the apiVersion into (group, version), the core group being empty
    pub fn group_version(&self) -> (&str, &str) {
        self.api_version
            .split_once('/')
            .unwrap_or(("", self.api_version.as_str()))
    }
}

impl fmt::Display for Manifest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{} {} {}/{}", self.source_path, self.kind, ns, self.name),
            None => write!(f, "{} {} {}", self.source_path, self.kind, self.name),
        }
    }
}

/// Parse every source into manifests.
///
/// Sources are parsed independently; if any of them fails, all failures are
/// returned together.
#[instrument(skip(sources), fields(sources = sources.len()))]
pub fn parse_manifests(sources: &BTreeMap<String, String>) -> Result<Vec<Manifest>> {
    let mut manifests = Vec::new();
    let mut errors = Vec::new();

    for (name, text) in sources {
        match parse_source(name, text) {
            Ok(parsed) => manifests.extend(parsed),
            Err(e) => errors.push(e),
        }
    }

    if !errors.is_empty() {
        return Err(BootError::InvalidManifests(errors));
    }

    debug!("Parsed {} manifests", manifests.len());
    Ok(manifests)
}

/// Parse one source, stopping at its first malformed document
pub fn parse_source(source_name: &str, text: &str) -> Result<Vec<Manifest>> {
    let mut manifests = Vec::new();

    for document in split_documents(text) {
        if is_blank(document) {
            continue;
        }

        let values = parse_document(document).map_err(|message| BootError::ManifestParse {
            source_name: source_name.to_string(),
            message,
        })?;
        for value in &values {
            collect(value, source_name, &mut manifests)?;
        }
    }

    Ok(manifests)
}

fn collect(value: &Value, source_name: &str, out: &mut Vec<Manifest>) -> Result<()> {
    if value.is_null() {
        return Ok(());
    }

    let is_list = value
        .get("kind")
        .and_then(Value::as_str)
        .is_some_and(|kind| kind.ends_with("List"));

    if is_list {
        let items = value
            .get("items")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();
        for item in items {
            collect(item, source_name, out)?;
        }
        return Ok(());
    }

    out.push(Manifest::from_value(value, source_name)?);
    Ok(())
}

/// Decode a document as a JSON value stream or a single YAML document with
/// merge keys resolved
fn parse_document(document: &str) -> std::result::Result<Vec<Value>, String> {
    if document.trim_start().starts_with('{') {
        return serde_json::Deserializer::from_str(document)
            .into_iter::<Value>()
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| format!("invalid JSON: {}", e));
    }

    let mut yaml: serde_yaml::Value =
        serde_yaml::from_str(document).map_err(|e| format!("invalid YAML: {}", e))?;
    yaml.apply_merge()
        .map_err(|e| format!("invalid YAML merge key: {}", e))?;
    let value = serde_json::to_value(yaml).map_err(|e| format!("unsupported YAML: {}", e))?;

    Ok(vec![value])
}

/// Split on `---` separator lines, which may carry a trailing comment
fn split_documents(text: &str) -> Vec<&str> {
    let mut documents = Vec::new();
    let mut start = 0;
    let mut offset = 0;

    for line in text.split_inclusive('\n') {
        if is_separator(line) {
            documents.push(&text[start..offset]);
            start = offset + line.len();
        }
        offset += line.len();
    }
    documents.push(&text[start..]);
    documents
}

fn is_separator(line: &str) -> bool {
    line.strip_prefix("---").is_some_and(|rest| {
        let rest = rest.trim();
        rest.is_empty() || rest.starts_with('#')
    })
}

/// Empty, whitespace-only or comment-only documents
fn is_blank(document: &str) -> bool {
    document
        .lines()
        .map(str::trim)
        .all(|line| line.is_empty() || line.starts_with('#'))
}
