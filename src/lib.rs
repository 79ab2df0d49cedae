// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
pub mod apply;
pub mod cluster;
pub mod config;
pub mod constants;
pub mod error;
pub mod kubernetes;
pub mod manifest;
pub mod retry;
pub mod rollout;

#[cfg(test)]
pub(crate) mod test_utils;

pub use apply::create_assets;
pub use cluster::{Cluster, NodeStatus};
pub use error::{BootError, Result};
pub use rollout::{wait_for_daemonset, wait_for_deployment, WaitOptions, WorkloadKind};
