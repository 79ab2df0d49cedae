// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

/// API group that registers custom resource definitions
pub const CRD_GROUP: &str = "apiextensions.k8s.io";

/// System namespace whose presence signals a usable API server
pub const SYSTEM_NAMESPACE: &str = "kube-system";

/// API server readiness polling
pub mod api {
    use std::time::Duration;

    /// Interval between `/healthz` probes while waiting for the API server
    pub const POLL_INTERVAL: Duration = Duration::from_secs(5);
}

/// CRD propagation polling
pub mod crd {
    use std::time::Duration;

    pub const POLL_INTERVAL: Duration = Duration::from_secs(1);
    /// Upper bound for a single CRD to become servable
    pub const TIMEOUT: Duration = Duration::from_secs(5 * 60);
}

/// Cluster health probing
pub mod cluster {
    use std::time::Duration;

    pub const PING_RETRIES: u32 = 18;
    pub const NODE_READINESS_RETRIES: u32 = 60;
    pub const RETRY_INTERVAL: Duration = Duration::from_secs(10);
}

/// Rollout watches
pub mod rollout {
    use std::time::Duration;

    /// Server-side timeout for a single watch request, in seconds
    pub const WATCH_TIMEOUT_SECS: u32 = 290;
    /// Pause before reopening a watch the server closed
    pub const REWATCH_INTERVAL: Duration = Duration::from_secs(1);
}
