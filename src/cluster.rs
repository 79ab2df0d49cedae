// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Cluster and node readiness probing

use crate::constants::cluster::{NODE_READINESS_RETRIES, PING_RETRIES, RETRY_INTERVAL};
use crate::error::{BootError, Result};
use crate::retry::retry_on_error;
use k8s_openapi::api::core::v1::{Node, NodeCondition};
use kube::{api::ListParams, Api, Client, ResourceExt};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use tabled::{Table, Tabled};
use tracing::{debug, info, instrument};

const CONDITION_READY: &str = "Ready";
const STATUS_TRUE: &str = "True";

/// Snapshot of node conditions taken by a single probe
#[derive(Debug, Clone)]
pub struct NodeStatus {
    pub conditions_by_node: BTreeMap<String, Vec<NodeCondition>>,
    pub expected_node_count: usize,
}

#[derive(Tabled)]
struct NodeRow {
    #[tabled(rename = "NODE")]
    node: String,
    #[tabled(rename = "READY")]
    ready: String,
    #[tabled(rename = "REASON")]
    reason: String,
    #[tabled(rename = "MESSAGE")]
    message: String,
}

impl NodeStatus {
    pub fn from_nodes(nodes: Vec<Node>, expected_node_count: usize) -> Self {
        let conditions_by_node = nodes
            .into_iter()
            .map(|node| {
                let name = node.name_any();
                let conditions = node
                    .status
                    .and_then(|s| s.conditions)
                    .unwrap_or_default();
                (name, conditions)
            })
            .collect();

        Self {
            conditions_by_node,
            expected_node_count,
        }
    }

    /// All expected nodes are registered and every node reports Ready=True
    pub fn ready(&self) -> bool {
        self.conditions_by_node.len() >= self.expected_node_count
            && self
                .conditions_by_node
                .values()
                .all(|conditions| ready_condition(conditions).is_some_and(|c| c.status == STATUS_TRUE))
    }

    /// Number of expected nodes that have not registered yet
    pub fn missing_nodes(&self) -> usize {
        self.expected_node_count
            .saturating_sub(self.conditions_by_node.len())
    }

    /// Render node name, readiness, reason and message as a table
    pub fn table(&self) -> String {
        let rows = self.conditions_by_node.iter().map(|(node, conditions)| {
            let ready = ready_condition(conditions);
            let field = |f: fn(&NodeCondition) -> Option<String>| {
                ready.and_then(f).unwrap_or_else(|| "-".to_string())
            };
            NodeRow {
                node: node.clone(),
                ready: ready.map_or_else(|| "Unknown".to_string(), |c| c.status.clone()),
                reason: field(|c| c.reason.clone()),
                message: field(|c| c.message.clone()),
            }
        });

        Table::new(rows).to_string()
    }
}

fn ready_condition(conditions: &[NodeCondition]) -> Option<&NodeCondition> {
    conditions.iter().find(|c| c.type_ == CONDITION_READY)
}

/// Outcome of a failed node readiness attempt
enum NodeProbeFailure {
    NotReady(NodeStatus),
    Unavailable(BootError),
}

impl fmt::Display for NodeProbeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeProbeFailure::NotReady(status) => write!(
                f,
                "{} of {} nodes registered, not all ready",
                status.conditions_by_node.len(),
                status.expected_node_count
            ),
            NodeProbeFailure::Unavailable(e) => write!(f, "cannot fetch node status: {}", e),
        }
    }
}

/// Health checks against a freshly bootstrapped cluster
pub struct Cluster {
    client: Client,
    expected_nodes: usize,
    ping_retries: u32,
    node_retries: u32,
    retry_interval: Duration,
}

impl Cluster {
    pub fn new(client: Client, expected_nodes: usize) -> Self {
        Self {
            client,
            expected_nodes,
            ping_retries: PING_RETRIES,
            node_retries: NODE_READINESS_RETRIES,
            retry_interval: RETRY_INTERVAL,
        }
    }

    pub fn with_retries(mut self, ping_retries: u32, node_retries: u32, interval: Duration) -> Self {
        self.ping_retries = ping_retries;
        self.node_retries = node_retries;
        self.retry_interval = interval;
        self
    }

    /// Check that the API server answers node list requests
    #[instrument(skip(self))]
    pub async fn ping(&self) -> Result<()> {
        let nodes: Api<Node> = Api::all(self.client.clone());

        retry_on_error(self.ping_retries, self.retry_interval, || {
            let nodes = nodes.clone();
            async move {
                nodes
                    .list(&ListParams::default().limit(1))
                    .await
                    .map(|_| ())
                    .map_err(BootError::from)
            }
        })
        .await
    }

    /// Fetch the current conditions of every node
    pub async fn get_node_status(&self) -> Result<NodeStatus> {
        let nodes: Api<Node> = Api::all(self.client.clone());
        let list = nodes.list(&ListParams::default()).await?;

        Ok(NodeStatus::from_nodes(list.items, self.expected_nodes))
    }

    async fn probe_nodes(&self) -> std::result::Result<NodeStatus, NodeProbeFailure> {
        match self.get_node_status().await {
            Ok(status) if status.ready() => Ok(status),
            Ok(status) => Err(NodeProbeFailure::NotReady(status)),
            Err(e) => Err(NodeProbeFailure::Unavailable(e)),
        }
    }

    /// Wait for the API server and for all expected nodes to become ready.
    ///
    /// On failure the last observed node table is printed.
    #[instrument(skip(self), fields(expected_nodes = self.expected_nodes))]
    pub async fn verify(&self) -> Result<()> {
        self.ping().await?;
        debug!("API server reachable, waiting for nodes");

        let cluster = self;
        match retry_on_error(self.node_retries, self.retry_interval, move || cluster.probe_nodes()).await {
            Ok(status) => {
                info!("All {} nodes are ready", status.conditions_by_node.len());
                Ok(())
            }
            Err(NodeProbeFailure::NotReady(status)) => {
                println!("{}", status.table());
                let missing = status.missing_nodes();
                if missing > 0 {
                    println!("{} node(s) have not registered yet", missing);
                }
                Err(BootError::NodesNotReady(
                    NodeProbeFailure::NotReady(status).to_string(),
                ))
            }
            Err(failure) => Err(BootError::NodesNotReady(failure.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{status_json, MockService};
    use kube::api::ObjectMeta;
    use k8s_openapi::api::core::v1::NodeStatus as K8sNodeStatus;

    fn condition(type_: &str, status: &str) -> NodeCondition {
        NodeCondition {
            type_: type_.to_string(),
            status: status.to_string(),
            reason: Some("KubeletReady".to_string()),
            message: Some("kubelet is posting ready status".to_string()),
            ..Default::default()
        }
    }

    fn make_node(name: &str, conditions: Vec<NodeCondition>) -> Node {
        Node {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                ..Default::default()
            },
            status: Some(K8sNodeStatus {
                conditions: Some(conditions),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn node_list_json(nodes: &[Node]) -> String {
        serde_json::json!({
            "apiVersion": "v1",
            "kind": "NodeList",
            "metadata": { "resourceVersion": "1" },
            "items": nodes
        })
        .to_string()
    }

    #[test]
    fn test_too_few_nodes_is_not_ready() {
        let status = NodeStatus::from_nodes(vec![make_node("a", vec![condition("Ready", "True")])], 2);

        assert!(!status.ready());
        assert_eq!(status.missing_nodes(), 1);
    }

    #[test]
    fn test_all_nodes_ready() {
        let status = NodeStatus::from_nodes(
            vec![
                make_node("a", vec![condition("Ready", "True")]),
                make_node("b", vec![condition("MemoryPressure", "False"), condition("Ready", "True")]),
            ],
            2,
        );

        assert!(status.ready());
        assert_eq!(status.missing_nodes(), 0);
    }

    #[test]
    fn test_missing_ready_condition_is_not_ready() {
        let status = NodeStatus::from_nodes(
            vec![
                make_node("a", vec![condition("Ready", "True")]),
                make_node("b", vec![condition("DiskPressure", "False")]),
            ],
            2,
        );

        assert!(!status.ready());
    }

    #[test]
    fn test_ready_false_or_unknown_is_not_ready() {
        let status = NodeStatus::from_nodes(vec![make_node("a", vec![condition("Ready", "Unknown")])], 1);
        assert!(!status.ready());
    }

    #[test]
    fn test_table_lists_every_node() {
        let status = NodeStatus::from_nodes(
            vec![
                make_node("worker-0", vec![condition("Ready", "True")]),
                make_node("worker-1", vec![]),
            ],
            3,
        );

        let table = status.table();

        assert!(table.contains("NODE"));
        assert!(table.contains("worker-0"));
        assert!(table.contains("KubeletReady"));
        assert!(table.contains("worker-1"));
        assert!(table.contains("Unknown"));
    }

    #[tokio::test]
    async fn test_verify_ready_cluster() {
        let nodes = node_list_json(&[make_node("a", vec![condition("Ready", "True")])]);
        let mock = MockService::new().on_get("/api/v1/nodes", 200, &nodes);

        let cluster = Cluster::new(mock.into_client(), 1).with_retries(2, 2, Duration::from_millis(1));

        assert!(cluster.verify().await.is_ok());
    }

    #[tokio::test]
    async fn test_verify_times_out_on_missing_nodes() {
        let nodes = node_list_json(&[make_node("a", vec![condition("Ready", "True")])]);
        let mock = MockService::new().on_get("/api/v1/nodes", 200, &nodes);

        let cluster = Cluster::new(mock.clone().into_client(), 2).with_retries(1, 3, Duration::from_millis(1));

        let err = cluster.verify().await.unwrap_err();

        assert!(matches!(err, BootError::NodesNotReady(ref msg) if msg.contains("1 of 2")));
        // one ping plus three readiness probes
        assert_eq!(mock.calls().len(), 4);
    }

    #[tokio::test]
    async fn test_ping_returns_last_error() {
        let mock = MockService::new().on_get(
            "/api/v1/nodes",
            503,
            &status_json(503, "ServiceUnavailable", "apiserver starting"),
        );

        let cluster = Cluster::new(mock.clone().into_client(), 1).with_retries(3, 1, Duration::from_millis(1));

        assert!(matches!(cluster.ping().await, Err(BootError::KubeError(_))));
        assert_eq!(mock.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_get_node_status() {
        let nodes = node_list_json(&[
            make_node("a", vec![condition("Ready", "True")]),
            make_node("b", vec![condition("Ready", "False")]),
        ]);
        let mock = MockService::new().on_get("/api/v1/nodes", 200, &nodes);

        let status = Cluster::new(mock.into_client(), 2).get_node_status().await.unwrap();

        assert_eq!(status.conditions_by_node.len(), 2);
        assert!(!status.ready());
    }
}
