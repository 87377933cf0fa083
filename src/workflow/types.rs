/// Core workflow type definitions
///
/// Defines the graph structures the execution engine interprets: a workflow
/// definition is an immutable snapshot of typed nodes plus directed edges.
/// These types mirror the JSON produced by the visual editor and are stored
/// verbatim in SQLite.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A complete workflow graph: nodes and the edges connecting them
///
/// The engine never mutates a definition; one snapshot is passed into one run.
/// The graph may contain cycles on purpose (retry/poll patterns); the engine
/// bounds runaway traversal with a step ceiling instead of rejecting cycles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    /// Nodes in this workflow
    pub nodes: Vec<WorkflowNode>,
    /// Directed edges between nodes
    pub edges: Vec<WorkflowEdge>,
}

/// A single node in the workflow graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowNode {
    /// Unique node identifier within the workflow (e.g. "n1", "http-1")
    pub id: String,
    /// The node type, which determines execution behavior
    #[serde(rename = "type")]
    pub node_type: NodeType,
    /// Editor canvas position. UI-only; ignored by the engine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    /// Node payload: label, enabled flag and type-specific configuration
    #[serde(default)]
    pub data: NodeData,
}

/// Editor canvas coordinates
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// Node payload carried under `data` in the wire format
///
/// `config` values may contain `{{nodeId.path}}` expression tokens which are
/// resolved against prior node outputs just before execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Disabled nodes are skipped during traversal without advancing edges
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Type-specific configuration, free-form JSON
    #[serde(default)]
    pub config: Value,
}

impl Default for NodeData {
    fn default() -> Self {
        Self {
            label: None,
            description: None,
            enabled: true,
            config: Value::Null,
        }
    }
}

fn default_enabled() -> bool {
    true
}

/// Available node types
///
/// Trigger types are entry points: they supply the run's initial input and
/// are never executed by the node executor. All other types perform an
/// effect (or a pure transform) and hand their output to outgoing edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeType {
    /// Manual trigger: run started from the UI or API
    ManualTrigger,
    /// Webhook trigger: run started by an inbound HTTP request
    /// Expected config: { "path": "/orders", "method": "POST" }
    WebhookTrigger,
    /// Schedule trigger: run started by the background cron service
    /// Expected config: { "cron": "0 */5 * * * *" }
    ScheduleTrigger,
    /// Outbound HTTP call; returns the response body
    /// Expected config: { "url", "method", "headers": [{key,value}], "body", "auth" }
    HttpRequest,
    /// Simulated email send (logs parameters, returns a synthetic message id)
    SendEmail,
    /// Slack message via incoming webhook URL (real outbound call)
    SlackMessage,
    /// Shallow-merge configured fields onto the input object
    /// Expected config: { "fields": [{ "key", "value" }] }
    Set,
    /// Condition evaluation; outputs { "result": bool }, branch selection
    /// happens in the engine via the true/false edge handles
    If,
    /// Passthrough; the engine matches output[config.field] against
    /// config.cases and follows the matching case handle (or "default")
    Switch,
    /// Identity passthrough; inbound branches are interleaved, not joined
    Merge,
    /// User-supplied Lua script with `input` and `context` bindings
    /// Expected config: { "code": "return { n = input.n + 1 }" }
    Code,
    /// Extracts an array from the input; the engine fans out one frontier
    /// item per element per outgoing edge
    /// Expected config: { "field": "items" }
    Loop,
    /// Suspends for config.duration milliseconds, then passes input through
    Delay,
    /// Simulated LLM call returning generated text and usage stats
    /// Expected config: { "prompt", "model", "systemPrompt" }
    AiAgent,
}

impl NodeType {
    /// Trigger nodes start a run and supply its initial input
    pub fn is_trigger(&self) -> bool {
        matches!(
            self,
            NodeType::ManualTrigger | NodeType::WebhookTrigger | NodeType::ScheduleTrigger
        )
    }
}

/// Directed connection between two nodes
///
/// `source_handle` is the named output port the edge leaves from. It is
/// contract-significant for `if` ("true"/"false"), `switch` (case labels /
/// "default") and error routing ("error"); other node types ignore it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowEdge {
    pub id: String,
    /// Source node id
    pub source: String,
    /// Target node id
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<String>,
}

impl WorkflowEdge {
    /// Whether this edge is a local error recovery path
    pub fn is_error_edge(&self) -> bool {
        self.source_handle.as_deref() == Some("error")
    }
}

/// A workflow as persisted: identity plus its graph definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredWorkflow {
    pub id: String,
    pub name: String,
    pub definition: WorkflowDefinition,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn node_type_round_trips_kebab_case() {
        let t: NodeType = serde_json::from_value(json!("http-request")).unwrap();
        assert_eq!(t, NodeType::HttpRequest);
        assert_eq!(serde_json::to_value(NodeType::AiAgent).unwrap(), json!("ai-agent"));
        assert!(serde_json::from_value::<NodeType>(json!("webhook-trigger"))
            .unwrap()
            .is_trigger());
    }

    #[test]
    fn node_data_defaults_to_enabled() {
        let node: WorkflowNode =
            serde_json::from_value(json!({ "id": "n1", "type": "set", "data": {} })).unwrap();
        assert!(node.data.enabled);
        assert!(node.data.config.is_null());
    }

    #[test]
    fn edge_handles_deserialize_camel_case() {
        let edge: WorkflowEdge = serde_json::from_value(json!({
            "id": "e1", "source": "a", "target": "b", "sourceHandle": "error"
        }))
        .unwrap();
        assert!(edge.is_error_edge());
    }
}
