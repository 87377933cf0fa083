/// Graph execution engine
///
/// Interprets one workflow definition as a breadth-first worklist traversal:
/// a FIFO frontier of (node id, input) pairs seeded by the trigger node.
/// There is deliberately no topological sort; graphs may contain cycles
/// (retry/poll patterns) and a fixed step ceiling bounds runaway traversal.
///
/// The engine owns all routing policy: disabled-node skips, error-edge
/// recovery, and per-type edge selection (if/switch/loop). Node effects live
/// in the executor; branch decisions never do.

use crate::execution::log::{ExecutionLogEntry, ExecutionLogSink, LogLevel};
use crate::runtime::coerce::loosely_equal;
use crate::runtime::error::EngineError;
use crate::runtime::executor::NodeExecutor;
use crate::workflow::graph::WorkflowGraph;
use crate::workflow::types::{NodeType, WorkflowDefinition, WorkflowEdge};
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

/// Upper bound on node visits per run
///
/// When the ceiling is hit the run stops and returns the context accumulated
/// so far, without raising an error.
pub const MAX_STEPS: usize = 500;

/// One pending unit of work: a node and the input it will receive
///
/// Several frontier items may name the same node (loop fan-out, multi-branch
/// merges); each is executed independently in FIFO order.
#[derive(Debug, Clone)]
struct FrontierItem {
    node_id: String,
    input: Value,
}

/// Worklist-driven workflow interpreter
pub struct ExecutionEngine {
    executor: Arc<NodeExecutor>,
    log: Arc<dyn ExecutionLogSink>,
}

impl ExecutionEngine {
    pub fn new(executor: Arc<NodeExecutor>, log: Arc<dyn ExecutionLogSink>) -> Self {
        Self { executor, log }
    }

    /// Run a workflow definition to completion
    ///
    /// Returns the accumulated context map (node id → last output). A node
    /// visited multiple times overwrites its prior entry; only the last
    /// output is retrievable by later expressions.
    pub async fn run(
        &self,
        execution_id: &str,
        definition: &WorkflowDefinition,
        trigger_data: Value,
    ) -> Result<HashMap<String, Value>, EngineError> {
        let graph = WorkflowGraph::build(definition);

        let trigger = definition
            .nodes
            .iter()
            .find(|node| node.node_type.is_trigger())
            .ok_or(EngineError::NoTriggerFound)?;

        tracing::info!(
            "🚀 Starting execution {} from trigger '{}' ({} nodes)",
            execution_id,
            trigger.id,
            graph.node_count()
        );

        let mut outputs: HashMap<String, Value> = HashMap::new();
        outputs.insert(trigger.id.clone(), trigger_data.clone());
        self.log
            .append(ExecutionLogEntry::info(
                execution_id,
                &trigger.id,
                "Triggered",
                json!({ "output": trigger_data.clone() }),
            ))
            .await;

        let mut frontier: VecDeque<FrontierItem> = VecDeque::new();
        frontier.push_back(FrontierItem {
            node_id: trigger.id.clone(),
            input: trigger_data.clone(),
        });

        let mut steps = 0usize;
        while steps < MAX_STEPS {
            let Some(item) = frontier.pop_front() else {
                break;
            };
            steps += 1;

            // Dangling frontier entries (edge to a removed node) are dropped.
            let Some(node) = graph.node(&item.node_id) else {
                continue;
            };

            if !node.data.enabled {
                self.log
                    .append(ExecutionLogEntry::info(
                        execution_id,
                        &node.id,
                        "Skipped",
                        json!({ "message": "Node is disabled" }),
                    ))
                    .await;
                continue;
            }

            let outgoing = graph.outgoing(&node.id);
            let mut routed_error = false;

            // The trigger's output is the trigger payload itself; revisits
            // through a cycle re-emit it without logging.
            let output = if node.id == trigger.id {
                trigger_data.clone()
            } else {
                match self.executor.execute(node, &item.input, &outputs).await {
                    Ok(output) => {
                        self.log
                            .append(ExecutionLogEntry::info(
                                execution_id,
                                &node.id,
                                "Executed",
                                json!({ "input": item.input, "output": output.clone() }),
                            ))
                            .await;
                        output
                    }
                    Err(error) => {
                        let message = error.to_string();
                        self.log
                            .append(ExecutionLogEntry::new(
                                execution_id,
                                &node.id,
                                "Error",
                                LogLevel::Error,
                                json!({ "input": item.input, "error": message.clone() }),
                            ))
                            .await;

                        if outgoing.iter().any(|edge| edge.is_error_edge()) {
                            routed_error = true;
                            json!({ "error": message })
                        } else {
                            tracing::error!(
                                "❌ Node '{}' failed with no error edge, aborting run: {}",
                                node.id,
                                message
                            );
                            return Err(EngineError::NodeFailed {
                                node_id: node.id.clone(),
                                message,
                            });
                        }
                    }
                }
            };

            outputs.insert(node.id.clone(), output.clone());

            if routed_error {
                for edge in outgoing.iter().filter(|edge| edge.is_error_edge()) {
                    frontier.push_back(FrontierItem {
                        node_id: edge.target.clone(),
                        input: output.clone(),
                    });
                }
                continue;
            }

            self.advance(node.node_type, &node.data.config, &output, &outgoing, &mut frontier);
        }

        if steps >= MAX_STEPS {
            tracing::warn!(
                "⏱️ Execution {} hit the {}-step ceiling; returning partial context",
                execution_id,
                MAX_STEPS
            );
        } else {
            tracing::info!("🎉 Execution {} drained its frontier in {} steps", execution_id, steps);
        }

        Ok(outputs)
    }

    /// Select outgoing edges and enqueue the next frontier items
    ///
    /// Edge selection is branch-type policy, kept apart from node execution:
    /// `if` follows its boolean handle, `switch` matches its configured cases
    /// (against RAW config, since branch fields are not expression-resolved),
    /// `loop` fans out per array element, and everything else forwards to
    /// every outgoing edge regardless of handle.
    fn advance(
        &self,
        node_type: NodeType,
        raw_config: &Value,
        output: &Value,
        outgoing: &[&WorkflowEdge],
        frontier: &mut VecDeque<FrontierItem>,
    ) {
        match node_type {
            NodeType::If => {
                let took_true = output == &Value::Bool(true)
                    || output.get("result") == Some(&Value::Bool(true));
                let handle = if took_true { "true" } else { "false" };
                for edge in outgoing
                    .iter()
                    .filter(|edge| edge.source_handle.as_deref() == Some(handle))
                {
                    frontier.push_back(FrontierItem {
                        node_id: edge.target.clone(),
                        input: output.clone(),
                    });
                }
            }
            NodeType::Switch => {
                let field = raw_config.get("field").and_then(Value::as_str).unwrap_or("");
                let value = output.get(field).cloned().unwrap_or(Value::Null);
                let matched = raw_config
                    .get("cases")
                    .and_then(Value::as_array)
                    .and_then(|cases| {
                        cases.iter().find(|case| {
                            loosely_equal(case.get("value").unwrap_or(&Value::Null), &value)
                        })
                    })
                    .and_then(|case| case.get("handle").and_then(Value::as_str));
                let handle = matched.unwrap_or("default");
                for edge in outgoing
                    .iter()
                    .filter(|edge| edge.source_handle.as_deref() == Some(handle))
                {
                    frontier.push_back(FrontierItem {
                        node_id: edge.target.clone(),
                        input: output.clone(),
                    });
                }
            }
            NodeType::Loop if output.is_array() => {
                // Cross-product fan-out: N elements × M edges frontier items,
                // element-major so FIFO interleaves elements before edges.
                if let Value::Array(items) = output {
                    for item in items {
                        for edge in outgoing {
                            frontier.push_back(FrontierItem {
                                node_id: edge.target.clone(),
                                input: item.clone(),
                            });
                        }
                    }
                }
            }
            _ => {
                for edge in outgoing {
                    frontier.push_back(FrontierItem {
                        node_id: edge.target.clone(),
                        input: output.clone(),
                    });
                }
            }
        }
    }
}
