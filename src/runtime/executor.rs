/// Node execution handlers
///
/// One handler per node type: HTTP calls, field merging, condition
/// evaluation, embedded Lua scripts, delays, and simulated external sends.
/// Configuration is expression-resolved against the run's accumulated
/// outputs before each handler sees it. Branch selection for `if`/`switch`
/// is NOT done here; the engine owns edge selection, so `switch` and `merge`
/// are plain passthroughs at this layer.

use crate::runtime::coerce::{display_string, loosely_equal, loosely_greater};
use crate::runtime::expression;
use crate::workflow::types::{NodeType, WorkflowNode};
use anyhow::Result;
use mlua::LuaSerdeExt;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::time::Duration;

/// Executes the side effect of a single node
///
/// Holds one shared HTTP client; everything else is per-call state.
#[derive(Debug)]
pub struct NodeExecutor {
    http: reqwest::Client,
}

impl Default for NodeExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeExecutor {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }

    /// Execute one node with raw input and the full node-output map
    ///
    /// Errors bubble to the engine, which decides between error-edge routing
    /// and aborting the run.
    pub async fn execute(
        &self,
        node: &WorkflowNode,
        input: &Value,
        outputs: &HashMap<String, Value>,
    ) -> Result<Value> {
        let config = expression::resolve(&node.data.config, outputs);
        tracing::debug!("🔧 Executing node '{}' ({:?})", node.id, node.node_type);

        match node.node_type {
            NodeType::HttpRequest => self.execute_http_request(&config).await,
            NodeType::Set => Ok(execute_set(&config, input)),
            NodeType::If => Ok(execute_if(&config, input)),
            // Branch selection happens in the engine; these just forward.
            NodeType::Switch | NodeType::Merge => Ok(input.clone()),
            NodeType::Code => execute_code(&config, input, outputs),
            NodeType::Delay => {
                let duration = config.get("duration").and_then(Value::as_u64).unwrap_or(1000);
                tokio::time::sleep(Duration::from_millis(duration)).await;
                Ok(input.clone())
            }
            NodeType::SendEmail => Ok(execute_send_email(&config)),
            NodeType::SlackMessage => self.execute_slack_message(&config).await,
            NodeType::Loop => Ok(execute_loop(&config, input)),
            NodeType::AiAgent => Ok(execute_ai_agent(&config).await),
            // Triggers supply the run's input; if one is re-visited through a
            // cycle it simply forwards what it receives.
            NodeType::ManualTrigger | NodeType::WebhookTrigger | NodeType::ScheduleTrigger => {
                Ok(input.clone())
            }
        }
    }

    /// Outbound HTTP call; returns the parsed response body
    ///
    /// Non-2xx responses are failures, handled by the engine's error-edge
    /// policy like any other node error.
    async fn execute_http_request(&self, config: &Value) -> Result<Value> {
        let url = config
            .get("url")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow::anyhow!("http-request missing 'url' configuration"))?;
        let method = config.get("method").and_then(Value::as_str).unwrap_or("GET");

        let mut request = match method.to_uppercase().as_str() {
            "GET" => self.http.get(url),
            "POST" => self.http.post(url),
            "PUT" => self.http.put(url),
            "DELETE" => self.http.delete(url),
            "PATCH" => self.http.patch(url),
            other => return Err(anyhow::anyhow!("unsupported HTTP method: {}", other)),
        };

        if let Some(headers) = config.get("headers").and_then(Value::as_array) {
            for header in headers {
                if let (Some(key), Some(value)) = (
                    header.get("key").and_then(Value::as_str),
                    header.get("value").and_then(Value::as_str),
                ) {
                    request = request.header(key, value);
                }
            }
        }

        if let Some(auth) = config.get("auth") {
            match auth.get("type").and_then(Value::as_str) {
                Some("bearer") => {
                    if let Some(token) = auth.get("token").and_then(Value::as_str) {
                        request = request.bearer_auth(token);
                    }
                }
                Some("basic") => {
                    if let (Some(username), Some(password)) = (
                        auth.get("username").and_then(Value::as_str),
                        auth.get("password").and_then(Value::as_str),
                    ) {
                        request = request.basic_auth(username, Some(password));
                    }
                }
                _ => {}
            }
        }

        match config.get("body") {
            // A string body must be valid JSON; anything structured is sent as-is.
            Some(Value::String(body)) if !body.is_empty() => {
                let parsed: Value = serde_json::from_str(body)
                    .map_err(|e| anyhow::anyhow!("http-request body is not valid JSON: {}", e))?;
                request = request.json(&parsed);
            }
            Some(body @ (Value::Object(_) | Value::Array(_))) => {
                request = request.json(body);
            }
            _ => {}
        }

        tracing::debug!("🌐 HTTP {} {}", method, url);
        let response = request
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("http request failed: {}", e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| anyhow::anyhow!("failed to read response body: {}", e))?;

        if !status.is_success() {
            return Err(anyhow::anyhow!("http request failed with status {}", status));
        }

        Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
    }

    /// Post to a Slack incoming webhook; the URL is required configuration
    async fn execute_slack_message(&self, config: &Value) -> Result<Value> {
        let webhook_url = config
            .get("webhookUrl")
            .and_then(Value::as_str)
            .filter(|url| !url.is_empty())
            .ok_or_else(|| anyhow::anyhow!("Slack webhook URL is missing"))?;

        let payload = json!({
            "text": config.get("text").cloned().unwrap_or(Value::Null),
            "channel": config.get("channel").cloned().unwrap_or(Value::Null),
        });

        self.http
            .post(webhook_url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("slack webhook call failed: {}", e))?
            .error_for_status()
            .map_err(|e| anyhow::anyhow!("slack webhook rejected the message: {}", e))?;

        Ok(json!({
            "posted": true,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        }))
    }
}

/// Shallow-merge configured key/value pairs onto the input object
fn execute_set(config: &Value, input: &Value) -> Value {
    let mut merged = match input {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    };
    if let Some(fields) = config.get("fields").and_then(Value::as_array) {
        for field in fields {
            if let Some(key) = field.get("key").and_then(Value::as_str) {
                merged.insert(
                    key.to_string(),
                    field.get("value").cloned().unwrap_or(Value::Null),
                );
            }
        }
    }
    Value::Object(merged)
}

/// Evaluate the configured conditions with AND semantics
///
/// Array inputs are evaluated against their first element. Operators the
/// engine doesn't know leave the result untouched.
fn execute_if(config: &Value, input: &Value) -> Value {
    let item = match input {
        Value::Array(items) => items.first().cloned().unwrap_or(Value::Null),
        other => other.clone(),
    };

    let mut matched = true;
    if let Some(conditions) = config.get("conditions").and_then(Value::as_array) {
        for condition in conditions {
            let field = condition.get("field").and_then(Value::as_str).unwrap_or("");
            let value = item.get(field).cloned().unwrap_or(Value::Null);
            let target = condition.get("value").cloned().unwrap_or(Value::Null);

            match condition.get("operator").and_then(Value::as_str) {
                Some("equals") => {
                    if !loosely_equal(&value, &target) {
                        matched = false;
                    }
                }
                Some("contains") => {
                    if !display_string(&value).contains(&display_string(&target)) {
                        matched = false;
                    }
                }
                Some("greaterThan") => {
                    if !loosely_greater(&value, &target) {
                        matched = false;
                    }
                }
                _ => {}
            }
        }
    }

    json!({ "result": matched })
}

/// Run the user's Lua script with `input` and `context` bindings
///
/// `context` is the full node-output map, so scripts can reach any prior
/// node's result. A nil/absent return becomes an empty object.
fn execute_code(config: &Value, input: &Value, outputs: &HashMap<String, Value>) -> Result<Value> {
    let script = config
        .get("code")
        .and_then(Value::as_str)
        .unwrap_or("return input");

    let lua = mlua::Lua::new();
    let globals = lua.globals();

    let context: Map<String, Value> = outputs
        .iter()
        .map(|(id, output)| (id.clone(), output.clone()))
        .collect();

    // mlua errors are not Send + Sync without the `send` feature, so they
    // cannot pass through `?` into anyhow directly.
    let input_value = lua
        .to_value(input)
        .map_err(|e| anyhow::anyhow!("failed to serialize script input: {}", e))?;
    let context_value = lua
        .to_value(&Value::Object(context))
        .map_err(|e| anyhow::anyhow!("failed to serialize script context: {}", e))?;

    globals
        .set("input", input_value)
        .map_err(|e| anyhow::anyhow!("failed to bind script input: {}", e))?;
    globals
        .set("context", context_value)
        .map_err(|e| anyhow::anyhow!("failed to bind script context: {}", e))?;

    // Strip host-access globals before the user script runs.
    let _ = globals.set("os", mlua::Nil);
    let _ = globals.set("io", mlua::Nil);
    let _ = globals.set("debug", mlua::Nil);
    let _ = globals.set("package", mlua::Nil);

    let result: mlua::Value = lua
        .load(script)
        .eval()
        .map_err(|e| anyhow::anyhow!("code execution failed: {}", e))?;

    let output: Value = lua
        .from_value(result)
        .map_err(|e| anyhow::anyhow!("code returned an unsupported value: {}", e))?;

    if output.is_null() {
        Ok(json!({}))
    } else {
        Ok(output)
    }
}

/// Simulated email send: logs the parameters, returns a synthetic receipt
fn execute_send_email(config: &Value) -> Value {
    let to = config.get("to").and_then(Value::as_str).unwrap_or("");
    let subject = config.get("subject").and_then(Value::as_str).unwrap_or("");
    let body = config.get("body").and_then(Value::as_str).unwrap_or("");
    tracing::info!("📧 [email] to: {} | subject: {}", to, subject);
    tracing::debug!("📧 [email] body: {}", body);

    let message_id: String = uuid::Uuid::new_v4().simple().to_string();
    json!({
        "sent": true,
        "recipient": to,
        "messageId": format!("msg_{}", &message_id[..9]),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    })
}

/// Extract the iteration array; non-arrays are normalized to one element
///
/// The fan-out itself (one frontier item per element per outgoing edge)
/// happens in the engine.
fn execute_loop(config: &Value, input: &Value) -> Value {
    let extracted = match config.get("field").and_then(Value::as_str).filter(|f| !f.is_empty()) {
        Some(field) => input.get(field).cloned().unwrap_or(Value::Null),
        None => input.clone(),
    };
    if extracted.is_array() {
        extracted
    } else {
        Value::Array(vec![extracted])
    }
}

/// Simulated LLM call: short synthetic latency, canned usage stats
async fn execute_ai_agent(config: &Value) -> Value {
    let prompt = config.get("prompt").and_then(Value::as_str).unwrap_or("");
    let model = config.get("model").and_then(Value::as_str).unwrap_or("gpt-4o");
    let preview: String = prompt.chars().take(50).collect();
    tracing::info!("🤖 [ai-agent] model: {} | prompt: {}...", model, preview);

    tokio::time::sleep(Duration::from_millis(2000)).await;

    let excerpt: String = prompt.chars().take(20).collect();
    json!({
        "response": format!("This is a simulated AI response for: \"{}...\"", excerpt),
        "model": model,
        "usage": { "prompt_tokens": 120, "completion_tokens": 45, "total_tokens": 165 },
        "timestamp": chrono::Utc::now().to_rfc3339(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn set_merges_fields_onto_input() {
        let config = json!({ "fields": [{ "key": "b", "value": 2 }, { "key": "a", "value": 9 }] });
        let merged = execute_set(&config, &json!({ "a": 1 }));
        assert_eq!(merged, json!({ "a": 9, "b": 2 }));
    }

    #[test]
    fn set_on_non_object_starts_empty() {
        let config = json!({ "fields": [{ "key": "x", "value": "y" }] });
        assert_eq!(execute_set(&config, &json!(5)), json!({ "x": "y" }));
    }

    #[test]
    fn if_equals_is_loose() {
        let config = json!({ "conditions": [{ "field": "n", "operator": "equals", "value": "1" }] });
        assert_eq!(execute_if(&config, &json!({ "n": 1 })), json!({ "result": true }));
        assert_eq!(execute_if(&config, &json!({ "n": 2 })), json!({ "result": false }));
    }

    #[test]
    fn if_uses_first_element_of_array_input() {
        let config = json!({ "conditions": [{ "field": "ok", "operator": "equals", "value": "yes" }] });
        let input = json!([{ "ok": "yes" }, { "ok": "no" }]);
        assert_eq!(execute_if(&config, &input), json!({ "result": true }));
    }

    #[test]
    fn if_conditions_combine_with_and() {
        let config = json!({ "conditions": [
            { "field": "a", "operator": "equals", "value": "1" },
            { "field": "b", "operator": "greaterThan", "value": "5" },
        ]});
        assert_eq!(
            execute_if(&config, &json!({ "a": "1", "b": 6 })),
            json!({ "result": true })
        );
        assert_eq!(
            execute_if(&config, &json!({ "a": "1", "b": 3 })),
            json!({ "result": false })
        );
    }

    #[test]
    fn loop_extracts_field_and_normalizes() {
        let config = json!({ "field": "items" });
        assert_eq!(
            execute_loop(&config, &json!({ "items": [1, 2, 3] })),
            json!([1, 2, 3])
        );
        assert_eq!(execute_loop(&config, &json!({ "items": 7 })), json!([7]));
        assert_eq!(execute_loop(&json!({}), &json!([4, 5])), json!([4, 5]));
        assert_eq!(execute_loop(&json!({}), &json!("solo")), json!(["solo"]));
    }

    #[test]
    fn code_runs_lua_with_bindings() {
        let config = json!({ "code": "return { doubled = input.n * 2, seen = context.prev.x }" });
        let mut outputs = HashMap::new();
        outputs.insert("prev".to_string(), json!({ "x": "hello" }));
        let result = execute_code(&config, &json!({ "n": 21 }), &outputs).unwrap();
        assert_eq!(result, json!({ "doubled": 42, "seen": "hello" }));
    }

    #[test]
    fn code_nil_result_becomes_empty_object() {
        let result = execute_code(&json!({ "code": "return nil" }), &json!({}), &HashMap::new());
        assert_eq!(result.unwrap(), json!({}));
    }

    #[test]
    fn code_error_is_reported() {
        let result = execute_code(&json!({ "code": "error('boom')" }), &json!({}), &HashMap::new());
        let message = result.unwrap_err().to_string();
        assert!(message.contains("code execution failed"), "{message}");
        assert!(message.contains("boom"), "{message}");
    }

    #[test]
    fn code_host_globals_are_stripped() {
        let result = execute_code(&json!({ "code": "return os" }), &json!({}), &HashMap::new());
        assert_eq!(result.unwrap(), json!({}));
    }

    #[test]
    fn send_email_returns_synthetic_receipt() {
        let receipt = execute_send_email(&json!({ "to": "a@b.c", "subject": "hi", "body": "x" }));
        assert_eq!(receipt["sent"], json!(true));
        assert_eq!(receipt["recipient"], json!("a@b.c"));
        assert!(receipt["messageId"].as_str().unwrap().starts_with("msg_"));
    }
}
