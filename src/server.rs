use crate::config::Config;
use crate::error::NodeError;
use crate::http::RequestHelper;
use crate::node::Node;
use crate::params::JsonParameters;
use crate::resources::Resource;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::io::{self, Write};
use tokio::io::{AsyncBufReadExt, BufReader};

pub const PROTOCOL_VERSION: &str = "2024-11-01";

// Minimal JSON-RPC 2.0 types
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum Id {
    Str(String),
    Num(i64),
    Null,
}

#[derive(Debug, Serialize, Deserialize)]
struct Request {
    jsonrpc: String,
    method: String,
    #[serde(default)]
    params: Value,
    id: Option<Id>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Response {
    jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<RpcError>,
    id: Option<Id>,
}

#[derive(Debug, Serialize, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

fn rpc_error(id: Option<Id>, code: i64, message: &str, data: Option<Value>) -> Response {
    Response {
        jsonrpc: "2.0".into(),
        result: None,
        error: Some(RpcError {
            code,
            message: message.into(),
            data,
        }),
        id,
    }
}

fn rpc_ok(id: Option<Id>, result: Value) -> Response {
    Response {
        jsonrpc: "2.0".into(),
        result: Some(result),
        error: None,
        id,
    }
}

/// Serve newline-delimited JSON-RPC requests from stdin until EOF.
pub async fn run_stdio_server() -> anyhow::Result<()> {
    info!("Starting seranking-node stdio server; protocol={}", PROTOCOL_VERSION);
    let mut server = Server::default();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let resp = match serde_json::from_str::<Request>(&line) {
            Ok(req) => {
                debug!("Received method={}", req.method);
                server.dispatch(req).await
            }
            Err(e) => rpc_error(None, -32700, &format!("Parse error: {}", e), None),
        };
        write_response(&resp)?;
    }
    Ok(())
}

fn write_response(resp: &Response) -> anyhow::Result<()> {
    let mut out = io::stdout();
    let payload = serde_json::to_string(resp)?;
    writeln!(out, "{}", payload)?;
    out.flush()?;
    Ok(())
}

/// Holds the node across requests so pacing spans the whole session.
#[derive(Default)]
struct Server {
    node: Option<Node>,
}

impl Server {
    async fn dispatch(&mut self, req: Request) -> Response {
        match req.method.as_str() {
            "initialize" => handle_initialize(req.id),
            "node/describe" => handle_describe(req.id),
            "node/execute" => self.handle_execute(req.id, req.params).await,
            other => rpc_error(req.id, -32601, &format!("Method not found: {}", other), None),
        }
    }

    fn node(&mut self) -> Result<&Node, String> {
        if self.node.is_none() {
            let cfg = Config::from_env()?;
            let helper = RequestHelper::from_config(&cfg).map_err(|e| e.to_string())?;
            self.node = Some(Node::new(helper));
        }
        self.node
            .as_ref()
            .ok_or_else(|| "node not initialized".to_string())
    }

    async fn handle_execute(&mut self, id: Option<Id>, params: Value) -> Response {
        let input: ExecuteParams = match serde_json::from_value(params) {
            Ok(v) => v,
            Err(e) => return rpc_error(id, -32602, &format!("Invalid params: {}", e), None),
        };
        let continue_on_fail = input.continue_on_fail;
        let (params, count) = input.into_parameters();
        let node = match self.node() {
            Ok(n) => n,
            Err(e) => return rpc_error(id, -32603, &e, None),
        };
        match node.execute(&params, count, continue_on_fail).await {
            Ok(records) => rpc_ok(id, json!({ "records": records })),
            Err(e) => {
                warn!("execute failed on item {}: {}", e.item(), e);
                node_error(id, &e)
            }
        }
    }
}

fn node_error(id: Option<Id>, e: &NodeError) -> Response {
    let code = match e {
        NodeError::Api { .. } => -32000,
        _ => -32602,
    };
    let mut data = json!({ "code": e.code(), "itemIndex": e.item() });
    if let NodeError::Api {
        status: Some(status),
        ..
    } = e
    {
        data["status"] = json!(status);
    }
    if let Some(d) = e.description() {
        data["description"] = json!(d);
    }
    rpc_error(id, code, &e.to_string(), Some(data))
}

fn handle_initialize(id: Option<Id>) -> Response {
    rpc_ok(
        id,
        json!({
            "server": {
                "name": "seranking-node",
                "version": env!("CARGO_PKG_VERSION"),
                "protocol": PROTOCOL_VERSION,
            }
        }),
    )
}

fn handle_describe(id: Option<Id>) -> Response {
    let resources: Vec<Value> = Resource::ALL
        .iter()
        .map(|r| {
            json!({
                "name": r.as_str(),
                "description": r.summary(),
                "operations": r.describe(),
            })
        })
        .collect();
    rpc_ok(id, json!({ "resources": resources }))
}

#[derive(Debug, Default, Deserialize)]
struct ItemInput {
    #[serde(default)]
    parameters: Map<String, Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExecuteParams {
    #[serde(default)]
    resource: Option<String>,
    #[serde(default)]
    parameters: Map<String, Value>,
    #[serde(default)]
    items: Vec<ItemInput>,
    #[serde(default)]
    continue_on_fail: bool,
}

impl ExecuteParams {
    /// Node-level parameters plus per-item overrides. A request without
    /// items runs once with the node-level parameters.
    fn into_parameters(self) -> (JsonParameters, usize) {
        let mut node = self.parameters;
        if let Some(resource) = self.resource {
            node.insert("resource".into(), Value::String(resource));
        }
        let mut items: Vec<Map<String, Value>> =
            self.items.into_iter().map(|i| i.parameters).collect();
        if items.is_empty() {
            items.push(Map::new());
        }
        let count = items.len();
        (JsonParameters::new(node, items), count)
    }
}
