//! Operation dispatcher: runs each input item through its resource builder
//! and the request helper, in order.

use crate::error::NodeError;
use crate::http::RequestHelper;
use crate::params::{ItemParams, Parameters};
use crate::resources::{Plan, Resource};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairedItem {
    pub item: usize,
}

/// One output record, tagged with the input item it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputRecord {
    pub json: Value,
    #[serde(rename = "pairedItem")]
    pub paired_item: PairedItem,
}

impl OutputRecord {
    fn new(json: Value, item: usize) -> Self {
        Self {
            json,
            paired_item: PairedItem { item },
        }
    }
}

/// `{error, itemIndex}`; API failures keep their summary in `error` and the
/// elaboration in `description`.
fn error_record(e: &NodeError, item: usize) -> Value {
    let mut record = json!({ "error": e.summary(), "itemIndex": item });
    if let Some(d) = e.description() {
        record["description"] = json!(d);
    }
    record
}

pub struct Node {
    helper: RequestHelper,
}

impl Node {
    pub fn new(helper: RequestHelper) -> Self {
        Self { helper }
    }

    /// Execute `item_count` items sequentially.
    ///
    /// With `continue_on_fail`, a failing item yields `{error, itemIndex}` and
    /// the loop moves on; otherwise the first failure aborts the batch.
    pub async fn execute(
        &self,
        params: &dyn Parameters,
        item_count: usize,
        continue_on_fail: bool,
    ) -> Result<Vec<OutputRecord>, NodeError> {
        let mut out = Vec::new();
        for i in 0..item_count {
            let p = ItemParams::new(params, i);
            match self.execute_item(&p).await {
                Ok(Value::Array(values)) => {
                    out.extend(values.into_iter().map(|v| OutputRecord::new(v, i)))
                }
                Ok(value) => out.push(OutputRecord::new(value, i)),
                Err(e) if continue_on_fail => {
                    warn!("item {} failed, continuing: {}", i, e);
                    out.push(OutputRecord::new(error_record(&e, i), i));
                }
                Err(e) => return Err(e),
            }
        }
        Ok(out)
    }

    async fn execute_item(&self, p: &ItemParams<'_>) -> Result<Value, NodeError> {
        let name = p.string("resource");
        let resource = Resource::parse(&name).ok_or_else(|| NodeError::UnknownResource {
            resource: name.clone(),
            item: p.item,
        })?;
        let plan = resource.build(p)?;
        debug!(
            "item {}: {} {} ({} call(s))",
            p.item,
            resource.as_str(),
            p.string("operation"),
            plan.calls.len()
        );
        self.run(plan, p.item).await
    }

    async fn run(&self, plan: Plan, item: usize) -> Result<Value, NodeError> {
        let mut results = Vec::with_capacity(plan.calls.len());
        for call in &plan.calls {
            let response = self.helper.send(&call.request, item).await?;
            results.push(call.post.apply(response));
        }
        if plan.aggregate {
            return Ok(Value::Array(results));
        }
        Ok(results.pop().unwrap_or(Value::Null))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ApiType, Config, Credentials};
    use crate::error::ApiErrorKind;
    use crate::http::{HttpRequest, HttpResponse, Transport, TransportError};
    use crate::params::JsonParameters;
    use async_trait::async_trait;
    use reqwest::header::{HeaderMap, RETRY_AFTER};
    use reqwest::StatusCode;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use std::time::{Duration, Instant};

    #[derive(Default)]
    struct Recorded {
        urls: Vec<String>,
        at: Vec<Instant>,
    }

    /// Replays canned responses in order and records what was sent.
    struct FakeTransport {
        responses: Mutex<VecDeque<HttpResponse>>,
        seen: Arc<Mutex<Recorded>>,
    }

    #[async_trait]
    impl Transport for FakeTransport {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
            {
                let mut seen = self.seen.lock().unwrap();
                seen.urls.push(request.url);
                seen.at.push(Instant::now());
            }
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| TransportError::Other("no canned response".into()))
        }
    }

    fn ok(body: Value) -> HttpResponse {
        HttpResponse {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: serde_json::to_vec(&body).unwrap(),
        }
    }

    fn status(code: u16, headers: HeaderMap) -> HttpResponse {
        HttpResponse {
            status: StatusCode::from_u16(code).unwrap(),
            headers,
            body: Vec::new(),
        }
    }

    fn node(responses: Vec<HttpResponse>, min_interval_ms: u64) -> (Node, Arc<Mutex<Recorded>>) {
        let mut cfg = Config::with_credentials(Credentials {
            api_key: "test-key".into(),
            api_type: ApiType::Data,
        });
        cfg.min_interval_ms = min_interval_ms;
        let seen = Arc::new(Mutex::new(Recorded::default()));
        let transport = FakeTransport {
            responses: Mutex::new(responses.into()),
            seen: seen.clone(),
        };
        (Node::new(RequestHelper::new(&cfg, Box::new(transport))), seen)
    }

    fn params(node: Value, items: Vec<Value>) -> JsonParameters {
        let node = node.as_object().cloned().unwrap();
        let items = items
            .into_iter()
            .map(|v| v.as_object().cloned().unwrap())
            .collect();
        JsonParameters::new(node, items)
    }

    fn summary_params(domains: &[&str]) -> JsonParameters {
        params(
            json!({"resource": "backlinks", "operation": "getSummary", "mode": "as_root"}),
            domains.iter().map(|d| json!({"target": d})).collect(),
        )
    }

    #[tokio::test]
    async fn arrays_are_flattened_with_item_tags() {
        let (node, _) = node(vec![ok(json!([{"a": 1}, {"a": 2}])), ok(json!({"b": 3}))], 0);
        let p = summary_params(&["one.com", "two.com"]);
        let out = node.execute(&p, 2, false).await.unwrap();
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].paired_item.item, 0);
        assert_eq!(out[1].paired_item.item, 0);
        assert_eq!(out[2], OutputRecord::new(json!({"b": 3}), 1));
    }

    #[tokio::test]
    async fn continue_on_fail_emits_error_record() {
        let (node, seen) = node(vec![ok(json!({"ok": true}))], 0);
        let p = params(
            json!({"resource": "backlinks", "operation": "getSummary"}),
            vec![json!({"target": ""}), json!({"target": "fine.com"})],
        );
        let out = node.execute(&p, 2, true).await.unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].json["itemIndex"], 0);
        assert!(out[0].json["error"].as_str().unwrap().contains("cannot be empty"));
        assert_eq!(out[1].json, json!({"ok": true}));
        assert_eq!(seen.lock().unwrap().urls.len(), 1);
    }

    #[tokio::test]
    async fn failure_aborts_without_continue_on_fail() {
        let (node, _) = node(vec![], 0);
        let p = params(json!({"resource": "rankTracker"}), vec![json!({})]);
        let err = node.execute(&p, 1, false).await.unwrap_err();
        assert_eq!(
            err,
            NodeError::UnknownResource {
                resource: "rankTracker".into(),
                item: 0
            }
        );
    }

    #[tokio::test]
    async fn dispatches_are_spaced_by_min_interval() {
        let responses = (0..3).map(|_| ok(json!({}))).collect();
        let (node, seen) = node(responses, 60);
        let p = summary_params(&["a.com", "b.com", "c.com"]);
        node.execute(&p, 3, false).await.unwrap();
        let at = seen.lock().unwrap().at.clone();
        assert_eq!(at.len(), 3);
        // Timestamps are taken just after the pacer releases, so allow a little jitter.
        for pair in at.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_millis(55));
        }
    }

    #[tokio::test]
    async fn rate_limit_surfaces_retry_after() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, "30".parse().unwrap());
        let (node, _) = node(vec![status(429, headers)], 0);
        let p = summary_params(&["busy.com"]);
        let err = node.execute(&p, 1, false).await.unwrap_err();
        assert_eq!(err.kind(), Some(ApiErrorKind::RateLimited));
        assert!(err.to_string().contains("wait 30 seconds"));
    }

    #[tokio::test]
    async fn not_found_is_categorized() {
        let (node, _) = node(vec![status(404, HeaderMap::new())], 0);
        let p = summary_params(&["missing.com"]);
        let err = node.execute(&p, 1, false).await.unwrap_err();
        assert_eq!(err.kind(), Some(ApiErrorKind::NotFound));
        assert_eq!(err.code(), "not_found");
        assert!(err.to_string().contains("Not Found - Invalid endpoint or domain"));
        assert_eq!(
            err.description(),
            Some("Domain may not exist in SE Ranking database or export file expired")
        );
    }

    #[tokio::test]
    async fn api_error_record_keeps_description_apart() {
        let (node, _) = node(vec![status(404, HeaderMap::new()), ok(json!({"n": 1}))], 0);
        let p = summary_params(&["missing.com", "found.com"]);
        let out = node.execute(&p, 2, true).await.unwrap();
        assert_eq!(
            out[0].json,
            json!({
                "error": "SE Ranking API Error: Not Found - Invalid endpoint or domain",
                "description": "Domain may not exist in SE Ranking database or export file expired",
                "itemIndex": 0
            })
        );
        assert_eq!(out[1].json, json!({"n": 1}));
    }

    #[tokio::test]
    async fn advanced_results_aggregate_into_records() {
        let (node, seen) = node(
            vec![
                ok(json!({"status": "processing"})),
                ok(json!({"request_metadata": {"id": 2}})),
            ],
            0,
        );
        let p = params(
            json!({"resource": "serpClassic", "operation": "getAdvancedResults", "taskId": "1,2"}),
            vec![json!({})],
        );
        let out = node.execute(&p, 1, false).await.unwrap();
        assert_eq!(out[0].json, json!({"task_id": "1", "status": "processing"}));
        assert_eq!(out[1].json["request_metadata"]["id"], 2);
        let urls = &seen.lock().unwrap().urls;
        assert!(urls[0].ends_with("/serp/classic/tasks/results_advanced?task_id=1"));
    }
}
