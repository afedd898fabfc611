pub mod transport;

use crate::config::{ApiType, Config};
use crate::error::{ApiErrorKind, NodeError};
use base64::Engine;
use log::{debug, warn};
use reqwest::header::{HeaderMap, CONTENT_TYPE, RETRY_AFTER};
use reqwest::{Method, StatusCode};
use serde_json::{json, Map, Value};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

pub use transport::{Body, HttpRequest, HttpResponse, ReqwestTransport, Transport, TransportError};

/// Path prefixes always served by the Data API root.
pub const DATA_API_PREFIXES: &[&str] = &[
    "/site-audit/",
    "/backlinks/",
    "/ai-search/",
    "/domain/",
    "/keywords/",
    "/serp/",
    "/url/",
];

const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Transfer {
    #[default]
    Json,
    /// `path` is an absolute URL; the response is returned as raw bytes.
    Binary,
}

/// One outbound call, as assembled by a resource builder.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    pub method: Method,
    pub path: String,
    pub query: Map<String, Value>,
    pub body: Map<String, Value>,
    /// Additional values emitted as repeated `target=` pairs.
    pub extra_targets: Vec<String>,
    pub transfer: Transfer,
}

impl RequestDescriptor {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Map::new(),
            body: Map::new(),
            extra_targets: Vec::new(),
            transfer: Transfer::Json,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// Direct download of an absolute URL.
    pub fn download(url: impl Into<String>) -> Self {
        Self {
            transfer: Transfer::Binary,
            ..Self::get(url)
        }
    }

    pub fn query(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.query.insert(key.to_string(), value.into());
        self
    }

    pub fn body(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.body.insert(key.to_string(), value.into());
        self
    }
}

/// Enforces a floor on the spacing between consecutive dispatches.
///
/// The lock is held across the wait so concurrent callers on one helper are
/// serialized rather than racing on the timestamp.
#[derive(Debug)]
pub struct Pacer {
    min_interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl Pacer {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last: Mutex::new(None),
        }
    }

    pub async fn wait_turn(&self) {
        let mut last = self.last.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.min_interval {
                let wait = self.min_interval - elapsed;
                debug!("pacing: waiting {:?} before next request", wait);
                tokio::time::sleep(wait).await;
            }
        }
        *last = Some(Instant::now());
    }
}

pub struct RequestHelper {
    transport: Box<dyn Transport>,
    pacer: Pacer,
    data_api_url: String,
    project_api_url: String,
    api_type: ApiType,
    timeout: Duration,
}

impl RequestHelper {
    pub fn new(cfg: &Config, transport: Box<dyn Transport>) -> Self {
        Self {
            transport,
            pacer: Pacer::new(cfg.min_interval()),
            data_api_url: cfg.data_api_url.trim_end_matches('/').to_string(),
            project_api_url: cfg.project_api_url.trim_end_matches('/').to_string(),
            api_type: cfg.credentials.api_type,
            timeout: cfg.timeout(),
        }
    }

    /// Helper backed by the default reqwest transport.
    pub fn from_config(cfg: &Config) -> reqwest::Result<Self> {
        Ok(Self::new(cfg, Box::new(ReqwestTransport::new(cfg)?)))
    }

    pub fn base_url_for(&self, path: &str) -> &str {
        if DATA_API_PREFIXES.iter().any(|p| path.starts_with(p)) {
            &self.data_api_url
        } else if self.api_type == ApiType::Project {
            &self.project_api_url
        } else {
            &self.data_api_url
        }
    }

    pub fn url_for(&self, desc: &RequestDescriptor) -> String {
        let mut url = match desc.transfer {
            Transfer::Binary => desc.path.clone(),
            Transfer::Json => format!("{}{}", self.base_url_for(&desc.path), desc.path),
        };
        let qs = encode_query(&desc.query, &desc.extra_targets);
        if !qs.is_empty() {
            url.push(if url.contains('?') { '&' } else { '?' });
            url.push_str(&qs);
        }
        url
    }

    /// Pace, dispatch and decode one request; failures are translated and
    /// tagged with `item`.
    pub async fn send(&self, desc: &RequestDescriptor, item: usize) -> Result<Value, NodeError> {
        self.pacer.wait_turn().await;

        let url = self.url_for(desc);
        let body = if desc.method == Method::GET {
            Body::Empty
        } else {
            encode_body(&desc.body)
        };
        let request = HttpRequest {
            method: desc.method.clone(),
            url: url.clone(),
            body,
            timeout: self.timeout,
            binary: desc.transfer == Transfer::Binary,
        };
        debug!("{} {}", request.method, url);

        let res = match self.transport.send(request).await {
            Ok(r) => r,
            Err(e) => {
                warn!("{} {} failed: {}", desc.method, url, e);
                return Err(translate_transport_error(&e, item));
            }
        };

        if !res.status.is_success() {
            warn!("{} {} returned {}", desc.method, url, res.status);
            return Err(translate_status(res.status, &res.headers, &res.body, item));
        }

        Ok(match desc.transfer {
            Transfer::Binary => binary_payload(&url, &res),
            Transfer::Json => decode_json(&res.body),
        })
    }
}

fn scalar_to_string(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(scalar_to_string)
            .collect::<Vec<_>>()
            .join(","),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Form-encode the query; each extra target becomes its own `target=` pair.
pub fn encode_query(query: &Map<String, Value>, extra_targets: &[String]) -> String {
    let mut ser = url::form_urlencoded::Serializer::new(String::new());
    for (k, v) in query {
        ser.append_pair(k, &scalar_to_string(v));
    }
    for t in extra_targets {
        ser.append_pair("target", t);
    }
    ser.finish()
}

/// JSON unless the body carries a keyword list, which the API only accepts
/// as multipart form fields.
pub fn encode_body(body: &Map<String, Value>) -> Body {
    if body.is_empty() {
        return Body::Empty;
    }
    let Some(Value::Array(keywords)) = body.get("keywords") else {
        return Body::Json(Value::Object(body.clone()));
    };
    let mut fields: Vec<(String, String)> = keywords
        .iter()
        .enumerate()
        .map(|(i, kw)| (format!("keywords[{}]", i), scalar_to_string(kw)))
        .collect();
    for key in ["cols", "sort", "sort_order"] {
        if let Some(v) = body.get(key).filter(|v| crate::params::truthy(v)) {
            fields.push((key.to_string(), scalar_to_string(v)));
        }
    }
    Body::Multipart(fields)
}

fn decode_json(body: &[u8]) -> Value {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Value::Object(Map::new());
    }
    serde_json::from_slice(body)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(body).into_owned()))
}

fn binary_payload(url: &str, res: &HttpResponse) -> Value {
    let headers: Map<String, Value> = res
        .headers
        .iter()
        .filter_map(|(k, v)| {
            v.to_str()
                .ok()
                .map(|s| (k.as_str().to_string(), Value::String(s.to_string())))
        })
        .collect();
    json!({
        "url": url,
        "status": res.status.as_u16(),
        "contentType": res.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()),
        "contentLength": res.body.len(),
        "headers": headers,
        "data": base64::engine::general_purpose::STANDARD.encode(&res.body),
    })
}

fn retry_after_secs(headers: &HeaderMap) -> u64 {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .unwrap_or(DEFAULT_RETRY_AFTER_SECS)
}

/// Message carried by an error body (`message` or `error`), else the raw text.
fn upstream_message(body: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    match serde_json::from_str::<Value>(text) {
        Ok(v) => ["message", "error"]
            .iter()
            .find_map(|k| v.get(*k).and_then(Value::as_str).map(str::to_string))
            .or_else(|| Some(text.to_string())),
        Err(_) => Some(text.to_string()),
    }
}

/// Fixed category, summary and elaboration for a status code.
pub fn map_status_to_error(
    status: StatusCode,
    headers: &HeaderMap,
) -> Option<(ApiErrorKind, &'static str, String)> {
    let mapped = match status.as_u16() {
        400 => (
            ApiErrorKind::BadRequest,
            "Bad Request - Invalid parameters",
            "Check domain format (no http://, www), source code (us, uk, de), and parameter values".to_string(),
        ),
        401 => (
            ApiErrorKind::Unauthorized,
            "Unauthorized - Invalid API credentials",
            "Check your API token in credentials. Get token from SE Ranking dashboard".to_string(),
        ),
        403 => (
            ApiErrorKind::Forbidden,
            "Forbidden - Access denied",
            "Your API key does not have permission for this operation".to_string(),
        ),
        404 => (
            ApiErrorKind::NotFound,
            "Not Found - Invalid endpoint or domain",
            "Domain may not exist in SE Ranking database or export file expired".to_string(),
        ),
        429 => (
            ApiErrorKind::RateLimited,
            "Rate Limit Exceeded",
            format!(
                "Too many requests. SE Ranking requires you to wait {} seconds. Requests are already spaced out, but SE Ranking may apply additional hourly/daily limits.",
                retry_after_secs(headers)
            ),
        ),
        500 | 502 | 503 => (
            ApiErrorKind::ServerError,
            "SE Ranking Server Error",
            "SE Ranking API is experiencing issues. Try again in a few minutes".to_string(),
        ),
        504 => (
            ApiErrorKind::GatewayTimeout,
            "Gateway Timeout - Request took too long",
            "Use a faster endpoint (e.g., Get Worldwide Aggregate instead of Get Overview)".to_string(),
        ),
        _ => return None,
    };
    Some(mapped)
}

pub fn translate_status(
    status: StatusCode,
    headers: &HeaderMap,
    body: &[u8],
    item: usize,
) -> NodeError {
    match map_status_to_error(status, headers) {
        Some((kind, message, description)) => NodeError::Api {
            kind,
            message: message.to_string(),
            description: Some(description),
            status: Some(status.as_u16()),
            item,
        },
        None => NodeError::Api {
            kind: ApiErrorKind::Upstream,
            message: upstream_message(body)
                .unwrap_or_else(|| format!("Request failed with status {}", status)),
            description: None,
            status: Some(status.as_u16()),
            item,
        },
    }
}

pub fn translate_transport_error(err: &TransportError, item: usize) -> NodeError {
    let (kind, message, description) = match err {
        TransportError::Connect(_) => (
            ApiErrorKind::ConnectionFailed,
            "Connection Failed".to_string(),
            Some("Cannot reach SE Ranking API. Check your internet connection".to_string()),
        ),
        TransportError::Timeout(_) => (
            ApiErrorKind::Timeout,
            "Request Timeout".to_string(),
            Some("Request exceeded the time limit. Try with fewer items or use a faster operation".to_string()),
        ),
        TransportError::Other(msg) => (ApiErrorKind::Upstream, msg.clone(), None),
    };
    NodeError::Api {
        kind,
        message,
        description,
        status: None,
        item,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Credentials;

    fn helper(api_type: ApiType) -> RequestHelper {
        struct Unused;
        #[async_trait::async_trait]
        impl Transport for Unused {
            async fn send(&self, _: HttpRequest) -> Result<HttpResponse, TransportError> {
                Err(TransportError::Other("unused".into()))
            }
        }
        let cfg = Config::with_credentials(Credentials {
            api_key: "k".into(),
            api_type,
        });
        RequestHelper::new(&cfg, Box::new(Unused))
    }

    #[test]
    fn base_url_selection() {
        let data = helper(ApiType::Data);
        let project = helper(ApiType::Project);
        assert_eq!(project.base_url_for("/backlinks/summary"), "https://api.seranking.com/v1");
        assert_eq!(project.base_url_for("/sites"), "https://api4.seranking.com");
        assert_eq!(data.base_url_for("/sites"), "https://api.seranking.com/v1");
    }

    #[test]
    fn repeated_targets_are_separate_pairs() {
        let mut q = Map::new();
        q.insert("target".into(), json!("a.com"));
        let qs = encode_query(&q, &["b.com".to_string(), "c.com".to_string()]);
        assert_eq!(qs, "target=a.com&target=b.com&target=c.com");
    }

    #[test]
    fn query_encodes_brackets_and_lists() {
        let mut q = Map::new();
        q.insert("cols".into(), json!(["a", "b"]));
        q.insert("filter[volume][from]".into(), json!(10));
        assert_eq!(
            encode_query(&q, &[]),
            "cols=a%2Cb&filter%5Bvolume%5D%5Bfrom%5D=10"
        );
    }

    #[test]
    fn download_url_is_used_verbatim() {
        let h = helper(ApiType::Project);
        let d = RequestDescriptor::download("https://files.example.net/export/1.csv.gz?sig=x");
        assert_eq!(h.url_for(&d), "https://files.example.net/export/1.csv.gz?sig=x");
    }

    #[test]
    fn keyword_bodies_become_multipart() {
        let mut b = Map::new();
        b.insert("keywords".into(), json!(["seo", "rust"]));
        b.insert("cols".into(), json!("volume,cpc"));
        b.insert("sort_order".into(), json!(""));
        b.insert("ignored".into(), json!(1));
        assert_eq!(
            encode_body(&b),
            Body::Multipart(vec![
                ("keywords[0]".into(), "seo".into()),
                ("keywords[1]".into(), "rust".into()),
                ("cols".into(), "volume,cpc".into()),
            ])
        );
        let mut plain = Map::new();
        plain.insert("query".into(), json!(["a"]));
        assert_eq!(encode_body(&plain), Body::Json(json!({"query": ["a"]})));
        assert_eq!(encode_body(&Map::new()), Body::Empty);
    }

    #[test]
    fn error_mapping_matrix() {
        let h = HeaderMap::new();
        let code = |s: u16| {
            translate_status(StatusCode::from_u16(s).unwrap(), &h, b"", 0)
                .kind()
                .unwrap()
        };
        assert_eq!(code(400), ApiErrorKind::BadRequest);
        assert_eq!(code(401), ApiErrorKind::Unauthorized);
        assert_eq!(code(403), ApiErrorKind::Forbidden);
        assert_eq!(code(404), ApiErrorKind::NotFound);
        assert_eq!(code(429), ApiErrorKind::RateLimited);
        assert_eq!(code(502), ApiErrorKind::ServerError);
        assert_eq!(code(504), ApiErrorKind::GatewayTimeout);
        assert_eq!(code(409), ApiErrorKind::Upstream);
    }

    #[test]
    fn rate_limit_reads_retry_after() {
        let mut h = HeaderMap::new();
        h.insert(RETRY_AFTER, "30".parse().unwrap());
        let e = translate_status(StatusCode::TOO_MANY_REQUESTS, &h, b"", 4);
        assert!(e.to_string().contains("wait 30 seconds"));
        assert_eq!(e.item(), 4);
        let e = translate_status(StatusCode::TOO_MANY_REQUESTS, &HeaderMap::new(), b"", 0);
        assert!(e.description().unwrap().contains("60 seconds"));
    }

    #[test]
    fn unmatched_status_uses_upstream_message() {
        let e = translate_status(
            StatusCode::CONFLICT,
            &HeaderMap::new(),
            br#"{"message":"Audit already running"}"#,
            2,
        );
        assert_eq!(e.to_string(), "SE Ranking API Error: Audit already running");
        let e = translate_status(StatusCode::IM_A_TEAPOT, &HeaderMap::new(), br#"{"error":"nope"}"#, 0);
        assert_eq!(e.to_string(), "SE Ranking API Error: nope");
    }

    #[test]
    fn transport_errors() {
        let e = translate_transport_error(&TransportError::Connect("refused".into()), 1);
        assert_eq!(e.kind(), Some(ApiErrorKind::ConnectionFailed));
        let e = translate_transport_error(&TransportError::Timeout("60s".into()), 1);
        assert_eq!(e.kind(), Some(ApiErrorKind::Timeout));
        let e = translate_transport_error(&TransportError::Other("tls".into()), 1);
        assert_eq!(e.to_string(), "SE Ranking API Error: tls");
    }
}
