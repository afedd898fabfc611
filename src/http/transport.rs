//! The authenticated-HTTP capability the request helper dispatches through.

use crate::config::{Config, Credentials};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::multipart::Form;
use reqwest::{Client, Method, StatusCode};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Empty,
    Json(Value),
    /// Sent as `multipart/form-data`, one text part per pair.
    Multipart(Vec<(String, String)>),
}

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub body: Body,
    pub timeout: Duration,
    /// Raw bytes expected; no JSON accept header.
    pub binary: bool,
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

/// Failure before a status line was received.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("{0}")]
    Other(String),
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Default transport: reqwest with the credential attached per request.
pub struct ReqwestTransport {
    client: Client,
    credentials: Credentials,
}

impl ReqwestTransport {
    pub fn new(cfg: &Config) -> reqwest::Result<Self> {
        Ok(Self {
            client: build_client(cfg)?,
            credentials: cfg.credentials.clone(),
        })
    }
}

pub fn build_client(cfg: &Config) -> reqwest::Result<Client> {
    let mut default_headers = HeaderMap::new();
    if let Ok(ua) = HeaderValue::from_str(&cfg.user_agent) {
        default_headers.insert(USER_AGENT, ua);
    }
    // Authorization header is injected per request; the credential belongs to the host.
    Client::builder()
        .default_headers(default_headers)
        .timeout(cfg.timeout())
        .use_rustls_tls()
        .build()
}

fn auth_header(api_key: &str) -> Result<HeaderValue, TransportError> {
    HeaderValue::from_str(&format!("Token {}", api_key))
        .map_err(|_| TransportError::Other("API key contains invalid header characters".into()))
}

fn classify(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout(e.to_string())
    } else if e.is_connect() {
        TransportError::Connect(e.to_string())
    } else {
        TransportError::Other(e.to_string())
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = self
            .client
            .request(request.method, &request.url)
            .timeout(request.timeout)
            .header(AUTHORIZATION, auth_header(&self.credentials.api_key)?);
        if !request.binary {
            builder = builder.header(ACCEPT, HeaderValue::from_static("application/json"));
        }
        builder = match request.body {
            Body::Empty => builder,
            Body::Json(v) => builder.json(&v),
            Body::Multipart(fields) => {
                let form = fields
                    .into_iter()
                    .fold(Form::new(), |form, (k, v)| form.text(k, v));
                builder.multipart(form)
            }
        };

        let res = builder.send().await.map_err(classify)?;
        let status = res.status();
        let headers = res.headers().clone();
        let body = res.bytes().await.map_err(classify)?.to_vec();
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
