//! Node-level error type.
//!
//! Every variant carries the index of the input item that produced it so the
//! dispatcher can correlate failures within a batch.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Category an HTTP or transport failure is translated into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiErrorKind {
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    RateLimited,
    ServerError,
    GatewayTimeout,
    ConnectionFailed,
    Timeout,
    /// Anything unmatched; the message comes from the upstream error itself.
    Upstream,
}

impl ApiErrorKind {
    pub fn code(self) -> &'static str {
        match self {
            Self::BadRequest => "bad_request",
            Self::Unauthorized => "unauthorized",
            Self::Forbidden => "forbidden",
            Self::NotFound => "not_found",
            Self::RateLimited => "rate_limited",
            Self::ServerError => "server_error",
            Self::GatewayTimeout => "gateway_timeout",
            Self::ConnectionFailed => "connection_failed",
            Self::Timeout => "timeout",
            Self::Upstream => "upstream_error",
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum NodeError {
    /// Input rejected before any network call.
    #[error("{message}")]
    Validation { message: String, item: usize },

    #[error("Unknown resource: {resource}")]
    UnknownResource { resource: String, item: usize },

    #[error("Unknown {resource} operation: {operation}")]
    UnknownOperation {
        resource: String,
        operation: String,
        item: usize,
    },

    /// Translated HTTP/transport failure.
    #[error("SE Ranking API Error: {}", render(.message, .description))]
    Api {
        kind: ApiErrorKind,
        message: String,
        description: Option<String>,
        status: Option<u16>,
        item: usize,
    },
}

fn render(message: &str, description: &Option<String>) -> String {
    match description {
        Some(d) if !d.is_empty() => format!("{} ({})", message, d),
        _ => message.to_string(),
    }
}

impl NodeError {
    pub fn validation(message: impl Into<String>, item: usize) -> Self {
        Self::Validation {
            message: message.into(),
            item,
        }
    }

    pub fn item(&self) -> usize {
        match self {
            Self::Validation { item, .. }
            | Self::UnknownResource { item, .. }
            | Self::UnknownOperation { item, .. }
            | Self::Api { item, .. } => *item,
        }
    }

    pub fn kind(&self) -> Option<ApiErrorKind> {
        match self {
            Self::Api { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// The message without the API description, e.g.
    /// `SE Ranking API Error: Rate Limit Exceeded`.
    pub fn summary(&self) -> String {
        match self {
            Self::Api { message, .. } => format!("SE Ranking API Error: {}", message),
            other => other.to_string(),
        }
    }

    pub fn description(&self) -> Option<&str> {
        match self {
            Self::Api { description, .. } => description.as_deref(),
            _ => None,
        }
    }

    /// Short machine-readable code, surfaced in JSON-RPC error data.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "invalid_params",
            Self::UnknownResource { .. } => "unknown_resource",
            Self::UnknownOperation { .. } => "unknown_operation",
            Self::Api { kind, .. } => kind.code(),
        }
    }
}
