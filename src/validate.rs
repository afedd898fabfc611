//! Input checks applied by the resource builders before any network call.

use crate::error::NodeError;
use chrono::NaiveDate;
use thiserror::Error;

pub const MAX_KEYWORDS: usize = 1000;
pub const MAX_KEYWORD_LEN: usize = 255;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct Invalid(pub String);

impl Invalid {
    pub fn at(self, item: usize) -> NodeError {
        NodeError::validation(self.0, item)
    }
}

fn invalid<T>(msg: impl Into<String>) -> Result<T, Invalid> {
    Err(Invalid(msg.into()))
}

/// Normalize a domain: strip scheme, `www.`, any path/query/port, lower-case.
pub fn domain(input: &str) -> Result<String, Invalid> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return invalid("Domain cannot be empty");
    }
    let mut host = trimmed.to_ascii_lowercase();
    if let Some(pos) = host.find("://") {
        host = host[pos + 3..].to_string();
    }
    if let Some(pos) = host.find(['/', '?', '#']) {
        host.truncate(pos);
    }
    if let Some(pos) = host.find(':') {
        host.truncate(pos);
    }
    let host = host.strip_prefix("www.").unwrap_or(&host).trim_end_matches('.');

    let well_formed = host.contains('.')
        && host.split('.').all(|label| {
            !label.is_empty()
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label
                    .chars()
                    .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
        });
    if !well_formed {
        return invalid(format!(
            "Invalid domain '{}': expected a bare domain such as example.com",
            input.trim()
        ));
    }
    Ok(host.to_string())
}

/// Regional database code (`us`, `uk`, `de`, ...).
pub fn source(input: &str) -> Result<String, Invalid> {
    let s = input.trim().to_ascii_lowercase();
    if s.is_empty() {
        return invalid("Source cannot be empty");
    }
    if !(2..=3).contains(&s.len()) || !s.chars().all(|c| c.is_ascii_lowercase()) {
        return invalid(format!(
            "Invalid source '{}': use a regional database code such as us, uk, de",
            input.trim()
        ));
    }
    Ok(s)
}

/// Strict `YYYY-MM-DD`, and the date must exist.
pub fn date(input: &str) -> Result<String, Invalid> {
    let s = input.trim();
    let shape_ok = s.len() == 10
        && s.char_indices().all(|(i, c)| match i {
            4 | 7 => c == '-',
            _ => c.is_ascii_digit(),
        });
    if !shape_ok || NaiveDate::parse_from_str(s, "%Y-%m-%d").is_err() {
        return invalid(format!("Date must be in YYYY-MM-DD format (got '{}')", s));
    }
    Ok(s.to_string())
}

/// Absolute http(s) URL.
pub fn absolute_url(input: &str) -> Result<String, Invalid> {
    let s = input.trim();
    if s.is_empty() {
        return invalid("URL cannot be empty");
    }
    match url::Url::parse(s) {
        Ok(u) if matches!(u.scheme(), "http" | "https") && u.host_str().is_some() => {
            Ok(s.to_string())
        }
        _ => invalid(format!(
            "Invalid URL '{}': include the scheme, e.g. https://example.com/page",
            s
        )),
    }
}

pub fn non_empty(input: &str, label: &str) -> Result<String, Invalid> {
    let s = input.trim();
    if s.is_empty() {
        return invalid(format!("{} cannot be empty", label));
    }
    Ok(s.to_string())
}

/// Split a comma/newline separated list, dropping blanks.
pub fn split_list(input: &str) -> Vec<String> {
    input
        .split([',', '\n'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn keywords(input: &str) -> Result<Vec<String>, Invalid> {
    if input.trim().is_empty() {
        return invalid("Keywords cannot be empty");
    }
    let list = split_list(input);
    if list.is_empty() {
        return invalid("Provide at least one keyword");
    }
    if list.len() > MAX_KEYWORDS {
        return invalid(format!("Maximum {} keywords per request", MAX_KEYWORDS));
    }
    if list.iter().any(|k| k.chars().count() > MAX_KEYWORD_LEN) {
        return invalid(format!(
            "Each keyword must be {} characters or fewer",
            MAX_KEYWORD_LEN
        ));
    }
    Ok(list)
}

pub fn task_ids(input: &str) -> Result<Vec<String>, Invalid> {
    if input.trim().is_empty() {
        return invalid("Task ID(s) required");
    }
    let list = split_list(input);
    if list.is_empty() {
        return invalid("Provide at least one task ID");
    }
    Ok(list)
}
