//! Resource builders: one module per SE Ranking API area.
//!
//! A builder turns the parameters of one input item into a [`Plan`]: the
//! request descriptors to send and how to reshape each response.

pub mod ai_search;
pub mod backlinks;
pub mod domain_analysis;
pub mod keyword_research;
pub mod serp_classic;
pub mod website_audit;

use crate::error::NodeError;
use crate::http::RequestDescriptor;
use crate::params::{FieldSpec, ItemParams};
use crate::validate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Resource {
    AiSearch,
    Backlinks,
    DomainAnalysis,
    KeywordResearch,
    SerpClassic,
    WebsiteAudit,
}

impl Resource {
    pub const ALL: &'static [Resource] = &[
        Resource::AiSearch,
        Resource::Backlinks,
        Resource::DomainAnalysis,
        Resource::KeywordResearch,
        Resource::SerpClassic,
        Resource::WebsiteAudit,
    ];

    pub fn parse(name: &str) -> Option<Self> {
        serde_json::from_value(Value::String(name.to_string())).ok()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Resource::AiSearch => "aiSearch",
            Resource::Backlinks => "backlinks",
            Resource::DomainAnalysis => "domainAnalysis",
            Resource::KeywordResearch => "keywordResearch",
            Resource::SerpClassic => "serpClassic",
            Resource::WebsiteAudit => "websiteAudit",
        }
    }

    pub fn summary(self) -> &'static str {
        match self {
            Resource::AiSearch => "LLM visibility and AI search data",
            Resource::Backlinks => "Backlink analysis and authority metrics",
            Resource::DomainAnalysis => "Domain keyword rankings and competitor analysis",
            Resource::KeywordResearch => "Keyword metrics, volume, CPC, and related keywords",
            Resource::SerpClassic => "SERP tracking and results retrieval",
            Resource::WebsiteAudit => "Site crawling, technical SEO, and on-page analysis",
        }
    }

    /// Read `operation` for the item and build its plan.
    pub fn build(self, p: &ItemParams) -> Result<Plan, NodeError> {
        match self {
            Resource::AiSearch => build_with::<ai_search::Operation>(p),
            Resource::Backlinks => build_with::<backlinks::Operation>(p),
            Resource::DomainAnalysis => build_with::<domain_analysis::Operation>(p),
            Resource::KeywordResearch => build_with::<keyword_research::Operation>(p),
            Resource::SerpClassic => build_with::<serp_classic::Operation>(p),
            Resource::WebsiteAudit => build_with::<website_audit::Operation>(p),
        }
    }

    pub fn describe(self) -> Vec<OperationInfo> {
        match self {
            Resource::AiSearch => describe::<ai_search::Operation>(),
            Resource::Backlinks => describe::<backlinks::Operation>(),
            Resource::DomainAnalysis => describe::<domain_analysis::Operation>(),
            Resource::KeywordResearch => describe::<keyword_research::Operation>(),
            Resource::SerpClassic => describe::<serp_classic::Operation>(),
            Resource::WebsiteAudit => describe::<website_audit::Operation>(),
        }
    }
}

/// The operations of one resource, as an enum-keyed dispatch table.
pub trait Operations: Copy + Serialize + DeserializeOwned + 'static {
    const RESOURCE: Resource;

    fn all() -> &'static [Self];
    fn summary(self) -> &'static str;
    /// Top-level parameters the operation reads unconditionally.
    fn required(self) -> &'static [&'static str];
    /// Optional fields copied from the operation's collection parameter.
    fn fields(self) -> &'static [FieldSpec] {
        &[]
    }
    /// Name of the collection parameter holding the optional fields.
    fn collection(self) -> &'static str {
        "additionalFields"
    }
    fn build(self, p: &ItemParams) -> Result<Plan, NodeError>;

    fn name(self) -> String {
        match serde_json::to_value(self) {
            Ok(Value::String(s)) => s,
            _ => String::new(),
        }
    }
}

fn build_with<O: Operations>(p: &ItemParams) -> Result<Plan, NodeError> {
    let name = p.string("operation");
    let op: O = serde_json::from_value(Value::String(name.clone())).map_err(|_| {
        NodeError::UnknownOperation {
            resource: O::RESOURCE.as_str().to_string(),
            operation: name,
            item: p.item,
        }
    })?;
    op.build(p)
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct OperationInfo {
    pub name: String,
    pub description: &'static str,
    pub required: &'static [&'static str],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection: Option<&'static str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub optional: Vec<&'static str>,
}

fn describe<O: Operations>() -> Vec<OperationInfo> {
    O::all()
        .iter()
        .map(|op| {
            let optional: Vec<&'static str> = op.fields().iter().map(|f| f.source).collect();
            OperationInfo {
                name: op.name(),
                description: op.summary(),
                required: op.required(),
                collection: (!optional.is_empty()).then(|| op.collection()),
                optional,
            }
        })
        .collect()
}

/// How a raw response is reshaped before it becomes output.
#[derive(Debug, Clone, PartialEq)]
pub enum PostProcess {
    None,
    /// Annotate every result object with `_domain`.
    TagDomain(String),
    /// A bare array of ids becomes `[{task_id}, ...]`.
    TaskIds,
    /// `{status: "processing"}` is wrapped as `{status, raw}`.
    Processing,
    /// Per-task advanced result, tagged with its task id.
    AdvancedResult(String),
    /// Unwrap a `{data: ...}` envelope whenever `data` is non-null.
    UnwrapData,
}

impl PostProcess {
    pub fn apply(&self, response: Value) -> Value {
        match self {
            PostProcess::None => response,
            PostProcess::TagDomain(domain) => {
                let tag = |v: Value| match v {
                    Value::Object(mut m) => {
                        m.insert("_domain".into(), Value::String(domain.clone()));
                        Value::Object(m)
                    }
                    other => other,
                };
                match response {
                    Value::Array(items) => Value::Array(items.into_iter().map(tag).collect()),
                    other => tag(other),
                }
            }
            PostProcess::TaskIds => match response {
                Value::Array(ids) => Value::Array(
                    ids.into_iter()
                        .map(|id| {
                            let mut m = Map::new();
                            m.insert("task_id".into(), id);
                            Value::Object(m)
                        })
                        .collect(),
                ),
                other => other,
            },
            PostProcess::Processing => {
                if is_processing(&response) {
                    serde_json::json!({ "status": "processing", "raw": response })
                } else {
                    response
                }
            }
            PostProcess::AdvancedResult(task_id) => {
                let mut out = Map::new();
                out.insert("task_id".into(), Value::String(task_id.clone()));
                if is_processing(&response) {
                    out.insert("status".into(), Value::String("processing".into()));
                } else if let Value::Object(obj) = response.clone() {
                    if obj.contains_key("request_metadata") {
                        out.extend(obj);
                        out.insert("task_id".into(), Value::String(task_id.clone()));
                    } else {
                        out.insert("raw".into(), response);
                    }
                } else {
                    out.insert("raw".into(), response);
                }
                Value::Object(out)
            }
            PostProcess::UnwrapData => {
                let data = response.get("data").filter(|d| !d.is_null()).cloned();
                data.unwrap_or(response)
            }
        }
    }
}

fn is_processing(v: &Value) -> bool {
    v.get("status").and_then(Value::as_str) == Some("processing")
}

#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub request: RequestDescriptor,
    pub post: PostProcess,
}

/// Calls to issue for one item. With `aggregate`, the results are collected
/// into an array even when there is only one call.
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    pub calls: Vec<Call>,
    pub aggregate: bool,
}

impl Plan {
    pub fn single(request: RequestDescriptor) -> Self {
        Self::single_with(request, PostProcess::None)
    }

    pub fn single_with(request: RequestDescriptor, post: PostProcess) -> Self {
        Self {
            calls: vec![Call { request, post }],
            aggregate: false,
        }
    }

    pub fn each(calls: Vec<Call>) -> Self {
        Self {
            calls,
            aggregate: true,
        }
    }

    /// The request of a single-call plan.
    pub fn request(&self) -> Option<&RequestDescriptor> {
        self.calls.first().map(|c| &c.request)
    }
}

// Shared parameter readers that fail with the item index attached.

pub(crate) fn domain_param(p: &ItemParams, name: &str) -> Result<String, NodeError> {
    validate::domain(&p.string(name)).map_err(|e| e.at(p.item))
}

pub(crate) fn source_param(p: &ItemParams) -> Result<String, NodeError> {
    validate::source(&p.string("source")).map_err(|e| e.at(p.item))
}

pub(crate) fn date_param(p: &ItemParams, name: &str) -> Result<String, NodeError> {
    validate::date(&p.string(name)).map_err(|e| e.at(p.item))
}

pub(crate) fn text_param(p: &ItemParams, name: &str, label: &str) -> Result<String, NodeError> {
    validate::non_empty(&p.string(name), label).map_err(|e| e.at(p.item))
}

pub(crate) fn url_param(p: &ItemParams, name: &str) -> Result<String, NodeError> {
    validate::absolute_url(&p.string(name)).map_err(|e| e.at(p.item))
}

/// Copy the operation's optional fields from its collection parameter.
pub(crate) fn with_fields<O: Operations>(
    mut req: RequestDescriptor,
    op: O,
    p: &ItemParams,
) -> RequestDescriptor {
    crate::params::copy_fields(&p.collection(op.collection()), op.fields(), &mut req.query);
    req
}
