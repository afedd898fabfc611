use super::{date_param, domain_param, text_param, with_fields, Operations, Plan, Resource};
use crate::error::NodeError;
use crate::http::RequestDescriptor;
use crate::params::{copy_fields, FieldSpec, ItemParams};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    CreateStandard,
    CreateAdvanced,
    ListAudits,
    GetStatus,
    GetReport,
    GetCrawl,
    GetIssuesByType,
    GetIssuesByUrl,
    GetLinks,
    GetHistory,
    UpdateAudit,
    DeleteAudit,
    RecheckStandard,
    RecheckAdvanced,
}

const AUDITS_PATH: &str = "/site-audit/audits";

const STANDARD_SETTINGS: &[FieldSpec] = &[
    FieldSpec::flag("source_site", "source_site"),
    FieldSpec::flag("source_sitemap", "source_sitemap"),
    FieldSpec::flag("source_subdomain", "source_subdomain"),
    FieldSpec::flag("check_robots", "check_robots"),
    FieldSpec::copy("max_pages", "max_pages"),
    FieldSpec::copy("max_depth", "max_depth"),
    FieldSpec::copy("max_req", "max_req"),
    FieldSpec::copy("user_agent", "user_agent").keep_present(),
    FieldSpec::copy("min_title_len", "min_title_len"),
    FieldSpec::copy("max_title_len", "max_title_len"),
    FieldSpec::copy("min_description_len", "min_description_len"),
    FieldSpec::copy("max_description_len", "max_description_len"),
];

const ADVANCED_SETTINGS: &[FieldSpec] = &[
    FieldSpec::flag("source_site", "source_site"),
    FieldSpec::flag("source_sitemap", "source_sitemap"),
    FieldSpec::flag("source_subdomain", "source_subdomain"),
    FieldSpec::flag("check_robots", "check_robots"),
    FieldSpec::copy("max_pages", "max_pages"),
    FieldSpec::copy("max_depth", "max_depth"),
    FieldSpec::copy("user_agent", "user_agent").keep_present(),
];

const LIST_FIELDS: &[FieldSpec] = &[
    FieldSpec::copy("limit", "limit"),
    FieldSpec::copy("offset", "offset"),
    FieldSpec::copy("search", "search"),
    FieldSpec::copy("date_start", "date_start"),
    FieldSpec::copy("date_end", "date_end"),
];

const PAGED_FIELDS: &[FieldSpec] = &[
    FieldSpec::copy("limit", "limit"),
    FieldSpec::copy("offset", "offset"),
];

const LINK_FIELDS: &[FieldSpec] = &[
    FieldSpec::copy("page_type", "page_type"),
    FieldSpec::copy("limit", "limit"),
    FieldSpec::copy("offset", "offset"),
];

impl Operations for Operation {
    const RESOURCE: Resource = Resource::WebsiteAudit;

    fn all() -> &'static [Self] {
        &[
            Operation::CreateStandard,
            Operation::CreateAdvanced,
            Operation::ListAudits,
            Operation::GetStatus,
            Operation::GetReport,
            Operation::GetCrawl,
            Operation::GetIssuesByType,
            Operation::GetIssuesByUrl,
            Operation::GetLinks,
            Operation::GetHistory,
            Operation::UpdateAudit,
            Operation::DeleteAudit,
            Operation::RecheckStandard,
            Operation::RecheckAdvanced,
        ]
    }

    fn summary(self) -> &'static str {
        match self {
            Operation::CreateStandard => "Start a standard (HTML) crawl of a site",
            Operation::CreateAdvanced => "Start an advanced (JavaScript rendering) crawl of a site",
            Operation::ListAudits => "List audits with optional search and date filters",
            Operation::GetStatus => "Crawl progress of an audit",
            Operation::GetReport => "Full audit report with health score and issues",
            Operation::GetCrawl => "Pages crawled by an audit",
            Operation::GetIssuesByType => "Pages affected by one issue code",
            Operation::GetIssuesByUrl => "Issues found on one page",
            Operation::GetLinks => "Links discovered by an audit",
            Operation::GetHistory => "Audit snapshot for a past date",
            Operation::UpdateAudit => "Rename an audit",
            Operation::DeleteAudit => "Delete an audit",
            Operation::RecheckStandard => "Re-run a standard audit",
            Operation::RecheckAdvanced => "Re-run an advanced audit",
        }
    }

    fn required(self) -> &'static [&'static str] {
        match self {
            Operation::CreateStandard | Operation::CreateAdvanced => &["domain"],
            Operation::ListAudits => &[],
            Operation::GetIssuesByType => &["auditId", "issueCode"],
            Operation::GetIssuesByUrl => &["auditId", "urlIdentifier"],
            Operation::GetHistory => &["auditId", "date"],
            Operation::UpdateAudit => &["auditId", "title"],
            _ => &["auditId"],
        }
    }

    fn fields(self) -> &'static [FieldSpec] {
        match self {
            Operation::CreateStandard => STANDARD_SETTINGS,
            Operation::CreateAdvanced => ADVANCED_SETTINGS,
            Operation::ListAudits => LIST_FIELDS,
            Operation::GetCrawl | Operation::GetIssuesByType => PAGED_FIELDS,
            Operation::GetLinks => LINK_FIELDS,
            _ => &[],
        }
    }

    fn build(self, p: &ItemParams) -> Result<Plan, NodeError> {
        let req = match self {
            Operation::CreateStandard => create(p, self, "/site-audit/audits/standard")?,
            Operation::CreateAdvanced => create(p, self, "/site-audit/audits/advanced")?,
            Operation::ListAudits => RequestDescriptor::get(AUDITS_PATH),
            Operation::GetStatus => audit(p, Method::GET, "/site-audit/audits/status")?,
            Operation::GetReport => audit(p, Method::GET, "/site-audit/audits/report")?,
            Operation::GetCrawl => audit(p, Method::GET, "/site-audit/audits/pages")?,
            Operation::GetIssuesByType => audit(p, Method::GET, "/site-audit/audits/issue-pages")?
                .query("code", text_param(p, "issueCode", "Issue code")?),
            Operation::GetIssuesByUrl => {
                let ident = text_param(p, "urlIdentifier", "URL identifier")?;
                let key = if ident.bytes().all(|b| b.is_ascii_digit()) {
                    "url_id"
                } else {
                    "url"
                };
                audit(p, Method::GET, "/site-audit/audits/issues")?.query(key, ident)
            }
            Operation::GetLinks => audit(p, Method::GET, "/site-audit/audits/links")?,
            Operation::GetHistory => audit(p, Method::GET, "/site-audit/audits/history")?
                .query("date", date_param(p, "date")?),
            Operation::UpdateAudit => audit(p, Method::PATCH, AUDITS_PATH)?
                .body("title", text_param(p, "title", "Title")?),
            Operation::DeleteAudit => audit(p, Method::DELETE, AUDITS_PATH)?,
            Operation::RecheckStandard => {
                audit(p, Method::POST, "/site-audit/audits/recheck/standard")?
            }
            Operation::RecheckAdvanced => {
                audit(p, Method::POST, "/site-audit/audits/recheck/advanced")?
            }
        };
        match self {
            Operation::CreateStandard | Operation::CreateAdvanced => Ok(Plan::single(req)),
            _ => Ok(Plan::single(with_fields(req, self, p))),
        }
    }
}

/// A request addressed to one existing audit.
fn audit(p: &ItemParams, method: Method, path: &str) -> Result<RequestDescriptor, NodeError> {
    Ok(RequestDescriptor::new(method, path).query("audit_id", text_param(p, "auditId", "Audit ID")?))
}

fn create(p: &ItemParams, op: Operation, path: &str) -> Result<RequestDescriptor, NodeError> {
    let fields = p.collection(op.collection());
    let mut req =
        RequestDescriptor::post(path).body("domain", domain_param(p, "domain")?);
    if let Some(title) = fields.get("title").filter(|t| crate::params::truthy(t)) {
        req = req.body("title", title.clone());
    }
    let mut settings = Map::new();
    copy_fields(&fields, op.fields(), &mut settings);
    if !settings.is_empty() {
        req = req.body("settings", Value::Object(settings));
    }
    Ok(req)
}
