use super::{
    domain_param, source_param, text_param, url_param, with_fields, Operations, Plan,
    PostProcess, Resource,
};
use crate::error::NodeError;
use crate::http::RequestDescriptor;
use crate::params::{truthy, value_string, FieldSpec, ItemParams};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    GetOverviewDb,
    GetOverviewWorldwide,
    GetWorldwideAggregateUrl,
    GetDomainPages,
    GetDomainSubdomains,
    GetOverviewHistory,
    GetKeywords,
    GetKeywordsComparison,
    GetCompetitors,
    GetAdsForKeyword,
    GetAdsForDomain,
}

const WORLDWIDE_FIELDS: &[FieldSpec] = &[
    FieldSpec::copy("currency", "currency"),
    FieldSpec::list("fields", "fields"),
    FieldSpec::flag("showZonesList", "show_zones_list"),
];

const URL_FIELDS: &[FieldSpec] = &[FieldSpec::list("fields", "fields")];

// Pages and subdomains share one option set.
const SEGMENT_FIELDS: &[FieldSpec] = &[
    FieldSpec::copy("scope", "scope"),
    FieldSpec::copy("order_field", "order_field"),
    FieldSpec::copy("order_type", "order_type"),
    FieldSpec::copy("offset", "offset"),
    FieldSpec::copy("limit", "limit"),
    FieldSpec::copy("filter_domain_url", "filter[domain_url]"),
    FieldSpec::copy("filter_traffic_percent_from", "filter[traffic_percent][from]"),
    FieldSpec::copy("filter_traffic_percent_to", "filter[traffic_percent][to]"),
    FieldSpec::copy("filter_keywords_count_from", "filter[keywords_count][from]"),
    FieldSpec::copy("filter_keywords_count_to", "filter[keywords_count][to]"),
    FieldSpec::copy("filter_traffic_sum_from", "filter[traffic_sum][from]"),
    FieldSpec::copy("filter_traffic_sum_to", "filter[traffic_sum][to]"),
    FieldSpec::copy("filter_price_sum_from", "filter[price_sum][from]"),
    FieldSpec::copy("filter_price_sum_to", "filter[price_sum][to]"),
];

const KEYWORD_FIELDS: &[FieldSpec] = &[
    FieldSpec::copy("limit", "limit"),
    FieldSpec::copy("offset", "offset"),
    FieldSpec::copy("page", "page"),
    FieldSpec::flag("withSubdomains", "with_subdomains"),
    FieldSpec::list("cols", "cols"),
    FieldSpec::copy("orderField", "order_field"),
    FieldSpec::copy("orderType", "order_type"),
    FieldSpec::copy("posChange", "pos_change"),
    FieldSpec::copy("volumeFrom", "filter[volume][from]"),
    FieldSpec::copy("volumeTo", "filter[volume][to]"),
    FieldSpec::copy("positionFrom", "filter[position][from]"),
    FieldSpec::copy("positionTo", "filter[position][to]"),
    FieldSpec::copy("cpcFrom", "filter[cpc][from]"),
    FieldSpec::copy("cpcTo", "filter[cpc][to]"),
];

const COMPARISON_FIELDS: &[FieldSpec] = &[
    FieldSpec::copy("limit", "limit"),
    FieldSpec::copy("offset", "offset"),
    FieldSpec::copy("page", "page"),
    FieldSpec::list("cols", "cols"),
    FieldSpec::copy("orderField", "order_field"),
    FieldSpec::copy("orderType", "order_type"),
    FieldSpec::copy("volumeFrom", "filter[volume][from]"),
    FieldSpec::copy("volumeTo", "filter[volume][to]"),
];

const COMPETITOR_FIELDS: &[FieldSpec] = &[
    FieldSpec::copy("limit", "limit"),
    FieldSpec::flag("stats", "stats"),
    FieldSpec::flag("excludeLeaders", "exclude_leaders"),
];

const ADS_FIELDS: &[FieldSpec] = &[FieldSpec::copy("page", "page"), FieldSpec::copy("limit", "limit")];

/// `from`/`to` on the ads endpoints are optional but must be dates when set.
fn ads_dates(mut req: RequestDescriptor, p: &ItemParams) -> Result<RequestDescriptor, NodeError> {
    let extra = p.collection("additionalFields");
    for key in ["from", "to"] {
        if let Some(raw) = extra.get(key).filter(|v| truthy(v)) {
            let date = crate::validate::date(&value_string(raw)).map_err(|e| e.at(p.item))?;
            req = req.query(key, date);
        }
    }
    Ok(req)
}

impl Operations for Operation {
    const RESOURCE: Resource = Resource::DomainAnalysis;

    fn all() -> &'static [Self] {
        use Operation::*;
        &[
            GetOverviewDb,
            GetOverviewWorldwide,
            GetWorldwideAggregateUrl,
            GetDomainPages,
            GetDomainSubdomains,
            GetOverviewHistory,
            GetKeywords,
            GetKeywordsComparison,
            GetCompetitors,
            GetAdsForKeyword,
            GetAdsForDomain,
        ]
    }

    fn summary(self) -> &'static str {
        use Operation::*;
        match self {
            GetOverviewDb => "Detailed statistics for a specific regional database",
            GetOverviewWorldwide => "Worldwide aggregate statistics for a domain",
            GetWorldwideAggregateUrl => "Worldwide organic and paid statistics for a single URL",
            GetDomainPages => "Pages of a domain with their keyword performance",
            GetDomainSubdomains => "Subdomains of a domain with traffic and keyword metrics",
            GetOverviewHistory => "Historical domain metrics",
            GetKeywords => "Keywords for which a domain ranks",
            GetKeywordsComparison => "Compare keyword rankings between two domains",
            GetCompetitors => "Competitor domains",
            GetAdsForKeyword => "Domains advertising on a keyword",
            GetAdsForDomain => "Keywords a domain is advertising on",
        }
    }

    fn required(self) -> &'static [&'static str] {
        use Operation::*;
        match self {
            GetOverviewDb => &["domain", "source"],
            GetOverviewWorldwide => &["domain"],
            GetWorldwideAggregateUrl => &["url"],
            GetDomainPages | GetDomainSubdomains => &["target", "source", "type"],
            GetOverviewHistory | GetKeywords | GetCompetitors => &["domain", "source", "type"],
            GetKeywordsComparison => &["domain", "compareDomain", "source", "type"],
            GetAdsForKeyword => &["keyword", "source"],
            GetAdsForDomain => &["domain", "source"],
        }
    }

    fn fields(self) -> &'static [FieldSpec] {
        use Operation::*;
        match self {
            GetOverviewDb | GetOverviewHistory => &[],
            GetOverviewWorldwide => WORLDWIDE_FIELDS,
            GetWorldwideAggregateUrl => URL_FIELDS,
            GetDomainPages | GetDomainSubdomains => SEGMENT_FIELDS,
            GetKeywords => KEYWORD_FIELDS,
            GetKeywordsComparison => COMPARISON_FIELDS,
            GetCompetitors => COMPETITOR_FIELDS,
            GetAdsForKeyword | GetAdsForDomain => ADS_FIELDS,
        }
    }

    fn collection(self) -> &'static str {
        match self {
            Operation::GetWorldwideAggregateUrl
            | Operation::GetDomainPages
            | Operation::GetDomainSubdomains => "additionalOptions",
            _ => "additionalFields",
        }
    }

    fn build(self, p: &ItemParams) -> Result<Plan, NodeError> {
        use Operation::*;
        let kind = || p.string_or("type", "organic");
        let mut post = PostProcess::None;
        let req = match self {
            GetOverviewDb => {
                let with_subdomains = truthy(
                    p.collection("additionalFields")
                        .get("withSubdomains")
                        .unwrap_or(&serde_json::Value::Null),
                );
                RequestDescriptor::get("/domain/overview/db")
                    .query("source", source_param(p)?)
                    .query("domain", domain_param(p, "domain")?)
                    .query("with_subdomains", if with_subdomains { 1 } else { 0 })
            }
            GetOverviewWorldwide => {
                let domain = domain_param(p, "domain")?;
                post = PostProcess::TagDomain(domain.clone());
                RequestDescriptor::get("/domain/overview/worldwide").query("domain", domain)
            }
            GetWorldwideAggregateUrl => {
                RequestDescriptor::get("/url/overview/worldwide").query("url", url_param(p, "url")?)
            }
            GetDomainPages | GetDomainSubdomains => {
                let path = if self == GetDomainPages {
                    "/domain/pages"
                } else {
                    "/domain/subdomains"
                };
                RequestDescriptor::get(path)
                    .query("source", source_param(p)?)
                    .query("domain", domain_param(p, "target")?)
                    .query("type", kind())
            }
            GetOverviewHistory => RequestDescriptor::get("/domain/overview/history")
                .query("source", source_param(p)?)
                .query("domain", domain_param(p, "domain")?)
                .query("type", kind()),
            GetKeywords => RequestDescriptor::get("/domain/keywords")
                .query("source", source_param(p)?)
                .query("domain", domain_param(p, "domain")?)
                .query("type", kind()),
            GetKeywordsComparison => {
                let mut req = RequestDescriptor::get("/domain/keywords/comparison")
                    .query("source", source_param(p)?)
                    .query("domain", domain_param(p, "domain")?)
                    .query("compare", domain_param(p, "compareDomain")?)
                    .query("type", kind());
                let diff = p.string("diff");
                if !diff.is_empty() {
                    req = req.query("diff", diff);
                }
                req
            }
            GetCompetitors => RequestDescriptor::get("/domain/competitors")
                .query("source", source_param(p)?)
                .query("domain", domain_param(p, "domain")?)
                .query("type", kind()),
            GetAdsForKeyword => {
                let req = RequestDescriptor::get("/domain/ads")
                    .query("source", source_param(p)?)
                    .query("keyword", text_param(p, "keyword", "Keyword")?);
                ads_dates(req, p)?
            }
            GetAdsForDomain => {
                let req = RequestDescriptor::get("/domain/ads")
                    .query("source", source_param(p)?)
                    .query("domain", domain_param(p, "domain")?);
                ads_dates(req, p)?
            }
        };
        Ok(Plan::single_with(with_fields(req, self, p), post))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::testing::{item, params};
    use serde_json::{json, Value};

    fn build(v: Value) -> Result<Plan, NodeError> {
        let p = params(v);
        Resource::DomainAnalysis.build(&item(&p))
    }

    #[test]
    fn overview_db_always_sends_subdomain_flag() {
        let plan = build(json!({
            "operation": "getOverviewDb",
            "domain": "http://www.example.com",
            "source": "de"
        }))
        .unwrap();
        let q = &plan.request().unwrap().query;
        assert_eq!(q["domain"], "example.com");
        assert_eq!(q["with_subdomains"], 0);
    }

    #[test]
    fn worldwide_tags_results_with_domain() {
        let plan = build(json!({
            "operation": "getOverviewWorldwide",
            "domain": "WWW.Example.com",
            "additionalFields": {"fields": ["price", "traffic"], "showZonesList": true, "currency": "EUR"}
        }))
        .unwrap();
        let call = &plan.calls[0];
        assert_eq!(call.request.query["fields"], "price,traffic");
        assert_eq!(call.request.query["show_zones_list"], 1);
        assert_eq!(call.post, PostProcess::TagDomain("example.com".into()));
    }

    #[test]
    fn keywords_namespace_range_filters() {
        let plan = build(json!({
            "operation": "getKeywords",
            "domain": "example.com",
            "source": "us",
            "type": "adv",
            "additionalFields": {
                "volumeFrom": 100,
                "volumeTo": 0,
                "cpcFrom": 1.5,
                "cols": ["keyword", "volume"],
                "withSubdomains": true
            }
        }))
        .unwrap();
        let q = &plan.request().unwrap().query;
        assert_eq!(q["filter[volume][from]"], 100);
        assert!(!q.contains_key("filter[volume][to]"));
        assert_eq!(q["filter[cpc][from]"], 1.5);
        assert_eq!(q["cols"], "keyword,volume");
        assert_eq!(q["with_subdomains"], 1);
        assert_eq!(q["type"], "adv");
    }

    #[test]
    fn comparison_normalizes_both_domains() {
        let plan = build(json!({
            "operation": "getKeywordsComparison",
            "domain": "https://a.com",
            "compareDomain": "www.B.com",
            "source": "us",
            "diff": "1"
        }))
        .unwrap();
        let q = &plan.request().unwrap().query;
        assert_eq!(q["domain"], "a.com");
        assert_eq!(q["compare"], "b.com");
        assert_eq!(q["diff"], "1");
    }

    #[test]
    fn pages_use_additional_options() {
        let plan = build(json!({
            "operation": "getDomainPages",
            "target": "example.com",
            "source": "us",
            "additionalOptions": {"filter_domain_url": "/blog/", "filter_traffic_percent_to": 50}
        }))
        .unwrap();
        let req = plan.request().unwrap();
        assert_eq!(req.path, "/domain/pages");
        assert_eq!(req.query["filter[domain_url]"], "/blog/");
        assert_eq!(req.query["filter[traffic_percent][to]"], 50);
    }

    #[test]
    fn url_aggregate_requires_scheme() {
        let err = build(json!({"operation": "getWorldwideAggregateUrl", "url": "example.com/page"}))
            .unwrap_err();
        assert!(matches!(err, NodeError::Validation { .. }));
    }

    #[test]
    fn ads_validate_keyword_and_dates() {
        let err = build(json!({"operation": "getAdsForKeyword", "keyword": " ", "source": "us"}))
            .unwrap_err();
        assert_eq!(err.to_string(), "Keyword cannot be empty");

        let err = build(json!({
            "operation": "getAdsForDomain",
            "domain": "example.com",
            "source": "us",
            "additionalFields": {"from": "01-01-2024"}
        }))
        .unwrap_err();
        assert!(err.to_string().contains("YYYY-MM-DD"));

        let err = build(json!({
            "operation": "getAdsForDomain",
            "domain": "example.com",
            "source": "us",
            "additionalFields": {"to": 20240101}
        }))
        .unwrap_err();
        assert!(err.to_string().contains("(got '20240101')"));

        let plan = build(json!({
            "operation": "getAdsForKeyword",
            "keyword": " seo tools ",
            "source": "us",
            "additionalFields": {"from": "2024-01-01", "page": 2}
        }))
        .unwrap();
        let q = &plan.request().unwrap().query;
        assert_eq!(q["keyword"], "seo tools");
        assert_eq!(q["from"], "2024-01-01");
        assert_eq!(q["page"], 2);
    }

    #[test]
    fn malformed_domain_fails_before_dispatch() {
        let err = build(json!({"operation": "getCompetitors", "domain": "not a domain", "source": "us"}))
            .unwrap_err();
        assert_eq!(err.item(), 0);
        assert!(err.to_string().starts_with("Invalid domain"));
    }
}
