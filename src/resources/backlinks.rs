use super::{date_param, domain_param, text_param, url_param, with_fields, Operations, Plan, Resource};
use crate::error::NodeError;
use crate::http::RequestDescriptor;
use crate::params::{map_mode, FieldSpec, ItemParams};
use crate::validate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    GetSummary,
    GetMetrics,
    GetAll,
    GetRaw,
    GetCount,
    Export,
    ExportStatus,
    ExportDownload,
    GetHistory,
    GetHistoryCount,
    GetCumulativeHistory,
    GetAnchors,
    GetRefDomains,
    GetRefDomainsCount,
    GetRefDomainsHistory,
    GetRefDomainsHistoryCount,
    GetReferringIps,
    GetReferringIpsCount,
    GetReferringSubnetsCount,
    GetIndexedPages,
    GetAuthority,
    GetDomainAuthority,
    GetDomainAuthorityDistribution,
    GetPageAuthority,
    GetPageAuthorityHistory,
}

const MODE: FieldSpec = FieldSpec::mode("mode");
const LIMIT: FieldSpec = FieldSpec::copy("limit", "limit");
const OFFSET: FieldSpec = FieldSpec::copy("offset", "offset");
const SORT: FieldSpec = FieldSpec::copy("sort", "sort");
const ORDER: FieldSpec = FieldSpec::copy("order", "order");
const LINK_TYPE: FieldSpec = FieldSpec::copy("linkType", "link_type");
const LINK_STATUS: FieldSpec = FieldSpec::copy("linkStatus", "link_status");
const EVENT_TYPE: FieldSpec = FieldSpec::copy("eventType", "event_type");

const SUMMARY_FIELDS: &[FieldSpec] = &[FieldSpec::flag("historical", "historical")];
const ALL_FIELDS: &[FieldSpec] = &[MODE, LIMIT, OFFSET, SORT, ORDER, LINK_TYPE, LINK_STATUS];
const RAW_FIELDS: &[FieldSpec] = &[MODE, LIMIT, FieldSpec::copy("cursor", "cursor"), LINK_TYPE];
const MODE_ONLY: &[FieldSpec] = &[MODE];
const EXPORT_FIELDS: &[FieldSpec] = &[MODE, LINK_TYPE, LINK_STATUS];
const HISTORY_FIELDS: &[FieldSpec] = &[MODE, EVENT_TYPE, LIMIT, OFFSET];
const PAGED_FIELDS: &[FieldSpec] = &[MODE, LIMIT, OFFSET];
const REFDOMAIN_FIELDS: &[FieldSpec] = &[MODE, LIMIT, OFFSET, SORT, ORDER];
const INDEXED_FIELDS: &[FieldSpec] = &[LIMIT, OFFSET];

impl Operation {
    /// Endpoint for operations that take a single `target`.
    fn path(self) -> &'static str {
        use Operation::*;
        match self {
            GetSummary => "/backlinks/summary",
            GetMetrics => "/backlinks/metrics",
            GetAll => "/backlinks/all",
            GetRaw => "/backlinks/raw",
            GetCount => "/backlinks/count",
            Export => "/backlinks/export",
            ExportStatus => "/backlinks/export/status",
            ExportDownload => "",
            GetHistory => "/backlinks/history",
            GetHistoryCount => "/backlinks/history/count",
            GetCumulativeHistory => "/backlinks/history/cumulative",
            GetAnchors => "/backlinks/anchors",
            GetRefDomains => "/backlinks/refdomains",
            GetRefDomainsCount => "/backlinks/refdomains/count",
            GetRefDomainsHistory => "/backlinks/refdomains/history",
            GetRefDomainsHistoryCount => "/backlinks/refdomains/history/count",
            GetReferringIps => "/backlinks/referring-ips",
            GetReferringIpsCount => "/backlinks/referring-ips/count",
            GetReferringSubnetsCount => "/backlinks/referring-subnets/count",
            GetIndexedPages => "/backlinks/indexed-pages",
            GetAuthority => "/backlinks/authority",
            GetDomainAuthority => "/backlinks/authority/domain",
            GetDomainAuthorityDistribution => "/backlinks/authority/domain/distribution",
            GetPageAuthority => "/backlinks/authority/page",
            GetPageAuthorityHistory => "/backlinks/authority/page/history",
        }
    }

    fn has_date_range(self) -> bool {
        use Operation::*;
        matches!(
            self,
            GetHistory
                | GetHistoryCount
                | GetCumulativeHistory
                | GetRefDomainsHistory
                | GetRefDomainsHistoryCount
                | GetPageAuthorityHistory
        )
    }
}

impl Operations for Operation {
    const RESOURCE: Resource = Resource::Backlinks;

    fn all() -> &'static [Self] {
        use Operation::*;
        &[
            GetSummary,
            GetMetrics,
            GetAll,
            GetRaw,
            GetCount,
            Export,
            ExportStatus,
            ExportDownload,
            GetHistory,
            GetHistoryCount,
            GetCumulativeHistory,
            GetAnchors,
            GetRefDomains,
            GetRefDomainsCount,
            GetRefDomainsHistory,
            GetRefDomainsHistoryCount,
            GetReferringIps,
            GetReferringIpsCount,
            GetReferringSubnetsCount,
            GetIndexedPages,
            GetAuthority,
            GetDomainAuthority,
            GetDomainAuthorityDistribution,
            GetPageAuthority,
            GetPageAuthorityHistory,
        ]
    }

    fn summary(self) -> &'static str {
        use Operation::*;
        match self {
            GetSummary => "Backlink profile summary for a target",
            GetMetrics => "Key backlink metrics for one or more targets",
            GetAll => "List backlinks of a target",
            GetRaw => "Stream raw backlinks using a cursor",
            GetCount => "Total number of backlinks",
            Export => "Start an asynchronous backlinks export",
            ExportStatus => "Check the status of an export task",
            ExportDownload => "Download a finished export file",
            GetHistory => "New and lost backlinks over a date range",
            GetHistoryCount => "Counts of new and lost backlinks over a date range",
            GetCumulativeHistory => "Cumulative backlink totals over a date range",
            GetAnchors => "Anchor texts pointing to a target",
            GetRefDomains => "Referring domains of a target",
            GetRefDomainsCount => "Number of referring domains",
            GetRefDomainsHistory => "New and lost referring domains over a date range",
            GetRefDomainsHistoryCount => "Counts of new and lost referring domains",
            GetReferringIps => "Referring IP addresses",
            GetReferringIpsCount => "Number of referring IP addresses",
            GetReferringSubnetsCount => "Number of referring subnets",
            GetIndexedPages => "Pages of a target that have backlinks",
            GetAuthority => "Domain and page authority for a target",
            GetDomainAuthority => "Domain authority score",
            GetDomainAuthorityDistribution => "Distribution of referring domains by authority",
            GetPageAuthority => "Page authority score",
            GetPageAuthorityHistory => "Page authority over a date range",
        }
    }

    fn required(self) -> &'static [&'static str] {
        use Operation::*;
        match self {
            GetSummary => &["target", "mode"],
            GetMetrics => &["targets"],
            ExportStatus => &["taskId"],
            ExportDownload => &["exportUrl"],
            op if op.has_date_range() => &["target", "dateFrom", "dateTo"],
            _ => &["target"],
        }
    }

    fn fields(self) -> &'static [FieldSpec] {
        use Operation::*;
        match self {
            GetSummary => SUMMARY_FIELDS,
            GetAll => ALL_FIELDS,
            GetRaw => RAW_FIELDS,
            Export => EXPORT_FIELDS,
            GetHistory | GetRefDomainsHistory => HISTORY_FIELDS,
            GetCount
            | GetHistoryCount
            | GetCumulativeHistory
            | GetRefDomainsCount
            | GetRefDomainsHistoryCount
            | GetReferringIpsCount
            | GetReferringSubnetsCount => MODE_ONLY,
            GetAnchors | GetReferringIps => PAGED_FIELDS,
            GetRefDomains => REFDOMAIN_FIELDS,
            GetIndexedPages => INDEXED_FIELDS,
            GetMetrics
            | ExportStatus
            | ExportDownload
            | GetAuthority
            | GetDomainAuthority
            | GetDomainAuthorityDistribution
            | GetPageAuthority
            | GetPageAuthorityHistory => &[],
        }
    }

    fn build(self, p: &ItemParams) -> Result<Plan, NodeError> {
        let req = match self {
            Operation::GetMetrics => {
                let targets = validate::split_list(&p.string("targets"))
                    .iter()
                    .map(|t| validate::domain(t).map_err(|e| e.at(p.item)))
                    .collect::<Result<Vec<_>, _>>()?;
                let Some((first, rest)) = targets.split_first() else {
                    return Err(p.invalid("Please provide at least one target domain"));
                };
                let mut req = RequestDescriptor::get(self.path()).query("target", first.as_str());
                req.extra_targets = rest.to_vec();
                req
            }
            Operation::ExportStatus => RequestDescriptor::get(self.path())
                .query("task_id", text_param(p, "taskId", "Task ID")?),
            // Export files live on a separate host; the URL is used as given.
            Operation::ExportDownload => RequestDescriptor::download(url_param(p, "exportUrl")?),
            Operation::GetSummary => RequestDescriptor::get(self.path())
                .query("target", target_param(p, self)?)
                .query("mode", map_mode(&p.string("mode"))),
            op => {
                let mut req =
                    RequestDescriptor::get(op.path()).query("target", target_param(p, op)?);
                if op.has_date_range() {
                    req = req
                        .query("date_from", date_param(p, "dateFrom")?)
                        .query("date_to", date_param(p, "dateTo")?);
                }
                req
            }
        };
        Ok(Plan::single(with_fields(req, self, p)))
    }
}

/// `target` is a bare domain unless the operation runs in URL mode.
fn target_param(p: &ItemParams, op: Operation) -> Result<String, NodeError> {
    let mode = match p.string("mode") {
        m if m.is_empty() => p
            .collection(op.collection())
            .get("mode")
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default(),
        m => m,
    };
    if map_mode(&mode) == "url" {
        text_param(p, "target", "Target")
    } else {
        domain_param(p, "target")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::Transfer;
    use crate::resources::testing::{item, params};
    use serde_json::json;

    fn build(v: serde_json::Value) -> Result<RequestDescriptor, NodeError> {
        let p = params(v);
        Resource::Backlinks
            .build(&item(&p))
            .map(|plan| plan.request().cloned().unwrap())
    }

    #[test]
    fn summary_maps_mode_and_flag() {
        let req = build(json!({
            "operation": "getSummary",
            "target": "example.com",
            "mode": "as_root",
            "additionalFields": {"historical": false}
        }))
        .unwrap();
        assert_eq!(req.query["mode"], "domain");
        assert_eq!(req.query["historical"], 0);
    }

    #[test]
    fn metrics_splits_targets_into_repeated_pairs() {
        let req = build(json!({
            "operation": "getMetrics",
            "targets": "a.com\nb.com, c.com"
        }))
        .unwrap();
        assert_eq!(req.query["target"], "a.com");
        assert_eq!(req.extra_targets, vec!["b.com", "c.com"]);

        let err = build(json!({"operation": "getMetrics", "targets": " , "})).unwrap_err();
        assert_eq!(err.to_string(), "Please provide at least one target domain");

        let req = build(json!({"operation": "getMetrics", "targets": "https://www.A.com, www.b.com"})).unwrap();
        assert_eq!(req.query["target"], "a.com");
        assert_eq!(req.extra_targets, vec!["b.com"]);
        assert!(build(json!({"operation": "getMetrics", "targets": "a.com, not a domain"})).is_err());
    }

    #[test]
    fn targets_are_normalized_outside_url_mode() {
        let req = build(json!({
            "operation": "getSummary",
            "target": "https://www.Example.com/",
            "mode": "as_root"
        }))
        .unwrap();
        assert_eq!(req.query["target"], "example.com");

        let err = build(json!({"operation": "getCount", "target": "not a domain"})).unwrap_err();
        assert!(matches!(err, NodeError::Validation { .. }));

        let req = build(json!({
            "operation": "getSummary",
            "target": "https://example.com/blog/post",
            "mode": "one_unit"
        }))
        .unwrap();
        assert_eq!(req.query["target"], "https://example.com/blog/post");

        let req = build(json!({
            "operation": "getAll",
            "target": " https://example.com/page ",
            "additionalFields": {"mode": "one_unit"}
        }))
        .unwrap();
        assert_eq!(req.query["target"], "https://example.com/page");
    }

    #[test]
    fn history_requires_strict_dates() {
        for op in ["getHistory", "getHistoryCount", "getCumulativeHistory", "getRefDomainsHistory", "getRefDomainsHistoryCount", "getPageAuthorityHistory"] {
            let err = build(json!({
                "operation": op,
                "target": "example.com",
                "dateFrom": "2024/01/01",
                "dateTo": "2024-02-01"
            }))
            .unwrap_err();
            assert!(matches!(err, NodeError::Validation { .. }), "{op}");
        }
        let req = build(json!({
            "operation": "getHistory",
            "target": "example.com",
            "dateFrom": "2024-01-01",
            "dateTo": "2024-02-01",
            "additionalFields": {"eventType": "new", "mode": "one_unit"}
        }))
        .unwrap();
        assert_eq!(req.path, "/backlinks/history");
        assert_eq!(req.query["date_from"], "2024-01-01");
        assert_eq!(req.query["event_type"], "new");
        assert_eq!(req.query["mode"], "url");
    }

    #[test]
    fn export_download_uses_absolute_url() {
        let req = build(json!({
            "operation": "exportDownload",
            "exportUrl": "https://download.seranking.com/exports/1.csv.gz"
        }))
        .unwrap();
        assert_eq!(req.transfer, Transfer::Binary);
        assert_eq!(req.path, "https://download.seranking.com/exports/1.csv.gz");

        let err = build(json!({"operation": "exportDownload", "exportUrl": "download.seranking.com/x"}));
        assert!(err.is_err());
    }

    #[test]
    fn refdomains_copies_sorting() {
        let req = build(json!({
            "operation": "getRefDomains",
            "target": "example.com",
            "additionalFields": {"sort": "domain_inlink_rank", "order": "desc", "limit": 10}
        }))
        .unwrap();
        assert_eq!(req.path, "/backlinks/refdomains");
        assert_eq!(req.query["sort"], "domain_inlink_rank");
        assert_eq!(req.query["order"], "desc");
        assert_eq!(req.query["limit"], 10);
    }
}
