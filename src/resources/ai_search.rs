use super::{domain_param, source_param, text_param, with_fields, Operations, Plan, Resource};
use crate::error::NodeError;
use crate::http::RequestDescriptor;
use crate::params::{FieldSpec, ItemParams};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    GetOverview,
    DiscoverBrand,
    GetPromptsByTarget,
    GetPromptsByBrand,
}

const PROMPT_FIELDS: &[FieldSpec] = &[
    FieldSpec::copy("sort", "sort"),
    FieldSpec::copy("sortOrder", "sort_order"),
    FieldSpec::copy("limit", "limit"),
    FieldSpec::copy("offset", "offset"),
];

impl Operations for Operation {
    const RESOURCE: Resource = Resource::AiSearch;

    fn all() -> &'static [Self] {
        &[
            Operation::GetOverview,
            Operation::DiscoverBrand,
            Operation::GetPromptsByTarget,
            Operation::GetPromptsByBrand,
        ]
    }

    fn summary(self) -> &'static str {
        match self {
            Operation::GetOverview => "AI search visibility time series for a domain by engine",
            Operation::DiscoverBrand => "Discover the brand name associated with a domain",
            Operation::GetPromptsByTarget => "Prompts in which a domain is mentioned",
            Operation::GetPromptsByBrand => "Prompts in which a brand is mentioned",
        }
    }

    fn required(self) -> &'static [&'static str] {
        match self {
            Operation::GetOverview | Operation::GetPromptsByTarget => {
                &["domain", "engine", "source", "scope"]
            }
            Operation::DiscoverBrand => &["domain", "source", "scope"],
            Operation::GetPromptsByBrand => &["brandName", "engine", "source"],
        }
    }

    fn fields(self) -> &'static [FieldSpec] {
        match self {
            Operation::GetPromptsByTarget | Operation::GetPromptsByBrand => PROMPT_FIELDS,
            _ => &[],
        }
    }

    fn build(self, p: &ItemParams) -> Result<Plan, NodeError> {
        let scope = || p.string_or("scope", "base_domain");
        let req = match self {
            Operation::GetOverview => {
                RequestDescriptor::get("/ai-search/overview/by-engine/time-series")
                    .query("target", domain_param(p, "domain")?)
                    .query("engine", text_param(p, "engine", "Engine")?)
                    .query("source", source_param(p)?)
                    .query("scope", scope())
            }
            Operation::DiscoverBrand => RequestDescriptor::get("/ai-search/discover-brand")
                .query("target", domain_param(p, "domain")?)
                .query("source", source_param(p)?)
                .query("scope", scope()),
            Operation::GetPromptsByTarget => RequestDescriptor::get("/ai-search/prompts-by-target")
                .query("target", domain_param(p, "domain")?)
                .query("engine", text_param(p, "engine", "Engine")?)
                .query("source", source_param(p)?)
                .query("scope", scope()),
            Operation::GetPromptsByBrand => {
                let brand = text_param(p, "brandName", "Brand name")?;
                RequestDescriptor::get("/ai-search/prompts-by-brand")
                    .query("brand", brand)
                    .query("engine", text_param(p, "engine", "Engine")?)
                    .query("source", source_param(p)?)
            }
        };
        Ok(Plan::single(with_fields(req, self, p)))
    }
}
