use super::{source_param, text_param, with_fields, Operations, Plan, Resource};
use crate::error::NodeError;
use crate::http::RequestDescriptor;
use crate::params::{copy_fields, FieldSpec, ItemParams};
use crate::validate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    ExportMetrics,
    GetSimilar,
    GetRelated,
    GetQuestions,
    GetLongTail,
}

const EXPORT_FIELDS: &[FieldSpec] = &[
    FieldSpec::list("cols", "cols"),
    FieldSpec::copy("sort", "sort"),
    FieldSpec::copy("sortOrder", "sort_order"),
];

const SUGGESTION_FIELDS: &[FieldSpec] = &[
    FieldSpec::copy("limit", "limit"),
    FieldSpec::copy("offset", "offset"),
    FieldSpec::copy("sort", "sort"),
    FieldSpec::copy("sortOrder", "sort_order"),
    FieldSpec::copy("volumeFrom", "filter[volume][from]"),
    FieldSpec::copy("volumeTo", "filter[volume][to]"),
    FieldSpec::copy("difficultyFrom", "filter[difficulty][from]"),
    FieldSpec::copy("difficultyTo", "filter[difficulty][to]"),
    FieldSpec::copy("cpcFrom", "filter[cpc][from]"),
    FieldSpec::copy("cpcTo", "filter[cpc][to]"),
];

impl Operations for Operation {
    const RESOURCE: Resource = Resource::KeywordResearch;

    fn all() -> &'static [Self] {
        &[
            Operation::ExportMetrics,
            Operation::GetSimilar,
            Operation::GetRelated,
            Operation::GetQuestions,
            Operation::GetLongTail,
        ]
    }

    fn summary(self) -> &'static str {
        match self {
            Operation::ExportMetrics => "Volume, CPC and difficulty for up to 1000 keywords",
            Operation::GetSimilar => "Keywords similar to a seed keyword",
            Operation::GetRelated => "Keywords related to a seed keyword",
            Operation::GetQuestions => "Question-form keywords containing a seed keyword",
            Operation::GetLongTail => "Long-tail variations of a seed keyword",
        }
    }

    fn required(self) -> &'static [&'static str] {
        match self {
            Operation::ExportMetrics => &["keywords", "source"],
            _ => &["keyword", "source"],
        }
    }

    fn fields(self) -> &'static [FieldSpec] {
        match self {
            Operation::ExportMetrics => EXPORT_FIELDS,
            _ => SUGGESTION_FIELDS,
        }
    }

    fn build(self, p: &ItemParams) -> Result<Plan, NodeError> {
        let path = match self {
            Operation::ExportMetrics => {
                let keywords = validate::keywords(&p.string("keywords")).map_err(|e| e.at(p.item))?;
                // The keyword list goes out as multipart form fields.
                let mut req = RequestDescriptor::post("/keywords/export")
                    .query("source", source_param(p)?)
                    .body(
                        "keywords",
                        Value::Array(keywords.into_iter().map(Value::String).collect()),
                    );
                copy_fields(&p.collection(self.collection()), self.fields(), &mut req.body);
                return Ok(Plan::single(req));
            }
            Operation::GetSimilar => "/keywords/similar",
            Operation::GetRelated => "/keywords/related",
            Operation::GetQuestions => "/keywords/questions",
            Operation::GetLongTail => "/keywords/longtail",
        };
        let req = RequestDescriptor::get(path)
            .query("source", source_param(p)?)
            .query("keyword", text_param(p, "keyword", "Keyword")?);
        Ok(Plan::single(with_fields(req, self, p)))
    }
}
