use super::{text_param, with_fields, Call, Operations, Plan, PostProcess, Resource};
use crate::error::NodeError;
use crate::http::RequestDescriptor;
use crate::params::{FieldSpec, ItemParams};
use crate::validate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    AddTasks,
    GetResults,
    ListTasks,
    GetAdvancedResults,
    GetLocations,
}

const TASKS_PATH: &str = "/serp/classic/tasks";

const LIST_FIELDS: &[FieldSpec] = &[FieldSpec::copy("limit", "limit")];

impl Operations for Operation {
    const RESOURCE: Resource = Resource::SerpClassic;

    fn all() -> &'static [Self] {
        &[
            Operation::AddTasks,
            Operation::GetResults,
            Operation::ListTasks,
            Operation::GetAdvancedResults,
            Operation::GetLocations,
        ]
    }

    fn summary(self) -> &'static str {
        match self {
            Operation::AddTasks => "Create SERP tasks for keywords (returns task IDs)",
            Operation::GetResults => "Status or standard SERP results for a task",
            Operation::ListTasks => "Recent SERP tasks (last 24 hours)",
            Operation::GetAdvancedResults => "Advanced SERP results for one or more tasks",
            Operation::GetLocations => "Location IDs available for SERP queries",
        }
    }

    fn required(self) -> &'static [&'static str] {
        match self {
            Operation::AddTasks => &["searchEngine", "device", "languageCode", "locationId", "keywords"],
            Operation::GetResults | Operation::GetAdvancedResults => &["taskId"],
            Operation::ListTasks | Operation::GetLocations => &[],
        }
    }

    fn fields(self) -> &'static [FieldSpec] {
        match self {
            Operation::ListTasks => LIST_FIELDS,
            _ => &[],
        }
    }

    fn collection(self) -> &'static str {
        match self {
            Operation::ListTasks => "listFilters",
            _ => "additionalFields",
        }
    }

    fn build(self, p: &ItemParams) -> Result<Plan, NodeError> {
        match self {
            Operation::AddTasks => {
                let keywords =
                    validate::keywords(&p.string("keywords")).map_err(|e| e.at(p.item))?;
                let location_id = p.number("locationId", "locationId")?.floor() as i64;
                let mut req = RequestDescriptor::post(TASKS_PATH)
                    .body("search_engine", text_param(p, "searchEngine", "Search engine")?)
                    .body("device", p.string_or("device", "desktop"))
                    .body("language_code", text_param(p, "languageCode", "Language code")?)
                    .body("location_id", location_id)
                    .body(
                        "query",
                        Value::Array(keywords.into_iter().map(Value::String).collect()),
                    );
                let tag = p.string("tag");
                if !tag.trim().is_empty() {
                    req = req.body("tag", tag);
                }
                Ok(Plan::single_with(req, PostProcess::TaskIds))
            }
            Operation::GetResults => {
                let req = RequestDescriptor::get(TASKS_PATH)
                    .query("task_id", text_param(p, "taskId", "taskId")?);
                Ok(Plan::single_with(req, PostProcess::Processing))
            }
            Operation::ListTasks => Ok(Plan::single(with_fields(
                RequestDescriptor::get(TASKS_PATH),
                self,
                p,
            ))),
            Operation::GetAdvancedResults => {
                let ids = validate::task_ids(&p.string("taskId")).map_err(|e| e.at(p.item))?;
                let calls = ids
                    .into_iter()
                    .map(|id| Call {
                        request: RequestDescriptor::get("/serp/classic/tasks/results_advanced")
                            .query("task_id", id.as_str()),
                        post: PostProcess::AdvancedResult(id),
                    })
                    .collect();
                Ok(Plan::each(calls))
            }
            Operation::GetLocations => {
                let mut req = RequestDescriptor::get("/serp/classic/locations");
                for (param, key) in [("countryCode", "country_code"), ("q", "q")] {
                    let v = p.string(param);
                    if !v.trim().is_empty() {
                        req = req.query(key, v.trim());
                    }
                }
                Ok(Plan::single_with(req, PostProcess::UnwrapData))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::testing::{item, params};
    use serde_json::json;

    fn build(v: Value) -> Result<Plan, NodeError> {
        let p = params(v);
        Resource::SerpClassic.build(&item(&p))
    }

    #[test]
    fn add_tasks_builds_json_body() {
        let plan = build(json!({
            "operation": "addTasks",
            "searchEngine": "google",
            "device": "mobile",
            "languageCode": "en",
            "locationId": "31808",
            "keywords": "avocado\ninterstellar",
            "tag": "campaign-1"
        }))
        .unwrap();
        let call = &plan.calls[0];
        assert_eq!(call.post, PostProcess::TaskIds);
        assert_eq!(
            Value::Object(call.request.body.clone()),
            json!({
                "search_engine": "google",
                "device": "mobile",
                "language_code": "en",
                "location_id": 31808,
                "query": ["avocado", "interstellar"],
                "tag": "campaign-1"
            })
        );
    }

    #[test]
    fn add_tasks_rejects_non_numeric_location() {
        let err = build(json!({
            "operation": "addTasks",
            "searchEngine": "google",
            "languageCode": "en",
            "locationId": "new york",
            "keywords": "avocado"
        }))
        .unwrap_err();
        assert_eq!(err.to_string(), "locationId must be a valid integer");
    }

    #[test]
    fn advanced_results_fan_out_per_task() {
        let plan = build(json!({"operation": "getAdvancedResults", "taskId": "14, 15\n16"})).unwrap();
        assert!(plan.aggregate);
        let ids: Vec<_> = plan
            .calls
            .iter()
            .map(|c| c.request.query["task_id"].clone())
            .collect();
        assert_eq!(ids, vec![json!("14"), json!("15"), json!("16")]);
    }

    #[test]
    fn locations_skip_blank_filters() {
        let plan = build(json!({"operation": "getLocations", "countryCode": "US", "q": "  "})).unwrap();
        let call = &plan.calls[0];
        assert_eq!(Value::Object(call.request.query.clone()), json!({"country_code": "US"}));
        assert_eq!(call.post, PostProcess::UnwrapData);
    }

    #[test]
    fn results_need_a_task_id() {
        assert!(build(json!({"operation": "getResults"})).is_err());
        let plan = build(json!({"operation": "listTasks", "listFilters": {"limit": 5}})).unwrap();
        assert_eq!(plan.request().unwrap().query["limit"], 5);
    }
}
