pub mod catalog;
pub mod render;
pub mod runner;

pub use runner::run_report;

use serde::Serialize;

use crate::error::StepFailure;
use crate::model::Post;
use crate::query::GroupRow;
use crate::store::UpdateSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OpKind {
    Query,
    Mutation,
    Aggregation,
}

impl OpKind {
    pub fn as_str(self) -> &'static str {
        match self {
            OpKind::Query => "QUERY",
            OpKind::Mutation => "MUTATION",
            OpKind::Aggregation => "AGGREGATION",
        }
    }
}

/// Outcome of a single catalog step.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Payload {
    Documents(Vec<Post>),
    InsertedId(String),
    Updated(UpdateSummary),
    Deleted { deleted: u64 },
    Groups(Vec<GroupRow>),
}

#[derive(Debug, Clone, Serialize)]
pub struct NamedResult {
    pub name: &'static str,
    pub kind: OpKind,
    pub payload: Payload,
}

/// Everything one pass over the catalog produced. `failures` holds step
/// failures the run recovered from; `aborted` the failure that cut the
/// catalog short, if any.
#[derive(Debug, Default, Serialize)]
pub struct ReportRun {
    pub results: Vec<NamedResult>,
    pub failures: Vec<StepFailure>,
    pub aborted: Option<StepFailure>,
}

impl ReportRun {
    pub fn succeeded(&self) -> bool {
        self.failures.is_empty() && self.aborted.is_none()
    }
}
