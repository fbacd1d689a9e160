#[macro_use]
extern crate log;

mod canonical_planner;

pub use canonical_planner::CanonicalPlanner;

use common::logical_plan::PlanTree;
use common::{Query, QueryContext};

/// Turns a query into an initial plan.
///
/// Planning never fails: problems are recorded in the context and a best-effort plan is
/// returned so later stages can stop on `problems().has_errors()`.
pub trait Planner: Send + Sync {
    fn plan(&self, context: &QueryContext, query: &Query) -> PlanTree;
}
