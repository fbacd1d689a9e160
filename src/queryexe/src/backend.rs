use crate::analyzer::Analyzer;
use crate::columns::Columns;
use crate::components::ProcessingComponent;
use common::logical_plan::{NodeIndex, PlanTree};
use common::{ArborError, QueryContext};
use std::sync::Arc;

/// Storage a query reads its rows from.
///
/// This is the one piece of backend-specific code the engine needs; every other plan node
/// is processed by a generic component.
pub trait Backend: Send + Sync {
    /// Creates the component producing the rows of an ACCESS node (or of a SOURCE node that is
    /// not under one).
    ///
    /// # Arguments
    ///
    /// * `context` - Context of the query.
    /// * `plan` - The optimized plan.
    /// * `access` - The ACCESS or SOURCE node. SELECT and PROJECT nodes between an ACCESS node
    ///   and its SOURCE must be applied by the component; see
    ///   [`apply_access_nodes`](crate::apply_access_nodes).
    /// * `columns` - Shape the rows must have.
    /// * `analyzer` - Matching semantics for full-text search constraints.
    fn create_access_component(
        &self,
        context: &QueryContext,
        plan: &PlanTree,
        access: NodeIndex,
        columns: &Columns,
        analyzer: &Arc<dyn Analyzer>,
    ) -> Result<Box<dyn ProcessingComponent>, ArborError>;
}
