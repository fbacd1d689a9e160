use crate::analyzer::Analyzer;
use crate::backend::Backend;
use crate::columns::Columns;
use crate::components::{
    DuplicateRemove, LimitComponent, MergeJoin, NestedLoopJoin, ProcessingComponent, Project,
    Select, Sort,
};
use common::logical_plan::{NodeIndex, NodeType, PlanTree};
use common::{ArborError, JoinAlgorithm, JoinType, Limit, QueryContext};
use std::sync::Arc;

fn malformed(plan: &PlanTree, index: NodeIndex) -> ArborError {
    ArborError::ExecutionError(format!("Malformed plan at {}", plan.node(index)))
}

/// Creates the component for a node with a single input.
fn single_input_component(
    context: &QueryContext,
    plan: &PlanTree,
    index: NodeIndex,
    child: Box<dyn ProcessingComponent>,
    analyzer: &Arc<dyn Analyzer>,
) -> Result<Box<dyn ProcessingComponent>, ArborError> {
    let node = plan.node(index);
    let component: Box<dyn ProcessingComponent> = match node.node_type() {
        NodeType::Select => {
            let criteria = node.criteria().ok_or_else(|| malformed(plan, index))?;
            Box::new(Select::new(
                child,
                criteria.clone(),
                context.variables().clone(),
                analyzer.clone(),
            ))
        }
        NodeType::Project => Box::new(Project::new(child, Columns::for_node(plan, index))?),
        NodeType::Sort => {
            let orderings = node.sort_orderings().ok_or_else(|| malformed(plan, index))?;
            Box::new(Sort::new(
                child,
                orderings.clone(),
                context.variables().clone(),
                analyzer.clone(),
            ))
        }
        NodeType::Limit => {
            let limit = node.limit().copied().unwrap_or(Limit::NONE);
            Box::new(LimitComponent::new(child, limit))
        }
        NodeType::DupRemove => Box::new(DuplicateRemove::new(child)),
        _ => return Err(malformed(plan, index)),
    };
    Ok(component)
}

/// Applies the nodes between an ACCESS node and its SOURCE to the rows scanned for the SOURCE.
///
/// # Arguments
///
/// * `context` - Context of the query.
/// * `plan` - The optimized plan.
/// * `access` - The ACCESS node.
/// * `scan` - Rows of the SOURCE under `access`.
/// * `analyzer` - Matching semantics for full-text search constraints.
pub fn apply_access_nodes(
    context: &QueryContext,
    plan: &PlanTree,
    access: NodeIndex,
    scan: Box<dyn ProcessingComponent>,
    analyzer: &Arc<dyn Analyzer>,
) -> Result<Box<dyn ProcessingComponent>, ArborError> {
    if plan.node(access).is(NodeType::Source) {
        return Ok(scan);
    }
    let source = plan
        .find_at_or_below(access, NodeType::Source)
        .ok_or_else(|| malformed(plan, access))?;
    let mut component = scan;
    for node in plan.ancestors(source).take_while(|n| *n != access) {
        component = single_input_component(context, plan, node, component, analyzer)?;
    }
    Ok(component)
}

/// Turns an optimized plan into a tree of processing components.
///
/// Every node kind except ACCESS and SOURCE has a generic component; rows of ACCESS and
/// SOURCE nodes come from the [`Backend`].
pub struct QueryProcessor {
    backend: Arc<dyn Backend>,
    analyzer: Arc<dyn Analyzer>,
}

impl QueryProcessor {
    pub fn new(backend: Arc<dyn Backend>, analyzer: Arc<dyn Analyzer>) -> Self {
        Self { backend, analyzer }
    }

    pub fn analyzer(&self) -> &Arc<dyn Analyzer> {
        &self.analyzer
    }

    /// Creates the component producing the rows of `plan`.
    ///
    /// # Arguments
    ///
    /// * `context` - Context of the query.
    /// * `plan` - The optimized plan.
    /// * `columns` - Shape of the result rows.
    pub fn compile(
        &self,
        context: &QueryContext,
        plan: &PlanTree,
        columns: &Columns,
    ) -> Result<Box<dyn ProcessingComponent>, ArborError> {
        let root = plan
            .root()
            .ok_or_else(|| ArborError::ExecutionError(String::from("No root node")))?;
        let component = self.compile_node(context, plan, root, columns)?;
        if component.columns().len() != columns.len() {
            return Err(ArborError::ExecutionError(format!(
                "Plan produces {} but {} was expected",
                component.columns(),
                columns
            )));
        }
        Ok(component)
    }

    /// Recursive helper creating the component of the node at `index`.
    ///
    /// The children of a node are compiled before the node itself, except below ACCESS and
    /// SOURCE nodes which the backend handles in full.
    fn compile_node(
        &self,
        context: &QueryContext,
        plan: &PlanTree,
        index: NodeIndex,
        columns: &Columns,
    ) -> Result<Box<dyn ProcessingComponent>, ArborError> {
        let mut children = plan
            .children(index)
            .iter()
            .map(|c| self.compile_node(context, plan, *c, &Columns::for_node(plan, *c)));

        let node = plan.node(index);
        let result: Result<Box<dyn ProcessingComponent>, ArborError> = match node.node_type() {
            NodeType::Access | NodeType::Source => {
                self.backend
                    .create_access_component(context, plan, index, columns, &self.analyzer)
            }
            NodeType::Join => {
                let left = children.next().ok_or_else(|| malformed(plan, index))??;
                let right = children.next().ok_or_else(|| malformed(plan, index))??;
                let join_type = node.join_type().copied().unwrap_or(JoinType::Inner);
                let condition = node.join_condition().cloned();
                match (node.join_algorithm(), condition) {
                    (Some(JoinAlgorithm::Merge), Some(condition)) => Ok(Box::new(MergeJoin::new(
                        left,
                        right,
                        join_type,
                        condition,
                        context.variables().clone(),
                        self.analyzer.clone(),
                    )?)),
                    (Some(JoinAlgorithm::Merge), None) => Err(malformed(plan, index)),
                    (_, condition) => Ok(Box::new(NestedLoopJoin::new(
                        left,
                        right,
                        join_type,
                        condition,
                        context.variables().clone(),
                        self.analyzer.clone(),
                    ))),
                }
            }
            _ => {
                let child = children.next().ok_or_else(|| malformed(plan, index))??;
                single_input_component(context, plan, index, child, &self.analyzer)
            }
        };
        debug!("created component for {}", node);
        result
    }
}
