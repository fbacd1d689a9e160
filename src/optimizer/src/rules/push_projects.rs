use crate::plan_util::{columns_required_outside, requires_all_columns};
use common::logical_plan::{NodeIndex, NodeType, PlanTree, PlanValue, Property};
use common::schemata::pseudo_column_type;
use common::{Column, DataType};

/// True if `project` only narrows the columns seen by another PROJECT above it.
///
/// A PROJECT under a DUP_REMOVE decides which rows are duplicates, so it is never redundant.
fn is_redundant(plan: &PlanTree, project: NodeIndex) -> bool {
    for ancestor in plan.ancestors(project) {
        match plan.node_type(ancestor) {
            NodeType::Project => return true,
            NodeType::DupRemove | NodeType::Access => return false,
            _ => {}
        }
    }
    false
}

/// Removes projections made redundant by view inlining, then places a PROJECT inside each
/// ACCESS node that keeps only the columns the rest of the plan reads.
pub(crate) fn execute(mut plan: PlanTree) -> PlanTree {
    for project in plan.find_all(NodeType::Project) {
        if is_redundant(&plan, project) {
            debug!("removing redundant {}", plan.node(project));
            plan.extract_from_parent(project);
        }
    }
    for access in plan.find_all(NodeType::Access) {
        if plan.find_at_or_below(access, NodeType::Project).is_some() {
            continue;
        }
        let below = match plan.first_child(access) {
            Some(child) => child,
            None => continue,
        };
        let sources = plan.find_all_at_or_below(access, Some(&[NodeType::Source]));
        let mut columns = Vec::new();
        let mut types = Vec::new();
        let mut everything = false;
        for source in sources {
            let node = plan.node(source);
            let selector = match node.selector_name() {
                Some(selector) => selector.clone(),
                None => continue,
            };
            let required = columns_required_outside(&plan, access, &selector);
            if requires_all_columns(&required) {
                everything = true;
                break;
            }
            for property in required {
                let dtype = node
                    .source_columns()
                    .and_then(|cols| cols.iter().find(|c| c.name == property))
                    .map(|c| c.dtype)
                    .or_else(|| pseudo_column_type(&property))
                    .unwrap_or(DataType::String);
                columns.push(Column::new(selector.clone(), property));
                types.push(dtype);
            }
        }
        if everything {
            continue;
        }
        let project = plan.add_node(NodeType::Project);
        {
            let node = plan.node_mut(project);
            node.set(Property::ProjectColumns, PlanValue::Columns(columns));
            node.set(Property::ProjectColumnTypes, PlanValue::Types(types));
        }
        plan.insert_as_parent(below, project);
        debug!("projected {} inside access node {}", plan.node(project), access);
    }
    if let Some(root) = plan.root() {
        plan.recompute_selectors(root);
    }
    plan
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::rules::{add_access_nodes, replace_views};
    use crate::RuleStack;
    use common::testutil::{cars_context, init};
    use common::{Constraint, DynamicOperand, FullTextSearch, Operator, QueryBuilder};
    use planner::{CanonicalPlanner, Planner};

    fn access_columns(plan: &PlanTree) -> Vec<Vec<String>> {
        plan.find_all(NodeType::Access)
            .into_iter()
            .filter_map(|a| plan.find_at_or_below(a, NodeType::Project))
            .map(|p| {
                plan.node(p)
                    .project_columns()
                    .unwrap()
                    .iter()
                    .map(|c| c.to_string())
                    .collect()
            })
            .collect()
    }

    #[test]
    fn test_only_required_columns_are_read() {
        init();
        let context = cars_context();
        let query = QueryBuilder::new()
            .select("cars", "model")
            .from("cars")
            .where_(Constraint::comparison(
                DynamicOperand::property("cars", "year"),
                Operator::GreaterThan,
                2000i64,
            ))
            .build()
            .unwrap();
        let plan = add_access_nodes::execute(CanonicalPlanner.plan(&context, &query));
        let plan = execute(plan);
        assert_eq!(
            access_columns(&plan),
            vec![vec!["cars.model".to_string(), "cars.year".to_string()]]
        );
        let project = plan.find_at_or_below(plan.find_all(NodeType::Access)[0], NodeType::Project);
        let types = plan.node(project.unwrap()).project_column_types().unwrap();
        assert_eq!(types, &vec![DataType::String, DataType::Long]);
    }

    #[test]
    fn test_view_projection_is_removed() {
        init();
        let context = cars_context();
        let query = QueryBuilder::new()
            .select("v", "carModel")
            .from_as("car_models", "v")
            .join(common::JoinType::Cross, "makers", "m", None)
            .build()
            .unwrap();
        let plan = CanonicalPlanner.plan(&context, &query);
        let plan = replace_views::execute(&context, plan, &mut RuleStack::new());
        assert_eq!(plan.find_all(NodeType::Project).len(), 2);
        let plan = execute(add_access_nodes::execute(plan));
        // One PROJECT at the top and one inside each ACCESS.
        assert_eq!(plan.find_all(NodeType::Project).len(), 3);
        assert_eq!(
            access_columns(&plan),
            vec![vec!["v.model".to_string()], Vec::<String>::new()]
        );
    }

    #[test]
    fn test_full_text_on_node_reads_everything() {
        init();
        let context = cars_context();
        let query = QueryBuilder::new()
            .select("cars", "model")
            .from("cars")
            .where_(Constraint::FullTextSearch(
                FullTextSearch::new("cars", None, "civic").unwrap(),
            ))
            .build()
            .unwrap();
        let plan = execute(add_access_nodes::execute(CanonicalPlanner.plan(&context, &query)));
        assert!(access_columns(&plan).is_empty());
    }
}
