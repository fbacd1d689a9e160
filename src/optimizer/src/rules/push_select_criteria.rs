use common::logical_plan::{NodeIndex, NodeType, PlanTree, PlanValue, Property};
use common::{JoinType, SelectorName};
use std::collections::BTreeSet;

/// Where a SELECT ends up after pushing it down.
#[derive(Debug, PartialEq)]
enum Destination {
    /// Directly above this node.
    Above(NodeIndex),
    /// Directly below this ACCESS node.
    Into(NodeIndex),
}

/// Walks down from `start` as far as criteria reading `needed` may go.
///
/// Stops at LIMIT and DUP_REMOVE nodes, at a JOIN when no input sees every needed selector
/// or the input that does is the null-supplying side of an outer join, and at ACCESS nodes.
fn destination(plan: &PlanTree, start: NodeIndex, needed: &BTreeSet<SelectorName>) -> Destination {
    let mut current = start;
    loop {
        let node = plan.node(current);
        match node.node_type() {
            NodeType::Access => {
                if node.selectors().is_superset(needed) {
                    return Destination::Into(current);
                }
                return Destination::Above(current);
            }
            NodeType::Select | NodeType::Sort | NodeType::Project => match plan.first_child(current) {
                Some(child) => current = child,
                None => return Destination::Above(current),
            },
            NodeType::Join => {
                let join_type = node.join_type().copied().unwrap_or(JoinType::Inner);
                let covering = node
                    .children()
                    .iter()
                    .enumerate()
                    .find(|(_, c)| plan.node(**c).selectors().is_superset(needed));
                match covering {
                    Some((0, left)) if !join_type.preserves_right() => current = *left,
                    Some((1, right)) if !join_type.preserves_left() => current = *right,
                    _ => return Destination::Above(current),
                }
            }
            NodeType::Limit | NodeType::DupRemove | NodeType::Source => {
                return Destination::Above(current)
            }
        }
    }
}

/// Moves every SELECT down to the lowest node that sees all the selectors its criteria
/// read, ideally into an ACCESS node.
pub(crate) fn execute(mut plan: PlanTree) -> PlanTree {
    let root = match plan.root() {
        Some(root) => root,
        None => return plan,
    };
    plan.recompute_selectors(root);
    for select in plan.find_all(NodeType::Select) {
        let criteria = match plan.node(select).criteria() {
            Some(criteria) => criteria.clone(),
            None => continue,
        };
        let start = match plan.first_child(select) {
            Some(child) => child,
            None => continue,
        };
        let destination = destination(&plan, start, &criteria.selector_names());
        let below = match destination {
            Destination::Above(node) if node == start => continue,
            Destination::Above(node) => node,
            Destination::Into(access) => match plan.first_child(access) {
                Some(child) if child != select => child,
                _ => continue,
            },
        };
        debug!("pushing SELECT {} down above {}", criteria, plan.node(below));
        plan.extract_from_parent(select);
        let pushed = plan.add_node(NodeType::Select);
        plan.node_mut(pushed)
            .set(Property::SelectCriteria, PlanValue::Constraint(criteria));
        plan.insert_as_parent(below, pushed);
        if let Some(root) = plan.root() {
            plan.recompute_selectors(root);
        }
    }
    plan
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::rules::add_access_nodes;
    use common::testutil::{cars_context, init};
    use common::{Constraint, DynamicOperand, JoinCondition, Operator, QueryBuilder};
    use planner::{CanonicalPlanner, Planner};

    fn types_below(plan: &PlanTree, index: NodeIndex) -> Vec<NodeType> {
        plan.find_all_at_or_below(index, None)
            .into_iter()
            .map(|i| plan.node_type(i))
            .collect()
    }

    fn joined_plan(join_type: JoinType) -> PlanTree {
        let context = cars_context();
        let query = QueryBuilder::new()
            .from_as("cars", "c")
            .join(
                join_type,
                "makers",
                "m",
                Some(JoinCondition::equi("c", "maker", "m", "name")),
            )
            .where_(Constraint::comparison(
                DynamicOperand::property("m", "country"),
                Operator::EqualTo,
                "Japan",
            ))
            .where_(Constraint::comparison(
                DynamicOperand::property("c", "year"),
                Operator::GreaterThan,
                2000i64,
            ))
            .build()
            .unwrap();
        add_access_nodes::execute(CanonicalPlanner.plan(&context, &query))
    }

    #[test]
    fn test_criteria_pushed_into_access() {
        init();
        let plan = execute(joined_plan(JoinType::Inner));
        let join = plan.find_all(NodeType::Join)[0];
        assert!(plan.find_all_at_or_below(plan.root().unwrap(), Some(&[NodeType::Select]))
            .into_iter()
            .all(|s| plan.is_below(s, join)));
        let children = plan.children(join).to_vec();
        assert_eq!(
            types_below(&plan, children[0]),
            vec![NodeType::Access, NodeType::Select, NodeType::Source]
        );
        assert_eq!(
            types_below(&plan, children[1]),
            vec![NodeType::Access, NodeType::Select, NodeType::Source]
        );
    }

    #[test]
    fn test_null_supplying_side_is_not_filtered() {
        init();
        let plan = execute(joined_plan(JoinType::LeftOuter));
        let join = plan.find_all(NodeType::Join)[0];
        let children = plan.children(join).to_vec();
        // c.year moves into the preserved side; m.country stays above the join.
        assert_eq!(
            types_below(&plan, children[0]),
            vec![NodeType::Access, NodeType::Select, NodeType::Source]
        );
        assert_eq!(
            types_below(&plan, children[1]),
            vec![NodeType::Access, NodeType::Source]
        );
        let parent = plan.parent(join).unwrap();
        assert!(plan.node(parent).is(NodeType::Select));
        assert_eq!(
            plan.node(parent).criteria().unwrap().to_string(),
            "m.country = 'Japan'"
        );
    }

    #[test]
    fn test_criteria_stay_above_limit() {
        init();
        let mut plan = PlanTree::new();
        let select = plan.add_node(NodeType::Select);
        let limit = plan.add_node(NodeType::Limit);
        let source = plan.add_node(NodeType::Source);
        plan.add_last_child(select, limit);
        plan.add_last_child(limit, source);
        plan.node_mut(source)
            .set(Property::SourceName, PlanValue::Selector("a".into()));
        plan.node_mut(select).set(
            Property::SelectCriteria,
            PlanValue::Constraint(Constraint::comparison(
                DynamicOperand::property("a", "x"),
                Operator::EqualTo,
                1i64,
            )),
        );
        let plan = execute(plan);
        assert_eq!(plan.root(), Some(select));
        assert_eq!(plan.first_child(select), Some(limit));
    }
}
