use common::logical_plan::{NodeIndex, NodeType, PlanTree, PlanValue, Property};
use common::schemata::PATH_COLUMN;
use common::{DynamicOperand, JoinAlgorithm, JoinCondition, JoinType, Ordering, QueryContext, SelectorName};

/// True if rows matched by `condition` can be found by merging inputs sorted on one key.
fn mergeable(condition: Option<&JoinCondition>) -> bool {
    match condition {
        Some(JoinCondition::EquiJoin { .. }) => true,
        Some(JoinCondition::SameNode { path, .. }) => path.is_none(),
        _ => false,
    }
}

fn key_ordering(selector: SelectorName, property: String) -> Ordering {
    if property == PATH_COLUMN {
        Ordering::ascending(DynamicOperand::NodePath(selector))
    } else {
        Ordering::ascending(DynamicOperand::property(selector, property))
    }
}

/// Puts a SORT on `ordering` above `child` unless one is already there.
fn sort_input(plan: &mut PlanTree, child: NodeIndex, ordering: Ordering) {
    let orderings = vec![ordering];
    if plan.node(child).sort_orderings() == Some(&orderings) {
        return;
    }
    let sort = plan.add_node(NodeType::Sort);
    plan.node_mut(sort)
        .set(Property::SortOrderBy, PlanValue::Orderings(orderings));
    plan.insert_as_parent(child, sort);
}

/// Picks the algorithm of every JOIN.
///
/// Inner equi-joins and same-node joins use MERGE, with both inputs sorted on the join key,
/// unless the hints allow only nested loops. Every other join uses NESTED_LOOP.
pub(crate) fn execute(context: &QueryContext, mut plan: PlanTree) -> PlanTree {
    let nested_only = context.hints().use_only_nested_join_algorithm;
    for join in plan.find_all(NodeType::Join) {
        let node = plan.node(join);
        let inner = node.join_type() == Some(&JoinType::Inner);
        let children = node.children().to_vec();
        let condition = node.join_condition().cloned();
        let algorithm = if !nested_only && inner && children.len() == 2 && mergeable(condition.as_ref()) {
            JoinAlgorithm::Merge
        } else {
            JoinAlgorithm::NestedLoop
        };
        if let (JoinAlgorithm::Merge, Some(condition)) = (algorithm, condition) {
            let ((s1, p1), (s2, p2)) = condition.join_columns();
            let (left_key, right_key) = if plan.node(children[0]).selectors().contains(&s1) {
                ((s1, p1), (s2, p2))
            } else {
                ((s2, p2), (s1, p1))
            };
            sort_input(&mut plan, children[0], key_ordering(left_key.0, left_key.1));
            sort_input(&mut plan, children[1], key_ordering(right_key.0, right_key.1));
        }
        debug!("join {} uses {}", join, algorithm);
        plan.node_mut(join)
            .set(Property::JoinAlgorithm, PlanValue::JoinAlgorithm(algorithm));
    }
    if let Some(root) = plan.root() {
        plan.recompute_selectors(root);
    }
    plan
}
