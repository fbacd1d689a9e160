use common::logical_plan::{NodeIndex, NodeType, PlanTree, PlanValue, Property};

/// Moves each SELECT whose criteria read selectors not visible below it up to the lowest
/// ancestor that sees all of them. The SELECT is placed directly above that ancestor.
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
        let needed = criteria.selector_names();
        let visible = match plan.first_child(select) {
            Some(child) => plan.node(child).selectors().clone(),
            None => continue,
        };
        if visible.is_superset(&needed) {
            continue;
        }
        let target: Option<NodeIndex> = plan
            .ancestors(select)
            .find(|a| plan.node(*a).selectors().is_superset(&needed));
        if let Some(target) = target {
            debug!("raising SELECT {} above {}", criteria, plan.node(target));
            plan.extract_from_parent(select);
            let raised = plan.add_node(NodeType::Select);
            plan.node_mut(raised)
                .set(Property::SelectCriteria, PlanValue::Constraint(criteria));
            plan.insert_as_parent(target, raised);
        }
    }
    if let Some(root) = plan.root() {
        plan.recompute_selectors(root);
    }
    plan
}
