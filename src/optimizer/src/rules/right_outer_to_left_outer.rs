use common::logical_plan::{NodeType, PlanTree, PlanValue, Property};
use common::JoinType;

/// Rewrites every RIGHT OUTER join as a LEFT OUTER join of the swapped inputs.
pub(crate) fn execute(mut plan: PlanTree) -> PlanTree {
    for join in plan.find_all(NodeType::Join) {
        if plan.node(join).join_type() != Some(&JoinType::RightOuter) {
            continue;
        }
        let children = plan.children(join).to_vec();
        if let [left, right] = children[..] {
            plan.remove_from_parent(left);
            plan.add_last_child(join, left);
            debug!("swapped inputs {} and {} of right outer join", left, right);
        }
        plan.node_mut(join)
            .set(Property::JoinType, PlanValue::JoinType(JoinType::LeftOuter));
    }
    plan
}
