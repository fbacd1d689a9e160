use common::logical_plan::{NodeType, PlanTree};

/// Puts an ACCESS node directly above every SOURCE that does not have one.
pub(crate) fn execute(mut plan: PlanTree) -> PlanTree {
    for source in plan.find_all(NodeType::Source) {
        let has_access = plan
            .parent(source)
            .map_or(false, |p| plan.node(p).is(NodeType::Access));
        if !has_access {
            let access = plan.add_node(NodeType::Access);
            plan.insert_as_parent(source, access);
        }
    }
    if let Some(root) = plan.root() {
        plan.recompute_selectors(root);
    }
    plan
}

#[cfg(test)]
mod test {
    use super::*;
    use common::logical_plan::{PlanValue, Property};

    #[test]
    fn test_access_above_each_source() {
        let mut plan = PlanTree::new();
        let join = plan.add_node(NodeType::Join);
        for name in &["a", "b"] {
            let source = plan.add_node(NodeType::Source);
            plan.node_mut(source)
                .set(Property::SourceName, PlanValue::Selector((*name).into()));
            plan.add_last_child(join, source);
        }
        let plan = execute(plan);
        for child in plan.children(join) {
            assert!(plan.node(*child).is(NodeType::Access));
            let source = plan.first_child(*child).unwrap();
            assert!(plan.node(source).is(NodeType::Source));
            assert_eq!(plan.node(*child).selectors().len(), 1);
        }
        // A second run adds nothing.
        let count = plan.node_count();
        assert_eq!(execute(plan).node_count(), count);
    }
}
