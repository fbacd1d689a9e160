use common::logical_plan::{NodeIndex, NodeType, PlanTree, PlanValue, Property};
use common::{Constraint, JoinCondition, JoinType, SelectorName};

/// Copies criteria on one side of an inner equi-join to the column it is joined with.
///
/// For `a.x = b.y`, a SELECT reading only `a.x` gets a counterpart reading `b.y`, placed
/// above the join so that later rules can push it into the other input.
pub(crate) fn execute(mut plan: PlanTree) -> PlanTree {
    for join in plan.find_all(NodeType::Join) {
        if plan.node(join).join_type() != Some(&JoinType::Inner) {
            continue;
        }
        let (left, right) = match plan.node(join).join_condition() {
            Some(JoinCondition::EquiJoin {
                selector1,
                property1,
                selector2,
                property2,
            }) => (
                (selector1.clone(), property1.clone()),
                (selector2.clone(), property2.clone()),
            ),
            _ => continue,
        };
        let existing = all_criteria(&plan);
        let mut copies = Vec::new();
        for criteria in &existing {
            for (from, to) in &[(&left, &right), (&right, &left)] {
                if let Some(copy) = copy_onto(criteria, from, to) {
                    if !existing.contains(&copy) && !copies.contains(&copy) {
                        copies.push(copy);
                    }
                }
            }
        }
        for copy in copies {
            debug!("copied criteria {} across join {}", copy, join);
            let select = plan.add_node(NodeType::Select);
            plan.node_mut(select)
                .set(Property::SelectCriteria, PlanValue::Constraint(copy));
            plan.insert_as_parent(join, select);
        }
    }
    if let Some(root) = plan.root() {
        plan.recompute_selectors(root);
    }
    plan
}

fn all_criteria(plan: &PlanTree) -> Vec<Constraint> {
    plan.find_all(NodeType::Select)
        .into_iter()
        .filter_map(|s: NodeIndex| plan.node(s).criteria().cloned())
        .collect()
}

/// Rewrites `criteria` from column `from` to column `to` if it reads `from` and nothing else.
fn copy_onto(
    criteria: &Constraint,
    from: &(SelectorName, String),
    to: &(SelectorName, String),
) -> Option<Constraint> {
    let columns = criteria.referenced_columns();
    if columns.len() != 1 || !columns.contains(from) {
        return None;
    }
    if let Constraint::FullTextSearch(_) = criteria {
        return None;
    }
    let mapper = |s: &SelectorName, p: Option<&str>| {
        if *s == from.0 && p == Some(from.1.as_str()) {
            Some((to.0.clone(), Some(to.1.clone())))
        } else {
            None
        }
    };
    Some(criteria.rewrite_references(&mapper))
}

#[cfg(test)]
mod test {
    use super::*;
    use common::{DynamicOperand, Operator};

    fn criteria(plan: &PlanTree) -> Vec<String> {
        all_criteria(plan).iter().map(|c| c.to_string()).collect()
    }

    /// SELECT(c.maker = 'Honda') <- JOIN(c.maker = m.name) <- (SOURCE c, SOURCE m)
    fn joined(join_type: JoinType) -> PlanTree {
        let mut plan = PlanTree::new();
        let select = plan.add_node(NodeType::Select);
        let join = plan.add_node(NodeType::Join);
        let c = plan.add_node(NodeType::Source);
        let m = plan.add_node(NodeType::Source);
        plan.add_last_child(select, join);
        plan.add_last_child(join, c);
        plan.add_last_child(join, m);
        plan.node_mut(c)
            .set(Property::SourceName, PlanValue::Selector("c".into()));
        plan.node_mut(m)
            .set(Property::SourceName, PlanValue::Selector("m".into()));
        plan.node_mut(join)
            .set(Property::JoinType, PlanValue::JoinType(join_type));
        plan.node_mut(join).set(
            Property::JoinCondition,
            PlanValue::JoinCondition(JoinCondition::equi("c", "maker", "m", "name")),
        );
        plan.node_mut(select).set(
            Property::SelectCriteria,
            PlanValue::Constraint(Constraint::comparison(
                DynamicOperand::property("c", "maker"),
                Operator::EqualTo,
                "Honda",
            )),
        );
        plan
    }

    #[test]
    fn test_criteria_are_copied_across_inner_join() {
        let plan = execute(joined(JoinType::Inner));
        assert_eq!(
            criteria(&plan),
            vec!["c.maker = 'Honda'", "m.name = 'Honda'"]
        );
        // Running again adds nothing.
        let again = execute(plan.clone());
        assert_eq!(criteria(&again), criteria(&plan));
    }

    #[test]
    fn test_outer_joins_are_skipped() {
        let plan = execute(joined(JoinType::LeftOuter));
        assert_eq!(criteria(&plan), vec!["c.maker = 'Honda'"]);
    }
}
