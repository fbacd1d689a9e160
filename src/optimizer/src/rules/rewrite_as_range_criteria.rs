use common::logical_plan::{NodeIndex, NodeType, PlanTree, PlanValue, Property};
use common::{Comparison, Constraint, Operator};

/// Returns runs of directly stacked SELECT nodes, top first.
fn select_chains(plan: &PlanTree) -> Vec<Vec<NodeIndex>> {
    let mut chains = Vec::new();
    for select in plan.find_all(NodeType::Select) {
        let continues_chain = plan
            .parent(select)
            .map_or(false, |p| plan.node(p).is(NodeType::Select));
        if continues_chain {
            continue;
        }
        let mut chain = vec![select];
        let mut current = select;
        while let Some(child) = plan.first_child(current) {
            if !plan.node(child).is(NodeType::Select) {
                break;
            }
            chain.push(child);
            current = child;
        }
        if chain.len() > 1 {
            chains.push(chain);
        }
    }
    chains
}

fn comparison(plan: &PlanTree, select: NodeIndex) -> Option<&Comparison> {
    match plan.node(select).criteria() {
        Some(Constraint::Comparison(comparison)) => Some(comparison),
        _ => None,
    }
}

/// Builds the range for a lower and an upper bound on the same operand.
fn range(lower: &Comparison, upper: &Comparison) -> Option<Constraint> {
    if lower.operand1 != upper.operand1
        || !lower.operator.is_lower_bound()
        || !upper.operator.is_upper_bound()
    {
        return None;
    }
    Some(Constraint::Between {
        operand: lower.operand1.clone(),
        lower: lower.operand2.clone(),
        upper: upper.operand2.clone(),
        include_lower: lower.operator == Operator::GreaterThanOrEqualTo,
        include_upper: upper.operator == Operator::LessThanOrEqualTo,
    })
}

/// Finds two SELECT nodes of `chain` that bound the same operand from both sides.
fn find_pair(plan: &PlanTree, chain: &[NodeIndex]) -> Option<(NodeIndex, NodeIndex, Constraint)> {
    for first in chain {
        for second in chain {
            if first == second {
                continue;
            }
            if let (Some(lower), Some(upper)) = (comparison(plan, *first), comparison(plan, *second)) {
                if let Some(between) = range(lower, upper) {
                    return Some((*first, *second, between));
                }
            }
        }
    }
    None
}

/// Merges stacked SELECT nodes holding `x > a` and `x < b` (or the inclusive forms) into a
/// single SELECT holding `x BETWEEN a AND b`.
pub(crate) fn execute(mut plan: PlanTree) -> PlanTree {
    for chain in select_chains(&plan) {
        let mut chain = chain;
        while let Some((keep, merged, between)) = find_pair(&plan, &chain) {
            debug!("rewriting range criteria as {}", between);
            plan.node_mut(keep)
                .set(Property::SelectCriteria, PlanValue::Constraint(between));
            plan.extract_from_parent(merged);
            chain.retain(|s| *s != merged);
        }
    }
    plan
}

#[cfg(test)]
mod test {
    use super::*;
    use common::DynamicOperand;

    fn chain(criteria: Vec<Constraint>) -> PlanTree {
        let mut plan = PlanTree::new();
        let mut parent = None;
        for c in criteria {
            let select = plan.add_node(NodeType::Select);
            plan.node_mut(select)
                .set(Property::SelectCriteria, PlanValue::Constraint(c));
            if let Some(parent) = parent {
                plan.add_last_child(parent, select);
            }
            parent = Some(select);
        }
        let source = plan.add_node(NodeType::Source);
        if let Some(parent) = parent {
            plan.add_last_child(parent, source);
        }
        plan
    }

    fn criteria(plan: &PlanTree) -> Vec<String> {
        plan.find_all(NodeType::Select)
            .into_iter()
            .map(|s| plan.node(s).criteria().unwrap().to_string())
            .collect()
    }

    fn year() -> DynamicOperand {
        DynamicOperand::property("cars", "year")
    }

    #[test]
    fn test_bounds_become_between() {
        let plan = chain(vec![
            Constraint::comparison(year(), Operator::LessThanOrEqualTo, 2010i64),
            Constraint::comparison(DynamicOperand::property("cars", "maker"), Operator::EqualTo, "Honda"),
            Constraint::comparison(year(), Operator::GreaterThan, 2000i64),
        ]);
        let plan = execute(plan);
        assert_eq!(
            criteria(&plan),
            vec![
                "cars.maker = 'Honda'".to_string(),
                "cars.year BETWEEN 2000 EXCLUSIVE AND 2010".to_string(),
            ]
        );
    }

    #[test]
    fn test_different_operands_are_kept() {
        let plan = chain(vec![
            Constraint::comparison(year(), Operator::GreaterThan, 2000i64),
            Constraint::comparison(DynamicOperand::property("cars", "msrp"), Operator::LessThan, 20000.0),
        ]);
        let before = criteria(&plan);
        assert_eq!(criteria(&execute(plan)), before);
    }
}
