use crate::rule_stack::RuleStack;
use crate::rules::Rule;
use common::logical_plan::{NodeType, PlanTree};
use common::QueryContext;

/// Rewrites a plan into an equivalent one that is cheaper to execute.
pub trait Optimizer: Send + Sync {
    /// Optimizes `plan`. Problems found along the way are recorded in the context.
    fn optimize(&self, context: &QueryContext, plan: PlanTree) -> PlanTree;
}

/// Optimizer that runs rules from a [`RuleStack`] until the stack is empty.
///
/// Rules may schedule further rules, so the number of rules run can exceed the number
/// initially scheduled.
#[derive(Debug, Default, Clone, Copy)]
pub struct RuleBasedOptimizer;

impl RuleBasedOptimizer {
    pub fn new() -> Self {
        RuleBasedOptimizer
    }

    /// Schedules the rules a plan needs, in the order they should run.
    ///
    /// View replacement and the join rules are only scheduled if the plan reads a view or
    /// joins; range rewriting can be turned off through the hints.
    pub fn populate_rule_stack(&self, context: &QueryContext, plan: &PlanTree, stack: &mut RuleStack) {
        let sources = plan.find_all(NodeType::Source);
        let has_view = sources.iter().any(|s| {
            plan.node(*s)
                .source_name()
                .and_then(|name| context.schemata().table(name))
                .map_or(false, |table| table.is_view())
        });
        // An inlined view may bring joins of its own.
        let has_join = has_view || !plan.find_all(NodeType::Join).is_empty();

        if has_view {
            stack.add_last(Rule::ReplaceViews);
        }
        if has_join {
            stack.add_last(Rule::RightOuterToLeftOuterJoins);
            stack.add_last(Rule::CopyCriteria);
        }
        stack.add_last(Rule::AddAccessNodes);
        stack.add_last(Rule::PushSelectCriteria);
        stack.add_last(Rule::PushProjects);
        if context.hints().rewrite_range_criteria {
            stack.add_last(Rule::RewriteAsRangeCriteria);
        }
        if has_join {
            stack.add_last(Rule::ChooseJoinAlgorithm);
        }
    }
}

impl Optimizer for RuleBasedOptimizer {
    fn optimize(&self, context: &QueryContext, plan: PlanTree) -> PlanTree {
        let mut stack = RuleStack::new();
        self.populate_rule_stack(context, &plan, &mut stack);
        debug!("optimizing with rules {}", stack);
        let mut plan = plan;
        while let Some(rule) = stack.pop() {
            debug!("running rule {}", rule);
            plan = rule.execute(context, plan, &mut stack);
            trace!("plan after {}:\n{}", rule, plan);
        }
        debug!("optimized plan:\n{}", plan);
        plan
    }
}
