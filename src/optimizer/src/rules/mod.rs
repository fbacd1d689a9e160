//! The optimizer rules. Each rule rewrites a whole plan and may schedule further rules.

use crate::rule_stack::RuleStack;
use common::logical_plan::PlanTree;
use common::QueryContext;
use std::fmt;

mod add_access_nodes;
mod choose_join_algorithm;
mod copy_criteria;
mod push_projects;
mod push_select_criteria;
mod raise_select_criteria;
mod replace_views;
mod rewrite_as_range_criteria;
mod right_outer_to_left_outer;

/// Every rule the optimizer knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rule {
    /// Inlines the definitions of views read by SOURCE nodes.
    ReplaceViews,
    /// Moves SELECT nodes up to where every selector they read is visible.
    RaiseSelectCriteria,
    RightOuterToLeftOuterJoins,
    /// Copies single-column criteria across inner equi-joins.
    CopyCriteria,
    /// Puts an ACCESS node above every SOURCE.
    AddAccessNodes,
    PushSelectCriteria,
    PushProjects,
    RewriteAsRangeCriteria,
    ChooseJoinAlgorithm,
}

impl Rule {
    pub fn name(&self) -> &'static str {
        match self {
            Rule::ReplaceViews => "ReplaceViews",
            Rule::RaiseSelectCriteria => "RaiseSelectCriteria",
            Rule::RightOuterToLeftOuterJoins => "RightOuterToLeftOuterJoins",
            Rule::CopyCriteria => "CopyCriteria",
            Rule::AddAccessNodes => "AddAccessNodes",
            Rule::PushSelectCriteria => "PushSelectCriteria",
            Rule::PushProjects => "PushProjects",
            Rule::RewriteAsRangeCriteria => "RewriteAsRangeCriteria",
            Rule::ChooseJoinAlgorithm => "ChooseJoinAlgorithm",
        }
    }

    /// Applies the rule to `plan` and returns the rewritten plan.
    ///
    /// # Arguments
    ///
    /// * `context` - Context of the query being optimized; problems are recorded here.
    /// * `plan` - Plan to rewrite.
    /// * `stack` - Rules still to run; the rule may push rules to the front.
    pub fn execute(&self, context: &QueryContext, plan: PlanTree, stack: &mut RuleStack) -> PlanTree {
        match self {
            Rule::ReplaceViews => replace_views::execute(context, plan, stack),
            Rule::RaiseSelectCriteria => raise_select_criteria::execute(plan),
            Rule::RightOuterToLeftOuterJoins => right_outer_to_left_outer::execute(plan),
            Rule::CopyCriteria => copy_criteria::execute(plan),
            Rule::AddAccessNodes => add_access_nodes::execute(plan),
            Rule::PushSelectCriteria => push_select_criteria::execute(plan),
            Rule::PushProjects => push_projects::execute(plan),
            Rule::RewriteAsRangeCriteria => rewrite_as_range_criteria::execute(plan),
            Rule::ChooseJoinAlgorithm => choose_join_algorithm::execute(context, plan),
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
