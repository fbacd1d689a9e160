//! Inlines the plans of views read by SOURCE nodes.

use crate::plan_util::{rename_selector_in_subtree, rewrite_ancestors, ColumnMapping};
use crate::rule_stack::RuleStack;
use crate::rules::Rule;
use common::logical_plan::{NodeIndex, NodeType, PlanTree, PlanValue, Property};
use common::schemata::{pseudo_column_type, Table};
use common::{ProblemCode, QueryContext, SelectorName, Severity};
use planner::{CanonicalPlanner, Planner};
use std::collections::{HashMap, HashSet};

/// Compiled view plans, kept for one invocation of the rule.
///
/// `None` records a view whose definition failed to compile.
struct ViewPlans<'a> {
    context: &'a QueryContext,
    plans: HashMap<SelectorName, Option<PlanTree>>,
}

impl<'a> ViewPlans<'a> {
    fn new(context: &'a QueryContext) -> Self {
        Self {
            context,
            plans: HashMap::new(),
        }
    }

    fn get(&mut self, view: &Table) -> Option<&PlanTree> {
        let context = self.context;
        self.plans
            .entry(view.name().clone())
            .or_insert_with(|| compile(context, view))
            .as_ref()
    }
}

fn compile(context: &QueryContext, view: &Table) -> Option<PlanTree> {
    let definition = view.definition()?;
    let errors = context.problems().count(Severity::Error);
    let plan = CanonicalPlanner.plan(context, definition);
    if context.problems().count(Severity::Error) > errors {
        debug!("definition of view {} does not compile", view.name());
        None
    } else {
        Some(plan)
    }
}

/// Replaces every SOURCE reading a view with the plan of the view's definition.
///
/// Passes over the plan repeat until one finds no view, since an inlined plan may itself
/// read views. If anything was replaced, RaiseSelectCriteria and then this rule are
/// scheduled to run next.
pub(crate) fn execute(context: &QueryContext, mut plan: PlanTree, stack: &mut RuleStack) -> PlanTree {
    let mut views = ViewPlans::new(context);
    let mut processed: HashSet<NodeIndex> = HashSet::new();
    let mut replaced = false;
    loop {
        let mut found = false;
        for source in plan.find_all(NodeType::Source) {
            let node = plan.node(source);
            if processed.contains(&source) || node.is_flagged(Property::ViewUnresolved) {
                continue;
            }
            let view = node
                .source_name()
                .and_then(|name| context.schemata().table(name))
                .filter(|table| table.is_view());
            match view {
                Some(view) => {
                    if inline_view(context, &mut plan, source, view, &mut views) {
                        found = true;
                        replaced = true;
                    }
                }
                None => {
                    processed.insert(source);
                }
            }
        }
        if !found {
            break;
        }
    }
    if replaced {
        if stack.peek() != Some(Rule::RaiseSelectCriteria) {
            stack.add_first(Rule::RaiseSelectCriteria);
        }
        stack.add_first(Rule::ReplaceViews);
    }
    plan
}

/// Marks a SOURCE whose view stays in the plan.
fn leave_unresolved(plan: &mut PlanTree, source: NodeIndex) {
    plan.node_mut(source)
        .set(Property::ViewUnresolved, PlanValue::Flag(true));
}

/// Inlines `view` in place of `source`. Returns false if the SOURCE was left as is.
fn inline_view(
    context: &QueryContext,
    plan: &mut PlanTree,
    source: NodeIndex,
    view: &Table,
    views: &mut ViewPlans<'_>,
) -> bool {
    let view_name = view.name().clone();
    let selector = plan
        .node(source)
        .selector_name()
        .cloned()
        .unwrap_or_else(|| view_name.clone());
    let mut chain = plan.node(source).inlined_views().to_vec();

    if chain.contains(&view_name) {
        let path: Vec<String> = chain
            .iter()
            .chain(std::iter::once(&view_name))
            .map(|v| v.to_string())
            .collect();
        let path = path.join(" -> ");
        warn!("view {} is recursive: {}", view_name, path);
        context.problems().add_error(
            ProblemCode::RecursiveViewDefinition,
            vec![view_name.to_string(), path],
        );
        leave_unresolved(plan, source);
        return false;
    }

    let inlined = match views.get(view).and_then(|view_plan| plan.graft(view_plan)) {
        Some(root) => root,
        None => {
            leave_unresolved(plan, source);
            return false;
        }
    };
    if view.size() == 0 {
        context
            .problems()
            .add_warning(ProblemCode::ViewHasNoColumns, vec![view_name.to_string()]);
    }

    let inner_selectors: Vec<SelectorName> = plan.node(inlined).selectors().iter().cloned().collect();
    if inner_selectors.len() == 1 {
        rename_selector_in_subtree(plan, inlined, &inner_selectors[0], &selector);
    } else {
        qualify_inner_selectors(plan, inlined, &selector, &inner_selectors);
    }
    let inner_selectors: Vec<SelectorName> = plan.node(inlined).selectors().iter().cloned().collect();
    let mapping = column_mapping(plan, inlined, view, &selector, &inner_selectors);
    report_missing_columns(context, plan, source, &mapping, &view_name);

    let new_sources = plan.find_all_at_or_below(inlined, Some(&[NodeType::Source]));
    plan.add_last_child(source, inlined);
    rewrite_ancestors(plan, source, &|s: &SelectorName, p: Option<&str>| {
        mapping.map_reference(s, p)
    });
    plan.extract_from_parent(source);
    if let Some(root) = plan.root() {
        plan.recompute_selectors(root);
    }

    if plan.node(inlined).is(NodeType::Project) {
        let inner = plan.node(inlined).selectors().clone();
        let covering = plan
            .ancestors(inlined)
            .take_while(|a| !plan.node(*a).is(NodeType::Join))
            .find(|a| plan.node(*a).is(NodeType::Project) && plan.node(*a).selectors().is_superset(&inner));
        if covering.is_some() {
            plan.extract_from_parent(inlined);
        }
    }

    chain.push(view_name.clone());
    for new_source in new_sources {
        plan.node_mut(new_source)
            .set(Property::InlinedViews, PlanValue::Selectors(chain.clone()));
    }
    if let Some(root) = plan.root() {
        plan.recompute_selectors(root);
    }
    debug!("replaced view {} read as {}", view_name, selector);
    true
}

/// Renames the selectors of an inlined multi-selector view to `<selector>_<inner>`.
///
/// Each site a view is read from gets its own copy of the view's plan, so the copies must
/// not share selector names with each other or with the rest of the plan.
fn qualify_inner_selectors(
    plan: &mut PlanTree,
    inlined: NodeIndex,
    selector: &SelectorName,
    inner_selectors: &[SelectorName],
) {
    let mut taken: HashSet<SelectorName> = inner_selectors.iter().cloned().collect();
    if let Some(root) = plan.root() {
        taken.extend(plan.node(root).selectors().iter().cloned());
    }
    for inner in inner_selectors {
        let base = format!("{}_{}", selector, inner);
        let mut unique = SelectorName::new(base.as_str());
        let mut suffix = 1;
        while taken.contains(&unique) {
            suffix += 1;
            unique = SelectorName::new(format!("{}_{}", base, suffix));
        }
        debug!("inlined selector {} is read as {}", inner, unique);
        rename_selector_in_subtree(plan, inlined, inner, &unique);
        taken.insert(unique);
    }
}

/// Maps each column of `view` to the column its inlined plan produces for it.
///
/// Columns are matched by position when the view declares as many columns as its plan
/// projects, and by name otherwise.
fn column_mapping(
    plan: &PlanTree,
    inlined: NodeIndex,
    view: &Table,
    selector: &SelectorName,
    inner_selectors: &[SelectorName],
) -> ColumnMapping {
    let mut mapping = ColumnMapping::new(selector.clone());
    if inner_selectors.len() == 1 {
        mapping.set_default_selector(selector.clone());
    } else if let Some(first) = inner_selectors.first() {
        mapping.set_default_selector(first.clone());
    }
    let projected = plan
        .find_at_or_below(inlined, NodeType::Project)
        .and_then(|project| plan.node(project).project_columns())
        .cloned()
        .unwrap_or_default();
    if view.size() == projected.len() {
        for (column, produced) in view.columns().zip(projected.iter()) {
            mapping.map(
                column.name.clone(),
                produced.selector.clone(),
                produced.property.clone(),
            );
        }
    } else {
        for column in view.columns() {
            if let Some(produced) = projected.iter().find(|c| c.column_name() == column.name) {
                mapping.map(
                    column.name.clone(),
                    produced.selector.clone(),
                    produced.property.clone(),
                );
            }
        }
    }
    mapping
}

/// Warns about view columns referenced above `source` that the view's plan does not produce.
fn report_missing_columns(
    context: &QueryContext,
    plan: &PlanTree,
    source: NodeIndex,
    mapping: &ColumnMapping,
    view_name: &SelectorName,
) {
    let mut reported = HashSet::new();
    for ancestor in plan.ancestors(source) {
        for (selector, property) in crate::plan_util::referenced_columns(plan.node(ancestor)) {
            if selector != *mapping.view()
                || property == common::ALL_COLUMNS
                || pseudo_column_type(&property).is_some()
                || mapping.mapped(&property).is_some()
            {
                continue;
            }
            if reported.insert(property.clone()) {
                context.problems().add_warning(
                    ProblemCode::ColumnNotProduced,
                    vec![property, view_name.to_string()],
                );
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use common::testutil::{cars_context, init};
    use common::{Column, Constraint, DynamicOperand, JoinCondition, JoinType, Operator, QueryBuilder};

    fn plan(context: &QueryContext, builder: QueryBuilder) -> PlanTree {
        CanonicalPlanner.plan(context, &builder.build().unwrap())
    }

    fn replace_views(context: &QueryContext, plan: PlanTree) -> (PlanTree, RuleStack) {
        let mut stack = RuleStack::new();
        let plan = execute(context, plan, &mut stack);
        (plan, stack)
    }

    fn source_names(plan: &PlanTree) -> Vec<String> {
        plan.find_all(NodeType::Source)
            .into_iter()
            .map(|s| plan.node(s).source_name().unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_view_chain_is_fully_inlined() {
        init();
        let context = cars_context();
        let plan = plan(&context, QueryBuilder::new().from("A"));
        let (plan, mut stack) = replace_views(&context, plan);
        assert_eq!(source_names(&plan), vec!["C"]);
        let source = plan.find_all(NodeType::Source)[0];
        assert_eq!(
            plan.node(source).inlined_views(),
            &[SelectorName::new("A"), SelectorName::new("B")]
        );
        let root = plan.root().unwrap();
        assert!(plan.node(root).is(NodeType::Project));
        assert_eq!(
            plan.node(root).project_columns().unwrap(),
            &vec![Column::new("A", "maker")]
        );
        // The inner projections were redundant.
        assert_eq!(plan.find_all(NodeType::Project).len(), 1);
        assert_eq!(stack.pop(), Some(Rule::ReplaceViews));
        assert_eq!(stack.pop(), Some(Rule::RaiseSelectCriteria));
        assert!(!context.problems().has_errors());
    }

    #[test]
    fn test_no_views_is_unchanged() {
        init();
        let context = cars_context();
        let original = plan(
            &context,
            QueryBuilder::new()
                .from_as("cars", "c")
                .join(
                    JoinType::Inner,
                    "makers",
                    "m",
                    Some(JoinCondition::equi("c", "maker", "m", "name")),
                )
                .where_(Constraint::comparison(
                    DynamicOperand::property("c", "year"),
                    Operator::GreaterThan,
                    2000i64,
                )),
        );
        let rendered = original.to_string();
        let (plan, stack) = replace_views(&context, original.clone());
        assert_eq!(plan, original);
        assert_eq!(plan.to_string(), rendered);
        assert!(stack.is_empty());
    }

    #[test]
    fn test_second_invocation_is_idempotent() {
        init();
        let context = cars_context();
        let plan = plan(&context, QueryBuilder::new().from("A"));
        let (once, _) = replace_views(&context, plan);
        let (twice, stack) = replace_views(&context, once.clone());
        assert_eq!(once.to_string(), twice.to_string());
        assert!(stack.is_empty());
    }

    #[test]
    fn test_renamed_column_is_mapped() {
        init();
        let context = cars_context();
        let plan = plan(
            &context,
            QueryBuilder::new()
                .select("car_models", "carModel")
                .from("car_models")
                .where_(Constraint::comparison(
                    DynamicOperand::property("car_models", "carModel"),
                    Operator::EqualTo,
                    "Civic",
                )),
        );
        let (plan, _) = replace_views(&context, plan);
        let root = plan.root().unwrap();
        assert_eq!(
            plan.node(root).project_columns().unwrap(),
            &vec![Column::with_alias("car_models", "model", "carModel")]
        );
        let select = plan.find_all(NodeType::Select)[0];
        assert_eq!(
            plan.node(select).criteria().unwrap().to_string(),
            "car_models.model = 'Civic'"
        );
        let source = plan.find_all(NodeType::Source)[0];
        assert_eq!(plan.node(source).source_name(), Some(&SelectorName::new("cars")));
        assert_eq!(
            plan.node(source).selector_name(),
            Some(&SelectorName::new("car_models"))
        );
        assert!(!plan.to_string().contains("carModel ="));
    }

    #[test]
    fn test_view_under_join_keeps_its_projection() {
        init();
        let context = cars_context();
        let plan = plan(
            &context,
            QueryBuilder::new()
                .select("v", "carModel")
                .select("m", "country")
                .from_as("car_models", "v")
                .join(
                    JoinType::Inner,
                    "makers",
                    "m",
                    Some(JoinCondition::equi("v", "maker", "m", "name")),
                ),
        );
        let (plan, _) = replace_views(&context, plan);
        assert_eq!(plan.find_all(NodeType::Project).len(), 2);
        let join = plan.find_all(NodeType::Join)[0];
        assert_eq!(
            plan.node(join).join_condition().unwrap(),
            &JoinCondition::equi("v", "maker", "m", "name")
        );
        let mut selectors: Vec<String> = plan
            .node(join)
            .selectors()
            .iter()
            .map(|s| s.to_string())
            .collect();
        selectors.sort();
        assert_eq!(selectors, vec!["m", "v"]);
    }

    #[test]
    fn test_join_view_read_twice_gets_distinct_selectors() {
        init();
        let context = cars_context();
        let plan = plan(
            &context,
            QueryBuilder::new()
                .select("v1", "model")
                .select("v2", "model")
                .from_as("made_in", "v1")
                .join(
                    JoinType::Inner,
                    "made_in",
                    "v2",
                    Some(JoinCondition::equi("v1", "country", "v2", "country")),
                ),
        );
        let (plan, _) = replace_views(&context, plan);
        assert!(!context.problems().has_errors());

        let mut selectors: Vec<String> = plan
            .find_all(NodeType::Source)
            .into_iter()
            .map(|s| plan.node(s).selector_name().unwrap().to_string())
            .collect();
        selectors.sort();
        assert_eq!(selectors, vec!["v1_c", "v1_m", "v2_c", "v2_m"]);

        let join = plan.find_all(NodeType::Join)[0];
        assert_eq!(
            plan.node(join).join_condition().unwrap(),
            &JoinCondition::equi("v1_m", "country", "v2_m", "country")
        );
        let root = plan.root().unwrap();
        let projected: Vec<String> = plan
            .node(root)
            .project_columns()
            .unwrap()
            .iter()
            .map(|c| format!("{}.{}", c.selector, c.property))
            .collect();
        assert_eq!(projected, vec!["v1_c.model", "v2_c.model"]);
    }

    #[test]
    fn test_inlined_selectors_avoid_outer_names() {
        init();
        let context = cars_context();
        let plan = plan(
            &context,
            QueryBuilder::new()
                .select("v", "model")
                .select("v_c", "maker")
                .from_as("made_in", "v")
                .join(
                    JoinType::Inner,
                    "cars",
                    "v_c",
                    Some(JoinCondition::equi("v", "model", "v_c", "model")),
                ),
        );
        let (plan, _) = replace_views(&context, plan);
        let mut selectors: Vec<String> = plan
            .find_all(NodeType::Source)
            .into_iter()
            .map(|s| plan.node(s).selector_name().unwrap().to_string())
            .collect();
        selectors.sort();
        assert_eq!(selectors, vec!["v_c", "v_c_2", "v_m"]);
    }

    #[test]
    fn test_recursive_view_is_reported() {
        init();
        let context = cars_context();
        let plan = plan(&context, QueryBuilder::new().from("loop_a"));
        let (plan, _) = replace_views(&context, plan);
        assert!(context.problems().contains(ProblemCode::RecursiveViewDefinition));
        assert!(context.problems().has_errors());
        let sources = plan.find_all(NodeType::Source);
        assert_eq!(sources.len(), 1);
        assert!(plan.node(sources[0]).is_flagged(Property::ViewUnresolved));
    }

    #[test]
    fn test_unknown_selector_is_untouched() {
        init();
        let context = cars_context();
        let original = plan(&context, QueryBuilder::new().from("trucks"));
        let (plan, stack) = replace_views(&context, original.clone());
        assert_eq!(plan, original);
        assert!(stack.is_empty());
    }

    #[test]
    fn test_raise_not_scheduled_twice() {
        init();
        let context = cars_context();
        let plan = plan(&context, QueryBuilder::new().from("B"));
        let mut stack = RuleStack::new();
        stack.add_first(Rule::RaiseSelectCriteria);
        execute(&context, plan, &mut stack);
        assert_eq!(stack.pop(), Some(Rule::ReplaceViews));
        assert_eq!(stack.pop(), Some(Rule::RaiseSelectCriteria));
        assert_eq!(stack.pop(), None);
    }
}
