use common::logical_plan::{NodeType, PlanTree};
use common::testutil::{cars_context, init};
use common::{
    Constraint, DynamicOperand, JoinAlgorithm, JoinCondition, JoinType, Operator, ProblemCode,
    QueryBuilder, QueryContext, SelectorName,
};
use optimizer::{Optimizer, RuleBasedOptimizer};
use planner::{CanonicalPlanner, Planner};

fn optimize(context: &QueryContext, builder: QueryBuilder) -> PlanTree {
    let plan = CanonicalPlanner.plan(context, &builder.build().unwrap());
    RuleBasedOptimizer.optimize(context, plan)
}

fn source_names(plan: &PlanTree) -> Vec<String> {
    plan.find_all(NodeType::Source)
        .into_iter()
        .map(|s| plan.node(s).source_name().unwrap().to_string())
        .collect()
}

#[test]
fn test_view_chain_reads_only_the_table() {
    init();
    let context = cars_context();
    let plan = optimize(&context, QueryBuilder::new().from("A"));
    assert_eq!(source_names(&plan), vec!["C"]);
    assert!(!context.problems().has_errors());
    let rendered = plan.to_string();
    assert!(!rendered.contains("SOURCE_NAME=A"));
    assert!(!rendered.contains("SOURCE_NAME=B"));

    // PROJECT <- ACCESS <- PROJECT <- SOURCE
    let types: Vec<NodeType> = plan
        .find_all_at_or_below(plan.root().unwrap(), None)
        .into_iter()
        .map(|i| plan.node_type(i))
        .collect();
    assert_eq!(
        types,
        vec![
            NodeType::Project,
            NodeType::Access,
            NodeType::Project,
            NodeType::Source
        ]
    );
}

#[test]
fn test_renamed_view_column_in_criteria() {
    init();
    let context = cars_context();
    let plan = optimize(
        &context,
        QueryBuilder::new()
            .select("v", "carModel")
            .from_as("car_models", "v")
            .where_(Constraint::comparison(
                DynamicOperand::property("v", "carModel"),
                Operator::Like,
                "C%",
            )),
    );
    let select = plan.find_all(NodeType::Select)[0];
    assert_eq!(
        plan.node(select).criteria().unwrap().to_string(),
        "v.model LIKE 'C%'"
    );
    let access = plan.find_all(NodeType::Access)[0];
    assert!(plan.is_below(select, access));
    assert!(!plan.to_string().contains("v.carModel"));
}

#[test]
fn test_join_is_fully_optimized() {
    init();
    let context = cars_context();
    let plan = optimize(
        &context,
        QueryBuilder::new()
            .select("c", "model")
            .select("m", "country")
            .from_as("cars", "c")
            .join(
                JoinType::Inner,
                "makers",
                "m",
                Some(JoinCondition::equi("c", "maker", "m", "name")),
            )
            .where_(Constraint::comparison(
                DynamicOperand::property("c", "maker"),
                Operator::EqualTo,
                "Honda",
            ))
            .where_(Constraint::comparison(
                DynamicOperand::property("c", "year"),
                Operator::GreaterThanOrEqualTo,
                2000i64,
            ))
            .where_(Constraint::comparison(
                DynamicOperand::property("c", "year"),
                Operator::LessThan,
                2010i64,
            )),
    );
    let join = plan.find_all(NodeType::Join)[0];
    assert_eq!(plan.node(join).join_algorithm(), Some(&JoinAlgorithm::Merge));
    let criteria: Vec<String> = plan
        .find_all(NodeType::Select)
        .into_iter()
        .map(|s| plan.node(s).criteria().unwrap().to_string())
        .collect();
    assert!(criteria.contains(&"m.name = 'Honda'".to_string()));
    assert!(criteria.contains(&"c.year BETWEEN 2000 AND 2010 EXCLUSIVE".to_string()));
    for select in plan.find_all(NodeType::Select) {
        assert!(plan.is_below(select, join));
    }
}

#[test]
fn test_recursive_view_terminates_with_error() {
    init();
    let context = cars_context();
    let plan = optimize(&context, QueryBuilder::new().from("loop_a"));
    assert!(context.problems().contains(ProblemCode::RecursiveViewDefinition));
    assert_eq!(plan.find_all(NodeType::Source).len(), 1);
}

#[test]
fn test_unknown_table_is_left_for_diagnostics() {
    init();
    let context = cars_context();
    let plan = optimize(&context, QueryBuilder::new().from("trucks"));
    assert!(context.problems().contains(ProblemCode::TableDoesNotExist));
    let source = plan.find_all(NodeType::Source)[0];
    assert_eq!(
        plan.node(source).source_name(),
        Some(&SelectorName::new("trucks"))
    );
}

#[test]
fn test_self_join_of_view() {
    init();
    let context = cars_context();
    let plan = optimize(
        &context,
        QueryBuilder::new()
            .select("x", "model")
            .select("y", "model")
            .from_as("B", "x")
            .join(
                JoinType::Inner,
                "B",
                "y",
                Some(JoinCondition::equi("x", "maker", "y", "maker")),
            ),
    );
    assert_eq!(source_names(&plan), vec!["C", "C"]);
    let selectors: Vec<String> = plan
        .find_all(NodeType::Source)
        .into_iter()
        .map(|s| plan.node(s).selector_name().unwrap().to_string())
        .collect();
    assert_eq!(selectors, vec!["x", "y"]);
    assert!(!context.problems().has_errors());
}
