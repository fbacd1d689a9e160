use common::schemata::{Schemata, SCORE_COLUMN};
use common::testutil::{cars_context, init};
use common::{
    Constraint, DynamicOperand, Field, FullTextSearch, JoinCondition, JoinType, Operator,
    Ordering, QueryBuilder, QueryContext, SelectorName,
};
use memstore::{import_csv_from_reader, MemStore, StoredNode};
use queryexe::QueryEngine;
use std::sync::Arc;

fn store() -> MemStore {
    let store = MemStore::new();
    let maker = |name: &str, country: &str| {
        StoredNode::new(format!("/makers/{}", name.to_lowercase()), "makers")
            .with("name", name)
            .with("country", country)
    };
    let car = |maker: &str, model: &str, year: i64| {
        StoredNode::new(
            format!("/makers/{}/{}", maker.to_lowercase(), model.to_lowercase()),
            "cars",
        )
        .with("maker", maker)
        .with("model", model)
        .with("year", year)
    };
    for node in vec![
        maker("Honda", "Japan"),
        maker("Toyota", "Japan"),
        car("Honda", "Civic", 2004),
        car("Honda", "Accord", 2009),
        car("Toyota", "Prius", 2008),
        car("Ford", "Model-T", 1920),
    ] {
        store.add_node(node).unwrap();
    }
    store
}

fn run(store: &MemStore, context: &QueryContext, builder: QueryBuilder) -> Vec<Vec<Field>> {
    let engine = QueryEngine::new(Arc::new(store.clone()));
    let mut results = engine.execute(context, &builder.build().unwrap()).unwrap();
    assert!(!results.has_errors(), "{}", results.problems());
    results
        .to_tuples()
        .unwrap()
        .into_iter()
        .map(|t| t.field_vals)
        .collect()
}

#[test]
fn test_scan_with_criteria() {
    init();
    let rows = run(
        &store(),
        &cars_context(),
        QueryBuilder::new()
            .select("cars", "model")
            .from("cars")
            .where_(Constraint::comparison(
                DynamicOperand::property("cars", "year"),
                Operator::GreaterThan,
                2005i64,
            ))
            .order_by(Ordering::ascending(DynamicOperand::property("cars", "model"))),
    );
    assert_eq!(
        rows,
        vec![vec![Field::from("Accord")], vec![Field::from("Prius")]]
    );
}

#[test]
fn test_full_text_score() {
    init();
    let rows = run(
        &store(),
        &cars_context(),
        QueryBuilder::new()
            .select("c", "model")
            .select("c", SCORE_COLUMN)
            .from_as("cars", "c")
            .where_(Constraint::FullTextSearch(
                FullTextSearch::new("c", None, "honda OR civic").unwrap(),
            ))
            .order_by(Ordering::descending(DynamicOperand::FullTextSearchScore(
                SelectorName::new("c"),
            ))),
    );
    assert_eq!(
        rows,
        vec![
            vec![Field::from("Civic"), Field::DoubleField(1.0)],
            vec![Field::from("Accord"), Field::DoubleField(0.5)],
        ]
    );
}

#[test]
fn test_child_node_join() {
    init();
    let mut rows = run(
        &store(),
        &cars_context(),
        QueryBuilder::new()
            .select("m", "name")
            .select("c", "model")
            .from_as("makers", "m")
            .join(
                JoinType::Inner,
                "cars",
                "c",
                Some(JoinCondition::ChildNode {
                    parent_selector: SelectorName::new("m"),
                    child_selector: SelectorName::new("c"),
                }),
            ),
    );
    rows.sort();
    assert_eq!(
        rows,
        vec![
            vec![Field::from("Honda"), Field::from("Accord")],
            vec![Field::from("Honda"), Field::from("Civic")],
            vec![Field::from("Toyota"), Field::from("Prius")],
        ]
    );
}

#[test]
fn test_descendant_constraint_through_view() {
    init();
    let mut rows = run(
        &store(),
        &cars_context(),
        QueryBuilder::new()
            .select("v", "carModel")
            .from_as("car_models", "v")
            .where_(Constraint::DescendantNode {
                selector: SelectorName::new("v"),
                ancestor_path: "/makers/honda".to_string(),
            }),
    );
    rows.sort();
    assert_eq!(
        rows,
        vec![vec![Field::from("Accord")], vec![Field::from("Civic")]]
    );
}

#[test]
fn test_query_imported_rows() {
    init();
    let context = cars_context();
    let store = MemStore::new();
    let table = context
        .schemata()
        .table(&SelectorName::new("makers"))
        .unwrap();
    let data = "Honda,Japan\nFord,USA\nKia,Korea\n";
    import_csv_from_reader(&store, table, data.as_bytes(), false).unwrap();
    let rows = run(
        &store,
        &context,
        QueryBuilder::new()
            .select("makers", "name")
            .from("makers")
            .where_(Constraint::comparison(
                DynamicOperand::property("makers", "country"),
                Operator::NotEqualTo,
                "Japan",
            ))
            .order_by(Ordering::descending(DynamicOperand::property(
                "makers", "name",
            ))),
    );
    assert_eq!(rows, vec![vec![Field::from("Kia")], vec![Field::from("Ford")]]);
}
