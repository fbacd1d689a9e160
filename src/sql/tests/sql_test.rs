use common::testutil::{cars_context, init};
use common::{ArborError, Field, ProblemCode, QueryContext};
use memstore::{MemStore, StoredNode};
use queryexe::QueryEngine;
use sql::SqlQueryParser;
use std::collections::HashMap;
use std::sync::Arc;

fn engine() -> QueryEngine {
    let store = MemStore::new();
    let maker = |name: &str, country: &str| {
        StoredNode::new(format!("/makers/{}", name.to_lowercase()), "makers")
            .with("name", name)
            .with("country", country)
    };
    let car = |maker: &str, model: &str, year: i64, msrp: f64| {
        StoredNode::new(
            format!("/makers/{}/{}", maker.to_lowercase(), model.to_lowercase()),
            "cars",
        )
        .with("maker", maker)
        .with("model", model)
        .with("year", year)
        .with("msrp", msrp)
    };
    for node in vec![
        maker("Honda", "Japan"),
        maker("Toyota", "Japan"),
        maker("Tesla", "USA"),
        car("Honda", "Civic", 2004, 18000.0),
        car("Honda", "Accord", 2009, 24000.0),
        car("Toyota", "Prius", 2008, 25000.0),
        car("Tesla", "Roadster", 2008, 109000.0),
    ] {
        store.add_node(node).unwrap();
    }
    let engine = QueryEngine::new(Arc::new(store));
    engine.add_parser(Arc::new(SqlQueryParser::new()));
    engine
}

fn query(engine: &QueryEngine, context: &QueryContext, sql: &str) -> Vec<String> {
    let mut results = engine.execute_text(context, "sql", sql).unwrap();
    assert!(!results.has_errors(), "{}", results.problems());
    results
        .to_tuples()
        .unwrap()
        .iter()
        .map(|t| {
            t.field_vals()
                .map(|f| f.to_string())
                .collect::<Vec<_>>()
                .join(",")
        })
        .collect()
}

#[test]
fn test_select_where_order() {
    init();
    let rows = query(
        &engine(),
        &cars_context(),
        "SELECT model FROM cars WHERE year >= 2008 AND msrp < 50000 ORDER BY model DESC",
    );
    assert_eq!(rows, vec!["Prius", "Accord"]);
}

#[test]
fn test_join_and_limit() {
    init();
    let rows = query(
        &engine(),
        &cars_context(),
        "SELECT c.model, m.country FROM cars AS c JOIN makers AS m ON c.maker = m.name \
         ORDER BY c.msrp LIMIT 2 OFFSET 1 ROWS",
    );
    assert_eq!(rows, vec!["Accord,Japan", "Prius,Japan"]);
}

#[test]
fn test_view_and_path_constraint() {
    init();
    let rows = query(
        &engine(),
        &cars_context(),
        "SELECT carModel FROM car_models WHERE ISDESCENDANTNODE('/makers/honda') ORDER BY carModel",
    );
    assert_eq!(rows, vec!["Accord", "Civic"]);
}

#[test]
fn test_child_join_and_bind_variable() {
    init();
    let mut variables = HashMap::new();
    variables.insert("country".to_string(), Field::from("USA"));
    let context = cars_context().with_variables(&variables);
    let rows = query(
        &engine(),
        &context,
        "SELECT c.model FROM makers m JOIN cars c ON ISCHILDNODE(c, m) WHERE m.country = @country",
    );
    assert_eq!(rows, vec!["Roadster"]);
}

#[test]
fn test_full_text_and_distinct() {
    init();
    let engine = engine();
    let context = cars_context();
    let rows = query(
        &engine,
        &context,
        "SELECT model FROM cars WHERE CONTAINS(cars, 'honda -civic')",
    );
    assert_eq!(rows, vec!["Accord"]);
    let rows = query(
        &engine,
        &context,
        "SELECT DISTINCT country FROM makers ORDER BY country",
    );
    assert_eq!(rows, vec!["Japan", "USA"]);
}

#[test]
fn test_errors() {
    init();
    let engine = engine();
    let context = cars_context();
    assert!(matches!(
        engine.execute_text(&context, "sql", "DELETE FROM cars"),
        Err(ArborError::ParseError(_))
    ));
    let results = engine
        .execute_text(&context, "SQL", "SELECT * FROM trucks")
        .unwrap();
    assert!(results.problems().contains(ProblemCode::TableDoesNotExist));
}
