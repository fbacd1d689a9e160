//! Fixtures shared by the end-to-end benchmarks.

use common::schemata::Schemata;
use common::testutil::{cars_schemata, gen_rand_string};
use common::{PlanHints, QueryContext};
use memstore::{MemStore, StoredNode};
use queryexe::QueryEngine;
use rand::{thread_rng, Rng};
use sql::SqlQueryParser;
use std::sync::Arc;

/// Builds an engine over `makers` makers with `cars_per_maker` cars each, stored as
/// children of their maker.
pub fn garage(makers: usize, cars_per_maker: usize) -> QueryEngine {
    let store = MemStore::new();
    let mut rng = thread_rng();
    for m in 0..makers {
        let name = format!("maker{}", m);
        let country = if rng.gen_bool(0.5) { "Japan" } else { "USA" };
        store
            .add_node(
                StoredNode::new(format!("/makers/{}", name), "makers")
                    .with("name", name.as_str())
                    .with("country", country),
            )
            .unwrap();
        for c in 0..cars_per_maker {
            let model = gen_rand_string(8);
            store
                .add_node(
                    StoredNode::new(format!("/makers/{}/car{}", name, c), "cars")
                        .with("maker", name.as_str())
                        .with("model", model.as_str())
                        .with("year", rng.gen_range(1950..2021) as i64)
                        .with("msrp", rng.gen_range(5000.0..90000.0)),
                )
                .unwrap();
        }
    }
    let engine = QueryEngine::new(Arc::new(store));
    engine.add_parser(Arc::new(SqlQueryParser::new()));
    engine
}

pub fn context(hints: PlanHints) -> QueryContext {
    let schemata: Arc<dyn Schemata> = Arc::new(cars_schemata());
    QueryContext::with_schemata(schemata).with_hints(hints)
}

/// Runs `sql` to completion, returning the number of rows.
pub fn run(engine: &QueryEngine, hints: &PlanHints, sql: &str) -> usize {
    let mut results = engine
        .execute_text(&context(hints.clone()), "sql", sql)
        .unwrap();
    results.to_tuples().unwrap().len()
}
