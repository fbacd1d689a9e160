use crate::schemata::{ImmutableSchemata, SchemaColumn, Schemata};
use crate::{DataType, JoinCondition, JoinType, QueryBuilder, QueryContext};
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use std::sync::Arc;

pub fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn gen_rand_string(n: usize) -> String {
    thread_rng()
        .sample_iter(Alphanumeric)
        .take(n)
        .map(char::from)
        .collect()
}

/// Schemata used throughout the tests.
///
/// * `cars(maker, model, year, msrp)` and `makers(name, country)` are tables.
/// * `car_models` exposes `cars.model` as `carModel`.
/// * `C(maker, model)` is a table, `B` selects both columns from it and `A` selects `maker` from `B`.
/// * `made_in` joins `cars` as `c` with `makers` as `m`, exposing `model` and `country`.
/// * `loop_a` and `loop_b` are defined in terms of each other.
pub fn cars_schemata() -> ImmutableSchemata {
    let build = |builder: QueryBuilder| builder.build().unwrap();
    ImmutableSchemata::builder()
        .add_table(
            "cars",
            SchemaColumn::from_vecs(
                vec!["maker", "model", "year", "msrp"],
                vec![DataType::String, DataType::String, DataType::Long, DataType::Double],
            ),
        )
        .add_table(
            "makers",
            SchemaColumn::from_vecs(
                vec!["name", "country"],
                vec![DataType::String, DataType::String],
            ),
        )
        .add_view(
            "car_models",
            build(
                QueryBuilder::new()
                    .select("cars", "maker")
                    .select_as("cars", "model", "carModel")
                    .from("cars"),
            ),
        )
        .add_table(
            "C",
            SchemaColumn::from_vecs(vec!["maker", "model"], vec![DataType::String, DataType::String]),
        )
        .add_view(
            "B",
            build(QueryBuilder::new().select("C", "maker").select("C", "model").from("C")),
        )
        .add_view("A", build(QueryBuilder::new().select("B", "maker").from("B")))
        .add_view(
            "made_in",
            build(
                QueryBuilder::new()
                    .select("c", "model")
                    .select("m", "country")
                    .from_as("cars", "c")
                    .join(
                        JoinType::Inner,
                        "makers",
                        "m",
                        Some(JoinCondition::equi("c", "maker", "m", "name")),
                    ),
            ),
        )
        .add_view("loop_a", build(QueryBuilder::new().from("loop_b")))
        .add_view("loop_b", build(QueryBuilder::new().from("loop_a")))
        .build()
}

/// A context over [`cars_schemata`] with default hints.
pub fn cars_context() -> QueryContext {
    let schemata: Arc<dyn Schemata> = Arc::new(cars_schemata());
    QueryContext::with_schemata(schemata)
}
