#[macro_use]
extern crate log;
#[macro_use]
extern crate serde;

mod analyzer;
mod backend;
mod columns;
pub mod components;
mod engine;
mod evaluator;
mod parsers;
mod processor;
mod results;

pub use analyzer::{Analyzer, SimpleAnalyzer};
pub use backend::Backend;
pub use columns::{ColumnInfo, Columns};
pub use components::{ProcessingComponent, TupleIterator};
pub use engine::QueryEngine;
pub use evaluator::Evaluator;
pub use parsers::{QueryParser, QueryParsers};
pub use processor::{apply_access_nodes, QueryProcessor};
pub use results::{QueryResults, Rows};
