#[macro_use]
extern crate log;

mod csv_utils;
mod store;

pub use csv_utils::{import_csv, import_csv_from_reader};
pub use store::{MemStore, StoredNode};
