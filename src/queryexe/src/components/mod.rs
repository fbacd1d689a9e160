//! Generic processing components, one for every plan node kind except ACCESS and SOURCE.

use crate::columns::Columns;
use common::{ArborError, Tuple};

mod dup_remove;
mod join;
mod limit;
mod project;
mod select;
mod sort;

pub use dup_remove::DuplicateRemove;
pub use join::{MergeJoin, NestedLoopJoin};
pub use limit::LimitComponent;
pub use project::Project;
pub use select::Select;
pub use sort::Sort;

/// Produces the rows of one plan node.
///
/// A component must be opened before rows are read; once closed it cannot be reopened.
pub trait ProcessingComponent: Send {
    /// Prepares the component, and its inputs, to produce rows.
    fn open(&mut self) -> Result<(), ArborError>;

    /// Returns the next row, or `None` once every row was produced.
    fn next(&mut self) -> Result<Option<Tuple>, ArborError>;

    /// Releases the component and its inputs.
    fn close(&mut self) -> Result<(), ArborError>;

    /// Shape of the rows produced.
    fn columns(&self) -> &Columns;
}

/// Tracks where a component is in its open/next/close protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum State {
    Created,
    Open,
    Closed,
}

impl State {
    pub(crate) fn open(&mut self) -> Result<(), ArborError> {
        match self {
            State::Created => {
                *self = State::Open;
                Ok(())
            }
            State::Open => Err(ArborError::ExecutionError(String::from(
                "Component is already open",
            ))),
            State::Closed => Err(ArborError::ExecutionError(String::from(
                "Component cannot be reopened",
            ))),
        }
    }

    pub(crate) fn check_open(&self) -> Result<(), ArborError> {
        match self {
            State::Open => Ok(()),
            State::Created => Err(ArborError::ExecutionError(String::from(
                "Component has not been opened",
            ))),
            State::Closed => Err(ArborError::ExecutionError(String::from(
                "Component has been closed",
            ))),
        }
    }

    pub(crate) fn close(&mut self) -> Result<(), ArborError> {
        self.check_open()?;
        *self = State::Closed;
        Ok(())
    }
}

/// Produces rows held in memory.
///
/// Backends use it to hand scanned rows to the generic components.
pub struct TupleIterator {
    tuples: Vec<Tuple>,
    index: usize,
    columns: Columns,
    state: State,
}

impl TupleIterator {
    /// Create a new tuple iterator over a set of results.
    ///
    /// # Arguments
    ///
    /// * `tuples` - Tuples to iterate over.
    /// * `columns` - Shape of the tuples.
    pub fn new(tuples: Vec<Tuple>, columns: Columns) -> Self {
        Self {
            tuples,
            index: 0,
            columns,
            state: State::Created,
        }
    }
}

impl ProcessingComponent for TupleIterator {
    fn open(&mut self) -> Result<(), ArborError> {
        self.state.open()
    }

    fn next(&mut self) -> Result<Option<Tuple>, ArborError> {
        self.state.check_open()?;
        let tuple = self.tuples.get(self.index).cloned();
        if tuple.is_some() {
            self.index += 1;
        }
        Ok(tuple)
    }

    fn close(&mut self) -> Result<(), ArborError> {
        self.state.close()
    }

    fn columns(&self) -> &Columns {
        &self.columns
    }
}

/// Reads every remaining row of `component`.
pub fn drain(component: &mut dyn ProcessingComponent) -> Result<Vec<Tuple>, ArborError> {
    let mut rows = Vec::new();
    while let Some(row) = component.next()? {
        rows.push(row);
    }
    Ok(rows)
}

#[cfg(test)]
pub(crate) mod testutil {
    use super::*;
    use crate::columns::ColumnInfo;
    use common::{DataType, Field, SelectorName};

    /// Columns `selector.name` for every name, all strings.
    pub fn string_columns(selector: &str, names: &[&str]) -> Columns {
        Columns::new(
            names
                .iter()
                .map(|n| ColumnInfo::new(SelectorName::new(selector), *n, DataType::String))
                .collect(),
        )
    }

    pub fn rows(data: &[&[&str]]) -> Vec<Tuple> {
        data.iter()
            .map(|r| {
                Tuple::new(
                    r.iter()
                        .map(|v| if *v == "NULL" { Field::Null } else { Field::from(*v) })
                        .collect(),
                )
            })
            .collect()
    }

    pub fn scan(selector: &str, names: &[&str], data: &[&[&str]]) -> Box<dyn ProcessingComponent> {
        Box::new(TupleIterator::new(rows(data), string_columns(selector, names)))
    }

    /// Opens, drains and closes `component`, rendering each row as text.
    pub fn run(component: &mut dyn ProcessingComponent) -> Vec<String> {
        component.open().unwrap();
        let rows = drain(component).unwrap();
        component.close().unwrap();
        rows.iter()
            .map(|r| {
                r.field_vals()
                    .map(|f| f.to_string())
                    .collect::<Vec<_>>()
                    .join(",")
            })
            .collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::components::testutil::scan;

    #[test]
    fn test_protocol() {
        let mut rows = scan("c", &["maker"], &[&["Honda"]]);
        assert!(rows.next().is_err());
        rows.open().unwrap();
        assert!(rows.open().is_err());
        assert!(rows.next().unwrap().is_some());
        assert!(rows.next().unwrap().is_none());
        rows.close().unwrap();
        assert!(rows.next().is_err());
        assert!(rows.open().is_err());
    }
}
