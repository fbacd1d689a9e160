use super::{ProcessingComponent, State};
use crate::columns::Columns;
use common::{ArborError, Field, Tuple};

/// Reshapes the rows of its input into a given set of columns.
pub struct Project {
    child: Box<dyn ProcessingComponent>,
    indices: Vec<Option<usize>>,
    columns: Columns,
    state: State,
}

impl Project {
    /// Creates a project component.
    ///
    /// Every output column is looked up by selector and property in the input. A pseudo-column
    /// the input does not carry is produced as null; any other missing column is an error.
    ///
    /// # Arguments
    ///
    /// * `child` - Input rows.
    /// * `columns` - Shape of the rows to produce.
    pub fn new(child: Box<dyn ProcessingComponent>, columns: Columns) -> Result<Self, ArborError> {
        let mut indices = Vec::with_capacity(columns.len());
        for column in columns.iter() {
            match child.columns().index_of(&column.selector, &column.property) {
                Some(i) => indices.push(Some(i)),
                None if column.is_pseudo() => indices.push(None),
                None => {
                    return Err(ArborError::ExecutionError(format!(
                        "Column {}.{} is not produced by {}",
                        column.selector,
                        column.property,
                        child.columns()
                    )))
                }
            }
        }
        Ok(Self {
            child,
            indices,
            columns,
            state: State::Created,
        })
    }
}

impl ProcessingComponent for Project {
    fn open(&mut self) -> Result<(), ArborError> {
        self.state.open()?;
        self.child.open()
    }

    fn next(&mut self) -> Result<Option<Tuple>, ArborError> {
        self.state.check_open()?;
        Ok(self.child.next()?.map(|row| {
            Tuple::new(
                self.indices
                    .iter()
                    .map(|i| {
                        i.and_then(|i| row.get_field(i))
                            .cloned()
                            .unwrap_or(Field::Null)
                    })
                    .collect(),
            )
        }))
    }

    fn close(&mut self) -> Result<(), ArborError> {
        self.state.close()?;
        self.child.close()
    }

    fn columns(&self) -> &Columns {
        &self.columns
    }
}
