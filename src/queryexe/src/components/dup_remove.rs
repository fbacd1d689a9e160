use super::{ProcessingComponent, State};
use crate::columns::Columns;
use common::{ArborError, Tuple};
use std::collections::HashSet;

/// Passes on the first occurrence of every distinct row of its input.
pub struct DuplicateRemove {
    child: Box<dyn ProcessingComponent>,
    seen: HashSet<Tuple>,
    state: State,
}

impl DuplicateRemove {
    pub fn new(child: Box<dyn ProcessingComponent>) -> Self {
        Self {
            child,
            seen: HashSet::new(),
            state: State::Created,
        }
    }
}

impl ProcessingComponent for DuplicateRemove {
    fn open(&mut self) -> Result<(), ArborError> {
        self.state.open()?;
        self.child.open()
    }

    fn next(&mut self) -> Result<Option<Tuple>, ArborError> {
        self.state.check_open()?;
        while let Some(row) = self.child.next()? {
            if self.seen.insert(row.clone()) {
                return Ok(Some(row));
            }
        }
        Ok(None)
    }

    fn close(&mut self) -> Result<(), ArborError> {
        self.state.close()?;
        self.seen.clear();
        self.child.close()
    }

    fn columns(&self) -> &Columns {
        self.child.columns()
    }
}
