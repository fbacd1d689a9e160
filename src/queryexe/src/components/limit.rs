use super::{ProcessingComponent, State};
use crate::columns::Columns;
use common::{ArborError, Limit, Tuple};

/// Skips the offset rows of its input and then passes on at most the row limit.
pub struct LimitComponent {
    child: Box<dyn ProcessingComponent>,
    limit: Limit,
    returned: usize,
    state: State,
}

impl LimitComponent {
    pub fn new(child: Box<dyn ProcessingComponent>, limit: Limit) -> Self {
        Self {
            child,
            limit,
            returned: 0,
            state: State::Created,
        }
    }
}

impl ProcessingComponent for LimitComponent {
    fn open(&mut self) -> Result<(), ArborError> {
        self.state.open()?;
        self.child.open()?;
        for _ in 0..self.limit.offset() {
            if self.child.next()?.is_none() {
                break;
            }
        }
        Ok(())
    }

    fn next(&mut self) -> Result<Option<Tuple>, ArborError> {
        self.state.check_open()?;
        if self.returned >= self.limit.row_limit() {
            return Ok(None);
        }
        let row = self.child.next()?;
        if row.is_some() {
            self.returned += 1;
        }
        Ok(row)
    }

    fn close(&mut self) -> Result<(), ArborError> {
        self.state.close()?;
        self.child.close()
    }

    fn columns(&self) -> &Columns {
        self.child.columns()
    }
}
