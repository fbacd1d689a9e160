use super::{ProcessingComponent, State};
use crate::analyzer::Analyzer;
use crate::columns::Columns;
use crate::evaluator::Evaluator;
use common::{ArborError, Constraint, Field, Tuple};
use std::collections::HashMap;
use std::sync::Arc;

/// Passes on the rows of its input that satisfy a constraint.
pub struct Select {
    child: Box<dyn ProcessingComponent>,
    criteria: Constraint,
    evaluator: Evaluator,
    state: State,
}

impl Select {
    /// Creates a select component.
    ///
    /// # Arguments
    ///
    /// * `child` - Input rows.
    /// * `criteria` - Constraint rows must satisfy.
    /// * `variables` - Values of bind variables used by the constraint.
    /// * `analyzer` - Matching semantics for full-text search.
    pub fn new(
        child: Box<dyn ProcessingComponent>,
        criteria: Constraint,
        variables: HashMap<String, Field>,
        analyzer: Arc<dyn Analyzer>,
    ) -> Self {
        let evaluator = Evaluator::new(child.columns().clone(), variables, analyzer);
        Self {
            child,
            criteria,
            evaluator,
            state: State::Created,
        }
    }
}

impl ProcessingComponent for Select {
    fn open(&mut self) -> Result<(), ArborError> {
        self.state.open()?;
        self.child.open()
    }

    fn next(&mut self) -> Result<Option<Tuple>, ArborError> {
        self.state.check_open()?;
        while let Some(row) = self.child.next()? {
            if self.evaluator.satisfies(&self.criteria, &row) {
                return Ok(Some(row));
            }
        }
        Ok(None)
    }

    fn close(&mut self) -> Result<(), ArborError> {
        self.state.close()?;
        self.child.close()
    }

    fn columns(&self) -> &Columns {
        self.child.columns()
    }
}
