use super::{ProcessingComponent, State};
use crate::analyzer::Analyzer;
use crate::columns::Columns;
use crate::evaluator::Evaluator;
use common::{ArborError, Field, Order, Ordering, Tuple};
use std::cmp;
use std::collections::HashMap;
use std::sync::Arc;

/// Orders the rows of its input. Every input row is read when the component is opened.
pub struct Sort {
    child: Box<dyn ProcessingComponent>,
    orderings: Vec<Ordering>,
    evaluator: Evaluator,
    rows: std::vec::IntoIter<Tuple>,
    state: State,
}

impl Sort {
    pub fn new(
        child: Box<dyn ProcessingComponent>,
        orderings: Vec<Ordering>,
        variables: HashMap<String, Field>,
        analyzer: Arc<dyn Analyzer>,
    ) -> Self {
        let evaluator = Evaluator::new(child.columns().clone(), variables, analyzer);
        Self {
            child,
            orderings,
            evaluator,
            rows: Vec::new().into_iter(),
            state: State::Created,
        }
    }

    fn compare_keys(&self, a: &[Field], b: &[Field]) -> cmp::Ordering {
        for (ordering, (x, y)) in self.orderings.iter().zip(a.iter().zip(b.iter())) {
            let ord = match (x.is_null(), y.is_null()) {
                (true, true) => cmp::Ordering::Equal,
                (true, false) if ordering.nulls_first() => cmp::Ordering::Less,
                (true, false) => cmp::Ordering::Greater,
                (false, true) if ordering.nulls_first() => cmp::Ordering::Greater,
                (false, true) => cmp::Ordering::Less,
                (false, false) => match ordering.order {
                    Order::Ascending => x.cmp(y),
                    Order::Descending => y.cmp(x),
                },
            };
            if ord != cmp::Ordering::Equal {
                return ord;
            }
        }
        cmp::Ordering::Equal
    }
}

impl ProcessingComponent for Sort {
    fn open(&mut self) -> Result<(), ArborError> {
        self.state.open()?;
        self.child.open()?;
        let mut keyed = Vec::new();
        while let Some(row) = self.child.next()? {
            let key: Vec<Field> = self
                .orderings
                .iter()
                .map(|o| self.evaluator.value(&o.operand, &row))
                .collect();
            keyed.push((key, row));
        }
        keyed.sort_by(|(a, _), (b, _)| self.compare_keys(a, b));
        debug!("sorted {} rows", keyed.len());
        self.rows = keyed
            .into_iter()
            .map(|(_, row)| row)
            .collect::<Vec<_>>()
            .into_iter();
        Ok(())
    }

    fn next(&mut self) -> Result<Option<Tuple>, ArborError> {
        self.state.check_open()?;
        Ok(self.rows.next())
    }

    fn close(&mut self) -> Result<(), ArborError> {
        self.state.close()?;
        self.rows = Vec::new().into_iter();
        self.child.close()
    }

    fn columns(&self) -> &Columns {
        self.child.columns()
    }
}
