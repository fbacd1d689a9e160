use crate::columns::Columns;
use crate::components::ProcessingComponent;
use common::{ArborError, Problems, Tuple};
use std::fmt;

/// The outcome of executing a query.
///
/// Rows are produced lazily and can be read once. When the query had errors, or only a plan
/// was requested, there are no rows; check [`has_errors`](QueryResults::has_errors) first.
pub struct QueryResults {
    columns: Columns,
    component: Option<Box<dyn ProcessingComponent>>,
    problems: Problems,
    plan: Option<String>,
}

impl QueryResults {
    pub(crate) fn new(
        columns: Columns,
        component: Option<Box<dyn ProcessingComponent>>,
        problems: Problems,
        plan: Option<String>,
    ) -> Self {
        Self {
            columns,
            component,
            problems,
            plan,
        }
    }

    pub fn columns(&self) -> &Columns {
        &self.columns
    }

    pub fn problems(&self) -> &Problems {
        &self.problems
    }

    pub fn has_errors(&self) -> bool {
        self.problems.has_errors()
    }

    /// The rendered optimized plan, if the hints asked for it.
    pub fn plan(&self) -> Option<&str> {
        self.plan.as_deref()
    }

    /// Takes the rows. Later calls return no rows.
    pub fn rows(&mut self) -> Rows {
        Rows {
            component: self.component.take(),
            opened: false,
        }
    }

    /// Reads every row.
    pub fn to_tuples(&mut self) -> Result<Vec<Tuple>, ArborError> {
        self.rows().collect()
    }

    /// Reads every row into a text table with one column per result column.
    pub fn to_table(&mut self) -> Result<String, ArborError> {
        let width = self
            .columns
            .iter()
            .map(|c| c.name.len())
            .max()
            .unwrap_or(10)
            + 2;
        let mut res = String::new();
        for column in self.columns.iter() {
            res += &format!("{:width$}", column.name, width = width);
        }
        res += "\n";
        for row in self.rows() {
            for f in row?.field_vals() {
                res += &format!("{:width$}", f.to_string(), width = width);
            }
            res += "\n";
        }
        Ok(res)
    }
}

impl fmt::Debug for QueryResults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryResults")
            .field("columns", &self.columns)
            .field("problems", &self.problems)
            .field("plan", &self.plan)
            .finish()
    }
}

/// Lazy sequence of result rows.
///
/// The underlying component is opened on the first read and closed once exhausted, on the
/// first error, or when the sequence is dropped.
pub struct Rows {
    component: Option<Box<dyn ProcessingComponent>>,
    opened: bool,
}

impl Iterator for Rows {
    type Item = Result<Tuple, ArborError>;

    fn next(&mut self) -> Option<Self::Item> {
        let component = self.component.as_mut()?;
        if !self.opened {
            if let Err(e) = component.open() {
                self.component = None;
                return Some(Err(e));
            }
            self.opened = true;
        }
        match component.next() {
            Ok(Some(row)) => Some(Ok(row)),
            Ok(None) => {
                let closed = component.close();
                self.component = None;
                closed.err().map(Err)
            }
            Err(e) => {
                if let Err(close_error) = component.close() {
                    warn!("failed to close rows after error: {}", close_error);
                }
                self.component = None;
                Some(Err(e))
            }
        }
    }
}

impl Drop for Rows {
    fn drop(&mut self) {
        if let (true, Some(component)) = (self.opened, self.component.as_mut()) {
            if let Err(e) = component.close() {
                warn!("failed to close abandoned rows: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::components::testutil::{scan, string_columns};

    fn results() -> QueryResults {
        QueryResults::new(
            string_columns("c", &["maker", "model"]),
            Some(scan("c", &["maker", "model"], &[&["Honda", "Civic"], &["Toyota", "Prius"]])),
            Problems::new(),
            None,
        )
    }

    #[test]
    fn test_rows_are_read_once() {
        let mut results = results();
        assert_eq!(results.to_tuples().unwrap().len(), 2);
        assert!(results.to_tuples().unwrap().is_empty());
    }

    #[test]
    fn test_abandoned_rows() {
        let mut results = results();
        let mut rows = results.rows();
        assert!(rows.next().is_some());
        drop(rows);
        assert!(results.rows().next().is_none());
    }

    #[test]
    fn test_table() {
        let table = results().to_table().unwrap();
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].trim_end(), "maker  model");
        assert_eq!(lines[1].trim_end(), "Honda  Civic");
    }
}
