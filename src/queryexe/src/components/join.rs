use super::{drain, ProcessingComponent, State};
use crate::analyzer::Analyzer;
use crate::columns::Columns;
use crate::evaluator::Evaluator;
use common::{ArborError, Field, JoinCondition, JoinType, Tuple};
use std::cmp;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

/// Joins every row of the left input with every row of the right input that matches the
/// join condition. Outer joins pad rows without a match with nulls.
pub struct NestedLoopJoin {
    left: Box<dyn ProcessingComponent>,
    right: Box<dyn ProcessingComponent>,
    join_type: JoinType,
    condition: Option<JoinCondition>,
    evaluator: Evaluator,
    right_rows: Vec<Tuple>,
    right_matched: Vec<bool>,
    current: Option<Tuple>,
    current_matched: bool,
    right_index: usize,
    left_done: bool,
    unmatched_index: usize,
    state: State,
}

impl NestedLoopJoin {
    /// Creates a nested loop join.
    ///
    /// # Arguments
    ///
    /// * `left` - Left input, read once.
    /// * `right` - Right input, read into memory when the join is opened.
    /// * `join_type` - Type of the join.
    /// * `condition` - Condition joined rows must satisfy; `None` joins every pair.
    /// * `variables` - Values of bind variables.
    /// * `analyzer` - Matching semantics for full-text search.
    pub fn new(
        left: Box<dyn ProcessingComponent>,
        right: Box<dyn ProcessingComponent>,
        join_type: JoinType,
        condition: Option<JoinCondition>,
        variables: HashMap<String, Field>,
        analyzer: Arc<dyn Analyzer>,
    ) -> Self {
        let columns = left.columns().join(right.columns());
        Self {
            left,
            right,
            join_type,
            condition,
            evaluator: Evaluator::new(columns, variables, analyzer),
            right_rows: Vec::new(),
            right_matched: Vec::new(),
            current: None,
            current_matched: false,
            right_index: 0,
            left_done: false,
            unmatched_index: 0,
            state: State::Created,
        }
    }

    fn matches(&self, row: &Tuple) -> bool {
        match &self.condition {
            Some(condition) => self.evaluator.join_matches(condition, row),
            None => true,
        }
    }

    /// Returns the next right row that never matched, padded with nulls on the left.
    fn next_unmatched_right(&mut self) -> Option<Tuple> {
        let left_width = self.left.columns().len();
        while self.unmatched_index < self.right_rows.len() {
            let i = self.unmatched_index;
            self.unmatched_index += 1;
            if !self.right_matched[i] {
                return Some(Tuple::nulls(left_width).merge(&self.right_rows[i]));
            }
        }
        None
    }
}

impl ProcessingComponent for NestedLoopJoin {
    fn open(&mut self) -> Result<(), ArborError> {
        self.state.open()?;
        self.left.open()?;
        self.right.open()?;
        self.right_rows = drain(self.right.as_mut())?;
        self.right_matched = vec![false; self.right_rows.len()];
        Ok(())
    }

    fn next(&mut self) -> Result<Option<Tuple>, ArborError> {
        self.state.check_open()?;
        loop {
            if self.left_done {
                if self.join_type.preserves_right() {
                    return Ok(self.next_unmatched_right());
                }
                return Ok(None);
            }
            let left_row = match self.current.take() {
                Some(row) => row,
                None => match self.left.next()? {
                    Some(row) => {
                        self.current_matched = false;
                        self.right_index = 0;
                        row
                    }
                    None => {
                        self.left_done = true;
                        continue;
                    }
                },
            };
            while self.right_index < self.right_rows.len() {
                let i = self.right_index;
                self.right_index += 1;
                let joined = left_row.merge(&self.right_rows[i]);
                if self.matches(&joined) {
                    self.current_matched = true;
                    self.right_matched[i] = true;
                    self.current = Some(left_row);
                    return Ok(Some(joined));
                }
            }
            if !self.current_matched && self.join_type.preserves_left() {
                let right_width = self.right.columns().len();
                return Ok(Some(left_row.merge(&Tuple::nulls(right_width))));
            }
        }
    }

    fn close(&mut self) -> Result<(), ArborError> {
        self.state.close()?;
        self.right_rows.clear();
        self.left.close()?;
        self.right.close()
    }

    fn columns(&self) -> &Columns {
        self.evaluator.columns()
    }
}

/// Joins two inputs sorted ascending on the join key by walking them side by side.
///
/// Only inner joins are supported. Rows with a null key never match.
pub struct MergeJoin {
    left: Box<dyn ProcessingComponent>,
    right: Box<dyn ProcessingComponent>,
    condition: JoinCondition,
    left_key: usize,
    right_key: usize,
    evaluator: Evaluator,
    left_rows: Vec<Tuple>,
    right_rows: Vec<Tuple>,
    left_index: usize,
    right_index: usize,
    pending: VecDeque<Tuple>,
    state: State,
}

impl MergeJoin {
    /// Creates a merge join.
    ///
    /// # Arguments
    ///
    /// * `left` - Left input, sorted on its join key.
    /// * `right` - Right input, sorted on its join key.
    /// * `condition` - Equi-join or same-node condition; each side supplies one key column.
    /// * `variables` - Values of bind variables.
    /// * `analyzer` - Matching semantics for full-text search.
    pub fn new(
        left: Box<dyn ProcessingComponent>,
        right: Box<dyn ProcessingComponent>,
        join_type: JoinType,
        condition: JoinCondition,
        variables: HashMap<String, Field>,
        analyzer: Arc<dyn Analyzer>,
    ) -> Result<Self, ArborError> {
        if join_type != JoinType::Inner {
            return Err(ArborError::ExecutionError(format!(
                "Merge join does not support {}",
                join_type
            )));
        }
        let ((s1, p1), (s2, p2)) = condition.join_columns();
        let keys = match (
            left.columns().index_of(&s1, &p1),
            right.columns().index_of(&s2, &p2),
        ) {
            (Some(l), Some(r)) => Some((l, r)),
            _ => match (
                left.columns().index_of(&s2, &p2),
                right.columns().index_of(&s1, &p1),
            ) {
                (Some(l), Some(r)) => Some((l, r)),
                _ => None,
            },
        };
        let (left_key, right_key) = keys.ok_or_else(|| {
            ArborError::ExecutionError(format!("Join keys of {} are not produced by the inputs", condition))
        })?;
        let columns = left.columns().join(right.columns());
        Ok(Self {
            left,
            right,
            condition,
            left_key,
            right_key,
            evaluator: Evaluator::new(columns, variables, analyzer),
            left_rows: Vec::new(),
            right_rows: Vec::new(),
            left_index: 0,
            right_index: 0,
            pending: VecDeque::new(),
            state: State::Created,
        })
    }

    fn key<'a>(row: &'a Tuple, index: usize) -> &'a Field {
        row.get_field(index).unwrap_or(&Field::Null)
    }

    /// End of the run of rows starting at `start` that share its key.
    fn run_end(rows: &[Tuple], start: usize, index: usize) -> usize {
        let key = Self::key(&rows[start], index);
        let mut end = start + 1;
        while end < rows.len() && Self::key(&rows[end], index).cmp(key) == cmp::Ordering::Equal {
            end += 1;
        }
        end
    }
}

impl ProcessingComponent for MergeJoin {
    fn open(&mut self) -> Result<(), ArborError> {
        self.state.open()?;
        self.left.open()?;
        self.right.open()?;
        self.left_rows = drain(self.left.as_mut())?;
        self.right_rows = drain(self.right.as_mut())?;
        Ok(())
    }

    fn next(&mut self) -> Result<Option<Tuple>, ArborError> {
        self.state.check_open()?;
        loop {
            if let Some(row) = self.pending.pop_front() {
                return Ok(Some(row));
            }
            if self.left_index >= self.left_rows.len() || self.right_index >= self.right_rows.len() {
                return Ok(None);
            }
            let left_key = Self::key(&self.left_rows[self.left_index], self.left_key);
            let right_key = Self::key(&self.right_rows[self.right_index], self.right_key);
            if left_key.is_null() {
                self.left_index += 1;
                continue;
            }
            if right_key.is_null() {
                self.right_index += 1;
                continue;
            }
            match left_key.cmp(right_key) {
                cmp::Ordering::Less => self.left_index += 1,
                cmp::Ordering::Greater => self.right_index += 1,
                cmp::Ordering::Equal => {
                    let left_end = Self::run_end(&self.left_rows, self.left_index, self.left_key);
                    let right_end = Self::run_end(&self.right_rows, self.right_index, self.right_key);
                    for l in &self.left_rows[self.left_index..left_end] {
                        for r in &self.right_rows[self.right_index..right_end] {
                            let joined = l.merge(r);
                            if self.evaluator.join_matches(&self.condition, &joined) {
                                self.pending.push_back(joined);
                            }
                        }
                    }
                    self.left_index = left_end;
                    self.right_index = right_end;
                }
            }
        }
    }

    fn close(&mut self) -> Result<(), ArborError> {
        self.state.close()?;
        self.left_rows.clear();
        self.right_rows.clear();
        self.pending.clear();
        self.left.close()?;
        self.right.close()
    }

    fn columns(&self) -> &Columns {
        self.evaluator.columns()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::analyzer::SimpleAnalyzer;
    use crate::components::testutil::{run, scan};

    fn cars() -> Box<dyn ProcessingComponent> {
        scan(
            "c",
            &["model", "maker"],
            &[&["Civic", "Honda"], &["Prius", "Toyota"], &["Model T", "Ford"], &["Accord", "Honda"]],
        )
    }

    fn makers() -> Box<dyn ProcessingComponent> {
        scan(
            "m",
            &["name", "country"],
            &[&["Honda", "Japan"], &["Toyota", "Japan"], &["Tesla", "USA"]],
        )
    }

    fn nested(join_type: JoinType) -> Vec<String> {
        let condition = match join_type {
            JoinType::Cross => None,
            _ => Some(JoinCondition::equi("c", "maker", "m", "name")),
        };
        let mut join = NestedLoopJoin::new(
            cars(),
            makers(),
            join_type,
            condition,
            HashMap::new(),
            Arc::new(SimpleAnalyzer),
        );
        run(&mut join)
    }

    #[test]
    fn test_inner_join() {
        assert_eq!(
            nested(JoinType::Inner),
            vec![
                "Civic,Honda,Honda,Japan",
                "Prius,Toyota,Toyota,Japan",
                "Accord,Honda,Honda,Japan",
            ]
        );
    }

    #[test]
    fn test_outer_joins() {
        let left = nested(JoinType::LeftOuter);
        assert_eq!(left.len(), 4);
        assert!(left.contains(&"Model T,Ford,NULL,NULL".to_string()));

        let full = nested(JoinType::FullOuter);
        assert_eq!(full.len(), 5);
        assert_eq!(full[4], "NULL,NULL,Tesla,USA");

        let right = nested(JoinType::RightOuter);
        assert_eq!(right.len(), 4);
        assert!(!right.contains(&"Model T,Ford,NULL,NULL".to_string()));
    }

    #[test]
    fn test_cross_join() {
        assert_eq!(nested(JoinType::Cross).len(), 12);
    }

    #[test]
    fn test_merge_join() {
        let left = scan(
            "c",
            &["model", "maker"],
            &[&["Model T", "NULL"], &["Accord", "Honda"], &["Civic", "Honda"], &["Prius", "Toyota"]],
        );
        let right = scan("m", &["name", "country"], &[&["Honda", "Japan"], &["Tesla", "USA"], &["Toyota", "Japan"]]);
        let mut join = MergeJoin::new(
            left,
            right,
            JoinType::Inner,
            JoinCondition::equi("m", "name", "c", "maker"),
            HashMap::new(),
            Arc::new(SimpleAnalyzer),
        )
        .unwrap();
        assert_eq!(
            run(&mut join),
            vec![
                "Accord,Honda,Honda,Japan",
                "Civic,Honda,Honda,Japan",
                "Prius,Toyota,Toyota,Japan",
            ]
        );
    }

    #[test]
    fn test_merge_join_rejects_outer_joins() {
        assert!(MergeJoin::new(
            cars(),
            makers(),
            JoinType::LeftOuter,
            JoinCondition::equi("c", "maker", "m", "name"),
            HashMap::new(),
            Arc::new(SimpleAnalyzer),
        )
        .is_err());
    }
}
