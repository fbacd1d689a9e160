//! Abstract syntax of a query, independent of the language it was written in.

use crate::expr::{Column, Constraint, JoinCondition, JoinType, Limit, Ordering, SelectorName};
use crate::ArborError;
use std::fmt;

/// The FROM clause of a query.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum Source {
    /// A table or view, optionally referenced through an alias.
    Selector {
        name: SelectorName,
        alias: Option<SelectorName>,
    },
    Join {
        left: Box<Source>,
        right: Box<Source>,
        join_type: JoinType,
        /// `None` only for cross joins.
        condition: Option<JoinCondition>,
    },
}

impl Source {
    pub fn selector(name: impl Into<SelectorName>) -> Self {
        Source::Selector {
            name: name.into(),
            alias: None,
        }
    }

    pub fn aliased(name: impl Into<SelectorName>, alias: impl Into<SelectorName>) -> Self {
        Source::Selector {
            name: name.into(),
            alias: Some(alias.into()),
        }
    }

    /// Returns `(table name, selector name)` for every table or view in the clause, left to right.
    pub fn selectors(&self) -> Vec<(&SelectorName, &SelectorName)> {
        match self {
            Source::Selector { name, alias } => vec![(name, alias.as_ref().unwrap_or(name))],
            Source::Join { left, right, .. } => {
                let mut result = left.selectors();
                result.extend(right.selectors());
                result
            }
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Selector {
                name,
                alias: Some(alias),
            } if alias != name => write!(f, "{} AS {}", name, alias),
            Source::Selector { name, .. } => write!(f, "{}", name),
            Source::Join {
                left,
                right,
                join_type,
                condition,
            } => {
                write!(f, "{} {} {}", left, join_type, right)?;
                if let Some(condition) = condition {
                    write!(f, " ON {}", condition)?;
                }
                Ok(())
            }
        }
    }
}

/// A query: which rows of which selectors, in which shape and order.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Query {
    pub source: Source,
    pub constraint: Option<Constraint>,
    /// Empty means every column of every selector.
    pub columns: Vec<Column>,
    pub orderings: Vec<Ordering>,
    pub limit: Limit,
    pub distinct: bool,
}

impl Query {
    /// A query returning every column of one table.
    pub fn select_all(table: impl Into<SelectorName>) -> Self {
        Self {
            source: Source::selector(table),
            constraint: None,
            columns: Vec::new(),
            orderings: Vec::new(),
            limit: Limit::NONE,
            distinct: false,
        }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SELECT ")?;
        if self.distinct {
            write!(f, "DISTINCT ")?;
        }
        if self.columns.is_empty() {
            write!(f, "*")?;
        } else {
            let columns: Vec<String> = self.columns.iter().map(|c| c.to_string()).collect();
            write!(f, "{}", columns.join(", "))?;
        }
        write!(f, " FROM {}", self.source)?;
        if let Some(constraint) = &self.constraint {
            write!(f, " WHERE {}", constraint)?;
        }
        if !self.orderings.is_empty() {
            let orderings: Vec<String> = self.orderings.iter().map(|o| o.to_string()).collect();
            write!(f, " ORDER BY {}", orderings.join(", "))?;
        }
        if !self.limit.is_unlimited() {
            write!(f, " {}", self.limit)?;
        }
        Ok(())
    }
}

/// Fluent builder for [`Query`] values.
///
/// Errors are deferred: the first invalid call is remembered and returned by [`build`](Self::build).
#[derive(Default, Clone)]
pub struct QueryBuilder {
    source: Option<Source>,
    constraint: Option<Constraint>,
    columns: Vec<Column>,
    orderings: Vec<Ordering>,
    row_limit: Option<usize>,
    offset: usize,
    distinct: bool,
    error: Option<ArborError>,
}

impl QueryBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a column to the result.
    pub fn select(mut self, selector: &str, property: &str) -> Self {
        self.columns.push(Column::new(selector, property));
        self
    }

    /// Adds a renamed column to the result.
    pub fn select_as(mut self, selector: &str, property: &str, alias: &str) -> Self {
        self.columns.push(Column::with_alias(selector, property, alias));
        self
    }

    /// Selects from a table or view.
    pub fn from(mut self, table: &str) -> Self {
        self.set_source(Source::selector(table));
        self
    }

    /// Selects from a table or view under an alias.
    pub fn from_as(mut self, table: &str, alias: &str) -> Self {
        self.set_source(Source::aliased(table, alias));
        self
    }

    fn set_source(&mut self, source: Source) {
        if self.source.is_some() {
            self.fail("from() may only be called once; use join() to add selectors");
        } else {
            self.source = Some(source);
        }
    }

    /// Joins the current source with another table or view.
    pub fn join(
        mut self,
        join_type: JoinType,
        table: &str,
        alias: &str,
        condition: Option<JoinCondition>,
    ) -> Self {
        if condition.is_none() && join_type != JoinType::Cross {
            self.fail("only cross joins may omit the join condition");
            return self;
        }
        match self.source.take() {
            Some(left) => {
                self.source = Some(Source::Join {
                    left: Box::new(left),
                    right: Box::new(Source::aliased(table, alias)),
                    join_type,
                    condition,
                })
            }
            None => self.fail("join() requires a preceding from()"),
        }
        self
    }

    /// Adds a constraint; repeated calls are combined with AND.
    pub fn where_(mut self, constraint: Constraint) -> Self {
        self.constraint = match self.constraint.take() {
            Some(existing) => Some(Constraint::and(existing, constraint)),
            None => Some(constraint),
        };
        self
    }

    pub fn order_by(mut self, ordering: Ordering) -> Self {
        self.orderings.push(ordering);
        self
    }

    pub fn limit(mut self, row_limit: usize) -> Self {
        self.row_limit = Some(row_limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    fn fail(&mut self, message: &str) {
        if self.error.is_none() {
            self.error = Some(ArborError::InvalidArgument(message.to_string()));
        }
    }

    /// Returns the query, or the first error recorded while building it.
    pub fn build(self) -> Result<Query, ArborError> {
        if let Some(error) = self.error {
            return Err(error);
        }
        let source = self
            .source
            .ok_or_else(|| ArborError::InvalidArgument(String::from("a query needs a from()")))?;
        let limit = Limit::new(self.row_limit.unwrap_or(Limit::UNBOUNDED), self.offset)?;
        Ok(Query {
            source,
            constraint: self.constraint,
            columns: self.columns,
            orderings: self.orderings,
            limit,
            distinct: self.distinct,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::expr::{DynamicOperand, Operator};

    #[test]
    fn test_build_and_render() {
        let query = QueryBuilder::new()
            .select("c", "maker")
            .select_as("c", "model", "carModel")
            .from_as("cars", "c")
            .where_(Constraint::comparison(
                DynamicOperand::property("c", "year"),
                Operator::GreaterThan,
                2000i64,
            ))
            .order_by(Ordering::descending(DynamicOperand::property("c", "year")))
            .limit(5)
            .build()
            .unwrap();
        assert_eq!(
            query.to_string(),
            "SELECT c.maker, c.model AS carModel FROM cars AS c WHERE c.year > 2000 ORDER BY c.year DESC LIMIT 5"
        );
    }

    #[test]
    fn test_join_selectors() {
        let query = QueryBuilder::new()
            .from_as("cars", "c")
            .join(
                JoinType::Inner,
                "makers",
                "m",
                Some(JoinCondition::equi("c", "maker", "m", "name")),
            )
            .build()
            .unwrap();
        let selectors: Vec<String> = query
            .source
            .selectors()
            .iter()
            .map(|(_, s)| s.to_string())
            .collect();
        assert_eq!(selectors, vec!["c", "m"]);
    }

    #[test]
    fn test_builder_errors() {
        assert!(QueryBuilder::new().select("c", "x").build().is_err());
        assert!(QueryBuilder::new().from("a").from("b").build().is_err());
        assert!(QueryBuilder::new().from("a").limit(0).build().is_err());
        assert!(QueryBuilder::new()
            .from("a")
            .join(JoinType::Inner, "b", "b", None)
            .build()
            .is_err());
    }
}
