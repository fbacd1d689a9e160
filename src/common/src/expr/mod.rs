//! Value types describing comparisons, operators, row-limit windows, joins and columns.
//!
//! Everything in this module is pure data: structural equality, rendering, the set of
//! selectors an expression refers to, and rewriting of those references.

use std::collections::BTreeSet;
use std::fmt;

mod column;
mod constraint;
mod join;
mod limit;
mod operand;
mod operator;

pub use column::{Column, NullOrder, Order, Ordering};
pub use constraint::{Comparison, Constraint, FullTextSearch};
pub use join::{JoinAlgorithm, JoinCondition, JoinType};
pub use limit::Limit;
pub use operand::{DynamicOperand, PropertyValue, StaticOperand};
pub use operator::{like_matches, Operator};

/// Property name standing for "every column of the selector" in column-usage sets.
pub const ALL_COLUMNS: &str = "*";

/// The name by which a table or view is referenced inside one query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SelectorName(String);

impl SelectorName {
    /// Creates a selector name.
    pub fn new(name: impl Into<String>) -> Self {
        SelectorName(name.into())
    }

    /// Returns the name.
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SelectorName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SelectorName {
    fn from(name: &str) -> Self {
        SelectorName::new(name)
    }
}

impl From<String> for SelectorName {
    fn from(name: String) -> Self {
        SelectorName(name)
    }
}

/// A selector and column referenced by some expression.
pub type ColumnReference = (SelectorName, String);

/// Set of columns referenced by an expression.
pub type ColumnReferences = BTreeSet<ColumnReference>;

/// Applies a reference mapper to a property reference.
///
/// The mapper receives the selector and property; returning `None` keeps the reference,
/// returning a selector without a property only renames the selector.
pub(crate) fn map_property<F>(mapper: &F, selector: &SelectorName, property: &str) -> (SelectorName, String)
where
    F: Fn(&SelectorName, Option<&str>) -> Option<(SelectorName, Option<String>)>,
{
    match mapper(selector, Some(property)) {
        Some((new_selector, Some(new_property))) => (new_selector, new_property),
        Some((new_selector, None)) => (new_selector, property.to_string()),
        None => (selector.clone(), property.to_string()),
    }
}

/// Applies a reference mapper to a reference that names only a selector.
pub(crate) fn map_selector<F>(mapper: &F, selector: &SelectorName) -> SelectorName
where
    F: Fn(&SelectorName, Option<&str>) -> Option<(SelectorName, Option<String>)>,
{
    match mapper(selector, None) {
        Some((new_selector, _)) => new_selector,
        None => selector.clone(),
    }
}

/// Builds a mapper that renames every reference to `old` into `new`.
pub fn rename_selector<'a>(
    old: &'a SelectorName,
    new: &'a SelectorName,
) -> impl Fn(&SelectorName, Option<&str>) -> Option<(SelectorName, Option<String>)> + 'a {
    move |selector, _| {
        if selector == old {
            Some((new.clone(), None))
        } else {
            None
        }
    }
}
