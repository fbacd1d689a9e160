use super::{map_property, ColumnReferences, SelectorName};
use crate::schemata::PATH_COLUMN;
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoinType {
    Inner,
    LeftOuter,
    RightOuter,
    FullOuter,
    Cross,
}

impl JoinType {
    /// True if rows of the left side survive without a match.
    pub fn preserves_left(&self) -> bool {
        matches!(self, JoinType::LeftOuter | JoinType::FullOuter)
    }

    /// True if rows of the right side survive without a match.
    pub fn preserves_right(&self) -> bool {
        matches!(self, JoinType::RightOuter | JoinType::FullOuter)
    }
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            JoinType::Inner => "INNER JOIN",
            JoinType::LeftOuter => "LEFT OUTER JOIN",
            JoinType::RightOuter => "RIGHT OUTER JOIN",
            JoinType::FullOuter => "FULL OUTER JOIN",
            JoinType::Cross => "CROSS JOIN",
        };
        write!(f, "{}", text)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoinAlgorithm {
    NestedLoop,
    Merge,
}

impl fmt::Display for JoinAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinAlgorithm::NestedLoop => write!(f, "NESTED_LOOP"),
            JoinAlgorithm::Merge => write!(f, "MERGE"),
        }
    }
}

/// How rows of two selectors are matched.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub enum JoinCondition {
    EquiJoin {
        selector1: SelectorName,
        property1: String,
        selector2: SelectorName,
        property2: String,
    },
    /// Both selectors produce the same node, optionally offset by a relative path on the second.
    SameNode {
        selector1: SelectorName,
        selector2: SelectorName,
        path: Option<String>,
    },
    ChildNode {
        parent_selector: SelectorName,
        child_selector: SelectorName,
    },
    DescendantNode {
        ancestor_selector: SelectorName,
        descendant_selector: SelectorName,
    },
}

impl JoinCondition {
    pub fn equi(
        selector1: impl Into<SelectorName>,
        property1: impl Into<String>,
        selector2: impl Into<SelectorName>,
        property2: impl Into<String>,
    ) -> Self {
        JoinCondition::EquiJoin {
            selector1: selector1.into(),
            property1: property1.into(),
            selector2: selector2.into(),
            property2: property2.into(),
        }
    }

    /// The two selectors in the order they appear in the condition.
    pub fn selectors(&self) -> (&SelectorName, &SelectorName) {
        match self {
            JoinCondition::EquiJoin {
                selector1,
                selector2,
                ..
            }
            | JoinCondition::SameNode {
                selector1,
                selector2,
                ..
            } => (selector1, selector2),
            JoinCondition::ChildNode {
                parent_selector,
                child_selector,
            } => (parent_selector, child_selector),
            JoinCondition::DescendantNode {
                ancestor_selector,
                descendant_selector,
            } => (ancestor_selector, descendant_selector),
        }
    }

    pub fn selector_names(&self) -> BTreeSet<SelectorName> {
        let (a, b) = self.selectors();
        let mut names = BTreeSet::new();
        names.insert(a.clone());
        names.insert(b.clone());
        names
    }

    /// The columns compared by the condition, in selector order.
    pub fn join_columns(&self) -> ((SelectorName, String), (SelectorName, String)) {
        match self {
            JoinCondition::EquiJoin {
                selector1,
                property1,
                selector2,
                property2,
            } => (
                (selector1.clone(), property1.clone()),
                (selector2.clone(), property2.clone()),
            ),
            other => {
                let (a, b) = other.selectors();
                (
                    (a.clone(), PATH_COLUMN.to_string()),
                    (b.clone(), PATH_COLUMN.to_string()),
                )
            }
        }
    }

    pub fn referenced_columns(&self) -> ColumnReferences {
        let (a, b) = self.join_columns();
        let mut columns = ColumnReferences::new();
        columns.insert(a);
        columns.insert(b);
        columns
    }

    /// Rewrites every selector and property reference through `mapper`.
    pub fn rewrite_references<F>(&self, mapper: &F) -> Self
    where
        F: Fn(&SelectorName, Option<&str>) -> Option<(SelectorName, Option<String>)>,
    {
        let path = |s: &SelectorName| map_property(mapper, s, PATH_COLUMN).0;
        match self {
            JoinCondition::EquiJoin {
                selector1,
                property1,
                selector2,
                property2,
            } => {
                let (selector1, property1) = map_property(mapper, selector1, property1);
                let (selector2, property2) = map_property(mapper, selector2, property2);
                JoinCondition::EquiJoin {
                    selector1,
                    property1,
                    selector2,
                    property2,
                }
            }
            JoinCondition::SameNode {
                selector1,
                selector2,
                path: relative,
            } => JoinCondition::SameNode {
                selector1: path(selector1),
                selector2: path(selector2),
                path: relative.clone(),
            },
            JoinCondition::ChildNode {
                parent_selector,
                child_selector,
            } => JoinCondition::ChildNode {
                parent_selector: path(parent_selector),
                child_selector: path(child_selector),
            },
            JoinCondition::DescendantNode {
                ancestor_selector,
                descendant_selector,
            } => JoinCondition::DescendantNode {
                ancestor_selector: path(ancestor_selector),
                descendant_selector: path(descendant_selector),
            },
        }
    }
}

impl fmt::Display for JoinCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinCondition::EquiJoin {
                selector1,
                property1,
                selector2,
                property2,
            } => write!(f, "{}.{} = {}.{}", selector1, property1, selector2, property2),
            JoinCondition::SameNode {
                selector1,
                selector2,
                path: Some(path),
            } => write!(f, "ISSAMENODE({}, {}, '{}')", selector1, selector2, path),
            JoinCondition::SameNode {
                selector1,
                selector2,
                path: None,
            } => write!(f, "ISSAMENODE({}, {})", selector1, selector2),
            JoinCondition::ChildNode {
                parent_selector,
                child_selector,
            } => write!(f, "ISCHILDNODE({}, {})", child_selector, parent_selector),
            JoinCondition::DescendantNode {
                ancestor_selector,
                descendant_selector,
            } => write!(
                f,
                "ISDESCENDANTNODE({}, {})",
                descendant_selector, ancestor_selector
            ),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::expr::rename_selector;

    #[test]
    fn test_equi_join_columns() {
        let condition = JoinCondition::equi("c", "maker", "m", "name");
        assert_eq!(condition.to_string(), "c.maker = m.name");
        assert_eq!(condition.referenced_columns().len(), 2);
        assert_eq!(condition.selector_names().len(), 2);
    }

    #[test]
    fn test_rename_node_join() {
        let condition = JoinCondition::ChildNode {
            parent_selector: "p".into(),
            child_selector: "c".into(),
        };
        let old = SelectorName::new("p");
        let new = SelectorName::new("parent");
        let renamed = condition.rewrite_references(&rename_selector(&old, &new));
        assert_eq!(renamed.to_string(), "ISCHILDNODE(c, parent)");
    }

    #[test]
    fn test_outer_join_sides() {
        assert!(JoinType::LeftOuter.preserves_left());
        assert!(!JoinType::LeftOuter.preserves_right());
        assert!(JoinType::FullOuter.preserves_right());
        assert!(!JoinType::Inner.preserves_left());
    }
}
