use super::{
    map_property, map_selector, ColumnReferences, DynamicOperand, Operator, PropertyValue,
    SelectorName, StaticOperand, ALL_COLUMNS,
};
use crate::full_text::{parse_full_text, Term};
use crate::schemata::PATH_COLUMN;
use crate::ArborError;
use std::collections::BTreeSet;
use std::fmt;

/// `operand1 operator operand2`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Comparison {
    pub operand1: DynamicOperand,
    pub operator: Operator,
    pub operand2: StaticOperand,
}

impl Comparison {
    pub fn new(operand1: DynamicOperand, operator: Operator, operand2: StaticOperand) -> Self {
        Self {
            operand1,
            operator,
            operand2,
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.operand1, self.operator, self.operand2)
    }
}

/// Full-text search over one property, or over every property when `property` is `None`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct FullTextSearch {
    pub selector: SelectorName,
    pub property: Option<String>,
    pub expression: String,
    pub term: Term,
}

impl FullTextSearch {
    /// Creates a full-text search, parsing `expression` into its term.
    pub fn new(
        selector: impl Into<SelectorName>,
        property: Option<String>,
        expression: impl Into<String>,
    ) -> Result<Self, ArborError> {
        let expression = expression.into();
        let term = parse_full_text(&expression)?;
        Ok(Self {
            selector: selector.into(),
            property,
            expression,
            term,
        })
    }
}

impl fmt::Display for FullTextSearch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let property = self.property.as_deref().unwrap_or(ALL_COLUMNS);
        write!(
            f,
            "CONTAINS({}.{}, '{}')",
            self.selector,
            property,
            self.expression.replace('\'', "''")
        )
    }
}

/// A predicate over the rows of one or more selectors.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum Constraint {
    And(Box<Constraint>, Box<Constraint>),
    Or(Box<Constraint>, Box<Constraint>),
    Not(Box<Constraint>),
    Comparison(Comparison),
    Between {
        operand: DynamicOperand,
        lower: StaticOperand,
        upper: StaticOperand,
        include_lower: bool,
        include_upper: bool,
    },
    /// `operand IN (values)`.
    SetCriteria {
        operand: DynamicOperand,
        values: Vec<StaticOperand>,
    },
    PropertyExistence(PropertyValue),
    FullTextSearch(FullTextSearch),
    SameNode {
        selector: SelectorName,
        path: String,
    },
    ChildNode {
        selector: SelectorName,
        parent_path: String,
    },
    DescendantNode {
        selector: SelectorName,
        ancestor_path: String,
    },
}

impl Constraint {
    pub fn and(left: Constraint, right: Constraint) -> Self {
        Constraint::And(Box::new(left), Box::new(right))
    }

    pub fn or(left: Constraint, right: Constraint) -> Self {
        Constraint::Or(Box::new(left), Box::new(right))
    }

    pub fn negation(constraint: Constraint) -> Self {
        Constraint::Not(Box::new(constraint))
    }

    pub fn comparison(
        operand1: DynamicOperand,
        operator: Operator,
        operand2: impl Into<StaticOperand>,
    ) -> Self {
        Constraint::Comparison(Comparison::new(operand1, operator, operand2.into()))
    }

    /// Combines constraints into a left-deep conjunction, or `None` if there are none.
    pub fn conjunction(constraints: Vec<Constraint>) -> Option<Constraint> {
        constraints.into_iter().fold(None, |acc, c| match acc {
            None => Some(c),
            Some(prev) => Some(Constraint::and(prev, c)),
        })
    }

    /// Splits nested ANDs into their independent conjuncts, left to right.
    pub fn conjuncts(&self) -> Vec<&Constraint> {
        match self {
            Constraint::And(left, right) => {
                let mut result = left.conjuncts();
                result.extend(right.conjuncts());
                result
            }
            other => vec![other],
        }
    }

    /// Returns every selector referenced by this constraint.
    pub fn selector_names(&self) -> BTreeSet<SelectorName> {
        let mut names = BTreeSet::new();
        self.collect_selectors(&mut names);
        names
    }

    fn collect_selectors(&self, names: &mut BTreeSet<SelectorName>) {
        match self {
            Constraint::And(l, r) | Constraint::Or(l, r) => {
                l.collect_selectors(names);
                r.collect_selectors(names);
            }
            Constraint::Not(c) => c.collect_selectors(names),
            Constraint::Comparison(c) => {
                names.insert(c.operand1.selector_name().clone());
            }
            Constraint::Between { operand, .. } | Constraint::SetCriteria { operand, .. } => {
                names.insert(operand.selector_name().clone());
            }
            Constraint::PropertyExistence(p) => {
                names.insert(p.selector.clone());
            }
            Constraint::FullTextSearch(fts) => {
                names.insert(fts.selector.clone());
            }
            Constraint::SameNode { selector, .. }
            | Constraint::ChildNode { selector, .. }
            | Constraint::DescendantNode { selector, .. } => {
                names.insert(selector.clone());
            }
        }
    }

    /// Returns every column read while evaluating this constraint.
    ///
    /// A full-text search over a whole node records the selector with [`ALL_COLUMNS`].
    pub fn referenced_columns(&self) -> ColumnReferences {
        let mut columns = ColumnReferences::new();
        self.collect_columns(&mut columns);
        columns
    }

    fn collect_columns(&self, columns: &mut ColumnReferences) {
        match self {
            Constraint::And(l, r) | Constraint::Or(l, r) => {
                l.collect_columns(columns);
                r.collect_columns(columns);
            }
            Constraint::Not(c) => c.collect_columns(columns),
            Constraint::Comparison(c) => {
                columns.insert(c.operand1.referenced_column());
            }
            Constraint::Between { operand, .. } | Constraint::SetCriteria { operand, .. } => {
                columns.insert(operand.referenced_column());
            }
            Constraint::PropertyExistence(p) => {
                columns.insert((p.selector.clone(), p.property.clone()));
            }
            Constraint::FullTextSearch(fts) => {
                let property = fts.property.as_deref().unwrap_or(ALL_COLUMNS);
                columns.insert((fts.selector.clone(), property.to_string()));
            }
            Constraint::SameNode { selector, .. }
            | Constraint::ChildNode { selector, .. }
            | Constraint::DescendantNode { selector, .. } => {
                columns.insert((selector.clone(), PATH_COLUMN.to_string()));
            }
        }
    }

    /// Returns every static operand of this constraint.
    pub fn static_operands(&self) -> Vec<&StaticOperand> {
        match self {
            Constraint::And(l, r) | Constraint::Or(l, r) => {
                let mut result = l.static_operands();
                result.extend(r.static_operands());
                result
            }
            Constraint::Not(c) => c.static_operands(),
            Constraint::Comparison(c) => vec![&c.operand2],
            Constraint::Between { lower, upper, .. } => vec![lower, upper],
            Constraint::SetCriteria { values, .. } => values.iter().collect(),
            _ => Vec::new(),
        }
    }

    /// Rewrites every selector and property reference through `mapper`.
    pub fn rewrite_references<F>(&self, mapper: &F) -> Constraint
    where
        F: Fn(&SelectorName, Option<&str>) -> Option<(SelectorName, Option<String>)>,
    {
        match self {
            Constraint::And(l, r) => {
                Constraint::and(l.rewrite_references(mapper), r.rewrite_references(mapper))
            }
            Constraint::Or(l, r) => {
                Constraint::or(l.rewrite_references(mapper), r.rewrite_references(mapper))
            }
            Constraint::Not(c) => Constraint::negation(c.rewrite_references(mapper)),
            Constraint::Comparison(c) => Constraint::Comparison(Comparison::new(
                c.operand1.rewrite_references(mapper),
                c.operator,
                c.operand2.clone(),
            )),
            Constraint::Between {
                operand,
                lower,
                upper,
                include_lower,
                include_upper,
            } => Constraint::Between {
                operand: operand.rewrite_references(mapper),
                lower: lower.clone(),
                upper: upper.clone(),
                include_lower: *include_lower,
                include_upper: *include_upper,
            },
            Constraint::SetCriteria { operand, values } => Constraint::SetCriteria {
                operand: operand.rewrite_references(mapper),
                values: values.clone(),
            },
            Constraint::PropertyExistence(p) => {
                let (selector, property) = map_property(mapper, &p.selector, &p.property);
                Constraint::PropertyExistence(PropertyValue { selector, property })
            }
            Constraint::FullTextSearch(fts) => {
                let (selector, property) = match &fts.property {
                    Some(property) => {
                        let (s, p) = map_property(mapper, &fts.selector, property);
                        (s, Some(p))
                    }
                    None => (map_selector(mapper, &fts.selector), None),
                };
                Constraint::FullTextSearch(FullTextSearch {
                    selector,
                    property,
                    expression: fts.expression.clone(),
                    term: fts.term.clone(),
                })
            }
            Constraint::SameNode { selector, path } => Constraint::SameNode {
                selector: map_property(mapper, selector, PATH_COLUMN).0,
                path: path.clone(),
            },
            Constraint::ChildNode {
                selector,
                parent_path,
            } => Constraint::ChildNode {
                selector: map_property(mapper, selector, PATH_COLUMN).0,
                parent_path: parent_path.clone(),
            },
            Constraint::DescendantNode {
                selector,
                ancestor_path,
            } => Constraint::DescendantNode {
                selector: map_property(mapper, selector, PATH_COLUMN).0,
                ancestor_path: ancestor_path.clone(),
            },
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            Constraint::Or(..) => 0,
            Constraint::And(..) => 1,
            Constraint::Not(..) => 2,
            _ => 3,
        }
    }

    fn fmt_operand(&self, operand: &Constraint, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if operand.precedence() < self.precedence() {
            write!(f, "({})", operand)
        } else {
            write!(f, "{}", operand)
        }
    }
}

fn quote(path: &str) -> String {
    format!("'{}'", path.replace('\'', "''"))
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::And(l, r) | Constraint::Or(l, r) => {
                let keyword = if let Constraint::And(..) = self {
                    "AND"
                } else {
                    "OR"
                };
                self.fmt_operand(l, f)?;
                write!(f, " {} ", keyword)?;
                self.fmt_operand(r, f)
            }
            Constraint::Not(c) => {
                write!(f, "NOT ")?;
                self.fmt_operand(c, f)
            }
            Constraint::Comparison(c) => write!(f, "{}", c),
            Constraint::Between {
                operand,
                lower,
                upper,
                include_lower,
                include_upper,
            } => {
                write!(f, "{} BETWEEN {}", operand, lower)?;
                if !include_lower {
                    write!(f, " EXCLUSIVE")?;
                }
                write!(f, " AND {}", upper)?;
                if !include_upper {
                    write!(f, " EXCLUSIVE")?;
                }
                Ok(())
            }
            Constraint::SetCriteria { operand, values } => {
                let values: Vec<String> = values.iter().map(|v| v.to_string()).collect();
                write!(f, "{} IN ({})", operand, values.join(", "))
            }
            Constraint::PropertyExistence(p) => write!(f, "{} IS NOT NULL", p),
            Constraint::FullTextSearch(fts) => write!(f, "{}", fts),
            Constraint::SameNode { selector, path } => {
                write!(f, "ISSAMENODE({}, {})", selector, quote(path))
            }
            Constraint::ChildNode {
                selector,
                parent_path,
            } => write!(f, "ISCHILDNODE({}, {})", selector, quote(parent_path)),
            Constraint::DescendantNode {
                selector,
                ancestor_path,
            } => write!(f, "ISDESCENDANTNODE({}, {})", selector, quote(ancestor_path)),
        }
    }
}
