use crate::analyzer::Analyzer;
use crate::columns::Columns;
use common::path;
use common::schemata::PATH_COLUMN;
use common::{
    Constraint, DynamicOperand, Field, FullTextSearch, JoinCondition, SelectorName, StaticOperand,
    Tuple,
};
use std::collections::HashMap;
use std::sync::Arc;

/// Evaluates operands, constraints and join conditions against rows of one shape.
#[derive(Clone)]
pub struct Evaluator {
    columns: Columns,
    variables: HashMap<String, Field>,
    analyzer: Arc<dyn Analyzer>,
}

impl Evaluator {
    /// Creates an evaluator.
    ///
    /// # Arguments
    ///
    /// * `columns` - Shape of the rows that will be evaluated.
    /// * `variables` - Values of the bind variables.
    /// * `analyzer` - Matching semantics for full-text search constraints.
    pub fn new(columns: Columns, variables: HashMap<String, Field>, analyzer: Arc<dyn Analyzer>) -> Self {
        Self {
            columns,
            variables,
            analyzer,
        }
    }

    pub fn columns(&self) -> &Columns {
        &self.columns
    }

    fn column(&self, selector: &SelectorName, property: &str, row: &Tuple) -> Field {
        self.columns
            .index_of(selector, property)
            .and_then(|i| row.get_field(i))
            .cloned()
            .unwrap_or(Field::Null)
    }

    fn path(&self, selector: &SelectorName, row: &Tuple) -> Option<String> {
        self.column(selector, PATH_COLUMN, row).as_string()
    }

    fn resolve(&self, operand: &StaticOperand) -> Option<Field> {
        operand.resolve(&self.variables)
    }

    /// Returns the value of `operand` for `row`, or null if the row has no such value.
    pub fn value(&self, operand: &DynamicOperand, row: &Tuple) -> Field {
        match operand {
            DynamicOperand::Length(p) => match self.column(&p.selector, &p.property, row).as_string() {
                Some(s) => Field::LongField(s.chars().count() as i64),
                None => Field::Null,
            },
            DynamicOperand::LowerCase(inner) => match self.value(inner, row) {
                Field::StringField(s) => Field::StringField(s.to_lowercase()),
                other => other,
            },
            DynamicOperand::UpperCase(inner) => match self.value(inner, row) {
                Field::StringField(s) => Field::StringField(s.to_uppercase()),
                other => other,
            },
            other => {
                let (selector, property) = other.referenced_column();
                self.column(&selector, &property, row)
            }
        }
    }

    fn full_text_matches(&self, search: &FullTextSearch, row: &Tuple) -> bool {
        let text = match &search.property {
            Some(property) => self
                .column(&search.selector, property, row)
                .as_string()
                .unwrap_or_default(),
            None => self
                .columns
                .indexes_of_selector(&search.selector)
                .into_iter()
                .filter_map(|i| row.get_field(i).and_then(Field::as_string))
                .collect::<Vec<_>>()
                .join(" "),
        };
        self.analyzer.matches(&search.term, &text)
    }

    /// True if `row` satisfies `constraint`. Unbound variables never match.
    pub fn satisfies(&self, constraint: &Constraint, row: &Tuple) -> bool {
        match constraint {
            Constraint::And(left, right) => self.satisfies(left, row) && self.satisfies(right, row),
            Constraint::Or(left, right) => self.satisfies(left, row) || self.satisfies(right, row),
            Constraint::Not(inner) => !self.satisfies(inner, row),
            Constraint::Comparison(comparison) => match self.resolve(&comparison.operand2) {
                Some(right) => comparison
                    .operator
                    .evaluate(&self.value(&comparison.operand1, row), &right),
                None => false,
            },
            Constraint::Between {
                operand,
                lower,
                upper,
                include_lower,
                include_upper,
            } => {
                let value = self.value(operand, row);
                let (lower, upper) = match (self.resolve(lower), self.resolve(upper)) {
                    (Some(lower), Some(upper)) => (lower, upper),
                    _ => return false,
                };
                let above = match value.compare(&lower) {
                    Some(std::cmp::Ordering::Greater) => true,
                    Some(std::cmp::Ordering::Equal) => *include_lower,
                    _ => false,
                };
                let below = match value.compare(&upper) {
                    Some(std::cmp::Ordering::Less) => true,
                    Some(std::cmp::Ordering::Equal) => *include_upper,
                    _ => false,
                };
                above && below
            }
            Constraint::SetCriteria { operand, values } => {
                let value = self.value(operand, row);
                values.iter().filter_map(|v| self.resolve(v)).any(|v| {
                    value.compare(&v) == Some(std::cmp::Ordering::Equal)
                })
            }
            Constraint::PropertyExistence(p) => !self.column(&p.selector, &p.property, row).is_null(),
            Constraint::FullTextSearch(search) => self.full_text_matches(search, row),
            Constraint::SameNode { selector, path } => {
                self.path(selector, row).as_deref() == Some(path.as_str())
            }
            Constraint::ChildNode {
                selector,
                parent_path,
            } => match self.path(selector, row) {
                Some(p) => path::parent(&p) == Some(parent_path.as_str()),
                None => false,
            },
            Constraint::DescendantNode {
                selector,
                ancestor_path,
            } => match self.path(selector, row) {
                Some(p) => path::is_descendant(&p, ancestor_path),
                None => false,
            },
        }
    }

    /// True if the joined `row` satisfies `condition`.
    pub fn join_matches(&self, condition: &JoinCondition, row: &Tuple) -> bool {
        match condition {
            JoinCondition::EquiJoin {
                selector1,
                property1,
                selector2,
                property2,
            } => {
                let left = self.column(selector1, property1, row);
                let right = self.column(selector2, property2, row);
                left.compare(&right) == Some(std::cmp::Ordering::Equal)
            }
            JoinCondition::SameNode {
                selector1,
                selector2,
                path: relative,
            } => match (self.path(selector1, row), self.path(selector2, row)) {
                (Some(p1), Some(p2)) => match relative {
                    Some(relative) => p1 == path::resolve(&p2, relative),
                    None => p1 == p2,
                },
                _ => false,
            },
            JoinCondition::ChildNode {
                parent_selector,
                child_selector,
            } => match (self.path(parent_selector, row), self.path(child_selector, row)) {
                (Some(parent), Some(child)) => path::parent(&child) == Some(parent.as_str()),
                _ => false,
            },
            JoinCondition::DescendantNode {
                ancestor_selector,
                descendant_selector,
            } => match (
                self.path(ancestor_selector, row),
                self.path(descendant_selector, row),
            ) {
                (Some(ancestor), Some(descendant)) => path::is_descendant(&descendant, &ancestor),
                _ => false,
            },
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::analyzer::SimpleAnalyzer;
    use crate::columns::ColumnInfo;
    use common::schemata::SchemaColumn;
    use common::{DataType, Operator};

    fn cars() -> Evaluator {
        let columns = Columns::for_source(
            &SelectorName::new("c"),
            &SchemaColumn::from_vecs(
                vec!["maker", "model", "year"],
                vec![DataType::String, DataType::String, DataType::Long],
            ),
        );
        let mut variables = HashMap::new();
        variables.insert("year".to_string(), Field::LongField(2004));
        Evaluator::new(columns, variables, Arc::new(SimpleAnalyzer))
    }

    fn civic() -> Tuple {
        Tuple::new(vec![
            Field::from("Honda"),
            Field::from("Civic"),
            Field::LongField(2004),
            Field::from("/cars/honda/civic"),
            Field::from("civic"),
            Field::from("civic"),
            Field::LongField(3),
            Field::DoubleField(1.0),
        ])
    }

    fn maker() -> DynamicOperand {
        DynamicOperand::property("c", "maker")
    }

    #[test]
    fn test_values() {
        let evaluator = cars();
        let row = civic();
        assert_eq!(evaluator.value(&maker(), &row), Field::from("Honda"));
        assert_eq!(
            evaluator.value(&DynamicOperand::LowerCase(Box::new(maker())), &row),
            Field::from("honda")
        );
        assert_eq!(
            evaluator.value(
                &DynamicOperand::Length(common::PropertyValue::new("c", "model")),
                &row
            ),
            Field::LongField(5)
        );
        assert_eq!(
            evaluator.value(&DynamicOperand::NodeDepth(SelectorName::new("c")), &row),
            Field::LongField(3)
        );
        assert_eq!(
            evaluator.value(&DynamicOperand::property("c", "color"), &row),
            Field::Null
        );
    }

    #[test]
    fn test_constraints() {
        let evaluator = cars();
        let row = civic();
        let year = || DynamicOperand::property("c", "year");
        assert!(evaluator.satisfies(&Constraint::comparison(maker(), Operator::EqualTo, "Honda"), &row));
        assert!(evaluator.satisfies(
            &Constraint::comparison(year(), Operator::EqualTo, StaticOperand::BindVariable("year".into())),
            &row
        ));
        assert!(!evaluator.satisfies(
            &Constraint::comparison(year(), Operator::EqualTo, StaticOperand::BindVariable("unbound".into())),
            &row
        ));
        assert!(evaluator.satisfies(
            &Constraint::Between {
                operand: year(),
                lower: 2000i64.into(),
                upper: 2004i64.into(),
                include_lower: false,
                include_upper: true,
            },
            &row
        ));
        assert!(!evaluator.satisfies(
            &Constraint::Between {
                operand: year(),
                lower: 2000i64.into(),
                upper: 2004i64.into(),
                include_lower: true,
                include_upper: false,
            },
            &row
        ));
        assert!(evaluator.satisfies(
            &Constraint::SetCriteria {
                operand: maker(),
                values: vec!["Toyota".into(), "Honda".into()],
            },
            &row
        ));
        assert!(evaluator.satisfies(
            &Constraint::FullTextSearch(FullTextSearch::new("c", None, "honda civic").unwrap()),
            &row
        ));
        assert!(evaluator.satisfies(
            &Constraint::ChildNode {
                selector: SelectorName::new("c"),
                parent_path: "/cars/honda".into(),
            },
            &row
        ));
        assert!(evaluator.satisfies(
            &Constraint::DescendantNode {
                selector: SelectorName::new("c"),
                ancestor_path: "/cars".into(),
            },
            &row
        ));
        assert!(!evaluator.satisfies(
            &Constraint::PropertyExistence(common::PropertyValue::new("c", "color")),
            &row
        ));
    }

    #[test]
    fn test_join_conditions() {
        let selector = |name: &str| SelectorName::new(name);
        let columns = Columns::new(vec![
            ColumnInfo::new(selector("p"), PATH_COLUMN, DataType::Path),
            ColumnInfo::new(selector("c"), PATH_COLUMN, DataType::Path),
        ]);
        let evaluator = Evaluator::new(columns, HashMap::new(), Arc::new(SimpleAnalyzer));
        let row = Tuple::new(vec![Field::from("/cars"), Field::from("/cars/honda")]);
        assert!(evaluator.join_matches(
            &JoinCondition::ChildNode {
                parent_selector: selector("p"),
                child_selector: selector("c"),
            },
            &row
        ));
        assert!(evaluator.join_matches(
            &JoinCondition::DescendantNode {
                ancestor_selector: selector("p"),
                descendant_selector: selector("c"),
            },
            &row
        ));
        assert!(evaluator.join_matches(
            &JoinCondition::SameNode {
                selector1: selector("p"),
                selector2: selector("c"),
                path: Some("..".into()),
            },
            &row
        ));
        assert!(!evaluator.join_matches(
            &JoinCondition::SameNode {
                selector1: selector("p"),
                selector2: selector("c"),
                path: None,
            },
            &row
        ));
    }
}
