use super::{map_property, map_selector, ColumnReferences, SelectorName};
use crate::schemata::{DEPTH_COLUMN, LOCAL_NAME_COLUMN, NAME_COLUMN, PATH_COLUMN, SCORE_COLUMN};
use crate::Field;
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// A property of the nodes produced by one selector.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PropertyValue {
    pub selector: SelectorName,
    pub property: String,
}

impl PropertyValue {
    pub fn new(selector: impl Into<SelectorName>, property: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            property: property.into(),
        }
    }

    fn rewrite<F>(&self, mapper: &F) -> Self
    where
        F: Fn(&SelectorName, Option<&str>) -> Option<(SelectorName, Option<String>)>,
    {
        let (selector, property) = map_property(mapper, &self.selector, &self.property);
        Self { selector, property }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.selector, self.property)
    }
}

/// An operand evaluated against every candidate row.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum DynamicOperand {
    PropertyValue(PropertyValue),
    /// Length of the property's value.
    Length(PropertyValue),
    LowerCase(Box<DynamicOperand>),
    UpperCase(Box<DynamicOperand>),
    NodeName(SelectorName),
    NodeLocalName(SelectorName),
    NodePath(SelectorName),
    NodeDepth(SelectorName),
    FullTextSearchScore(SelectorName),
}

impl DynamicOperand {
    /// Shorthand for a property value operand.
    pub fn property(selector: impl Into<SelectorName>, property: impl Into<String>) -> Self {
        DynamicOperand::PropertyValue(PropertyValue::new(selector, property))
    }

    /// Returns the single selector this operand applies to.
    pub fn selector_name(&self) -> &SelectorName {
        match self {
            DynamicOperand::PropertyValue(p) | DynamicOperand::Length(p) => &p.selector,
            DynamicOperand::LowerCase(inner) | DynamicOperand::UpperCase(inner) => {
                inner.selector_name()
            }
            DynamicOperand::NodeName(s)
            | DynamicOperand::NodeLocalName(s)
            | DynamicOperand::NodePath(s)
            | DynamicOperand::NodeDepth(s)
            | DynamicOperand::FullTextSearchScore(s) => s,
        }
    }

    pub fn selector_names(&self) -> BTreeSet<SelectorName> {
        let mut names = BTreeSet::new();
        names.insert(self.selector_name().clone());
        names
    }

    /// Returns the column this operand reads: a property or one of the pseudo-columns.
    pub fn referenced_column(&self) -> (SelectorName, String) {
        match self {
            DynamicOperand::PropertyValue(p) | DynamicOperand::Length(p) => {
                (p.selector.clone(), p.property.clone())
            }
            DynamicOperand::LowerCase(inner) | DynamicOperand::UpperCase(inner) => {
                inner.referenced_column()
            }
            DynamicOperand::NodeName(s) => (s.clone(), NAME_COLUMN.to_string()),
            DynamicOperand::NodeLocalName(s) => (s.clone(), LOCAL_NAME_COLUMN.to_string()),
            DynamicOperand::NodePath(s) => (s.clone(), PATH_COLUMN.to_string()),
            DynamicOperand::NodeDepth(s) => (s.clone(), DEPTH_COLUMN.to_string()),
            DynamicOperand::FullTextSearchScore(s) => (s.clone(), SCORE_COLUMN.to_string()),
        }
    }

    pub fn referenced_columns(&self) -> ColumnReferences {
        let mut columns = ColumnReferences::new();
        columns.insert(self.referenced_column());
        columns
    }

    /// Rewrites every selector and property reference through `mapper`.
    pub fn rewrite_references<F>(&self, mapper: &F) -> Self
    where
        F: Fn(&SelectorName, Option<&str>) -> Option<(SelectorName, Option<String>)>,
    {
        let pseudo = |s: &SelectorName, column: &str| map_property(mapper, s, column).0;
        match self {
            DynamicOperand::PropertyValue(p) => DynamicOperand::PropertyValue(p.rewrite(mapper)),
            DynamicOperand::Length(p) => DynamicOperand::Length(p.rewrite(mapper)),
            DynamicOperand::LowerCase(inner) => {
                DynamicOperand::LowerCase(Box::new(inner.rewrite_references(mapper)))
            }
            DynamicOperand::UpperCase(inner) => {
                DynamicOperand::UpperCase(Box::new(inner.rewrite_references(mapper)))
            }
            DynamicOperand::NodeName(s) => DynamicOperand::NodeName(pseudo(s, NAME_COLUMN)),
            DynamicOperand::NodeLocalName(s) => {
                DynamicOperand::NodeLocalName(pseudo(s, LOCAL_NAME_COLUMN))
            }
            DynamicOperand::NodePath(s) => DynamicOperand::NodePath(pseudo(s, PATH_COLUMN)),
            DynamicOperand::NodeDepth(s) => DynamicOperand::NodeDepth(pseudo(s, DEPTH_COLUMN)),
            DynamicOperand::FullTextSearchScore(s) => {
                DynamicOperand::FullTextSearchScore(map_selector(mapper, s))
            }
        }
    }
}

impl fmt::Display for DynamicOperand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DynamicOperand::PropertyValue(p) => write!(f, "{}", p),
            DynamicOperand::Length(p) => write!(f, "LENGTH({})", p),
            DynamicOperand::LowerCase(inner) => write!(f, "LOWER({})", inner),
            DynamicOperand::UpperCase(inner) => write!(f, "UPPER({})", inner),
            DynamicOperand::NodeName(s) => write!(f, "NAME({})", s),
            DynamicOperand::NodeLocalName(s) => write!(f, "LOCALNAME({})", s),
            DynamicOperand::NodePath(s) => write!(f, "PATH({})", s),
            DynamicOperand::NodeDepth(s) => write!(f, "DEPTH({})", s),
            DynamicOperand::FullTextSearchScore(s) => write!(f, "SCORE({})", s),
        }
    }
}

/// An operand whose value is fixed for the whole query.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum StaticOperand {
    Literal(Field),
    /// A named variable bound in the query context.
    BindVariable(String),
}

impl StaticOperand {
    /// Returns the value of the operand, or `None` for an unbound variable.
    pub fn resolve(&self, variables: &HashMap<String, Field>) -> Option<Field> {
        match self {
            StaticOperand::Literal(value) => Some(value.clone()),
            StaticOperand::BindVariable(name) => variables.get(name).cloned(),
        }
    }

    /// Returns the variable name if this operand is a bind variable.
    pub fn variable_name(&self) -> Option<&str> {
        match self {
            StaticOperand::BindVariable(name) => Some(name),
            StaticOperand::Literal(_) => None,
        }
    }
}

impl From<Field> for StaticOperand {
    fn from(value: Field) -> Self {
        StaticOperand::Literal(value)
    }
}

impl From<&str> for StaticOperand {
    fn from(value: &str) -> Self {
        StaticOperand::Literal(Field::from(value))
    }
}

impl From<i64> for StaticOperand {
    fn from(value: i64) -> Self {
        StaticOperand::Literal(Field::from(value))
    }
}

impl From<f64> for StaticOperand {
    fn from(value: f64) -> Self {
        StaticOperand::Literal(Field::from(value))
    }
}

impl From<bool> for StaticOperand {
    fn from(value: bool) -> Self {
        StaticOperand::Literal(Field::from(value))
    }
}

impl fmt::Display for StaticOperand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StaticOperand::Literal(Field::StringField(s)) => {
                write!(f, "'{}'", s.replace('\'', "''"))
            }
            StaticOperand::Literal(value) => write!(f, "{}", value),
            StaticOperand::BindVariable(name) => write!(f, "${}", name),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::expr::rename_selector;

    #[test]
    fn test_length_exposes_its_selector() {
        let length = DynamicOperand::Length(PropertyValue::new("cars", "model"));
        assert_eq!(length.selector_name(), &SelectorName::new("cars"));
        assert_eq!(length.to_string(), "LENGTH(cars.model)");
    }

    #[test]
    fn test_node_functions_reference_pseudo_columns() {
        let op = DynamicOperand::LowerCase(Box::new(DynamicOperand::NodeName("c".into())));
        let columns = op.referenced_columns();
        assert!(columns.contains(&(SelectorName::new("c"), NAME_COLUMN.to_string())));
        assert_eq!(op.to_string(), "LOWER(NAME(c))");
    }

    #[test]
    fn test_rename_selector() {
        let old = SelectorName::new("a");
        let new = SelectorName::new("b");
        let op = DynamicOperand::UpperCase(Box::new(DynamicOperand::property("a", "x")));
        let renamed = op.rewrite_references(&rename_selector(&old, &new));
        assert_eq!(renamed, DynamicOperand::UpperCase(Box::new(DynamicOperand::property("b", "x"))));
    }

    #[test]
    fn test_static_operand_rendering_and_resolution() {
        let mut vars = HashMap::new();
        vars.insert("maker".to_string(), Field::from("Ford"));
        assert_eq!(StaticOperand::from("O'Neil").to_string(), "'O''Neil'");
        assert_eq!(StaticOperand::from(3i64).to_string(), "3");
        let bind = StaticOperand::BindVariable("maker".to_string());
        assert_eq!(bind.to_string(), "$maker");
        assert_eq!(bind.resolve(&vars), Some(Field::from("Ford")));
        assert_eq!(StaticOperand::BindVariable("x".into()).resolve(&vars), None);
    }
}
