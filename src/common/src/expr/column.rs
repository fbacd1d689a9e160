use super::{map_property, DynamicOperand, SelectorName};
use std::fmt;

/// A column requested by a query: a selector's property, optionally renamed.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Hash)]
pub struct Column {
    pub selector: SelectorName,
    pub property: String,
    pub alias: Option<String>,
}

impl Column {
    pub fn new(selector: impl Into<SelectorName>, property: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            property: property.into(),
            alias: None,
        }
    }

    pub fn with_alias(
        selector: impl Into<SelectorName>,
        property: impl Into<String>,
        alias: impl Into<String>,
    ) -> Self {
        Self {
            selector: selector.into(),
            property: property.into(),
            alias: Some(alias.into()),
        }
    }

    /// The name under which the column appears in results.
    pub fn column_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.property)
    }

    /// Rewrites the selector and property through `mapper`.
    ///
    /// When the property is renamed the old column name is kept as the alias, so the
    /// column still appears to callers under the name they asked for.
    pub fn rewrite_references<F>(&self, mapper: &F) -> Self
    where
        F: Fn(&SelectorName, Option<&str>) -> Option<(SelectorName, Option<String>)>,
    {
        let (selector, property) = map_property(mapper, &self.selector, &self.property);
        let alias = if property != self.property {
            Some(self.column_name().to_string())
        } else {
            self.alias.clone()
        };
        Self {
            selector,
            property,
            alias,
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.selector, self.property)?;
        if let Some(alias) = &self.alias {
            write!(f, " AS {}", alias)?;
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Order {
    Ascending,
    Descending,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NullOrder {
    NullsFirst,
    NullsLast,
    /// Nulls first when ascending, last when descending.
    Default,
}

/// One key of an ORDER BY.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Ordering {
    pub operand: DynamicOperand,
    pub order: Order,
    pub null_order: NullOrder,
}

impl Ordering {
    pub fn ascending(operand: DynamicOperand) -> Self {
        Self {
            operand,
            order: Order::Ascending,
            null_order: NullOrder::Default,
        }
    }

    pub fn descending(operand: DynamicOperand) -> Self {
        Self {
            operand,
            order: Order::Descending,
            null_order: NullOrder::Default,
        }
    }

    /// True if nulls sort before every other value for this key.
    pub fn nulls_first(&self) -> bool {
        match self.null_order {
            NullOrder::NullsFirst => true,
            NullOrder::NullsLast => false,
            NullOrder::Default => self.order == Order::Ascending,
        }
    }

    pub fn rewrite_references<F>(&self, mapper: &F) -> Self
    where
        F: Fn(&SelectorName, Option<&str>) -> Option<(SelectorName, Option<String>)>,
    {
        Self {
            operand: self.operand.rewrite_references(mapper),
            order: self.order,
            null_order: self.null_order,
        }
    }
}

impl fmt::Display for Ordering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let order = match self.order {
            Order::Ascending => "ASC",
            Order::Descending => "DESC",
        };
        write!(f, "{} {}", self.operand, order)?;
        match self.null_order {
            NullOrder::NullsFirst => write!(f, " NULLS FIRST"),
            NullOrder::NullsLast => write!(f, " NULLS LAST"),
            NullOrder::Default => Ok(()),
        }
    }
}
