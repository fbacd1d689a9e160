use crate::expr::{
    Column, Constraint, JoinAlgorithm, JoinCondition, JoinType, Limit, Ordering, SelectorName,
};
use crate::schemata::SchemaColumn;
use crate::DataType;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// NodeIndex is used to identify nodes in the PlanTree.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIndex(pub(crate) usize);

impl NodeIndex {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The operation a plan node performs.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeType {
    /// Reads a table or view.
    Source,
    /// Keeps a subset of columns.
    Project,
    /// Keeps the rows satisfying a constraint.
    Select,
    Join,
    Sort,
    Limit,
    DupRemove,
    /// Boundary of the work handed to a backend.
    Access,
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeType::Source => "SOURCE",
            NodeType::Project => "PROJECT",
            NodeType::Select => "SELECT",
            NodeType::Join => "JOIN",
            NodeType::Sort => "SORT",
            NodeType::Limit => "LIMIT",
            NodeType::DupRemove => "DUP_REMOVE",
            NodeType::Access => "ACCESS",
        };
        write!(f, "{}", name)
    }
}

/// Keys of the properties a plan node may carry.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Property {
    SourceName,
    SourceAlias,
    SourceColumns,
    SelectCriteria,
    ProjectColumns,
    ProjectColumnTypes,
    JoinType,
    JoinAlgorithm,
    JoinCondition,
    SortOrderBy,
    Limit,
    /// Views inlined on the way to this SOURCE, outermost first.
    InlinedViews,
    /// Set on a SOURCE whose view could not be inlined.
    ViewUnresolved,
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Property::SourceName => "SOURCE_NAME",
            Property::SourceAlias => "SOURCE_ALIAS",
            Property::SourceColumns => "SOURCE_COLUMNS",
            Property::SelectCriteria => "SELECT_CRITERIA",
            Property::ProjectColumns => "PROJECT_COLUMNS",
            Property::ProjectColumnTypes => "PROJECT_COLUMN_TYPES",
            Property::JoinType => "JOIN_TYPE",
            Property::JoinAlgorithm => "JOIN_ALGORITHM",
            Property::JoinCondition => "JOIN_CONDITION",
            Property::SortOrderBy => "SORT_ORDER_BY",
            Property::Limit => "LIMIT",
            Property::InlinedViews => "INLINED_VIEWS",
            Property::ViewUnresolved => "VIEW_UNRESOLVED",
        };
        write!(f, "{}", name)
    }
}

/// Value of a plan node property.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum PlanValue {
    Selector(SelectorName),
    Selectors(Vec<SelectorName>),
    SchemaColumns(Vec<SchemaColumn>),
    Columns(Vec<Column>),
    Types(Vec<DataType>),
    Constraint(Constraint),
    JoinType(JoinType),
    JoinAlgorithm(JoinAlgorithm),
    JoinCondition(JoinCondition),
    Orderings(Vec<Ordering>),
    Limit(Limit),
    Flag(bool),
}

fn join<T: fmt::Display>(values: &[T]) -> String {
    let values: Vec<String> = values.iter().map(|v| v.to_string()).collect();
    values.join(", ")
}

impl fmt::Display for PlanValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanValue::Selector(s) => write!(f, "{}", s),
            PlanValue::Selectors(s) => write!(f, "[{}]", join(s)),
            PlanValue::SchemaColumns(columns) => {
                let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
                write!(f, "[{}]", names.join(", "))
            }
            PlanValue::Columns(c) => write!(f, "[{}]", join(c)),
            PlanValue::Types(t) => write!(f, "[{}]", join(t)),
            PlanValue::Constraint(c) => write!(f, "{}", c),
            PlanValue::JoinType(t) => write!(f, "{}", t),
            PlanValue::JoinAlgorithm(a) => write!(f, "{}", a),
            PlanValue::JoinCondition(c) => write!(f, "{}", c),
            PlanValue::Orderings(o) => write!(f, "[{}]", join(o)),
            PlanValue::Limit(l) => write!(f, "{}", l),
            PlanValue::Flag(b) => write!(f, "{}", b),
        }
    }
}

/// Generates a getter that returns the property's value if set.
///
/// Reading a property through the getter of a different value type is a programming error
/// and panics.
macro_rules! typed_property {
    ($(#[$doc:meta])* $name:ident, $property:expr, $variant:ident, $ty:ty) => {
        $(#[$doc])*
        pub fn $name(&self) -> Option<&$ty> {
            match self.properties.get(&$property) {
                Some(PlanValue::$variant(value)) => Some(value),
                Some(other) => panic!(
                    "property {} of {} node holds {:?}",
                    $property, self.node_type, other
                ),
                None => None,
            }
        }
    };
}

/// A node of a [`PlanTree`](super::PlanTree).
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PlanNode {
    pub(crate) node_type: NodeType,
    pub(crate) properties: BTreeMap<Property, PlanValue>,
    /// Selectors visible at or below this node.
    pub(crate) selectors: BTreeSet<SelectorName>,
    pub(crate) children: Vec<NodeIndex>,
    pub(crate) parent: Option<NodeIndex>,
}

impl PlanNode {
    pub(crate) fn new(node_type: NodeType) -> Self {
        Self {
            node_type,
            properties: BTreeMap::new(),
            selectors: BTreeSet::new(),
            children: Vec::new(),
            parent: None,
        }
    }

    pub fn node_type(&self) -> NodeType {
        self.node_type
    }

    pub fn is(&self, node_type: NodeType) -> bool {
        self.node_type == node_type
    }

    pub fn children(&self) -> &[NodeIndex] {
        &self.children
    }

    pub fn parent(&self) -> Option<NodeIndex> {
        self.parent
    }

    pub fn selectors(&self) -> &BTreeSet<SelectorName> {
        &self.selectors
    }

    pub fn add_selector(&mut self, selector: SelectorName) {
        self.selectors.insert(selector);
    }

    pub fn add_selectors<'a>(&mut self, selectors: impl IntoIterator<Item = &'a SelectorName>) {
        self.selectors.extend(selectors.into_iter().cloned());
    }

    pub fn set_selectors(&mut self, selectors: BTreeSet<SelectorName>) {
        self.selectors = selectors;
    }

    /// Replaces one selector name with another, if present.
    pub fn replace_selector(&mut self, old: &SelectorName, new: &SelectorName) {
        if self.selectors.remove(old) {
            self.selectors.insert(new.clone());
        }
    }

    pub fn get(&self, property: Property) -> Option<&PlanValue> {
        self.properties.get(&property)
    }

    pub fn set(&mut self, property: Property, value: PlanValue) {
        self.properties.insert(property, value);
    }

    pub fn remove(&mut self, property: Property) -> Option<PlanValue> {
        self.properties.remove(&property)
    }

    pub fn has(&self, property: Property) -> bool {
        self.properties.contains_key(&property)
    }

    /// Returns the properties in key order.
    pub fn properties(&self) -> impl Iterator<Item = (&Property, &PlanValue)> {
        self.properties.iter()
    }

    typed_property!(source_name, Property::SourceName, Selector, SelectorName);
    typed_property!(source_alias, Property::SourceAlias, Selector, SelectorName);
    typed_property!(
        source_columns,
        Property::SourceColumns,
        SchemaColumns,
        Vec<SchemaColumn>
    );
    typed_property!(criteria, Property::SelectCriteria, Constraint, Constraint);
    typed_property!(
        project_columns,
        Property::ProjectColumns,
        Columns,
        Vec<Column>
    );
    typed_property!(
        project_column_types,
        Property::ProjectColumnTypes,
        Types,
        Vec<DataType>
    );
    typed_property!(join_type, Property::JoinType, JoinType, JoinType);
    typed_property!(
        join_algorithm,
        Property::JoinAlgorithm,
        JoinAlgorithm,
        JoinAlgorithm
    );
    typed_property!(
        join_condition,
        Property::JoinCondition,
        JoinCondition,
        JoinCondition
    );
    typed_property!(
        sort_orderings,
        Property::SortOrderBy,
        Orderings,
        Vec<Ordering>
    );
    typed_property!(limit, Property::Limit, Limit, Limit);

    /// The name rows of a SOURCE are referenced by: its alias, or else its table name.
    pub fn selector_name(&self) -> Option<&SelectorName> {
        self.source_alias().or_else(|| self.source_name())
    }

    /// Views inlined on the way to this SOURCE, outermost first.
    pub fn inlined_views(&self) -> &[SelectorName] {
        match self.properties.get(&Property::InlinedViews) {
            Some(PlanValue::Selectors(views)) => views,
            _ => &[],
        }
    }

    /// True if the boolean property is set to true.
    pub fn is_flagged(&self, property: Property) -> bool {
        matches!(self.properties.get(&property), Some(PlanValue::Flag(true)))
    }
}

impl fmt::Display for PlanNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.node_type, join(&self.selectors.iter().collect::<Vec<_>>()))?;
        for (property, value) in &self.properties {
            write!(f, " {}={}", property, value)?;
        }
        Ok(())
    }
}
