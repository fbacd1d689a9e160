use common::logical_plan::{NodeIndex, NodeType, PlanTree};
use common::schemata::{SchemaColumn, PSEUDO_COLUMNS};
use common::{DataType, SelectorName};
use std::fmt;

/// One column of the rows a component produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnInfo {
    /// Selector the value is read from.
    pub selector: SelectorName,
    /// Property of the selector's node.
    pub property: String,
    /// Name the column is presented under.
    pub name: String,
    pub data_type: DataType,
}

impl ColumnInfo {
    pub fn new(selector: SelectorName, property: impl Into<String>, data_type: DataType) -> Self {
        let property = property.into();
        Self {
            selector,
            name: property.clone(),
            property,
            data_type,
        }
    }

    /// Presents the column under `name`.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// True for the columns every node carries besides its declared properties.
    pub fn is_pseudo(&self) -> bool {
        PSEUDO_COLUMNS.iter().any(|(c, _)| *c == self.property)
    }
}

/// The shape of a row: selector-qualified columns in tuple order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Columns {
    columns: Vec<ColumnInfo>,
}

impl Columns {
    pub fn new(columns: Vec<ColumnInfo>) -> Self {
        Self { columns }
    }

    /// Columns of a selector reading a table: the declared columns followed by the
    /// pseudo-columns.
    ///
    /// # Arguments
    ///
    /// * `selector` - Name the rows are referenced by.
    /// * `declared` - Columns declared by the table.
    pub fn for_source(selector: &SelectorName, declared: &[SchemaColumn]) -> Self {
        let mut columns: Vec<ColumnInfo> = declared
            .iter()
            .map(|c| ColumnInfo::new(selector.clone(), c.name.clone(), c.dtype))
            .collect();
        for (name, dtype) in PSEUDO_COLUMNS.iter() {
            if !declared.iter().any(|c| c.name == *name) {
                columns.push(ColumnInfo::new(selector.clone(), *name, *dtype));
            }
        }
        Self::new(columns)
    }

    /// Computes the columns produced by the plan node at `index`.
    ///
    /// # Arguments
    ///
    /// * `plan` - Plan containing the node.
    /// * `index` - Node whose output shape is computed.
    pub fn for_node(plan: &PlanTree, index: NodeIndex) -> Self {
        let node = plan.node(index);
        match node.node_type() {
            NodeType::Source => match node.selector_name() {
                Some(selector) => {
                    let declared = node.source_columns().map(|c| c.as_slice()).unwrap_or(&[]);
                    Self::for_source(selector, declared)
                }
                None => Self::default(),
            },
            NodeType::Project => {
                let types = node.project_column_types();
                let columns = node
                    .project_columns()
                    .map(|columns| {
                        columns
                            .iter()
                            .enumerate()
                            .map(|(i, column)| {
                                let dtype = types
                                    .and_then(|t| t.get(i))
                                    .copied()
                                    .unwrap_or(DataType::String);
                                ColumnInfo::new(column.selector.clone(), column.property.clone(), dtype)
                                    .named(column.column_name())
                            })
                            .collect()
                    })
                    .unwrap_or_default();
                Self::new(columns)
            }
            NodeType::Join => plan
                .children(index)
                .iter()
                .fold(Self::default(), |acc, child| acc.join(&Self::for_node(plan, *child))),
            _ => match plan.first_child(index) {
                Some(child) => Self::for_node(plan, child),
                None => Self::default(),
            },
        }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn get(&self, i: usize) -> Option<&ColumnInfo> {
        self.columns.get(i)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ColumnInfo> {
        self.columns.iter()
    }

    /// Presentation names in tuple order.
    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Returns the position of the selector's property.
    pub fn index_of(&self, selector: &SelectorName, property: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| &c.selector == selector && c.property == property)
    }

    /// Positions of the declared (non-pseudo) columns of `selector`.
    pub fn indexes_of_selector(&self, selector: &SelectorName) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(_, c)| &c.selector == selector && !c.is_pseudo())
            .map(|(i, _)| i)
            .collect()
    }

    /// Columns of rows made by appending a row of `other` to a row of `self`.
    pub fn join(&self, other: &Columns) -> Columns {
        let mut columns = self.columns.clone();
        columns.extend(other.columns.iter().cloned());
        Self::new(columns)
    }
}

impl fmt::Display for Columns {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self
            .columns
            .iter()
            .map(|c| format!("{}.{}", c.selector, c.property))
            .collect();
        write!(f, "[{}]", names.join(", "))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use common::schemata::SCORE_COLUMN;
    use common::testutil::{cars_context, init};
    use common::{JoinCondition, JoinType, QueryBuilder};
    use planner::{CanonicalPlanner, Planner};

    #[test]
    fn test_source_columns_include_pseudo_columns() {
        let selector = SelectorName::new("c");
        let columns = Columns::for_source(
            &selector,
            &SchemaColumn::from_vecs(vec!["maker"], vec![DataType::String]),
        );
        assert_eq!(columns.len(), 1 + PSEUDO_COLUMNS.len());
        assert_eq!(columns.index_of(&selector, "maker"), Some(0));
        assert!(columns.index_of(&selector, SCORE_COLUMN).is_some());
        assert_eq!(columns.indexes_of_selector(&selector), vec![0]);
    }

    #[test]
    fn test_columns_of_plan() {
        init();
        let context = cars_context();
        let query = QueryBuilder::new()
            .select_as("c", "model", "name")
            .select("m", "country")
            .from_as("cars", "c")
            .join(
                JoinType::Inner,
                "makers",
                "m",
                Some(JoinCondition::equi("c", "maker", "m", "name")),
            )
            .build()
            .unwrap();
        let plan = CanonicalPlanner.plan(&context, &query);
        let columns = Columns::for_node(&plan, plan.root().unwrap());
        assert_eq!(columns.names(), vec!["name", "country"]);
        assert_eq!(columns.get(0).unwrap().property, "model");

        let join = plan.find_all(NodeType::Join)[0];
        let joined = Columns::for_node(&plan, join);
        assert_eq!(joined.len(), 4 + 2 + 2 * PSEUDO_COLUMNS.len());
        assert_eq!(
            joined.index_of(&SelectorName::new("m"), "name"),
            Some(4 + PSEUDO_COLUMNS.len())
        );
    }
}
