//! Registry of the tables and views a query may select from.

use crate::expr::{SelectorName, ALL_COLUMNS};
use crate::query_model::Query;
use crate::DataType;
use std::collections::{HashMap, HashSet};

/// Path of the node that produced a row.
pub const PATH_COLUMN: &str = "jcr:path";
/// Qualified name of the node.
pub const NAME_COLUMN: &str = "jcr:name";
/// Name of the node without its namespace prefix.
pub const LOCAL_NAME_COLUMN: &str = "mode:localName";
/// Number of segments in the node's path.
pub const DEPTH_COLUMN: &str = "mode:depth";
/// Full-text search score of the row.
pub const SCORE_COLUMN: &str = "jcr:score";

/// Columns every table and view exposes in addition to its declared columns.
pub const PSEUDO_COLUMNS: [(&str, DataType); 5] = [
    (PATH_COLUMN, DataType::Path),
    (NAME_COLUMN, DataType::Name),
    (LOCAL_NAME_COLUMN, DataType::String),
    (DEPTH_COLUMN, DataType::Long),
    (SCORE_COLUMN, DataType::Double),
];

/// Returns the type of a pseudo-column, or `None` if `name` is not one.
pub fn pseudo_column_type(name: &str) -> Option<DataType> {
    PSEUDO_COLUMNS
        .iter()
        .find(|(column, _)| *column == name)
        .map(|(_, dtype)| *dtype)
}

/// A declared column. Pairs the name with the dtype.
#[derive(Serialize, Deserialize, PartialEq, Clone, Debug)]
pub struct SchemaColumn {
    pub name: String,
    pub dtype: DataType,
}

impl SchemaColumn {
    pub fn new(name: impl Into<String>, dtype: DataType) -> Self {
        Self {
            name: name.into(),
            dtype,
        }
    }

    /// Create columns with the given names and dtypes.
    ///
    /// # Arguments
    ///
    /// * `names` - Names of the columns.
    /// * `dtypes` - Dtypes of the columns.
    pub fn from_vecs(names: Vec<&str>, dtypes: Vec<DataType>) -> Vec<Self> {
        names
            .iter()
            .zip(dtypes.iter())
            .map(|(name, dtype)| SchemaColumn::new(*name, *dtype))
            .collect()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum TableKind {
    Base,
    /// A view and the query defining it.
    View(Query),
}

/// A table or view: a name and its ordered columns.
#[derive(Clone, Debug, PartialEq)]
pub struct Table {
    name: SelectorName,
    columns: Vec<SchemaColumn>,
    /// Mapping from column name to order in the table.
    name_map: HashMap<String, usize>,
    kind: TableKind,
}

impl Table {
    pub fn new(name: impl Into<SelectorName>, columns: Vec<SchemaColumn>, kind: TableKind) -> Self {
        let mut name_map = HashMap::new();
        for (i, column) in columns.iter().enumerate() {
            name_map.entry(column.name.clone()).or_insert(i);
        }
        Self {
            name: name.into(),
            columns,
            name_map,
            kind,
        }
    }

    pub fn name(&self) -> &SelectorName {
        &self.name
    }

    /// Returns an iterator over the declared columns.
    pub fn columns(&self) -> impl Iterator<Item = &SchemaColumn> {
        self.columns.iter()
    }

    /// Returns the declared column with the given name.
    pub fn column(&self, name: &str) -> Option<&SchemaColumn> {
        self.name_map.get(name).map(|i| &self.columns[*i])
    }

    /// Returns the position of a declared column.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.name_map.get(name).copied()
    }

    /// Returns the dtype of a declared column or pseudo-column.
    pub fn column_type(&self, name: &str) -> Option<DataType> {
        self.column(name)
            .map(|c| c.dtype)
            .or_else(|| pseudo_column_type(name))
    }

    /// True if the table has a declared column or pseudo-column with this name.
    pub fn has_column(&self, name: &str) -> bool {
        self.column_type(name).is_some()
    }

    /// Returns the number of declared columns.
    pub fn size(&self) -> usize {
        self.columns.len()
    }

    pub fn is_view(&self) -> bool {
        matches!(self.kind, TableKind::View(_))
    }

    /// Returns the defining query of a view.
    pub fn definition(&self) -> Option<&Query> {
        match &self.kind {
            TableKind::View(query) => Some(query),
            TableKind::Base => None,
        }
    }
}

/// Lookup of tables and views by name.
///
/// Implementations are shared read-only between concurrently executing queries.
pub trait Schemata: Send + Sync {
    /// Returns the table or view with the given name.
    fn table(&self, name: &SelectorName) -> Option<&Table>;

    /// Returns the names of every table and view, sorted.
    fn table_names(&self) -> Vec<SelectorName>;
}

/// A [`Schemata`] that never changes once built.
#[derive(Clone, Debug, Default)]
pub struct ImmutableSchemata {
    tables: HashMap<SelectorName, Table>,
}

impl ImmutableSchemata {
    pub fn builder() -> SchemataBuilder {
        SchemataBuilder::default()
    }
}

impl Schemata for ImmutableSchemata {
    fn table(&self, name: &SelectorName) -> Option<&Table> {
        self.tables.get(name)
    }

    fn table_names(&self) -> Vec<SelectorName> {
        let mut names: Vec<SelectorName> = self.tables.keys().cloned().collect();
        names.sort();
        names
    }
}

fn push_all(columns: &mut Vec<SchemaColumn>, from: Vec<SchemaColumn>) {
    for column in from {
        if !columns.iter().any(|c| c.name == column.name) {
            columns.push(column);
        }
    }
}

struct PendingTable {
    columns: Option<Vec<SchemaColumn>>,
    definition: Option<Query>,
}

/// Collects table and view definitions for an [`ImmutableSchemata`].
#[derive(Default)]
pub struct SchemataBuilder {
    tables: HashMap<SelectorName, PendingTable>,
}

impl SchemataBuilder {
    /// Adds a base table.
    pub fn add_table(mut self, name: &str, columns: Vec<SchemaColumn>) -> Self {
        self.tables.insert(
            SelectorName::new(name),
            PendingTable {
                columns: Some(columns),
                definition: None,
            },
        );
        self
    }

    /// Adds a view whose columns are derived from its definition when the schemata is built.
    pub fn add_view(mut self, name: &str, definition: Query) -> Self {
        self.tables.insert(
            SelectorName::new(name),
            PendingTable {
                columns: None,
                definition: Some(definition),
            },
        );
        self
    }

    /// Adds a view with explicitly declared columns.
    pub fn add_view_with_columns(
        mut self,
        name: &str,
        columns: Vec<SchemaColumn>,
        definition: Query,
    ) -> Self {
        self.tables.insert(
            SelectorName::new(name),
            PendingTable {
                columns: Some(columns),
                definition: Some(definition),
            },
        );
        self
    }

    pub fn build(self) -> ImmutableSchemata {
        let mut resolved = HashMap::new();
        let names: Vec<SelectorName> = self.tables.keys().cloned().collect();
        for name in &names {
            self.columns_of(name, &mut resolved, &mut HashSet::new());
        }
        let mut tables = HashMap::new();
        for (name, pending) in self.tables {
            let columns = resolved.remove(&name).unwrap_or_default();
            let kind = match pending.definition {
                Some(query) => TableKind::View(query),
                None => TableKind::Base,
            };
            debug!("registered '{}' with {} columns", name, columns.len());
            tables.insert(name.clone(), Table::new(name, columns, kind));
        }
        ImmutableSchemata { tables }
    }

    /// Resolves the columns of a table or view.
    ///
    /// Unknown tables resolve to no columns, as does a view reached again while its own
    /// columns are being derived.
    fn columns_of(
        &self,
        name: &SelectorName,
        resolved: &mut HashMap<SelectorName, Vec<SchemaColumn>>,
        visiting: &mut HashSet<SelectorName>,
    ) -> Vec<SchemaColumn> {
        if let Some(columns) = resolved.get(name) {
            return columns.clone();
        }
        let pending = match self.tables.get(name) {
            Some(pending) => pending,
            None => return Vec::new(),
        };
        if let Some(columns) = &pending.columns {
            resolved.insert(name.clone(), columns.clone());
            return columns.clone();
        }
        let definition = match &pending.definition {
            Some(definition) => definition,
            None => return Vec::new(),
        };
        if !visiting.insert(name.clone()) {
            return Vec::new();
        }

        let selectors: HashMap<&SelectorName, &SelectorName> = definition
            .source
            .selectors()
            .into_iter()
            .map(|(table, selector)| (selector, table))
            .collect();
        let mut columns: Vec<SchemaColumn> = Vec::new();
        if definition.columns.is_empty() {
            for (table, _) in definition.source.selectors() {
                let from = self.columns_of(table, resolved, visiting);
                push_all(&mut columns, from);
            }
        } else {
            for column in &definition.columns {
                let table = selectors.get(&column.selector).copied();
                if column.property == ALL_COLUMNS {
                    if let Some(table) = table {
                        let from = self.columns_of(table, resolved, visiting);
                        push_all(&mut columns, from);
                    }
                    continue;
                }
                let dtype = match pseudo_column_type(&column.property) {
                    Some(dtype) => dtype,
                    None => table
                        .and_then(|table| {
                            self.columns_of(table, resolved, visiting)
                                .into_iter()
                                .find(|c| c.name == column.property)
                        })
                        .map(|c| c.dtype)
                        .unwrap_or(DataType::String),
                };
                columns.push(SchemaColumn::new(column.column_name(), dtype));
            }
        }

        visiting.remove(name);
        resolved.insert(name.clone(), columns.clone());
        columns
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::QueryBuilder;

    fn schemata() -> ImmutableSchemata {
        ImmutableSchemata::builder()
            .add_table(
                "cars",
                SchemaColumn::from_vecs(
                    vec!["maker", "model", "year"],
                    vec![DataType::String, DataType::String, DataType::Long],
                ),
            )
            .add_view(
                "recent",
                QueryBuilder::new()
                    .select("cars", "maker")
                    .select_as("cars", "model", "carModel")
                    .select("cars", "year")
                    .from("cars")
                    .build()
                    .unwrap(),
            )
            .add_view(
                "everything",
                QueryBuilder::new().from("recent").build().unwrap(),
            )
            .build()
    }

    #[test]
    fn test_view_columns_are_derived() {
        let schemata = schemata();
        let recent = schemata.table(&"recent".into()).unwrap();
        assert!(recent.is_view());
        let names: Vec<&str> = recent.columns().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["maker", "carModel", "year"]);
        assert_eq!(recent.column_type("year"), Some(DataType::Long));
        assert_eq!(recent.column_type(PATH_COLUMN), Some(DataType::Path));

        let everything = schemata.table(&"everything".into()).unwrap();
        assert_eq!(everything.size(), 3);
        assert_eq!(everything.column_index("carModel"), Some(1));
    }

    #[test]
    fn test_recursive_views_do_not_loop() {
        let schemata = ImmutableSchemata::builder()
            .add_view("a", QueryBuilder::new().from("b").build().unwrap())
            .add_view("b", QueryBuilder::new().from("a").build().unwrap())
            .build();
        assert_eq!(schemata.table(&"a".into()).unwrap().size(), 0);
        assert_eq!(schemata.table_names().len(), 2);
    }

    #[test]
    fn test_unknown_table() {
        let schemata = schemata();
        assert!(schemata.table(&"trucks".into()).is_none());
        assert!(!schemata.table(&"cars".into()).unwrap().is_view());
    }
}
