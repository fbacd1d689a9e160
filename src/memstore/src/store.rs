use common::logical_plan::{NodeIndex, NodeType, PlanTree};
use common::path;
use common::schemata::SchemaColumn;
use common::{ArborError, Constraint, Field, FullTextSearch, QueryContext, SelectorName, Tuple};
use queryexe::{apply_access_nodes, Analyzer, Backend, Columns, ProcessingComponent, TupleIterator};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

/// A node held by a [`MemStore`].
#[derive(Debug, Clone, PartialEq)]
pub struct StoredNode {
    /// Absolute path identifying the node.
    pub path: String,
    /// Type of the node; a SOURCE reads the nodes whose type is its table name.
    pub node_type: String,
    pub properties: HashMap<String, Field>,
}

impl StoredNode {
    pub fn new(path: impl Into<String>, node_type: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            node_type: node_type.into(),
            properties: HashMap::new(),
        }
    }

    /// Sets a property, builder style.
    pub fn with(mut self, name: &str, value: impl Into<Field>) -> Self {
        self.properties.insert(name.to_string(), value.into());
        self
    }

    fn value(&self, name: &str) -> Field {
        self.properties.get(name).cloned().unwrap_or(Field::Null)
    }

    /// Values of the declared columns, null where the node lacks the property.
    fn declared_values(&self, declared: &[SchemaColumn]) -> Vec<Field> {
        declared.iter().map(|c| self.value(&c.name)).collect()
    }
}

/// Collects the full-text searches of `constraint` that apply to `selector`.
fn full_text_searches<'a>(
    constraint: &'a Constraint,
    selector: &SelectorName,
    found: &mut Vec<&'a FullTextSearch>,
) {
    match constraint {
        Constraint::And(left, right) | Constraint::Or(left, right) => {
            full_text_searches(left, selector, found);
            full_text_searches(right, selector, found);
        }
        Constraint::Not(inner) => full_text_searches(inner, selector, found),
        Constraint::FullTextSearch(search) if &search.selector == selector => found.push(search),
        _ => {}
    }
}

/// Thread-safe in-memory set of nodes, keyed by path.
#[derive(Clone, Default)]
pub struct MemStore {
    nodes: Arc<RwLock<BTreeMap<String, StoredNode>>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `node`, replacing any node at the same path.
    pub fn add_node(&self, node: StoredNode) -> Result<Option<StoredNode>, ArborError> {
        if !node.path.starts_with('/') {
            return Err(ArborError::InvalidArgument(format!(
                "Node path {} is not absolute",
                node.path
            )));
        }
        debug!("memstore storing {} of type {}", node.path, node.node_type);
        Ok(self.nodes.write().unwrap().insert(node.path.clone(), node))
    }

    pub fn remove_node(&self, path: &str) -> Option<StoredNode> {
        self.nodes.write().unwrap().remove(path)
    }

    pub fn node(&self, path: &str) -> Option<StoredNode> {
        self.nodes.read().unwrap().get(path).cloned()
    }

    pub fn len(&self) -> usize {
        self.nodes.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the nodes of `node_type` in path order.
    pub fn nodes_of_type(&self, node_type: &str) -> Vec<StoredNode> {
        self.nodes
            .read()
            .unwrap()
            .values()
            .filter(|n| n.node_type == node_type)
            .cloned()
            .collect()
    }

    /// Builds the row of `node`: declared values followed by the pseudo-columns.
    fn row(
        node: &StoredNode,
        declared: &[SchemaColumn],
        searches: &[&FullTextSearch],
        analyzer: &Arc<dyn Analyzer>,
    ) -> Tuple {
        let mut fields = node.declared_values(declared);
        let score = if searches.is_empty() {
            1.0
        } else {
            searches
                .iter()
                .map(|s| {
                    let text = match &s.property {
                        Some(p) => node.value(p).as_string().unwrap_or_default(),
                        None => fields
                            .iter()
                            .filter_map(Field::as_string)
                            .collect::<Vec<_>>()
                            .join(" "),
                    };
                    analyzer.score(&s.term, &text)
                })
                .fold(0.0, f64::max)
        };
        let pseudo = vec![
            Field::from(node.path.as_str()),
            Field::from(path::name(&node.path)),
            Field::from(path::local_name(&node.path)),
            Field::LongField(path::depth(&node.path) as i64),
            Field::DoubleField(score),
        ];
        fields.extend(pseudo);
        Tuple::new(fields)
    }
}

impl Backend for MemStore {
    fn create_access_component(
        &self,
        context: &QueryContext,
        plan: &PlanTree,
        access: NodeIndex,
        _columns: &Columns,
        analyzer: &Arc<dyn Analyzer>,
    ) -> Result<Box<dyn ProcessingComponent>, ArborError> {
        let source = plan
            .find_at_or_below(access, NodeType::Source)
            .ok_or_else(|| ArborError::ExecutionError(format!("No source below {}", plan.node(access))))?;
        let node = plan.node(source);
        let (table, selector) = match (node.source_name(), node.selector_name()) {
            (Some(table), Some(selector)) => (table, selector),
            _ => {
                return Err(ArborError::ExecutionError(format!(
                    "Source {} has no table",
                    node
                )))
            }
        };
        let declared: &[SchemaColumn] = node.source_columns().map(|c| c.as_slice()).unwrap_or(&[]);
        let mut searches = Vec::new();
        for select in plan.find_all(NodeType::Select) {
            if let Some(criteria) = plan.node(select).criteria() {
                full_text_searches(criteria, selector, &mut searches);
            }
        }
        let rows: Vec<Tuple> = self
            .nodes_of_type(table.name())
            .iter()
            .map(|n| Self::row(n, declared, &searches, analyzer))
            .collect();
        debug!("memstore scanned {} nodes of type {} for {}", rows.len(), table, selector);
        let scan = Box::new(TupleIterator::new(rows, Columns::for_source(selector, declared)));
        apply_access_nodes(context, plan, access, scan, analyzer)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_store_nodes() {
        let store = MemStore::new();
        assert!(store.add_node(StoredNode::new("cars/civic", "cars")).is_err());
        store
            .add_node(StoredNode::new("/cars/civic", "cars").with("maker", "Honda"))
            .unwrap();
        store.add_node(StoredNode::new("/makers/honda", "makers")).unwrap();
        let replaced = store
            .add_node(StoredNode::new("/cars/civic", "cars").with("maker", "Toyota"))
            .unwrap();
        assert_eq!(replaced.unwrap().value("maker"), Field::from("Honda"));
        assert_eq!(store.len(), 2);
        assert_eq!(store.nodes_of_type("cars").len(), 1);
        assert!(store.remove_node("/makers/honda").is_some());
        assert!(store.node("/makers/honda").is_none());
    }

    #[test]
    fn test_row_shape() {
        let node = StoredNode::new("/cars/honda/civic", "cars").with("model", "Civic");
        let declared = SchemaColumn::from_vecs(
            vec!["maker", "model"],
            vec![common::DataType::String, common::DataType::String],
        );
        let analyzer: Arc<dyn Analyzer> = Arc::new(queryexe::SimpleAnalyzer);
        let row = MemStore::row(&node, &declared, &[], &analyzer);
        assert_eq!(
            row.field_vals,
            vec![
                Field::Null,
                Field::from("Civic"),
                Field::from("/cars/honda/civic"),
                Field::from("civic"),
                Field::from("civic"),
                Field::LongField(3),
                Field::DoubleField(1.0),
            ]
        );
    }
}
