use common::schemata::SchemaColumn;
use common::{ArborError, Field, PlanHints};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Contents of a workspace configuration file.
#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct ArborConfig {
    pub workspace: String,
    pub hints: PlanHints,
    pub tables: Vec<TableConfig>,
    pub views: Vec<ViewConfig>,
    pub nodes: Vec<NodeConfig>,
    pub imports: Vec<ImportConfig>,
    pub variables: HashMap<String, Value>,
}

#[derive(Deserialize, Debug)]
pub struct TableConfig {
    pub name: String,
    pub columns: Vec<SchemaColumn>,
}

/// A view defined by a SQL query.
#[derive(Deserialize, Debug)]
pub struct ViewConfig {
    pub name: String,
    pub sql: String,
}

#[derive(Deserialize, Debug)]
pub struct NodeConfig {
    pub path: String,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default)]
    pub properties: HashMap<String, Value>,
}

/// CSV file whose records become nodes of a table.
#[derive(Deserialize, Debug)]
pub struct ImportConfig {
    pub table: String,
    pub path: String,
    #[serde(default)]
    pub has_headers: bool,
}

impl ArborConfig {
    /// Reads a configuration file.
    ///
    /// # Arguments
    ///
    /// * `path` - JSON file to read.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ArborError> {
        let contents = fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    pub fn from_json(contents: &str) -> Result<Self, ArborError> {
        serde_json::from_str(contents)
            .map_err(|e| ArborError::InvalidArgument(format!("Invalid configuration: {}", e)))
    }
}

/// Converts a JSON scalar to a field.
pub fn json_to_field(value: &Value) -> Result<Field, ArborError> {
    match value {
        Value::Null => Ok(Field::Null),
        Value::Bool(b) => Ok(Field::BooleanField(*b)),
        Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => Ok(Field::LongField(i)),
            (None, Some(f)) => Ok(Field::DoubleField(f)),
            _ => Err(ArborError::InvalidArgument(format!("Unsupported number {}", n))),
        },
        Value::String(s) => Ok(Field::from(s.as_str())),
        _ => Err(ArborError::InvalidArgument(format!(
            "Only scalar values are supported but found {}",
            value
        ))),
    }
}
