use crate::config::{json_to_field, ArborConfig};
use common::schemata::{ImmutableSchemata, Schemata};
use common::{ArborError, ExecutionEnvironment, Field, PlanHints, Problems, QueryContext, SelectorName};
use memstore::{import_csv, MemStore, StoredNode};
use queryexe::{QueryEngine, QueryParser};
use sql::SqlQueryParser;
use std::collections::HashMap;
use std::sync::Arc;

const HELP: &str = "\\tables            list tables and views
\\explain <sql>     show the optimized plan without running the query
\\set <name> <v>    bind a variable, referenced as @name
\\help              this message
\\quit              exit";

/// A workspace loaded from a configuration: schemata, stored nodes and the engine over them.
pub struct Session {
    engine: QueryEngine,
    schemata: Arc<ImmutableSchemata>,
    environment: ExecutionEnvironment,
    hints: PlanHints,
    variables: HashMap<String, Field>,
}

impl Session {
    /// Loads the schemata and nodes described by `config`.
    pub fn from_config(config: &ArborConfig) -> Result<Self, ArborError> {
        let parser = SqlQueryParser::new();
        let mut builder = ImmutableSchemata::builder();
        for table in &config.tables {
            builder = builder.add_table(&table.name, table.columns.clone());
        }
        for view in &config.views {
            let definition = parser.parse(&view.sql)?;
            builder = builder.add_view(&view.name, definition);
        }
        let schemata = Arc::new(builder.build());

        let store = MemStore::new();
        for node in &config.nodes {
            let mut stored = StoredNode::new(node.path.as_str(), node.node_type.as_str());
            for (name, value) in &node.properties {
                stored = stored.with(name, json_to_field(value)?);
            }
            store.add_node(stored)?;
        }
        for import in &config.imports {
            let table = schemata
                .table(&SelectorName::new(import.table.as_str()))
                .ok_or_else(|| {
                    ArborError::InvalidArgument(format!("Unknown table {}", import.table))
                })?;
            let count = import_csv(&store, table, &import.path, import.has_headers)?;
            info!("imported {} rows into {} from {}", count, import.table, import.path);
        }
        info!(
            "loaded workspace '{}' with {} tables and {} nodes",
            config.workspace,
            schemata.table_names().len(),
            store.len()
        );

        let engine = QueryEngine::new(Arc::new(store));
        engine.add_parser(Arc::new(parser));
        let mut variables = HashMap::new();
        for (name, value) in &config.variables {
            variables.insert(name.clone(), json_to_field(value)?);
        }
        Ok(Self {
            engine,
            schemata,
            environment: ExecutionEnvironment::new(config.workspace.as_str()),
            hints: config.hints.clone(),
            variables,
        })
    }

    /// A context with a fresh problem sink for one query.
    fn context(&self, explain: bool) -> QueryContext {
        let mut hints = self.hints.clone();
        if explain {
            hints.show_plan = true;
            hints.plan_only = true;
        }
        QueryContext::new(
            self.environment.clone(),
            self.schemata.clone(),
            Some(hints),
            Some(Problems::new()),
            Some(&self.variables),
        )
    }

    /// Runs one SQL query and renders the outcome.
    ///
    /// Problems are rendered in place of rows; with `explain` only the plan is rendered.
    pub fn run_sql(&self, sql: &str, explain: bool) -> Result<String, ArborError> {
        let context = self.context(explain);
        let mut results = self.engine.execute_text(&context, sql::LANGUAGE, sql)?;
        if results.has_errors() {
            return Ok(results.problems().to_string());
        }
        let mut out = String::new();
        if let Some(plan) = results.plan() {
            out += plan;
            out += "\n";
        }
        if !explain {
            out += &results.to_table()?;
        }
        Ok(out)
    }

    /// Plans and optimizes one SQL query, rendering the plan as JSON.
    pub fn plan_json(&self, sql: &str) -> Result<String, ArborError> {
        let context = self.context(false);
        let query = self.engine.parse(sql::LANGUAGE, sql)?;
        let plan = self.engine.plan(&context, &query);
        if context.problems().has_errors() {
            return Ok(context.problems().to_string());
        }
        serde_json::to_string_pretty(&plan.to_json())
            .map(|json| json + "\n")
            .map_err(|e| ArborError::ExecutionError(e.to_string()))
    }

    fn tables(&self) -> String {
        let mut names: Vec<String> = self
            .schemata
            .table_names()
            .iter()
            .map(|n| n.to_string())
            .collect();
        names.sort();
        let mut out = String::new();
        for name in names {
            if let Some(table) = self.schemata.table(&SelectorName::new(name.as_str())) {
                let columns: Vec<&str> = table.columns().map(|c| c.name.as_str()).collect();
                let kind = if table.is_view() { "view" } else { "table" };
                out += &format!("{} {} ({})\n", kind, name, columns.join(", "));
            }
        }
        out
    }

    fn set_variable(&mut self, args: &str) -> Result<String, ArborError> {
        let mut parts = args.trim().splitn(2, char::is_whitespace);
        let name = parts.next().unwrap_or_default().trim_start_matches('@');
        let value = parts.next().unwrap_or_default().trim();
        if name.is_empty() || value.is_empty() {
            return Err(ArborError::InvalidArgument(String::from(
                "Usage: \\set <name> <value>",
            )));
        }
        let json: serde_json::Value =
            serde_json::from_str(value).unwrap_or_else(|_| serde_json::Value::from(value));
        let field = json_to_field(&json)?;
        let rendered = format!("@{} = {}", name, field);
        self.variables.insert(name.to_string(), field);
        Ok(rendered)
    }

    /// Handles one line of input, returning the text to print, or `None` to quit.
    pub fn handle_line(&mut self, line: &str) -> Option<Result<String, ArborError>> {
        let line = line.trim().trim_end_matches(';');
        if !line.starts_with('\\') {
            return Some(self.run_sql(line, false));
        }
        let (command, args) = match line.find(char::is_whitespace) {
            Some(i) => (&line[..i], &line[i..]),
            None => (line, ""),
        };
        match command {
            "\\q" | "\\quit" => None,
            "\\tables" => Some(Ok(self.tables())),
            "\\explain" => Some(self.run_sql(args, true)),
            "\\set" => Some(self.set_variable(args)),
            "\\help" => Some(Ok(HELP.to_string())),
            _ => Some(Err(ArborError::InvalidArgument(format!(
                "Unknown command {}, try \\help",
                command
            )))),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn session() -> Session {
        let config = ArborConfig::from_json(
            r#"{
                "workspace": "garage",
                "tables": [
                    {"name": "cars", "columns": [
                        {"name": "maker", "dtype": "String"},
                        {"name": "model", "dtype": "String"},
                        {"name": "year", "dtype": "Long"}
                    ]}
                ],
                "views": [{"name": "recent", "sql": "SELECT maker, model FROM cars WHERE year > 2005"}],
                "nodes": [
                    {"path": "/cars/civic", "type": "cars", "properties": {"maker": "Honda", "model": "Civic", "year": 2004}},
                    {"path": "/cars/prius", "type": "cars", "properties": {"maker": "Toyota", "model": "Prius", "year": 2008}}
                ]
            }"#,
        )
        .unwrap();
        Session::from_config(&config).unwrap()
    }

    #[test]
    fn test_run_sql() {
        let session = session();
        let out = session.run_sql("SELECT model FROM recent", false).unwrap();
        assert!(out.contains("Prius"));
        assert!(!out.contains("Civic"));
        let out = session.run_sql("SELECT model FROM trucks", false).unwrap();
        assert!(out.contains("trucks"));
    }

    #[test]
    fn test_plan_json() {
        let session = session();
        let json = session.plan_json("SELECT model FROM recent").unwrap();
        let plan = common::logical_plan::PlanTree::from_json(&json).unwrap();
        assert!(!plan.find_all(common::logical_plan::NodeType::Access).is_empty());
        assert!(session.plan_json("SELECT model FROM").is_err());
    }

    #[test]
    fn test_commands() {
        let mut session = session();
        let tables = session.handle_line("\\tables").unwrap().unwrap();
        assert!(tables.contains("table cars (maker, model, year)"));
        assert!(tables.contains("view recent"));
        let plan = session
            .handle_line("\\explain SELECT model FROM cars")
            .unwrap()
            .unwrap();
        assert!(plan.contains("ACCESS"));
        session.handle_line("\\set year 2004").unwrap().unwrap();
        let out = session
            .handle_line("SELECT model FROM cars WHERE year = @year;")
            .unwrap()
            .unwrap();
        assert!(out.contains("Civic"));
        assert!(!out.contains("Prius"));
        assert!(session.handle_line("\\bogus").unwrap().is_err());
        assert!(session.handle_line("\\quit").is_none());
    }
}
