//! Everything one query invocation needs besides the query itself.

use crate::problems::Problems;
use crate::schemata::Schemata;
use crate::Field;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// The environment a query runs in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionEnvironment {
    pub workspace_name: String,
    pub attributes: HashMap<String, String>,
}

impl ExecutionEnvironment {
    pub fn new(workspace_name: impl Into<String>) -> Self {
        Self {
            workspace_name: workspace_name.into(),
            attributes: HashMap::new(),
        }
    }
}

/// Flags tuning planning, optimization and execution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlanHints {
    /// Attach the rendered optimized plan to the results.
    pub show_plan: bool,
    /// Stop after optimization without executing.
    pub plan_only: bool,
    /// Report columns that do not exist on their table.
    pub validate_column_existence: bool,
    /// Never choose the merge join algorithm.
    pub use_only_nested_join_algorithm: bool,
    /// Merge lower and upper bound comparisons into range criteria.
    pub rewrite_range_criteria: bool,
    /// Name expanded `*` columns `selector.column` instead of `column`.
    pub qualify_expanded_column_names: bool,
}

impl Default for PlanHints {
    fn default() -> Self {
        Self {
            show_plan: false,
            plan_only: false,
            validate_column_existence: true,
            use_only_nested_join_algorithm: false,
            rewrite_range_criteria: true,
            qualify_expanded_column_names: false,
        }
    }
}

/// Immutable bundle of the schemata, hints, problem sink and variables of one query.
#[derive(Clone)]
pub struct QueryContext {
    environment: ExecutionEnvironment,
    schemata: Arc<dyn Schemata>,
    hints: PlanHints,
    problems: Problems,
    variables: HashMap<String, Field>,
}

impl QueryContext {
    /// Creates a context.
    ///
    /// # Arguments
    ///
    /// * `environment` - Environment the query runs in.
    /// * `schemata` - Tables and views visible to the query.
    /// * `hints` - Planner hints; defaults when `None`.
    /// * `problems` - Problem sink; a fresh one when `None`.
    /// * `variables` - Bound variables; copied so later changes by the caller are not seen.
    pub fn new(
        environment: ExecutionEnvironment,
        schemata: Arc<dyn Schemata>,
        hints: Option<PlanHints>,
        problems: Option<Problems>,
        variables: Option<&HashMap<String, Field>>,
    ) -> Self {
        Self {
            environment,
            schemata,
            hints: hints.unwrap_or_default(),
            problems: problems.unwrap_or_default(),
            variables: variables.cloned().unwrap_or_default(),
        }
    }

    /// Creates a context with default hints, no variables and a fresh problem sink.
    pub fn with_schemata(schemata: Arc<dyn Schemata>) -> Self {
        Self::new(ExecutionEnvironment::default(), schemata, None, None, None)
    }

    pub fn environment(&self) -> &ExecutionEnvironment {
        &self.environment
    }

    pub fn schemata(&self) -> &dyn Schemata {
        self.schemata.as_ref()
    }

    pub fn hints(&self) -> &PlanHints {
        &self.hints
    }

    pub fn problems(&self) -> &Problems {
        &self.problems
    }

    pub fn variables(&self) -> &HashMap<String, Field> {
        &self.variables
    }

    /// Returns a copy using different hints.
    pub fn with_hints(&self, hints: PlanHints) -> Self {
        Self {
            hints,
            ..self.clone()
        }
    }

    /// Returns a copy using a different problem sink.
    pub fn with_problems(&self, problems: Problems) -> Self {
        Self {
            problems,
            ..self.clone()
        }
    }

    /// Returns a copy using different variables.
    pub fn with_variables(&self, variables: &HashMap<String, Field>) -> Self {
        Self {
            variables: variables.clone(),
            ..self.clone()
        }
    }

    /// Returns a copy using a different schemata.
    pub fn with_other_schemata(&self, schemata: Arc<dyn Schemata>) -> Self {
        Self {
            schemata,
            ..self.clone()
        }
    }
}

impl fmt::Debug for QueryContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryContext")
            .field("environment", &self.environment)
            .field("hints", &self.hints)
            .field("problems", &self.problems)
            .field("variables", &self.variables)
            .finish()
    }
}
