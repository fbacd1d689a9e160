//! Recoverable diagnostics recorded while planning and optimizing a query.

use std::fmt;
use std::sync::{Arc, RwLock};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Warning => write!(f, "WARNING"),
            Severity::Info => write!(f, "INFO"),
        }
    }
}

/// Identifies the kind of a problem and carries its message template.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProblemCode {
    TableDoesNotExist,
    ColumnDoesNotExistOnTable,
    SelectorUsedMoreThanOnce,
    SelectorNotUsedInQuery,
    UnboundVariable,
    RecursiveViewDefinition,
    ViewHasNoColumns,
    ColumnNotProduced,
}

impl ProblemCode {
    /// Stable identifier of the code.
    pub fn code(&self) -> &'static str {
        match self {
            ProblemCode::TableDoesNotExist => "Q001",
            ProblemCode::ColumnDoesNotExistOnTable => "Q002",
            ProblemCode::SelectorUsedMoreThanOnce => "Q003",
            ProblemCode::SelectorNotUsedInQuery => "Q004",
            ProblemCode::UnboundVariable => "Q005",
            ProblemCode::RecursiveViewDefinition => "Q006",
            ProblemCode::ViewHasNoColumns => "Q007",
            ProblemCode::ColumnNotProduced => "Q008",
        }
    }

    /// Message template; `{0}`, `{1}` ... are replaced by the problem's parameters.
    pub fn template(&self) -> &'static str {
        match self {
            ProblemCode::TableDoesNotExist => "Table or view '{0}' does not exist",
            ProblemCode::ColumnDoesNotExistOnTable => {
                "Column '{0}' does not exist on table or view '{1}'"
            }
            ProblemCode::SelectorUsedMoreThanOnce => {
                "Selector '{0}' is used more than once in the query"
            }
            ProblemCode::SelectorNotUsedInQuery => {
                "Selector '{0}' is referenced but not used in the FROM clause"
            }
            ProblemCode::UnboundVariable => "No value is bound to variable '{0}'",
            ProblemCode::RecursiveViewDefinition => {
                "View '{0}' is defined in terms of itself through {1}"
            }
            ProblemCode::ViewHasNoColumns => "View '{0}' has no columns",
            ProblemCode::ColumnNotProduced => {
                "Column '{0}' of view '{1}' is not produced by its definition"
            }
        }
    }
}

/// Position in the query text.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Problem {
    pub severity: Severity,
    pub code: ProblemCode,
    pub params: Vec<String>,
    pub location: Option<Location>,
    pub cause: Option<String>,
}

impl Problem {
    pub fn new(severity: Severity, code: ProblemCode, params: Vec<String>) -> Self {
        Self {
            severity,
            code,
            params,
            location: None,
            cause: None,
        }
    }

    pub fn at(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    pub fn caused_by(mut self, cause: impl Into<String>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    /// Renders the template with the parameters substituted.
    pub fn message(&self) -> String {
        let mut message = self.code.template().to_string();
        for (i, param) in self.params.iter().enumerate() {
            message = message.replace(&format!("{{{}}}", i), param);
        }
        message
    }
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.severity, self.code.code(), self.message())?;
        if let Some(location) = &self.location {
            write!(f, " (line {}, column {})", location.line, location.column)?;
        }
        if let Some(cause) = &self.cause {
            write!(f, " caused by: {}", cause)?;
        }
        Ok(())
    }
}

/// Shared sink for the problems of one query invocation.
///
/// Clones share the same underlying list.
#[derive(Debug, Clone, Default)]
pub struct Problems {
    problems: Arc<RwLock<Vec<Problem>>>,
}

impl Problems {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, problem: Problem) {
        debug!("recorded problem: {}", problem);
        self.problems.write().unwrap().push(problem);
    }

    pub fn add_error(&self, code: ProblemCode, params: Vec<String>) {
        self.add(Problem::new(Severity::Error, code, params));
    }

    pub fn add_warning(&self, code: ProblemCode, params: Vec<String>) {
        self.add(Problem::new(Severity::Warning, code, params));
    }

    pub fn add_info(&self, code: ProblemCode, params: Vec<String>) {
        self.add(Problem::new(Severity::Info, code, params));
    }

    pub fn has_errors(&self) -> bool {
        self.count(Severity::Error) > 0
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.problems
            .read()
            .unwrap()
            .iter()
            .filter(|p| p.severity == severity)
            .count()
    }

    pub fn len(&self) -> usize {
        self.problems.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a copy of the problems recorded so far.
    pub fn snapshot(&self) -> Vec<Problem> {
        self.problems.read().unwrap().clone()
    }

    /// True if any problem has the given code.
    pub fn contains(&self, code: ProblemCode) -> bool {
        self.problems.read().unwrap().iter().any(|p| p.code == code)
    }
}

impl fmt::Display for Problems {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for problem in self.problems.read().unwrap().iter() {
            writeln!(f, "{}", problem)?;
        }
        Ok(())
    }
}
