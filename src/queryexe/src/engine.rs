use crate::analyzer::{Analyzer, SimpleAnalyzer};
use crate::backend::Backend;
use crate::columns::Columns;
use crate::parsers::{QueryParser, QueryParsers};
use crate::processor::QueryProcessor;
use crate::results::QueryResults;
use common::logical_plan::PlanTree;
use common::{ArborError, PlanHints, Query, QueryContext};
use optimizer::{Optimizer, RuleBasedOptimizer};
use planner::{CanonicalPlanner, Planner};
use std::sync::{Arc, RwLock};

/// Plans, optimizes and executes queries against one backend.
pub struct QueryEngine {
    planner: Box<dyn Planner>,
    optimizer: Box<dyn Optimizer>,
    processor: QueryProcessor,
    parsers: RwLock<QueryParsers>,
}

impl QueryEngine {
    /// Creates an engine with the canonical planner, the rule-based optimizer and the simple
    /// analyzer.
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self::with_components(
            Box::new(CanonicalPlanner),
            Box::new(RuleBasedOptimizer::new()),
            backend,
            Arc::new(SimpleAnalyzer),
        )
    }

    pub fn with_components(
        planner: Box<dyn Planner>,
        optimizer: Box<dyn Optimizer>,
        backend: Arc<dyn Backend>,
        analyzer: Arc<dyn Analyzer>,
    ) -> Self {
        Self {
            planner,
            optimizer,
            processor: QueryProcessor::new(backend, analyzer),
            parsers: RwLock::new(QueryParsers::new()),
        }
    }

    /// Registers a query language, returning the parser it replaces.
    pub fn add_parser(&self, parser: Arc<dyn QueryParser>) -> Option<Arc<dyn QueryParser>> {
        self.parsers.write().unwrap().add_parser(parser)
    }

    pub fn remove_parser(&self, language: &str) -> Option<Arc<dyn QueryParser>> {
        self.parsers.write().unwrap().remove_parser(language)
    }

    pub fn languages(&self) -> Vec<String> {
        self.parsers.read().unwrap().languages()
    }

    /// Parses `text` in `language`. An unknown language is an `UnsupportedLanguage` error.
    pub fn parse(&self, language: &str, text: &str) -> Result<Query, ArborError> {
        self.parsers.read().unwrap().parse(language, text)
    }

    /// Plans and optimizes `query` without executing it.
    pub fn plan(&self, context: &QueryContext, query: &Query) -> PlanTree {
        let plan = self.planner.plan(context, query);
        if context.problems().has_errors() {
            return plan;
        }
        self.optimizer.optimize(context, plan)
    }

    /// Executes `query`.
    ///
    /// Problems found while planning or optimizing do not fail the call; they are returned
    /// with results that have no rows. Only a plan that cannot be processed is an error.
    pub fn execute(&self, context: &QueryContext, query: &Query) -> Result<QueryResults, ArborError> {
        let problems = context.problems().clone();
        let plan = self.planner.plan(context, query);
        if problems.has_errors() {
            info!("not executing query with errors:\n{}", problems);
            return Ok(QueryResults::new(Self::columns(&plan), None, problems, None));
        }
        let plan = self.optimizer.optimize(context, plan);
        let columns = Self::columns(&plan);
        let hints = context.hints();
        let rendered = if hints.show_plan {
            Some(plan.to_string())
        } else {
            None
        };
        if problems.has_errors() {
            info!("not executing query with errors:\n{}", problems);
            return Ok(QueryResults::new(columns, None, problems, rendered));
        }
        if hints.plan_only {
            return Ok(QueryResults::new(columns, None, problems, rendered));
        }
        let component = self.processor.compile(context, &plan, &columns)?;
        Ok(QueryResults::new(columns, Some(component), problems, rendered))
    }

    /// Executes `query` with `hints` in place of the context's hints.
    pub fn execute_with_hints(
        &self,
        context: &QueryContext,
        query: &Query,
        hints: PlanHints,
    ) -> Result<QueryResults, ArborError> {
        self.execute(&context.with_hints(hints), query)
    }

    /// Parses `text` in `language` and executes it.
    pub fn execute_text(
        &self,
        context: &QueryContext,
        language: &str,
        text: &str,
    ) -> Result<QueryResults, ArborError> {
        let query = self.parse(language, text)?;
        self.execute(context, &query)
    }

    fn columns(plan: &PlanTree) -> Columns {
        plan.root()
            .map(|root| Columns::for_node(plan, root))
            .unwrap_or_default()
    }
}
