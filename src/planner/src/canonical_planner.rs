use crate::Planner;
use common::logical_plan::{NodeIndex, NodeType, PlanTree, PlanValue, Property};
use common::schemata::Table;
use common::{
    Column, Constraint, DataType, ProblemCode, Query, QueryContext, SelectorName, Source,
    ALL_COLUMNS,
};

/// Builds the canonical plan of a query.
///
/// From the leaves up: a SOURCE per selector (combined by JOIN nodes), one SELECT per
/// top-level conjunct of the criteria, a SORT for the orderings, the PROJECT of the
/// requested columns, a DUP_REMOVE for distinct queries and a LIMIT.
#[derive(Debug, Default, Clone, Copy)]
pub struct CanonicalPlanner;

impl CanonicalPlanner {
    pub fn new() -> Self {
        CanonicalPlanner
    }
}

impl Planner for CanonicalPlanner {
    fn plan(&self, context: &QueryContext, query: &Query) -> PlanTree {
        let mut translator = PlanTranslator::new(context);
        translator.process_query(query);
        debug!("created canonical plan for '{}':\n{}", query, translator.plan);
        translator.plan
    }
}

/// Translates one query into a plan, validating the selectors and columns it references.
struct PlanTranslator<'a> {
    /// Plan built so far.
    plan: PlanTree,
    context: &'a QueryContext,
    /// Selectors of the FROM clause in order, with their table when it exists.
    selectors: Vec<(SelectorName, Option<&'a Table>)>,
}

impl<'a> PlanTranslator<'a> {
    fn new(context: &'a QueryContext) -> Self {
        Self {
            plan: PlanTree::new(),
            context,
            selectors: Vec::new(),
        }
    }

    fn process_query(&mut self, query: &Query) {
        let mut top = self.process_source(&query.source);
        if let Some(constraint) = &query.constraint {
            top = self.process_criteria(constraint, top);
        }
        if !query.orderings.is_empty() {
            for ordering in &query.orderings {
                let (selector, property) = ordering.operand.referenced_column();
                self.check_column(&selector, &property);
            }
            top = self.attach(NodeType::Sort, top);
            self.plan.node_mut(top).set(
                Property::SortOrderBy,
                PlanValue::Orderings(query.orderings.clone()),
            );
        }
        top = self.process_project(query, top);
        if query.distinct {
            top = self.attach(NodeType::DupRemove, top);
        }
        if !query.limit.is_unlimited() {
            top = self.attach(NodeType::Limit, top);
            self.plan
                .node_mut(top)
                .set(Property::Limit, PlanValue::Limit(query.limit));
        }
        self.plan.set_root(top);
        self.plan.recompute_selectors(top);
    }

    /// Adds a node of `node_type` above `child` and returns it.
    fn attach(&mut self, node_type: NodeType, child: NodeIndex) -> NodeIndex {
        let node = self.plan.add_node(node_type);
        self.plan.add_last_child(node, child);
        node
    }

    fn process_source(&mut self, source: &Source) -> NodeIndex {
        match source {
            Source::Selector { name, alias } => {
                let node = self.plan.add_node(NodeType::Source);
                let selector = alias.as_ref().unwrap_or(name).clone();
                let table = self.context.schemata().table(name);
                {
                    let source = self.plan.node_mut(node);
                    source.set(Property::SourceName, PlanValue::Selector(name.clone()));
                    if selector != *name {
                        source.set(Property::SourceAlias, PlanValue::Selector(selector.clone()));
                    }
                    if let Some(table) = table {
                        source.set(
                            Property::SourceColumns,
                            PlanValue::SchemaColumns(table.columns().cloned().collect()),
                        );
                    }
                    source.add_selector(selector.clone());
                }
                if table.is_none() {
                    self.context
                        .problems()
                        .add_error(ProblemCode::TableDoesNotExist, vec![name.to_string()]);
                }
                if self.selectors.iter().any(|(s, _)| *s == selector) {
                    self.context.problems().add_error(
                        ProblemCode::SelectorUsedMoreThanOnce,
                        vec![selector.to_string()],
                    );
                } else {
                    self.selectors.push((selector, table));
                }
                node
            }
            Source::Join {
                left,
                right,
                join_type,
                condition,
            } => {
                let join = self.plan.add_node(NodeType::Join);
                let left = self.process_source(left);
                let right = self.process_source(right);
                self.plan.add_last_child(join, left);
                self.plan.add_last_child(join, right);
                self.plan
                    .node_mut(join)
                    .set(Property::JoinType, PlanValue::JoinType(*join_type));
                if let Some(condition) = condition {
                    for (selector, property) in condition.referenced_columns() {
                        self.check_column(&selector, &property);
                    }
                    self.plan.node_mut(join).set(
                        Property::JoinCondition,
                        PlanValue::JoinCondition(condition.clone()),
                    );
                }
                join
            }
        }
    }

    /// Stacks one SELECT per independent conjunct of `constraint` above `top`.
    fn process_criteria(&mut self, constraint: &Constraint, mut top: NodeIndex) -> NodeIndex {
        for conjunct in constraint.conjuncts() {
            for (selector, property) in conjunct.referenced_columns() {
                self.check_column(&selector, &property);
            }
            for operand in conjunct.static_operands() {
                if let Some(name) = operand.variable_name() {
                    if !self.context.variables().contains_key(name) {
                        self.context
                            .problems()
                            .add_error(ProblemCode::UnboundVariable, vec![name.to_string()]);
                    }
                }
            }
            top = self.attach(NodeType::Select, top);
            self.plan.node_mut(top).set(
                Property::SelectCriteria,
                PlanValue::Constraint(conjunct.clone()),
            );
        }
        top
    }

    fn process_project(&mut self, query: &Query, child: NodeIndex) -> NodeIndex {
        let mut columns = Vec::new();
        if query.columns.is_empty() {
            for (selector, table) in &self.selectors {
                if let Some(table) = table {
                    columns.extend(self.expand(selector, table));
                }
            }
        } else {
            for column in &query.columns {
                if column.property == ALL_COLUMNS {
                    match self.lookup(&column.selector) {
                        Some(Some(table)) => columns.extend(self.expand(&column.selector, table)),
                        Some(None) => {}
                        None => self.selector_not_used(&column.selector),
                    }
                } else {
                    self.check_column(&column.selector, &column.property);
                    columns.push(column.clone());
                }
            }
        }
        let types: Vec<DataType> = columns
            .iter()
            .map(|c| {
                self.lookup(&c.selector)
                    .flatten()
                    .and_then(|t| t.column_type(&c.property))
                    .unwrap_or(DataType::String)
            })
            .collect();
        let project = self.attach(NodeType::Project, child);
        let node = self.plan.node_mut(project);
        node.set(Property::ProjectColumns, PlanValue::Columns(columns));
        node.set(Property::ProjectColumnTypes, PlanValue::Types(types));
        project
    }

    /// Returns every declared column of a table as columns of `selector`.
    fn expand(&self, selector: &SelectorName, table: &Table) -> Vec<Column> {
        let qualify = self.context.hints().qualify_expanded_column_names;
        table
            .columns()
            .map(|c| {
                if qualify {
                    Column::with_alias(
                        selector.clone(),
                        c.name.clone(),
                        format!("{}.{}", selector, c.name),
                    )
                } else {
                    Column::new(selector.clone(), c.name.clone())
                }
            })
            .collect()
    }

    /// `None` if the selector is not in the FROM clause, `Some(None)` if its table is unknown.
    fn lookup(&self, selector: &SelectorName) -> Option<Option<&'a Table>> {
        self.selectors
            .iter()
            .find(|(s, _)| s == selector)
            .map(|(_, table)| *table)
    }

    fn selector_not_used(&self, selector: &SelectorName) {
        self.context.problems().add_error(
            ProblemCode::SelectorNotUsedInQuery,
            vec![selector.to_string()],
        );
    }

    /// Records a problem if the column cannot be read from the selector.
    fn check_column(&self, selector: &SelectorName, property: &str) {
        match self.lookup(selector) {
            None => self.selector_not_used(selector),
            Some(None) => {}
            Some(Some(table)) => {
                if property != ALL_COLUMNS
                    && self.context.hints().validate_column_existence
                    && !table.has_column(property)
                {
                    self.context.problems().add_error(
                        ProblemCode::ColumnDoesNotExistOnTable,
                        vec![property.to_string(), table.name().to_string()],
                    );
                }
            }
        }
    }
}
