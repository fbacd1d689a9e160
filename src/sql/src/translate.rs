use common::schemata::{DEPTH_COLUMN, LOCAL_NAME_COLUMN, NAME_COLUMN, PATH_COLUMN, SCORE_COLUMN};
use common::{
    ArborError, Constraint, DynamicOperand, Field, FullTextSearch, JoinCondition, JoinType,
    Operator, Ordering, PropertyValue, Query, QueryBuilder, SelectorName, StaticOperand,
};
use sqlparser::ast::{
    BinaryOperator, Expr, Function, JoinConstraint, JoinOperator, ObjectName, SelectItem, SetExpr,
    TableFactor, UnaryOperator, Value,
};

fn error<T>(message: impl Into<String>) -> Result<T, ArborError> {
    Err(ArborError::ParseError(message.into()))
}

/// Strips the delimiters of a quoted identifier.
fn ident(name: &str) -> String {
    let name = name.trim();
    for (open, close) in [('"', '"'), ('[', ']'), ('`', '`')].iter() {
        if name.len() >= 2 && name.starts_with(*open) && name.ends_with(*close) {
            return name[1..name.len() - 1].to_string();
        }
    }
    name.to_string()
}

/// Returns the single-part name of a table or function.
fn object_name(name: &ObjectName) -> Result<String, ArborError> {
    if name.0.len() != 1 {
        return error(format!("Qualified names are not supported: {}", name));
    }
    Ok(ident(&name.0[0]))
}

fn string_literal(expr: &Expr) -> Result<String, ArborError> {
    match expr {
        Expr::Value(Value::SingleQuotedString(s)) => Ok(s.to_string()),
        _ => error(format!("Expected a string literal but found {}", expr)),
    }
}

fn count(expr: &Expr, what: &str) -> Result<usize, ArborError> {
    match expr {
        Expr::Value(Value::Number(s)) => s
            .parse::<usize>()
            .or_else(|_| error(format!("Invalid {} {}", what, s))),
        _ => error(format!("Expected a number for {} but found {}", what, expr)),
    }
}

fn number(s: &str) -> Result<Field, ArborError> {
    if let Ok(i) = s.parse::<i64>() {
        return Ok(Field::LongField(i));
    }
    s.parse::<f64>()
        .map(Field::DoubleField)
        .or_else(|_| error(format!("Unsupported literal {}", s)))
}

/// Translates a parsed SQL query into a [`Query`].
///
/// Column references may omit the selector only when the FROM clause has a single selector.
/// Identifiers starting with `@` are bind variables.
pub struct Translator {
    /// Query assembled so far.
    builder: QueryBuilder,
    /// Selector names in the FROM clause, left to right.
    selectors: Vec<String>,
}

impl Translator {
    fn new() -> Self {
        Self {
            builder: QueryBuilder::new(),
            selectors: Vec::new(),
        }
    }

    /// Translates a sqlparser::ast::Query.
    ///
    /// # Arguments
    ///
    /// * `sql` - AST to translate.
    pub fn from_sql(sql: &sqlparser::ast::Query) -> Result<Query, ArborError> {
        let mut translator = Translator::new();
        translator.process_query(sql)?;
        translator.builder.build()
    }

    fn update(&mut self, f: impl FnOnce(QueryBuilder) -> QueryBuilder) {
        let builder = std::mem::take(&mut self.builder);
        self.builder = f(builder);
    }

    /// Helper function to process sqlparser::ast::Query.
    ///
    /// # Arguments
    ///
    /// * `query` - AST to process.
    fn process_query(&mut self, query: &sqlparser::ast::Query) -> Result<(), ArborError> {
        if !query.ctes.is_empty() {
            return error("WITH clauses are not supported");
        }
        match &query.body {
            SetExpr::Select(select) => self.process_select(select)?,
            SetExpr::SetOperation { .. } => return error("Set operations are not supported"),
            _ => return error("Only SELECT queries are supported"),
        }
        for order in &query.order_by {
            let operand = self.dynamic_operand(&order.expr)?;
            let ordering = match order.asc {
                Some(false) => Ordering::descending(operand),
                _ => Ordering::ascending(operand),
            };
            self.update(|b| b.order_by(ordering));
        }
        if let Some(limit) = &query.limit {
            let limit = count(limit, "LIMIT")?;
            self.update(|b| b.limit(limit));
        }
        if let Some(offset) = &query.offset {
            let offset = count(offset, "OFFSET")?;
            self.update(|b| b.offset(offset));
        }
        Ok(())
    }

    /// Helper function to process sqlparser::ast::Select.
    ///
    /// The FROM clause is processed first so that column references can be resolved
    /// against its selectors.
    ///
    /// # Arguments
    ///
    /// * `select` - Select AST to process.
    fn process_select(&mut self, select: &sqlparser::ast::Select) -> Result<(), ArborError> {
        if !select.group_by.is_empty() || select.having.is_some() {
            return error("GROUP BY and HAVING are not supported");
        }
        if select.from.is_empty() {
            return error("A FROM clause is required");
        }
        for (i, from) in select.from.iter().enumerate() {
            let (table, selector) = self.process_table_factor(&from.relation)?;
            if i == 0 && table == selector {
                self.update(|b| b.from(&table));
            } else if i == 0 {
                self.update(|b| b.from_as(&table, &selector));
            } else {
                // Comma separated tables are cross joined.
                self.update(|b| b.join(JoinType::Cross, &table, &selector, None));
            }
            for join in &from.joins {
                self.process_join(join)?;
            }
        }

        let wildcard = select
            .projection
            .iter()
            .any(|item| matches!(item, SelectItem::Wildcard));
        if wildcard && select.projection.len() > 1 {
            return error("* cannot be combined with other columns");
        }
        for item in &select.projection {
            match item {
                SelectItem::Wildcard => {}
                SelectItem::UnnamedExpr(expr) => {
                    let (selector, property) = self.column(expr)?;
                    self.update(|b| b.select(&selector, &property));
                }
                SelectItem::ExprWithAlias { expr, alias } => {
                    let (selector, property) = self.column(expr)?;
                    let alias = ident(alias);
                    self.update(|b| b.select_as(&selector, &property, &alias));
                }
                _ => return error("Qualified wildcards are not supported"),
            }
        }

        if let Some(selection) = &select.selection {
            let constraint = self.constraint(selection)?;
            self.update(|b| b.where_(constraint));
        }
        if select.distinct {
            self.update(|b| b.distinct());
        }
        Ok(())
    }

    /// Helper function to process sqlparser::ast::TableFactor.
    ///
    /// Returns the table name and the selector name it is referenced by.
    ///
    /// # Arguments
    ///
    /// * `tf` - Table to process.
    fn process_table_factor(&mut self, tf: &TableFactor) -> Result<(String, String), ArborError> {
        match tf {
            TableFactor::Table { name, alias, .. } => {
                let table = object_name(name)?;
                let selector = match alias {
                    Some(alias) => ident(&alias.name),
                    None => table.clone(),
                };
                if self.selectors.contains(&selector) {
                    return error(format!("The selector {} is used more than once", selector));
                }
                self.selectors.push(selector.clone());
                Ok((table, selector))
            }
            _ => error("Nested joins and derived tables are not supported"),
        }
    }

    /// Parses sqlparser::ast::Join and joins its table to the current source.
    ///
    /// # Arguments
    ///
    /// * `join` - The join to parse.
    fn process_join(&mut self, join: &sqlparser::ast::Join) -> Result<(), ArborError> {
        let (table, selector) = self.process_table_factor(&join.relation)?;
        let (join_type, constraint) = match &join.join_operator {
            JoinOperator::Inner(c) => (JoinType::Inner, Some(c)),
            JoinOperator::LeftOuter(c) => (JoinType::LeftOuter, Some(c)),
            JoinOperator::RightOuter(c) => (JoinType::RightOuter, Some(c)),
            JoinOperator::FullOuter(c) => (JoinType::FullOuter, Some(c)),
            JoinOperator::CrossJoin => (JoinType::Cross, None),
            _ => return error("Unsupported join type"),
        };
        let condition = match constraint {
            Some(JoinConstraint::On(expr)) => Some(self.join_condition(expr)?),
            Some(_) => return error("Only ON join constraints are supported"),
            None => None,
        };
        self.update(|b| b.join(join_type, &table, &selector, condition));
        Ok(())
    }

    /// Parses the ON clause of a join.
    ///
    /// # Arguments
    ///
    /// * `expr` - Expression to parse.
    fn join_condition(&self, expr: &Expr) -> Result<JoinCondition, ArborError> {
        match expr {
            Expr::Nested(inner) => self.join_condition(inner),
            Expr::BinaryOp {
                left,
                op: BinaryOperator::Eq,
                right,
            } => {
                let (selector1, property1) = self.column_ref(left)?;
                let (selector2, property2) = self.column_ref(right)?;
                Ok(JoinCondition::equi(selector1, property1, selector2, property2))
            }
            Expr::Function(Function { name, args, .. }) => {
                let function = object_name(name)?.to_uppercase();
                match (&function[..], args.len()) {
                    ("ISSAMENODE", 2) | ("ISSAMENODE", 3) => Ok(JoinCondition::SameNode {
                        selector1: self.selector_arg(&args[0])?,
                        selector2: self.selector_arg(&args[1])?,
                        path: match args.get(2) {
                            Some(path) => Some(string_literal(path)?),
                            None => None,
                        },
                    }),
                    ("ISCHILDNODE", 2) => Ok(JoinCondition::ChildNode {
                        child_selector: self.selector_arg(&args[0])?,
                        parent_selector: self.selector_arg(&args[1])?,
                    }),
                    ("ISDESCENDANTNODE", 2) => Ok(JoinCondition::DescendantNode {
                        descendant_selector: self.selector_arg(&args[0])?,
                        ancestor_selector: self.selector_arg(&args[1])?,
                    }),
                    _ => error(format!("Unsupported join condition {}", expr)),
                }
            }
            _ => error(format!("Unsupported join condition {}", expr)),
        }
    }

    /// Returns the only selector of the FROM clause.
    fn only_selector(&self, what: &str) -> Result<String, ArborError> {
        match self.selectors.as_slice() {
            [selector] => Ok(selector.clone()),
            _ => error(format!(
                "{} must name a selector when the query has more than one",
                what
            )),
        }
    }

    fn selector_arg(&self, expr: &Expr) -> Result<SelectorName, ArborError> {
        match expr {
            Expr::Identifier(name) => {
                let name = ident(name);
                if !self.selectors.contains(&name) {
                    return error(format!("Unknown selector {}", name));
                }
                Ok(SelectorName::new(name))
            }
            _ => error(format!("Expected a selector name but found {}", expr)),
        }
    }

    /// Resolves a column reference to its selector and property.
    ///
    /// # Arguments
    ///
    /// * `expr` - `column` or `selector.column`.
    fn column_ref(&self, expr: &Expr) -> Result<(String, String), ArborError> {
        match expr {
            Expr::Identifier(name) => {
                let property = ident(name);
                Ok((self.only_selector(&format!("Column {}", property))?, property))
            }
            Expr::CompoundIdentifier(names) if names.len() == 2 => {
                Ok((ident(&names[0]), ident(&names[1])))
            }
            _ => error(format!("Expected a column but found {}", expr)),
        }
    }

    /// Resolves a selected item. Node functions select the matching pseudo-column.
    fn column(&self, expr: &Expr) -> Result<(String, String), ArborError> {
        let (selector, property) = match self.dynamic_operand(expr)? {
            DynamicOperand::PropertyValue(p) => (p.selector, p.property),
            DynamicOperand::NodeName(s) => (s, NAME_COLUMN.to_string()),
            DynamicOperand::NodeLocalName(s) => (s, LOCAL_NAME_COLUMN.to_string()),
            DynamicOperand::NodePath(s) => (s, PATH_COLUMN.to_string()),
            DynamicOperand::NodeDepth(s) => (s, DEPTH_COLUMN.to_string()),
            DynamicOperand::FullTextSearchScore(s) => (s, SCORE_COLUMN.to_string()),
            _ => return error(format!("Only columns can be selected but found {}", expr)),
        };
        Ok((selector.name().to_string(), property))
    }

    /// Argument of a node function, defaulting to the only selector.
    fn node_function_selector(&self, function: &str, args: &[Expr]) -> Result<SelectorName, ArborError> {
        match args {
            [] => Ok(SelectorName::new(self.only_selector(function)?)),
            [selector] => self.selector_arg(selector),
            _ => error(format!("Wrong number of args in {}", function)),
        }
    }

    /// Converts an expression to a dynamic operand.
    ///
    /// # Arguments
    ///
    /// * `expr` - Expression to be converted.
    fn dynamic_operand(&self, expr: &Expr) -> Result<DynamicOperand, ArborError> {
        match expr {
            Expr::Nested(inner) => self.dynamic_operand(inner),
            Expr::Identifier(_) | Expr::CompoundIdentifier(_) => {
                let (selector, property) = self.column_ref(expr)?;
                Ok(DynamicOperand::property(selector, property))
            }
            Expr::Function(Function { name, args, .. }) => {
                let function = object_name(name)?.to_uppercase();
                match &function[..] {
                    "LENGTH" if args.len() == 1 => {
                        let (selector, property) = self.column_ref(&args[0])?;
                        Ok(DynamicOperand::Length(PropertyValue::new(selector, property)))
                    }
                    "LOWER" if args.len() == 1 => Ok(DynamicOperand::LowerCase(Box::new(
                        self.dynamic_operand(&args[0])?,
                    ))),
                    "UPPER" if args.len() == 1 => Ok(DynamicOperand::UpperCase(Box::new(
                        self.dynamic_operand(&args[0])?,
                    ))),
                    "NAME" => Ok(DynamicOperand::NodeName(
                        self.node_function_selector(&function, args)?,
                    )),
                    "LOCALNAME" => Ok(DynamicOperand::NodeLocalName(
                        self.node_function_selector(&function, args)?,
                    )),
                    "PATH" => Ok(DynamicOperand::NodePath(
                        self.node_function_selector(&function, args)?,
                    )),
                    "DEPTH" => Ok(DynamicOperand::NodeDepth(
                        self.node_function_selector(&function, args)?,
                    )),
                    "SCORE" => Ok(DynamicOperand::FullTextSearchScore(
                        self.node_function_selector(&function, args)?,
                    )),
                    _ => error(format!("Unsupported function {}", expr)),
                }
            }
            _ => error(format!("Unsupported expression {}", expr)),
        }
    }

    /// Converts a literal or bind variable, returning `None` for anything else.
    fn static_operand(&self, expr: &Expr) -> Result<Option<StaticOperand>, ArborError> {
        let value = match expr {
            Expr::Nested(inner) => return self.static_operand(inner),
            Expr::Identifier(name) if name.starts_with('@') => {
                return Ok(Some(StaticOperand::BindVariable(name[1..].to_string())));
            }
            Expr::Value(Value::Number(s)) => number(s)?,
            Expr::Value(Value::SingleQuotedString(s)) => Field::from(s.as_str()),
            Expr::Value(Value::Boolean(b)) => Field::BooleanField(*b),
            Expr::Value(Value::Null) => Field::Null,
            Expr::UnaryOp {
                op: UnaryOperator::Minus,
                expr: inner,
            } => match &**inner {
                Expr::Value(Value::Number(s)) => number(&format!("-{}", s))?,
                _ => return Ok(None),
            },
            _ => return Ok(None),
        };
        Ok(Some(StaticOperand::Literal(value)))
    }

    fn required_static_operand(&self, expr: &Expr) -> Result<StaticOperand, ArborError> {
        match self.static_operand(expr)? {
            Some(operand) => Ok(operand),
            None => error(format!("Expected a literal or bind variable but found {}", expr)),
        }
    }

    /// Builds a comparison. A literal on the left trades sides with the column.
    fn comparison(&self, left: &Expr, operator: Operator, right: &Expr) -> Result<Constraint, ArborError> {
        if let Some(value) = self.static_operand(right)? {
            return Ok(Constraint::comparison(self.dynamic_operand(left)?, operator, value));
        }
        if operator != Operator::Like {
            if let Some(value) = self.static_operand(left)? {
                return Ok(Constraint::comparison(
                    self.dynamic_operand(right)?,
                    operator.reverse(),
                    value,
                ));
            }
        }
        error(format!(
            "Comparisons need a literal or bind variable on one side: {} {} {}",
            left,
            operator.symbol(),
            right
        ))
    }

    fn property_value(&self, expr: &Expr) -> Result<PropertyValue, ArborError> {
        let (selector, property) = self.column_ref(expr)?;
        Ok(PropertyValue::new(selector, property))
    }

    /// Converts a WHERE expression to a constraint.
    ///
    /// # Arguments
    ///
    /// * `expr` - Expression to convert.
    fn constraint(&self, expr: &Expr) -> Result<Constraint, ArborError> {
        match expr {
            Expr::Nested(inner) => self.constraint(inner),
            Expr::UnaryOp {
                op: UnaryOperator::Not,
                expr: inner,
            } => Ok(Constraint::negation(self.constraint(inner)?)),
            Expr::BinaryOp { left, op, right } => {
                let operator = match op {
                    BinaryOperator::And => {
                        return Ok(Constraint::and(self.constraint(left)?, self.constraint(right)?))
                    }
                    BinaryOperator::Or => {
                        return Ok(Constraint::or(self.constraint(left)?, self.constraint(right)?))
                    }
                    BinaryOperator::NotLike => {
                        return Ok(Constraint::negation(self.comparison(
                            left,
                            Operator::Like,
                            right,
                        )?))
                    }
                    BinaryOperator::Like => Operator::Like,
                    BinaryOperator::Eq => Operator::EqualTo,
                    BinaryOperator::NotEq => Operator::NotEqualTo,
                    BinaryOperator::Lt => Operator::LessThan,
                    BinaryOperator::LtEq => Operator::LessThanOrEqualTo,
                    BinaryOperator::Gt => Operator::GreaterThan,
                    BinaryOperator::GtEq => Operator::GreaterThanOrEqualTo,
                    _ => return error(format!("Unsupported operator {}", op)),
                };
                self.comparison(left, operator, right)
            }
            Expr::IsNull(inner) => Ok(Constraint::negation(Constraint::PropertyExistence(
                self.property_value(inner)?,
            ))),
            Expr::IsNotNull(inner) => Ok(Constraint::PropertyExistence(self.property_value(inner)?)),
            Expr::InList {
                expr: operand,
                list,
                negated,
            } => {
                let values = list
                    .iter()
                    .map(|v| self.required_static_operand(v))
                    .collect::<Result<Vec<_>, _>>()?;
                let constraint = Constraint::SetCriteria {
                    operand: self.dynamic_operand(operand)?,
                    values,
                };
                Ok(if *negated {
                    Constraint::negation(constraint)
                } else {
                    constraint
                })
            }
            Expr::Between {
                expr: operand,
                negated,
                low,
                high,
            } => {
                let constraint = Constraint::Between {
                    operand: self.dynamic_operand(operand)?,
                    lower: self.required_static_operand(low)?,
                    upper: self.required_static_operand(high)?,
                    include_lower: true,
                    include_upper: true,
                };
                Ok(if *negated {
                    Constraint::negation(constraint)
                } else {
                    constraint
                })
            }
            Expr::Function(Function { name, args, .. }) => {
                let function = object_name(name)?.to_uppercase();
                match &function[..] {
                    "CONTAINS" if args.len() == 2 => self.full_text_search(&args[0], &args[1]),
                    "ISSAMENODE" | "ISCHILDNODE" | "ISDESCENDANTNODE" => {
                        let (selector, path) = match args.as_slice() {
                            [path] => (SelectorName::new(self.only_selector(&function)?), path),
                            [selector, path] => (self.selector_arg(selector)?, path),
                            _ => return error(format!("Wrong number of args in {}", function)),
                        };
                        let path = string_literal(path)?;
                        Ok(match &function[..] {
                            "ISSAMENODE" => Constraint::SameNode { selector, path },
                            "ISCHILDNODE" => Constraint::ChildNode {
                                selector,
                                parent_path: path,
                            },
                            _ => Constraint::DescendantNode {
                                selector,
                                ancestor_path: path,
                            },
                        })
                    }
                    _ => error(format!("Unsupported constraint {}", expr)),
                }
            }
            _ => error(format!("Unsupported constraint {}", expr)),
        }
    }

    /// `CONTAINS(selector, 'terms')` searches every property of the node,
    /// `CONTAINS(selector.property, 'terms')` searches one property.
    fn full_text_search(&self, target: &Expr, expression: &Expr) -> Result<Constraint, ArborError> {
        let (selector, property) = match target {
            Expr::Identifier(name) if self.selectors.contains(&ident(name)) => (ident(name), None),
            _ => {
                let (selector, property) = self.column_ref(target)?;
                (selector, Some(property))
            }
        };
        let search = FullTextSearch::new(selector, property, string_literal(expression)?)?;
        Ok(Constraint::FullTextSearch(search))
    }
}
