//! Helpers shared by the rules for reading and rewriting the references held by plan nodes.

use common::logical_plan::{NodeIndex, NodeType, PlanNode, PlanTree, PlanValue, Property};
use common::{rename_selector, ColumnReferences, SelectorName, ALL_COLUMNS};
use std::collections::HashMap;

/// Rewrites every selector and column reference held by one node through `mapper`.
///
/// Covers the criteria of SELECT nodes, the columns of PROJECT nodes, the conditions of
/// JOIN nodes and the orderings of SORT nodes.
pub fn rewrite_node<F>(plan: &mut PlanTree, index: NodeIndex, mapper: &F)
where
    F: Fn(&SelectorName, Option<&str>) -> Option<(SelectorName, Option<String>)>,
{
    let node = plan.node_mut(index);
    let rewritten = match node.node_type() {
        NodeType::Select => node
            .criteria()
            .map(|c| (Property::SelectCriteria, PlanValue::Constraint(c.rewrite_references(mapper)))),
        NodeType::Project => node.project_columns().map(|columns| {
            let columns = columns.iter().map(|c| c.rewrite_references(mapper)).collect();
            (Property::ProjectColumns, PlanValue::Columns(columns))
        }),
        NodeType::Join => node.join_condition().map(|c| {
            (
                Property::JoinCondition,
                PlanValue::JoinCondition(c.rewrite_references(mapper)),
            )
        }),
        NodeType::Sort => node.sort_orderings().map(|orderings| {
            let orderings = orderings
                .iter()
                .map(|o| o.rewrite_references(mapper))
                .collect();
            (Property::SortOrderBy, PlanValue::Orderings(orderings))
        }),
        _ => None,
    };
    if let Some((property, value)) = rewritten {
        node.set(property, value);
    }
}

/// Rewrites the references of every proper ancestor of `index` up to the root.
pub fn rewrite_ancestors<F>(plan: &mut PlanTree, index: NodeIndex, mapper: &F)
where
    F: Fn(&SelectorName, Option<&str>) -> Option<(SelectorName, Option<String>)>,
{
    let ancestors: Vec<NodeIndex> = plan.ancestors(index).collect();
    for ancestor in ancestors {
        rewrite_node(plan, ancestor, mapper);
    }
}

/// Renames selector `old` to `new` everywhere at or below `index`.
///
/// SOURCE nodes read as `old` get `new` as their alias.
pub fn rename_selector_in_subtree(
    plan: &mut PlanTree,
    index: NodeIndex,
    old: &SelectorName,
    new: &SelectorName,
) {
    if old == new {
        return;
    }
    let mapper = rename_selector(old, new);
    for node in plan.find_all_at_or_below(index, None) {
        rewrite_node(plan, node, &mapper);
        let source = plan.node_mut(node);
        if source.is(NodeType::Source) && source.selector_name() == Some(old) {
            if source.source_name() == Some(new) {
                source.remove(Property::SourceAlias);
            } else {
                source.set(Property::SourceAlias, PlanValue::Selector(new.clone()));
            }
        }
    }
    plan.recompute_selectors(index);
}

/// Returns the columns referenced by the properties of one node.
pub fn referenced_columns(node: &PlanNode) -> ColumnReferences {
    let mut columns = ColumnReferences::new();
    if let Some(criteria) = node.criteria() {
        columns.extend(criteria.referenced_columns());
    }
    if let Some(projected) = node.project_columns() {
        columns.extend(
            projected
                .iter()
                .map(|c| (c.selector.clone(), c.property.clone())),
        );
    }
    if let Some(condition) = node.join_condition() {
        columns.extend(condition.referenced_columns());
    }
    if let Some(orderings) = node.sort_orderings() {
        for ordering in orderings {
            columns.extend(ordering.operand.referenced_columns());
        }
    }
    columns
}

/// Returns the columns of `selector` referenced by any node that is not at or below `index`.
///
/// The result contains [`ALL_COLUMNS`] if some node needs every column of the selector.
pub fn columns_required_outside(
    plan: &PlanTree,
    index: NodeIndex,
    selector: &SelectorName,
) -> Vec<String> {
    let root = match plan.root() {
        Some(root) => root,
        None => return Vec::new(),
    };
    let inside = plan.find_all_at_or_below(index, None);
    let mut required: Vec<String> = Vec::new();
    for node in plan.find_all_at_or_below(root, None) {
        if inside.contains(&node) {
            continue;
        }
        for (s, property) in referenced_columns(plan.node(node)) {
            if s == *selector && !required.contains(&property) {
                required.push(property);
            }
        }
    }
    required
}

/// True if `columns` includes the marker for every column.
pub fn requires_all_columns(columns: &[String]) -> bool {
    columns.iter().any(|c| c == ALL_COLUMNS)
}

/// Maps the columns of an inlined view onto the columns of the plan that replaced it.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMapping {
    view: SelectorName,
    mappings: HashMap<String, (SelectorName, String)>,
    /// Selector that references naming only the view (and pseudo-columns) are moved to.
    default_selector: Option<SelectorName>,
}

impl ColumnMapping {
    /// Creates an empty mapping for references to `view`.
    pub fn new(view: SelectorName) -> Self {
        Self {
            view,
            mappings: HashMap::new(),
            default_selector: None,
        }
    }

    pub fn view(&self) -> &SelectorName {
        &self.view
    }

    /// Records that column `view_column` of the view reads `selector.property`.
    pub fn map(&mut self, view_column: impl Into<String>, selector: SelectorName, property: impl Into<String>) {
        self.mappings
            .insert(view_column.into(), (selector, property.into()));
    }

    pub fn set_default_selector(&mut self, selector: SelectorName) {
        self.default_selector = Some(selector);
    }

    /// Returns the column a view column reads, if mapped.
    pub fn mapped(&self, view_column: &str) -> Option<&(SelectorName, String)> {
        self.mappings.get(view_column)
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    /// Maps a reference in the shape expected by `rewrite_references`.
    pub fn map_reference(
        &self,
        selector: &SelectorName,
        property: Option<&str>,
    ) -> Option<(SelectorName, Option<String>)> {
        if *selector != self.view {
            return None;
        }
        if let Some((s, p)) = property.and_then(|p| self.mappings.get(p)) {
            return Some((s.clone(), Some(p.clone())));
        }
        self.default_selector.clone().map(|s| (s, None))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use common::{Column, Constraint, DynamicOperand, Operator};

    #[test]
    fn test_column_mapping() {
        let mut mapping = ColumnMapping::new("v".into());
        mapping.map("carModel", "cars".into(), "model");
        mapping.set_default_selector("cars".into());
        assert_eq!(
            mapping.map_reference(&"v".into(), Some("carModel")),
            Some(("cars".into(), Some("model".to_string())))
        );
        assert_eq!(
            mapping.map_reference(&"v".into(), Some("jcr:path")),
            Some(("cars".into(), None))
        );
        assert_eq!(mapping.map_reference(&"other".into(), Some("carModel")), None);
    }

    #[test]
    fn test_rewrite_ancestors() {
        let mut plan = PlanTree::new();
        let project = plan.add_node(NodeType::Project);
        let select = plan.add_node(NodeType::Select);
        let source = plan.add_node(NodeType::Source);
        plan.add_last_child(project, select);
        plan.add_last_child(select, source);
        plan.node_mut(project).set(
            Property::ProjectColumns,
            PlanValue::Columns(vec![Column::new("v", "carModel")]),
        );
        plan.node_mut(select).set(
            Property::SelectCriteria,
            PlanValue::Constraint(Constraint::comparison(
                DynamicOperand::property("v", "carModel"),
                Operator::EqualTo,
                "Civic",
            )),
        );
        let mut mapping = ColumnMapping::new("v".into());
        mapping.map("carModel", "cars".into(), "model");
        rewrite_ancestors(&mut plan, source, &|s: &SelectorName, p: Option<&str>| {
            mapping.map_reference(s, p)
        });
        assert_eq!(
            plan.node(project).project_columns().unwrap(),
            &vec![Column::with_alias("cars", "model", "carModel")]
        );
        assert_eq!(
            plan.node(select).criteria().unwrap().to_string(),
            "cars.model = 'Civic'"
        );
    }

    #[test]
    fn test_columns_required_outside() {
        let mut plan = PlanTree::new();
        let project = plan.add_node(NodeType::Project);
        let access = plan.add_node(NodeType::Access);
        let source = plan.add_node(NodeType::Source);
        plan.add_last_child(project, access);
        plan.add_last_child(access, source);
        plan.node_mut(project).set(
            Property::ProjectColumns,
            PlanValue::Columns(vec![Column::new("c", "maker"), Column::new("d", "name")]),
        );
        assert_eq!(
            columns_required_outside(&plan, access, &"c".into()),
            vec!["maker".to_string()]
        );
        assert!(!requires_all_columns(&columns_required_outside(
            &plan,
            access,
            &"c".into()
        )));
    }
}
