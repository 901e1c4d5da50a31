//! Applying a view definition to one resource
//!
//! The applicator walks the select tree against the resource. Columns of a
//! select produce one row per iterated element, nested selects are
//! cross-joined with those columns, and `unionAll` branches are
//! concatenated. An empty match anywhere a row needs data voids the rows
//! built from it, except under `forEachOrNull`, which keeps one row of nulls.
//!
//! A null element (`None` below) stands for the missing match that
//! `forEachOrNull` propagates: columns evaluated against it are null and
//! iterations under it match nothing. If that leaves a `forEachOrNull`
//! without a row, the null row is built from the select's full column list.

use crate::error::{ViewApplicationError, ViewResult};
use crate::key::ResourceKey;
use crate::row::{FlatRow, RowElement, RowList, RowListBuilder, RowValue, cross_join_all};
use log::{debug, error, trace};
use octofhir_sof_fhirpath::{FhirPathEngine, Node, PathEvaluator};
use octofhir_sof_view::{Column, ColumnPath, Iteration, Select, ViewDefinition};
use serde_json::Value;
use std::sync::Arc;

/// Applies one view definition to resources
///
/// The applicator holds no per-resource state, so one instance can serve
/// many resources, from many threads.
pub struct ViewApplicator {
    view: ViewDefinition,
    evaluator: Arc<dyn PathEvaluator>,
}

impl ViewApplicator {
    /// Create an applicator using the built-in engine for the view's FHIR release
    pub fn new(view: ViewDefinition) -> Self {
        let evaluator = Arc::new(FhirPathEngine::new(view.fhir_version));
        Self { view, evaluator }
    }

    /// Create an applicator with a custom path evaluator
    pub fn with_evaluator(view: ViewDefinition, evaluator: Arc<dyn PathEvaluator>) -> Self {
        Self { view, evaluator }
    }

    /// Load a view definition from JSON and create its applicator
    pub fn from_json(json: &str) -> ViewResult<Self> {
        Ok(Self::new(ViewDefinition::from_json(json)?))
    }

    pub fn view(&self) -> &ViewDefinition {
        &self.view
    }

    /// Apply the view to one resource
    ///
    /// Returns the empty row list when a `where` filter is false or a
    /// required match is missing.
    pub fn apply<'a>(&'a self, resource: &'a Value) -> ViewResult<RowList<'a>> {
        // Step 1: The resource must be of the view's type
        let found = resource
            .get("resourceType")
            .and_then(Value::as_str)
            .unwrap_or_default();
        if found != self.view.resource {
            return Err(ViewApplicationError::TypeMismatch {
                expected: self.view.resource.clone(),
                found: found.to_string(),
            });
        }

        let scope = Scope {
            evaluator: self.evaluator.as_ref(),
            root: resource,
        };
        let root = Node::borrowed(resource);

        // Step 2: All where filters must hold
        for filter in &self.view.where_clauses {
            if !scope.check_where(&root, &filter.path)? {
                debug!(
                    "{} excluded by where clause '{}'",
                    describe(resource),
                    filter.path
                );
                return Ok(RowList::empty());
            }
        }

        // Step 3: Cross join the top-level selects
        let rows = scope.apply_all_selects(Some(&root), &self.view.select)?;
        debug!("{} produced {} row(s)", describe(resource), rows.len());
        Ok(rows)
    }
}

/// Evaluation state of one `apply` call
struct Scope<'a> {
    evaluator: &'a dyn PathEvaluator,
    root: &'a Value,
}

impl<'a> Scope<'a> {
    fn evaluate(&self, node: &Node<'a>, path: &str) -> ViewResult<Vec<Node<'a>>> {
        self.evaluator.evaluate(node, path).map_err(|e| {
            error!("Error evaluating FHIRPath '{}': {}", path, e);
            ViewApplicationError::path_evaluation(path, e)
        })
    }

    fn check_where(&self, root: &Node<'a>, path: &str) -> ViewResult<bool> {
        let result = self.evaluate(root, path)?;
        match result.as_slice() {
            [node] => node.as_bool().ok_or_else(|| {
                ViewApplicationError::where_clause(
                    path,
                    format!("expected a boolean, found {}", node.fhir_type()),
                )
            }),
            _ => Err(ViewApplicationError::where_clause(
                path,
                format!("expected a single boolean, found {} items", result.len()),
            )),
        }
    }

    /// Cross join of every select applied to `element`
    fn apply_all_selects(
        &self,
        element: Option<&Node<'a>>,
        selects: &'a [Select],
    ) -> ViewResult<RowList<'a>> {
        let results = selects
            .iter()
            .map(|select| self.apply_select(element, select))
            .collect::<ViewResult<Vec<_>>>()?;
        cross_join_all(results)
    }

    /// Rows of one select, iterating its `forEach`/`forEachOrNull` if any
    fn apply_select(&self, element: Option<&Node<'a>>, select: &'a Select) -> ViewResult<RowList<'a>> {
        let targets: Vec<Option<Node<'a>>> = match (&select.iteration, element) {
            (None, element) => vec![element.cloned()],
            (Some(iteration), Some(node)) => self
                .evaluate(node, iteration.path())?
                .into_iter()
                .map(Some)
                .collect(),
            (Some(_), None) => Vec::new(),
        };

        let mut builder = RowListBuilder::new();
        for target in &targets {
            builder.add_rows(self.apply_column_select_union(target.as_ref(), select)?)?;
        }

        if builder.is_empty() && select.iteration.as_ref().is_some_and(Iteration::is_or_null) {
            trace!("No match for forEachOrNull, adding a null row");
            let rows = self.apply_column_select_union(None, select)?;
            if rows.is_empty() {
                // A plain forEach below matched nothing; keep the row anyway
                builder.add_row(null_row(select))?;
            } else {
                builder.add_rows(rows)?;
            }
        }
        Ok(builder.build())
    }

    /// Columns, nested selects and `unionAll` of a select for one element
    fn apply_column_select_union(
        &self,
        element: Option<&Node<'a>>,
        select: &'a Select,
    ) -> ViewResult<RowList<'a>> {
        let mut parts = Vec::with_capacity(3);

        if !select.columns.is_empty() {
            let row = self.apply_columns(element, &select.columns)?;
            parts.push(RowList::from_row(row)?);
        }

        if !select.select.is_empty() {
            let nested = self.apply_all_selects(element, &select.select)?;
            if nested.is_empty() {
                trace!("Nested select matched nothing");
                return Ok(RowList::empty());
            }
            parts.push(nested);
        }

        if let Some(first) = select.union_all.first() {
            let union = match element {
                // Branches share one schema, so a null row needs only the first
                None => self.apply_select(None, first)?,
                Some(node) => {
                    let mut builder = RowListBuilder::new();
                    for branch in &select.union_all {
                        builder.add_rows(self.apply_select(Some(node), branch)?)?;
                    }
                    builder.build()
                }
            };
            if union.is_empty() {
                trace!("unionAll matched nothing");
                return Ok(RowList::empty());
            }
            parts.push(union);
        }

        cross_join_all(parts)
    }

    /// One row with a value per column
    fn apply_columns(&self, element: Option<&Node<'a>>, columns: &'a [Column]) -> ViewResult<FlatRow<'a>> {
        let mut elements = Vec::with_capacity(columns.len());
        for column in columns {
            let values = match (&column.kind, element) {
                (ColumnPath::ResourceKey, element) => self.resource_key(element, column)?,
                (ColumnPath::ReferenceKey { .. }, None) | (ColumnPath::Plain(_), None) => Vec::new(),
                (
                    ColumnPath::ReferenceKey {
                        prefix,
                        resource_type,
                    },
                    Some(node),
                ) => self.reference_keys(node, column, prefix.as_deref(), resource_type.as_deref())?,
                (ColumnPath::Plain(path), Some(node)) => self
                    .evaluate(node, path)?
                    .into_iter()
                    .map(RowValue::Node)
                    .collect(),
            };
            elements.push(RowElement::new(column, values));
        }
        Ok(FlatRow::new(elements))
    }

    /// `getResourceKey()`: the id of the resource the view is applied to
    fn resource_key(&self, element: Option<&Node<'a>>, column: &Column) -> ViewResult<Vec<RowValue<'a>>> {
        match element {
            Some(node) if node.is_same(self.root) => Ok(ResourceKey::from_resource(self.root)
                .map(RowValue::Key)
                .into_iter()
                .collect()),
            _ => Err(ViewApplicationError::special_path(
                &column.path,
                "getResourceKey() can only be applied at the root",
            )),
        }
    }

    /// `[prefix.]getReferenceKey([type])`: target ids of references
    fn reference_keys(
        &self,
        node: &Node<'a>,
        column: &Column,
        prefix: Option<&str>,
        resource_type: Option<&str>,
    ) -> ViewResult<Vec<RowValue<'a>>> {
        let references = match prefix {
            Some(path) => self.evaluate(node, path)?,
            None => vec![node.clone()],
        };

        let mut keys = Vec::new();
        for reference in &references {
            if reference.is_bare_element() {
                trace!("Reference without content in '{}'", column.path);
                continue;
            }
            if !reference.is_reference() {
                return Err(ViewApplicationError::special_path(
                    &column.path,
                    format!(
                        "getReferenceKey() can only be applied to Reference elements, found {}",
                        reference.fhir_type()
                    ),
                ));
            }
            let Some(key) = ResourceKey::from_reference(reference.value()) else {
                continue;
            };
            if resource_type.is_none_or(|t| key.is_type(t)) {
                keys.push(RowValue::Key(key));
            }
        }
        Ok(keys)
    }
}

/// One row of nulls over every column `select` outputs
fn null_row(select: &Select) -> FlatRow<'_> {
    fn gather<'a>(select: &'a Select, elements: &mut Vec<RowElement<'a>>) {
        elements.extend(select.columns.iter().map(RowElement::null));
        for nested in &select.select {
            gather(nested, elements);
        }
        if let Some(first) = select.union_all.first() {
            gather(first, elements);
        }
    }

    let mut elements = Vec::new();
    gather(select, &mut elements);
    FlatRow::new(elements)
}

fn describe(resource: &Value) -> String {
    match ResourceKey::from_resource(resource) {
        Some(key) => key.to_string(),
        None => "resource without id".to_string(),
    }
}
