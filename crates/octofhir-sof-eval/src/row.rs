//! Row model: row lists, flat rows and row elements
//!
//! Values borrow from the resource a view is applied to, and column
//! metadata borrows from the view definition, so rows live no longer than
//! one `apply` call's inputs. Row lists are immutable; they are assembled
//! through [`RowListBuilder`] or produced by [`RowList::cross_join`].

use crate::error::{ViewApplicationError, ViewResult};
use crate::key::ResourceKey;
use indexmap::IndexMap;
use octofhir_sof_fhirpath::Node;
use octofhir_sof_view::{Column, ID_TYPE};
use serde_json::{Map, Value};

/// One value of a column
#[derive(Debug, Clone, PartialEq)]
pub enum RowValue<'a> {
    /// Node matched by a path
    Node(Node<'a>),
    /// Key extracted by `getResourceKey()` or `getReferenceKey()`
    Key(ResourceKey),
}

impl RowValue<'_> {
    /// JSON form of the value; keys are rendered as their id part
    pub fn to_json(&self) -> Value {
        match self {
            RowValue::Node(node) => node.value().clone(),
            RowValue::Key(key) => Value::String(key.id.clone()),
        }
    }

    /// String form of a primitive value
    pub fn as_string(&self) -> Option<String> {
        match self {
            RowValue::Node(node) => match node.value() {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                Value::Bool(b) => Some(b.to_string()),
                _ => None,
            },
            RowValue::Key(key) => Some(key.id.clone()),
        }
    }

    /// Id part of a key, or of an id-typed string value
    pub fn id_part(&self) -> Option<&str> {
        match self {
            RowValue::Key(key) => Some(key.id_part()),
            RowValue::Node(node) => node.as_str(),
        }
    }
}

// ============================================================================
// Row Element
// ============================================================================

/// One column's values in one row
#[derive(Debug, Clone, PartialEq)]
pub struct RowElement<'a> {
    column: &'a Column,
    values: Vec<RowValue<'a>>,
}

impl<'a> RowElement<'a> {
    pub fn new(column: &'a Column, values: Vec<RowValue<'a>>) -> Self {
        Self { column, values }
    }

    /// Element with no value
    pub fn null(column: &'a Column) -> Self {
        Self::new(column, Vec::new())
    }

    pub fn name(&self) -> &'a str {
        &self.column.name
    }

    pub fn column(&self) -> &'a Column {
        self.column
    }

    pub fn values(&self) -> &[RowValue<'a>] {
        &self.values
    }

    pub fn is_null(&self) -> bool {
        self.values.is_empty()
    }

    /// Declared or inferred as a collection, or holding several values
    pub fn is_collection(&self) -> bool {
        self.column.is_collection() || self.values.len() > 1
    }

    /// The value of a non-collection element
    pub fn single_value(&self) -> Option<&RowValue<'a>> {
        if self.is_collection() {
            return None;
        }
        self.values.first()
    }

    /// String form of the single value
    pub fn as_string(&self) -> Option<String> {
        self.single_value().and_then(RowValue::as_string)
    }

    /// Whether the column holds resource ids, by inference or declaration
    pub fn is_id_type(&self) -> bool {
        self.column.inferred_type == Some(ID_TYPE)
            || self.column.declared_type.as_deref() == Some(ID_TYPE)
    }

    /// Whether the values are keys extracted by a key path
    fn holds_keys(&self) -> bool {
        self.column.inferred_type == Some(ID_TYPE)
    }

    /// Id of a single-valued key column
    pub fn single_id_part(&self) -> Option<&str> {
        if !self.holds_keys() {
            return None;
        }
        self.single_value().and_then(RowValue::id_part)
    }

    /// Ids of a key column, in value order
    pub fn id_parts(&self) -> Vec<&str> {
        if !self.holds_keys() {
            return Vec::new();
        }
        self.values.iter().filter_map(RowValue::id_part).collect()
    }

    /// JSON form: `null`, the single value, or an array for collections
    pub fn to_json(&self) -> Value {
        if self.is_collection() {
            return Value::Array(self.values.iter().map(RowValue::to_json).collect());
        }
        self.values.first().map_or(Value::Null, RowValue::to_json)
    }
}

// ============================================================================
// Flat Row
// ============================================================================

/// One output row: an element per schema column, in schema order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatRow<'a> {
    elements: Vec<RowElement<'a>>,
}

impl<'a> FlatRow<'a> {
    pub fn new(elements: Vec<RowElement<'a>>) -> Self {
        Self { elements }
    }

    pub fn elements(&self) -> &[RowElement<'a>] {
        &self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Element of the named column
    pub fn get(&self, name: &str) -> Option<&RowElement<'a>> {
        self.elements.iter().find(|e| e.name() == name)
    }

    pub fn column_names(&self) -> Vec<&'a str> {
        self.elements.iter().map(RowElement::name).collect()
    }

    /// This row's columns followed by `other`'s
    pub fn concat(&self, other: &FlatRow<'a>) -> FlatRow<'a> {
        let mut elements = Vec::with_capacity(self.len() + other.len());
        elements.extend(self.elements.iter().cloned());
        elements.extend(other.elements.iter().cloned());
        FlatRow { elements }
    }

    /// JSON object keyed by column name, in column order
    pub fn to_json(&self) -> Map<String, Value> {
        self.elements
            .iter()
            .map(|e| (e.name().to_string(), e.to_json()))
            .collect()
    }
}

// ============================================================================
// Row List
// ============================================================================

/// Rows sharing one schema
///
/// A row list with an empty schema is the empty sentinel and has no rows.
/// Every row holds exactly the schema's columns, in schema order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowList<'a> {
    rows: Vec<FlatRow<'a>>,
    schema: IndexMap<&'a str, &'a Column>,
}

impl<'a> RowList<'a> {
    /// The empty row list
    pub fn empty() -> Self {
        Self::default()
    }

    /// Row list holding a single row
    pub fn from_row(row: FlatRow<'a>) -> ViewResult<Self> {
        let mut builder = RowListBuilder::new();
        builder.add_row(row)?;
        Ok(builder.build())
    }

    pub fn is_empty(&self) -> bool {
        self.schema.is_empty()
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn rows(&self) -> &[FlatRow<'a>] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<FlatRow<'a>> {
        self.rows
    }

    /// Column name to column metadata, in output order
    pub fn schema(&self) -> &IndexMap<&'a str, &'a Column> {
        &self.schema
    }

    pub fn column_names(&self) -> Vec<&'a str> {
        self.schema.keys().copied().collect()
    }

    /// Cartesian product of the rows, columns of `self` first
    ///
    /// Either side being empty yields the empty list. A column name present
    /// on both sides is an error.
    pub fn cross_join(&self, other: &RowList<'a>) -> ViewResult<RowList<'a>> {
        if self.is_empty() || other.is_empty() {
            return Ok(RowList::empty());
        }

        let mut schema = self.schema.clone();
        for (name, column) in &other.schema {
            if schema.insert(*name, *column).is_some() {
                return Err(ViewApplicationError::DuplicateColumn {
                    name: name.to_string(),
                });
            }
        }

        let mut rows = Vec::with_capacity(self.rows.len() * other.rows.len());
        for left in &self.rows {
            for right in &other.rows {
                rows.push(left.concat(right));
            }
        }

        Ok(RowList { rows, schema })
    }

    /// One JSON object per row, keyed in schema order
    pub fn to_records(&self) -> Vec<Map<String, Value>> {
        self.rows.iter().map(FlatRow::to_json).collect()
    }
}

/// Cross join row lists left to right
///
/// Any empty input, or no input at all, gives the empty list.
pub fn cross_join_all<'a>(lists: Vec<RowList<'a>>) -> ViewResult<RowList<'a>> {
    if lists.is_empty() || lists.iter().any(RowList::is_empty) {
        return Ok(RowList::empty());
    }

    let mut lists = lists.into_iter();
    let mut result = match lists.next() {
        Some(first) => first,
        None => return Ok(RowList::empty()),
    };
    for list in lists {
        result = result.cross_join(&list)?;
    }
    Ok(result)
}

// ============================================================================
// Builder
// ============================================================================

/// Accumulates rows under one schema
///
/// The first row fixes the schema; later rows must carry the same column
/// names in the same order.
#[derive(Debug, Default)]
pub struct RowListBuilder<'a> {
    rows: Vec<FlatRow<'a>>,
    schema: IndexMap<&'a str, &'a Column>,
}

impl<'a> RowListBuilder<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a row, fixing the schema on the first one
    ///
    /// Rows without columns carry no data and are skipped.
    pub fn add_row(&mut self, row: FlatRow<'a>) -> ViewResult<()> {
        if row.is_empty() {
            return Ok(());
        }

        if self.schema.is_empty() {
            for element in row.elements() {
                if self.schema.insert(element.name(), element.column()).is_some() {
                    self.schema.clear();
                    return Err(ViewApplicationError::DuplicateColumn {
                        name: element.name().to_string(),
                    });
                }
            }
        } else if !self.matches_schema(&row) {
            return Err(ViewApplicationError::SchemaMismatch {
                expected: self.schema.keys().map(|k| k.to_string()).collect(),
                found: row.column_names().iter().map(|k| k.to_string()).collect(),
            });
        }

        self.rows.push(row);
        Ok(())
    }

    /// Append every row of a row list
    pub fn add_rows(&mut self, rows: RowList<'a>) -> ViewResult<()> {
        for row in rows.into_rows() {
            self.add_row(row)?;
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Finish the row list
    pub fn build(self) -> RowList<'a> {
        RowList {
            rows: self.rows,
            schema: self.schema,
        }
    }

    fn matches_schema(&self, row: &FlatRow<'a>) -> bool {
        row.len() == self.schema.len()
            && row
                .elements()
                .iter()
                .zip(self.schema.keys())
                .all(|(element, name)| element.name() == *name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_null_element() {
        let column = Column::new("family", "name.family");
        let element = RowElement::null(&column);
        assert!(element.is_null());
        assert!(!element.is_collection());
        assert_eq!(element.to_json(), Value::Null);
        assert_eq!(element.as_string(), None);
    }

    #[test]
    fn test_several_values_make_a_collection() {
        let doc = json!(["Ann", "Lee"]);
        let column = Column::new("given", "given");
        let values = doc
            .as_array()
            .unwrap()
            .iter()
            .map(|v| RowValue::Node(Node::borrowed(v)))
            .collect();
        let element = RowElement::new(&column, values);
        assert!(element.is_collection());
        assert_eq!(element.single_value(), None);
        assert_eq!(element.to_json(), json!(["Ann", "Lee"]));
    }

    #[test]
    fn test_id_parts() {
        let column = Column::new("patient", "subject.getReferenceKey()");
        let key = ResourceKey::parse("Patient/p1").unwrap();
        let element = RowElement::new(&column, vec![RowValue::Key(key)]);
        assert!(element.is_id_type());
        assert_eq!(element.single_id_part(), Some("p1"));
        assert_eq!(element.id_parts(), vec!["p1"]);
        assert_eq!(element.to_json(), json!("p1"));
    }

    #[test]
    fn test_declared_type_keeps_key_ids() {
        let column = Column::new("patient", "subject.getReferenceKey()").with_type("string");
        let key = ResourceKey::parse("Patient/p1").unwrap();
        let element = RowElement::new(&column, vec![RowValue::Key(key)]);
        assert!(element.is_id_type());
        assert_eq!(element.single_id_part(), Some("p1"));
        assert_eq!(element.id_parts(), vec!["p1"]);
    }

    #[test]
    fn test_declared_id_column_without_key_path() {
        let doc = json!("p1");
        let column = Column::new("ref", "id").with_type("id");
        let element = RowElement::new(&column, vec![RowValue::Node(Node::borrowed(&doc))]);
        assert!(element.is_id_type());
        assert_eq!(element.single_id_part(), None);
        assert!(element.id_parts().is_empty());
    }

    #[test]
    fn test_builder_rejects_different_schema() {
        let a = Column::new("a", "a");
        let b = Column::new("b", "b");
        let mut builder = RowListBuilder::new();
        builder.add_row(FlatRow::new(vec![RowElement::null(&a)])).unwrap();
        let err = builder
            .add_row(FlatRow::new(vec![RowElement::null(&b)]))
            .unwrap_err();
        assert!(matches!(err, ViewApplicationError::SchemaMismatch { .. }));
    }

    #[test]
    fn test_builder_without_rows_is_empty() {
        let list = RowListBuilder::new().build();
        assert!(list.is_empty());
        assert_eq!(list.len(), 0);
    }
}
