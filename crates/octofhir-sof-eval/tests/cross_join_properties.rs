//! Property tests for row list cross joins
//!
//! Properties:
//! 1. Row count is the product of the input row counts
//! 2. The joined schema is the left schema followed by the right one
//! 3. The empty list absorbs any join
//! 4. Joining is associative

use octofhir_sof_eval::{FlatRow, RowElement, RowList, RowListBuilder, RowValue, cross_join_all};
use octofhir_sof_fhirpath::Node;
use octofhir_sof_view::Column;
use proptest::prelude::*;
use serde_json::Value;

// ============================================================================
// Helpers
// ============================================================================

/// Columns named `{prefix}0..{prefix}{width}`
fn columns(prefix: &str, width: usize) -> Vec<Column> {
    (0..width)
        .map(|i| Column::new(format!("{}{}", prefix, i), "value"))
        .collect()
}

/// `rows` rows over `columns`; every value is distinct within the list
fn row_list(columns: &[Column], rows: usize) -> RowList<'_> {
    let mut builder = RowListBuilder::new();
    for r in 0..rows {
        let elements = columns
            .iter()
            .enumerate()
            .map(|(c, column)| {
                let value = i64::try_from(r * 100 + c).unwrap();
                RowElement::new(column, vec![RowValue::Node(Node::integer(value))])
            })
            .collect();
        builder.add_row(FlatRow::new(elements)).unwrap();
    }
    builder.build()
}

fn records(list: &RowList<'_>) -> Vec<Vec<Value>> {
    list.rows()
        .iter()
        .map(|row| row.elements().iter().map(RowElement::to_json).collect())
        .collect()
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_row_count_is_product(
        left_width in 1usize..4,
        right_width in 1usize..4,
        left_rows in 1usize..6,
        right_rows in 1usize..6,
    ) {
        let left_columns = columns("l", left_width);
        let right_columns = columns("r", right_width);
        let left = row_list(&left_columns, left_rows);
        let right = row_list(&right_columns, right_rows);

        let joined = left.cross_join(&right).unwrap();
        prop_assert_eq!(joined.len(), left_rows * right_rows);
        for row in joined.rows() {
            prop_assert_eq!(row.len(), left_width + right_width);
        }
    }

    #[test]
    fn prop_schema_is_concatenated(
        left_width in 1usize..4,
        right_width in 1usize..4,
        rows in 1usize..4,
    ) {
        let left_columns = columns("l", left_width);
        let right_columns = columns("r", right_width);
        let left = row_list(&left_columns, rows);
        let right = row_list(&right_columns, rows);

        let joined = left.cross_join(&right).unwrap();
        let mut expected = left.column_names();
        expected.extend(right.column_names());
        prop_assert_eq!(joined.column_names(), expected.clone());
        for row in joined.rows() {
            prop_assert_eq!(row.column_names(), expected.clone());
        }
    }

    #[test]
    fn prop_empty_absorbs(width in 1usize..4, rows in 1usize..6) {
        let columns = columns("c", width);
        let list = row_list(&columns, rows);

        prop_assert!(list.cross_join(&RowList::empty()).unwrap().is_empty());
        prop_assert!(RowList::empty().cross_join(&list).unwrap().is_empty());
        prop_assert!(cross_join_all(vec![list.clone(), RowList::empty(), list]).unwrap().is_empty());
    }

    #[test]
    fn prop_join_is_associative(
        a_rows in 1usize..4,
        b_rows in 1usize..4,
        c_rows in 1usize..4,
    ) {
        let a_columns = columns("a", 2);
        let b_columns = columns("b", 1);
        let c_columns = columns("c", 2);
        let a = row_list(&a_columns, a_rows);
        let b = row_list(&b_columns, b_rows);
        let c = row_list(&c_columns, c_rows);

        let left_first = a.cross_join(&b).unwrap().cross_join(&c).unwrap();
        let right_first = a.cross_join(&b.cross_join(&c).unwrap()).unwrap();

        prop_assert_eq!(left_first.column_names(), right_first.column_names());
        prop_assert_eq!(records(&left_first), records(&right_first));
    }
}

#[test]
fn test_cross_join_all_without_inputs_is_empty() {
    assert!(cross_join_all(Vec::new()).unwrap().is_empty());
}

#[test]
fn test_shared_column_name_is_rejected() {
    let left_columns = columns("x", 1);
    let right_columns = columns("x", 1);
    let left = row_list(&left_columns, 1);
    let right = row_list(&right_columns, 1);
    assert!(left.cross_join(&right).is_err());
}
