//! # Response Aggregation
//!
//! Merges the QUERY replies of several storage nodes into one
//! [`ResultTable`].
//!
//! Each reply carries a `Column Name` field listing the column identifiers
//! separated by spaces, plus one field per row (`Row 7`) whose value lists
//! the cells in column order. Rows from all replies are concatenated and
//! sorted by their numeric row index. Rows sharing an index on different
//! nodes are both kept.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::error::AggregateError;
use crate::model::{Column, ResultTable, Row};

/// Reply field declaring the column order.
pub const COLUMN_FIELD: &str = "Column Name";

/// Builds one table from the result fields of every reply.
///
/// The first reply that declares columns fixes the column order; later
/// declarations are ignored. Cells beyond the declared columns are dropped.
pub fn aggregate<'a, I>(replies: I) -> Result<ResultTable, AggregateError>
where
    I: IntoIterator<Item = &'a Map<String, Value>>,
    I::IntoIter: Clone,
{
    let replies = replies.into_iter();

    let mut columns: Vec<Column> = Vec::new();
    for fields in replies.clone() {
        if let Some(value) = fields.get(COLUMN_FIELD) {
            let names = value
                .as_str()
                .ok_or_else(|| AggregateError::NonStringField(COLUMN_FIELD.to_string()))?;
            columns = names.split_whitespace().map(Column::from_name).collect();
            break;
        }
    }

    let mut rows = Vec::new();
    for fields in replies {
        for (key, value) in fields {
            if key == COLUMN_FIELD {
                continue;
            }
            let row_key = row_index(key)?;
            let cells = value
                .as_str()
                .ok_or_else(|| AggregateError::NonStringField(key.clone()))?;
            let fields: BTreeMap<String, String> = columns
                .iter()
                .zip(cells.split(' '))
                .map(|(column, cell)| (column.key.clone(), cell.to_string()))
                .collect();
            rows.push(Row {
                key: row_key,
                fields,
            });
        }
    }

    rows.sort_by_key(|row| row.key);
    Ok(ResultTable { columns, rows })
}

/// First run of ASCII digits in a row field name.
fn row_index(key: &str) -> Result<u64, AggregateError> {
    let digits: String = key
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits
        .parse()
        .map_err(|_| AggregateError::MissingRowIndex(key.to_string()))
}
