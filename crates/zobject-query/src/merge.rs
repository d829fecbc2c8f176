//! Reassembly of rows produced by split queries.

use std::collections::HashMap;

use zobject_core::{Row, Value};

/// Merge rows that share an id into one row per id.
///
/// Rows are grouped by their `id` column; rows without one share a single
/// group. Within a group the first non-null value of each column wins and
/// later values are discarded. Columns keep first-seen order and groups come
/// out in the order their id was first seen.
pub fn combine_results(rows: Vec<Row>) -> Vec<Row> {
    let input = rows.len();
    let mut index: HashMap<Option<String>, usize> = HashMap::new();
    let mut groups: Vec<Vec<(String, Value)>> = Vec::new();

    for row in rows {
        let key = row.id().map(Value::to_literal);
        let slot = *index.entry(key).or_insert_with(|| {
            groups.push(Vec::with_capacity(row.len()));
            groups.len() - 1
        });
        merge_into(&mut groups[slot], &row);
    }

    tracing::debug!(rows = input, merged = groups.len(), "Combined split query results");
    groups.into_iter().map(Row::from_pairs).collect()
}

fn merge_into(merged: &mut Vec<(String, Value)>, row: &Row) {
    for (name, value) in row.iter() {
        match merged.iter_mut().find(|(existing, _)| existing == name) {
            Some((_, current)) => {
                if current.is_null() && !value.is_null() {
                    *current = value.clone();
                }
            }
            None => merged.push((name.to_string(), value.clone())),
        }
    }
}
