// SPDX-License-Identifier: Apache-2.0

#![warn(missing_docs)]

//! Tabular content dug out of arbitrary JSON trees.
//!

use crate::{MyError, table::value_text};
use serde_json::Value;
use std::collections::VecDeque;

/// Extract the 2-D cell array from a JSON value.
///
/// Three shapes are recognized, in order: an explicit
/// `{data:{columns,rows}}` envelope, an array (of objects, keyed by the
/// leaf paths of its first element, or of arrays, taken as rows), and
/// otherwise a breadth-first descent to the first array found anywhere in
/// the tree.
pub(crate) fn rows_from_value(value: &Value) -> Result<Vec<Vec<String>>, MyError> {
    if let Some(data) = value.get("data")
        && let (Some(columns), Some(rows)) = (
            data.get("columns").and_then(Value::as_array),
            data.get("rows").and_then(Value::as_array),
        )
    {
        let mut out = Vec::with_capacity(rows.len() + 1);
        out.push(columns.iter().map(value_text).collect());
        for r in rows {
            let cells = r
                .as_array()
                .map(|x| x.iter().map(value_text).collect())
                .unwrap_or_default();
            out.push(cells);
        }
        return Ok(out);
    }

    if let Some(arr) = value.as_array() {
        return rows_from_array(arr);
    }

    // no envelope and not an array: take the first array in the tree.
    let mut queue: VecDeque<&Value> = VecDeque::new();
    queue.push_back(value);
    while let Some(v) = queue.pop_front() {
        match v {
            Value::Array(arr) => return rows_from_array(arr),
            Value::Object(obj) => queue.extend(obj.values()),
            _ => {}
        }
    }
    Err(MyError::Format("JSON holds no tabular content".into()))
}

fn rows_from_array(arr: &[Value]) -> Result<Vec<Vec<String>>, MyError> {
    let Some(first) = arr.first() else {
        return Ok(Vec::new());
    };
    match first {
        Value::Object(_) => {
            // the first element is the schema template: its leaf paths
            // become the header, and every element is walked along them.
            let paths = leaf_paths(first);
            let mut out = Vec::with_capacity(arr.len() + 1);
            out.push(paths.iter().map(|p| p.join(".")).collect::<Vec<String>>());
            for item in arr {
                out.push(
                    paths
                        .iter()
                        .map(|p| leaf_text(item, p))
                        .collect::<Vec<String>>(),
                );
            }
            Ok(out)
        }
        Value::Array(_) => Ok(arr
            .iter()
            .filter_map(Value::as_array)
            .map(|r| r.iter().map(value_text).collect())
            .collect()),
        _ => Err(MyError::Format("JSON array is not tabular".into())),
    }
}

// depth-first leaf paths of the template element: object keys and array
// indices, in order.
fn leaf_paths(value: &Value) -> Vec<Vec<String>> {
    let mut out = Vec::new();
    let mut prefix = Vec::new();
    collect_paths(value, &mut prefix, &mut out);
    out
}

fn collect_paths(value: &Value, prefix: &mut Vec<String>, out: &mut Vec<Vec<String>>) {
    match value {
        Value::Object(obj) => {
            for (k, v) in obj {
                prefix.push(k.clone());
                collect_paths(v, prefix, out);
                prefix.pop();
            }
        }
        Value::Array(arr) => {
            for (i, v) in arr.iter().enumerate() {
                prefix.push(i.to_string());
                collect_paths(v, prefix, out);
                prefix.pop();
            }
        }
        _ => out.push(prefix.clone()),
    }
}

// resolve one leaf path; null and absent both materialize as the literal
// string "null".
fn leaf_text(value: &Value, path: &[String]) -> String {
    let mut cur = value;
    for seg in path {
        let next = match cur {
            Value::Object(obj) => obj.get(seg),
            Value::Array(arr) => seg.parse::<usize>().ok().and_then(|i| arr.get(i)),
            _ => None,
        };
        match next {
            Some(x) => cur = x,
            None => return "null".to_owned(),
        }
    }
    value_text(cur)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_columns_rows() {
        let v = json!({"data": {"columns": ["a", "b"], "rows": [["1", "2"], ["3", "4"]]}});
        let got = rows_from_value(&v).unwrap();
        assert_eq!(got[0], vec!["a", "b"]);
        assert_eq!(got.len(), 3);
    }

    #[test]
    fn test_array_of_objects_uses_leaf_paths() {
        let v = json!([
            {"name": "x", "pos": {"lat": 1.5, "lon": 2.5}},
            {"name": "y", "pos": {"lat": 3.0}},
        ]);
        let got = rows_from_value(&v).unwrap();
        assert_eq!(got[0], vec!["name", "pos.lat", "pos.lon"]);
        assert_eq!(got[1], vec!["x", "1.5", "2.5"]);
        // the absent leaf materializes as the literal "null".
        assert_eq!(got[2], vec!["y", "3.0", "null"]);
    }

    #[test]
    fn test_array_indices_in_paths() {
        let v = json!([{"tags": ["a", "b"]}]);
        let got = rows_from_value(&v).unwrap();
        assert_eq!(got[0], vec!["tags.0", "tags.1"]);
    }

    #[test]
    fn test_array_of_arrays_is_rows() {
        let v = json!([["h1", "h2"], ["1", "2"]]);
        let got = rows_from_value(&v).unwrap();
        assert_eq!(got[0], vec!["h1", "h2"]);
    }

    #[test]
    fn test_bfs_descends_to_first_array() {
        let v = json!({"meta": 1, "payload": {"items": [{"a": "1"}]}});
        let got = rows_from_value(&v).unwrap();
        assert_eq!(got[0], vec!["a"]);
        assert_eq!(got[1], vec!["1"]);
    }

    #[test]
    fn test_scalar_tree_is_an_error() {
        assert!(rows_from_value(&json!({"a": 1})).is_err());
    }
}
