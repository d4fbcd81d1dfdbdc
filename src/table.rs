// SPDX-License-Identifier: Apache-2.0

#![warn(missing_docs)]

//! The uniform row-oriented table: an ordered field list + a record store
//! where every record has exactly one [`Cell`] per field.
//!
//! Tables are value objects. Operators that shape new data (select, pivot,
//! condense, subtable, aggregate, merge) return a fresh `Table`; mutators
//! (add_column, add_row, sort, revert, append, the column handle ops)
//! modify in place and return the receiver. That distinction is public
//! contract.
//!

use crate::{
    MyError,
    alert::alert,
    value::{Cell, parse_number},
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use tracing::debug;

/// What a column holds; inferred on ingestion, persisted in the `jsondb`
/// shape as a small integer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldKind {
    /// Plain text.
    #[default]
    Text,
    /// Numeric.
    Number,
    /// Boolean.
    Boolean,
    /// An instant.
    Date,
    /// A GeoJSON geometry string.
    Geometry,
}

/// A column descriptor. `id` is the column name; field order defines the
/// column index.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// Column name, trimmed of surrounding whitespace at load.
    pub id: String,
    /// What the column holds.
    pub kind: FieldKind,
    /// Display width hint.
    pub width: usize,
    /// Display decimals hint.
    pub decimals: usize,
    /// TRUE when the column was derived after load.
    pub created: bool,
}

impl Field {
    /// Constructor w/ defaults for the display hints.
    pub fn new(id: &str) -> Self {
        Self {
            id: id.trim().to_owned(),
            kind: FieldKind::default(),
            width: 0,
            decimals: 0,
            created: false,
        }
    }

    pub(crate) fn created(id: &str, kind: FieldKind) -> Self {
        Self {
            id: id.trim().to_owned(),
            kind,
            width: 0,
            decimals: 0,
            created: true,
        }
    }
}

/// Record + field counts, kept in sync w/ the vectors they describe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    /// Number of records.
    pub records: usize,
    /// Number of fields.
    pub fields: usize,
}

/// An in-memory relational table.
#[derive(Debug, Clone, Default)]
pub struct Table {
    pub(crate) fields: Vec<Field>,
    pub(crate) records: Vec<Vec<Cell>>,
    summary: Summary,
    // lookup maps built by `lookup()`, keyed by (value column, lookup column).
    pub(crate) lookup_cache: HashMap<(String, String), HashMap<String, String>>,
}

impl PartialEq for Table {
    fn eq(&self, other: &Self) -> bool {
        // the lookup cache is a derived artifact, not table identity.
        self.fields == other.fields && self.records == other.records
    }
}

impl Table {
    /// An empty table w/ no fields and no records.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from a 2-D string array. The first row becomes the
    /// field list (each id trimmed); subsequent rows are appended only when
    /// their length matches the field count, and are dropped otherwise.
    pub fn from_rows(rows: &[Vec<String>]) -> Self {
        let mut it = Self::new();
        let Some(header) = rows.first() else {
            return it;
        };
        it.fields = header.iter().map(|id| Field::new(id)).collect();
        let want = it.fields.len();
        for (i, row) in rows.iter().enumerate().skip(1) {
            if row.len() == want {
                it.records
                    .push(row.iter().map(|x| Cell::Str(x.clone())).collect());
            } else {
                debug!("Dropping row #{i}: {} cells, expected {want}", row.len());
            }
        }
        it.sync_summary();
        it
    }

    /// The inverse of [`Table::from_rows`]: header + records, all text.
    pub fn to_rows(&self) -> Vec<Vec<String>> {
        let mut rows = Vec::with_capacity(self.records.len() + 1);
        rows.push(self.fields.iter().map(|f| f.id.clone()).collect());
        for r in &self.records {
            rows.push(r.iter().map(|c| c.text().into_owned()).collect());
        }
        rows
    }

    /// Index of the first field w/ the given id.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.id == name)
    }

    /// All field ids, in column order.
    pub fn column_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.id.as_str()).collect()
    }

    /// The field list.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// The record store.
    pub fn records(&self) -> &[Vec<Cell>] {
        &self.records
    }

    /// Record + field counts.
    pub fn summary(&self) -> Summary {
        self.summary
    }

    /// An empty table carrying this table's schema. The fail-soft result
    /// shape of a selection that cannot be bound.
    pub fn empty_like(&self) -> Self {
        let mut it = Self::new();
        it.fields = self.fields.clone();
        it.sync_summary();
        it
    }

    pub(crate) fn with_field_ids<S: AsRef<str>>(ids: &[S]) -> Self {
        let mut it = Self::new();
        it.fields = ids.iter().map(|id| Field::new(id.as_ref())).collect();
        it.sync_summary();
        it
    }

    pub(crate) fn push_record(&mut self, record: Vec<Cell>) {
        debug_assert_eq!(record.len(), self.fields.len());
        self.records.push(record);
        self.summary.records = self.records.len();
    }

    pub(crate) fn sync_summary(&mut self) {
        self.summary = Summary {
            records: self.records.len(),
            fields: self.fields.len(),
        };
    }

    /// Append a row built from an object keyed by field id. Cells of
    /// fields absent from the object stay empty; object keys that match no
    /// field raise a user-visible warning, but the row is still added w/
    /// the known keys applied.
    pub fn add_row(&mut self, obj: &Map<String, Value>) -> &mut Self {
        let mut record = vec![Cell::Str(String::new()); self.fields.len()];
        for (key, value) in obj {
            match self.column_index(key) {
                Some(i) => record[i] = Cell::Str(value_text(value)),
                None => alert(&format!("add_row: no column named '{key}'")),
            }
        }
        self.push_record(record);
        self
    }

    /// Concatenate another table's records onto this one. Requires an
    /// identical schema --same field count and same ids in the same
    /// order-- and returns `None` (after a user-visible warning) when the
    /// schemas do not line up.
    pub fn append(&mut self, other: &Table) -> Option<&mut Self> {
        let same = self.fields.len() == other.fields.len()
            && self
                .fields
                .iter()
                .zip(other.fields.iter())
                .all(|(a, b)| a.id == b.id);
        if !same {
            alert("append: field lists differ");
            return None;
        }
        self.records.extend(other.records.iter().cloned());
        self.sync_summary();
        Some(self)
    }

    /// Invert the record order in place.
    pub fn revert(&mut self) -> &mut Self {
        self.records.reverse();
        self
    }

    /// Alias of [`Table::revert`].
    pub fn reverse(&mut self) -> &mut Self {
        self.revert()
    }

    /// Sort records in place by one column. The first up-to-10 values are
    /// sniffed: if at least one parses as a number (European decimals
    /// included) the order is numeric, otherwise plain codepoint order.
    /// Direction `"DOWN"` is descending; anything else ascending.
    pub fn sort(&mut self, column: &str, direction: &str) -> Option<&mut Self> {
        let Some(ci) = self.column_index(column) else {
            alert(&format!("sort: no column named '{column}'"));
            return None;
        };
        let numeric = self
            .records
            .iter()
            .take(10)
            .any(|r| parse_number(&r[ci].text()).is_some());
        if numeric {
            self.records.sort_by(|a, b| {
                let x = a[ci].number();
                let y = b[ci].number();
                x.partial_cmp(&y).unwrap_or(std::cmp::Ordering::Equal)
            });
        } else {
            self.records
                .sort_by(|a, b| a[ci].text().cmp(&b[ci].text()));
        }
        if direction == "DOWN" {
            self.records.reverse();
        }
        Some(self)
    }

    /// Render every record as an object mapping field id to cell text.
    pub fn json(&self) -> Vec<Value> {
        self.records
            .iter()
            .map(|r| {
                let mut obj = Map::new();
                for (f, c) in self.fields.iter().zip(r.iter()) {
                    obj.insert(f.id.clone(), Value::String(c.text().into_owned()));
                }
                Value::Object(obj)
            })
            .collect()
    }

    /// Serialize into the persisted table shape:
    /// `{ table:{records,fields}, fields:[{id,…}], records:[[…]] }`.
    pub fn to_jsondb(&self) -> Value {
        let fields: Vec<Value> = self
            .fields
            .iter()
            .map(|f| {
                json!({
                    "id": f.id,
                    "typ": kind_code(f.kind),
                    "width": f.width,
                    "decimals": f.decimals,
                })
            })
            .collect();
        let records: Vec<Value> = self
            .records
            .iter()
            .map(|r| {
                Value::Array(
                    r.iter()
                        .map(|c| Value::String(c.text().into_owned()))
                        .collect(),
                )
            })
            .collect();
        json!({
            "table": { "records": self.summary.records, "fields": self.summary.fields },
            "fields": fields,
            "records": records,
        })
    }

    /// Rebuild a table from the persisted shape produced by
    /// [`Table::to_jsondb`]. Records of the wrong width are dropped, same
    /// as on any other load path.
    pub fn from_jsondb(value: &Value) -> Result<Self, MyError> {
        let fields = value
            .get("fields")
            .and_then(Value::as_array)
            .ok_or_else(|| MyError::Format("jsondb: missing 'fields' array".into()))?;
        let records = value
            .get("records")
            .and_then(Value::as_array)
            .ok_or_else(|| MyError::Format("jsondb: missing 'records' array".into()))?;

        let mut it = Self::new();
        for f in fields {
            let id = f
                .get("id")
                .and_then(Value::as_str)
                .ok_or_else(|| MyError::Format("jsondb: field w/o an 'id'".into()))?;
            let mut field = Field::new(id);
            field.kind = f
                .get("typ")
                .and_then(Value::as_u64)
                .map(kind_from_code)
                .unwrap_or_default();
            field.width = f.get("width").and_then(Value::as_u64).unwrap_or(0) as usize;
            field.decimals = f.get("decimals").and_then(Value::as_u64).unwrap_or(0) as usize;
            it.fields.push(field);
        }
        let want = it.fields.len();
        for r in records {
            let cells = r
                .as_array()
                .ok_or_else(|| MyError::Format("jsondb: record is not an array".into()))?;
            if cells.len() == want {
                it.records
                    .push(cells.iter().map(|c| Cell::Str(value_text(c))).collect());
            }
        }
        it.sync_summary();
        Ok(it)
    }
}

// scalar JSON values keep their bare text; structured ones keep their
// JSON rendering.
pub(crate) fn value_text(v: &Value) -> String {
    match v {
        Value::String(x) => x.clone(),
        Value::Null => "null".to_owned(),
        x => x.to_string(),
    }
}

fn kind_code(kind: FieldKind) -> u64 {
    match kind {
        FieldKind::Text => 0,
        FieldKind::Number => 1,
        FieldKind::Boolean => 2,
        FieldKind::Date => 3,
        FieldKind::Geometry => 4,
    }
}

fn kind_from_code(code: u64) -> FieldKind {
    match code {
        1 => FieldKind::Number,
        2 => FieldKind::Boolean,
        3 => FieldKind::Date,
        4 => FieldKind::Geometry,
        _ => FieldKind::Text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(data: &[&[&str]]) -> Vec<Vec<String>> {
        data.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    #[test]
    fn test_from_rows_drops_ragged_records() {
        let t = Table::from_rows(&rows(&[
            &["a", "b"],
            &["1", "2"],
            &["only-one"],
            &["3", "4"],
        ]));
        assert_eq!(t.summary().records, 2);
        assert_eq!(t.summary().fields, 2);
    }

    #[test]
    fn test_from_rows_trims_field_ids() {
        let t = Table::from_rows(&rows(&[&[" a ", "b"]]));
        assert_eq!(t.column_names(), vec!["a", "b"]);
    }

    #[test]
    fn test_roundtrip() {
        let data = rows(&[&["name", "age"], &["Alice", "30"], &["Bob", "17"]]);
        let t = Table::from_rows(&data);
        assert_eq!(t.to_rows(), data);
        assert_eq!(Table::from_rows(&t.to_rows()), t);
    }

    #[test]
    fn test_first_match_column_lookup() {
        let t = Table::from_rows(&rows(&[&["x", "y", "x"], &["1", "2", "3"]]));
        assert_eq!(t.column_index("x"), Some(0));
    }

    #[test]
    fn test_append_requires_same_field_order() {
        let mut a = Table::from_rows(&rows(&[&["a", "b"], &["1", "2"]]));
        let b = Table::from_rows(&rows(&[&["b", "a"], &["3", "4"]]));
        assert!(a.append(&b).is_none());
        assert_eq!(a.summary().records, 1);

        let c = Table::from_rows(&rows(&[&["a", "b"], &["5", "6"]]));
        assert!(a.append(&c).is_some());
        assert_eq!(a.summary().records, 2);
    }

    #[test]
    fn test_revert_twice_is_identity() {
        let mut t = Table::from_rows(&rows(&[&["n"], &["1"], &["2"], &["3"]]));
        let orig = t.clone();
        t.revert().revert();
        assert_eq!(t, orig);
    }

    #[test]
    fn test_sort_numeric_sniffing() {
        let mut t = Table::from_rows(&rows(&[&["v"], &["10"], &["2"], &["1 234,5"]]));
        t.sort("v", "UP").unwrap();
        let got: Vec<String> = t.records().iter().map(|r| r[0].text().into_owned()).collect();
        assert_eq!(got, vec!["2", "10", "1 234,5"]);

        t.sort("v", "DOWN").unwrap();
        let got: Vec<String> = t.records().iter().map(|r| r[0].text().into_owned()).collect();
        assert_eq!(got, vec!["1 234,5", "10", "2"]);
    }

    #[test]
    fn test_sort_lexicographic() {
        let mut t = Table::from_rows(&rows(&[&["v"], &["pear"], &["apple"], &["fig"]]));
        t.sort("v", "UP").unwrap();
        let got: Vec<String> = t.records().iter().map(|r| r[0].text().into_owned()).collect();
        assert_eq!(got, vec!["apple", "fig", "pear"]);
    }

    #[test]
    fn test_sort_preserves_multiset() {
        let mut t = Table::from_rows(&rows(&[&["v"], &["3"], &["1"], &["2"], &["1"]]));
        t.sort("v", "UP").unwrap();
        let mut got: Vec<String> = t.records().iter().map(|r| r[0].text().into_owned()).collect();
        got.sort();
        assert_eq!(got, vec!["1", "1", "2", "3"]);
        assert_eq!(t.summary().records, 4);
    }

    #[test]
    fn test_add_row_with_unknown_key() {
        let mut t = Table::from_rows(&rows(&[&["a", "b"]]));
        let obj = serde_json::from_str::<Value>(r#"{"a":"1","nope":"x"}"#).unwrap();
        t.add_row(obj.as_object().unwrap());
        assert_eq!(t.summary().records, 1);
        assert_eq!(t.records()[0][0].text(), "1");
        assert_eq!(t.records()[0][1].text(), "");
    }

    #[test]
    fn test_jsondb_roundtrip() {
        let t = Table::from_rows(&rows(&[&["a", "b"], &["1", "x"]]));
        let db = t.to_jsondb();
        assert_eq!(db["table"]["records"], 1);
        assert_eq!(db["table"]["fields"], 2);
        let back = Table::from_jsondb(&db).unwrap();
        assert_eq!(back, t);
    }
}
