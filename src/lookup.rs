// SPDX-License-Identifier: Apache-2.0

#![warn(missing_docs)]

//! Key → value maps derived from a pair of table columns.
//!

use crate::{alert::alert, table::Table, value::Cell};
use std::collections::HashMap;

/// How colliding keys collapse when building a lookup map.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LookupCalc {
    /// Last value wins.
    #[default]
    Overwrite,
    /// Numeric views sum.
    Sum,
    /// Largest numeric view wins.
    Max,
}

impl Table {
    /// Build a map from the key column's cell text to the value column.
    /// Colliding keys collapse per [`LookupCalc`]; the numeric modes store
    /// [`Cell::Num`], overwrite keeps the raw cell.
    pub fn lookup_array(
        &self,
        value: &str,
        key: &str,
        calc: LookupCalc,
    ) -> Option<HashMap<String, Cell>> {
        let Some(vi) = self.column_index(value) else {
            alert(&format!("lookup_array: no column named '{value}'"));
            return None;
        };
        let Some(ki) = self.column_index(key) else {
            alert(&format!("lookup_array: no column named '{key}'"));
            return None;
        };
        let mut map: HashMap<String, Cell> = HashMap::new();
        for r in &self.records {
            let k = r[ki].text().into_owned();
            match calc {
                LookupCalc::Overwrite => {
                    map.insert(k, r[vi].clone());
                }
                LookupCalc::Sum => {
                    let x = r[vi].number();
                    map.entry(k)
                        .and_modify(|c| *c = Cell::Num(c.number() + x))
                        .or_insert(Cell::Num(x));
                }
                LookupCalc::Max => {
                    let x = r[vi].number();
                    map.entry(k)
                        .and_modify(|c| *c = Cell::Num(c.number().max(x)))
                        .or_insert(Cell::Num(x));
                }
            }
        }
        Some(map)
    }

    /// Like [`Table::lookup_array`] but colliding keys concatenate their
    /// value texts w/ a `", "` separator.
    pub fn lookup_string_array(&self, value: &str, key: &str) -> Option<HashMap<String, String>> {
        let Some(vi) = self.column_index(value) else {
            alert(&format!("lookup_string_array: no column named '{value}'"));
            return None;
        };
        let Some(ki) = self.column_index(key) else {
            alert(&format!("lookup_string_array: no column named '{key}'"));
            return None;
        };
        let mut map: HashMap<String, String> = HashMap::new();
        for r in &self.records {
            let k = r[ki].text().into_owned();
            let v = r[vi].text();
            map.entry(k)
                .and_modify(|s| {
                    s.push_str(", ");
                    s.push_str(&v);
                })
                .or_insert_with(|| v.clone().into_owned());
        }
        Some(map)
    }

    /// Resolve one key through the `(value, lookup)` map, building and
    /// caching the map on this table the first time the pair is used.
    pub fn lookup(&mut self, key: &str, value: &str, lookup: &str) -> Option<String> {
        let cache_key = (value.to_owned(), lookup.to_owned());
        if !self.lookup_cache.contains_key(&cache_key) {
            let map = self.lookup_array(value, lookup, LookupCalc::Overwrite)?;
            let map = map
                .into_iter()
                .map(|(k, v)| (k, v.text().into_owned()))
                .collect();
            self.lookup_cache.insert(cache_key.clone(), map);
        }
        self.lookup_cache.get(&cache_key)?.get(key).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Table {
        Table::from_rows(&[
            vec!["id".into(), "v".into()],
            vec!["a".into(), "1".into()],
            vec!["b".into(), "5".into()],
            vec!["a".into(), "3".into()],
        ])
    }

    #[test]
    fn test_lookup_array_overwrite() {
        let map = table()
            .lookup_array("v", "id", LookupCalc::Overwrite)
            .unwrap();
        assert_eq!(map["a"].text(), "3");
        assert_eq!(map["b"].text(), "5");
    }

    #[test]
    fn test_lookup_array_sum_and_max() {
        let t = table();
        let sum = t.lookup_array("v", "id", LookupCalc::Sum).unwrap();
        assert_eq!(sum["a"].number(), 4.0);
        let max = t.lookup_array("v", "id", LookupCalc::Max).unwrap();
        assert_eq!(max["a"].number(), 3.0);
    }

    #[test]
    fn test_lookup_string_array_concatenates() {
        let map = table().lookup_string_array("v", "id").unwrap();
        assert_eq!(map["a"], "1, 3");
    }

    #[test]
    fn test_lookup_uses_cache() {
        let mut t = table();
        assert_eq!(t.lookup("b", "v", "id").as_deref(), Some("5"));
        // the cached map answers even after the records change.
        t.records.clear();
        t.sync_summary();
        assert_eq!(t.lookup("b", "v", "id").as_deref(), Some("5"));
    }

    #[test]
    fn test_lookup_missing_column_is_none() {
        assert!(table().lookup_array("v", "nope", LookupCalc::Sum).is_none());
    }
}
