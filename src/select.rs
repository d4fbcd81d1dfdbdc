// SPDX-License-Identifier: Apache-2.0

#![warn(missing_docs)]

//! Row selection + projection over one table.
//!

use crate::{
    alert::alert,
    query::{BoundQuery, Query},
    table::Table,
    value::Cell,
};

impl Table {
    /// Select the records satisfying a `WHERE` mini-language query into a
    /// fresh table (records are copied, not aliased).
    ///
    /// Fail-soft: a query that does not parse raises a user-visible
    /// warning and yields an empty table w/ this table's schema; a query
    /// naming an absent column yields the same empty-typed result w/o an
    /// error.
    pub fn select(&self, query: &str) -> Table {
        let parsed = match Query::parse(query) {
            Ok(x) => x,
            Err(e) => {
                alert(&format!("select: cannot parse '{query}': {e}"));
                return self.empty_like();
            }
        };
        let bound = match BoundQuery::bind(&parsed, self) {
            Ok(x) => x,
            Err(e) => {
                alert(&format!("select: {e}"));
                return self.empty_like();
            }
        };
        self.filter(|record| bound.matches(record))
    }

    /// Select the records satisfying a host predicate into a fresh table.
    pub fn filter<F>(&self, pred: F) -> Table
    where
        F: Fn(&[Cell]) -> bool,
    {
        let mut out = self.empty_like();
        for r in &self.records {
            if pred(r) {
                out.push_record(r.clone());
            }
        }
        out
    }

    /// Project to the named columns, in the given order, into a fresh
    /// table. A name matching no column raises a user-visible warning and
    /// yields `None`.
    pub fn subtable<S: AsRef<str>>(&self, names: &[S]) -> Option<Table> {
        let mut indices = Vec::with_capacity(names.len());
        for n in names {
            let n = n.as_ref();
            match self.column_index(n) {
                Some(i) => indices.push(i),
                None => {
                    alert(&format!("subtable: no column named '{n}'"));
                    return None;
                }
            }
        }
        self.subtable_columns(&indices)
    }

    /// Project to the columns at the given indices, in the given order.
    pub fn subtable_columns(&self, indices: &[usize]) -> Option<Table> {
        if let Some(bad) = indices.iter().find(|i| **i >= self.fields.len()) {
            alert(&format!("subtable: no column #{bad}"));
            return None;
        }
        let mut out = Table::new();
        out.fields = indices.iter().map(|i| self.fields[*i].clone()).collect();
        out.sync_summary();
        for r in &self.records {
            out.push_record(indices.iter().map(|i| r[*i].clone()).collect());
        }
        Some(out)
    }
}
