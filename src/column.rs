// SPDX-License-Identifier: Apache-2.0

#![warn(missing_docs)]

//! A scoped view over one table column.
//!
//! The handle is a `(table, field index)` pair that never owns data. It
//! borrows the table mutably, so an operator that removes or reorders
//! fields cannot run while a handle is outstanding --the borrow checker
//! enforces what the source had to document.
//!

use crate::{table::Table, value::Cell};

/// Handle over one column of a [`Table`].
#[derive(Debug)]
pub struct Column<'a> {
    table: &'a mut Table,
    index: usize,
}

impl Table {
    /// A handle over the first column w/ the given id, or `None`.
    pub fn column(&mut self, name: &str) -> Option<Column<'_>> {
        let index = self.column_index(name)?;
        Some(Column { table: self, index })
    }
}

impl Column<'_> {
    /// The column index this handle is scoped to.
    pub fn index(&self) -> usize {
        self.index
    }

    /// All values of the column, in insertion order.
    pub fn values(&self) -> Vec<String> {
        self.table
            .records
            .iter()
            .map(|r| r[self.index].text().into_owned())
            .collect()
    }

    /// Deduplicated values, first occurrence preserved.
    pub fn unique_values(&self) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        for r in &self.table.records {
            let v = r[self.index].text().into_owned();
            if seen.insert(v.clone()) {
                out.push(v);
            }
        }
        out
    }

    /// Remap every cell of the column in place. The function receives the
    /// current cell, the full row and the column index.
    pub fn map<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&Cell, &[Cell], usize) -> Cell,
    {
        let ci = self.index;
        for i in 0..self.table.records.len() {
            let new = {
                let row = &self.table.records[i];
                f(&row[ci], row, ci)
            };
            self.table.records[i][ci] = new;
        }
        self
    }

    /// Rewrite the field id.
    pub fn rename(&mut self, new_id: &str) -> &mut Self {
        self.table.fields[self.index].id = new_id.trim().to_owned();
        self
    }

    /// Remove the field and the cell at its index from every record,
    /// consuming the handle.
    pub fn remove(self) {
        let ci = self.index;
        self.table.fields.remove(ci);
        for r in &mut self.table.records {
            r.remove(ci);
        }
        self.table.sync_summary();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Table {
        Table::from_rows(&[
            vec!["name".into(), "n".into()],
            vec!["a".into(), "1".into()],
            vec!["b".into(), "2".into()],
            vec!["a".into(), "3".into()],
        ])
    }

    #[test]
    fn test_values_and_unique_values() {
        let mut t = table();
        let col = t.column("name").unwrap();
        assert_eq!(col.values(), vec!["a", "b", "a"]);
        assert_eq!(col.unique_values(), vec!["a", "b"]);
    }

    #[test]
    fn test_map_sees_row_and_index() {
        let mut t = table();
        t.column("n")
            .unwrap()
            .map(|cell, row, ci| {
                assert_eq!(ci, 1);
                Cell::Str(format!("{}-{}", row[0].text(), cell.text()))
            });
        assert_eq!(t.records()[0][1].text(), "a-1");
        assert_eq!(t.records()[2][1].text(), "a-3");
    }

    #[test]
    fn test_rename() {
        let mut t = table();
        t.column("n").unwrap().rename("count");
        assert_eq!(t.column_names(), vec!["name", "count"]);
    }

    #[test]
    fn test_remove_shrinks_every_record() {
        let mut t = table();
        t.column("name").unwrap().remove();
        assert_eq!(t.column_names(), vec!["n"]);
        assert_eq!(t.summary().fields, 1);
        assert!(t.records().iter().all(|r| r.len() == 1));
    }

    #[test]
    fn test_missing_column_yields_none() {
        let mut t = table();
        assert!(t.column("nope").is_none());
    }
}
