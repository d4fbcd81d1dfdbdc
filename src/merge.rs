// SPDX-License-Identifier: Apache-2.0

#![warn(missing_docs)]

//! N-way lookup-keyed join over registered source tables.
//!
//! The first registered source drives the iteration; every other source is
//! keyed by its lookup column and probed w/ the primary row's lookup
//! value. A key w/o a match substitutes a single space, so the output is a
//! left join in SQL terms.
//!

use crate::{alert::alert, table::Table, value::Cell};
use std::collections::HashMap;

/// One table registered w/ the [`Merger`].
#[derive(Debug)]
pub struct MergeSource {
    /// The data table.
    pub table: Table,
    /// The join key column of this source.
    pub lookup: String,
    /// Columns to expose; `None` exposes all of them.
    pub columns: Option<Vec<String>>,
    /// Output labels, parallel to `columns`; `None` labels each column
    /// `<column>.<source index>`.
    pub labels: Option<Vec<String>>,
}

/// Accumulates sources + an optional output projection, then joins.
#[derive(Debug, Default)]
pub struct Merger {
    sources: Vec<MergeSource>,
    output: Option<Vec<String>>,
}

impl Merger {
    /// An empty merger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one source. The first one registered drives the join.
    pub fn add_source(&mut self, source: MergeSource) -> &mut Self {
        self.sources.push(source);
        self
    }

    /// Narrow/reorder the output projection to the given labels.
    pub fn set_output_columns<S: AsRef<str>>(&mut self, labels: &[S]) -> &mut Self {
        self.output = Some(labels.iter().map(|x| x.as_ref().to_owned()).collect());
        self
    }

    /// Run the join. A label that resolves to nothing raises a
    /// user-visible warning and aborts w/ `None`.
    pub fn merge(&self) -> Option<Table> {
        if self.sources.is_empty() {
            alert("merge: no sources registered");
            return None;
        }

        // label → (source, column) resolution; first registration wins.
        let mut resolution: HashMap<String, (usize, usize)> = HashMap::new();
        let mut default_output: Vec<String> = Vec::new();
        let mut register = |label: &str, si: usize, ci: usize| {
            if !resolution.contains_key(label) {
                resolution.insert(label.to_owned(), (si, ci));
                default_output.push(label.to_owned());
            }
        };
        for (si, src) in self.sources.iter().enumerate() {
            let Some(li) = src.table.column_index(&src.lookup) else {
                alert(&format!("merge: no lookup column '{}'", src.lookup));
                return None;
            };
            register(&src.lookup, si, li);
            let columns: Vec<String> = match &src.columns {
                Some(x) => x.clone(),
                None => src.table.column_names().iter().map(|x| x.to_string()).collect(),
            };
            for (j, col) in columns.iter().enumerate() {
                let Some(ci) = src.table.column_index(col) else {
                    alert(&format!("merge: source #{si} has no column '{col}'"));
                    return None;
                };
                let label = match &src.labels {
                    Some(labels) if j < labels.len() => labels[j].clone(),
                    _ => format!("{col}.{si}"),
                };
                register(&label, si, ci);
            }
        }

        let output = self.output.as_ref().unwrap_or(&default_output);
        let mut resolved: Vec<(usize, usize)> = Vec::with_capacity(output.len());
        for label in output {
            match resolution.get(label) {
                Some(x) => resolved.push(*x),
                None => {
                    alert(&format!("merge: no column labelled '{label}'"));
                    return None;
                }
            }
        }

        // key the non-primary sources by their lookup value; last row wins.
        let mut keyed: Vec<HashMap<String, usize>> = Vec::with_capacity(self.sources.len());
        for src in &self.sources {
            let li = src.table.column_index(&src.lookup)?;
            let mut map = HashMap::new();
            for (ri, r) in src.table.records().iter().enumerate() {
                map.insert(r[li].text().into_owned(), ri);
            }
            keyed.push(map);
        }

        let primary = &self.sources[0];
        let pl = primary.table.column_index(&primary.lookup)?;
        let mut out = Table::with_field_ids(output);
        for row in primary.table.records() {
            let key = row[pl].text();
            let record = resolved
                .iter()
                .map(|(si, ci)| {
                    if *si == 0 {
                        row[*ci].clone()
                    } else {
                        match keyed[*si].get(key.as_ref()) {
                            Some(ri) => self.sources[*si].table.records()[*ri][*ci].clone(),
                            None => Cell::Str(" ".to_owned()),
                        }
                    }
                })
                .collect();
            out.push_record(record);
        }
        Some(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(data: &[&[&str]]) -> Table {
        Table::from_rows(
            &data
                .iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect::<Vec<_>>(),
        )
    }

    #[test]
    fn test_merge_left_join_with_space_for_missing() {
        let primary = table(&[&["id", "v"], &["1", "p"], &["2", "q"]]);
        let secondary = table(&[&["id", "w"], &["1", "x"]]);
        let mut m = Merger::new();
        m.add_source(MergeSource {
            table: primary,
            lookup: "id".into(),
            columns: None,
            labels: Some(vec!["id".into(), "v".into()]),
        })
        .add_source(MergeSource {
            table: secondary,
            lookup: "id".into(),
            columns: None,
            labels: Some(vec!["id".into(), "w".into()]),
        })
        .set_output_columns(&["v", "w"]);
        let got = m.merge().unwrap();
        assert_eq!(got.column_names(), vec!["v", "w"]);
        assert_eq!(
            got.to_rows()[1..],
            vec![
                vec!["p".to_string(), "x".into()],
                vec!["q".to_string(), " ".into()],
            ]
        );
    }

    #[test]
    fn test_merge_default_labels_carry_source_index() {
        let primary = table(&[&["id", "v"], &["1", "p"]]);
        let secondary = table(&[&["id", "w"], &["1", "x"]]);
        let mut m = Merger::new();
        m.add_source(MergeSource {
            table: primary,
            lookup: "id".into(),
            columns: None,
            labels: None,
        })
        .add_source(MergeSource {
            table: secondary,
            lookup: "id".into(),
            columns: None,
            labels: None,
        });
        let got = m.merge().unwrap();
        assert_eq!(got.column_names(), vec!["id", "id.0", "v.0", "id.1", "w.1"]);
        assert_eq!(got.records()[0][4].text(), "x");
    }

    #[test]
    fn test_merge_unknown_label_aborts() {
        let primary = table(&[&["id"], &["1"]]);
        let mut m = Merger::new();
        m.add_source(MergeSource {
            table: primary,
            lookup: "id".into(),
            columns: None,
            labels: None,
        })
        .set_output_columns(&["nope"]);
        assert!(m.merge().is_none());
    }

    #[test]
    fn test_merge_last_duplicate_key_wins() {
        let primary = table(&[&["k"], &["a"]]);
        let secondary = table(&[&["k", "v"], &["a", "old"], &["a", "new"]]);
        let mut m = Merger::new();
        m.add_source(MergeSource {
            table: primary,
            lookup: "k".into(),
            columns: None,
            labels: None,
        })
        .add_source(MergeSource {
            table: secondary,
            lookup: "k".into(),
            columns: Some(vec!["v".into()]),
            labels: Some(vec!["v".into()]),
        })
        .set_output_columns(&["k", "v"]);
        let got = m.merge().unwrap();
        assert_eq!(got.records()[0][1].text(), "new");
    }
}
