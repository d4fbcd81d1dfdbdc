// SPDX-License-Identifier: Apache-2.0

#![warn(missing_docs)]

//! Pivot + aggregation engines.
//!
//! Both group rows under a key built from one or more lead columns and
//! accumulate numeric views of the grouped cells. Groups live in hash maps
//! keyed by the group string and are emitted in first-seen order.
//!

use crate::{alert::alert, table::Table, value::Cell};
use std::collections::HashMap;

/// A list of column names coercible from a scalar string (comma or pipe
/// separated) the way the source options allowed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnList(pub Vec<String>);

impl From<&str> for ColumnList {
    fn from(value: &str) -> Self {
        Self(
            value
                .split(['|', ','])
                .map(str::trim)
                .filter(|x| !x.is_empty())
                .map(str::to_owned)
                .collect(),
        )
    }
}

impl From<Vec<String>> for ColumnList {
    fn from(value: Vec<String>) -> Self {
        Self(value)
    }
}

impl<const N: usize> From<[&str; N]> for ColumnList {
    fn from(value: [&str; N]) -> Self {
        Self(value.iter().map(|x| x.to_string()).collect())
    }
}

impl ColumnList {
    fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    // resolve every name or alert + None.
    pub(crate) fn bind(&self, table: &Table, what: &str) -> Option<Vec<usize>> {
        let mut out = Vec::with_capacity(self.0.len());
        for n in &self.0 {
            match table.column_index(n) {
                Some(i) => out.push(i),
                None => {
                    alert(&format!("{what}: no column named '{n}'"));
                    return None;
                }
            }
        }
        Some(out)
    }
}

/// How grouped numeric contributions collapse into one output cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Calc {
    /// Largest contribution instead of the sum.
    Max,
    /// Sum divided by the per-cell contribution count.
    Mean,
    /// First value verbatim, no arithmetic.
    Text,
}

impl Calc {
    /// Map the option string of the source (`max`, `mean`, `string`).
    pub fn from_option(s: &str) -> Option<Self> {
        match s {
            "max" => Some(Calc::Max),
            "mean" => Some(Calc::Mean),
            "string" => Some(Calc::Text),
            _ => None,
        }
    }
}

/// Options of [`Table::pivot`]; every list coerces from a scalar string.
#[derive(Debug, Clone, Default)]
pub struct PivotOpts {
    /// Grouping key columns; their values joined w/ `|` key the output rows.
    pub lead: ColumnList,
    /// Column whose values become the dynamic output columns (first entry
    /// used; an unresolvable name lands everything under `undefined`).
    pub cols: ColumnList,
    /// Carried columns where the last non-empty differing value wins.
    pub keep: ColumnList,
    /// Carried columns accumulated as numeric sums.
    pub sum: ColumnList,
    /// Value columns feeding the dynamic cells; empty means count rows.
    pub value: ColumnList,
    /// Cell collapse mode; `None` sums.
    pub calc: Option<Calc>,
    /// Column keys seeded into the output even when no row populates them.
    pub forced: ColumnList,
}

// per (row key, column key) accumulator.
#[derive(Debug, Default)]
struct CellAcc {
    sum: f64,
    max: f64,
    count: u64,
    first: Option<String>,
}

#[derive(Debug)]
struct Group {
    lead: Vec<String>,
    keep: Vec<String>,
    sums: Vec<f64>,
    cells: HashMap<String, CellAcc>,
    total: f64,
}

impl Table {
    /// Cross-tabulate the table: one output row per distinct lead key, one
    /// dynamic output column per distinct value of the `cols` column, plus
    /// the carried `keep`/`sum` columns and a trailing `Total`.
    ///
    /// The dynamic cell is the count of contributing rows when no value
    /// column is given, else the accumulated numeric view of the value
    /// columns collapsed per [`Calc`]. `Total` is always the plain sum of
    /// the row's contributions.
    pub fn pivot(&self, opts: &PivotOpts) -> Option<Table> {
        let lead = opts.lead.bind(self, "pivot")?;
        let keep = opts.keep.bind(self, "pivot")?;
        let sum = opts.sum.bind(self, "pivot")?;
        let value = opts.value.bind(self, "pivot")?;
        if lead.is_empty() {
            alert("pivot: no lead column given");
            return None;
        }
        // an unresolvable cols name is not an error: every row then lands
        // in the literal 'undefined' column.
        let cols = opts
            .cols
            .0
            .first()
            .and_then(|n| self.column_index(n));

        let mut order: Vec<String> = Vec::new();
        let mut groups: HashMap<String, Group> = HashMap::new();
        let mut col_order: Vec<String> = Vec::new();
        for forced in &opts.forced.0 {
            col_order.push(forced.clone());
        }

        for r in &self.records {
            let key = lead
                .iter()
                .map(|i| r[*i].text())
                .collect::<Vec<_>>()
                .join("|");
            let group = groups.entry(key.clone()).or_insert_with(|| {
                order.push(key.clone());
                Group {
                    lead: lead.iter().map(|i| r[*i].text().into_owned()).collect(),
                    keep: keep.iter().map(|i| r[*i].text().into_owned()).collect(),
                    sums: vec![0.0; sum.len()],
                    cells: HashMap::new(),
                    total: 0.0,
                }
            });

            for (slot, i) in keep.iter().enumerate() {
                let new = r[*i].text();
                if !new.is_empty() && new != group.keep[slot].as_str() {
                    group.keep[slot] = new.into_owned();
                }
            }
            for (slot, i) in sum.iter().enumerate() {
                group.sums[slot] += r[*i].number();
            }

            let col_key = match cols {
                Some(i) => r[i].text().into_owned(),
                None => "undefined".to_owned(),
            };
            if !col_order.contains(&col_key) {
                col_order.push(col_key.clone());
            }

            let contribution = if value.is_empty() {
                1.0
            } else {
                value.iter().map(|i| r[*i].number()).sum()
            };
            let acc = group.cells.entry(col_key).or_default();
            acc.sum += contribution;
            acc.max = acc.max.max(contribution);
            acc.count += 1;
            if acc.first.is_none() {
                let verbatim = value
                    .first()
                    .map(|i| r[*i].text().into_owned())
                    .unwrap_or_default();
                acc.first = Some(verbatim);
            }
            group.total += contribution;
        }

        let mut field_ids: Vec<String> = opts.lead.0.clone();
        field_ids.extend(opts.keep.0.iter().cloned());
        field_ids.extend(opts.sum.0.iter().cloned());
        field_ids.extend(col_order.iter().cloned());
        field_ids.push("Total".to_owned());

        let mut out = Table::with_field_ids(&field_ids);
        for key in &order {
            let group = &groups[key];
            let mut record: Vec<Cell> = Vec::with_capacity(field_ids.len());
            record.extend(group.lead.iter().map(|x| Cell::Str(x.clone())));
            record.extend(group.keep.iter().map(|x| Cell::Str(x.clone())));
            record.extend(group.sums.iter().map(|x| Cell::Num(*x)));
            for col in &col_order {
                record.push(match group.cells.get(col) {
                    Some(acc) => match opts.calc {
                        Some(Calc::Max) => Cell::Num(acc.max),
                        Some(Calc::Mean) => Cell::Num(acc.sum / acc.count as f64),
                        Some(Calc::Text) => Cell::Str(acc.first.clone().unwrap_or_default()),
                        None => Cell::Num(acc.sum),
                    },
                    None => match opts.calc {
                        Some(Calc::Text) => Cell::Str(String::new()),
                        _ => Cell::Num(0.0),
                    },
                });
            }
            record.push(Cell::Num(group.total));
            out.push_record(record);
        }
        Some(out)
    }

    /// Collapse the table to one row per distinct lead key, summing the
    /// numeric view of one value column (`mean` divides by the group
    /// count). Output columns are the lead columns + the value column.
    pub fn aggregate(&self, value: &str, lead: &str, calc: Option<Calc>) -> Option<Table> {
        let lead_list = ColumnList::from(lead);
        let lead_idx = lead_list.bind(self, "aggregate")?;
        let Some(vi) = self.column_index(value) else {
            alert(&format!("aggregate: no column named '{value}'"));
            return None;
        };
        if lead_idx.is_empty() {
            alert("aggregate: no lead column given");
            return None;
        }

        struct Acc {
            lead: Vec<String>,
            sum: f64,
            count: u64,
        }
        let mut order: Vec<String> = Vec::new();
        let mut groups: HashMap<String, Acc> = HashMap::new();
        for r in &self.records {
            let key = lead_idx
                .iter()
                .map(|i| r[*i].text())
                .collect::<Vec<_>>()
                .concat();
            let acc = groups.entry(key.clone()).or_insert_with(|| {
                order.push(key.clone());
                Acc {
                    lead: lead_idx.iter().map(|i| r[*i].text().into_owned()).collect(),
                    sum: 0.0,
                    count: 0,
                }
            });
            acc.sum += r[vi].number();
            acc.count += 1;
        }

        let mut field_ids = lead_list.0.clone();
        field_ids.push(value.to_owned());
        let mut out = Table::with_field_ids(&field_ids);
        for key in &order {
            let acc = &groups[key];
            let x = match calc {
                Some(Calc::Mean) => acc.sum / acc.count as f64,
                _ => acc.sum,
            };
            let mut record: Vec<Cell> = acc.lead.iter().map(|x| Cell::Str(x.clone())).collect();
            record.push(Cell::Num(x));
            out.push_record(record);
        }
        Some(out)
    }
}
