// SPDX-License-Identifier: Apache-2.0

#![warn(missing_docs)]

//! Collapse a table to one row per distinct value of a lead column,
//! keeping the input schema.
//!

use crate::{
    alert::alert,
    pivot::{Calc, ColumnList},
    table::Table,
    value::{Cell, parse_number, scan_number},
};
use std::collections::HashMap;

/// Options of [`Table::condense`].
#[derive(Debug, Clone, Default)]
pub struct CondenseOpts {
    /// The grouping column.
    pub lead: String,
    /// Columns carried verbatim from the group's first row.
    pub keep: ColumnList,
    /// `Max` makes numeric columns accumulate their largest value instead
    /// of the sum.
    pub calc: Option<Calc>,
}

// what one column of one group has accumulated. whether a column counts as
// numeric is decided by its first observed cell.
#[derive(Debug)]
enum ColState {
    Num(f64),
    Str { base: String, diverged: u64 },
    Keep(String),
}

impl Table {
    /// Group records by the lead column. Numeric cells of a group sum (or
    /// take the max under [`Calc::Max`]); non-numeric cells that diverge
    /// from the group's first value come out as `"<first> (+N) "` w/ `N`
    /// the count of diverging observations.
    pub fn condense(&self, opts: &CondenseOpts) -> Option<Table> {
        let Some(lead) = self.column_index(&opts.lead) else {
            alert(&format!("condense: no column named '{}'", opts.lead));
            return None;
        };
        let keep = opts.keep.bind(self, "condense")?;

        let mut order: Vec<String> = Vec::new();
        let mut groups: HashMap<String, Vec<ColState>> = HashMap::new();

        for r in &self.records {
            let key = r[lead].text().into_owned();
            if let Some(states) = groups.get_mut(&key) {
                for (ci, state) in states.iter_mut().enumerate() {
                    if ci == lead {
                        continue;
                    }
                    let text = r[ci].text();
                    match state {
                        ColState::Num(acc) => {
                            let x = scan_number(&text);
                            if opts.calc == Some(Calc::Max) {
                                *acc = acc.max(x);
                            } else {
                                *acc += x;
                            }
                        }
                        ColState::Str { base, diverged } => {
                            if text != base.as_str() {
                                *diverged += 1;
                            }
                        }
                        ColState::Keep(_) => {}
                    }
                }
            } else {
                order.push(key.clone());
                let states = r
                    .iter()
                    .enumerate()
                    .map(|(ci, cell)| {
                        let text = cell.text().into_owned();
                        if keep.contains(&ci) {
                            ColState::Keep(text)
                        } else if parse_number(&text).is_some() {
                            ColState::Num(scan_number(&text))
                        } else {
                            ColState::Str {
                                base: text,
                                diverged: 0,
                            }
                        }
                    })
                    .collect();
                groups.insert(key, states);
            }
        }

        let mut out = self.empty_like();
        for key in &order {
            let states = &groups[key];
            let record = states
                .iter()
                .enumerate()
                .map(|(ci, state)| {
                    if ci == lead {
                        return Cell::Str(key.clone());
                    }
                    match state {
                        ColState::Num(x) => Cell::Num(*x),
                        ColState::Str { base, diverged } => {
                            if *diverged > 0 {
                                Cell::Str(format!("{base} (+{diverged}) "))
                            } else {
                                Cell::Str(base.clone())
                            }
                        }
                        ColState::Keep(x) => Cell::Str(x.clone()),
                    }
                })
                .collect();
            out.push_record(record);
        }
        Some(out)
    }
}
