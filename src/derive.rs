// SPDX-License-Identifier: Apache-2.0

#![warn(missing_docs)]

//! Derived columns: filled, computed, summed and time-expanded.
//!

use crate::{
    alert::alert,
    pivot::ColumnList,
    table::{Field, FieldKind, Table},
    value::Cell,
};
use jiff::{Timestamp, civil, tz::TimeZone};

/// Options of [`Table::add_time_columns`].
#[derive(Debug, Clone, Default)]
pub struct TimeColumns {
    /// Column holding the timestamps.
    pub source: String,
    /// Which of `date, year, month, day, hour` to append; empty appends
    /// all five.
    pub create: ColumnList,
}

const TIME_FIELDS: [&str; 5] = ["date", "year", "month", "day", "hour"];

impl Table {
    /// Append a zero-filled column.
    pub fn add_column(&mut self, destination: &str) -> &mut Self {
        self.fields
            .push(Field::created(destination, FieldKind::Number));
        for r in &mut self.records {
            r.push(Cell::Num(0.0));
        }
        self.sync_summary();
        self
    }

    /// Append a column from explicit values; records beyond the list end
    /// get `0`.
    pub fn add_column_values(&mut self, destination: &str, values: &[String]) -> &mut Self {
        self.fields.push(Field::created(destination, FieldKind::Text));
        for (i, r) in self.records.iter_mut().enumerate() {
            r.push(match values.get(i) {
                Some(x) => Cell::Str(x.clone()),
                None => Cell::Num(0.0),
            });
        }
        self.sync_summary();
        self
    }

    /// Append a column computed per record. W/ a source column the
    /// function receives `Some(source cell)` + the record, w/o one it
    /// receives `None` + the record. A source name matching no column
    /// raises a user-visible warning and yields `None`.
    pub fn add_column_map<F>(
        &mut self,
        destination: &str,
        source: Option<&str>,
        f: F,
    ) -> Option<&mut Self>
    where
        F: Fn(Option<&Cell>, &[Cell]) -> Cell,
    {
        let si = match source {
            Some(name) => match self.column_index(name) {
                Some(i) => Some(i),
                None => {
                    alert(&format!("add_column: no column named '{name}'"));
                    return None;
                }
            },
            None => None,
        };
        self.fields.push(Field::created(destination, FieldKind::Text));
        for r in &mut self.records {
            let cell = f(si.map(|i| &r[i]), r);
            r.push(cell);
        }
        self.sync_summary();
        Some(self)
    }

    /// Derive a column as the numeric row-sum of the named source columns.
    pub fn group_columns(&mut self, sources: &ColumnList, destination: &str) -> Option<&mut Self> {
        let idx = sources.bind(self, "group_columns")?;
        self.fields
            .push(Field::created(destination, FieldKind::Number));
        for r in &mut self.records {
            let sum: f64 = idx.iter().map(|i| r[*i].number()).sum();
            r.push(Cell::Num(sum));
        }
        self.sync_summary();
        Some(self)
    }

    /// Parse every record's source cell as a timestamp and append the
    /// requested time fields: `date` as `D.M.YYYY`, `year`, `month`,
    /// `day` as the day-of-week w/ Sunday = 0, and `hour`. Cells of
    /// records whose source does not parse stay empty.
    pub fn add_time_columns(&mut self, opts: &TimeColumns) -> Option<&mut Self> {
        let Some(si) = self.column_index(&opts.source) else {
            alert(&format!(
                "add_time_columns: no column named '{}'",
                opts.source
            ));
            return None;
        };
        let wanted: Vec<&str> = if opts.create.0.is_empty() {
            TIME_FIELDS.to_vec()
        } else {
            TIME_FIELDS
                .iter()
                .copied()
                .filter(|f| opts.create.0.iter().any(|c| c == f))
                .collect()
        };
        if wanted.is_empty() {
            alert("add_time_columns: nothing to create");
            return None;
        }

        for name in &wanted {
            let kind = if *name == "date" {
                FieldKind::Date
            } else {
                FieldKind::Number
            };
            self.fields.push(Field::created(name, kind));
        }
        for r in &mut self.records {
            let parsed = parse_timestamp(&r[si].text());
            for name in &wanted {
                r.push(match parsed {
                    Some(dt) => time_field(*name, dt),
                    None => Cell::Str(String::new()),
                });
            }
        }
        self.sync_summary();
        Some(self)
    }
}

fn time_field(name: &str, dt: civil::DateTime) -> Cell {
    match name {
        "date" => Cell::Date(format!("{}.{}.{}", dt.day(), dt.month(), dt.year())),
        "year" => Cell::Num(dt.year() as f64),
        "month" => Cell::Num(dt.month() as f64),
        "day" => Cell::Num(dt.weekday().to_sunday_zero_offset() as f64),
        "hour" => Cell::Num(dt.hour() as f64),
        _ => Cell::Str(String::new()),
    }
}

// tolerant timestamp scan: RFC-3339, civil date-time, bare date, or an
// epoch number (milliseconds when it is too large for seconds).
fn parse_timestamp(s: &str) -> Option<civil::DateTime> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    let body = s.strip_prefix('-').unwrap_or(s);
    if !body.is_empty()
        && body.chars().all(|c| c.is_ascii_digit())
        && let Ok(epoch) = s.parse::<i64>()
    {
        let ts = if epoch.abs() >= 100_000_000_000 {
            Timestamp::from_millisecond(epoch).ok()?
        } else {
            Timestamp::from_second(epoch).ok()?
        };
        return Some(ts.to_zoned(TimeZone::UTC).datetime());
    }
    if let Ok(ts) = s.parse::<Timestamp>() {
        return Some(ts.to_zoned(TimeZone::UTC).datetime());
    }
    if let Ok(dt) = s.parse::<civil::DateTime>() {
        return Some(dt);
    }
    if let Ok(d) = s.parse::<civil::Date>() {
        return Some(d.at(0, 0, 0, 0));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Table {
        Table::from_rows(&[
            vec!["a".into(), "b".into()],
            vec!["1".into(), "2".into()],
            vec!["3".into(), "4".into()],
        ])
    }

    #[test]
    fn test_add_column_zero_fill() {
        let mut t = table();
        t.add_column("z");
        assert_eq!(t.column_names(), vec!["a", "b", "z"]);
        assert_eq!(t.records()[0][2].text(), "0");
        assert!(t.fields()[2].created);
    }

    #[test]
    fn test_add_column_values_pads_with_zero() {
        let mut t = table();
        t.add_column_values("v", &["x".to_owned()]);
        assert_eq!(t.records()[0][2].text(), "x");
        assert_eq!(t.records()[1][2].text(), "0");
    }

    #[test]
    fn test_add_column_map_with_source() {
        let mut t = table();
        t.add_column_map("doubled", Some("a"), |cell, _row| {
            Cell::Num(cell.unwrap().number() * 2.0)
        })
        .unwrap();
        assert_eq!(t.records()[1][2].text(), "6");
        assert!(t.add_column_map("x", Some("nope"), |_, _| Cell::Null).is_none());
    }

    #[test]
    fn test_add_column_map_row_only() {
        let mut t = table();
        t.add_column_map("sum", None, |cell, row| {
            assert!(cell.is_none());
            Cell::Num(row[0].number() + row[1].number())
        })
        .unwrap();
        assert_eq!(t.records()[0][2].text(), "3");
    }

    #[test]
    fn test_group_columns() {
        let mut t = table();
        t.group_columns(&ColumnList::from("a|b"), "total").unwrap();
        assert_eq!(t.records()[1][2].text(), "7");
        assert!(
            t.group_columns(&ColumnList::from("a|nope"), "x").is_none()
        );
    }

    #[test]
    fn test_add_time_columns() {
        let mut t = Table::from_rows(&[
            vec!["when".into()],
            // a Wednesday.
            vec!["2026-01-07T14:30:00Z".into()],
            vec!["not a date".into()],
        ]);
        t.add_time_columns(&TimeColumns {
            source: "when".into(),
            create: ColumnList::default(),
        })
        .unwrap();
        assert_eq!(
            t.column_names(),
            vec!["when", "date", "year", "month", "day", "hour"]
        );
        let r = &t.records()[0];
        assert_eq!(r[1].text(), "7.1.2026");
        assert_eq!(r[2].text(), "2026");
        assert_eq!(r[3].text(), "1");
        assert_eq!(r[4].text(), "3");
        assert_eq!(r[5].text(), "14");
        // the unparseable row gets empty cells, not an error.
        assert!(t.records()[1][1..].iter().all(|c| c.text().is_empty()));
    }

    #[test]
    fn test_add_time_columns_subset_and_epoch() {
        let mut t = Table::from_rows(&[
            vec!["t".into()],
            // 2021-01-01T00:00:00Z in epoch seconds.
            vec!["1609459200".into()],
        ]);
        t.add_time_columns(&TimeColumns {
            source: "t".into(),
            create: "year,hour".into(),
        })
        .unwrap();
        assert_eq!(t.column_names(), vec!["t", "year", "hour"]);
        assert_eq!(t.records()[0][1].text(), "2021");
    }
}
