// SPDX-License-Identifier: Apache-2.0

#![warn(missing_docs)]

//! Tabular data stored as delimiter-separated text.
//!

use crate::{MyError, ds::ParserOptions};
use csv::ReaderBuilder;
use tracing::debug;

/// Read delimiter-separated text into the 2-D cell array.
///
/// W/ an explicit delimiter the text is read once. W/o one the reader
/// probes `,` first and retries w/ `;` when the rows come back w/ unequal
/// lengths; if neither yields a rectangle the delimiter is indeterminate
/// and the load fails.
pub(crate) fn rows(text: &str, opts: &ParserOptions) -> Result<Vec<Vec<String>>, MyError> {
    match opts.delimiter {
        Some(d) => {
            let rows = read_with(text, d, opts)?;
            if !uniform(&rows) {
                return Err(MyError::Format(
                    "CSV rows have unequal lengths w/ the configured delimiter".into(),
                ));
            }
            Ok(rows)
        }
        None => {
            // a probe only wins outright when it actually splits; a
            // delimiter that never occurs yields a well-formed single
            // column and would mask the real one.
            let comma = read_with(text, b',', opts)?;
            if uniform(&comma) && width(&comma) > 1 {
                return Ok(comma);
            }
            debug!("CSV does not split w/ ','; retrying w/ ';'");
            let semi = read_with(text, b';', opts)?;
            if uniform(&semi) && width(&semi) > 1 {
                return Ok(semi);
            }
            if uniform(&comma) {
                return Ok(comma);
            }
            if uniform(&semi) {
                return Ok(semi);
            }
            Err(MyError::Format("CSV delimiter indeterminate".into()))
        }
    }
}

fn read_with(text: &str, delimiter: u8, opts: &ParserOptions) -> Result<Vec<Vec<String>>, MyError> {
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());
    let mut rows: Vec<Vec<String>> = Vec::new();
    for record in reader.records() {
        let record = record?;
        let row: Vec<String> = record.iter().map(str::to_owned).collect();
        if opts.skip_empty_lines && row.iter().all(|c| c.trim().is_empty()) {
            continue;
        }
        rows.push(row);
    }

    // a short trailing row is a file artifact, not data.
    if rows.len() > 1
        && let Some(last) = rows.last()
        && last.len() != rows[0].len()
    {
        rows.pop();
    }

    // a single trailing empty header column means every full-width row
    // carries a phantom trailing cell too.
    if let Some(header) = rows.first()
        && header.len() > 1
        && header.last().is_some_and(|x| x.trim().is_empty())
    {
        let old_want = rows[0].len();
        rows[0].pop();
        for row in rows.iter_mut().skip(1) {
            if row.len() == old_want {
                row.pop();
            }
        }
    }
    Ok(rows)
}

fn uniform(rows: &[Vec<String>]) -> bool {
    match rows.first() {
        Some(first) => rows.iter().all(|r| r.len() == first.len()),
        None => true,
    }
}

fn width(rows: &[Vec<String>]) -> usize {
    rows.first().map(Vec::len).unwrap_or(0)
}
