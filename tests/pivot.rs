// SPDX-License-Identifier: Apache-2.0

//! Pivot + aggregate scenarios.
//!

use approx::assert_relative_eq;
use geotable::prelude::*;

fn sales() -> Table {
    Table::from_rows(&[
        vec!["date".into(), "cat".into(), "amt".into()],
        vec!["d1".into(), "A".into(), "10".into()],
        vec!["d1".into(), "B".into(), "5".into()],
        vec!["d2".into(), "A".into(), "3".into()],
    ])
}

#[test]
fn test_pivot_scenario() {
    let got = sales()
        .pivot(&PivotOpts {
            lead: "date".into(),
            cols: "cat".into(),
            value: "amt".into(),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(got.column_names(), vec!["date", "A", "B", "Total"]);
    assert_eq!(
        got.to_rows()[1..],
        vec![
            vec!["d1".to_string(), "10".into(), "5".into(), "15".into()],
            vec!["d2".to_string(), "3".into(), "0".into(), "3".into()],
        ]
    );
}

#[test]
fn test_pivot_total_matches_dynamic_cells() {
    let got = sales()
        .pivot(&PivotOpts {
            lead: "date".into(),
            cols: "cat".into(),
            value: "amt".into(),
            ..Default::default()
        })
        .unwrap();
    for r in got.records() {
        let total = r.last().unwrap().number();
        let dynamic: f64 = r[1..r.len() - 1].iter().map(Cell::number).sum();
        assert_relative_eq!(total, dynamic);
    }
}

#[test]
fn test_pivot_multi_lead_joins_with_pipe() {
    let t = Table::from_rows(&[
        vec!["y".into(), "m".into(), "v".into()],
        vec!["2025".into(), "1".into(), "2".into()],
        vec!["2025".into(), "1".into(), "3".into()],
        vec!["2025".into(), "2".into(), "4".into()],
    ]);
    let got = t
        .pivot(&PivotOpts {
            lead: "y|m".into(),
            value: "v".into(),
            ..Default::default()
        })
        .unwrap();
    // two distinct (y, m) groups.
    assert_eq!(got.records().len(), 2);
    assert_eq!(got.records()[0][0].text(), "2025");
    assert_eq!(got.records()[0][1].text(), "1");
}

#[test]
fn test_aggregate_mean() {
    let got = sales().aggregate("amt", "date", Some(Calc::Mean)).unwrap();
    assert_relative_eq!(got.records()[0][1].number(), 7.5);
    assert_relative_eq!(got.records()[1][1].number(), 3.0);
}

#[test]
fn test_aggregate_groups_by_key_not_by_index() {
    // group keys that would collide under numeric-length iteration.
    let t = Table::from_rows(&[
        vec!["g".into(), "v".into()],
        vec!["10".into(), "1".into()],
        vec!["1".into(), "2".into()],
        vec!["10".into(), "4".into()],
    ]);
    let got = t.aggregate("v", "g", None).unwrap();
    assert_eq!(got.records().len(), 2);
    assert_eq!(got.records()[0][1].text(), "5");
    assert_eq!(got.records()[1][1].text(), "2");
}
