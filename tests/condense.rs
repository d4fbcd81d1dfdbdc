// SPDX-License-Identifier: Apache-2.0

//! Condense scenarios.
//!

use geotable::prelude::*;

#[test]
fn test_condense_scenario() {
    let t = Table::from_rows(&[
        vec!["name".into(), "note".into(), "n".into()],
        vec!["x".into(), "a".into(), "1".into()],
        vec!["x".into(), "b".into(), "2".into()],
    ]);
    let got = t
        .condense(&CondenseOpts {
            lead: "name".into(),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(
        got.to_rows()[1..],
        vec![vec!["x".to_string(), "a (+1) ".into(), "3".into()]]
    );
}

#[test]
fn test_condense_keeps_schema_and_group_order() {
    let t = Table::from_rows(&[
        vec!["g".into(), "v".into()],
        vec!["b".into(), "1".into()],
        vec!["a".into(), "2".into()],
        vec!["b".into(), "3".into()],
    ]);
    let got = t
        .condense(&CondenseOpts {
            lead: "g".into(),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(got.column_names(), t.column_names());
    // first-seen group order, not sorted.
    assert_eq!(got.records()[0][0].text(), "b");
    assert_eq!(got.records()[0][1].text(), "4");
    assert_eq!(got.records()[1][0].text(), "a");
}
