// SPDX-License-Identifier: Apache-2.0

//! Table store invariants exercised through the public surface.
//!

use geotable::prelude::*;

fn rows(data: &[&[&str]]) -> Vec<Vec<String>> {
    data.iter()
        .map(|r| r.iter().map(|c| c.to_string()).collect())
        .collect()
}

#[test]
fn test_rows_roundtrip_is_identity() {
    let data = rows(&[
        &["city", "pop", "note"],
        &["Ulm", "126000", ""],
        &["Bonn", "330000", "x"],
    ]);
    let t = Table::from_rows(&data);
    assert_eq!(Table::from_rows(&t.to_rows()), t);
}

#[test]
fn test_summary_tracks_every_operator() {
    let mut t = Table::from_rows(&rows(&[&["a", "b"], &["1", "2"], &["3", "4"]]));
    assert_eq!(t.summary().records, 2);
    assert_eq!(t.summary().fields, 2);

    t.add_column("c");
    assert_eq!(t.summary().fields, 3);

    let selected = t.select(r#"WHERE "a" = "1""#);
    assert_eq!(selected.summary().records, selected.records().len());
    assert_eq!(selected.summary().fields, selected.fields().len());

    t.column("c").unwrap().remove();
    assert_eq!(t.summary().fields, 2);
}

#[test]
fn test_revert_twice_is_identity() {
    let mut t = Table::from_rows(&rows(&[&["n"], &["1"], &["2"], &["3"]]));
    let before = t.clone();
    t.revert();
    assert_ne!(t, before);
    t.revert();
    assert_eq!(t, before);
}

#[test]
fn test_filter_all_equals_source() {
    let t = Table::from_rows(&rows(&[&["a", "b"], &["1", "x"], &["2", "y"]]));
    assert_eq!(t.filter(|_| true), t);
}

#[test]
fn test_subtable_field_ids_match_request() {
    let t = Table::from_rows(&rows(&[&["a", "b", "c"], &["1", "2", "3"]]));
    let got = t.subtable(&["c", "a"]).unwrap();
    assert_eq!(got.column_names(), vec!["c", "a"]);
    assert_eq!(got.to_rows()[1], vec!["3", "1"]);
}

#[test]
fn test_append_then_sort_keeps_multiset() {
    let mut a = Table::from_rows(&rows(&[&["n"], &["5"], &["1"]]));
    let b = Table::from_rows(&rows(&[&["n"], &["3"]]));
    a.append(&b).unwrap();
    a.sort("n", "UP").unwrap();
    assert_eq!(
        a.to_rows()[1..],
        rows(&[&["1"], &["3"], &["5"]])
    );
}

#[test]
fn test_json_objects_keyed_by_field_id() {
    let t = Table::from_rows(&rows(&[&["a", "b"], &["1", "x"]]));
    let objs = t.json();
    assert_eq!(objs.len(), 1);
    assert_eq!(objs[0]["a"], "1");
    assert_eq!(objs[0]["b"], "x");
}

#[test]
fn test_column_handle_map_and_unique() {
    let mut t = Table::from_rows(&rows(&[&["tag"], &["x"], &["y"], &["x"]]));
    {
        let col = t.column("tag").unwrap();
        assert_eq!(col.unique_values(), vec!["x", "y"]);
    }
    t.column("tag")
        .unwrap()
        .map(|cell, _, _| Cell::Str(cell.text().to_uppercase()));
    assert_eq!(t.column("tag").unwrap().values(), vec!["X", "Y", "X"]);
}

#[test]
fn test_time_columns_from_loaded_rows() {
    let mut t = Table::from_rows(&rows(&[
        &["stamp", "v"],
        // a Sunday evening.
        &["2026-08-02T19:05:00Z", "1"],
    ]));
    t.add_time_columns(&TimeColumns {
        source: "stamp".into(),
        create: ColumnList::default(),
    })
    .unwrap();
    let r = &t.records()[0];
    assert_eq!(r[2].text(), "2.8.2026");
    assert_eq!(r[5].text(), "0");
}
