// SPDX-License-Identifier: Apache-2.0

//! Parquet pipeline scenarios through the feed facade, over real files.
//!

use geotable::prelude::*;
use polars::prelude::*;
use std::io::Write as _;

fn parquet_file(df: &mut DataFrame) -> tempfile::NamedTempFile {
    let mut buf: Vec<u8> = Vec::new();
    ParquetWriter::new(&mut buf).finish(df).expect("writable");
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(&buf).expect("write");
    file
}

#[tokio::test]
async fn test_file_backed_parquet_feed() {
    let mut df = df!(
        "city" => ["Ulm", "Bonn", "Kiel"],
        "pop" => [126_000i64, 330_000, 246_000],
    )
    .unwrap();
    let file = parquet_file(&mut df);

    let t = feed(FeedOptions::new(
        Source::Url(file.path().to_string_lossy().into_owned()),
        SourceKind::Parquet,
    ))
    .load()
    .await
    .unwrap();

    // exactly N records and C fields.
    assert_eq!(t.summary().records, 3);
    assert_eq!(t.summary().fields, 2);
    assert_eq!(t.fields()[1].kind, FieldKind::Number);

    // and the result is a first-class table for the operator layer.
    let big = t.select(r#"WHERE "pop" >= "200000""#);
    assert_eq!(big.summary().records, 2);
}

#[tokio::test]
async fn test_geoparquet_kind_forces_geometry_conversion() {
    let mut point = vec![0x01u8, 0x01, 0x00, 0x00, 0x00];
    point.extend_from_slice(&9.0_f64.to_le_bytes());
    point.extend_from_slice(&48.5_f64.to_le_bytes());
    let mut df = df!(
        "name" => ["a"],
        // a column name outside the geo heuristics; the kind decides.
        "blob0" => [point.as_slice()],
    )
    .unwrap();
    let file = parquet_file(&mut df);

    let t = feed(FeedOptions::new(
        Source::Url(file.path().to_string_lossy().into_owned()),
        SourceKind::GeoParquet,
    ))
    .load()
    .await
    .unwrap();
    assert_eq!(
        t.records()[0][1].text(),
        r#"{"type":"Point","coordinates":[9,48.5]}"#
    );
}

#[tokio::test]
async fn test_blob_source() {
    let mut df = df!("n" => [1i64, 2]).unwrap();
    let mut buf: Vec<u8> = Vec::new();
    ParquetWriter::new(&mut buf).finish(&mut df).unwrap();

    let t = feed(FeedOptions::new(Source::Blob(buf), SourceKind::Parquet))
        .load()
        .await
        .unwrap();
    assert_eq!(t.summary().records, 2);
}

#[tokio::test]
async fn test_dates_come_out_iso8601() {
    let days = Series::new("d".into(), &[0i32, 19_723])
        .cast(&DataType::Date)
        .unwrap();
    let mut df = DataFrame::new(vec![days.into()]).unwrap();
    let file = parquet_file(&mut df);

    let t = feed(FeedOptions::new(
        Source::Url(file.path().to_string_lossy().into_owned()),
        SourceKind::Parquet,
    ))
    .load()
    .await
    .unwrap();
    assert_eq!(t.records()[0][0].text(), "1970-01-01");
    assert_eq!(t.records()[1][0].text(), "2024-01-01");
}
