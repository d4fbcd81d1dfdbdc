// SPDX-License-Identifier: Apache-2.0

#![warn(missing_docs)]

//! Decode Well-Known-Binary geometries into GeoJSON strings.
//!
//! See the [OpenGIS® Implementation Standard for Geographic information -
//! Simple feature access - Part 1: Common architecture][1] for the byte
//! layout: byte 0 is the byte-order indicator, bytes 1-4 the geometry
//! type, then the type-specific payload.
//!
//! Only the 2D Point, LineString and Polygon types are decoded. Everything
//! else --the Multi* family, collections, and any blob that fails to
//! decode-- degrades to a hex sentinel object instead of an error, because
//! a geometry cell the map layer cannot draw is still a cell.
//!
//! [1]: http://portal.opengeospatial.org/files/?artifact_id=25355
//!

mod byte_order;

pub(crate) use byte_order::ByteOrder;

use crate::{MyError, value::fmt_num};
use regex::Regex;
use std::fmt::Write as _;
use std::sync::OnceLock;

// Parse 4 bytes, starting at index `start`, as LE or BE and return a `u32`.
fn unsigned(bo: &ByteOrder, buffer: &[u8], start: usize) -> Result<u32, MyError> {
    let b4 = buffer
        .get(start..start + 4)
        .ok_or_else(|| MyError::Format("WKB: truncated u32".into()))?;
    let it = if bo.is_le() {
        u32::from_le_bytes(b4.try_into()?)
    } else {
        u32::from_be_bytes(b4.try_into()?)
    };
    Ok(it)
}

// Parse 8 bytes, starting at index `start`, as LE or BE and return an `f64`.
fn double(bo: &ByteOrder, buffer: &[u8], start: usize) -> Result<f64, MyError> {
    let b8 = buffer
        .get(start..start + 8)
        .ok_or_else(|| MyError::Format("WKB: truncated f64".into()))?;
    let it = if bo.is_le() {
        f64::from_le_bytes(b8.try_into()?)
    } else {
        f64::from_be_bytes(b8.try_into()?)
    };
    Ok(it)
}

// (x, y) pair.
fn pair(bo: &ByteOrder, ba: &[u8], pos: usize) -> Result<(f64, f64), MyError> {
    Ok((double(bo, ba, pos)?, double(bo, ba, pos + 8)?))
}

/// Decode a WKB blob into a GeoJSON string; never fails --anything not
/// decodable comes back as the `{"type":"WKB",…}` hex sentinel.
pub fn wkb_to_geojson(ba: &[u8]) -> String {
    match decode(ba) {
        Ok(x) => x,
        Err(_) => sentinel(ba, geom_type(ba).unwrap_or(0)),
    }
}

fn geom_type(ba: &[u8]) -> Result<u32, MyError> {
    let b0 = *ba
        .first()
        .ok_or_else(|| MyError::Format("WKB: empty input".into()))?;
    let bo = ByteOrder::from(b0 & 0x01);
    unsigned(&bo, ba, 1)
}

fn decode(ba: &[u8]) -> Result<String, MyError> {
    let b0 = *ba
        .first()
        .ok_or_else(|| MyError::Format("WKB: empty input".into()))?;
    let bo = &ByteOrder::from(b0 & 0x01);
    let gt = unsigned(bo, ba, 1)?;
    let mut pos = 5;
    match gt {
        1 => {
            let (x, y) = pair(bo, ba, pos)?;
            Ok(point_json(x, y))
        }
        2 => {
            let count = unsigned(bo, ba, pos)? as usize;
            pos += 4;
            let mut pts = Vec::with_capacity(count);
            for _ in 0..count {
                pts.push(pair(bo, ba, pos)?);
                pos += 16;
            }
            Ok(linestring_json(&pts))
        }
        3 => {
            let rings = unsigned(bo, ba, pos)? as usize;
            pos += 4;
            let mut xy = Vec::with_capacity(rings);
            for _ in 0..rings {
                let count = unsigned(bo, ba, pos)? as usize;
                pos += 4;
                let mut ring = Vec::with_capacity(count);
                for _ in 0..count {
                    ring.push(pair(bo, ba, pos)?);
                    pos += 16;
                }
                xy.push(ring);
            }
            Ok(polygon_json(&xy))
        }
        // Multi* + collections are not decoded.
        x => Ok(sentinel(ba, x)),
    }
}

fn sentinel(ba: &[u8], gt: u32) -> String {
    serde_json::json!({
        "type": "WKB",
        "wkb": hex(ba),
        "geomType": gt,
    })
    .to_string()
}

fn hex(ba: &[u8]) -> String {
    let mut out = String::with_capacity(ba.len() * 2);
    for b in ba {
        let _ = write!(out, "{b:02x}");
    }
    out
}

/// A compact GeoJSON Point. Numbers print the host way: no trailing `.0`.
pub(crate) fn point_json(x: f64, y: f64) -> String {
    format!(
        r#"{{"type":"Point","coordinates":[{},{}]}}"#,
        fmt_num(x),
        fmt_num(y)
    )
}

pub(crate) fn linestring_json(pts: &[(f64, f64)]) -> String {
    format!(
        r#"{{"type":"LineString","coordinates":{}}}"#,
        coords(pts)
    )
}

pub(crate) fn polygon_json(rings: &[Vec<(f64, f64)>]) -> String {
    let inner: Vec<String> = rings.iter().map(|r| coords(r)).collect();
    format!(
        r#"{{"type":"Polygon","coordinates":[{}]}}"#,
        inner.join(",")
    )
}

fn coords(pts: &[(f64, f64)]) -> String {
    let inner: Vec<String> = pts
        .iter()
        .map(|(x, y)| format!("[{},{}]", fmt_num(*x), fmt_num(*y)))
        .collect();
    format!("[{}]", inner.join(","))
}

fn wkt_rx() -> &'static Regex {
    static RX: OnceLock<Regex> = OnceLock::new();
    RX.get_or_init(|| {
        Regex::new(
            r"^(?i)(POINT|LINESTRING|POLYGON|MULTIPOINT|MULTILINESTRING|MULTIPOLYGON|GEOMETRYCOLLECTION)\s*\(",
        )
        .expect("valid WKT pattern")
    })
}

/// TRUE when the text opens like a WKT geometry.
pub(crate) fn looks_like_wkt(s: &str) -> bool {
    wkt_rx().is_match(s)
}

/// Convert WKT text: a single `POINT` is decoded, everything else is
/// wrapped as `{"type":"WKT","wkt":…}` for the caller to forward verbatim.
pub fn wkt_to_geojson(s: &str) -> String {
    let wrapped = || {
        serde_json::json!({
            "type": "WKT",
            "wkt": s,
        })
        .to_string()
    };
    let Some(caps) = wkt_rx().captures(s) else {
        return wrapped();
    };
    if !caps[1].eq_ignore_ascii_case("POINT") {
        return wrapped();
    }
    let inner = s
        .find('(')
        .and_then(|open| s.rfind(')').map(|close| &s[open + 1..close]));
    let Some(inner) = inner else {
        return wrapped();
    };
    let parts: Vec<&str> = inner.split_whitespace().collect();
    if let [x, y] = parts[..]
        && let (Ok(x), Ok(y)) = (x.parse::<f64>(), y.parse::<f64>())
    {
        return point_json(x, y);
    }
    wrapped()
}

/// Route any textual geometry cell: JSON objects pass through, WKT is
/// converted, anything else passes through untouched.
pub fn text_geometry_to_geojson(s: &str) -> String {
    let t = s.trim_start();
    if t.starts_with('{') {
        return s.to_owned();
    }
    if looks_like_wkt(t) {
        return wkt_to_geojson(t);
    }
    s.to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn le_point(x: f64, y: f64) -> Vec<u8> {
        let mut ba = vec![0x01, 0x01, 0x00, 0x00, 0x00];
        ba.extend_from_slice(&x.to_le_bytes());
        ba.extend_from_slice(&y.to_le_bytes());
        ba
    }

    #[test]
    fn test_point_le() {
        let got = wkb_to_geojson(&le_point(1.0, 2.0));
        assert_eq!(got, r#"{"type":"Point","coordinates":[1,2]}"#);
    }

    #[test]
    fn test_point_be() {
        let mut ba = vec![0x00, 0x00, 0x00, 0x00, 0x01];
        ba.extend_from_slice(&3.5_f64.to_be_bytes());
        ba.extend_from_slice(&(-4.0_f64).to_be_bytes());
        let got = wkb_to_geojson(&ba);
        assert_eq!(got, r#"{"type":"Point","coordinates":[3.5,-4]}"#);
    }

    #[test]
    fn test_linestring() {
        let mut ba = vec![0x01, 0x02, 0x00, 0x00, 0x00];
        ba.extend_from_slice(&2u32.to_le_bytes());
        for v in [0.0_f64, 0.0, 1.0, 1.0] {
            ba.extend_from_slice(&v.to_le_bytes());
        }
        let got = wkb_to_geojson(&ba);
        assert_eq!(
            got,
            r#"{"type":"LineString","coordinates":[[0,0],[1,1]]}"#
        );
    }

    #[test]
    fn test_polygon() {
        let mut ba = vec![0x01, 0x03, 0x00, 0x00, 0x00];
        ba.extend_from_slice(&1u32.to_le_bytes());
        ba.extend_from_slice(&4u32.to_le_bytes());
        for v in [0.0_f64, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 0.0] {
            ba.extend_from_slice(&v.to_le_bytes());
        }
        let got = wkb_to_geojson(&ba);
        assert_eq!(
            got,
            r#"{"type":"Polygon","coordinates":[[[0,0],[1,0],[1,1],[0,0]]]}"#
        );
    }

    #[test]
    fn test_multi_becomes_sentinel() {
        let mut ba = vec![0x01, 0x04, 0x00, 0x00, 0x00];
        ba.extend_from_slice(&0u32.to_le_bytes());
        let got = wkb_to_geojson(&ba);
        assert!(got.contains(r#""type":"WKB""#));
        assert!(got.contains(r#""wkb":"010400000000000000""#));
        assert!(got.contains(r#""geomType":4"#));
    }

    #[test]
    fn test_truncated_becomes_sentinel() {
        let got = wkb_to_geojson(&[0x01, 0x01, 0x00, 0x00, 0x00, 0x99]);
        assert!(got.contains(r#""type":"WKB""#));
    }

    #[test]
    fn test_wkt_point_is_decoded() {
        assert_eq!(
            wkt_to_geojson("POINT(12.5 -3)"),
            r#"{"type":"Point","coordinates":[12.5,-3]}"#
        );
    }

    #[test]
    fn test_wkt_other_is_wrapped() {
        let got = wkt_to_geojson("LINESTRING(0 0, 1 1)");
        assert_eq!(
            got,
            r#"{"type":"WKT","wkt":"LINESTRING(0 0, 1 1)"}"#
        );
    }

    #[test]
    fn test_text_json_passes_through() {
        let s = r#"{"type":"Point","coordinates":[9,9]}"#;
        assert_eq!(text_geometry_to_geojson(s), s);
    }
}
