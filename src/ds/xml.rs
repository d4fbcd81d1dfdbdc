// SPDX-License-Identifier: Apache-2.0

#![warn(missing_docs)]

//! Row extraction from XML feeds: RSS items, KML placemarks and GML
//! feature members.
//!
//! All three share the same child-name-driven shape: a repeated item
//! element whose first occurrence defines the columns. The geometry-aware
//! kinds additionally land their coordinates in a dedicated column as a
//! GeoJSON string.
//!

use crate::{
    MyError,
    wkb::{point_json, polygon_json},
};
use quick_xml::{Reader, events::Event};
use tracing::debug;

// the minimal element tree the extractors walk.
#[derive(Debug, Default)]
struct Elem {
    name: String,
    text: String,
    children: Vec<Elem>,
}

impl Elem {
    fn child(&self, name: &str) -> Option<&Elem> {
        self.children.iter().find(|c| c.name == name)
    }

    // depth-first search for the first descendant w/ the given name.
    fn find(&self, name: &str) -> Option<&Elem> {
        for c in &self.children {
            if c.name == name {
                return Some(c);
            }
            if let Some(x) = c.find(name) {
                return Some(x);
            }
        }
        None
    }

    fn find_all<'a>(&'a self, name: &str, out: &mut Vec<&'a Elem>) {
        for c in &self.children {
            if c.name == name {
                out.push(c);
            } else {
                c.find_all(name, out);
            }
        }
    }

    fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

// namespace prefixes carry no meaning for column naming.
fn local_name(raw: &[u8]) -> String {
    let s = String::from_utf8_lossy(raw);
    match s.rsplit_once(':') {
        Some((_, local)) => local.to_owned(),
        None => s.into_owned(),
    }
}

fn parse_xml(text: &str) -> Result<Elem, MyError> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);
    let mut stack: Vec<Elem> = vec![Elem::default()];
    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                stack.push(Elem {
                    name: local_name(e.name().as_ref()),
                    ..Default::default()
                });
            }
            Event::Empty(e) => {
                let elem = Elem {
                    name: local_name(e.name().as_ref()),
                    ..Default::default()
                };
                if let Some(top) = stack.last_mut() {
                    top.children.push(elem);
                }
            }
            Event::Text(t) => {
                if let Some(top) = stack.last_mut() {
                    match t.unescape() {
                        Ok(x) => top.text.push_str(&x),
                        Err(_) => top.text.push_str(&String::from_utf8_lossy(&t)),
                    }
                }
            }
            Event::CData(t) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(&t));
                }
            }
            Event::End(_) => {
                if stack.len() > 1 {
                    let done = stack.pop().expect("non-empty stack");
                    if let Some(top) = stack.last_mut() {
                        top.children.push(done);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    stack
        .pop()
        .ok_or_else(|| MyError::Format("XML w/o a root".into()))
}

// the generic child-name-driven extraction: the first item defines the
// columns, every item contributes one row of its children's texts.
fn items_to_rows(items: &[&Elem]) -> Vec<Vec<String>> {
    let Some(first) = items.first() else {
        return Vec::new();
    };
    let columns: Vec<String> = first
        .children
        .iter()
        .filter(|c| c.is_leaf())
        .map(|c| c.name.clone())
        .collect();
    let mut out = Vec::with_capacity(items.len() + 1);
    out.push(columns.clone());
    for item in items {
        out.push(
            columns
                .iter()
                .map(|name| {
                    item.child(name)
                        .map(|c| c.text.clone())
                        .unwrap_or_default()
                })
                .collect(),
        );
    }
    out
}

/// Rows from an RSS channel: one per `<item>`.
pub(crate) fn rss_rows(text: &str) -> Result<Vec<Vec<String>>, MyError> {
    let root = parse_xml(text)?;
    let mut items = Vec::new();
    root.find_all("item", &mut items);
    Ok(items_to_rows(&items))
}

/// Rows from KML: one per `<Placemark>`, w/ the point landing in a
/// `KML.Point` column as a GeoJSON string.
pub(crate) fn kml_rows(text: &str) -> Result<Vec<Vec<String>>, MyError> {
    let root = parse_xml(text)?;
    let mut marks = Vec::new();
    root.find_all("Placemark", &mut marks);
    let mut rows = items_to_rows(&marks);
    if rows.is_empty() {
        return Ok(rows);
    }
    rows[0].push("KML.Point".to_owned());
    for (row, mark) in rows.iter_mut().skip(1).zip(marks.iter()) {
        let point = mark
            .find("Point")
            .and_then(|p| p.child("coordinates"))
            .and_then(|c| kml_point(&c.text))
            .unwrap_or_default();
        row.push(point);
    }
    Ok(rows)
}

// "lon,lat[,alt]" per the KML coordinates order.
fn kml_point(text: &str) -> Option<String> {
    let mut parts = text.trim().split(',');
    let lon: f64 = parts.next()?.trim().parse().ok()?;
    let lat: f64 = parts.next()?.trim().parse().ok()?;
    Some(point_json(lon, lat))
}

/// Rows from GML: one per `<featureMember>`, w/ any `<Polygon>` hand
/// parsed into a `GML.Geometry` column. GML coordinate pairs arrive as
/// `lat,lon` and are swapped into the GeoJSON `(lon, lat)` order.
pub(crate) fn gml_rows(text: &str) -> Result<Vec<Vec<String>>, MyError> {
    let root = parse_xml(text)?;
    let mut members = Vec::new();
    root.find_all("featureMember", &mut members);
    // each member wraps one feature element; the feature's leaf children
    // are the columns.
    let features: Vec<&Elem> = members
        .iter()
        .filter_map(|m| m.children.first())
        .collect();
    let mut rows = items_to_rows(&features);
    if rows.is_empty() {
        return Ok(rows);
    }
    rows[0].push("GML.Geometry".to_owned());
    for (row, feature) in rows.iter_mut().skip(1).zip(features.iter()) {
        let polygon = feature
            .find("Polygon")
            .and_then(|p| p.find("coordinates"))
            .map(|c| gml_polygon(&c.text))
            .unwrap_or_default();
        row.push(polygon);
    }
    Ok(rows)
}

fn gml_polygon(text: &str) -> String {
    let mut ring: Vec<(f64, f64)> = Vec::new();
    for pair in text.split_whitespace() {
        let mut parts = pair.split(',');
        let lat = parts.next().and_then(|x| x.trim().parse::<f64>().ok());
        let lon = parts.next().and_then(|x| x.trim().parse::<f64>().ok());
        match (lat, lon) {
            (Some(lat), Some(lon)) => ring.push((lon, lat)),
            _ => debug!("GML: skipping malformed coordinate pair '{pair}'"),
        }
    }
    polygon_json(&[ring])
}
