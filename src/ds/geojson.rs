// SPDX-License-Identifier: Apache-2.0

#![warn(missing_docs)]

//! GeoJSON feature collections, and TopoJSON topologies converted into
//! them on the way in.
//!

use crate::{MyError, table::value_text};
use serde_json::{Map, Value, json};
use tracing::debug;

/// Extract the 2-D cell array from a GeoJSON value: one row per feature,
/// one column per property key (union over all features, first-seen
/// order) plus a trailing `geometry` column holding the geometry
/// JSON-stringified.
pub(crate) fn rows_from_geojson(value: &Value) -> Result<Vec<Vec<String>>, MyError> {
    let features: Vec<&Value> = if let Some(x) = value.get("features").and_then(Value::as_array) {
        x.iter().collect()
    } else if let Some(x) = value.as_array() {
        x.iter().collect()
    } else if value.get("type").and_then(Value::as_str) == Some("Feature") {
        vec![value]
    } else {
        return Err(MyError::Format("GeoJSON holds no features".into()));
    };

    let mut keys: Vec<String> = Vec::new();
    for f in &features {
        if let Some(props) = f.get("properties").and_then(Value::as_object) {
            for k in props.keys() {
                if !keys.iter().any(|x| x == k) {
                    keys.push(k.clone());
                }
            }
        }
    }

    let mut header = keys.clone();
    header.push("geometry".to_owned());
    let mut out = Vec::with_capacity(features.len() + 1);
    out.push(header);
    for f in &features {
        let empty = Map::new();
        let props = f
            .get("properties")
            .and_then(Value::as_object)
            .unwrap_or(&empty);
        let mut row: Vec<String> = keys
            .iter()
            .map(|k| props.get(k).map(value_text).unwrap_or_default())
            .collect();
        let geometry = f
            .get("geometry")
            .map(Value::to_string)
            .unwrap_or_default();
        row.push(geometry);
        out.push(row);
    }
    Ok(out)
}

/// Convert a TopoJSON topology --the named object, or the first one-- into
/// GeoJSON features and route them through the GeoJSON path.
pub(crate) fn rows_from_topojson(
    value: &Value,
    name: Option<&str>,
) -> Result<Vec<Vec<String>>, MyError> {
    let objects = value
        .get("objects")
        .and_then(Value::as_object)
        .ok_or_else(|| MyError::Format("TopoJSON w/o an 'objects' member".into()))?;
    let object = match name {
        Some(n) => objects
            .get(n)
            .ok_or_else(|| MyError::Format(format!("TopoJSON has no object '{n}'").into()))?,
        None => objects
            .values()
            .next()
            .ok_or_else(|| MyError::Format("TopoJSON 'objects' is empty".into()))?,
    };

    let transform = Transform::from_value(value.get("transform"));
    let arcs = decode_arcs(value.get("arcs"), &transform)?;

    let geometries: Vec<&Value> = match object.get("geometries").and_then(Value::as_array) {
        Some(x) => x.iter().collect(),
        None => vec![object],
    };
    let features: Vec<Value> = geometries
        .iter()
        .map(|g| {
            json!({
                "type": "Feature",
                "properties": g.get("properties").cloned().unwrap_or(Value::Null),
                "geometry": geometry_to_geojson(g, &arcs, &transform),
            })
        })
        .collect();
    rows_from_geojson(&json!({ "type": "FeatureCollection", "features": features }))
}

// quantization transform; identity when the topology is not quantized.
struct Transform {
    scale: (f64, f64),
    translate: (f64, f64),
    quantized: bool,
}

impl Transform {
    fn from_value(value: Option<&Value>) -> Self {
        let pair = |v: Option<&Value>, default| {
            v.and_then(Value::as_array)
                .filter(|x| x.len() == 2)
                .map(|x| {
                    (
                        x[0].as_f64().unwrap_or(default),
                        x[1].as_f64().unwrap_or(default),
                    )
                })
        };
        match value {
            Some(t) => Self {
                scale: pair(t.get("scale"), 1.0).unwrap_or((1.0, 1.0)),
                translate: pair(t.get("translate"), 0.0).unwrap_or((0.0, 0.0)),
                quantized: true,
            },
            None => Self {
                scale: (1.0, 1.0),
                translate: (0.0, 0.0),
                quantized: false,
            },
        }
    }

    fn point(&self, x: f64, y: f64) -> (f64, f64) {
        (
            x * self.scale.0 + self.translate.0,
            y * self.scale.1 + self.translate.1,
        )
    }
}

// decode every arc once: quantized arcs are delta-encoded and transformed,
// unquantized ones are absolute positions.
fn decode_arcs(value: Option<&Value>, transform: &Transform) -> Result<Vec<Vec<(f64, f64)>>, MyError> {
    let Some(arcs) = value.and_then(Value::as_array) else {
        return Ok(Vec::new());
    };
    let mut out = Vec::with_capacity(arcs.len());
    for arc in arcs {
        let positions = arc
            .as_array()
            .ok_or_else(|| MyError::Format("TopoJSON arc is not an array".into()))?;
        let mut decoded = Vec::with_capacity(positions.len());
        let (mut x, mut y) = (0.0, 0.0);
        for p in positions {
            let pair = p
                .as_array()
                .filter(|v| v.len() >= 2)
                .ok_or_else(|| MyError::Format("TopoJSON position is not a pair".into()))?;
            let px = pair[0].as_f64().unwrap_or(0.0);
            let py = pair[1].as_f64().unwrap_or(0.0);
            if transform.quantized {
                x += px;
                y += py;
                decoded.push(transform.point(x, y));
            } else {
                decoded.push((px, py));
            }
        }
        out.push(decoded);
    }
    Ok(out)
}

// stitch the arc indices of one ring/line: a negative index means the
// complement arc (~i) reversed; the first position of every arc after the
// first duplicates the previous arc's last and is skipped.
fn stitch(indices: &[Value], arcs: &[Vec<(f64, f64)>]) -> Vec<(f64, f64)> {
    let mut out: Vec<(f64, f64)> = Vec::new();
    for idx in indices {
        let Some(i) = idx.as_i64() else { continue };
        let (ai, reversed) = if i < 0 {
            ((-1 - i) as usize, true)
        } else {
            (i as usize, false)
        };
        let Some(arc) = arcs.get(ai) else {
            debug!("TopoJSON references arc #{ai} which does not exist");
            continue;
        };
        let mut part: Vec<(f64, f64)> = arc.clone();
        if reversed {
            part.reverse();
        }
        let skip = usize::from(!out.is_empty());
        out.extend(part.into_iter().skip(skip));
    }
    out
}

fn coords_json(pts: &[(f64, f64)]) -> Value {
    Value::Array(pts.iter().map(|(x, y)| json!([x, y])).collect())
}

fn geometry_to_geojson(g: &Value, arcs: &[Vec<(f64, f64)>], transform: &Transform) -> Value {
    let gt = g.get("type").and_then(Value::as_str).unwrap_or_default();
    let arc_refs = g.get("arcs").and_then(Value::as_array);
    match gt {
        "Point" => {
            let c = g.get("coordinates").and_then(Value::as_array);
            let (x, y) = c
                .filter(|v| v.len() >= 2)
                .map(|v| (v[0].as_f64().unwrap_or(0.0), v[1].as_f64().unwrap_or(0.0)))
                .unwrap_or((0.0, 0.0));
            let (x, y) = if transform.quantized {
                transform.point(x, y)
            } else {
                (x, y)
            };
            json!({ "type": "Point", "coordinates": [x, y] })
        }
        "LineString" => {
            let line = arc_refs.map(|x| stitch(x, arcs)).unwrap_or_default();
            json!({ "type": "LineString", "coordinates": coords_json(&line) })
        }
        "Polygon" => {
            let rings: Vec<Value> = arc_refs
                .map(|x| {
                    x.iter()
                        .filter_map(Value::as_array)
                        .map(|ring| coords_json(&stitch(ring, arcs)))
                        .collect()
                })
                .unwrap_or_default();
            json!({ "type": "Polygon", "coordinates": rings })
        }
        "MultiPolygon" => {
            let polys: Vec<Value> = arc_refs
                .map(|x| {
                    x.iter()
                        .filter_map(Value::as_array)
                        .map(|poly| {
                            Value::Array(
                                poly.iter()
                                    .filter_map(Value::as_array)
                                    .map(|ring| coords_json(&stitch(ring, arcs)))
                                    .collect(),
                            )
                        })
                        .collect()
                })
                .unwrap_or_default();
            json!({ "type": "MultiPolygon", "coordinates": polys })
        }
        "MultiLineString" => {
            let lines: Vec<Value> = arc_refs
                .map(|x| {
                    x.iter()
                        .filter_map(Value::as_array)
                        .map(|line| coords_json(&stitch(line, arcs)))
                        .collect()
                })
                .unwrap_or_default();
            json!({ "type": "MultiLineString", "coordinates": lines })
        }
        x => {
            debug!("TopoJSON geometry type '{x}' passes through unconverted");
            g.clone()
        }
    }
}
