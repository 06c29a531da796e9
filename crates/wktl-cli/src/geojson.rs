//! GeoJSON output. Geometries become GeoJSON geometry objects; any other
//! value is written as a plain JSON scalar.

use serde_json::{Value as Json, json};
use wktl_lang::{Coord, Geometry, Value};

pub fn encode(value: &Value) -> Json {
    match value {
        Value::Geometry(g) => geometry(g),
        Value::Number(n) => json!(n),
        Value::Boolean(b) => json!(b),
        Value::Unit => Json::Null,
        other => Json::String(other.to_string()),
    }
}

fn position(c: &Coord) -> Json {
    json!([c.x, c.y])
}

fn positions(cs: &[Coord]) -> Json {
    Json::Array(cs.iter().map(position).collect())
}

fn rings(rs: &[Vec<Coord>]) -> Json {
    Json::Array(rs.iter().map(|r| positions(r)).collect())
}

pub fn geometry(g: &Geometry) -> Json {
    let kind = g.kind().name();
    let coordinates = match g {
        Geometry::Point(c) => position(c),
        Geometry::LineString(cs) | Geometry::MultiPoint(cs) => positions(cs),
        Geometry::Polygon(rs) | Geometry::MultiLineString(rs) => rings(rs),
        Geometry::MultiPolygon(ps) => Json::Array(ps.iter().map(|p| rings(p)).collect()),
        Geometry::GeometryCollection(gs) => {
            return json!({
                "type": kind,
                "geometries": gs.iter().map(geometry).collect::<Vec<_>>(),
            });
        }
    };
    json!({ "type": kind, "coordinates": coordinates })
}
