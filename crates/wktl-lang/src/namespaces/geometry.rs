use std::f64::consts::TAU;

use crate::error::{EvalError, EvalErrorKind};
use crate::geometry::{Coord, Geometry, points_approx_eq};
use crate::runtime::collection::MAX_ELEMENTS;
use crate::runtime::value::{Value, as_index, value_type_name};
use super::math::round_half_up;
use super::{Export, NamespaceProvider, arg, count_arg, func, func_range, geometry_arg, number_arg, point_arg};

pub struct GeometryNamespace;

impl NamespaceProvider for GeometryNamespace {
    fn name(&self) -> &'static str { "geometry" }

    fn exports(&self) -> Vec<Export> {
        vec![
            func("Flatten", 1),
            func("PointCircle", 2),
            func_range("PointGrid", 2, 3),
            func("ToLineString", 1),
            func("ToMultiPoint", 1),
            func("ToPolygon", 1),
            func("ToGeometryCollection", 1),
            func("Rotate", 3),
            func("Round", 2),
        ]
    }

    fn call(&self, name: &str, args: &[Value], line: usize) -> Result<Option<Value>, EvalError> {
        let g = match name {
            "Flatten" => Geometry::GeometryCollection(geometry_arg(args, 0, line)?.flatten()),
            "PointCircle" => {
                let radius = number_arg(args, 0, line)?;
                let count = count_arg(args, 1, "point count", line)?;
                point_circle(radius, count, line)?
            }
            "PointGrid" => {
                let x = count_arg(args, 0, "grid width", line)?;
                let y = count_arg(args, 1, "grid height", line)?;
                let spacing = if args.len() > 2 { number_arg(args, 2, line)? } else { 1.0 };
                point_grid(x, y, spacing, line)?
            }
            "ToLineString" => Geometry::LineString(points_list(args, line)?),
            "ToMultiPoint" => Geometry::MultiPoint(points_list(args, line)?),
            "ToPolygon" => {
                let mut ring = points_list(args, line)?;
                match (ring.first(), ring.last()) {
                    (Some(&first), Some(&last)) if !points_approx_eq(first, last) => ring.push(first),
                    _ => {}
                }
                if ring.is_empty() { Geometry::Polygon(Vec::new()) } else { Geometry::Polygon(vec![ring]) }
            }
            "ToGeometryCollection" => Geometry::GeometryCollection(
                points_list(args, line)?.into_iter().map(Geometry::Point).collect(),
            ),
            "Rotate" => {
                let angle = number_arg(args, 0, line)?;
                let origin = point_arg(args, 1, line)?;
                geometry_arg(args, 2, line)?.rotate(angle, origin)
            }
            "Round" => {
                let precision = as_index(arg(args, 0), "precision", line)?;
                if precision < 0 {
                    return Err(EvalError::type_mismatch(line, format!(
                        "precision must not be negative, got {precision}"
                    )));
                }
                return round(precision, arg(args, 1), line).map(Some);
            }
            _ => return Ok(None),
        };
        Ok(Some(Value::Geometry(g)))
    }
}

fn too_many(what: &'static str, requested: f64, line: usize) -> EvalError {
    EvalError::new(EvalErrorKind::TooManyElements { what, requested, limit: MAX_ELEMENTS }, line)
}

fn point_circle(radius: f64, count: usize, line: usize) -> Result<Geometry, EvalError> {
    if count > MAX_ELEMENTS {
        return Err(too_many("PointCircle", count as f64, line));
    }
    let step = TAU / count as f64;
    Ok(Geometry::GeometryCollection(
        (0..count)
            .map(|i| {
                let angle = i as f64 * step;
                Geometry::point(radius * angle.cos(), radius * angle.sin())
            })
            .collect(),
    ))
}

fn point_grid(x: usize, y: usize, spacing: f64, line: usize) -> Result<Geometry, EvalError> {
    let total = x
        .checked_mul(y)
        .filter(|&n| n <= MAX_ELEMENTS)
        .ok_or_else(|| too_many("PointGrid", x as f64 * y as f64, line))?;
    let mut points = Vec::with_capacity(total);
    for i in 0..x {
        for j in 0..y {
            points.push(Geometry::point(i as f64 * spacing, j as f64 * spacing));
        }
    }
    Ok(Geometry::GeometryCollection(points))
}

fn points_list(args: &[Value], line: usize) -> Result<Vec<Coord>, EvalError> {
    let v = arg(args, 0);
    v.as_geometry().and_then(Geometry::points_list).ok_or_else(|| {
        EvalError::type_mismatch(line, format!("expected geometry with points list, got {}", value_type_name(v)))
    })
}

/// Scaled values at or past 2^53 have no fractional digits left to round.
const EXACT_INTEGER_LIMIT: f64 = 9_007_199_254_740_992.0;

fn round(precision: i64, v: &Value, line: usize) -> Result<Value, EvalError> {
    let factor = i32::try_from(precision).map_or(f64::INFINITY, |p| 10f64.powi(p));
    let r = |n: f64| {
        let scaled = n * factor;
        if !factor.is_finite() || scaled.abs() >= EXACT_INTEGER_LIMIT {
            return n;
        }
        round_half_up(scaled) / factor
    };
    match v {
        Value::Number(n) => Ok(Value::Number(r(*n))),
        Value::Geometry(g) => Ok(Value::Geometry(g.map_coords(|c| Coord::new(r(c.x), r(c.y))))),
        other => Err(EvalError::type_mismatch(line, format!(
            "`Round` expects a Number or geometry, got {}", value_type_name(other)
        ))),
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
