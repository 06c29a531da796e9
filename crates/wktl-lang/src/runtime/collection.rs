//! `++` and the element-wise halves of the `||`, `|>` and `|*` pipelines.
//!
//! The pipeline helpers take the callback as a closure so this module never
//! needs to know how functions are invoked.

use std::mem;

use crate::error::EvalError;
use crate::geometry::{Coord, Geometry};
use crate::runtime::value::{Value, as_bool, value_type_name};

/// Most elements one `Generate` or standard-library constructor may produce.
pub const MAX_ELEMENTS: usize = 1 << 24;

/// Callback for one element: the element and its index.
pub type ElementFn<'a> = dyn FnMut(Value, usize) -> Result<Value, EvalError> + 'a;

pub fn concat(left: Value, right: Value, line: usize) -> Result<Value, EvalError> {
    let (a, b) = match (left, right) {
        (Value::Geometry(a), Value::Geometry(b)) => (a, b),
        (l, r) => {
            return Err(EvalError::type_mismatch(line, format!(
                "`++` expects geometries, got {} and {}",
                value_type_name(&l), value_type_name(&r)
            )));
        }
    };

    Ok(Value::Geometry(join(a, b)))
}

fn join(mut a: Geometry, mut b: Geometry) -> Geometry {
    let merged = match (&mut a, &mut b) {
        (
            Geometry::LineString(xs) | Geometry::MultiPoint(xs),
            Geometry::LineString(ys) | Geometry::MultiPoint(ys),
        ) => {
            xs.append(ys);
            true
        }
        (Geometry::LineString(xs) | Geometry::MultiPoint(xs), Geometry::Point(p)) => {
            xs.push(*p);
            true
        }
        (Geometry::GeometryCollection(xs), Geometry::GeometryCollection(ys)) => {
            xs.append(ys);
            true
        }
        (Geometry::GeometryCollection(xs), other) => {
            xs.push(mem::replace(other, Geometry::GeometryCollection(Vec::new())));
            true
        }
        _ => false,
    };
    if merged { a } else { Geometry::GeometryCollection(vec![a, b]) }
}

// ─── Pipelines ───────────────────────────────────────────────────────────────

fn not_array_like(v: &Value, line: usize) -> EvalError {
    EvalError::type_mismatch(line, format!("expected array-like geometry, got {}", value_type_name(v)))
}

fn expect_point(v: Value, line: usize) -> Result<Coord, EvalError> {
    match v {
        Value::Geometry(Geometry::Point(c)) => Ok(c),
        other => Err(EvalError::type_mismatch(line, format!(
            "callback must return a Point, got {}", value_type_name(&other)
        ))),
    }
}

fn expect_geometry(v: Value, line: usize) -> Result<Geometry, EvalError> {
    match v {
        Value::Geometry(g) => Ok(g),
        other => Err(EvalError::type_mismatch(line, format!(
            "callback must return a geometry, got {}", value_type_name(&other)
        ))),
    }
}

/// `a || f`
pub fn map_elements(source: &Value, line: usize, f: &mut ElementFn<'_>) -> Result<Value, EvalError> {
    let mapped = match source {
        Value::Geometry(Geometry::LineString(cs)) => Geometry::LineString(map_coords(cs, line, f)?),
        Value::Geometry(Geometry::MultiPoint(cs)) => Geometry::MultiPoint(map_coords(cs, line, f)?),
        Value::Geometry(Geometry::GeometryCollection(gs)) => Geometry::GeometryCollection(
            gs.iter()
                .enumerate()
                .map(|(i, g)| expect_geometry(f(Value::Geometry(g.clone()), i)?, line))
                .collect::<Result<_, _>>()?,
        ),
        other => return Err(not_array_like(other, line)),
    };
    Ok(Value::Geometry(mapped))
}

fn map_coords(cs: &[Coord], line: usize, f: &mut ElementFn<'_>) -> Result<Vec<Coord>, EvalError> {
    cs.iter()
        .enumerate()
        .map(|(i, c)| expect_point(f(Value::point(*c), i)?, line))
        .collect()
}

/// `a |> f`
pub fn filter_elements(source: &Value, line: usize, f: &mut ElementFn<'_>) -> Result<Value, EvalError> {
    let mut keep = |v: Value, i: usize| -> Result<bool, EvalError> { as_bool(&f(v, i)?, line) };

    let filtered = match source {
        Value::Geometry(Geometry::LineString(cs)) => Geometry::LineString(filter_coords(cs, &mut keep)?),
        Value::Geometry(Geometry::MultiPoint(cs)) => Geometry::MultiPoint(filter_coords(cs, &mut keep)?),
        Value::Geometry(Geometry::GeometryCollection(gs)) => {
            let mut out = Vec::new();
            for (i, g) in gs.iter().enumerate() {
                if keep(Value::Geometry(g.clone()), i)? {
                    out.push(g.clone());
                }
            }
            Geometry::GeometryCollection(out)
        }
        other => return Err(not_array_like(other, line)),
    };
    Ok(Value::Geometry(filtered))
}

fn filter_coords(
    cs: &[Coord],
    keep: &mut impl FnMut(Value, usize) -> Result<bool, EvalError>,
) -> Result<Vec<Coord>, EvalError> {
    let mut out = Vec::new();
    for (i, c) in cs.iter().enumerate() {
        if keep(Value::point(*c), i)? {
            out.push(*c);
        }
    }
    Ok(out)
}

/// `a |* f`: every coordinate at any depth goes through `f` as a Point.
pub fn deep_map(source: &Value, line: usize, f: &mut ElementFn<'_>) -> Result<Value, EvalError> {
    let Value::Geometry(g) = source else {
        return Err(EvalError::type_mismatch(line, format!(
            "`|*` expects a geometry, got {}", value_type_name(source)
        )));
    };
    let mut index = 0;
    let mapped = g.try_map_coords(&mut |c| {
        let out = expect_point(f(Value::point(c), index)?, line);
        index += 1;
        out
    })?;
    Ok(Value::Geometry(mapped))
}

// ─── Tests ───────────────────────────────────────────────────────────────────
