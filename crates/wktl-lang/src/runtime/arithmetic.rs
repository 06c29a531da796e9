//! Type-dispatched `+ - * / % ^`.
//!
//! Numbers meet numbers directly. A number meeting a geometry acts as the
//! point `(n, n)`. Points combine axis-wise, equal-length LineStrings and
//! MultiPoints combine index-wise, and a point meeting any other shape is
//! broadcast over every coordinate of that shape. Operand order is kept
//! throughout, so `Point(8 9) / g` divides 8 and 9 by each coordinate of `g`.

use crate::error::{EvalError, EvalErrorKind};
use crate::geometry::{Coord, Geometry};
use crate::runtime::value::{Value, value_type_name};
use crate::syntax::ast::ArithOp;

pub fn eval_arithmetic(op: ArithOp, left: &Value, right: &Value, line: usize) -> Result<Value, EvalError> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok(Value::Number(op.apply(*a, *b))),
        (Value::Number(n), Value::Geometry(g)) => {
            geometry_op(op, &Geometry::point(*n, *n), g, line).map(Value::Geometry)
        }
        (Value::Geometry(g), Value::Number(n)) => {
            geometry_op(op, g, &Geometry::point(*n, *n), line).map(Value::Geometry)
        }
        (Value::Geometry(a), Value::Geometry(b)) => geometry_op(op, a, b, line).map(Value::Geometry),
        _ => Err(EvalError::type_mismatch(line, format!(
            "`{}` expects numbers or geometries, got {} and {}",
            op.symbol(), value_type_name(left), value_type_name(right)
        ))),
    }
}

fn geometry_op(op: ArithOp, left: &Geometry, right: &Geometry, line: usize) -> Result<Geometry, EvalError> {
    let apply = |a: Coord, b: Coord| a.zip_with(b, |x, y| op.apply(x, y));

    match (left, right) {
        (Geometry::Point(a), Geometry::Point(b)) => Ok(Geometry::Point(apply(*a, *b))),

        (Geometry::LineString(a), Geometry::LineString(b)) => {
            pairwise(op, a, b, line).map(Geometry::LineString)
        }
        (Geometry::MultiPoint(a), Geometry::MultiPoint(b)) => {
            pairwise(op, a, b, line).map(Geometry::MultiPoint)
        }

        (Geometry::Point(p), other) => Ok(other.map_coords(|c| apply(*p, c))),
        (other, Geometry::Point(p)) => Ok(other.map_coords(|c| apply(c, *p))),

        _ => Err(EvalError::new(
            EvalErrorKind::OperationNotSupported {
                op: op.symbol(),
                left: left.kind().name(),
                right: right.kind().name(),
            },
            line,
        )),
    }
}

fn pairwise(op: ArithOp, a: &[Coord], b: &[Coord], line: usize) -> Result<Vec<Coord>, EvalError> {
    if a.len() != b.len() {
        return Err(EvalError::new(
            EvalErrorKind::ShapeMismatch { op: op.symbol(), left: a.len(), right: b.len() },
            line,
        ));
    }
    Ok(a.iter().zip(b).map(|(p, q)| p.zip_with(*q, |x, y| op.apply(x, y))).collect())
}

// ─── Tests ───────────────────────────────────────────────────────────────────
