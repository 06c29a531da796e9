//! Tree-walking evaluator. The scope is threaded through every call, so
//! recursive and repeated invocations each bind their parameters in a scope
//! of their own.

use std::rc::Rc;

use crate::error::{EvalError, EvalErrorKind};
use crate::geometry::{Coord, Geometry, GeometryKind};
use crate::runtime::arithmetic::eval_arithmetic;
use crate::runtime::collection::{self, MAX_ELEMENTS};
use crate::runtime::scope::Scope;
use crate::runtime::value::{Closure, Value, as_bool, as_number, checked_index, value_type_name};
use crate::stack::ensure_sufficient_stack;
use crate::syntax::ast::{ArithOp, Element, Expr, GeometryBody, LogicalOp, PipeKind};

/// Nested calls allowed before evaluation gives up.
pub const MAX_CALL_DEPTH: usize = 2000;

#[derive(Debug, Default)]
pub struct Interpreter {
    depth: usize,
}

impl Interpreter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eval(&mut self, expr: &Expr, scope: &Rc<Scope>) -> Result<Value, EvalError> {
        ensure_sufficient_stack(|| self.eval_expr(expr, scope))
    }

    fn eval_expr(&mut self, expr: &Expr, scope: &Rc<Scope>) -> Result<Value, EvalError> {
        let line = expr.line();
        match expr {
            Expr::Number(n, _) => Ok(Value::Number(*n)),
            Expr::Bool(b, _) => Ok(Value::Boolean(*b)),
            Expr::TypeTag(kind, _) => Ok(Value::Type(*kind)),

            Expr::Ident(name, _) => scope
                .resolve(name)
                .ok_or_else(|| EvalError::new(EvalErrorKind::UnresolvedIdentifier(name.clone()), line)),

            Expr::Declaration { name, value, .. } => {
                let v = self.eval(value, scope)?;
                scope.store(name.as_str(), v);
                Ok(Value::Unit)
            }

            Expr::Sequence(items, _) => {
                let mut last = Value::Unit;
                for item in items {
                    last = self.eval(item, scope)?;
                }
                Ok(last)
            }

            Expr::Geometry { kind, body, .. } => self.eval_geometry(*kind, body, scope),

            Expr::Function { params, body, .. } => Ok(Value::Closure(Rc::new(Closure {
                params: Rc::from(params.as_slice()),
                body: Rc::clone(body),
                scope: Rc::clone(scope),
            }))),

            Expr::Call { callee, args, .. } => {
                let f = self.eval(callee, scope)?;
                let args = self.eval_args(args, scope)?;
                self.call(&f, &args, line)
            }

            Expr::Accessor { target, property, args, .. } => {
                let target = self.eval(target, scope)?;
                let args = self.eval_args(args, scope)?;
                access(&target, property, &args, line)
            }

            Expr::Pipe { kind, source, callable, .. } => {
                let f = self.eval(callable, scope)?;
                let a = self.eval(source, scope)?;
                self.eval_pipe(*kind, a, &f, line)
            }

            Expr::Concat { left, right, .. } => {
                let l = self.eval(left, scope)?;
                let r = self.eval(right, scope)?;
                collection::concat(l, r, line)
            }

            Expr::Generate { count, body, .. } => {
                let count = self.eval(count, scope)?;
                let body = self.eval(body, scope)?;
                self.eval_generate(&count, &body, line)
            }

            Expr::If { condition, then_branch, else_branch, .. } => {
                let cond = self.eval(condition, scope)?;
                if as_bool(&cond, line)? {
                    self.eval(then_branch, scope)
                } else {
                    self.eval(else_branch, scope)
                }
            }

            Expr::Arithmetic { op, left, right, .. } => {
                let l = self.eval(left, scope)?;
                let r = self.eval(right, scope)?;
                eval_arithmetic(*op, &l, &r, line)
            }

            Expr::Comparison { op, left, right, .. } => {
                let l = self.eval(left, scope)?;
                let r = self.eval(right, scope)?;
                match (&l, &r) {
                    (Value::Number(a), Value::Number(b)) => Ok(Value::Boolean(op.apply(*a, *b))),
                    _ => Err(EvalError::type_mismatch(line, format!(
                        "`{}` expects numbers, got {} and {}",
                        op.symbol(), value_type_name(&l), value_type_name(&r)
                    ))),
                }
            }

            Expr::Equality { negated, left, right, .. } => {
                let l = self.eval(left, scope)?;
                let r = self.eval(right, scope)?;
                Ok(Value::Boolean((l == r) != *negated))
            }

            Expr::Logical { op, left, right, .. } => {
                let l = as_bool(&self.eval(left, scope)?, line)?;
                let r = as_bool(&self.eval(right, scope)?, line)?;
                Ok(Value::Boolean(match op {
                    LogicalOp::And => l && r,
                    LogicalOp::Or => l || r,
                }))
            }

            Expr::Not(operand, _) => {
                let v = self.eval(operand, scope)?;
                Ok(Value::Boolean(!as_bool(&v, line)?))
            }

            Expr::Neg(operand, _) => {
                let v = self.eval(operand, scope)?;
                eval_arithmetic(ArithOp::Sub, &Value::Number(0.0), &v, line)
            }
        }
    }

    fn eval_args(&mut self, args: &[Expr], scope: &Rc<Scope>) -> Result<Vec<Value>, EvalError> {
        args.iter().map(|a| self.eval(a, scope)).collect()
    }

    // ─── Calls ────────────────────────────────────────────────────────────────

    /// Invokes a closure or a standard-library function.
    pub fn call(&mut self, f: &Value, args: &[Value], line: usize) -> Result<Value, EvalError> {
        match f {
            Value::Closure(closure) => self.call_closure(closure, args, line),
            Value::Native(native) => native.call(args, line),
            other => Err(EvalError::type_mismatch(line, format!(
                "expected Function, got {}", value_type_name(other)
            ))),
        }
    }

    fn call_closure(&mut self, closure: &Closure, args: &[Value], line: usize) -> Result<Value, EvalError> {
        if self.depth >= MAX_CALL_DEPTH {
            return Err(EvalError::new(EvalErrorKind::RecursionLimit(MAX_CALL_DEPTH), line));
        }
        tracing::trace!(params = closure.params.len(), argc = args.len(), depth = self.depth, "call");

        let frame = Scope::child(&closure.scope);
        for (param, arg) in closure.params.iter().zip(args) {
            frame.store(param.as_str(), arg.clone());
        }

        self.depth += 1;
        let result = self.eval(&closure.body, &frame);
        self.depth -= 1;

        // Only a returned closure can still reach the frame.
        if !matches!(result, Ok(Value::Closure(_))) {
            frame.release();
        }
        result
    }

    /// Pipelines hand the element index only to callables that can take it.
    fn call_element(&mut self, f: &Value, element: Value, index: usize, line: usize) -> Result<Value, EvalError> {
        match f {
            Value::Native(native) if !native.accepts(2) => self.call(f, &[element], line),
            _ => self.call(f, &[element, Value::Number(index as f64)], line),
        }
    }

    fn eval_pipe(&mut self, kind: PipeKind, source: Value, f: &Value, line: usize) -> Result<Value, EvalError> {
        if !f.is_callable() {
            return Err(EvalError::type_mismatch(line, format!(
                "`{}` expects a Function on the right, got {}", kind.symbol(), value_type_name(f)
            )));
        }
        match kind {
            PipeKind::Apply => self.call(f, &[source], line),
            PipeKind::Map => {
                collection::map_elements(&source, line, &mut |e, i| self.call_element(f, e, i, line))
            }
            PipeKind::Filter => {
                collection::filter_elements(&source, line, &mut |e, i| self.call_element(f, e, i, line))
            }
            PipeKind::DeepMap => {
                collection::deep_map(&source, line, &mut |e, i| self.call_element(f, e, i, line))
            }
        }
    }

    fn eval_generate(&mut self, count: &Value, body: &Value, line: usize) -> Result<Value, EvalError> {
        let generate_error = |msg: String| EvalError::new(EvalErrorKind::GenerateTypeError(msg), line);

        let n = match count {
            Value::Number(n) if n.fract() == 0.0 && *n >= 0.0 && *n <= MAX_ELEMENTS as f64 => *n as usize,
            Value::Number(n) if n.fract() == 0.0 && *n > 0.0 => {
                return Err(generate_error(format!("count {n} exceeds the limit of {MAX_ELEMENTS}")));
            }
            Value::Number(n) => return Err(generate_error(format!("count must be a non-negative integer, got {n}"))),
            other => return Err(generate_error(format!("count must be a Number, got {}", value_type_name(other)))),
        };
        if !body.is_callable() && body.as_geometry().is_none() {
            return Err(generate_error(format!(
                "expected a Function or geometry, got {}", value_type_name(body)
            )));
        }

        let mut items = Vec::new();
        items
            .try_reserve_exact(n)
            .map_err(|_| generate_error(format!("cannot allocate {n} elements")))?;

        match body {
            Value::Geometry(g) => items.resize(n, g.clone()),
            f => {
                for i in 0..n {
                    match self.call(f, &[Value::Number(i as f64)], line)? {
                        Value::Geometry(g) => items.push(g),
                        other => {
                            return Err(generate_error(format!(
                                "function must return a geometry, got {}", value_type_name(&other)
                            )));
                        }
                    }
                }
            }
        }
        Ok(Value::Geometry(Geometry::GeometryCollection(items)))
    }

    // ─── Geometry literals ────────────────────────────────────────────────────

    fn eval_geometry(&mut self, kind: GeometryKind, body: &GeometryBody, scope: &Rc<Scope>) -> Result<Value, EvalError> {
        let g = match body {
            GeometryBody::Empty => return Ok(Geometry::empty(kind).map_or(Value::Unit, Value::Geometry)),
            GeometryBody::Point(x, y) => Geometry::Point(self.eval_pair(x, y, scope)?),
            GeometryBody::Elements(items) => match kind {
                GeometryKind::GeometryCollection => Geometry::GeometryCollection(
                    items.iter().map(|e| self.eval_member(e, scope)).collect::<Result<_, _>>()?,
                ),
                GeometryKind::MultiPoint => Geometry::MultiPoint(self.eval_coords(items, scope)?),
                _ => Geometry::LineString(self.eval_coords(items, scope)?),
            },
            GeometryBody::Rings(rings) => {
                let rings = rings.iter().map(|r| self.eval_coords(r, scope)).collect::<Result<_, _>>()?;
                match kind {
                    GeometryKind::MultiLineString => Geometry::MultiLineString(rings),
                    _ => Geometry::Polygon(rings),
                }
            }
            GeometryBody::Polygons(polygons) => Geometry::MultiPolygon(
                polygons
                    .iter()
                    .map(|p| p.iter().map(|r| self.eval_coords(r, scope)).collect::<Result<_, _>>())
                    .collect::<Result<_, _>>()?,
            ),
        };
        Ok(Value::Geometry(g))
    }

    fn eval_pair(&mut self, x: &Expr, y: &Expr, scope: &Rc<Scope>) -> Result<Coord, EvalError> {
        let x = as_number(&self.eval(x, scope)?, x.line())?;
        let y = as_number(&self.eval(y, scope)?, y.line())?;
        Ok(Coord::new(x, y))
    }

    /// A coordinate slot: an inline pair or an expression yielding a Point.
    fn eval_coord(&mut self, element: &Element, scope: &Rc<Scope>) -> Result<Coord, EvalError> {
        match element {
            Element::Pair(x, y) => self.eval_pair(x, y, scope),
            Element::Value(e) => match self.eval(e, scope)? {
                Value::Geometry(Geometry::Point(c)) => Ok(c),
                other => Err(EvalError::type_mismatch(e.line(), format!(
                    "expected Point in coordinate list, got {}", value_type_name(&other)
                ))),
            },
        }
    }

    fn eval_coords(&mut self, elements: &[Element], scope: &Rc<Scope>) -> Result<Vec<Coord>, EvalError> {
        elements.iter().map(|e| self.eval_coord(e, scope)).collect()
    }

    /// A GeometryCollection member: an inline pair becomes a Point.
    fn eval_member(&mut self, element: &Element, scope: &Rc<Scope>) -> Result<Geometry, EvalError> {
        match element {
            Element::Pair(x, y) => Ok(Geometry::Point(self.eval_pair(x, y, scope)?)),
            Element::Value(e) => match self.eval(e, scope)? {
                Value::Geometry(g) => Ok(g),
                other => Err(EvalError::type_mismatch(e.line(), format!(
                    "GeometryCollection members must be geometries, got {}", value_type_name(&other)
                ))),
            },
        }
    }
}

// ─── Accessors ────────────────────────────────────────────────────────────────

fn expect_argc(property: &str, args: &[Value], expected: usize, line: usize) -> Result<(), EvalError> {
    if args.len() != expected {
        return Err(EvalError::arity(line, property, expected.to_string(), args.len()));
    }
    Ok(())
}

fn access(target: &Value, property: &str, args: &[Value], line: usize) -> Result<Value, EvalError> {
    let Value::Geometry(g) = target else {
        return Err(EvalError::type_mismatch(line, format!(
            "`:{property}` expects a geometry, got {}", value_type_name(target)
        )));
    };
    let prop = property.to_ascii_lowercase();

    match (g, prop.as_str()) {
        (_, "type") => {
            expect_argc(property, args, 0, line)?;
            Ok(Value::Type(g.kind()))
        }

        (Geometry::Point(c), "x" | "y") => match args {
            [] => Ok(Value::Number(if prop == "x" { c.x } else { c.y })),
            [v] => {
                let n = as_number(v, line)?;
                let moved = if prop == "x" { Coord::new(n, c.y) } else { Coord::new(c.x, n) };
                Ok(Value::point(moved))
            }
            _ => Err(EvalError::arity(line, property, "0 or 1", args.len())),
        },

        (Geometry::GeometryCollection(gs), "numgeometries") => {
            expect_argc(property, args, 0, line)?;
            Ok(Value::Number(gs.len() as f64))
        }
        (Geometry::GeometryCollection(gs), "geometryn") => {
            expect_argc(property, args, 1, line)?;
            let i = checked_index(&args[0], gs.len(), line)?;
            Ok(Value::Geometry(gs[i].clone()))
        }

        (Geometry::LineString(cs), "numpoints") => {
            expect_argc(property, args, 0, line)?;
            Ok(Value::Number(cs.len() as f64))
        }
        (Geometry::LineString(cs), "pointn") => {
            expect_argc(property, args, 1, line)?;
            let i = checked_index(&args[0], cs.len(), line)?;
            Ok(Value::point(cs[i]))
        }

        _ => Err(EvalError::new(
            EvalErrorKind::PropertyNotAccessible { property: property.to_string(), target: g.kind().name() },
            line,
        )),
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
