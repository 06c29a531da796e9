use std::fmt;
use std::rc::Rc;

use crate::error::{EvalError, EvalErrorKind};
use crate::geometry::{Coord, Geometry, GeometryKind};
use crate::namespaces;
use crate::runtime::scope::Scope;
use crate::syntax::ast::Expr;

#[derive(Debug, Clone)]
pub enum Value {
    Number(f64),
    Boolean(bool),
    Unit,
    Geometry(Geometry),
    /// A geometry type tag, from `type()` or a bare keyword.
    Type(GeometryKind),
    Closure(Rc<Closure>),
    Native(NativeFn),
}

/// A user function together with the scope it was defined in.
pub struct Closure {
    pub params: Rc<[String]>,
    pub body: Rc<Expr>,
    pub scope: Rc<Scope>,
}

impl fmt::Debug for Closure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Closure").field("params", &self.params).finish_non_exhaustive()
    }
}

/// A standard-library function, dispatched by name through its namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeFn {
    pub namespace: &'static str,
    pub name: &'static str,
    pub min_args: usize,
    pub max_args: usize,
}

impl NativeFn {
    pub fn call(&self, args: &[Value], line: usize) -> Result<Value, EvalError> {
        if !self.accepts(args.len()) {
            let expected = if self.min_args == self.max_args {
                self.min_args.to_string()
            } else if self.max_args == usize::MAX {
                format!("at least {}", self.min_args)
            } else {
                format!("{} to {}", self.min_args, self.max_args)
            };
            return Err(EvalError::arity(line, self.name, expected, args.len()));
        }
        tracing::trace!(namespace = self.namespace, name = self.name, argc = args.len(), "native call");
        namespaces::call_native(self, args, line)
    }

    pub fn accepts(&self, argc: usize) -> bool {
        (self.min_args..=self.max_args).contains(&argc)
    }
}

impl Value {
    pub fn point(c: Coord) -> Self {
        Value::Geometry(Geometry::Point(c))
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Value::Closure(_) | Value::Native(_))
    }

    pub fn as_geometry(&self) -> Option<&Geometry> {
        match self {
            Value::Geometry(g) => Some(g),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b))     => a == b,
            (Value::Boolean(a), Value::Boolean(b))   => a == b,
            (Value::Unit, Value::Unit)               => true,
            (Value::Geometry(a), Value::Geometry(b)) => a == b,
            (Value::Type(a), Value::Type(b))         => a == b,
            (Value::Closure(a), Value::Closure(b))   => {
                Rc::ptr_eq(&a.body, &b.body) && Rc::ptr_eq(&a.scope, &b.scope)
            }
            (Value::Native(a), Value::Native(b))     => a == b,
            _ => false,
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<Geometry> for Value {
    fn from(g: Geometry) -> Self {
        Value::Geometry(g)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n)   => write!(f, "{n}"),
            Value::Boolean(b)  => write!(f, "{b}"),
            Value::Unit        => f.write_str("()"),
            Value::Geometry(g) => write!(f, "{g}"),
            Value::Type(k)     => write!(f, "{k}"),
            Value::Closure(c)  => write!(f, "Function(({}) => ...)", c.params.join(", ")),
            Value::Native(n)   => write!(f, "Function({})", n.name),
        }
    }
}

// ─── Shared helpers ───────────────────────────────────────────────────────────

pub fn value_type_name(v: &Value) -> &'static str {
    match v {
        Value::Number(_)   => "Number",
        Value::Boolean(_)  => "Boolean",
        Value::Unit        => "Unit",
        Value::Geometry(g) => g.kind().name(),
        Value::Type(_)     => "Type",
        Value::Closure(_) | Value::Native(_) => "Function",
    }
}

pub fn as_number(v: &Value, line: usize) -> Result<f64, EvalError> {
    match v {
        Value::Number(n) => Ok(*n),
        _ => Err(EvalError::type_mismatch(line, format!("expected Number, got {}", value_type_name(v)))),
    }
}

pub fn as_bool(v: &Value, line: usize) -> Result<bool, EvalError> {
    match v {
        Value::Boolean(b) => Ok(*b),
        _ => Err(EvalError::type_mismatch(line, format!("expected Boolean, got {}", value_type_name(v)))),
    }
}

/// A Number holding an integral value. `what` names the operand in errors.
pub fn as_index(v: &Value, what: &str, line: usize) -> Result<i64, EvalError> {
    let n = as_number(v, line)?;
    if n.fract() != 0.0 || !n.is_finite() {
        return Err(EvalError::type_mismatch(line, format!("{what} must be an integer, got {n}")));
    }
    Ok(n as i64)
}

/// Bounds-checked position inside a list of `len` elements.
pub fn checked_index(v: &Value, len: usize, line: usize) -> Result<usize, EvalError> {
    let i = as_index(v, "index", line)?;
    usize::try_from(i)
        .ok()
        .filter(|&i| i < len)
        .ok_or_else(|| EvalError::new(EvalErrorKind::IndexOutOfRange { index: i as f64, len }, line))
}
