//! The standard library. Each namespace lists its exports and dispatches
//! calls by name; the registry holding them is built once per process and
//! never changes afterwards.

use std::sync::LazyLock;

use crate::error::{EvalError, EvalErrorKind};
use crate::geometry::{Coord, Geometry};
use crate::runtime::value::{NativeFn, Value, as_index, as_number, value_type_name};

pub mod math;
pub mod geometry;

// ─── Export ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExportKind {
    Function { min_args: usize, max_args: usize },
    Constant(f64),
}

#[derive(Debug, Clone, Copy)]
pub struct Export {
    pub name: &'static str,
    pub kind: ExportKind,
}

/// Fixed-arity function export.
pub(crate) fn func(name: &'static str, argc: usize) -> Export {
    Export { name, kind: ExportKind::Function { min_args: argc, max_args: argc } }
}

pub(crate) fn func_range(name: &'static str, min_args: usize, max_args: usize) -> Export {
    Export { name, kind: ExportKind::Function { min_args, max_args } }
}

pub(crate) fn constant(name: &'static str, value: f64) -> Export {
    Export { name, kind: ExportKind::Constant(value) }
}

// ─── Provider interface ───────────────────────────────────────────────────────

pub trait NamespaceProvider: Send + Sync {
    fn name(&self) -> &'static str;

    fn exports(&self) -> Vec<Export>;

    /// `Ok(None)` when `name` is not one of this namespace's functions.
    /// Arity has already been checked against the export.
    fn call(&self, name: &str, args: &[Value], line: usize) -> Result<Option<Value>, EvalError>;

    fn get_export(&self, name: &str) -> Option<Export> {
        self.exports().into_iter().find(|e| e.name == name)
    }
}

// ─── Registry ─────────────────────────────────────────────────────────────────

pub struct NamespaceRegistry {
    providers: Vec<Box<dyn NamespaceProvider>>,
}

impl NamespaceRegistry {
    pub fn new() -> Self { Self { providers: Vec::new() } }

    pub fn register(&mut self, p: Box<dyn NamespaceProvider>) { self.providers.push(p); }

    pub fn get(&self, name: &str) -> Option<&dyn NamespaceProvider> {
        self.providers.iter().find(|p| p.name() == name).map(|p| p.as_ref())
    }

    /// Every export as a runtime value, in registration order.
    pub fn bindings(&self) -> Vec<(&'static str, Value)> {
        self.providers
            .iter()
            .flat_map(|p| {
                let namespace = p.name();
                p.exports().into_iter().map(move |e| {
                    let value = match e.kind {
                        ExportKind::Constant(n) => Value::Number(n),
                        ExportKind::Function { min_args, max_args } => {
                            Value::Native(NativeFn { namespace, name: e.name, min_args, max_args })
                        }
                    };
                    (e.name, value)
                })
            })
            .collect()
    }

    pub fn standard() -> Self {
        let mut r = Self::new();
        r.register(Box::new(math::MathNamespace));
        r.register(Box::new(geometry::GeometryNamespace));
        r
    }
}

impl Default for NamespaceRegistry {
    fn default() -> Self { Self::standard() }
}

static STANDARD: LazyLock<NamespaceRegistry> = LazyLock::new(NamespaceRegistry::standard);

/// The process-wide standard library.
pub fn standard() -> &'static NamespaceRegistry {
    &STANDARD
}

pub fn standard_bindings() -> Vec<(&'static str, Value)> {
    STANDARD.bindings()
}

pub(crate) fn call_native(native: &NativeFn, args: &[Value], line: usize) -> Result<Value, EvalError> {
    STANDARD
        .get(native.namespace)
        .map(|ns| ns.call(native.name, args, line))
        .transpose()?
        .flatten()
        .ok_or_else(|| EvalError::new(
            EvalErrorKind::UnresolvedIdentifier(format!("{}.{}", native.namespace, native.name)),
            line,
        ))
}

// ─── Shared helpers ───────────────────────────────────────────────────────────

pub(crate) fn arg(args: &[Value], i: usize) -> &Value {
    args.get(i).unwrap_or(&Value::Unit)
}

pub(crate) fn number_arg(args: &[Value], i: usize, line: usize) -> Result<f64, EvalError> {
    as_number(arg(args, i), line)
}

/// A non-negative integral Number.
pub(crate) fn count_arg(args: &[Value], i: usize, what: &str, line: usize) -> Result<usize, EvalError> {
    let n = as_index(arg(args, i), what, line)?;
    usize::try_from(n)
        .map_err(|_| EvalError::type_mismatch(line, format!("{what} must not be negative, got {n}")))
}

pub(crate) fn geometry_arg(args: &[Value], i: usize, line: usize) -> Result<&Geometry, EvalError> {
    let v = arg(args, i);
    v.as_geometry().ok_or_else(|| {
        EvalError::type_mismatch(line, format!("expected geometry, got {}", value_type_name(v)))
    })
}

pub(crate) fn point_arg(args: &[Value], i: usize, line: usize) -> Result<Coord, EvalError> {
    match arg(args, i) {
        Value::Geometry(Geometry::Point(c)) => Ok(*c),
        other => Err(EvalError::type_mismatch(line, format!("expected Point, got {}", value_type_name(other)))),
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
