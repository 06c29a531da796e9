use std::mem;
use std::rc::Rc;

use crate::geometry::GeometryKind;

/// Source location attached to every node for error reporting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Span {
    pub line: usize,
    pub column: usize,
}

impl Span {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

// ─── Geometry literals ───────────────────────────────────────────────────────

/// One slot of a coordinate list.
#[derive(Debug, Clone)]
pub enum Element {
    /// `x y` written inline; Z and M are already dropped.
    Pair(Expr, Expr),
    /// Any expression producing a geometry (a Point inside coordinate lists).
    Value(Expr),
}

#[derive(Debug, Clone)]
pub enum GeometryBody {
    /// `KEYWORD EMPTY`
    Empty,
    /// `POINT (x y)`
    Point(Box<Expr>, Box<Expr>),
    /// LineString, MultiPoint and GeometryCollection.
    Elements(Vec<Element>),
    /// Polygon rings, or the lines of a MultiLineString.
    Rings(Vec<Vec<Element>>),
    /// MultiPolygon.
    Polygons(Vec<Vec<Vec<Element>>>),
}

impl GeometryBody {
    /// Moves every expression out, leaving `Empty`.
    fn take_exprs(&mut self, out: &mut Vec<Expr>) {
        let elements: Vec<Element> = match mem::replace(self, GeometryBody::Empty) {
            GeometryBody::Empty => return,
            GeometryBody::Point(x, y) => vec![Element::Pair(*x, *y)],
            GeometryBody::Elements(els) => els,
            GeometryBody::Rings(rings) => rings.into_iter().flatten().collect(),
            GeometryBody::Polygons(polys) => polys.into_iter().flatten().flatten().collect(),
        };
        for el in elements {
            match el {
                Element::Pair(x, y) => out.extend([x, y]),
                Element::Value(e) => out.push(e),
            }
        }
    }
}

// ─── Expressions ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum Expr {
    Number(f64, Span),
    Bool(bool, Span),
    Ident(String, Span),

    /// A bare geometry keyword, e.g. the right side of `g:type() == Polygon`.
    TypeTag(GeometryKind, Span),

    /// `name = value`
    Declaration {
        name: String,
        value: Box<Expr>,
        span: Span,
    },

    /// `a; b; c`, empty items dropped
    Sequence(Vec<Expr>, Span),

    /// `LINESTRING (1 1, 2 2)`
    Geometry {
        kind: GeometryKind,
        body: GeometryBody,
        span: Span,
    },

    /// `Function((a, b) => a + b)`
    Function {
        params: Vec<String>,
        body: Rc<Expr>,
        span: Span,
    },

    /// `f(a, b)`
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
        span: Span,
    },

    /// `g:pointN(0)`
    Accessor {
        target: Box<Expr>,
        property: String,
        args: Vec<Expr>,
        span: Span,
    },

    /// `a | f`, `a || f`, `a |> f`, `a |* f`
    Pipe {
        kind: PipeKind,
        source: Box<Expr>,
        callable: Box<Expr>,
        span: Span,
    },

    /// `a ++ b`
    Concat {
        left: Box<Expr>,
        right: Box<Expr>,
        span: Span,
    },

    /// `Generate n f`
    Generate {
        count: Box<Expr>,
        body: Box<Expr>,
        span: Span,
    },

    /// `if c then (a) else (b)`
    If {
        condition: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
        span: Span,
    },

    /// `a + b`, `a ^ b`, etc.
    Arithmetic {
        op: ArithOp,
        left: Box<Expr>,
        right: Box<Expr>,
        span: Span,
    },

    /// `a < b`
    Comparison {
        op: CompareOp,
        left: Box<Expr>,
        right: Box<Expr>,
        span: Span,
    },

    /// `a == b`, `a != b`
    Equality {
        negated: bool,
        left: Box<Expr>,
        right: Box<Expr>,
        span: Span,
    },

    /// `a and b`, `a or b`
    Logical {
        op: LogicalOp,
        left: Box<Expr>,
        right: Box<Expr>,
        span: Span,
    },

    /// `!a`
    Not(Box<Expr>, Span),

    /// `-a`
    Neg(Box<Expr>, Span),
}

impl Expr {
    pub fn span(&self) -> &Span {
        match self {
            Expr::Number(_, s)   => s,
            Expr::Bool(_, s)     => s,
            Expr::Ident(_, s)    => s,
            Expr::TypeTag(_, s)  => s,
            Expr::Sequence(_, s) => s,
            Expr::Not(_, s)      => s,
            Expr::Neg(_, s)      => s,
            Expr::Declaration { span, .. } => span,
            Expr::Geometry { span, .. }    => span,
            Expr::Function { span, .. }    => span,
            Expr::Call { span, .. }        => span,
            Expr::Accessor { span, .. }    => span,
            Expr::Pipe { span, .. }        => span,
            Expr::Concat { span, .. }      => span,
            Expr::Generate { span, .. }    => span,
            Expr::If { span, .. }          => span,
            Expr::Arithmetic { span, .. }  => span,
            Expr::Comparison { span, .. }  => span,
            Expr::Equality { span, .. }    => span,
            Expr::Logical { span, .. }     => span,
        }
    }

    pub fn line(&self) -> usize {
        self.span().line
    }
}

fn take(slot: &mut Box<Expr>) -> Expr {
    mem::replace(&mut **slot, Expr::Bool(false, Span::new(0, 0)))
}

impl Expr {
    /// Moves this node's subexpressions into `out`.
    fn take_children(&mut self, out: &mut Vec<Expr>) {
        match self {
            Expr::Number(..) | Expr::Bool(..) | Expr::Ident(..) | Expr::TypeTag(..) => {}
            Expr::Declaration { value, .. } => out.push(take(value)),
            Expr::Sequence(items, _) => out.append(items),
            Expr::Geometry { body, .. } => body.take_exprs(out),
            Expr::Function { body, .. } => {
                if let Some(body) = Rc::get_mut(body) {
                    out.push(mem::replace(body, Expr::Bool(false, Span::new(0, 0))));
                }
            }
            Expr::Call { callee: inner, args, .. } | Expr::Accessor { target: inner, args, .. } => {
                out.push(take(inner));
                out.append(args);
            }
            Expr::Generate { count: left, body: right, .. }
            | Expr::Pipe { source: left, callable: right, .. }
            | Expr::Concat { left, right, .. }
            | Expr::Arithmetic { left, right, .. }
            | Expr::Comparison { left, right, .. }
            | Expr::Equality { left, right, .. }
            | Expr::Logical { left, right, .. } => out.extend([take(left), take(right)]),
            Expr::If { condition, then_branch, else_branch, .. } => {
                out.extend([take(condition), take(then_branch), take(else_branch)]);
            }
            Expr::Not(inner, _) | Expr::Neg(inner, _) => out.push(take(inner)),
        }
    }
}

// Deeply nested programs would otherwise overflow the stack on drop.
impl Drop for Expr {
    fn drop(&mut self) {
        let mut pending = Vec::new();
        self.take_children(&mut pending);
        while let Some(mut e) = pending.pop() {
            e.take_children(&mut pending);
        }
    }
}

// ─── Operators ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithOp {
    Add, Sub, Mul, Div, Mod, Pow,
}

impl ArithOp {
    pub fn symbol(self) -> &'static str {
        match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::Div => "/",
            ArithOp::Mod => "%",
            ArithOp::Pow => "^",
        }
    }

    /// The scalar operator applied at the coordinate level.
    pub fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            ArithOp::Add => a + b,
            ArithOp::Sub => a - b,
            ArithOp::Mul => a * b,
            ArithOp::Div => a / b,
            ArithOp::Mod => a % b,
            ArithOp::Pow => a.powf(b),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Lt, LtEq, Gt, GtEq,
}

impl CompareOp {
    pub fn symbol(self) -> &'static str {
        match self {
            CompareOp::Lt   => "<",
            CompareOp::LtEq => "<=",
            CompareOp::Gt   => ">",
            CompareOp::GtEq => ">=",
        }
    }

    pub fn apply(self, a: f64, b: f64) -> bool {
        match self {
            CompareOp::Lt   => a < b,
            CompareOp::LtEq => a <= b,
            CompareOp::Gt   => a > b,
            CompareOp::GtEq => a >= b,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipeKind {
    /// `|`
    Apply,
    /// `||`
    Map,
    /// `|>`
    Filter,
    /// `|*`
    DeepMap,
}

impl PipeKind {
    pub fn symbol(self) -> &'static str {
        match self {
            PipeKind::Apply   => "|",
            PipeKind::Map     => "||",
            PipeKind::Filter  => "|>",
            PipeKind::DeepMap => "|*",
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
