//! The geometry kernel: planar coordinates, the seven WKT shapes, the
//! coordinate walks used by arithmetic broadcasting and `|*`, rotation, and
//! WKT text output.
//!
//! Only X and Y are stored. Z and M are dropped by the parser.

use std::fmt;
use std::mem;

use crate::stack::ensure_sufficient_stack;

/// Tolerance for [`points_approx_eq`], six decimal places.
pub const APPROX_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coord {
    pub x: f64,
    pub y: f64,
}

impl Coord {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Applies `op` to each axis pairwise.
    pub fn zip_with(self, other: Coord, op: impl Fn(f64, f64) -> f64) -> Coord {
        Coord::new(op(self.x, other.x), op(self.y, other.y))
    }
}

impl From<(f64, f64)> for Coord {
    fn from((x, y): (f64, f64)) -> Self {
        Coord::new(x, y)
    }
}

pub fn points_approx_eq(a: Coord, b: Coord) -> bool {
    (a.x - b.x).abs() <= APPROX_EPSILON && (a.y - b.y).abs() <= APPROX_EPSILON
}

// ─── Kinds ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeometryKind {
    Point,
    LineString,
    Polygon,
    MultiPoint,
    MultiLineString,
    MultiPolygon,
    GeometryCollection,
}

impl GeometryKind {
    pub const ALL: [GeometryKind; 7] = [
        GeometryKind::Point,
        GeometryKind::LineString,
        GeometryKind::Polygon,
        GeometryKind::MultiPoint,
        GeometryKind::MultiLineString,
        GeometryKind::MultiPolygon,
        GeometryKind::GeometryCollection,
    ];

    /// Case-insensitive match against the whole WKT keyword.
    pub fn from_keyword(word: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.keyword().eq_ignore_ascii_case(word))
    }

    /// Upper-case WKT tag.
    pub fn keyword(self) -> &'static str {
        match self {
            GeometryKind::Point              => "POINT",
            GeometryKind::LineString         => "LINESTRING",
            GeometryKind::Polygon            => "POLYGON",
            GeometryKind::MultiPoint         => "MULTIPOINT",
            GeometryKind::MultiLineString    => "MULTILINESTRING",
            GeometryKind::MultiPolygon       => "MULTIPOLYGON",
            GeometryKind::GeometryCollection => "GEOMETRYCOLLECTION",
        }
    }

    /// Type name as reported by `type()` and GeoJSON.
    pub fn name(self) -> &'static str {
        match self {
            GeometryKind::Point              => "Point",
            GeometryKind::LineString         => "LineString",
            GeometryKind::Polygon            => "Polygon",
            GeometryKind::MultiPoint         => "MultiPoint",
            GeometryKind::MultiLineString    => "MultiLineString",
            GeometryKind::MultiPolygon       => "MultiPolygon",
            GeometryKind::GeometryCollection => "GeometryCollection",
        }
    }
}

impl fmt::Display for GeometryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ─── Geometry ────────────────────────────────────────────────────────────────

pub enum Geometry {
    Point(Coord),
    LineString(Vec<Coord>),
    /// First ring is the exterior.
    Polygon(Vec<Vec<Coord>>),
    MultiPoint(Vec<Coord>),
    MultiLineString(Vec<Vec<Coord>>),
    MultiPolygon(Vec<Vec<Vec<Coord>>>),
    GeometryCollection(Vec<Geometry>),
}

impl Geometry {
    pub fn point(x: f64, y: f64) -> Self {
        Geometry::Point(Coord::new(x, y))
    }

    pub fn kind(&self) -> GeometryKind {
        match self {
            Geometry::Point(_)              => GeometryKind::Point,
            Geometry::LineString(_)         => GeometryKind::LineString,
            Geometry::Polygon(_)            => GeometryKind::Polygon,
            Geometry::MultiPoint(_)         => GeometryKind::MultiPoint,
            Geometry::MultiLineString(_)    => GeometryKind::MultiLineString,
            Geometry::MultiPolygon(_)       => GeometryKind::MultiPolygon,
            Geometry::GeometryCollection(_) => GeometryKind::GeometryCollection,
        }
    }

    /// The `KEYWORD EMPTY` value of a kind. A point has no empty form.
    pub fn empty(kind: GeometryKind) -> Option<Self> {
        Some(match kind {
            GeometryKind::Point              => return None,
            GeometryKind::LineString         => Geometry::LineString(Vec::new()),
            GeometryKind::Polygon            => Geometry::Polygon(Vec::new()),
            GeometryKind::MultiPoint         => Geometry::MultiPoint(Vec::new()),
            GeometryKind::MultiLineString    => Geometry::MultiLineString(Vec::new()),
            GeometryKind::MultiPolygon       => Geometry::MultiPolygon(Vec::new()),
            GeometryKind::GeometryCollection => Geometry::GeometryCollection(Vec::new()),
        })
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Geometry::Point(_)               => false,
            Geometry::LineString(c)          => c.is_empty(),
            Geometry::Polygon(r)             => r.is_empty(),
            Geometry::MultiPoint(c)          => c.is_empty(),
            Geometry::MultiLineString(l)     => l.is_empty(),
            Geometry::MultiPolygon(p)        => p.is_empty(),
            Geometry::GeometryCollection(g)  => g.is_empty(),
        }
    }

    /// Rebuilds the geometry with every coordinate passed through `f`,
    /// descending through rings, members and nested collections.
    pub fn try_map_coords<E, F>(&self, f: &mut F) -> Result<Geometry, E>
    where
        F: FnMut(Coord) -> Result<Coord, E>,
    {
        fn line<E, F: FnMut(Coord) -> Result<Coord, E>>(cs: &[Coord], f: &mut F) -> Result<Vec<Coord>, E> {
            cs.iter().map(|c| f(*c)).collect()
        }
        fn rings<E, F: FnMut(Coord) -> Result<Coord, E>>(rs: &[Vec<Coord>], f: &mut F) -> Result<Vec<Vec<Coord>>, E> {
            rs.iter().map(|r| line(r, f)).collect()
        }

        Ok(match self {
            Geometry::Point(c)              => Geometry::Point(f(*c)?),
            Geometry::LineString(cs)        => Geometry::LineString(line(cs, f)?),
            Geometry::MultiPoint(cs)        => Geometry::MultiPoint(line(cs, f)?),
            Geometry::Polygon(rs)           => Geometry::Polygon(rings(rs, f)?),
            Geometry::MultiLineString(ls)   => Geometry::MultiLineString(rings(ls, f)?),
            Geometry::MultiPolygon(ps)      => Geometry::MultiPolygon(
                ps.iter().map(|p| rings(p, f)).collect::<Result<_, _>>()?,
            ),
            Geometry::GeometryCollection(gs) => Geometry::GeometryCollection(ensure_sufficient_stack(|| {
                gs.iter().map(|g| g.try_map_coords(f)).collect::<Result<_, _>>()
            })?),
        })
    }

    pub fn map_coords(&self, mut f: impl FnMut(Coord) -> Coord) -> Geometry {
        let result: Result<Geometry, std::convert::Infallible> = self.try_map_coords(&mut |c| Ok(f(c)));
        match result {
            Ok(g) => g,
            Err(never) => match never {},
        }
    }

    /// Every coordinate in traversal order.
    pub fn coords(&self) -> Vec<Coord> {
        let mut out = Vec::new();
        self.map_coords(|c| {
            out.push(c);
            c
        });
        out
    }

    /// Counter-clockwise rotation by `degrees` around `pivot`.
    pub fn rotate(&self, degrees: f64, pivot: Coord) -> Geometry {
        let (sin, cos) = degrees.to_radians().sin_cos();
        self.map_coords(|c| {
            let dx = c.x - pivot.x;
            let dy = c.y - pivot.y;
            Coord::new(pivot.x + dx * cos - dy * sin, pivot.y + dx * sin + dy * cos)
        })
    }

    /// Depth-first list of every non-collection member.
    pub fn flatten(&self) -> Vec<Geometry> {
        let mut out = Vec::new();
        self.flatten_into(&mut out);
        out
    }

    fn flatten_into(&self, out: &mut Vec<Geometry>) {
        match self {
            Geometry::GeometryCollection(gs) => {
                ensure_sufficient_stack(|| gs.iter().for_each(|g| g.flatten_into(out)));
            }
            other => out.push(other.clone()),
        }
    }

    /// The ordered point list of a LineString, a MultiPoint, or a
    /// GeometryCollection made only of Points.
    pub fn points_list(&self) -> Option<Vec<Coord>> {
        match self {
            Geometry::LineString(cs) | Geometry::MultiPoint(cs) => Some(cs.clone()),
            Geometry::GeometryCollection(gs) => gs
                .iter()
                .map(|g| match g {
                    Geometry::Point(c) => Some(*c),
                    _ => None,
                })
                .collect(),
            _ => None,
        }
    }
}

// ─── WKT output ──────────────────────────────────────────────────────────────

struct Seq<'a, T>(&'a [T], fn(&T, &mut fmt::Formatter<'_>) -> fmt::Result);

impl<T> fmt::Display for Seq<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, item) in self.0.iter().enumerate() {
            if i > 0 { f.write_str(", ")?; }
            (self.1)(item, f)?;
        }
        f.write_str(")")
    }
}

fn write_coord(c: &Coord, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} {}", c.x, c.y)
}

fn write_line(cs: &Vec<Coord>, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", Seq(cs, write_coord))
}

fn write_polygon(rs: &Vec<Vec<Coord>>, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", Seq(rs, write_line))
}

fn write_point_member(c: &Coord, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "({} {})", c.x, c.y)
}

fn write_geometry(g: &Geometry, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{g}")
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind().keyword())?;
        if self.is_empty() {
            return f.write_str(" EMPTY");
        }
        f.write_str(" ")?;
        match self {
            Geometry::Point(c)               => write!(f, "({} {})", c.x, c.y),
            Geometry::LineString(cs)         => write!(f, "{}", Seq(cs, write_coord)),
            Geometry::Polygon(rs)            => write!(f, "{}", Seq(rs, write_line)),
            Geometry::MultiPoint(cs)         => write!(f, "{}", Seq(cs, write_point_member)),
            Geometry::MultiLineString(ls)    => write!(f, "{}", Seq(ls, write_line)),
            Geometry::MultiPolygon(ps)       => write!(f, "{}", Seq(ps, write_polygon)),
            Geometry::GeometryCollection(gs) => {
                ensure_sufficient_stack(|| write!(f, "{}", Seq(gs, write_geometry)))
            }
        }
    }
}

// ─── Nesting ─────────────────────────────────────────────────────────────────
//
// Collections can nest arbitrarily deep, so the recursive impls grow the
// stack at each collection and drop unnests into a work list.

impl Clone for Geometry {
    fn clone(&self) -> Self {
        match self {
            Geometry::Point(c)               => Geometry::Point(*c),
            Geometry::LineString(cs)         => Geometry::LineString(cs.clone()),
            Geometry::Polygon(rs)            => Geometry::Polygon(rs.clone()),
            Geometry::MultiPoint(cs)         => Geometry::MultiPoint(cs.clone()),
            Geometry::MultiLineString(ls)    => Geometry::MultiLineString(ls.clone()),
            Geometry::MultiPolygon(ps)       => Geometry::MultiPolygon(ps.clone()),
            Geometry::GeometryCollection(gs) => {
                Geometry::GeometryCollection(ensure_sufficient_stack(|| gs.clone()))
            }
        }
    }
}

impl PartialEq for Geometry {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Geometry::Point(a), Geometry::Point(b)) => a == b,
            (Geometry::LineString(a), Geometry::LineString(b))
            | (Geometry::MultiPoint(a), Geometry::MultiPoint(b)) => a == b,
            (Geometry::Polygon(a), Geometry::Polygon(b))
            | (Geometry::MultiLineString(a), Geometry::MultiLineString(b)) => a == b,
            (Geometry::MultiPolygon(a), Geometry::MultiPolygon(b)) => a == b,
            (Geometry::GeometryCollection(a), Geometry::GeometryCollection(b)) => {
                ensure_sufficient_stack(|| a == b)
            }
            _ => false,
        }
    }
}

impl fmt::Debug for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut t = f.debug_tuple(self.kind().name());
        match self {
            Geometry::Point(c) => { t.field(c); }
            Geometry::LineString(cs) | Geometry::MultiPoint(cs) => { t.field(cs); }
            Geometry::Polygon(rs) | Geometry::MultiLineString(rs) => { t.field(rs); }
            Geometry::MultiPolygon(ps) => { t.field(ps); }
            Geometry::GeometryCollection(gs) => ensure_sufficient_stack(|| { t.field(gs); }),
        }
        t.finish()
    }
}

impl Drop for Geometry {
    fn drop(&mut self) {
        let Geometry::GeometryCollection(members) = self else { return };
        if !members.iter().any(|g| matches!(g, Geometry::GeometryCollection(_))) {
            return;
        }
        let mut pending = mem::take(members);
        while let Some(mut g) = pending.pop() {
            if let Geometry::GeometryCollection(inner) = &mut g {
                pending.append(inner);
            }
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
