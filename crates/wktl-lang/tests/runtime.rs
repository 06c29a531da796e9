//! Runtime behavior tests.
//!
//! Tests the full stack: source text → `evaluate` → Value. Geometry results
//! are flattened to coordinate tuples so expectations read like the literals.

use pretty_assertions::assert_eq;
use wktl_lang::{Error, ErrorCode, EvalErrorKind, Geometry, GeometryKind, Scope, Value, evaluate};

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn run(src: &str) -> Value {
    evaluate(src, None).unwrap_or_else(|e| panic!("evaluate failed: {e}"))
}

fn run_err(src: &str) -> EvalErrorKind {
    match evaluate(src, None) {
        Ok(v) => panic!("expected evaluation to fail, got {v}"),
        Err(Error::Eval(e)) => e.kind,
        Err(e) => panic!("expected runtime error, not syntax error: {e}"),
    }
}

fn geom(v: &Value) -> &Geometry {
    match v {
        Value::Geometry(g) => g,
        other => panic!("expected geometry, got {other:?}"),
    }
}

fn num(v: &Value) -> f64 {
    match v {
        Value::Number(n) => *n,
        other => panic!("expected Number, got {other:?}"),
    }
}

/// Coordinates of a Point, LineString or MultiPoint.
fn coords(v: &Value) -> Vec<(f64, f64)> {
    match geom(v) {
        Geometry::Point(c) => vec![(c.x, c.y)],
        Geometry::LineString(cs) | Geometry::MultiPoint(cs) => cs.iter().map(|c| (c.x, c.y)).collect(),
        other => panic!("expected a flat geometry, got {}", other.kind()),
    }
}

fn rings(v: &Value) -> Vec<Vec<(f64, f64)>> {
    match geom(v) {
        Geometry::Polygon(rs) | Geometry::MultiLineString(rs) => {
            rs.iter().map(|r| r.iter().map(|c| (c.x, c.y)).collect()).collect()
        }
        other => panic!("expected rings, got {}", other.kind()),
    }
}

fn members(v: &Value) -> &[Geometry] {
    match geom(v) {
        Geometry::GeometryCollection(gs) => gs,
        other => panic!("expected GeometryCollection, got {}", other.kind()),
    }
}

/// Coordinates of a collection made of Points.
fn member_points(v: &Value) -> Vec<(f64, f64)> {
    members(v)
        .iter()
        .map(|g| match g {
            Geometry::Point(c) => (c.x, c.y),
            other => panic!("expected Point member, got {}", other.kind()),
        })
        .collect()
}

// ─── Geometry literals ───────────────────────────────────────────────────────

#[test]
fn point_with_nested_arithmetic() {
    assert_eq!(coords(&run("Point (4 ((((12))) + (3 * 2.5) + 4))")), vec![(4.0, 23.5)]);
    assert_eq!(
        coords(&run("Point (2 (1 + (3^9) * 14894.5325 / -24.53))")),
        vec![(2.0, -11951449.599164288)]
    );
}

#[test]
fn linestring_mixes_pairs_and_points() {
    let v = run("LineString (4 (12 + (3 * 2.5) + 4), 24.56 85.24, POINT(2 3), Point(5 5) + Point(25 5))");
    assert_eq!(coords(&v), vec![(4.0, 23.5), (24.56, 85.24), (2.0, 3.0), (30.0, 10.0)]);
}

#[test]
fn polygon_ring() {
    let v = run("Polygon ((30 10, 40 40, 20 40, 10 20, (30+1) (10/2), Point(5 5) + Point(25 5)))");
    assert_eq!(
        rings(&v),
        vec![vec![(30.0, 10.0), (40.0, 40.0), (20.0, 40.0), (10.0, 20.0), (31.0, 5.0), (30.0, 10.0)]]
    );
}

#[test]
fn multipoint_forms() {
    let expected = vec![(10.0, 40.0), (40.0, 30.0), (20.0, 20.0), (30.0, 10.0)];
    assert_eq!(coords(&run("MULTIPOINT ((10 40), (40 30), (20 20), (30 10))")), expected);
    assert_eq!(coords(&run("MULTIPOINT (10 40, 40 30, 20 20, 30 10)")), expected);
    assert_eq!(
        coords(&run("MULTIPOINT ((10 40), Point(40 30), Point(10 10) + Point(10 10), 30 10)")),
        expected
    );
}

#[test]
fn multipolygon() {
    let v = run(
        "MULTIPOLYGON (((30 20, (45 40), Point(10 40), Point((15 * 2) (25 - 5)))),
            ((15 5, Point(4 1) * Point(10 10), 10 20, 5 10, 15 5)))",
    );
    let Geometry::MultiPolygon(polys) = geom(&v) else { panic!("expected MultiPolygon") };
    assert_eq!(polys.len(), 2);
    let first: Vec<_> = polys[0][0].iter().map(|c| (c.x, c.y)).collect();
    assert_eq!(first, vec![(30.0, 20.0), (45.0, 40.0), (10.0, 40.0), (30.0, 20.0)]);
    let second: Vec<_> = polys[1][0].iter().map(|c| (c.x, c.y)).collect();
    assert_eq!(second, vec![(15.0, 5.0), (40.0, 10.0), (10.0, 20.0), (5.0, 10.0), (15.0, 5.0)]);
}

#[test]
fn multilinestring() {
    let v = run(
        "MULTILINESTRING ((10 10, Point(20 (10 * 2)), Point(10 10) * Point(1 4)),
            (40 40, 30 30, 40 20, 30 10))",
    );
    assert_eq!(
        rings(&v),
        vec![
            vec![(10.0, 10.0), (20.0, 20.0), (10.0, 40.0)],
            vec![(40.0, 40.0), (30.0, 30.0), (40.0, 20.0), (30.0, 10.0)],
        ]
    );
}

#[test]
fn collection_of_shapes() {
    let v = run(
        "GeometryCollection(
            Point (4 (12 + (3 * 2.5) + 4)),
            LineString (4 (12 + (3 * 2.5) + 4), 24.56 85.24),
            Polygon ((1 2, 3 4, 5 6, 1 2))
        )",
    );
    let kinds: Vec<_> = members(&v).iter().map(Geometry::kind).collect();
    assert_eq!(kinds, vec![GeometryKind::Point, GeometryKind::LineString, GeometryKind::Polygon]);
}

#[test]
fn empty_geometries() {
    assert!(members(&run("GeometryCollection()")).is_empty());
    assert_eq!(member_points(&run("GeometryCollection() ++ Point(1 1)")), vec![(1.0, 1.0)]);
    assert_eq!(run("POINT EMPTY"), Value::Unit);
    assert_eq!(run("polygon empty"), Value::Geometry(Geometry::Polygon(vec![])));
}

#[test]
fn wkt_output() {
    assert_eq!(run("Point(1 2.5)").to_string(), "POINT (1 2.5)");
    assert_eq!(run("MultiPoint(1 1, 2 2)").to_string(), "MULTIPOINT ((1 1), (2 2))");
    assert_eq!(run("LINESTRING EMPTY").to_string(), "LINESTRING EMPTY");
}

// ─── Arithmetic ──────────────────────────────────────────────────────────────

#[test]
fn point_arithmetic() {
    assert_eq!(coords(&run("Point(1 2) + Point(1 2)")), vec![(2.0, 4.0)]);
    assert_eq!(coords(&run("Point(1 2) * Point(3 4)")), vec![(3.0, 8.0)]);
    assert_eq!(coords(&run("Point(5 10) / Point(5 2)")), vec![(1.0, 5.0)]);
    assert_eq!(coords(&run("Point(2 5) ^ Point(3 0)")), vec![(8.0, 1.0)]);
    assert_eq!(coords(&run("Point(2 5) % Point(3 2)")), vec![(2.0, 1.0)]);
}

#[test]
fn linestring_arithmetic() {
    assert_eq!(
        coords(&run("LineString(10 0, 1 1, 2 2) - LineString(0 1, 2 3, 4 5)")),
        vec![(10.0, -1.0), (-1.0, -2.0), (-2.0, -3.0)]
    );
    assert_eq!(
        coords(&run("LineString(0 0, 1 1, 2 2) ^ LineString(1 2, 3 4, 4 5)")),
        vec![(0.0, 0.0), (1.0, 1.0), (16.0, 32.0)]
    );
}

#[test]
fn point_broadcast_keeps_operand_order() {
    assert_eq!(
        coords(&run("Point(8 9) / LineString(2 1, 16 3, 4 -18)")),
        vec![(4.0, 9.0), (0.5, 3.0), (2.0, -0.5)]
    );
    assert_eq!(
        coords(&run("Point(1 1) - LineString(10 0, 1 1, 2 2)")),
        vec![(-9.0, 1.0), (0.0, 0.0), (-1.0, -1.0)]
    );
    assert_eq!(coords(&run("Point(2 3) ^ LineString(1 2, 3 4)")), vec![(2.0, 9.0), (8.0, 81.0)]);
}

#[test]
fn polygon_with_hole_and_point() {
    let v = run("Polygon((8 8, 8 0, 0 0, 0 8, 8 8), (6 6, 6 2, 2 2, 2 6, 6 6)) + Point(1 1)");
    assert_eq!(
        rings(&v),
        vec![
            vec![(9.0, 9.0), (9.0, 1.0), (1.0, 1.0), (1.0, 9.0), (9.0, 9.0)],
            vec![(7.0, 7.0), (7.0, 3.0), (3.0, 3.0), (3.0, 7.0), (7.0, 7.0)],
        ]
    );
    assert_eq!(
        rings(&run("Point(3 3) - Polygon((1 1, 2 2, 3 3, 1 1))")),
        vec![vec![(2.0, 2.0), (1.0, 1.0), (0.0, 0.0), (2.0, 2.0)]]
    );
}

#[test]
fn numbers_act_as_points() {
    assert_eq!(coords(&run("Point(1 2) + 3")), vec![(4.0, 5.0)]);
    assert_eq!(coords(&run("44 / LineString(1 1, 2 2)")), vec![(44.0, 44.0), (22.0, 22.0)]);
    assert_eq!(member_points(&run("GeometryCollection(1 1, 2 2) + 3")), vec![(4.0, 4.0), (5.0, 5.0)]);
}

#[test]
fn nested_collection_broadcast() {
    let v = run(
        "GeometryCollection(
            Point(1 1),
            GeometryCollection(MultiLineString((1 1, 2 2, 3 3), (4 4, 5 5, 6 6)))
        ) + 3",
    );
    let inner = Value::Geometry(members(&v)[1].clone());
    assert_eq!(
        rings(&Value::Geometry(members(&inner)[0].clone())),
        vec![vec![(4.0, 4.0), (5.0, 5.0), (6.0, 6.0)], vec![(7.0, 7.0), (8.0, 8.0), (9.0, 9.0)]]
    );
}

#[test]
fn arithmetic_errors() {
    assert!(matches!(
        run_err("LineString(1 1, 2 2) + LineString(1 1)"),
        EvalErrorKind::ShapeMismatch { left: 2, right: 1, .. }
    ));
    assert!(matches!(
        run_err("Polygon((0 0, 1 1, 0 0)) * Polygon((0 0, 1 1, 0 0))"),
        EvalErrorKind::OperationNotSupported { op: "*", left: "Polygon", right: "Polygon" }
    ));
    assert!(matches!(run_err("true + 1"), EvalErrorKind::TypeMismatch(_)));
    assert_eq!(run("1 / 0"), Value::Number(f64::INFINITY));
}

// ─── Concatenation ───────────────────────────────────────────────────────────

#[test]
fn concatenation() {
    assert_eq!(
        coords(&run("LineString(1 1, 2 2) ++ LineString(3 3, 4 4)")),
        vec![(1.0, 1.0), (2.0, 2.0), (3.0, 3.0), (4.0, 4.0)]
    );
    assert_eq!(coords(&run("MultiPoint(1 1, 2 2) ++ Point(3 3)")), vec![(1.0, 1.0), (2.0, 2.0), (3.0, 3.0)]);
    assert_eq!(
        member_points(&run("GeometryCollection(Point(1 1), Point(2 2)) ++ Point(3 3) ++ Point(4 4)")),
        vec![(1.0, 1.0), (2.0, 2.0), (3.0, 3.0), (4.0, 4.0)]
    );
    assert_eq!(member_points(&run("Point(1 1) ++ Point(2 2)")), vec![(1.0, 1.0), (2.0, 2.0)]);
}

#[test]
fn concatenation_keeps_left_kind() {
    let v = run("LineString(1 1, 2 2) ++ MultiPoint(3 3, 4 4)");
    assert_eq!(geom(&v).kind(), GeometryKind::LineString);
    let v = run("MultiPoint(1 1, 2 2) ++ LineString(3 3, 4 4)");
    assert_eq!(geom(&v).kind(), GeometryKind::MultiPoint);
}

#[test]
fn point_onto_collection_nests() {
    let v = run("Point(2 2) ++ GeometryCollection(Point(3 3), Point(4 4))");
    let gs = members(&v);
    assert_eq!(gs[0], Geometry::point(2.0, 2.0));
    assert_eq!(member_points(&Value::Geometry(gs[1].clone())), vec![(3.0, 3.0), (4.0, 4.0)]);
}

// ─── Pipelines ───────────────────────────────────────────────────────────────

#[test]
fn map_preserves_container() {
    assert_eq!(
        coords(&run("MultiPoint(1 1, 2 2, 3 3) || Function(x => x + Point(1 1))")),
        vec![(2.0, 2.0), (3.0, 3.0), (4.0, 4.0)]
    );
    assert_eq!(
        member_points(&run("GeometryCollection(Point(1 1), Point(2 2)) || Function(x => x + Point(1 1))")),
        vec![(2.0, 2.0), (3.0, 3.0)]
    );
}

#[test]
fn map_passes_index() {
    assert_eq!(
        coords(&run("MultiPoint(1 1, 2 2, 3 3) || Function((x, i) => x + Point(i 1))")),
        vec![(1.0, 2.0), (3.0, 3.0), (5.0, 4.0)]
    );
    assert_eq!(
        coords(&run("Function(() => MultiPoint(1 1, 2 2, 3 3) || Function((x, i) => x + Point(i 1)))()")),
        vec![(1.0, 2.0), (3.0, 3.0), (5.0, 4.0)]
    );
}

#[test]
fn map_into_linestrings() {
    let v = run("Generate 3 Function(x => {x = x+1; Point(x x)}) || Function(x => LineString(x, (x + Point(1 1))))");
    let lines: Vec<_> = members(&v).iter().map(|g| coords(&Value::Geometry(g.clone()))).collect();
    assert_eq!(
        lines,
        vec![
            vec![(1.0, 1.0), (2.0, 2.0)],
            vec![(2.0, 2.0), (3.0, 3.0)],
            vec![(3.0, 3.0), (4.0, 4.0)],
        ]
    );
}

#[test]
fn circles_pipeline() {
    let v = run(
        "CreateCircles = Function(() => {
            Generate 5 Function(i => {
                ring = i + 1;
                PointCircle((ring * 2), (ring * 10))
            }) | Flatten
        });
        CreateCircles()
            || Function(x => If (x:x() <= 0) Then (x + Point(0 10)) Else (x - Point(0 10)))
            || Function(x => GeometryCollection(x, (x + Point(11 0))))
            | Flatten",
    );
    assert_eq!(members(&v).len(), 300);
}

#[test]
fn filter() {
    let expected = vec![(1.0, 1.0), (2.0, 2.0)];
    assert_eq!(coords(&run("MultiPoint(1 1, 2 2, 3 3) |> Function(x => x:x() <= 2)")), expected);
    assert_eq!(coords(&run("MultiPoint(1 1, 2 2, 3 3) |> Function((x, i) => i < 2)")), expected);
}

#[test]
fn deep_map_reaches_every_coordinate() {
    let v = run("Polygon((0 0, 2 0, 2 2, 0 0)) |* Function(p => p * 10)");
    assert_eq!(rings(&v), vec![vec![(0.0, 0.0), (20.0, 0.0), (20.0, 20.0), (0.0, 0.0)]]);
}

#[test]
fn natives_in_pipelines() {
    assert_eq!(num(&run("16 | sqrt")), 4.0);
    assert_eq!(
        coords(&run("GeometryCollection(Point(1 1), Point(2 2), Point(3 3)) | ToLineString")),
        vec![(1.0, 1.0), (2.0, 2.0), (3.0, 3.0)]
    );
    assert_eq!(
        member_points(&run("LineString(1 1, 2 2, 3 3) | ToGeometryCollection")),
        vec![(1.0, 1.0), (2.0, 2.0), (3.0, 3.0)]
    );
}

#[test]
fn pipeline_errors() {
    let kind = run_err("Point(1 1) || Function(p => p)");
    assert!(matches!(kind, EvalErrorKind::TypeMismatch(ref m) if m.contains("array-like")));
    assert!(matches!(run_err("MultiPoint(1 1) |> Function(p => 1)"), EvalErrorKind::TypeMismatch(_)));
    assert!(matches!(run_err("LineString(1 1) || Function(p => 1)"), EvalErrorKind::TypeMismatch(_)));
}

// ─── Generate ────────────────────────────────────────────────────────────────

#[test]
fn generate() {
    assert_eq!(member_points(&run("Generate 3 Point(0 0)")), vec![(0.0, 0.0); 3]);
    assert_eq!(
        member_points(&run("a = (Generate 3 Function(x => Point(x x))); a")),
        vec![(0.0, 0.0), (1.0, 1.0), (2.0, 2.0)]
    );
    assert!(members(&run("Generate 0 Point(1 1)")).is_empty());
}

#[test]
fn generate_nested_and_flattened() {
    let v = run(
        "Generate 3 Function(x => Point(x x))
            || Function(p => Generate 3 Function(x => p + Point(x x)))
            | Flatten",
    );
    assert_eq!(
        member_points(&v),
        vec![
            (0.0, 0.0), (1.0, 1.0), (2.0, 2.0),
            (1.0, 1.0), (2.0, 2.0), (3.0, 3.0),
            (2.0, 2.0), (3.0, 3.0), (4.0, 4.0),
        ]
    );
}

#[test]
fn generate_with_arithmetic() {
    assert_eq!(
        member_points(&run("Point(1 1) - (Generate 3 Function(x => Point(x x)))")),
        vec![(1.0, 1.0), (0.0, 0.0), (-1.0, -1.0)]
    );
}

#[test]
fn generate_rejects_non_geometry() {
    assert!(matches!(run_err("Generate 100 Function(x => x)"), EvalErrorKind::GenerateTypeError(_)));
    assert!(matches!(run_err("Generate 2.5 Point(0 0)"), EvalErrorKind::GenerateTypeError(_)));
}

// ─── Accessors ───────────────────────────────────────────────────────────────

#[test]
fn point_getters_and_setters() {
    assert_eq!(num(&run("Point(2 3):x()")), 2.0);
    assert_eq!(num(&run("a = Point(2 3); a:y()")), 3.0);
    assert_eq!(coords(&run("Point(2 3):x(4)")), vec![(4.0, 3.0)]);
    assert_eq!(coords(&run("a = Point(2 3); a:y(5)")), vec![(2.0, 5.0)]);
}

#[test]
fn setters_copy() {
    assert_eq!(coords(&run("a = Point(2 3); a:x(4); a")), vec![(2.0, 3.0)]);
}

#[test]
fn collection_and_linestring_accessors() {
    assert_eq!(num(&run("GeometryCollection(Point(1 2), Point(3 4)):numGeometries()")), 2.0);
    assert_eq!(coords(&run("GeometryCollection(Point(1 2), Point(3 4)):geometryN(1)")), vec![(3.0, 4.0)]);
    assert_eq!(num(&run("l = LineString(1 2, 3 4); l:numPoints()")), 2.0);
    assert_eq!(coords(&run("l = LineString(1 2, 3 4); l:pointN(l:numPoints() - 1)")), vec![(3.0, 4.0)]);
}

#[test]
fn type_tags() {
    assert_eq!(run("GeometryCollection():type()"), Value::Type(GeometryKind::GeometryCollection));
    assert_eq!(run("GeometryCollection():type() == GeometryCollection"), Value::Boolean(true));
    assert_eq!(run("GeometryCollection():type() != Point"), Value::Boolean(true));
    assert_eq!(run("MultiLineString((1 1, 2 2)):type() == MultiLineString"), Value::Boolean(true));
    assert_eq!(run("Polygon((1 1, 2 2, 3 3, 1 1)):type() == Polygon"), Value::Boolean(true));
}

#[test]
fn accessor_errors() {
    assert!(matches!(
        run_err("LineString(1 1, 2 2):geometryN(0)"),
        EvalErrorKind::PropertyNotAccessible { ref property, target: "LineString" } if property == "geometryN"
    ));
    assert!(matches!(
        run_err("GeometryCollection(Point(1 1)):geometryN(1)"),
        EvalErrorKind::IndexOutOfRange { len: 1, .. }
    ));
}

// ─── Conditionals and logic ──────────────────────────────────────────────────

#[test]
fn comparisons() {
    assert_eq!(run("1 >= 1"), Value::Boolean(true));
    assert_eq!(run("2 <= 1"), Value::Boolean(false));
    assert_eq!(run("1 != 1"), Value::Boolean(false));
    assert_eq!(run("Point(1 1):x() == 1"), Value::Boolean(true));
    assert!(matches!(run_err("Point(1 1) < 2"), EvalErrorKind::TypeMismatch(_)));
}

#[test]
fn if_then_else() {
    assert_eq!(coords(&run("If (3 > 4) Then (Point(1 1)) Else (Point(2 2))")), vec![(2.0, 2.0)]);
    assert_eq!(coords(&run("If (3 < 4) Then (Point(1 1)) Else (Point(2 2))")), vec![(1.0, 1.0)]);
    assert_eq!(
        coords(&run("Function(x => If (3 < 4) Then (Point(1 1)) Else ( Point(2 2)))()")),
        vec![(1.0, 1.0)]
    );
    let v = run(
        "a = If (3 < 4) Then (
            Generate 3 Function(x => Point(x x))
                || Function(p => p + 1)
        ) Else (Point(2 2));
        a",
    );
    assert_eq!(member_points(&v), vec![(1.0, 1.0), (2.0, 2.0), (3.0, 3.0)]);
}

#[test]
fn logical_operators() {
    assert_eq!(run("true AND true"), Value::Boolean(true));
    assert_eq!(run("false AND true"), Value::Boolean(false));
    assert_eq!(run("false OR true"), Value::Boolean(true));
    assert_eq!(run("false or false"), Value::Boolean(false));
    assert_eq!(run("!false"), Value::Boolean(true));
}

// ─── Functions ───────────────────────────────────────────────────────────────

#[test]
fn functions() {
    assert_eq!(num(&run("fn = Function(() => 3); fn()")), 3.0);
    assert_eq!(num(&run("Function(() => 3 ;\n 4 ; 6)()")), 6.0);
    assert_eq!(
        coords(&run("createPoint = Function(() => Point(2 3)); LineString(createPoint(), createPoint())")),
        vec![(2.0, 3.0), (2.0, 3.0)]
    );
}

#[test]
fn closures_capture_defining_scope() {
    assert_eq!(
        num(&run(
            "fn1 = Function(a => {
                a + 1;
                fn2 = Function(b => a + b);
                fn2(3)
            });
            fn1(2)"
        )),
        5.0
    );
    let v = run(
        "x = 2;
        fn1 = Function((a, c) => {
            x = 5;
            a = a + x;
            fn2 = Function(b => a + b);
            fn2(3)
        });
        y = fn1(x, 5);
        Point(x y)",
    );
    assert_eq!(coords(&v), vec![(2.0, 10.0)]);
}

#[test]
fn keyword_prefixed_names() {
    let v = run(
        "getLatitude = Function(() => 55);
        createPointOneArg = Function(x => Point(x getLatitude()));
        createPointTwoArgs = Function((x, y) => Point(x y));
        otherLine = LineString(
            createPointOneArg(10),
            createPointTwoArgs(20, 55)
        );
        otherLine # LINESTRING(10 55, 20 55)",
    );
    assert_eq!(coords(&v), vec![(10.0, 55.0), (20.0, 55.0)]);
    assert_eq!(coords(&run("pointA = Point(1 2); pointA")), vec![(1.0, 2.0)]);
}

#[test]
fn recursion() {
    let v = run(
        "build_list = Function(n => {
            # Base case
            if (n == 0) then (
                GeometryCollection()
            ) else (
                rest_of_list = build_list(n - 1);
                current_element = Point(n n);
                rest_of_list ++ GeometryCollection(current_element)
            )
        });
        build_list(3)",
    );
    assert_eq!(member_points(&v), vec![(1.0, 1.0), (2.0, 2.0), (3.0, 3.0)]);
}

// ─── Sequences, variables and comments ───────────────────────────────────────

#[test]
fn sequence_returns_last_value() {
    assert_eq!(coords(&run("Point(2 5) ^ (3 0); 1 + 3; (Point(1 2) * Point(3 3))")), vec![(3.0, 6.0)]);
    assert_eq!(coords(&run("Point(1 1);")), vec![(1.0, 1.0)]);
}

#[test]
fn empty_input_is_unit() {
    assert_eq!(run(""), Value::Unit);
    assert_eq!(run("# just a comment"), Value::Unit);
    assert_eq!(run("\n    # one\n    # two\n    "), Value::Unit);
    assert_eq!(coords(&run("# comment\nPoint(1 2); # inline\n\nPoint(3 4)\n# trailing")), vec![(3.0, 4.0)]);
}

#[test]
fn variables() {
    assert_eq!(run("a = Point(1 2)"), Value::Unit);
    assert_eq!(num(&run("a = 2 * 42; b = 8 / 2; a + b")), 88.0);
    assert_eq!(coords(&run("a = 1; b = 2; a = a + b; Point(a b)")), vec![(3.0, 2.0)]);
    assert_eq!(members(&run("a = Point(1 1); b2 = Point(2 2); c_3 = Point(3 3); GeometryCollection(a, b2, c_3)")).len(), 3);
}

#[test]
fn last_result_survives_in_shared_scope() {
    let scope = Scope::global();
    evaluate("Point(2 3)", Some(scope.clone())).expect("first evaluation");
    let v = evaluate("$?", Some(scope.clone())).expect("second evaluation");
    assert_eq!(coords(&v), vec![(2.0, 3.0)]);

    evaluate("n = 41", Some(scope.clone())).expect("declaration");
    assert_eq!(evaluate("n + 1", Some(scope)).map(|v| num(&v)), Ok(42.0));
}

#[test]
fn escaped_closure_frames_are_reclaimed() {
    let scope = Scope::global();
    let src = "h = Function(n => { mk = Function(a => Function(x => x + a + n)); k = mk(1); k }); f = h(1); f(2)";
    assert_eq!(evaluate(src, Some(scope.clone())).map(|v| num(&v)), Ok(4.0));
    assert_eq!(scope.live_frames(), 2);

    evaluate("f = 0", Some(scope.clone())).expect("rebinding");
    assert_eq!(scope.live_frames(), 0);
}

#[test]
fn returned_closure_held_as_last_result_stays_callable() {
    let scope = Scope::global();
    evaluate("h = Function(n => { g = Function(x => x + n); g(1); g }); h(1)", Some(scope.clone()))
        .expect("closure result");
    assert_eq!(evaluate("$?(5)", Some(scope.clone())).map(|v| num(&v)), Ok(6.0));
    assert_eq!(scope.live_frames(), 0);
}

#[test]
fn unresolved_identifier() {
    assert_eq!(run_err("nope + 1"), EvalErrorKind::UnresolvedIdentifier("nope".into()));
}

// ─── Standard library ────────────────────────────────────────────────────────

#[test]
fn math_functions() {
    assert_eq!(num(&run("pow(2, 10)")), 1024.0);
    assert_eq!(num(&run("max(1, 5, 3) + min(4, 2)")), 7.0);
    assert_eq!(num(&run("round(-2.5)")), -2.0);
    assert!((num(&run("cos(PI)")) + 1.0).abs() < 1e-12);
    assert!(matches!(run_err("sqrt()"), EvalErrorKind::ArityError { got: 0, .. }));
}

#[test]
fn geometry_functions() {
    assert_eq!(members(&run("PointGrid(3, 2)")).len(), 6);
    assert_eq!(coords(&run("Round(1, Rotate(90, Point(0 0), Point(1 0)))")), vec![(0.0, 1.0)]);
    assert_eq!(
        rings(&run("ToPolygon(LineString(0 0, 1 0, 1 1))")),
        vec![vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 0.0)]]
    );
}

// ─── Syntax errors ───────────────────────────────────────────────────────────

#[test]
fn syntax_errors_carry_position() {
    match evaluate("a = 1;\n  @", None) {
        Err(Error::Syntax(e)) => {
            assert_eq!(e.code, ErrorCode::L001);
            assert_eq!((e.line, e.column), (2, 3));
        }
        other => panic!("expected syntax error, got {other:?}"),
    }
    assert!(matches!(evaluate("Point(1 2", None), Err(Error::Syntax(_))));
    assert!(matches!(evaluate("Function(x => x", None), Err(Error::Syntax(_))));
}

// ─── Limits ──────────────────────────────────────────────────────────────────

#[test]
fn oversized_generate_is_an_error() {
    assert!(matches!(run_err("Generate 1e19 Point(1 1)"), EvalErrorKind::GenerateTypeError(_)));
    assert!(matches!(run_err("Generate 1e19 Function(i => Point(i i))"), EvalErrorKind::GenerateTypeError(_)));
}

#[test]
fn oversized_point_grid_is_an_error() {
    assert!(matches!(run_err("PointGrid(1e10, 1e10)"), EvalErrorKind::TooManyElements { .. }));
    assert!(matches!(run_err("PointCircle(1, 1e12)"), EvalErrorKind::TooManyElements { .. }));
}

#[test]
fn round_with_huge_precision_keeps_value() {
    assert_eq!(num(&run("Round(400, 1.25)")), 1.25);
    assert_eq!(coords(&run("Round(400, Point(1.25 -3.5))")), vec![(1.25, -3.5)]);
}

#[test]
fn deeply_nested_input_is_handled() {
    let negated = format!("{}1", "-".repeat(20_000));
    assert_eq!(num(&run(&negated)), 1.0);

    let depth = 20_000;
    let src = format!("{}Point(1 2){}", "GeometryCollection(".repeat(depth), ")".repeat(depth));
    let v = run(&src);
    assert_eq!(geom(&v).flatten(), vec![Geometry::point(1.0, 2.0)]);
    assert!(v.to_string().starts_with("GEOMETRYCOLLECTION (GEOMETRYCOLLECTION"));
}
