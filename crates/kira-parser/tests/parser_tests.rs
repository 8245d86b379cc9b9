use insta::assert_snapshot;
use kira_parser::dump::dump_program;

/// The round-trip property: parsing, dumping, re-parsing, and re-dumping
/// must be a fixed point -- the two dumps describe structurally identical
/// trees.
fn round_trips(source: &str) {
    let first = kira_parser::parse(source);
    assert!(first.ok(), "parse failed for {source:?}: {:?}", first.diagnostics);
    let dump_a = dump_program(&first.program);

    let second = kira_parser::parse(&dump_a);
    assert!(
        second.ok(),
        "re-parse of dump failed: {:?}\ndump:\n{dump_a}",
        second.diagnostics
    );
    let dump_b = dump_program(&second.program);
    assert_eq!(dump_a, dump_b, "dump is not a fixed point");
}

#[test]
fn round_trip_minimal_main() {
    round_trips("fn main() -> i32 { return 42 }");
}

#[test]
fn round_trip_module_and_imports() {
    round_trips(
        "module a.b\n\nimport c.d\nimport e.f.{ G, H as I }\n\nfn main() -> i32 { return 0 }",
    );
}

#[test]
fn round_trip_type_definitions() {
    round_trips("type Color = Red | Green | Blue");
    round_trips("type Shape = Circle(f64) | Rect { w: f64, h: f64 } | Point");
    round_trips("type Point = { x: i32, y: i32 }");
    round_trips("type Meters = f64");
    round_trips("type Pair[A, B] = { first: A, second: B }");
    round_trips("type A = B");
}

#[test]
fn round_trip_expressions() {
    round_trips(
        "fn f(a: i32, b: i32) -> i32 {\n    return a + b * 2 - (a - b) / 3 % 4\n}",
    );
    round_trips("fn f(a: bool, b: bool) -> bool {\n    return a and b or not a\n}");
    round_trips("fn f(xs: [i32]) -> i32 {\n    return xs[0] + xs[1]\n}");
    round_trips("fn f(t: (i32, string)) -> i32 {\n    return t.0\n}");
    round_trips("fn f(o: Option[i32]) -> i32 {\n    return o ?? 0\n}");
    round_trips("fn f(x: i32) -> bool {\n    return x in 1..=10\n}");
    round_trips("effect fn f(o: Option[i32]) -> Option[i32] {\n    let n: i32 = o?\n    return Some(n)\n}");
}

#[test]
fn round_trip_statements() {
    round_trips(
        "fn f(n: i32) -> i32 {\n    var total: i32 = 0\n    for i in 0..n {\n        total = total + i\n    }\n    while total > 100 {\n        total = total - 1\n    }\n    loop @outer {\n        break @outer\n    }\n    return total\n}",
    );
    round_trips(
        "fn f(c: bool) -> i32 {\n    if c {\n        return 1\n    } else if not c {\n        return 2\n    } else {\n        return 3\n    }\n    return 0\n}",
    );
}

#[test]
fn round_trip_match_forms() {
    round_trips(
        "fn f(c: Color) -> i32 {\n    match c {\n        Red => { return 1 }\n        Green | Blue => { return 2 }\n    }\n    return 0\n}",
    );
    round_trips(
        "fn f(o: Option[i32]) -> i32 {\n    let n: i32 = match o {\n        Some(v) if v > 0 => v\n        Some(v) => 0 - v\n        None => 0\n    }\n    return n\n}",
    );
    round_trips(
        "fn f(p: Point) -> i32 {\n    match p {\n        Point { x: px, .. } => { return px }\n    }\n    return 0\n}",
    );
    round_trips(
        "fn f(n: i32) -> string {\n    match n {\n        1..=9 => { return \"digit\" }\n        _ => { return \"other\" }\n    }\n    return \"\"\n}",
    );
}

#[test]
fn round_trip_traits_and_impls() {
    round_trips(
        "trait Area {\n    fn area(self) -> f64\n    fn describe(self) -> string {\n        return \"shape\"\n    }\n}\n\nimpl Area for Circle {\n    fn area(self) -> f64 {\n        return 3.0\n    }\n}\n\nimpl Circle {\n    fn diameter(self) -> f64 {\n        return 2.0\n    }\n}",
    );
    round_trips(
        "fn largest[T: Area](shapes: [T]) -> f64 where T: Area {\n    return 0.0\n}",
    );
}

#[test]
fn round_trip_closures_and_strings() {
    round_trips(
        "fn main() -> i32 {\n    let add: fn(i32, i32) -> i32 = fn(a: i32, b: i32) -> i32 { return a + b }\n    return add(1, 2)\n}",
    );
    round_trips("effect fn main() -> IO[void] {\n    println(\"x = ${1 + 2}!\")\n}");
    round_trips("fn f() -> string {\n    return \"tab\\there \\\"quoted\\\"\"\n}");
    round_trips("fn f() -> char {\n    return '\\n'\n}");
}

#[test]
fn round_trip_consts_lets_and_tests() {
    round_trips("const LIMIT: i32 = 100\n\npub let shared: i32 = 5\n\nfn main() -> i32 { return LIMIT }");
    round_trips("fn double(x: i32) -> i32 { return x * 2 }\n\ntest \"doubles\" {\n    assert_eq(double(2), 4)\n}");
}

#[test]
fn round_trip_doc_comments() {
    round_trips("/// Adds one.\nfn inc(x: i32) -> i32 { return x + 1 }");
}

#[test]
fn dump_of_minimal_function() {
    let parse = kira_parser::parse("fn main() -> i32 { return 42 }");
    assert!(parse.ok());
    assert_snapshot!(dump_program(&parse.program), @r"
    fn main() -> i32 {
        return 42
    }
    ");
}

#[test]
fn dump_of_sum_type() {
    let parse = kira_parser::parse("type Color = Red | Green | Blue");
    assert!(parse.ok());
    assert_snapshot!(dump_program(&parse.program), @"type Color = Red | Green | Blue");
}
