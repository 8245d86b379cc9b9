use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use kira_interp::value::Value;
use kira_interp::Interp;

/// A shared sink so tests can read back what the program printed.
#[derive(Clone, Default)]
struct SharedBuf(Rc<RefCell<Vec<u8>>>);

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl SharedBuf {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).to_string()
    }
}

/// Full pipeline: parse, resolve, check, run. Returns main's value and
/// captured output.
fn run(source: &str) -> (Value, String) {
    let parse = kira_parser::parse(source);
    assert!(parse.ok(), "parse failed: {:?}", parse.diagnostics);
    let res = kira_resolver::resolve(parse.program);
    assert!(res.ok(), "resolution failed: {:?}", res.diagnostics);
    let typeck = kira_typeck::check(&res);
    assert!(typeck.ok(), "type check failed: {:?}", typeck.diagnostics);

    let buf = SharedBuf::default();
    let mut interp = Interp::with_output(&res, Box::new(buf.clone())).with_typeck(&typeck);
    let value = interp.run().expect("program should run");
    (value, buf.contents())
}

fn run_int(source: &str) -> i128 {
    match run(source).0 {
        Value::Int(v) => v,
        other => panic!("expected an integer result, got {other:?}"),
    }
}

/// Full pipeline on a well-typed program that must fail at runtime.
fn run_err(source: &str) -> kira_interp::error::RuntimeError {
    let parse = kira_parser::parse(source);
    assert!(parse.ok(), "parse failed: {:?}", parse.diagnostics);
    let res = kira_resolver::resolve(parse.program);
    assert!(res.ok(), "resolution failed: {:?}", res.diagnostics);
    let typeck = kira_typeck::check(&res);
    assert!(typeck.ok(), "type check failed: {:?}", typeck.diagnostics);

    let mut interp = Interp::new(&res).with_typeck(&typeck);
    interp.run().expect_err("program should fail at runtime")
}

#[test]
fn main_returns_42() {
    assert_eq!(run_int("fn main() -> i32 { return 42 }"), 42);
}

#[test]
fn factorial_of_five() {
    let source = "fn factorial(n: i32) -> i32 {\n    if n <= 1 {\n        return 1\n    }\n    return n * factorial(n - 1)\n}\nfn main() -> i32 { return factorial(5) }";
    assert_eq!(run_int(source), 120);
}

#[test]
fn tail_recursion_runs_in_constant_stack() {
    // Depth 2000 must complete without stack overflow: the `return
    // countdown(n - 1)` form transfers frames instead of nesting them.
    let source = "fn countdown(n: i64) -> i64 {\n    if n <= 0 {\n        return 0\n    }\n    return countdown(n - 1)\n}\nfn main() -> i64 { return countdown(2000) }";
    assert_eq!(run_int(source), 0);
}

#[test]
fn mutual_tail_recursion() {
    let source = "fn even(n: i64) -> bool {\n    if n == 0 {\n        return true\n    }\n    return odd(n - 1)\n}\nfn odd(n: i64) -> bool {\n    if n == 0 {\n        return false\n    }\n    return even(n - 1)\n}\nfn main() -> i64 {\n    if even(10000) {\n        return 1\n    }\n    return 0\n}";
    assert_eq!(run_int(source), 1);
}

#[test]
fn list_match_extracts_head_tuple() {
    let source = "fn main() -> i32 {\n    let xs: List[(i32, i32)] = Cons((1, 10), Cons((2, 20), Nil))\n    match xs {\n        Cons(e, r) => { return e.0 }\n        Nil => { return 0 }\n    }\n    return 0\n}";
    assert_eq!(run_int(source), 1);
}

#[test]
fn println_writes_to_output() {
    let source = "effect fn main() -> IO[void] {\n    println(\"hello\")\n    std.io.println(\"world\")\n}";
    let (_, output) = run(source);
    assert_eq!(output, "hello\nworld\n");
}

#[test]
fn string_interpolation_renders_expressions() {
    let source = "effect fn main() -> IO[void] {\n    let x: i32 = 6\n    println(\"x = ${x}, double = ${x * 2}\")\n}";
    let (_, output) = run(source);
    assert_eq!(output, "x = 6, double = 12\n");
}

#[test]
fn closures_capture_their_environment() {
    let source = "fn make_adder(n: i32) -> fn(i32) -> i32 {\n    let add: fn(i32) -> i32 = fn(x: i32) -> i32 { return x + n }\n    return add\n}\nfn main() -> i32 {\n    let add5: fn(i32) -> i32 = make_adder(5)\n    return add5(37)\n}";
    assert_eq!(run_int(source), 42);
}

#[test]
fn var_bindings_are_mutable() {
    let source = "fn main() -> i32 {\n    var total: i32 = 0\n    for i in 1..=4 {\n        total = total + i\n    }\n    return total\n}";
    assert_eq!(run_int(source), 10);
}

#[test]
fn while_and_break() {
    let source = "fn main() -> i32 {\n    var n: i32 = 0\n    while true {\n        n = n + 1\n        if n == 7 {\n            break\n        }\n    }\n    return n\n}";
    assert_eq!(run_int(source), 7);
}

#[test]
fn labeled_break_leaves_outer_loop() {
    let source = "fn main() -> i32 {\n    var n: i32 = 0\n    loop @outer {\n        loop {\n            n = n + 1\n            if n == 5 {\n                break @outer\n            }\n        }\n    }\n    return n\n}";
    assert_eq!(run_int(source), 5);
}

#[test]
fn records_and_field_assignment() {
    let source = "type Point = { x: i32, y: i32 }\nfn main() -> i32 {\n    let p: Point = Point { x: 1, y: 2 }\n    p.x = 40\n    return p.x + p.y\n}";
    assert_eq!(run_int(source), 42);
}

#[test]
fn sum_types_and_match_expression() {
    let source = "type Color = Red | Green | Blue\nfn value(c: Color) -> i32 {\n    let n: i32 = match c {\n        Red => 1\n        Green => 2\n        Blue => 3\n    }\n    return n\n}\nfn main() -> i32 {\n    return value(Green)\n}";
    assert_eq!(run_int(source), 2);
}

#[test]
fn variant_payloads_and_guards() {
    let source = "type Shape = Circle(f64) | Rect { w: f64, h: f64 } | Point\nfn score(s: Shape) -> i32 {\n    match s {\n        Circle(r) if r > 1.0 => { return 3 }\n        Circle(r) => { return 2 }\n        Rect { w: w, h: h } => { return 1 }\n        Point => { return 0 }\n    }\n    return 0\n}\nfn main() -> i32 {\n    return score(Circle(0.5)) + score(Rect { w: 1.0, h: 2.0 }) * 10\n}";
    assert_eq!(run_int(source), 12);
}

#[test]
fn try_operator_propagates_none() {
    let source = "fn first_even(xs: List[i32]) -> Option[i32] {\n    match xs {\n        Nil => { return None }\n        Cons(h, t) => {\n            if h % 2 == 0 {\n                return Some(h)\n            }\n            return first_even(t)\n        }\n    }\n    return None\n}\neffect fn double_first_even(xs: List[i32]) -> Option[i32] {\n    let n: i32 = first_even(xs)?\n    return Some(n * 2)\n}\neffect fn main() -> i32 {\n    let found: Option[i32] = double_first_even(Cons(3, Cons(4, Nil)))\n    let missing: Option[i32] = double_first_even(Cons(3, Nil))\n    if missing is None {\n        return found ?? 0\n    }\n    return 0 - 1\n}";
    assert_eq!(run_int(source), 8);
}

#[test]
fn division_by_zero_is_a_runtime_error() {
    let parse = kira_parser::parse(
        "fn main() -> i32 {\n    let zero: i32 = 0\n    return 1 / zero\n}",
    );
    assert!(parse.ok());
    let res = kira_resolver::resolve(parse.program);
    assert!(res.ok());
    let mut interp = Interp::new(&res);
    let error = interp.run().expect_err("division by zero must fail");
    assert_eq!(error.kind, kira_interp::error::RuntimeErrorKind::DivisionByZero);
}

#[test]
fn match_expression_arm_can_tail_return() {
    // A tail-form `return g(a)` inside an expression-position match arm
    // leaves the enclosing function with the call's result.
    let source = "fn g(a: i32) -> i32 { return a + 1 }\nfn f(a: i32) -> i32 {\n    (match a {\n        _ => { return g(a) }\n    })\n    return 2\n}\nfn main() -> i32 { return f(41) }";
    assert_eq!(run_int(source), 42);
}

#[test]
fn arithmetic_respects_declared_width() {
    // Both operands fit i32, the sum does not; the declared type makes
    // this an overflow diagnostic rather than an out-of-range i32.
    let error = run_err(
        "fn main() -> i32 {\n    let x: i32 = 2000000000 + 2000000000\n    return 0\n}",
    );
    assert_eq!(error.kind, kira_interp::error::RuntimeErrorKind::Overflow);
}

#[test]
fn unsigned_underflow_is_rejected() {
    let error = run_err("fn main() -> i32 {\n    let y: u8 = 0 - 1\n    return 0\n}");
    assert_eq!(error.kind, kira_interp::error::RuntimeErrorKind::Overflow);
}

#[test]
fn integer_casts_narrow_by_truncation() {
    let source = "fn main() -> i32 {\n    let n: u8 = 1000 as u8\n    return to_int(n) as i32\n}";
    assert_eq!(run_int(source), 232);
}

#[test]
fn in_range_width_arithmetic_still_works() {
    let source = "fn main() -> i32 {\n    let a: u8 = 200 + 55\n    let b: i64 = 4000000000 + 4000000000\n    return to_int(a) as i32\n}";
    assert_eq!(run_int(source), 255);
}

#[test]
fn integer_overflow_is_a_diagnostic_not_a_wrap() {
    let parse = kira_parser::parse(
        "fn main() -> i32 {\n    let big: i128 = 170141183460469231731687303715884105727\n    let more: i128 = big + 1\n    return 0\n}",
    );
    assert!(parse.ok());
    let res = kira_resolver::resolve(parse.program);
    assert!(res.ok());
    let mut interp = Interp::new(&res);
    let error = interp.run().expect_err("overflow must fail");
    assert_eq!(error.kind, kira_interp::error::RuntimeErrorKind::Overflow);
}

#[test]
fn assert_eq_failure_aborts() {
    let parse = kira_parser::parse("fn main() -> i32 {\n    assert_eq(1, 2)\n    return 0\n}");
    assert!(parse.ok());
    let res = kira_resolver::resolve(parse.program);
    assert!(res.ok());
    let mut interp = Interp::new(&res);
    let error = interp.run().expect_err("assertion must fail");
    assert_eq!(
        error.kind,
        kira_interp::error::RuntimeErrorKind::AssertionFailed
    );
}

#[test]
fn stdlib_list_functions() {
    let source = "effect fn main() -> IO[void] {\n    let xs: List[i32] = Cons(1, Cons(2, Cons(3, Nil)))\n    let doubled: List[i32] = std.list.map(fn(x: i32) -> i32 { return x * 2 }, xs)\n    println(to_string(std.list.length(doubled)))\n    let total: i32 = std.list.fold(fn(acc: i32, x: i32) -> i32 { return acc + x }, 0, doubled)\n    println(to_string(total))\n}";
    let (_, output) = run(source);
    assert_eq!(output, "3\n12\n");
}

#[test]
fn stdlib_string_functions() {
    let source = "effect fn main() -> IO[void] {\n    println(std.string.to_upper(\"kira\"))\n    println(to_string(std.string.length(\"héllo\")))\n    let piece: string = std.string.substring(\"héllo\", 1, 4)\n    println(piece)\n}";
    let (_, output) = run(source);
    assert_eq!(output, "KIRA\n5\néll\n");
}

#[test]
fn stdlib_map_functions() {
    let source = "effect fn main() -> IO[void] {\n    let m: _ = std.map.new()\n    std.map.put(m, \"a\", 1)\n    std.map.put(m, \"b\", 2)\n    std.map.put(m, \"a\", 3)\n    println(to_string(std.map.size(m)))\n    println(to_string(std.map.get(m, \"a\") ?? 0))\n}";
    let (_, output) = run(source);
    assert_eq!(output, "2\n3\n");
}

#[test]
fn stdlib_builder() {
    let source = "effect fn main() -> IO[void] {\n    let b: _ = std.builder.new()\n    std.builder.append(b, \"ab\")\n    std.builder.append_int(b, 12)\n    println(std.builder.build(b))\n}";
    let (_, output) = run(source);
    assert_eq!(output, "ab12\n");
}

#[test]
fn trait_method_dispatch() {
    let source = "type Circle = { radius: f64 }\ntrait Area {\n    fn area(self) -> f64\n}\nimpl Area for Circle {\n    fn area(self) -> f64 { return self.radius * self.radius * 3.0 }\n}\nfn main() -> i32 {\n    let c: Circle = Circle { radius: 2.0 }\n    return to_int(c.area()) as i32\n}";
    assert_eq!(run_int(source), 12);
}

#[test]
fn type_of_reports_runtime_types() {
    let source = "effect fn main() -> IO[void] {\n    println(type_of(1))\n    println(type_of(\"s\"))\n    println(type_of(Some(1)))\n    println(type_of(Nil))\n}";
    let (_, output) = run(source);
    assert_eq!(output, "int\nstring\nOption\nList\n");
}

#[test]
fn for_over_string_iterates_scalars() {
    let source = "effect fn main() -> IO[void] {\n    var count: i32 = 0\n    for c in \"héllo\" {\n        count = count + 1\n    }\n    println(to_string(count))\n}";
    let (_, output) = run(source);
    assert_eq!(output, "5\n");
}

#[test]
fn evaluation_preserves_checked_types() {
    // The runtime kind of a value matches the type the checker assigned
    // to the expression that produced it.
    let cases: &[(&str, fn(&Value) -> bool)] = &[
        ("fn main() -> i32 { return 1 + 2 }", |v| {
            matches!(v, Value::Int(3))
        }),
        ("fn main() -> f64 { return 1.5 * 2.0 }", |v| {
            matches!(v, Value::Float(_))
        }),
        ("fn main() -> bool { return 1 < 2 }", |v| {
            matches!(v, Value::Bool(true))
        }),
        ("fn main() -> string { return \"a\" + \"b\" }", |v| {
            matches!(v, Value::Str(_))
        }),
        ("fn main() -> (i32, bool) { return (1, true) }", |v| {
            matches!(v, Value::Tuple(_))
        }),
        ("fn main() -> Option[i32] { return Some(3) }", |v| {
            v.is_variant("Some")
        }),
    ];
    for (source, accepts) in cases {
        let (value, _) = run(source);
        assert!(accepts(&value), "wrong runtime kind for {source:?}: {value:?}");
    }
}

#[test]
fn test_declarations_run_via_run_tests() {
    let parse = kira_parser::parse(
        "fn double(x: i32) -> i32 { return x * 2 }\nfn main() -> i32 { return 0 }\ntest \"doubling\" {\n    assert_eq(double(21), 42)\n}\ntest \"broken\" {\n    assert_eq(double(1), 3)\n}",
    );
    assert!(parse.ok(), "{:?}", parse.diagnostics);
    let res = kira_resolver::resolve(parse.program);
    assert!(res.ok(), "{:?}", res.diagnostics);
    let mut interp = Interp::new(&res);
    let failures = interp.run_tests();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].0, "broken");
}
