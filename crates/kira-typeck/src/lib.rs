//! Kira type checker.
//!
//! Walks the resolved program and assigns a canonical [`Ty`] to every
//! expression, verifying the typing rules, the effect discipline, match
//! exhaustiveness, and trait/impl conformance. Diagnostics are collected
//! rather than aborting, so several problems surface per run; recovery
//! uses the `Ty::Error` marker, which never unifies with a concrete type
//! and never triggers follow-on reports.

pub mod builtins;
pub mod defs;
pub mod exhaustiveness;
pub mod ty;

mod check;

use rustc_hash::FxHashMap;

use kira_common::diagnostic::{has_errors, Diagnostic};
use kira_parser::ast::ExprId;
use kira_resolver::symbol::UnitId;
use kira_resolver::Resolution;

pub use ty::Ty;

/// The checker's output.
#[derive(Debug)]
pub struct TypeckResult {
    /// Resolved type of every checked expression, keyed by (unit, expr).
    pub types: FxHashMap<(UnitId, ExprId), Ty>,
    pub diagnostics: Vec<Diagnostic>,
}

impl TypeckResult {
    /// Whether checking completed without errors. Warnings (for example
    /// unreachable match arms) do not fail the check.
    pub fn ok(&self) -> bool {
        !has_errors(&self.diagnostics)
    }

    pub fn expr_ty(&self, unit: UnitId, expr: ExprId) -> Option<&Ty> {
        self.types.get(&(unit, expr))
    }
}

/// Type-check a resolved program (all loaded units).
pub fn check(res: &Resolution) -> TypeckResult {
    let mut checker = check::Checker::new(res);
    checker.check_all();
    TypeckResult {
        types: checker.types,
        diagnostics: checker.diagnostics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check_source(source: &str) -> TypeckResult {
        let parse = kira_parser::parse(source);
        assert!(parse.ok(), "parse failed: {:?}", parse.diagnostics);
        let res = kira_resolver::resolve(parse.program);
        assert!(res.ok(), "resolution failed: {:?}", res.diagnostics);
        check(&res)
    }

    fn check_errors(source: &str) -> Vec<Diagnostic> {
        let result = check_source(source);
        result.diagnostics
    }

    #[test]
    fn minimal_main_checks() {
        let result = check_source("fn main() -> i32 { return 42 }");
        assert!(result.ok(), "{:?}", result.diagnostics);
    }

    #[test]
    fn recursive_factorial_checks() {
        let result = check_source(
            "fn factorial(n: i32) -> i32 {\n    if n <= 1 {\n        return 1\n    }\n    return n * factorial(n - 1)\n}\nfn main() -> i32 { return factorial(5) }",
        );
        assert!(result.ok(), "{:?}", result.diagnostics);
    }

    #[test]
    fn literal_defaults_and_mismatch() {
        let errors = check_errors("fn main() -> i32 {\n    let x: i64 = 1i32\n    return 0\n}");
        assert!(errors.iter().any(|d| d.code == "E0001"));
    }

    #[test]
    fn unsuffixed_literal_adopts_expected_width() {
        let result = check_source("fn main() -> i32 {\n    let x: i64 = 1\n    return 0\n}");
        assert!(result.ok(), "{:?}", result.diagnostics);
    }

    #[test]
    fn literal_defaulting_flows_through_arithmetic() {
        // The declared type reaches the operands, so width-typed literal
        // arithmetic is well-typed without suffixes.
        let result = check_source(
            "fn main() -> i32 {\n    let y: u8 = 0 - 1\n    let b: i64 = 4000000000 + 4000000000\n    return 0\n}",
        );
        assert!(result.ok(), "{:?}", result.diagnostics);
    }

    #[test]
    fn integer_literal_overflow_is_reported() {
        let errors = check_errors("fn main() -> i32 {\n    let x: i8 = 300\n    return 0\n}");
        assert!(errors.iter().any(|d| d.code == "E0011"));
    }

    #[test]
    fn arithmetic_requires_matching_types() {
        let errors = check_errors(
            "fn main() -> i32 {\n    let a: i32 = 1\n    let b: i64 = 2\n    let c: i32 = a + b\n    return c\n}",
        );
        assert!(errors.iter().any(|d| d.code == "E0001"));
    }

    #[test]
    fn string_concatenation_is_allowed() {
        let result = check_source(
            "fn main() -> i32 {\n    let s: string = \"a\" + \"b\"\n    return 0\n}",
        );
        assert!(result.ok(), "{:?}", result.diagnostics);
    }

    #[test]
    fn non_exhaustive_match_names_missing_variant() {
        let errors = check_errors(
            "type Color = Red | Green | Blue\nfn describe(c: Color) -> string {\n    match c {\n        Red => { return \"r\" }\n        Green => { return \"g\" }\n    }\n    return \"\"\n}\nfn main() -> i32 { return 0 }",
        );
        let found = errors
            .iter()
            .find(|d| d.code == "E0012")
            .expect("expected a non-exhaustive match error");
        assert!(
            found.message.contains("missing Blue"),
            "unexpected message: {}",
            found.message
        );
    }

    #[test]
    fn exhaustive_match_checks() {
        let result = check_source(
            "type Color = Red | Green | Blue\nfn describe(c: Color) -> string {\n    match c {\n        Red => { return \"r\" }\n        Green => { return \"g\" }\n        Blue => { return \"b\" }\n    }\n    return \"\"\n}\nfn main() -> i32 { return 0 }",
        );
        assert!(result.ok(), "{:?}", result.diagnostics);
    }

    #[test]
    fn unreachable_arm_is_a_warning_only() {
        let result = check_source(
            "fn f(n: i32) -> i32 {\n    match n {\n        _ => { return 0 }\n        1 => { return 1 }\n    }\n    return 0\n}\nfn main() -> i32 { return 0 }",
        );
        assert!(result.ok());
        assert!(result.diagnostics.iter().any(|d| d.code == "W0001"));
    }

    #[test]
    fn pure_function_cannot_call_std_io() {
        let errors = check_errors(
            "fn bad() -> i32 {\n    std.io.println(\"x\")\n    return 0\n}\nfn main() -> i32 { return bad() }",
        );
        let found = errors
            .iter()
            .find(|d| d.code == "E0005")
            .expect("expected an effect violation");
        assert!(found
            .message
            .contains("cannot call effect function from pure function"));
    }

    #[test]
    fn effect_function_may_call_std_io() {
        let result = check_source(
            "effect fn main() -> IO[void] {\n    std.io.println(\"x\")\n}",
        );
        assert!(result.ok(), "{:?}", result.diagnostics);
    }

    #[test]
    fn pure_function_cannot_call_effect_function() {
        let errors = check_errors(
            "effect fn log(msg: string) -> void {\n    println(msg)\n}\nfn bad(msg: string) -> i32 {\n    log(msg)\n    return 0\n}\nfn main() -> i32 { return 0 }",
        );
        assert!(errors.iter().any(|d| d.code == "E0005"));
    }

    #[test]
    fn try_requires_effect_function() {
        let errors = check_errors(
            "fn parse(s: string) -> Option[i32] {\n    let n: i32 = to_first(s)?\n    return Some(n)\n}\nfn to_first(s: string) -> Option[i32] { return None }\nfn main() -> i32 { return 0 }",
        );
        assert!(errors.iter().any(|d| d.code == "E0016"));
    }

    #[test]
    fn try_in_effect_function_with_option_return() {
        let result = check_source(
            "effect fn parse(s: string) -> Option[i32] {\n    let n: i32 = first(s)?\n    return Some(n)\n}\nfn first(s: string) -> Option[i32] { return None }\nfn main() -> i32 { return 0 }",
        );
        assert!(result.ok(), "{:?}", result.diagnostics);
    }

    #[test]
    fn coalesce_unwraps_option() {
        let result = check_source(
            "fn f(o: Option[i32]) -> i32 {\n    return o ?? 0\n}\nfn main() -> i32 { return 0 }",
        );
        assert!(result.ok(), "{:?}", result.diagnostics);
    }

    #[test]
    fn list_pattern_matching_checks() {
        let result = check_source(
            "fn main() -> i32 {\n    let xs: List[(i32, i32)] = Cons((1, 10), Cons((2, 20), Nil))\n    match xs {\n        Cons(e, r) => { return e.0 }\n        Nil => { return 0 }\n    }\n    return 0\n}",
        );
        assert!(result.ok(), "{:?}", result.diagnostics);
    }

    #[test]
    fn generic_function_instantiates_at_call_site() {
        let result = check_source(
            "fn identity[T](x: T) -> T { return x }\nfn main() -> i32 {\n    let n: i32 = identity(41) + 1\n    return n\n}",
        );
        assert!(result.ok(), "{:?}", result.diagnostics);
    }

    #[test]
    fn call_arity_is_checked() {
        let errors = check_errors(
            "fn add(a: i32, b: i32) -> i32 { return a + b }\nfn main() -> i32 { return add(1) }",
        );
        assert!(errors.iter().any(|d| d.code == "E0004"));
    }

    #[test]
    fn record_literal_requires_all_fields() {
        let errors = check_errors(
            "type Point = { x: i32, y: i32 }\nfn main() -> i32 {\n    let p: Point = Point { x: 1 }\n    return p.x\n}",
        );
        assert!(errors.iter().any(|d| d.code == "E0009"));
    }

    #[test]
    fn field_access_on_record() {
        let result = check_source(
            "type Point = { x: i32, y: i32 }\nfn main() -> i32 {\n    let p: Point = Point { x: 1, y: 2 }\n    return p.x + p.y\n}",
        );
        assert!(result.ok(), "{:?}", result.diagnostics);
    }

    #[test]
    fn unknown_field_is_reported() {
        let errors = check_errors(
            "type Point = { x: i32, y: i32 }\nfn main() -> i32 {\n    let p: Point = Point { x: 1, y: 2 }\n    return p.z\n}",
        );
        assert!(errors.iter().any(|d| d.code == "E0009"));
    }

    #[test]
    fn trait_impl_and_method_call() {
        let result = check_source(
            "type Circle = { radius: f64 }\ntrait Area {\n    fn area(self) -> f64\n}\nimpl Area for Circle {\n    fn area(self) -> f64 { return self.radius * self.radius }\n}\nfn main() -> i32 {\n    let c: Circle = Circle { radius: 2.0 }\n    let a: f64 = c.area()\n    return 0\n}",
        );
        assert!(result.ok(), "{:?}", result.diagnostics);
    }

    #[test]
    fn missing_trait_method_is_reported() {
        let errors = check_errors(
            "type Circle = { radius: f64 }\ntrait Area {\n    fn area(self) -> f64\n}\nimpl Area for Circle {\n}\nfn main() -> i32 { return 0 }",
        );
        assert!(errors.iter().any(|d| d.code == "E0007"));
    }

    #[test]
    fn builtin_methods_on_option() {
        let result = check_source(
            "fn f(o: Option[i32]) -> i32 {\n    if o.is_some() {\n        return o.unwrap()\n    }\n    return o.unwrap_or(7)\n}\nfn main() -> i32 { return 0 }",
        );
        assert!(result.ok(), "{:?}", result.diagnostics);
    }

    #[test]
    fn error_marker_does_not_cascade() {
        // One undefined-type error; the addition involving the broken
        // binding must not produce a second mismatch report.
        let parse = kira_parser::parse(
            "fn main() -> i32 {\n    let x: Missing = 1\n    let y: i32 = x + 1\n    return y\n}",
        );
        assert!(parse.ok());
        let res = kira_resolver::resolve(parse.program);
        // The resolver reports the unknown type; checking continues.
        let result = check(&res);
        let e0001 = result
            .diagnostics
            .iter()
            .filter(|d| d.code == "E0001")
            .count();
        assert_eq!(e0001, 0, "error marker must absorb downstream checks");
    }

    #[test]
    fn every_checked_expression_has_a_type() {
        let parse = kira_parser::parse(
            "fn main() -> i32 {\n    let x: i32 = 1 + 2 * 3\n    let t: (i32, bool) = (x, true)\n    return t.0\n}",
        );
        assert!(parse.ok());
        let expr_count = parse.program.arena.exprs.len();
        let res = kira_resolver::resolve(parse.program);
        assert!(res.ok());
        let result = check(&res);
        assert!(result.ok());
        for expr in 0..expr_count {
            assert!(
                result
                    .expr_ty(UnitId::ROOT, ExprId(expr as u32))
                    .is_some(),
                "expression {expr} was never typed"
            );
        }
    }
}
