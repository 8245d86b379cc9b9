//! Kira parser: recursive-descent parser producing an arena-owned AST.
//!
//! This crate turns the token stream from `kira-lexer` into a [`Program`]:
//! typed arenas of expression, statement, type, pattern, and declaration
//! nodes, plus the file's module header, import list, and top-level
//! declaration order. Downstream stages key their side tables (resolved
//! symbols, resolved types) by the arena ids.

pub mod ast;
pub mod dump;
mod parser;

use kira_common::diagnostic::{has_errors, Diagnostic};
use kira_lexer::Lexer;

pub use ast::Program;

/// Result of parsing one Kira source file.
#[derive(Debug)]
pub struct Parse {
    pub program: Program,
    /// Lexer and parser diagnostics, in source order of discovery.
    pub diagnostics: Vec<Diagnostic>,
}

impl Parse {
    /// Whether parsing completed without errors.
    pub fn ok(&self) -> bool {
        !has_errors(&self.diagnostics)
    }
}

/// Parse a Kira source file.
///
/// Lexes the source, parses the token stream, and returns the program
/// together with every diagnostic either stage produced. The program is
/// structurally complete even in the presence of errors; callers must
/// check [`Parse::ok`] before running later stages.
pub fn parse(source: &str) -> Parse {
    let (tokens, lex_diagnostics) = Lexer::tokenize(source);
    let mut p = parser::Parser::new(tokens);
    parser::items::parse_program(&mut p);

    let mut diagnostics = lex_diagnostics;
    diagnostics.extend(p.diagnostics);
    Parse {
        program: p.program,
        diagnostics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{DeclKind, ExprKind, StmtKind, TypeDefKind};

    fn parse_ok(source: &str) -> Program {
        let parse = parse(source);
        assert!(
            parse.ok(),
            "unexpected diagnostics for {source:?}: {:?}",
            parse.diagnostics
        );
        parse.program
    }

    #[test]
    fn parses_minimal_main() {
        let program = parse_ok("fn main() -> i32 { return 42 }");
        assert_eq!(program.decls.len(), 1);
        let DeclKind::Function(f) = &program.decl(program.decls[0]).kind else {
            panic!("expected a function");
        };
        assert_eq!(f.name, "main");
        assert!(!f.effect);
        assert_eq!(f.body.as_ref().map(Vec::len), Some(1));
    }

    #[test]
    fn parses_module_and_imports() {
        let program = parse_ok("module a.b\n\nimport c.d\nimport e.{ F, G as H }\n\nfn main() -> i32 { return 0 }");
        assert_eq!(program.module.as_ref().map(|m| m.path.clone()), Some(vec!["a".into(), "b".into()]));
        assert_eq!(program.imports.len(), 2);
        assert_eq!(program.imports[1].items.as_ref().map(Vec::len), Some(2));
        assert_eq!(
            program.imports[1].items.as_ref().unwrap()[1].alias.as_deref(),
            Some("H")
        );
    }

    #[test]
    fn parses_sum_type() {
        let program = parse_ok("type Color = Red | Green | Blue");
        let DeclKind::TypeDef { name, def, .. } = &program.decl(program.decls[0]).kind else {
            panic!("expected a type definition");
        };
        assert_eq!(name, "Color");
        let TypeDefKind::Sum(variants) = def else {
            panic!("expected a sum type");
        };
        assert_eq!(variants.len(), 3);
    }

    #[test]
    fn single_uppercase_name_is_an_alias() {
        let program = parse_ok("type A = B");
        let DeclKind::TypeDef { def, .. } = &program.decl(program.decls[0]).kind else {
            panic!("expected a type definition");
        };
        assert!(matches!(def, TypeDefKind::Alias(_)));
    }

    #[test]
    fn parses_variant_payloads() {
        let program = parse_ok("type Shape = Circle(f64) | Rect { w: f64, h: f64 } | Point");
        let DeclKind::TypeDef { def, .. } = &program.decl(program.decls[0]).kind else {
            panic!("expected a type definition");
        };
        let TypeDefKind::Sum(variants) = def else {
            panic!("expected a sum type");
        };
        assert_eq!(variants.len(), 3);
    }

    #[test]
    fn operator_precedence() {
        let program = parse_ok("fn f() -> i32 { return 1 + 2 * 3 }");
        let DeclKind::Function(f) = &program.decl(program.decls[0]).kind else {
            panic!();
        };
        let body = f.body.as_ref().unwrap();
        let StmtKind::Return { value: Some(value) } = &program.stmt(body[0]).kind else {
            panic!("expected return");
        };
        let ExprKind::Binary { op, rhs, .. } = &program.expr(*value).kind else {
            panic!("expected binary expression");
        };
        assert_eq!(op.as_str(), "+");
        let ExprKind::Binary { op: inner, .. } = &program.expr(*rhs).kind else {
            panic!("expected nested multiplication");
        };
        assert_eq!(inner.as_str(), "*");
    }

    #[test]
    fn cons_call_is_a_variant_constructor() {
        let program = parse_ok(
            "fn main() -> i32 {\n    let xs: List[(i32, i32)] = Cons((1, 10), Nil)\n    return 0\n}",
        );
        let DeclKind::Function(f) = &program.decl(program.decls[0]).kind else {
            panic!();
        };
        let body = f.body.as_ref().unwrap();
        let StmtKind::Let { init, .. } = &program.stmt(body[0]).kind else {
            panic!("expected let");
        };
        let ExprKind::Variant { name, args } = &program.expr(*init).kind else {
            panic!("expected variant constructor");
        };
        assert_eq!(name, "Cons");
        assert_eq!(args.as_ref().map(Vec::len), Some(2));
    }

    #[test]
    fn match_statement_requires_blocks() {
        let parse = parse("fn f(c: Color) -> i32 {\n    match c { Red => 1 }\n    return 0\n}");
        assert!(!parse.ok());
    }

    #[test]
    fn match_expression_allows_expression_arms() {
        parse_ok("fn f(c: Color) -> i32 {\n    let n: i32 = match c { Red => 1, _ => 0 }\n    return n\n}");
    }

    #[test]
    fn parse_errors_resynchronize() {
        let parse = parse("fn broken( -> i32 { return 1 }\nfn ok() -> i32 { return 2 }");
        assert!(!parse.ok());
        // The second function still parses after recovery.
        assert!(parse
            .program
            .decls
            .iter()
            .any(|d| matches!(&parse.program.decl(*d).kind, DeclKind::Function(f) if f.name == "ok")));
    }

    #[test]
    fn interpolated_string_parses_embedded_expression() {
        let program = parse_ok("effect fn main() -> IO[void] {\n    println(\"x = ${1 + 2}\")\n}");
        let DeclKind::Function(f) = &program.decl(program.decls[0]).kind else {
            panic!();
        };
        assert!(f.effect);
    }

    #[test]
    fn trait_and_impl_parse() {
        parse_ok(
            "trait Area {\n    fn area(self) -> f64\n}\n\nimpl Area for Shape {\n    fn area(self) -> f64 { return 1.0 }\n}",
        );
    }

    #[test]
    fn closure_expression() {
        parse_ok("fn main() -> i32 {\n    let add: fn(i32, i32) -> i32 = fn(a: i32, b: i32) -> i32 { return a + b }\n    return add(1, 2)\n}");
    }
}
