//! Line handling for the prompt: token echo and the colon commands.

use kira_lexer::Lexer;
use kira_resolver::loader::FsLoader;
use kira_resolver::symbol::UnitId;

/// What the prompt loop should do after a line.
pub enum Outcome {
    Continue(String),
    Quit,
}

/// Prompt state. Each `:load`/`:type` builds a fresh pipeline; the prompt
/// itself keeps no cross-line bindings.
#[derive(Default)]
pub struct Session;

impl Session {
    pub fn new() -> Session {
        Session
    }

    /// Handle one input line and return the text to show.
    pub fn handle(&mut self, line: &str) -> Outcome {
        if let Some(rest) = line.strip_prefix(':') {
            let (command, argument) = match rest.split_once(' ') {
                Some((command, argument)) => (command, argument.trim()),
                None => (rest, ""),
            };
            return match command {
                "help" => Outcome::Continue(help_text()),
                "quit" => Outcome::Quit,
                "type" => Outcome::Continue(self.type_of(argument)),
                "load" => Outcome::Continue(self.load(argument)),
                other => Outcome::Continue(format!("unknown command `:{other}` -- try :help")),
            };
        }
        Outcome::Continue(echo_tokens(line))
    }

    /// `:type <expr>` -- check the expression in an empty program and
    /// report the type the checker assigned.
    fn type_of(&self, expr: &str) -> String {
        if expr.is_empty() {
            return "usage: :type <expr>".to_string();
        }
        let source = format!("fn probe() -> void {{\n    let it: _ = {expr}\n}}");
        let parse = kira_parser::parse(&source);
        if !parse.ok() {
            return first_message(&parse.diagnostics);
        }

        // The probe's init expression is the one the user typed.
        let probe_expr = {
            use kira_parser::ast::{DeclKind, StmtKind};
            let program = &parse.program;
            program.decls.first().and_then(|decl| {
                let DeclKind::Function(f) = &program.decl(*decl).kind else {
                    return None;
                };
                let body = f.body.as_ref()?;
                let StmtKind::Let { init, .. } = &program.stmt(*body.first()?).kind else {
                    return None;
                };
                Some(*init)
            })
        };
        let Some(probe_expr) = probe_expr else {
            return "could not parse expression".to_string();
        };

        let res = kira_resolver::resolve(parse.program);
        if !res.ok() {
            return first_message(&res.diagnostics);
        }
        let typeck = kira_typeck::check(&res);
        if !typeck.ok() {
            return first_message(&typeck.diagnostics);
        }
        match typeck.expr_ty(UnitId::ROOT, probe_expr) {
            Some(ty) => format!("{ty}"),
            None => "unknown".to_string(),
        }
    }

    /// `:load <file>` -- run a program through the full pipeline.
    fn load(&self, path: &str) -> String {
        if path.is_empty() {
            return "usage: :load <file.ki>".to_string();
        }
        let source = match std::fs::read_to_string(path) {
            Ok(source) => source,
            Err(error) => return format!("cannot read `{path}`: {error}"),
        };
        let parse = kira_parser::parse(&source);
        if !parse.ok() {
            return first_message(&parse.diagnostics);
        }
        let mut loader = FsLoader::for_file(std::path::Path::new(path));
        let res = kira_resolver::resolve_with_loader(parse.program, &mut loader);
        if !res.ok() {
            return first_message(&res.diagnostics);
        }
        let typeck = kira_typeck::check(&res);
        if !typeck.ok() {
            return first_message(&typeck.diagnostics);
        }
        let mut interp = kira_interp::Interp::new(&res).with_typeck(&typeck);
        match interp.run() {
            Ok(value) => format!("=> {}", kira_interp::value::display_value(&value)),
            Err(error) => format!("runtime error: {}", error.message),
        }
    }
}

/// Render a line's token stream, one token per line.
fn echo_tokens(line: &str) -> String {
    let (tokens, diagnostics) = Lexer::tokenize(line);
    let mut out = String::new();
    for token in &tokens {
        if token.kind == kira_common::token::TokenKind::Eof {
            break;
        }
        out.push_str(&format!(
            "{:?} {:?} at {}:{}\n",
            token.kind, token.text, token.span.start.line, token.span.start.column
        ));
    }
    for diagnostic in &diagnostics {
        out.push_str(&format!("error[{}]: {}\n", diagnostic.code, diagnostic.message));
    }
    out.trim_end().to_string()
}

fn first_message(diagnostics: &[kira_common::diagnostic::Diagnostic]) -> String {
    diagnostics
        .iter()
        .find(|d| d.is_error())
        .map(|d| format!("error[{}]: {}", d.code, d.message))
        .unwrap_or_else(|| "error".to_string())
}

fn help_text() -> String {
    [
        "Type a line of Kira to see its token stream.",
        ":type <expr>   show the type of an expression",
        ":load <file>   parse, check, and run a source file",
        ":help          this message",
        ":quit          leave the prompt",
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn echoes_tokens() {
        let mut session = Session::new();
        let Outcome::Continue(output) = session.handle("let x = 1") else {
            panic!("expected output");
        };
        assert!(output.contains("Let"));
        assert!(output.contains("Ident"));
        assert!(output.contains("IntLiteral"));
    }

    #[test]
    fn quit_ends_the_session() {
        let mut session = Session::new();
        assert!(matches!(session.handle(":quit"), Outcome::Quit));
    }

    #[test]
    fn type_command_reports_expression_types() {
        let mut session = Session::new();
        let Outcome::Continue(output) = session.handle(":type 1 + 2") else {
            panic!("expected output");
        };
        assert_eq!(output, "i32");

        let Outcome::Continue(output) = session.handle(":type Some(\"a\")") else {
            panic!("expected output");
        };
        assert_eq!(output, "Option[string]");
    }

    #[test]
    fn unknown_command_is_reported() {
        let mut session = Session::new();
        let Outcome::Continue(output) = session.handle(":frobnicate") else {
            panic!("expected output");
        };
        assert!(output.contains("unknown command"));
    }
}
