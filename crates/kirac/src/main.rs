//! The Kira front-end driver.
//!
//! Subcommands:
//!
//! - `kirac tokenize <file.ki>` - print the token stream (`--json` for
//!   machine-readable output)
//! - `kirac parse <file.ki>` - parse and print the canonical AST dump
//! - `kirac check <file.ki>` - resolve and type-check
//! - `kirac run <file.ki>` - run the program; `main`'s integer result
//!   becomes the exit code
//! - `kirac repl` - interactive prompt
//!
//! Exit code is zero on success and one when any stage reports an error.
//! Diagnostics go to standard error with file, line, and column.

mod report;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};

use kira_resolver::loader::FsLoader;
use report::report_diagnostics;

#[derive(Parser)]
#[command(name = "kirac", version, about = "The Kira front-end and interpreter")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a source file's token stream
    Tokenize {
        /// Path to the source file
        file: PathBuf,

        /// Emit the tokens as JSON
        #[arg(long)]
        json: bool,
    },
    /// Parse a source file and print its canonical AST rendering
    Parse {
        /// Path to the source file
        file: PathBuf,
    },
    /// Resolve and type-check a source file
    Check {
        /// Path to the source file
        file: PathBuf,
    },
    /// Run a program; `main`'s integer result becomes the exit code
    Run {
        /// Path to the source file
        file: PathBuf,
    },
    /// Start the interactive prompt
    Repl,
}

fn main() {
    let cli = Cli::parse();
    let code = match cli.command {
        Commands::Tokenize { file, json } => tokenize(&file, json),
        Commands::Parse { file } => parse(&file),
        Commands::Check { file } => check(&file),
        Commands::Run { file } => run(&file),
        Commands::Repl => match kira_repl::run() {
            Ok(()) => 0,
            Err(error) => {
                eprintln!("error: {error}");
                1
            }
        },
    };
    process::exit(code);
}

fn read_source(file: &Path) -> Result<String, i32> {
    std::fs::read_to_string(file).map_err(|error| {
        eprintln!("error: cannot read `{}`: {error}", file.display());
        1
    })
}

fn tokenize(file: &Path, json: bool) -> i32 {
    let source = match read_source(file) {
        Ok(source) => source,
        Err(code) => return code,
    };
    let (tokens, diagnostics) = kira_lexer::Lexer::tokenize(&source);

    if json {
        match serde_json::to_string_pretty(&tokens) {
            Ok(rendered) => println!("{rendered}"),
            Err(error) => {
                eprintln!("error: {error}");
                return 1;
            }
        }
    } else {
        for token in &tokens {
            println!(
                "{}:{}: {:?} {:?}",
                token.span.start.line, token.span.start.column, token.kind, token.text
            );
        }
    }
    if report_diagnostics(&source, &file.display().to_string(), &diagnostics) {
        1
    } else {
        0
    }
}

fn parse(file: &Path) -> i32 {
    let source = match read_source(file) {
        Ok(source) => source,
        Err(code) => return code,
    };
    let parse = kira_parser::parse(&source);
    if report_diagnostics(&source, &file.display().to_string(), &parse.diagnostics) {
        return 1;
    }
    print!("{}", kira_parser::dump::dump_program(&parse.program));
    0
}

/// Parse, resolve, and type-check. On success hands the resolution and
/// the checker's result to the caller for further stages.
fn check_pipeline(
    file: &Path,
) -> Result<(kira_resolver::Resolution, kira_typeck::TypeckResult), i32> {
    let source = match read_source(file) {
        Ok(source) => source,
        Err(code) => return Err(code),
    };
    let path = file.display().to_string();

    let parse = kira_parser::parse(&source);
    if report_diagnostics(&source, &path, &parse.diagnostics) {
        return Err(1);
    }

    let mut loader = FsLoader::for_file(file);
    let res = kira_resolver::resolve_with_loader(parse.program, &mut loader);
    if report_diagnostics(&source, &path, &res.diagnostics) {
        return Err(1);
    }

    let typeck = kira_typeck::check(&res);
    if report_diagnostics(&source, &path, &typeck.diagnostics) {
        return Err(1);
    }
    Ok((res, typeck))
}

fn check(file: &Path) -> i32 {
    match check_pipeline(file) {
        Ok(_) => 0,
        Err(code) => code,
    }
}

fn run(file: &Path) -> i32 {
    let (res, typeck) = match check_pipeline(file) {
        Ok(checked) => checked,
        Err(code) => return code,
    };
    let mut interp = kira_interp::Interp::new(&res).with_typeck(&typeck);
    match interp.run() {
        Ok(kira_interp::value::Value::Int(code)) => code.clamp(0, 255) as i32,
        Ok(_) => 0,
        Err(error) => {
            let source = std::fs::read_to_string(file).unwrap_or_default();
            report_diagnostics(
                &source,
                &file.display().to_string(),
                &[error.to_diagnostic()],
            );
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_program(dir: &tempfile::TempDir, name: &str, source: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).expect("create temp file");
        file.write_all(source.as_bytes()).expect("write temp file");
        path
    }

    #[test]
    fn run_returns_main_exit_value() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_program(&dir, "main.ki", "fn main() -> i32 { return 42 }");
        assert_eq!(run(&path), 42);
    }

    #[test]
    fn check_rejects_undefined_symbols() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_program(
            &dir,
            "main.ki",
            "fn main() -> i64 {\n    let x: i64 = undefined_var\n    return x\n}",
        );
        assert_eq!(check(&path), 1);
    }

    #[test]
    fn check_accepts_cross_file_imports() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_program(
            &dir,
            "util.ki",
            "module util\n\npub fn double(x: i32) -> i32 { return x * 2 }",
        );
        let main = write_program(
            &dir,
            "main.ki",
            "import util.{ double }\n\nfn main() -> i32 { return double(21) }",
        );
        assert_eq!(run(&main), 42);
    }

    #[test]
    fn tokenize_reports_lexer_errors() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_program(&dir, "bad.ki", "let ~ = 1");
        assert_eq!(tokenize(&path, false), 1);
    }

    #[test]
    fn parse_command_round_trips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_program(
            &dir,
            "main.ki",
            "fn main() -> i32 {\n    return 1 + 2\n}",
        );
        assert_eq!(parse(&path), 0);
    }
}
