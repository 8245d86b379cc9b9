//! Interactive prompt for Kira.
//!
//! Reads a line at a time and echoes its token stream. Commands:
//! `:help`, `:quit`, `:type <expr>`, `:load <file>`.

mod session;

pub use session::Session;

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

/// Run the prompt until `:quit` or end of input.
pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut editor = DefaultEditor::new()?;
    let mut session = Session::new();

    println!("Kira prompt -- :help for commands");
    loop {
        match editor.readline("kira> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let _ = editor.add_history_entry(line);
                match session.handle(line) {
                    session::Outcome::Continue(output) => {
                        if !output.is_empty() {
                            println!("{output}");
                        }
                    }
                    session::Outcome::Quit => break,
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(error) => {
                eprintln!("error: {error}");
                break;
            }
        }
    }
    Ok(())
}
