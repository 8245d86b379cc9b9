use insta::assert_snapshot;
use kira_lexer::Lexer;

/// Render a token stream as one kind per line, for inline snapshots.
fn kind_lines(source: &str) -> String {
    let (tokens, diagnostics) = Lexer::tokenize(source);
    assert!(
        diagnostics.is_empty(),
        "unexpected diagnostics: {diagnostics:?}"
    );
    tokens
        .iter()
        .map(|t| format!("{:?}", t.kind))
        .collect::<Vec<_>>()
        .join("\n")
}

#[test]
fn tokenizes_minimal_function() {
    assert_snapshot!(kind_lines("fn main() -> i32 { return 42 }"), @r"
    Fn
    Ident
    LParen
    RParen
    Arrow
    Ident
    LBrace
    Return
    IntLiteral
    RBrace
    Eof
    ");
}

#[test]
fn tokenizes_effect_function_header() {
    assert_snapshot!(kind_lines("pub effect fn main() -> IO[void]"), @r"
    Pub
    Effect
    Fn
    Ident
    LParen
    RParen
    Arrow
    Ident
    LBracket
    Ident
    RBracket
    Eof
    ");
}

#[test]
fn tokenizes_sum_type_declaration() {
    assert_snapshot!(kind_lines("type Color = Red | Green | Blue"), @r"
    Type
    Ident
    Eq
    Ident
    Pipe
    Ident
    Pipe
    Ident
    Eof
    ");
}

#[test]
fn tokenizes_match_with_arrow_arms() {
    assert_snapshot!(kind_lines("match c { Red => 1 }"), @r"
    Match
    Ident
    LBrace
    Ident
    FatArrow
    IntLiteral
    RBrace
    Eof
    ");
}

#[test]
fn tokenizes_import_with_alias() {
    assert_snapshot!(kind_lines("import a.b.{ Foo as Bar }"), @r"
    Import
    Ident
    Dot
    Ident
    Dot
    LBrace
    Ident
    As
    Ident
    RBrace
    Eof
    ");
}

#[test]
fn tokenizes_ranges_and_coalesce() {
    assert_snapshot!(kind_lines("0..10 0..=10 x ?? y x?"), @r"
    IntLiteral
    DotDot
    IntLiteral
    IntLiteral
    DotDotEq
    IntLiteral
    Ident
    QuestionQuestion
    Ident
    Ident
    Question
    Eof
    ");
}

#[test]
fn keywords_and_wordy_operators() {
    assert_snapshot!(kind_lines("a and b or not c is Some"), @r"
    Ident
    And
    Ident
    Or
    Not
    Ident
    Is
    Ident
    Eof
    ");
}

#[test]
fn newlines_separate_statements() {
    assert_snapshot!(kind_lines("let a: i32 = 1\nlet b: i32 = 2"), @r"
    Let
    Ident
    Colon
    Ident
    Eq
    IntLiteral
    Newline
    Let
    Ident
    Colon
    Ident
    Eq
    IntLiteral
    Eof
    ");
}

#[test]
fn error_tokens_do_not_stop_the_stream() {
    let (tokens, diagnostics) = Lexer::tokenize("let ~ x");
    assert!(diagnostics.iter().any(|d| d.code == "L0004"));
    // Lexing continues past the stray character.
    let kinds: Vec<String> = tokens.iter().map(|t| format!("{:?}", t.kind)).collect();
    assert_eq!(kinds, ["Let", "Error", "Ident", "Eof"]);
}

#[test]
fn spans_cover_their_lexemes() {
    let (tokens, _) = Lexer::tokenize("let abc = 12");
    let abc = &tokens[1];
    assert_eq!(abc.text, "abc");
    assert_eq!(abc.span.start.offset, 4);
    assert_eq!(abc.span.end.offset, 7);
    assert_eq!(abc.span.start.column, 5);
}
