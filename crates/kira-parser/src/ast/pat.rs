use kira_common::span::Span;

use super::{PatId, TypeId};

/// A pattern node.
#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    pub kind: PatternKind,
    pub span: Span,
}

/// Literal values a pattern can match against.
#[derive(Debug, Clone, PartialEq)]
pub enum PatLit {
    Int(i128),
    Float(f64),
    Str(String),
    Char(char),
    Bool(bool),
}

/// A bound of a range pattern. Integer and character ranges only.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RangeBound {
    Int(i128),
    Char(char),
}

/// Every pattern form in Kira.
#[derive(Debug, Clone, PartialEq)]
pub enum PatternKind {
    /// `_`
    Wildcard,
    /// `name` binds immutably; `var name` binds mutably.
    Ident { name: String, mutable: bool },
    /// `pattern: Type`
    Typed { pattern: PatId, ty: TypeId },
    Literal(PatLit),
    /// `Some(x)`, `Red`. Uppercase-led, positional arguments. Named
    /// payload matching is spelled as a record pattern with a type name.
    Constructor { name: String, args: Option<Vec<PatId>> },
    /// `{ x: px, y: py }` or `Point { x: px, .. }`.
    Record {
        type_name: Option<String>,
        fields: Vec<(String, PatId)>,
        rest: bool,
    },
    /// `(a, b, c)`
    Tuple(Vec<PatId>),
    /// `a | b | c` -- all alternatives must bind the same names.
    Or(Vec<PatId>),
    /// `1..10`, `'a'..='z'`.
    Range {
        start: RangeBound,
        end: RangeBound,
        inclusive: bool,
    },
    /// `..` inside record patterns and similar positions.
    Rest,
}
