use kira_common::diagnostic::Diagnostic;
use kira_common::span::Span;

use crate::value::Value;

/// Every way evaluation can fail at runtime. Reported with the span of
/// the failing expression; runtime errors terminate the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeErrorKind {
    UndefinedVariable,
    ImmutableAssignment,
    TypeMismatch,
    DivisionByZero,
    IndexOutOfBounds,
    FieldNotFound,
    NotCallable,
    ArityMismatch,
    MatchFailed,
    ErrorPropagation,
    Overflow,
    OutOfMemory,
    InvalidOperation,
    AssertionFailed,
    StackOverflow,
}

impl RuntimeErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            RuntimeErrorKind::UndefinedVariable => "K0001",
            RuntimeErrorKind::ImmutableAssignment => "K0002",
            RuntimeErrorKind::TypeMismatch => "K0003",
            RuntimeErrorKind::DivisionByZero => "K0004",
            RuntimeErrorKind::IndexOutOfBounds => "K0005",
            RuntimeErrorKind::FieldNotFound => "K0006",
            RuntimeErrorKind::NotCallable => "K0007",
            RuntimeErrorKind::ArityMismatch => "K0008",
            RuntimeErrorKind::MatchFailed => "K0009",
            RuntimeErrorKind::ErrorPropagation => "K0010",
            RuntimeErrorKind::Overflow => "K0011",
            RuntimeErrorKind::OutOfMemory => "K0012",
            RuntimeErrorKind::InvalidOperation => "K0013",
            RuntimeErrorKind::AssertionFailed => "K0014",
            RuntimeErrorKind::StackOverflow => "K0015",
        }
    }
}

/// A fatal runtime error with the span of the failing expression.
#[derive(Debug, Clone)]
pub struct RuntimeError {
    pub kind: RuntimeErrorKind,
    pub message: String,
    pub span: Span,
}

impl RuntimeError {
    pub fn new(kind: RuntimeErrorKind, message: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            message: message.into(),
            span,
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::error(self.kind.code(), self.message.clone(), self.span)
    }
}

impl std::fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for RuntimeError {}

/// Non-local exits during evaluation.
///
/// `Propagate` implements `?`: the wrapped `Err`/`None` becomes the
/// result of the enclosing function call.
#[derive(Debug)]
pub enum Abort {
    Error(RuntimeError),
    Propagate(Value),
}

impl From<RuntimeError> for Abort {
    fn from(err: RuntimeError) -> Self {
        Abort::Error(err)
    }
}

pub type EvalResult<T> = Result<T, Abort>;
