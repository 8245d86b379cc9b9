use kira_common::span::Span;
use kira_common::token::NumSuffix;

use super::{ExprId, PatId, StmtId, TypeId};

/// An expression node.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

/// Every expression form in Kira.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// Integer literal with optional width suffix, e.g. `42`, `7u8`.
    Int { value: i128, suffix: Option<NumSuffix> },
    /// Float literal with optional width suffix, e.g. `3.5`, `1.0f32`.
    Float { value: f64, suffix: Option<NumSuffix> },
    /// Plain (non-interpolated) string literal, already unescaped.
    Str(String),
    /// Character literal as a Unicode scalar.
    Char(char),
    Bool(bool),
    /// Identifier reference, optionally with explicit generic arguments:
    /// `x`, `first[i32]`.
    Ident { name: String, generic_args: Vec<TypeId> },
    /// The `self` receiver inside impl methods.
    SelfRef,
    Binary { op: BinaryOp, lhs: ExprId, rhs: ExprId },
    Unary { op: UnaryOp, operand: ExprId },
    /// `base.field`
    Field { base: ExprId, name: String },
    /// `base[index]`
    Index { base: ExprId, index: ExprId },
    /// `base.0`, `base.1`, ...
    TupleField { base: ExprId, index: u32 },
    /// `callee(args)`, optionally `callee[T](args)`.
    Call { callee: ExprId, generic_args: Vec<TypeId>, args: Vec<ExprId> },
    /// `receiver.method(args)`, optionally `receiver.method[T](args)`.
    MethodCall {
        receiver: ExprId,
        method: String,
        generic_args: Vec<TypeId>,
        args: Vec<ExprId>,
    },
    /// Anonymous function: `fn(x: i32) -> i32 { ... }`, optionally
    /// `effect fn ...`.
    Closure {
        params: Vec<Param>,
        ret: TypeId,
        effect: bool,
        body: Vec<StmtId>,
    },
    /// Match in expression position; arm bodies may be expressions.
    Match { subject: ExprId, arms: Vec<MatchArm> },
    /// `(a, b)` and `(a,)`.
    Tuple(Vec<ExprId>),
    /// `[a, b, c]`
    Array(Vec<ExprId>),
    /// `Point { x: 1, y: 2 }` or anonymous `{ x: 1 }`.
    Record {
        ty: Option<TypeId>,
        fields: Vec<(String, ExprId)>,
    },
    /// Variant constructor: `Red`, `Circle(1.0)`. Uppercase-led call.
    Variant { name: String, args: Option<Vec<ExprId>> },
    /// `expr as Type`
    Cast { expr: ExprId, ty: TypeId },
    /// `a..b`, `a..=b`, `..b`, `a..`.
    Range {
        start: Option<ExprId>,
        end: Option<ExprId>,
        inclusive: bool,
    },
    /// Parenthesized expression.
    Group(ExprId),
    /// Interpolated string: alternating literal and expression parts.
    Interpolated(Vec<InterpPart>),
    /// `expr?` -- early return on `Err`/`None`.
    Try(ExprId),
    /// `value ?? default`
    Coalesce { value: ExprId, default: ExprId },
}

/// One piece of an interpolated string.
#[derive(Debug, Clone, PartialEq)]
pub enum InterpPart {
    Lit(String),
    Expr(ExprId),
}

/// A match arm: pattern, optional guard, body.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchArm {
    pub pattern: PatId,
    pub guard: Option<ExprId>,
    pub body: ArmBody,
    pub span: Span,
}

/// Arm bodies are single expressions in match expressions and statement
/// blocks in match statements.
#[derive(Debug, Clone, PartialEq)]
pub enum ArmBody {
    Expr(ExprId),
    Block(Vec<StmtId>),
}

/// A typed function or closure parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub ty: TypeId,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    /// Variant membership test: `value is Some`.
    Is,
    /// Collection membership test: `item in collection`.
    In,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl BinaryOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryOp::Or => "or",
            BinaryOp::And => "and",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::Is => "is",
            BinaryOp::In => "in",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

impl UnaryOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Not => "not",
        }
    }
}
