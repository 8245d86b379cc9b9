use kira_common::span::Span;

use super::{ExprId, MatchArm, PatId, StmtId, TypeId};

/// A statement node.
#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

/// Every statement form in Kira.
#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    /// `let pattern: Type = init` -- immutable binding.
    Let {
        pattern: PatId,
        ty: TypeId,
        init: ExprId,
        public: bool,
    },
    /// `var name: Type = init` or `var name: Type` -- mutable binding.
    Var {
        name: String,
        ty: TypeId,
        init: Option<ExprId>,
    },
    /// `target = value` where target is an identifier, field access, or
    /// index access.
    Assign { target: ExprId, value: ExprId },
    If {
        cond: ExprId,
        then_branch: Vec<StmtId>,
        else_branch: Option<ElseBranch>,
    },
    /// `for pattern in iterable { ... }`, optionally labeled `for @l ...`.
    For {
        label: Option<String>,
        pattern: PatId,
        iterable: ExprId,
        body: Vec<StmtId>,
    },
    While {
        label: Option<String>,
        cond: ExprId,
        body: Vec<StmtId>,
    },
    Loop {
        label: Option<String>,
        body: Vec<StmtId>,
    },
    /// Match in statement position; arm bodies are blocks.
    Match { subject: ExprId, arms: Vec<MatchArm> },
    Return { value: Option<ExprId> },
    /// `break`, `break value`, `break @label`, `break @label value`.
    Break {
        label: Option<String>,
        value: Option<ExprId>,
    },
    /// An expression evaluated for effect, value discarded.
    Expr(ExprId),
    /// A free-standing `{ ... }` block introducing a scope.
    Block(Vec<StmtId>),
}

/// The `else` part of an if-statement: either a block or a chained if.
#[derive(Debug, Clone, PartialEq)]
pub enum ElseBranch {
    Block(Vec<StmtId>),
    If(StmtId),
}
