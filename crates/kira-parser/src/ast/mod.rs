//! The Kira AST: five node families, immutable after parsing, owned by a
//! single [`AstArena`] per [`Program`].
//!
//! Nodes refer to each other through typed `u32` ids rather than boxes, so
//! side tables (resolved symbols, resolved types) can be keyed by id and
//! the whole tree can be dropped in one go at Program teardown.

pub mod decl;
pub mod expr;
pub mod pat;
pub mod stmt;
pub mod ty;

pub use decl::{
    Decl, DeclKind, FieldDef, FnDecl, GenericParam, ImportDecl, ImportItem, ModuleDecl,
    TypeDefKind, VariantDef, VariantPayload, WherePred,
};
pub use expr::{ArmBody, BinaryOp, Expr, ExprKind, InterpPart, MatchArm, Param, UnaryOp};
pub use pat::{PatLit, Pattern, PatternKind, RangeBound};
pub use stmt::{ElseBranch, Stmt, StmtKind};
pub use ty::{PrimType, TypeExpr, TypeKind};

use kira_common::span::Span;

/// Id of an expression node in a program's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExprId(pub u32);

/// Id of a statement node in a program's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StmtId(pub u32);

/// Id of a type-expression node in a program's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeId(pub u32);

/// Id of a pattern node in a program's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PatId(pub u32);

/// Id of a declaration node in a program's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeclId(pub u32);

/// Bulk storage for every AST node of one program.
///
/// Plain `Vec`s addressed by the typed ids above; freed as a unit when the
/// owning [`Program`] is dropped.
#[derive(Debug, Default)]
pub struct AstArena {
    pub exprs: Vec<Expr>,
    pub stmts: Vec<Stmt>,
    pub types: Vec<TypeExpr>,
    pub pats: Vec<Pattern>,
    pub decls: Vec<Decl>,
}

impl AstArena {
    pub fn alloc_expr(&mut self, expr: Expr) -> ExprId {
        let id = ExprId(self.exprs.len() as u32);
        self.exprs.push(expr);
        id
    }

    pub fn alloc_stmt(&mut self, stmt: Stmt) -> StmtId {
        let id = StmtId(self.stmts.len() as u32);
        self.stmts.push(stmt);
        id
    }

    pub fn alloc_type(&mut self, ty: TypeExpr) -> TypeId {
        let id = TypeId(self.types.len() as u32);
        self.types.push(ty);
        id
    }

    pub fn alloc_pat(&mut self, pat: Pattern) -> PatId {
        let id = PatId(self.pats.len() as u32);
        self.pats.push(pat);
        id
    }

    pub fn alloc_decl(&mut self, decl: Decl) -> DeclId {
        let id = DeclId(self.decls.len() as u32);
        self.decls.push(decl);
        id
    }
}

/// A parsed source file: the arena plus the top-level structure.
#[derive(Debug, Default)]
pub struct Program {
    pub arena: AstArena,
    /// The `module a.b.c` declaration, if the file has one.
    pub module: Option<ModuleDecl>,
    /// The import block, in source order.
    pub imports: Vec<ImportDecl>,
    /// Top-level declarations, in source order.
    pub decls: Vec<DeclId>,
}

impl Program {
    pub fn expr(&self, id: ExprId) -> &Expr {
        &self.arena.exprs[id.0 as usize]
    }

    pub fn stmt(&self, id: StmtId) -> &Stmt {
        &self.arena.stmts[id.0 as usize]
    }

    pub fn type_expr(&self, id: TypeId) -> &TypeExpr {
        &self.arena.types[id.0 as usize]
    }

    pub fn pat(&self, id: PatId) -> &Pattern {
        &self.arena.pats[id.0 as usize]
    }

    pub fn decl(&self, id: DeclId) -> &Decl {
        &self.arena.decls[id.0 as usize]
    }

    pub fn expr_span(&self, id: ExprId) -> Span {
        self.expr(id).span
    }
}
