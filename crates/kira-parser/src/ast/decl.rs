use kira_common::span::Span;

use super::{ExprId, Param, PatId, StmtId, TypeId};

/// A top-level (or trait/impl member) declaration node.
#[derive(Debug, Clone, PartialEq)]
pub struct Decl {
    pub kind: DeclKind,
    pub span: Span,
}

/// A generic parameter with optional trait bounds: `T: Ord + Show`.
#[derive(Debug, Clone, PartialEq)]
pub struct GenericParam {
    pub name: String,
    pub bounds: Vec<String>,
    pub span: Span,
}

/// A where-clause predicate: `where T: Ord`.
#[derive(Debug, Clone, PartialEq)]
pub struct WherePred {
    pub param: String,
    pub bounds: Vec<String>,
}

/// A function declaration, used for free functions, trait methods, and
/// impl methods. Trait method signatures have `body: None`.
#[derive(Debug, Clone, PartialEq)]
pub struct FnDecl {
    pub name: String,
    pub generics: Vec<GenericParam>,
    /// Whether the first parameter is the method receiver `self`.
    pub has_self: bool,
    pub params: Vec<Param>,
    pub ret: TypeId,
    pub effect: bool,
    pub public: bool,
    pub where_clause: Vec<WherePred>,
    pub body: Option<Vec<StmtId>>,
    pub doc: Option<String>,
    pub span: Span,
}

/// A named, typed field of a product type or record-payload variant.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    pub name: String,
    pub ty: TypeId,
    pub span: Span,
}

/// One case of a sum type.
#[derive(Debug, Clone, PartialEq)]
pub struct VariantDef {
    pub name: String,
    pub payload: VariantPayload,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum VariantPayload {
    /// `Red`
    Unit,
    /// `Circle(f64)`
    Tuple(Vec<TypeId>),
    /// `Rect { w: f64, h: f64 }`
    Record(Vec<FieldDef>),
}

/// What a `type` declaration defines.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeDefKind {
    Sum(Vec<VariantDef>),
    Product(Vec<FieldDef>),
    Alias(TypeId),
}

/// Every declaration form in Kira.
#[derive(Debug, Clone, PartialEq)]
pub enum DeclKind {
    Function(FnDecl),
    TypeDef {
        name: String,
        generics: Vec<GenericParam>,
        def: TypeDefKind,
        public: bool,
        doc: Option<String>,
    },
    Trait {
        name: String,
        supers: Vec<String>,
        methods: Vec<FnDecl>,
        public: bool,
        doc: Option<String>,
    },
    Impl {
        trait_name: Option<String>,
        target: TypeId,
        methods: Vec<FnDecl>,
        where_clause: Vec<WherePred>,
    },
    Const {
        name: String,
        ty: TypeId,
        value: ExprId,
        public: bool,
        doc: Option<String>,
    },
    /// Top-level `let` -- same shape as the statement form.
    Let {
        pattern: PatId,
        ty: TypeId,
        init: ExprId,
        public: bool,
    },
    /// `test "name" { ... }`
    Test { name: String, body: Vec<StmtId> },
}

/// `module a.b.c`
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleDecl {
    pub path: Vec<String>,
    pub span: Span,
}

/// One imported item with an optional alias: `Foo` or `Foo as Bar`.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportItem {
    pub name: String,
    pub alias: Option<String>,
    pub span: Span,
}

/// `import a.b` or `import a.b.{ Foo, Bar as Baz }`.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportDecl {
    pub path: Vec<String>,
    pub items: Option<Vec<ImportItem>>,
    pub span: Span,
}
