//! Registries built over the resolved program before expression checking:
//! type definitions, traits, and impls, plus AST-type lowering into [`Ty`].

use rustc_hash::FxHashMap;

use kira_common::diagnostic::Diagnostic;
use kira_parser::ast::{DeclId, DeclKind, FnDecl, TypeDefKind, TypeId, TypeKind, VariantPayload};
use kira_resolver::symbol::{SymbolId, SymbolKind, UnitId};
use kira_resolver::Resolution;

use crate::ty::Ty;

/// A registered type definition.
#[derive(Debug, Clone)]
pub struct TypeDefInfo {
    pub name: String,
    pub generics: Vec<String>,
    pub kind: DefKind,
    pub unit: UnitId,
}

#[derive(Debug, Clone)]
pub enum DefKind {
    Sum(Vec<VariantInfo>),
    Product(Vec<(String, Ty)>),
    Alias(Ty),
}

#[derive(Debug, Clone)]
pub struct VariantInfo {
    pub name: String,
    pub payload: PayloadInfo,
}

#[derive(Debug, Clone)]
pub enum PayloadInfo {
    Unit,
    Tuple(Vec<Ty>),
    Record(Vec<(String, Ty)>),
}

impl PayloadInfo {
    pub fn arity(&self) -> usize {
        match self {
            PayloadInfo::Unit => 0,
            PayloadInfo::Tuple(tys) => tys.len(),
            PayloadInfo::Record(fields) => fields.len(),
        }
    }
}

/// A checked function signature.
#[derive(Debug, Clone)]
pub struct FnSig {
    pub generics: Vec<String>,
    /// Trait bounds per generic parameter, merged from the parameter list
    /// and the where-clause.
    pub bounds: Vec<(String, Vec<String>)>,
    pub params: Vec<Ty>,
    pub ret: Ty,
    pub effect: bool,
    pub has_self: bool,
}

/// One `impl` block, registered by target type.
#[derive(Debug, Clone)]
pub struct ImplInfo {
    pub trait_name: Option<String>,
    pub target: Ty,
    pub unit: UnitId,
    pub decl: DeclId,
    /// (method name, signature, index into the impl's method list).
    pub methods: Vec<(String, FnSig, usize)>,
}

/// A trait definition: method signatures and whether each has a default.
#[derive(Debug, Clone)]
pub struct TraitInfo {
    pub supers: Vec<String>,
    pub methods: Vec<(String, FnSig, bool)>,
}

/// All registries the checker consults.
pub struct Registries {
    pub defs: FxHashMap<SymbolId, TypeDefInfo>,
    pub traits: FxHashMap<String, TraitInfo>,
    pub impls: Vec<ImplInfo>,
}

/// Lower an AST type expression into a resolved [`Ty`].
///
/// Uses the resolver's type-symbol side table; a missing entry means the
/// resolver already reported the name, so lowering recovers with
/// `Ty::Error`.
pub fn lower_type(
    res: &Resolution,
    unit: UnitId,
    ty_id: TypeId,
    self_ty: Option<&Ty>,
    diagnostics: &mut Vec<Diagnostic>,
) -> Ty {
    let program = &res.unit(unit).program;
    let ty = program.type_expr(ty_id);
    match &ty.kind {
        TypeKind::Prim(p) => Ty::Prim(*p),
        TypeKind::Infer => Ty::Unknown,
        TypeKind::SelfType => match self_ty {
            Some(self_ty) => self_ty.clone(),
            None => {
                diagnostics.push(Diagnostic::error(
                    "E0013",
                    "`Self` used outside of a trait or impl",
                    ty.span,
                ));
                Ty::Error
            }
        },
        TypeKind::Named(name) => {
            lower_named(res, unit, ty_id, name, &[], self_ty, diagnostics, ty.span)
        }
        TypeKind::Generic { base, args } => {
            let args: Vec<Ty> = args
                .iter()
                .map(|a| lower_type(res, unit, *a, self_ty, diagnostics))
                .collect();
            lower_named(res, unit, ty_id, base, &args, self_ty, diagnostics, ty.span)
        }
        TypeKind::Path { segments, args } => {
            let args: Vec<Ty> = args
                .iter()
                .map(|a| lower_type(res, unit, *a, self_ty, diagnostics))
                .collect();
            let name = segments.last().cloned().unwrap_or_default();
            lower_named(res, unit, ty_id, &name, &args, self_ty, diagnostics, ty.span)
        }
        TypeKind::Function {
            params,
            ret,
            effect,
        } => {
            let params = params
                .iter()
                .map(|p| lower_type(res, unit, *p, self_ty, diagnostics))
                .collect();
            let ret = lower_type(res, unit, *ret, self_ty, diagnostics);
            Ty::function(params, ret, *effect)
        }
        TypeKind::Tuple(elements) => Ty::Tuple(
            elements
                .iter()
                .map(|e| lower_type(res, unit, *e, self_ty, diagnostics))
                .collect(),
        ),
        TypeKind::Array { elem, size } => Ty::Array {
            elem: Box::new(lower_type(res, unit, *elem, self_ty, diagnostics)),
            size: *size,
        },
        TypeKind::Io(inner) => Ty::io(lower_type(res, unit, *inner, self_ty, diagnostics)),
        TypeKind::OptionType(inner) => {
            Ty::option(lower_type(res, unit, *inner, self_ty, diagnostics))
        }
        TypeKind::ResultType { ok, err } => Ty::result(
            lower_type(res, unit, *ok, self_ty, diagnostics),
            lower_type(res, unit, *err, self_ty, diagnostics),
        ),
    }
}

#[allow(clippy::too_many_arguments)]
fn lower_named(
    res: &Resolution,
    unit: UnitId,
    ty_id: TypeId,
    name: &str,
    args: &[Ty],
    _self_ty: Option<&Ty>,
    diagnostics: &mut Vec<Diagnostic>,
    span: kira_common::span::Span,
) -> Ty {
    let Some(symbol) = res.type_symbols.get(&(unit, ty_id)).copied() else {
        // The resolver already reported the undefined name.
        return Ty::Error;
    };
    let symbol = res.symbols.resolve_alias(symbol);
    match &res.symbol(symbol).kind {
        SymbolKind::TypeDef { .. } => Ty::Named {
            symbol,
            name: res.symbol(symbol).name.clone(),
            args: args.to_vec(),
        },
        SymbolKind::TypeParam { .. } => {
            if !args.is_empty() {
                diagnostics.push(Diagnostic::error(
                    "E0013",
                    format!("type parameter `{name}` takes no type arguments"),
                    span,
                ));
            }
            Ty::Param(res.symbol(symbol).name.clone())
        }
        SymbolKind::Builtin { .. } if res.symbol(symbol).name == "List" => {
            let elem = args.first().cloned().unwrap_or(Ty::Unknown);
            Ty::list(elem)
        }
        SymbolKind::Trait { .. } => {
            diagnostics.push(Diagnostic::error(
                "E0013",
                format!("trait `{name}` used where a type is expected"),
                span,
            ));
            Ty::Error
        }
        _ => {
            diagnostics.push(Diagnostic::error(
                "E0013",
                format!("`{name}` is not a type"),
                span,
            ));
            Ty::Error
        }
    }
}

/// Lower a function declaration's signature.
pub fn lower_fn_sig(
    res: &Resolution,
    unit: UnitId,
    f: &FnDecl,
    self_ty: Option<&Ty>,
    diagnostics: &mut Vec<Diagnostic>,
) -> FnSig {
    let params = f
        .params
        .iter()
        .map(|p| lower_type(res, unit, p.ty, self_ty, diagnostics))
        .collect();
    let ret = lower_type(res, unit, f.ret, self_ty, diagnostics);
    let mut bounds: Vec<(String, Vec<String>)> = f
        .generics
        .iter()
        .filter(|g| !g.bounds.is_empty())
        .map(|g| (g.name.clone(), g.bounds.clone()))
        .collect();
    for pred in &f.where_clause {
        match bounds.iter_mut().find(|(name, _)| *name == pred.param) {
            Some((_, existing)) => existing.extend(pred.bounds.iter().cloned()),
            None => bounds.push((pred.param.clone(), pred.bounds.clone())),
        }
    }
    FnSig {
        generics: f.generics.iter().map(|g| g.name.clone()).collect(),
        bounds,
        params,
        ret,
        effect: f.effect,
        has_self: f.has_self,
    }
}

/// Build the type, trait, and impl registries for all units.
pub fn build_registries(res: &Resolution, diagnostics: &mut Vec<Diagnostic>) -> Registries {
    let mut defs = FxHashMap::default();
    let mut traits = FxHashMap::default();
    let mut impls = Vec::new();

    // Types and traits first, so impl targets can refer to them.
    for (unit_index, unit) in res.units.iter().enumerate() {
        let unit_id = UnitId(unit_index as u32);
        for decl_id in &unit.program.decls {
            let decl = unit.program.decl(*decl_id);
            match &decl.kind {
                DeclKind::TypeDef { name, generics, def, .. } => {
                    let Some(symbol) = type_symbol_for_decl(res, unit_id, *decl_id) else {
                        continue;
                    };
                    let kind = match def {
                        TypeDefKind::Sum(variants) => DefKind::Sum(
                            variants
                                .iter()
                                .map(|v| VariantInfo {
                                    name: v.name.clone(),
                                    payload: match &v.payload {
                                        VariantPayload::Unit => PayloadInfo::Unit,
                                        VariantPayload::Tuple(tys) => PayloadInfo::Tuple(
                                            tys.iter()
                                                .map(|t| {
                                                    lower_type(res, unit_id, *t, None, diagnostics)
                                                })
                                                .collect(),
                                        ),
                                        VariantPayload::Record(fields) => PayloadInfo::Record(
                                            fields
                                                .iter()
                                                .map(|field| {
                                                    (
                                                        field.name.clone(),
                                                        lower_type(
                                                            res,
                                                            unit_id,
                                                            field.ty,
                                                            None,
                                                            diagnostics,
                                                        ),
                                                    )
                                                })
                                                .collect(),
                                        ),
                                    },
                                })
                                .collect(),
                        ),
                        TypeDefKind::Product(fields) => DefKind::Product(
                            fields
                                .iter()
                                .map(|field| {
                                    (
                                        field.name.clone(),
                                        lower_type(res, unit_id, field.ty, None, diagnostics),
                                    )
                                })
                                .collect(),
                        ),
                        TypeDefKind::Alias(ty) => {
                            DefKind::Alias(lower_type(res, unit_id, *ty, None, diagnostics))
                        }
                    };
                    defs.insert(
                        symbol,
                        TypeDefInfo {
                            name: name.clone(),
                            generics: generics.iter().map(|g| g.name.clone()).collect(),
                            kind,
                            unit: unit_id,
                        },
                    );
                }
                DeclKind::Trait {
                    name,
                    supers,
                    methods,
                    ..
                } => {
                    let info = TraitInfo {
                        supers: supers.clone(),
                        methods: methods
                            .iter()
                            .map(|m| {
                                (
                                    m.name.clone(),
                                    lower_fn_sig(res, unit_id, m, Some(&Ty::Param("Self".into())), diagnostics),
                                    m.body.is_some(),
                                )
                            })
                            .collect(),
                    };
                    traits.insert(name.clone(), info);
                }
                _ => {}
            }
        }
    }

    // Impls second.
    for (unit_index, unit) in res.units.iter().enumerate() {
        let unit_id = UnitId(unit_index as u32);
        for decl_id in &unit.program.decls {
            let decl = unit.program.decl(*decl_id);
            let DeclKind::Impl {
                trait_name,
                target,
                methods,
                ..
            } = &decl.kind
            else {
                continue;
            };
            let target_ty = lower_type(res, unit_id, *target, None, diagnostics);
            let method_infos: Vec<(String, FnSig, usize)> = methods
                .iter()
                .enumerate()
                .map(|(index, m)| {
                    (
                        m.name.clone(),
                        lower_fn_sig(res, unit_id, m, Some(&target_ty), diagnostics),
                        index,
                    )
                })
                .collect();

            if let Some(trait_name) = trait_name {
                match traits.get(trait_name) {
                    None => {
                        diagnostics.push(Diagnostic::error(
                            "E0006",
                            format!("unknown trait `{trait_name}`"),
                            decl.span,
                        ));
                    }
                    Some(trait_info) => {
                        for (method_name, trait_sig, has_default) in &trait_info.methods {
                            let provided =
                                method_infos.iter().find(|(n, _, _)| n == method_name);
                            match provided {
                                None if !has_default => {
                                    diagnostics.push(Diagnostic::error(
                                        "E0007",
                                        format!(
                                            "impl of `{trait_name}` for `{target_ty}` is missing method `{method_name}`"
                                        ),
                                        decl.span,
                                    ));
                                }
                                Some((_, impl_sig, _)) => {
                                    check_method_compat(
                                        trait_name,
                                        method_name,
                                        trait_sig,
                                        impl_sig,
                                        &target_ty,
                                        decl.span,
                                        diagnostics,
                                    );
                                }
                                None => {}
                            }
                        }
                    }
                }
            }

            impls.push(ImplInfo {
                trait_name: trait_name.clone(),
                target: target_ty,
                unit: unit_id,
                decl: *decl_id,
                methods: method_infos,
            });
        }
    }

    Registries {
        defs,
        traits,
        impls,
    }
}

/// The symbol the resolver assigned to a type declaration, found through
/// the unit scope.
fn type_symbol_for_decl(res: &Resolution, unit: UnitId, decl_id: DeclId) -> Option<SymbolId> {
    let unit_info = res.unit(unit);
    let decl = unit_info.program.decl(decl_id);
    let DeclKind::TypeDef { name, .. } = &decl.kind else {
        return None;
    };
    let symbol = res.scopes.lookup_local(unit_info.scope, name)?;
    match &res.symbol(symbol).kind {
        SymbolKind::TypeDef { .. } => Some(symbol),
        _ => None,
    }
}

/// Trait-method signature compatibility, with `Self` substituted by the
/// impl target.
fn check_method_compat(
    trait_name: &str,
    method_name: &str,
    trait_sig: &FnSig,
    impl_sig: &FnSig,
    target: &Ty,
    span: kira_common::span::Span,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let mut bindings = FxHashMap::default();
    bindings.insert("Self".to_string(), target.clone());
    let expected_params: Vec<Ty> = trait_sig
        .params
        .iter()
        .map(|p| p.substitute(&bindings))
        .collect();
    let expected_ret = trait_sig.ret.substitute(&bindings);

    let params_ok = expected_params.len() == impl_sig.params.len()
        && expected_params
            .iter()
            .zip(&impl_sig.params)
            .all(|(a, b)| a.compatible(b));
    let ret_ok = expected_ret.compatible(&impl_sig.ret);
    let effect_ok = trait_sig.effect == impl_sig.effect;
    let self_ok = trait_sig.has_self == impl_sig.has_self;

    if !(params_ok && ret_ok && effect_ok && self_ok) {
        diagnostics.push(Diagnostic::error(
            "E0008",
            format!(
                "method `{method_name}` does not match the signature declared by trait `{trait_name}`"
            ),
            span,
        ));
    }
}

/// Expand aliases so structural checks see the underlying type.
pub fn normalize(defs: &FxHashMap<SymbolId, TypeDefInfo>, ty: &Ty) -> Ty {
    let mut current = ty.clone();
    for _ in 0..32 {
        match &current {
            Ty::Named { symbol, args, .. } => {
                let Some(info) = defs.get(symbol) else {
                    return current;
                };
                let DefKind::Alias(aliased) = &info.kind else {
                    return current;
                };
                let mut bindings = FxHashMap::default();
                for (param, arg) in info.generics.iter().zip(args) {
                    bindings.insert(param.clone(), arg.clone());
                }
                current = aliased.substitute(&bindings);
            }
            _ => return current,
        }
    }
    current
}
