//! Canonical resolved types for the Kira type checker.
//!
//! These parallel the AST's type expressions but are fully resolved:
//! named types carry the symbol of their definition, aliases are expanded,
//! and generic arguments are explicit. The `Error` marker exists for
//! recovery only -- it never equals a concrete type, so one bad expression
//! cannot silence later diagnostics, and it is never reported twice.

use std::fmt;

use kira_parser::ast::PrimType;
use kira_resolver::symbol::SymbolId;

/// A fully resolved Kira type.
#[derive(Debug, Clone, PartialEq)]
pub enum Ty {
    /// A primitive: fixed-width integers, floats, bool, char, string, void.
    Prim(PrimType),
    /// A user-defined sum, product, or alias target, by defining symbol.
    Named {
        symbol: SymbolId,
        name: String,
        args: Vec<Ty>,
    },
    /// An anonymous record: `{ x: 1, y: 2 }` with no nominal type.
    AnonRecord(Vec<(String, Ty)>),
    Tuple(Vec<Ty>),
    Array {
        elem: Box<Ty>,
        size: Option<u64>,
    },
    Fn {
        params: Vec<Ty>,
        ret: Box<Ty>,
        effect: bool,
    },
    /// A generic type parameter, by name.
    Param(String),
    /// The built-in cons list.
    List(Box<Ty>),
    Option(Box<Ty>),
    Result {
        ok: Box<Ty>,
        err: Box<Ty>,
    },
    Io(Box<Ty>),
    /// The type of a range expression; consumed by `for` and `in`.
    Range(Box<Ty>),
    /// The type of a module reference (`std`, an imported module name).
    Module,
    /// Loosely-typed surface (standard-library values). Compatible with
    /// everything; effects are still tracked precisely.
    Unknown,
    /// Recovery marker: a diagnostic was already reported for this node.
    Error,
}

impl Ty {
    pub fn unit_variant(symbol: SymbolId, name: impl Into<String>) -> Ty {
        Ty::Named {
            symbol,
            name: name.into(),
            args: Vec::new(),
        }
    }

    pub fn option(inner: Ty) -> Ty {
        Ty::Option(Box::new(inner))
    }

    pub fn result(ok: Ty, err: Ty) -> Ty {
        Ty::Result {
            ok: Box::new(ok),
            err: Box::new(err),
        }
    }

    pub fn list(elem: Ty) -> Ty {
        Ty::List(Box::new(elem))
    }

    pub fn io(inner: Ty) -> Ty {
        Ty::Io(Box::new(inner))
    }

    pub fn function(params: Vec<Ty>, ret: Ty, effect: bool) -> Ty {
        Ty::Fn {
            params,
            ret: Box::new(ret),
            effect,
        }
    }

    pub fn bool() -> Ty {
        Ty::Prim(PrimType::Bool)
    }

    pub fn string() -> Ty {
        Ty::Prim(PrimType::String)
    }

    pub fn void() -> Ty {
        Ty::Prim(PrimType::Void)
    }

    pub fn i32() -> Ty {
        Ty::Prim(PrimType::I32)
    }

    pub fn f64() -> Ty {
        Ty::Prim(PrimType::F64)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Ty::Error)
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, Ty::Prim(p) if p.is_integer())
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Ty::Prim(p) if p.is_float())
    }

    pub fn is_numeric(&self) -> bool {
        self.is_integer() || self.is_float()
    }

    /// Whether two types are compatible.
    ///
    /// `Error` is compatible with everything so that one reported problem
    /// does not cascade; `Unknown` is compatible because the loosely-typed
    /// standard-library surface flows through it.
    pub fn compatible(&self, other: &Ty) -> bool {
        match (self, other) {
            (Ty::Error, _) | (_, Ty::Error) => true,
            (Ty::Unknown, _) | (_, Ty::Unknown) => true,
            (Ty::Prim(a), Ty::Prim(b)) => a == b,
            (
                Ty::Named {
                    symbol: sa,
                    args: aa,
                    ..
                },
                Ty::Named {
                    symbol: sb,
                    args: ab,
                    ..
                },
            ) => sa == sb && aa.len() == ab.len() && compatible_all(aa, ab),
            (Ty::AnonRecord(a), Ty::AnonRecord(b)) => {
                a.len() == b.len()
                    && a.iter().zip(b).all(|((na, ta), (nb, tb))| {
                        na == nb && ta.compatible(tb)
                    })
            }
            (Ty::Tuple(a), Ty::Tuple(b)) => a.len() == b.len() && compatible_all(a, b),
            (
                Ty::Array { elem: ea, size: sa },
                Ty::Array { elem: eb, size: sb },
            ) => {
                let sizes_agree = match (sa, sb) {
                    (Some(a), Some(b)) => a == b,
                    _ => true,
                };
                sizes_agree && ea.compatible(eb)
            }
            (
                Ty::Fn {
                    params: pa,
                    ret: ra,
                    effect: ea,
                },
                Ty::Fn {
                    params: pb,
                    ret: rb,
                    effect: eb,
                },
            ) => {
                // A pure function can stand in where an effectful one is
                // expected, never the reverse.
                pa.len() == pb.len()
                    && compatible_all(pa, pb)
                    && ra.compatible(rb)
                    && (*ea == *eb || (!*ea && *eb))
            }
            (Ty::Param(a), Ty::Param(b)) => a == b,
            (Ty::List(a), Ty::List(b)) => a.compatible(b),
            (Ty::Option(a), Ty::Option(b)) => a.compatible(b),
            (
                Ty::Result { ok: oa, err: ea },
                Ty::Result { ok: ob, err: eb },
            ) => oa.compatible(ob) && ea.compatible(eb),
            (Ty::Io(a), Ty::Io(b)) => a.compatible(b),
            (Ty::Range(a), Ty::Range(b)) => a.compatible(b),
            (Ty::Module, Ty::Module) => true,
            _ => false,
        }
    }

    /// Substitute generic parameters by name.
    pub fn substitute(&self, bindings: &rustc_hash::FxHashMap<String, Ty>) -> Ty {
        match self {
            Ty::Param(name) => bindings.get(name).cloned().unwrap_or_else(|| self.clone()),
            Ty::Named {
                symbol,
                name,
                args,
            } => Ty::Named {
                symbol: *symbol,
                name: name.clone(),
                args: args.iter().map(|a| a.substitute(bindings)).collect(),
            },
            Ty::AnonRecord(fields) => Ty::AnonRecord(
                fields
                    .iter()
                    .map(|(n, t)| (n.clone(), t.substitute(bindings)))
                    .collect(),
            ),
            Ty::Tuple(elements) => {
                Ty::Tuple(elements.iter().map(|t| t.substitute(bindings)).collect())
            }
            Ty::Array { elem, size } => Ty::Array {
                elem: Box::new(elem.substitute(bindings)),
                size: *size,
            },
            Ty::Fn {
                params,
                ret,
                effect,
            } => Ty::Fn {
                params: params.iter().map(|t| t.substitute(bindings)).collect(),
                ret: Box::new(ret.substitute(bindings)),
                effect: *effect,
            },
            Ty::List(elem) => Ty::list(elem.substitute(bindings)),
            Ty::Option(inner) => Ty::option(inner.substitute(bindings)),
            Ty::Result { ok, err } => {
                Ty::result(ok.substitute(bindings), err.substitute(bindings))
            }
            Ty::Io(inner) => Ty::io(inner.substitute(bindings)),
            Ty::Range(inner) => Ty::Range(Box::new(inner.substitute(bindings))),
            _ => self.clone(),
        }
    }
}

fn compatible_all(a: &[Ty], b: &[Ty]) -> bool {
    a.iter().zip(b).all(|(x, y)| x.compatible(y))
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ty::Prim(p) => write!(f, "{}", p.as_str()),
            Ty::Named { name, args, .. } => {
                write!(f, "{name}")?;
                if !args.is_empty() {
                    write!(f, "[")?;
                    for (i, arg) in args.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{arg}")?;
                    }
                    write!(f, "]")?;
                }
                Ok(())
            }
            Ty::AnonRecord(fields) => {
                write!(f, "{{ ")?;
                for (i, (name, ty)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{name}: {ty}")?;
                }
                write!(f, " }}")
            }
            Ty::Tuple(elements) => {
                write!(f, "(")?;
                for (i, ty) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{ty}")?;
                }
                if elements.len() == 1 {
                    write!(f, ",")?;
                }
                write!(f, ")")
            }
            Ty::Array { elem, size } => match size {
                Some(size) => write!(f, "[{elem}; {size}]"),
                None => write!(f, "[{elem}]"),
            },
            Ty::Fn {
                params,
                ret,
                effect,
            } => {
                if *effect {
                    write!(f, "effect ")?;
                }
                write!(f, "fn(")?;
                for (i, ty) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{ty}")?;
                }
                write!(f, ") -> {ret}")
            }
            Ty::Param(name) => write!(f, "{name}"),
            Ty::List(elem) => write!(f, "List[{elem}]"),
            Ty::Option(inner) => write!(f, "Option[{inner}]"),
            Ty::Result { ok, err } => write!(f, "Result[{ok}, {err}]"),
            Ty::Io(inner) => write!(f, "IO[{inner}]"),
            Ty::Range(inner) => write!(f, "Range[{inner}]"),
            Ty::Module => write!(f, "<module>"),
            Ty::Unknown => write!(f, "_"),
            Ty::Error => write!(f, "<error>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_is_compatible_with_everything() {
        assert!(Ty::Error.compatible(&Ty::i32()));
        assert!(Ty::i32().compatible(&Ty::Error));
    }

    #[test]
    fn error_is_not_equal_to_concrete_types() {
        assert_ne!(Ty::Error, Ty::i32());
    }

    #[test]
    fn distinct_primitives_are_incompatible() {
        assert!(!Ty::i32().compatible(&Ty::Prim(PrimType::I64)));
        assert!(!Ty::i32().compatible(&Ty::f64()));
        assert!(Ty::i32().compatible(&Ty::i32()));
    }

    #[test]
    fn pure_functions_satisfy_effect_expectations() {
        let pure = Ty::function(vec![Ty::i32()], Ty::i32(), false);
        let effectful = Ty::function(vec![Ty::i32()], Ty::i32(), true);
        assert!(pure.compatible(&effectful));
        assert!(!effectful.compatible(&pure));
    }

    #[test]
    fn substitution_replaces_params() {
        let mut bindings = rustc_hash::FxHashMap::default();
        bindings.insert("T".to_string(), Ty::i32());
        let ty = Ty::list(Ty::Param("T".to_string()));
        assert_eq!(ty.substitute(&bindings), Ty::list(Ty::i32()));
    }

    #[test]
    fn display_renders_kira_syntax() {
        assert_eq!(Ty::option(Ty::i32()).to_string(), "Option[i32]");
        assert_eq!(
            Ty::result(Ty::string(), Ty::i32()).to_string(),
            "Result[string, i32]"
        );
        assert_eq!(
            Ty::function(vec![Ty::i32()], Ty::bool(), true).to_string(),
            "effect fn(i32) -> bool"
        );
    }
}
