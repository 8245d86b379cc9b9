//! Signatures for built-in functions and the `std` surface.
//!
//! Built-ins are typed structurally at each call site (they accept
//! several collection shapes), so this module exposes effect flags and
//! the per-call typing rules used by the checker. The standard library
//! is typed loosely -- `Unknown` for the generic parts -- but its effect
//! flags are exact, which is what the effect discipline needs.

use kira_parser::ast::PrimType;

use crate::ty::Ty;

/// Whether a global built-in performs I/O.
pub fn builtin_effect(name: &str) -> bool {
    matches!(name, "print" | "println")
}

/// A standard-library function's checked surface.
pub struct StdFn {
    pub effect: bool,
    /// Declared parameter types; `Unknown` entries accept anything.
    pub params: Vec<Ty>,
    pub ret: Ty,
}

impl StdFn {
    fn new(effect: bool, params: Vec<Ty>, ret: Ty) -> StdFn {
        StdFn {
            effect,
            params,
            ret,
        }
    }
}

fn string() -> Ty {
    Ty::string()
}

fn unknown() -> Ty {
    Ty::Unknown
}

fn void() -> Ty {
    Ty::void()
}

fn i32_ty() -> Ty {
    Ty::i32()
}

fn i64_ty() -> Ty {
    Ty::Prim(PrimType::I64)
}

fn bool_ty() -> Ty {
    Ty::bool()
}

/// Look up a `std` function by module and name, e.g. `("io", "println")`.
///
/// Returns `None` for unknown members; the checker reports those.
pub fn std_fn(module: &str, name: &str) -> Option<StdFn> {
    let f = match (module, name) {
        // ── std.io ─────────────────────────────────────────────────────
        ("io", "print") | ("io", "println") | ("io", "eprint") | ("io", "eprintln") => {
            StdFn::new(true, vec![unknown()], void())
        }
        ("io", "read_line") => StdFn::new(true, vec![], string()),

        // ── std.list ───────────────────────────────────────────────────
        ("list", "empty") => StdFn::new(false, vec![], unknown()),
        ("list", "singleton") => StdFn::new(false, vec![unknown()], unknown()),
        ("list", "cons") => StdFn::new(false, vec![unknown(), unknown()], unknown()),
        ("list", "map") | ("list", "filter") => {
            StdFn::new(false, vec![unknown(), unknown()], unknown())
        }
        ("list", "fold") | ("list", "fold_right") => {
            StdFn::new(false, vec![unknown(), unknown(), unknown()], unknown())
        }
        ("list", "head") | ("list", "tail") => StdFn::new(false, vec![unknown()], unknown()),
        ("list", "find") => StdFn::new(false, vec![unknown(), unknown()], unknown()),
        ("list", "any") | ("list", "all") => {
            StdFn::new(false, vec![unknown(), unknown()], bool_ty())
        }
        ("list", "length") => StdFn::new(false, vec![unknown()], i32_ty()),
        ("list", "reverse") | ("list", "flatten") => {
            StdFn::new(false, vec![unknown()], unknown())
        }
        ("list", "concat") | ("list", "zip") => {
            StdFn::new(false, vec![unknown(), unknown()], unknown())
        }
        ("list", "take") | ("list", "drop") => {
            StdFn::new(false, vec![unknown(), i32_ty()], unknown())
        }

        // ── std.option ─────────────────────────────────────────────────
        ("option", "map") | ("option", "and_then") => {
            StdFn::new(false, vec![unknown(), unknown()], unknown())
        }
        ("option", "unwrap_or") => StdFn::new(false, vec![unknown(), unknown()], unknown()),
        ("option", "is_some") | ("option", "is_none") => {
            StdFn::new(false, vec![unknown()], bool_ty())
        }

        // ── std.result ─────────────────────────────────────────────────
        ("result", "map") | ("result", "map_err") | ("result", "and_then") => {
            StdFn::new(false, vec![unknown(), unknown()], unknown())
        }
        ("result", "unwrap_or") => StdFn::new(false, vec![unknown(), unknown()], unknown()),
        ("result", "is_ok") | ("result", "is_err") => {
            StdFn::new(false, vec![unknown()], bool_ty())
        }

        // ── std.string ─────────────────────────────────────────────────
        ("string", "length") => StdFn::new(false, vec![string()], i32_ty()),
        ("string", "split") => StdFn::new(false, vec![string(), string()], unknown()),
        ("string", "trim") | ("string", "to_upper") | ("string", "to_lower") => {
            StdFn::new(false, vec![string()], string())
        }
        ("string", "concat") => StdFn::new(false, vec![string(), string()], string()),
        ("string", "contains") | ("string", "starts_with") | ("string", "ends_with") => {
            StdFn::new(false, vec![string(), string()], bool_ty())
        }
        ("string", "replace") => {
            StdFn::new(false, vec![string(), string(), string()], string())
        }
        ("string", "substring") => {
            StdFn::new(false, vec![string(), i32_ty(), i32_ty()], string())
        }
        ("string", "char_at") => StdFn::new(
            false,
            vec![string(), i32_ty()],
            Ty::option(Ty::Prim(PrimType::Char)),
        ),
        ("string", "index_of") => {
            StdFn::new(false, vec![string(), string()], Ty::option(i32_ty()))
        }
        ("string", "chars") => StdFn::new(false, vec![string()], unknown()),
        ("string", "parse_int") => {
            StdFn::new(false, vec![string()], Ty::option(i64_ty()))
        }

        // ── std.fs ─────────────────────────────────────────────────────
        ("fs", "read_file") => StdFn::new(true, vec![string()], Ty::result(string(), string())),
        ("fs", "write_file") => StdFn::new(
            true,
            vec![string(), string()],
            Ty::result(void(), string()),
        ),
        ("fs", "exists") => StdFn::new(true, vec![string()], bool_ty()),
        ("fs", "remove") => StdFn::new(true, vec![string()], Ty::result(void(), string())),

        // ── std.builder ────────────────────────────────────────────────
        ("builder", "new") => StdFn::new(false, vec![], unknown()),
        ("builder", "append") | ("builder", "append_char") => {
            StdFn::new(false, vec![unknown(), unknown()], void())
        }
        ("builder", "append_int") | ("builder", "append_float") => {
            StdFn::new(false, vec![unknown(), unknown()], void())
        }
        ("builder", "build") => StdFn::new(false, vec![unknown()], string()),
        ("builder", "clear") => StdFn::new(false, vec![unknown()], void()),
        ("builder", "length") => StdFn::new(false, vec![unknown()], i32_ty()),

        // ── std.map ────────────────────────────────────────────────────
        ("map", "new") => StdFn::new(false, vec![], unknown()),
        ("map", "put") => StdFn::new(false, vec![unknown(), unknown(), unknown()], void()),
        ("map", "get") => StdFn::new(false, vec![unknown(), unknown()], unknown()),
        ("map", "contains") => StdFn::new(false, vec![unknown(), unknown()], bool_ty()),
        ("map", "remove") => StdFn::new(false, vec![unknown(), unknown()], void()),
        ("map", "keys") | ("map", "values") | ("map", "entries") => {
            StdFn::new(false, vec![unknown()], unknown())
        }
        ("map", "size") => StdFn::new(false, vec![unknown()], i32_ty()),
        ("map", "is_empty") => StdFn::new(false, vec![unknown()], bool_ty()),

        // ── std.char ───────────────────────────────────────────────────
        ("char", "from_i32") => StdFn::new(
            false,
            vec![i32_ty()],
            Ty::option(Ty::Prim(PrimType::Char)),
        ),
        ("char", "to_i32") => StdFn::new(false, vec![Ty::Prim(PrimType::Char)], i32_ty()),

        // ── std.math ───────────────────────────────────────────────────
        ("math", "trunc_to_i64") => StdFn::new(false, vec![Ty::f64()], i64_ty()),

        // ── std.time ───────────────────────────────────────────────────
        ("time", "now") => StdFn::new(true, vec![], i64_ty()),
        ("time", "sleep") => StdFn::new(true, vec![i64_ty()], void()),
        ("time", "elapsed") => StdFn::new(true, vec![i64_ty()], i64_ty()),

        // ── std.assert ─────────────────────────────────────────────────
        ("assert", "assert") => StdFn::new(false, vec![bool_ty()], void()),
        ("assert", "assert_eq") => StdFn::new(false, vec![unknown(), unknown()], void()),

        _ => return None,
    };
    Some(f)
}

/// The std modules, for "unknown module" diagnostics.
pub fn std_module_exists(module: &str) -> bool {
    matches!(
        module,
        "io" | "list"
            | "option"
            | "result"
            | "string"
            | "fs"
            | "builder"
            | "map"
            | "char"
            | "math"
            | "time"
            | "assert"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_is_effectful_list_is_pure() {
        assert!(std_fn("io", "println").unwrap().effect);
        assert!(std_fn("fs", "read_file").unwrap().effect);
        assert!(std_fn("time", "now").unwrap().effect);
        assert!(!std_fn("list", "map").unwrap().effect);
        assert!(!std_fn("assert", "assert").unwrap().effect);
    }

    #[test]
    fn unknown_members_are_none() {
        assert!(std_fn("io", "nope").is_none());
        assert!(std_fn("nope", "print").is_none());
        assert!(std_module_exists("io"));
        assert!(!std_module_exists("network"));
    }

    #[test]
    fn print_builtins_are_effectful() {
        assert!(builtin_effect("print"));
        assert!(builtin_effect("println"));
        assert!(!builtin_effect("len"));
    }
}
