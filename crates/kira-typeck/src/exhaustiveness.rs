//! Maranget's usefulness algorithm for exhaustiveness and redundancy
//! checking (Algorithm U from "Warnings for Pattern Matching", 2007).
//!
//! The algorithm operates on an abstract pattern representation (`Pat`),
//! not AST nodes; the checker translates match arms into this form.
//! Exhaustiveness asks "is a wildcard still useful after all arms?",
//! redundancy asks "is each arm useful given the arms before it?". Both
//! reduce to the core predicate [`is_useful`].
//!
//! Guarded arms never contribute coverage: a failing guard falls through
//! to later arms, so the checker omits them from the matrix.

/// Abstract pattern for the usefulness computation.
///
/// Or-patterns are expanded away before the matrix is built; bool
/// literals are normalized into nullary constructors so booleans check
/// like two-variant sums; tuples and records become the single
/// constructor `"(fields)"` of their type.
#[derive(Clone, Debug, PartialEq)]
pub enum Pat {
    /// Matches anything: wildcard or binding.
    Wildcard,
    /// A specific constructor with sub-patterns.
    Constructor { name: String, args: Vec<Pat> },
    /// A literal of an infinite type, by canonical key (`"42"`, `"\"s\""`).
    Literal(String),
    /// A range over an infinite type, by canonical key (`"1..=5"`).
    Range(String),
}

/// Signature of one constructor: its name, arity, and the column types of
/// its arguments.
#[derive(Clone, Debug)]
pub struct ConstructorSig {
    pub name: String,
    pub arity: usize,
    pub args: Vec<TypeInfo>,
}

/// What the usefulness algorithm needs to know about a column's type.
#[derive(Clone, Debug)]
pub enum TypeInfo {
    /// A type with a known, finite constructor set: user sums, bool,
    /// Option, Result, List, tuples, records.
    Sum { variants: Vec<ConstructorSig> },
    /// A type with unbounded inhabitants: integers, floats, strings,
    /// chars, and anything the checker cannot enumerate.
    Infinite,
}

impl TypeInfo {
    pub fn bool_type() -> TypeInfo {
        TypeInfo::Sum {
            variants: vec![
                ConstructorSig {
                    name: "true".to_string(),
                    arity: 0,
                    args: Vec::new(),
                },
                ConstructorSig {
                    name: "false".to_string(),
                    arity: 0,
                    args: Vec::new(),
                },
            ],
        }
    }
}

/// A row of the pattern matrix: one (expanded) arm.
pub type PatternRow = Vec<Pat>;

/// Check whether a match is exhaustive.
///
/// `arms` are the or-expanded top-level patterns of the unguarded arms.
/// Returns `None` when exhaustive, or `Some(witnesses)` naming
/// constructors (or `_`) that no arm covers.
pub fn check_exhaustiveness(arms: &[Pat], scrutinee: &TypeInfo) -> Option<Vec<String>> {
    let matrix: Vec<PatternRow> = arms.iter().map(|p| vec![p.clone()]).collect();
    if !is_useful(&matrix, &[Pat::Wildcard], std::slice::from_ref(scrutinee)) {
        return None;
    }

    // Find witnesses: constructors whose fully-wild instantiation is
    // still useful, or `_` for infinite types.
    let witnesses = match scrutinee {
        TypeInfo::Sum { variants } => {
            let mut missing = Vec::new();
            for sig in variants {
                let probe = Pat::Constructor {
                    name: sig.name.clone(),
                    args: vec![Pat::Wildcard; sig.arity],
                };
                if is_useful(&matrix, &[probe], std::slice::from_ref(scrutinee)) {
                    missing.push(witness_name(sig));
                }
            }
            if missing.is_empty() {
                vec!["_".to_string()]
            } else {
                missing
            }
        }
        TypeInfo::Infinite => vec!["_".to_string()],
    };
    Some(witnesses)
}

fn witness_name(sig: &ConstructorSig) -> String {
    if sig.arity == 0 {
        sig.name.clone()
    } else {
        let holes = vec!["_"; sig.arity].join(", ");
        format!("{}({})", sig.name, holes)
    }
}

/// Indices (0-based) of arms no value can reach.
pub fn check_redundancy(arms: &[Pat], scrutinee: &TypeInfo) -> Vec<usize> {
    let mut redundant = Vec::new();
    let mut matrix: Vec<PatternRow> = Vec::new();
    for (index, arm) in arms.iter().enumerate() {
        if !is_useful(&matrix, std::slice::from_ref(arm), std::slice::from_ref(scrutinee)) {
            redundant.push(index);
        }
        matrix.push(vec![arm.clone()]);
    }
    redundant
}

/// Core usefulness predicate (Algorithm U).
///
/// Returns `true` if there exists a value matched by `row` but by no row
/// of `matrix`.
pub fn is_useful(matrix: &[PatternRow], row: &[Pat], types: &[TypeInfo]) -> bool {
    // Base case: no columns left. The row is useful only if the matrix
    // has no rows at all.
    if row.is_empty() {
        return matrix.is_empty();
    }

    let head = &row[0];
    match head {
        Pat::Constructor { name, args } => {
            let arg_types = constructor_arg_types(&types[0], name, args.len());
            let specialized = specialize_matrix(matrix, name, args.len());
            let mut new_row: Vec<Pat> = args.clone();
            new_row.extend_from_slice(&row[1..]);
            let mut new_types = arg_types;
            new_types.extend_from_slice(&types[1..]);
            is_useful(&specialized, &new_row, &new_types)
        }
        Pat::Literal(key) | Pat::Range(key) => {
            let specialized = specialize_matrix_literal(matrix, head, key);
            is_useful(&specialized, &row[1..], &types[1..])
        }
        Pat::Wildcard => {
            match &types[0] {
                TypeInfo::Sum { variants } => {
                    let used = used_constructors(matrix);
                    let complete =
                        !variants.is_empty() && variants.iter().all(|v| used.contains(&v.name));
                    if complete {
                        // Every constructor appears: the wildcard is useful
                        // iff it is useful under at least one of them.
                        variants.iter().any(|sig| {
                            let specialized = specialize_matrix(matrix, &sig.name, sig.arity);
                            let mut new_row = vec![Pat::Wildcard; sig.arity];
                            new_row.extend_from_slice(&row[1..]);
                            let mut new_types = sig.args.clone();
                            new_types.extend_from_slice(&types[1..]);
                            is_useful(&specialized, &new_row, &new_types)
                        })
                    } else {
                        // Some constructor is missing: only wildcard rows
                        // of the matrix can still cover it.
                        let defaulted = default_matrix(matrix);
                        is_useful(&defaulted, &row[1..], &types[1..])
                    }
                }
                TypeInfo::Infinite => {
                    // Literals never complete an infinite type.
                    let defaulted = default_matrix(matrix);
                    is_useful(&defaulted, &row[1..], &types[1..])
                }
            }
        }
    }
}

/// Argument column types for a constructor, padding with `Infinite` when
/// the signature is unknown (error recovery).
fn constructor_arg_types(ty: &TypeInfo, name: &str, arity: usize) -> Vec<TypeInfo> {
    if let TypeInfo::Sum { variants } = ty {
        if let Some(sig) = variants.iter().find(|v| v.name == name) {
            if sig.args.len() == arity {
                return sig.args.clone();
            }
        }
    }
    vec![TypeInfo::Infinite; arity]
}

/// Constructor names appearing at the head of any matrix row.
fn used_constructors(matrix: &[PatternRow]) -> Vec<String> {
    let mut names = Vec::new();
    for row in matrix {
        match row.first() {
            Some(Pat::Constructor { name, .. }) | Some(Pat::Literal(name)) => {
                if !names.contains(name) {
                    names.push(name.clone());
                }
            }
            _ => {}
        }
    }
    names
}

/// S(c, matrix): keep rows whose head matches constructor `c`, replacing
/// the head with its sub-patterns; wildcard heads expand to wildcards.
fn specialize_matrix(matrix: &[PatternRow], name: &str, arity: usize) -> Vec<PatternRow> {
    let mut out = Vec::new();
    for row in matrix {
        match row.first() {
            Some(Pat::Constructor {
                name: row_name,
                args,
            }) if row_name == name => {
                let mut new_row = args.clone();
                if new_row.len() != arity {
                    new_row = vec![Pat::Wildcard; arity];
                }
                new_row.extend_from_slice(&row[1..]);
                out.push(new_row);
            }
            Some(Pat::Literal(key)) if key == name => {
                out.push(row[1..].to_vec());
            }
            Some(Pat::Wildcard) => {
                let mut new_row = vec![Pat::Wildcard; arity];
                new_row.extend_from_slice(&row[1..]);
                out.push(new_row);
            }
            _ => {}
        }
    }
    out
}

/// Specialization by a literal or range key: rows with the same key or a
/// wildcard head survive.
fn specialize_matrix_literal(matrix: &[PatternRow], head: &Pat, key: &str) -> Vec<PatternRow> {
    let mut out = Vec::new();
    for row in matrix {
        match row.first() {
            Some(Pat::Literal(k)) | Some(Pat::Range(k)) => {
                let same_kind = std::mem::discriminant(row.first().unwrap())
                    == std::mem::discriminant(head);
                if same_kind && k == key {
                    out.push(row[1..].to_vec());
                }
            }
            Some(Pat::Wildcard) => out.push(row[1..].to_vec()),
            _ => {}
        }
    }
    out
}

/// D(matrix): rows whose head is a wildcard, with the head removed.
fn default_matrix(matrix: &[PatternRow]) -> Vec<PatternRow> {
    matrix
        .iter()
        .filter(|row| matches!(row.first(), Some(Pat::Wildcard)))
        .map(|row| row[1..].to_vec())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wildcard() -> Pat {
        Pat::Wildcard
    }

    fn ctor(name: &str, args: Vec<Pat>) -> Pat {
        Pat::Constructor {
            name: name.to_string(),
            args,
        }
    }

    fn lit_int(value: i64) -> Pat {
        Pat::Literal(value.to_string())
    }

    fn bool_lit(value: bool) -> Pat {
        ctor(if value { "true" } else { "false" }, vec![])
    }

    fn shape_type() -> TypeInfo {
        TypeInfo::Sum {
            variants: vec![
                ConstructorSig {
                    name: "Circle".to_string(),
                    arity: 1,
                    args: vec![TypeInfo::Infinite],
                },
                ConstructorSig {
                    name: "Point".to_string(),
                    arity: 0,
                    args: vec![],
                },
            ],
        }
    }

    fn option_of(inner: TypeInfo) -> TypeInfo {
        TypeInfo::Sum {
            variants: vec![
                ConstructorSig {
                    name: "Some".to_string(),
                    arity: 1,
                    args: vec![inner],
                },
                ConstructorSig {
                    name: "None".to_string(),
                    arity: 0,
                    args: vec![],
                },
            ],
        }
    }

    #[test]
    fn empty_matrix_any_pattern_is_useful() {
        assert!(is_useful(&[], &[wildcard()], &[TypeInfo::Infinite]));
    }

    #[test]
    fn empty_row_against_nonempty_matrix_is_not_useful() {
        assert!(!is_useful(&[vec![]], &[], &[]));
        assert!(is_useful(&[], &[], &[]));
    }

    #[test]
    fn bool_true_false_is_exhaustive() {
        let result = check_exhaustiveness(
            &[bool_lit(true), bool_lit(false)],
            &TypeInfo::bool_type(),
        );
        assert_eq!(result, None);
    }

    #[test]
    fn bool_true_only_is_missing_false() {
        let result = check_exhaustiveness(&[bool_lit(true)], &TypeInfo::bool_type());
        assert_eq!(result, Some(vec!["false".to_string()]));
    }

    #[test]
    fn sum_type_all_variants_is_exhaustive() {
        let result = check_exhaustiveness(
            &[ctor("Circle", vec![wildcard()]), ctor("Point", vec![])],
            &shape_type(),
        );
        assert_eq!(result, None);
    }

    #[test]
    fn sum_type_missing_variant_is_reported() {
        let result = check_exhaustiveness(&[ctor("Circle", vec![wildcard()])], &shape_type());
        assert_eq!(result, Some(vec!["Point".to_string()]));
    }

    #[test]
    fn wildcard_is_always_exhaustive() {
        assert_eq!(check_exhaustiveness(&[wildcard()], &shape_type()), None);
        assert_eq!(check_exhaustiveness(&[wildcard()], &TypeInfo::Infinite), None);
    }

    #[test]
    fn integers_without_wildcard_are_not_exhaustive() {
        let result = check_exhaustiveness(&[lit_int(1), lit_int(2)], &TypeInfo::Infinite);
        assert_eq!(result, Some(vec!["_".to_string()]));
    }

    #[test]
    fn integers_with_wildcard_are_exhaustive() {
        let result =
            check_exhaustiveness(&[lit_int(1), lit_int(2), wildcard()], &TypeInfo::Infinite);
        assert_eq!(result, None);
    }

    #[test]
    fn nested_missing_case_is_found() {
        // Some(Circle(_)) and None leave Some(Point) uncovered.
        let subject = option_of(shape_type());
        let result = check_exhaustiveness(
            &[
                ctor("Some", vec![ctor("Circle", vec![wildcard()])]),
                ctor("None", vec![]),
            ],
            &subject,
        );
        assert_eq!(result, Some(vec!["Some(_)".to_string()]));
    }

    #[test]
    fn nested_complete_match_is_exhaustive() {
        let subject = option_of(shape_type());
        let result = check_exhaustiveness(
            &[
                ctor("Some", vec![ctor("Circle", vec![wildcard()])]),
                ctor("Some", vec![ctor("Point", vec![])]),
                ctor("None", vec![]),
            ],
            &subject,
        );
        assert_eq!(result, None);
    }

    #[test]
    fn arm_after_wildcard_is_redundant() {
        let result = check_redundancy(
            &[wildcard(), ctor("Circle", vec![wildcard()])],
            &shape_type(),
        );
        assert_eq!(result, vec![1]);
    }

    #[test]
    fn duplicate_arm_is_redundant() {
        let result = check_redundancy(
            &[
                ctor("Circle", vec![wildcard()]),
                ctor("Circle", vec![wildcard()]),
                ctor("Point", vec![]),
            ],
            &shape_type(),
        );
        assert_eq!(result, vec![1]);
    }

    #[test]
    fn distinct_literals_are_not_redundant() {
        let result = check_redundancy(&[lit_int(1), lit_int(2), wildcard()], &TypeInfo::Infinite);
        assert!(result.is_empty());
    }

    #[test]
    fn duplicate_literal_is_redundant() {
        let result = check_redundancy(&[lit_int(1), lit_int(1), wildcard()], &TypeInfo::Infinite);
        assert_eq!(result, vec![1]);
    }

    #[test]
    fn wildcard_after_complete_sum_is_redundant() {
        let result = check_redundancy(
            &[
                ctor("Circle", vec![wildcard()]),
                ctor("Point", vec![]),
                wildcard(),
            ],
            &shape_type(),
        );
        assert_eq!(result, vec![2]);
    }

    #[test]
    fn tuple_columns_specialize_recursively() {
        // A tuple (bool, bool) is a single-constructor sum.
        let pair = TypeInfo::Sum {
            variants: vec![ConstructorSig {
                name: "(fields)".to_string(),
                arity: 2,
                args: vec![TypeInfo::bool_type(), TypeInfo::bool_type()],
            }],
        };
        // (true, _) and (false, _) cover everything.
        let result = check_exhaustiveness(
            &[
                ctor("(fields)", vec![bool_lit(true), wildcard()]),
                ctor("(fields)", vec![bool_lit(false), wildcard()]),
            ],
            &pair,
        );
        assert_eq!(result, None);

        // (true, true) and (false, false) miss the mixed cases.
        let result = check_exhaustiveness(
            &[
                ctor("(fields)", vec![bool_lit(true), bool_lit(true)]),
                ctor("(fields)", vec![bool_lit(false), bool_lit(false)]),
            ],
            &pair,
        );
        assert!(result.is_some());
    }
}
