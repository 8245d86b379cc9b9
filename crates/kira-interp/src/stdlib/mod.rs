//! The standard library: `std` as a nested record in the global
//! environment, so `std.io.println` is plain field access at runtime.
//!
//! `std.io`, `std.fs`, `std.time`, `std.map`, `std.char`, `std.math`,
//! `std.string`, `std.builder`, and `std.assert` are native. `std.list`,
//! `std.option`, and `std.result` are declared in Kira: the embedded
//! prelude source is parsed and evaluated at session setup, and its
//! functions are surfaced under their module records.

use std::cell::RefCell;
use std::rc::Rc;

use kira_common::span::Span;
use kira_parser::ast::DeclKind;

use crate::builtins::{native_assert, native_assert_eq};
use crate::error::{Abort, EvalResult, RuntimeError, RuntimeErrorKind};
use crate::value::{
    display_value, type_mismatch, value_eq, Closure, ClosureBody, NativeFn, ProgramRef,
    RecordValue, Value,
};
use crate::Interp;

/// The language-level part of the standard library.
const PRELUDE: &str = include_str!("prelude.ki");

fn err(kind: RuntimeErrorKind, message: impl Into<String>, span: Span) -> Abort {
    Abort::Error(RuntimeError::new(kind, message, span))
}

fn need(args: &[Value], n: usize, name: &str, span: Span) -> EvalResult<()> {
    if args.len() != n {
        return Err(err(
            RuntimeErrorKind::ArityMismatch,
            format!("`{name}` expects {n} arguments, found {}", args.len()),
            span,
        ));
    }
    Ok(())
}

fn record_of(fields: Vec<(&str, Value)>) -> Value {
    Value::Record(Rc::new(RecordValue {
        type_name: None,
        fields: RefCell::new(
            fields
                .into_iter()
                .map(|(name, value)| (Rc::from(name), value))
                .collect(),
        ),
    }))
}

fn native(name: &str, f: NativeFn, effect: bool) -> Value {
    Value::Closure(Rc::new(Closure {
        name: Some(Rc::from(name)),
        params: Vec::new(),
        body: ClosureBody::Native(f),
        env: None,
        effect,
    }))
}

/// Install the whole `std` namespace into the global environment.
pub fn install(interp: &mut Interp) {
    let globals = interp.globals();

    // Compile the prelude and collect its functions by name.
    let parse = kira_parser::parse(PRELUDE);
    debug_assert!(parse.diagnostics.is_empty(), "prelude must parse cleanly");
    let prelude_env = interp.envs.push(Some(globals));
    interp.set_prelude(parse.program);

    let decls = interp.prelude_program().decls.clone();
    for decl_id in decls {
        let decl = interp.prelude_program().decl(decl_id).clone();
        if let DeclKind::Function(f) = &decl.kind {
            if let Some(body) = &f.body {
                let closure = Value::Closure(Rc::new(Closure {
                    name: Some(Rc::from(f.name.as_str())),
                    params: f.params.iter().map(|p| Rc::from(p.name.as_str())).collect(),
                    body: ClosureBody::Block {
                        program: ProgramRef::Prelude,
                        stmts: body.clone(),
                    },
                    env: Some(prelude_env),
                    effect: f.effect,
                }));
                interp.envs.define(prelude_env, &f.name, closure, false);
            }
        }
    }

    // Surface prefixed prelude functions as module records; `_go`
    // helpers stay internal.
    let list = prelude_record(interp, prelude_env, "list_");
    let option = prelude_record(interp, prelude_env, "option_");
    let result = prelude_record(interp, prelude_env, "result_");

    let io = record_of(vec![
        ("print", native("print", io_print, true)),
        ("println", native("println", io_println, true)),
        ("eprint", native("eprint", io_eprint, true)),
        ("eprintln", native("eprintln", io_eprintln, true)),
        ("read_line", native("read_line", io_read_line, true)),
    ]);

    let fs = record_of(vec![
        ("read_file", native("read_file", fs_read_file, true)),
        ("write_file", native("write_file", fs_write_file, true)),
        ("exists", native("exists", fs_exists, true)),
        ("remove", native("remove", fs_remove, true)),
    ]);

    let string = record_of(vec![
        ("length", native("length", string_length, false)),
        ("split", native("split", string_split, false)),
        ("trim", native("trim", string_trim, false)),
        ("concat", native("concat", string_concat, false)),
        ("contains", native("contains", string_contains, false)),
        ("starts_with", native("starts_with", string_starts_with, false)),
        ("ends_with", native("ends_with", string_ends_with, false)),
        ("to_upper", native("to_upper", string_to_upper, false)),
        ("to_lower", native("to_lower", string_to_lower, false)),
        ("replace", native("replace", string_replace, false)),
        ("substring", native("substring", string_substring, false)),
        ("char_at", native("char_at", string_char_at, false)),
        ("index_of", native("index_of", string_index_of, false)),
        ("chars", native("chars", string_chars, false)),
        ("parse_int", native("parse_int", string_parse_int, false)),
    ]);

    let builder = record_of(vec![
        ("new", native("new", builder_new, false)),
        ("append", native("append", builder_append, false)),
        ("append_char", native("append_char", builder_append, false)),
        ("append_int", native("append_int", builder_append, false)),
        ("append_float", native("append_float", builder_append, false)),
        ("build", native("build", builder_build, false)),
        ("clear", native("clear", builder_clear, false)),
        ("length", native("length", builder_length, false)),
    ]);

    let map = record_of(vec![
        ("new", native("new", map_new, false)),
        ("put", native("put", map_put, false)),
        ("get", native("get", map_get, false)),
        ("contains", native("contains", map_contains, false)),
        ("remove", native("remove", map_remove, false)),
        ("keys", native("keys", map_keys, false)),
        ("values", native("values", map_values, false)),
        ("entries", native("entries", map_entries, false)),
        ("size", native("size", map_size, false)),
        ("is_empty", native("is_empty", map_is_empty, false)),
    ]);

    let char_module = record_of(vec![
        ("from_i32", native("from_i32", char_from_i32, false)),
        ("to_i32", native("to_i32", char_to_i32, false)),
    ]);

    let math = record_of(vec![(
        "trunc_to_i64",
        native("trunc_to_i64", math_trunc_to_i64, false),
    )]);

    let time = record_of(vec![
        ("now", native("now", time_now, true)),
        ("sleep", native("sleep", time_sleep, true)),
        ("elapsed", native("elapsed", time_elapsed, true)),
    ]);

    let assert_module = record_of(vec![
        ("assert", native("assert", native_assert, false)),
        ("assert_eq", native("assert_eq", native_assert_eq, false)),
    ]);

    let std = record_of(vec![
        ("io", io),
        ("list", list),
        ("option", option),
        ("result", result),
        ("string", string),
        ("fs", fs),
        ("builder", builder),
        ("map", map),
        ("char", char_module),
        ("math", math),
        ("time", time),
        ("assert", assert_module),
    ]);
    interp.envs.define(globals, "std", std, false);
}

/// Collect `prefix`-named prelude bindings into a module record, with the
/// prefix stripped.
fn prelude_record(interp: &Interp, prelude_env: crate::env::EnvId, prefix: &str) -> Value {
    let mut fields: Vec<(Rc<str>, Value)> = Vec::new();
    for (name, binding) in interp.envs.bindings(prelude_env) {
        if let Some(stripped) = name.strip_prefix(prefix) {
            if stripped.ends_with("_go") || stripped.contains("_go_") {
                continue;
            }
            fields.push((Rc::from(stripped), binding.value.clone()));
        }
    }
    Value::Record(Rc::new(RecordValue {
        type_name: None,
        fields: RefCell::new(fields),
    }))
}

// ── std.io ─────────────────────────────────────────────────────────────

fn io_print(interp: &mut Interp, args: &[Value], span: Span) -> EvalResult<Value> {
    need(args, 1, "print", span)?;
    let text = display_value(&args[0]);
    interp.write_out(&text);
    Ok(Value::Void)
}

fn io_println(interp: &mut Interp, args: &[Value], span: Span) -> EvalResult<Value> {
    need(args, 1, "println", span)?;
    let mut text = display_value(&args[0]);
    text.push('\n');
    interp.write_out(&text);
    Ok(Value::Void)
}

fn io_eprint(_interp: &mut Interp, args: &[Value], span: Span) -> EvalResult<Value> {
    need(args, 1, "eprint", span)?;
    eprint!("{}", display_value(&args[0]));
    Ok(Value::Void)
}

fn io_eprintln(_interp: &mut Interp, args: &[Value], span: Span) -> EvalResult<Value> {
    need(args, 1, "eprintln", span)?;
    eprintln!("{}", display_value(&args[0]));
    Ok(Value::Void)
}

fn io_read_line(_interp: &mut Interp, args: &[Value], span: Span) -> EvalResult<Value> {
    need(args, 0, "read_line", span)?;
    let mut line = String::new();
    match std::io::stdin().read_line(&mut line) {
        Ok(_) => {
            while line.ends_with('\n') || line.ends_with('\r') {
                line.pop();
            }
            Ok(Value::str(line))
        }
        Err(error) => Err(err(
            RuntimeErrorKind::InvalidOperation,
            format!("read_line failed: {error}"),
            span,
        )),
    }
}

// ── std.fs ─────────────────────────────────────────────────────────────

fn fs_path(args: &[Value], span: Span) -> EvalResult<String> {
    match &args[0] {
        Value::Str(s) => Ok(s.to_string()),
        other => Err(Abort::Error(type_mismatch("string", other, span))),
    }
}

fn fs_read_file(_interp: &mut Interp, args: &[Value], span: Span) -> EvalResult<Value> {
    need(args, 1, "read_file", span)?;
    let path = fs_path(args, span)?;
    Ok(match std::fs::read_to_string(&path) {
        Ok(contents) => Value::ok(Value::str(contents)),
        Err(error) => Value::err(Value::str(error.to_string())),
    })
}

fn fs_write_file(_interp: &mut Interp, args: &[Value], span: Span) -> EvalResult<Value> {
    need(args, 2, "write_file", span)?;
    let path = fs_path(args, span)?;
    let Value::Str(contents) = &args[1] else {
        return Err(Abort::Error(type_mismatch("string", &args[1], span)));
    };
    Ok(match std::fs::write(&path, contents.as_bytes()) {
        Ok(()) => Value::ok(Value::Void),
        Err(error) => Value::err(Value::str(error.to_string())),
    })
}

fn fs_exists(_interp: &mut Interp, args: &[Value], span: Span) -> EvalResult<Value> {
    need(args, 1, "exists", span)?;
    let path = fs_path(args, span)?;
    Ok(Value::Bool(std::path::Path::new(&path).exists()))
}

fn fs_remove(_interp: &mut Interp, args: &[Value], span: Span) -> EvalResult<Value> {
    need(args, 1, "remove", span)?;
    let path = fs_path(args, span)?;
    Ok(match std::fs::remove_file(&path) {
        Ok(()) => Value::ok(Value::Void),
        Err(error) => Value::err(Value::str(error.to_string())),
    })
}

// ── std.string ─────────────────────────────────────────────────────────
//
// Every operation is Unicode-scalar indexed; byte offsets never surface.

fn one_string<'a>(args: &'a [Value], span: Span) -> EvalResult<&'a str> {
    match &args[0] {
        Value::Str(s) => Ok(s.as_ref()),
        other => Err(Abort::Error(type_mismatch("string", other, span))),
    }
}

fn two_strings<'a>(args: &'a [Value], span: Span) -> EvalResult<(&'a str, &'a str)> {
    match (&args[0], &args[1]) {
        (Value::Str(a), Value::Str(b)) => Ok((a.as_ref(), b.as_ref())),
        _ => Err(err(
            RuntimeErrorKind::TypeMismatch,
            "expected two strings",
            span,
        )),
    }
}

fn string_length(_interp: &mut Interp, args: &[Value], span: Span) -> EvalResult<Value> {
    need(args, 1, "length", span)?;
    let s = one_string(args, span)?;
    Ok(Value::Int(s.chars().count() as i128))
}

fn string_split(_interp: &mut Interp, args: &[Value], span: Span) -> EvalResult<Value> {
    need(args, 2, "split", span)?;
    let (s, delim) = two_strings(args, span)?;
    let parts: Vec<Value> = if delim.is_empty() {
        s.chars().map(|c| Value::str(c.to_string())).collect()
    } else {
        s.split(delim).map(Value::str).collect()
    };
    Ok(Value::array(parts))
}

fn string_trim(_interp: &mut Interp, args: &[Value], span: Span) -> EvalResult<Value> {
    need(args, 1, "trim", span)?;
    Ok(Value::str(one_string(args, span)?.trim()))
}

fn string_concat(_interp: &mut Interp, args: &[Value], span: Span) -> EvalResult<Value> {
    need(args, 2, "concat", span)?;
    let (a, b) = two_strings(args, span)?;
    let mut s = a.to_string();
    s.push_str(b);
    Ok(Value::str(s))
}

fn string_contains(_interp: &mut Interp, args: &[Value], span: Span) -> EvalResult<Value> {
    need(args, 2, "contains", span)?;
    let (s, sub) = two_strings(args, span)?;
    Ok(Value::Bool(s.contains(sub)))
}

fn string_starts_with(_interp: &mut Interp, args: &[Value], span: Span) -> EvalResult<Value> {
    need(args, 2, "starts_with", span)?;
    let (s, prefix) = two_strings(args, span)?;
    Ok(Value::Bool(s.starts_with(prefix)))
}

fn string_ends_with(_interp: &mut Interp, args: &[Value], span: Span) -> EvalResult<Value> {
    need(args, 2, "ends_with", span)?;
    let (s, suffix) = two_strings(args, span)?;
    Ok(Value::Bool(s.ends_with(suffix)))
}

fn string_to_upper(_interp: &mut Interp, args: &[Value], span: Span) -> EvalResult<Value> {
    need(args, 1, "to_upper", span)?;
    Ok(Value::str(one_string(args, span)?.to_uppercase()))
}

fn string_to_lower(_interp: &mut Interp, args: &[Value], span: Span) -> EvalResult<Value> {
    need(args, 1, "to_lower", span)?;
    Ok(Value::str(one_string(args, span)?.to_lowercase()))
}

fn string_replace(_interp: &mut Interp, args: &[Value], span: Span) -> EvalResult<Value> {
    need(args, 3, "replace", span)?;
    let (s, from) = two_strings(args, span)?;
    let Value::Str(to) = &args[2] else {
        return Err(Abort::Error(type_mismatch("string", &args[2], span)));
    };
    Ok(Value::str(s.replace(from, to)))
}

fn int_arg(args: &[Value], index: usize, span: Span) -> EvalResult<i128> {
    match &args[index] {
        Value::Int(v) => Ok(*v),
        other => Err(Abort::Error(type_mismatch("int", other, span))),
    }
}

fn string_substring(_interp: &mut Interp, args: &[Value], span: Span) -> EvalResult<Value> {
    need(args, 3, "substring", span)?;
    let s = one_string(args, span)?;
    let start = int_arg(args, 1, span)?.max(0) as usize;
    let end = int_arg(args, 2, span)?.max(0) as usize;
    let out: String = s.chars().skip(start).take(end.saturating_sub(start)).collect();
    Ok(Value::str(out))
}

fn string_char_at(_interp: &mut Interp, args: &[Value], span: Span) -> EvalResult<Value> {
    need(args, 2, "char_at", span)?;
    let s = one_string(args, span)?;
    let index = int_arg(args, 1, span)?;
    Ok(match usize::try_from(index).ok().and_then(|i| s.chars().nth(i)) {
        Some(c) => Value::some(Value::Char(c)),
        None => Value::none(),
    })
}

fn string_index_of(_interp: &mut Interp, args: &[Value], span: Span) -> EvalResult<Value> {
    need(args, 2, "index_of", span)?;
    let (s, sub) = two_strings(args, span)?;
    Ok(match s.find(sub) {
        Some(byte_index) => {
            // Convert the byte offset to a scalar index.
            let scalar_index = s[..byte_index].chars().count() as i128;
            Value::some(Value::Int(scalar_index))
        }
        None => Value::none(),
    })
}

fn string_chars(_interp: &mut Interp, args: &[Value], span: Span) -> EvalResult<Value> {
    need(args, 1, "chars", span)?;
    let s = one_string(args, span)?;
    Ok(Value::array(s.chars().map(Value::Char).collect()))
}

fn string_parse_int(_interp: &mut Interp, args: &[Value], span: Span) -> EvalResult<Value> {
    need(args, 1, "parse_int", span)?;
    let s = one_string(args, span)?;
    Ok(match s.trim().parse::<i128>() {
        Ok(v) => Value::some(Value::Int(v)),
        Err(_) => Value::none(),
    })
}

// ── std.builder ────────────────────────────────────────────────────────

fn builder_new(_interp: &mut Interp, args: &[Value], span: Span) -> EvalResult<Value> {
    need(args, 0, "new", span)?;
    Ok(Value::Ref(Rc::new(RefCell::new(Value::str("")))))
}

fn builder_cell<'a>(args: &'a [Value], span: Span) -> EvalResult<&'a Rc<RefCell<Value>>> {
    match &args[0] {
        Value::Ref(cell) => Ok(cell),
        other => Err(Abort::Error(type_mismatch("builder", other, span))),
    }
}

fn builder_append(_interp: &mut Interp, args: &[Value], span: Span) -> EvalResult<Value> {
    need(args, 2, "append", span)?;
    let cell = builder_cell(args, span)?;
    let current = match &*cell.borrow() {
        Value::Str(s) => s.to_string(),
        other => return Err(Abort::Error(type_mismatch("builder", other, span))),
    };
    let mut next = current;
    next.push_str(&display_value(&args[1]));
    *cell.borrow_mut() = Value::str(next);
    Ok(Value::Void)
}

fn builder_build(_interp: &mut Interp, args: &[Value], span: Span) -> EvalResult<Value> {
    need(args, 1, "build", span)?;
    let cell = builder_cell(args, span)?;
    let value = cell.borrow().clone();
    Ok(value)
}

fn builder_clear(_interp: &mut Interp, args: &[Value], span: Span) -> EvalResult<Value> {
    need(args, 1, "clear", span)?;
    let cell = builder_cell(args, span)?;
    *cell.borrow_mut() = Value::str("");
    Ok(Value::Void)
}

fn builder_length(_interp: &mut Interp, args: &[Value], span: Span) -> EvalResult<Value> {
    need(args, 1, "length", span)?;
    let cell = builder_cell(args, span)?;
    let length = match &*cell.borrow() {
        Value::Str(s) => s.chars().count() as i128,
        other => return Err(Abort::Error(type_mismatch("builder", other, span))),
    };
    Ok(Value::Int(length))
}

// ── std.map ────────────────────────────────────────────────────────────

fn map_cell<'a>(
    args: &'a [Value],
    span: Span,
) -> EvalResult<&'a Rc<RefCell<Vec<(Value, Value)>>>> {
    match &args[0] {
        Value::Map(cell) => Ok(cell),
        other => Err(Abort::Error(type_mismatch("map", other, span))),
    }
}

fn map_new(_interp: &mut Interp, args: &[Value], span: Span) -> EvalResult<Value> {
    need(args, 0, "new", span)?;
    Ok(Value::Map(Rc::new(RefCell::new(Vec::new()))))
}

fn map_put(_interp: &mut Interp, args: &[Value], span: Span) -> EvalResult<Value> {
    need(args, 3, "put", span)?;
    let cell = map_cell(args, span)?;
    let mut entries = cell.borrow_mut();
    match entries.iter_mut().find(|(k, _)| value_eq(k, &args[1])) {
        Some((_, slot)) => *slot = args[2].clone(),
        None => entries.push((args[1].clone(), args[2].clone())),
    }
    Ok(Value::Void)
}

fn map_get(_interp: &mut Interp, args: &[Value], span: Span) -> EvalResult<Value> {
    need(args, 2, "get", span)?;
    let cell = map_cell(args, span)?;
    let entries = cell.borrow();
    Ok(match entries.iter().find(|(k, _)| value_eq(k, &args[1])) {
        Some((_, v)) => Value::some(v.clone()),
        None => Value::none(),
    })
}

fn map_contains(_interp: &mut Interp, args: &[Value], span: Span) -> EvalResult<Value> {
    need(args, 2, "contains", span)?;
    let cell = map_cell(args, span)?;
    let found = cell.borrow().iter().any(|(k, _)| value_eq(k, &args[1]));
    Ok(Value::Bool(found))
}

fn map_remove(_interp: &mut Interp, args: &[Value], span: Span) -> EvalResult<Value> {
    need(args, 2, "remove", span)?;
    let cell = map_cell(args, span)?;
    let mut entries = cell.borrow_mut();
    entries.retain(|(k, _)| !value_eq(k, &args[1]));
    Ok(Value::Void)
}

fn map_keys(_interp: &mut Interp, args: &[Value], span: Span) -> EvalResult<Value> {
    need(args, 1, "keys", span)?;
    let cell = map_cell(args, span)?;
    let keys = cell.borrow().iter().map(|(k, _)| k.clone()).collect();
    Ok(Value::array(keys))
}

fn map_values(_interp: &mut Interp, args: &[Value], span: Span) -> EvalResult<Value> {
    need(args, 1, "values", span)?;
    let cell = map_cell(args, span)?;
    let values = cell.borrow().iter().map(|(_, v)| v.clone()).collect();
    Ok(Value::array(values))
}

fn map_entries(_interp: &mut Interp, args: &[Value], span: Span) -> EvalResult<Value> {
    need(args, 1, "entries", span)?;
    let cell = map_cell(args, span)?;
    let entries = cell
        .borrow()
        .iter()
        .map(|(k, v)| Value::tuple(vec![k.clone(), v.clone()]))
        .collect();
    Ok(Value::array(entries))
}

fn map_size(_interp: &mut Interp, args: &[Value], span: Span) -> EvalResult<Value> {
    need(args, 1, "size", span)?;
    let cell = map_cell(args, span)?;
    let size = cell.borrow().len() as i128;
    Ok(Value::Int(size))
}

fn map_is_empty(_interp: &mut Interp, args: &[Value], span: Span) -> EvalResult<Value> {
    need(args, 1, "is_empty", span)?;
    let cell = map_cell(args, span)?;
    let empty = cell.borrow().is_empty();
    Ok(Value::Bool(empty))
}

// ── std.char ───────────────────────────────────────────────────────────

fn char_from_i32(_interp: &mut Interp, args: &[Value], span: Span) -> EvalResult<Value> {
    need(args, 1, "from_i32", span)?;
    let code = int_arg(args, 0, span)?;
    Ok(match u32::try_from(code).ok().and_then(char::from_u32) {
        Some(c) => Value::some(Value::Char(c)),
        None => Value::none(),
    })
}

fn char_to_i32(_interp: &mut Interp, args: &[Value], span: Span) -> EvalResult<Value> {
    need(args, 1, "to_i32", span)?;
    match &args[0] {
        Value::Char(c) => Ok(Value::Int(*c as i128)),
        other => Err(Abort::Error(type_mismatch("char", other, span))),
    }
}

// ── std.math ───────────────────────────────────────────────────────────

fn math_trunc_to_i64(_interp: &mut Interp, args: &[Value], span: Span) -> EvalResult<Value> {
    need(args, 1, "trunc_to_i64", span)?;
    match &args[0] {
        Value::Float(v) => Ok(Value::Int((v.trunc() as i64) as i128)),
        other => Err(Abort::Error(type_mismatch("float", other, span))),
    }
}

// ── std.time ───────────────────────────────────────────────────────────

fn now_millis() -> i128 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i128)
        .unwrap_or(0)
}

fn time_now(_interp: &mut Interp, args: &[Value], span: Span) -> EvalResult<Value> {
    need(args, 0, "now", span)?;
    Ok(Value::Int(now_millis()))
}

fn time_sleep(_interp: &mut Interp, args: &[Value], span: Span) -> EvalResult<Value> {
    need(args, 1, "sleep", span)?;
    let millis = int_arg(args, 0, span)?.max(0);
    std::thread::sleep(std::time::Duration::from_millis(millis as u64));
    Ok(Value::Void)
}

fn time_elapsed(_interp: &mut Interp, args: &[Value], span: Span) -> EvalResult<Value> {
    need(args, 1, "elapsed", span)?;
    let since = int_arg(args, 0, span)?;
    Ok(Value::Int(now_millis() - since))
}
