//! Built-in functions injected into every program's global scope.
//!
//! All strict; integer arguments arrive width-erased as `i128`, floats
//! never convert implicitly. `print`/`println` are the only effectful
//! entries.

use std::rc::Rc;

use kira_common::span::Span;

use crate::error::{Abort, EvalResult, RuntimeError, RuntimeErrorKind};
use crate::value::{
    display_value, type_mismatch, value_eq, Closure, ClosureBody, NativeFn, Value,
    VariantPayloadValue,
};
use crate::Interp;

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

/// Install every built-in into the interpreter's global environment.
pub fn install(interp: &mut Interp) {
    let globals = interp.globals();
    let natives: &[(&str, NativeFn, bool)] = &[
        ("print", native_print, true),
        ("println", native_println, true),
        ("type_of", native_type_of, false),
        ("to_string", native_to_string, false),
        ("to_int", native_to_int, false),
        ("to_float", native_to_float, false),
        ("abs", native_abs, false),
        ("min", native_min, false),
        ("max", native_max, false),
        ("len", native_len, false),
        ("push", native_push, false),
        ("pop", native_pop, false),
        ("head", native_head, false),
        ("tail", native_tail, false),
        ("empty", native_empty, false),
        ("reverse", native_reverse, false),
        ("split", native_split, false),
        ("join", native_join, false),
        ("trim", native_trim, false),
        ("contains", native_contains, false),
        ("starts_with", native_starts_with, false),
        ("ends_with", native_ends_with, false),
        ("assert", native_assert, false),
        ("assert_eq", native_assert_eq, false),
    ];
    for (name, f, effect) in natives {
        let closure = Value::Closure(Rc::new(Closure {
            name: Some(Rc::from(*name)),
            params: Vec::new(),
            body: ClosureBody::Native(*f),
            env: None,
            effect: *effect,
        }));
        interp.envs.define(globals, name, closure, false);
    }

    // Built-in constructors, usable as values and patterns.
    for (type_name, variant, arity) in [
        ("Option", "Some", 1usize),
        ("Result", "Ok", 1),
        ("Result", "Err", 1),
        ("List", "Cons", 2),
    ] {
        let ctor = Value::Closure(Rc::new(Closure {
            name: Some(Rc::from(variant)),
            params: (0..arity).map(|i| Rc::from(format!("_{i}").as_str())).collect(),
            body: ClosureBody::Ctor {
                type_name: Rc::from(type_name),
                variant: Rc::from(variant),
                arity,
                record_fields: None,
            },
            env: None,
            effect: false,
        }));
        interp.envs.define(globals, variant, ctor, false);
    }
    interp.envs.define(globals, "None", Value::none(), false);
    interp.envs.define(globals, "Nil", Value::nil(), false);
}

fn native_print(interp: &mut Interp, args: &[Value], span: Span) -> EvalResult<Value> {
    need(args, 1, "print", span)?;
    let text = display_value(&args[0]);
    interp.write_out(&text);
    Ok(Value::Void)
}

fn native_println(interp: &mut Interp, args: &[Value], span: Span) -> EvalResult<Value> {
    need(args, 1, "println", span)?;
    let mut text = display_value(&args[0]);
    text.push('\n');
    interp.write_out(&text);
    Ok(Value::Void)
}

fn native_type_of(_interp: &mut Interp, args: &[Value], span: Span) -> EvalResult<Value> {
    need(args, 1, "type_of", span)?;
    Ok(Value::str(args[0].type_name()))
}

fn native_to_string(_interp: &mut Interp, args: &[Value], span: Span) -> EvalResult<Value> {
    need(args, 1, "to_string", span)?;
    Ok(Value::str(display_value(&args[0])))
}

fn native_to_int(_interp: &mut Interp, args: &[Value], span: Span) -> EvalResult<Value> {
    need(args, 1, "to_int", span)?;
    match &args[0] {
        Value::Int(v) => Ok(Value::Int(*v)),
        // Truncates toward zero.
        Value::Float(v) => Ok(Value::Int(v.trunc() as i128)),
        Value::Bool(b) => Ok(Value::Int(i128::from(*b))),
        Value::Str(s) => s.trim().parse::<i128>().map(Value::Int).map_err(|_| {
            err(
                RuntimeErrorKind::InvalidOperation,
                format!("cannot parse `{s}` as an integer"),
                span,
            )
        }),
        other => Err(Abort::Error(type_mismatch("number, bool, or string", other, span))),
    }
}

fn native_to_float(_interp: &mut Interp, args: &[Value], span: Span) -> EvalResult<Value> {
    need(args, 1, "to_float", span)?;
    match &args[0] {
        Value::Float(v) => Ok(Value::Float(*v)),
        Value::Int(v) => Ok(Value::Float(*v as f64)),
        Value::Str(s) => s.trim().parse::<f64>().map(Value::Float).map_err(|_| {
            err(
                RuntimeErrorKind::InvalidOperation,
                format!("cannot parse `{s}` as a float"),
                span,
            )
        }),
        other => Err(Abort::Error(type_mismatch("number or string", other, span))),
    }
}

fn native_abs(_interp: &mut Interp, args: &[Value], span: Span) -> EvalResult<Value> {
    need(args, 1, "abs", span)?;
    match &args[0] {
        Value::Int(v) => v
            .checked_abs()
            .map(Value::Int)
            .ok_or_else(|| err(RuntimeErrorKind::Overflow, "integer overflow", span)),
        Value::Float(v) => Ok(Value::Float(v.abs())),
        other => Err(Abort::Error(type_mismatch("number", other, span))),
    }
}

fn native_min(_interp: &mut Interp, args: &[Value], span: Span) -> EvalResult<Value> {
    need(args, 2, "min", span)?;
    min_max(&args[0], &args[1], true, span)
}

fn native_max(_interp: &mut Interp, args: &[Value], span: Span) -> EvalResult<Value> {
    need(args, 2, "max", span)?;
    min_max(&args[0], &args[1], false, span)
}

fn min_max(a: &Value, b: &Value, take_min: bool, span: Span) -> EvalResult<Value> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Ok(Value::Int(if take_min {
            *x.min(y)
        } else {
            *x.max(y)
        })),
        (Value::Float(x), Value::Float(y)) => Ok(Value::Float(if take_min {
            x.min(*y)
        } else {
            x.max(*y)
        })),
        _ => Err(err(
            RuntimeErrorKind::TypeMismatch,
            format!(
                "arguments must share a numeric type, found {} and {}",
                a.type_name(),
                b.type_name()
            ),
            span,
        )),
    }
}

fn native_len(interp: &mut Interp, args: &[Value], span: Span) -> EvalResult<Value> {
    need(args, 1, "len", span)?;
    match &args[0] {
        Value::Str(s) => Ok(Value::Int(s.chars().count() as i128)),
        Value::Array(items) => Ok(Value::Int(items.borrow().len() as i128)),
        Value::Tuple(items) => Ok(Value::Int(items.len() as i128)),
        v @ Value::Variant(variant) if variant.type_name.as_ref() == "List" => {
            interp.list_length(v, span).map(Value::Int)
        }
        other => Err(Abort::Error(type_mismatch("collection", other, span))),
    }
}

fn native_push(_interp: &mut Interp, args: &[Value], span: Span) -> EvalResult<Value> {
    need(args, 2, "push", span)?;
    match &args[0] {
        Value::Array(items) => {
            let mut next = items.borrow().clone();
            next.push(args[1].clone());
            Ok(Value::array(next))
        }
        Value::Variant(v) if v.type_name.as_ref() == "List" => {
            Ok(Value::cons(args[1].clone(), args[0].clone()))
        }
        other => Err(Abort::Error(type_mismatch("array or list", other, span))),
    }
}

fn native_pop(_interp: &mut Interp, args: &[Value], span: Span) -> EvalResult<Value> {
    need(args, 1, "pop", span)?;
    match &args[0] {
        Value::Array(items) => {
            let mut next = items.borrow().clone();
            if next.pop().is_none() {
                return Err(err(
                    RuntimeErrorKind::InvalidOperation,
                    "`pop` on an empty array",
                    span,
                ));
            }
            Ok(Value::array(next))
        }
        Value::Variant(v) if v.name.as_ref() == "Cons" => match &v.payload {
            Some(VariantPayloadValue::Tuple(items)) => Ok(items[1].clone()),
            _ => Err(err(RuntimeErrorKind::InvalidOperation, "malformed list", span)),
        },
        Value::Variant(v) if v.name.as_ref() == "Nil" => Err(err(
            RuntimeErrorKind::InvalidOperation,
            "`pop` on an empty list",
            span,
        )),
        other => Err(Abort::Error(type_mismatch("array or list", other, span))),
    }
}

fn native_head(_interp: &mut Interp, args: &[Value], span: Span) -> EvalResult<Value> {
    need(args, 1, "head", span)?;
    match &args[0] {
        Value::Array(items) => Ok(match items.borrow().first() {
            Some(first) => Value::some(first.clone()),
            None => Value::none(),
        }),
        Value::Str(s) => Ok(match s.chars().next() {
            Some(c) => Value::some(Value::Char(c)),
            None => Value::none(),
        }),
        Value::Variant(v) if v.name.as_ref() == "Cons" => match &v.payload {
            Some(VariantPayloadValue::Tuple(items)) => Ok(Value::some(items[0].clone())),
            _ => Err(err(RuntimeErrorKind::InvalidOperation, "malformed list", span)),
        },
        Value::Variant(v) if v.name.as_ref() == "Nil" => Ok(Value::none()),
        other => Err(Abort::Error(type_mismatch("collection", other, span))),
    }
}

fn native_tail(_interp: &mut Interp, args: &[Value], span: Span) -> EvalResult<Value> {
    need(args, 1, "tail", span)?;
    match &args[0] {
        Value::Array(items) => {
            let items = items.borrow();
            Ok(Value::array(items.iter().skip(1).cloned().collect()))
        }
        Value::Str(s) => {
            let mut chars = s.chars();
            chars.next();
            Ok(Value::str(chars.as_str()))
        }
        Value::Variant(v) if v.name.as_ref() == "Cons" => match &v.payload {
            Some(VariantPayloadValue::Tuple(items)) => Ok(items[1].clone()),
            _ => Err(err(RuntimeErrorKind::InvalidOperation, "malformed list", span)),
        },
        Value::Variant(v) if v.name.as_ref() == "Nil" => Ok(Value::nil()),
        other => Err(Abort::Error(type_mismatch("collection", other, span))),
    }
}

fn native_empty(interp: &mut Interp, args: &[Value], span: Span) -> EvalResult<Value> {
    need(args, 1, "empty", span)?;
    let len = native_len(interp, args, span)?;
    match len {
        Value::Int(n) => Ok(Value::Bool(n == 0)),
        _ => unreachable!("len returns an integer"),
    }
}

fn native_reverse(_interp: &mut Interp, args: &[Value], span: Span) -> EvalResult<Value> {
    need(args, 1, "reverse", span)?;
    match &args[0] {
        Value::Array(items) => {
            let mut next = items.borrow().clone();
            next.reverse();
            Ok(Value::array(next))
        }
        Value::Str(s) => Ok(Value::str(s.chars().rev().collect::<String>())),
        Value::Variant(v) if v.type_name.as_ref() == "List" => {
            let mut reversed = Value::nil();
            let mut current = args[0].clone();
            loop {
                match &current {
                    Value::Variant(v) if v.name.as_ref() == "Nil" => return Ok(reversed),
                    Value::Variant(v) if v.name.as_ref() == "Cons" => {
                        let Some(VariantPayloadValue::Tuple(items)) = &v.payload else {
                            return Err(err(
                                RuntimeErrorKind::InvalidOperation,
                                "malformed list",
                                span,
                            ));
                        };
                        reversed = Value::cons(items[0].clone(), reversed);
                        let next = items[1].clone();
                        current = next;
                    }
                    other => return Err(Abort::Error(type_mismatch("list", other, span))),
                }
            }
        }
        other => Err(Abort::Error(type_mismatch("collection", other, span))),
    }
}

fn native_split(_interp: &mut Interp, args: &[Value], span: Span) -> EvalResult<Value> {
    need(args, 2, "split", span)?;
    let (Value::Str(s), Value::Str(delim)) = (&args[0], &args[1]) else {
        return Err(err(
            RuntimeErrorKind::TypeMismatch,
            "`split` expects two strings",
            span,
        ));
    };
    let parts: Vec<Value> = if delim.is_empty() {
        s.chars().map(|c| Value::str(c.to_string())).collect()
    } else {
        s.split(delim.as_ref()).map(Value::str).collect()
    };
    Ok(Value::array(parts))
}

fn native_join(_interp: &mut Interp, args: &[Value], span: Span) -> EvalResult<Value> {
    need(args, 2, "join", span)?;
    let (Value::Array(items), Value::Str(sep)) = (&args[0], &args[1]) else {
        return Err(err(
            RuntimeErrorKind::TypeMismatch,
            "`join` expects an array and a string",
            span,
        ));
    };
    let rendered: Vec<String> = items.borrow().iter().map(display_value).collect();
    Ok(Value::str(rendered.join(sep)))
}

fn native_trim(_interp: &mut Interp, args: &[Value], span: Span) -> EvalResult<Value> {
    need(args, 1, "trim", span)?;
    match &args[0] {
        Value::Str(s) => Ok(Value::str(s.trim())),
        other => Err(Abort::Error(type_mismatch("string", other, span))),
    }
}

fn string_pair<'a>(
    args: &'a [Value],
    name: &str,
    span: Span,
) -> EvalResult<(&'a str, &'a str)> {
    match (&args[0], &args[1]) {
        (Value::Str(a), Value::Str(b)) => Ok((a.as_ref(), b.as_ref())),
        _ => Err(err(
            RuntimeErrorKind::TypeMismatch,
            format!("`{name}` expects two strings"),
            span,
        )),
    }
}

fn native_contains(_interp: &mut Interp, args: &[Value], span: Span) -> EvalResult<Value> {
    need(args, 2, "contains", span)?;
    let (s, sub) = string_pair(args, "contains", span)?;
    Ok(Value::Bool(s.contains(sub)))
}

fn native_starts_with(_interp: &mut Interp, args: &[Value], span: Span) -> EvalResult<Value> {
    need(args, 2, "starts_with", span)?;
    let (s, prefix) = string_pair(args, "starts_with", span)?;
    Ok(Value::Bool(s.starts_with(prefix)))
}

fn native_ends_with(_interp: &mut Interp, args: &[Value], span: Span) -> EvalResult<Value> {
    need(args, 2, "ends_with", span)?;
    let (s, suffix) = string_pair(args, "ends_with", span)?;
    Ok(Value::Bool(s.ends_with(suffix)))
}

pub(crate) fn native_assert(_interp: &mut Interp, args: &[Value], span: Span) -> EvalResult<Value> {
    need(args, 1, "assert", span)?;
    match &args[0] {
        Value::Bool(true) => Ok(Value::Void),
        Value::Bool(false) => Err(err(
            RuntimeErrorKind::AssertionFailed,
            "assertion failed",
            span,
        )),
        other => Err(Abort::Error(type_mismatch("bool", other, span))),
    }
}

pub(crate) fn native_assert_eq(
    _interp: &mut Interp,
    args: &[Value],
    span: Span,
) -> EvalResult<Value> {
    need(args, 2, "assert_eq", span)?;
    if value_eq(&args[0], &args[1]) {
        Ok(Value::Void)
    } else {
        Err(err(
            RuntimeErrorKind::AssertionFailed,
            format!(
                "assertion failed: {} != {}",
                display_value(&args[0]),
                display_value(&args[1])
            ),
            span,
        ))
    }
}
