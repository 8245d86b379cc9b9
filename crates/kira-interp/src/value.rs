//! Runtime values.
//!
//! A tagged sum with cheap `Clone`: immediates are copied, composites
//! share their payload behind `Rc`. Records and arrays use interior
//! mutability because assignment targets include fields and indices;
//! sharing follows the session-arena model, where every value lives until
//! teardown.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use kira_common::span::Span;
use kira_parser::ast::StmtId;
use kira_resolver::symbol::UnitId;

use crate::error::{EvalResult, RuntimeError};
use crate::Interp;

/// Which program a block body belongs to: a resolved unit or the
/// embedded standard-library prelude.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramRef {
    Unit(UnitId),
    Prelude,
}

/// A native built-in function.
pub type NativeFn = fn(&mut Interp, &[Value], Span) -> EvalResult<Value>;

/// The body of a function value.
pub enum ClosureBody {
    /// A user function: statements in some program's arena.
    Block {
        program: ProgramRef,
        stmts: Vec<StmtId>,
    },
    /// A native built-in.
    Native(NativeFn),
    /// A variant constructor: calling it builds the variant value.
    Ctor {
        type_name: Rc<str>,
        variant: Rc<str>,
        arity: usize,
        /// Field names for record-payload variants, in declaration order.
        record_fields: Option<Vec<Rc<str>>>,
    },
}

impl fmt::Debug for ClosureBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClosureBody::Block { .. } => write!(f, "<block>"),
            ClosureBody::Native(_) => write!(f, "<native>"),
            ClosureBody::Ctor { variant, .. } => write!(f, "<ctor {variant}>"),
        }
    }
}

/// A function value: parameters, body, captured environment.
#[derive(Debug)]
pub struct Closure {
    pub name: Option<Rc<str>>,
    pub params: Vec<Rc<str>>,
    pub body: ClosureBody,
    /// The environment the closure was created in. Environments are
    /// arena-allocated per session, so the capture is valid for the
    /// closure's whole lifetime.
    pub env: Option<crate::env::EnvId>,
    pub effect: bool,
}

/// The payload of a variant value.
#[derive(Debug, Clone)]
pub enum VariantPayloadValue {
    Tuple(Vec<Value>),
    Record(Vec<(Rc<str>, Value)>),
}

/// A sum-type value: variant name plus optional payload. `type_name`
/// carries the owning type for `type_of` and method dispatch.
#[derive(Debug)]
pub struct VariantValue {
    pub type_name: Rc<str>,
    pub name: Rc<str>,
    pub payload: Option<VariantPayloadValue>,
}

/// A record value: optional nominal type plus ordered fields.
#[derive(Debug)]
pub struct RecordValue {
    pub type_name: Option<Rc<str>>,
    pub fields: RefCell<Vec<(Rc<str>, Value)>>,
}

impl RecordValue {
    pub fn get(&self, name: &str) -> Option<Value> {
        self.fields
            .borrow()
            .iter()
            .find(|(n, _)| n.as_ref() == name)
            .map(|(_, v)| v.clone())
    }

    pub fn set(&self, name: &str, value: Value) -> bool {
        let mut fields = self.fields.borrow_mut();
        match fields.iter_mut().find(|(n, _)| n.as_ref() == name) {
            Some((_, slot)) => {
                *slot = value;
                true
            }
            None => false,
        }
    }
}

/// A range sentinel, consumed by `for` loops and `in` tests.
#[derive(Debug, Clone)]
pub struct RangeValue {
    pub start: Value,
    pub end: Option<Value>,
    pub inclusive: bool,
}

/// A Kira runtime value.
#[derive(Debug, Clone)]
pub enum Value {
    Int(i128),
    Float(f64),
    Str(Rc<str>),
    Char(char),
    Bool(bool),
    Void,
    Tuple(Rc<Vec<Value>>),
    Array(Rc<RefCell<Vec<Value>>>),
    Record(Rc<RecordValue>),
    Closure(Rc<Closure>),
    Variant(Rc<VariantValue>),
    Io(Rc<Value>),
    /// A mutable reference cell (string builders and similar).
    Ref(Rc<RefCell<Value>>),
    /// An insertion-ordered association map behind a shared cell.
    Map(Rc<RefCell<Vec<(Value, Value)>>>),
    Range(Rc<RangeValue>),
}

impl Value {
    pub fn str(s: impl AsRef<str>) -> Value {
        Value::Str(Rc::from(s.as_ref()))
    }

    pub fn array(values: Vec<Value>) -> Value {
        Value::Array(Rc::new(RefCell::new(values)))
    }

    pub fn tuple(values: Vec<Value>) -> Value {
        Value::Tuple(Rc::new(values))
    }

    pub fn variant(type_name: &str, name: &str, payload: Option<VariantPayloadValue>) -> Value {
        Value::Variant(Rc::new(VariantValue {
            type_name: Rc::from(type_name),
            name: Rc::from(name),
            payload,
        }))
    }

    pub fn some(value: Value) -> Value {
        Value::variant("Option", "Some", Some(VariantPayloadValue::Tuple(vec![value])))
    }

    pub fn none() -> Value {
        Value::variant("Option", "None", None)
    }

    pub fn ok(value: Value) -> Value {
        Value::variant("Result", "Ok", Some(VariantPayloadValue::Tuple(vec![value])))
    }

    pub fn err(value: Value) -> Value {
        Value::variant("Result", "Err", Some(VariantPayloadValue::Tuple(vec![value])))
    }

    pub fn cons(head: Value, tail: Value) -> Value {
        Value::variant(
            "List",
            "Cons",
            Some(VariantPayloadValue::Tuple(vec![head, tail])),
        )
    }

    pub fn nil() -> Value {
        Value::variant("List", "Nil", None)
    }

    pub fn bool_value(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Whether this is a variant with the given name.
    pub fn is_variant(&self, name: &str) -> bool {
        matches!(self, Value::Variant(v) if v.name.as_ref() == name)
    }

    /// The single payload element of `Some`/`Ok`/`Err`, if this is one.
    pub fn unwrap_payload(&self) -> Option<Value> {
        match self {
            Value::Variant(v) => match &v.payload {
                Some(VariantPayloadValue::Tuple(items)) if items.len() == 1 => {
                    Some(items[0].clone())
                }
                _ => None,
            },
            _ => None,
        }
    }

    /// The runtime type name, as reported by `type_of`.
    pub fn type_name(&self) -> String {
        match self {
            Value::Int(_) => "int".to_string(),
            Value::Float(_) => "float".to_string(),
            Value::Str(_) => "string".to_string(),
            Value::Char(_) => "char".to_string(),
            Value::Bool(_) => "bool".to_string(),
            Value::Void => "void".to_string(),
            Value::Tuple(_) => "tuple".to_string(),
            Value::Array(_) => "array".to_string(),
            Value::Record(r) => match &r.type_name {
                Some(name) => name.to_string(),
                None => "record".to_string(),
            },
            Value::Closure(_) => "function".to_string(),
            Value::Variant(v) => v.type_name.to_string(),
            Value::Io(_) => "IO".to_string(),
            Value::Ref(_) => "ref".to_string(),
            Value::Map(_) => "map".to_string(),
            Value::Range(_) => "range".to_string(),
        }
    }
}

/// Structural equality. Functions compare by identity; cells compare by
/// contents.
pub fn value_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Int(a), Value::Int(b)) => a == b,
        (Value::Float(a), Value::Float(b)) => a == b,
        (Value::Str(a), Value::Str(b)) => a == b,
        (Value::Char(a), Value::Char(b)) => a == b,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Void, Value::Void) => true,
        (Value::Tuple(a), Value::Tuple(b)) => {
            a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| value_eq(x, y))
        }
        (Value::Array(a), Value::Array(b)) => {
            let a = a.borrow();
            let b = b.borrow();
            a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| value_eq(x, y))
        }
        (Value::Record(a), Value::Record(b)) => {
            let fa = a.fields.borrow();
            let fb = b.fields.borrow();
            a.type_name == b.type_name
                && fa.len() == fb.len()
                && fa
                    .iter()
                    .zip(fb.iter())
                    .all(|((na, va), (nb, vb))| na == nb && value_eq(va, vb))
        }
        (Value::Variant(a), Value::Variant(b)) => {
            if a.name != b.name {
                return false;
            }
            match (&a.payload, &b.payload) {
                (None, None) => true,
                (
                    Some(VariantPayloadValue::Tuple(xa)),
                    Some(VariantPayloadValue::Tuple(xb)),
                ) => xa.len() == xb.len() && xa.iter().zip(xb).all(|(x, y)| value_eq(x, y)),
                (
                    Some(VariantPayloadValue::Record(fa)),
                    Some(VariantPayloadValue::Record(fb)),
                ) => {
                    fa.len() == fb.len()
                        && fa
                            .iter()
                            .zip(fb)
                            .all(|((na, va), (nb, vb))| na == nb && value_eq(va, vb))
                }
                _ => false,
            }
        }
        (Value::Closure(a), Value::Closure(b)) => Rc::ptr_eq(a, b),
        (Value::Io(a), Value::Io(b)) => value_eq(a, b),
        (Value::Ref(a), Value::Ref(b)) => value_eq(&a.borrow(), &b.borrow()),
        (Value::Map(a), Value::Map(b)) => {
            let a = a.borrow();
            let b = b.borrow();
            a.len() == b.len()
                && a.iter()
                    .zip(b.iter())
                    .all(|((ka, va), (kb, vb))| value_eq(ka, kb) && value_eq(va, vb))
        }
        _ => false,
    }
}

/// Render a value the way `to_string`, `print`, and string interpolation
/// do.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Int(v) => v.to_string(),
        Value::Float(v) => {
            if v.fract() == 0.0 && v.is_finite() {
                format!("{v:.1}")
            } else {
                v.to_string()
            }
        }
        Value::Str(s) => s.to_string(),
        Value::Char(c) => c.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Void => "void".to_string(),
        Value::Tuple(items) => {
            let rendered: Vec<String> = items.iter().map(display_value).collect();
            format!("({})", rendered.join(", "))
        }
        Value::Array(items) => {
            let rendered: Vec<String> = items.borrow().iter().map(display_value).collect();
            format!("[{}]", rendered.join(", "))
        }
        Value::Record(record) => {
            let fields = record.fields.borrow();
            let rendered: Vec<String> = fields
                .iter()
                .map(|(name, value)| format!("{name}: {}", display_value(value)))
                .collect();
            match &record.type_name {
                Some(type_name) => format!("{type_name} {{ {} }}", rendered.join(", ")),
                None => format!("{{ {} }}", rendered.join(", ")),
            }
        }
        Value::Closure(closure) => match &closure.name {
            Some(name) => format!("<fn {name}>"),
            None => "<fn>".to_string(),
        },
        Value::Variant(variant) => match &variant.payload {
            None => variant.name.to_string(),
            Some(VariantPayloadValue::Tuple(items)) => {
                let rendered: Vec<String> = items.iter().map(display_value).collect();
                format!("{}({})", variant.name, rendered.join(", "))
            }
            Some(VariantPayloadValue::Record(fields)) => {
                let rendered: Vec<String> = fields
                    .iter()
                    .map(|(name, value)| format!("{name}: {}", display_value(value)))
                    .collect();
                format!("{} {{ {} }}", variant.name, rendered.join(", "))
            }
        },
        Value::Io(inner) => format!("IO({})", display_value(inner)),
        Value::Ref(inner) => display_value(&inner.borrow()),
        Value::Map(entries) => {
            let rendered: Vec<String> = entries
                .borrow()
                .iter()
                .map(|(k, v)| format!("{}: {}", display_value(k), display_value(v)))
                .collect();
            format!("{{{}}}", rendered.join(", "))
        }
        Value::Range(range) => {
            let op = if range.inclusive { "..=" } else { ".." };
            let end = range
                .end
                .as_ref()
                .map(|e| display_value(e))
                .unwrap_or_default();
            format!("{}{op}{end}", display_value(&range.start))
        }
    }
}

/// A runtime type-mismatch error with a consistent message shape.
pub fn type_mismatch(expected: &str, found: &Value, span: Span) -> RuntimeError {
    RuntimeError::new(
        crate::error::RuntimeErrorKind::TypeMismatch,
        format!("expected {expected}, found {}", found.type_name()),
        span,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use kira_common::span::{Location, Span};

    fn span() -> Span {
        Span::point(Location::start())
    }

    #[test]
    fn structural_equality() {
        assert!(value_eq(&Value::Int(3), &Value::Int(3)));
        assert!(!value_eq(&Value::Int(3), &Value::Int(4)));
        assert!(!value_eq(&Value::Int(3), &Value::Float(3.0)));
        assert!(value_eq(
            &Value::tuple(vec![Value::Int(1), Value::Bool(true)]),
            &Value::tuple(vec![Value::Int(1), Value::Bool(true)]),
        ));
        assert!(value_eq(&Value::some(Value::Int(1)), &Value::some(Value::Int(1))));
        assert!(!value_eq(&Value::some(Value::Int(1)), &Value::none()));
    }

    #[test]
    fn type_names() {
        assert_eq!(Value::Int(1).type_name(), "int");
        assert_eq!(Value::some(Value::Int(1)).type_name(), "Option");
        assert_eq!(Value::nil().type_name(), "List");
        let record = Value::Record(Rc::new(RecordValue {
            type_name: Some(Rc::from("Point")),
            fields: RefCell::new(vec![]),
        }));
        assert_eq!(record.type_name(), "Point");
        let anonymous = Value::Record(Rc::new(RecordValue {
            type_name: None,
            fields: RefCell::new(vec![]),
        }));
        assert_eq!(anonymous.type_name(), "record");
    }

    #[test]
    fn display_forms() {
        assert_eq!(display_value(&Value::Int(42)), "42");
        assert_eq!(display_value(&Value::Float(1.0)), "1.0");
        assert_eq!(display_value(&Value::str("hi")), "hi");
        assert_eq!(
            display_value(&Value::tuple(vec![Value::Int(1), Value::Int(2)])),
            "(1, 2)"
        );
        assert_eq!(display_value(&Value::some(Value::Int(5))), "Some(5)");
        assert_eq!(display_value(&Value::nil()), "Nil");
        let _ = type_mismatch("int", &Value::Bool(true), span());
    }
}
