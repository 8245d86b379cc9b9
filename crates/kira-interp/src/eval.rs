//! Expression and statement evaluation, pattern matching, calls, and the
//! tail-call trampoline.

use std::rc::Rc;

use kira_common::span::Span;
use kira_parser::ast::{
    ArmBody, BinaryOp, ElseBranch, ExprId, ExprKind, InterpPart, MatchArm, PatId, PatLit,
    PatternKind, PrimType, RangeBound, StmtId, StmtKind, TypeKind, UnaryOp,
};

use crate::env::{AssignError, EnvId};
use crate::error::{Abort, EvalResult, RuntimeError, RuntimeErrorKind};
use crate::value::{
    display_value, type_mismatch, value_eq, Closure, ClosureBody, ProgramRef, RangeValue,
    RecordValue, Value, VariantPayloadValue,
};
use crate::Interp;

/// How a statement finished.
pub(crate) enum Flow {
    Normal,
    Return(Value),
    Break {
        label: Option<String>,
        value: Option<Value>,
    },
    /// A `return f(...)`: the callee and arguments are already evaluated;
    /// the call loop rebinds its frame instead of growing the stack.
    TailCall {
        callee: Value,
        args: Vec<Value>,
    },
}

fn err(kind: RuntimeErrorKind, message: impl Into<String>, span: Span) -> Abort {
    Abort::Error(RuntimeError::new(kind, message, span))
}

impl<'r> Interp<'r> {
    // ── Statements ─────────────────────────────────────────────────────

    pub(crate) fn exec_block(
        &mut self,
        program: ProgramRef,
        env: EnvId,
        stmts: &[StmtId],
    ) -> EvalResult<Flow> {
        for stmt in stmts {
            match self.exec_stmt(program, env, *stmt)? {
                Flow::Normal => {}
                other => return Ok(other),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_stmt(&mut self, program: ProgramRef, env: EnvId, stmt_id: StmtId) -> EvalResult<Flow> {
        let stmt = self.node_stmt(program, stmt_id);
        match stmt.kind {
            StmtKind::Let { pattern, init, .. } => {
                let value = self.eval_expr(program, env, init)?;
                self.bind_pattern(program, env, pattern, &value)?;
                Ok(Flow::Normal)
            }
            StmtKind::Var { name, init, .. } => {
                let value = match init {
                    Some(init) => self.eval_expr(program, env, init)?,
                    None => Value::Void,
                };
                self.envs.define(env, &name, value, true);
                Ok(Flow::Normal)
            }
            StmtKind::Assign { target, value } => {
                let new_value = self.eval_expr(program, env, value)?;
                self.assign(program, env, target, new_value)?;
                Ok(Flow::Normal)
            }
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                let cond_span = self.node_expr(program, cond).span;
                let condition = self.eval_expr(program, env, cond)?;
                let Some(condition) = condition.bool_value() else {
                    return Err(Abort::Error(type_mismatch("bool", &condition, cond_span)));
                };
                if condition {
                    let branch_env = self.envs.push(Some(env));
                    self.exec_block(program, branch_env, &then_branch)
                } else {
                    match else_branch {
                        None => Ok(Flow::Normal),
                        Some(ElseBranch::Block(stmts)) => {
                            let branch_env = self.envs.push(Some(env));
                            self.exec_block(program, branch_env, &stmts)
                        }
                        Some(ElseBranch::If(nested)) => self.exec_stmt(program, env, nested),
                    }
                }
            }
            StmtKind::For {
                label,
                pattern,
                iterable,
                body,
            } => {
                let iterable_span = self.node_expr(program, iterable).span;
                let subject = self.eval_expr(program, env, iterable)?;
                let items = self.iter_items(&subject, iterable_span)?;
                for item in items {
                    let iter_env = self.envs.push(Some(env));
                    self.bind_pattern(program, iter_env, pattern, &item)?;
                    match self.exec_block(program, iter_env, &body)? {
                        Flow::Normal => {}
                        Flow::Break {
                            label: break_label, ..
                        } if break_matches(&label, &break_label) => {
                            return Ok(Flow::Normal);
                        }
                        other => return Ok(other),
                    }
                }
                Ok(Flow::Normal)
            }
            StmtKind::While { label, cond, body } => {
                loop {
                    let cond_span = self.node_expr(program, cond).span;
                    let condition = self.eval_expr(program, env, cond)?;
                    let Some(condition) = condition.bool_value() else {
                        return Err(Abort::Error(type_mismatch("bool", &condition, cond_span)));
                    };
                    if !condition {
                        return Ok(Flow::Normal);
                    }
                    let body_env = self.envs.push(Some(env));
                    match self.exec_block(program, body_env, &body)? {
                        Flow::Normal => {}
                        Flow::Break {
                            label: break_label, ..
                        } if break_matches(&label, &break_label) => {
                            return Ok(Flow::Normal);
                        }
                        other => return Ok(other),
                    }
                }
            }
            StmtKind::Loop { label, body } => loop {
                let body_env = self.envs.push(Some(env));
                match self.exec_block(program, body_env, &body)? {
                    Flow::Normal => {}
                    Flow::Break {
                        label: break_label, ..
                    } if break_matches(&label, &break_label) => {
                        return Ok(Flow::Normal);
                    }
                    other => return Ok(other),
                }
            },
            StmtKind::Match { subject, arms } => {
                let subject_span = self.node_expr(program, subject).span;
                let value = self.eval_expr(program, env, subject)?;
                let outcome = self.eval_match(program, env, &value, &arms, subject_span)?;
                match outcome {
                    MatchOutcome::Flow(flow) => Ok(flow),
                    MatchOutcome::Value(_) => Ok(Flow::Normal),
                }
            }
            StmtKind::Return { value } => match value {
                None => Ok(Flow::Return(Value::Void)),
                Some(value_id) => {
                    // Tail form: `return f(args)` transfers to the callee
                    // without a new stack frame.
                    match self.tail_call_parts(program, env, value_id)? {
                        TailDisposition::Transfer { callee, args } => {
                            Ok(Flow::TailCall { callee, args })
                        }
                        TailDisposition::Done(value) => Ok(Flow::Return(value)),
                        TailDisposition::Not => {
                            let value = self.eval_expr(program, env, value_id)?;
                            Ok(Flow::Return(value))
                        }
                    }
                }
            },
            StmtKind::Break { label, value } => {
                let value = match value {
                    Some(value) => Some(self.eval_expr(program, env, value)?),
                    None => None,
                };
                Ok(Flow::Break { label, value })
            }
            StmtKind::Expr(expr) => {
                self.eval_expr(program, env, expr)?;
                Ok(Flow::Normal)
            }
            StmtKind::Block(stmts) => {
                let block_env = self.envs.push(Some(env));
                self.exec_block(program, block_env, &stmts)
            }
        }
    }

    /// If the returned expression is a direct call, evaluate callee and
    /// arguments and hand them to the trampoline.
    fn tail_call_parts(
        &mut self,
        program: ProgramRef,
        env: EnvId,
        expr_id: ExprId,
    ) -> EvalResult<TailDisposition> {
        let mut current = expr_id;
        loop {
            let expr = self.node_expr(program, current);
            match expr.kind {
                ExprKind::Group(inner) => current = inner,
                ExprKind::Call { callee, args, .. } => {
                    let callee_value = self.eval_expr(program, env, callee)?;
                    let mut arg_values = Vec::with_capacity(args.len());
                    for arg in &args {
                        arg_values.push(self.eval_expr(program, env, *arg)?);
                    }
                    // Native and constructor calls gain nothing from the
                    // trampoline; finish them in place.
                    if !matches!(
                        &callee_value,
                        Value::Closure(c) if matches!(c.body, ClosureBody::Block { .. })
                    ) {
                        let result = self.call_value(callee_value, arg_values, expr.span)?;
                        return Ok(TailDisposition::Done(result));
                    }
                    return Ok(TailDisposition::Transfer {
                        callee: callee_value,
                        args: arg_values,
                    });
                }
                _ => return Ok(TailDisposition::Not),
            }
        }
    }

    fn assign(
        &mut self,
        program: ProgramRef,
        env: EnvId,
        target: ExprId,
        value: Value,
    ) -> EvalResult<()> {
        let target_expr = self.node_expr(program, target);
        match target_expr.kind {
            ExprKind::Ident { name, .. } => {
                match self.envs.assign(env, &name, value) {
                    Ok(()) => Ok(()),
                    Err(AssignError::Immutable) => Err(err(
                        RuntimeErrorKind::ImmutableAssignment,
                        format!("cannot assign to immutable binding `{name}`"),
                        target_expr.span,
                    )),
                    Err(AssignError::NotFound) => Err(err(
                        RuntimeErrorKind::UndefinedVariable,
                        format!("undefined variable `{name}`"),
                        target_expr.span,
                    )),
                }
            }
            ExprKind::Field { base, name } => {
                let base_value = self.eval_expr(program, env, base)?;
                match &base_value {
                    Value::Record(record) => {
                        if record.set(&name, value) {
                            Ok(())
                        } else {
                            Err(err(
                                RuntimeErrorKind::FieldNotFound,
                                format!("no field `{name}`"),
                                target_expr.span,
                            ))
                        }
                    }
                    other => Err(Abort::Error(type_mismatch(
                        "record",
                        other,
                        target_expr.span,
                    ))),
                }
            }
            ExprKind::Index { base, index } => {
                let base_value = self.eval_expr(program, env, base)?;
                let index_value = self.eval_expr(program, env, index)?;
                let Value::Int(i) = index_value else {
                    return Err(Abort::Error(type_mismatch(
                        "int",
                        &index_value,
                        target_expr.span,
                    )));
                };
                match &base_value {
                    Value::Array(items) => {
                        let mut items = items.borrow_mut();
                        let len = items.len();
                        let slot = usize::try_from(i)
                            .ok()
                            .filter(|i| *i < len)
                            .ok_or_else(|| {
                                err(
                                    RuntimeErrorKind::IndexOutOfBounds,
                                    format!("index {i} out of bounds for length {len}"),
                                    target_expr.span,
                                )
                            })?;
                        items[slot] = value;
                        Ok(())
                    }
                    other => Err(Abort::Error(type_mismatch(
                        "array",
                        other,
                        target_expr.span,
                    ))),
                }
            }
            _ => Err(err(
                RuntimeErrorKind::InvalidOperation,
                "invalid assignment target",
                target_expr.span,
            )),
        }
    }

    // ── Expressions ────────────────────────────────────────────────────

    pub(crate) fn eval_expr(
        &mut self,
        program: ProgramRef,
        env: EnvId,
        expr_id: ExprId,
    ) -> EvalResult<Value> {
        let expr = self.node_expr(program, expr_id);
        let span = expr.span;
        match expr.kind {
            ExprKind::Int { value, .. } => Ok(Value::Int(value)),
            ExprKind::Float { value, .. } => Ok(Value::Float(value)),
            ExprKind::Str(value) => Ok(Value::str(value)),
            ExprKind::Char(value) => Ok(Value::Char(value)),
            ExprKind::Bool(value) => Ok(Value::Bool(value)),
            ExprKind::Ident { name, .. } => self.envs.lookup(env, &name).ok_or_else(|| {
                err(
                    RuntimeErrorKind::UndefinedVariable,
                    format!("undefined variable `{name}`"),
                    span,
                )
            }),
            ExprKind::SelfRef => self.envs.lookup(env, "self").ok_or_else(|| {
                err(
                    RuntimeErrorKind::UndefinedVariable,
                    "`self` is not bound here",
                    span,
                )
            }),
            ExprKind::Binary { op, lhs, rhs } => {
                let result = self.eval_binary(program, env, op, lhs, rhs, span)?;
                self.check_int_width(program, expr_id, &result, span)?;
                Ok(result)
            }
            ExprKind::Unary { op, operand } => {
                let value = self.eval_expr(program, env, operand)?;
                let result = match (op, value) {
                    (UnaryOp::Neg, Value::Int(v)) => v
                        .checked_neg()
                        .map(Value::Int)
                        .ok_or_else(|| err(RuntimeErrorKind::Overflow, "integer overflow", span)),
                    (UnaryOp::Neg, Value::Float(v)) => Ok(Value::Float(-v)),
                    (UnaryOp::Not, Value::Bool(v)) => Ok(Value::Bool(!v)),
                    (UnaryOp::Neg, other) => {
                        Err(Abort::Error(type_mismatch("number", &other, span)))
                    }
                    (UnaryOp::Not, other) => {
                        Err(Abort::Error(type_mismatch("bool", &other, span)))
                    }
                }?;
                self.check_int_width(program, expr_id, &result, span)?;
                Ok(result)
            }
            ExprKind::Field { base, name } => {
                let base_value = self.eval_expr(program, env, base)?;
                self.field_access(&base_value, &name, span)
            }
            ExprKind::Index { base, index } => {
                let base_value = self.eval_expr(program, env, base)?;
                let index_value = self.eval_expr(program, env, index)?;
                self.index_access(&base_value, &index_value, span)
            }
            ExprKind::TupleField { base, index } => {
                let base_value = self.eval_expr(program, env, base)?;
                match &base_value {
                    Value::Tuple(items) => items.get(index as usize).cloned().ok_or_else(|| {
                        err(
                            RuntimeErrorKind::IndexOutOfBounds,
                            format!("tuple has {} elements, no `.{index}`", items.len()),
                            span,
                        )
                    }),
                    other => Err(Abort::Error(type_mismatch("tuple", other, span))),
                }
            }
            ExprKind::Call { callee, args, .. } => {
                let callee_value = self.eval_expr(program, env, callee)?;
                let mut arg_values = Vec::with_capacity(args.len());
                for arg in &args {
                    arg_values.push(self.eval_expr(program, env, *arg)?);
                }
                let result = self.call_value(callee_value, arg_values, span)?;
                self.check_int_width(program, expr_id, &result, span)?;
                Ok(result)
            }
            ExprKind::MethodCall {
                receiver,
                method,
                args,
                ..
            } => {
                let receiver_value = self.eval_expr(program, env, receiver)?;
                let mut arg_values = Vec::with_capacity(args.len());
                for arg in &args {
                    arg_values.push(self.eval_expr(program, env, *arg)?);
                }
                let result = self.call_method(receiver_value, &method, arg_values, span)?;
                self.check_int_width(program, expr_id, &result, span)?;
                Ok(result)
            }
            ExprKind::Closure {
                params,
                effect,
                body,
                ..
            } => Ok(Value::Closure(Rc::new(Closure {
                name: None,
                params: params.iter().map(|p| Rc::from(p.name.as_str())).collect(),
                body: ClosureBody::Block {
                    program,
                    stmts: body,
                },
                env: Some(env),
                effect,
            }))),
            ExprKind::Match { subject, arms } => {
                let subject_span = self.node_expr(program, subject).span;
                let value = self.eval_expr(program, env, subject)?;
                match self.eval_match(program, env, &value, &arms, subject_span)? {
                    MatchOutcome::Value(value) => Ok(value),
                    // `return` inside an arm block leaves the enclosing
                    // function, like `?` does. A tail-form `return f(...)`
                    // finishes the call here and propagates its result.
                    MatchOutcome::Flow(Flow::Return(value)) => Err(Abort::Propagate(value)),
                    MatchOutcome::Flow(Flow::TailCall { callee, args }) => {
                        let result = self.call_value(callee, args, span)?;
                        Err(Abort::Propagate(result))
                    }
                    MatchOutcome::Flow(Flow::Normal) => Ok(Value::Void),
                    MatchOutcome::Flow(Flow::Break { .. }) => Err(err(
                        RuntimeErrorKind::InvalidOperation,
                        "cannot break out of a match expression arm",
                        span,
                    )),
                }
            }
            ExprKind::Tuple(elements) => {
                let mut items = Vec::with_capacity(elements.len());
                for element in &elements {
                    items.push(self.eval_expr(program, env, *element)?);
                }
                Ok(Value::tuple(items))
            }
            ExprKind::Array(elements) => {
                let mut items = Vec::with_capacity(elements.len());
                for element in &elements {
                    items.push(self.eval_expr(program, env, *element)?);
                }
                Ok(Value::array(items))
            }
            ExprKind::Record { ty, fields } => {
                let mut values = Vec::with_capacity(fields.len());
                for (name, value) in &fields {
                    values.push((Rc::from(name.as_str()), self.eval_expr(program, env, *value)?));
                }
                self.build_record(program, env, ty, values, span)
            }
            ExprKind::Variant { name, args } => {
                let ctor = self.envs.lookup(env, &name).ok_or_else(|| {
                    err(
                        RuntimeErrorKind::UndefinedVariable,
                        format!("undefined constructor `{name}`"),
                        span,
                    )
                })?;
                let args = args.unwrap_or_default();
                let mut arg_values = Vec::with_capacity(args.len());
                for arg in &args {
                    arg_values.push(self.eval_expr(program, env, *arg)?);
                }
                self.call_value(ctor, arg_values, span)
            }
            ExprKind::Cast { expr, ty } => {
                let value = self.eval_expr(program, env, expr)?;
                let target = self.node_type(program, ty);
                Ok(match (&value, &target.kind) {
                    (Value::Int(v), TypeKind::Prim(p)) if p.is_float() => Value::Float(*v as f64),
                    (Value::Float(v), TypeKind::Prim(p)) if p.is_integer() => {
                        Value::Int(truncate_int(*v as i128, *p))
                    }
                    // An explicit cast narrows by two's-complement
                    // truncation, like `as` between integer widths.
                    (Value::Int(v), TypeKind::Prim(p)) if p.is_integer() => {
                        Value::Int(truncate_int(*v, *p))
                    }
                    _ => value,
                })
            }
            ExprKind::Range {
                start,
                end,
                inclusive,
            } => {
                let start_value = match start {
                    Some(start) => self.eval_expr(program, env, start)?,
                    None => Value::Int(0),
                };
                let end_value = match end {
                    Some(end) => Some(self.eval_expr(program, env, end)?),
                    None => None,
                };
                Ok(Value::Range(Rc::new(RangeValue {
                    start: start_value,
                    end: end_value,
                    inclusive,
                })))
            }
            ExprKind::Group(inner) => self.eval_expr(program, env, inner),
            ExprKind::Interpolated(parts) => {
                let mut rendered = String::new();
                for part in &parts {
                    match part {
                        InterpPart::Lit(text) => rendered.push_str(text),
                        InterpPart::Expr(expr) => {
                            let value = self.eval_expr(program, env, *expr)?;
                            rendered.push_str(&display_value(&value));
                        }
                    }
                }
                Ok(Value::str(rendered))
            }
            ExprKind::Try(inner) => {
                let value = self.eval_expr(program, env, inner)?;
                match &value {
                    Value::Variant(v) if v.name.as_ref() == "Some" || v.name.as_ref() == "Ok" => {
                        value.unwrap_payload().ok_or_else(|| {
                            err(RuntimeErrorKind::InvalidOperation, "malformed variant", span)
                        })
                    }
                    Value::Variant(v) if v.name.as_ref() == "None" || v.name.as_ref() == "Err" => {
                        Err(Abort::Propagate(value.clone()))
                    }
                    other => Err(Abort::Error(type_mismatch(
                        "Option or Result",
                        other,
                        span,
                    ))),
                }
            }
            ExprKind::Coalesce { value, default } => {
                let subject = self.eval_expr(program, env, value)?;
                match &subject {
                    Value::Variant(v) if v.name.as_ref() == "Some" || v.name.as_ref() == "Ok" => {
                        subject.unwrap_payload().ok_or_else(|| {
                            err(RuntimeErrorKind::InvalidOperation, "malformed variant", span)
                        })
                    }
                    Value::Variant(v) if v.name.as_ref() == "None" || v.name.as_ref() == "Err" => {
                        self.eval_expr(program, env, default)
                    }
                    other => Err(Abort::Error(type_mismatch(
                        "Option or Result",
                        other,
                        span,
                    ))),
                }
            }
        }
    }

    /// Build a record literal; a type name that resolves to a variant
    /// constructor builds that variant's record payload instead.
    fn build_record(
        &mut self,
        program: ProgramRef,
        env: EnvId,
        ty: Option<kira_parser::ast::TypeId>,
        mut values: Vec<(Rc<str>, Value)>,
        span: Span,
    ) -> EvalResult<Value> {
        let type_name: Option<String> = ty.and_then(|ty| {
            let ty = self.node_type(program, ty);
            match ty.kind {
                TypeKind::Named(name) => Some(name),
                TypeKind::Generic { base, .. } => Some(base),
                TypeKind::Path { segments, .. } => segments.last().cloned(),
                _ => None,
            }
        });

        if let Some(name) = &type_name {
            if let Some(Value::Closure(closure)) = self.envs.lookup(env, name) {
                if let ClosureBody::Ctor {
                    type_name: owner,
                    variant,
                    record_fields: Some(field_names),
                    ..
                } = &closure.body
                {
                    // Order payload fields by declaration order.
                    let mut ordered = Vec::with_capacity(field_names.len());
                    for field_name in field_names {
                        let position = values
                            .iter()
                            .position(|(n, _)| n == field_name)
                            .ok_or_else(|| {
                                err(
                                    RuntimeErrorKind::FieldNotFound,
                                    format!("missing field `{field_name}`"),
                                    span,
                                )
                            })?;
                        let (name, value) = values.remove(position);
                        ordered.push((name, value));
                    }
                    return Ok(Value::variant(
                        owner,
                        variant,
                        Some(VariantPayloadValue::Record(ordered)),
                    ));
                }
            }
        }

        Ok(Value::Record(Rc::new(RecordValue {
            type_name: type_name.map(|n| Rc::from(n.as_str())),
            fields: std::cell::RefCell::new(values),
        })))
    }

    fn eval_binary(
        &mut self,
        program: ProgramRef,
        env: EnvId,
        op: BinaryOp,
        lhs: ExprId,
        rhs: ExprId,
        span: Span,
    ) -> EvalResult<Value> {
        // Short-circuiting logical operators evaluate the right operand
        // only when needed.
        match op {
            BinaryOp::And => {
                let left = self.eval_expr(program, env, lhs)?;
                let Some(left) = left.bool_value() else {
                    return Err(Abort::Error(type_mismatch("bool", &left, span)));
                };
                if !left {
                    return Ok(Value::Bool(false));
                }
                let right = self.eval_expr(program, env, rhs)?;
                let Some(right) = right.bool_value() else {
                    return Err(Abort::Error(type_mismatch("bool", &right, span)));
                };
                return Ok(Value::Bool(right));
            }
            BinaryOp::Or => {
                let left = self.eval_expr(program, env, lhs)?;
                let Some(left) = left.bool_value() else {
                    return Err(Abort::Error(type_mismatch("bool", &left, span)));
                };
                if left {
                    return Ok(Value::Bool(true));
                }
                let right = self.eval_expr(program, env, rhs)?;
                let Some(right) = right.bool_value() else {
                    return Err(Abort::Error(type_mismatch("bool", &right, span)));
                };
                return Ok(Value::Bool(right));
            }
            BinaryOp::Is => {
                let left = self.eval_expr(program, env, lhs)?;
                // The right-hand side is a variant name, not a value.
                let rhs_expr = self.node_expr(program, rhs);
                let name = match rhs_expr.kind {
                    ExprKind::Ident { name, .. } => name,
                    ExprKind::Variant { name, .. } => name,
                    _ => {
                        return Err(err(
                            RuntimeErrorKind::InvalidOperation,
                            "`is` requires a variant name",
                            rhs_expr.span,
                        ))
                    }
                };
                return Ok(Value::Bool(left.is_variant(&name)));
            }
            _ => {}
        }

        let left = self.eval_expr(program, env, lhs)?;
        let right = self.eval_expr(program, env, rhs)?;
        match op {
            BinaryOp::Eq => Ok(Value::Bool(value_eq(&left, &right))),
            BinaryOp::NotEq => Ok(Value::Bool(!value_eq(&left, &right))),
            BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => {
                let ordering = compare_values(&left, &right).ok_or_else(|| {
                    err(
                        RuntimeErrorKind::TypeMismatch,
                        format!(
                            "cannot order {} against {}",
                            left.type_name(),
                            right.type_name()
                        ),
                        span,
                    )
                })?;
                Ok(Value::Bool(match op {
                    BinaryOp::Lt => ordering.is_lt(),
                    BinaryOp::LtEq => ordering.is_le(),
                    BinaryOp::Gt => ordering.is_gt(),
                    _ => ordering.is_ge(),
                }))
            }
            BinaryOp::In => self.eval_in(&left, &right, span),
            BinaryOp::Add => match (&left, &right) {
                (Value::Str(a), Value::Str(b)) => {
                    let mut s = a.to_string();
                    s.push_str(b);
                    Ok(Value::str(s))
                }
                _ => numeric_binop(op, &left, &right, span),
            },
            BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => {
                numeric_binop(op, &left, &right, span)
            }
            BinaryOp::And | BinaryOp::Or | BinaryOp::Is => unreachable!("handled above"),
        }
    }

    fn eval_in(&mut self, item: &Value, collection: &Value, span: Span) -> EvalResult<Value> {
        match collection {
            Value::Array(items) => Ok(Value::Bool(
                items.borrow().iter().any(|v| value_eq(v, item)),
            )),
            Value::Str(s) => match item {
                Value::Str(sub) => Ok(Value::Bool(s.contains(sub.as_ref()))),
                Value::Char(c) => Ok(Value::Bool(s.chars().any(|x| x == *c))),
                other => Err(Abort::Error(type_mismatch("string or char", other, span))),
            },
            Value::Variant(v) if v.type_name.as_ref() == "List" => {
                let mut current = collection.clone();
                loop {
                    match &current {
                        Value::Variant(v) if v.name.as_ref() == "Nil" => {
                            return Ok(Value::Bool(false))
                        }
                        Value::Variant(v) if v.name.as_ref() == "Cons" => {
                            let Some(VariantPayloadValue::Tuple(items)) = &v.payload else {
                                return Err(err(
                                    RuntimeErrorKind::InvalidOperation,
                                    "malformed list",
                                    span,
                                ));
                            };
                            if value_eq(&items[0], item) {
                                return Ok(Value::Bool(true));
                            }
                            let next = items[1].clone();
                            current = next;
                        }
                        other => {
                            return Err(Abort::Error(type_mismatch("list", other, span)));
                        }
                    }
                }
            }
            Value::Map(entries) => Ok(Value::Bool(
                entries.borrow().iter().any(|(k, _)| value_eq(k, item)),
            )),
            Value::Range(range) => {
                let in_range = match (&range.start, &range.end, item) {
                    (Value::Int(start), Some(Value::Int(end)), Value::Int(v)) => {
                        v >= start && if range.inclusive { v <= end } else { v < end }
                    }
                    (Value::Int(start), None, Value::Int(v)) => v >= start,
                    (Value::Char(start), Some(Value::Char(end)), Value::Char(v)) => {
                        v >= start && if range.inclusive { v <= end } else { v < end }
                    }
                    _ => false,
                };
                Ok(Value::Bool(in_range))
            }
            other => Err(Abort::Error(type_mismatch("collection", other, span))),
        }
    }

    pub(crate) fn field_access(&mut self, base: &Value, name: &str, span: Span) -> EvalResult<Value> {
        match base {
            Value::Record(record) => record.get(name).ok_or_else(|| {
                err(
                    RuntimeErrorKind::FieldNotFound,
                    format!("no field `{name}`"),
                    span,
                )
            }),
            Value::Variant(variant) => match &variant.payload {
                Some(VariantPayloadValue::Record(fields)) => fields
                    .iter()
                    .find(|(n, _)| n.as_ref() == name)
                    .map(|(_, v)| v.clone())
                    .ok_or_else(|| {
                        err(
                            RuntimeErrorKind::FieldNotFound,
                            format!("no field `{name}`"),
                            span,
                        )
                    }),
                _ => Err(err(
                    RuntimeErrorKind::FieldNotFound,
                    format!("no field `{name}`"),
                    span,
                )),
            },
            other => Err(Abort::Error(type_mismatch("record", other, span))),
        }
    }

    fn index_access(&mut self, base: &Value, index: &Value, span: Span) -> EvalResult<Value> {
        let Value::Int(i) = index else {
            return Err(Abort::Error(type_mismatch("int", index, span)));
        };
        match base {
            Value::Array(items) => {
                let items = items.borrow();
                usize::try_from(*i)
                    .ok()
                    .and_then(|i| items.get(i).cloned())
                    .ok_or_else(|| {
                        err(
                            RuntimeErrorKind::IndexOutOfBounds,
                            format!("index {i} out of bounds for length {}", items.len()),
                            span,
                        )
                    })
            }
            // Strings index by Unicode scalar, matching the user-level
            // string surface.
            Value::Str(s) => usize::try_from(*i)
                .ok()
                .and_then(|i| s.chars().nth(i))
                .map(Value::Char)
                .ok_or_else(|| {
                    err(
                        RuntimeErrorKind::IndexOutOfBounds,
                        format!("index {i} out of bounds for string"),
                        span,
                    )
                }),
            other => Err(Abort::Error(type_mismatch("array or string", other, span))),
        }
    }

    // ── Matching ───────────────────────────────────────────────────────

    fn eval_match(
        &mut self,
        program: ProgramRef,
        env: EnvId,
        subject: &Value,
        arms: &[MatchArm],
        subject_span: Span,
    ) -> EvalResult<MatchOutcome> {
        for arm in arms {
            let arm_env = self.envs.push(Some(env));
            if !self.match_pattern(program, arm_env, arm.pattern, subject)? {
                continue;
            }
            if let Some(guard) = arm.guard {
                let guard_span = self.node_expr(program, guard).span;
                let guard_value = self.eval_expr(program, arm_env, guard)?;
                let Some(guard_value) = guard_value.bool_value() else {
                    return Err(Abort::Error(type_mismatch("bool", &guard_value, guard_span)));
                };
                if !guard_value {
                    continue;
                }
            }
            return match &arm.body {
                ArmBody::Expr(expr) => {
                    let value = self.eval_expr(program, arm_env, *expr)?;
                    Ok(MatchOutcome::Value(value))
                }
                ArmBody::Block(stmts) => {
                    let flow = self.exec_block(program, arm_env, stmts)?;
                    Ok(MatchOutcome::Flow(flow))
                }
            };
        }
        Err(err(
            RuntimeErrorKind::MatchFailed,
            format!("no pattern matched {}", display_value(subject)),
            subject_span,
        ))
    }

    /// Irrefutable binding (`let`, `for`, parameters-by-pattern). A
    /// non-match here is a bug upstream and reported as such.
    pub(crate) fn bind_pattern(
        &mut self,
        program: ProgramRef,
        env: EnvId,
        pat: PatId,
        value: &Value,
    ) -> EvalResult<()> {
        let span = self.node_pat(program, pat).span;
        if self.match_pattern(program, env, pat, value)? {
            Ok(())
        } else {
            Err(err(
                RuntimeErrorKind::MatchFailed,
                format!("pattern does not match {}", display_value(value)),
                span,
            ))
        }
    }

    /// Structural, recursive pattern matching. Bindings land in `env`;
    /// callers use a fresh environment per attempt.
    pub(crate) fn match_pattern(
        &mut self,
        program: ProgramRef,
        env: EnvId,
        pat_id: PatId,
        value: &Value,
    ) -> EvalResult<bool> {
        let pat = self.node_pat(program, pat_id);
        match pat.kind {
            PatternKind::Wildcard | PatternKind::Rest => Ok(true),
            PatternKind::Ident { name, mutable } => {
                self.envs.define(env, &name, value.clone(), mutable);
                Ok(true)
            }
            PatternKind::Typed { pattern, .. } => {
                self.match_pattern(program, env, pattern, value)
            }
            PatternKind::Literal(lit) => Ok(match (&lit, value) {
                (PatLit::Int(a), Value::Int(b)) => a == b,
                (PatLit::Float(a), Value::Float(b)) => a == b,
                (PatLit::Str(a), Value::Str(b)) => a == b.as_ref(),
                (PatLit::Char(a), Value::Char(b)) => a == b,
                (PatLit::Bool(a), Value::Bool(b)) => a == b,
                _ => false,
            }),
            PatternKind::Constructor { name, args } => {
                let Value::Variant(variant) = value else {
                    return Ok(false);
                };
                if variant.name.as_ref() != name {
                    return Ok(false);
                }
                let Some(args) = args else {
                    return Ok(true);
                };
                let payload: Vec<Value> = match &variant.payload {
                    None => Vec::new(),
                    Some(VariantPayloadValue::Tuple(items)) => items.clone(),
                    Some(VariantPayloadValue::Record(fields)) => {
                        fields.iter().map(|(_, v)| v.clone()).collect()
                    }
                };
                if payload.len() != args.len() {
                    return Ok(false);
                }
                for (sub, item) in args.iter().zip(&payload) {
                    if !self.match_pattern(program, env, *sub, item)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            PatternKind::Record {
                type_name,
                fields,
                rest,
            } => match value {
                Value::Record(record) => {
                    if let Some(expected) = &type_name {
                        match &record.type_name {
                            Some(actual) if actual.as_ref() == expected => {}
                            None => {}
                            _ => return Ok(false),
                        }
                    }
                    let record_fields = record.fields.borrow().clone();
                    if !rest && record_fields.len() != fields.len() {
                        return Ok(false);
                    }
                    for (name, sub) in &fields {
                        let Some((_, field_value)) =
                            record_fields.iter().find(|(n, _)| n.as_ref() == name.as_str())
                        else {
                            return Ok(false);
                        };
                        let field_value = field_value.clone();
                        if !self.match_pattern(program, env, *sub, &field_value)? {
                            return Ok(false);
                        }
                    }
                    Ok(true)
                }
                Value::Variant(variant) => {
                    if let Some(expected) = &type_name {
                        if variant.name.as_ref() != expected {
                            return Ok(false);
                        }
                    }
                    let Some(VariantPayloadValue::Record(payload)) = &variant.payload else {
                        return Ok(false);
                    };
                    let payload = payload.clone();
                    if !rest && payload.len() != fields.len() {
                        return Ok(false);
                    }
                    for (name, sub) in &fields {
                        let Some((_, field_value)) =
                            payload.iter().find(|(n, _)| n.as_ref() == name.as_str())
                        else {
                            return Ok(false);
                        };
                        let field_value = field_value.clone();
                        if !self.match_pattern(program, env, *sub, &field_value)? {
                            return Ok(false);
                        }
                    }
                    Ok(true)
                }
                _ => Ok(false),
            },
            PatternKind::Tuple(elements) => {
                let Value::Tuple(items) = value else {
                    return Ok(false);
                };
                if items.len() != elements.len() {
                    return Ok(false);
                }
                let items = items.as_ref().clone();
                for (sub, item) in elements.iter().zip(&items) {
                    if !self.match_pattern(program, env, *sub, item)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            PatternKind::Or(alternatives) => {
                for alternative in &alternatives {
                    if self.match_pattern(program, env, *alternative, value)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            PatternKind::Range {
                start,
                end,
                inclusive,
            } => Ok(match (start, end, value) {
                (RangeBound::Int(a), RangeBound::Int(b), Value::Int(v)) => {
                    *v >= a && if inclusive { *v <= b } else { *v < b }
                }
                (RangeBound::Char(a), RangeBound::Char(b), Value::Char(v)) => {
                    *v >= a && if inclusive { *v <= b } else { *v < b }
                }
                _ => false,
            }),
        }
    }

    // ── Calls ──────────────────────────────────────────────────────────

    /// Call a function value. Tail transfers rebind the frame inside the
    /// loop, so self- and mutual recursion in tail position run in
    /// constant stack.
    pub(crate) fn call_value(
        &mut self,
        callee: Value,
        args: Vec<Value>,
        span: Span,
    ) -> EvalResult<Value> {
        self.enter_call(span)?;
        let result = self.call_loop(callee, args, span);
        self.leave_call();
        result
    }

    fn call_loop(&mut self, mut callee: Value, mut args: Vec<Value>, span: Span) -> EvalResult<Value> {
        loop {
            let Value::Closure(closure) = &callee else {
                return Err(err(
                    RuntimeErrorKind::NotCallable,
                    format!("{} is not callable", callee.type_name()),
                    span,
                ));
            };
            let closure = closure.clone();
            match &closure.body {
                ClosureBody::Native(native) => return native(self, &args, span),
                ClosureBody::Ctor {
                    type_name,
                    variant,
                    arity,
                    record_fields,
                } => {
                    if args.len() != *arity {
                        return Err(err(
                            RuntimeErrorKind::ArityMismatch,
                            format!("`{variant}` expects {arity} arguments, found {}", args.len()),
                            span,
                        ));
                    }
                    let payload = match record_fields {
                        Some(field_names) => VariantPayloadValue::Record(
                            field_names.iter().cloned().zip(args.drain(..)).collect(),
                        ),
                        None => VariantPayloadValue::Tuple(std::mem::take(&mut args)),
                    };
                    return Ok(Value::variant(type_name, variant, Some(payload)));
                }
                ClosureBody::Block { program, stmts } => {
                    if args.len() != closure.params.len() {
                        return Err(err(
                            RuntimeErrorKind::ArityMismatch,
                            format!(
                                "function expects {} arguments, found {}",
                                closure.params.len(),
                                args.len()
                            ),
                            span,
                        ));
                    }
                    let call_env = self.envs.push(Some(closure.env.unwrap_or(self.globals())));
                    for (param, arg) in closure.params.iter().zip(args.drain(..)) {
                        self.envs.define(call_env, param.as_ref(), arg, false);
                    }
                    let program = *program;
                    let stmts = stmts.clone();
                    match self.exec_block(program, call_env, &stmts) {
                        Ok(Flow::Return(value)) => return Ok(value),
                        Ok(Flow::TailCall {
                            callee: next,
                            args: next_args,
                        }) => {
                            callee = next;
                            args = next_args;
                            continue;
                        }
                        Ok(_) => return Ok(Value::Void),
                        Err(Abort::Propagate(value)) => return Ok(value),
                        Err(error) => return Err(error),
                    }
                }
            }
        }
    }

    /// Method dispatch: built-in methods first, then the impl table, then
    /// function-valued fields on record receivers.
    pub(crate) fn call_method(
        &mut self,
        receiver: Value,
        method: &str,
        args: Vec<Value>,
        span: Span,
    ) -> EvalResult<Value> {
        if let Some(result) = self.builtin_method(&receiver, method, &args, span) {
            return result;
        }

        let key = self.type_key_of_value(&receiver);
        if let Some(closure) = self.impl_method(&key, method) {
            self.enter_call(span)?;
            let result = self.invoke_with_self(&closure, receiver, args, span);
            self.leave_call();
            return result;
        }

        if let Value::Record(record) = &receiver {
            if let Some(field) = record.get(method) {
                return self.call_value(field, args, span);
            }
        }

        Err(err(
            RuntimeErrorKind::NotCallable,
            format!("no method `{method}` on {}", receiver.type_name()),
            span,
        ))
    }

    fn invoke_with_self(
        &mut self,
        closure: &Rc<Closure>,
        receiver: Value,
        mut args: Vec<Value>,
        span: Span,
    ) -> EvalResult<Value> {
        let ClosureBody::Block { program, stmts } = &closure.body else {
            return Err(err(
                RuntimeErrorKind::NotCallable,
                "method has no body",
                span,
            ));
        };
        if args.len() != closure.params.len() {
            return Err(err(
                RuntimeErrorKind::ArityMismatch,
                format!(
                    "method expects {} arguments, found {}",
                    closure.params.len(),
                    args.len()
                ),
                span,
            ));
        }
        let call_env = self.envs.push(Some(closure.env.unwrap_or(self.globals())));
        self.envs.define(call_env, "self", receiver, false);
        for (param, arg) in closure.params.iter().zip(args.drain(..)) {
            self.envs.define(call_env, param.as_ref(), arg, false);
        }
        let program = *program;
        let stmts = stmts.clone();
        match self.exec_block(program, call_env, &stmts) {
            Ok(Flow::Return(value)) => Ok(value),
            Ok(Flow::TailCall { callee, args }) => self.call_loop(callee, args, span),
            Ok(_) => Ok(Value::Void),
            Err(Abort::Propagate(value)) => Ok(value),
            Err(error) => Err(error),
        }
    }

    fn builtin_method(
        &mut self,
        receiver: &Value,
        method: &str,
        args: &[Value],
        span: Span,
    ) -> Option<EvalResult<Value>> {
        let result = match method {
            "len" => match receiver {
                Value::Str(s) => Ok(Value::Int(s.chars().count() as i128)),
                Value::Array(items) => Ok(Value::Int(items.borrow().len() as i128)),
                Value::Tuple(items) => Ok(Value::Int(items.len() as i128)),
                Value::Variant(v) if v.type_name.as_ref() == "List" => {
                    self.list_length(receiver, span).map(Value::Int)
                }
                _ => return None,
            },
            "is_some" => match receiver {
                Value::Variant(v) if v.type_name.as_ref() == "Option" => {
                    Ok(Value::Bool(v.name.as_ref() == "Some"))
                }
                _ => return None,
            },
            "is_none" => match receiver {
                Value::Variant(v) if v.type_name.as_ref() == "Option" => {
                    Ok(Value::Bool(v.name.as_ref() == "None"))
                }
                _ => return None,
            },
            "is_ok" => match receiver {
                Value::Variant(v) if v.type_name.as_ref() == "Result" => {
                    Ok(Value::Bool(v.name.as_ref() == "Ok"))
                }
                _ => return None,
            },
            "is_err" => match receiver {
                Value::Variant(v) if v.type_name.as_ref() == "Result" => {
                    Ok(Value::Bool(v.name.as_ref() == "Err"))
                }
                _ => return None,
            },
            "unwrap" => match receiver {
                Value::Variant(v) if v.name.as_ref() == "Some" || v.name.as_ref() == "Ok" => {
                    receiver.unwrap_payload().ok_or_else(|| {
                        err(RuntimeErrorKind::InvalidOperation, "malformed variant", span)
                    })
                }
                Value::Variant(v) if v.name.as_ref() == "None" => Err(err(
                    RuntimeErrorKind::InvalidOperation,
                    "`unwrap` on None",
                    span,
                )),
                Value::Variant(v) if v.name.as_ref() == "Err" => Err(err(
                    RuntimeErrorKind::InvalidOperation,
                    format!(
                        "`unwrap` on Err({})",
                        receiver
                            .unwrap_payload()
                            .map(|v| display_value(&v))
                            .unwrap_or_default()
                    ),
                    span,
                )),
                _ => return None,
            },
            "unwrap_or" => match receiver {
                Value::Variant(v) if v.name.as_ref() == "Some" || v.name.as_ref() == "Ok" => {
                    receiver.unwrap_payload().ok_or_else(|| {
                        err(RuntimeErrorKind::InvalidOperation, "malformed variant", span)
                    })
                }
                Value::Variant(v) if v.name.as_ref() == "None" || v.name.as_ref() == "Err" => {
                    match args.first() {
                        Some(default) => Ok(default.clone()),
                        None => Err(err(
                            RuntimeErrorKind::ArityMismatch,
                            "`unwrap_or` expects 1 argument",
                            span,
                        )),
                    }
                }
                _ => return None,
            },
            _ => return None,
        };
        Some(result)
    }

    pub(crate) fn list_length(&self, list: &Value, span: Span) -> EvalResult<i128> {
        let mut count = 0i128;
        let mut current = list.clone();
        loop {
            match &current {
                Value::Variant(v) if v.name.as_ref() == "Nil" => return Ok(count),
                Value::Variant(v) if v.name.as_ref() == "Cons" => {
                    let Some(VariantPayloadValue::Tuple(items)) = &v.payload else {
                        return Err(err(
                            RuntimeErrorKind::InvalidOperation,
                            "malformed list",
                            span,
                        ));
                    };
                    count += 1;
                    let next = items[1].clone();
                    current = next;
                }
                other => return Err(Abort::Error(type_mismatch("list", other, span))),
            }
        }
    }

    /// Arithmetic runs width-erased over `i128`; a result that leaves the
    /// range of the expression's declared integer type is an overflow
    /// diagnostic, not a silently out-of-range value. Unsigned types
    /// reject negative results the same way.
    fn check_int_width(
        &self,
        program: ProgramRef,
        expr_id: ExprId,
        result: &Value,
        span: Span,
    ) -> EvalResult<()> {
        let Value::Int(value) = result else {
            return Ok(());
        };
        let Some(prim) = self.static_int_prim(program, expr_id) else {
            return Ok(());
        };
        if int_fits(*value, prim) {
            Ok(())
        } else {
            Err(err(
                RuntimeErrorKind::Overflow,
                format!("integer overflow: {value} does not fit `{}`", prim.as_str()),
                span,
            ))
        }
    }

    /// Materialize the items a `for` loop visits.
    fn iter_items(&mut self, subject: &Value, span: Span) -> EvalResult<Vec<Value>> {
        match subject {
            Value::Array(items) => Ok(items.borrow().clone()),
            Value::Str(s) => Ok(s.chars().map(Value::Char).collect()),
            Value::Tuple(items) => Ok(items.as_ref().clone()),
            Value::Variant(v) if v.type_name.as_ref() == "List" => {
                let mut items = Vec::new();
                let mut current = subject.clone();
                loop {
                    match &current {
                        Value::Variant(v) if v.name.as_ref() == "Nil" => return Ok(items),
                        Value::Variant(v) if v.name.as_ref() == "Cons" => {
                            let Some(VariantPayloadValue::Tuple(pair)) = &v.payload else {
                                return Err(err(
                                    RuntimeErrorKind::InvalidOperation,
                                    "malformed list",
                                    span,
                                ));
                            };
                            items.push(pair[0].clone());
                            let next = pair[1].clone();
                            current = next;
                        }
                        other => return Err(Abort::Error(type_mismatch("list", other, span))),
                    }
                }
            }
            Value::Range(range) => match (&range.start, &range.end) {
                (Value::Int(start), Some(Value::Int(end))) => {
                    let mut items = Vec::new();
                    let mut i = *start;
                    while if range.inclusive { i <= *end } else { i < *end } {
                        items.push(Value::Int(i));
                        i += 1;
                    }
                    Ok(items)
                }
                (Value::Char(start), Some(Value::Char(end))) => {
                    let start = *start as u32;
                    let end = *end as u32 + u32::from(range.inclusive);
                    Ok((start..end).filter_map(char::from_u32).map(Value::Char).collect())
                }
                _ => Err(err(
                    RuntimeErrorKind::InvalidOperation,
                    "open-ended range cannot be iterated",
                    span,
                )),
            },
            other => Err(Abort::Error(type_mismatch("iterable", other, span))),
        }
    }
}

enum MatchOutcome {
    Value(Value),
    Flow(Flow),
}

/// How a `return <expr>` resolves for the tail-call trampoline.
enum TailDisposition {
    /// Not a call; evaluate normally.
    Not,
    /// A call that completed in place (native or constructor callee).
    Done(Value),
    /// A user-function call to hand to the trampoline.
    Transfer { callee: Value, args: Vec<Value> },
}

fn break_matches(loop_label: &Option<String>, break_label: &Option<String>) -> bool {
    match break_label {
        None => true,
        Some(label) => loop_label.as_deref() == Some(label.as_str()),
    }
}

/// Checked numeric binary operations; overflow is a diagnostic, not a
/// wrap.
fn numeric_binop(op: BinaryOp, left: &Value, right: &Value, span: Span) -> EvalResult<Value> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => {
            let result = match op {
                BinaryOp::Add => a.checked_add(*b),
                BinaryOp::Sub => a.checked_sub(*b),
                BinaryOp::Mul => a.checked_mul(*b),
                BinaryOp::Div => {
                    if *b == 0 {
                        return Err(err(
                            RuntimeErrorKind::DivisionByZero,
                            "division by zero",
                            span,
                        ));
                    }
                    a.checked_div(*b)
                }
                BinaryOp::Rem => {
                    if *b == 0 {
                        return Err(err(
                            RuntimeErrorKind::DivisionByZero,
                            "division by zero",
                            span,
                        ));
                    }
                    a.checked_rem(*b)
                }
                _ => unreachable!("not an arithmetic operator"),
            };
            result
                .map(Value::Int)
                .ok_or_else(|| err(RuntimeErrorKind::Overflow, "integer overflow", span))
        }
        (Value::Float(a), Value::Float(b)) => Ok(Value::Float(match op {
            BinaryOp::Add => a + b,
            BinaryOp::Sub => a - b,
            BinaryOp::Mul => a * b,
            BinaryOp::Div => a / b,
            BinaryOp::Rem => a % b,
            _ => unreachable!("not an arithmetic operator"),
        })),
        _ => Err(err(
            RuntimeErrorKind::TypeMismatch,
            format!(
                "arithmetic requires matching numeric operands, found {} and {}",
                left.type_name(),
                right.type_name()
            ),
            span,
        )),
    }
}

/// Whether a value is representable in a declared integer type. `i128`
/// and `u128` share the widest runtime representation.
fn int_fits(value: i128, prim: PrimType) -> bool {
    match prim {
        PrimType::I8 => i8::try_from(value).is_ok(),
        PrimType::I16 => i16::try_from(value).is_ok(),
        PrimType::I32 => i32::try_from(value).is_ok(),
        PrimType::I64 => i64::try_from(value).is_ok(),
        PrimType::U8 => u8::try_from(value).is_ok(),
        PrimType::U16 => u16::try_from(value).is_ok(),
        PrimType::U32 => u32::try_from(value).is_ok(),
        PrimType::U64 => u64::try_from(value).is_ok(),
        PrimType::U128 => value >= 0,
        _ => true,
    }
}

/// Two's-complement truncation to a declared width, for explicit casts.
fn truncate_int(value: i128, prim: PrimType) -> i128 {
    match prim {
        PrimType::I8 => value as i8 as i128,
        PrimType::I16 => value as i16 as i128,
        PrimType::I32 => value as i32 as i128,
        PrimType::I64 => value as i64 as i128,
        PrimType::U8 => value as u8 as i128,
        PrimType::U16 => value as u16 as i128,
        PrimType::U32 => value as u32 as i128,
        PrimType::U64 => value as u64 as i128,
        _ => value,
    }
}

/// Total order over comparable values.
fn compare_values(left: &Value, right: &Value) -> Option<std::cmp::Ordering> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
        (Value::Char(a), Value::Char(b)) => Some(a.cmp(b)),
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        _ => None,
    }
}
