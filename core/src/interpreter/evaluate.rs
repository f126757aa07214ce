//! Instruction evaluation
//!
//! `Runtime` owns the scope arena and clock of one run. Evaluation is
//! recursive and async: every instruction returns a boxed local future, so
//! host library calls may suspend without blocking the rest of the run.
//! Only array and object literals poll their members together; everything
//! else awaits sub-evaluations one at a time, in source order.

use std::sync::Arc;

use futures::future::{join_all, FutureExt, LocalBoxFuture};
use indexmap::IndexMap;
use tracing::trace;

use super::dates::{Clock, DateTimeValue, DateValue};
use super::errors::{EvalError, EvalResult};
use super::scope::{Callee, ScopeId, Scopes};
use super::stdlib::CallContext;
use super::types::control::value;
use super::types::{Closure, Flow, Instruction, Operand, Selector, Shared, Value};

/// State of a single program run
pub struct Runtime {
    scopes: Scopes,
    clock: Clock,
}

impl Runtime {
    pub fn new(clock: Clock) -> Self {
        Self {
            scopes: Scopes::new(),
            clock,
        }
    }

    pub fn scopes(&self) -> &Scopes {
        &self.scopes
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    /* ===================== Instructions ===================== */

    pub fn evaluate<'a>(
        &'a self,
        instruction: &'a Instruction,
        scope: ScopeId,
    ) -> LocalBoxFuture<'a, EvalResult<Flow>> {
        async move {
            let result = match instruction {
                Instruction::Block { lines } => {
                    let mut last = Flow::Continue;
                    for line in lines {
                        last = self.evaluate(line, scope).await?;
                        if last.is_break() {
                            break;
                        }
                    }
                    return Ok(last);
                }

                Instruction::Number { value } => Value::Number(*value),
                Instruction::String { value } => Value::string(value.as_str()),
                Instruction::Bool { value } => Value::Bool(*value),
                Instruction::Date { value } => {
                    Value::Date(DateValue::parse(value, self.clock.timezone())?)
                }
                Instruction::DateTime { value } => {
                    Value::DateTime(DateTimeValue::parse(value, self.clock.timezone())?)
                }
                Instruction::Translate { title, .. } => Value::string(title.as_str()),
                Instruction::Scope => {
                    self.scopes.capture(scope);
                    Value::Scope(scope)
                }
                Instruction::Break => return Ok(Flow::Break),

                Instruction::Nest { value } => return self.evaluate(value, scope).await,
                Instruction::Return { value: Some(value) } => {
                    return self.evaluate(value, scope).await
                }
                Instruction::Return { value: None } => return Ok(Flow::Continue),

                Instruction::Negation { value } => {
                    let operand = value!(self.evaluate(value, scope).await?);
                    operand.send(&Selector::Neg, &[])?
                }

                Instruction::When { test, ok, fail } => {
                    let test = value!(self.evaluate(test, scope).await?);
                    let branch = if test.is_truthy() { ok } else { fail };
                    return self.evaluate(branch, scope).await;
                }
                Instruction::If { test, ok, fail } => {
                    let test = value!(self.evaluate(test, scope).await?);
                    return match (test.is_truthy(), fail) {
                        (true, _) => self.evaluate(ok, scope).await,
                        (false, Some(fail)) => self.evaluate(fail, scope).await,
                        (false, None) => Ok(Flow::Continue),
                    };
                }

                Instruction::Array { list } => {
                    let flows = join_all(list.iter().map(|item| self.evaluate(item, scope))).await;
                    let mut items = Vec::with_capacity(flows.len());
                    for flow in flows {
                        items.push(value!(flow?));
                    }
                    Value::array(items)
                }
                Instruction::Object { members } => {
                    let flows =
                        join_all(members.iter().map(|m| self.evaluate(&m.value, scope))).await;
                    let mut object = IndexMap::with_capacity(flows.len());
                    for (member, flow) in members.iter().zip(flows) {
                        object.insert(member.name.clone(), value!(flow?));
                    }
                    Value::object(object)
                }

                Instruction::Math { init, list } => {
                    let mut total = value!(self.evaluate(init, scope).await?);
                    for Operand { operator, value } in list {
                        let selector = Selector::arithmetic(operator)
                            .ok_or_else(|| EvalError::UnknownOperator(operator.clone()))?;
                        let operand = value!(self.evaluate(value, scope).await?);
                        total = total.send(&selector, &[operand])?;
                    }
                    total
                }
                Instruction::And { init, list } => {
                    return self.fold_logical(init, list, scope, false).await
                }
                Instruction::Or { init, list } => {
                    return self.fold_logical(init, list, scope, true).await
                }

                Instruction::Compare { a, b, operator } => {
                    let left = value!(self.evaluate(a, scope).await?);
                    let right = value!(self.evaluate(b, scope).await?);
                    let order = left.compare(&right)?;
                    Value::Bool(compare(operator, &order)?)
                }

                Instruction::Variable { name, value } => {
                    let value = value!(self.evaluate(value, scope).await?);
                    self.scopes.declare(scope, name, value)?
                }
                Instruction::Assignment { id, value } => {
                    let value = value!(self.evaluate(value, scope).await?);
                    self.scopes.set(scope, id, value)?
                }

                Instruction::Get { args } => {
                    let (target, rest) = self.evaluate_args(args, scope).await?;
                    let Some(target) = target else {
                        return Ok(Flow::Break);
                    };
                    return self.send(target, Selector::Get, rest).await;
                }
                Instruction::Set { args } => {
                    let (target, rest) = self.evaluate_args(args, scope).await?;
                    let Some(target) = target else {
                        return Ok(Flow::Break);
                    };
                    return self.send(target, Selector::Set, rest).await;
                }
                Instruction::Call { args } => {
                    let (target, mut rest) = self.evaluate_args(args, scope).await?;
                    let Some(target) = target else {
                        return Ok(Flow::Break);
                    };
                    let name = if rest.is_empty() {
                        String::new()
                    } else {
                        rest.remove(0).to_text()
                    };
                    return self.call(target, &name, rest).await;
                }

                Instruction::For {
                    iterator,
                    list,
                    block,
                } => {
                    let list = value!(self.evaluate(list, scope).await?);
                    let body = Value::Closure(Closure {
                        params: Arc::from([iterator.clone()]),
                        body: block.clone(),
                        scope,
                    });
                    return self.send(list, Selector::Iterate, vec![body]).await;
                }
                Instruction::Generator { from, to } => {
                    let from = value!(self.evaluate(from, scope).await?);
                    let to = value!(self.evaluate(to, scope).await?);
                    generate(&from, &to)?
                }
                Instruction::Function { name, args, block } => {
                    self.scopes.capture(scope);
                    let closure = Value::Closure(Closure {
                        params: args.clone(),
                        body: block.clone(),
                        scope,
                    });
                    self.scopes.declare(scope, name, closure)?
                }

                Instruction::Each { name, block } => {
                    let mut last = Value::Empty;
                    for view in self.scopes.search(scope, name) {
                        trace!(name = name.as_str(), "each match");
                        let child = self.scopes.child(scope, Some(view));
                        let flow = self.evaluate(block, child).await;
                        self.scopes.release(child);
                        last = value!(flow?);
                    }
                    last
                }
            };
            Ok(Flow::Value(result))
        }
        .boxed_local()
    }

    /// Evaluate message-send arguments strictly left to right.
    ///
    /// Returns `None` for the target when an argument breaks. A bare scope
    /// target is only used for this send, so it doesn't capture the scope.
    async fn evaluate_args(
        &self,
        args: &[Instruction],
        scope: ScopeId,
    ) -> EvalResult<(Option<Value>, Vec<Value>)> {
        let mut values = Vec::with_capacity(args.len());
        for (position, arg) in args.iter().enumerate() {
            if position == 0 && matches!(arg, Instruction::Scope) {
                values.push(Value::Scope(scope));
                continue;
            }
            match self.evaluate(arg, scope).await? {
                Flow::Break => return Ok((None, Vec::new())),
                flow => values.push(flow.into_value()),
            }
        }
        if values.is_empty() {
            return Ok((Some(Value::Empty), values));
        }
        let target = values.remove(0);
        Ok((Some(target), values))
    }

    /// And/Or fold; stops before evaluating the next operand once the result
    /// is decided (falsy for `and`, truthy for `or`)
    async fn fold_logical(
        &self,
        init: &Instruction,
        list: &[Operand],
        scope: ScopeId,
        stop_when: bool,
    ) -> EvalResult<Flow> {
        let mut result = value!(self.evaluate(init, scope).await?);
        for Operand { operator, value } in list {
            if result.is_truthy() == stop_when {
                break;
            }
            let selector = Selector::logical(operator)
                .ok_or_else(|| EvalError::UnknownOperator(operator.clone()))?;
            let operand = value!(self.evaluate(value, scope).await?);
            result = result.send(&selector, &[operand])?;
        }
        Ok(Flow::Value(result))
    }

    /* ===================== Messages ===================== */

    /// Send a message that may need the evaluator; everything else is
    /// answered by `Value::send`
    pub fn send<'a>(
        &'a self,
        receiver: Value,
        selector: Selector,
        args: Vec<Value>,
    ) -> LocalBoxFuture<'a, EvalResult<Flow>> {
        async move {
            match (&receiver, &selector) {
                (Value::Scope(scope), Selector::Get) => {
                    let name = args.first().map(Value::to_text).unwrap_or_default();
                    Ok(Flow::Value(self.scopes.get(*scope, &name)))
                }
                (Value::Scope(scope), Selector::Set) => {
                    let name = args.first().map(Value::to_text).unwrap_or_default();
                    let value = args.get(1).cloned().unwrap_or(Value::Empty);
                    Ok(Flow::Value(self.scopes.set(*scope, &name, value)?))
                }
                (Value::Scope(scope), _) => self.call_in_scope(*scope, selector.name(), args).await,
                (Value::Closure(closure), Selector::Call) => self.invoke(closure, args).await,
                (Value::Array(items), Selector::Iterate) => self.iterate(items, args).await,
                _ => Ok(Flow::Value(receiver.send(&selector, &args)?)),
            }
        }
        .boxed_local()
    }

    /// `Call` instruction dispatch.
    ///
    /// A scope target resolves the raw name through the call path;
    /// `isNotEmpty` is answered as `isEmpty` followed by `neg`.
    async fn call(&self, target: Value, name: &str, args: Vec<Value>) -> EvalResult<Flow> {
        if let Value::Scope(scope) = target {
            return self.call_in_scope(scope, name, args).await;
        }
        match Selector::from_name(name) {
            Selector::IsNotEmpty => {
                let empty = value!(self.send(target, Selector::IsEmpty, args).await?);
                Ok(Flow::Value(empty.send(&Selector::Neg, &[])?))
            }
            selector => self.send(target, selector, args).await,
        }
    }

    /// Resolve `name` from `scope` and call it
    async fn call_in_scope(&self, scope: ScopeId, name: &str, args: Vec<Value>) -> EvalResult<Flow> {
        match self.scopes.resolve_call(scope, name)? {
            Callee::Closure(value) => self.send(value, Selector::Call, args).await,
            Callee::Library(library) => {
                trace!(library = library.name(), function = name, "library call");
                let cx = CallContext { clock: &self.clock };
                Ok(Flow::Value(library.call(cx, name, args).await?))
            }
        }
    }

    /// Call a closure in a fresh child of its defining scope, released once
    /// the call returns
    async fn invoke(&self, closure: &Closure, args: Vec<Value>) -> EvalResult<Flow> {
        let frame = self.scopes.child(closure.scope, None);
        let flow = self.run_frame(closure, args, frame).await;
        self.scopes.release(frame);
        flow
    }

    async fn run_frame(
        &self,
        closure: &Closure,
        args: Vec<Value>,
        frame: ScopeId,
    ) -> EvalResult<Flow> {
        let mut args = args.into_iter();
        for param in closure.params.iter() {
            self.scopes
                .declare(frame, param, args.next().unwrap_or(Value::Empty))?;
        }
        self.evaluate(&closure.body, frame).await
    }

    /// Call the closure in `args[0]` for each element of a snapshot of the
    /// array, until it breaks
    async fn iterate(&self, items: &Shared<Vec<Value>>, args: Vec<Value>) -> EvalResult<Flow> {
        let body = args.into_iter().next().unwrap_or(Value::Empty);
        let snapshot = items.borrow().clone();
        let mut last = Flow::Continue;
        for item in snapshot {
            match self.send(body.clone(), Selector::Call, vec![item]).await? {
                Flow::Break => break,
                Flow::Continue => {}
                flow => last = flow,
            }
        }
        Ok(last)
    }
}

/// Map a three-way comparison result onto a relational operator.
///
/// A non-number result (only `Empty` answers one) satisfies `!=` alone.
fn compare(operator: &str, order: &Value) -> EvalResult<bool> {
    let known = matches!(operator, "==" | ">" | "<" | "<=" | ">=" | "!=");
    if !known {
        return Err(EvalError::UnknownOperator(operator.to_string()));
    }
    let Value::Number(order) = order else {
        return Ok(operator == "!=");
    };
    Ok(match operator {
        "==" => *order == 0.0,
        ">" => *order > 0.0,
        "<" => *order < 0.0,
        "<=" => *order <= 0.0,
        ">=" => *order >= 0.0,
        _ => *order != 0.0,
    })
}

/// Longest range a generator may produce
const MAX_RANGE: usize = 1_000_000;

/// Inclusive ascending range `[from to to]`
fn generate(from: &Value, to: &Value) -> EvalResult<Value> {
    let (Value::Number(from), Value::Number(to)) = (from, to) else {
        return Err(EvalError::mismatch(
            "generate",
            from.type_name(),
            to.type_name(),
        ));
    };
    if !from.is_finite() || !to.is_finite() {
        return Err(EvalError::mismatch("generate", "Number", "Number"));
    }
    if from > to {
        return Ok(Value::array(Vec::new()));
    }
    let span = (to - from).floor();
    if span >= MAX_RANGE as f64 {
        return Err(EvalError::mismatch("generate", "Number", "Number"));
    }
    let items = (0..=span as usize)
        .map(|step| Value::Number(from + step as f64))
        .collect();
    Ok(Value::array(items))
}
