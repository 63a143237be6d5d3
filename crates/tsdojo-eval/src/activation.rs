//! Resumable `async` function bodies.
//!
//! An async call runs its body on the host stack until the first `await`.
//! There the stack unwinds with [`EvalError::Await`], a reaction on the
//! awaited promise is registered to resume the body, and the call returns
//! the function's promise to its caller.
//!
//! Resuming re-enters the body from the top. Every expression, statement
//! and scope that completed before the suspension is handed back from the
//! activation's [`Record`] instead of running again, so side effects happen
//! once and closures keep the scopes they captured. Steps are keyed by the
//! order in which they are entered, which replay reproduces exactly; the
//! `await` that suspended finds its settled outcome under its own key.
//!
//! Loops keep a single progress slot that is overwritten after every pass,
//! so the record stays as deep as the body is nested rather than as long as
//! it has run.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use tsdojo_types::ast::{FunctionBody, FunctionDef};

use crate::env::Scope;
use crate::error::{EvalError, EvalResult};
use crate::interpreter::Interpreter;
use crate::value::{CallArgs, Function, JsValue, Obj};

const OUT_OF_STEP: &str = "async function resumed out of step";

/// The outcome of a completed step in a form replay can hand back.
#[derive(Clone)]
pub(crate) enum Saved {
    Value(JsValue),
    Unit,
    Scope(Scope),
    Items(Vec<JsValue>),
    Element(Option<JsValue>),
    Flag(bool),
    Position(usize),
}

/// Results that can be recorded for replay.
pub(crate) trait Memo: Sized {
    fn save(&self) -> Saved;
    fn restore(saved: &Saved) -> Option<Self>;
}

impl Memo for JsValue {
    fn save(&self) -> Saved {
        Saved::Value(self.clone())
    }

    fn restore(saved: &Saved) -> Option<Self> {
        match saved {
            Saved::Value(value) => Some(value.clone()),
            _ => None,
        }
    }
}

impl Memo for () {
    fn save(&self) -> Saved {
        Saved::Unit
    }

    fn restore(saved: &Saved) -> Option<Self> {
        matches!(saved, Saved::Unit).then_some(())
    }
}

impl Memo for Scope {
    fn save(&self) -> Saved {
        Saved::Scope(self.clone())
    }

    fn restore(saved: &Saved) -> Option<Self> {
        match saved {
            Saved::Scope(scope) => Some(scope.clone()),
            _ => None,
        }
    }
}

impl Memo for Vec<JsValue> {
    fn save(&self) -> Saved {
        Saved::Items(self.clone())
    }

    fn restore(saved: &Saved) -> Option<Self> {
        match saved {
            Saved::Items(items) => Some(items.clone()),
            _ => None,
        }
    }
}

impl Memo for Option<JsValue> {
    fn save(&self) -> Saved {
        Saved::Element(self.clone())
    }

    fn restore(saved: &Saved) -> Option<Self> {
        match saved {
            Saved::Element(item) => Some(item.clone()),
            _ => None,
        }
    }
}

impl Memo for bool {
    fn save(&self) -> Saved {
        Saved::Flag(*self)
    }

    fn restore(saved: &Saved) -> Option<Self> {
        match saved {
            Saved::Flag(flag) => Some(*flag),
            _ => None,
        }
    }
}

impl Memo for usize {
    fn save(&self) -> Saved {
        Saved::Position(*self)
    }

    fn restore(saved: &Saved) -> Option<Self> {
        match saved {
            Saved::Position(position) => Some(*position),
            _ => None,
        }
    }
}

struct Entry {
    /// Cursor position once the step and everything inside it is done.
    end: usize,
    outcome: Result<Saved, EvalError>,
}

enum Step {
    Run(usize),
    Replay {
        index: usize,
        outcome: Result<Saved, EvalError>,
    },
}

/// Completed steps of one async body, keyed by entry order.
#[derive(Default)]
pub(crate) struct Record {
    entries: BTreeMap<usize, Entry>,
    cursor: usize,
}

impl Record {
    fn enter(&mut self) -> Step {
        let index = self.cursor;
        match self.entries.get(&index) {
            Some(entry) => {
                self.cursor = entry.end;
                Step::Replay {
                    index,
                    outcome: entry.outcome.clone(),
                }
            }
            None => {
                self.cursor = index + 1;
                Step::Run(index)
            }
        }
    }

    /// Store the outcome of the step at `index`. Entries of steps nested
    /// inside it are no longer reachable and go.
    fn complete(&mut self, index: usize, outcome: Result<Saved, EvalError>) {
        if self.entries.range(index + 1..).next().is_some() {
            drop(self.entries.split_off(&(index + 1)));
        }
        self.entries.insert(
            index,
            Entry {
                end: self.cursor,
                outcome,
            },
        );
    }
}

/// The `await` a body suspended on.
pub(crate) struct PendingAwait {
    index: usize,
    promise: Obj,
}

/// One running call of an async function.
pub(crate) struct Activation {
    def: Rc<FunctionDef>,
    scope: Scope,
    promise: Obj,
    record: RefCell<Record>,
}

impl Interpreter {
    /// Run one step of the current async body, or hand back its outcome
    /// when a resumed body passes it again. Outside async bodies this is
    /// just `step(self)`.
    pub(crate) fn replay<T: Memo>(
        &mut self,
        step: impl FnOnce(&mut Self) -> EvalResult<T>,
    ) -> EvalResult<T> {
        let index = match self.record.as_mut().map(Record::enter) {
            None => return step(self),
            Some(Step::Run(index)) => index,
            Some(Step::Replay { outcome, .. }) => return self.restore(outcome),
        };
        let result = step(self);
        if !result.as_ref().is_err_and(EvalError::is_fatal) {
            if let Some(record) = self.record.as_mut() {
                let outcome = match &result {
                    Ok(value) => Ok(value.save()),
                    Err(err) => Err(err.clone()),
                };
                record.complete(index, outcome);
            }
        }
        result
    }

    fn restore<T: Memo>(&self, outcome: Result<Saved, EvalError>) -> EvalResult<T> {
        let saved = outcome?;
        T::restore(&saved).ok_or_else(|| self.throw_error("Error", OUT_OF_STEP))
    }

    /// Claim the progress slot of a loop. A resumed body gets back the
    /// state saved after the last completed pass, skipping those passes.
    pub(crate) fn loop_progress<T: Memo>(&mut self) -> EvalResult<(Option<usize>, Option<T>)> {
        match self.record.as_mut().map(Record::enter) {
            None => Ok((None, None)),
            Some(Step::Run(index)) => Ok((Some(index), None)),
            Some(Step::Replay { index, outcome }) => {
                let state = self.restore(outcome)?;
                Ok((Some(index), Some(state)))
            }
        }
    }

    /// Record the state a loop reached after a completed pass.
    pub(crate) fn save_progress<T: Memo>(&mut self, slot: Option<usize>, state: &T) {
        if let (Some(index), Some(record)) = (slot, self.record.as_mut()) {
            record.complete(index, Ok(state.save()));
        }
    }

    /// `await value`. Inside an async body this suspends the body until
    /// `value` settles, even when it is not a promise. Top-level code has
    /// no body to suspend and drains the queues instead.
    pub(crate) fn await_value(&mut self, value: JsValue) -> EvalResult<JsValue> {
        let index = match self.record.as_mut().map(Record::enter) {
            None => return self.await_blocking(value),
            Some(Step::Run(index)) => index,
            Some(Step::Replay { outcome, .. }) => return self.restore(outcome),
        };
        let promise = self.promise_resolve(value)?;
        self.pending_await = Some(PendingAwait { index, promise });
        Err(EvalError::Await)
    }

    /// Call an async function whose scope is ready: bind the parameters,
    /// run the body up to its first suspension and return its promise.
    pub(crate) fn start_async(
        &mut self,
        def: &Rc<FunctionDef>,
        args: Vec<JsValue>,
        scope: Scope,
    ) -> EvalResult<JsValue> {
        let promise = self.new_promise();
        match self.bind_params(&def.params, args, &scope) {
            Ok(()) => {}
            Err(EvalError::Throw(reason)) => {
                self.reject_promise(&promise, reason);
                return Ok(JsValue::Object(promise));
            }
            Err(err) => return Err(err),
        }
        if let FunctionBody::Block(stmts) = &def.body {
            self.hoist_declarations(stmts, &scope);
        }
        let activation = Rc::new(Activation {
            def: def.clone(),
            scope,
            promise: promise.clone(),
            record: RefCell::default(),
        });
        self.resume(&activation, None)?;
        Ok(JsValue::Object(promise))
    }

    fn resume(
        &mut self,
        activation: &Rc<Activation>,
        settled: Option<(usize, Result<JsValue, JsValue>)>,
    ) -> EvalResult<()> {
        let mut record = activation.record.take();
        if let Some((index, outcome)) = settled {
            record.entries.insert(
                index,
                Entry {
                    end: index + 1,
                    outcome: outcome.map(Saved::Value).map_err(EvalError::Throw),
                },
            );
        }
        record.cursor = 0;
        let outer = self.record.replace(record);
        let result = self.run_statements(&activation.def, &activation.scope);
        let record = std::mem::replace(&mut self.record, outer);
        *activation.record.borrow_mut() = record.unwrap_or_default();

        match result {
            Ok(value) => self.resolve_promise(&activation.promise, value),
            Err(EvalError::Throw(reason)) => {
                self.reject_promise(&activation.promise, reason);
                Ok(())
            }
            Err(EvalError::Await) => self.suspend(activation),
            Err(err) => Err(err),
        }
    }

    fn suspend(&mut self, activation: &Rc<Activation>) -> EvalResult<()> {
        let Some(PendingAwait { index, promise }) = self.pending_await.take() else {
            return Err(self.throw_error("Error", OUT_OF_STEP));
        };
        tracing::trace!(index, "async body suspended");
        let on_fulfilled = self.resumer(activation, index, true);
        let on_rejected = self.resumer(activation, index, false);
        self.promise_then(&promise, on_fulfilled, on_rejected);
        Ok(())
    }

    fn resumer(&mut self, activation: &Rc<Activation>, index: usize, fulfilled: bool) -> JsValue {
        let activation = activation.clone();
        let function = self.make_function(
            "",
            1,
            Function::NativeClosure(Rc::new(
                move |interp: &mut Interpreter, call: &CallArgs| -> EvalResult<JsValue> {
                    let outcome = if fulfilled {
                        Ok(call.arg(0))
                    } else {
                        Err(call.arg(0))
                    };
                    interp.resume(&activation, Some((index, outcome)))?;
                    Ok(JsValue::Undefined)
                },
            )),
        );
        JsValue::Object(function)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value(n: f64) -> Result<Saved, EvalError> {
        Ok(Saved::Value(JsValue::Number(n)))
    }

    #[test]
    fn completed_steps_replay_and_skip_their_insides() {
        let mut record = Record::default();
        assert!(matches!(record.enter(), Step::Run(0)));
        assert!(matches!(record.enter(), Step::Run(1)));
        record.complete(1, value(1.0));
        record.complete(0, value(2.0));

        record.cursor = 0;
        match record.enter() {
            Step::Replay {
                index: 0,
                outcome: Ok(Saved::Value(JsValue::Number(n))),
            } => assert_eq!(n, 2.0),
            _ => panic!("expected the outer step to replay"),
        }
        assert_eq!(record.cursor, 2);
        assert!(matches!(record.enter(), Step::Run(2)));
    }

    #[test]
    fn completing_a_step_drops_nested_entries() {
        let mut record = Record::default();
        for _ in 0..4 {
            record.enter();
        }
        record.complete(3, value(3.0));
        assert_eq!(record.entries.len(), 1);
        record.complete(2, value(2.0));
        assert_eq!(record.entries.keys().copied().collect::<Vec<_>>(), vec![2]);
        record.complete(1, Ok(Saved::Unit));
        assert_eq!(record.entries.keys().copied().collect::<Vec<_>>(), vec![1]);
        assert_eq!(record.entries[&1].end, 4);
    }
}
