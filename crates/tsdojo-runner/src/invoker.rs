//! Calls the entry point with one case input and settles the result.

use tsdojo_eval::{EvalError, Interpreter, JsValue, Settled};
use tsdojo_types::Value;

use crate::host::ExportMapping;
use crate::suite::ErrorKind;

pub const NO_ENTRY_POINT: &str = "No exported function to test";
pub const NEVER_SETTLED: &str = "deferred result never settled";
pub const STEP_LIMIT_EXCEEDED: &str = "step limit exceeded (possible infinite loop)";

/// What one call produced once the event loop went idle.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Returned(Value),
    Failed { kind: ErrorKind, message: String },
}

impl Outcome {
    fn failed(kind: ErrorKind, message: impl Into<String>) -> Self {
        Outcome::Failed {
            kind,
            message: message.into(),
        }
    }
}

/// Call the first export with `input` as its only argument under a fresh
/// budget of `step_limit` steps. Promises are awaited by draining the job
/// and timer queues. Jobs and timers left behind by an earlier case are
/// dropped first, and a failed call drops whatever it queued.
pub fn invoke(mapping: &mut ExportMapping, input: &Value, step_limit: u64) -> Outcome {
    let Some(entry) = mapping.entry_point().map(|(_, value)| value.clone()) else {
        return Outcome::failed(ErrorKind::ExportNotFound, NO_ENTRY_POINT);
    };
    let interp = mapping.interpreter_mut();
    interp.clear_pending_work();
    interp.set_step_limit(step_limit);
    let arg = interp.import_value(input);

    let outcome = call_and_settle(interp, &entry, arg);
    if let Outcome::Failed { kind, .. } = &outcome {
        if interp.has_pending_work() {
            tracing::debug!(?kind, "dropping work queued by failed case");
        }
        interp.clear_pending_work();
    }
    outcome
}

fn call_and_settle(interp: &mut Interpreter, entry: &JsValue, arg: JsValue) -> Outcome {
    let returned = match interp.call_value(entry, JsValue::Undefined, vec![arg]) {
        Ok(value) => value,
        Err(err) => return abrupt(interp, err),
    };
    match interp.settle(returned) {
        Ok(Settled::Fulfilled(value)) => match interp.export_value(&value) {
            Ok(actual) => Outcome::Returned(actual),
            Err(err) => abrupt(interp, err),
        },
        Ok(Settled::Rejected(reason)) => {
            Outcome::failed(ErrorKind::Runtime, interp.error_message(&reason))
        }
        Ok(Settled::Pending) => Outcome::failed(ErrorKind::Timeout, NEVER_SETTLED),
        Err(err) => abrupt(interp, err),
    }
}

fn abrupt(interp: &mut Interpreter, err: EvalError) -> Outcome {
    match err {
        EvalError::Throw(value) => Outcome::failed(ErrorKind::Runtime, interp.error_message(&value)),
        EvalError::GasExhausted => Outcome::failed(ErrorKind::Timeout, STEP_LIMIT_EXCEEDED),
        EvalError::Suspended => Outcome::failed(ErrorKind::Timeout, NEVER_SETTLED),
        other => Outcome::failed(ErrorKind::Runtime, other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exports::extract_exports;
    use crate::host::{Evaluator, ScriptEvaluator};

    const STEPS: u64 = 100_000;

    fn mapping(code: &str) -> ExportMapping {
        ScriptEvaluator::default()
            .load(code, &extract_exports(code))
            .unwrap()
    }

    fn invoke_once(code: &str, input: Value) -> Outcome {
        invoke(&mut mapping(code), &input, STEPS)
    }

    #[test]
    fn synchronous_return() {
        let outcome = invoke_once("export function inc(a: number) { return a + 1; }", 1.0.into());
        assert_eq!(outcome, Outcome::Returned(2.0.into()));
    }

    #[test]
    fn first_export_is_the_entry_point() {
        let code = "export const twice = (x: number) => x * 2; export function other() { return 0; }";
        assert_eq!(invoke_once(code, 4.0.into()), Outcome::Returned(8.0.into()));
    }

    #[test]
    fn async_result_is_awaited() {
        let code = r#"
            export async function later(x: string) {
                await new Promise(resolve => setTimeout(resolve, 100));
                return x + '!';
            }
        "#;
        assert_eq!(invoke_once(code, "hi".into()), Outcome::Returned("hi!".into()));
    }

    #[test]
    fn thrown_error_uses_message() {
        let code = "export function f() { throw new Error('Test error'); }";
        assert_eq!(
            invoke_once(code, Value::Null),
            Outcome::failed(ErrorKind::Runtime, "Test error")
        );
    }

    #[test]
    fn thrown_non_error_is_stringified() {
        let code = "export function f() { throw 404; }";
        assert_eq!(
            invoke_once(code, Value::Null),
            Outcome::failed(ErrorKind::Runtime, "404")
        );
    }

    #[test]
    fn rejection_is_runtime_error() {
        let code = "export function f() { return Promise.reject(new RangeError('too far')); }";
        assert_eq!(
            invoke_once(code, Value::Null),
            Outcome::failed(ErrorKind::Runtime, "too far")
        );
    }

    #[test]
    fn pending_promise_times_out() {
        let code = "export function f() { return new Promise(() => {}); }";
        assert_eq!(
            invoke_once(code, Value::Null),
            Outcome::failed(ErrorKind::Timeout, NEVER_SETTLED)
        );
    }

    #[test]
    fn infinite_loop_times_out() {
        let code = "export function spin() { for (;;) {} }";
        assert_eq!(
            invoke_once(code, Value::Null),
            Outcome::failed(ErrorKind::Timeout, STEP_LIMIT_EXCEEDED)
        );
    }

    #[test]
    fn no_exports_is_export_not_found() {
        assert_eq!(
            invoke_once("function hidden() {}", Value::Null),
            Outcome::failed(ErrorKind::ExportNotFound, NO_ENTRY_POINT)
        );
    }

    #[test]
    fn each_call_gets_a_fresh_budget() {
        let code = "export function work(n: number) { let s = 0; for (let i = 0; i < n; i++) s += i; return s; }";
        let mut loaded = mapping(code);
        for _ in 0..5 {
            assert_eq!(
                invoke(&mut loaded, &1000.0.into(), 50_000),
                Outcome::Returned(499_500.0.into())
            );
        }
    }

    #[test]
    fn failed_case_leaves_no_queued_work() {
        let code = r#"
            export function fail(x: number) {
                if (x === 1) {
                    setTimeout(() => { throw new Error('stale'); }, 0);
                    Promise.resolve().then(() => { throw new Error('stale job'); });
                    throw new Error('first call fails');
                }
                return x;
            }
        "#;
        let mut loaded = mapping(code);
        assert_eq!(
            invoke(&mut loaded, &1.0.into(), STEPS),
            Outcome::failed(ErrorKind::Runtime, "first call fails")
        );
        assert!(!loaded.interpreter_mut().has_pending_work());
        assert_eq!(invoke(&mut loaded, &2.0.into(), STEPS), Outcome::Returned(2.0.into()));
    }

    #[test]
    fn inputs_are_fresh_copies() {
        let code = "export function grow(list: number[]) { list.push(0); return list.length; }";
        let mut loaded = mapping(code);
        let input = Value::Array(vec![1.0.into()]);
        assert_eq!(invoke(&mut loaded, &input, STEPS), Outcome::Returned(2.0.into()));
        assert_eq!(invoke(&mut loaded, &input, STEPS), Outcome::Returned(2.0.into()));
    }
}
