//! Global values and functions: `console`, timers, `isNaN`, `globalThis`.

use tsdojo_types::format_number;

use super::callback;
use crate::error::EvalResult;
use crate::interpreter::{define_hidden, ConsoleLevel, Interpreter, Job};
use crate::value::{CallArgs, JsValue, NativeFn};

pub(super) fn install(interp: &mut Interpreter) {
    for (name, value) in [
        ("undefined", JsValue::Undefined),
        ("NaN", JsValue::Number(f64::NAN)),
        ("Infinity", JsValue::Number(f64::INFINITY)),
    ] {
        interp.globals.declare(name, value.clone(), false);
        define_hidden(&interp.realm.global_object, name, value);
    }
    let global_object = interp.realm.global_object.clone();
    interp.define_global("globalThis", JsValue::Object(global_object));

    let console = interp.new_intrinsic();
    let levels: &[(&str, NativeFn)] = &[
        ("log", console_log),
        ("info", console_info),
        ("warn", console_warn),
        ("error", console_error),
        ("debug", console_debug),
    ];
    for &(name, func) in levels {
        interp.define_method(&console, name, 0, func);
    }
    interp.define_global("console", JsValue::Object(console));

    let functions: &[(&str, usize, NativeFn)] = &[
        ("isNaN", 1, is_nan),
        ("isFinite", 1, is_finite),
        ("setTimeout", 2, set_timeout),
        ("clearTimeout", 1, clear_timeout),
        ("queueMicrotask", 1, queue_microtask),
    ];
    for &(name, arity, func) in functions {
        let f = interp.make_native(name, arity, func);
        interp.realm.intrinsics.push(f.clone());
        interp.define_global(name, JsValue::Object(f));
    }
}

// ── console ───────────────────────────────────────────────────────────────────

fn emit(interp: &mut Interpreter, call: &CallArgs, level: ConsoleLevel) -> EvalResult<JsValue> {
    let text = format_console(interp, &call.args)?;
    interp.push_console(level, text);
    Ok(JsValue::Undefined)
}

fn console_log(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    emit(interp, call, ConsoleLevel::Log)
}

fn console_info(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    emit(interp, call, ConsoleLevel::Info)
}

fn console_warn(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    emit(interp, call, ConsoleLevel::Warn)
}

fn console_error(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    emit(interp, call, ConsoleLevel::Error)
}

fn console_debug(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    emit(interp, call, ConsoleLevel::Debug)
}

/// Render console arguments the way Node does: a leading string may hold
/// `%s %d %i %f %o %O %j %%` specifiers; everything else is inspected and
/// joined with spaces.
fn format_console(interp: &mut Interpreter, args: &[JsValue]) -> EvalResult<String> {
    let mut parts = Vec::with_capacity(args.len());
    let mut rest = args.iter();
    if let Some(JsValue::String(format)) = args.first() {
        rest.next();
        let mut out = String::with_capacity(format.len());
        let mut chars = format.chars().peekable();
        while let Some(c) = chars.next() {
            if c != '%' {
                out.push(c);
                continue;
            }
            match chars.peek().copied() {
                Some('%') => {
                    chars.next();
                    out.push('%');
                }
                Some(conversion @ ('s' | 'd' | 'i' | 'f' | 'o' | 'O' | 'j')) => {
                    let Some(arg) = rest.next() else {
                        out.push('%');
                        continue;
                    };
                    chars.next();
                    out.push_str(&substitute(interp, conversion, arg)?);
                }
                _ => out.push('%'),
            }
        }
        parts.push(out);
    }
    for arg in rest {
        parts.push(interp.inspect(arg));
    }
    Ok(parts.join(" "))
}

fn substitute(interp: &mut Interpreter, conversion: char, arg: &JsValue) -> EvalResult<String> {
    Ok(match conversion {
        's' => match arg {
            JsValue::String(s) => s.to_string(),
            other => interp.inspect(other),
        },
        'd' | 'i' | 'f' => {
            let n = match arg {
                JsValue::Object(_) => f64::NAN,
                other => interp.to_number(other)?,
            };
            format_number(if conversion == 'f' { n } else { n.trunc() })
        }
        _ => interp.inspect(arg),
    })
}

// ── Numbers ───────────────────────────────────────────────────────────────────

fn is_nan(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    Ok(JsValue::Bool(interp.to_number(&call.arg(0))?.is_nan()))
}

fn is_finite(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    Ok(JsValue::Bool(interp.to_number(&call.arg(0))?.is_finite()))
}

// ── Timers ────────────────────────────────────────────────────────────────────

fn set_timeout(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let f = callback(interp, call, 0)?;
    let delay = match call.arg(1) {
        JsValue::Undefined => 0.0,
        value => interp.to_number(&value)?,
    };
    let delay = if delay.is_nan() || delay < 0.0 {
        0
    } else {
        delay.min(u64::MAX as f64) as u64
    };
    let id = interp.add_timer(f, delay, call.rest(2).to_vec());
    Ok(JsValue::Number(id as f64))
}

fn clear_timeout(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    if let JsValue::Number(id) = call.arg(0) {
        if id >= 0.0 && id.fract() == 0.0 {
            interp.clear_timer(id as u64);
        }
    }
    Ok(JsValue::Undefined)
}

fn queue_microtask(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let f = callback(interp, call, 0)?;
    interp.jobs.push_back(Job::Callback(f));
    Ok(JsValue::Undefined)
}
