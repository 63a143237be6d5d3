//! `Error` and its native subclasses.

use crate::error::EvalResult;
use crate::interpreter::{define_hidden, Interpreter};
use crate::value::{CallArgs, JsValue, NativeFn, Obj, Object, ObjectKind};

const SUBCLASSES: [(&str, NativeFn); 4] = [
    ("TypeError", type_error),
    ("RangeError", range_error),
    ("ReferenceError", reference_error),
    ("SyntaxError", syntax_error),
];

pub(super) fn install(interp: &mut Interpreter) {
    let base = interp.new_intrinsic();
    define_hidden(&base, "name", JsValue::str("Error"));
    define_hidden(&base, "message", JsValue::str(""));
    interp.define_method(&base, "toString", 0, error_to_string);
    interp.realm.error_prototypes.insert("Error", base.clone());
    let error_ctor = interp.make_constructor("Error", 1, error, &base);
    interp.define_global("Error", JsValue::Object(error_ctor.clone()));

    let subclass = |interp: &mut Interpreter, name: &'static str, arity: usize, func: NativeFn| {
        let proto = Obj::new(Object::new(ObjectKind::Ordinary, Some(base.clone())));
        interp.realm.intrinsics.push(proto.clone());
        define_hidden(&proto, "name", JsValue::str(name));
        define_hidden(&proto, "message", JsValue::str(""));
        interp.realm.error_prototypes.insert(name, proto.clone());
        let ctor = interp.make_constructor(name, arity, func, &proto);
        ctor.borrow_mut().proto = Some(error_ctor.clone());
        interp.define_global(name, JsValue::Object(ctor));
    };
    for (name, func) in SUBCLASSES {
        subclass(interp, name, 1, func);
    }
    subclass(interp, "AggregateError", 2, aggregate_error);
}

/// Shared body of the error constructors; callable with or without `new`.
fn build_error(
    interp: &mut Interpreter,
    call: &CallArgs,
    kind: &str,
    message: JsValue,
    options: JsValue,
) -> EvalResult<Obj> {
    let fallback = interp.realm.error_prototypes.get(kind).cloned();
    let proto = match &call.new_target {
        Some(target) => Some(interp.prototype_for(target, fallback.as_ref())?),
        None => fallback,
    };
    let error = Obj::new(Object::new(ObjectKind::Error, proto));
    if !message.is_undefined() {
        let text = interp.to_string(&message)?;
        define_hidden(&error, "message", JsValue::String(text));
    }
    if let JsValue::Object(opts) = &options {
        if interp.has_property(opts, "cause") {
            let cause = interp.get(&options, "cause")?;
            define_hidden(&error, "cause", cause);
        }
    }
    Ok(error)
}

fn error(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    build_error(interp, call, "Error", call.arg(0), call.arg(1)).map(JsValue::Object)
}

fn type_error(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    build_error(interp, call, "TypeError", call.arg(0), call.arg(1)).map(JsValue::Object)
}

fn range_error(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    build_error(interp, call, "RangeError", call.arg(0), call.arg(1)).map(JsValue::Object)
}

fn reference_error(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    build_error(interp, call, "ReferenceError", call.arg(0), call.arg(1)).map(JsValue::Object)
}

fn syntax_error(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    build_error(interp, call, "SyntaxError", call.arg(0), call.arg(1)).map(JsValue::Object)
}

/// `new AggregateError(errors, message)`
fn aggregate_error(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let error = build_error(interp, call, "AggregateError", call.arg(1), call.arg(2))?;
    let errors = interp.iterate(&call.arg(0))?;
    let errors = interp.array_value(errors);
    define_hidden(&error, "errors", errors);
    Ok(JsValue::Object(error))
}

fn error_to_string(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    if !matches!(call.this, JsValue::Object(_)) {
        return Err(interp.type_error("Error.prototype.toString called on non-object"));
    }
    let name = match interp.get(&call.this, "name")? {
        JsValue::Undefined => "Error".into(),
        other => interp.to_string(&other)?,
    };
    let message = match interp.get(&call.this, "message")? {
        JsValue::Undefined => "".into(),
        other => interp.to_string(&other)?,
    };
    Ok(JsValue::from(match (name.is_empty(), message.is_empty()) {
        (true, _) => message.to_string(),
        (false, true) => name.to_string(),
        (false, false) => format!("{name}: {message}"),
    }))
}
