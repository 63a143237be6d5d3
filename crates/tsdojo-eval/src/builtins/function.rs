//! `Function.prototype`: `call`, `apply`, `bind`.

use crate::error::EvalResult;
use crate::interpreter::{define_hidden, Interpreter};
use crate::value::{CallArgs, Function, JsValue};

pub(super) fn install(interp: &mut Interpreter) {
    let proto = interp.realm.function_prototype.clone();
    define_hidden(&proto, "name", JsValue::str(""));
    define_hidden(&proto, "length", JsValue::Number(0.0));
    interp.define_method(&proto, "call", 1, call);
    interp.define_method(&proto, "apply", 2, apply);
    interp.define_method(&proto, "bind", 1, bind);
    interp.define_method(&proto, "toString", 0, to_string);
}

fn call(interp: &mut Interpreter, args: &CallArgs) -> EvalResult<JsValue> {
    interp.call(&args.this, args.arg(0), args.rest(1).to_vec())
}

fn apply(interp: &mut Interpreter, args: &CallArgs) -> EvalResult<JsValue> {
    let list = match args.arg(1) {
        JsValue::Undefined | JsValue::Null => Vec::new(),
        list @ JsValue::Object(_) => interp.iterate(&list)?,
        _ => return Err(interp.type_error("CreateListFromArrayLike called on non-object")),
    };
    interp.call(&args.this, args.arg(0), list)
}

fn bind(interp: &mut Interpreter, args: &CallArgs) -> EvalResult<JsValue> {
    let Some(target) = args.this.as_object().filter(|o| o.is_callable()).cloned() else {
        return Err(interp.type_error("Bind must be called on a function"));
    };
    let name = match target.own_data("name") {
        Some(JsValue::String(name)) => name.to_string(),
        _ => String::new(),
    };
    let length = match target.own_data("length") {
        Some(JsValue::Number(n)) => (n as usize).saturating_sub(args.args.len().saturating_sub(1)),
        _ => 0,
    };
    let bound = interp.make_function(
        &format!("bound {name}"),
        length,
        Function::Bound {
            target,
            this: args.arg(0),
            args: args.rest(1).to_vec(),
        },
    );
    Ok(JsValue::Object(bound))
}

fn to_string(interp: &mut Interpreter, args: &CallArgs) -> EvalResult<JsValue> {
    let Some(function) = args.this.as_object().and_then(|o| o.function()) else {
        return Err(interp.type_error("Function.prototype.toString requires that 'this' be a Function"));
    };
    let name = match args.this.as_object().and_then(|o| o.own_data("name")) {
        Some(JsValue::String(name)) => name.to_string(),
        _ => String::new(),
    };
    Ok(JsValue::from(match function {
        Function::Class(_) => format!("class {name} {{ }}"),
        _ => format!("function {name}() {{ [native code] }}"),
    }))
}
