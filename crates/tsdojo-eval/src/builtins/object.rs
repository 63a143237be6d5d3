//! `Object` statics and `Object.prototype`.

use std::rc::Rc;

use crate::call::define_accessor;
use crate::error::EvalResult;
use crate::interpreter::Interpreter;
use crate::ops::{to_boolean, utf16_len};
use crate::value::{CallArgs, JsStr, JsValue, Obj, Object, ObjectKind, Property};

pub(super) fn install(interp: &mut Interpreter) {
    let proto = interp.realm.object_prototype.clone();
    let ctor = interp.make_constructor("Object", 1, object, &proto);

    interp.define_method(&ctor, "keys", 1, keys);
    interp.define_method(&ctor, "values", 1, values);
    interp.define_method(&ctor, "entries", 1, entries);
    interp.define_method(&ctor, "assign", 2, assign);
    interp.define_method(&ctor, "fromEntries", 1, from_entries);
    interp.define_method(&ctor, "freeze", 1, freeze);
    interp.define_method(&ctor, "isFrozen", 1, is_frozen);
    interp.define_method(&ctor, "create", 2, create);
    interp.define_method(&ctor, "getPrototypeOf", 1, get_prototype_of);
    interp.define_method(&ctor, "setPrototypeOf", 2, set_prototype_of);
    interp.define_method(&ctor, "defineProperty", 3, define_property);
    interp.define_method(&ctor, "getOwnPropertyNames", 1, get_own_property_names);

    interp.define_method(&proto, "hasOwnProperty", 1, has_own_property);
    interp.define_method(&proto, "isPrototypeOf", 1, is_prototype_of);
    interp.define_method(&proto, "toString", 0, to_string);
    interp.define_method(&proto, "valueOf", 0, value_of);

    interp.define_global("Object", JsValue::Object(ctor));
}

fn object(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    Ok(match call.arg(0) {
        JsValue::Undefined | JsValue::Null => JsValue::Object(interp.new_object()),
        other => other,
    })
}

/// The object an `Object.*` static operates on; nullish is a `TypeError`.
fn target(interp: &Interpreter, value: &JsValue) -> EvalResult<Option<Obj>> {
    match value {
        JsValue::Undefined | JsValue::Null => {
            Err(interp.type_error("Cannot convert undefined or null to object"))
        }
        JsValue::Object(obj) => Ok(Some(obj.clone())),
        _ => Ok(None),
    }
}

/// Own enumerable keys of any value: string indices for strings, nothing
/// for other primitives.
fn enumerable_keys(interp: &Interpreter, value: &JsValue) -> EvalResult<Vec<JsStr>> {
    match target(interp, value)? {
        Some(obj) => Ok(interp.own_keys(&obj)),
        None => Ok(match value {
            JsValue::String(s) => (0..utf16_len(s)).map(|i| Rc::from(i.to_string())).collect(),
            _ => Vec::new(),
        }),
    }
}

fn keys(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let keys = enumerable_keys(interp, &call.arg(0))?;
    Ok(interp.array_value(keys.into_iter().map(JsValue::String).collect()))
}

fn values(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let source = call.arg(0);
    let mut out = Vec::new();
    for key in enumerable_keys(interp, &source)? {
        out.push(interp.get(&source, &key)?);
    }
    Ok(interp.array_value(out))
}

fn entries(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let source = call.arg(0);
    let mut out = Vec::new();
    for key in enumerable_keys(interp, &source)? {
        let value = interp.get(&source, &key)?;
        out.push(interp.array_value(vec![JsValue::String(key), value]));
    }
    Ok(interp.array_value(out))
}

fn assign(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let target_value = call.arg(0);
    if target(interp, &target_value)?.is_none() {
        return Ok(target_value);
    }
    for source in call.rest(1) {
        if source.is_nullish() {
            continue;
        }
        for key in enumerable_keys(interp, source)? {
            let value = interp.get(source, &key)?;
            interp.set(&target_value, &key, value)?;
        }
    }
    Ok(target_value)
}

fn from_entries(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let out = interp.new_object();
    for entry in interp.iterate(&call.arg(0))? {
        if !matches!(entry, JsValue::Object(_)) {
            return Err(interp.type_error(format!(
                "Iterator value {} is not an entry object",
                interp.describe(&entry)
            )));
        }
        let key = interp.get_computed(&entry, &JsValue::Number(0.0))?;
        let key = interp.to_property_key(&key)?;
        let value = interp.get_computed(&entry, &JsValue::Number(1.0))?;
        interp.define_own(&out, &key, value);
    }
    Ok(JsValue::Object(out))
}

fn freeze(_interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let value = call.arg(0);
    if let JsValue::Object(obj) = &value {
        obj.borrow_mut().frozen = true;
    }
    Ok(value)
}

fn is_frozen(_interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    Ok(JsValue::Bool(match call.arg(0) {
        JsValue::Object(obj) => obj.borrow().frozen,
        _ => true,
    }))
}

fn create(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let proto = match call.arg(0) {
        JsValue::Object(proto) => Some(proto),
        JsValue::Null => None,
        other => {
            return Err(interp.type_error(format!(
                "Object prototype may only be an Object or null: {}",
                interp.describe(&other)
            )))
        }
    };
    let obj = Obj::new(Object::new(ObjectKind::Ordinary, proto));
    if let JsValue::Object(props) = call.arg(1) {
        let descriptors = JsValue::Object(props.clone());
        for key in interp.own_keys(&props) {
            let descriptor = interp.get(&descriptors, &key)?;
            apply_descriptor(interp, &obj, &key, &descriptor)?;
        }
    }
    Ok(JsValue::Object(obj))
}

fn get_prototype_of(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let value = call.arg(0);
    let proto = match target(interp, &value)? {
        Some(obj) => obj.proto(),
        None => match value {
            JsValue::String(_) => Some(interp.realm.string_prototype.clone()),
            JsValue::Number(_) => Some(interp.realm.number_prototype.clone()),
            JsValue::Bool(_) => Some(interp.realm.boolean_prototype.clone()),
            _ => None,
        },
    };
    Ok(proto.map(JsValue::Object).unwrap_or(JsValue::Null))
}

fn set_prototype_of(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let value = call.arg(0);
    let proto = match call.arg(1) {
        JsValue::Object(proto) => Some(proto),
        JsValue::Null => None,
        other => {
            return Err(interp.type_error(format!(
                "Object prototype may only be an Object or null: {}",
                interp.describe(&other)
            )))
        }
    };
    if let Some(obj) = target(interp, &value)? {
        let mut cursor = proto.clone();
        while let Some(p) = cursor {
            if p.ptr_eq(&obj) {
                return Err(interp.type_error("Cyclic __proto__ value"));
            }
            cursor = p.proto();
        }
        obj.borrow_mut().proto = proto;
    }
    Ok(value)
}

fn define_property(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let value = call.arg(0);
    let JsValue::Object(obj) = &value else {
        return Err(interp.type_error("Object.defineProperty called on non-object"));
    };
    let key = interp.to_property_key(&call.arg(1))?;
    apply_descriptor(interp, obj, &key, &call.arg(2))?;
    Ok(value)
}

/// Install a property from a `{ value, get, set, enumerable }` descriptor.
fn apply_descriptor(
    interp: &mut Interpreter,
    obj: &Obj,
    key: &str,
    descriptor: &JsValue,
) -> EvalResult<()> {
    let JsValue::Object(desc) = descriptor else {
        return Err(interp.type_error(format!(
            "Property description must be an object: {}",
            interp.describe(descriptor)
        )));
    };
    let enumerable = to_boolean(&interp.get(descriptor, "enumerable")?);
    let getter = interp.get(descriptor, "get")?;
    let setter = interp.get(descriptor, "set")?;
    if getter.is_callable() || setter.is_callable() {
        define_accessor(
            obj,
            key,
            getter.as_object().cloned(),
            setter.as_object().cloned(),
            enumerable,
        );
        return Ok(());
    }
    let value = if interp.has_property(desc, "value") {
        interp.get(descriptor, "value")?
    } else {
        JsValue::Undefined
    };
    if obj.is_array() && crate::ops::array_index(key).is_some() {
        interp.define_own(obj, key, value);
    } else {
        let property = if enumerable {
            Property::data(value)
        } else {
            Property::hidden(value)
        };
        obj.borrow_mut().props.insert(Rc::from(key), property);
    }
    Ok(())
}

fn get_own_property_names(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let value = call.arg(0);
    let mut names: Vec<JsValue> = enumerable_keys(interp, &value)?
        .into_iter()
        .map(JsValue::String)
        .collect();
    if let JsValue::Object(obj) = &value {
        let object = obj.borrow();
        if obj.is_array() {
            names.push(JsValue::str("length"));
        }
        for (key, prop) in object.props.iter() {
            if !prop.enumerable {
                names.push(JsValue::String(key.clone()));
            }
        }
    }
    Ok(interp.array_value(names))
}

fn has_own_property(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let key = interp.to_property_key(&call.arg(0))?;
    Ok(JsValue::Bool(match &call.this {
        JsValue::Object(obj) => interp.has_own_property(obj, &key),
        JsValue::String(s) => {
            &*key == "length"
                || crate::ops::array_index(&key).is_some_and(|i| i < utf16_len(s))
        }
        JsValue::Undefined | JsValue::Null => {
            return Err(interp.type_error("Cannot convert undefined or null to object"))
        }
        _ => false,
    }))
}

fn is_prototype_of(_interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let candidate = call.arg(0);
    let (JsValue::Object(proto), JsValue::Object(obj)) = (&call.this, &candidate) else {
        return Ok(JsValue::Bool(false));
    };
    let mut current = obj.proto();
    while let Some(p) = current {
        if p.ptr_eq(proto) {
            return Ok(JsValue::Bool(true));
        }
        current = p.proto();
    }
    Ok(JsValue::Bool(false))
}

fn to_string(_interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let tag = match &call.this {
        JsValue::Undefined => "Undefined",
        JsValue::Null => "Null",
        JsValue::Bool(_) => "Boolean",
        JsValue::Number(_) => "Number",
        JsValue::String(_) => "String",
        JsValue::Object(obj) => obj.borrow().kind.class_name(),
    };
    Ok(JsValue::from(format!("[object {tag}]")))
}

fn value_of(_interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    Ok(call.this.clone())
}
