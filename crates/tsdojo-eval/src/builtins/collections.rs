//! `Map` and `Set`.

use super::{callback, make_iterator, require_new};
use crate::error::EvalResult;
use crate::interpreter::Interpreter;
use crate::value::{CallArgs, Collection, JsValue, NativeFn, Obj, Object, ObjectKind};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Kind {
    Map,
    Set,
}

impl Kind {
    fn name(self) -> &'static str {
        match self {
            Kind::Map => "Map",
            Kind::Set => "Set",
        }
    }
}

pub(super) fn install(interp: &mut Interpreter) {
    let map_proto = interp.realm.map_prototype.clone();
    let map_ctor = interp.make_constructor("Map", 0, map, &map_proto);
    let map_methods: &[(&str, usize, NativeFn)] = &[
        ("get", 1, map_get),
        ("set", 2, map_set),
        ("has", 1, map_has),
        ("delete", 1, map_delete),
        ("clear", 0, map_clear),
        ("forEach", 1, map_for_each),
        ("keys", 0, map_keys),
        ("values", 0, map_values),
        ("entries", 0, map_entries),
    ];
    for &(name, arity, func) in map_methods {
        interp.define_method(&map_proto, name, arity, func);
    }
    interp.define_getter(&map_proto, "size", map_size);
    interp.define_global("Map", JsValue::Object(map_ctor));

    let set_proto = interp.realm.set_prototype.clone();
    let set_ctor = interp.make_constructor("Set", 0, set, &set_proto);
    let set_methods: &[(&str, usize, NativeFn)] = &[
        ("add", 1, set_add),
        ("has", 1, set_has),
        ("delete", 1, set_delete),
        ("clear", 0, set_clear),
        ("forEach", 1, set_for_each),
        ("keys", 0, set_values),
        ("values", 0, set_values),
        ("entries", 0, set_entries),
    ];
    for &(name, arity, func) in set_methods {
        interp.define_method(&set_proto, name, arity, func);
    }
    interp.define_getter(&set_proto, "size", set_size);
    interp.define_global("Set", JsValue::Object(set_ctor));
}

/// Run `f` on the receiver's backing store, which must be of `kind`.
fn with_collection<R>(
    interp: &Interpreter,
    call: &CallArgs,
    kind: Kind,
    method: &str,
    f: impl FnOnce(&mut Collection) -> R,
) -> EvalResult<R> {
    if let Some(obj) = call.this.as_object() {
        let mut object = obj.borrow_mut();
        match (&mut object.kind, kind) {
            (ObjectKind::Map(store), Kind::Map) | (ObjectKind::Set(store), Kind::Set) => {
                return Ok(f(store))
            }
            _ => {}
        }
    }
    Err(interp.type_error(format!(
        "Method {}.prototype.{method} called on incompatible receiver {}",
        kind.name(),
        interp.inspect(&call.this)
    )))
}

fn construct(interp: &mut Interpreter, call: &CallArgs, kind: Kind) -> EvalResult<JsValue> {
    let target = require_new(interp, call, kind.name())?;
    let (fallback, store) = match kind {
        Kind::Map => (
            interp.realm.map_prototype.clone(),
            ObjectKind::Map(Collection::default()),
        ),
        Kind::Set => (
            interp.realm.set_prototype.clone(),
            ObjectKind::Set(Collection::default()),
        ),
    };
    let proto = interp.prototype_for(&target, Some(&fallback))?;
    let obj = Obj::new(Object::new(store, Some(proto)));
    let source = call.arg(0);
    if source.is_nullish() {
        return Ok(JsValue::Object(obj));
    }
    for item in interp.iterate(&source)? {
        let (key, value) = match kind {
            Kind::Set => (item, JsValue::Undefined),
            Kind::Map => {
                if !matches!(item, JsValue::Object(_)) {
                    return Err(interp.type_error(format!(
                        "Iterator value {} is not an entry object",
                        interp.inspect(&item)
                    )));
                }
                let key = interp.get_computed(&item, &JsValue::Number(0.0))?;
                let value = interp.get_computed(&item, &JsValue::Number(1.0))?;
                (key, value)
            }
        };
        match &mut obj.borrow_mut().kind {
            ObjectKind::Map(store) | ObjectKind::Set(store) => store.set(key, value),
            _ => {}
        }
    }
    Ok(JsValue::Object(obj))
}

/// `forEach` that sees entries added during iteration and skips deleted
/// ones.
fn for_each_live(interp: &mut Interpreter, call: &CallArgs, kind: Kind) -> EvalResult<JsValue> {
    let f = callback(interp, call, 0)?;
    let this_arg = call.arg(1);
    let mut i = 0;
    loop {
        let slot = with_collection(interp, call, kind, "forEach", |store| {
            (i < store.slots()).then(|| store.slot(i))
        })?;
        match slot {
            None => break,
            Some(None) => {}
            Some(Some((key, value))) => {
                let args = match kind {
                    Kind::Map => vec![value, key, call.this.clone()],
                    Kind::Set => vec![key.clone(), key, call.this.clone()],
                };
                interp.call(&f, this_arg.clone(), args)?;
            }
        }
        i += 1;
    }
    Ok(JsValue::Undefined)
}

// ── Map ───────────────────────────────────────────────────────────────────────

fn map(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    construct(interp, call, Kind::Map)
}

fn map_get(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let key = call.arg(0);
    let value = with_collection(interp, call, Kind::Map, "get", |store| store.get(&key))?;
    Ok(value.unwrap_or(JsValue::Undefined))
}

fn map_set(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    with_collection(interp, call, Kind::Map, "set", |store| {
        store.set(call.arg(0), call.arg(1))
    })?;
    Ok(call.this.clone())
}

fn map_has(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let key = call.arg(0);
    with_collection(interp, call, Kind::Map, "has", |store| store.has(&key)).map(JsValue::Bool)
}

fn map_delete(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let key = call.arg(0);
    with_collection(interp, call, Kind::Map, "delete", |store| store.delete(&key))
        .map(JsValue::Bool)
}

fn map_clear(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    with_collection(interp, call, Kind::Map, "clear", Collection::clear)?;
    Ok(JsValue::Undefined)
}

fn map_for_each(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    for_each_live(interp, call, Kind::Map)
}

fn map_keys(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let entries = with_collection(interp, call, Kind::Map, "keys", |store| store.entries())?;
    let keys = entries.into_iter().map(|(key, _)| key).collect();
    Ok(make_iterator(interp, keys))
}

fn map_values(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let entries = with_collection(interp, call, Kind::Map, "values", |store| store.entries())?;
    let values = entries.into_iter().map(|(_, value)| value).collect();
    Ok(make_iterator(interp, values))
}

fn map_entries(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let entries = with_collection(interp, call, Kind::Map, "entries", |store| store.entries())?;
    let pairs = entries
        .into_iter()
        .map(|(key, value)| interp.array_value(vec![key, value]))
        .collect();
    Ok(make_iterator(interp, pairs))
}

fn map_size(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    with_collection(interp, call, Kind::Map, "size", |store| store.len()).map(JsValue::from)
}

// ── Set ───────────────────────────────────────────────────────────────────────

fn set(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    construct(interp, call, Kind::Set)
}

fn set_add(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    with_collection(interp, call, Kind::Set, "add", |store| {
        store.set(call.arg(0), JsValue::Undefined)
    })?;
    Ok(call.this.clone())
}

fn set_has(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let key = call.arg(0);
    with_collection(interp, call, Kind::Set, "has", |store| store.has(&key)).map(JsValue::Bool)
}

fn set_delete(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let key = call.arg(0);
    with_collection(interp, call, Kind::Set, "delete", |store| store.delete(&key))
        .map(JsValue::Bool)
}

fn set_clear(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    with_collection(interp, call, Kind::Set, "clear", Collection::clear)?;
    Ok(JsValue::Undefined)
}

fn set_for_each(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    for_each_live(interp, call, Kind::Set)
}

fn set_values(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let entries = with_collection(interp, call, Kind::Set, "values", |store| store.entries())?;
    let values = entries.into_iter().map(|(key, _)| key).collect();
    Ok(make_iterator(interp, values))
}

fn set_entries(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let entries = with_collection(interp, call, Kind::Set, "entries", |store| store.entries())?;
    let pairs = entries
        .into_iter()
        .map(|(key, _)| interp.array_value(vec![key.clone(), key]))
        .collect();
    Ok(make_iterator(interp, pairs))
}

fn set_size(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    with_collection(interp, call, Kind::Set, "size", |store| store.len()).map(JsValue::from)
}
