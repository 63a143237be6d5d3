//! `Array`, `Array.prototype` and the shared iterator prototype.
//!
//! Callback-taking methods visit indices below the length the array had
//! when the method started, reading each element live so that callbacks
//! which mutate the array observe the same elements JavaScript would.

use std::cmp::Ordering;

use tsdojo_types::format_number;

use super::{callback, iter_result, make_iterator};
use crate::error::EvalResult;
use crate::interpreter::Interpreter;
use crate::ops::{relative_index, to_boolean, to_integer, utf16_units};
use crate::value::{CallArgs, JsValue, NativeFn, Obj, ObjectKind};

/// Largest length `new Array(n)` and `Array.from` will materialise.
const MAX_DENSE_LENGTH: f64 = 16_777_216.0;

pub(super) fn install(interp: &mut Interpreter) {
    let proto = interp.realm.array_prototype.clone();
    let ctor = interp.make_constructor("Array", 1, array, &proto);
    interp.define_method(&ctor, "isArray", 1, is_array);
    interp.define_method(&ctor, "from", 1, from);
    interp.define_method(&ctor, "of", 0, of);

    let methods: &[(&str, usize, NativeFn)] = &[
        ("push", 1, push),
        ("pop", 0, pop),
        ("shift", 0, shift),
        ("unshift", 1, unshift),
        ("slice", 2, slice),
        ("splice", 2, splice),
        ("concat", 1, concat),
        ("join", 1, join),
        ("reverse", 0, reverse),
        ("indexOf", 1, index_of),
        ("lastIndexOf", 1, last_index_of),
        ("includes", 1, includes),
        ("find", 1, find),
        ("findIndex", 1, find_index),
        ("findLast", 1, find_last),
        ("findLastIndex", 1, find_last_index),
        ("filter", 1, filter),
        ("map", 1, map),
        ("forEach", 1, for_each),
        ("reduce", 1, reduce),
        ("reduceRight", 1, reduce_right),
        ("some", 1, some),
        ("every", 1, every),
        ("sort", 1, sort),
        ("toSorted", 1, to_sorted),
        ("toReversed", 0, to_reversed),
        ("flat", 0, flat),
        ("flatMap", 1, flat_map),
        ("fill", 1, fill),
        ("at", 1, at),
        ("keys", 0, keys),
        ("values", 0, values),
        ("entries", 0, entries),
        ("toString", 0, to_string),
        ("with", 2, with),
        ("copyWithin", 2, copy_within),
        ("toSpliced", 2, to_spliced),
    ];
    for &(name, arity, func) in methods {
        interp.define_method(&proto, name, arity, func);
    }

    let iterator_proto = interp.realm.iterator_prototype.clone();
    interp.define_method(&iterator_proto, "next", 0, iterator_next);

    interp.define_global("Array", JsValue::Object(ctor));
}

// ── Receiver helpers ──────────────────────────────────────────────────────────

fn this_array(interp: &Interpreter, call: &CallArgs, method: &str) -> EvalResult<Obj> {
    match &call.this {
        JsValue::Object(obj) if obj.is_array() => Ok(obj.clone()),
        other => Err(interp.type_error(format!(
            "Array.prototype.{method} called on {}",
            interp.describe(other)
        ))),
    }
}

fn length(arr: &Obj) -> usize {
    match &arr.borrow().kind {
        ObjectKind::Array(items) => items.len(),
        _ => 0,
    }
}

fn snapshot(arr: &Obj) -> Vec<JsValue> {
    arr.array_elements().unwrap_or_default()
}

/// Run `f` on the element vector, refusing frozen arrays.
fn mutate<R>(
    interp: &Interpreter,
    arr: &Obj,
    f: impl FnOnce(&mut Vec<JsValue>) -> R,
) -> EvalResult<R> {
    let mut object = arr.borrow_mut();
    if object.frozen {
        drop(object);
        return Err(interp.type_error("Cannot modify a frozen array"));
    }
    match &mut object.kind {
        ObjectKind::Array(items) => Ok(f(items)),
        _ => Ok(f(&mut Vec::new())),
    }
}

/// The optional relative index in argument `index`, defaulting to `default`.
fn index_arg(
    interp: &mut Interpreter,
    call: &CallArgs,
    index: usize,
    len: usize,
    default: usize,
) -> EvalResult<usize> {
    match call.arg(index) {
        JsValue::Undefined => Ok(default),
        value => Ok(relative_index(interp.to_number(&value)?, len)),
    }
}

/// Calls the callback in argument 0 with `(item, index, array)` for each
/// index, handing its result to `visit` until that returns `false`.
fn each_live(
    interp: &mut Interpreter,
    arr: &Obj,
    call: &CallArgs,
    mut visit: impl FnMut(&mut Interpreter, usize, JsValue, JsValue) -> EvalResult<bool>,
) -> EvalResult<()> {
    let f = callback(interp, call, 0)?;
    let this_arg = call.arg(1);
    let len = length(arr);
    for i in 0..len {
        let item = arr.element_at(i).unwrap_or(JsValue::Undefined);
        let result = interp.call(
            &f,
            this_arg.clone(),
            vec![item.clone(), JsValue::from(i), JsValue::Object(arr.clone())],
        )?;
        if !visit(interp, i, item, result)? {
            break;
        }
    }
    Ok(())
}

// ── Constructor and statics ───────────────────────────────────────────────────

fn array(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let items = match call.args.as_slice() {
        [JsValue::Number(n)] => {
            let n = *n;
            if n < 0.0 || n.fract() != 0.0 || n > u32::MAX as f64 {
                return Err(interp.range_error("Invalid array length"));
            }
            if n > MAX_DENSE_LENGTH {
                return Err(interp.range_error("Array buffer allocation failed"));
            }
            vec![JsValue::Undefined; n as usize]
        }
        args => args.to_vec(),
    };
    let arr = interp.new_array(items);
    if let Some(target) = &call.new_target {
        let fallback = interp.realm.array_prototype.clone();
        let proto = interp.prototype_for(target, Some(&fallback))?;
        arr.borrow_mut().proto = Some(proto);
    }
    Ok(JsValue::Object(arr))
}

fn is_array(_interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    Ok(JsValue::Bool(
        call.arg(0).as_object().is_some_and(|obj| obj.is_array()),
    ))
}

fn of(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    Ok(interp.array_value(call.args.clone()))
}

/// `Array.from(iterableOrArrayLike, mapFn?, thisArg?)`
fn from(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let source = call.arg(0);
    let array_like = match &source {
        JsValue::Object(obj) => matches!(obj.borrow().kind, ObjectKind::Ordinary),
        _ => false,
    };
    let items = if array_like {
        let len = interp.get(&source, "length")?;
        let len = to_integer(interp.to_number(&len)?).max(0.0);
        if len > MAX_DENSE_LENGTH {
            return Err(interp.range_error("Invalid array length"));
        }
        let mut items = Vec::with_capacity(len as usize);
        for i in 0..len as usize {
            items.push(interp.get_computed(&source, &JsValue::from(i))?);
        }
        items
    } else if source.is_nullish() {
        return Err(interp.type_error(format!("{source:?} is not iterable")));
    } else {
        interp.iterate(&source)?
    };

    let map_fn = call.arg(1);
    if map_fn.is_undefined() {
        return Ok(interp.array_value(items));
    }
    let map_fn = callback(interp, call, 1)?;
    let this_arg = call.arg(2);
    let mut out = Vec::with_capacity(items.len());
    for (i, item) in items.into_iter().enumerate() {
        out.push(interp.call(&map_fn, this_arg.clone(), vec![item, JsValue::from(i)])?);
    }
    Ok(interp.array_value(out))
}

// ── Mutators ──────────────────────────────────────────────────────────────────

fn push(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let arr = this_array(interp, call, "push")?;
    let len = mutate(interp, &arr, |items| {
        items.extend(call.args.iter().cloned());
        items.len()
    })?;
    Ok(JsValue::from(len))
}

fn pop(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let arr = this_array(interp, call, "pop")?;
    Ok(mutate(interp, &arr, |items| items.pop())?.unwrap_or(JsValue::Undefined))
}

fn shift(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let arr = this_array(interp, call, "shift")?;
    let first = mutate(interp, &arr, |items| {
        if items.is_empty() {
            None
        } else {
            Some(items.remove(0))
        }
    })?;
    Ok(first.unwrap_or(JsValue::Undefined))
}

fn unshift(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let arr = this_array(interp, call, "unshift")?;
    let len = mutate(interp, &arr, |items| {
        items.splice(0..0, call.args.iter().cloned());
        items.len()
    })?;
    Ok(JsValue::from(len))
}

/// Start and delete count of a `splice`/`toSpliced` call.
fn splice_range(interp: &mut Interpreter, call: &CallArgs, len: usize) -> EvalResult<(usize, usize)> {
    if call.args.is_empty() {
        return Ok((0, 0));
    }
    let start = relative_index(interp.to_number(&call.arg(0))?, len);
    let delete_count = if call.args.len() == 1 {
        len - start
    } else {
        let n = to_integer(interp.to_number(&call.arg(1))?);
        n.clamp(0.0, (len - start) as f64) as usize
    };
    Ok((start, delete_count))
}

fn splice(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let arr = this_array(interp, call, "splice")?;
    let (start, delete_count) = splice_range(interp, call, length(&arr))?;
    let inserts = call.rest(2).to_vec();
    let removed = mutate(interp, &arr, |items| {
        let end = (start + delete_count).min(items.len());
        let start = start.min(end);
        items.splice(start..end, inserts).collect::<Vec<_>>()
    })?;
    Ok(interp.array_value(removed))
}

fn reverse(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let arr = this_array(interp, call, "reverse")?;
    mutate(interp, &arr, |items| items.reverse())?;
    Ok(call.this.clone())
}

fn fill(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let arr = this_array(interp, call, "fill")?;
    let len = length(&arr);
    let start = index_arg(interp, call, 1, len, 0)?;
    let end = index_arg(interp, call, 2, len, len)?;
    let value = call.arg(0);
    mutate(interp, &arr, |items| {
        let end = end.min(items.len());
        for slot in items.iter_mut().take(end).skip(start) {
            *slot = value.clone();
        }
    })?;
    Ok(call.this.clone())
}

fn copy_within(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let arr = this_array(interp, call, "copyWithin")?;
    let len = length(&arr);
    let target = index_arg(interp, call, 0, len, 0)?;
    let start = index_arg(interp, call, 1, len, 0)?;
    let end = index_arg(interp, call, 2, len, len)?;
    mutate(interp, &arr, |items| {
        let source: Vec<JsValue> = items.get(start..end.max(start)).unwrap_or(&[]).to_vec();
        for (offset, value) in source.into_iter().enumerate() {
            match items.get_mut(target + offset) {
                Some(slot) => *slot = value,
                None => break,
            }
        }
    })?;
    Ok(call.this.clone())
}

fn sort(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let arr = this_array(interp, call, "sort")?;
    let sorted = sorted_items(interp, call, snapshot(&arr))?;
    mutate(interp, &arr, |items| *items = sorted)?;
    Ok(call.this.clone())
}

// ── Non-mutating ──────────────────────────────────────────────────────────────

fn slice(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let arr = this_array(interp, call, "slice")?;
    let items = snapshot(&arr);
    let start = index_arg(interp, call, 0, items.len(), 0)?;
    let end = index_arg(interp, call, 1, items.len(), items.len())?;
    let out = items.get(start..end.max(start)).unwrap_or(&[]).to_vec();
    Ok(interp.array_value(out))
}

fn concat(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let arr = this_array(interp, call, "concat")?;
    let mut out = snapshot(&arr);
    for arg in &call.args {
        match arg.as_object().and_then(|obj| obj.array_elements()) {
            Some(items) => out.extend(items),
            None => out.push(arg.clone()),
        }
    }
    Ok(interp.array_value(out))
}

fn join(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let arr = this_array(interp, call, "join")?;
    let separator = match call.arg(0) {
        JsValue::Undefined => ",".into(),
        sep => interp.to_string(&sep)?,
    };
    join_items(interp, &arr, &separator).map(JsValue::from)
}

fn to_string(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let arr = this_array(interp, call, "toString")?;
    join_items(interp, &arr, ",").map(JsValue::from)
}

/// Join with nullish elements rendered empty. An array that (indirectly)
/// contains itself renders as empty at the point of recursion.
fn join_items(interp: &mut Interpreter, arr: &Obj, separator: &str) -> EvalResult<String> {
    if interp.join_stack.contains(&arr.id()) {
        return Ok(String::new());
    }
    interp.join_stack.push(arr.id());
    let result = join_parts(interp, arr, separator);
    interp.join_stack.pop();
    result
}

fn join_parts(interp: &mut Interpreter, arr: &Obj, separator: &str) -> EvalResult<String> {
    let mut out = String::new();
    for (i, item) in snapshot(arr).iter().enumerate() {
        if i > 0 {
            out.push_str(separator);
        }
        if !item.is_nullish() {
            out.push_str(&interp.to_string(item)?);
        }
    }
    Ok(out)
}

fn index_of(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let arr = this_array(interp, call, "indexOf")?;
    let items = snapshot(&arr);
    let start = index_arg(interp, call, 1, items.len(), 0)?;
    let search = call.arg(0);
    let found = items
        .iter()
        .enumerate()
        .skip(start)
        .find(|(_, item)| item.strict_equals(&search));
    Ok(found.map_or(JsValue::Number(-1.0), |(i, _)| JsValue::from(i)))
}

fn last_index_of(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let arr = this_array(interp, call, "lastIndexOf")?;
    let items = snapshot(&arr);
    if items.is_empty() {
        return Ok(JsValue::Number(-1.0));
    }
    let from = if call.args.len() > 1 {
        let n = to_integer(interp.to_number(&call.arg(1))?);
        if n < 0.0 {
            items.len() as f64 + n
        } else {
            n.min(items.len() as f64 - 1.0)
        }
    } else {
        items.len() as f64 - 1.0
    };
    if from < 0.0 {
        return Ok(JsValue::Number(-1.0));
    }
    let search = call.arg(0);
    let found = (0..=from as usize)
        .rev()
        .find(|&i| items[i].strict_equals(&search));
    Ok(found.map_or(JsValue::Number(-1.0), JsValue::from))
}

fn includes(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let arr = this_array(interp, call, "includes")?;
    let items = snapshot(&arr);
    let start = index_arg(interp, call, 1, items.len(), 0)?;
    let search = call.arg(0);
    Ok(JsValue::Bool(
        items.iter().skip(start).any(|item| item.same_value_zero(&search)),
    ))
}

fn at(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let arr = this_array(interp, call, "at")?;
    let len = length(&arr) as f64;
    let n = to_integer(interp.to_number(&call.arg(0))?);
    let index = if n < 0.0 { len + n } else { n };
    if index < 0.0 || index >= len {
        return Ok(JsValue::Undefined);
    }
    Ok(arr.element_at(index as usize).unwrap_or(JsValue::Undefined))
}

fn with(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let arr = this_array(interp, call, "with")?;
    let mut items = snapshot(&arr);
    let len = items.len() as f64;
    let n = to_integer(interp.to_number(&call.arg(0))?);
    let index = if n < 0.0 { len + n } else { n };
    if index < 0.0 || index >= len {
        return Err(interp.range_error(format!("Invalid index : {}", format_number(n))));
    }
    items[index as usize] = call.arg(1);
    Ok(interp.array_value(items))
}

fn to_reversed(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let arr = this_array(interp, call, "toReversed")?;
    let mut items = snapshot(&arr);
    items.reverse();
    Ok(interp.array_value(items))
}

fn to_sorted(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let arr = this_array(interp, call, "toSorted")?;
    let sorted = sorted_items(interp, call, snapshot(&arr))?;
    Ok(interp.array_value(sorted))
}

fn to_spliced(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let arr = this_array(interp, call, "toSpliced")?;
    let mut items = snapshot(&arr);
    let (start, delete_count) = splice_range(interp, call, items.len())?;
    items.splice(start..start + delete_count, call.rest(2).iter().cloned());
    Ok(interp.array_value(items))
}

fn flat(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let arr = this_array(interp, call, "flat")?;
    let depth = match call.arg(0) {
        JsValue::Undefined => 1.0,
        value => to_integer(interp.to_number(&value)?),
    };
    let mut out = Vec::new();
    flatten_into(&mut out, snapshot(&arr), depth);
    Ok(interp.array_value(out))
}

fn flatten_into(out: &mut Vec<JsValue>, items: Vec<JsValue>, depth: f64) {
    for item in items {
        match item.as_object().and_then(|obj| obj.array_elements()) {
            Some(nested) if depth >= 1.0 => flatten_into(out, nested, depth - 1.0),
            _ => out.push(item),
        }
    }
}

fn flat_map(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let arr = this_array(interp, call, "flatMap")?;
    let mut out = Vec::new();
    each_live(interp, &arr, call, |_, _, _, result| {
        match result.as_object().and_then(|obj| obj.array_elements()) {
            Some(items) => out.extend(items),
            None => out.push(result),
        }
        Ok(true)
    })?;
    Ok(interp.array_value(out))
}

fn keys(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let arr = this_array(interp, call, "keys")?;
    let items = (0..length(&arr)).map(JsValue::from).collect();
    Ok(make_iterator(interp, items))
}

fn values(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let arr = this_array(interp, call, "values")?;
    Ok(make_iterator(interp, snapshot(&arr)))
}

fn entries(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let arr = this_array(interp, call, "entries")?;
    let items = snapshot(&arr)
        .into_iter()
        .enumerate()
        .map(|(i, item)| interp.array_value(vec![JsValue::from(i), item]))
        .collect();
    Ok(make_iterator(interp, items))
}

// ── Callback iteration ────────────────────────────────────────────────────────

fn for_each(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let arr = this_array(interp, call, "forEach")?;
    each_live(interp, &arr, call, |_, _, _, _| Ok(true))?;
    Ok(JsValue::Undefined)
}

fn map(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let arr = this_array(interp, call, "map")?;
    let mut out = vec![JsValue::Undefined; length(&arr)];
    each_live(interp, &arr, call, |_, i, _, result| {
        out[i] = result;
        Ok(true)
    })?;
    Ok(interp.array_value(out))
}

fn filter(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let arr = this_array(interp, call, "filter")?;
    let mut out = Vec::new();
    each_live(interp, &arr, call, |_, _, item, result| {
        if to_boolean(&result) {
            out.push(item);
        }
        Ok(true)
    })?;
    Ok(interp.array_value(out))
}

fn find(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let arr = this_array(interp, call, "find")?;
    let mut found = JsValue::Undefined;
    each_live(interp, &arr, call, |_, _, item, result| {
        if to_boolean(&result) {
            found = item;
            return Ok(false);
        }
        Ok(true)
    })?;
    Ok(found)
}

fn find_index(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let arr = this_array(interp, call, "findIndex")?;
    let mut found = JsValue::Number(-1.0);
    each_live(interp, &arr, call, |_, i, _, result| {
        if to_boolean(&result) {
            found = JsValue::from(i);
            return Ok(false);
        }
        Ok(true)
    })?;
    Ok(found)
}

/// Search from the end; returns `(index, item)` of the first match.
fn find_from_end(
    interp: &mut Interpreter,
    call: &CallArgs,
    method: &str,
) -> EvalResult<Option<(usize, JsValue)>> {
    let arr = this_array(interp, call, method)?;
    let f = callback(interp, call, 0)?;
    let this_arg = call.arg(1);
    for i in (0..length(&arr)).rev() {
        let item = arr.element_at(i).unwrap_or(JsValue::Undefined);
        let result = interp.call(
            &f,
            this_arg.clone(),
            vec![item.clone(), JsValue::from(i), JsValue::Object(arr.clone())],
        )?;
        if to_boolean(&result) {
            return Ok(Some((i, item)));
        }
    }
    Ok(None)
}

fn find_last(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    Ok(find_from_end(interp, call, "findLast")?.map_or(JsValue::Undefined, |(_, item)| item))
}

fn find_last_index(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    Ok(find_from_end(interp, call, "findLastIndex")?
        .map_or(JsValue::Number(-1.0), |(i, _)| JsValue::from(i)))
}

fn some(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let arr = this_array(interp, call, "some")?;
    let mut any = false;
    each_live(interp, &arr, call, |_, _, _, result| {
        any = to_boolean(&result);
        Ok(!any)
    })?;
    Ok(JsValue::Bool(any))
}

fn every(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let arr = this_array(interp, call, "every")?;
    let mut all = true;
    each_live(interp, &arr, call, |_, _, _, result| {
        all = to_boolean(&result);
        Ok(all)
    })?;
    Ok(JsValue::Bool(all))
}

fn reduce(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let arr = this_array(interp, call, "reduce")?;
    let f = callback(interp, call, 0)?;
    let len = length(&arr);
    let mut start = 0;
    let mut acc = if call.args.len() >= 2 {
        call.arg(1)
    } else if len == 0 {
        return Err(interp.type_error("Reduce of empty array with no initial value"));
    } else {
        start = 1;
        arr.element_at(0).unwrap_or(JsValue::Undefined)
    };
    for i in start..len {
        let Some(item) = arr.element_at(i) else { break };
        acc = interp.call(
            &f,
            JsValue::Undefined,
            vec![acc, item, JsValue::from(i), JsValue::Object(arr.clone())],
        )?;
    }
    Ok(acc)
}

fn reduce_right(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let arr = this_array(interp, call, "reduceRight")?;
    let f = callback(interp, call, 0)?;
    let len = length(&arr);
    let mut end = len;
    let mut acc = if call.args.len() >= 2 {
        call.arg(1)
    } else if len == 0 {
        return Err(interp.type_error("Reduce of empty array with no initial value"));
    } else {
        end = len - 1;
        arr.element_at(len - 1).unwrap_or(JsValue::Undefined)
    };
    for i in (0..end).rev() {
        let item = arr.element_at(i).unwrap_or(JsValue::Undefined);
        acc = interp.call(
            &f,
            JsValue::Undefined,
            vec![acc, item, JsValue::from(i), JsValue::Object(arr.clone())],
        )?;
    }
    Ok(acc)
}

// ── Sorting ───────────────────────────────────────────────────────────────────

/// Stable sort of `items` using the comparator in argument 0. `undefined`
/// always sorts last and is never passed to the comparator.
fn sorted_items(
    interp: &mut Interpreter,
    call: &CallArgs,
    items: Vec<JsValue>,
) -> EvalResult<Vec<JsValue>> {
    let comparator = call.arg(0);
    if !comparator.is_undefined() && !comparator.is_callable() {
        return Err(interp.type_error(
            "The comparison function must be either a function or undefined",
        ));
    }
    let (mut defined, undefined): (Vec<JsValue>, Vec<JsValue>) =
        items.into_iter().partition(|item| !item.is_undefined());
    merge_sort(interp, &comparator, &mut defined)?;
    defined.extend(undefined);
    Ok(defined)
}

fn compare(interp: &mut Interpreter, comparator: &JsValue, a: &JsValue, b: &JsValue) -> EvalResult<Ordering> {
    if comparator.is_undefined() {
        let a = utf16_units(&interp.to_string(a)?);
        let b = utf16_units(&interp.to_string(b)?);
        return Ok(a.cmp(&b));
    }
    let result = interp.call(comparator, JsValue::Undefined, vec![a.clone(), b.clone()])?;
    let n = interp.to_number(&result)?;
    Ok(if n < 0.0 {
        Ordering::Less
    } else if n > 0.0 {
        Ordering::Greater
    } else {
        Ordering::Equal
    })
}

/// Bottom-up merge sort; the comparator may throw, so `slice::sort_by`
/// cannot be used.
fn merge_sort(interp: &mut Interpreter, comparator: &JsValue, items: &mut Vec<JsValue>) -> EvalResult<()> {
    let len = items.len();
    let mut width = 1;
    while width < len {
        let mut merged = Vec::with_capacity(len);
        let mut lo = 0;
        while lo < len {
            let mid = (lo + width).min(len);
            let hi = (lo + 2 * width).min(len);
            let (mut i, mut j) = (lo, mid);
            while i < mid && j < hi {
                if compare(interp, comparator, &items[j], &items[i])? == Ordering::Less {
                    merged.push(items[j].clone());
                    j += 1;
                } else {
                    merged.push(items[i].clone());
                    i += 1;
                }
            }
            merged.extend_from_slice(&items[i..mid]);
            merged.extend_from_slice(&items[j..hi]);
            lo = hi;
        }
        *items = merged;
        width *= 2;
    }
    Ok(())
}

// ── Iterators ─────────────────────────────────────────────────────────────────

fn iterator_next(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let Some(obj) = call.this.as_object() else {
        return Err(interp.type_error("next method called on incompatible receiver"));
    };
    let next = match &mut obj.borrow_mut().kind {
        ObjectKind::Iterator(state) => {
            let item = state.items.get(state.pos).cloned();
            if item.is_some() {
                state.pos += 1;
            }
            Some(item)
        }
        _ => None,
    };
    match next {
        Some(Some(item)) => Ok(iter_result(interp, item, false)),
        Some(None) => Ok(iter_result(interp, JsValue::Undefined, true)),
        None => Err(interp.type_error("next method called on incompatible receiver")),
    }
}
