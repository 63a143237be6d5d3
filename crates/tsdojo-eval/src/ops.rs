//! Abstract operations: type conversions, equality and property access.

use std::rc::Rc;

use tsdojo_types::format_number;

use crate::error::EvalResult;
use crate::interpreter::Interpreter;
use crate::value::{Function, JsStr, JsValue, Obj, ObjectKind, Property, PropertyValue};

/// Longest gap an index write may open in an array.
const MAX_ARRAY_GROWTH: usize = 1 << 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Hint {
    Default,
    Number,
    String,
}

// ── Free helpers ──────────────────────────────────────────────────────────────

pub fn to_boolean(value: &JsValue) -> bool {
    match value {
        JsValue::Undefined | JsValue::Null => false,
        JsValue::Bool(b) => *b,
        JsValue::Number(n) => !(n.is_nan() || *n == 0.0),
        JsValue::String(s) => !s.is_empty(),
        JsValue::Object(_) => true,
    }
}

/// Longest string, in bytes, that concatenation and `repeat` will build.
pub(crate) const MAX_STRING_LENGTH: usize = 1 << 29;

fn is_js_whitespace(c: char) -> bool {
    c.is_whitespace() || c == '\u{feff}'
}

pub(crate) fn trim_js(s: &str) -> &str {
    s.trim_matches(is_js_whitespace)
}

pub(crate) fn trim_js_start(s: &str) -> &str {
    s.trim_start_matches(is_js_whitespace)
}

pub(crate) fn trim_js_end(s: &str) -> &str {
    s.trim_end_matches(is_js_whitespace)
}

/// `Number(string)`: the whole trimmed text must be a numeric literal.
pub fn string_to_number(s: &str) -> f64 {
    let text = trim_js(s);
    if text.is_empty() {
        return 0.0;
    }
    match text {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    for (prefix, radix) in [("0x", 16), ("0X", 16), ("0o", 8), ("0O", 8), ("0b", 2), ("0B", 2)] {
        if let Some(digits) = text.strip_prefix(prefix) {
            return parse_radix_digits(digits, radix).unwrap_or(f64::NAN);
        }
    }
    if !is_decimal_literal(text) {
        return f64::NAN;
    }
    text.parse::<f64>().unwrap_or(f64::NAN)
}

fn parse_radix_digits(digits: &str, radix: u32) -> Option<f64> {
    if digits.is_empty() {
        return None;
    }
    let mut value = 0f64;
    for c in digits.chars() {
        value = value * radix as f64 + c.to_digit(radix)? as f64;
    }
    Some(value)
}

fn is_decimal_literal(text: &str) -> bool {
    let bytes = text.as_bytes();
    let mut i = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        i += 1;
    }
    let mut digits = 0;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
        digits += 1;
    }
    if i < bytes.len() && bytes[i] == b'.' {
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
            digits += 1;
        }
    }
    if digits == 0 {
        return false;
    }
    if i < bytes.len() && matches!(bytes[i], b'e' | b'E') {
        i += 1;
        if matches!(bytes.get(i), Some(b'+' | b'-')) {
            i += 1;
        }
        let start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i == start {
            return false;
        }
    }
    i == bytes.len()
}

/// ToIntegerOrInfinity.
pub fn to_integer(n: f64) -> f64 {
    if n.is_nan() {
        0.0
    } else {
        n.trunc()
    }
}

pub fn to_uint32(n: f64) -> u32 {
    if !n.is_finite() {
        return 0;
    }
    let modulo = n.trunc().rem_euclid(4_294_967_296.0);
    modulo as u32
}

pub fn to_int32(n: f64) -> i32 {
    to_uint32(n) as i32
}

/// The canonical array index a property key names, if any.
pub fn array_index(key: &str) -> Option<usize> {
    let bytes = key.as_bytes();
    if bytes.is_empty() || !bytes.iter().all(u8::is_ascii_digit) {
        return None;
    }
    if bytes.len() > 1 && bytes[0] == b'0' {
        return None;
    }
    let n: u64 = key.parse().ok()?;
    (n < u32::MAX as u64).then_some(n as usize)
}

pub(crate) fn index_from_number(n: f64) -> Option<usize> {
    (n >= 0.0 && n.fract() == 0.0 && n < u32::MAX as f64).then_some(n as usize)
}

/// Resolve a relative index (`slice`, `at`, ...) against `len`.
pub(crate) fn relative_index(n: f64, len: usize) -> usize {
    let n = to_integer(n);
    if n < 0.0 {
        (len as f64 + n).max(0.0) as usize
    } else {
        n.min(len as f64) as usize
    }
}

pub(crate) fn utf16_units(s: &str) -> Vec<u16> {
    s.encode_utf16().collect()
}

pub(crate) fn utf16_len(s: &str) -> usize {
    s.encode_utf16().count()
}

pub(crate) fn from_units(units: &[u16]) -> String {
    String::from_utf16_lossy(units)
}

// ══════════════════════════════════════════════════════════════════════════════
// Conversions
// ══════════════════════════════════════════════════════════════════════════════

impl Interpreter {
    pub(crate) fn to_primitive(&mut self, value: &JsValue, hint: Hint) -> EvalResult<JsValue> {
        let JsValue::Object(obj) = value else {
            return Ok(value.clone());
        };
        let date_default = hint == Hint::Default && matches!(obj.borrow().kind, ObjectKind::Date(_));
        let order = if hint == Hint::String || date_default {
            ["toString", "valueOf"]
        } else {
            ["valueOf", "toString"]
        };
        for name in order {
            let method = self.get_from(obj, name, value)?;
            if method.is_callable() {
                let result = self.call(&method, value.clone(), Vec::new())?;
                if !matches!(result, JsValue::Object(_)) {
                    return Ok(result);
                }
            }
        }
        Err(self.type_error("Cannot convert object to primitive value"))
    }

    pub(crate) fn to_number(&mut self, value: &JsValue) -> EvalResult<f64> {
        Ok(match value {
            JsValue::Undefined => f64::NAN,
            JsValue::Null => 0.0,
            JsValue::Bool(b) => f64::from(u8::from(*b)),
            JsValue::Number(n) => *n,
            JsValue::String(s) => string_to_number(s),
            JsValue::Object(_) => {
                let primitive = self.to_primitive(value, Hint::Number)?;
                return self.to_number(&primitive);
            }
        })
    }

    pub(crate) fn to_string(&mut self, value: &JsValue) -> EvalResult<JsStr> {
        Ok(match value {
            JsValue::Undefined => Rc::from("undefined"),
            JsValue::Null => Rc::from("null"),
            JsValue::Bool(b) => Rc::from(if *b { "true" } else { "false" }),
            JsValue::Number(n) => Rc::from(format_number(*n)),
            JsValue::String(s) => s.clone(),
            JsValue::Object(_) => {
                let primitive = self.to_primitive(value, Hint::String)?;
                return self.to_string(&primitive);
            }
        })
    }

    pub(crate) fn to_property_key(&mut self, value: &JsValue) -> EvalResult<JsStr> {
        self.to_string(value)
    }

    /// `==`
    pub(crate) fn loose_equals(&mut self, a: &JsValue, b: &JsValue) -> EvalResult<bool> {
        use JsValue as V;
        Ok(match (a, b) {
            (V::Undefined | V::Null, V::Undefined | V::Null) => true,
            (V::Undefined | V::Null, _) | (_, V::Undefined | V::Null) => false,
            (V::Number(x), V::String(s)) => *x == string_to_number(s),
            (V::String(s), V::Number(x)) => string_to_number(s) == *x,
            (V::Bool(x), _) => {
                return self.loose_equals(&V::Number(f64::from(u8::from(*x))), b);
            }
            (_, V::Bool(y)) => {
                return self.loose_equals(a, &V::Number(f64::from(u8::from(*y))));
            }
            (V::Object(_), V::Number(_) | V::String(_)) => {
                let primitive = self.to_primitive(a, Hint::Default)?;
                return self.loose_equals(&primitive, b);
            }
            (V::Number(_) | V::String(_), V::Object(_)) => {
                let primitive = self.to_primitive(b, Hint::Default)?;
                return self.loose_equals(a, &primitive);
            }
            _ => a.strict_equals(b),
        })
    }

    /// A short rendering of a value for error messages.
    pub(crate) fn describe(&self, value: &JsValue) -> String {
        match value {
            JsValue::String(s) => format!("\"{s}\""),
            JsValue::Object(obj) if obj.is_callable() => {
                let name = obj
                    .own_data("name")
                    .and_then(|n| match n {
                        JsValue::String(s) if !s.is_empty() => Some(s.to_string()),
                        _ => None,
                    })
                    .unwrap_or_else(|| "anonymous".to_string());
                format!("function {name}")
            }
            JsValue::Object(obj) if obj.is_array() => "array".to_string(),
            JsValue::Object(_) => "object".to_string(),
            other => format!("{other:?}"),
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Property access
    // ══════════════════════════════════════════════════════════════════════

    fn primitive_prototype(&self, value: &JsValue) -> Option<Obj> {
        match value {
            JsValue::String(_) => Some(self.realm.string_prototype.clone()),
            JsValue::Number(_) => Some(self.realm.number_prototype.clone()),
            JsValue::Bool(_) => Some(self.realm.boolean_prototype.clone()),
            _ => None,
        }
    }

    /// `base[key]` for any base value.
    pub(crate) fn get(&mut self, base: &JsValue, key: &str) -> EvalResult<JsValue> {
        match base {
            JsValue::Undefined | JsValue::Null => Err(self.type_error(format!(
                "Cannot read properties of {base:?} (reading '{key}')"
            ))),
            JsValue::Object(obj) => self.get_from(obj, key, base),
            JsValue::String(s) => {
                if key == "length" {
                    return Ok(JsValue::from(utf16_len(s)));
                }
                if let Some(i) = array_index(key) {
                    let units = utf16_units(s);
                    return Ok(units
                        .get(i)
                        .map(|u| JsValue::from(from_units(&[*u])))
                        .unwrap_or(JsValue::Undefined));
                }
                let proto = self.realm.string_prototype.clone();
                self.get_from(&proto, key, base)
            }
            _ => match self.primitive_prototype(base) {
                Some(proto) => self.get_from(&proto, key, base),
                None => Ok(JsValue::Undefined),
            },
        }
    }

    /// `base[key]` where the key is an arbitrary value.
    pub(crate) fn get_computed(&mut self, base: &JsValue, key: &JsValue) -> EvalResult<JsValue> {
        if let (JsValue::Object(obj), JsValue::Number(n)) = (base, key) {
            if let Some(i) = index_from_number(*n) {
                if let ObjectKind::Array(items) = &obj.borrow().kind {
                    return Ok(items.get(i).cloned().unwrap_or(JsValue::Undefined));
                }
            }
        }
        if base.is_nullish() {
            let shown = match key {
                JsValue::String(s) => s.to_string(),
                other => format!("{other:?}"),
            };
            return Err(self.type_error(format!(
                "Cannot read properties of {base:?} (reading '{shown}')"
            )));
        }
        let key = self.to_property_key(key)?;
        self.get(base, &key)
    }

    /// Look `key` up along the prototype chain of `obj`, running getters
    /// against `receiver`.
    pub(crate) fn get_from(
        &mut self,
        obj: &Obj,
        key: &str,
        receiver: &JsValue,
    ) -> EvalResult<JsValue> {
        enum Found {
            Value(JsValue),
            Getter(Option<Obj>),
            Next(Option<Obj>),
        }
        let mut current = obj.clone();
        loop {
            let found = {
                let object = current.borrow();
                if let ObjectKind::Array(items) = &object.kind {
                    if key == "length" {
                        return Ok(JsValue::from(items.len()));
                    }
                    if let Some(i) = array_index(key) {
                        if let Some(item) = items.get(i) {
                            return Ok(item.clone());
                        }
                    }
                }
                match object.props.get(key) {
                    Some(Property {
                        value: PropertyValue::Data(value),
                        ..
                    }) => Found::Value(value.clone()),
                    Some(Property {
                        value: PropertyValue::Accessor { get, .. },
                        ..
                    }) => Found::Getter(get.clone()),
                    None => Found::Next(object.proto.clone()),
                }
            };
            match found {
                Found::Value(value) => return Ok(value),
                Found::Getter(Some(getter)) => {
                    return self.call(&JsValue::Object(getter), receiver.clone(), Vec::new())
                }
                Found::Getter(None) | Found::Next(None) => return Ok(JsValue::Undefined),
                Found::Next(Some(proto)) => current = proto,
            }
        }
    }

    /// `base[key] = value`.
    pub(crate) fn set(&mut self, base: &JsValue, key: &str, value: JsValue) -> EvalResult<()> {
        match base {
            JsValue::Undefined | JsValue::Null => Err(self.type_error(format!(
                "Cannot set properties of {base:?} (setting '{key}')"
            ))),
            JsValue::Object(obj) => self.set_on(obj, key, value, base),
            // Writes to primitives are discarded.
            _ => Ok(()),
        }
    }

    pub(crate) fn set_computed(
        &mut self,
        base: &JsValue,
        key: &JsValue,
        value: JsValue,
    ) -> EvalResult<()> {
        if let (JsValue::Object(obj), JsValue::Number(n)) = (base, key) {
            if let Some(i) = index_from_number(*n) {
                if obj.is_array() {
                    return self.set_element(obj, i, value);
                }
            }
        }
        if base.is_nullish() {
            let shown = format!("{key:?}");
            return Err(self.type_error(format!(
                "Cannot set properties of {base:?} (setting '{}')",
                shown.trim_matches('"')
            )));
        }
        let key = self.to_property_key(key)?;
        self.set(base, &key, value)
    }

    fn set_element(&mut self, obj: &Obj, index: usize, value: JsValue) -> EvalResult<()> {
        let mut object = obj.borrow_mut();
        if object.frozen {
            drop(object);
            return Err(self.type_error(format!(
                "Cannot assign to read only property '{index}' of object"
            )));
        }
        if let ObjectKind::Array(items) = &mut object.kind {
            if index >= items.len() {
                if index - items.len() > MAX_ARRAY_GROWTH {
                    drop(object);
                    return Err(self.range_error("Invalid array length"));
                }
                items.resize(index + 1, JsValue::Undefined);
            }
            items[index] = value;
        }
        Ok(())
    }

    pub(crate) fn set_on(
        &mut self,
        obj: &Obj,
        key: &str,
        value: JsValue,
        receiver: &JsValue,
    ) -> EvalResult<()> {
        if obj.is_array() {
            if let Some(i) = array_index(key) {
                return self.set_element(obj, i, value);
            }
            if key == "length" {
                let n = self.to_number(&value)?;
                let len = match index_from_number(n) {
                    Some(len) if len <= MAX_ARRAY_GROWTH => len,
                    _ => return Err(self.range_error("Invalid array length")),
                };
                if obj.borrow().frozen {
                    return Err(self.type_error(
                        "Cannot assign to read only property 'length' of object",
                    ));
                }
                if let ObjectKind::Array(items) = &mut obj.borrow_mut().kind {
                    items.resize(len, JsValue::Undefined);
                }
                return Ok(());
            }
        }

        match self.find_accessor(obj, key) {
            Some(Some(setter)) => {
                self.call(&JsValue::Object(setter), receiver.clone(), vec![value])?;
                Ok(())
            }
            Some(None) => Err(self.type_error(format!(
                "Cannot set property {key} of {} which has only a getter",
                self.describe(receiver)
            ))),
            None => {
                let mut object = obj.borrow_mut();
                if object.frozen {
                    drop(object);
                    return Err(self.type_error(format!(
                        "Cannot assign to read only property '{key}' of object"
                    )));
                }
                match object.props.get_mut(key) {
                    Some(prop) => prop.value = PropertyValue::Data(value),
                    None => object.props.insert(Rc::from(key), Property::data(value)),
                }
                Ok(())
            }
        }
    }

    /// The accessor `key` resolves to: `Some(setter)` for an accessor
    /// (which may lack a setter), `None` when a data property or nothing
    /// is found first.
    fn find_accessor(&self, obj: &Obj, key: &str) -> Option<Option<Obj>> {
        let mut current = Some(obj.clone());
        while let Some(o) = current {
            let object = o.borrow();
            match object.props.get(key) {
                Some(Property {
                    value: PropertyValue::Accessor { set, .. },
                    ..
                }) => return Some(set.clone()),
                Some(_) => return None,
                None => current = object.proto.clone(),
            }
        }
        None
    }

    /// Define or overwrite an own data property, bypassing setters.
    pub(crate) fn define_own(&self, obj: &Obj, key: &str, value: JsValue) {
        let mut object = obj.borrow_mut();
        if let ObjectKind::Array(items) = &mut object.kind {
            if let Some(i) = array_index(key) {
                if i >= items.len() {
                    items.resize(i + 1, JsValue::Undefined);
                }
                items[i] = value;
                return;
            }
        }
        object.props.insert(Rc::from(key), Property::data(value));
    }

    pub(crate) fn delete_property(&mut self, base: &JsValue, key: &str) -> EvalResult<bool> {
        let JsValue::Object(obj) = base else {
            if base.is_nullish() {
                return Err(self.type_error(format!(
                    "Cannot convert undefined or null to object (deleting '{key}')"
                )));
            }
            return Ok(true);
        };
        let mut object = obj.borrow_mut();
        if object.frozen {
            drop(object);
            return Err(self.type_error(format!("Cannot delete property '{key}' of object")));
        }
        if let ObjectKind::Array(items) = &mut object.kind {
            if let Some(i) = array_index(key) {
                if let Some(slot) = items.get_mut(i) {
                    *slot = JsValue::Undefined;
                }
                return Ok(true);
            }
        }
        object.props.remove(key);
        Ok(true)
    }

    /// `key in obj`, walking the prototype chain.
    pub(crate) fn has_property(&self, obj: &Obj, key: &str) -> bool {
        let mut current = Some(obj.clone());
        while let Some(o) = current {
            let object = o.borrow();
            if let ObjectKind::Array(items) = &object.kind {
                if key == "length" || array_index(key).is_some_and(|i| i < items.len()) {
                    return true;
                }
            }
            if object.props.contains(key) {
                return true;
            }
            current = object.proto.clone();
        }
        false
    }

    pub(crate) fn has_own_property(&self, obj: &Obj, key: &str) -> bool {
        let object = obj.borrow();
        if let ObjectKind::Array(items) = &object.kind {
            if key == "length" || array_index(key).is_some_and(|i| i < items.len()) {
                return true;
            }
        }
        object.props.contains(key)
    }

    /// Own enumerable string keys: integer keys ascending, then the rest in
    /// insertion order.
    pub(crate) fn own_keys(&self, obj: &Obj) -> Vec<JsStr> {
        let object = obj.borrow();
        let mut keys: Vec<JsStr> = Vec::new();
        if let ObjectKind::Array(items) = &object.kind {
            keys.extend((0..items.len()).map(|i| Rc::from(i.to_string())));
        }
        let mut indexed: Vec<(usize, JsStr)> = Vec::new();
        let mut named: Vec<JsStr> = Vec::new();
        for (key, prop) in object.props.iter() {
            if !prop.enumerable {
                continue;
            }
            match array_index(key) {
                Some(i) => indexed.push((i, key.clone())),
                None => named.push(key.clone()),
            }
        }
        indexed.sort_by_key(|(i, _)| *i);
        keys.extend(indexed.into_iter().map(|(_, k)| k));
        keys.extend(named);
        keys
    }

    /// Keys visited by `for…in`: own keys first, then inherited enumerable keys.
    pub(crate) fn for_in_keys(&self, obj: &Obj) -> Vec<JsStr> {
        let mut keys = self.own_keys(obj);
        let mut current = obj.proto();
        while let Some(proto) = current {
            for key in self.own_keys(&proto) {
                if !keys.contains(&key) {
                    keys.push(key);
                }
            }
            current = proto.proto();
        }
        keys
    }

    /// Everything `for…of` and spread visit, snapshotted up front.
    pub(crate) fn iterate(&mut self, value: &JsValue) -> EvalResult<Vec<JsValue>> {
        if let JsValue::String(s) = value {
            return Ok(s.chars().map(|c| JsValue::from(c.to_string())).collect());
        }
        let items = value.as_object().and_then(|obj| {
            let mut object = obj.borrow_mut();
            match &mut object.kind {
                ObjectKind::Array(items) => Some(items.clone()),
                ObjectKind::Set(set) => Some(set.entries().into_iter().map(|(k, _)| k).collect()),
                ObjectKind::Map(_) => None,
                ObjectKind::Iterator(state) => {
                    let rest = state.items.get(state.pos..).unwrap_or(&[]).to_vec();
                    state.pos = state.items.len();
                    Some(rest)
                }
                _ => None,
            }
        });
        if let Some(items) = items {
            return Ok(items);
        }
        if let Some(obj) = value.as_object() {
            let pairs = match &obj.borrow().kind {
                ObjectKind::Map(map) => Some(map.entries()),
                _ => None,
            };
            if let Some(pairs) = pairs {
                return Ok(pairs
                    .into_iter()
                    .map(|(k, v)| self.array_value(vec![k, v]))
                    .collect());
            }
        }
        let shown = match value {
            JsValue::Object(obj) if obj.is_callable() => self.describe(value),
            JsValue::Object(_) => "object".to_string(),
            JsValue::Number(_) | JsValue::Bool(_) => {
                format!("{} {value:?}", value.type_of())
            }
            other => format!("{other:?}"),
        };
        Err(self.type_error(format!("{shown} is not iterable")))
    }

    /// `value instanceof ctor`.
    pub(crate) fn instance_of(&mut self, value: &JsValue, ctor: &JsValue) -> EvalResult<bool> {
        let Some(mut ctor_obj) = ctor.as_object().filter(|o| o.is_callable()).cloned() else {
            return Err(self.type_error("Right-hand side of 'instanceof' is not callable"));
        };
        while let Some(Function::Bound { target, .. }) = ctor_obj.function() {
            ctor_obj = target;
        }
        let JsValue::Object(obj) = value else {
            return Ok(false);
        };
        let proto = self.get_from(&ctor_obj, "prototype", ctor)?;
        let JsValue::Object(proto) = proto else {
            return Err(self.type_error(
                "Function has non-object prototype in instanceof check",
            ));
        };
        let mut current = obj.proto();
        while let Some(p) = current {
            if p.ptr_eq(&proto) {
                return Ok(true);
            }
            current = p.proto();
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_strings_follow_number_conversion() {
        assert_eq!(string_to_number("  42 "), 42.0);
        assert_eq!(string_to_number(""), 0.0);
        assert_eq!(string_to_number("0x1F"), 31.0);
        assert_eq!(string_to_number("1e3"), 1000.0);
        assert_eq!(string_to_number(".5"), 0.5);
        assert_eq!(string_to_number("-Infinity"), f64::NEG_INFINITY);
        assert!(string_to_number("12px").is_nan());
        assert!(string_to_number("inf").is_nan());
        assert!(string_to_number("1_000").is_nan());
        assert!(string_to_number(".").is_nan());
    }

    #[test]
    fn int32_wraps_modulo_two_pow_32() {
        assert_eq!(to_int32(4_294_967_297.0), 1);
        assert_eq!(to_int32(2_147_483_648.0), -2_147_483_648);
        assert_eq!(to_int32(-1.5), -1);
        assert_eq!(to_uint32(-1.0), 4_294_967_295);
        assert_eq!(to_int32(f64::NAN), 0);
    }

    #[test]
    fn array_indices_are_canonical() {
        assert_eq!(array_index("0"), Some(0));
        assert_eq!(array_index("17"), Some(17));
        assert_eq!(array_index("01"), None);
        assert_eq!(array_index("-1"), None);
        assert_eq!(array_index("1.5"), None);
        assert_eq!(array_index(""), None);
    }

    #[test]
    fn relative_indices_clamp() {
        assert_eq!(relative_index(-1.0, 5), 4);
        assert_eq!(relative_index(-10.0, 5), 0);
        assert_eq!(relative_index(9.0, 5), 5);
        assert_eq!(relative_index(f64::NAN, 5), 0);
    }
}
