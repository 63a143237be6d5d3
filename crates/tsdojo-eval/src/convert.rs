//! Crossing the host boundary: data-model values in and out of the
//! interpreter, error messages, and `console` rendering.

use std::collections::BTreeMap;

use tsdojo_types::{format_number, Value};

use crate::error::EvalResult;
use crate::interpreter::Interpreter;
use crate::value::{Function, JsValue, Obj, ObjectKind, PromiseState, Property, PropertyValue};

/// Nesting below which `console` output abbreviates objects.
const INSPECT_DEPTH: usize = 2;

impl Interpreter {
    /// Build a fresh runtime value from suite data.
    pub fn import_value(&self, value: &Value) -> JsValue {
        match value {
            Value::Undefined => JsValue::Undefined,
            Value::Null => JsValue::Null,
            Value::Bool(b) => JsValue::Bool(*b),
            Value::Number(n) => JsValue::Number(*n),
            Value::String(s) => JsValue::str(s),
            Value::Opaque(description) => JsValue::str(description),
            Value::Array(items) => {
                let items = items.iter().map(|item| self.import_value(item)).collect();
                self.array_value(items)
            }
            Value::Object(entries) => {
                let obj = self.new_object();
                for (key, item) in entries {
                    self.define_own(&obj, key, self.import_value(item));
                }
                JsValue::Object(obj)
            }
        }
    }

    /// Snapshot a runtime value as data. Functions, promises, collections,
    /// regexes and cycles become opaque leaves; dates become their ISO text
    /// (`null` when invalid); getters run.
    pub fn export_value(&mut self, value: &JsValue) -> EvalResult<Value> {
        let mut path = Vec::new();
        self.export_inner(value, &mut path)
    }

    fn export_inner(&mut self, value: &JsValue, path: &mut Vec<usize>) -> EvalResult<Value> {
        let obj = match value {
            JsValue::Undefined => return Ok(Value::Undefined),
            JsValue::Null => return Ok(Value::Null),
            JsValue::Bool(b) => return Ok(Value::Bool(*b)),
            JsValue::Number(n) => return Ok(Value::Number(*n)),
            JsValue::String(s) => return Ok(Value::String(s.to_string())),
            JsValue::Object(obj) => obj,
        };
        if path.contains(&obj.id()) {
            return Ok(Value::Opaque("[Circular]".to_string()));
        }
        if let ObjectKind::Date(time) = obj.borrow().kind {
            return Ok(Interpreter::date_iso(time).map_or(Value::Null, Value::String));
        }
        if let Some(description) = opaque_description(obj) {
            return Ok(Value::Opaque(description));
        }
        path.push(obj.id());
        let result = match obj.array_elements() {
            Some(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in &items {
                    out.push(self.export_inner(item, path)?);
                }
                Value::Array(out)
            }
            None => {
                let mut out = BTreeMap::new();
                for key in self.own_keys(obj) {
                    let item = self.get(value, &key)?;
                    out.insert(key.to_string(), self.export_inner(&item, path)?);
                }
                Value::Object(out)
            }
        };
        path.pop();
        Ok(result)
    }

    /// The text reported for a thrown value or rejection reason: an error's
    /// `message`, otherwise `String(value)`.
    pub fn error_message(&mut self, value: &JsValue) -> String {
        if let JsValue::Object(obj) = value {
            if matches!(obj.borrow().kind, ObjectKind::Error) {
                if let Ok(message) = self.get(value, "message") {
                    if let Ok(text) = self.to_string(&message) {
                        return text.to_string();
                    }
                }
            }
        }
        match self.to_string(value) {
            Ok(text) => text.to_string(),
            Err(_) => self.inspect(value),
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Console rendering
    // ══════════════════════════════════════════════════════════════════════

    /// Render a value the way Node's `console.log` shows it, on one line.
    /// Never runs learner code: accessors print as `[Getter]`.
    pub(crate) fn inspect(&self, value: &JsValue) -> String {
        match value {
            JsValue::String(s) => s.to_string(),
            other => self.inspect_nested(other, 0, &mut Vec::new()),
        }
    }

    fn inspect_nested(&self, value: &JsValue, depth: usize, path: &mut Vec<usize>) -> String {
        let obj = match value {
            JsValue::Undefined => return "undefined".to_string(),
            JsValue::Null => return "null".to_string(),
            JsValue::Bool(b) => return b.to_string(),
            JsValue::Number(n) if *n == 0.0 && n.is_sign_negative() => return "-0".to_string(),
            JsValue::Number(n) => return format_number(*n),
            JsValue::String(s) => return quote(s),
            JsValue::Object(obj) => obj,
        };
        if path.contains(&obj.id()) {
            return "[Circular]".to_string();
        }
        if let Some(function) = obj.function() {
            return function_label(obj, &function);
        }
        path.push(obj.id());
        let text = self.inspect_object(obj, depth, path);
        path.pop();
        text
    }

    fn inspect_object(&self, obj: &Obj, depth: usize, path: &mut Vec<usize>) -> String {
        enum Shape {
            Array(Vec<JsValue>),
            Error,
            Promise(Option<Result<JsValue, JsValue>>),
            Map(Vec<(JsValue, JsValue)>),
            Set(Vec<JsValue>),
            Literal(String),
            Plain,
        }
        let shape = match &obj.borrow().kind {
            ObjectKind::Array(items) => Shape::Array(items.clone()),
            ObjectKind::Error => Shape::Error,
            ObjectKind::Promise(PromiseState::Pending(_)) => Shape::Promise(None),
            ObjectKind::Promise(PromiseState::Fulfilled(v)) => Shape::Promise(Some(Ok(v.clone()))),
            ObjectKind::Promise(PromiseState::Rejected(r)) => Shape::Promise(Some(Err(r.clone()))),
            ObjectKind::Map(map) => Shape::Map(map.entries()),
            ObjectKind::Set(set) => Shape::Set(set.entries().into_iter().map(|(k, _)| k).collect()),
            ObjectKind::RegExp(state) => Shape::Literal(format!("/{}/{}", state.source, state.flags)),
            ObjectKind::Date(time) => Shape::Literal(
                Interpreter::date_iso(*time).unwrap_or_else(|| "Invalid Date".to_string()),
            ),
            _ => Shape::Plain,
        };
        let nested = |value: &JsValue, path: &mut Vec<usize>| {
            self.inspect_nested(value, depth + 1, path)
        };
        match shape {
            Shape::Array(items) => {
                if items.is_empty() {
                    return "[]".to_string();
                }
                if depth > INSPECT_DEPTH {
                    return "[Array]".to_string();
                }
                let parts: Vec<String> = items.iter().map(|item| nested(item, path)).collect();
                format!("[ {} ]", parts.join(", "))
            }
            Shape::Error => {
                let name = self.inherited_string(obj, "name").unwrap_or_else(|| "Error".to_string());
                let message = self.inherited_string(obj, "message").unwrap_or_default();
                if message.is_empty() {
                    name
                } else {
                    format!("{name}: {message}")
                }
            }
            Shape::Promise(state) => match state {
                None => "Promise { <pending> }".to_string(),
                Some(Ok(value)) => format!("Promise {{ {} }}", nested(&value, path)),
                Some(Err(reason)) => format!("Promise {{ <rejected> {} }}", nested(&reason, path)),
            },
            Shape::Map(entries) => {
                if entries.is_empty() {
                    return "Map(0) {}".to_string();
                }
                let parts: Vec<String> = entries
                    .iter()
                    .map(|(k, v)| format!("{} => {}", nested(k, path), nested(v, path)))
                    .collect();
                format!("Map({}) {{ {} }}", entries.len(), parts.join(", "))
            }
            Shape::Set(items) => {
                if items.is_empty() {
                    return "Set(0) {}".to_string();
                }
                let parts: Vec<String> = items.iter().map(|item| nested(item, path)).collect();
                format!("Set({}) {{ {} }}", items.len(), parts.join(", "))
            }
            Shape::Literal(text) => text,
            Shape::Plain => {
                let prefix = self
                    .constructor_name(obj)
                    .filter(|name| name != "Object")
                    .map(|name| format!("{name} "))
                    .unwrap_or_default();
                let keys = self.own_keys(obj);
                if keys.is_empty() {
                    return format!("{prefix}{{}}");
                }
                if depth > INSPECT_DEPTH {
                    let label = self.constructor_name(obj).unwrap_or_else(|| "Object".to_string());
                    return format!("[{label}]");
                }
                let mut parts = Vec::with_capacity(keys.len());
                for key in keys {
                    let prop = obj.borrow().props.get(&key).cloned();
                    let shown = match prop {
                        Some(Property {
                            value: PropertyValue::Data(value),
                            ..
                        }) => nested(&value, path),
                        Some(Property {
                            value: PropertyValue::Accessor { get, set },
                            ..
                        }) => match (get.is_some(), set.is_some()) {
                            (true, true) => "[Getter/Setter]".to_string(),
                            (true, false) => "[Getter]".to_string(),
                            _ => "[Setter]".to_string(),
                        },
                        None => "undefined".to_string(),
                    };
                    parts.push(format!("{}: {shown}", property_label(&key)));
                }
                format!("{prefix}{{ {} }}", parts.join(", "))
            }
        }
    }

    /// A string-valued data property found along the prototype chain.
    fn inherited_string(&self, obj: &Obj, key: &str) -> Option<String> {
        let mut current = Some(obj.clone());
        while let Some(o) = current {
            if let Some(value) = o.own_data(key) {
                return match value {
                    JsValue::String(s) => Some(s.to_string()),
                    _ => None,
                };
            }
            current = o.proto();
        }
        None
    }

    fn constructor_name(&self, obj: &Obj) -> Option<String> {
        let proto = obj.proto()?;
        let ctor = proto.own_data("constructor")?;
        match ctor.as_object()?.own_data("name")? {
            JsValue::String(name) if !name.is_empty() => Some(name.to_string()),
            _ => None,
        }
    }
}

fn opaque_description(obj: &Obj) -> Option<String> {
    if let Some(function) = obj.function() {
        return Some(function_label(obj, &function));
    }
    match &obj.borrow().kind {
        ObjectKind::Promise(_) => Some("[object Promise]".to_string()),
        ObjectKind::Map(map) => Some(format!("[object Map({})]", map.len())),
        ObjectKind::Set(set) => Some(format!("[object Set({})]", set.len())),
        ObjectKind::Iterator(_) => Some("[object Iterator]".to_string()),
        ObjectKind::RegExp(state) => Some(format!("/{}/{}", state.source, state.flags)),
        _ => None,
    }
}

fn function_label(obj: &Obj, function: &Function) -> String {
    let name = match obj.own_data("name") {
        Some(JsValue::String(name)) if !name.is_empty() => Some(name.to_string()),
        _ => None,
    };
    match (function, name) {
        (Function::Class(_), Some(name)) => format!("[class {name}]"),
        (Function::Class(_), None) => "[class (anonymous)]".to_string(),
        (_, Some(name)) => format!("[Function: {name}]"),
        (_, None) => "[Function (anonymous)]".to_string(),
    }
}

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\'' => out.push_str("\\'"),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

fn property_label(key: &str) -> String {
    let mut chars = key.chars();
    let identifier = chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$');
    if identifier || key.bytes().all(|b| b.is_ascii_digit()) && !key.is_empty() {
        key.to_string()
    } else {
        quote(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn property_labels_quote_non_identifiers() {
        assert_eq!(property_label("name"), "name");
        assert_eq!(property_label("$x_1"), "$x_1");
        assert_eq!(property_label("12"), "12");
        assert_eq!(property_label("a-b"), "'a-b'");
        assert_eq!(property_label(""), "''");
    }

    #[test]
    fn quoting_escapes_quotes_and_newlines() {
        assert_eq!(quote("it's"), "'it\\'s'");
        assert_eq!(quote("a\nb"), "'a\\nb'");
    }
}
