//! `JSON.stringify` and `JSON.parse`.
//!
//! Parsing is delegated to `serde_json` (with `preserve_order`, so keys keep
//! document order); the resulting tree is then rebuilt as runtime values.

use std::fmt::Write as _;

use tsdojo_types::format_number;

use crate::error::EvalResult;
use crate::interpreter::Interpreter;
use crate::ops::to_integer;
use crate::value::{CallArgs, JsStr, JsValue, Obj};

pub(super) fn install(interp: &mut Interpreter) {
    let json = interp.new_intrinsic();
    interp.define_method(&json, "stringify", 3, stringify);
    interp.define_method(&json, "parse", 2, parse);
    interp.define_global("JSON", JsValue::Object(json));
}

// ══════════════════════════════════════════════════════════════════════════════
// stringify
// ══════════════════════════════════════════════════════════════════════════════

enum Replacer {
    None,
    Function(JsValue),
    /// Property allow-list, in order.
    Keys(Vec<JsStr>),
}

struct Serializer {
    replacer: Replacer,
    gap: String,
    indent: String,
    /// Objects currently being serialised.
    stack: Vec<usize>,
}

fn stringify(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let replacer = match call.arg(1) {
        f if f.is_callable() => Replacer::Function(f),
        JsValue::Object(obj) if obj.is_array() => {
            let mut keys: Vec<JsStr> = Vec::new();
            for item in obj.array_elements().unwrap_or_default() {
                if matches!(item, JsValue::String(_) | JsValue::Number(_)) {
                    let key = interp.to_string(&item)?;
                    if !keys.contains(&key) {
                        keys.push(key);
                    }
                }
            }
            Replacer::Keys(keys)
        }
        _ => Replacer::None,
    };
    let gap = match call.arg(2) {
        JsValue::Number(n) => " ".repeat(to_integer(n).clamp(0.0, 10.0) as usize),
        JsValue::String(s) => s.chars().take(10).collect(),
        _ => String::new(),
    };

    let wrapper = interp.new_object();
    interp.define_own(&wrapper, "", call.arg(0));
    let mut serializer = Serializer {
        replacer,
        gap,
        indent: String::new(),
        stack: Vec::new(),
    };
    Ok(match serializer.property(interp, &wrapper, "")? {
        Some(text) => JsValue::from(text),
        None => JsValue::Undefined,
    })
}

impl Serializer {
    /// Serialise `holder[key]`; `None` means the property is skipped.
    fn property(
        &mut self,
        interp: &mut Interpreter,
        holder: &Obj,
        key: &str,
    ) -> EvalResult<Option<String>> {
        let holder_value = JsValue::Object(holder.clone());
        let mut value = interp.get(&holder_value, key)?;
        if let JsValue::Object(_) = value {
            let to_json = interp.get(&value, "toJSON")?;
            if to_json.is_callable() {
                value = interp.call(&to_json, value, vec![JsValue::str(key)])?;
            }
        }
        if let Replacer::Function(f) = &self.replacer {
            let f = f.clone();
            value = interp.call(&f, holder_value, vec![JsValue::str(key), value])?;
        }
        self.value(interp, &value)
    }

    fn value(&mut self, interp: &mut Interpreter, value: &JsValue) -> EvalResult<Option<String>> {
        Ok(Some(match value {
            JsValue::Undefined => return Ok(None),
            JsValue::Null => "null".to_string(),
            JsValue::Bool(b) => b.to_string(),
            JsValue::Number(n) if n.is_finite() => format_number(*n),
            JsValue::Number(_) => "null".to_string(),
            JsValue::String(s) => quote(s),
            JsValue::Object(obj) if obj.is_callable() => return Ok(None),
            JsValue::Object(obj) => {
                if self.stack.contains(&obj.id()) {
                    return Err(interp.type_error("Converting circular structure to JSON"));
                }
                self.stack.push(obj.id());
                let stepback = self.indent.clone();
                self.indent.push_str(&self.gap);
                let result = if obj.is_array() {
                    self.array(interp, obj)
                } else {
                    self.object(interp, obj)
                };
                self.indent = stepback;
                self.stack.pop();
                result?
            }
        }))
    }

    fn array(&mut self, interp: &mut Interpreter, arr: &Obj) -> EvalResult<String> {
        let len = arr.array_elements().map_or(0, |items| items.len());
        let mut parts = Vec::with_capacity(len);
        for i in 0..len {
            let part = self.property(interp, arr, &i.to_string())?;
            parts.push(part.unwrap_or_else(|| "null".to_string()));
        }
        Ok(self.wrap('[', ']', parts))
    }

    fn object(&mut self, interp: &mut Interpreter, obj: &Obj) -> EvalResult<String> {
        let keys = match &self.replacer {
            Replacer::Keys(keys) => keys.clone(),
            _ => interp.own_keys(obj),
        };
        let separator = if self.gap.is_empty() { ":" } else { ": " };
        let mut parts = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(part) = self.property(interp, obj, &key)? {
                parts.push(format!("{}{separator}{part}", quote(&key)));
            }
        }
        Ok(self.wrap('{', '}', parts))
    }

    fn wrap(&self, open: char, close: char, parts: Vec<String>) -> String {
        if parts.is_empty() {
            return format!("{open}{close}");
        }
        if self.gap.is_empty() {
            return format!("{open}{}{close}", parts.join(","));
        }
        let stepback = &self.indent[..self.indent.len() - self.gap.len()];
        let separator = format!(",\n{}", self.indent);
        format!(
            "{open}\n{}{}\n{stepback}{close}",
            self.indent,
            parts.join(&separator)
        )
    }
}

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

// ══════════════════════════════════════════════════════════════════════════════
// parse
// ══════════════════════════════════════════════════════════════════════════════

fn parse(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let text = interp.to_string(&call.arg(0))?;
    let tree: serde_json::Value = match serde_json::from_str(&text) {
        Ok(tree) => tree,
        Err(err) if err.is_eof() => {
            return Err(interp.throw_error("SyntaxError", "Unexpected end of JSON input"))
        }
        Err(err) => {
            return Err(interp.throw_error(
                "SyntaxError",
                format!(
                    "Unexpected token in JSON at line {} column {}",
                    err.line(),
                    err.column()
                ),
            ))
        }
    };
    let value = from_json(interp, &tree);
    let reviver = call.arg(1);
    if !reviver.is_callable() {
        return Ok(value);
    }
    let root = interp.new_object();
    interp.define_own(&root, "", value);
    revive(interp, &reviver, &root, "")
}

fn from_json(interp: &Interpreter, tree: &serde_json::Value) -> JsValue {
    match tree {
        serde_json::Value::Null => JsValue::Null,
        serde_json::Value::Bool(b) => JsValue::Bool(*b),
        serde_json::Value::Number(n) => JsValue::Number(n.as_f64().unwrap_or(f64::NAN)),
        serde_json::Value::String(s) => JsValue::str(s),
        serde_json::Value::Array(items) => {
            interp.array_value(items.iter().map(|item| from_json(interp, item)).collect())
        }
        serde_json::Value::Object(map) => {
            let obj = interp.new_object();
            for (key, value) in map {
                let value = from_json(interp, value);
                interp.define_own(&obj, key, value);
            }
            JsValue::Object(obj)
        }
    }
}

/// Walk `holder[key]` bottom-up through the reviver.
fn revive(interp: &mut Interpreter, reviver: &JsValue, holder: &Obj, key: &str) -> EvalResult<JsValue> {
    let holder_value = JsValue::Object(holder.clone());
    let value = interp.get(&holder_value, key)?;
    if let JsValue::Object(obj) = &value {
        let keys: Vec<JsStr> = match obj.array_elements() {
            Some(items) => (0..items.len()).map(|i| JsStr::from(i.to_string())).collect(),
            None => interp.own_keys(obj),
        };
        for child in keys {
            let revived = revive(interp, reviver, obj, &child)?;
            if revived.is_undefined() {
                interp.delete_property(&value, &child)?;
            } else {
                interp.define_own(obj, &child, revived);
            }
        }
    }
    interp.call(reviver, holder_value, vec![JsValue::str(key), value])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quote_escapes_controls() {
        assert_eq!(quote("a\"b\\c\n"), r#""a\"b\\c\n""#);
        assert_eq!(quote("\u{1}"), r#""\u0001""#);
        assert_eq!(quote("é"), "\"é\"");
    }
}
