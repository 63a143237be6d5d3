//! `RegExp` and the matching shared with the regex-aware string methods.
//!
//! Patterns compile to the `regex` crate's syntax after a light rewrite of
//! JavaScript-only escapes. Lookaround and backreferences have no
//! counterpart there and report as invalid patterns. Match positions are
//! UTF-16 code units, converted at the byte boundary.

use regex::RegexBuilder;

use crate::error::EvalResult;
use crate::interpreter::{define_hidden, Interpreter};
use crate::ops::{to_integer, utf16_len};
use crate::value::{CallArgs, JsValue, NativeFn, Obj, Object, ObjectKind, RegExpState};

/// Accepted flags in canonical order.
const FLAGS: &str = "dgimsuy";

pub(super) fn install(interp: &mut Interpreter) {
    let proto = interp.realm.regexp_prototype.clone();
    let ctor = interp.make_constructor("RegExp", 2, regexp, &proto);
    let methods: &[(&str, usize, NativeFn)] = &[
        ("exec", 1, exec),
        ("test", 1, test),
        ("toString", 0, to_string),
    ];
    for &(name, arity, func) in methods {
        interp.define_method(&proto, name, arity, func);
    }
    let getters: &[(&str, NativeFn)] = &[
        ("source", source),
        ("flags", flags),
        ("global", global),
        ("ignoreCase", ignore_case),
        ("multiline", multiline),
        ("sticky", sticky),
    ];
    for &(name, func) in getters {
        interp.define_getter(&proto, name, func);
    }
    interp.define_global("RegExp", JsValue::Object(ctor));
}

// ── Compilation ───────────────────────────────────────────────────────────────

impl RegExpState {
    pub(crate) fn compile(source: &str, flags: &str) -> Result<Self, String> {
        for (i, flag) in flags.char_indices() {
            if !FLAGS.contains(flag) || flags[..i].contains(flag) {
                return Err(format!(
                    "Invalid flags supplied to RegExp constructor '{flags}'"
                ));
            }
        }
        let source = if source.is_empty() {
            "(?:)".to_string()
        } else {
            escape_slashes(source)
        };
        let matcher = RegexBuilder::new(&translate(&source))
            .case_insensitive(flags.contains('i'))
            .multi_line(flags.contains('m'))
            .dot_matches_new_line(flags.contains('s'))
            .build()
            .map_err(|err| {
                tracing::debug!(%err, "pattern rejected");
                format!("Invalid regular expression: /{source}/{flags}: Unsupported pattern")
            })?;
        Ok(Self {
            source,
            flags: FLAGS.chars().filter(|f| flags.contains(*f)).collect(),
            matcher,
        })
    }

    /// The first match starting at or after UTF-16 position `from`. With
    /// `anchored`, only a match starting exactly at `from` counts.
    pub(crate) fn find_at(&self, subject: &str, from: usize, anchored: bool) -> Option<Found> {
        let byte = byte_offset(subject, from)?;
        let caps = self.matcher.captures_at(subject, byte)?;
        let whole = caps.get(0)?;
        if anchored && whole.start() != byte {
            return None;
        }
        let start = utf16_len(&subject[..whole.start()]);
        let named = self
            .matcher
            .capture_names()
            .enumerate()
            .filter_map(|(i, name)| {
                name.map(|name| (name.to_string(), caps.get(i).map(|m| m.as_str().to_string())))
            })
            .collect();
        Some(Found {
            start,
            end: start + utf16_len(whole.as_str()),
            text: whole.as_str().to_string(),
            captures: caps
                .iter()
                .skip(1)
                .map(|group| group.map(|m| m.as_str().to_string()))
                .collect(),
            named,
        })
    }

    /// Every successive match from the start, as a global search visits
    /// them. An empty match moves the search on by one position.
    pub(crate) fn find_all(&self, subject: &str) -> Vec<Found> {
        let mut found = Vec::new();
        let mut from = 0;
        while let Some(next) = self.find_at(subject, from, self.sticky()) {
            from = if next.end == next.start { next.end + 1 } else { next.end };
            found.push(next);
        }
        found
    }
}

/// One match; positions are UTF-16 code units.
pub(crate) struct Found {
    pub start: usize,
    pub end: usize,
    pub text: String,
    /// Numbered groups from 1; `None` for a group that did not take part.
    pub captures: Vec<Option<String>>,
    pub named: Vec<(String, Option<String>)>,
}

/// Byte offset of UTF-16 position `units`, rounded up to a character
/// boundary. `None` past the end.
fn byte_offset(s: &str, units: usize) -> Option<usize> {
    let mut seen = 0;
    for (byte, ch) in s.char_indices() {
        if seen >= units {
            return Some(byte);
        }
        seen += ch.len_utf16();
    }
    (seen >= units).then_some(s.len())
}

/// `source` as shown by `RegExp.prototype.source`: `/` outside a class is
/// escaped.
fn escape_slashes(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars();
    let mut in_class = false;
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => {
                out.push(ch);
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            }
            '[' => {
                in_class = true;
                out.push(ch);
            }
            ']' => {
                in_class = false;
                out.push(ch);
            }
            '/' if !in_class => out.push_str("\\/"),
            _ => out.push(ch),
        }
    }
    out
}

/// Rewrite a JavaScript pattern into `regex` syntax: ASCII `\d` and `\w`,
/// the empty classes `[]` and `[^]`, and a literal `[` inside a class.
fn translate(source: &str) -> String {
    let mut out = String::with_capacity(source.len() + 8);
    let mut chars = source.chars();
    let mut in_class = false;
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => match chars.next() {
                Some('d') if in_class => out.push_str("0-9"),
                Some('d') => out.push_str("[0-9]"),
                Some('w') if in_class => out.push_str("A-Za-z0-9_"),
                Some('w') => out.push_str("[A-Za-z0-9_]"),
                Some('/') => out.push('/'),
                Some(next) => {
                    out.push('\\');
                    out.push(next);
                }
                None => out.push_str("\\\\"),
            },
            '[' if in_class => out.push_str("\\["),
            '[' => {
                let rest = chars.as_str();
                if let Some(after) = rest.strip_prefix(']') {
                    out.push_str(r"[^\s\S]");
                    chars = after.chars();
                } else if let Some(after) = rest.strip_prefix("^]") {
                    out.push_str(r"[\s\S]");
                    chars = after.chars();
                } else {
                    in_class = true;
                    out.push(ch);
                }
            }
            ']' if in_class => {
                in_class = false;
                out.push(ch);
            }
            '&' | '~' if in_class => {
                out.push('\\');
                out.push(ch);
            }
            _ => out.push(ch),
        }
    }
    out
}

// ── Shared with `String.prototype` ────────────────────────────────────────────

/// The compiled pattern behind `value`, when it is a `RegExp`.
pub(super) fn as_regexp(value: &JsValue) -> Option<RegExpState> {
    match &value.as_object()?.borrow().kind {
        ObjectKind::RegExp(state) => Some(state.clone()),
        _ => None,
    }
}

/// `value` as a `RegExp`: itself if it is one, otherwise a new one with
/// `flags` built from its string form.
pub(super) fn coerce_regexp(
    interp: &mut Interpreter,
    value: &JsValue,
    flags: &str,
) -> EvalResult<(JsValue, RegExpState)> {
    if let Some(state) = as_regexp(value) {
        return Ok((value.clone(), state));
    }
    let source = if value.is_undefined() {
        String::new()
    } else {
        interp.to_string(value)?.to_string()
    };
    let obj = interp.new_regexp(&source, flags)?;
    let state = as_regexp(&JsValue::Object(obj.clone()))
        .ok_or_else(|| interp.type_error("RegExp construction failed"))?;
    Ok((JsValue::Object(obj), state))
}

pub(super) fn set_last_index(interp: &mut Interpreter, rx: &JsValue, index: usize) -> EvalResult<()> {
    interp.set(rx, "lastIndex", JsValue::from(index))
}

fn last_index(interp: &mut Interpreter, rx: &JsValue) -> EvalResult<usize> {
    let value = interp.get(rx, "lastIndex")?;
    let n = to_integer(interp.to_number(&value)?);
    Ok(if n > 0.0 { n as usize } else { 0 })
}

/// One `exec` step: global and sticky patterns start at `lastIndex` and
/// move it past the match, or back to 0 when there is none.
pub(super) fn exec_step(
    interp: &mut Interpreter,
    rx: &JsValue,
    state: &RegExpState,
    subject: &str,
) -> EvalResult<Option<Found>> {
    let tracking = state.global() || state.sticky();
    let from = if tracking { last_index(interp, rx)? } else { 0 };
    let found = state.find_at(subject, from, state.sticky());
    if tracking {
        let next = found.as_ref().map_or(0, |found| found.end);
        set_last_index(interp, rx, next)?;
    }
    Ok(found)
}

/// The array `exec` returns: the match, its groups, then `index`,
/// `input` and `groups` properties.
pub(super) fn match_array(interp: &mut Interpreter, found: &Found, input: &str) -> JsValue {
    let mut items = vec![JsValue::from(found.text.as_str())];
    items.extend(found.captures.iter().map(optional_text));
    let array = interp.new_array(items);
    interp.define_own(&array, "index", JsValue::from(found.start));
    interp.define_own(&array, "input", JsValue::str(input));
    let groups = named_groups(interp, found);
    interp.define_own(&array, "groups", groups);
    JsValue::Object(array)
}

/// The `groups` object of a match; `undefined` without named groups.
pub(super) fn named_groups(interp: &Interpreter, found: &Found) -> JsValue {
    if found.named.is_empty() {
        return JsValue::Undefined;
    }
    let groups = interp.new_object();
    for (name, text) in &found.named {
        interp.define_own(&groups, name, optional_text(text));
    }
    JsValue::Object(groups)
}

pub(super) fn optional_text(text: &Option<String>) -> JsValue {
    text.as_deref().map_or(JsValue::Undefined, JsValue::str)
}

// ── Constructor ───────────────────────────────────────────────────────────────

impl Interpreter {
    /// A fresh `RegExp`, as a literal evaluates to.
    pub(crate) fn new_regexp(&self, source: &str, flags: &str) -> EvalResult<Obj> {
        self.regexp_with_proto(source, flags, self.realm.regexp_prototype.clone())
    }

    fn regexp_with_proto(&self, source: &str, flags: &str, proto: Obj) -> EvalResult<Obj> {
        let state = RegExpState::compile(source, flags)
            .map_err(|message| self.throw_error("SyntaxError", message))?;
        let obj = Obj::new(Object::new(ObjectKind::RegExp(state), Some(proto)));
        define_hidden(&obj, "lastIndex", JsValue::Number(0.0));
        Ok(obj)
    }
}

fn regexp(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let pattern = call.arg(0);
    let flags = call.arg(1);
    let (source, inherited) = match as_regexp(&pattern) {
        Some(state) => (state.source, state.flags),
        None if pattern.is_undefined() => (String::new(), String::new()),
        None => (interp.to_string(&pattern)?.to_string(), String::new()),
    };
    let flags = if flags.is_undefined() {
        inherited
    } else {
        interp.to_string(&flags)?.to_string()
    };
    let fallback = interp.realm.regexp_prototype.clone();
    let proto = match &call.new_target {
        Some(target) => interp.prototype_for(target, Some(&fallback))?,
        None => fallback,
    };
    interp
        .regexp_with_proto(&source, &flags, proto)
        .map(JsValue::Object)
}

// ── Prototype ─────────────────────────────────────────────────────────────────

fn this_regexp(interp: &Interpreter, call: &CallArgs, method: &str) -> EvalResult<RegExpState> {
    as_regexp(&call.this).ok_or_else(|| {
        interp.type_error(format!(
            "Method RegExp.prototype.{method} called on incompatible receiver {}",
            interp.inspect(&call.this)
        ))
    })
}

fn exec(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let state = this_regexp(interp, call, "exec")?;
    let subject = interp.to_string(&call.arg(0))?;
    Ok(match exec_step(interp, &call.this, &state, &subject)? {
        Some(found) => match_array(interp, &found, &subject),
        None => JsValue::Null,
    })
}

fn test(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let state = this_regexp(interp, call, "test")?;
    let subject = interp.to_string(&call.arg(0))?;
    let found = exec_step(interp, &call.this, &state, &subject)?;
    Ok(JsValue::Bool(found.is_some()))
}

fn to_string(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let state = this_regexp(interp, call, "toString")?;
    Ok(JsValue::from(format!("/{}/{}", state.source, state.flags)))
}

fn source(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let state = this_regexp(interp, call, "source")?;
    Ok(JsValue::from(state.source))
}

fn flags(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let state = this_regexp(interp, call, "flags")?;
    Ok(JsValue::from(state.flags))
}

fn has_flag(interp: &Interpreter, call: &CallArgs, name: &str, flag: char) -> EvalResult<JsValue> {
    let state = this_regexp(interp, call, name)?;
    Ok(JsValue::Bool(state.flags.contains(flag)))
}

fn global(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    has_flag(interp, call, "global", 'g')
}

fn ignore_case(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    has_flag(interp, call, "ignoreCase", 'i')
}

fn multiline(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    has_flag(interp, call, "multiline", 'm')
}

fn sticky(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    has_flag(interp, call, "sticky", 'y')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn javascript_classes_translate_to_ascii() {
        assert_eq!(translate(r"\d+-\w"), "[0-9]+-[A-Za-z0-9_]");
        assert_eq!(translate(r"[\d.]"), "[0-9.]");
        assert_eq!(translate(r"a\/b"), "a/b");
        assert_eq!(translate("[]|[^]"), r"[^\s\S]|[\s\S]");
        assert_eq!(translate("[[&]"), r"[\[\&]");
    }

    #[test]
    fn flags_are_validated_and_ordered() {
        let state = RegExpState::compile("a", "ig").expect("valid pattern");
        assert_eq!(state.flags, "gi");
        assert!(RegExpState::compile("a", "gg").is_err());
        assert!(RegExpState::compile("a", "x").is_err());
        assert!(RegExpState::compile("(?<=a)b", "").is_err());
    }

    #[test]
    fn positions_count_utf16_units() {
        let state = RegExpState::compile("b", "").expect("valid pattern");
        let found = state.find_at("😀ab", 0, false).map(|f| (f.start, f.end));
        assert_eq!(found, Some((3, 4)));
        assert_eq!(byte_offset("😀a", 1), Some(4));
        assert_eq!(byte_offset("ab", 3), None);
    }

    #[test]
    fn empty_source_and_slashes_display() {
        let state = RegExpState::compile("", "").expect("valid pattern");
        assert_eq!(state.source, "(?:)");
        assert_eq!(escape_slashes("a/b[/]"), r"a\/b[/]");
    }

    #[test]
    fn global_search_steps_over_empty_matches() {
        let state = RegExpState::compile("x*", "g").expect("valid pattern");
        let spans: Vec<_> = state.find_all("axx").iter().map(|f| (f.start, f.end)).collect();
        assert_eq!(spans, vec![(0, 0), (1, 3), (3, 3)]);
    }
}
