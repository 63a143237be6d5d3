//! `String` and `String.prototype`.
//!
//! Positions are UTF-16 code units, as in JavaScript. `split`, `replace`,
//! `replaceAll`, `match`, `matchAll` and `search` also take a `RegExp`.

use std::cmp::Ordering;

use tsdojo_types::format_number;

use super::regexp::{
    as_regexp, coerce_regexp, exec_step, match_array, named_groups, optional_text, set_last_index,
    Found,
};
use super::{callback, make_iterator};
use crate::error::EvalResult;
use crate::interpreter::Interpreter;
use crate::ops::{
    from_units, relative_index, to_integer, to_uint32, trim_js, trim_js_end, trim_js_start,
    utf16_units, MAX_STRING_LENGTH,
};
use crate::value::{CallArgs, JsStr, JsValue, NativeFn, RegExpState};

pub(super) fn install(interp: &mut Interpreter) {
    let proto = interp.realm.string_prototype.clone();
    let ctor = interp.make_constructor("String", 1, string, &proto);
    interp.define_method(&ctor, "fromCharCode", 1, from_char_code);

    let methods: &[(&str, usize, NativeFn)] = &[
        ("charAt", 1, char_at),
        ("charCodeAt", 1, char_code_at),
        ("codePointAt", 1, code_point_at),
        ("at", 1, at),
        ("indexOf", 1, index_of),
        ("lastIndexOf", 1, last_index_of),
        ("includes", 1, includes),
        ("startsWith", 1, starts_with),
        ("endsWith", 1, ends_with),
        ("slice", 2, slice),
        ("substring", 2, substring),
        ("substr", 2, substr),
        ("toUpperCase", 0, to_upper_case),
        ("toLowerCase", 0, to_lower_case),
        ("trim", 0, trim),
        ("trimStart", 0, trim_start),
        ("trimEnd", 0, trim_end),
        ("padStart", 2, pad_start),
        ("padEnd", 2, pad_end),
        ("repeat", 1, repeat),
        ("split", 2, split),
        ("replace", 2, replace),
        ("replaceAll", 2, replace_all),
        ("match", 1, match_),
        ("matchAll", 1, match_all),
        ("search", 1, search),
        ("concat", 1, concat),
        ("localeCompare", 1, locale_compare),
        ("toString", 0, to_string),
        ("valueOf", 0, to_string),
    ];
    for &(name, arity, func) in methods {
        interp.define_method(&proto, name, arity, func);
    }

    interp.define_global("String", JsValue::Object(ctor));
}

fn string(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    if call.args.is_empty() {
        return Ok(JsValue::str(""));
    }
    interp.to_string(&call.arg(0)).map(JsValue::String)
}

fn from_char_code(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let mut units = Vec::with_capacity(call.args.len());
    for arg in &call.args {
        units.push(to_uint32(interp.to_number(arg)?) as u16);
    }
    Ok(JsValue::from(from_units(&units)))
}

/// The receiver as a string; `null` and `undefined` are rejected.
fn this_string(interp: &mut Interpreter, call: &CallArgs, method: &str) -> EvalResult<JsStr> {
    match &call.this {
        JsValue::String(s) => Ok(s.clone()),
        JsValue::Undefined | JsValue::Null => Err(interp.type_error(format!(
            "String.prototype.{method} called on null or undefined"
        ))),
        other => interp.to_string(other),
    }
}

fn string_arg(interp: &mut Interpreter, call: &CallArgs, index: usize) -> EvalResult<Vec<u16>> {
    let s = interp.to_string(&call.arg(index))?;
    Ok(utf16_units(&s))
}

/// An absolute position clamped into `0..=len`; `undefined` gives `default`.
fn position(
    interp: &mut Interpreter,
    value: &JsValue,
    len: usize,
    default: usize,
) -> EvalResult<usize> {
    if value.is_undefined() {
        return Ok(default);
    }
    let n = to_integer(interp.to_number(value)?);
    Ok(n.clamp(0.0, len as f64) as usize)
}

fn find_units(haystack: &[u16], needle: &[u16], from: usize) -> Option<usize> {
    if needle.is_empty() {
        return Some(from.min(haystack.len()));
    }
    if needle.len() > haystack.len() {
        return None;
    }
    (from..=haystack.len() - needle.len()).find(|&i| haystack[i..].starts_with(needle))
}

fn rfind_units(haystack: &[u16], needle: &[u16], from: usize) -> Option<usize> {
    if needle.len() > haystack.len() {
        return None;
    }
    let last = from.min(haystack.len() - needle.len());
    (0..=last).rev().find(|&i| haystack[i..].starts_with(needle))
}

// ── Character access ──────────────────────────────────────────────────────────

fn unit_index(interp: &mut Interpreter, call: &CallArgs, len: usize) -> EvalResult<Option<usize>> {
    let n = to_integer(interp.to_number(&call.arg(0))?);
    Ok((n >= 0.0 && n < len as f64).then_some(n as usize))
}

fn char_at(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let units = utf16_units(&this_string(interp, call, "charAt")?);
    Ok(match unit_index(interp, call, units.len())? {
        Some(i) => JsValue::from(from_units(&units[i..=i])),
        None => JsValue::str(""),
    })
}

fn char_code_at(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let units = utf16_units(&this_string(interp, call, "charCodeAt")?);
    Ok(match unit_index(interp, call, units.len())? {
        Some(i) => JsValue::Number(f64::from(units[i])),
        None => JsValue::Number(f64::NAN),
    })
}

fn code_point_at(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let units = utf16_units(&this_string(interp, call, "codePointAt")?);
    let Some(i) = unit_index(interp, call, units.len())? else {
        return Ok(JsValue::Undefined);
    };
    let code = match char::decode_utf16(units[i..].iter().copied()).next() {
        Some(Ok(c)) => u32::from(c),
        _ => u32::from(units[i]),
    };
    Ok(JsValue::Number(f64::from(code)))
}

fn at(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let units = utf16_units(&this_string(interp, call, "at")?);
    let len = units.len() as f64;
    let n = to_integer(interp.to_number(&call.arg(0))?);
    let index = if n < 0.0 { len + n } else { n };
    if index < 0.0 || index >= len {
        return Ok(JsValue::Undefined);
    }
    let i = index as usize;
    Ok(JsValue::from(from_units(&units[i..=i])))
}

// ── Searching ─────────────────────────────────────────────────────────────────

fn index_of(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let units = utf16_units(&this_string(interp, call, "indexOf")?);
    let needle = string_arg(interp, call, 0)?;
    let from = position(interp, &call.arg(1), units.len(), 0)?;
    Ok(find_units(&units, &needle, from).map_or(JsValue::Number(-1.0), JsValue::from))
}

fn last_index_of(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let units = utf16_units(&this_string(interp, call, "lastIndexOf")?);
    let needle = string_arg(interp, call, 0)?;
    let from = match call.arg(1) {
        JsValue::Undefined => units.len(),
        value => {
            let n = interp.to_number(&value)?;
            if n.is_nan() {
                units.len()
            } else {
                to_integer(n).clamp(0.0, units.len() as f64) as usize
            }
        }
    };
    Ok(rfind_units(&units, &needle, from).map_or(JsValue::Number(-1.0), JsValue::from))
}

fn includes(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let units = utf16_units(&this_string(interp, call, "includes")?);
    let needle = string_arg(interp, call, 0)?;
    let from = position(interp, &call.arg(1), units.len(), 0)?;
    Ok(JsValue::Bool(find_units(&units, &needle, from).is_some()))
}

fn starts_with(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let units = utf16_units(&this_string(interp, call, "startsWith")?);
    let needle = string_arg(interp, call, 0)?;
    let from = position(interp, &call.arg(1), units.len(), 0)?;
    Ok(JsValue::Bool(units[from..].starts_with(&needle)))
}

fn ends_with(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let units = utf16_units(&this_string(interp, call, "endsWith")?);
    let needle = string_arg(interp, call, 0)?;
    let end = position(interp, &call.arg(1), units.len(), units.len())?;
    Ok(JsValue::Bool(units[..end].ends_with(&needle)))
}

// ── Extraction ────────────────────────────────────────────────────────────────

fn slice(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let units = utf16_units(&this_string(interp, call, "slice")?);
    let len = units.len();
    let start = match call.arg(0) {
        JsValue::Undefined => 0,
        value => relative_index(interp.to_number(&value)?, len),
    };
    let end = match call.arg(1) {
        JsValue::Undefined => len,
        value => relative_index(interp.to_number(&value)?, len),
    };
    Ok(JsValue::from(if start < end {
        from_units(&units[start..end])
    } else {
        String::new()
    }))
}

fn substring(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let units = utf16_units(&this_string(interp, call, "substring")?);
    let len = units.len();
    let start = position(interp, &call.arg(0), len, 0)?;
    let end = position(interp, &call.arg(1), len, len)?;
    let (lo, hi) = if start <= end { (start, end) } else { (end, start) };
    Ok(JsValue::from(from_units(&units[lo..hi])))
}

fn substr(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let units = utf16_units(&this_string(interp, call, "substr")?);
    let len = units.len();
    let start = match call.arg(0) {
        JsValue::Undefined => 0,
        value => relative_index(interp.to_number(&value)?, len),
    };
    let count = match call.arg(1) {
        JsValue::Undefined => len - start,
        value => to_integer(interp.to_number(&value)?).clamp(0.0, (len - start) as f64) as usize,
    };
    Ok(JsValue::from(from_units(&units[start..start + count])))
}

// ── Transformation ────────────────────────────────────────────────────────────

fn to_upper_case(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    Ok(JsValue::from(this_string(interp, call, "toUpperCase")?.to_uppercase()))
}

fn to_lower_case(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    Ok(JsValue::from(this_string(interp, call, "toLowerCase")?.to_lowercase()))
}

fn trim(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    Ok(JsValue::str(trim_js(&this_string(interp, call, "trim")?)))
}

fn trim_start(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    Ok(JsValue::str(trim_js_start(&this_string(interp, call, "trimStart")?)))
}

fn trim_end(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    Ok(JsValue::str(trim_js_end(&this_string(interp, call, "trimEnd")?)))
}

/// Filler of `padStart`/`padEnd`, or `None` when no padding applies.
fn padding(interp: &mut Interpreter, call: &CallArgs, len: usize) -> EvalResult<Option<Vec<u16>>> {
    let target = to_integer(interp.to_number(&call.arg(0))?);
    if target <= len as f64 {
        return Ok(None);
    }
    if target > MAX_STRING_LENGTH as f64 {
        return Err(interp.range_error("Invalid string length"));
    }
    let filler = match call.arg(1) {
        JsValue::Undefined => vec![u16::from(b' ')],
        value => utf16_units(&interp.to_string(&value)?),
    };
    if filler.is_empty() {
        return Ok(None);
    }
    let needed = target as usize - len;
    Ok(Some(filler.iter().copied().cycle().take(needed).collect()))
}

fn pad_start(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let s = this_string(interp, call, "padStart")?;
    let mut units = utf16_units(&s);
    match padding(interp, call, units.len())? {
        Some(mut pad) => {
            pad.append(&mut units);
            Ok(JsValue::from(from_units(&pad)))
        }
        None => Ok(JsValue::String(s)),
    }
}

fn pad_end(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let s = this_string(interp, call, "padEnd")?;
    let mut units = utf16_units(&s);
    match padding(interp, call, units.len())? {
        Some(pad) => {
            units.extend(pad);
            Ok(JsValue::from(from_units(&units)))
        }
        None => Ok(JsValue::String(s)),
    }
}

fn repeat(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let s = this_string(interp, call, "repeat")?;
    let n = to_integer(interp.to_number(&call.arg(0))?);
    if n < 0.0 || n.is_infinite() {
        return Err(interp.range_error(format!("Invalid count value: {}", format_number(n))));
    }
    if s.len() as f64 * n > MAX_STRING_LENGTH as f64 {
        return Err(interp.range_error("Invalid string length"));
    }
    Ok(JsValue::from(s.repeat(n as usize)))
}

fn concat(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let mut out = this_string(interp, call, "concat")?.to_string();
    for arg in &call.args {
        out.push_str(&interp.to_string(arg)?);
    }
    Ok(JsValue::from(out))
}

fn locale_compare(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let s = this_string(interp, call, "localeCompare")?;
    let other = interp.to_string(&call.arg(0))?;
    Ok(JsValue::Number(match s.cmp(&other) {
        Ordering::Less => -1.0,
        Ordering::Equal => 0.0,
        Ordering::Greater => 1.0,
    }))
}

fn to_string(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    match &call.this {
        JsValue::String(s) => Ok(JsValue::String(s.clone())),
        _ => Err(interp.type_error("String.prototype.toString requires that 'this' be a String")),
    }
}

// ── split / replace ───────────────────────────────────────────────────────────

fn split(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let s = this_string(interp, call, "split")?;
    let limit = match call.arg(1) {
        JsValue::Undefined => u32::MAX as usize,
        value => to_uint32(interp.to_number(&value)?) as usize,
    };
    let separator = call.arg(0);
    if limit == 0 {
        return Ok(interp.array_value(Vec::new()));
    }
    if separator.is_undefined() {
        return Ok(interp.array_value(vec![JsValue::String(s)]));
    }
    if let Some(state) = as_regexp(&separator) {
        let parts = split_regexp(&s, &state, limit);
        return Ok(interp.array_value(parts));
    }
    let separator = interp.to_string(&separator)?;
    let parts: Vec<JsValue> = if separator.is_empty() {
        utf16_units(&s)
            .chunks(1)
            .take(limit)
            .map(|unit| JsValue::from(from_units(unit)))
            .collect()
    } else {
        s.split(&*separator).take(limit).map(JsValue::str).collect()
    };
    Ok(interp.array_value(parts))
}

/// Split around regex matches; capture groups are spliced into the result.
fn split_regexp(s: &str, state: &RegExpState, limit: usize) -> Vec<JsValue> {
    let units = utf16_units(s);
    let size = units.len();
    if size == 0 {
        return match state.find_at(s, 0, true) {
            Some(_) => Vec::new(),
            None => vec![JsValue::str(s)],
        };
    }
    let mut parts = Vec::new();
    let (mut p, mut q) = (0, 0);
    while q < size {
        let Some(found) = state.find_at(s, q, false) else {
            break;
        };
        if found.start >= size {
            break;
        }
        let end = found.end.min(size);
        if end == p {
            q = found.start + 1;
            continue;
        }
        parts.push(JsValue::from(from_units(&units[p..found.start])));
        if parts.len() == limit {
            return parts;
        }
        for capture in &found.captures {
            parts.push(optional_text(capture));
            if parts.len() == limit {
                return parts;
            }
        }
        p = end;
        q = p;
    }
    parts.push(JsValue::from(from_units(&units[p..])));
    parts
}

fn replace(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    replace_matches(interp, call, "replace", false)
}

fn replace_all(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    replace_matches(interp, call, "replaceAll", true)
}

/// The replacement for one match: a callback's result or an expanded
/// template.
enum Replacer {
    Callback(JsValue),
    Template(Vec<u16>),
}

impl Replacer {
    fn from_arg(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<Self> {
        if call.arg(1).is_callable() {
            Ok(Replacer::Callback(callback(interp, call, 1)?))
        } else {
            Ok(Replacer::Template(string_arg(interp, call, 1)?))
        }
    }
}

fn replace_regexp(
    interp: &mut Interpreter,
    call: &CallArgs,
    s: JsStr,
    rx: &JsValue,
    state: &RegExpState,
) -> EvalResult<JsValue> {
    let replacer = Replacer::from_arg(interp, call)?;
    let found: Vec<Found> = if state.global() {
        set_last_index(interp, rx, 0)?;
        state.find_all(&s)
    } else {
        exec_step(interp, rx, state, &s)?.into_iter().collect()
    };
    if found.is_empty() {
        return Ok(JsValue::String(s));
    }

    let units = utf16_units(&s);
    let mut out: Vec<u16> = Vec::with_capacity(units.len());
    let mut last = 0;
    for m in &found {
        out.extend_from_slice(&units[last..m.start]);
        match &replacer {
            Replacer::Callback(f) => {
                let mut args = vec![JsValue::from(m.text.as_str())];
                args.extend(m.captures.iter().map(optional_text));
                args.push(JsValue::from(m.start));
                args.push(JsValue::String(s.clone()));
                if !m.named.is_empty() {
                    args.push(named_groups(interp, m));
                }
                let replacement = interp.call(f, JsValue::Undefined, args)?;
                out.extend(utf16_units(&interp.to_string(&replacement)?));
            }
            Replacer::Template(template) => {
                expand_template(&mut out, template, &units, m.start, m.end, Some(m));
            }
        }
        last = m.end;
    }
    out.extend_from_slice(&units[last..]);
    Ok(JsValue::from(from_units(&out)))
}

fn replace_matches(
    interp: &mut Interpreter,
    call: &CallArgs,
    method: &str,
    all: bool,
) -> EvalResult<JsValue> {
    let s = this_string(interp, call, method)?;
    let pattern = call.arg(0);
    if let Some(state) = as_regexp(&pattern) {
        if all && !state.global() {
            return Err(interp.type_error("replaceAll must be called with a global RegExp"));
        }
        return replace_regexp(interp, call, s, &pattern, &state);
    }
    let units = utf16_units(&s);
    let pattern = string_arg(interp, call, 0)?;
    let replacer = Replacer::from_arg(interp, call)?;

    let mut positions = Vec::new();
    let mut from = 0;
    while let Some(at) = find_units(&units, &pattern, from) {
        positions.push(at);
        if !all {
            break;
        }
        from = at + pattern.len().max(1);
        if from > units.len() {
            break;
        }
    }
    if positions.is_empty() {
        return Ok(JsValue::String(s));
    }

    let mut out: Vec<u16> = Vec::with_capacity(units.len());
    let mut last = 0;
    for at in positions {
        out.extend_from_slice(&units[last..at]);
        let end = at + pattern.len();
        match &replacer {
            Replacer::Callback(f) => {
                let args = vec![
                    JsValue::from(from_units(&pattern)),
                    JsValue::from(at),
                    JsValue::String(s.clone()),
                ];
                let replacement = interp.call(f, JsValue::Undefined, args)?;
                out.extend(utf16_units(&interp.to_string(&replacement)?));
            }
            Replacer::Template(template) => {
                expand_template(&mut out, template, &units, at, end, None)
            }
        }
        last = end;
    }
    out.extend_from_slice(&units[last..]);
    Ok(JsValue::from(from_units(&out)))
}

/// Expand `$$`, `$&`, `` $` `` and `$'` in a replacement string, plus
/// `$1`..`$99` and `$<name>` when the match came from a `RegExp`.
fn expand_template(
    out: &mut Vec<u16>,
    template: &[u16],
    subject: &[u16],
    start: usize,
    end: usize,
    groups: Option<&Found>,
) {
    let ascii = |i: usize| template.get(i).and_then(|&n| u8::try_from(n).ok());
    let mut i = 0;
    while i < template.len() {
        let unit = template[i];
        if unit != u16::from(b'$') {
            out.push(unit);
            i += 1;
            continue;
        }
        let consumed = match ascii(i + 1) {
            Some(b'$') => {
                out.push(unit);
                2
            }
            Some(b'&') => {
                out.extend_from_slice(&subject[start..end]);
                2
            }
            Some(b'`') => {
                out.extend_from_slice(&subject[..start]);
                2
            }
            Some(b'\'') => {
                out.extend_from_slice(&subject[end..]);
                2
            }
            Some(b'0'..=b'9') => groups.map_or(0, |found| {
                expand_group_number(out, found, ascii(i + 1), ascii(i + 2))
            }),
            Some(b'<') => groups
                .filter(|found| !found.named.is_empty())
                .map_or(0, |found| expand_group_name(out, found, &template[i + 2..])),
            _ => 0,
        };
        if consumed == 0 {
            out.push(unit);
            i += 1;
        } else {
            i += consumed;
        }
    }
}

/// `$n` or `$nn`; the two-digit form wins when that group exists. Returns
/// the template length consumed, or 0 for a literal `$`.
fn expand_group_number(
    out: &mut Vec<u16>,
    found: &Found,
    first: Option<u8>,
    second: Option<u8>,
) -> usize {
    let digit = |d: Option<u8>| d.filter(u8::is_ascii_digit).map(|d| usize::from(d - b'0'));
    let count = found.captures.len();
    let Some(tens) = digit(first) else {
        return 0;
    };
    let (group, consumed) = match digit(second) {
        Some(ones) if (1..=count).contains(&(tens * 10 + ones)) => (tens * 10 + ones, 3),
        _ if (1..=count).contains(&tens) => (tens, 2),
        _ => return 0,
    };
    if let Some(Some(text)) = found.captures.get(group - 1) {
        out.extend(utf16_units(text));
    }
    consumed
}

/// `$<name>`; an unclosed `$<` stays literal.
fn expand_group_name(out: &mut Vec<u16>, found: &Found, rest: &[u16]) -> usize {
    let Some(close) = rest.iter().position(|&u| u == u16::from(b'>')) else {
        return 0;
    };
    let name = from_units(&rest[..close]);
    if let Some((_, Some(text))) = found.named.iter().find(|(n, _)| *n == name) {
        out.extend(utf16_units(text));
    }
    close + 3
}

// ── match / matchAll / search ─────────────────────────────────────────────────

fn match_(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let s = this_string(interp, call, "match")?;
    let (rx, state) = coerce_regexp(interp, &call.arg(0), "")?;
    if !state.global() {
        return Ok(match exec_step(interp, &rx, &state, &s)? {
            Some(found) => match_array(interp, &found, &s),
            None => JsValue::Null,
        });
    }
    set_last_index(interp, &rx, 0)?;
    let found = state.find_all(&s);
    if found.is_empty() {
        return Ok(JsValue::Null);
    }
    let texts = found.into_iter().map(|m| JsValue::from(m.text)).collect();
    Ok(interp.array_value(texts))
}

fn match_all(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let s = this_string(interp, call, "matchAll")?;
    let pattern = call.arg(0);
    if as_regexp(&pattern).is_some_and(|state| !state.global()) {
        return Err(interp.type_error(
            "String.prototype.matchAll called with a non-global RegExp argument",
        ));
    }
    let (_, state) = coerce_regexp(interp, &pattern, "g")?;
    let items = state
        .find_all(&s)
        .iter()
        .map(|found| match_array(interp, found, &s))
        .collect();
    Ok(make_iterator(interp, items))
}

fn search(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let s = this_string(interp, call, "search")?;
    let (_, state) = coerce_regexp(interp, &call.arg(0), "")?;
    Ok(match state.find_at(&s, 0, state.sticky()) {
        Some(found) => JsValue::from(found.start),
        None => JsValue::Number(-1.0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn units(s: &str) -> Vec<u16> {
        utf16_units(s)
    }

    #[test]
    fn find_units_handles_empty_needle() {
        assert_eq!(find_units(&units("abc"), &[], 2), Some(2));
        assert_eq!(find_units(&units("abc"), &[], 9), Some(3));
        assert_eq!(find_units(&units("abcabc"), &units("c"), 3), Some(5));
        assert_eq!(rfind_units(&units("abcabc"), &units("abc"), 6), Some(3));
        assert_eq!(rfind_units(&units("ab"), &units("abc"), 6), None);
    }

    #[test]
    fn replacement_patterns_expand() {
        let subject = units("hello world");
        let mut out = Vec::new();
        expand_template(&mut out, &units("[$&|$$|$`|$'|$x|$1]"), &subject, 6, 11, None);
        assert_eq!(from_units(&out), "[world|$|hello ||$x|$1]");
    }

    #[test]
    fn group_references_expand_from_captures() {
        let state = RegExpState::compile(r"(?<first>\w)(\w)", "").expect("valid pattern");
        let subject = "ab";
        let found = state.find_at(subject, 0, false).expect("match");
        let mut out = Vec::new();
        expand_template(
            &mut out,
            &units("$2$1|$<first>|$3|$10|$<none>|$<open"),
            &units(subject),
            found.start,
            found.end,
            Some(&found),
        );
        assert_eq!(from_units(&out), "ba|a|$3|a0||$<open");
    }

    #[test]
    fn regexp_split_splices_captures() {
        let state = RegExpState::compile(r"\s*(,)\s*", "").expect("valid pattern");
        let parts: Vec<String> = split_regexp("a , b,c", &state, usize::MAX)
            .iter()
            .map(|part| format!("{part:?}"))
            .collect();
        assert_eq!(parts, vec!["\"a\"", "\",\"", "\"b\"", "\",\"", "\"c\""]);

        let empty = RegExpState::compile("", "").expect("valid pattern");
        assert_eq!(split_regexp("abc", &empty, usize::MAX).len(), 3);
        assert!(split_regexp("", &empty, usize::MAX).is_empty());
        assert_eq!(split_regexp("abc", &empty, 2).len(), 2);
    }
}
