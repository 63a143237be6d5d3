//! `Number`, `Boolean`, and the numeric parsing globals.

use tsdojo_types::format_number;

use crate::error::EvalResult;
use crate::interpreter::{define_hidden, Interpreter};
use crate::ops::{to_boolean, to_int32, to_integer, trim_js_start};
use crate::value::{CallArgs, JsValue, NativeFn};

const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

pub(super) fn install(interp: &mut Interpreter) {
    let proto = interp.realm.number_prototype.clone();
    let ctor = interp.make_constructor("Number", 1, number, &proto);

    let constants = [
        ("MAX_SAFE_INTEGER", MAX_SAFE_INTEGER),
        ("MIN_SAFE_INTEGER", -MAX_SAFE_INTEGER),
        ("EPSILON", f64::EPSILON),
        ("MAX_VALUE", f64::MAX),
        ("MIN_VALUE", 5e-324),
        ("POSITIVE_INFINITY", f64::INFINITY),
        ("NEGATIVE_INFINITY", f64::NEG_INFINITY),
        ("NaN", f64::NAN),
    ];
    for (name, value) in constants {
        define_hidden(&ctor, name, JsValue::Number(value));
    }
    interp.define_method(&ctor, "isInteger", 1, is_integer);
    interp.define_method(&ctor, "isFinite", 1, is_finite);
    interp.define_method(&ctor, "isNaN", 1, is_nan);
    interp.define_method(&ctor, "isSafeInteger", 1, is_safe_integer);

    // `Number.parseInt === parseInt`
    let parsers: [(&str, usize, NativeFn); 2] =
        [("parseInt", 2, parse_int), ("parseFloat", 1, parse_float)];
    for (name, arity, func) in parsers {
        let f = interp.make_native(name, arity, func);
        interp.realm.intrinsics.push(f.clone());
        define_hidden(&ctor, name, JsValue::Object(f.clone()));
        interp.define_global(name, JsValue::Object(f));
    }

    interp.define_method(&proto, "toFixed", 1, to_fixed);
    interp.define_method(&proto, "toString", 1, to_string);
    interp.define_method(&proto, "valueOf", 0, value_of);
    interp.define_global("Number", JsValue::Object(ctor));

    let boolean_proto = interp.realm.boolean_prototype.clone();
    let boolean_ctor = interp.make_constructor("Boolean", 1, boolean, &boolean_proto);
    interp.define_method(&boolean_proto, "toString", 0, boolean_to_string);
    interp.define_method(&boolean_proto, "valueOf", 0, boolean_value_of);
    interp.define_global("Boolean", JsValue::Object(boolean_ctor));
}

fn number(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    if call.args.is_empty() {
        return Ok(JsValue::Number(0.0));
    }
    interp.to_number(&call.arg(0)).map(JsValue::Number)
}

fn is_integer(_interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    Ok(JsValue::Bool(
        call.arg(0).as_number().is_some_and(|n| n.is_finite() && n.trunc() == n),
    ))
}

fn is_safe_integer(_interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    Ok(JsValue::Bool(call.arg(0).as_number().is_some_and(|n| {
        n.is_finite() && n.trunc() == n && n.abs() <= MAX_SAFE_INTEGER
    })))
}

fn is_finite(_interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    Ok(JsValue::Bool(call.arg(0).as_number().is_some_and(f64::is_finite)))
}

fn is_nan(_interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    Ok(JsValue::Bool(call.arg(0).as_number().is_some_and(f64::is_nan)))
}

// ── Parsing ───────────────────────────────────────────────────────────────────

fn parse_int(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let text = interp.to_string(&call.arg(0))?;
    let radix = match call.arg(1) {
        JsValue::Undefined => 0,
        value => to_int32(interp.to_number(&value)?),
    };
    Ok(JsValue::Number(parse_int_str(&text, radix)))
}

pub(crate) fn parse_int_str(text: &str, radix: i32) -> f64 {
    let mut s = trim_js_start(text);
    let mut sign = 1.0;
    if let Some(rest) = s.strip_prefix('-') {
        sign = -1.0;
        s = rest;
    } else if let Some(rest) = s.strip_prefix('+') {
        s = rest;
    }
    let mut radix = radix;
    let hex_prefixed = s.starts_with("0x") || s.starts_with("0X");
    if radix == 0 {
        radix = if hex_prefixed { 16 } else { 10 };
    }
    if !(2..=36).contains(&radix) {
        return f64::NAN;
    }
    if radix == 16 && hex_prefixed {
        s = &s[2..];
    }
    let mut value = 0.0;
    let mut any = false;
    for c in s.chars() {
        let Some(digit) = c.to_digit(radix as u32) else {
            break;
        };
        value = value * f64::from(radix) + f64::from(digit);
        any = true;
    }
    if any {
        sign * value
    } else {
        f64::NAN
    }
}

fn parse_float(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let text = interp.to_string(&call.arg(0))?;
    Ok(JsValue::Number(parse_float_str(&text)))
}

/// The longest prefix of `text` that is a decimal literal.
pub(crate) fn parse_float_str(text: &str) -> f64 {
    let s = trim_js_start(text);
    let bytes = s.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }
    if s[end..].starts_with("Infinity") {
        return if s.starts_with('-') {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        };
    }
    let digits_from = |mut i: usize| {
        while bytes.get(i).is_some_and(u8::is_ascii_digit) {
            i += 1;
        }
        i
    };
    let int_end = digits_from(end);
    let mut mantissa_digits = int_end - end;
    end = int_end;
    if bytes.get(end) == Some(&b'.') {
        let frac_end = digits_from(end + 1);
        mantissa_digits += frac_end - end - 1;
        if mantissa_digits > 0 {
            end = frac_end;
        }
    }
    if mantissa_digits == 0 {
        return f64::NAN;
    }
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp = end + 1;
        if matches!(bytes.get(exp), Some(b'+' | b'-')) {
            exp += 1;
        }
        let exp_end = digits_from(exp);
        if exp_end > exp {
            end = exp_end;
        }
    }
    s[..end].parse().unwrap_or(f64::NAN)
}

// ── Number.prototype ──────────────────────────────────────────────────────────

fn this_number(interp: &Interpreter, call: &CallArgs, method: &str) -> EvalResult<f64> {
    match call.this {
        JsValue::Number(n) => Ok(n),
        _ => Err(interp.type_error(format!(
            "Number.prototype.{method} requires that 'this' be a Number"
        ))),
    }
}

fn to_fixed(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let x = this_number(interp, call, "toFixed")?;
    let digits = to_integer(interp.to_number(&call.arg(0))?);
    if !(0.0..=100.0).contains(&digits) {
        return Err(interp.range_error("toFixed() digits argument must be between 0 and 100"));
    }
    if !x.is_finite() || x.abs() >= 1e21 {
        return Ok(JsValue::from(format_number(x)));
    }
    Ok(JsValue::from(fixed(x, digits as usize)))
}

/// `x` with `digits` fraction digits, ties rounding away from zero.
fn fixed(x: f64, digits: usize) -> String {
    // Every finite f64 has an exact expansion within this many places.
    let exact = format!("{:.1100}", x.abs());
    let (int_part, frac_part) = exact.split_once('.').unwrap_or((exact.as_str(), ""));
    let mut out: Vec<u8> = int_part
        .bytes()
        .chain(frac_part.bytes().chain(std::iter::repeat(b'0')).take(digits))
        .collect();
    if frac_part.as_bytes().get(digits).is_some_and(|&b| b >= b'5') {
        let mut i = out.len();
        loop {
            if i == 0 {
                out.insert(0, b'1');
                break;
            }
            i -= 1;
            if out[i] == b'9' {
                out[i] = b'0';
            } else {
                out[i] += 1;
                break;
            }
        }
    }
    let int_len = out.len() - digits;
    let mut text = String::with_capacity(out.len() + 2);
    if x < 0.0 {
        text.push('-');
    }
    text.push_str(&String::from_utf8_lossy(&out[..int_len]));
    if digits > 0 {
        text.push('.');
        text.push_str(&String::from_utf8_lossy(&out[int_len..]));
    }
    text
}

fn to_string(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let x = this_number(interp, call, "toString")?;
    let radix = match call.arg(0) {
        JsValue::Undefined => 10.0,
        value => to_integer(interp.to_number(&value)?),
    };
    if !(2.0..=36.0).contains(&radix) {
        return Err(interp.range_error("toString() radix must be between 2 and 36"));
    }
    if radix == 10.0 {
        return Ok(JsValue::from(format_number(x)));
    }
    Ok(JsValue::from(radix_string(x, radix as u32)))
}

fn radix_string(x: f64, radix: u32) -> String {
    if !x.is_finite() {
        return format_number(x);
    }
    let base = f64::from(radix);
    let mut int = x.abs().trunc();
    let mut frac = x.abs() - int;

    let mut digits = Vec::new();
    loop {
        let d = (int % base) as u32;
        digits.push(char::from_digit(d, radix).unwrap_or('0'));
        int = (int / base).trunc();
        if int < 1.0 {
            break;
        }
    }
    if x < 0.0 {
        digits.push('-');
    }
    let mut text: String = digits.into_iter().rev().collect();

    if frac > 0.0 {
        text.push('.');
        for _ in 0..52 {
            frac *= base;
            let d = frac.trunc();
            text.push(char::from_digit(d as u32, radix).unwrap_or('0'));
            frac -= d;
            if frac <= 0.0 {
                break;
            }
        }
    }
    text
}

fn value_of(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    this_number(interp, call, "valueOf").map(JsValue::Number)
}

// ── Boolean ───────────────────────────────────────────────────────────────────

fn boolean(_interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    Ok(JsValue::Bool(to_boolean(&call.arg(0))))
}

fn this_boolean(interp: &Interpreter, call: &CallArgs, method: &str) -> EvalResult<bool> {
    match call.this {
        JsValue::Bool(b) => Ok(b),
        _ => Err(interp.type_error(format!(
            "Boolean.prototype.{method} requires that 'this' be a Boolean"
        ))),
    }
}

fn boolean_to_string(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let b = this_boolean(interp, call, "toString")?;
    Ok(JsValue::str(if b { "true" } else { "false" }))
}

fn boolean_value_of(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    this_boolean(interp, call, "valueOf").map(JsValue::Bool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_fixed_rounds_ties_up() {
        assert_eq!(fixed(2.5, 0), "3");
        assert_eq!(fixed(1.005, 2), "1.00");
        assert_eq!(fixed(9.995, 2), "9.99");
        assert_eq!(fixed(99.5, 0), "100");
        assert_eq!(fixed(-1.5, 1), "-1.5");
        assert_eq!(fixed(0.1, 3), "0.100");
    }

    #[test]
    fn radix_strings() {
        assert_eq!(radix_string(255.0, 16), "ff");
        assert_eq!(radix_string(-10.0, 2), "-1010");
        assert_eq!(radix_string(0.5, 2), "0.1");
        assert_eq!(radix_string(0.0, 36), "0");
    }

    #[test]
    fn parse_int_prefixes() {
        assert_eq!(parse_int_str("  42px", 0), 42.0);
        assert_eq!(parse_int_str("0x1F", 0), 31.0);
        assert_eq!(parse_int_str("-101", 2), -5.0);
        assert!(parse_int_str("abc", 10).is_nan());
        assert!(parse_int_str("10", 40).is_nan());
    }

    #[test]
    fn parse_float_prefixes() {
        assert_eq!(parse_float_str("3.14abc"), 3.14);
        assert_eq!(parse_float_str(" -2e3x"), -2000.0);
        assert_eq!(parse_float_str(".5"), 0.5);
        assert_eq!(parse_float_str("1e"), 1.0);
        assert!(parse_float_str("e5").is_nan());
        assert_eq!(parse_float_str("-Infinity"), f64::NEG_INFINITY);
    }
}
