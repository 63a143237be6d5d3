//! The `Math` namespace.

use crate::error::EvalResult;
use crate::interpreter::{define_hidden, Interpreter};
use crate::value::{CallArgs, JsValue, NativeFn};

pub(super) fn install(interp: &mut Interpreter) {
    let math = interp.new_intrinsic();
    let constants = [
        ("PI", std::f64::consts::PI),
        ("E", std::f64::consts::E),
        ("LN2", std::f64::consts::LN_2),
        ("LN10", std::f64::consts::LN_10),
        ("LOG2E", std::f64::consts::LOG2_E),
        ("LOG10E", std::f64::consts::LOG10_E),
        ("SQRT2", std::f64::consts::SQRT_2),
        ("SQRT1_2", std::f64::consts::FRAC_1_SQRT_2),
    ];
    for (name, value) in constants {
        define_hidden(&math, name, JsValue::Number(value));
    }

    let functions: &[(&str, usize, NativeFn)] = &[
        ("abs", 1, abs),
        ("floor", 1, floor),
        ("ceil", 1, ceil),
        ("round", 1, round),
        ("trunc", 1, trunc),
        ("sign", 1, sign),
        ("sqrt", 1, sqrt),
        ("cbrt", 1, cbrt),
        ("exp", 1, exp),
        ("log", 1, log),
        ("log2", 1, log2),
        ("log10", 1, log10),
        ("sin", 1, sin),
        ("cos", 1, cos),
        ("tan", 1, tan),
        ("asin", 1, asin),
        ("acos", 1, acos),
        ("atan", 1, atan),
        ("pow", 2, math_pow),
        ("atan2", 2, atan2),
        ("min", 2, min),
        ("max", 2, max),
        ("hypot", 2, hypot),
        ("random", 0, random),
    ];
    for &(name, arity, func) in functions {
        interp.define_method(&math, name, arity, func);
    }
    interp.define_global("Math", JsValue::Object(math));
}

/// `a ** b`. Differs from `powf` where JavaScript answers `NaN`.
pub(crate) fn pow(a: f64, b: f64) -> f64 {
    if b.is_nan() || (a.abs() == 1.0 && b.is_infinite()) {
        f64::NAN
    } else {
        a.powf(b)
    }
}

fn number_arg(interp: &mut Interpreter, call: &CallArgs, index: usize) -> EvalResult<f64> {
    interp.to_number(&call.arg(index))
}

macro_rules! unary {
    ($($name:ident => $f:expr;)*) => {
        $(
            fn $name(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
                let f: fn(f64) -> f64 = $f;
                Ok(JsValue::Number(f(number_arg(interp, call, 0)?)))
            }
        )*
    };
}

unary! {
    abs => f64::abs;
    floor => f64::floor;
    ceil => f64::ceil;
    trunc => f64::trunc;
    sqrt => f64::sqrt;
    cbrt => f64::cbrt;
    exp => f64::exp;
    log => f64::ln;
    log2 => f64::log2;
    log10 => f64::log10;
    sin => f64::sin;
    cos => f64::cos;
    tan => f64::tan;
    asin => f64::asin;
    acos => f64::acos;
    atan => f64::atan;
    round => round_half_up;
    sign => sign_of;
}

/// Ties go towards +∞; `-0` and `(-0.5, -0]` round to `-0`.
fn round_half_up(x: f64) -> f64 {
    if !x.is_finite() || x == 0.0 {
        return x;
    }
    if (-0.5..0.0).contains(&x) {
        return -0.0;
    }
    (x + 0.5).floor()
}

fn sign_of(x: f64) -> f64 {
    if x.is_nan() || x == 0.0 {
        x
    } else {
        x.signum()
    }
}

fn math_pow(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let a = number_arg(interp, call, 0)?;
    let b = number_arg(interp, call, 1)?;
    Ok(JsValue::Number(pow(a, b)))
}

fn atan2(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let y = number_arg(interp, call, 0)?;
    let x = number_arg(interp, call, 1)?;
    Ok(JsValue::Number(y.atan2(x)))
}

fn numbers(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<Vec<f64>> {
    call.args.iter().map(|arg| interp.to_number(arg)).collect()
}

fn min(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let mut result = f64::INFINITY;
    for n in numbers(interp, call)? {
        if n.is_nan() {
            return Ok(JsValue::Number(f64::NAN));
        }
        if n < result || (n == 0.0 && result == 0.0 && n.is_sign_negative()) {
            result = n;
        }
    }
    Ok(JsValue::Number(result))
}

fn max(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let mut result = f64::NEG_INFINITY;
    for n in numbers(interp, call)? {
        if n.is_nan() {
            return Ok(JsValue::Number(f64::NAN));
        }
        if n > result || (n == 0.0 && result == 0.0 && n.is_sign_positive()) {
            result = n;
        }
    }
    Ok(JsValue::Number(result))
}

fn hypot(interp: &mut Interpreter, call: &CallArgs) -> EvalResult<JsValue> {
    let values = numbers(interp, call)?;
    if values.iter().any(|n| n.is_infinite()) {
        return Ok(JsValue::Number(f64::INFINITY));
    }
    Ok(JsValue::Number(values.iter().map(|n| n * n).sum::<f64>().sqrt()))
}

/// xorshift64* seeded per interpreter, so runs are reproducible.
fn random(interp: &mut Interpreter, _call: &CallArgs) -> EvalResult<JsValue> {
    let mut x = interp.rng_state;
    x ^= x >> 12;
    x ^= x << 25;
    x ^= x >> 27;
    interp.rng_state = x;
    let bits = x.wrapping_mul(0x2545_f491_4f6c_dd1d) >> 11;
    Ok(JsValue::Number(bits as f64 / (1u64 << 53) as f64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_matches_javascript() {
        assert_eq!(round_half_up(2.5), 3.0);
        assert_eq!(round_half_up(-2.5), -2.0);
        assert_eq!(round_half_up(-0.4).to_bits(), (-0.0f64).to_bits());
        assert_eq!(round_half_up(1.4), 1.0);
    }

    #[test]
    fn pow_nan_cases() {
        assert!(pow(1.0, f64::INFINITY).is_nan());
        assert!(pow(-1.0, f64::NEG_INFINITY).is_nan());
        assert!(pow(2.0, f64::NAN).is_nan());
        assert_eq!(pow(f64::NAN, 0.0), 1.0);
        assert_eq!(pow(2.0, -1.0), 0.5);
    }
}
