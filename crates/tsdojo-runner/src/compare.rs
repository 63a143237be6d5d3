//! Structural equality between an actual and an expected value.

use tsdojo_types::Value;

/// Deep equality with no coercion. Numbers compare by IEEE equality
/// (`NaN` never equals itself, `0` equals `-0`), sequences pairwise in
/// order, mappings by identical key sets then per key. Opaque values never
/// compare equal.
pub fn compare(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Number(a), Value::Number(b)) => a == b,
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| compare(x, y))
        }
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(key, x)| b.get(key).is_some_and(|y| compare(x, y)))
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arr(items: &[f64]) -> Value {
        Value::Array(items.iter().map(|n| Value::Number(*n)).collect())
    }

    #[test]
    fn primitives() {
        assert!(compare(&Value::Null, &Value::Null));
        assert!(compare(&Value::Undefined, &Value::Undefined));
        assert!(compare(&"a".into(), &"a".into()));
        assert!(compare(&true.into(), &true.into()));
        assert!(!compare(&true.into(), &false.into()));
    }

    #[test]
    fn numbers_use_ieee_equality() {
        assert!(!compare(&f64::NAN.into(), &f64::NAN.into()));
        assert!(compare(&0.0.into(), &(-0.0).into()));
        assert!(compare(&0.5.into(), &0.5.into()));
    }

    #[test]
    fn no_coercion_between_kinds() {
        assert!(!compare(&"2".into(), &2.0.into()));
        assert!(!compare(&Value::Null, &Value::Undefined));
        assert!(!compare(&0.0.into(), &false.into()));
        assert!(!compare(&Value::Array(vec![]), &Value::Object(Default::default())));
    }

    #[test]
    fn sequences_are_ordered() {
        assert!(compare(&arr(&[1.0, 2.0]), &arr(&[1.0, 2.0])));
        assert!(!compare(&arr(&[1.0, 2.0]), &arr(&[2.0, 1.0])));
        assert!(!compare(&arr(&[1.0]), &arr(&[1.0, 1.0])));
    }

    #[test]
    fn mappings_ignore_key_order() {
        let ab = Value::object([("a", 1.0.into()), ("b", 2.0.into())]);
        let ba = Value::object([("b", 2.0.into()), ("a", 1.0.into())]);
        let a = Value::object([("a", 1.0.into())]);
        assert!(compare(&ab, &ba));
        assert!(!compare(&ab, &a));
        assert!(!compare(&a, &ab));
    }

    #[test]
    fn missing_key_differs_from_undefined_value() {
        let with_undefined = Value::object([("a", 1.0.into()), ("b", Value::Undefined)]);
        let without = Value::object([("a", 1.0.into())]);
        assert!(!compare(&with_undefined, &without));
    }

    #[test]
    fn nested_structures() {
        let make = |z: f64| {
            Value::object([
                ("list", arr(&[1.0, 2.0])),
                ("inner", Value::object([("z", z.into())])),
            ])
        };
        assert!(compare(&make(3.0), &make(3.0)));
        assert!(!compare(&make(3.0), &make(4.0)));
    }

    #[test]
    fn opaque_values_never_match() {
        let f = Value::Opaque("[Function: inc]".into());
        assert!(!compare(&f, &f));
        assert!(!compare(&f, &"[Function: inc]".into()));
    }

    #[test]
    fn reflexive_on_data_values() {
        let values = [
            Value::Null,
            Value::Undefined,
            true.into(),
            1.5.into(),
            "s".into(),
            arr(&[1.0, 2.0]),
            Value::object([("k", Value::Array(vec![Value::Null]))]),
        ];
        for v in &values {
            assert!(compare(v, v), "{v} should equal itself");
        }
    }
}
