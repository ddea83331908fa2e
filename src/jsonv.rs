//! Defaulted accessors over loosely-shaped JSON documents.
//!
//! Every provider response is a deep tree where any key can be missing.
//! Flatteners read through these helpers so a partial document still yields a
//! full row: strings default to "", integers to 0, floats to 0.0 and lists to
//! an empty slice.

use serde_json::Value;

const EMPTY: &[Value] = &[];

/// Walk `path` through nested objects, returning the value if every key exists.
pub fn at<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut current = value;
    for key in path {
        current = current.get(key)?;
    }
    Some(current)
}

/// String at `path`, or "" when absent or not a string.
pub fn str_at(value: &Value, path: &[&str]) -> String {
    at(value, path)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Integer at `path`, or 0. Whole-valued floats are accepted too, since some
/// feeds serialize counts as `12.0`.
pub fn int_at(value: &Value, path: &[&str]) -> i64 {
    match at(value, path) {
        Some(v) => v
            .as_i64()
            .or_else(|| v.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        None => 0,
    }
}

/// Float at `path`, or 0.0.
pub fn float_at(value: &Value, path: &[&str]) -> f64 {
    at(value, path).and_then(Value::as_f64).unwrap_or(0.0)
}

/// Boolean at `path`, or false.
pub fn bool_at(value: &Value, path: &[&str]) -> bool {
    at(value, path).and_then(Value::as_bool).unwrap_or(false)
}

/// Array at `path`, or an empty slice.
pub fn arr_at<'a>(value: &'a Value, path: &[&str]) -> &'a [Value] {
    at(value, path)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(EMPTY)
}

/// Element `idx` of the array at `path`, or `Value::Null`.
pub fn elem_at<'a>(value: &'a Value, path: &[&str], idx: usize) -> &'a Value {
    static NULL: Value = Value::Null;
    arr_at(value, path).get(idx).unwrap_or(&NULL)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_when_absent() {
        let doc = json!({"a": {"b": "x"}});
        assert_eq!(str_at(&doc, &["a", "b"]), "x");
        assert_eq!(str_at(&doc, &["a", "missing"]), "");
        assert_eq!(int_at(&doc, &["nope"]), 0);
        assert_eq!(float_at(&doc, &["nope"]), 0.0);
        assert!(!bool_at(&doc, &["nope"]));
        assert!(arr_at(&doc, &["nope"]).is_empty());
    }

    #[test]
    fn numbers_coerce() {
        let doc = json!({"count": 12.0, "real": 3.5});
        assert_eq!(int_at(&doc, &["count"]), 12);
        assert_eq!(float_at(&doc, &["real"]), 3.5);
    }

    #[test]
    fn elem_out_of_range_is_null() {
        let doc = json!({"list": [1, 2]});
        assert_eq!(elem_at(&doc, &["list"], 0).as_i64(), Some(1));
        assert!(elem_at(&doc, &["list"], 5).is_null());
    }
}
