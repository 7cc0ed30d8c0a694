//! Runtime values of the map-function interpreter.

use std::collections::BTreeMap;

use serde_json::{Number, Value as Json};

/// A script value.
///
/// Values are copied on read; there are no shared references between
/// variables.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<Value>),
    Object(BTreeMap<String, Value>),
}

/// Bytes counted per array slot or object entry.
pub const NODE_BYTES: u64 = std::mem::size_of::<Value>() as u64;

/// Heap size and nesting depth of a value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Footprint {
    pub bytes: u64,
    /// 1 for scalars, plus one per level of array or object nesting.
    pub depth: usize,
}

impl Value {
    /// Converts a JSON document into a script value.
    pub fn from_json(json: &Json) -> Self {
        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(*b),
            Json::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            Json::String(s) => Value::String(s.clone()),
            Json::Array(items) => Value::Array(items.iter().map(Value::from_json).collect()),
            Json::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), Value::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Converts a script value into JSON.
    ///
    /// `undefined` becomes `null` (or is dropped from objects), integral
    /// numbers become JSON integers and non-finite numbers become `null`.
    pub fn to_json(&self) -> Json {
        match self {
            Value::Undefined | Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Number(n) => number_to_json(*n),
            Value::String(s) => Json::String(s.clone()),
            Value::Array(items) => Json::Array(items.iter().map(Value::to_json).collect()),
            Value::Object(map) => Json::Object(
                map.iter()
                    .filter(|(_, v)| !matches!(v, Value::Undefined))
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }

    /// Heap bytes owned directly by this value, children excluded.
    pub fn shallow_bytes(&self) -> u64 {
        match self {
            Value::String(s) => s.len() as u64,
            Value::Array(items) => items.len() as u64 * NODE_BYTES,
            Value::Object(map) => map.keys().map(|k| NODE_BYTES + k.len() as u64).sum(),
            _ => 0,
        }
    }

    /// Measures the whole value with an explicit stack, so values of any
    /// depth can be measured.
    pub fn footprint(&self) -> Footprint {
        let mut total = Footprint::default();
        let mut pending = vec![(self, 1)];
        while let Some((value, depth)) = pending.pop() {
            total.bytes += value.shallow_bytes();
            total.depth = total.depth.max(depth);
            match value {
                Value::Array(items) => pending.extend(items.iter().map(|item| (item, depth + 1))),
                Value::Object(map) => pending.extend(map.values().map(|item| (item, depth + 1))),
                _ => {}
            }
        }
        total
    }

    pub fn truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::Array(_) | Value::Object(_) => true,
        }
    }

    /// Result of the `typeof` operator.
    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null | Value::Array(_) | Value::Object(_) => "object",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
        }
    }

    /// String conversion as used by `+` and property keys.
    pub fn to_display(&self) -> String {
        match self {
            Value::Undefined => "undefined".to_string(),
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => format_number(*n),
            Value::String(s) => s.clone(),
            Value::Array(items) => items
                .iter()
                .map(|v| match v {
                    Value::Undefined | Value::Null => String::new(),
                    other => other.to_display(),
                })
                .collect::<Vec<_>>()
                .join(","),
            Value::Object(_) => "[object Object]".to_string(),
        }
    }

    pub fn to_number(&self) -> f64 {
        match self {
            Value::Undefined => f64::NAN,
            Value::Null => 0.0,
            Value::Bool(b) => f64::from(u8::from(*b)),
            Value::Number(n) => *n,
            Value::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    0.0
                } else {
                    trimmed.parse().unwrap_or(f64::NAN)
                }
            }
            Value::Array(items) if items.is_empty() => 0.0,
            Value::Array(items) if items.len() == 1 => items[0].to_number(),
            Value::Array(_) | Value::Object(_) => f64::NAN,
        }
    }

    /// `===`
    pub fn strict_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b,
            (a, b) => a == b,
        }
    }

    /// `==`
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined | Value::Null, Value::Undefined | Value::Null) => true,
            (Value::Undefined | Value::Null, _) | (_, Value::Undefined | Value::Null) => false,
            (Value::Number(_), Value::String(_))
            | (Value::String(_), Value::Number(_))
            | (Value::Bool(_), _)
            | (_, Value::Bool(_)) => self.to_number() == other.to_number(),
            _ => self.strict_eq(other),
        }
    }
}

fn number_to_json(n: f64) -> Json {
    if !n.is_finite() {
        return Json::Null;
    }
    if n.fract() == 0.0 && n.abs() < 9.007_199_254_740_992e15 {
        return Json::Number(Number::from(n as i64));
    }
    Number::from_f64(n).map(Json::Number).unwrap_or(Json::Null)
}

/// Formats a number the way script code expects: integral values have no
/// fractional part.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_conversion_preserves_shape() {
        let json = json!({"a": [1, 2.5, "x", null, true], "b": {"c": 1}});
        assert_eq!(Value::from_json(&json).to_json(), json);
    }

    #[test]
    fn undefined_serializes_as_null_or_is_dropped() {
        assert_eq!(Value::Undefined.to_json(), Json::Null);
        let obj = Value::Object(BTreeMap::from([
            ("a".to_string(), Value::Undefined),
            ("b".to_string(), Value::Number(1.0)),
        ]));
        assert_eq!(obj.to_json(), json!({"b": 1}));
    }

    #[test]
    fn truthiness() {
        assert!(!Value::String(String::new()).truthy());
        assert!(!Value::Number(0.0).truthy());
        assert!(!Value::Number(f64::NAN).truthy());
        assert!(Value::Array(vec![]).truthy());
        assert!(Value::String("0".into()).truthy());
    }

    #[test]
    fn loose_equality_coerces() {
        assert!(Value::Null.loose_eq(&Value::Undefined));
        assert!(Value::Number(1.0).loose_eq(&Value::String("1".into())));
        assert!(Value::Bool(true).loose_eq(&Value::Number(1.0)));
        assert!(!Value::Null.loose_eq(&Value::Number(0.0)));
        assert!(!Value::Number(1.0).strict_eq(&Value::String("1".into())));
    }

    #[test]
    fn footprint_counts_nested_values() {
        let value = Value::from_json(&json!({"ab": [1, "xyz", [true]]}));
        let footprint = value.footprint();
        assert_eq!(footprint.depth, 4);
        assert_eq!(footprint.bytes, (NODE_BYTES + 2) + 3 * NODE_BYTES + 3 + NODE_BYTES);
        assert_eq!(Value::Number(1.0).footprint(), Footprint { bytes: 0, depth: 1 });
    }

    #[test]
    fn number_formatting() {
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(2.5), "2.5");
        assert_eq!(format_number(f64::NAN), "NaN");
    }
}
