use std::collections::BTreeMap;

use serde_json::Value;

/// Types that can flatten themselves into a canonical key/value mapping.
///
/// Configs must implement this explicitly; the wire format never depends on
/// struct field order or reflection. The returned map is the single source of
/// truth for both `config.json` and the run hash.
pub trait Canonical {
    fn canonical_fields(&self) -> BTreeMap<String, Value>;
}

/// Serialize a JSON value canonically: compact, object keys sorted
/// recursively, UTF-8. Identical values produce identical bytes across
/// processes and machines.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<&String, &Value> = map.iter().collect();
            out.push('{');
            for (i, (key, val)) in sorted.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String((*key).clone()).to_string());
                out.push(':');
                write_canonical(val, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        // Scalars already have a stable compact rendering.
        other => out.push_str(&other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn canonical_json_sorts_keys_recursively() {
        let v = json!({"b": 1, "a": {"z": true, "m": [1, 2]}});
        assert_eq!(canonical_json(&v), r#"{"a":{"m":[1,2],"z":true},"b":1}"#);
    }

    #[test]
    fn canonical_json_is_compact() {
        let v = json!({"k": [1.5, "s", null]});
        assert_eq!(canonical_json(&v), r#"{"k":[1.5,"s",null]}"#);
    }

    #[test]
    fn canonical_json_escapes_strings() {
        let v = json!({"path": "a\"b"});
        assert_eq!(canonical_json(&v), r#"{"path":"a\"b"}"#);
    }
}
