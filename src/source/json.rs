//! TOML to JSON conversion for example payloads.
//!
//! A TOML string in a JSON-valued field holds JSON text; every other TOML
//! value is converted structurally. That keeps `null` and bare JSON strings
//! expressible while letting most examples use native TOML syntax.
use serde_json::{Map, Number, Value};

pub(super) fn json_field(value: &toml::Value) -> Result<Value, String> {
    match value {
        toml::Value::String(text) => {
            serde_json::from_str(text).map_err(|err| format!("is not valid JSON: {err}"))
        }
        other => toml_to_json(other),
    }
}

pub(super) fn toml_to_json(value: &toml::Value) -> Result<Value, String> {
    match value {
        toml::Value::String(text) => Ok(Value::String(text.clone())),
        toml::Value::Integer(number) => Ok(Value::from(*number)),
        toml::Value::Float(number) => Number::from_f64(*number)
            .map(Value::Number)
            .ok_or_else(|| format!("contains non-finite number {number}")),
        toml::Value::Boolean(flag) => Ok(Value::Bool(*flag)),
        toml::Value::Datetime(datetime) => Err(format!(
            "contains TOML datetime {datetime}, which has no JSON equivalent"
        )),
        toml::Value::Array(items) => items
            .iter()
            .map(toml_to_json)
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        toml::Value::Table(table) => {
            let mut map = Map::new();
            for (key, item) in table {
                map.insert(key.clone(), toml_to_json(item)?);
            }
            Ok(Value::Object(map))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(text: &str) -> toml::Value {
        let table: toml::Table = toml::from_str(text).unwrap();
        table.get("v").cloned().unwrap()
    }

    #[test]
    fn string_fields_hold_json_text() {
        assert_eq!(json_field(&parse(r#"v = '["+", 15, 27]'"#)), Ok(json!(["+", 15, 27])));
        assert_eq!(json_field(&parse(r#"v = 'null'"#)), Ok(Value::Null));
        assert!(json_field(&parse(r#"v = '["+", 15,'"#))
            .unwrap_err()
            .contains("not valid JSON"));
    }

    #[test]
    fn native_values_convert_structurally() {
        assert_eq!(
            json_field(&parse(r#"v = { a = 1, b = [true, "x", 2.5] }"#)),
            Ok(json!({"a": 1, "b": [true, "x", 2.5]}))
        );
        assert!(json_field(&parse("v = 1979-05-27")).is_err());
    }
}
