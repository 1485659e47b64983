use serde_json::{Map, Value};

/// Collapses nested objects into a single level, joining key paths with
/// `separator`. Arrays and scalars are leaves; an empty nested object
/// contributes nothing. On a path collision the later value wins and keeps
/// the position of the first one.
pub fn flatten(object: &Map<String, Value>, separator: &str) -> Map<String, Value> {
    let mut flat = Map::with_capacity(object.len());
    flatten_into(&mut flat, object, "", separator);
    flat
}

fn flatten_into(out: &mut Map<String, Value>, object: &Map<String, Value>, parent: &str, sep: &str) {
    for (key, value) in object {
        let path = if parent.is_empty() {
            key.clone()
        } else {
            format!("{parent}{sep}{key}")
        };

        match value {
            Value::Object(nested) => flatten_into(out, nested, &path, sep),
            leaf => {
                out.insert(path, leaf.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn test_flat_object_is_unchanged() {
        let input = object(json!({"id": 7, "name": "x", "ok": true, "none": null}));
        assert_eq!(flatten(&input, "."), input);
    }

    #[test]
    fn test_nested_objects_are_joined() {
        let input = object(json!({
            "id": 1,
            "user": {"name": "ada", "address": {"city": "London", "zip": "N1"}},
            "tags": ["a", {"inner": 1}]
        }));

        let flat = flatten(&input, ".");
        assert_eq!(
            Value::Object(flat),
            json!({
                "id": 1,
                "user.name": "ada",
                "user.address.city": "London",
                "user.address.zip": "N1",
                "tags": ["a", {"inner": 1}]
            })
        );
    }

    #[test]
    fn test_document_order_is_kept() {
        let input = object(json!({"z": 1, "a": {"y": 2, "b": 3}, "m": 4}));
        let keys: Vec<String> = flatten(&input, ".").keys().cloned().collect();
        assert_eq!(keys, vec!["z", "a.y", "a.b", "m"]);
    }

    #[test]
    fn test_custom_separator_and_empty_nested_object() {
        let input = object(json!({"meta": {}, "a": {"b": {"c": 1}}}));
        let flat = flatten(&input, "__");
        assert_eq!(Value::Object(flat), json!({"a__b__c": 1}));
    }

    #[test]
    fn test_collision_later_value_wins() {
        let input = object(json!({"a.b": 1, "a": {"b": 2}}));
        let flat = flatten(&input, ".");
        assert_eq!(flat.len(), 1);
        assert_eq!(flat["a.b"], 2);
    }

    #[test]
    fn test_empty_top_level_key_is_not_prefixed() {
        let input = object(json!({"": {"a": 1}}));
        assert_eq!(Value::Object(flatten(&input, ".")), json!({"a": 1}));
    }
}
