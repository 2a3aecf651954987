//! Rewrites the externally authored schema dialect (`$$`-prefixed keys, `gts://`
//! URI form, `x-gts-ref`) into plain JSON-Schema that a standard validator accepts.

use serde_json::{Map, Value};

use crate::gts::GTS_URI_PREFIX;

const RENAMES: &[(&str, &str)] = &[
    ("$$id", "$id"),
    ("$$schema", "$schema"),
    ("$$ref", "$ref"),
    ("$$defs", "$defs"),
];

const COMBINATORS: &[&str] = &["oneOf", "anyOf", "allOf"];

/// Depth-first rewrite of a JSON-Schema tree into the dialect a standard
/// JSON-Schema engine accepts. See the module docs for the exact rules.
#[must_use]
pub fn normalize_schema(schema: &Value) -> Value {
    normalize_node(schema)
}

fn normalize_node(node: &Value) -> Value {
    match node {
        Value::Object(obj) => normalize_object(obj),
        Value::Array(items) => Value::Array(items.iter().map(normalize_node).collect()),
        other => other.clone(),
    }
}

fn normalize_object(obj: &Map<String, Value>) -> Value {
    let mut out = Map::with_capacity(obj.len());

    for (key, value) in obj {
        if key == "x-gts-ref" {
            continue;
        }

        let renamed = RENAMES
            .iter()
            .find(|(from, _)| from == key)
            .map_or(key.as_str(), |(_, to)| to);

        if COMBINATORS.contains(&renamed) {
            if let Value::Array(branches) = value {
                if let Some(normalized) = normalize_combinator(branches) {
                    out.insert(renamed.to_owned(), Value::Array(normalized));
                }
                continue;
            }
        }

        let normalized_value = match (renamed, value) {
            ("$id" | "$ref", Value::String(s)) => {
                Value::String(strip_gts_uri_prefix(s).to_owned())
            }
            _ => normalize_node(value),
        };

        out.insert(renamed.to_owned(), normalized_value);
    }

    Value::Object(out)
}

/// Drops ref-only branches (`{"x-gts-ref": ...}` with no other keys) from a
/// combinator array, normalizing the surviving branches. Returns `None` if the
/// combinator becomes empty and should be dropped entirely.
fn normalize_combinator(branches: &[Value]) -> Option<Vec<Value>> {
    let normalized: Vec<Value> = branches
        .iter()
        .filter(|branch| !is_ref_only_branch(branch))
        .map(normalize_node)
        .collect();

    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}

fn is_ref_only_branch(branch: &Value) -> bool {
    branch
        .as_object()
        .is_some_and(|obj| obj.len() == 1 && obj.contains_key("x-gts-ref"))
}

fn strip_gts_uri_prefix(s: &str) -> &str {
    s.strip_prefix(GTS_URI_PREFIX).unwrap_or(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn removes_x_gts_ref_keyword() {
        let schema = json!({
            "type": "string",
            "x-gts-ref": "gts.vendor.package.namespace.type.v1.0~"
        });
        let normalized = normalize_schema(&schema);
        assert_eq!(normalized, json!({"type": "string"}));
    }

    #[test]
    fn renames_dollar_dollar_keys() {
        let schema = json!({
            "$$id": "gts://gts.vendor.package.namespace.type.v1.0~",
            "$$schema": "http://json-schema.org/draft-07/schema#",
            "$$defs": {
                "inner": {"$$ref": "gts://gts.other.package.namespace.type.v1.0~"}
            }
        });
        let normalized = normalize_schema(&schema);
        assert_eq!(
            normalized,
            json!({
                "$id": "gts.vendor.package.namespace.type.v1.0~",
                "$schema": "http://json-schema.org/draft-07/schema#",
                "$defs": {
                    "inner": {"$ref": "gts.other.package.namespace.type.v1.0~"}
                }
            })
        );
    }

    #[test]
    fn leaves_non_id_ref_string_values_untouched() {
        let schema = json!({
            "description": "gts://not-stripped-here",
        });
        let normalized = normalize_schema(&schema);
        assert_eq!(
            normalized,
            json!({"description": "gts://not-stripped-here"})
        );
    }

    #[test]
    fn drops_ref_only_branch_from_one_of() {
        let schema = json!({
            "oneOf": [
                {"x-gts-ref": "gts.vendor.package.namespace.type.v1.0~"},
                {"type": "object"}
            ]
        });
        let normalized = normalize_schema(&schema);
        assert_eq!(normalized, json!({"oneOf": [{"type": "object"}]}));
    }

    #[test]
    fn drops_combinator_entirely_when_all_branches_are_ref_only() {
        let schema = json!({
            "type": "string",
            "anyOf": [
                {"x-gts-ref": "gts.vendor.package.namespace.type.v1.0~"},
                {"x-gts-ref": "gts.other.package.namespace.type.v1.0~"}
            ]
        });
        let normalized = normalize_schema(&schema);
        assert_eq!(normalized, json!({"type": "string"}));
    }

    #[test]
    fn preserves_intentionally_empty_branch() {
        let schema = json!({
            "allOf": [
                {},
                {"type": "object"}
            ]
        });
        let normalized = normalize_schema(&schema);
        assert_eq!(normalized, json!({"allOf": [{}, {"type": "object"}]}));
    }

    #[test]
    fn recurses_into_nested_properties() {
        let schema = json!({
            "type": "object",
            "properties": {
                "child": {
                    "$$id": "gts://gts.vendor.package.namespace.child.v1.0~",
                    "x-gts-ref": "gts.vendor.package.namespace.ref.v1.0~"
                }
            }
        });
        let normalized = normalize_schema(&schema);
        assert_eq!(
            normalized,
            json!({
                "type": "object",
                "properties": {
                    "child": {
                        "$id": "gts.vendor.package.namespace.child.v1.0~"
                    }
                }
            })
        );
    }
}
