//! Validation support for the `x-gts-ref` JSON Schema extension keyword.
//!
//! A schema may mark a string property with `x-gts-ref`, whose value is either
//! a GTS id pattern (e.g. `gts.x.core.events.topic.v1~` or a wildcard such as
//! `gts.x.core.*`) or a JSON Pointer (e.g. `/$id`) into the same schema that
//! resolves to such a pattern. At validation time, string values at that
//! location must be valid GTS ids matching the resolved pattern.

use serde_json::Value;
use std::fmt;

use crate::gts::GtsID;

#[derive(Debug, Clone)]
pub struct XGtsRefValidationError {
    pub field_path: String,
    pub value: String,
    pub ref_pattern: String,
    pub reason: String,
}

impl XGtsRefValidationError {
    #[must_use]
    pub fn new(field_path: String, value: String, ref_pattern: String, reason: String) -> Self {
        Self {
            field_path,
            value,
            ref_pattern,
            reason,
        }
    }
}

impl fmt::Display for XGtsRefValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "x-gts-ref validation failed for field '{}': {}",
            self.field_path, self.reason
        )
    }
}

impl std::error::Error for XGtsRefValidationError {}

#[derive(Debug, Default)]
pub struct XGtsRefValidator;

impl XGtsRefValidator {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Validates an instance against the `x-gts-ref` constraints declared in `schema`,
    /// walking object properties and array items in lockstep with the schema tree.
    /// `registry` when supplied is consulted to flag `xref-not-in-registry` values.
    #[must_use]
    pub fn validate_instance(
        &self,
        instance: &Value,
        schema: &Value,
        instance_path: &str,
        registry: Option<&dyn Fn(&str) -> bool>,
    ) -> Vec<XGtsRefValidationError> {
        let mut errors = Vec::new();
        self.visit_instance(instance, schema, schema, instance_path, registry, &mut errors);
        errors
    }

    #[allow(clippy::too_many_arguments)]
    fn visit_instance(
        &self,
        inst: &Value,
        sch: &Value,
        root_schema: &Value,
        path: &str,
        registry: Option<&dyn Fn(&str) -> bool>,
        errors: &mut Vec<XGtsRefValidationError>,
    ) {
        let Some(sch_obj) = sch.as_object() else {
            return;
        };

        if let Some(x_gts_ref) = sch_obj.get("x-gts-ref") {
            if let (Some(inst_str), Some(ref_pattern)) = (inst.as_str(), x_gts_ref.as_str()) {
                if let Some(error) =
                    self.validate_ref_value(inst_str, ref_pattern, path, root_schema, registry)
                {
                    errors.push(error);
                }
            }
        }

        if let Some(branches) = sch_obj.get("allOf").and_then(Value::as_array) {
            for branch in branches {
                self.visit_instance(inst, branch, root_schema, path, registry, errors);
            }
        }

        if let Some(branches) = sch_obj.get("anyOf").and_then(Value::as_array) {
            self.visit_combinator(inst, branches, root_schema, path, registry, errors, false);
        }

        if let Some(branches) = sch_obj.get("oneOf").and_then(Value::as_array) {
            self.visit_combinator(inst, branches, root_schema, path, registry, errors, true);
        }

        match sch_obj.get("type").and_then(Value::as_str) {
            Some("object") => {
                let (Some(properties), Some(inst_obj)) = (
                    sch_obj.get("properties").and_then(Value::as_object),
                    inst.as_object(),
                ) else {
                    return;
                };
                for (prop_name, prop_schema) in properties {
                    if let Some(prop_value) = inst_obj.get(prop_name) {
                        let prop_path = if path.is_empty() {
                            prop_name.clone()
                        } else {
                            format!("{path}.{prop_name}")
                        };
                        self.visit_instance(
                            prop_value,
                            prop_schema,
                            root_schema,
                            &prop_path,
                            registry,
                            errors,
                        );
                    }
                }
            }
            Some("array") => {
                let (Some(items), Some(inst_arr)) = (sch_obj.get("items"), inst.as_array()) else {
                    return;
                };
                for (idx, item) in inst_arr.iter().enumerate() {
                    let item_path = format!("{path}[{idx}]");
                    self.visit_instance(item, items, root_schema, &item_path, registry, errors);
                }
            }
            _ => {}
        }
    }

    /// Enforces `anyOf`/`oneOf` over `x-gts-ref` branches. Only applies when every
    /// branch declares its own `x-gts-ref` at the top level — a combinator mixing
    /// ref-bearing and plain branches is left entirely to the base JSON-Schema engine.
    #[allow(clippy::too_many_arguments)]
    fn visit_combinator(
        &self,
        inst: &Value,
        branches: &[Value],
        root_schema: &Value,
        path: &str,
        registry: Option<&dyn Fn(&str) -> bool>,
        errors: &mut Vec<XGtsRefValidationError>,
        exactly_one: bool,
    ) {
        if branches.is_empty() || !branches.iter().all(is_ref_bearing_branch) {
            return;
        }

        let branch_errors: Vec<Vec<XGtsRefValidationError>> = branches
            .iter()
            .map(|branch| {
                let mut local = Vec::new();
                self.visit_instance(inst, branch, root_schema, path, registry, &mut local);
                local
            })
            .collect();

        let passing = branch_errors.iter().filter(|e| e.is_empty()).count();
        let value = inst.as_str().map_or_else(|| inst.to_string(), str::to_owned);

        if exactly_one {
            match passing {
                0 => errors.push(XGtsRefValidationError::new(
                    path.to_owned(),
                    value,
                    String::new(),
                    format!(
                        "value does not match any oneOf branch: {}",
                        join_branch_reasons(&branch_errors)
                    ),
                )),
                1 => {}
                n => errors.push(XGtsRefValidationError::new(
                    path.to_owned(),
                    value,
                    String::new(),
                    format!("value matches {n} oneOf branches but must match exactly one"),
                )),
            }
        } else if passing == 0 {
            errors.push(XGtsRefValidationError::new(
                path.to_owned(),
                value,
                String::new(),
                format!(
                    "value does not match any anyOf branch: {}",
                    join_branch_reasons(&branch_errors)
                ),
            ));
        }
    }

    /// Validates every `x-gts-ref` field found while walking `schema`, resolving
    /// relative pointers against `root_schema` (or `schema` itself when absent).
    #[must_use]
    pub fn validate_schema(
        &self,
        schema: &Value,
        schema_path: &str,
        root_schema: Option<&Value>,
    ) -> Vec<XGtsRefValidationError> {
        let root = root_schema.unwrap_or(schema);
        let mut errors = Vec::new();
        self.visit_schema(schema, schema_path, root, &mut errors);
        errors
    }

    fn visit_schema(
        &self,
        sch: &Value,
        path: &str,
        root_schema: &Value,
        errors: &mut Vec<XGtsRefValidationError>,
    ) {
        let Some(sch_obj) = sch.as_object() else {
            return;
        };

        if let Some(x_gts_ref) = sch_obj.get("x-gts-ref") {
            let ref_path = if path.is_empty() {
                "x-gts-ref".to_owned()
            } else {
                format!("{path}/x-gts-ref")
            };

            if let Some(ref_value) = x_gts_ref.as_str() {
                if let Some(error) = self.validate_ref_pattern(ref_value, &ref_path, root_schema) {
                    errors.push(error);
                }
            } else {
                let rendered = serde_json::to_string(x_gts_ref).unwrap_or_default();
                errors.push(XGtsRefValidationError::new(
                    ref_path,
                    rendered,
                    String::new(),
                    "x-gts-ref value must be a string".to_owned(),
                ));
            }
        }

        for (key, value) in sch_obj {
            if key == "x-gts-ref" {
                continue;
            }
            let nested_path = if path.is_empty() {
                key.clone()
            } else {
                format!("{path}/{key}")
            };

            if value.is_object() {
                self.visit_schema(value, &nested_path, root_schema, errors);
            } else if let Some(arr) = value.as_array() {
                for (idx, item) in arr.iter().enumerate() {
                    if item.is_object() {
                        let item_path = format!("{nested_path}[{idx}]");
                        self.visit_schema(item, &item_path, root_schema, errors);
                    }
                }
            }
        }
    }

    fn validate_ref_value(
        &self,
        value: &str,
        ref_pattern: &str,
        field_path: &str,
        schema: &Value,
        registry: Option<&dyn Fn(&str) -> bool>,
    ) -> Option<XGtsRefValidationError> {
        let resolved_pattern = if let Some(pointer) = ref_pattern.strip_prefix('/') {
            let Some(resolved) = self.resolve_pointer(schema, &format!("/{pointer}")) else {
                return Some(XGtsRefValidationError::new(
                    field_path.to_owned(),
                    value.to_owned(),
                    ref_pattern.to_owned(),
                    format!("cannot resolve reference path '{ref_pattern}'"),
                ));
            };
            if !resolved.starts_with("gts.") {
                return Some(XGtsRefValidationError::new(
                    field_path.to_owned(),
                    value.to_owned(),
                    ref_pattern.to_owned(),
                    format!("resolved reference '{ref_pattern}' -> '{resolved}' is not a GTS pattern"),
                ));
            }
            resolved
        } else {
            ref_pattern.to_owned()
        };

        if let Some(error) = self.validate_gts_pattern(value, &resolved_pattern, field_path) {
            return Some(error);
        }

        if let Some(has) = registry {
            if !has(value) {
                return Some(XGtsRefValidationError::new(
                    field_path.to_owned(),
                    value.to_owned(),
                    resolved_pattern,
                    format!("referenced identifier '{value}' is not present in the registry"),
                ));
            }
        }

        None
    }

    fn validate_ref_pattern(
        &self,
        ref_pattern: &str,
        field_path: &str,
        root_schema: &Value,
    ) -> Option<XGtsRefValidationError> {
        if ref_pattern.starts_with("gts.") {
            return self.validate_gts_id_or_pattern(ref_pattern, field_path);
        }

        if ref_pattern.starts_with('/') {
            return match self.resolve_pointer(root_schema, ref_pattern) {
                Some(resolved) if GtsID::is_valid(&resolved) => None,
                Some(resolved) => Some(XGtsRefValidationError::new(
                    field_path.to_owned(),
                    ref_pattern.to_owned(),
                    ref_pattern.to_owned(),
                    format!(
                        "resolved reference '{ref_pattern}' -> '{resolved}' is not a valid GTS identifier"
                    ),
                )),
                None => Some(XGtsRefValidationError::new(
                    field_path.to_owned(),
                    ref_pattern.to_owned(),
                    ref_pattern.to_owned(),
                    format!("cannot resolve reference path '{ref_pattern}'"),
                )),
            };
        }

        Some(XGtsRefValidationError::new(
            field_path.to_owned(),
            ref_pattern.to_owned(),
            ref_pattern.to_owned(),
            format!("invalid x-gts-ref value: '{ref_pattern}' must start with 'gts.' or '/'"),
        ))
    }

    fn validate_gts_id_or_pattern(
        &self,
        pattern: &str,
        field_path: &str,
    ) -> Option<XGtsRefValidationError> {
        if pattern == "gts.*" {
            return None;
        }

        if pattern.contains('*') {
            let prefix = pattern.trim_end_matches('*');
            if prefix.starts_with("gts.") {
                return None;
            }
            return Some(XGtsRefValidationError::new(
                field_path.to_owned(),
                pattern.to_owned(),
                pattern.to_owned(),
                format!("invalid GTS wildcard pattern: {pattern}"),
            ));
        }

        if GtsID::is_valid(pattern) {
            return None;
        }
        Some(XGtsRefValidationError::new(
            field_path.to_owned(),
            pattern.to_owned(),
            pattern.to_owned(),
            format!("invalid GTS identifier: {pattern}"),
        ))
    }

    fn validate_gts_pattern(
        &self,
        value: &str,
        pattern: &str,
        field_path: &str,
    ) -> Option<XGtsRefValidationError> {
        if !GtsID::is_valid(value) {
            return Some(XGtsRefValidationError::new(
                field_path.to_owned(),
                value.to_owned(),
                pattern.to_owned(),
                format!("value '{value}' is not a valid GTS identifier"),
            ));
        }

        let matches = if pattern == "gts.*" {
            true
        } else if let Some(prefix) = pattern.strip_suffix('*') {
            value.starts_with(prefix)
        } else {
            value.starts_with(pattern)
        };

        if matches {
            None
        } else {
            Some(XGtsRefValidationError::new(
                field_path.to_owned(),
                value.to_owned(),
                pattern.to_owned(),
                format!("value '{value}' does not match pattern '{pattern}'"),
            ))
        }
    }

    /// Resolves a JSON Pointer (e.g. `/$id`, `/properties/type`) against `schema`,
    /// following at most one level of indirection through a nested `x-gts-ref`.
    fn resolve_pointer(&self, schema: &Value, pointer: &str) -> Option<String> {
        let path = pointer.trim_start_matches('/');
        if path.is_empty() {
            return None;
        }

        let mut current = schema;
        for part in path.split('/') {
            current = current.as_object()?.get(part)?;
        }

        if let Some(s) = current.as_str() {
            return Some(s.to_owned());
        }

        let ref_str = current.as_object()?.get("x-gts-ref")?.as_str()?;
        if let Some(nested_pointer) = ref_str.strip_prefix('/') {
            return self.resolve_pointer(schema, &format!("/{nested_pointer}"));
        }
        Some(ref_str.to_owned())
    }
}

fn is_ref_bearing_branch(branch: &Value) -> bool {
    branch
        .as_object()
        .is_some_and(|obj| obj.contains_key("x-gts-ref"))
}

fn join_branch_reasons(branch_errors: &[Vec<XGtsRefValidationError>]) -> String {
    branch_errors
        .iter()
        .flatten()
        .map(|e| e.reason.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn validate_gts_pattern_exact_match() {
        let validator = XGtsRefValidator::new();
        let result = validator.validate_gts_pattern(
            "gts.x.core.events.topic.v1~",
            "gts.x.core.events.topic.v1~",
            "test_field",
        );
        assert!(result.is_none());
    }

    #[test]
    fn validate_gts_pattern_wildcard() {
        let validator = XGtsRefValidator::new();
        let result =
            validator.validate_gts_pattern("gts.x.core.events.topic.v1~", "gts.*", "test_field");
        assert!(result.is_none());
    }

    #[test]
    fn validate_gts_pattern_prefix_match() {
        let validator = XGtsRefValidator::new();
        let result = validator.validate_gts_pattern(
            "gts.x.core.events.topic.v1~",
            "gts.x.core.*",
            "test_field",
        );
        assert!(result.is_none());
    }

    #[test]
    fn validate_gts_pattern_mismatch() {
        let validator = XGtsRefValidator::new();
        let result = validator.validate_gts_pattern(
            "gts.x.core.events.topic.v1~",
            "gts.y.core.*",
            "test_field",
        );
        assert!(result.is_some());
    }

    #[test]
    fn validate_schema_with_x_gts_ref() {
        let validator = XGtsRefValidator::new();
        let schema = json!({
            "type": "object",
            "properties": {
                "topic_id": {"type": "string", "x-gts-ref": "gts.x.core.events.topic.*"}
            }
        });

        let errors = validator.validate_schema(&schema, "", None);
        assert!(errors.is_empty());
    }

    #[test]
    fn validate_instance_with_x_gts_ref() {
        let validator = XGtsRefValidator::new();
        let schema = json!({
            "type": "object",
            "properties": {
                "topic_id": {"type": "string", "x-gts-ref": "gts.x.core.events.topic.*"}
            }
        });
        let instance = json!({"topic_id": "gts.x.core.events.topic.v1~"});

        let errors = validator.validate_instance(&instance, &schema, "", None);
        assert!(errors.is_empty());
    }

    #[test]
    fn validate_instance_with_x_gts_ref_mismatch() {
        let validator = XGtsRefValidator::new();
        let schema = json!({
            "type": "object",
            "properties": {
                "topic_id": {"type": "string", "x-gts-ref": "gts.x.core.events.topic.*"}
            }
        });
        let instance = json!({"topic_id": "gts.y.core.events.topic.v1~"});

        let errors = validator.validate_instance(&instance, &schema, "", None);
        assert!(!errors.is_empty());
    }

    #[test]
    fn validate_instance_resolves_pointer_to_schema_id() {
        let validator = XGtsRefValidator::new();
        let schema = json!({
            "$id": "gts.x.test._.schema.v1~",
            "type": "object",
            "properties": {
                "id": {"type": "string", "x-gts-ref": "/$id"}
            }
        });
        let instance = json!({"id": "gts.x.test._.schema.v1~"});

        let errors = validator.validate_instance(&instance, &schema, "", None);
        assert!(errors.is_empty());
    }

    #[test]
    fn validate_schema_rejects_non_string_x_gts_ref() {
        let validator = XGtsRefValidator::new();
        let schema = json!({
            "type": "object",
            "properties": {
                "id": {"type": "string", "x-gts-ref": 42}
            }
        });

        let errors = validator.validate_schema(&schema, "", None);
        assert!(!errors.is_empty());
    }

    #[test]
    fn validate_instance_one_of_overlapping_refs_rejected() {
        let validator = XGtsRefValidator::new();
        let schema = json!({
            "type": "object",
            "properties": {
                "target_id": {
                    "oneOf": [
                        {"x-gts-ref": "gts.test.pkg.ns.*"},
                        {"x-gts-ref": "gts.test.pkg.ns.target_a.*"}
                    ]
                }
            }
        });
        let instance = json!({"target_id": "gts.test.pkg.ns.target_a.v1~"});

        let errors = validator.validate_instance(&instance, &schema, "", None);
        assert!(!errors.is_empty());
        assert!(errors[0].reason.contains("oneOf"));
    }

    #[test]
    fn validate_instance_one_of_single_match_accepted() {
        let validator = XGtsRefValidator::new();
        let schema = json!({
            "type": "object",
            "properties": {
                "target_id": {
                    "oneOf": [
                        {"x-gts-ref": "gts.test.pkg.ns.target_a.*"},
                        {"x-gts-ref": "gts.test.pkg.ns.target_b.*"}
                    ]
                }
            }
        });
        let instance = json!({"target_id": "gts.test.pkg.ns.target_a.v1~"});

        let errors = validator.validate_instance(&instance, &schema, "", None);
        assert!(errors.is_empty());
    }

    #[test]
    fn validate_instance_one_of_zero_matches_rejected() {
        let validator = XGtsRefValidator::new();
        let schema = json!({
            "type": "object",
            "properties": {
                "target_id": {
                    "oneOf": [
                        {"x-gts-ref": "gts.test.pkg.ns.target_a.*"},
                        {"x-gts-ref": "gts.test.pkg.ns.target_b.*"}
                    ]
                }
            }
        });
        let instance = json!({"target_id": "gts.test.pkg.ns.target_c.v1~"});

        let errors = validator.validate_instance(&instance, &schema, "", None);
        assert!(!errors.is_empty());
        assert!(errors[0].reason.contains("oneOf"));
    }

    #[test]
    fn validate_instance_any_of_mixed_branches_deferred() {
        let validator = XGtsRefValidator::new();
        let schema = json!({
            "type": "object",
            "properties": {
                "target_id": {
                    "anyOf": [
                        {"x-gts-ref": "gts.test.pkg.ns.target_a.*"},
                        {"type": "string"}
                    ]
                }
            }
        });
        let instance = json!({"target_id": "not-a-gts-id-at-all"});

        let errors = validator.validate_instance(&instance, &schema, "", None);
        assert!(errors.is_empty());
    }

    #[test]
    fn validate_instance_registry_rejects_unregistered_reference() {
        let validator = XGtsRefValidator::new();
        let schema = json!({
            "type": "object",
            "properties": {
                "topic_id": {"type": "string", "x-gts-ref": "gts.x.core.events.topic.*"}
            }
        });
        let instance = json!({"topic_id": "gts.x.core.events.topic.v1~"});

        let registry = |id: &str| id != "gts.x.core.events.topic.v1~";
        let errors = validator.validate_instance(&instance, &schema, "", Some(&registry));
        assert!(!errors.is_empty());
        assert!(errors[0].reason.contains("registry"));
    }

    #[test]
    fn validate_instance_registry_accepts_registered_reference() {
        let validator = XGtsRefValidator::new();
        let schema = json!({
            "type": "object",
            "properties": {
                "topic_id": {"type": "string", "x-gts-ref": "gts.x.core.events.topic.*"}
            }
        });
        let instance = json!({"topic_id": "gts.x.core.events.topic.v1~"});

        let registry = |id: &str| id == "gts.x.core.events.topic.v1~";
        let errors = validator.validate_instance(&instance, &schema, "", Some(&registry));
        assert!(errors.is_empty());
    }
}
