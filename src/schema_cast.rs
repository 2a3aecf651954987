use crate::gts::GtsID;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchemaCastError {
    #[error("internal error: {0}")]
    InternalError(String),
    #[error("Target must be a schema")]
    TargetMustBeSchema,
    #[error("Source schema must be a schema")]
    SourceMustBeSchema,
    #[error("Instance must be an object")]
    InstanceMustBeObject,
    #[error("cast failed: {0}")]
    CastError(String),
}

/// Bundles the output lists threaded through the recursive cast-projection
/// helpers, so a single pass over nested objects and arrays can report added,
/// removed, and rewritten property paths alongside incompatibility reasons.
struct CastAccumulator<'a> {
    added: &'a mut Vec<String>,
    removed: &'a mut Vec<String>,
    changed: &'a mut Vec<String>,
    incompatibilities: &'a mut Vec<String>,
}

/// Result of casting an instance from one schema version to another, along with
/// the compatibility analysis between the two schemas.
#[derive(Debug, Clone, Serialize)]
pub struct GtsEntityCastResult {
    #[serde(rename = "from")]
    pub from_id: String,
    #[serde(rename = "to")]
    pub to_id: String,
    pub old: String,
    pub new: String,
    pub direction: String,
    pub added_properties: Vec<String>,
    pub removed_properties: Vec<String>,
    pub changed_properties: Vec<String>,
    pub is_fully_compatible: bool,
    pub is_backward_compatible: bool,
    pub is_forward_compatible: bool,
    pub incompatibility_reasons: Vec<String>,
    pub backward_errors: Vec<String>,
    pub forward_errors: Vec<String>,
    pub casted_entity: Option<Value>,
    pub error: Option<String>,
}

impl GtsEntityCastResult {
    /// Infers the direction of a cast between two GTS schema ids by comparing
    /// their minor version segments. `"up"` means the minor version increased,
    /// `"down"` means it decreased, `"none"` means they are equal, and
    /// `"unknown"` means either id's minor version could not be parsed.
    #[must_use]
    pub fn infer_direction(from_id: &str, to_id: &str) -> String {
        let from_minor = Self::extract_minor_version(from_id);
        let to_minor = Self::extract_minor_version(to_id);

        match (from_minor, to_minor) {
            (Some(from_minor), Some(to_minor)) => match from_minor.cmp(&to_minor) {
                std::cmp::Ordering::Less => "up".to_owned(),
                std::cmp::Ordering::Greater => "down".to_owned(),
                std::cmp::Ordering::Equal => "none".to_owned(),
            },
            _ => "unknown".to_owned(),
        }
    }

    fn extract_minor_version(id: &str) -> Option<u32> {
        let last_segment = id.split('~').next_back()?;
        let tokens: Vec<&str> = last_segment.split('.').collect();
        let major_pos = tokens
            .iter()
            .position(|t| t.starts_with('v') && t[1..].parse::<u32>().is_ok())?;
        tokens.get(major_pos + 1)?.parse::<u32>().ok()
    }

    /// Casts `instance` (validated against `from_schema`, identified by `from_id`)
    /// into the shape described by `to_schema` (identified by `to_id`).
    ///
    /// # Errors
    ///
    /// Returns [`SchemaCastError::InstanceMustBeObject`] if `instance` is not a
    /// JSON object, or [`SchemaCastError::CastError`] if the target schema
    /// cannot be interpreted.
    pub fn cast(
        from_id: &str,
        to_id: &str,
        instance: &Value,
        from_schema: &Value,
        to_schema: &Value,
        _resolver: Option<&()>,
    ) -> Result<Self, SchemaCastError> {
        let Some(instance_obj) = instance.as_object() else {
            return Err(SchemaCastError::InstanceMustBeObject);
        };

        let flattened_to = Self::flatten_all_of(to_schema);
        let flattened_from = Self::flatten_all_of(from_schema);

        let mut added_properties = Vec::new();
        let mut removed_properties = Vec::new();
        let mut changed_properties = Vec::new();
        let mut incompatibility_reasons = Vec::new();

        let mut casted = Value::Object(instance_obj.clone());
        let mut acc = CastAccumulator {
            added: &mut added_properties,
            removed: &mut removed_properties,
            changed: &mut changed_properties,
            incompatibilities: &mut incompatibility_reasons,
        };
        Self::cast_object(&mut casted, &flattened_to, "", &mut acc);

        added_properties.sort();
        added_properties.dedup();
        removed_properties.sort();
        removed_properties.dedup();
        changed_properties.sort();
        changed_properties.dedup();

        let (is_backward, backward_errors) =
            Self::check_backward_compatibility(&flattened_from, &flattened_to);
        let (is_forward, forward_errors) =
            Self::check_forward_compatibility(&flattened_from, &flattened_to);

        let direction = Self::infer_direction(from_id, to_id);

        let weakened_target = Self::weaken_gts_consts(&flattened_to);
        match jsonschema::JSONSchema::compile(&weakened_target) {
            Ok(compiled) => {
                if let Err(errors) = compiled.validate(&casted) {
                    incompatibility_reasons.extend(errors.map(|e| e.to_string()));
                }
            }
            Err(e) => incompatibility_reasons.push(format!("invalid target schema: {e}")),
        }

        let casted_entity = if incompatibility_reasons.is_empty() {
            Some(casted)
        } else {
            None
        };

        Ok(Self {
            from_id: from_id.to_owned(),
            to_id: to_id.to_owned(),
            old: from_id.to_owned(),
            new: to_id.to_owned(),
            direction,
            added_properties,
            removed_properties,
            changed_properties,
            is_fully_compatible: is_backward && is_forward,
            is_backward_compatible: is_backward,
            is_forward_compatible: is_forward,
            incompatibility_reasons,
            backward_errors,
            forward_errors,
            casted_entity,
            error: None,
        })
    }

    /// Applies steps 3-7 of the cast algorithm to `value` in place, treating
    /// `target` as the flattened schema the value is being projected onto.
    /// `path` is the dotted path of `value` within the overall instance, used
    /// to qualify entries pushed onto `acc`'s lists.
    fn cast_object(value: &mut Value, target: &Value, path: &str, acc: &mut CastAccumulator<'_>) {
        let Some(obj) = value.as_object_mut() else {
            return;
        };

        let properties = target
            .get("properties")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        let required = Self::required_fields(target);

        Self::insert_defaults(obj, &properties, &required, path, acc);
        Self::rewrite_gts_id_consts(obj, &properties, path, acc);
        Self::prune_additional_properties(obj, target, &properties, path, acc);
        Self::recurse_into_children(obj, &properties, path, acc);
    }

    fn qualify(path: &str, name: &str) -> String {
        if path.is_empty() {
            name.to_owned()
        } else {
            format!("{path}.{name}")
        }
    }

    fn insert_defaults(
        obj: &mut serde_json::Map<String, Value>,
        properties: &serde_json::Map<String, Value>,
        required: &[String],
        path: &str,
        acc: &mut CastAccumulator<'_>,
    ) {
        for (name, prop_schema) in properties {
            if obj.contains_key(name) {
                continue;
            }
            if let Some(default) = prop_schema.get("default") {
                obj.insert(name.clone(), default.clone());
                acc.added.push(Self::qualify(path, name));
            } else if required.contains(name) {
                acc.incompatibilities.push(format!(
                    "required property '{}' is missing and has no default value",
                    Self::qualify(path, name)
                ));
            }
        }
    }

    fn rewrite_gts_id_consts(
        obj: &mut serde_json::Map<String, Value>,
        properties: &serde_json::Map<String, Value>,
        path: &str,
        acc: &mut CastAccumulator<'_>,
    ) {
        for (name, prop_schema) in properties {
            let Some(const_value) = prop_schema.get("const").and_then(Value::as_str) else {
                continue;
            };
            if !GtsID::is_valid(const_value) {
                continue;
            }
            let current_is_different_gts_id = obj
                .get(name)
                .and_then(Value::as_str)
                .is_some_and(|current| GtsID::is_valid(current) && current != const_value);
            if current_is_different_gts_id {
                obj.insert(name.clone(), Value::String(const_value.to_owned()));
                acc.changed.push(Self::qualify(path, name));
            }
        }
    }

    fn prune_additional_properties(
        obj: &mut serde_json::Map<String, Value>,
        target: &Value,
        properties: &serde_json::Map<String, Value>,
        path: &str,
        acc: &mut CastAccumulator<'_>,
    ) {
        let additional_properties_allowed = target
            .get("additionalProperties")
            .and_then(Value::as_bool)
            .unwrap_or(true);

        if additional_properties_allowed || properties.is_empty() {
            return;
        }

        let extras: Vec<String> = obj
            .keys()
            .filter(|k| !properties.contains_key(*k))
            .cloned()
            .collect();
        for key in &extras {
            obj.remove(key);
        }
        acc.removed
            .extend(extras.iter().map(|k| Self::qualify(path, k)));
    }

    fn recurse_into_children(
        obj: &mut serde_json::Map<String, Value>,
        properties: &serde_json::Map<String, Value>,
        path: &str,
        acc: &mut CastAccumulator<'_>,
    ) {
        for (name, prop_schema) in properties {
            let Some(child) = obj.get_mut(name) else {
                continue;
            };
            let prop_type = prop_schema.get("type").and_then(Value::as_str);
            let child_path = Self::qualify(path, name);
            if prop_type == Some("object") && child.is_object() {
                let effective = Self::flatten_all_of(prop_schema);
                Self::cast_object(child, &effective, &child_path, acc);
            } else if prop_type == Some("array") {
                Self::recurse_into_array(child, prop_schema, &child_path, acc);
            }
        }
    }

    fn recurse_into_array(
        child: &mut Value,
        prop_schema: &Value,
        child_path: &str,
        acc: &mut CastAccumulator<'_>,
    ) {
        let Some(items_schema) = prop_schema.get("items") else {
            return;
        };
        if items_schema.get("type").and_then(Value::as_str) != Some("object") {
            return;
        }
        let effective = Self::flatten_all_of(items_schema);
        let Some(elements) = child.as_array_mut() else {
            return;
        };
        for (index, element) in elements.iter_mut().enumerate() {
            Self::cast_object(
                element,
                &effective,
                &format!("{child_path}[{index}]"),
                acc,
            );
        }
    }

    /// Returns a copy of `schema` where every `const` keyword whose value is a
    /// valid GTS identifier is replaced with `{"type": "string"}`, recursively.
    /// Used to validate a cast instance without rejecting discriminator fields
    /// whose literal value legitimately differs across schema versions.
    fn weaken_gts_consts(schema: &Value) -> Value {
        match schema {
            Value::Object(obj) => {
                if let Some(const_value) = obj.get("const").and_then(Value::as_str) {
                    if GtsID::is_valid(const_value) {
                        let mut weakened = serde_json::Map::new();
                        for (key, value) in obj {
                            if key == "const" {
                                continue;
                            }
                            weakened.insert(key.clone(), Self::weaken_gts_consts(value));
                        }
                        weakened.insert("type".to_owned(), Value::String("string".to_owned()));
                        return Value::Object(weakened);
                    }
                }
                Value::Object(
                    obj.iter()
                        .map(|(k, v)| (k.clone(), Self::weaken_gts_consts(v)))
                        .collect(),
                )
            }
            Value::Array(arr) => {
                Value::Array(arr.iter().map(Self::weaken_gts_consts).collect())
            }
            other => other.clone(),
        }
    }

    /// Inlines a schema's `allOf` branches into a single flat object schema by
    /// unioning `properties` and `required` across the schema's own fields and
    /// every `allOf` branch. The schema's own top-level `additionalProperties`
    /// wins over anything declared inside a branch. Schemas without `allOf`
    /// are returned unchanged.
    fn flatten_all_of(schema: &Value) -> Value {
        let Some(branches) = schema.get("allOf").and_then(Value::as_array) else {
            return schema.clone();
        };

        let mut merged_properties = serde_json::Map::new();
        let mut merged_required = Vec::new();
        let mut merged_additional_properties = None;

        let mut merge_in = |source: &Value| {
            if let Some(props) = source.get("properties").and_then(Value::as_object) {
                for (key, value) in props {
                    merged_properties.insert(key.clone(), value.clone());
                }
            }
            if let Some(req) = source.get("required").and_then(Value::as_array) {
                for value in req {
                    if let Some(name) = value.as_str() {
                        if !merged_required.contains(&name.to_owned()) {
                            merged_required.push(name.to_owned());
                        }
                    }
                }
            }
            if merged_additional_properties.is_none() {
                merged_additional_properties = source.get("additionalProperties").cloned();
            }
        };

        for branch in branches {
            merge_in(&Self::flatten_all_of(branch));
        }
        // The schema's own direct fields take precedence over branch contents.
        merge_in(schema);
        if let Some(own) = schema.get("additionalProperties") {
            merged_additional_properties = Some(own.clone());
        }

        let mut merged = serde_json::Map::new();
        merged.insert("type".to_owned(), Value::String("object".to_owned()));
        merged.insert("properties".to_owned(), Value::Object(merged_properties));
        merged.insert(
            "required".to_owned(),
            Value::Array(merged_required.into_iter().map(Value::String).collect()),
        );
        if let Some(additional_properties) = merged_additional_properties {
            merged.insert("additionalProperties".to_owned(), additional_properties);
        }
        Value::Object(merged)
    }

    /// Checks whether an instance of `new_schema` would also satisfy `old_schema`,
    /// i.e. whether old readers can consume data produced under the new schema.
    #[must_use]
    pub fn check_backward_compatibility(old_schema: &Value, new_schema: &Value) -> (bool, Vec<String>) {
        let mut errors = Vec::new();
        Self::collect_backward_diff(old_schema, new_schema, &mut errors);
        (errors.is_empty(), errors)
    }

    /// Checks whether an instance of `old_schema` would also satisfy `new_schema`,
    /// i.e. whether new readers can consume data produced under the old schema.
    #[must_use]
    pub fn check_forward_compatibility(old_schema: &Value, new_schema: &Value) -> (bool, Vec<String>) {
        let mut errors = Vec::new();
        Self::collect_forward_diff(old_schema, new_schema, &mut errors);
        (errors.is_empty(), errors)
    }

    /// Flattens both schemas and diffs their `properties`/`required`/`enum`,
    /// appending backward-incompatibility reasons to `errors`. Shared between
    /// the top-level check and the nested object-property recursion in
    /// [`Self::backward_property_diff`].
    fn collect_backward_diff(old_schema: &Value, new_schema: &Value, errors: &mut Vec<String>) {
        let old_schema = Self::flatten_all_of(old_schema);
        let new_schema = Self::flatten_all_of(new_schema);

        let old_properties = old_schema
            .get("properties")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        let new_properties = new_schema
            .get("properties")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        for (name, old_prop) in &old_properties {
            let Some(new_prop) = new_properties.get(name) else {
                continue;
            };
            Self::backward_property_diff(name, old_prop, new_prop, errors);
        }

        let old_required = Self::required_fields(&old_schema);
        let new_required = Self::required_fields(&new_schema);
        for name in &new_required {
            if !old_required.contains(name) {
                errors.push(format!(
                    "new required property '{name}' did not exist in the old schema"
                ));
            }
        }

        if let Some(old_enum) = old_schema.get("enum").and_then(Value::as_array) {
            if let Some(new_enum) = new_schema.get("enum").and_then(Value::as_array) {
                for value in new_enum {
                    if !old_enum.contains(value) {
                        errors.push(format!("enum value {value} added in new schema"));
                    }
                }
            }
        }
    }

    /// Mirror of [`Self::collect_backward_diff`] for the forward direction.
    fn collect_forward_diff(old_schema: &Value, new_schema: &Value, errors: &mut Vec<String>) {
        let old_schema = Self::flatten_all_of(old_schema);
        let new_schema = Self::flatten_all_of(new_schema);

        let old_properties = old_schema
            .get("properties")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        let new_properties = new_schema
            .get("properties")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        for (name, new_prop) in &new_properties {
            let Some(old_prop) = old_properties.get(name) else {
                continue;
            };
            Self::forward_property_diff(name, old_prop, new_prop, errors);
        }

        let old_required = Self::required_fields(&old_schema);
        let new_required = Self::required_fields(&new_schema);
        for name in &old_required {
            if !new_required.contains(name) && new_properties.contains_key(name) {
                errors.push(format!(
                    "property '{name}' is no longer required in the new schema"
                ));
            }
        }

        if let Some(old_enum) = old_schema.get("enum").and_then(Value::as_array) {
            if let Some(new_enum) = new_schema.get("enum").and_then(Value::as_array) {
                for value in old_enum {
                    if !new_enum.contains(value) {
                        errors.push(format!("enum value {value} removed from new schema"));
                    }
                }
            }
        }
    }

    fn required_fields(schema: &Value) -> Vec<String> {
        schema
            .get("required")
            .and_then(Value::as_array)
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str().map(str::to_owned))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// `old` widening into `number` from `integer` is not a backward-incompatible
    /// type change, since every integer is already a valid number.
    fn type_widened(old_type: Option<&Value>, new_type: Option<&Value>) -> bool {
        matches!(
            (old_type.and_then(Value::as_str), new_type.and_then(Value::as_str)),
            (Some("integer"), Some("number"))
        )
    }

    /// Mirror of [`Self::type_widened`] for the forward direction: narrowing
    /// `number` down to `integer` does not break a forward-compatible read.
    fn type_narrowed(old_type: Option<&Value>, new_type: Option<&Value>) -> bool {
        matches!(
            (old_type.and_then(Value::as_str), new_type.and_then(Value::as_str)),
            (Some("number"), Some("integer"))
        )
    }

    /// Flags everything the new schema does to a property that an old-schema
    /// reader could choke on: a type change (other than integer→number
    /// widening), enum values added, bounds tightened, or new bounds
    /// introduced that did not previously constrain the property.
    fn backward_property_diff(name: &str, old_prop: &Value, new_prop: &Value, errors: &mut Vec<String>) {
        let old_type = old_prop.get("type").and_then(Value::as_str);
        let new_type = new_prop.get("type").and_then(Value::as_str);
        if old_type.is_some()
            && old_type != new_type
            && !Self::type_widened(old_prop.get("type"), new_prop.get("type"))
        {
            errors.push(format!("property '{name}' changed type"));
            return;
        }

        if old_type == Some("object") && new_type == Some("object") {
            let mut nested = Vec::new();
            Self::collect_backward_diff(old_prop, new_prop, &mut nested);
            errors.extend(nested.into_iter().map(|e| format!("property '{name}': {e}")));
            return;
        }

        if old_type == Some("array") && new_type == Some("array") {
            if let (Some(old_items), Some(new_items)) = (old_prop.get("items"), new_prop.get("items"))
            {
                Self::backward_property_diff(name, old_items, new_items, errors);
            }
            return;
        }

        if let (Some(old_enum), Some(new_enum)) = (
            old_prop.get("enum").and_then(Value::as_array),
            new_prop.get("enum").and_then(Value::as_array),
        ) {
            for value in new_enum {
                if !old_enum.contains(value) {
                    errors.push(format!("property '{name}' enum value {value} was added"));
                }
            }
        }

        for bound in ["minimum", "minLength", "minItems"] {
            if let (Some(old_value), Some(new_value)) = (
                old_prop.get(bound).and_then(Value::as_f64),
                new_prop.get(bound).and_then(Value::as_f64),
            ) {
                if new_value > old_value {
                    errors.push(format!("property '{name}' tightened lower bound '{bound}'"));
                }
            } else if new_prop.get(bound).is_some() && old_prop.get(bound).is_none() {
                errors.push(format!(
                    "property '{name}' introduced a new constraint '{bound}'"
                ));
            }
        }

        for bound in ["maximum", "maxLength", "maxItems"] {
            if let (Some(old_value), Some(new_value)) = (
                old_prop.get(bound).and_then(Value::as_f64),
                new_prop.get(bound).and_then(Value::as_f64),
            ) {
                if new_value < old_value {
                    errors.push(format!("property '{name}' tightened upper bound '{bound}'"));
                }
            } else if new_prop.get(bound).is_some() && old_prop.get(bound).is_none() {
                errors.push(format!(
                    "property '{name}' introduced a new constraint '{bound}'"
                ));
            }
        }
    }

    /// Flags everything the new schema does to a property that would break a
    /// new-schema reader consuming data produced under the old schema: a type
    /// change (other than number→integer narrowing), enum values removed,
    /// bounds relaxed, or bounds dropped entirely.
    fn forward_property_diff(name: &str, old_prop: &Value, new_prop: &Value, errors: &mut Vec<String>) {
        let old_type = old_prop.get("type").and_then(Value::as_str);
        let new_type = new_prop.get("type").and_then(Value::as_str);
        if old_type.is_some()
            && old_type != new_type
            && !Self::type_narrowed(old_prop.get("type"), new_prop.get("type"))
        {
            errors.push(format!("property '{name}' changed type"));
            return;
        }

        if old_type == Some("object") && new_type == Some("object") {
            let mut nested = Vec::new();
            Self::collect_forward_diff(old_prop, new_prop, &mut nested);
            errors.extend(nested.into_iter().map(|e| format!("property '{name}': {e}")));
            return;
        }

        if old_type == Some("array") && new_type == Some("array") {
            if let (Some(old_items), Some(new_items)) = (old_prop.get("items"), new_prop.get("items"))
            {
                Self::forward_property_diff(name, old_items, new_items, errors);
            }
            return;
        }

        if let (Some(old_enum), Some(new_enum)) = (
            old_prop.get("enum").and_then(Value::as_array),
            new_prop.get("enum").and_then(Value::as_array),
        ) {
            for value in old_enum {
                if !new_enum.contains(value) {
                    errors.push(format!("property '{name}' enum value {value} was removed"));
                }
            }
        }

        for bound in ["minimum", "minLength", "minItems"] {
            if let (Some(old_value), Some(new_value)) = (
                old_prop.get(bound).and_then(Value::as_f64),
                new_prop.get(bound).and_then(Value::as_f64),
            ) {
                if new_value < old_value {
                    errors.push(format!("property '{name}' relaxed lower bound '{bound}'"));
                }
            } else if old_prop.get(bound).is_some() && new_prop.get(bound).is_none() {
                errors.push(format!("property '{name}' removed constraint '{bound}'"));
            }
        }

        for bound in ["maximum", "maxLength", "maxItems"] {
            if let (Some(old_value), Some(new_value)) = (
                old_prop.get(bound).and_then(Value::as_f64),
                new_prop.get(bound).and_then(Value::as_f64),
            ) {
                if new_value > old_value {
                    errors.push(format!("property '{name}' relaxed upper bound '{bound}'"));
                }
            } else if old_prop.get(bound).is_some() && new_prop.get(bound).is_none() {
                errors.push(format!("property '{name}' removed constraint '{bound}'"));
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn infer_direction_up_down_none_unknown() {
        assert_eq!(
            GtsEntityCastResult::infer_direction(
                "gts.vendor.package.namespace.type.v1.0",
                "gts.vendor.package.namespace.type.v1.1"
            ),
            "up"
        );
        assert_eq!(
            GtsEntityCastResult::infer_direction(
                "gts.vendor.package.namespace.type.v1.1",
                "gts.vendor.package.namespace.type.v1.0"
            ),
            "down"
        );
        assert_eq!(
            GtsEntityCastResult::infer_direction(
                "gts.vendor.package.namespace.type.v1.0",
                "gts.vendor.package.namespace.type.v1.0"
            ),
            "none"
        );
        assert_eq!(
            GtsEntityCastResult::infer_direction("invalid", "also-invalid"),
            "unknown"
        );
    }

    #[test]
    fn cast_adds_default_and_preserves_existing() {
        let from_schema = json!({"type": "object", "properties": {"name": {"type": "string"}}});
        let to_schema = json!({
            "type": "object",
            "properties": {
                "name": {"type": "string"},
                "email": {"type": "string", "default": "test@example.com"}
            }
        });
        let instance = json!({"name": "John"});

        let result = GtsEntityCastResult::cast(
            "gts.vendor.package.namespace.type.v1.0",
            "gts.vendor.package.namespace.type.v1.1",
            &instance,
            &from_schema,
            &to_schema,
            None,
        )
        .expect("cast should succeed");

        assert_eq!(result.direction, "up");
        let casted = result.casted_entity.expect("casted entity present");
        assert_eq!(casted.get("email").unwrap(), "test@example.com");
        assert_eq!(casted.get("name").unwrap(), "John");
    }

    #[test]
    fn cast_rejects_non_object_instance() {
        let result = GtsEntityCastResult::cast(
            "gts.vendor.package.namespace.type.v1.0",
            "gts.vendor.package.namespace.type.v1.1",
            &json!("not an object"),
            &json!({"type": "object"}),
            &json!({"type": "object"}),
            None,
        );
        assert!(matches!(result, Err(SchemaCastError::InstanceMustBeObject)));
    }

    #[test]
    fn cast_flags_missing_required_property() {
        let from_schema = json!({"type": "object", "properties": {"name": {"type": "string"}}});
        let to_schema = json!({
            "type": "object",
            "properties": {"name": {"type": "string"}, "age": {"type": "number"}},
            "required": ["name", "age"]
        });
        let instance = json!({"name": "John"});

        let result = GtsEntityCastResult::cast(
            "gts.vendor.package.namespace.type.v1.0",
            "gts.vendor.package.namespace.type.v1.1",
            &instance,
            &from_schema,
            &to_schema,
            None,
        )
        .expect("cast should succeed");

        assert!(!result.incompatibility_reasons.is_empty());
    }

    #[test]
    fn cast_removes_additional_properties_when_disallowed() {
        let from_schema = json!({"type": "object"});
        let to_schema = json!({
            "type": "object",
            "properties": {"name": {"type": "string"}},
            "additionalProperties": false
        });
        let instance = json!({"name": "John", "extra": "field"});

        let result = GtsEntityCastResult::cast(
            "gts.vendor.package.namespace.type.v1.0",
            "gts.vendor.package.namespace.type.v1.1",
            &instance,
            &from_schema,
            &to_schema,
            None,
        )
        .expect("cast should succeed");

        assert_eq!(result.removed_properties, vec!["extra".to_owned()]);
        let casted = result.casted_entity.expect("casted entity present");
        assert!(casted.get("extra").is_none());
    }

    #[test]
    fn cast_keeps_additional_properties_when_allowed() {
        let from_schema = json!({"type": "object"});
        let to_schema = json!({
            "type": "object",
            "properties": {"name": {"type": "string"}},
            "additionalProperties": true
        });
        let instance = json!({"name": "John", "extra": "field"});

        let result = GtsEntityCastResult::cast(
            "gts.vendor.package.namespace.type.v1.0",
            "gts.vendor.package.namespace.type.v1.1",
            &instance,
            &from_schema,
            &to_schema,
            None,
        )
        .expect("cast should succeed");

        assert!(result.removed_properties.is_empty());
    }

    #[test]
    fn cast_flattens_all_of() {
        let from_schema = json!({"type": "object"});
        let to_schema = json!({
            "allOf": [
                {"type": "object", "properties": {"name": {"type": "string"}}, "required": ["name"]},
                {"type": "object", "properties": {"email": {"type": "string"}}}
            ]
        });
        let instance = json!({"name": "test"});

        let result = GtsEntityCastResult::cast(
            "gts.vendor.package.namespace.type.v1.0",
            "gts.vendor.package.namespace.type.v1.1",
            &instance,
            &from_schema,
            &to_schema,
            None,
        );
        assert!(result.is_ok());
    }

    #[test]
    fn cast_rewrites_differing_gts_id_const_discriminator() {
        let from_schema = json!({
            "type": "object",
            "properties": {
                "kind": {"type": "string", "const": "gts.vendor.package.namespace.type.v1.0"}
            }
        });
        let to_schema = json!({
            "type": "object",
            "properties": {
                "kind": {"type": "string", "const": "gts.vendor.package.namespace.type.v1.1"}
            }
        });
        let instance = json!({"kind": "gts.vendor.package.namespace.type.v1.0"});

        let result = GtsEntityCastResult::cast(
            "gts.vendor.package.namespace.type.v1.0",
            "gts.vendor.package.namespace.type.v1.1",
            &instance,
            &from_schema,
            &to_schema,
            None,
        )
        .expect("cast should succeed");

        let casted = result.casted_entity.expect("fully compatible cast has a result");
        assert_eq!(
            casted.get("kind").unwrap(),
            "gts.vendor.package.namespace.type.v1.1"
        );
        assert!(result.changed_properties.contains(&"kind".to_owned()));
    }

    #[test]
    fn cast_leaves_non_gts_id_const_untouched() {
        let from_schema = json!({"type": "object", "properties": {"status": {"type": "string"}}});
        let to_schema = json!({
            "type": "object",
            "properties": {"status": {"type": "string", "const": "active"}}
        });
        let instance = json!({"status": "inactive"});

        let result = GtsEntityCastResult::cast(
            "gts.vendor.package.namespace.type.v1.0",
            "gts.vendor.package.namespace.type.v1.1",
            &instance,
            &from_schema,
            &to_schema,
            None,
        )
        .expect("cast should succeed");

        // Non-GTS-id consts are left alone; the value mismatch instead surfaces
        // as a final-validation incompatibility.
        assert!(result.changed_properties.is_empty());
        assert!(!result.incompatibility_reasons.is_empty());
        assert!(result.casted_entity.is_none());
    }

    #[test]
    fn cast_recurses_into_nested_object_property() {
        let from_schema = json!({"type": "object"});
        let to_schema = json!({
            "type": "object",
            "properties": {
                "address": {
                    "type": "object",
                    "properties": {
                        "country": {"type": "string", "default": "unknown"}
                    }
                }
            }
        });
        let instance = json!({"address": {"city": "Springfield"}});

        let result = GtsEntityCastResult::cast(
            "gts.vendor.package.namespace.type.v1.0",
            "gts.vendor.package.namespace.type.v1.1",
            &instance,
            &from_schema,
            &to_schema,
            None,
        )
        .expect("cast should succeed");

        let casted = result.casted_entity.expect("fully compatible cast has a result");
        assert_eq!(casted["address"]["country"], "unknown");
        assert!(result.added_properties.contains(&"address.country".to_owned()));
    }

    #[test]
    fn cast_recurses_into_array_of_objects() {
        let from_schema = json!({"type": "object"});
        let to_schema = json!({
            "type": "object",
            "properties": {
                "items": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {"label": {"type": "string", "default": "n/a"}}
                    }
                }
            }
        });
        let instance = json!({"items": [{}, {"label": "set"}]});

        let result = GtsEntityCastResult::cast(
            "gts.vendor.package.namespace.type.v1.0",
            "gts.vendor.package.namespace.type.v1.1",
            &instance,
            &from_schema,
            &to_schema,
            None,
        )
        .expect("cast should succeed");

        let casted = result.casted_entity.expect("fully compatible cast has a result");
        assert_eq!(casted["items"][0]["label"], "n/a");
        assert_eq!(casted["items"][1]["label"], "set");
        assert!(result.added_properties.contains(&"items[0].label".to_owned()));
    }

    #[test]
    fn cast_final_validation_rejects_type_mismatch() {
        let from_schema = json!({"type": "object", "properties": {"age": {"type": "string"}}});
        let to_schema = json!({"type": "object", "properties": {"age": {"type": "number"}}});
        let instance = json!({"age": "not a number"});

        let result = GtsEntityCastResult::cast(
            "gts.vendor.package.namespace.type.v1.0",
            "gts.vendor.package.namespace.type.v1.1",
            &instance,
            &from_schema,
            &to_schema,
            None,
        )
        .expect("cast should succeed");

        assert!(!result.incompatibility_reasons.is_empty());
        assert!(result.casted_entity.is_none());
    }

    #[test]
    fn backward_compatibility_detects_type_change() {
        let old_schema =
            json!({"type": "object", "properties": {"value": {"type": "string"}}});
        let new_schema =
            json!({"type": "object", "properties": {"value": {"type": "number"}}});

        let (is_backward, errors) =
            GtsEntityCastResult::check_backward_compatibility(&old_schema, &new_schema);
        assert!(!is_backward);
        assert!(!errors.is_empty());
    }

    #[test]
    fn enum_growth_is_forward_but_not_backward_compatible() {
        let old_schema = json!({
            "type": "object",
            "properties": {"status": {"type": "string", "enum": ["active", "inactive"]}}
        });
        let new_schema = json!({
            "type": "object",
            "properties": {"status": {"type": "string", "enum": ["active", "inactive", "pending"]}}
        });

        let (is_backward, _) =
            GtsEntityCastResult::check_backward_compatibility(&old_schema, &new_schema);
        let (is_forward, _) =
            GtsEntityCastResult::check_forward_compatibility(&old_schema, &new_schema);

        assert!(!is_backward);
        assert!(is_forward);
    }

    #[test]
    fn narrowed_numeric_bounds_break_backward_compatibility() {
        let old_schema = json!({
            "type": "object",
            "properties": {"age": {"type": "number", "minimum": 0, "maximum": 100}}
        });
        let new_schema = json!({
            "type": "object",
            "properties": {"age": {"type": "number", "minimum": 18, "maximum": 65}}
        });

        let (is_backward, errors) =
            GtsEntityCastResult::check_backward_compatibility(&old_schema, &new_schema);
        assert!(!is_backward);
        assert!(!errors.is_empty());
    }

    #[test]
    fn removed_required_property_breaks_forward_compatibility() {
        let old_schema = json!({
            "type": "object",
            "properties": {"name": {"type": "string"}, "email": {"type": "string"}},
            "required": ["name", "email"]
        });
        let new_schema = json!({
            "type": "object",
            "properties": {"name": {"type": "string"}, "email": {"type": "string"}},
            "required": ["name"]
        });

        let (is_forward, errors) =
            GtsEntityCastResult::check_forward_compatibility(&old_schema, &new_schema);
        assert!(!is_forward);
        assert!(!errors.is_empty());
    }

    #[test]
    fn integer_widened_to_number_is_backward_compatible() {
        let old_schema =
            json!({"type": "object", "properties": {"count": {"type": "integer"}}});
        let new_schema =
            json!({"type": "object", "properties": {"count": {"type": "number"}}});

        let (is_backward, errors) =
            GtsEntityCastResult::check_backward_compatibility(&old_schema, &new_schema);
        assert!(is_backward, "{errors:?}");
    }

    #[test]
    fn number_narrowed_to_integer_is_forward_compatible() {
        let old_schema =
            json!({"type": "object", "properties": {"count": {"type": "number"}}});
        let new_schema =
            json!({"type": "object", "properties": {"count": {"type": "integer"}}});

        let (is_forward, errors) =
            GtsEntityCastResult::check_forward_compatibility(&old_schema, &new_schema);
        assert!(is_forward, "{errors:?}");
    }

    #[test]
    fn relaxed_numeric_bound_breaks_forward_compatibility() {
        let old_schema = json!({
            "type": "object",
            "properties": {"age": {"type": "number", "minimum": 18, "maximum": 65}}
        });
        let new_schema = json!({
            "type": "object",
            "properties": {"age": {"type": "number", "minimum": 0, "maximum": 100}}
        });

        let (is_forward, errors) =
            GtsEntityCastResult::check_forward_compatibility(&old_schema, &new_schema);
        assert!(!is_forward);
        assert!(!errors.is_empty());
    }

    #[test]
    fn promoting_optional_property_to_required_breaks_backward_compatibility() {
        let old_schema = json!({
            "type": "object",
            "properties": {"name": {"type": "string"}, "nickname": {"type": "string"}}
        });
        let new_schema = json!({
            "type": "object",
            "properties": {"name": {"type": "string"}, "nickname": {"type": "string"}},
            "required": ["nickname"]
        });

        let (is_backward, errors) =
            GtsEntityCastResult::check_backward_compatibility(&old_schema, &new_schema);
        assert!(!is_backward);
        assert!(errors.iter().any(|e| e.contains("nickname")));
    }

    #[test]
    fn nested_object_property_with_new_required_field_breaks_backward_compatibility() {
        let old_schema = json!({
            "type": "object",
            "properties": {
                "address": {
                    "type": "object",
                    "properties": {"city": {"type": "string"}}
                }
            }
        });
        let new_schema = json!({
            "type": "object",
            "properties": {
                "address": {
                    "type": "object",
                    "properties": {"city": {"type": "string"}, "zip": {"type": "string"}},
                    "required": ["zip"]
                }
            }
        });

        let (is_backward, errors) =
            GtsEntityCastResult::check_backward_compatibility(&old_schema, &new_schema);
        assert!(!is_backward);
        assert!(errors.iter().any(|e| e.contains("address") && e.contains("zip")));
    }

    #[test]
    fn nested_array_items_with_tightened_bound_breaks_backward_compatibility() {
        let old_schema = json!({
            "type": "object",
            "properties": {
                "scores": {
                    "type": "array",
                    "items": {"type": "number", "minimum": 0}
                }
            }
        });
        let new_schema = json!({
            "type": "object",
            "properties": {
                "scores": {
                    "type": "array",
                    "items": {"type": "number", "minimum": 10}
                }
            }
        });

        let (is_backward, errors) =
            GtsEntityCastResult::check_backward_compatibility(&old_schema, &new_schema);
        assert!(!is_backward);
        assert!(errors.iter().any(|e| e.contains("scores")));
    }

    #[test]
    fn nested_object_property_relaxed_bound_is_backward_compatible_but_not_forward() {
        let old_schema = json!({
            "type": "object",
            "properties": {
                "settings": {
                    "type": "object",
                    "properties": {"volume": {"type": "number", "maximum": 10}}
                }
            }
        });
        let new_schema = json!({
            "type": "object",
            "properties": {
                "settings": {
                    "type": "object",
                    "properties": {"volume": {"type": "number", "maximum": 20}}
                }
            }
        });

        // Old data within the old, tighter maximum is still valid under the new,
        // looser one: reading old data with the new schema is fine.
        let (is_backward, backward_errors) =
            GtsEntityCastResult::check_backward_compatibility(&old_schema, &new_schema);
        assert!(is_backward, "unexpected backward errors: {backward_errors:?}");

        // Per the spec's backward/forward mirror, relaxing a bound is reported
        // as a forward-incompatibility, symmetric with tightening being
        // backward-incompatible.
        let (is_forward, forward_errors) =
            GtsEntityCastResult::check_forward_compatibility(&old_schema, &new_schema);
        assert!(!is_forward);
        assert!(forward_errors.iter().any(|e| e.contains("volume")));
    }
}
