use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::gts::{GtsID, GTS_URI_PREFIX};
use crate::path_resolver::JsonPathResolver;
use crate::schema_cast::{GtsEntityCastResult, SchemaCastError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationError {
    #[serde(rename = "instancePath")]
    pub instance_path: String,
    #[serde(rename = "schemaPath")]
    pub schema_path: String,
    pub keyword: String,
    pub message: String,
    pub params: HashMap<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GtsConfig {
    pub entity_id_fields: Vec<String>,
    pub schema_id_fields: Vec<String>,
}

impl Default for GtsConfig {
    fn default() -> Self {
        GtsConfig {
            entity_id_fields: vec![
                "$id".to_owned(),
                "$$id".to_owned(),
                "gtsId".to_owned(),
                "gtsIid".to_owned(),
                "gtsOid".to_owned(),
                "gtsI".to_owned(),
                "gts_id".to_owned(),
                "gts_oid".to_owned(),
                "gts_iid".to_owned(),
                "id".to_owned(),
            ],
            schema_id_fields: vec![
                "$schema".to_owned(),
                "$$schema".to_owned(),
                "gtsTid".to_owned(),
                "gtsType".to_owned(),
                "gtsT".to_owned(),
                "gts_t".to_owned(),
                "gts_tid".to_owned(),
                "gts_type".to_owned(),
                "type".to_owned(),
                "schema".to_owned(),
            ],
        }
    }
}

#[derive(Debug, Clone)]
pub struct GtsRef {
    pub id: String,
    pub source_path: String,
}

#[derive(Debug, Clone)]
pub struct GtsEntity {
    /// The GTS ID if the entity has one (either from `id` field for well-known instances,
    /// or from `$id` field for schemas). None for anonymous instances.
    pub gts_id: Option<GtsID>,
    /// The instance ID - for anonymous instances this is the UUID from `id` field,
    /// for well-known instances this equals `gts_id.id`, for schemas this equals `gts_id.id`.
    pub instance_id: Option<String>,
    /// True if this is a JSON Schema (has `$schema` field), false if it's an instance.
    pub is_schema: bool,
    pub label: String,
    pub content: Value,
    pub gts_refs: Vec<GtsRef>,
    pub validation: ValidationResult,
    /// The schema ID that this entity conforms to:
    /// - For schemas: the `$schema` field value (e.g., `http://json-schema.org/draft-07/schema#`)
    ///   OR for GTS schemas, the parent schema from the chain
    /// - For instances: the `type` field value (the GTS type ID ending with `~`)
    pub schema_id: Option<String>,
    pub selected_entity_field: Option<String>,
    pub selected_schema_id_field: Option<String>,
    pub description: String,
    pub schema_refs: Vec<GtsRef>,
}

impl GtsEntity {
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        content: &Value,
        cfg: Option<&GtsConfig>,
        gts_id: Option<GtsID>,
        is_schema: bool,
        label: String,
        validation: Option<ValidationResult>,
        schema_id: Option<String>,
    ) -> Self {
        let mut entity = GtsEntity {
            content: content.clone(),
            gts_id,
            instance_id: None,
            is_schema,
            label,
            validation: validation.unwrap_or_default(),
            schema_id,
            selected_entity_field: None,
            selected_schema_id_field: None,
            gts_refs: Vec::new(),
            schema_refs: Vec::new(),
            description: String::new(),
        };

        // RULE: A JSON is a schema if and only if it has a "$schema" field
        // This is the PRIMARY check - $schema presence is the definitive marker
        entity.is_schema = entity.has_schema_field();

        // Calculate IDs if config provided
        if let Some(cfg) = cfg {
            if entity.is_schema {
                // For schemas: extract GTS ID from $id field
                entity.extract_schema_ids(cfg);
            } else {
                // For instances: extract instance_id and schema_id separately
                entity.extract_instance_ids(cfg);
            }
        }

        // Set label
        if let Some(ref instance_id) = entity.instance_id {
            entity.label = instance_id.clone();
        } else if let Some(ref gts_id) = entity.gts_id {
            entity.label = gts_id.id.clone();
        } else if entity.label.is_empty() {
            entity.label = String::new();
        }

        // Extract description
        if let Some(obj) = content.as_object() {
            if let Some(desc) = obj.get("description") {
                if let Some(s) = desc.as_str() {
                    s.clone_into(&mut entity.description);
                }
            }
        }

        // Extract references
        entity.gts_refs = entity.extract_gts_ids_with_paths();
        if entity.is_schema {
            entity.schema_refs = entity.extract_ref_strings_with_paths();
        }

        entity
    }

    /// Check if the JSON has a "$schema"/"$$schema" field whose value marks it as a
    /// schema. This is the ONLY way to determine if it's a schema: presence of any
    /// other field (including `$id` ending in `~`) never changes the classification.
    fn has_schema_field(&self) -> bool {
        let Some(obj) = self.content.as_object() else {
            return false;
        };
        for key in ["$schema", "$$schema"] {
            if let Some(schema_str) = obj.get(key).and_then(Value::as_str) {
                if schema_str.contains("json-schema.org")
                    || schema_str.starts_with(GTS_URI_PREFIX)
                    || schema_str.starts_with("gts.")
                {
                    return true;
                }
            }
        }
        false
    }

    /// Extract IDs for a schema entity.
    /// - `gts_id`: from `$id` field (must be `gts://` URI with GTS ID)
    /// - `schema_id`: the parent schema (from `$schema` field or extracted from chain)
    /// - `instance_id`: same as `gts_id` for schemas
    fn extract_schema_ids(&mut self, cfg: &GtsConfig) {
        // Extract GTS ID from $id field ("$$id" is an alias, for pre-processors
        // that interpret "$id" eagerly)
        if let Some(obj) = self.content.as_object() {
            for key in ["$id", "$$id"] {
                if let Some(id_str) = obj.get(key).and_then(Value::as_str) {
                    let normalized = id_str.strip_prefix(GTS_URI_PREFIX).unwrap_or(id_str).trim();
                    if GtsID::is_valid(normalized) {
                        self.gts_id = GtsID::new(normalized).ok();
                        self.instance_id = Some(normalized.to_owned());
                        self.selected_entity_field = Some(key.to_owned());
                        break;
                    }
                }
            }

            // For schemas, schema_id is the $schema/$$schema field value
            // OR for GTS schemas with chains, it's the parent type
            for key in ["$schema", "$$schema"] {
                if let Some(schema_str) = obj.get(key).and_then(Value::as_str) {
                    self.schema_id = Some(schema_str.to_owned());
                    self.selected_schema_id_field = Some(key.to_owned());
                    break;
                }
            }

            // For chained GTS IDs, extract the parent schema: the identifier up to
            // and including the second-to-last `~`. A chained schema's schema-id
            // is always this chain-derived form, regardless of what the $schema
            // field says.
            if let Some(ref gts_id) = self.gts_id {
                if gts_id.gts_id_segments.len() > 1 {
                    let tilde_positions: Vec<usize> =
                        gts_id.id.match_indices('~').map(|(i, _)| i).collect();
                    if let Some(&second_to_last) = tilde_positions.iter().rev().nth(1) {
                        self.schema_id = Some(gts_id.id[..=second_to_last].to_owned());
                    }
                }
            }
        }

        // Fallback to old logic for entity_id_fields if $id not found
        if self.gts_id.is_none() {
            let idv = self.calc_json_entity_id_legacy(cfg);
            if let Some(ref id) = idv {
                if GtsID::is_valid(id) {
                    self.gts_id = GtsID::new(id).ok();
                    self.instance_id = Some(id.clone());
                }
            }
        }
    }

    /// Extract IDs for an instance entity.
    /// There are two types of instances:
    /// 1. Well-known instances: id field contains a GTS ID (e.g., gts.x.core.events.topic.v1~x.commerce._.orders.v1.0)
    /// 2. Anonymous instances: id field contains a UUID, type field contains the GTS schema ID
    fn extract_instance_ids(&mut self, cfg: &GtsConfig) {
        // Only process if content is an object
        if self.content.as_object().is_none() {
            return;
        }

        // First, try to get the id field value (could be UUID or GTS ID)
        let id_value = self.get_id_field_value(cfg);

        // Check if id is a valid GTS ID (well-known instance)
        if let Some(ref id) = id_value {
            if GtsID::is_valid(id) {
                // Well-known instance: id IS the GTS ID
                self.gts_id = GtsID::new(id).ok();
                self.instance_id = Some(id.clone());

                let is_chained = self
                    .gts_id
                    .as_ref()
                    .is_some_and(|g| g.gts_id_segments.len() > 1);
                let is_pure_type = self
                    .gts_id
                    .as_ref()
                    .and_then(|g| g.gts_id_segments.last())
                    .is_some_and(|seg| seg.is_type);
                let selected_is_id_field = matches!(
                    self.selected_entity_field.as_deref(),
                    Some("$id" | "$$id")
                );

                // Extract schema ID: everything up to and including the last ~.
                let chain_derived = self.gts_id.as_ref().and_then(|gts_id| {
                    gts_id
                        .id
                        .rfind('~')
                        .map(|last_tilde| gts_id.id[..=last_tilde].to_string())
                });

                if !selected_is_id_field && is_chained && !is_pure_type {
                    self.schema_id = chain_derived.clone();
                    self.selected_schema_id_field = self.selected_entity_field.clone();
                } else {
                    self.schema_id = self.get_type_field_value(cfg);
                    if self.schema_id.is_none() && is_chained {
                        self.schema_id = chain_derived;
                        self.selected_schema_id_field = self.selected_entity_field.clone();
                    }
                }
            } else {
                // Anonymous instance: id is a UUID or other non-GTS identifier
                self.instance_id = Some(id.clone());
                self.gts_id = None; // Anonymous instances don't have a GTS ID
            }
        }

        // Get schema_id from type field (for anonymous instances) or other schema_id_fields
        if self.schema_id.is_none() {
            self.schema_id = self.get_type_field_value(cfg);
        }
    }

    /// Get the id field value from `entity_id_fields` config
    fn get_id_field_value(&mut self, cfg: &GtsConfig) -> Option<String> {
        for f in &cfg.entity_id_fields {
            // Skip $schema/$$schema and type fields - they're not entity IDs
            if f == "$schema" || f == "$$schema" || f == "type" {
                continue;
            }
            if let Some(v) = self.get_field_value(f) {
                self.selected_entity_field = Some(f.clone());
                return Some(v);
            }
        }
        None
    }

    /// Get the type/schema field value from `schema_id_fields` config
    fn get_type_field_value(&mut self, cfg: &GtsConfig) -> Option<String> {
        for f in &cfg.schema_id_fields {
            // Skip $schema/$$schema for instances - they're not valid fields for instances
            if f == "$schema" || f == "$$schema" {
                continue;
            }
            if let Some(v) = self.get_field_value(f) {
                // Only accept valid GTS type IDs (ending with ~)
                if GtsID::is_valid(&v) && v.ends_with('~') {
                    self.selected_schema_id_field = Some(f.clone());
                    return Some(v);
                }
            }
        }
        None
    }

    /// Legacy method for backwards compatibility
    fn calc_json_entity_id_legacy(&mut self, cfg: &GtsConfig) -> Option<String> {
        self.first_non_empty_field(&cfg.entity_id_fields)
    }

    #[must_use]
    pub fn resolve_path(&self, path: &str) -> JsonPathResolver {
        let gts_id = self
            .gts_id
            .as_ref()
            .map(|g| g.id.clone())
            .unwrap_or_default();
        JsonPathResolver::new(gts_id, self.content.clone()).resolve(path)
    }

    /// Casts this entity to a different schema.
    ///
    /// # Errors
    /// Returns `SchemaCastError` if the cast fails.
    pub fn cast(
        &self,
        to_schema: &GtsEntity,
        from_schema: &GtsEntity,
        resolver: Option<&()>,
    ) -> Result<GtsEntityCastResult, SchemaCastError> {
        if self.is_schema {
            // When casting a schema, from_schema might be a standard JSON Schema (no gts_id)
            if let (Some(ref self_id), Some(ref from_id)) = (&self.gts_id, &from_schema.gts_id) {
                if self_id.id != from_id.id {
                    return Err(SchemaCastError::InternalError(format!(
                        "Internal error: {} != {}",
                        self_id.id, from_id.id
                    )));
                }
            }
        }

        if !to_schema.is_schema {
            return Err(SchemaCastError::TargetMustBeSchema);
        }

        if !from_schema.is_schema {
            return Err(SchemaCastError::SourceMustBeSchema);
        }

        let from_id = self
            .gts_id
            .as_ref()
            .map(|g| g.id.clone())
            .unwrap_or_default();
        let to_id = to_schema
            .gts_id
            .as_ref()
            .map(|g| g.id.clone())
            .unwrap_or_default();

        GtsEntityCastResult::cast(
            &from_id,
            &to_id,
            &self.content,
            &from_schema.content,
            &to_schema.content,
            resolver,
        )
    }

    fn walk_and_collect<F>(content: &Value, collector: &mut Vec<GtsRef>, matcher: F)
    where
        F: Fn(&Value, &str) -> Option<GtsRef> + Copy,
    {
        fn walk<F>(node: &Value, current_path: &str, collector: &mut Vec<GtsRef>, matcher: F)
        where
            F: Fn(&Value, &str) -> Option<GtsRef> + Copy,
        {
            // Try to match current node
            if let Some(match_result) = matcher(node, current_path) {
                collector.push(match_result);
            }

            // Recurse into structures
            match node {
                Value::Object(map) => {
                    for (k, v) in map {
                        let next_path = if current_path.is_empty() {
                            k.clone()
                        } else {
                            format!("{current_path}.{k}")
                        };
                        walk(v, &next_path, collector, matcher);
                    }
                }
                Value::Array(arr) => {
                    for (idx, item) in arr.iter().enumerate() {
                        let next_path = format!("{current_path}[{idx}]");
                        walk(item, &next_path, collector, matcher);
                    }
                }
                _ => {}
            }
        }

        walk(content, "", collector, matcher);
    }

    fn deduplicate_by_id_and_path(items: Vec<GtsRef>) -> Vec<GtsRef> {
        let mut seen = HashMap::new();
        let mut result = Vec::new();

        for item in items {
            let key = format!("{}|{}", item.id, item.source_path);
            if let std::collections::hash_map::Entry::Vacant(e) = seen.entry(key) {
                e.insert(true);
                result.push(item);
            }
        }

        result
    }

    fn extract_gts_ids_with_paths(&self) -> Vec<GtsRef> {
        let mut found = Vec::new();

        let gts_id_matcher = |node: &Value, path: &str| -> Option<GtsRef> {
            if let Some(s) = node.as_str() {
                if GtsID::is_valid(s) {
                    return Some(GtsRef {
                        id: s.to_owned(),
                        source_path: if path.is_empty() {
                            "root".to_owned()
                        } else {
                            path.to_owned()
                        },
                    });
                }
            }
            None
        };

        Self::walk_and_collect(&self.content, &mut found, gts_id_matcher);
        Self::deduplicate_by_id_and_path(found)
    }

    fn extract_ref_strings_with_paths(&self) -> Vec<GtsRef> {
        let mut refs = Vec::new();

        let ref_matcher = |node: &Value, path: &str| -> Option<GtsRef> {
            let obj = node.as_object()?;
            for key in ["$ref", "x-gts-ref"] {
                let Some(ref_str) = obj.get(key).and_then(Value::as_str) else {
                    continue;
                };
                let ref_path = if path.is_empty() {
                    key.to_owned()
                } else {
                    format!("{path}.{key}")
                };
                // Normalize: strip gts:// prefix for canonical GTS ID storage
                let normalized_ref = ref_str
                    .strip_prefix(GTS_URI_PREFIX)
                    .unwrap_or(ref_str)
                    .to_owned();
                return Some(GtsRef {
                    id: normalized_ref,
                    source_path: ref_path,
                });
            }
            None
        };

        Self::walk_and_collect(&self.content, &mut refs, ref_matcher);
        Self::deduplicate_by_id_and_path(refs)
    }

    /// All GTS references discovered anywhere in this entity's content: bare valid
    /// GTS identifier strings, `$ref` values, and `x-gts-ref` values, deduplicated by
    /// `(id, path)`. JSON-Schema meta-schema URLs are excluded.
    #[must_use]
    pub fn all_refs(&self) -> Vec<GtsRef> {
        let mut refs = self.gts_refs.clone();
        refs.extend(self.extract_ref_strings_with_paths());
        Self::deduplicate_by_id_and_path(refs)
            .into_iter()
            .filter(|r| !r.id.contains("json-schema.org"))
            .collect()
    }

    fn get_field_value(&self, field: &str) -> Option<String> {
        if let Some(obj) = self.content.as_object() {
            if let Some(v) = obj.get(field) {
                if let Some(s) = v.as_str() {
                    let trimmed = s.trim();
                    if !trimmed.is_empty() {
                        // Strip the "gts://" URI prefix ONLY for $id/$$id fields (JSON Schema compatibility)
                        // The gts:// prefix is ONLY valid in the $id field of JSON Schema
                        let normalized = if field == "$id" || field == "$$id" {
                            trimmed.strip_prefix(GTS_URI_PREFIX).unwrap_or(trimmed)
                        } else {
                            trimmed
                        };
                        return Some(normalized.to_owned());
                    }
                }
            }
        }
        None
    }

    fn first_non_empty_field(&mut self, fields: &[String]) -> Option<String> {
        // First pass: look for valid GTS IDs
        for f in fields {
            if let Some(v) = self.get_field_value(f) {
                if GtsID::is_valid(&v) {
                    self.selected_entity_field = Some(f.clone());
                    return Some(v);
                }
            }
        }

        // Second pass: any non-empty string
        for f in fields {
            if let Some(v) = self.get_field_value(f) {
                self.selected_entity_field = Some(f.clone());
                return Some(v);
            }
        }

        None
    }

    /// Returns the effective ID for this entity (for store indexing and CLI output).
    /// - For schemas: the GTS ID from `$id` field
    /// - For well-known instances: the GTS ID from `id` field
    /// - For anonymous instances: the `instance_id` (UUID or other non-GTS identifier)
    #[must_use]
    pub fn effective_id(&self) -> Option<String> {
        // Prefer GTS ID if available
        if let Some(ref gts_id) = self.gts_id {
            return Some(gts_id.id.clone());
        }
        // Fall back to instance_id for anonymous instances
        self.instance_id.clone()
    }
}
