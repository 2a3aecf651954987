use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::entities::{GtsConfig, GtsEntity};
use crate::gts::{GtsID, GtsWildcard};
use crate::path_resolver::JsonPathResolver;
use crate::schema_cast::GtsEntityCastResult;
use crate::store::{GtsStore, GtsStoreQueryResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GtsIdValidationResult {
    pub id: String,
    pub valid: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub error: String,
}

/// Serializable representation of a GTS ID segment for API responses.
/// This is distinct from `crate::gts::GtsIdSegment` which is the internal representation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GtsIdSegmentInfo {
    pub vendor: String,
    pub package: String,
    pub namespace: String,
    #[serde(rename = "type")]
    pub type_name: String,
    pub ver_major: Option<u32>,
    pub ver_minor: Option<u32>,
    pub is_type: bool,
}

impl From<&crate::gts::GtsIdSegment> for GtsIdSegmentInfo {
    fn from(seg: &crate::gts::GtsIdSegment) -> Self {
        Self {
            vendor: seg.vendor.clone(),
            package: seg.package.clone(),
            namespace: seg.namespace.clone(),
            type_name: seg.type_name.clone(),
            ver_major: Some(seg.ver_major),
            ver_minor: seg.ver_minor,
            is_type: seg.is_type,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GtsIdParseResult {
    pub id: String,
    pub ok: bool,
    pub segments: Vec<GtsIdSegmentInfo>,
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GtsIdMatchResult {
    pub candidate: String,
    pub pattern: String,
    #[serde(rename = "match")]
    pub is_match: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GtsUuidResult {
    pub id: String,
    pub uuid: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GtsValidationResult {
    pub id: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub error: String,
}

/// Schema graph result - serializes directly as the graph object
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GtsSchemaGraphResult {
    pub graph: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GtsEntityInfo {
    pub id: String,
    pub schema_id: Option<String>,
    pub is_schema: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GtsGetEntityResult {
    pub ok: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub schema_id: Option<String>,
    pub is_schema: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<Value>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GtsEntitiesListResult {
    pub entities: Vec<GtsEntityInfo>,
    pub count: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GtsAddEntityResult {
    pub ok: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub schema_id: Option<String>,
    pub is_schema: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GtsAddEntitiesResult {
    pub ok: bool,
    pub results: Vec<GtsAddEntityResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GtsAddSchemaResult {
    pub ok: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GtsRelationshipInfo {
    pub id: String,
    pub path: String,
    pub resolved: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GtsRelationshipsResult {
    pub id: String,
    pub ok: bool,
    pub relationships: Vec<GtsRelationshipInfo>,
    pub broken: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GtsExtractIdResult {
    pub id: String,
    pub schema_id: Option<String>,
    pub selected_entity_field: Option<String>,
    pub selected_schema_id_field: Option<String>,
    pub is_schema: bool,
}

/// In-memory facade over a `GtsStore`, using an `entity_id_fields`/`schema_id_fields`
/// configuration to drive extraction. Callers are responsible for sourcing the raw
/// JSON documents passed to `add_entity`/`add_entities`/`add_schema` (file or network
/// loading is outside this library's scope).
pub struct GtsOps {
    pub verbose: usize,
    pub cfg: GtsConfig,
    pub store: GtsStore,
}

impl GtsOps {
    #[must_use]
    pub fn new(config: Option<GtsConfig>, verbose: usize) -> Self {
        GtsOps {
            verbose,
            cfg: config.unwrap_or_default(),
            store: GtsStore::new(),
        }
    }

    pub fn add_entity(&mut self, content: &Value, validate: bool) -> GtsAddEntityResult {
        let entity = GtsEntity::new(
            content,
            Some(&self.cfg),
            None,
            false,
            String::new(),
            None,
            None,
        );

        // For instances, require at least one entity_id_fields to be present
        // (either a GTS ID for well-known instances, or a UUID/other ID for anonymous instances)
        let Some(entity_id) = entity.effective_id() else {
            return GtsAddEntityResult {
                ok: false,
                id: String::new(),
                schema_id: None,
                is_schema: false,
                error: if entity.is_schema {
                    "Unable to detect GTS ID in schema entity".to_owned()
                } else {
                    "Unable to detect ID in instance entity. Instances must have an 'id' field (or one of the configured entity_id_fields)".to_owned()
                },
            };
        };

        // Register the entity first
        if let Err(e) = self.store.register(entity.clone()) {
            return GtsAddEntityResult {
                ok: false,
                id: String::new(),
                schema_id: None,
                is_schema: false,
                error: e.to_string(),
            };
        }

        // Always validate schemas
        if entity.is_schema {
            if let Err(e) = self.store.validate_schema(&entity_id) {
                return GtsAddEntityResult {
                    ok: false,
                    id: String::new(),
                    schema_id: None,
                    is_schema: false,
                    error: format!("Validation failed: {e}"),
                };
            }
        }

        // If validation is requested, validate the instance as well
        if validate && !entity.is_schema {
            if let Err(e) = self.store.validate_instance(&entity_id) {
                return GtsAddEntityResult {
                    ok: false,
                    id: String::new(),
                    schema_id: None,
                    is_schema: false,
                    error: format!("Validation failed: {e}"),
                };
            }
        }

        GtsAddEntityResult {
            ok: true,
            id: entity_id,
            schema_id: entity.schema_id,
            is_schema: entity.is_schema,
            error: String::new(),
        }
    }

    pub fn add_entities(&mut self, items: &[Value]) -> GtsAddEntitiesResult {
        let results: Vec<GtsAddEntityResult> =
            items.iter().map(|it| self.add_entity(it, false)).collect();
        let ok = results.iter().all(|r| r.ok);
        GtsAddEntitiesResult { ok, results }
    }

    pub fn add_schema(&mut self, type_id: String, schema: &Value) -> GtsAddSchemaResult {
        match self.store.register_schema(&type_id, schema) {
            Ok(()) => GtsAddSchemaResult {
                ok: true,
                id: type_id,
                error: String::new(),
            },
            Err(e) => GtsAddSchemaResult {
                ok: false,
                id: String::new(),
                error: e.to_string(),
            },
        }
    }

    #[must_use]
    pub fn validate_id(&self, gts_id: &str) -> GtsIdValidationResult {
        match GtsID::new(gts_id) {
            Ok(_) => GtsIdValidationResult {
                id: gts_id.to_owned(),
                valid: true,
                error: String::new(),
            },
            Err(e) => GtsIdValidationResult {
                id: gts_id.to_owned(),
                valid: false,
                error: e.to_string(),
            },
        }
    }

    pub fn parse_id(&self, gts_id: &str) -> GtsIdParseResult {
        match GtsID::new(gts_id) {
            Ok(id) => {
                let segments = id
                    .gts_id_segments
                    .iter()
                    .map(GtsIdSegmentInfo::from)
                    .collect();

                GtsIdParseResult {
                    id: gts_id.to_owned(),
                    ok: true,
                    segments,
                    error: String::new(),
                }
            }
            Err(e) => GtsIdParseResult {
                id: gts_id.to_owned(),
                ok: false,
                segments: Vec::new(),
                error: e.to_string(),
            },
        }
    }

    #[must_use]
    pub fn match_id_pattern(&self, candidate: &str, pattern: &str) -> GtsIdMatchResult {
        match (GtsID::new(candidate), GtsWildcard::new(pattern)) {
            (Ok(c), Ok(p)) => {
                let is_match = c.wildcard_match(&p);
                GtsIdMatchResult {
                    candidate: candidate.to_owned(),
                    pattern: pattern.to_owned(),
                    is_match,
                    error: String::new(),
                }
            }
            (Err(e), _) | (_, Err(e)) => GtsIdMatchResult {
                candidate: candidate.to_owned(),
                pattern: pattern.to_owned(),
                is_match: false,
                error: e.to_string(),
            },
        }
    }

    #[must_use]
    pub fn uuid(&self, gts_id: &str) -> GtsUuidResult {
        match GtsID::new(gts_id) {
            Ok(g) => GtsUuidResult {
                id: g.id.clone(),
                uuid: g.to_uuid().to_string(),
            },
            Err(_) => GtsUuidResult {
                id: gts_id.to_owned(),
                uuid: String::new(),
            },
        }
    }

    pub fn validate_instance(&mut self, gts_id: &str) -> GtsValidationResult {
        match self.store.validate_instance(gts_id) {
            Ok(()) => GtsValidationResult {
                id: gts_id.to_owned(),
                ok: true,
                error: String::new(),
            },
            Err(e) => GtsValidationResult {
                id: gts_id.to_owned(),
                ok: false,
                error: e.to_string(),
            },
        }
    }

    pub fn validate_schema(&mut self, gts_id: &str) -> GtsValidationResult {
        match self.store.validate_schema(gts_id) {
            Ok(()) => GtsValidationResult {
                id: gts_id.to_owned(),
                ok: true,
                error: String::new(),
            },
            Err(e) => GtsValidationResult {
                id: gts_id.to_owned(),
                ok: false,
                error: e.to_string(),
            },
        }
    }

    pub fn validate_entity(&mut self, gts_id: &str) -> GtsValidationResult {
        if gts_id.ends_with('~') {
            self.validate_schema(gts_id)
        } else {
            self.validate_instance(gts_id)
        }
    }

    pub fn schema_graph(&mut self, gts_id: &str) -> GtsSchemaGraphResult {
        let graph = self.store.build_schema_graph(gts_id);
        GtsSchemaGraphResult { graph }
    }

    #[must_use]
    pub fn relationships(&self, gts_id: &str) -> GtsRelationshipsResult {
        match self.store.relationships(gts_id) {
            Ok(refs) => {
                let broken: Vec<String> = refs
                    .iter()
                    .filter(|(_, resolved)| !resolved)
                    .map(|(r, _)| r.id.clone())
                    .collect();
                let relationships = refs
                    .into_iter()
                    .map(|(r, resolved)| GtsRelationshipInfo {
                        id: r.id,
                        path: r.source_path,
                        resolved,
                    })
                    .collect();
                GtsRelationshipsResult {
                    id: gts_id.to_owned(),
                    ok: true,
                    relationships,
                    broken,
                    error: String::new(),
                }
            }
            Err(e) => GtsRelationshipsResult {
                id: gts_id.to_owned(),
                ok: false,
                relationships: Vec::new(),
                broken: Vec::new(),
                error: e.to_string(),
            },
        }
    }

    pub fn compatibility(
        &mut self,
        old_schema_id: &str,
        new_schema_id: &str,
    ) -> GtsEntityCastResult {
        self.store.is_minor_compatible(old_schema_id, new_schema_id)
    }

    pub fn cast(&mut self, from_id: &str, to_schema_id: &str) -> GtsEntityCastResult {
        match self.store.cast(from_id, to_schema_id) {
            Ok(result) => result,
            Err(e) => GtsEntityCastResult {
                from_id: from_id.to_owned(),
                to_id: to_schema_id.to_owned(),
                old: from_id.to_owned(),
                new: to_schema_id.to_owned(),
                direction: "unknown".to_owned(),
                added_properties: Vec::new(),
                removed_properties: Vec::new(),
                changed_properties: Vec::new(),
                is_fully_compatible: false,
                is_backward_compatible: false,
                is_forward_compatible: false,
                incompatibility_reasons: Vec::new(),
                backward_errors: Vec::new(),
                forward_errors: Vec::new(),
                casted_entity: None,
                error: Some(e.to_string()),
            },
        }
    }

    #[must_use]
    pub fn query(&self, expr: &str, limit: usize) -> GtsStoreQueryResult {
        self.store.query(expr, limit)
    }

    pub fn attr(&mut self, gts_with_path: &str) -> JsonPathResolver {
        match GtsID::split_at_path(gts_with_path) {
            Ok((gts, Some(path))) => {
                if let Some(entity) = self.store.get(&gts) {
                    entity.resolve_path(&path)
                } else {
                    JsonPathResolver::new(gts.clone(), Value::Null)
                        .failure(&path, &format!("Entity not found: {gts}"))
                }
            }
            Ok((gts, None)) => JsonPathResolver::new(gts, Value::Null)
                .failure("", "Attribute selector requires '@path' in the identifier"),
            Err(e) => JsonPathResolver::new(String::new(), Value::Null).failure("", &e.to_string()),
        }
    }

    #[must_use]
    pub fn extract_id(&self, content: &Value) -> GtsExtractIdResult {
        let entity = GtsEntity::new(
            content,
            Some(&self.cfg),
            None,
            false,
            String::new(),
            None,
            None,
        );

        GtsExtractIdResult {
            id: entity.effective_id().unwrap_or_default(),
            schema_id: entity.schema_id,
            selected_entity_field: entity.selected_entity_field,
            selected_schema_id_field: entity.selected_schema_id_field,
            is_schema: entity.is_schema,
        }
    }

    pub fn get_entity(&mut self, gts_id: &str) -> GtsGetEntityResult {
        match self.store.get(gts_id) {
            Some(entity) => GtsGetEntityResult {
                ok: true,
                id: entity
                    .gts_id
                    .as_ref()
                    .map_or_else(|| gts_id.to_owned(), |g| g.id.clone()),
                schema_id: entity.schema_id.clone(),
                is_schema: entity.is_schema,
                content: Some(entity.content.clone()),
                error: String::new(),
            },
            None => GtsGetEntityResult {
                ok: false,
                id: String::new(),
                schema_id: None,
                is_schema: false,
                content: None,
                error: format!("Entity '{gts_id}' not found"),
            },
        }
    }

    #[must_use]
    pub fn get_entities(&self, limit: usize) -> GtsEntitiesListResult {
        let all_entities: Vec<_> = self.store.items().collect();
        let total = all_entities.len();

        let entities: Vec<GtsEntityInfo> = all_entities
            .into_iter()
            .take(limit)
            .map(|(entity_id, entity)| GtsEntityInfo {
                id: entity_id.clone(),
                schema_id: entity.schema_id.clone(),
                is_schema: entity.is_schema,
            })
            .collect();

        let count = entities.len();

        GtsEntitiesListResult {
            entities,
            count,
            total,
        }
    }

    #[must_use]
    pub fn list(&self, limit: usize) -> GtsEntitiesListResult {
        self.get_entities(limit)
    }
}
