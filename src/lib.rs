pub mod entities;
pub mod gts;
pub mod ops;
pub mod path_resolver;
pub mod schema;
pub mod schema_cast;
pub mod store;
pub mod x_gts_ref;

// Re-export commonly used types
pub use entities::{GtsConfig, GtsEntity, GtsRef, ValidationError, ValidationResult};
pub use gts::{GtsError, GtsID, GtsIdSegment, GtsInstanceId, GtsSchemaId, GtsWildcard};
pub use ops::{GtsOps, GtsRelationshipInfo, GtsRelationshipsResult};
pub use path_resolver::JsonPathResolver;
pub use schema::normalize_schema;
pub use schema_cast::{GtsEntityCastResult, SchemaCastError};
pub use store::{GtsStore, GtsStoreQueryResult, StoreError};
pub use x_gts_ref::{XGtsRefValidationError, XGtsRefValidator};
