//! Core materials summaries

use std::sync::Arc;

use crate::config::ServiceConfig;
use crate::query::operators::{
    ChemsysQuery, ElementsQuery, FormulaQuery, KeysQuery, NumericQuery, PaginationQuery,
    SortQuery, SparseFieldsQuery,
};
use crate::query::RuleHintScheme;
use crate::resource::{LicensePolicy, ReadOnlyResource};
use crate::schema::{DocumentSchema, FieldDef, FieldType};
use crate::store::{MemoryStore, StoreResult};

pub const PREFIX: &str = "/materials";
pub const COLLECTION: &str = "materials";
pub const KEY: &str = "material_id";

/// License value every caller may read
pub const OPEN_LICENSE: &str = "BY-C";
pub const LICENSE_FIELD: &str = "builder_meta.license";

pub fn schema() -> DocumentSchema {
    let builder_meta = FieldType::Object {
        fields: [
            ("license".to_string(), FieldDef::optional_string()),
            ("database_version".to_string(), FieldDef::optional_string()),
        ]
        .into_iter()
        .collect(),
    };
    let symmetry = FieldType::Object {
        fields: [
            ("crystal_system".to_string(), FieldDef::optional_string()),
            ("symbol".to_string(), FieldDef::optional_string()),
            ("number".to_string(), FieldDef::optional_int()),
        ]
        .into_iter()
        .collect(),
    };

    DocumentSchema::new(COLLECTION)
        .field(KEY, FieldDef::required_string())
        .field("formula_pretty", FieldDef::optional_string())
        .field("formula_anonymous", FieldDef::optional_string())
        .field("chemsys", FieldDef::optional_string())
        .field("elements", FieldDef::optional(FieldType::array_of(FieldType::String)))
        .field("nelements", FieldDef::optional_int())
        .field("composition", FieldDef::optional(FieldType::map_of(FieldType::Float)))
        .field(
            "composition_reduced",
            FieldDef::optional(FieldType::map_of(FieldType::Float)),
        )
        .field("symmetry", FieldDef::optional(symmetry))
        .field("band_gap", FieldDef::optional_float().nullable())
        .field("density", FieldDef::optional_float())
        .field("volume", FieldDef::optional_float())
        .field("energy_above_hull", FieldDef::optional_float().nullable())
        .field("is_stable", FieldDef::optional(FieldType::Bool))
        .field("deprecated", FieldDef::optional(FieldType::Bool))
        .field("builder_meta", FieldDef::optional(builder_meta))
        .field("last_updated", FieldDef::optional_string())
}

pub fn resource(store: &MemoryStore, config: &ServiceConfig) -> StoreResult<ReadOnlyResource> {
    let collection = store.seeded_collection(COLLECTION, KEY, config.data_dir.as_deref())?;
    let schema = Arc::new(schema());

    let headers = super::header_processor(config).with_license(
        LicensePolicy::new(LICENSE_FIELD, OPEN_LICENSE)
            .with_privileged_groups(config.access.privileged_groups.iter().cloned()),
    );

    Ok(ReadOnlyResource::new(collection, schema.clone(), config.resource_settings())
        .with_operator(Arc::new(FormulaQuery))
        .with_operator(Arc::new(ChemsysQuery))
        .with_operator(Arc::new(ElementsQuery))
        .with_operator(Arc::new(
            NumericQuery::new(["band_gap", "density", "volume", "energy_above_hull"])
                .with_alias("nelements", "nelements"),
        ))
        .with_operator(Arc::new(KeysQuery::new(KEY)))
        .with_operator(Arc::new(SortQuery::new(2).with_allowed_fields([
            KEY,
            "nelements",
            "band_gap",
            "density",
            "volume",
            "energy_above_hull",
        ])))
        .with_operator(Arc::new(SparseFieldsQuery::new(
            schema,
            KEY,
            vec![
                "formula_pretty".to_string(),
                "chemsys".to_string(),
                "nelements".to_string(),
            ],
        )))
        .with_operator(Arc::new(PaginationQuery::new(
            config.default_limit,
            config.max_limit,
        )))
        .with_hint_scheme(Arc::new(RuleHintScheme::materials()))
        .with_header_processor(headers))
}
