//! Rebuilding a design document from installed state
//!
//! "Edit a module" starts from whatever the metadata store and translation
//! files currently say, with every row id carried over so the next install
//! updates in place instead of duplicating.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde_json::Value;
use tracing::warn;

use crate::artifacts::{translations, ArtifactFs};
use crate::document::{
    naming, BlockDesign, DataBag, FieldDesign, LinkDesign, ModuleDesign, RelatedListDesign,
    RelatedListKind, TabDesign,
};
use crate::error::{DesignerResult, StoreError};
use crate::install::{PersistedStructure, DEFAULT_FILTER};
use crate::store::MetadataStore;

fn bag_from(data: &Value) -> DataBag {
    match data {
        Value::Object(map) => DataBag(map.clone()),
        _ => DataBag::new(),
    }
}

/// Load an installed module back into an editable document.
pub async fn design_from_installed(
    metadata: &dyn MetadataStore,
    files: &dyn ArtifactFs,
    name: &str,
    locale: &str,
) -> DesignerResult<ModuleDesign> {
    let module = metadata
        .find_module_by_name(name)
        .await?
        .ok_or_else(|| StoreError::ModuleNotInstalled {
            name: name.to_string(),
        })?;
    let persisted = PersistedStructure::load(metadata, module).await?;
    let PersistedStructure {
        module,
        mut tabs,
        mut blocks,
        mut fields,
        related_lists,
    } = persisted;

    tabs.sort_by_key(|tab| tab.sequence);
    blocks.sort_by_key(|block| block.sequence);
    fields.sort_by_key(|field| field.sequence);

    let filter_columns: HashSet<String> = match metadata.find_filter(module.id, DEFAULT_FILTER).await? {
        Some(filter) => filter.columns.into_iter().collect(),
        None => HashSet::new(),
    };

    let mut design_tabs = Vec::new();
    for tab in tabs {
        let mut tab_design = TabDesign {
            id: Some(tab.id),
            label: tab.label,
            icon: tab.icon,
            sequence: tab.sequence,
            data: bag_from(&tab.data),
            blocks: Vec::new(),
        };
        for block in blocks.iter().filter(|block| block.tab_id == tab.id) {
            let mut block_design = BlockDesign {
                id: Some(block.id),
                label: block.label.clone(),
                icon: block.icon.clone(),
                sequence: block.sequence,
                data: bag_from(&block.data),
                fields: Vec::new(),
            };
            for field in fields.iter().filter(|field| field.block_id == block.id) {
                block_design.fields.push(FieldDesign {
                    id: Some(field.id),
                    name: field.name.clone(),
                    uitype: field.uitype.clone(),
                    displaytype: field.displaytype.clone(),
                    sequence: field.sequence,
                    display_in_filter: filter_columns.contains(&field.name),
                    data: bag_from(&field.data),
                });
            }
            tab_design.blocks.push(block_design);
        }
        design_tabs.push(tab_design);
    }

    let module_names: BTreeMap<i64, String> = metadata
        .list_modules()
        .await?
        .into_iter()
        .map(|record| (record.id, record.name))
        .collect();

    let mut design_lists = Vec::new();
    for record in related_lists {
        let related_module = match module_names.get(&record.related_module_id) {
            Some(name) => name.clone(),
            None => {
                warn!(
                    id = record.related_module_id,
                    "related list points at a module that no longer exists, skipping"
                );
                continue;
            }
        };
        let related_field = match record.related_field_id {
            Some(field_id) => metadata
                .fields_for_module(record.related_module_id)
                .await?
                .into_iter()
                .find(|field| field.id == field_id)
                .map(|field| field.name),
            None => None,
        };
        let tab = record.tab_id.and_then(|tab_id| {
            design_tabs
                .iter()
                .find(|tab| tab.id == Some(tab_id))
                .map(|tab| tab.label.clone())
        });
        design_lists.push(RelatedListDesign {
            id: Some(record.id),
            label: record.label,
            kind: match record.kind.as_str() {
                "n-n" => RelatedListKind::ManyToMany,
                _ => RelatedListKind::ManyToOne,
            },
            related_module,
            related_field,
            tab,
            method: record.method,
            icon: record.icon,
            sequence: record.sequence,
            data: bag_from(&record.data),
        });
    }
    design_lists.sort_by_key(|list| list.sequence);

    let links: Vec<LinkDesign> = match module.data.get("links") {
        Some(value) => serde_json::from_value(value.clone())?,
        None => Vec::new(),
    };

    let mut design_translations = BTreeMap::new();
    for file_locale in translations::locales_for(files, &module.name)? {
        let entries = translations::load(files, &file_locale, &module.name)?;
        design_translations.insert(file_locale, entries);
    }

    let table_name = module
        .data
        .get("tableName")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| naming::default_table_name(&module.name));

    Ok(ModuleDesign {
        name: module.name.clone(),
        model_class: module.model_class.clone(),
        table_name,
        table_prefix: module
            .data
            .get("tablePrefix")
            .and_then(Value::as_str)
            .map(str::to_string),
        icon: module.icon.clone(),
        is_for_admin: module
            .data
            .get("admin")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        default_route: module
            .data
            .get("route")
            .and_then(Value::as_str)
            .map(str::to_string),
        package: module
            .data
            .get("package")
            .and_then(Value::as_str)
            .map(str::to_string),
        locale: locale.to_string(),
        translations: design_translations,
        tabs: design_tabs,
        related_lists: design_lists,
        links,
        filters: Vec::new(),
        translations_to_remove: BTreeSet::new(),
    })
}
