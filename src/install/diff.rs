//! Persisted structure and obsolete-element detection
//!
//! Reconciliation matches strictly by id: a renamed element keeps its id and
//! is an update, a persisted row whose id no longer appears anywhere in the
//! document is obsolete and gets retired.

use std::collections::HashSet;

use crate::document::ModuleDesign;
use crate::error::DesignerResult;
use crate::store::{
    BlockRecord, FieldRecord, MetadataStore, ModuleRecord, RelatedListRecord, TabRecord,
};

/// Metadata rows of an installed module, loaded in one pass.
pub struct PersistedStructure {
    pub module: ModuleRecord,
    pub tabs: Vec<TabRecord>,
    pub blocks: Vec<BlockRecord>,
    pub fields: Vec<FieldRecord>,
    pub related_lists: Vec<RelatedListRecord>,
}

impl PersistedStructure {
    pub async fn load(
        metadata: &dyn MetadataStore,
        module: ModuleRecord,
    ) -> DesignerResult<Self> {
        let tabs = metadata.tabs_for_module(module.id).await?;
        let blocks = metadata.blocks_for_module(module.id).await?;
        let fields = metadata.fields_for_module(module.id).await?;
        let related_lists = metadata.related_lists_for_module(module.id).await?;
        Ok(Self {
            module,
            tabs,
            blocks,
            fields,
            related_lists,
        })
    }

    pub fn field_by_id(&self, id: i64) -> Option<&FieldRecord> {
        self.fields.iter().find(|field| field.id == id)
    }
}

/// Rows persisted earlier but absent from the document.
#[derive(Debug, Default)]
pub struct StructuralDiff {
    pub obsolete_tabs: Vec<TabRecord>,
    pub obsolete_blocks: Vec<BlockRecord>,
    pub obsolete_fields: Vec<FieldRecord>,
    pub obsolete_related_lists: Vec<RelatedListRecord>,
}

impl StructuralDiff {
    pub fn compute(persisted: &PersistedStructure, design: &ModuleDesign) -> Self {
        let tab_ids: HashSet<i64> = design.tabs.iter().filter_map(|tab| tab.id).collect();
        let block_ids: HashSet<i64> = design
            .tabs
            .iter()
            .flat_map(|tab| tab.blocks.iter())
            .filter_map(|block| block.id)
            .collect();
        let field_ids: HashSet<i64> = design.all_fields().filter_map(|field| field.id).collect();
        let list_ids: HashSet<i64> = design
            .related_lists
            .iter()
            .filter_map(|list| list.id)
            .collect();

        Self {
            obsolete_tabs: persisted
                .tabs
                .iter()
                .filter(|tab| !tab_ids.contains(&tab.id))
                .cloned()
                .collect(),
            obsolete_blocks: persisted
                .blocks
                .iter()
                .filter(|block| !block_ids.contains(&block.id))
                .cloned()
                .collect(),
            obsolete_fields: persisted
                .fields
                .iter()
                .filter(|field| !field_ids.contains(&field.id))
                .cloned()
                .collect(),
            obsolete_related_lists: persisted
                .related_lists
                .iter()
                .filter(|list| !list_ids.contains(&list.id))
                .cloned()
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.obsolete_tabs.is_empty()
            && self.obsolete_blocks.is_empty()
            && self.obsolete_fields.is_empty()
            && self.obsolete_related_lists.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{BlockSpec, FieldSpec, ModuleConfig, TabSpec};
    use serde_json::Value;

    fn persisted_with_fields() -> PersistedStructure {
        PersistedStructure {
            module: ModuleRecord {
                id: 1,
                name: "book-type".to_string(),
                icon: None,
                model_class: "app::models::BookType".to_string(),
                data: Value::Null,
            },
            tabs: vec![TabRecord {
                id: 2,
                module_id: 1,
                label: "tab.main".to_string(),
                icon: None,
                sequence: 0,
                data: Value::Null,
            }],
            blocks: vec![BlockRecord {
                id: 3,
                module_id: 1,
                tab_id: 2,
                label: "block.general".to_string(),
                icon: None,
                sequence: 0,
                data: Value::Null,
            }],
            fields: vec![
                FieldRecord {
                    id: 4,
                    module_id: 1,
                    block_id: 3,
                    name: "title".to_string(),
                    uitype: "text".to_string(),
                    displaytype: "everywhere".to_string(),
                    sequence: 0,
                    data: Value::Null,
                },
                FieldRecord {
                    id: 5,
                    module_id: 1,
                    block_id: 3,
                    name: "price".to_string(),
                    uitype: "number".to_string(),
                    displaytype: "everywhere".to_string(),
                    sequence: 1,
                    data: Value::Null,
                },
            ],
            related_lists: Vec::new(),
        }
    }

    #[test]
    fn test_matching_is_by_id_not_label() {
        let persisted = persisted_with_fields();

        let mut design = ModuleDesign::create(ModuleConfig::new("book-type")).unwrap();
        design.add_tab(TabSpec::default()).unwrap();
        design.add_block("tab.main", BlockSpec::default()).unwrap();
        design
            .add_field("block.general", FieldSpec::new("renamed_title", "text"))
            .unwrap();

        // Wire up ids as a resumed draft would carry them; price (id 5) is
        // left out of the document.
        design.tabs[0].id = Some(2);
        design.tabs[0].blocks[0].id = Some(3);
        design.tabs[0].blocks[0].fields[0].id = Some(4);

        let diff = StructuralDiff::compute(&persisted, &design);
        assert!(diff.obsolete_tabs.is_empty());
        assert!(diff.obsolete_blocks.is_empty());
        assert_eq!(diff.obsolete_fields.len(), 1);
        assert_eq!(diff.obsolete_fields[0].name, "price");
    }

    #[test]
    fn test_unpersisted_document_retires_everything() {
        let persisted = persisted_with_fields();
        let design = ModuleDesign::create(ModuleConfig::new("book-type")).unwrap();

        let diff = StructuralDiff::compute(&persisted, &design);
        assert_eq!(diff.obsolete_tabs.len(), 1);
        assert_eq!(diff.obsolete_blocks.len(), 1);
        assert_eq!(diff.obsolete_fields.len(), 2);
        assert!(!diff.is_empty());
    }
}
