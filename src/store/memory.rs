//! In-memory store
//!
//! Backs tests and database-less runs. One `tokio::sync::RwLock` guards the
//! whole state; a single counter hands out ids across every record kind so
//! id-based assertions stay unambiguous. Drafts round-trip through
//! `serde_json::Value` the same way a real backend would.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use tokio::sync::RwLock;

use async_trait::async_trait;

use crate::document::ModuleDesign;
use crate::error::{DesignerResult, InstallError, StoreError};

use super::{
    BlockRecord, ColumnSpec, DomainRecord, DraftStore, FieldRecord, FilterRecord, MetadataStore,
    ModuleRecord, NewBlock, NewField, NewFilter, NewModule, NewRelatedList, NewTab,
    RelatedListRecord, SchemaEditor, TableSpec, TabRecord,
};

/// Columns and rows of one simulated physical table.
#[derive(Debug, Clone, Default)]
pub struct TableState {
    pub columns: Vec<ColumnSpec>,
    pub rows: Vec<Map<String, Value>>,
}

#[derive(Default)]
struct MemoryInner {
    next_id: i64,
    drafts: BTreeMap<String, Value>,
    modules: Vec<ModuleRecord>,
    tabs: Vec<TabRecord>,
    blocks: Vec<BlockRecord>,
    fields: Vec<FieldRecord>,
    filters: Vec<FilterRecord>,
    related_lists: Vec<RelatedListRecord>,
    domains: Vec<DomainRecord>,
    attachments: Vec<(i64, i64)>,
    tables: BTreeMap<String, TableState>,
}

impl MemoryInner {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<MemoryInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a domain, returning its record.
    pub async fn add_domain(&self, name: &str) -> DomainRecord {
        let mut inner = self.inner.write().await;
        let domain = DomainRecord {
            id: inner.next_id(),
            name: name.to_string(),
        };
        inner.domains.push(domain.clone());
        domain
    }

    /// Insert a raw row into a simulated table, for reconciliation tests.
    pub async fn insert_row(&self, table: &str, row: Map<String, Value>) {
        let mut inner = self.inner.write().await;
        inner.tables.entry(table.to_string()).or_default().rows.push(row);
    }

    pub async fn rows(&self, table: &str) -> Vec<Map<String, Value>> {
        let inner = self.inner.read().await;
        inner
            .tables
            .get(table)
            .map(|state| state.rows.clone())
            .unwrap_or_default()
    }

    pub async fn column(&self, table: &str, column: &str) -> Option<ColumnSpec> {
        let inner = self.inner.read().await;
        inner
            .tables
            .get(table)?
            .columns
            .iter()
            .find(|spec| spec.name == column)
            .cloned()
    }

    pub async fn column_names(&self, table: &str) -> Vec<String> {
        let inner = self.inner.read().await;
        inner
            .tables
            .get(table)
            .map(|state| state.columns.iter().map(|spec| spec.name.clone()).collect())
            .unwrap_or_default()
    }

    /// Current (domain id, module id) attachment pairs.
    pub async fn attachments(&self) -> Vec<(i64, i64)> {
        self.inner.read().await.attachments.clone()
    }
}

// ============================================================================
// DraftStore
// ============================================================================

#[async_trait]
impl DraftStore for MemoryStore {
    async fn list_drafts(&self) -> DesignerResult<Vec<String>> {
        let inner = self.inner.read().await;
        Ok(inner.drafts.keys().cloned().collect())
    }

    async fn load_draft(&self, name: &str) -> DesignerResult<Option<ModuleDesign>> {
        let inner = self.inner.read().await;
        match inner.drafts.get(name) {
            Some(snapshot) => {
                let design: ModuleDesign = serde_json::from_value(snapshot.clone())?;
                Ok(Some(design))
            }
            None => Ok(None),
        }
    }

    async fn save_draft(&self, design: &ModuleDesign) -> DesignerResult<()> {
        let snapshot = serde_json::to_value(design)?;
        let mut inner = self.inner.write().await;
        inner.drafts.insert(design.name.clone(), snapshot);
        Ok(())
    }

    async fn delete_draft(&self, name: &str) -> DesignerResult<()> {
        let mut inner = self.inner.write().await;
        if inner.drafts.remove(name).is_none() {
            return Err(StoreError::DraftNotFound {
                name: name.to_string(),
            }
            .into());
        }
        Ok(())
    }
}

// ============================================================================
// MetadataStore
// ============================================================================

#[async_trait]
impl MetadataStore for MemoryStore {
    async fn find_module_by_name(&self, name: &str) -> DesignerResult<Option<ModuleRecord>> {
        let inner = self.inner.read().await;
        Ok(inner.modules.iter().find(|m| m.name == name).cloned())
    }

    async fn create_module(&self, module: NewModule) -> DesignerResult<ModuleRecord> {
        let mut inner = self.inner.write().await;
        let record = ModuleRecord {
            id: inner.next_id(),
            name: module.name,
            icon: module.icon,
            model_class: module.model_class,
            data: module.data,
        };
        inner.modules.push(record.clone());
        Ok(record)
    }

    async fn update_module(&self, module: &ModuleRecord) -> DesignerResult<()> {
        let mut inner = self.inner.write().await;
        match inner.modules.iter_mut().find(|m| m.id == module.id) {
            Some(existing) => {
                *existing = module.clone();
                Ok(())
            }
            None => Err(StoreError::database(format!("module {} not found", module.id)).into()),
        }
    }

    async fn list_modules(&self) -> DesignerResult<Vec<ModuleRecord>> {
        Ok(self.inner.read().await.modules.clone())
    }

    async fn tabs_for_module(&self, module_id: i64) -> DesignerResult<Vec<TabRecord>> {
        let inner = self.inner.read().await;
        Ok(inner
            .tabs
            .iter()
            .filter(|t| t.module_id == module_id)
            .cloned()
            .collect())
    }

    async fn blocks_for_module(&self, module_id: i64) -> DesignerResult<Vec<BlockRecord>> {
        let inner = self.inner.read().await;
        Ok(inner
            .blocks
            .iter()
            .filter(|b| b.module_id == module_id)
            .cloned()
            .collect())
    }

    async fn fields_for_module(&self, module_id: i64) -> DesignerResult<Vec<FieldRecord>> {
        let inner = self.inner.read().await;
        Ok(inner
            .fields
            .iter()
            .filter(|f| f.module_id == module_id)
            .cloned()
            .collect())
    }

    async fn related_lists_for_module(
        &self,
        module_id: i64,
    ) -> DesignerResult<Vec<RelatedListRecord>> {
        let inner = self.inner.read().await;
        Ok(inner
            .related_lists
            .iter()
            .filter(|r| r.module_id == module_id)
            .cloned()
            .collect())
    }

    async fn create_tab(&self, tab: NewTab) -> DesignerResult<TabRecord> {
        let mut inner = self.inner.write().await;
        let record = TabRecord {
            id: inner.next_id(),
            module_id: tab.module_id,
            label: tab.label,
            icon: tab.icon,
            sequence: tab.sequence,
            data: tab.data,
        };
        inner.tabs.push(record.clone());
        Ok(record)
    }

    async fn update_tab(&self, tab: &TabRecord) -> DesignerResult<()> {
        let mut inner = self.inner.write().await;
        match inner.tabs.iter_mut().find(|t| t.id == tab.id) {
            Some(existing) => {
                *existing = tab.clone();
                Ok(())
            }
            None => Err(StoreError::database(format!("tab {} not found", tab.id)).into()),
        }
    }

    async fn delete_tab(&self, id: i64) -> DesignerResult<()> {
        let mut inner = self.inner.write().await;
        inner.tabs.retain(|t| t.id != id);
        Ok(())
    }

    async fn create_block(&self, block: NewBlock) -> DesignerResult<BlockRecord> {
        let mut inner = self.inner.write().await;
        let record = BlockRecord {
            id: inner.next_id(),
            module_id: block.module_id,
            tab_id: block.tab_id,
            label: block.label,
            icon: block.icon,
            sequence: block.sequence,
            data: block.data,
        };
        inner.blocks.push(record.clone());
        Ok(record)
    }

    async fn update_block(&self, block: &BlockRecord) -> DesignerResult<()> {
        let mut inner = self.inner.write().await;
        match inner.blocks.iter_mut().find(|b| b.id == block.id) {
            Some(existing) => {
                *existing = block.clone();
                Ok(())
            }
            None => Err(StoreError::database(format!("block {} not found", block.id)).into()),
        }
    }

    async fn delete_block(&self, id: i64) -> DesignerResult<()> {
        let mut inner = self.inner.write().await;
        inner.blocks.retain(|b| b.id != id);
        Ok(())
    }

    async fn create_field(&self, field: NewField) -> DesignerResult<FieldRecord> {
        let mut inner = self.inner.write().await;
        let record = FieldRecord {
            id: inner.next_id(),
            module_id: field.module_id,
            block_id: field.block_id,
            name: field.name,
            uitype: field.uitype,
            displaytype: field.displaytype,
            sequence: field.sequence,
            data: field.data,
        };
        inner.fields.push(record.clone());
        Ok(record)
    }

    async fn update_field(&self, field: &FieldRecord) -> DesignerResult<()> {
        let mut inner = self.inner.write().await;
        match inner.fields.iter_mut().find(|f| f.id == field.id) {
            Some(existing) => {
                *existing = field.clone();
                Ok(())
            }
            None => Err(StoreError::database(format!("field {} not found", field.id)).into()),
        }
    }

    async fn delete_field(&self, id: i64) -> DesignerResult<()> {
        let mut inner = self.inner.write().await;
        inner.fields.retain(|f| f.id != id);
        Ok(())
    }

    async fn find_field(&self, module_id: i64, name: &str) -> DesignerResult<Option<FieldRecord>> {
        let inner = self.inner.read().await;
        Ok(inner
            .fields
            .iter()
            .find(|f| f.module_id == module_id && f.name == name)
            .cloned())
    }

    async fn find_related_list(
        &self,
        module_id: i64,
        related_module_id: i64,
        label: &str,
    ) -> DesignerResult<Option<RelatedListRecord>> {
        let inner = self.inner.read().await;
        Ok(inner
            .related_lists
            .iter()
            .find(|r| {
                r.module_id == module_id
                    && r.related_module_id == related_module_id
                    && r.label == label
            })
            .cloned())
    }

    async fn create_related_list(
        &self,
        list: NewRelatedList,
    ) -> DesignerResult<RelatedListRecord> {
        let mut inner = self.inner.write().await;
        let record = RelatedListRecord {
            id: inner.next_id(),
            module_id: list.module_id,
            related_module_id: list.related_module_id,
            related_field_id: list.related_field_id,
            tab_id: list.tab_id,
            label: list.label,
            icon: list.icon,
            kind: list.kind,
            method: list.method,
            sequence: list.sequence,
            data: list.data,
        };
        inner.related_lists.push(record.clone());
        Ok(record)
    }

    async fn update_related_list(&self, list: &RelatedListRecord) -> DesignerResult<()> {
        let mut inner = self.inner.write().await;
        match inner.related_lists.iter_mut().find(|r| r.id == list.id) {
            Some(existing) => {
                *existing = list.clone();
                Ok(())
            }
            None => {
                Err(StoreError::database(format!("related list {} not found", list.id)).into())
            }
        }
    }

    async fn delete_related_list(&self, id: i64) -> DesignerResult<()> {
        let mut inner = self.inner.write().await;
        inner.related_lists.retain(|r| r.id != id);
        Ok(())
    }

    async fn find_filter(
        &self,
        module_id: i64,
        name: &str,
    ) -> DesignerResult<Option<FilterRecord>> {
        let inner = self.inner.read().await;
        Ok(inner
            .filters
            .iter()
            .find(|f| f.module_id == module_id && f.name == name)
            .cloned())
    }

    async fn create_filter(&self, filter: NewFilter) -> DesignerResult<FilterRecord> {
        let mut inner = self.inner.write().await;
        let record = FilterRecord {
            id: inner.next_id(),
            module_id: filter.module_id,
            domain_id: filter.domain_id,
            name: filter.name,
            filter_type: filter.filter_type,
            columns: filter.columns,
            is_default: filter.is_default,
            is_public: filter.is_public,
            data: filter.data,
        };
        inner.filters.push(record.clone());
        Ok(record)
    }

    async fn update_filter(&self, filter: &FilterRecord) -> DesignerResult<()> {
        let mut inner = self.inner.write().await;
        match inner.filters.iter_mut().find(|f| f.id == filter.id) {
            Some(existing) => {
                *existing = filter.clone();
                Ok(())
            }
            None => Err(StoreError::database(format!("filter {} not found", filter.id)).into()),
        }
    }

    async fn list_domains(&self) -> DesignerResult<Vec<DomainRecord>> {
        Ok(self.inner.read().await.domains.clone())
    }

    async fn detach_module_from_domains(&self, module_id: i64) -> DesignerResult<()> {
        let mut inner = self.inner.write().await;
        inner.attachments.retain(|(_, m)| *m != module_id);
        Ok(())
    }

    async fn attach_module_to_domain(
        &self,
        domain_id: i64,
        module_id: i64,
    ) -> DesignerResult<()> {
        let mut inner = self.inner.write().await;
        if !inner.attachments.contains(&(domain_id, module_id)) {
            inner.attachments.push((domain_id, module_id));
        }
        Ok(())
    }
}

// ============================================================================
// SchemaEditor
// ============================================================================

#[async_trait]
impl SchemaEditor for MemoryStore {
    async fn table_exists(&self, table: &str) -> DesignerResult<bool> {
        Ok(self.inner.read().await.tables.contains_key(table))
    }

    async fn column_exists(&self, table: &str, column: &str) -> DesignerResult<bool> {
        let inner = self.inner.read().await;
        Ok(inner
            .tables
            .get(table)
            .map(|state| state.columns.iter().any(|spec| spec.name == column))
            .unwrap_or(false))
    }

    async fn create_table(&self, spec: &TableSpec) -> DesignerResult<()> {
        let mut inner = self.inner.write().await;
        if inner.tables.contains_key(&spec.name) {
            return Err(InstallError::SchemaConflict {
                table: spec.name.clone(),
                column: "*".to_string(),
                message: "table already exists".to_string(),
            }
            .into());
        }
        inner.tables.insert(
            spec.name.clone(),
            TableState {
                columns: spec.columns.clone(),
                rows: Vec::new(),
            },
        );
        Ok(())
    }

    async fn add_column(&self, table: &str, column: &ColumnSpec) -> DesignerResult<()> {
        let mut inner = self.inner.write().await;
        let state = inner.tables.get_mut(table).ok_or_else(|| InstallError::SchemaConflict {
            table: table.to_string(),
            column: column.name.clone(),
            message: "table does not exist".to_string(),
        })?;
        if state.columns.iter().any(|spec| spec.name == column.name) {
            return Err(InstallError::SchemaConflict {
                table: table.to_string(),
                column: column.name.clone(),
                message: "column already exists".to_string(),
            }
            .into());
        }
        state.columns.push(column.clone());
        Ok(())
    }

    async fn alter_column_nullable(&self, table: &str, column: &str) -> DesignerResult<()> {
        let mut inner = self.inner.write().await;
        let state = inner.tables.get_mut(table).ok_or_else(|| InstallError::SchemaConflict {
            table: table.to_string(),
            column: column.to_string(),
            message: "table does not exist".to_string(),
        })?;
        let spec = state
            .columns
            .iter_mut()
            .find(|spec| spec.name == column)
            .ok_or_else(|| InstallError::SchemaConflict {
                table: table.to_string(),
                column: column.to_string(),
                message: "column does not exist".to_string(),
            })?;
        spec.nullable = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{ModuleConfig, ModuleDesign};
    use crate::store::ColumnType;

    #[tokio::test]
    async fn test_draft_round_trip() {
        let store = MemoryStore::new();
        let design = ModuleDesign::create(ModuleConfig::new("book-type")).unwrap();

        store.save_draft(&design).await.unwrap();
        assert_eq!(store.list_drafts().await.unwrap(), vec!["book-type"]);

        let restored = store.load_draft("book-type").await.unwrap().unwrap();
        assert_eq!(restored.name, "book-type");
        assert_eq!(restored.table_name, "book_types");

        store.delete_draft("book-type").await.unwrap();
        assert!(store.load_draft("book-type").await.unwrap().is_none());

        let err = store.delete_draft("book-type").await.unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[tokio::test]
    async fn test_module_ids_are_stable_across_updates() {
        let store = MemoryStore::new();
        let created = store
            .create_module(NewModule {
                name: "book".to_string(),
                icon: None,
                model_class: "app::models::Book".to_string(),
                data: Value::Null,
            })
            .await
            .unwrap();

        let mut updated = created.clone();
        updated.icon = Some("book".to_string());
        store.update_module(&updated).await.unwrap();

        let found = store.find_module_by_name("book").await.unwrap().unwrap();
        assert_eq!(found.id, created.id);
        assert_eq!(found.icon.as_deref(), Some("book"));
    }

    #[tokio::test]
    async fn test_schema_editor_primitives() {
        let store = MemoryStore::new();
        let spec = TableSpec {
            name: "book_types".to_string(),
            columns: vec![
                ColumnSpec::new("id", ColumnType::BigIncrements, false),
                ColumnSpec::new("title", ColumnType::Varchar(255), false),
            ],
        };

        store.create_table(&spec).await.unwrap();
        assert!(store.table_exists("book_types").await.unwrap());
        assert!(store.column_exists("book_types", "title").await.unwrap());
        assert!(!store.column_exists("book_types", "price").await.unwrap());

        store
            .add_column(
                "book_types",
                &ColumnSpec::new("price", ColumnType::Integer, true),
            )
            .await
            .unwrap();
        assert!(store.column_exists("book_types", "price").await.unwrap());

        store.alter_column_nullable("book_types", "title").await.unwrap();
        assert!(store.column("book_types", "title").await.unwrap().nullable);

        let err = store.create_table(&spec).await.unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[tokio::test]
    async fn test_domain_attachment_is_idempotent() {
        let store = MemoryStore::new();
        let domain = store.add_domain("main").await;

        store.attach_module_to_domain(domain.id, 42).await.unwrap();
        store.attach_module_to_domain(domain.id, 42).await.unwrap();
        assert_eq!(store.attachments().await.len(), 1);

        store.detach_module_from_domains(42).await.unwrap();
        assert!(store.attachments().await.is_empty());
    }
}
