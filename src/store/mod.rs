//! Storage abstractions
//!
//! Three seams hide everything external to the designer: `DraftStore` for
//! design-document snapshots, `MetadataStore` for the installed module
//! structure (module/tab/block/field/filter/related-list rows plus the
//! domain attachment relation), and `SchemaEditor` for the physical table
//! primitives. The installer and session controller depend only on these
//! traits; `MemoryStore` backs tests and offline use, `PgStore` real
//! deployments.

pub mod memory;
#[cfg(feature = "database")]
pub mod postgres;

use async_trait::async_trait;
use serde_json::Value;

use crate::document::ModuleDesign;
use crate::error::DesignerResult;

pub use memory::MemoryStore;
#[cfg(feature = "database")]
pub use postgres::PgStore;

// ============================================================================
// Metadata records
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ModuleRecord {
    pub id: i64,
    pub name: String,
    pub icon: Option<String>,
    pub model_class: String,
    pub data: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TabRecord {
    pub id: i64,
    pub module_id: i64,
    pub label: String,
    pub icon: Option<String>,
    pub sequence: u32,
    pub data: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BlockRecord {
    pub id: i64,
    pub module_id: i64,
    pub tab_id: i64,
    pub label: String,
    pub icon: Option<String>,
    pub sequence: u32,
    pub data: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldRecord {
    pub id: i64,
    pub module_id: i64,
    pub block_id: i64,
    pub name: String,
    pub uitype: String,
    pub displaytype: String,
    pub sequence: u32,
    pub data: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterRecord {
    pub id: i64,
    pub module_id: i64,
    pub domain_id: Option<i64>,
    pub name: String,
    pub filter_type: String,
    pub columns: Vec<String>,
    pub is_default: bool,
    pub is_public: bool,
    pub data: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RelatedListRecord {
    pub id: i64,
    pub module_id: i64,
    pub related_module_id: i64,
    pub related_field_id: Option<i64>,
    pub tab_id: Option<i64>,
    pub label: String,
    pub icon: Option<String>,
    pub kind: String,
    pub method: String,
    pub sequence: u32,
    pub data: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DomainRecord {
    pub id: i64,
    pub name: String,
}

// ============================================================================
// Creation payloads
// ============================================================================

#[derive(Debug, Clone)]
pub struct NewModule {
    pub name: String,
    pub icon: Option<String>,
    pub model_class: String,
    pub data: Value,
}

#[derive(Debug, Clone)]
pub struct NewTab {
    pub module_id: i64,
    pub label: String,
    pub icon: Option<String>,
    pub sequence: u32,
    pub data: Value,
}

#[derive(Debug, Clone)]
pub struct NewBlock {
    pub module_id: i64,
    pub tab_id: i64,
    pub label: String,
    pub icon: Option<String>,
    pub sequence: u32,
    pub data: Value,
}

#[derive(Debug, Clone)]
pub struct NewField {
    pub module_id: i64,
    pub block_id: i64,
    pub name: String,
    pub uitype: String,
    pub displaytype: String,
    pub sequence: u32,
    pub data: Value,
}

#[derive(Debug, Clone)]
pub struct NewFilter {
    pub module_id: i64,
    pub domain_id: Option<i64>,
    pub name: String,
    pub filter_type: String,
    pub columns: Vec<String>,
    pub is_default: bool,
    pub is_public: bool,
    pub data: Value,
}

#[derive(Debug, Clone)]
pub struct NewRelatedList {
    pub module_id: i64,
    pub related_module_id: i64,
    pub related_field_id: Option<i64>,
    pub tab_id: Option<i64>,
    pub label: String,
    pub icon: Option<String>,
    pub kind: String,
    pub method: String,
    pub sequence: u32,
    pub data: Value,
}

// ============================================================================
// Physical schema types
// ============================================================================

/// Portable column type vocabulary. Backends map these to their own DDL;
/// the model generator maps them to Rust field types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    BigIncrements,
    BigInteger,
    Integer,
    Varchar(u32),
    Text,
    Decimal { precision: u8, scale: u8 },
    Boolean,
    Date,
    Timestamp,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSpec {
    pub name: String,
    pub column_type: ColumnType,
    pub nullable: bool,
}

impl ColumnSpec {
    pub fn new(name: &str, column_type: ColumnType, nullable: bool) -> Self {
        Self {
            name: name.to_string(),
            column_type,
            nullable,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableSpec {
    pub name: String,
    pub columns: Vec<ColumnSpec>,
}

// ============================================================================
// Traits
// ============================================================================

/// Keyed store of design-document snapshots, one per module name.
#[async_trait]
pub trait DraftStore: Send + Sync {
    async fn list_drafts(&self) -> DesignerResult<Vec<String>>;
    async fn load_draft(&self, name: &str) -> DesignerResult<Option<ModuleDesign>>;
    /// Upsert keyed by `design.name`.
    async fn save_draft(&self, design: &ModuleDesign) -> DesignerResult<()>;
    async fn delete_draft(&self, name: &str) -> DesignerResult<()>;
}

/// CRUD over the installed module structure.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    async fn find_module_by_name(&self, name: &str) -> DesignerResult<Option<ModuleRecord>>;
    async fn create_module(&self, module: NewModule) -> DesignerResult<ModuleRecord>;
    async fn update_module(&self, module: &ModuleRecord) -> DesignerResult<()>;
    async fn list_modules(&self) -> DesignerResult<Vec<ModuleRecord>>;

    async fn tabs_for_module(&self, module_id: i64) -> DesignerResult<Vec<TabRecord>>;
    async fn blocks_for_module(&self, module_id: i64) -> DesignerResult<Vec<BlockRecord>>;
    async fn fields_for_module(&self, module_id: i64) -> DesignerResult<Vec<FieldRecord>>;
    async fn related_lists_for_module(
        &self,
        module_id: i64,
    ) -> DesignerResult<Vec<RelatedListRecord>>;

    async fn create_tab(&self, tab: NewTab) -> DesignerResult<TabRecord>;
    async fn update_tab(&self, tab: &TabRecord) -> DesignerResult<()>;
    async fn delete_tab(&self, id: i64) -> DesignerResult<()>;

    async fn create_block(&self, block: NewBlock) -> DesignerResult<BlockRecord>;
    async fn update_block(&self, block: &BlockRecord) -> DesignerResult<()>;
    async fn delete_block(&self, id: i64) -> DesignerResult<()>;

    async fn create_field(&self, field: NewField) -> DesignerResult<FieldRecord>;
    async fn update_field(&self, field: &FieldRecord) -> DesignerResult<()>;
    async fn delete_field(&self, id: i64) -> DesignerResult<()>;
    async fn find_field(&self, module_id: i64, name: &str) -> DesignerResult<Option<FieldRecord>>;

    async fn find_related_list(
        &self,
        module_id: i64,
        related_module_id: i64,
        label: &str,
    ) -> DesignerResult<Option<RelatedListRecord>>;
    async fn create_related_list(
        &self,
        list: NewRelatedList,
    ) -> DesignerResult<RelatedListRecord>;
    async fn update_related_list(&self, list: &RelatedListRecord) -> DesignerResult<()>;
    async fn delete_related_list(&self, id: i64) -> DesignerResult<()>;

    async fn find_filter(
        &self,
        module_id: i64,
        name: &str,
    ) -> DesignerResult<Option<FilterRecord>>;
    async fn create_filter(&self, filter: NewFilter) -> DesignerResult<FilterRecord>;
    async fn update_filter(&self, filter: &FilterRecord) -> DesignerResult<()>;

    async fn list_domains(&self) -> DesignerResult<Vec<DomainRecord>>;
    async fn detach_module_from_domains(&self, module_id: i64) -> DesignerResult<()>;
    async fn attach_module_to_domain(
        &self,
        domain_id: i64,
        module_id: i64,
    ) -> DesignerResult<()>;
}

/// Physical table primitives. Intentionally small: the installer never
/// drops tables or columns.
#[async_trait]
pub trait SchemaEditor: Send + Sync {
    async fn table_exists(&self, table: &str) -> DesignerResult<bool>;
    async fn column_exists(&self, table: &str, column: &str) -> DesignerResult<bool>;
    async fn create_table(&self, spec: &TableSpec) -> DesignerResult<()>;
    async fn add_column(&self, table: &str, column: &ColumnSpec) -> DesignerResult<()>;
    async fn alter_column_nullable(&self, table: &str, column: &str) -> DesignerResult<()>;
}
