//! Postgres store
//!
//! Implements the three storage traits over a `PgPool`. Metadata tables are
//! created on demand by `ensure_schema`; physical module tables are managed
//! through the `SchemaEditor` DDL primitives. All queries use the runtime
//! API so the crate builds without a live database.

use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use tracing::info;

use async_trait::async_trait;

use crate::document::ModuleDesign;
use crate::error::{DesignerResult, StoreError};

use super::{
    BlockRecord, ColumnSpec, ColumnType, DomainRecord, DraftStore, FieldRecord, FilterRecord,
    MetadataStore, ModuleRecord, NewBlock, NewField, NewFilter, NewModule, NewRelatedList,
    NewTab, RelatedListRecord, SchemaEditor, TableSpec, TabRecord,
};

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS designed_modules (
        id bigserial PRIMARY KEY,
        name varchar(255) NOT NULL UNIQUE,
        data jsonb NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS modules (
        id bigserial PRIMARY KEY,
        name varchar(255) NOT NULL UNIQUE,
        icon varchar(255),
        model_class varchar(255) NOT NULL,
        data jsonb
    )",
    "CREATE TABLE IF NOT EXISTS tabs (
        id bigserial PRIMARY KEY,
        module_id bigint NOT NULL REFERENCES modules(id),
        label varchar(255) NOT NULL,
        icon varchar(255),
        sequence integer NOT NULL,
        data jsonb
    )",
    "CREATE TABLE IF NOT EXISTS blocks (
        id bigserial PRIMARY KEY,
        module_id bigint NOT NULL REFERENCES modules(id),
        tab_id bigint NOT NULL REFERENCES tabs(id),
        label varchar(255) NOT NULL,
        icon varchar(255),
        sequence integer NOT NULL,
        data jsonb
    )",
    "CREATE TABLE IF NOT EXISTS fields (
        id bigserial PRIMARY KEY,
        module_id bigint NOT NULL REFERENCES modules(id),
        block_id bigint NOT NULL REFERENCES blocks(id),
        name varchar(255) NOT NULL,
        uitype varchar(255) NOT NULL,
        displaytype varchar(255) NOT NULL,
        sequence integer NOT NULL,
        data jsonb
    )",
    "CREATE TABLE IF NOT EXISTS filters (
        id bigserial PRIMARY KEY,
        module_id bigint NOT NULL REFERENCES modules(id),
        domain_id bigint,
        name varchar(255) NOT NULL,
        type varchar(255) NOT NULL,
        columns jsonb NOT NULL,
        is_default boolean NOT NULL DEFAULT false,
        is_public boolean NOT NULL DEFAULT false,
        data jsonb
    )",
    "CREATE TABLE IF NOT EXISTS relatedlists (
        id bigserial PRIMARY KEY,
        module_id bigint NOT NULL REFERENCES modules(id),
        related_module_id bigint NOT NULL REFERENCES modules(id),
        related_field_id bigint,
        tab_id bigint,
        label varchar(255) NOT NULL,
        icon varchar(255),
        type varchar(255) NOT NULL,
        method varchar(255) NOT NULL,
        sequence integer NOT NULL,
        data jsonb
    )",
    "CREATE TABLE IF NOT EXISTS domains (
        id bigserial PRIMARY KEY,
        name varchar(255) NOT NULL UNIQUE
    )",
    "CREATE TABLE IF NOT EXISTS domains_modules (
        domain_id bigint NOT NULL REFERENCES domains(id),
        module_id bigint NOT NULL REFERENCES modules(id),
        PRIMARY KEY (domain_id, module_id)
    )",
];

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect with a small pool sized for a single-operator tool.
    pub async fn connect(database_url: &str) -> DesignerResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(std::time::Duration::from_secs(30))
            .connect(database_url)
            .await?;
        info!("database connection pool created");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the designer's own metadata tables when missing.
    pub async fn ensure_schema(&self) -> DesignerResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }
}

fn module_from_row(row: &sqlx::postgres::PgRow) -> ModuleRecord {
    ModuleRecord {
        id: row.get("id"),
        name: row.get("name"),
        icon: row.get("icon"),
        model_class: row.get("model_class"),
        data: row.get::<Option<Value>, _>("data").unwrap_or(Value::Null),
    }
}

fn tab_from_row(row: &sqlx::postgres::PgRow) -> TabRecord {
    TabRecord {
        id: row.get("id"),
        module_id: row.get("module_id"),
        label: row.get("label"),
        icon: row.get("icon"),
        sequence: row.get::<i32, _>("sequence") as u32,
        data: row.get::<Option<Value>, _>("data").unwrap_or(Value::Null),
    }
}

fn block_from_row(row: &sqlx::postgres::PgRow) -> BlockRecord {
    BlockRecord {
        id: row.get("id"),
        module_id: row.get("module_id"),
        tab_id: row.get("tab_id"),
        label: row.get("label"),
        icon: row.get("icon"),
        sequence: row.get::<i32, _>("sequence") as u32,
        data: row.get::<Option<Value>, _>("data").unwrap_or(Value::Null),
    }
}

fn field_from_row(row: &sqlx::postgres::PgRow) -> FieldRecord {
    FieldRecord {
        id: row.get("id"),
        module_id: row.get("module_id"),
        block_id: row.get("block_id"),
        name: row.get("name"),
        uitype: row.get("uitype"),
        displaytype: row.get("displaytype"),
        sequence: row.get::<i32, _>("sequence") as u32,
        data: row.get::<Option<Value>, _>("data").unwrap_or(Value::Null),
    }
}

fn filter_from_row(row: &sqlx::postgres::PgRow) -> DesignerResult<FilterRecord> {
    let columns: Value = row.get("columns");
    let columns: Vec<String> = serde_json::from_value(columns)?;
    Ok(FilterRecord {
        id: row.get("id"),
        module_id: row.get("module_id"),
        domain_id: row.get("domain_id"),
        name: row.get("name"),
        filter_type: row.get("type"),
        columns,
        is_default: row.get("is_default"),
        is_public: row.get("is_public"),
        data: row.get::<Option<Value>, _>("data").unwrap_or(Value::Null),
    })
}

fn related_list_from_row(row: &sqlx::postgres::PgRow) -> RelatedListRecord {
    RelatedListRecord {
        id: row.get("id"),
        module_id: row.get("module_id"),
        related_module_id: row.get("related_module_id"),
        related_field_id: row.get("related_field_id"),
        tab_id: row.get("tab_id"),
        label: row.get("label"),
        icon: row.get("icon"),
        kind: row.get("type"),
        method: row.get("method"),
        sequence: row.get::<i32, _>("sequence") as u32,
        data: row.get::<Option<Value>, _>("data").unwrap_or(Value::Null),
    }
}

// ============================================================================
// DraftStore
// ============================================================================

#[async_trait]
impl DraftStore for PgStore {
    async fn list_drafts(&self) -> DesignerResult<Vec<String>> {
        let names = sqlx::query_scalar::<_, String>(
            "SELECT name FROM designed_modules ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(names)
    }

    async fn load_draft(&self, name: &str) -> DesignerResult<Option<ModuleDesign>> {
        let snapshot = sqlx::query_scalar::<_, Value>(
            "SELECT data FROM designed_modules WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        match snapshot {
            Some(snapshot) => {
                let design: ModuleDesign = serde_json::from_value(snapshot)?;
                Ok(Some(design))
            }
            None => Ok(None),
        }
    }

    async fn save_draft(&self, design: &ModuleDesign) -> DesignerResult<()> {
        let snapshot = serde_json::to_value(design)?;
        sqlx::query(
            "INSERT INTO designed_modules (name, data) VALUES ($1, $2)
             ON CONFLICT (name) DO UPDATE SET data = EXCLUDED.data",
        )
        .bind(&design.name)
        .bind(snapshot)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_draft(&self, name: &str) -> DesignerResult<()> {
        let result = sqlx::query("DELETE FROM designed_modules WHERE name = $1")
            .bind(name)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
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
impl MetadataStore for PgStore {
    async fn find_module_by_name(&self, name: &str) -> DesignerResult<Option<ModuleRecord>> {
        let row = sqlx::query(
            "SELECT id, name, icon, model_class, data FROM modules WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(module_from_row))
    }

    async fn create_module(&self, module: NewModule) -> DesignerResult<ModuleRecord> {
        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO modules (name, icon, model_class, data)
             VALUES ($1, $2, $3, $4) RETURNING id",
        )
        .bind(&module.name)
        .bind(&module.icon)
        .bind(&module.model_class)
        .bind(&module.data)
        .fetch_one(&self.pool)
        .await?;
        Ok(ModuleRecord {
            id,
            name: module.name,
            icon: module.icon,
            model_class: module.model_class,
            data: module.data,
        })
    }

    async fn update_module(&self, module: &ModuleRecord) -> DesignerResult<()> {
        sqlx::query(
            "UPDATE modules SET icon = $2, model_class = $3, data = $4 WHERE id = $1",
        )
        .bind(module.id)
        .bind(&module.icon)
        .bind(&module.model_class)
        .bind(&module.data)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_modules(&self) -> DesignerResult<Vec<ModuleRecord>> {
        let rows = sqlx::query("SELECT id, name, icon, model_class, data FROM modules ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(module_from_row).collect())
    }

    async fn tabs_for_module(&self, module_id: i64) -> DesignerResult<Vec<TabRecord>> {
        let rows = sqlx::query(
            "SELECT id, module_id, label, icon, sequence, data
             FROM tabs WHERE module_id = $1 ORDER BY sequence",
        )
        .bind(module_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(tab_from_row).collect())
    }

    async fn blocks_for_module(&self, module_id: i64) -> DesignerResult<Vec<BlockRecord>> {
        let rows = sqlx::query(
            "SELECT id, module_id, tab_id, label, icon, sequence, data
             FROM blocks WHERE module_id = $1 ORDER BY sequence",
        )
        .bind(module_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(block_from_row).collect())
    }

    async fn fields_for_module(&self, module_id: i64) -> DesignerResult<Vec<FieldRecord>> {
        let rows = sqlx::query(
            "SELECT id, module_id, block_id, name, uitype, displaytype, sequence, data
             FROM fields WHERE module_id = $1 ORDER BY sequence",
        )
        .bind(module_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(field_from_row).collect())
    }

    async fn related_lists_for_module(
        &self,
        module_id: i64,
    ) -> DesignerResult<Vec<RelatedListRecord>> {
        let rows = sqlx::query(
            "SELECT id, module_id, related_module_id, related_field_id, tab_id,
                    label, icon, type, method, sequence, data
             FROM relatedlists WHERE module_id = $1 ORDER BY sequence",
        )
        .bind(module_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(related_list_from_row).collect())
    }

    async fn create_tab(&self, tab: NewTab) -> DesignerResult<TabRecord> {
        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO tabs (module_id, label, icon, sequence, data)
             VALUES ($1, $2, $3, $4, $5) RETURNING id",
        )
        .bind(tab.module_id)
        .bind(&tab.label)
        .bind(&tab.icon)
        .bind(tab.sequence as i32)
        .bind(&tab.data)
        .fetch_one(&self.pool)
        .await?;
        Ok(TabRecord {
            id,
            module_id: tab.module_id,
            label: tab.label,
            icon: tab.icon,
            sequence: tab.sequence,
            data: tab.data,
        })
    }

    async fn update_tab(&self, tab: &TabRecord) -> DesignerResult<()> {
        sqlx::query(
            "UPDATE tabs SET label = $2, icon = $3, sequence = $4, data = $5 WHERE id = $1",
        )
        .bind(tab.id)
        .bind(&tab.label)
        .bind(&tab.icon)
        .bind(tab.sequence as i32)
        .bind(&tab.data)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_tab(&self, id: i64) -> DesignerResult<()> {
        sqlx::query("DELETE FROM tabs WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn create_block(&self, block: NewBlock) -> DesignerResult<BlockRecord> {
        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO blocks (module_id, tab_id, label, icon, sequence, data)
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING id",
        )
        .bind(block.module_id)
        .bind(block.tab_id)
        .bind(&block.label)
        .bind(&block.icon)
        .bind(block.sequence as i32)
        .bind(&block.data)
        .fetch_one(&self.pool)
        .await?;
        Ok(BlockRecord {
            id,
            module_id: block.module_id,
            tab_id: block.tab_id,
            label: block.label,
            icon: block.icon,
            sequence: block.sequence,
            data: block.data,
        })
    }

    async fn update_block(&self, block: &BlockRecord) -> DesignerResult<()> {
        sqlx::query(
            "UPDATE blocks SET tab_id = $2, label = $3, icon = $4, sequence = $5, data = $6
             WHERE id = $1",
        )
        .bind(block.id)
        .bind(block.tab_id)
        .bind(&block.label)
        .bind(&block.icon)
        .bind(block.sequence as i32)
        .bind(&block.data)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_block(&self, id: i64) -> DesignerResult<()> {
        sqlx::query("DELETE FROM blocks WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn create_field(&self, field: NewField) -> DesignerResult<FieldRecord> {
        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO fields (module_id, block_id, name, uitype, displaytype, sequence, data)
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING id",
        )
        .bind(field.module_id)
        .bind(field.block_id)
        .bind(&field.name)
        .bind(&field.uitype)
        .bind(&field.displaytype)
        .bind(field.sequence as i32)
        .bind(&field.data)
        .fetch_one(&self.pool)
        .await?;
        Ok(FieldRecord {
            id,
            module_id: field.module_id,
            block_id: field.block_id,
            name: field.name,
            uitype: field.uitype,
            displaytype: field.displaytype,
            sequence: field.sequence,
            data: field.data,
        })
    }

    async fn update_field(&self, field: &FieldRecord) -> DesignerResult<()> {
        sqlx::query(
            "UPDATE fields SET block_id = $2, uitype = $3, displaytype = $4,
                    sequence = $5, data = $6
             WHERE id = $1",
        )
        .bind(field.id)
        .bind(field.block_id)
        .bind(&field.uitype)
        .bind(&field.displaytype)
        .bind(field.sequence as i32)
        .bind(&field.data)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_field(&self, id: i64) -> DesignerResult<()> {
        sqlx::query("DELETE FROM fields WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_field(&self, module_id: i64, name: &str) -> DesignerResult<Option<FieldRecord>> {
        let row = sqlx::query(
            "SELECT id, module_id, block_id, name, uitype, displaytype, sequence, data
             FROM fields WHERE module_id = $1 AND name = $2",
        )
        .bind(module_id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(field_from_row))
    }

    async fn find_related_list(
        &self,
        module_id: i64,
        related_module_id: i64,
        label: &str,
    ) -> DesignerResult<Option<RelatedListRecord>> {
        let row = sqlx::query(
            "SELECT id, module_id, related_module_id, related_field_id, tab_id,
                    label, icon, type, method, sequence, data
             FROM relatedlists
             WHERE module_id = $1 AND related_module_id = $2 AND label = $3",
        )
        .bind(module_id)
        .bind(related_module_id)
        .bind(label)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(related_list_from_row))
    }

    async fn create_related_list(
        &self,
        list: NewRelatedList,
    ) -> DesignerResult<RelatedListRecord> {
        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO relatedlists (module_id, related_module_id, related_field_id, tab_id,
                                       label, icon, type, method, sequence, data)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING id",
        )
        .bind(list.module_id)
        .bind(list.related_module_id)
        .bind(list.related_field_id)
        .bind(list.tab_id)
        .bind(&list.label)
        .bind(&list.icon)
        .bind(&list.kind)
        .bind(&list.method)
        .bind(list.sequence as i32)
        .bind(&list.data)
        .fetch_one(&self.pool)
        .await?;
        Ok(RelatedListRecord {
            id,
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
        })
    }

    async fn update_related_list(&self, list: &RelatedListRecord) -> DesignerResult<()> {
        sqlx::query(
            "UPDATE relatedlists SET related_field_id = $2, tab_id = $3, icon = $4,
                    type = $5, method = $6, sequence = $7, data = $8
             WHERE id = $1",
        )
        .bind(list.id)
        .bind(list.related_field_id)
        .bind(list.tab_id)
        .bind(&list.icon)
        .bind(&list.kind)
        .bind(&list.method)
        .bind(list.sequence as i32)
        .bind(&list.data)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_related_list(&self, id: i64) -> DesignerResult<()> {
        sqlx::query("DELETE FROM relatedlists WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_filter(
        &self,
        module_id: i64,
        name: &str,
    ) -> DesignerResult<Option<FilterRecord>> {
        let row = sqlx::query(
            "SELECT id, module_id, domain_id, name, type, columns, is_default, is_public, data
             FROM filters WHERE module_id = $1 AND name = $2",
        )
        .bind(module_id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        match row {
            Some(row) => Ok(Some(filter_from_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn create_filter(&self, filter: NewFilter) -> DesignerResult<FilterRecord> {
        let columns = serde_json::to_value(&filter.columns)?;
        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO filters (module_id, domain_id, name, type, columns,
                                  is_default, is_public, data)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING id",
        )
        .bind(filter.module_id)
        .bind(filter.domain_id)
        .bind(&filter.name)
        .bind(&filter.filter_type)
        .bind(columns)
        .bind(filter.is_default)
        .bind(filter.is_public)
        .bind(&filter.data)
        .fetch_one(&self.pool)
        .await?;
        Ok(FilterRecord {
            id,
            module_id: filter.module_id,
            domain_id: filter.domain_id,
            name: filter.name,
            filter_type: filter.filter_type,
            columns: filter.columns,
            is_default: filter.is_default,
            is_public: filter.is_public,
            data: filter.data,
        })
    }

    async fn update_filter(&self, filter: &FilterRecord) -> DesignerResult<()> {
        let columns = serde_json::to_value(&filter.columns)?;
        sqlx::query(
            "UPDATE filters SET columns = $2, is_default = $3, is_public = $4, data = $5
             WHERE id = $1",
        )
        .bind(filter.id)
        .bind(columns)
        .bind(filter.is_default)
        .bind(filter.is_public)
        .bind(&filter.data)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_domains(&self) -> DesignerResult<Vec<DomainRecord>> {
        let rows = sqlx::query("SELECT id, name FROM domains ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .iter()
            .map(|row| DomainRecord {
                id: row.get("id"),
                name: row.get("name"),
            })
            .collect())
    }

    async fn detach_module_from_domains(&self, module_id: i64) -> DesignerResult<()> {
        sqlx::query("DELETE FROM domains_modules WHERE module_id = $1")
            .bind(module_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn attach_module_to_domain(
        &self,
        domain_id: i64,
        module_id: i64,
    ) -> DesignerResult<()> {
        sqlx::query(
            "INSERT INTO domains_modules (domain_id, module_id) VALUES ($1, $2)
             ON CONFLICT DO NOTHING",
        )
        .bind(domain_id)
        .bind(module_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

// ============================================================================
// SchemaEditor
// ============================================================================

fn column_type_sql(column_type: ColumnType) -> String {
    match column_type {
        ColumnType::BigIncrements => "bigserial PRIMARY KEY".to_string(),
        ColumnType::BigInteger => "bigint".to_string(),
        ColumnType::Integer => "integer".to_string(),
        ColumnType::Varchar(length) => format!("varchar({length})"),
        ColumnType::Text => "text".to_string(),
        ColumnType::Decimal { precision, scale } => format!("numeric({precision},{scale})"),
        ColumnType::Boolean => "boolean".to_string(),
        ColumnType::Date => "date".to_string(),
        ColumnType::Timestamp => "timestamptz".to_string(),
    }
}

fn column_sql(column: &ColumnSpec) -> String {
    let mut sql = format!("\"{}\" {}", column.name, column_type_sql(column.column_type));
    if !column.nullable && column.column_type != ColumnType::BigIncrements {
        sql.push_str(" NOT NULL");
    }
    sql
}

#[async_trait]
impl SchemaEditor for PgStore {
    async fn table_exists(&self, table: &str) -> DesignerResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (
                SELECT 1 FROM information_schema.tables
                WHERE table_schema = 'public' AND table_name = $1
            )",
        )
        .bind(table)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn column_exists(&self, table: &str, column: &str) -> DesignerResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (
                SELECT 1 FROM information_schema.columns
                WHERE table_schema = 'public' AND table_name = $1 AND column_name = $2
            )",
        )
        .bind(table)
        .bind(column)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn create_table(&self, spec: &TableSpec) -> DesignerResult<()> {
        let columns: Vec<String> = spec.columns.iter().map(column_sql).collect();
        let ddl = format!("CREATE TABLE \"{}\" ({})", spec.name, columns.join(", "));
        sqlx::query(&ddl).execute(&self.pool).await?;
        Ok(())
    }

    async fn add_column(&self, table: &str, column: &ColumnSpec) -> DesignerResult<()> {
        let ddl = format!(
            "ALTER TABLE \"{table}\" ADD COLUMN {}",
            column_sql(column)
        );
        sqlx::query(&ddl).execute(&self.pool).await?;
        Ok(())
    }

    async fn alter_column_nullable(&self, table: &str, column: &str) -> DesignerResult<()> {
        let ddl = format!("ALTER TABLE \"{table}\" ALTER COLUMN \"{column}\" DROP NOT NULL");
        sqlx::query(&ddl).execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_sql_rendering() {
        let spec = ColumnSpec::new("title", ColumnType::Varchar(255), false);
        assert_eq!(column_sql(&spec), "\"title\" varchar(255) NOT NULL");

        let spec = ColumnSpec::new("price", ColumnType::Decimal { precision: 13, scale: 2 }, true);
        assert_eq!(column_sql(&spec), "\"price\" numeric(13,2)");

        let spec = ColumnSpec::new("id", ColumnType::BigIncrements, false);
        assert_eq!(column_sql(&spec), "\"id\" bigserial PRIMARY KEY");
    }
}
