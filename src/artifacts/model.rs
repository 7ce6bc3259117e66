//! Model source generation
//!
//! Renders a Rust model file for the configured model class: the column
//! struct, the table binding, one `BelongsTo` accessor per entity field and
//! one `BelongsToMany` accessor per n-n related list. An existing file is
//! preserved by renaming it aside before the new one is written; when the
//! rendered output is byte-identical the file is left alone.

use convert_case::{Case, Casing};
use handlebars::Handlebars;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::document::{naming, ModuleDesign, RelatedListKind};
use crate::error::{DesignerError, DesignerResult};
use crate::store::{ColumnType, MetadataStore, ModuleRecord};
use crate::uitype::UitypeRegistry;

use super::ArtifactFs;

const MODEL_TEMPLATE: &str = r#"//! Generated model for the {{module}} module.
//!
//! Regenerated on each install. The previous version of this file, if any,
//! is kept alongside with a `.prev` suffix.

use crate::orm::Model;
{{#if has_belongs_to}}
use crate::orm::BelongsTo;
{{/if}}
{{#if has_belongs_to_many}}
use crate::orm::BelongsToMany;
{{/if}}

#[derive(Debug, Clone)]
pub struct {{struct_name}} {
    pub id: i64,
{{#each columns}}
    pub {{name}}: {{rust_type}},
{{/each}}
    pub domain_id: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    pub deleted_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Model for {{struct_name}} {
    const TABLE: &'static str = "{{table}}";
}
{{#if has_relations}}

impl {{struct_name}} {
{{#each belongs_to}}
    pub fn {{method}}(&self) -> BelongsTo<super::{{target}}> {
        BelongsTo::new(self, "{{column}}")
    }
{{/each}}
{{#each belongs_to_many}}
    pub fn {{method}}(&self) -> BelongsToMany<super::{{target}}> {
        BelongsToMany::new(self, "{{pivot}}")
    }
{{/each}}
}
{{/if}}
"#;

#[derive(Serialize)]
struct ColumnContext {
    name: String,
    rust_type: String,
}

#[derive(Serialize)]
struct BelongsToContext {
    method: String,
    target: String,
    column: String,
}

#[derive(Serialize)]
struct BelongsToManyContext {
    method: String,
    target: String,
    pivot: String,
}

#[derive(Serialize)]
struct ModelContext {
    module: String,
    struct_name: String,
    table: String,
    columns: Vec<ColumnContext>,
    belongs_to: Vec<BelongsToContext>,
    belongs_to_many: Vec<BelongsToManyContext>,
    has_belongs_to: bool,
    has_belongs_to_many: bool,
    has_relations: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelArtifact {
    pub path: String,
    /// Set when an older, different file was moved aside.
    pub renamed_previous: Option<String>,
}

pub struct ModelGenerator {
    handlebars: Handlebars<'static>,
}

impl ModelGenerator {
    pub fn new() -> Self {
        let mut handlebars = Handlebars::new();
        handlebars.register_escape_fn(handlebars::no_escape);
        Self { handlebars }
    }

    pub async fn generate(
        &self,
        design: &ModuleDesign,
        uitypes: &UitypeRegistry,
        metadata: &dyn MetadataStore,
        files: &dyn ArtifactFs,
    ) -> DesignerResult<ModelArtifact> {
        let struct_name = naming::model_struct_name(&design.model_class).to_string();
        let context = self.build_context(design, &struct_name, uitypes, metadata).await?;

        let rendered = self
            .handlebars
            .render_template(MODEL_TEMPLATE, &context)
            .map_err(|e| DesignerError::template(e.to_string()))?;

        let path = format!("models/{}.rs", struct_name.to_case(Case::Snake));
        let existing = files.read(&path)?;
        if existing.as_deref() == Some(rendered.as_str()) {
            return Ok(ModelArtifact {
                path,
                renamed_previous: None,
            });
        }

        let renamed_previous = if existing.is_some() {
            let aside = format!("{path}.prev");
            files.rename(&path, &aside)?;
            Some(aside)
        } else {
            None
        };

        files.write(&path, &rendered)?;
        Ok(ModelArtifact {
            path,
            renamed_previous,
        })
    }

    async fn build_context(
        &self,
        design: &ModuleDesign,
        struct_name: &str,
        uitypes: &UitypeRegistry,
        metadata: &dyn MetadataStore,
    ) -> DesignerResult<ModelContext> {
        let mut columns = Vec::new();
        let mut belongs_to = Vec::new();

        for field in design.all_fields() {
            if field.name == "id" {
                continue;
            }

            match uitypes.get(&field.uitype) {
                Some(uitype) => {
                    let spec = uitype.column_spec(field);
                    columns.push(ColumnContext {
                        name: spec.name.clone(),
                        rust_type: rust_type(spec.column_type, spec.nullable),
                    });
                }
                None => {
                    warn!(field = %field.name, uitype = %field.uitype, "unknown uitype, defaulting column to String");
                    columns.push(ColumnContext {
                        name: field.name.clone(),
                        rust_type: rust_type(ColumnType::Varchar(255), !field.is_required()),
                    });
                }
            }

            if field.uitype == "entity" {
                let Some(module_name) = field.data.str_opt("module") else {
                    warn!(field = %field.name, "entity field has no referenced module, skipping accessor");
                    continue;
                };
                match metadata.find_module_by_name(module_name).await? {
                    Some(record) => belongs_to.push(BelongsToContext {
                        method: field.name.clone(),
                        target: naming::model_struct_name(&record.model_class).to_string(),
                        column: field.name.clone(),
                    }),
                    None => {
                        warn!(field = %field.name, module = %module_name, "referenced module not installed, skipping accessor");
                    }
                }
            }
        }

        let mut belongs_to_many = Vec::new();
        for list in &design.related_lists {
            if list.kind != RelatedListKind::ManyToMany {
                continue;
            }
            match metadata.find_module_by_name(&list.related_module).await? {
                Some(record) => {
                    let raw = list
                        .label
                        .strip_prefix("relatedlist.")
                        .unwrap_or(&list.label);
                    belongs_to_many.push(BelongsToManyContext {
                        method: raw.to_case(Case::Snake),
                        target: naming::model_struct_name(&record.model_class).to_string(),
                        pivot: pivot_table(&design.table(), &table_of(&record)),
                    });
                }
                None => {
                    warn!(label = %list.label, module = %list.related_module, "related module not installed, skipping accessor");
                }
            }
        }

        let has_belongs_to = !belongs_to.is_empty();
        let has_belongs_to_many = !belongs_to_many.is_empty();
        Ok(ModelContext {
            module: design.name.clone(),
            struct_name: struct_name.to_string(),
            table: design.table(),
            columns,
            belongs_to,
            belongs_to_many,
            has_belongs_to,
            has_belongs_to_many,
            has_relations: has_belongs_to || has_belongs_to_many,
        })
    }
}

impl Default for ModelGenerator {
    fn default() -> Self {
        Self::new()
    }
}

fn rust_type(column_type: ColumnType, nullable: bool) -> String {
    let base = match column_type {
        ColumnType::Varchar(_) | ColumnType::Text => "String",
        ColumnType::Integer | ColumnType::BigInteger | ColumnType::BigIncrements => "i64",
        ColumnType::Decimal { .. } => "f64",
        ColumnType::Boolean => "bool",
        ColumnType::Date => "chrono::NaiveDate",
        ColumnType::Timestamp => "chrono::DateTime<chrono::Utc>",
    };
    if nullable {
        format!("Option<{base}>")
    } else {
        base.to_string()
    }
}

/// Pivot table of an n-n relation: both physical table names, sorted, joined.
fn pivot_table(left: &str, right: &str) -> String {
    let mut names = [left, right];
    names.sort_unstable();
    format!("{}_{}", names[0], names[1])
}

/// Physical table of an installed module, read from its stored configuration.
fn table_of(record: &ModuleRecord) -> String {
    let table = record
        .data
        .get("tableName")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| naming::default_table_name(&record.name));
    match record.data.get("tablePrefix").and_then(Value::as_str) {
        Some(prefix) => format!("{prefix}{table}"),
        None => table,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::MemoryFs;
    use crate::document::{BlockSpec, FieldSpec, ModuleConfig, RelatedListSpec, TabSpec};
    use crate::store::{MemoryStore, NewModule};

    async fn seed_author(metadata: &MemoryStore) {
        metadata
            .create_module(NewModule {
                name: "author".to_string(),
                icon: None,
                model_class: "app::models::Author".to_string(),
                data: serde_json::json!({ "tableName": "authors" }),
            })
            .await
            .unwrap();
    }

    fn book_design() -> ModuleDesign {
        let mut design = ModuleDesign::create(ModuleConfig::new("book")).unwrap();
        design.add_tab(TabSpec::default()).unwrap();
        design.add_block("tab.main", BlockSpec::default()).unwrap();

        let mut title = FieldSpec::new("title", "text");
        title.required = true;
        design.add_field("block.general", title).unwrap();

        let mut author = FieldSpec::new("author", "entity");
        author.data.set("module", "author");
        design.add_field("block.general", author).unwrap();
        design
    }

    #[tokio::test]
    async fn test_generated_model_has_columns_and_relations() {
        let metadata = MemoryStore::new();
        seed_author(&metadata).await;
        let files = MemoryFs::new();
        let generator = ModelGenerator::new();
        let registry = UitypeRegistry::with_defaults();

        let mut design = book_design();
        design
            .add_related_list(RelatedListSpec {
                label: Some("genres".to_string()),
                ..RelatedListSpec::new(RelatedListKind::ManyToMany, "author")
            })
            .unwrap();

        let artifact = generator
            .generate(&design, &registry, &metadata, &files)
            .await
            .unwrap();
        assert_eq!(artifact.path, "models/book.rs");
        assert_eq!(artifact.renamed_previous, None);

        let source = files.read("models/book.rs").unwrap().unwrap();
        assert!(source.contains("pub struct Book {"));
        assert!(source.contains("pub title: String,"));
        assert!(source.contains("pub author: Option<i64>,"));
        assert!(source.contains("const TABLE: &'static str = \"books\";"));
        assert!(source.contains("pub fn author(&self) -> BelongsTo<super::Author>"));
        assert!(source.contains("pub fn genres(&self) -> BelongsToMany<super::Author>"));
        assert!(source.contains("\"authors_books\""));
    }

    #[tokio::test]
    async fn test_unchanged_model_is_not_rewritten() {
        let metadata = MemoryStore::new();
        seed_author(&metadata).await;
        let files = MemoryFs::new();
        let generator = ModelGenerator::new();
        let registry = UitypeRegistry::with_defaults();
        let design = book_design();

        generator
            .generate(&design, &registry, &metadata, &files)
            .await
            .unwrap();
        let artifact = generator
            .generate(&design, &registry, &metadata, &files)
            .await
            .unwrap();

        assert_eq!(artifact.renamed_previous, None);
        assert!(!files.exists("models/book.rs.prev"));
    }

    #[tokio::test]
    async fn test_changed_model_preserves_previous_file() {
        let metadata = MemoryStore::new();
        seed_author(&metadata).await;
        let files = MemoryFs::new();
        let generator = ModelGenerator::new();
        let registry = UitypeRegistry::with_defaults();

        files.write("models/book.rs", "// hand edited\n").unwrap();

        let artifact = generator
            .generate(&book_design(), &registry, &metadata, &files)
            .await
            .unwrap();
        assert_eq!(artifact.renamed_previous.as_deref(), Some("models/book.rs.prev"));
        assert_eq!(
            files.read("models/book.rs.prev").unwrap().unwrap(),
            "// hand edited\n"
        );
        assert!(files
            .read("models/book.rs")
            .unwrap()
            .unwrap()
            .contains("pub struct Book {"));
    }

    #[tokio::test]
    async fn test_missing_referenced_module_skips_accessor() {
        let metadata = MemoryStore::new();
        let files = MemoryFs::new();
        let generator = ModelGenerator::new();
        let registry = UitypeRegistry::with_defaults();

        let artifact = generator
            .generate(&book_design(), &registry, &metadata, &files)
            .await
            .unwrap();
        let source = files.read(&artifact.path).unwrap().unwrap();
        // Column survives, accessor does not.
        assert!(source.contains("pub author: Option<i64>,"));
        assert!(!source.contains("BelongsTo<"));
    }
}
