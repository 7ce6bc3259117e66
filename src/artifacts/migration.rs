//! Migration scaffolds
//!
//! For teams that prefer versioned migrations over a direct install, the
//! session can emit a timestamped script encoding the same construction
//! calls the installer would perform: module row, tabs, blocks, fields,
//! physical table, filters and related lists as literal statements.

use chrono::{DateTime, Utc};
use handlebars::Handlebars;
use serde_json::json;

use crate::document::{DataBag, ModuleDesign};
use crate::error::{DesignerError, DesignerResult};
use crate::install::table_spec;
use crate::store::{ColumnSpec, ColumnType};
use crate::uitype::UitypeRegistry;

use super::ArtifactFs;

const MIGRATION_TEMPLATE: &str = r#"//! Creates the {{module}} module: metadata rows, physical table and filters.

use module_designer::error::DesignerResult;
use module_designer::store::{
    ColumnSpec, ColumnType, MetadataStore, NewBlock, NewField, NewFilter, NewModule,
    NewRelatedList, NewTab, SchemaEditor, TableSpec,
};

pub async fn up(store: &dyn MetadataStore, schema: &dyn SchemaEditor) -> DesignerResult<()> {
{{statements}}

    Ok(())
}
"#;

#[derive(Debug, Clone, PartialEq)]
pub struct MigrationArtifact {
    pub path: String,
}

pub struct MigrationGenerator {
    handlebars: Handlebars<'static>,
}

impl MigrationGenerator {
    pub fn new() -> Self {
        let mut handlebars = Handlebars::new();
        handlebars.register_escape_fn(handlebars::no_escape);
        Self { handlebars }
    }

    /// Render and write the scaffold. `now` feeds the timestamped filename.
    pub fn generate(
        &self,
        design: &ModuleDesign,
        uitypes: &UitypeRegistry,
        files: &dyn ArtifactFs,
        now: DateTime<Utc>,
    ) -> DesignerResult<MigrationArtifact> {
        let statements = build_statements(design, uitypes)?;
        let context = json!({
            "module": design.name,
            "statements": statements,
        });
        let rendered = self
            .handlebars
            .render_template(MIGRATION_TEMPLATE, &context)
            .map_err(|e| DesignerError::template(e.to_string()))?;

        let path = format!(
            "migrations/{}_create_{}_module.rs",
            now.format("%Y_%m_%d_%H%M%S"),
            design.name.replace('-', "_")
        );
        files.write(&path, &rendered)?;
        Ok(MigrationArtifact { path })
    }
}

impl Default for MigrationGenerator {
    fn default() -> Self {
        Self::new()
    }
}

fn opt_string(value: &Option<String>) -> String {
    match value {
        Some(value) => format!("Some({value:?}.to_string())"),
        None => "None".to_string(),
    }
}

fn bag_literal(data: &DataBag) -> DesignerResult<String> {
    Ok(format!(
        "serde_json::json!({})",
        serde_json::to_string(&data.as_value())?
    ))
}

fn column_type_literal(column_type: ColumnType) -> String {
    match column_type {
        ColumnType::BigIncrements => "ColumnType::BigIncrements".to_string(),
        ColumnType::BigInteger => "ColumnType::BigInteger".to_string(),
        ColumnType::Integer => "ColumnType::Integer".to_string(),
        ColumnType::Varchar(length) => format!("ColumnType::Varchar({length})"),
        ColumnType::Text => "ColumnType::Text".to_string(),
        ColumnType::Decimal { precision, scale } => {
            format!("ColumnType::Decimal {{ precision: {precision}, scale: {scale} }}")
        }
        ColumnType::Boolean => "ColumnType::Boolean".to_string(),
        ColumnType::Date => "ColumnType::Date".to_string(),
        ColumnType::Timestamp => "ColumnType::Timestamp".to_string(),
    }
}

fn column_literal(column: &ColumnSpec) -> String {
    format!(
        "ColumnSpec::new({:?}, {}, {})",
        column.name,
        column_type_literal(column.column_type),
        column.nullable
    )
}

fn build_statements(design: &ModuleDesign, uitypes: &UitypeRegistry) -> DesignerResult<String> {
    let mut statements: Vec<String> = Vec::new();

    let module_data = serde_json::to_string(&design.module_data()?)?;
    statements.push(format!(
        "    let module = store\n        .create_module(NewModule {{\n            name: {:?}.to_string(),\n            icon: {},\n            model_class: {:?}.to_string(),\n            data: serde_json::json!({}),\n        }})\n        .await?;",
        design.name,
        opt_string(&design.icon),
        design.model_class,
        module_data,
    ));

    let mut tab_vars: Vec<(String, String)> = Vec::new();
    let mut block_index = 0usize;
    for (tab_index, tab) in design.tabs.iter().enumerate() {
        let tab_var = format!("tab_{}", tab_index + 1);
        statements.push(format!(
            "    let {tab_var} = store\n        .create_tab(NewTab {{\n            module_id: module.id,\n            label: {:?}.to_string(),\n            icon: {},\n            sequence: {},\n            data: {},\n        }})\n        .await?;",
            tab.label,
            opt_string(&tab.icon),
            tab.sequence,
            bag_literal(&tab.data)?,
        ));
        tab_vars.push((tab.label.clone(), tab_var.clone()));

        for block in &tab.blocks {
            block_index += 1;
            let block_var = format!("block_{block_index}");
            statements.push(format!(
                "    let {block_var} = store\n        .create_block(NewBlock {{\n            module_id: module.id,\n            tab_id: {tab_var}.id,\n            label: {:?}.to_string(),\n            icon: {},\n            sequence: {},\n            data: {},\n        }})\n        .await?;",
                block.label,
                opt_string(&block.icon),
                block.sequence,
                bag_literal(&block.data)?,
            ));

            for field in &block.fields {
                statements.push(format!(
                    "    store\n        .create_field(NewField {{\n            module_id: module.id,\n            block_id: {block_var}.id,\n            name: {:?}.to_string(),\n            uitype: {:?}.to_string(),\n            displaytype: {:?}.to_string(),\n            sequence: {},\n            data: {},\n        }})\n        .await?;",
                    field.name,
                    field.uitype,
                    field.displaytype,
                    field.sequence,
                    bag_literal(&field.data)?,
                ));
            }
        }
    }

    let table = table_spec(design, uitypes)?;
    let columns: Vec<String> = table
        .columns
        .iter()
        .map(|column| format!("                {},", column_literal(column)))
        .collect();
    statements.push(format!(
        "    schema\n        .create_table(&TableSpec {{\n            name: {:?}.to_string(),\n            columns: vec![\n{}\n            ],\n        }})\n        .await?;",
        table.name,
        columns.join("\n"),
    ));

    let filter_columns: Vec<String> = design
        .all_fields()
        .filter(|field| field.display_in_filter)
        .map(|field| field.name.clone())
        .collect();
    if !filter_columns.is_empty() {
        let columns: Vec<String> = filter_columns
            .iter()
            .map(|name| format!("{name:?}.to_string()"))
            .collect();
        statements.push(format!(
            "    store\n        .create_filter(NewFilter {{\n            module_id: module.id,\n            domain_id: None,\n            name: \"filter.all\".to_string(),\n            filter_type: \"list\".to_string(),\n            columns: vec![{}],\n            is_default: true,\n            is_public: false,\n            data: serde_json::json!({{\"readonly\": true}}),\n        }})\n        .await?;",
            columns.join(", "),
        ));
    }

    for filter in &design.filters {
        let columns: Vec<String> = filter
            .columns
            .iter()
            .map(|name| format!("{name:?}.to_string()"))
            .collect();
        let name = if filter.name.starts_with("filter.") {
            filter.name.clone()
        } else {
            format!("filter.{}", filter.name)
        };
        statements.push(format!(
            "    store\n        .create_filter(NewFilter {{\n            module_id: module.id,\n            domain_id: None,\n            name: {:?}.to_string(),\n            filter_type: \"list\".to_string(),\n            columns: vec![{}],\n            is_default: false,\n            is_public: false,\n            data: {},\n        }})\n        .await?;",
            name,
            columns.join(", "),
            bag_literal(&filter.data)?,
        ));
    }

    for (list_index, list) in design.related_lists.iter().enumerate() {
        let related_var = format!("related_{}", list_index + 1);
        statements.push(format!(
            "    let {related_var} = store\n        .find_module_by_name({:?})\n        .await?\n        .expect(\"module '{}' must be installed first\");",
            list.related_module, list.related_module,
        ));

        let related_field_id = match &list.related_field {
            Some(field) => {
                let field_var = format!("related_field_{}", list_index + 1);
                statements.push(format!(
                    "    let {field_var} = store\n        .find_field({related_var}.id, {:?})\n        .await?\n        .expect(\"field '{}' must exist in module '{}'\");",
                    field, field, list.related_module,
                ));
                format!("Some({field_var}.id)")
            }
            None => "None".to_string(),
        };

        let tab_id = list
            .tab
            .as_ref()
            .and_then(|label| {
                tab_vars
                    .iter()
                    .find(|(tab_label, _)| tab_label == label)
                    .map(|(_, var)| format!("Some({var}.id)"))
            })
            .unwrap_or_else(|| "None".to_string());

        statements.push(format!(
            "    store\n        .create_related_list(NewRelatedList {{\n            module_id: module.id,\n            related_module_id: {related_var}.id,\n            related_field_id: {related_field_id},\n            tab_id: {tab_id},\n            label: {:?}.to_string(),\n            icon: {},\n            kind: {:?}.to_string(),\n            method: {:?}.to_string(),\n            sequence: {},\n            data: {},\n        }})\n        .await?;",
            list.label,
            opt_string(&list.icon),
            list.kind.to_string(),
            list.method,
            list.sequence,
            bag_literal(&list.data)?,
        ));
    }

    Ok(statements.join("\n\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::MemoryFs;
    use crate::document::{BlockSpec, FieldSpec, ModuleConfig, TabSpec};
    use chrono::TimeZone;

    fn book_type_design() -> ModuleDesign {
        let mut design = ModuleDesign::create(ModuleConfig::new("book-type")).unwrap();
        design.add_tab(TabSpec::default()).unwrap();
        design.add_block("tab.main", BlockSpec::default()).unwrap();

        let mut title = FieldSpec::new("title", "text");
        title.required = true;
        design.add_field("block.general", title).unwrap();
        design
            .add_field("block.general", FieldSpec::new("price", "number"))
            .unwrap();
        design
    }

    #[test]
    fn test_scaffold_path_is_timestamped() {
        let files = MemoryFs::new();
        let generator = MigrationGenerator::new();
        let registry = UitypeRegistry::with_defaults();
        let now = Utc.with_ymd_and_hms(2026, 3, 14, 9, 30, 0).unwrap();

        let artifact = generator
            .generate(&book_type_design(), &registry, &files, now)
            .unwrap();
        assert_eq!(
            artifact.path,
            "migrations/2026_03_14_093000_create_book_type_module.rs"
        );
        assert!(files.exists(&artifact.path));
    }

    #[test]
    fn test_scaffold_encodes_construction_calls() {
        let files = MemoryFs::new();
        let generator = MigrationGenerator::new();
        let registry = UitypeRegistry::with_defaults();
        let now = Utc.with_ymd_and_hms(2026, 3, 14, 9, 30, 0).unwrap();

        let artifact = generator
            .generate(&book_type_design(), &registry, &files, now)
            .unwrap();
        let source = files.read(&artifact.path).unwrap().unwrap();

        assert!(source.contains("create_module(NewModule {"));
        assert!(source.contains("name: \"book-type\".to_string(),"));
        assert!(source.contains("label: \"tab.main\".to_string(),"));
        assert!(source.contains("label: \"block.general\".to_string(),"));
        assert!(source.contains("name: \"title\".to_string(),"));
        // Non-required fields come out as nullable columns.
        assert!(source.contains("ColumnSpec::new(\"price\", ColumnType::Integer, true)"));
        assert!(source.contains("ColumnSpec::new(\"title\", ColumnType::Varchar(255), false)"));
        assert!(source.contains("name: \"filter.all\".to_string(),"));
        assert!(source.contains("pub async fn up("));
    }
}
