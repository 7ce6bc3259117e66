//! Module installation
//!
//! Turns a design document into concrete state: metadata rows, the physical
//! table, filters, domain activation, translation files and the generated
//! model source. Installation is reconciliation, not creation. Elements that
//! carry an id are updated in place, elements without one are created and
//! their new ids are written back onto the document, and persisted rows the
//! document no longer mentions are retired. Running an install twice with an
//! unchanged document changes nothing.

pub mod diff;

pub use diff::{PersistedStructure, StructuralDiff};

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{info, warn};

use crate::artifacts::{translations, ArtifactFs, ModelGenerator};
use crate::document::{FieldDesign, ModuleDesign};
use crate::error::{DesignerResult, InstallError};
use crate::store::{
    BlockRecord, ColumnSpec, ColumnType, FieldRecord, MetadataStore, ModuleRecord, NewBlock,
    NewField, NewFilter, NewModule, NewRelatedList, NewTab, RelatedListRecord, SchemaEditor,
    TableSpec, TabRecord,
};
use crate::uitype::UitypeRegistry;

/// Name of the synthesized default list filter.
pub const DEFAULT_FILTER: &str = "filter.all";

// ============================================================================
// Table layout
// ============================================================================

/// Physical layout for a module table: surrogate key, one column per designed
/// field, then the bookkeeping columns every module table carries.
pub fn table_spec(design: &ModuleDesign, uitypes: &UitypeRegistry) -> DesignerResult<TableSpec> {
    let mut columns = vec![ColumnSpec::new("id", ColumnType::BigIncrements, false)];
    for field in design.all_fields() {
        // A field named id rides on the surrogate key instead of adding a column.
        if field.name == "id" {
            continue;
        }
        columns.push(field_column(design, field, uitypes)?);
    }
    columns.push(ColumnSpec::new("domain_id", ColumnType::BigInteger, false));
    columns.push(ColumnSpec::new("created_at", ColumnType::Timestamp, true));
    columns.push(ColumnSpec::new("updated_at", ColumnType::Timestamp, true));
    columns.push(ColumnSpec::new("deleted_at", ColumnType::Timestamp, true));
    Ok(TableSpec {
        name: design.table(),
        columns,
    })
}

fn field_column(
    design: &ModuleDesign,
    field: &FieldDesign,
    uitypes: &UitypeRegistry,
) -> DesignerResult<ColumnSpec> {
    let uitype = uitypes.get(&field.uitype).ok_or_else(|| InstallError::SchemaConflict {
        table: design.table(),
        column: field.name.clone(),
        message: format!("unknown uitype '{}'", field.uitype),
    })?;
    Ok(uitype.column_spec(field))
}

fn record_requires(data: &Value) -> bool {
    data.get("rules")
        .and_then(Value::as_str)
        .map(|rules| rules.split('|').any(|rule| rule.trim() == "required"))
        .unwrap_or(false)
}

// ============================================================================
// Report
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ElementChanges {
    pub created: usize,
    pub updated: usize,
    pub retired: usize,
}

/// What an install run actually did, for logging and for the session summary.
#[derive(Debug, Clone, Default)]
pub struct InstallReport {
    pub module: String,
    pub module_created: bool,
    pub tabs: ElementChanges,
    pub blocks: ElementChanges,
    pub fields: ElementChanges,
    pub related_lists: ElementChanges,
    pub table: String,
    pub table_created: bool,
    pub columns_added: Vec<String>,
    pub columns_relaxed: Vec<String>,
    pub filters_written: usize,
    pub domains_activated: usize,
    pub translation_files: Vec<String>,
    pub model_file: String,
    pub model_renamed_to: Option<String>,
}

impl InstallReport {
    fn new(module: String, table: String) -> Self {
        Self {
            module,
            table,
            ..Self::default()
        }
    }

    /// True when the run touched neither schema nor generated sources, the
    /// signature of a repeated install of an unchanged document.
    pub fn schema_unchanged(&self) -> bool {
        !self.table_created
            && self.columns_added.is_empty()
            && self.columns_relaxed.is_empty()
            && self.model_renamed_to.is_none()
    }
}

// ============================================================================
// Installer
// ============================================================================

pub struct Installer {
    metadata: Arc<dyn MetadataStore>,
    schema: Arc<dyn SchemaEditor>,
    files: Arc<dyn ArtifactFs>,
    uitypes: Arc<UitypeRegistry>,
    models: ModelGenerator,
}

impl Installer {
    pub fn new(
        metadata: Arc<dyn MetadataStore>,
        schema: Arc<dyn SchemaEditor>,
        files: Arc<dyn ArtifactFs>,
        uitypes: Arc<UitypeRegistry>,
    ) -> Self {
        Self {
            metadata,
            schema,
            files,
            uitypes,
            models: ModelGenerator::new(),
        }
    }

    /// Run the full installation. Newly created metadata ids are written back
    /// onto `design` as they are allocated, so a failed run leaves the
    /// document resumable rather than corrupted.
    pub async fn install(&self, design: &mut ModuleDesign) -> DesignerResult<InstallReport> {
        let table = design.table();
        info!(module = %design.name, table = %table, "installing module");

        // Validate every uitype up front so a bad document fails before any
        // row or column is touched.
        let spec = table_spec(design, self.uitypes.as_ref())?;

        let existing = self.metadata.find_module_by_name(&design.name).await?;
        let persisted = match existing {
            Some(record) => {
                let persisted = PersistedStructure::load(self.metadata.as_ref(), record).await?;
                self.check_uitype_conflicts(design, &persisted)?;
                Some(persisted)
            }
            None => None,
        };

        let mut report = InstallReport::new(design.name.clone(), table.clone());

        let module = self.upsert_module(design, &persisted, &mut report).await?;
        let obsolete_columns = self.retire_obsolete(design, &persisted, &mut report).await?;
        self.upsert_structure(design, module.id, &mut report).await?;
        self.reconcile_table(design, &persisted, &spec, &obsolete_columns, &mut report)
            .await?;
        self.write_filters(design, module.id, &mut report).await?;
        self.upsert_related_lists(design, module.id, &mut report).await?;
        self.activate_domains(module.id, &mut report).await?;

        report.translation_files = translations::write_merged(self.files.as_ref(), design)?;

        let artifact = self
            .models
            .generate(design, self.uitypes.as_ref(), self.metadata.as_ref(), self.files.as_ref())
            .await?;
        report.model_file = artifact.path;
        report.model_renamed_to = artifact.renamed_previous;

        info!(
            module = %report.module,
            created = report.module_created,
            fields_created = report.fields.created,
            fields_retired = report.fields.retired,
            "module installed"
        );
        Ok(report)
    }

    fn check_uitype_conflicts(
        &self,
        design: &ModuleDesign,
        persisted: &PersistedStructure,
    ) -> DesignerResult<()> {
        for field in design.all_fields() {
            if let Some(id) = field.id {
                if let Some(existing) = persisted.field_by_id(id) {
                    if existing.uitype != field.uitype {
                        return Err(InstallError::SchemaConflict {
                            table: design.table(),
                            column: field.name.clone(),
                            message: format!(
                                "uitype cannot change from '{}' to '{}' once installed",
                                existing.uitype, field.uitype
                            ),
                        }
                        .into());
                    }
                }
            }
        }
        Ok(())
    }

    async fn upsert_module(
        &self,
        design: &ModuleDesign,
        persisted: &Option<PersistedStructure>,
        report: &mut InstallReport,
    ) -> DesignerResult<ModuleRecord> {
        match persisted {
            Some(persisted) => {
                let mut record = persisted.module.clone();
                record.icon = design.icon.clone();
                record.model_class = design.model_class.clone();
                record.data = design.module_data()?;
                self.metadata.update_module(&record).await?;
                Ok(record)
            }
            None => {
                let record = self
                    .metadata
                    .create_module(NewModule {
                        name: design.name.clone(),
                        icon: design.icon.clone(),
                        model_class: design.model_class.clone(),
                        data: design.module_data()?,
                    })
                    .await?;
                report.module_created = true;
                Ok(record)
            }
        }
    }

    /// Delete persisted rows the document dropped. Returns the retired field
    /// names so their columns can be relaxed once the table step runs.
    async fn retire_obsolete(
        &self,
        design: &ModuleDesign,
        persisted: &Option<PersistedStructure>,
        report: &mut InstallReport,
    ) -> DesignerResult<Vec<String>> {
        let persisted = match persisted {
            Some(persisted) => persisted,
            None => return Ok(Vec::new()),
        };
        let diff = StructuralDiff::compute(persisted, design);
        if diff.is_empty() {
            return Ok(Vec::new());
        }

        for list in &diff.obsolete_related_lists {
            self.metadata.delete_related_list(list.id).await?;
        }
        for field in &diff.obsolete_fields {
            info!(field = %field.name, "retiring field, its column stays behind as nullable");
            self.metadata.delete_field(field.id).await?;
        }
        for block in &diff.obsolete_blocks {
            self.metadata.delete_block(block.id).await?;
        }
        for tab in &diff.obsolete_tabs {
            self.metadata.delete_tab(tab.id).await?;
        }

        report.related_lists.retired = diff.obsolete_related_lists.len();
        report.fields.retired = diff.obsolete_fields.len();
        report.blocks.retired = diff.obsolete_blocks.len();
        report.tabs.retired = diff.obsolete_tabs.len();

        Ok(diff
            .obsolete_fields
            .iter()
            .map(|field| field.name.clone())
            .collect())
    }

    async fn upsert_structure(
        &self,
        design: &mut ModuleDesign,
        module_id: i64,
        report: &mut InstallReport,
    ) -> DesignerResult<()> {
        for tab in &mut design.tabs {
            let tab_id = match tab.id {
                Some(id) => {
                    self.metadata
                        .update_tab(&TabRecord {
                            id,
                            module_id,
                            label: tab.label.clone(),
                            icon: tab.icon.clone(),
                            sequence: tab.sequence,
                            data: tab.data.as_value(),
                        })
                        .await?;
                    report.tabs.updated += 1;
                    id
                }
                None => {
                    let record = self
                        .metadata
                        .create_tab(NewTab {
                            module_id,
                            label: tab.label.clone(),
                            icon: tab.icon.clone(),
                            sequence: tab.sequence,
                            data: tab.data.as_value(),
                        })
                        .await?;
                    tab.id = Some(record.id);
                    report.tabs.created += 1;
                    record.id
                }
            };

            for block in &mut tab.blocks {
                let block_id = match block.id {
                    Some(id) => {
                        self.metadata
                            .update_block(&BlockRecord {
                                id,
                                module_id,
                                tab_id,
                                label: block.label.clone(),
                                icon: block.icon.clone(),
                                sequence: block.sequence,
                                data: block.data.as_value(),
                            })
                            .await?;
                        report.blocks.updated += 1;
                        id
                    }
                    None => {
                        let record = self
                            .metadata
                            .create_block(NewBlock {
                                module_id,
                                tab_id,
                                label: block.label.clone(),
                                icon: block.icon.clone(),
                                sequence: block.sequence,
                                data: block.data.as_value(),
                            })
                            .await?;
                        block.id = Some(record.id);
                        report.blocks.created += 1;
                        record.id
                    }
                };

                for field in &mut block.fields {
                    match field.id {
                        Some(id) => {
                            self.metadata
                                .update_field(&FieldRecord {
                                    id,
                                    module_id,
                                    block_id,
                                    name: field.name.clone(),
                                    uitype: field.uitype.clone(),
                                    displaytype: field.displaytype.clone(),
                                    sequence: field.sequence,
                                    data: field.data.as_value(),
                                })
                                .await?;
                            report.fields.updated += 1;
                        }
                        None => {
                            let record = self
                                .metadata
                                .create_field(NewField {
                                    module_id,
                                    block_id,
                                    name: field.name.clone(),
                                    uitype: field.uitype.clone(),
                                    displaytype: field.displaytype.clone(),
                                    sequence: field.sequence,
                                    data: field.data.as_value(),
                                })
                                .await?;
                            field.id = Some(record.id);
                            report.fields.created += 1;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    async fn reconcile_table(
        &self,
        design: &ModuleDesign,
        persisted: &Option<PersistedStructure>,
        spec: &TableSpec,
        obsolete_columns: &[String],
        report: &mut InstallReport,
    ) -> DesignerResult<()> {
        if !self.schema.table_exists(&spec.name).await? {
            self.schema.create_table(spec).await?;
            report.table_created = true;
            return Ok(());
        }

        for field in design.all_fields() {
            if field.name == "id" {
                continue;
            }
            let column = field_column(design, field, self.uitypes.as_ref())?;
            if !self.schema.column_exists(&spec.name, &column.name).await? {
                self.schema.add_column(&spec.name, &column).await?;
                report.columns_added.push(column.name.clone());
            } else if column.nullable {
                // Loosen NOT NULL when a previously required field became
                // optional. Tightening is not attempted: existing rows may
                // hold nulls.
                let was_required = field
                    .id
                    .and_then(|id| persisted.as_ref().and_then(|p| p.field_by_id(id)))
                    .map(|record| record_requires(&record.data))
                    .unwrap_or(false);
                if was_required {
                    self.schema.alter_column_nullable(&spec.name, &column.name).await?;
                    report.columns_relaxed.push(column.name.clone());
                }
            }
        }

        for name in obsolete_columns {
            if self.schema.column_exists(&spec.name, name).await? {
                self.schema.alter_column_nullable(&spec.name, name).await?;
                report.columns_relaxed.push(name.clone());
            }
        }
        Ok(())
    }

    async fn write_filters(
        &self,
        design: &ModuleDesign,
        module_id: i64,
        report: &mut InstallReport,
    ) -> DesignerResult<()> {
        let columns: Vec<String> = design
            .all_fields()
            .filter(|field| field.display_in_filter)
            .map(|field| field.name.clone())
            .collect();
        if !columns.is_empty() {
            self.upsert_filter(module_id, DEFAULT_FILTER, columns, true, json!({"readonly": true}))
                .await?;
            report.filters_written += 1;
        }

        for filter in &design.filters {
            let name = if filter.name.starts_with("filter.") {
                filter.name.clone()
            } else {
                format!("filter.{}", filter.name)
            };
            self.upsert_filter(module_id, &name, filter.columns.clone(), false, filter.data.as_value())
                .await?;
            report.filters_written += 1;
        }
        Ok(())
    }

    async fn upsert_filter(
        &self,
        module_id: i64,
        name: &str,
        columns: Vec<String>,
        is_default: bool,
        data: Value,
    ) -> DesignerResult<()> {
        match self.metadata.find_filter(module_id, name).await? {
            Some(mut record) => {
                record.columns = columns;
                record.is_default = is_default;
                record.is_public = false;
                record.data = data;
                self.metadata.update_filter(&record).await?;
            }
            None => {
                self.metadata
                    .create_filter(NewFilter {
                        module_id,
                        domain_id: None,
                        name: name.to_string(),
                        filter_type: "list".to_string(),
                        columns,
                        is_default,
                        is_public: false,
                        data,
                    })
                    .await?;
            }
        }
        Ok(())
    }

    async fn upsert_related_lists(
        &self,
        design: &mut ModuleDesign,
        module_id: i64,
        report: &mut InstallReport,
    ) -> DesignerResult<()> {
        for list in &mut design.related_lists {
            let related = self
                .metadata
                .find_module_by_name(&list.related_module)
                .await?
                .ok_or_else(|| InstallError::UnknownModule {
                    module: list.related_module.clone(),
                })?;

            let related_field_id = match &list.related_field {
                Some(field_name) => {
                    let field = self
                        .metadata
                        .find_field(related.id, field_name)
                        .await?
                        .ok_or_else(|| InstallError::UnknownField {
                            module: list.related_module.clone(),
                            field: field_name.clone(),
                        })?;
                    Some(field.id)
                }
                None => None,
            };

            let tab_id = match &list.tab {
                Some(label) => {
                    let id = design
                        .tabs
                        .iter()
                        .find(|tab| &tab.label == label)
                        .and_then(|tab| tab.id);
                    if id.is_none() {
                        warn!(label = %label, "related list names a tab that no longer exists, leaving it unattached");
                    }
                    id
                }
                None => None,
            };

            match self
                .metadata
                .find_related_list(module_id, related.id, &list.label)
                .await?
            {
                Some(existing) => {
                    self.metadata
                        .update_related_list(&RelatedListRecord {
                            id: existing.id,
                            module_id,
                            related_module_id: related.id,
                            related_field_id,
                            tab_id,
                            label: list.label.clone(),
                            icon: list.icon.clone(),
                            kind: list.kind.to_string(),
                            method: list.method.clone(),
                            sequence: list.sequence,
                            data: list.data.as_value(),
                        })
                        .await?;
                    list.id = Some(existing.id);
                    report.related_lists.updated += 1;
                }
                None => {
                    let record = self
                        .metadata
                        .create_related_list(NewRelatedList {
                            module_id,
                            related_module_id: related.id,
                            related_field_id,
                            tab_id,
                            label: list.label.clone(),
                            icon: list.icon.clone(),
                            kind: list.kind.to_string(),
                            method: list.method.clone(),
                            sequence: list.sequence,
                            data: list.data.as_value(),
                        })
                        .await?;
                    list.id = Some(record.id);
                    report.related_lists.created += 1;
                }
            }
        }
        Ok(())
    }

    async fn activate_domains(&self, module_id: i64, report: &mut InstallReport) -> DesignerResult<()> {
        let domains = self.metadata.list_domains().await?;
        self.metadata.detach_module_from_domains(module_id).await?;
        for domain in &domains {
            self.metadata.attach_module_to_domain(domain.id, module_id).await?;
        }
        report.domains_activated = domains.len();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{BlockSpec, FieldSpec, ModuleConfig, TabSpec};

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
    fn test_table_spec_layout() {
        let design = book_type_design();
        let spec = table_spec(&design, &UitypeRegistry::with_defaults()).unwrap();

        assert_eq!(spec.name, "book_types");
        let names: Vec<&str> = spec.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["id", "title", "price", "domain_id", "created_at", "updated_at", "deleted_at"]
        );

        let title = &spec.columns[1];
        assert_eq!(title.column_type, ColumnType::Varchar(255));
        assert!(!title.nullable);
        let price = &spec.columns[2];
        assert_eq!(price.column_type, ColumnType::Integer);
        assert!(price.nullable);
    }

    #[test]
    fn test_unknown_uitype_is_a_schema_conflict() {
        let mut design = book_type_design();
        design
            .add_field("block.general", FieldSpec::new("mystery", "hologram"))
            .unwrap();

        let err = table_spec(&design, &UitypeRegistry::with_defaults()).unwrap_err();
        assert!(err.to_string().contains("hologram"));
    }

    #[test]
    fn test_record_requires_reads_pipe_separated_rules() {
        assert!(record_requires(&json!({"rules": "required|max:255"})));
        assert!(!record_requires(&json!({"rules": "max:255"})));
        assert!(!record_requires(&json!({})));
    }
}
