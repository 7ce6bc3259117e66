//! Installer Reconciliation Tests
//!
//! Exercises the id-based diff between a design document and storage:
//! 1. Re-installing an unchanged document changes nothing
//! 2. Renamed elements are updated in place, never re-created
//! 3. Retired fields keep their column, relaxed to nullable
//! 4. Loosened rules relax the column in step
//! 5. Broken references abort before metadata is touched
//! 6. An installed module exports back into an editable document
//!
//! Run with: cargo test --test installer_reconciliation

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{Map, Value};

use module_designer::artifacts::{ArtifactFs, MemoryFs};
use module_designer::document::{
    BlockSpec, DataBag, ElementKind, FieldSpec, FilterDesign, ModuleConfig, ModuleDesign,
    RelatedListKind, RelatedListSpec, TabSpec,
};
use module_designer::session::design_from_installed;
use module_designer::store::{ColumnType, MemoryStore, MetadataStore, ModuleRecord};
use module_designer::{Installer, UitypeRegistry};

/// Test helper: a book module with a required title and an optional price.
fn book_design() -> ModuleDesign {
    let mut design = ModuleDesign::create(ModuleConfig::new("book")).unwrap();
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

/// Test helper: an author module carrying the back-reference used by the
/// related list tests.
fn author_design() -> ModuleDesign {
    let mut design = ModuleDesign::create(ModuleConfig::new("author")).unwrap();
    design.add_tab(TabSpec::default()).unwrap();
    design.add_block("tab.main", BlockSpec::default()).unwrap();
    design
        .add_field("block.general", FieldSpec::new("name", "text"))
        .unwrap();
    design
        .add_field("block.general", FieldSpec::new("book_id", "number"))
        .unwrap();
    design
}

/// Test helper wiring an installer to the in-memory backends.
fn installer(store: &Arc<MemoryStore>, files: &Arc<MemoryFs>) -> Installer {
    Installer::new(
        store.clone(),
        store.clone(),
        files.clone(),
        Arc::new(UitypeRegistry::with_defaults()),
    )
}

async fn installed_module(store: &MemoryStore, name: &str) -> ModuleRecord {
    store
        .find_module_by_name(name)
        .await
        .unwrap()
        .unwrap_or_else(|| panic!("module '{name}' should be installed"))
}

#[tokio::test]
async fn test_reinstalling_unchanged_document_changes_nothing() {
    let store = Arc::new(MemoryStore::new());
    let files = Arc::new(MemoryFs::new());
    store.add_domain("core").await;
    let installer = installer(&store, &files);
    let mut design = book_design();

    let first = installer.install(&mut design).await.unwrap();
    assert!(first.module_created);
    assert!(first.table_created);
    assert_eq!(first.fields.created, 2);
    let lang_before = files.read("lang/en/book.json").unwrap().unwrap();

    let second = installer.install(&mut design).await.unwrap();
    assert!(!second.module_created);
    assert!(second.schema_unchanged());
    assert_eq!(second.tabs.created, 0);
    assert_eq!(second.tabs.updated, 1);
    assert_eq!(second.fields.created, 0);
    assert_eq!(second.fields.updated, 2);
    assert_eq!(second.fields.retired, 0);
    assert_eq!(second.model_renamed_to, None);

    let module = installed_module(&store, "book").await;
    assert_eq!(store.fields_for_module(module.id).await.unwrap().len(), 2);
    assert_eq!(files.read("lang/en/book.json").unwrap().unwrap(), lang_before);
    assert!(!files.exists("models/book.rs.prev"));
}

#[tokio::test]
async fn test_renamed_tab_is_updated_in_place() {
    let store = Arc::new(MemoryStore::new());
    let files = Arc::new(MemoryFs::new());
    let installer = installer(&store, &files);
    let mut design = book_design();
    installer.install(&mut design).await.unwrap();
    let tab_id = design.tabs[0].id.expect("tab id captured");

    design.tabs[0].label = "tab.details".to_string();
    design.set_translation("tab.details", "Details");
    let report = installer.install(&mut design).await.unwrap();
    assert_eq!(report.tabs.created, 0);
    assert_eq!(report.tabs.updated, 1);
    assert_eq!(report.tabs.retired, 0);

    let module = installed_module(&store, "book").await;
    let tabs = store.tabs_for_module(module.id).await.unwrap();
    assert_eq!(tabs.len(), 1);
    assert_eq!(tabs[0].id, tab_id);
    assert_eq!(tabs[0].label, "tab.details");
}

#[tokio::test]
async fn test_retired_field_keeps_its_column_and_data() {
    let store = Arc::new(MemoryStore::new());
    let files = Arc::new(MemoryFs::new());
    let installer = installer(&store, &files);
    let mut design = book_design();
    let mut isbn = FieldSpec::new("isbn", "text");
    isbn.required = true;
    design.add_field("block.general", isbn).unwrap();
    installer.install(&mut design).await.unwrap();
    assert!(!store.column("books", "isbn").await.unwrap().nullable);

    let mut row = Map::new();
    row.insert("title".to_string(), Value::from("Dune"));
    row.insert("isbn".to_string(), Value::from("978-0441172719"));
    store.insert_row("books", row).await;

    design.delete_element(ElementKind::Field, "isbn").unwrap();
    let report = installer.install(&mut design).await.unwrap();
    assert_eq!(report.fields.retired, 1);
    assert_eq!(report.columns_relaxed, ["isbn"]);

    // The metadata row is gone, the column and its data are not.
    let module = installed_module(&store, "book").await;
    let fields = store.fields_for_module(module.id).await.unwrap();
    assert!(fields.iter().all(|field| field.name != "isbn"));
    assert!(store.column("books", "isbn").await.unwrap().nullable);
    let rows = store.rows("books").await;
    assert_eq!(rows[0].get("isbn"), Some(&Value::from("978-0441172719")));

    // The deletion also cleans the translation file.
    let lang: BTreeMap<String, String> =
        serde_json::from_str(&files.read("lang/en/book.json").unwrap().unwrap()).unwrap();
    assert!(!lang.contains_key("field.isbn"));
    assert!(lang.contains_key("field.title"));
}

#[tokio::test]
async fn test_required_field_turned_optional_relaxes_column() {
    let store = Arc::new(MemoryStore::new());
    let files = Arc::new(MemoryFs::new());
    let installer = installer(&store, &files);
    let mut design = book_design();
    installer.install(&mut design).await.unwrap();
    assert!(!store.column("books", "title").await.unwrap().nullable);

    design.tabs[0].blocks[0].fields[0].data.0.remove("rules");
    let report = installer.install(&mut design).await.unwrap();
    assert_eq!(report.columns_relaxed, ["title"]);
    assert!(store.column("books", "title").await.unwrap().nullable);

    // Settled after the change: a third run is clean again.
    let third = installer.install(&mut design).await.unwrap();
    assert!(third.schema_unchanged());
}

#[tokio::test]
async fn test_added_field_appends_column_and_regenerates_model() {
    let store = Arc::new(MemoryStore::new());
    let files = Arc::new(MemoryFs::new());
    let installer = installer(&store, &files);
    let mut design = book_design();
    installer.install(&mut design).await.unwrap();

    design
        .add_field("block.general", FieldSpec::new("summary", "textarea"))
        .unwrap();
    let report = installer.install(&mut design).await.unwrap();
    assert_eq!(report.fields.created, 1);
    assert_eq!(report.columns_added, ["summary"]);
    assert_eq!(report.model_renamed_to.as_deref(), Some("models/book.rs.prev"));

    let summary = store.column("books", "summary").await.unwrap();
    assert!(summary.nullable);
    assert_eq!(summary.column_type, ColumnType::Text);
    assert!(files
        .read("models/book.rs")
        .unwrap()
        .unwrap()
        .contains("pub summary: Option<String>,"));
}

#[tokio::test]
async fn test_changing_a_uitype_is_refused() {
    let store = Arc::new(MemoryStore::new());
    let files = Arc::new(MemoryFs::new());
    let installer = installer(&store, &files);
    let mut design = book_design();
    installer.install(&mut design).await.unwrap();

    design.tabs[0].blocks[0].fields[0].uitype = "textarea".to_string();
    let err = installer.install(&mut design).await.unwrap_err();
    assert!(err.to_string().contains("uitype cannot change"));

    // Refused before anything was written.
    let module = installed_module(&store, "book").await;
    let fields = store.fields_for_module(module.id).await.unwrap();
    let title = fields.iter().find(|field| field.name == "title").unwrap();
    assert_eq!(title.uitype, "text");
}

#[tokio::test]
async fn test_unknown_related_module_aborts() {
    let store = Arc::new(MemoryStore::new());
    let files = Arc::new(MemoryFs::new());
    let installer = installer(&store, &files);
    let mut design = book_design();
    design
        .add_related_list(RelatedListSpec::new(RelatedListKind::ManyToOne, "authors"))
        .unwrap();

    let err = installer.install(&mut design).await.unwrap_err();
    assert!(err
        .to_string()
        .contains("Related module 'authors' does not exist"));
}

#[tokio::test]
async fn test_unknown_related_field_aborts() {
    let store = Arc::new(MemoryStore::new());
    let files = Arc::new(MemoryFs::new());
    let installer = installer(&store, &files);
    installer.install(&mut author_design()).await.unwrap();

    let mut design = book_design();
    let mut list = RelatedListSpec::new(RelatedListKind::ManyToOne, "author");
    list.related_field = Some("missing_field".to_string());
    design.add_related_list(list).unwrap();

    let err = installer.install(&mut design).await.unwrap_err();
    assert!(err.to_string().contains("Field 'missing_field' does not exist"));
}

#[tokio::test]
async fn test_filters_follow_the_designed_columns() {
    let store = Arc::new(MemoryStore::new());
    let files = Arc::new(MemoryFs::new());
    let installer = installer(&store, &files);

    // No field opted into the filter, so no default filter is written.
    let mut hidden = ModuleDesign::create(ModuleConfig::new("secret")).unwrap();
    hidden.add_tab(TabSpec::default()).unwrap();
    hidden.add_block("tab.main", BlockSpec::default()).unwrap();
    let mut code = FieldSpec::new("code", "text");
    code.display_in_filter = false;
    hidden.add_field("block.general", code).unwrap();
    let report = installer.install(&mut hidden).await.unwrap();
    assert_eq!(report.filters_written, 0);
    let module = installed_module(&store, "secret").await;
    assert!(store
        .find_filter(module.id, "filter.all")
        .await
        .unwrap()
        .is_none());

    // Extra filters land under the filter. prefix, never as the default.
    let mut design = book_design();
    design.filters.push(FilterDesign {
        name: "recent".to_string(),
        columns: vec!["title".to_string()],
        data: DataBag::new(),
    });
    let report = installer.install(&mut design).await.unwrap();
    assert_eq!(report.filters_written, 2);
    let module = installed_module(&store, "book").await;
    let all = store
        .find_filter(module.id, "filter.all")
        .await
        .unwrap()
        .expect("default filter");
    assert!(all.is_default);
    assert_eq!(all.columns, ["title", "price"]);
    let recent = store
        .find_filter(module.id, "filter.recent")
        .await
        .unwrap()
        .expect("named filter");
    assert!(!recent.is_default);
    assert_eq!(recent.columns, ["title"]);
}

#[tokio::test]
async fn test_domains_reattached_on_each_install() {
    let store = Arc::new(MemoryStore::new());
    let files = Arc::new(MemoryFs::new());
    let installer = installer(&store, &files);
    let core = store.add_domain("core").await;

    let mut design = book_design();
    installer.install(&mut design).await.unwrap();
    let module = installed_module(&store, "book").await;
    assert_eq!(store.attachments().await, vec![(core.id, module.id)]);

    // A domain added later picks the module up on the next install.
    let emea = store.add_domain("emea").await;
    let report = installer.install(&mut design).await.unwrap();
    assert_eq!(report.domains_activated, 2);
    assert_eq!(
        store.attachments().await,
        vec![(core.id, module.id), (emea.id, module.id)]
    );
}

#[tokio::test]
async fn test_installed_module_exports_back_into_a_document() {
    let store = Arc::new(MemoryStore::new());
    let files = Arc::new(MemoryFs::new());
    let installer = installer(&store, &files);
    installer.install(&mut author_design()).await.unwrap();

    let mut design = book_design();
    let mut list = RelatedListSpec::new(RelatedListKind::ManyToOne, "author");
    list.related_field = Some("book_id".to_string());
    list.tab = Some("tab.main".to_string());
    design.add_related_list(list).unwrap();
    let report = installer.install(&mut design).await.unwrap();
    assert_eq!(report.related_lists.created, 1);

    let exported = design_from_installed(store.as_ref(), files.as_ref(), "book", "en")
        .await
        .unwrap();
    assert_eq!(exported.name, "book");
    assert_eq!(exported.table_name, "books");
    assert_eq!(exported.tabs.len(), 1);
    assert_eq!(exported.tabs[0].id, design.tabs[0].id);
    assert_eq!(exported.field_names(), vec!["title", "price"]);
    assert!(exported.all_fields().all(|field| field.display_in_filter));
    assert!(exported.field_by_name("title").unwrap().is_required());
    let list = &exported.related_lists[0];
    assert_eq!(list.related_module, "author");
    assert_eq!(list.related_field.as_deref(), Some("book_id"));
    assert_eq!(list.tab.as_deref(), Some("tab.main"));
    assert_eq!(list.kind, RelatedListKind::ManyToOne);
    assert_eq!(exported.translation("field.title"), Some("Title"));

    // Installing the exported document right back duplicates nothing.
    let mut roundtrip = exported;
    let second = installer.install(&mut roundtrip).await.unwrap();
    assert!(!second.module_created);
    assert!(second.schema_unchanged());
    assert_eq!(second.fields.created, 0);
    assert_eq!(second.related_lists.created, 0);
    let module = installed_module(&store, "book").await;
    assert_eq!(store.fields_for_module(module.id).await.unwrap().len(), 2);
    assert_eq!(
        store.related_lists_for_module(module.id).await.unwrap().len(),
        1
    );
}
