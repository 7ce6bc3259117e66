//! Design documents
//!
//! A `ModuleDesign` is the persisted, in-progress description of one module:
//! scalar configuration, the tab/block/field hierarchy, related lists, links,
//! filters and a locale-keyed translation bag. The session controller mutates
//! it step by step and saves a snapshot after every mutation; the installer
//! consumes it.
//!
//! Element labels double as translation keys (`tab.main`, `block.general`,
//! `field.title`). Deleting an element cascades its keys (and those of its
//! descendants) into `translations_to_remove` so the next install drops them
//! from the written translation files.

pub mod naming;
pub mod sequence;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{DesignError, DesignResult};

use self::sequence::{insert_at, position_for, Sequenced};

pub use self::sequence::Placement;

/// Route handler a module points at when the designer does not override it.
pub const DEFAULT_ROUTE: &str = "modules.list";

// ============================================================================
// Extension bags
// ============================================================================

/// Free-form extension bag attached to every element. Uitype options,
/// validation rules and link payloads all live here so new uitypes can add
/// options without schema changes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataBag(pub Map<String, Value>);

impl DataBag {
    pub fn new() -> Self {
        Self(Map::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.0.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn str_opt(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn bool_or(&self, key: &str, default: bool) -> bool {
        self.0.get(key).and_then(Value::as_bool).unwrap_or(default)
    }

    /// Pipe-delimited validation rules, split.
    pub fn rules(&self) -> Vec<&str> {
        self.str_opt("rules")
            .map(|rules| rules.split('|').filter(|rule| !rule.is_empty()).collect())
            .unwrap_or_default()
    }

    /// A field is required when its first-class `required` rule is present.
    pub fn is_required(&self) -> bool {
        self.rules().iter().any(|rule| *rule == "required")
    }

    pub fn as_value(&self) -> Value {
        Value::Object(self.0.clone())
    }
}

// ============================================================================
// Elements
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabDesign {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    pub sequence: u32,
    #[serde(default, skip_serializing_if = "DataBag::is_empty")]
    pub data: DataBag,
    #[serde(default)]
    pub blocks: Vec<BlockDesign>,
}

impl Sequenced for TabDesign {
    fn sequence(&self) -> u32 {
        self.sequence
    }

    fn set_sequence(&mut self, sequence: u32) {
        self.sequence = sequence;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockDesign {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    pub sequence: u32,
    #[serde(default, skip_serializing_if = "DataBag::is_empty")]
    pub data: DataBag,
    #[serde(default)]
    pub fields: Vec<FieldDesign>,
}

impl Sequenced for BlockDesign {
    fn sequence(&self) -> u32 {
        self.sequence
    }

    fn set_sequence(&mut self, sequence: u32) {
        self.sequence = sequence;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDesign {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    pub uitype: String,
    pub displaytype: String,
    pub sequence: u32,
    #[serde(default = "default_true")]
    pub display_in_filter: bool,
    #[serde(default, skip_serializing_if = "DataBag::is_empty")]
    pub data: DataBag,
}

impl Sequenced for FieldDesign {
    fn sequence(&self) -> u32 {
        self.sequence
    }

    fn set_sequence(&mut self, sequence: u32) {
        self.sequence = sequence;
    }
}

impl FieldDesign {
    pub fn translation_key(&self) -> String {
        format!("field.{}", self.name)
    }

    pub fn is_required(&self) -> bool {
        self.data.is_required()
    }
}

/// Relation direction of a related list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelatedListKind {
    #[serde(rename = "n-1")]
    ManyToOne,
    #[serde(rename = "n-n")]
    ManyToMany,
}

impl fmt::Display for RelatedListKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelatedListKind::ManyToOne => write!(f, "n-1"),
            RelatedListKind::ManyToMany => write!(f, "n-n"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatedListDesign {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: RelatedListKind,
    pub related_module: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tab: Option<String>,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    pub sequence: u32,
    #[serde(default, skip_serializing_if = "DataBag::is_empty")]
    pub data: DataBag,
}

impl Sequenced for RelatedListDesign {
    fn sequence(&self) -> u32 {
        self.sequence
    }

    fn set_sequence(&mut self, sequence: u32) {
        self.sequence = sequence;
    }
}

/// Where a link is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkKind {
    #[serde(rename = "detail")]
    Detail,
    #[serde(rename = "detail.action")]
    DetailAction,
}

impl fmt::Display for LinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkKind::Detail => write!(f, "detail"),
            LinkKind::DetailAction => write!(f, "detail.action"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkDesign {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: LinkKind,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    pub sequence: u32,
    #[serde(default, skip_serializing_if = "DataBag::is_empty")]
    pub data: DataBag,
}

impl Sequenced for LinkDesign {
    fn sequence(&self) -> u32 {
        self.sequence
    }

    fn set_sequence(&mut self, sequence: u32) {
        self.sequence = sequence;
    }
}

/// Extra named filter declared on the design. The installer prefixes the
/// name with `filter.` and marks these non-default.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterDesign {
    pub name: String,
    pub columns: Vec<String>,
    #[serde(default, skip_serializing_if = "DataBag::is_empty")]
    pub data: DataBag,
}

// ============================================================================
// The design document
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleDesign {
    pub name: String,
    pub model_class: String,
    pub table_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default)]
    pub is_for_admin: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_route: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
    pub locale: String,
    #[serde(default)]
    pub translations: BTreeMap<String, BTreeMap<String, String>>,
    #[serde(default)]
    pub tabs: Vec<TabDesign>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related_lists: Vec<RelatedListDesign>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<LinkDesign>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<FilterDesign>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub translations_to_remove: BTreeSet<String>,
}

/// Answers gathered by the "create a module" step. Optional values fall back
/// to defaults derived from the module name.
#[derive(Debug, Clone, Default)]
pub struct ModuleConfig {
    pub raw_name: String,
    pub label: Option<String>,
    pub label_single: Option<String>,
    pub model_class: Option<String>,
    pub table_name: Option<String>,
    pub table_prefix: Option<String>,
    pub icon: Option<String>,
    pub is_for_admin: bool,
    pub default_route: Option<String>,
    pub package: Option<String>,
    pub locale: String,
}

impl ModuleConfig {
    pub fn new(raw_name: &str) -> Self {
        Self {
            raw_name: raw_name.to_string(),
            locale: "en".to_string(),
            ..Self::default()
        }
    }
}

/// Element kinds addressable by `delete_element`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Tab,
    Block,
    Field,
    RelatedList,
    Link,
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementKind::Tab => write!(f, "tab"),
            ElementKind::Block => write!(f, "block"),
            ElementKind::Field => write!(f, "field"),
            ElementKind::RelatedList => write!(f, "related list"),
            ElementKind::Link => write!(f, "link"),
        }
    }
}

impl ModuleDesign {
    /// Start a fresh document from create-step answers. Seeds the module's
    /// own translation pair (`<name>` plural, `single.<name>` singular).
    pub fn create(config: ModuleConfig) -> DesignResult<Self> {
        let name = naming::normalize_module_name(&config.raw_name)?;
        let label = config
            .label
            .unwrap_or_else(|| naming::display_label(&name));
        let label_single = config.label_single.unwrap_or_else(|| label.clone());

        let mut design = Self {
            model_class: config
                .model_class
                .unwrap_or_else(|| naming::default_model_class(&name)),
            table_name: config
                .table_name
                .unwrap_or_else(|| naming::default_table_name(&name)),
            table_prefix: config.table_prefix,
            icon: config.icon,
            is_for_admin: config.is_for_admin,
            default_route: config.default_route,
            package: config.package,
            locale: config.locale,
            translations: BTreeMap::new(),
            tabs: Vec::new(),
            related_lists: Vec::new(),
            links: Vec::new(),
            filters: Vec::new(),
            translations_to_remove: BTreeSet::new(),
            name,
        };

        let module_key = design.name.clone();
        design.set_translation(&module_key, &label);
        design.set_translation(&format!("single.{module_key}"), &label_single);
        Ok(design)
    }

    /// Physical table name including the optional prefix.
    pub fn table(&self) -> String {
        match &self.table_prefix {
            Some(prefix) => format!("{prefix}{}", self.table_name),
            None => self.table_name.clone(),
        }
    }

    /// Auxiliary configuration carried in the module record's data bag:
    /// package, admin flag, route override, table naming and links.
    pub fn module_data(&self) -> serde_json::Result<Value> {
        let mut data = Map::new();
        if let Some(package) = &self.package {
            data.insert("package".to_string(), Value::from(package.as_str()));
        }
        if self.is_for_admin {
            data.insert("admin".to_string(), Value::Bool(true));
        }
        if let Some(route) = &self.default_route {
            data.insert("route".to_string(), Value::from(route.as_str()));
        }
        data.insert(
            "tableName".to_string(),
            Value::from(self.table_name.as_str()),
        );
        if let Some(prefix) = &self.table_prefix {
            data.insert("tablePrefix".to_string(), Value::from(prefix.as_str()));
        }
        if !self.links.is_empty() {
            data.insert("links".to_string(), serde_json::to_value(&self.links)?);
        }
        Ok(Value::Object(data))
    }

    // ------------------------------------------------------------------
    // Translations
    // ------------------------------------------------------------------

    /// Set a translation in the document's locale. Re-adding a key cancels
    /// any pending removal of it.
    pub fn set_translation(&mut self, key: &str, text: &str) {
        let locale = self.locale.clone();
        self.translations
            .entry(locale)
            .or_default()
            .insert(key.to_string(), text.to_string());
        self.translations_to_remove.remove(key);
    }

    pub fn translation(&self, key: &str) -> Option<&str> {
        self.translations
            .get(&self.locale)
            .and_then(|entries| entries.get(key))
            .map(String::as_str)
    }

    /// Drop a key from every locale and queue it for removal from the
    /// written translation files.
    pub fn remove_translation(&mut self, key: &str) {
        for entries in self.translations.values_mut() {
            entries.remove(key);
        }
        self.translations_to_remove.insert(key.to_string());
    }

    // ------------------------------------------------------------------
    // Lookups
    // ------------------------------------------------------------------

    pub fn tab_by_label(&self, label: &str) -> Option<&TabDesign> {
        self.tabs.iter().find(|tab| tab.label == label)
    }

    pub fn block_by_label(&self, label: &str) -> Option<&BlockDesign> {
        self.tabs
            .iter()
            .flat_map(|tab| tab.blocks.iter())
            .find(|block| block.label == label)
    }

    pub fn all_fields(&self) -> impl Iterator<Item = &FieldDesign> {
        self.tabs
            .iter()
            .flat_map(|tab| tab.blocks.iter())
            .flat_map(|block| block.fields.iter())
    }

    pub fn field_by_name(&self, name: &str) -> Option<&FieldDesign> {
        self.all_fields().find(|field| field.name == name)
    }

    pub fn tab_labels(&self) -> Vec<String> {
        self.tabs.iter().map(|tab| tab.label.clone()).collect()
    }

    pub fn block_labels(&self) -> Vec<String> {
        self.tabs
            .iter()
            .flat_map(|tab| tab.blocks.iter())
            .map(|block| block.label.clone())
            .collect()
    }

    pub fn field_names(&self) -> Vec<String> {
        self.all_fields().map(|field| field.name.clone()).collect()
    }

    // ------------------------------------------------------------------
    // Structural mutations
    // ------------------------------------------------------------------

    /// Add a tab. Returns the tab's label (synthesized when the spec leaves
    /// it unset: `tab.main` for the first tab, `tab.tabN` afterwards).
    pub fn add_tab(&mut self, spec: TabSpec) -> DesignResult<String> {
        let label = spec.label.unwrap_or_else(|| {
            if self.tabs.is_empty() {
                "tab.main".to_string()
            } else {
                format!("tab.tab{}", self.tabs.len())
            }
        });
        let translation = spec
            .translation
            .unwrap_or_else(|| naming::display_label(label_tail(&label)));

        let position = position_for(&self.tabs, &spec.placement, |tab| tab.label.as_str())
            .ok_or_else(|| placement_error(ElementKind::Tab, &spec.placement))?;

        insert_at(
            &mut self.tabs,
            TabDesign {
                id: None,
                label: label.clone(),
                icon: spec.icon,
                sequence: 0,
                data: spec.data,
                blocks: Vec::new(),
            },
            position,
        );

        self.set_translation(&label, &translation);
        Ok(label)
    }

    /// Add a block to the named tab. `spec.label` is the raw name; the
    /// stored label carries the `block.` prefix.
    pub fn add_block(&mut self, tab_label: &str, spec: BlockSpec) -> DesignResult<String> {
        if self.tabs.is_empty() {
            return Err(DesignError::missing_parent("block", "tab"));
        }

        let block_count = self.tabs.iter().map(|tab| tab.blocks.len()).sum::<usize>();
        let raw = spec.label.unwrap_or_else(|| {
            if block_count == 0 {
                "general".to_string()
            } else {
                format!("block{block_count}")
            }
        });
        let label = format!("block.{raw}");
        let translation = spec
            .translation
            .unwrap_or_else(|| naming::display_label(&raw));

        let mut data = spec.data;
        let description_key = spec.description.as_ref().map(|_| format!("{label}.description"));
        if let Some(key) = &description_key {
            data.set("description", key.as_str());
        }

        let tab = self
            .tabs
            .iter_mut()
            .find(|tab| tab.label == tab_label)
            .ok_or_else(|| DesignError::not_found("tab", tab_label))?;

        let position = position_for(&tab.blocks, &spec.placement, |block| block.label.as_str())
            .ok_or_else(|| placement_error(ElementKind::Block, &spec.placement))?;

        insert_at(
            &mut tab.blocks,
            BlockDesign {
                id: None,
                label: label.clone(),
                icon: spec.icon,
                sequence: 0,
                data,
                fields: Vec::new(),
            },
            position,
        );

        self.set_translation(&label, &translation);
        if let (Some(key), Some(text)) = (description_key, spec.description) {
            self.set_translation(&key, &text);
        }
        Ok(label)
    }

    /// Add a field to the named block. The name is normalized to snake_case
    /// and must be unique across the whole module, not just its block.
    pub fn add_field(&mut self, block_label: &str, spec: FieldSpec) -> DesignResult<String> {
        if self.tabs.iter().all(|tab| tab.blocks.is_empty()) {
            return Err(DesignError::missing_parent("field", "block"));
        }

        let name = naming::normalize_field_name(&spec.name)?;
        if self.field_by_name(&name).is_some() {
            return Err(DesignError::DuplicateFieldName { name });
        }

        let translation = spec
            .translation
            .unwrap_or_else(|| naming::display_label(&name));
        let key = format!("field.{name}");

        let mut data = spec.data;
        let mut rules: Vec<String> = Vec::new();
        if spec.required {
            rules.push("required".to_string());
        }
        rules.extend(spec.extra_rules);
        if !rules.is_empty() {
            data.set("rules", rules.join("|"));
        }
        if spec.large {
            data.set("large", true);
        }
        if let Some(default) = &spec.default_value {
            data.set("default", default.as_str());
        }
        let info_key = spec.info.as_ref().map(|_| format!("{key}.info"));
        if let Some(info_key) = &info_key {
            data.set("info", info_key.as_str());
        }

        let block = self
            .tabs
            .iter_mut()
            .flat_map(|tab| tab.blocks.iter_mut())
            .find(|block| block.label == block_label)
            .ok_or_else(|| DesignError::not_found("block", block_label))?;

        let position = position_for(&block.fields, &spec.placement, |field| field.name.as_str())
            .ok_or_else(|| placement_error(ElementKind::Field, &spec.placement))?;

        insert_at(
            &mut block.fields,
            FieldDesign {
                id: None,
                name: name.clone(),
                uitype: spec.uitype,
                displaytype: spec.displaytype,
                sequence: 0,
                display_in_filter: spec.display_in_filter,
                data,
            },
            position,
        );

        self.set_translation(&key, &translation);
        if let (Some(info_key), Some(info)) = (info_key, spec.info) {
            self.set_translation(&info_key, &info);
        }
        Ok(name)
    }

    /// Add a related list. `spec.label` is the raw name; the stored label
    /// carries the `relatedlist.` prefix.
    pub fn add_related_list(&mut self, spec: RelatedListSpec) -> DesignResult<String> {
        let raw = spec
            .label
            .unwrap_or_else(|| format!("relatedlist{}", self.related_lists.len() + 1));
        let label = format!("relatedlist.{raw}");
        let translation = spec
            .translation
            .unwrap_or_else(|| naming::display_label(&raw));

        let method = spec.method.unwrap_or_else(|| {
            match spec.kind {
                RelatedListKind::ManyToOne => "get_dependent_list".to_string(),
                RelatedListKind::ManyToMany => "get_related_list".to_string(),
            }
        });

        let mut data = spec.data;
        if !spec.actions.is_empty() {
            let actions: Vec<Value> = spec.actions.iter().map(|a| Value::from(a.as_str())).collect();
            data.set("actions", actions);
        }

        let position = position_for(&self.related_lists, &spec.placement, |list| {
            list.label.as_str()
        })
        .ok_or_else(|| placement_error(ElementKind::RelatedList, &spec.placement))?;

        insert_at(
            &mut self.related_lists,
            RelatedListDesign {
                id: None,
                label: label.clone(),
                kind: spec.kind,
                related_module: spec.related_module,
                related_field: spec.related_field,
                tab: spec.tab,
                method,
                icon: spec.icon,
                sequence: 0,
                data,
            },
            position,
        );

        self.set_translation(&label, &translation);
        Ok(label)
    }

    /// Add a link. `spec.label` is the raw name; the stored label carries
    /// the `link.` prefix. The action payload travels in `spec.data`.
    pub fn add_link(&mut self, spec: LinkSpec) -> DesignResult<String> {
        let raw = spec
            .label
            .unwrap_or_else(|| format!("link{}", self.links.len()));
        let label = format!("link.{raw}");
        let translation = spec
            .translation
            .unwrap_or_else(|| naming::display_label(&raw));

        let position = position_for(&self.links, &spec.placement, |link| link.label.as_str())
            .ok_or_else(|| placement_error(ElementKind::Link, &spec.placement))?;

        insert_at(
            &mut self.links,
            LinkDesign {
                id: None,
                label: label.clone(),
                kind: spec.kind,
                url: spec.url,
                icon: spec.icon,
                sequence: 0,
                data: spec.data,
            },
            position,
        );

        self.set_translation(&label, &translation);
        Ok(label)
    }

    /// Delete an element by label (tabs, blocks, related lists, links) or
    /// name (fields), cascading translation removal to all descendants.
    /// Remaining sibling sequences are left untouched; render order only
    /// depends on relative order.
    pub fn delete_element(&mut self, kind: ElementKind, identifier: &str) -> DesignResult<()> {
        match kind {
            ElementKind::Tab => {
                let index = self
                    .tabs
                    .iter()
                    .position(|tab| tab.label == identifier)
                    .ok_or_else(|| DesignError::not_found("tab", identifier))?;
                let tab = self.tabs.remove(index);
                for key in tab_translation_keys(&tab) {
                    self.remove_translation(&key);
                }
            }
            ElementKind::Block => {
                let mut removed = None;
                for tab in &mut self.tabs {
                    if let Some(index) =
                        tab.blocks.iter().position(|block| block.label == identifier)
                    {
                        removed = Some(tab.blocks.remove(index));
                        break;
                    }
                }
                let block =
                    removed.ok_or_else(|| DesignError::not_found("block", identifier))?;
                for key in block_translation_keys(&block) {
                    self.remove_translation(&key);
                }
            }
            ElementKind::Field => {
                let mut removed = None;
                'tabs: for tab in &mut self.tabs {
                    for block in &mut tab.blocks {
                        if let Some(index) =
                            block.fields.iter().position(|field| field.name == identifier)
                        {
                            removed = Some(block.fields.remove(index));
                            break 'tabs;
                        }
                    }
                }
                let field =
                    removed.ok_or_else(|| DesignError::not_found("field", identifier))?;
                for key in field_translation_keys(&field) {
                    self.remove_translation(&key);
                }
            }
            ElementKind::RelatedList => {
                let index = self
                    .related_lists
                    .iter()
                    .position(|list| list.label == identifier)
                    .ok_or_else(|| DesignError::not_found("related list", identifier))?;
                let list = self.related_lists.remove(index);
                self.remove_translation(&list.label);
            }
            ElementKind::Link => {
                let index = self
                    .links
                    .iter()
                    .position(|link| link.label == identifier)
                    .ok_or_else(|| DesignError::not_found("link", identifier))?;
                let link = self.links.remove(index);
                self.remove_translation(&link.label);
            }
        }
        Ok(())
    }
}

fn placement_error(kind: ElementKind, placement: &Placement) -> DesignError {
    let target = match placement {
        Placement::Before(target) | Placement::After(target) => target.as_str(),
        Placement::End => "",
    };
    DesignError::not_found(&kind.to_string(), target)
}

fn label_tail(label: &str) -> &str {
    label.rsplit('.').next().unwrap_or(label)
}

fn tab_translation_keys(tab: &TabDesign) -> Vec<String> {
    let mut keys = vec![tab.label.clone()];
    for block in &tab.blocks {
        keys.extend(block_translation_keys(block));
    }
    keys
}

fn block_translation_keys(block: &BlockDesign) -> Vec<String> {
    let mut keys = vec![block.label.clone()];
    if let Some(description) = block.data.str_opt("description") {
        keys.push(description.to_string());
    }
    for field in &block.fields {
        keys.extend(field_translation_keys(field));
    }
    keys
}

fn field_translation_keys(field: &FieldDesign) -> Vec<String> {
    let mut keys = vec![field.translation_key()];
    if let Some(info) = field.data.str_opt("info") {
        keys.push(info.to_string());
    }
    keys
}

fn default_true() -> bool {
    true
}

// ============================================================================
// Step specs
// ============================================================================

/// Answers gathered by the "add a tab" step.
#[derive(Debug, Clone, Default)]
pub struct TabSpec {
    /// Full translation key (`tab.main`). Synthesized when unset.
    pub label: Option<String>,
    pub translation: Option<String>,
    pub icon: Option<String>,
    pub placement: Placement,
    pub data: DataBag,
}

/// Answers gathered by the "add a block" step.
#[derive(Debug, Clone, Default)]
pub struct BlockSpec {
    /// Raw name without the `block.` prefix. Synthesized when unset.
    pub label: Option<String>,
    pub translation: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub placement: Placement,
    pub data: DataBag,
}

/// Answers gathered by the "add a field" step.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: String,
    pub uitype: String,
    pub translation: Option<String>,
    pub displaytype: String,
    pub required: bool,
    pub display_in_filter: bool,
    pub large: bool,
    pub default_value: Option<String>,
    pub info: Option<String>,
    pub extra_rules: Vec<String>,
    pub placement: Placement,
    pub data: DataBag,
}

impl FieldSpec {
    pub fn new(name: &str, uitype: &str) -> Self {
        Self {
            name: name.to_string(),
            uitype: uitype.to_string(),
            translation: None,
            displaytype: "everywhere".to_string(),
            required: false,
            display_in_filter: true,
            large: false,
            default_value: None,
            info: None,
            extra_rules: Vec::new(),
            placement: Placement::End,
            data: DataBag::new(),
        }
    }
}

/// Answers gathered by the "add a related list" step.
#[derive(Debug, Clone)]
pub struct RelatedListSpec {
    /// Raw name without the `relatedlist.` prefix. Synthesized when unset.
    pub label: Option<String>,
    pub translation: Option<String>,
    pub kind: RelatedListKind,
    pub related_module: String,
    pub related_field: Option<String>,
    pub tab: Option<String>,
    pub method: Option<String>,
    pub actions: Vec<String>,
    pub icon: Option<String>,
    pub placement: Placement,
    pub data: DataBag,
}

impl RelatedListSpec {
    pub fn new(kind: RelatedListKind, related_module: &str) -> Self {
        Self {
            label: None,
            translation: None,
            kind,
            related_module: related_module.to_string(),
            related_field: None,
            tab: None,
            method: None,
            actions: Vec::new(),
            icon: None,
            placement: Placement::End,
            data: DataBag::new(),
        }
    }
}

/// Answers gathered by the "add a link" step.
#[derive(Debug, Clone)]
pub struct LinkSpec {
    /// Raw name without the `link.` prefix. Synthesized when unset.
    pub label: Option<String>,
    pub translation: Option<String>,
    pub kind: LinkKind,
    pub url: String,
    pub icon: Option<String>,
    pub placement: Placement,
    pub data: DataBag,
}

impl LinkSpec {
    pub fn new(kind: LinkKind, url: &str) -> Self {
        Self {
            label: None,
            translation: None,
            kind,
            url: url.to_string(),
            icon: None,
            placement: Placement::End,
            data: DataBag::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book_type() -> ModuleDesign {
        ModuleDesign::create(ModuleConfig::new("book-type")).unwrap()
    }

    #[test]
    fn test_create_seeds_module_translations() {
        let design = book_type();
        assert_eq!(design.name, "book-type");
        assert_eq!(design.table_name, "book_types");
        assert_eq!(design.model_class, "app::models::BookType");
        assert_eq!(design.translation("book-type"), Some("Book Type"));
        assert_eq!(design.translation("single.book-type"), Some("Book Type"));
    }

    #[test]
    fn test_create_rejects_invalid_name() {
        let err = ModuleDesign::create(ModuleConfig::new("  ")).unwrap_err();
        assert!(matches!(err, DesignError::InvalidName { .. }));
    }

    #[test]
    fn test_default_tab_and_block_labels() {
        let mut design = book_type();
        let tab = design.add_tab(TabSpec::default()).unwrap();
        assert_eq!(tab, "tab.main");
        let second = design.add_tab(TabSpec::default()).unwrap();
        assert_eq!(second, "tab.tab1");

        let block = design.add_block("tab.main", BlockSpec::default()).unwrap();
        assert_eq!(block, "block.general");
        assert_eq!(design.translation("block.general"), Some("General"));
    }

    #[test]
    fn test_block_requires_a_tab() {
        let mut design = book_type();
        let err = design
            .add_block("tab.main", BlockSpec::default())
            .unwrap_err();
        assert!(matches!(err, DesignError::MissingParent { .. }));
    }

    #[test]
    fn test_field_requires_a_block() {
        let mut design = book_type();
        design.add_tab(TabSpec::default()).unwrap();
        let err = design
            .add_field("block.general", FieldSpec::new("title", "text"))
            .unwrap_err();
        assert!(matches!(err, DesignError::MissingParent { .. }));
    }

    #[test]
    fn test_duplicate_field_name_rejected_module_wide() {
        let mut design = book_type();
        design.add_tab(TabSpec::default()).unwrap();
        design.add_block("tab.main", BlockSpec::default()).unwrap();
        design
            .add_block(
                "tab.main",
                BlockSpec {
                    label: Some("details".to_string()),
                    ..BlockSpec::default()
                },
            )
            .unwrap();

        design
            .add_field("block.general", FieldSpec::new("title", "text"))
            .unwrap();

        let before = serde_json::to_value(&design).unwrap();
        let err = design
            .add_field("block.details", FieldSpec::new("Title", "text"))
            .unwrap_err();
        assert!(matches!(err, DesignError::DuplicateFieldName { .. }));

        // The failed add must leave the document unchanged.
        assert_eq!(serde_json::to_value(&design).unwrap(), before);
    }

    #[test]
    fn test_required_field_carries_rule() {
        let mut design = book_type();
        design.add_tab(TabSpec::default()).unwrap();
        design.add_block("tab.main", BlockSpec::default()).unwrap();

        let mut spec = FieldSpec::new("title", "text");
        spec.required = true;
        spec.extra_rules = vec!["max:255".to_string()];
        design.add_field("block.general", spec).unwrap();

        let field = design.field_by_name("title").unwrap();
        assert!(field.is_required());
        assert_eq!(field.data.rules(), vec!["required", "max:255"]);
    }

    #[test]
    fn test_field_placement_before() {
        let mut design = book_type();
        design.add_tab(TabSpec::default()).unwrap();
        design.add_block("tab.main", BlockSpec::default()).unwrap();
        design
            .add_field("block.general", FieldSpec::new("title", "text"))
            .unwrap();
        design
            .add_field("block.general", FieldSpec::new("price", "number"))
            .unwrap();

        let mut spec = FieldSpec::new("isbn", "text");
        spec.placement = Placement::Before("price".to_string());
        design.add_field("block.general", spec).unwrap();

        let names: Vec<&str> = design.all_fields().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["title", "isbn", "price"]);
        let sequences: Vec<u32> = design.all_fields().map(|f| f.sequence).collect();
        assert_eq!(sequences, vec![0, 1, 2]);
    }

    #[test]
    fn test_delete_block_cascades_translations() {
        let mut design = book_type();
        design.add_tab(TabSpec::default()).unwrap();
        design
            .add_block(
                "tab.main",
                BlockSpec {
                    description: Some("Genre classification".to_string()),
                    ..BlockSpec::default()
                },
            )
            .unwrap();
        let mut spec = FieldSpec::new("title", "text");
        spec.info = Some("The printed title".to_string());
        design.add_field("block.general", spec).unwrap();

        design
            .delete_element(ElementKind::Block, "block.general")
            .unwrap();

        for key in [
            "block.general",
            "block.general.description",
            "field.title",
            "field.title.info",
        ] {
            assert!(design.translations_to_remove.contains(key), "missing {key}");
            assert_eq!(design.translation(key), None);
        }
        assert!(design.block_by_label("block.general").is_none());
    }

    #[test]
    fn test_readding_translation_cancels_removal() {
        let mut design = book_type();
        design.add_tab(TabSpec::default()).unwrap();
        design.delete_element(ElementKind::Tab, "tab.main").unwrap();
        assert!(design.translations_to_remove.contains("tab.main"));

        design.add_tab(TabSpec::default()).unwrap();
        assert!(!design.translations_to_remove.contains("tab.main"));
    }

    #[test]
    fn test_delete_unknown_element() {
        let mut design = book_type();
        let err = design
            .delete_element(ElementKind::Field, "ghost")
            .unwrap_err();
        assert!(matches!(err, DesignError::NotFound { .. }));
    }

    #[test]
    fn test_serialized_form_uses_camel_case_keys() {
        let mut design = book_type();
        design.add_tab(TabSpec::default()).unwrap();
        design.add_block("tab.main", BlockSpec::default()).unwrap();
        design
            .add_field("block.general", FieldSpec::new("title", "text"))
            .unwrap();
        design.delete_element(ElementKind::Field, "title").unwrap();

        let json = serde_json::to_string(&design).unwrap();
        assert!(json.contains("\"modelClass\""));
        assert!(json.contains("\"tableName\""));
        assert!(json.contains("\"translationsToRemove\""));

        let restored: ModuleDesign = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.name, design.name);
        assert!(restored.translations_to_remove.contains("field.title"));
    }

    #[test]
    fn test_related_list_defaults() {
        let mut design = book_type();
        let label = design
            .add_related_list(RelatedListSpec::new(RelatedListKind::ManyToMany, "book"))
            .unwrap();
        assert_eq!(label, "relatedlist.relatedlist1");

        let list = &design.related_lists[0];
        assert_eq!(list.method, "get_related_list");
        assert_eq!(list.kind.to_string(), "n-n");
    }

    #[test]
    fn test_link_payload_travels_in_data() {
        let mut design = book_type();
        let mut spec = LinkSpec::new(LinkKind::Detail, "modules/book-type/export");
        spec.data.set("actionType", "ajax");
        spec.data.set("method", "post");
        let label = design.add_link(spec).unwrap();

        assert_eq!(label, "link.link0");
        let link = &design.links[0];
        assert_eq!(link.data.str_opt("actionType"), Some("ajax"));
        assert_eq!(link.data.str_opt("method"), Some("post"));
    }
}
