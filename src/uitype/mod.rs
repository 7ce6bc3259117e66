//! Uitype registry
//!
//! A uitype names the strategy governing how a field's value is captured,
//! stored and rendered. Each implementation answers two questions: what
//! extra options to collect when the field is designed, and what physical
//! column the field maps to. The session controller and the installer
//! depend only on the `Uitype` trait; new uitypes register into the map.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::document::{DataBag, FieldDesign, ModuleDesign};
use crate::error::DesignerResult;
use crate::prompt::Prompt;
use crate::store::{ColumnSpec, ColumnType};

/// Display-visibility strategies a field can pick from.
pub const DISPLAYTYPES: [&str; 6] = ["everywhere", "list", "detail", "create", "edit", "hidden"];

/// Context handed to `collect_options`: the document being designed and the
/// names of modules already installed (for entity references).
pub struct OptionContext<'a> {
    pub design: &'a ModuleDesign,
    pub modules: &'a [String],
}

#[async_trait]
pub trait Uitype: Send + Sync {
    fn name(&self) -> &'static str;

    /// Physical column for a field of this uitype. Nullability follows the
    /// field's `required` rule.
    fn column_spec(&self, field: &FieldDesign) -> ColumnSpec;

    /// Collect uitype-specific options into the field's data bag. Most
    /// uitypes have none.
    async fn collect_options(
        &self,
        _prompt: &dyn Prompt,
        _ctx: &OptionContext<'_>,
        _data: &mut DataBag,
    ) -> DesignerResult<()> {
        Ok(())
    }
}

// ============================================================================
// Implementations
// ============================================================================

/// Uitypes that map straight to one column type with no options.
struct Scalar {
    name: &'static str,
    column: ColumnType,
}

#[async_trait]
impl Uitype for Scalar {
    fn name(&self) -> &'static str {
        self.name
    }

    fn column_spec(&self, field: &FieldDesign) -> ColumnSpec {
        ColumnSpec::new(&field.name, self.column, !field.is_required())
    }
}

/// Fixed-point numeric. Precision and scale are asked at design time and
/// kept in the data bag.
struct DecimalUitype;

#[async_trait]
impl Uitype for DecimalUitype {
    fn name(&self) -> &'static str {
        "decimal"
    }

    fn column_spec(&self, field: &FieldDesign) -> ColumnSpec {
        let precision = field
            .data
            .get("precision")
            .and_then(serde_json::Value::as_u64)
            .unwrap_or(13) as u8;
        let scale = field
            .data
            .get("scale")
            .and_then(serde_json::Value::as_u64)
            .unwrap_or(2) as u8;
        ColumnSpec::new(
            &field.name,
            ColumnType::Decimal { precision, scale },
            !field.is_required(),
        )
    }

    async fn collect_options(
        &self,
        prompt: &dyn Prompt,
        _ctx: &OptionContext<'_>,
        data: &mut DataBag,
    ) -> DesignerResult<()> {
        let precision = prompt.ask_default("What is the precision?", "13").await?;
        let scale = prompt.ask_default("What is the scale?", "2").await?;
        data.set("precision", precision.parse::<u64>().unwrap_or(13));
        data.set("scale", scale.parse::<u64>().unwrap_or(2));
        Ok(())
    }
}

/// Closed list of choices, stored as a varchar.
struct SelectUitype;

#[async_trait]
impl Uitype for SelectUitype {
    fn name(&self) -> &'static str {
        "select"
    }

    fn column_spec(&self, field: &FieldDesign) -> ColumnSpec {
        ColumnSpec::new(&field.name, ColumnType::Varchar(255), !field.is_required())
    }

    async fn collect_options(
        &self,
        prompt: &dyn Prompt,
        _ctx: &OptionContext<'_>,
        data: &mut DataBag,
    ) -> DesignerResult<()> {
        let answer = prompt
            .ask_default("What are the choices? (comma separated)", "")
            .await?;
        let choices: Vec<serde_json::Value> = answer
            .split(',')
            .map(str::trim)
            .filter(|choice| !choice.is_empty())
            .map(serde_json::Value::from)
            .collect();
        if !choices.is_empty() {
            data.set("choices", choices);
        }
        Ok(())
    }
}

/// Reference to a record of another module, stored as its numeric id. The
/// referenced module's name lands in the data bag and drives the relation
/// accessor in the generated model.
struct EntityUitype;

#[async_trait]
impl Uitype for EntityUitype {
    fn name(&self) -> &'static str {
        "entity"
    }

    fn column_spec(&self, field: &FieldDesign) -> ColumnSpec {
        ColumnSpec::new(&field.name, ColumnType::BigInteger, !field.is_required())
    }

    async fn collect_options(
        &self,
        prompt: &dyn Prompt,
        ctx: &OptionContext<'_>,
        data: &mut DataBag,
    ) -> DesignerResult<()> {
        if ctx.modules.is_empty() {
            prompt.warn("no installed modules available to reference");
            return Ok(());
        }
        let module = prompt
            .choice("Which module does this field reference?", ctx.modules, None)
            .await?;
        data.set("module", module.as_str());
        Ok(())
    }
}

// ============================================================================
// Registry
// ============================================================================

pub struct UitypeRegistry {
    uitypes: BTreeMap<&'static str, Arc<dyn Uitype>>,
}

impl UitypeRegistry {
    pub fn empty() -> Self {
        Self {
            uitypes: BTreeMap::new(),
        }
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        let scalars = [
            ("text", ColumnType::Varchar(255)),
            ("textarea", ColumnType::Text),
            ("number", ColumnType::Integer),
            ("boolean", ColumnType::Boolean),
            ("date", ColumnType::Date),
            ("datetime", ColumnType::Timestamp),
            ("email", ColumnType::Varchar(255)),
            ("url", ColumnType::Varchar(255)),
            ("phone", ColumnType::Varchar(255)),
            ("password", ColumnType::Varchar(255)),
        ];
        for (name, column) in scalars {
            registry.register(Arc::new(Scalar { name, column }));
        }
        registry.register(Arc::new(DecimalUitype));
        registry.register(Arc::new(SelectUitype));
        registry.register(Arc::new(EntityUitype));
        registry
    }

    pub fn register(&mut self, uitype: Arc<dyn Uitype>) {
        self.uitypes.insert(uitype.name(), uitype);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Uitype>> {
        self.uitypes.get(name).cloned()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.uitypes.keys().map(|name| name.to_string()).collect()
    }
}

impl Default for UitypeRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{ModuleConfig, ModuleDesign};
    use crate::prompt::ScriptedPrompt;

    fn field(name: &str, uitype: &str, required: bool) -> FieldDesign {
        let mut data = DataBag::new();
        if required {
            data.set("rules", "required");
        }
        FieldDesign {
            id: None,
            name: name.to_string(),
            uitype: uitype.to_string(),
            displaytype: "everywhere".to_string(),
            sequence: 0,
            display_in_filter: true,
            data,
        }
    }

    #[test]
    fn test_nullability_follows_required_rule() {
        let registry = UitypeRegistry::with_defaults();
        let text = registry.get("text").unwrap();

        let spec = text.column_spec(&field("title", "text", true));
        assert!(!spec.nullable);
        assert_eq!(spec.column_type, ColumnType::Varchar(255));

        let spec = text.column_spec(&field("subtitle", "text", false));
        assert!(spec.nullable);
    }

    #[test]
    fn test_decimal_reads_collected_precision() {
        let registry = UitypeRegistry::with_defaults();
        let decimal = registry.get("decimal").unwrap();

        let mut priced = field("price", "decimal", false);
        priced.data.set("precision", 10u64);
        priced.data.set("scale", 4u64);

        let spec = decimal.column_spec(&priced);
        assert_eq!(
            spec.column_type,
            ColumnType::Decimal {
                precision: 10,
                scale: 4
            }
        );
    }

    #[tokio::test]
    async fn test_select_collects_choices() {
        let registry = UitypeRegistry::with_defaults();
        let select = registry.get("select").unwrap();
        let design = ModuleDesign::create(ModuleConfig::new("book-type")).unwrap();
        let prompt = ScriptedPrompt::new(["paperback, hardcover , ebook"]);
        let ctx = OptionContext {
            design: &design,
            modules: &[],
        };

        let mut data = DataBag::new();
        select.collect_options(&prompt, &ctx, &mut data).await.unwrap();

        let choices = data.get("choices").unwrap().as_array().unwrap();
        let choices: Vec<&str> = choices.iter().filter_map(|c| c.as_str()).collect();
        assert_eq!(choices, vec!["paperback", "hardcover", "ebook"]);
    }

    #[tokio::test]
    async fn test_entity_records_referenced_module() {
        let registry = UitypeRegistry::with_defaults();
        let entity = registry.get("entity").unwrap();
        let design = ModuleDesign::create(ModuleConfig::new("book")).unwrap();
        let modules = vec!["author".to_string(), "book-type".to_string()];
        let prompt = ScriptedPrompt::new(["book-type"]);
        let ctx = OptionContext {
            design: &design,
            modules: &modules,
        };

        let mut data = DataBag::new();
        entity.collect_options(&prompt, &ctx, &mut data).await.unwrap();
        assert_eq!(data.str_opt("module"), Some("book-type"));
    }
}
