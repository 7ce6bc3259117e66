//! The interactive design session
//!
//! A session walks the designer through building a module document, keeps a
//! draft of it saved after every answer, and hands the finished document to
//! the installer. The flow is a plain state machine: no module yet, a module
//! draft being edited, an install in flight, done.

pub mod export;

pub use export::design_from_installed;

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;

use crate::artifacts::{ArtifactFs, MigrationGenerator};
use crate::config::DesignerConfig;
use crate::document::{
    naming, BlockSpec, DataBag, ElementKind, FieldSpec, LinkKind, LinkSpec, ModuleConfig,
    ModuleDesign, Placement, RelatedListKind, RelatedListSpec, TabSpec, DEFAULT_ROUTE,
};
use crate::error::{DesignError, DesignerResult};
use crate::install::{InstallReport, Installer};
use crate::prompt::Prompt;
use crate::store::{DraftStore, MetadataStore, SchemaEditor};
use crate::uitype::{OptionContext, UitypeRegistry, DISPLAYTYPES};

// ============================================================================
// Menus
// ============================================================================

const CREATE: &str = "Create a new module";
const EDIT_INSTALLED: &str = "Edit a module";
const REMOVE_DRAFT: &str = "Remove a designed module from the list";
const EXIT: &str = "Exit";
const NO_TAB: &str = "No tab";

const ACTIONS: [&str; 10] = [
    CREATE,
    "Add a tab",
    "Add a block",
    "Add a field",
    "Add a related list",
    "Add a link",
    "Delete an element",
    "Install module",
    "Make migration",
    EXIT,
];

/// Which action to suggest next, given the one that just ran. Mirrors the
/// natural build order: module, tab, block, then fields until done.
fn default_after(action: usize) -> usize {
    match action {
        0 => 1,
        1 => 2,
        2 => 3,
        3 => 3,
        7 | 8 => 9,
        other => other,
    }
}

fn suggested_action(design: &ModuleDesign) -> usize {
    if design.tabs.is_empty() {
        1
    } else if design.tabs.iter().all(|tab| tab.blocks.is_empty()) {
        2
    } else if design.all_fields().next().is_none() {
        3
    } else {
        7
    }
}

// ============================================================================
// Session
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    NoModule,
    ModuleDraft,
    Installing,
    Done,
}

/// Everything a session needs to touch the outside world. All trait objects,
/// so tests can run entirely in memory.
#[derive(Clone)]
pub struct DesignerServices {
    pub drafts: Arc<dyn DraftStore>,
    pub metadata: Arc<dyn MetadataStore>,
    pub schema: Arc<dyn SchemaEditor>,
    pub files: Arc<dyn ArtifactFs>,
}

pub struct SessionController {
    prompt: Arc<dyn Prompt>,
    services: DesignerServices,
    uitypes: Arc<UitypeRegistry>,
    config: DesignerConfig,
    state: SessionState,
    design: Option<ModuleDesign>,
    next_action: usize,
}

impl SessionController {
    pub fn new(
        prompt: Arc<dyn Prompt>,
        services: DesignerServices,
        uitypes: Arc<UitypeRegistry>,
        config: DesignerConfig,
    ) -> Self {
        Self {
            prompt,
            services,
            uitypes,
            config,
            state: SessionState::NoModule,
            design: None,
            next_action: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn design(&self) -> Option<&ModuleDesign> {
        self.design.as_ref()
    }

    /// Run the session until the designer exits. Validation mistakes are
    /// reported and the menu comes back; anything else aborts.
    pub async fn run(&mut self) -> DesignerResult<()> {
        self.startup().await?;
        while self.state != SessionState::Done {
            self.menu_round().await?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Startup menu
    // ------------------------------------------------------------------

    async fn startup(&mut self) -> DesignerResult<()> {
        loop {
            let drafts = self.services.drafts.list_drafts().await?;
            let mut options = Vec::new();
            for name in &drafts {
                options.push(format!("Continue designing '{name}'"));
            }
            options.push(CREATE.to_string());
            options.push(EDIT_INSTALLED.to_string());
            if !drafts.is_empty() {
                options.push(REMOVE_DRAFT.to_string());
            }
            options.push(EXIT.to_string());

            let default = options.first().cloned();
            let answer = self
                .prompt
                .choice("Where do you want to start?", &options, default.as_deref())
                .await?;

            if let Some(name) = answer
                .strip_prefix("Continue designing '")
                .and_then(|rest| rest.strip_suffix('\''))
            {
                match self.services.drafts.load_draft(name).await? {
                    Some(design) => {
                        self.prompt.info(&format!("resuming '{name}'"));
                        self.next_action = suggested_action(&design);
                        self.design = Some(design);
                        self.state = SessionState::ModuleDraft;
                        return Ok(());
                    }
                    None => {
                        self.prompt.warn(&format!("draft '{name}' is gone"));
                        continue;
                    }
                }
            }

            match answer.as_str() {
                CREATE => {
                    self.create_module().await?;
                    self.next_action = 1;
                    return Ok(());
                }
                EDIT_INSTALLED => {
                    if self.edit_installed().await? {
                        return Ok(());
                    }
                }
                REMOVE_DRAFT => self.remove_draft(&drafts).await?,
                _ => {
                    self.state = SessionState::Done;
                    return Ok(());
                }
            }
        }
    }

    async fn edit_installed(&mut self) -> DesignerResult<bool> {
        let modules = self.services.metadata.list_modules().await?;
        if modules.is_empty() {
            self.prompt.warn("no module is installed yet");
            return Ok(false);
        }
        let names: Vec<String> = modules.into_iter().map(|record| record.name).collect();
        let name = self
            .prompt
            .choice(
                "Which module do you want to edit?",
                &names,
                names.first().map(|s| s.as_str()),
            )
            .await?;

        if self.services.drafts.load_draft(&name).await?.is_some() {
            self.prompt.warn(&format!(
                "a draft named '{name}' already exists, continue that one instead"
            ));
            return Ok(false);
        }

        let design = design_from_installed(
            self.services.metadata.as_ref(),
            self.services.files.as_ref(),
            &name,
            &self.config.default_locale,
        )
        .await?;
        self.services.drafts.save_draft(&design).await?;
        self.prompt.info(&format!("editing installed module '{name}'"));
        self.next_action = suggested_action(&design);
        self.design = Some(design);
        self.state = SessionState::ModuleDraft;
        Ok(true)
    }

    async fn remove_draft(&mut self, drafts: &[String]) -> DesignerResult<()> {
        let name = self
            .prompt
            .choice("Which design should be removed?", drafts, None)
            .await?;
        if self
            .prompt
            .confirm(&format!("Really remove the draft '{name}'?"), false)
            .await?
        {
            self.services.drafts.delete_draft(&name).await?;
            self.prompt.info(&format!("draft '{name}' removed"));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Action menu
    // ------------------------------------------------------------------

    async fn menu_round(&mut self) -> DesignerResult<()> {
        let options: Vec<String> = ACTIONS.iter().map(|action| action.to_string()).collect();
        let answer = self
            .prompt
            .choice("What do you want to do?", &options, Some(ACTIONS[self.next_action]))
            .await?;
        let action = match ACTIONS.iter().position(|candidate| *candidate == answer) {
            Some(action) => action,
            None => return Ok(()),
        };

        if (1..=8).contains(&action) && self.design.is_none() {
            self.prompt.warn("create or resume a module first");
            self.next_action = 0;
            return Ok(());
        }

        let result = match action {
            0 => self.create_module().await,
            1 => self.add_tab().await,
            2 => self.add_block().await,
            3 => self.add_field().await,
            4 => self.add_related_list().await,
            5 => self.add_link().await,
            6 => self.delete_element().await,
            7 => self.install().await,
            8 => self.make_migration().await,
            _ => {
                self.state = SessionState::Done;
                Ok(())
            }
        };

        match result {
            Ok(()) => {
                self.next_action = default_after(action);
                Ok(())
            }
            Err(err) if err.is_validation() => {
                self.prompt.warn(&err.to_string());
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    // ------------------------------------------------------------------
    // Building the document
    // ------------------------------------------------------------------

    async fn create_module(&mut self) -> DesignerResult<()> {
        let name = loop {
            let raw = match self
                .prompt
                .ask("What is the name of the module? (e.g. book-type)")
                .await?
            {
                Some(raw) => raw,
                None => {
                    self.prompt.warn("the module needs a name");
                    continue;
                }
            };
            match naming::normalize_module_name(&raw) {
                Ok(name) => break name,
                Err(err) => self.prompt.warn(&err.to_string()),
            }
        };

        let mut config = ModuleConfig::new(&name);
        let label = self
            .prompt
            .ask_default("How is the module labelled?", &naming::display_label(&name))
            .await?;
        config.label_single = Some(
            self.prompt
                .ask_default("How is a single record labelled?", &label)
                .await?,
        );
        config.label = Some(label);
        config.model_class = Some(
            self.prompt
                .ask_default("Which model class backs it?", &naming::default_model_class(&name))
                .await?,
        );
        config.table_name = Some(
            self.prompt
                .ask_default("Which table stores the records?", &naming::default_table_name(&name))
                .await?,
        );
        config.table_prefix = self.prompt.ask("Table prefix? (leave empty for none)").await?;
        config.icon = self.prompt.ask("Icon? (leave empty for none)").await?;
        config.is_for_admin = self
            .prompt
            .confirm("Is the module reserved for administrators?", false)
            .await?;
        let route = self.prompt.ask_default("Default route?", DEFAULT_ROUTE).await?;
        if route != DEFAULT_ROUTE {
            config.default_route = Some(route);
        }
        config.package = self.prompt.ask("Package? (leave empty for none)").await?;
        config.locale = self
            .prompt
            .ask_default("Locale of the design?", &self.config.default_locale)
            .await?;

        let design = ModuleDesign::create(config)?;
        self.prompt.info(&format!("module '{}' started", design.name));
        self.design = Some(design);
        self.state = SessionState::ModuleDraft;
        self.persist().await?;
        Ok(())
    }

    async fn add_tab(&mut self) -> DesignerResult<()> {
        let siblings = self
            .design
            .as_ref()
            .map(|design| design.tab_labels())
            .unwrap_or_default();

        let spec = TabSpec {
            label: self
                .prompt
                .ask("Name of the tab? (leave empty for the default)")
                .await?,
            translation: self
                .prompt
                .ask("Label shown to users? (leave empty for the default)")
                .await?,
            icon: self.prompt.ask("Icon? (leave empty for none)").await?,
            placement: self.ask_placement(&siblings).await?,
            data: DataBag::new(),
        };

        let label = match self.design.as_mut() {
            Some(design) => design.add_tab(spec)?,
            None => return Ok(()),
        };
        self.prompt.info(&format!("tab '{label}' added"));
        self.persist().await?;
        Ok(())
    }

    async fn add_block(&mut self) -> DesignerResult<()> {
        let tab_labels = self
            .design
            .as_ref()
            .map(|design| design.tab_labels())
            .unwrap_or_default();
        if tab_labels.is_empty() {
            return Err(DesignError::missing_parent("block", "tab").into());
        }
        let tab = self
            .prompt
            .choice(
                "Which tab holds the block?",
                &tab_labels,
                tab_labels.last().map(|s| s.as_str()),
            )
            .await?;
        let siblings: Vec<String> = self
            .design
            .as_ref()
            .and_then(|design| design.tab_by_label(&tab))
            .map(|tab| tab.blocks.iter().map(|block| block.label.clone()).collect())
            .unwrap_or_default();

        let spec = BlockSpec {
            label: self
                .prompt
                .ask("Name of the block? (leave empty for the default)")
                .await?,
            translation: self
                .prompt
                .ask("Label shown to users? (leave empty for the default)")
                .await?,
            description: self
                .prompt
                .ask("Description? (leave empty for none)")
                .await?,
            icon: self.prompt.ask("Icon? (leave empty for none)").await?,
            placement: self.ask_placement(&siblings).await?,
            data: DataBag::new(),
        };

        let label = match self.design.as_mut() {
            Some(design) => design.add_block(&tab, spec)?,
            None => return Ok(()),
        };
        self.prompt.info(&format!("block '{label}' added to '{tab}'"));
        self.persist().await?;
        Ok(())
    }

    async fn add_field(&mut self) -> DesignerResult<()> {
        let block_labels = self
            .design
            .as_ref()
            .map(|design| design.block_labels())
            .unwrap_or_default();
        if block_labels.is_empty() {
            return Err(DesignError::missing_parent("field", "block").into());
        }
        let block = self
            .prompt
            .choice(
                "Which block holds the field?",
                &block_labels,
                block_labels.last().map(|s| s.as_str()),
            )
            .await?;

        // Check the name against the whole module before asking anything
        // else, so a typo does not cost the designer ten answers.
        let taken = self
            .design
            .as_ref()
            .map(|design| design.field_names())
            .unwrap_or_default();
        let name = loop {
            let raw = match self.prompt.ask("Name of the field? (e.g. title)").await? {
                Some(raw) => raw,
                None => {
                    self.prompt.warn("the field needs a name");
                    continue;
                }
            };
            match naming::normalize_field_name(&raw) {
                Ok(name) => {
                    if taken.contains(&name) {
                        self.prompt
                            .warn(&format!("a field called '{name}' already exists in this module"));
                        continue;
                    }
                    break name;
                }
                Err(err) => self.prompt.warn(&err.to_string()),
            }
        };

        let uitype_names = self.uitypes.names();
        let uitype = self
            .prompt
            .choice("What kind of field is it?", &uitype_names, Some("text"))
            .await?;

        let mut spec = FieldSpec::new(&name, &uitype);
        spec.translation = self
            .prompt
            .ask("Label shown to users? (leave empty for the default)")
            .await?;
        let displaytypes: Vec<String> = DISPLAYTYPES.iter().map(|d| d.to_string()).collect();
        spec.displaytype = self
            .prompt
            .choice("Where is the field displayed?", &displaytypes, Some("everywhere"))
            .await?;
        spec.required = self.prompt.confirm("Is the field required?", false).await?;
        spec.display_in_filter = self
            .prompt
            .confirm("Show it in the list filter?", true)
            .await?;
        spec.large = self
            .prompt
            .confirm("Does it span the full width?", false)
            .await?;
        spec.default_value = self
            .prompt
            .ask("Default value? (leave empty for none)")
            .await?;
        spec.info = self.prompt.ask("Help text? (leave empty for none)").await?;
        if let Some(rules) = self
            .prompt
            .ask("Extra validation rules? (pipe separated, leave empty for none)")
            .await?
        {
            spec.extra_rules = rules
                .split('|')
                .map(|rule| rule.trim().to_string())
                .filter(|rule| !rule.is_empty())
                .collect();
        }

        if let Some(handler) = self.uitypes.get(&uitype) {
            let modules: Vec<String> = self
                .services
                .metadata
                .list_modules()
                .await?
                .into_iter()
                .map(|record| record.name)
                .collect();
            if let Some(design) = self.design.as_ref() {
                let ctx = OptionContext {
                    design,
                    modules: &modules,
                };
                handler
                    .collect_options(self.prompt.as_ref(), &ctx, &mut spec.data)
                    .await?;
            }
        }

        let siblings: Vec<String> = self
            .design
            .as_ref()
            .and_then(|design| design.block_by_label(&block))
            .map(|block| block.fields.iter().map(|field| field.name.clone()).collect())
            .unwrap_or_default();
        spec.placement = self.ask_placement(&siblings).await?;

        let added = match self.design.as_mut() {
            Some(design) => design.add_field(&block, spec)?,
            None => return Ok(()),
        };
        self.prompt.info(&format!("field '{added}' added to '{block}'"));
        self.persist().await?;
        Ok(())
    }

    async fn add_related_list(&mut self) -> DesignerResult<()> {
        let modules: Vec<String> = self
            .services
            .metadata
            .list_modules()
            .await?
            .into_iter()
            .map(|record| record.name)
            .collect();
        if modules.is_empty() {
            self.prompt
                .warn("no module is installed yet, install one before relating to it");
            return Ok(());
        }
        let related_module = self
            .prompt
            .choice(
                "Which module does the list show?",
                &modules,
                modules.first().map(|s| s.as_str()),
            )
            .await?;

        let kinds = vec!["n-1".to_string(), "n-n".to_string()];
        let kind_answer = self
            .prompt
            .choice(
                "Relation type? (n-1 lists records pointing here, n-n is many to many)",
                &kinds,
                Some("n-1"),
            )
            .await?;
        let kind = if kind_answer == "n-n" {
            RelatedListKind::ManyToMany
        } else {
            RelatedListKind::ManyToOne
        };

        let mut spec = RelatedListSpec::new(kind, &related_module);
        if kind == RelatedListKind::ManyToOne {
            spec.related_field = self
                .prompt
                .ask(&format!(
                    "Which field of '{related_module}' points back? (leave empty for none)"
                ))
                .await?;
        }

        let tab_labels = self
            .design
            .as_ref()
            .map(|design| design.tab_labels())
            .unwrap_or_default();
        if !tab_labels.is_empty() {
            let mut options = tab_labels;
            options.push(NO_TAB.to_string());
            let tab = self
                .prompt
                .choice("Which tab hosts the list?", &options, Some(NO_TAB))
                .await?;
            if tab != NO_TAB {
                spec.tab = Some(tab);
            }
        }

        spec.label = self
            .prompt
            .ask("Name of the related list? (leave empty for the default)")
            .await?;
        spec.translation = self
            .prompt
            .ask("Label shown to users? (leave empty for the default)")
            .await?;
        spec.method = self
            .prompt
            .ask("Accessor method? (leave empty for the default)")
            .await?;
        spec.icon = self.prompt.ask("Icon? (leave empty for none)").await?;
        if let Some(actions) = self
            .prompt
            .ask("Row actions? (comma separated, leave empty for none)")
            .await?
        {
            spec.actions = actions
                .split(',')
                .map(|action| action.trim().to_string())
                .filter(|action| !action.is_empty())
                .collect();
        }

        let siblings: Vec<String> = self
            .design
            .as_ref()
            .map(|design| design.related_lists.iter().map(|list| list.label.clone()).collect())
            .unwrap_or_default();
        spec.placement = self.ask_placement(&siblings).await?;

        let label = match self.design.as_mut() {
            Some(design) => design.add_related_list(spec)?,
            None => return Ok(()),
        };
        self.prompt.info(&format!("related list '{label}' added"));
        self.persist().await?;
        Ok(())
    }

    async fn add_link(&mut self) -> DesignerResult<()> {
        let kinds = vec!["detail".to_string(), "detail.action".to_string()];
        let kind_answer = self
            .prompt
            .choice("Where does the link appear?", &kinds, Some("detail"))
            .await?;
        let kind = if kind_answer == "detail.action" {
            LinkKind::DetailAction
        } else {
            LinkKind::Detail
        };

        let url = loop {
            match self.prompt.ask("Which URL does the link open?").await? {
                Some(url) => break url,
                None => self.prompt.warn("the link needs a URL"),
            }
        };

        let mut spec = LinkSpec::new(kind, &url);
        spec.label = self
            .prompt
            .ask("Name of the link? (leave empty for the default)")
            .await?;
        spec.translation = self
            .prompt
            .ask("Label shown to users? (leave empty for the default)")
            .await?;
        spec.icon = self.prompt.ask("Icon? (leave empty for none)").await?;

        let action_types: Vec<String> = ["link", "ajax", "modal"]
            .iter()
            .map(|value| value.to_string())
            .collect();
        let action_type = self
            .prompt
            .choice("What does the link trigger?", &action_types, Some("link"))
            .await?;
        spec.data.set("actionType", action_type.as_str());

        if self
            .prompt
            .confirm("Show a confirm dialog first?", false)
            .await?
        {
            spec.data.set("confirm", true);
            if self
                .prompt
                .confirm("Customize the confirm dialog?", false)
                .await?
            {
                let title = self
                    .prompt
                    .ask_default("Dialog title?", "Are you sure?")
                    .await?;
                let confirm_text = self
                    .prompt
                    .ask_default("Confirm button text?", "Yes")
                    .await?;
                let confirm_color = self
                    .prompt
                    .ask_default("Confirm button color?", "#DD6B55")
                    .await?;
                let close_on_confirm = self
                    .prompt
                    .confirm("Close the dialog on confirm?", true)
                    .await?;
                spec.data.set(
                    "dialog",
                    json!({
                        "title": title,
                        "confirmButtonText": confirm_text,
                        "confirmButtonColor": confirm_color,
                        "closeOnConfirm": close_on_confirm,
                    }),
                );
            }
        }

        match action_type.as_str() {
            "ajax" => {
                let methods: Vec<String> = ["get", "post", "put", "delete", "patch"]
                    .iter()
                    .map(|value| value.to_string())
                    .collect();
                let method = self
                    .prompt
                    .choice("HTTP method?", &methods, Some("get"))
                    .await?;
                spec.data.set("method", method.as_str());
                if let Some(params) = self
                    .prompt
                    .ask("Query params? (leave empty for none)")
                    .await?
                {
                    spec.data.set("params", params.as_str());
                }
                if self
                    .prompt
                    .confirm("Update part of the page with the response?", false)
                    .await?
                {
                    if let Some(selector) = self
                        .prompt
                        .ask("CSS selector of the element to update?")
                        .await?
                    {
                        spec.data.set("elementToUpdate", selector.as_str());
                    }
                }
            }
            "modal" => {
                if let Some(modal_id) = self.prompt.ask("Id of the modal to open?").await? {
                    spec.data.set("modalId", modal_id.as_str());
                }
            }
            _ => {
                if let Some(target) = self
                    .prompt
                    .ask("Link target? (e.g. _blank, leave empty for none)")
                    .await?
                {
                    spec.data.set("target", target.as_str());
                }
            }
        }

        let siblings: Vec<String> = self
            .design
            .as_ref()
            .map(|design| design.links.iter().map(|link| link.label.clone()).collect())
            .unwrap_or_default();
        spec.placement = self.ask_placement(&siblings).await?;

        let label = match self.design.as_mut() {
            Some(design) => design.add_link(spec)?,
            None => return Ok(()),
        };
        self.prompt.info(&format!("link '{label}' added"));
        self.persist().await?;
        Ok(())
    }

    async fn delete_element(&mut self) -> DesignerResult<()> {
        let kinds = vec![
            "A tab".to_string(),
            "A block".to_string(),
            "A field".to_string(),
            "A related list".to_string(),
            "A link".to_string(),
        ];
        let kind_answer = self
            .prompt
            .choice("What should be deleted?", &kinds, None)
            .await?;
        let kind = match kind_answer.as_str() {
            "A tab" => ElementKind::Tab,
            "A block" => ElementKind::Block,
            "A field" => ElementKind::Field,
            "A related list" => ElementKind::RelatedList,
            _ => ElementKind::Link,
        };

        let candidates: Vec<String> = match self.design.as_ref() {
            Some(design) => match kind {
                ElementKind::Tab => design.tab_labels(),
                ElementKind::Block => design.block_labels(),
                ElementKind::Field => design.field_names(),
                ElementKind::RelatedList => design
                    .related_lists
                    .iter()
                    .map(|list| list.label.clone())
                    .collect(),
                ElementKind::Link => design.links.iter().map(|link| link.label.clone()).collect(),
            },
            None => Vec::new(),
        };
        if candidates.is_empty() {
            self.prompt.warn(&format!("there is no {kind} to delete"));
            return Ok(());
        }

        let target = self
            .prompt
            .choice(&format!("Which {kind} should be deleted?"), &candidates, None)
            .await?;
        if !self
            .prompt
            .confirm(
                &format!("Really delete '{target}'? Contained elements and translations go with it."),
                false,
            )
            .await?
        {
            return Ok(());
        }

        match self.design.as_mut() {
            Some(design) => design.delete_element(kind, &target)?,
            None => return Ok(()),
        }
        self.prompt.info(&format!("{kind} '{target}' deleted"));
        self.persist().await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Install and migration
    // ------------------------------------------------------------------

    async fn install(&mut self) -> DesignerResult<()> {
        let name = match self.design.as_ref() {
            Some(design) => design.name.clone(),
            None => return Ok(()),
        };
        if !self
            .prompt
            .confirm(&format!("Install '{name}' now?"), true)
            .await?
        {
            return Ok(());
        }

        self.state = SessionState::Installing;
        let installer = Installer::new(
            self.services.metadata.clone(),
            self.services.schema.clone(),
            self.services.files.clone(),
            self.uitypes.clone(),
        );
        let result = match self.design.as_mut() {
            Some(design) => installer.install(design).await,
            None => return Ok(()),
        };
        // The document now carries any ids allocated before a failure, so
        // saving it either way keeps the next run an update, not a duplicate.
        self.state = SessionState::ModuleDraft;
        self.persist().await?;

        match result {
            Ok(report) => self.report_install(&report),
            Err(err) => {
                self.prompt.warn(&format!("installation failed: {err}"));
                self.prompt
                    .info("the draft is saved, fix the document and install again");
            }
        }
        Ok(())
    }

    fn report_install(&self, report: &InstallReport) {
        if report.module_created {
            self.prompt
                .info(&format!("module '{}' installed for the first time", report.module));
        } else {
            self.prompt.info(&format!("module '{}' updated", report.module));
        }
        if report.table_created {
            self.prompt.info(&format!("table '{}' created", report.table));
        } else {
            if !report.columns_added.is_empty() {
                self.prompt.info(&format!(
                    "columns added to '{}': {}",
                    report.table,
                    report.columns_added.join(", ")
                ));
            }
            if !report.columns_relaxed.is_empty() {
                self.prompt.info(&format!(
                    "columns now nullable: {}",
                    report.columns_relaxed.join(", ")
                ));
            }
        }
        self.prompt.info(&format!(
            "structure: {} tabs, {} blocks, {} fields ({} retired)",
            report.tabs.created + report.tabs.updated,
            report.blocks.created + report.blocks.updated,
            report.fields.created + report.fields.updated,
            report.fields.retired,
        ));
        self.prompt.info(&format!(
            "translations: {} file(s), model: {}",
            report.translation_files.len(),
            report.model_file,
        ));
        if let Some(previous) = &report.model_renamed_to {
            self.prompt
                .info(&format!("previous model kept at {previous}"));
        }
    }

    async fn make_migration(&mut self) -> DesignerResult<()> {
        let artifact = match self.design.as_ref() {
            Some(design) => MigrationGenerator::new().generate(
                design,
                self.uitypes.as_ref(),
                self.services.files.as_ref(),
                Utc::now(),
            )?,
            None => return Ok(()),
        };
        self.prompt
            .info(&format!("migration written to {}", artifact.path));
        Ok(())
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    async fn ask_placement(&self, siblings: &[String]) -> DesignerResult<Placement> {
        if siblings.is_empty() {
            return Ok(Placement::End);
        }
        let mut options = Vec::new();
        for label in siblings {
            options.push(format!("Before - {label}"));
            options.push(format!("After - {label}"));
        }
        options.push("At the end".to_string());
        let answer = self
            .prompt
            .choice("Where should it go?", &options, Some("At the end"))
            .await?;
        if let Some(target) = answer.strip_prefix("Before - ") {
            Ok(Placement::Before(target.to_string()))
        } else if let Some(target) = answer.strip_prefix("After - ") {
            Ok(Placement::After(target.to_string()))
        } else {
            Ok(Placement::End)
        }
    }

    async fn persist(&self) -> DesignerResult<()> {
        if let Some(design) = &self.design {
            self.services.drafts.save_draft(design).await?;
        }
        Ok(())
    }
}
