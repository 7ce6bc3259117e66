//! Module Designer CLI
//!
//! Interactive module scaffolding: design a module through guided questions,
//! keep it as a draft, install it into storage.
//!
//! # Usage
//!
//! ```bash
//! # Run the interactive session
//! designer_cli design
//!
//! # List drafts and installed modules
//! designer_cli list
//!
//! # Print a saved draft
//! designer_cli show book-type
//!
//! # Install a saved draft directly
//! designer_cli install book-type
//! ```
//!
//! With DATABASE_URL set (and the `database` feature compiled in) state goes
//! to Postgres, otherwise everything runs against an in-memory store.

use std::process::ExitCode;
use std::sync::Arc;

#[cfg(feature = "database")]
use anyhow::Context;
use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;

use module_designer::artifacts::{ArtifactFs, DirFs};
use module_designer::config::DesignerConfig;
use module_designer::prompt::ReadlinePrompt;
use module_designer::session::{DesignerServices, SessionController};
use module_designer::store::{DraftStore, MemoryStore, MetadataStore};
use module_designer::uitype::UitypeRegistry;
use module_designer::Installer;

#[derive(Parser)]
#[command(name = "designer_cli")]
#[command(version = "0.1.0")]
#[command(about = "Design application modules interactively and install them")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Allow installs outside a development environment
    #[arg(long, global = true)]
    force: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the interactive design session
    Design,

    /// List saved drafts and installed modules
    List,

    /// Print a saved draft as JSON
    Show {
        /// Draft name (the module name)
        name: String,
    },

    /// Install a saved draft without the interactive session
    Install {
        /// Draft name (the module name)
        name: String,
    },
}

// =============================================================================
// MAIN
// =============================================================================

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let cli = Cli::parse();
    let config = DesignerConfig::from_env();

    // Designing and installing touch schemas and files; keep that away from
    // production environments unless explicitly forced.
    let mutating = matches!(cli.command, Commands::Design | Commands::Install { .. });
    if mutating && !config.is_development() && !cli.force {
        eprintln!(
            "{}: APP_ENV is '{}', refusing to run (use --force to override)",
            "error".red().bold(),
            config.app_env
        );
        return ExitCode::FAILURE;
    }

    let services = match build_services(&config).await {
        Ok(services) => services,
        Err(err) => {
            eprintln!("{}: {:#}", "error".red().bold(), err);
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        Commands::Design => cmd_design(services, config).await,
        Commands::List => cmd_list(&services).await,
        Commands::Show { name } => cmd_show(&services, &name).await,
        Commands::Install { name } => cmd_install(&services, &name).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}: {:#}", "error".red().bold(), err);
            ExitCode::FAILURE
        }
    }
}

// =============================================================================
// COMMAND IMPLEMENTATIONS
// =============================================================================

async fn cmd_design(services: DesignerServices, config: DesignerConfig) -> Result<()> {
    let prompt = Arc::new(ReadlinePrompt::new()?);
    let uitypes = Arc::new(UitypeRegistry::with_defaults());
    let mut session = SessionController::new(prompt, services, uitypes, config);
    session.run().await?;
    Ok(())
}

async fn cmd_list(services: &DesignerServices) -> Result<()> {
    let drafts = services.drafts.list_drafts().await?;
    println!("{}", "Drafts".cyan().bold());
    if drafts.is_empty() {
        println!("  {}", "(none)".dimmed());
    }
    for name in drafts {
        println!("  {name}");
    }

    let modules = services.metadata.list_modules().await?;
    println!();
    println!("{}", "Installed modules".cyan().bold());
    if modules.is_empty() {
        println!("  {}", "(none)".dimmed());
    }
    for module in modules {
        println!("  {} {}", module.name.green(), module.model_class.dimmed());
    }
    Ok(())
}

async fn cmd_show(services: &DesignerServices, name: &str) -> Result<()> {
    let design = services
        .drafts
        .load_draft(name)
        .await?
        .ok_or_else(|| anyhow!("no draft named '{name}'"))?;
    let rendered = serde_json::to_string_pretty(&design)?;
    println!("{rendered}");
    Ok(())
}

async fn cmd_install(services: &DesignerServices, name: &str) -> Result<()> {
    let mut design = services
        .drafts
        .load_draft(name)
        .await?
        .ok_or_else(|| anyhow!("no draft named '{name}'"))?;

    let installer = Installer::new(
        services.metadata.clone(),
        services.schema.clone(),
        services.files.clone(),
        Arc::new(UitypeRegistry::with_defaults()),
    );
    let report = installer.install(&mut design).await?;

    // The document now carries the allocated row ids; save it back so the
    // next install updates instead of duplicating.
    services.drafts.save_draft(&design).await?;

    println!("{} module '{}' installed", "OK".green().bold(), report.module);
    println!(
        "  table: {}{}",
        report.table,
        if report.table_created { " (created)" } else { "" }
    );
    if !report.columns_added.is_empty() {
        println!("  columns added: {}", report.columns_added.join(", "));
    }
    if !report.columns_relaxed.is_empty() {
        println!("  columns relaxed: {}", report.columns_relaxed.join(", "));
    }
    println!(
        "  tabs: {}, blocks: {}, fields: {} ({} retired)",
        report.tabs.created + report.tabs.updated,
        report.blocks.created + report.blocks.updated,
        report.fields.created + report.fields.updated,
        report.fields.retired
    );
    for file in &report.translation_files {
        println!("  translations: {file}");
    }
    println!("  model: {}", report.model_file);
    if let Some(previous) = &report.model_renamed_to {
        println!("  previous model: {previous}");
    }
    Ok(())
}

// =============================================================================
// HELPERS
// =============================================================================

async fn build_services(config: &DesignerConfig) -> Result<DesignerServices> {
    let files: Arc<dyn ArtifactFs> = Arc::new(DirFs::new(&config.artifact_dir));

    #[cfg(feature = "database")]
    if let Some(database_url) = &config.database_url {
        let store = module_designer::store::PgStore::connect(database_url)
            .await
            .context("database connection failed")?;
        store.ensure_schema().await.context("schema setup failed")?;
        let store = Arc::new(store);
        return Ok(DesignerServices {
            drafts: store.clone(),
            metadata: store.clone(),
            schema: store,
            files,
        });
    }

    #[cfg(not(feature = "database"))]
    if config.database_url.is_some() {
        eprintln!(
            "{}: DATABASE_URL is set but this build has no database support, using the in-memory store",
            "warning".yellow().bold()
        );
    }

    let store = Arc::new(MemoryStore::new());
    Ok(DesignerServices {
        drafts: store.clone(),
        metadata: store.clone(),
        schema: store,
        files,
    })
}
