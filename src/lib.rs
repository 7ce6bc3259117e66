//! Module Designer - guided module scaffolding
//!
//! This crate builds application modules interactively. A session asks the
//! designer questions and grows a design document out of the answers; the
//! installer then reconciles that document against storage, creating or
//! updating metadata rows, the physical table, translation files and the
//! generated model source. Documents survive as drafts between sessions and
//! re-installing an unchanged document changes nothing.
//!
//! ## How a module comes together
//! Answers -> Design Document -> Draft Store (after every change)
//!                            -> Installer -> metadata + table + files
//!
//! ## Quick Start
//!
//! ```rust
//! use module_designer::document::{BlockSpec, FieldSpec, ModuleConfig, ModuleDesign, TabSpec};
//!
//! let mut design = ModuleDesign::create(ModuleConfig::new("book-type")).unwrap();
//! design.add_tab(TabSpec::default()).unwrap();
//! design.add_block("tab.main", BlockSpec::default()).unwrap();
//!
//! let mut title = FieldSpec::new("title", "text");
//! title.required = true;
//! design.add_field("block.general", title).unwrap();
//!
//! assert_eq!(design.table(), "book_types");
//! assert_eq!(design.translation("field.title"), Some("Title"));
//! ```

// Core error handling
pub mod error;

// The design document and its editing operations
pub mod document;

// Draft, metadata and schema storage
pub mod store;

// Field kinds: column mapping plus kind-specific questions
pub mod uitype;

// Generated artifacts: translation files, model sources, migrations
pub mod artifacts;

// The question-and-answer surface
pub mod prompt;

// Reconciling a document against storage
pub mod install;

// The interactive design session
pub mod session;

// Runtime configuration
pub mod config;

// Public re-exports for the common path
pub use config::DesignerConfig;
pub use document::{ModuleConfig, ModuleDesign};
pub use error::{DesignerError, DesignerResult};
pub use install::{InstallReport, Installer};
pub use session::{DesignerServices, SessionController, SessionState};
pub use uitype::UitypeRegistry;

// Storage backends
pub use store::MemoryStore;
#[cfg(feature = "database")]
pub use store::PgStore;
