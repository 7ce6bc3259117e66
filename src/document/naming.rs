//! Name normalization and derived-name defaults
//!
//! Module names are kebab-case, field names snake_case. Everything else a
//! design needs (table name, model class, display labels) is derived from
//! the module name and only stored when the user overrides the default.

use std::sync::OnceLock;

use convert_case::{Case, Casing};
use regex::Regex;

use crate::error::{DesignError, DesignResult};

fn module_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[a-z0-9-]+$").unwrap())
}

fn field_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[a-z0-9_]+$").unwrap())
}

/// Normalize a raw module name to kebab-case and validate it.
pub fn normalize_module_name(raw: &str) -> DesignResult<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DesignError::invalid_name(raw, "module names cannot be empty"));
    }

    let name = trimmed.to_case(Case::Kebab);
    if !module_name_pattern().is_match(&name) {
        return Err(DesignError::invalid_name(
            raw,
            "module names may only contain lowercase letters, digits and dashes",
        ));
    }

    Ok(name)
}

/// Normalize a raw field name to snake_case and validate it.
pub fn normalize_field_name(raw: &str) -> DesignResult<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DesignError::invalid_name(raw, "field names cannot be empty"));
    }

    let name = trimmed.to_case(Case::Snake);
    if !field_name_pattern().is_match(&name) {
        return Err(DesignError::invalid_name(
            raw,
            "field names may only contain lowercase letters, digits and underscores",
        ));
    }

    Ok(name)
}

/// Naive English pluralization, good enough for table names.
pub fn pluralize(word: &str) -> String {
    let lower = word.to_lowercase();
    if lower.ends_with('s')
        || lower.ends_with('x')
        || lower.ends_with('z')
        || lower.ends_with("ch")
        || lower.ends_with("sh")
    {
        format!("{word}es")
    } else if let Some(stem) = word.strip_suffix('y') {
        let penultimate = stem.chars().last();
        match penultimate {
            Some(c) if !"aeiou".contains(c.to_ascii_lowercase()) => format!("{stem}ies"),
            _ => format!("{word}s"),
        }
    } else {
        format!("{word}s")
    }
}

/// Default table name for a module: snake_case, pluralized.
/// `book-type` becomes `book_types`.
pub fn default_table_name(module_name: &str) -> String {
    pluralize(&module_name.to_case(Case::Snake))
}

/// Default model class path for a module. `book-type` becomes
/// `app::models::BookType`.
pub fn default_model_class(module_name: &str) -> String {
    format!("app::models::{}", module_name.to_case(Case::Pascal))
}

/// Human-readable label from a kebab or snake identifier.
pub fn display_label(identifier: &str) -> String {
    identifier.to_case(Case::Title)
}

/// Short type name of a model class path (`app::models::BookType` gives
/// `BookType`).
pub fn model_struct_name(model_class: &str) -> &str {
    model_class.rsplit("::").next().unwrap_or(model_class)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_name_is_kebab_cased() {
        assert_eq!(normalize_module_name("Book Type").unwrap(), "book-type");
        assert_eq!(normalize_module_name("book_type").unwrap(), "book-type");
        assert_eq!(normalize_module_name("invoice").unwrap(), "invoice");
    }

    #[test]
    fn test_empty_module_name_rejected() {
        let err = normalize_module_name("   ").unwrap_err();
        assert!(matches!(err, DesignError::InvalidName { .. }));
    }

    #[test]
    fn test_field_name_is_snake_cased() {
        assert_eq!(normalize_field_name("Unit Price").unwrap(), "unit_price");
        assert_eq!(normalize_field_name("title").unwrap(), "title");
    }

    #[test]
    fn test_table_name_pluralizes() {
        assert_eq!(default_table_name("book-type"), "book_types");
        assert_eq!(default_table_name("invoice"), "invoices");
        assert_eq!(default_table_name("category"), "categories");
        assert_eq!(default_table_name("address"), "addresses");
    }

    #[test]
    fn test_model_class_default() {
        assert_eq!(default_model_class("book-type"), "app::models::BookType");
        assert_eq!(model_struct_name("app::models::BookType"), "BookType");
    }

    #[test]
    fn test_display_label() {
        assert_eq!(display_label("book-type"), "Book Type");
        assert_eq!(display_label("unit_price"), "Unit Price");
    }
}
