//! Translation files
//!
//! One JSON file per locale and module under `lang/<locale>/<module>.json`.
//! Writing merges the document's entries over the existing file (document
//! wins on key collision), drops every key queued in
//! `translations_to_remove`, and serializes with sorted keys so repeated
//! installs produce identical bytes.

use std::collections::BTreeMap;

use crate::document::ModuleDesign;
use crate::error::DesignerResult;

use super::ArtifactFs;

pub fn lang_path(locale: &str, module: &str) -> String {
    format!("lang/{locale}/{module}.json")
}

/// Load one translation file as a key → text map. Missing file means empty.
pub fn load(
    files: &dyn ArtifactFs,
    locale: &str,
    module: &str,
) -> DesignerResult<BTreeMap<String, String>> {
    match files.read(&lang_path(locale, module))? {
        Some(contents) => Ok(serde_json::from_str(&contents)?),
        None => Ok(BTreeMap::new()),
    }
}

/// Locales that already have a translation file for `module`.
pub fn locales_for(files: &dyn ArtifactFs, module: &str) -> DesignerResult<Vec<String>> {
    let suffix = format!("/{module}.json");
    let mut locales: Vec<String> = files
        .list("lang")?
        .into_iter()
        .filter(|path| path.ends_with(&suffix))
        .filter_map(|path| {
            path.strip_prefix("lang/")
                .and_then(|rest| rest.split('/').next())
                .map(str::to_string)
        })
        .collect();
    locales.sort();
    locales.dedup();
    Ok(locales)
}

/// Merge and write every locale the design carries. Returns the paths of
/// the module's translation files; files whose content would not change are
/// left untouched.
pub fn write_merged(files: &dyn ArtifactFs, design: &ModuleDesign) -> DesignerResult<Vec<String>> {
    let mut written = Vec::new();

    for (locale, entries) in &design.translations {
        let path = lang_path(locale, &design.name);
        let mut merged = load(files, locale, &design.name)?;

        for (key, text) in entries {
            merged.insert(key.clone(), text.clone());
        }
        for key in &design.translations_to_remove {
            merged.remove(key);
        }

        let mut contents = serde_json::to_string_pretty(&merged)?;
        contents.push('\n');

        let unchanged = files.read(&path)?.as_deref() == Some(contents.as_str());
        if !unchanged {
            files.write(&path, &contents)?;
        }
        written.push(path);
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::MemoryFs;
    use crate::document::{ModuleConfig, TabSpec};

    fn design_with_tab() -> ModuleDesign {
        let mut design = ModuleDesign::create(ModuleConfig::new("book-type")).unwrap();
        design.add_tab(TabSpec::default()).unwrap();
        design
    }

    #[test]
    fn test_merge_keeps_foreign_keys_and_prefers_document() {
        let files = MemoryFs::new();
        files
            .write(
                "lang/en/book-type.json",
                "{\"custom.note\": \"hand written\", \"tab.main\": \"Old Main\"}",
            )
            .unwrap();

        let design = design_with_tab();
        let written = write_merged(&files, &design).unwrap();
        assert_eq!(written, vec!["lang/en/book-type.json"]);

        let merged = load(&files, "en", "book-type").unwrap();
        assert_eq!(merged.get("custom.note").map(String::as_str), Some("hand written"));
        assert_eq!(merged.get("tab.main").map(String::as_str), Some("Main"));
        assert_eq!(merged.get("book-type").map(String::as_str), Some("Book Type"));
    }

    #[test]
    fn test_removals_are_applied() {
        let files = MemoryFs::new();
        let mut design = design_with_tab();
        write_merged(&files, &design).unwrap();

        design
            .delete_element(crate::document::ElementKind::Tab, "tab.main")
            .unwrap();
        write_merged(&files, &design).unwrap();

        let merged = load(&files, "en", "book-type").unwrap();
        assert!(!merged.contains_key("tab.main"));
        assert!(merged.contains_key("book-type"));
    }

    #[test]
    fn test_rewrite_is_stable() {
        let files = MemoryFs::new();
        let design = design_with_tab();

        write_merged(&files, &design).unwrap();
        let first = files.read("lang/en/book-type.json").unwrap().unwrap();

        write_merged(&files, &design).unwrap();
        let second = files.read("lang/en/book-type.json").unwrap().unwrap();
        assert_eq!(first, second);
        assert!(first.ends_with('\n'));
    }
}
