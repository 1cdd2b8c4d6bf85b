//! Template storage and management
//!
//! Templates live in memory, keyed by name. On disk they are laid out as
//! `<base>/<category>/<name>.<ext>` text files, or as `{ prompts: [...] }`
//! YAML documents inside a category directory.
//!
//! The disk copy is only touched by [`TemplateStore::open`] (read) and
//! [`TemplateStore::save`] (write). Removing a template never deletes files.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::document::{self, ExportFormat};
use crate::error::{PromptError, Result};

/// Category used when a template does not name one
pub const DEFAULT_CATEGORY: &str = "general";

/// Type tag used when a template does not name one
pub const DEFAULT_KIND: &str = "text";

/// Extension written by [`TemplateStore::save`]
pub const TEMPLATE_EXTENSION: &str = "template";

/// Extensions loaded as one template per file
const TEXT_EXTENSIONS: &[&str] = &["txt", "md", TEMPLATE_EXTENSION];

/// Extensions loaded as prompt documents
const DOCUMENT_EXTENSIONS: &[&str] = &["yaml", "yml"];

/// A stored prompt template
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    /// Unique template name
    pub name: String,
    /// Grouping label, also the storage subdirectory
    pub category: String,
    /// Raw template text
    pub content: String,
    /// Free-form type tag, not interpreted by the compiler
    #[serde(rename = "type")]
    pub kind: String,
    /// Opaque caller metadata
    pub metadata: Map<String, Value>,
    /// File this template was loaded from
    pub file_path: Option<PathBuf>,
    /// File mtime on load, creation time otherwise
    pub last_modified: DateTime<Utc>,
}

/// Template store - owns the template collection and its directory
#[derive(Debug)]
pub struct TemplateStore {
    /// Prompts directory
    base_dir: PathBuf,
    /// Templates keyed by name, in insertion order
    templates: IndexMap<String, Template>,
}

impl TemplateStore {
    /// Open a store rooted at `base_dir`, creating the directory if needed
    /// and loading every template found under it
    pub fn open(base_dir: impl Into<PathBuf>) -> Result<Self> {
        let base_dir = base_dir.into();
        fs::create_dir_all(&base_dir).map_err(|e| PromptError::io(&base_dir, e))?;

        let mut store = Self::in_memory(base_dir);
        store.load()?;

        info!(
            dir = %store.base_dir.display(),
            templates = store.templates.len(),
            "loaded prompt templates"
        );
        Ok(store)
    }

    /// Create an empty store without scanning `base_dir`.
    ///
    /// The directory is only used if [`TemplateStore::save`] is called.
    pub fn in_memory(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            templates: IndexMap::new(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Scan category directories under the base directory
    fn load(&mut self) -> Result<()> {
        let walker = WalkDir::new(&self.base_dir)
            .min_depth(2)
            .max_depth(2)
            .follow_links(true)
            .sort_by_file_name();

        for entry in walker {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            match path.extension().and_then(|e| e.to_str()) {
                Some(ext) if TEXT_EXTENSIONS.contains(&ext) => self.load_text_file(path)?,
                Some(ext) if DOCUMENT_EXTENSIONS.contains(&ext) => self.load_document_file(path)?,
                _ => debug!(path = %path.display(), "skipping non-template file"),
            }
        }

        Ok(())
    }

    /// Load a text file as a single template
    fn load_text_file(&mut self, path: &Path) -> Result<()> {
        let content = fs::read_to_string(path).map_err(|e| PromptError::io(path, e))?;
        let name = file_label(path.file_stem());
        let category = file_label(path.parent().and_then(Path::file_name));

        debug!(name = %name, category = %category, "loaded template file");

        self.insert(Template {
            name,
            category,
            content,
            kind: DEFAULT_KIND.to_string(),
            metadata: Map::new(),
            file_path: Some(path.to_path_buf()),
            last_modified: modified_time(path)?,
        });
        Ok(())
    }

    /// Load every entry of a `{ prompts: [...] }` document
    fn load_document_file(&mut self, path: &Path) -> Result<()> {
        let content = fs::read_to_string(path).map_err(|e| PromptError::io(path, e))?;
        let records = document::decode_prompt_document(&content, &path.display().to_string())?;

        if records.is_empty() {
            warn!(path = %path.display(), "prompt document has no prompts");
            return Ok(());
        }

        let last_modified = modified_time(path)?;
        debug!(path = %path.display(), count = records.len(), "loaded prompt document");

        for record in records {
            self.insert(record.into_template(Some(path.to_path_buf()), last_modified));
        }
        Ok(())
    }

    fn insert(&mut self, template: Template) {
        self.templates.insert(template.name.clone(), template);
    }

    /// Add or replace a template.
    ///
    /// String `category` and `type` keys in `metadata` set those fields;
    /// the metadata map itself is stored unchanged.
    pub fn add_template(
        &mut self,
        name: impl Into<String>,
        content: impl Into<String>,
        metadata: Map<String, Value>,
    ) {
        let category = metadata_label(&metadata, "category", DEFAULT_CATEGORY);
        let kind = metadata_label(&metadata, "type", DEFAULT_KIND);

        self.insert(Template {
            name: name.into(),
            category,
            content: content.into(),
            kind,
            metadata,
            file_path: None,
            last_modified: Utc::now(),
        });
    }

    /// Get a template by name
    pub fn get_template(&self, name: &str) -> Option<&Template> {
        self.templates.get(name)
    }

    /// All templates, in insertion order
    pub fn list_templates(&self) -> impl Iterator<Item = &Template> + '_ {
        self.templates.values()
    }

    /// Templates in one category, in insertion order
    pub fn list_by_category<'a>(&'a self, category: &'a str) -> impl Iterator<Item = &'a Template> + 'a {
        self.templates.values().filter(move |t| t.category == category)
    }

    /// Sorted, deduplicated category labels
    pub fn categories(&self) -> Vec<&str> {
        let mut categories: Vec<&str> = self.templates.values().map(|t| t.category.as_str()).collect();
        categories.sort_unstable();
        categories.dedup();
        categories
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Remove a template from memory.
    ///
    /// Files on disk are left alone; a reopened store will load them again.
    pub fn remove_template(&mut self, name: &str) -> Option<Template> {
        self.templates.shift_remove(name)
    }

    /// Write every template to `<base>/<category>/<name>.template`.
    ///
    /// Every name and category is checked before the first write, so a
    /// template that would land outside the base directory writes nothing.
    /// Otherwise not transactional: on an IO error, files written before the
    /// failure stay.
    pub fn save(&self) -> Result<()> {
        for template in self.templates.values() {
            check_path_component("category", &template.category)?;
            check_path_component("name", &template.name)?;
        }

        for template in self.templates.values() {
            let category_dir = self.base_dir.join(&template.category);
            fs::create_dir_all(&category_dir).map_err(|e| PromptError::io(&category_dir, e))?;

            let path = category_dir.join(format!("{}.{}", template.name, TEMPLATE_EXTENSION));
            fs::write(&path, &template.content).map_err(|e| PromptError::io(&path, e))?;
        }

        info!(
            dir = %self.base_dir.display(),
            templates = self.templates.len(),
            "saved prompt templates"
        );
        Ok(())
    }

    /// Serialize every template
    pub fn export(&self, format: ExportFormat) -> Result<String> {
        document::encode(self.templates.values(), format)
    }

    /// Merge templates from a serialized document, replacing by name.
    ///
    /// The whole document is decoded before anything is merged, so a
    /// malformed document leaves the store unchanged. Returns the number of
    /// templates merged.
    pub fn import(&mut self, data: &str, format: ExportFormat) -> Result<usize> {
        let records = document::decode(data, format, "import data")?;
        let count = records.len();

        for record in records {
            self.insert(record.into_imported());
        }

        info!(templates = count, format = %format, "imported prompt templates");
        Ok(count)
    }

    /// Export to a file
    pub fn export_to_file(&self, path: &Path, format: ExportFormat) -> Result<()> {
        let data = self.export(format)?;
        fs::write(path, data).map_err(|e| PromptError::io(path, e))
    }

    /// Import from a file
    pub fn import_from_file(&mut self, path: &Path, format: ExportFormat) -> Result<usize> {
        let data = fs::read_to_string(path).map_err(|e| PromptError::io(path, e))?;
        self.import(&data, format)
    }
}

fn file_label(part: Option<&std::ffi::OsStr>) -> String {
    part.map(|p| p.to_string_lossy().into_owned()).unwrap_or_default()
}

fn metadata_label(metadata: &Map<String, Value>, key: &str, default: &str) -> String {
    metadata
        .get(key)
        .and_then(Value::as_str)
        .filter(|v| !v.is_empty())
        .unwrap_or(default)
        .to_string()
}

/// Names and categories become path components when saved
fn check_path_component(field: &'static str, value: &str) -> Result<()> {
    let invalid = value.is_empty()
        || value == "."
        || value == ".."
        || value.contains(['/', '\\', '\0']);
    if invalid {
        return Err(PromptError::InvalidName {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

fn modified_time(path: &Path) -> Result<DateTime<Utc>> {
    let modified = fs::metadata(path)
        .and_then(|m| m.modified())
        .map_err(|e| PromptError::io(path, e))?;
    Ok(DateTime::<Utc>::from(modified))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn meta(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    fn template_named(name: &str) -> Template {
        Template {
            name: name.to_string(),
            category: DEFAULT_CATEGORY.to_string(),
            content: String::new(),
            kind: DEFAULT_KIND.to_string(),
            metadata: Map::new(),
            file_path: None,
            last_modified: Utc::now(),
        }
    }

    fn create_test_prompts(dir: &Path) -> std::io::Result<()> {
        let writing = dir.join("writing");
        fs::create_dir_all(&writing)?;
        fs::write(writing.join("summary.txt"), "Summarize {{text}}")?;
        fs::write(writing.join("notes.md"), "# Notes")?;
        fs::write(writing.join("ignored.json"), "{}")?;

        let code = dir.join("code");
        fs::create_dir_all(&code)?;
        fs::write(
            code.join("library.yaml"),
            "prompts:\n  - name: review\n    category: code\n    content: Review {{lang}}\n    type: chat\n    metadata:\n      level: 2\n  - name: explain\n    content: Explain it\n",
        )?;

        // Files directly under the base directory are not templates
        fs::write(dir.join("loose.txt"), "loose")?;
        Ok(())
    }

    #[test]
    fn test_open_creates_missing_dir() {
        let temp = TempDir::new().unwrap();
        let base = temp.path().join("nested").join("prompts");

        let store = TemplateStore::open(&base).unwrap();
        assert!(base.is_dir());
        assert!(store.is_empty());
    }

    #[test]
    fn test_open_loads_text_and_documents() {
        let temp = TempDir::new().unwrap();
        create_test_prompts(temp.path()).unwrap();

        let store = TemplateStore::open(temp.path()).unwrap();
        assert_eq!(store.len(), 4);
        assert!(!store.contains("loose"));
        assert!(!store.contains("ignored"));

        let summary = store.get_template("summary").unwrap();
        assert_eq!(summary.category, "writing");
        assert_eq!(summary.content, "Summarize {{text}}");
        assert_eq!(summary.kind, "text");
        assert_eq!(summary.file_path.as_deref(), Some(temp.path().join("writing/summary.txt").as_path()));

        let review = store.get_template("review").unwrap();
        assert_eq!(review.category, "code");
        assert_eq!(review.kind, "chat");
        assert_eq!(review.metadata["level"], json!(2));

        // Document entries default to "general", not the directory name
        let explain = store.get_template("explain").unwrap();
        assert_eq!(explain.category, "general");
        assert_eq!(explain.kind, "text");
        assert_eq!(explain.file_path.as_deref(), Some(temp.path().join("code/library.yaml").as_path()));
    }

    #[test]
    fn test_open_fails_on_malformed_document() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("broken");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("bad.yml"), "prompts: [\n  - name: x\n").unwrap();

        let err = TemplateStore::open(temp.path()).unwrap_err();
        assert!(matches!(err, PromptError::Decode { .. }));
    }

    #[test]
    fn test_add_and_get() {
        let mut store = TemplateStore::in_memory("unused");
        store.add_template("greet", "Hello {{name}}", Map::new());

        let template = store.get_template("greet").unwrap();
        assert_eq!(template.content, "Hello {{name}}");
        assert_eq!(template.category, "general");
        assert_eq!(template.kind, "text");
        assert!(template.file_path.is_none());
        assert!(store.list_templates().any(|t| t.name == "greet"));
    }

    #[test]
    fn test_add_uses_metadata_category_and_type() {
        let mut store = TemplateStore::in_memory("unused");
        store.add_template("t", "x", meta(json!({"category": "code", "type": "chat", "owner": "me"})));

        let template = store.get_template("t").unwrap();
        assert_eq!(template.category, "code");
        assert_eq!(template.kind, "chat");
        assert_eq!(template.metadata["owner"], json!("me"));
    }

    #[test]
    fn test_add_replaces_and_keeps_position() {
        let mut store = TemplateStore::in_memory("unused");
        store.add_template("a", "1", Map::new());
        store.add_template("b", "2", Map::new());
        store.add_template("a", "3", Map::new());

        let names: Vec<_> = store.list_templates().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(store.get_template("a").unwrap().content, "3");
    }

    #[test]
    fn test_remove_is_noop_when_absent() {
        let mut store = TemplateStore::in_memory("unused");
        assert!(store.remove_template("missing").is_none());

        store.add_template("x", "y", Map::new());
        assert!(store.remove_template("x").is_some());
        assert!(store.get_template("x").is_none());
    }

    #[test]
    fn test_categories_and_filter() {
        let mut store = TemplateStore::in_memory("unused");
        store.add_template("a", "", meta(json!({"category": "code"})));
        store.add_template("b", "", Map::new());
        store.add_template("c", "", meta(json!({"category": "code"})));

        assert_eq!(store.categories(), vec!["code", "general"]);
        let code: Vec<_> = store.list_by_category("code").map(|t| t.name.as_str()).collect();
        assert_eq!(code, vec!["a", "c"]);
    }

    #[test]
    fn test_save_writes_category_layout() {
        let temp = TempDir::new().unwrap();
        let mut store = TemplateStore::open(temp.path()).unwrap();
        store.add_template("greet", "Hello {{name}}", meta(json!({"category": "social"})));
        store.save().unwrap();

        let written = fs::read_to_string(temp.path().join("social/greet.template")).unwrap();
        assert_eq!(written, "Hello {{name}}");

        let reopened = TemplateStore::open(temp.path()).unwrap();
        let loaded = reopened.get_template("greet").unwrap();
        assert_eq!(loaded.content, "Hello {{name}}");
        assert_eq!(loaded.category, "social");
        assert!(loaded.file_path.is_some());
    }

    #[test]
    fn test_save_overwrites_existing_file() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("general");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("greet.template"), "Old greeting").unwrap();

        let mut store = TemplateStore::open(temp.path()).unwrap();
        assert_eq!(store.get_template("greet").unwrap().content, "Old greeting");

        store.add_template("greet", "New greeting {{name}}", Map::new());
        store.save().unwrap();

        let written = fs::read_to_string(dir.join("greet.template")).unwrap();
        assert_eq!(written, "New greeting {{name}}");
    }

    #[test]
    fn test_save_rejects_names_outside_base_dir() {
        let temp = TempDir::new().unwrap();
        let base = temp.path().join("prompts");
        let mut store = TemplateStore::open(&base).unwrap();
        store.add_template("fine", "ok", Map::new());
        store
            .import(r#"[{"name":"../../escaped","content":"x"}]"#, ExportFormat::Json)
            .unwrap();

        let err = store.save().unwrap_err();
        assert!(matches!(err, PromptError::InvalidName { field: "name", .. }));
        assert!(!temp.path().join("escaped.template").exists());
        assert!(!base.join("general/fine.template").exists());
    }

    #[test]
    fn test_save_rejects_bad_category() {
        let temp = TempDir::new().unwrap();
        for category in ["..", "a/b", ""] {
            let mut store = TemplateStore::in_memory(temp.path());
            store.insert(Template {
                category: category.to_string(),
                ..template_named("t")
            });

            let err = store.save().unwrap_err();
            assert!(matches!(err, PromptError::InvalidName { field: "category", .. }));
        }
    }

    #[test]
    fn test_loaded_file_uses_mtime() {
        let temp = TempDir::new().unwrap();
        create_test_prompts(temp.path()).unwrap();
        let path = temp.path().join("writing/summary.txt");

        let store = TemplateStore::open(temp.path()).unwrap();
        let expected = DateTime::<Utc>::from(fs::metadata(&path).unwrap().modified().unwrap());
        assert_eq!(store.get_template("summary").unwrap().last_modified, expected);

        // Document entries share the document's mtime
        let doc = temp.path().join("code/library.yaml");
        let expected = DateTime::<Utc>::from(fs::metadata(&doc).unwrap().modified().unwrap());
        assert_eq!(store.get_template("explain").unwrap().last_modified, expected);
    }

    #[test]
    fn test_added_template_stamped_now() {
        let mut store = TemplateStore::in_memory("unused");

        let before = Utc::now();
        store.add_template("fresh", "x", Map::new());
        let after = Utc::now();

        let stamp = store.get_template("fresh").unwrap().last_modified;
        assert!(before <= stamp && stamp <= after);
    }

    #[test]
    fn test_remove_does_not_delete_files() {
        let temp = TempDir::new().unwrap();
        let mut store = TemplateStore::open(temp.path()).unwrap();
        store.add_template("keep", "on disk", Map::new());
        store.save().unwrap();

        store.remove_template("keep");
        assert!(store.get_template("keep").is_none());
        store.save().unwrap();

        assert!(temp.path().join("general/keep.template").exists());
        let reopened = TemplateStore::open(temp.path()).unwrap();
        assert_eq!(reopened.get_template("keep").unwrap().content, "on disk");
    }

    #[test]
    fn test_json_round_trip() {
        let mut store = TemplateStore::in_memory("unused");
        store.add_template("one", "First {{x}}", meta(json!({"category": "a", "tags": ["t"]})));
        store.add_template("two", "", Map::new());

        let exported = store.export(ExportFormat::Json).unwrap();
        let mut fresh = TemplateStore::in_memory("other");
        assert_eq!(fresh.import(&exported, ExportFormat::Json).unwrap(), 2);

        for original in store.list_templates() {
            let copy = fresh.get_template(&original.name).unwrap();
            assert_eq!(copy.content, original.content);
            assert_eq!(copy.category, original.category);
            assert_eq!(copy.metadata, original.metadata);
        }
    }

    #[test]
    fn test_yaml_round_trip() {
        let mut store = TemplateStore::in_memory("unused");
        store.add_template("multi", "Line one\n\nLine two: {{x}}", meta(json!({"type": "chat"})));

        let exported = store.export(ExportFormat::Yaml).unwrap();
        assert!(exported.starts_with("prompts:"));

        let mut fresh = TemplateStore::in_memory("other");
        fresh.import(&exported, ExportFormat::Yaml).unwrap();
        let copy = fresh.get_template("multi").unwrap();
        assert_eq!(copy.content, "Line one\n\nLine two: {{x}}");
        assert_eq!(copy.kind, "chat");
    }

    #[test]
    fn test_export_json_shape() {
        let mut store = TemplateStore::in_memory("unused");
        store.add_template("n", "c", Map::new());

        let value: Value = serde_json::from_str(&store.export(ExportFormat::Json).unwrap()).unwrap();
        let entry = &value[0];
        assert_eq!(entry["name"], json!("n"));
        assert_eq!(entry["category"], json!("general"));
        assert_eq!(entry["content"], json!("c"));
        assert_eq!(entry["type"], json!("text"));
        assert_eq!(entry["metadata"], json!({}));
        assert_eq!(entry["filePath"], Value::Null);
        assert!(entry["lastModified"].is_string());
    }

    #[test]
    fn test_import_clears_file_path_and_overwrites() {
        let temp = TempDir::new().unwrap();
        create_test_prompts(temp.path()).unwrap();
        let source = TemplateStore::open(temp.path()).unwrap();
        let exported = source.export(ExportFormat::Json).unwrap();

        let mut target = TemplateStore::in_memory("other");
        target.add_template("summary", "old", Map::new());
        target.import(&exported, ExportFormat::Json).unwrap();

        let summary = target.get_template("summary").unwrap();
        assert_eq!(summary.content, "Summarize {{text}}");
        assert!(summary.file_path.is_none());
    }

    #[test]
    fn test_import_malformed_leaves_store_unchanged() {
        let mut store = TemplateStore::in_memory("unused");
        store.add_template("a", "1", Map::new());

        let err = store
            .import("[{\"name\":\"b\",\"content\":\"2\"}, {\"content\":3}]", ExportFormat::Json)
            .unwrap_err();
        assert!(matches!(err, PromptError::Decode { .. }));
        assert_eq!(store.len(), 1);
        assert!(!store.contains("b"));
    }

    #[test]
    fn test_export_import_files() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("backup.yaml");

        let mut store = TemplateStore::in_memory("unused");
        store.add_template("x", "y", Map::new());
        store.export_to_file(&path, ExportFormat::Yaml).unwrap();

        let mut fresh = TemplateStore::in_memory("other");
        assert_eq!(fresh.import_from_file(&path, ExportFormat::Yaml).unwrap(), 1);
        assert_eq!(fresh.get_template("x").unwrap().content, "y");
    }
}
