//! Serialized template documents
//!
//! Two shapes are supported:
//! - `json`: an array of template objects
//! - `yaml`: the same array wrapped as `{ prompts: [...] }`
//!
//! The YAML shape is also what prompt files inside category directories use.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{PromptError, Result};
use crate::store::{Template, DEFAULT_CATEGORY, DEFAULT_KIND};

/// Document formats for export and import
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Json,
    Yaml,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Yaml => "yaml",
        }
    }

    /// Infer the format from a file extension (`.json`, `.yaml`, `.yml`)
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "yaml" | "yml" => Some(Self::Yaml),
            _ => None,
        }
    }
}

impl FromStr for ExportFormat {
    type Err = PromptError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            _ => Err(PromptError::UnsupportedFormat(s.to_string())),
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// `{ prompts: [...] }` wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct PromptDocument<T> {
    #[serde(default = "Vec::new")]
    pub prompts: Vec<T>,
}

/// One decoded template entry, before defaults are applied
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateRecord {
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub metadata: Option<Map<String, Value>>,
    #[serde(default)]
    pub last_modified: Option<DateTime<Utc>>,
}

impl TemplateRecord {
    /// Build a template, filling in the default category and type
    pub fn into_template(self, file_path: Option<PathBuf>, last_modified: DateTime<Utc>) -> Template {
        Template {
            name: self.name,
            category: non_empty_or(self.category, DEFAULT_CATEGORY),
            content: self.content.unwrap_or_default(),
            kind: non_empty_or(self.kind, DEFAULT_KIND),
            metadata: self.metadata.unwrap_or_default(),
            file_path,
            last_modified,
        }
    }

    /// Build a template for import: not backed by a file, keeps the
    /// recorded modification time when there is one
    pub fn into_imported(self) -> Template {
        let last_modified = self.last_modified.unwrap_or_else(Utc::now);
        self.into_template(None, last_modified)
    }
}

fn non_empty_or(value: Option<String>, default: &str) -> String {
    value
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Serialize templates in the given format
pub fn encode<'a, I>(templates: I, format: ExportFormat) -> Result<String>
where
    I: IntoIterator<Item = &'a Template>,
{
    let prompts: Vec<&Template> = templates.into_iter().collect();

    match format {
        ExportFormat::Json => {
            serde_json::to_string_pretty(&prompts).map_err(|e| PromptError::Encode(e.to_string()))
        }
        ExportFormat::Yaml => serde_yaml::to_string(&PromptDocument { prompts })
            .map_err(|e| PromptError::Encode(e.to_string())),
    }
}

/// Decode a document produced by [`encode`]
pub fn decode(data: &str, format: ExportFormat, origin: &str) -> Result<Vec<TemplateRecord>> {
    match format {
        ExportFormat::Json => {
            serde_json::from_str(data).map_err(|e| PromptError::decode(origin, e))
        }
        ExportFormat::Yaml => decode_prompt_document(data, origin),
    }
}

/// Decode a `{ prompts: [...] }` YAML document.
///
/// A blank document holds no prompts.
pub fn decode_prompt_document(data: &str, origin: &str) -> Result<Vec<TemplateRecord>> {
    if data.trim().is_empty() {
        return Ok(Vec::new());
    }

    let document: PromptDocument<TemplateRecord> =
        serde_yaml::from_str(data).map_err(|e| PromptError::decode(origin, e))?;
    Ok(document.prompts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_parsing() {
        assert_eq!("json".parse::<ExportFormat>().unwrap(), ExportFormat::Json);
        assert_eq!("YAML".parse::<ExportFormat>().unwrap(), ExportFormat::Yaml);
        assert_eq!("yml".parse::<ExportFormat>().unwrap(), ExportFormat::Yaml);

        let err = "xml".parse::<ExportFormat>().unwrap_err();
        assert!(matches!(err, PromptError::UnsupportedFormat(ref f) if f == "xml"));
        assert_eq!(err.to_string(), "Unsupported format: xml");
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(ExportFormat::from_path(Path::new("a/b.json")), Some(ExportFormat::Json));
        assert_eq!(ExportFormat::from_path(Path::new("b.YML")), Some(ExportFormat::Yaml));
        assert_eq!(ExportFormat::from_path(Path::new("b.txt")), None);
        assert_eq!(ExportFormat::from_path(Path::new("noext")), None);
    }

    #[test]
    fn test_record_defaults() {
        let records = decode_prompt_document(
            "prompts:\n  - name: bare\n  - name: full\n    category: code\n    content: hi\n    type: chat\n    metadata:\n      tags: [a]\n",
            "test.yaml",
        )
        .unwrap();
        assert_eq!(records.len(), 2);

        let now = Utc::now();
        let bare = records[0].clone().into_template(None, now);
        assert_eq!(bare.category, "general");
        assert_eq!(bare.kind, "text");
        assert_eq!(bare.content, "");
        assert!(bare.metadata.is_empty());

        let full = records[1].clone().into_template(None, now);
        assert_eq!(full.category, "code");
        assert_eq!(full.kind, "chat");
        assert_eq!(full.content, "hi");
        assert_eq!(full.metadata["tags"], serde_json::json!(["a"]));
    }

    #[test]
    fn test_empty_category_gets_default() {
        let records = decode("[{\"name\":\"x\",\"category\":\"\",\"type\":\"\"}]", ExportFormat::Json, "data").unwrap();
        let template = records[0].clone().into_imported();
        assert_eq!(template.category, "general");
        assert_eq!(template.kind, "text");
    }

    #[test]
    fn test_document_without_prompts() {
        assert!(decode_prompt_document("other: 1\n", "x.yaml").unwrap().is_empty());
        assert!(decode_prompt_document("  \n", "x.yaml").unwrap().is_empty());
    }

    #[test]
    fn test_decode_failures() {
        let err = decode("{not json", ExportFormat::Json, "import data").unwrap_err();
        assert!(matches!(err, PromptError::Decode { ref origin, .. } if origin == "import data"));

        let err = decode("prompts: [\n", ExportFormat::Yaml, "bad.yaml").unwrap_err();
        assert!(matches!(err, PromptError::Decode { .. }));

        // Entries must carry a name
        let err = decode("[{\"content\":\"x\"}]", ExportFormat::Json, "data").unwrap_err();
        assert!(matches!(err, PromptError::Decode { .. }));
    }
}
