//! PromptCompiler - a template store and compiler behind one handle

use serde_json::{Map, Value};

use crate::compiler::{CompileOptions, Compiler};
use crate::config::Config;
use crate::document::ExportFormat;
use crate::error::Result;
use crate::store::{Template, TemplateStore};
use crate::variables::Variables;

/// Owns a [`TemplateStore`] opened from a [`Config`] and compiles its templates
#[derive(Debug)]
pub struct PromptCompiler {
    config: Config,
    store: TemplateStore,
}

impl PromptCompiler {
    /// Open the configured prompts directory
    pub fn new(config: Config) -> Result<Self> {
        let store = TemplateStore::open(&config.prompts_dir)?;
        Ok(Self { config, store })
    }

    /// Wrap an existing store
    pub fn with_store(config: Config, store: TemplateStore) -> Self {
        Self { config, store }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &TemplateStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut TemplateStore {
        &mut self.store
    }

    /// Compile a template with explicit options
    pub fn compile(&self, name: &str, variables: &Variables, options: &CompileOptions) -> Result<String> {
        Compiler::new(&self.store).compile(name, variables, options)
    }

    /// Compile a template with the options implied by the config
    pub fn compile_default(&self, name: &str, variables: &Variables) -> Result<String> {
        self.compile(name, variables, &self.config.compile_options())
    }

    pub fn add_template(&mut self, name: &str, content: &str, metadata: Map<String, Value>) {
        self.store.add_template(name, content, metadata);
    }

    pub fn get_template(&self, name: &str) -> Option<&Template> {
        self.store.get_template(name)
    }

    pub fn list_templates(&self) -> impl Iterator<Item = &Template> + '_ {
        self.store.list_templates()
    }

    pub fn remove_template(&mut self, name: &str) -> Option<Template> {
        self.store.remove_template(name)
    }

    pub fn save(&self) -> Result<()> {
        self.store.save()
    }

    pub fn export(&self, format: ExportFormat) -> Result<String> {
        self.store.export(format)
    }

    pub fn import(&mut self, data: &str, format: ExportFormat) -> Result<usize> {
        self.store.import(data, format)
    }
}
