//! Prompt compilation
//!
//! Compiling a template runs four passes over its content, each consuming
//! the previous pass's output exactly once:
//!
//! 1. `{{ name }}` substitution
//! 2. `{{#if name}} ... {{else}} ... {{/if}}` conditionals
//! 3. `{{#each name}} ... {{this}} ... {{/each}}` loops
//! 4. whitespace formatting
//!
//! Passes never re-trigger each other, and blocks do not nest.

use regex::{NoExpand, Regex};
use serde_json::Value;
use std::sync::LazyLock;
use tracing::debug;

use crate::blocks::rewrite_blocks;
use crate::error::{PromptError, Result};
use crate::normalize::{format_output, trim_space};
use crate::store::TemplateStore;
use crate::variables::{display_value, Variables};

const ELSE_MARKER: &str = "{{else}}";

static THIS_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*this\s*\}\}").expect("this pattern is valid"));

/// Compilation options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompileOptions {
    /// Normalize blank lines and spacing. When false only the outer
    /// whitespace is trimmed.
    pub format: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self { format: true }
    }
}

impl CompileOptions {
    /// Options that keep the output layout verbatim
    pub fn raw() -> Self {
        Self { format: false }
    }
}

/// Compiles named templates from a store
pub struct Compiler<'a> {
    store: &'a TemplateStore,
}

impl<'a> Compiler<'a> {
    pub fn new(store: &'a TemplateStore) -> Self {
        Self { store }
    }

    /// Compile the template registered under `name`
    pub fn compile(
        &self,
        name: &str,
        variables: &Variables,
        options: &CompileOptions,
    ) -> Result<String> {
        let template = self
            .store
            .get_template(name)
            .ok_or_else(|| PromptError::NotFound(name.to_string()))?;

        debug!(
            template = name,
            variables = variables.len(),
            format = options.format,
            "compiling template"
        );

        Ok(compile_str(&template.content, variables, options))
    }
}

/// Run the compilation passes over raw template text
pub fn compile_str(content: &str, variables: &Variables, options: &CompileOptions) -> String {
    let content = variables.substitute(content);
    let content = render_conditions(&content, variables);
    let content = render_loops(&content, variables);
    format_output(&content, options.format)
}

fn render_conditions(content: &str, variables: &Variables) -> String {
    rewrite_blocks(content, "if", |block| {
        let truthy = variables.is_truthy(block.ident);

        match block.body.find(ELSE_MARKER) {
            None if truthy => block.body.to_string(),
            None => String::new(),
            Some(at) => {
                let chosen = if truthy {
                    &block.body[..at]
                } else {
                    &block.body[at + ELSE_MARKER.len()..]
                };
                trim_space(chosen).to_string()
            }
        }
    })
}

fn render_loops(content: &str, variables: &Variables) -> String {
    rewrite_blocks(content, "each", |block| match variables.get(block.ident) {
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                let item = display_value(item);
                THIS_MARKER
                    .replace_all(block.body, NoExpand(&item))
                    .into_owned()
            })
            .collect(),
        _ => String::new(),
    })
}
