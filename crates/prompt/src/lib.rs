//! prompt - Prompt templates for Daedalos
//!
//! "Write the prompt once. Fill in the blanks every time after."
//!
//! Prompts are named text templates grouped into categories. They are kept in
//! a directory tree (one file per prompt, or YAML documents holding several)
//! and compiled on demand: `{{name}}` placeholders are filled in,
//! `{{#if}}`/`{{else}}` and `{{#each}}` sections are resolved, and the result
//! is tidied into clean, paste-ready text.
//!
//! Blocks do not nest, and there are no expressions or helpers.

pub mod blocks;
pub mod compiler;
pub mod config;
pub mod document;
pub mod engine;
pub mod error;
pub mod normalize;
pub mod store;
pub mod variables;

pub use compiler::{compile_str, CompileOptions, Compiler};
pub use config::Config;
pub use document::ExportFormat;
pub use engine::PromptCompiler;
pub use error::{PromptError, Result};
pub use store::{Template, TemplateStore};
pub use variables::Variables;
