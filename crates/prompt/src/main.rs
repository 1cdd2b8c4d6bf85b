//! prompt - Prompt templates for Daedalos
//!
//! "Write the prompt once. Fill in the blanks every time after."
//!
//! Commands:
//! - list: List available prompts
//! - show <NAME>: Show a prompt and its details
//! - add <NAME>: Add or replace a prompt
//! - compile <NAME>: Compile a prompt with variables
//! - vars <NAME>: Show variables a prompt uses
//! - export: Export all prompts as JSON or YAML
//! - import <PATH>: Import prompts from an export
//! - config: Show or change saved settings

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use prompt::config::get_config_path;
use prompt::{CompileOptions, Config, ExportFormat, PromptCompiler, Variables};

#[derive(Parser)]
#[command(name = "prompt")]
#[command(about = "Prompt templates for Daedalos - store named prompts and compile them with variables")]
#[command(version)]
#[command(after_help = r#"TEMPLATE SYNTAX:
    {{name}}                        Replaced by the variable, kept as-is if unset
    {{#if flag}}...{{/if}}          Kept when flag is truthy
    {{#if flag}}A{{else}}B{{/if}}   A when truthy, B otherwise
    {{#each items}}- {{this}}{{/each}}
                                    Repeated once per array element

LAYOUT:
    <prompts-dir>/<category>/<name>.txt|.md|.template
    <prompts-dir>/<category>/<file>.yaml   (prompts: [{name, content, ...}])

EXAMPLES:
    prompt add greet --content "Hello {{name}}"
    prompt compile greet --var name=Chen
    prompt compile review --var 'points=["speed","safety"]' --var strict=true
    prompt export --format yaml --output backup.yaml
    prompt import backup.yaml
"#)]
struct Cli {
    /// Prompts directory (overrides config and DAEDALOS_PROMPT_DIR)
    #[arg(long, global = true, value_name = "DIR")]
    dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List available prompts
    List {
        /// Only show this category
        #[arg(long)]
        category: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show prompt details
    Show {
        /// Prompt name
        name: String,
    },

    /// Add or replace a prompt and save it
    Add {
        /// Prompt name
        name: String,

        /// Read content from a file
        #[arg(long, conflicts_with = "content")]
        file: Option<PathBuf>,

        /// Inline content
        #[arg(long)]
        content: Option<String>,

        /// Category (default: general)
        #[arg(long)]
        category: Option<String>,

        /// Type tag (default: text)
        #[arg(long = "type", value_name = "TYPE")]
        kind: Option<String>,
    },

    /// Compile a prompt
    Compile {
        /// Prompt name
        name: String,

        /// Set a variable (KEY=VALUE, VALUE may be JSON)
        #[arg(long = "var", value_name = "KEY=VALUE")]
        vars: Vec<String>,

        /// Keep whitespace exactly as compiled
        #[arg(long)]
        no_format: bool,
    },

    /// Show variables used by a prompt
    Vars {
        /// Prompt name
        name: String,
    },

    /// Export all prompts
    Export {
        /// json or yaml (default: from --output extension, else json)
        #[arg(long)]
        format: Option<String>,

        /// Write to a file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Import prompts from an export and save them
    Import {
        /// File to import
        path: PathBuf,

        /// json or yaml (default: from file extension)
        #[arg(long)]
        format: Option<String>,
    },

    /// Show configuration, or save changes to it
    Config {
        /// Save this prompts directory in the config file
        #[arg(long, value_name = "DIR")]
        set_dir: Option<PathBuf>,

        /// Save whether compiled output is formatted by default
        #[arg(long, value_name = "BOOL")]
        set_format: Option<bool>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let dir = cli.dir;
    let open = || open_prompts(dir.clone());

    match cli.command {
        Some(Commands::List { category, json }) => cmd_list(&open()?, category.as_deref(), json),

        Some(Commands::Show { name }) => cmd_show(&open()?, &name),

        Some(Commands::Add {
            name,
            file,
            content,
            category,
            kind,
        }) => cmd_add(&mut open()?, &name, file.as_deref(), content, category, kind),

        Some(Commands::Compile {
            name,
            vars,
            no_format,
        }) => cmd_compile(&open()?, &name, &vars, no_format),

        Some(Commands::Vars { name }) => cmd_vars(&open()?, &name),

        Some(Commands::Export { format, output }) => {
            cmd_export(&open()?, format.as_deref(), output.as_deref())
        }

        Some(Commands::Import { path, format }) => cmd_import(&mut open()?, &path, format.as_deref()),

        Some(Commands::Config {
            set_dir,
            set_format,
            json,
        }) => cmd_config(set_dir, set_format, json),

        None => cmd_list(&open()?, None, false),
    }
}

/// Load config, apply `--dir`, and open the prompts directory
fn open_prompts(dir: Option<PathBuf>) -> Result<PromptCompiler> {
    let mut config = Config::load().context("Failed to load prompt config")?;
    if let Some(dir) = dir {
        config.prompts_dir = dir;
    }

    PromptCompiler::new(config).context("Failed to open prompts directory")
}

/// Pick a format from the flag, then the file extension, then the default
fn resolve_format(flag: Option<&str>, path: Option<&Path>) -> Result<ExportFormat> {
    if let Some(flag) = flag {
        return Ok(flag.parse()?);
    }
    Ok(path.and_then(ExportFormat::from_path).unwrap_or_default())
}

/// List prompts
fn cmd_list(prompts: &PromptCompiler, category: Option<&str>, json: bool) -> Result<()> {
    let mut templates: Vec<_> = prompts
        .list_templates()
        .filter(|t| category.map_or(true, |c| t.category == c))
        .collect();
    templates.sort_by(|a, b| a.category.cmp(&b.category).then_with(|| a.name.cmp(&b.name)));

    if json {
        let json_output: Vec<_> = templates
            .iter()
            .map(|t| {
                serde_json::json!({
                    "name": t.name,
                    "category": t.category,
                    "type": t.kind,
                    "path": t.file_path.as_ref().map(|p| p.to_string_lossy()),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&json_output)?);
        return Ok(());
    }

    println!("\x1b[1mAvailable Prompts\x1b[0m");
    println!("\x1b[2m{}\x1b[0m", prompts.store().base_dir().display());
    println!();

    if templates.is_empty() {
        println!("\x1b[2mNo prompts found.\x1b[0m");
        println!("Add one with: prompt add <name> --content \"Hello {{{{name}}}}\"");
        return Ok(());
    }

    let mut current: Option<&str> = None;
    for t in &templates {
        if current != Some(t.category.as_str()) {
            if current.is_some() {
                println!();
            }
            println!("\x1b[36m{}:\x1b[0m", t.category);
            current = Some(t.category.as_str());
        }
        println!("  \x1b[32m{}\x1b[0m \x1b[2m({})\x1b[0m", t.name, t.kind);
    }

    Ok(())
}

/// Show details about a prompt
fn cmd_show(prompts: &PromptCompiler, name: &str) -> Result<()> {
    let template = prompts
        .get_template(name)
        .ok_or_else(|| anyhow::anyhow!("Prompt not found: {}", name))?;

    println!("\x1b[1mPrompt: {}\x1b[0m", template.name);
    println!("\x1b[2mCategory: {}  Type: {}\x1b[0m", template.category, template.kind);
    if let Some(ref path) = template.file_path {
        println!("\x1b[2mPath: {}\x1b[0m", path.display());
    }
    println!(
        "\x1b[2mModified: {}\x1b[0m",
        template.last_modified.format("%Y-%m-%d %H:%M:%S")
    );
    println!();

    if !template.metadata.is_empty() {
        println!("\x1b[36mMetadata:\x1b[0m");
        println!("{}", serde_json::to_string_pretty(&template.metadata)?);
        println!();
    }

    println!("\x1b[36mContent:\x1b[0m");
    println!("{}", template.content);

    Ok(())
}

/// Add or replace a prompt, then save
fn cmd_add(
    prompts: &mut PromptCompiler,
    name: &str,
    file: Option<&Path>,
    content: Option<String>,
    category: Option<String>,
    kind: Option<String>,
) -> Result<()> {
    let content = match (file, content) {
        (Some(path), _) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read: {}", path.display()))?,
        (None, Some(content)) => content,
        (None, None) => bail!("Provide prompt content with --content or --file"),
    };

    let mut metadata = Map::new();
    if let Some(category) = category {
        metadata.insert("category".to_string(), Value::String(category));
    }
    if let Some(kind) = kind {
        metadata.insert("type".to_string(), Value::String(kind));
    }

    prompts.add_template(name, &content, metadata);
    prompts.save().context("Failed to save prompts")?;

    println!("success: Prompt saved: {}", name);

    Ok(())
}

/// Compile a prompt and print the result
fn cmd_compile(prompts: &PromptCompiler, name: &str, pairs: &[String], no_format: bool) -> Result<()> {
    let mut vars = Variables::new();
    vars.add_from_pairs(pairs);

    let output = if no_format {
        prompts.compile(name, &vars, &CompileOptions::raw())?
    } else {
        prompts.compile_default(name, &vars)?
    };

    println!("{}", output);

    Ok(())
}

/// Show variables used in a prompt
fn cmd_vars(prompts: &PromptCompiler, name: &str) -> Result<()> {
    let template = prompts
        .get_template(name)
        .ok_or_else(|| anyhow::anyhow!("Prompt not found: {}", name))?;

    println!("\x1b[1mPrompt Variables: {}\x1b[0m", template.name);
    println!();

    let vars = Variables::find_used_variables(&template.content);
    if vars.is_empty() {
        println!("  (none found)");
    } else {
        for var in &vars {
            println!("  {}", var);
        }
    }

    Ok(())
}

/// Export all prompts
fn cmd_export(prompts: &PromptCompiler, format: Option<&str>, output: Option<&Path>) -> Result<()> {
    let format = resolve_format(format, output)?;

    match output {
        Some(path) => {
            prompts
                .store()
                .export_to_file(path, format)
                .with_context(|| format!("Failed to export to: {}", path.display()))?;
            println!("success: Exported {} prompts to {}", prompts.store().len(), path.display());
        }
        None => println!("{}", prompts.export(format)?),
    }

    Ok(())
}

/// Import prompts, then save
fn cmd_import(prompts: &mut PromptCompiler, path: &Path, format: Option<&str>) -> Result<()> {
    let format = resolve_format(format, Some(path))?;

    let count = prompts
        .store_mut()
        .import_from_file(path, format)
        .with_context(|| format!("Failed to import: {}", path.display()))?;
    prompts.save().context("Failed to save prompts")?;

    println!("success: Imported {} prompts", count);

    Ok(())
}

/// Show the effective configuration, or save changes to the config file
fn cmd_config(set_dir: Option<PathBuf>, set_format: Option<bool>, json: bool) -> Result<()> {
    if set_dir.is_some() || set_format.is_some() {
        // Start from the file alone so the environment override is not persisted
        let mut config = Config::load_from(&get_config_path()).context("Failed to load prompt config")?;
        if let Some(dir) = set_dir {
            config.prompts_dir = dir;
        }
        if let Some(format) = set_format {
            config.format_output = format;
        }
        config.save().context("Failed to save prompt config")?;

        println!("success: Config saved to {}", get_config_path().display());
        return Ok(());
    }

    let config = Config::load().context("Failed to load prompt config")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    println!("Config file: {}", get_config_path().display());
    println!("Prompts dir: {}", config.prompts_dir.display());
    println!("Format output: {}", config.format_output);

    Ok(())
}
