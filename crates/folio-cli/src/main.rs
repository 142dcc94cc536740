//! `folio`: normalize rich-text HTML through the document model.

use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use folio_core::{ContentState, DocumentValue, RandomKeys};
use folio_html::presets::editor_options;
use folio_html::{ParseOptions, SerializeOptions, parse_with, serialize_with};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "folio", version, about = "Normalize rich-text HTML", long_about = None)]
struct Cli {
    /// Input file (reads stdin when omitted)
    input: Option<PathBuf>,

    /// Output file (writes stdout when omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Format of the input
    #[arg(long, value_enum, default_value_t = Format::Html)]
    from: Format,

    /// Format of the output
    #[arg(long, value_enum, default_value_t = Format::Html)]
    to: Format,

    /// Serialize with the editor's save options
    #[arg(long)]
    preset: bool,

    /// Keep container blocks as a tree instead of flattening them
    #[arg(long)]
    tree: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Html,
    Json,
    Text,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let input = read_input(cli.input.as_ref())?;
    let content = load(&input, &cli)?;
    info!(blocks = content.block_count(), "loaded document");

    let mut rendered = render(&content, &cli)?;
    if !rendered.ends_with('\n') {
        rendered.push('\n');
    }
    match &cli.output {
        Some(path) => fs::write(path, rendered)
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => io::stdout()
            .write_all(rendered.as_bytes())
            .context("failed to write to stdout")?,
    }
    Ok(())
}

fn read_input(path: Option<&PathBuf>) -> Result<String> {
    match path {
        Some(path) => {
            fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
        }
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("failed to read stdin")?;
            Ok(buffer)
        }
    }
}

fn load(input: &str, cli: &Cli) -> Result<ContentState> {
    match cli.from {
        Format::Html => {
            let options = if cli.tree {
                ParseOptions::tree()
            } else {
                ParseOptions::default()
            };
            Ok(parse_with(input, &options))
        }
        Format::Json => {
            let value =
                DocumentValue::from_json_str(input).context("input is not a folio document")?;
            value
                .into_content()
                .context("document breaks a content invariant")
        }
        Format::Text => Ok(ContentState::from_text(input, Arc::new(RandomKeys::new()))),
    }
}

fn render(content: &ContentState, cli: &Cli) -> Result<String> {
    Ok(match cli.to {
        Format::Html => {
            let options = if cli.preset {
                editor_options()
            } else {
                SerializeOptions::default()
            };
            serialize_with(content, &options)
        }
        Format::Json => DocumentValue::from_content(content)
            .to_json_pretty()
            .context("failed to encode document")?,
        Format::Text => content.plain_text(),
    })
}
