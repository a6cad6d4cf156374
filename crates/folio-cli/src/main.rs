//! folio command-line front end
//!
//! Loads a saved document, applies edits, and prints the saved result.
//!
//! ## Usage
//!
//! ```bash
//! # Normalize a document
//! folio doc.json
//!
//! # Convert block 0 to a header, then delete block 2
//! folio --convert 0:header --delete 2 doc.json
//!
//! # Build a document from pasted text on stdin
//! echo "one\ntwo" | folio --html -
//! ```

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, bail};
use tokio::io::AsyncReadExt;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use folio_editor::{Editor, EditorConfig, Tools};
use folio_types::OutputData;

fn print_usage() {
    eprintln!(
        r#"folio - block document editor

USAGE:
    folio [OPTIONS] <INPUT>

ARGS:
    <INPUT>                       Saved document (JSON), or - for stdin

OPTIONS:
    --config <FILE>               Editor config (TOML)
    --html                        Treat input as pasted markup, one block per line
    --convert <INDEX>:<TOOL>      Convert the block at INDEX to TOOL
    --delete <INDEX|current>      Delete a block
    --swap <FROM>:<TO>            Swap two blocks
    --stretch <INDEX>             Mark a block stretched
    --help, -h                    Show this help

Edits run in the order given. Set RUST_LOG=debug for mutation logs.
"#
    );
}

#[derive(Debug, Clone, PartialEq)]
enum Edit {
    Convert { index: usize, tool: String },
    Delete(Option<usize>),
    Swap(usize, usize),
    Stretch(usize),
}

#[derive(Debug, Default, PartialEq)]
struct Args {
    config: Option<PathBuf>,
    input: Option<PathBuf>,
    html: bool,
    edits: Vec<Edit>,
}

fn parse_index(s: &str) -> anyhow::Result<usize> {
    s.parse().with_context(|| format!("invalid block index {s:?}"))
}

fn parse_pair(s: &str) -> anyhow::Result<(&str, &str)> {
    s.split_once(':')
        .with_context(|| format!("expected <A>:<B>, got {s:?}"))
}

/// Parse arguments. `Ok(None)` means help was requested.
fn parse_args(args: impl IntoIterator<Item = String>) -> anyhow::Result<Option<Args>> {
    let mut parsed = Args::default();
    let mut input = None;
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        let mut value = |flag: &str| args.next().with_context(|| format!("{flag} needs a value"));
        match arg.as_str() {
            "--help" | "-h" => return Ok(None),
            "--config" => parsed.config = Some(PathBuf::from(value("--config")?)),
            "--html" => parsed.html = true,
            "--convert" => {
                let raw = value("--convert")?;
                let (index, tool) = parse_pair(&raw)?;
                parsed.edits.push(Edit::Convert {
                    index: parse_index(index)?,
                    tool: tool.to_string(),
                });
            }
            "--delete" => {
                let raw = value("--delete")?;
                let index = match raw.as_str() {
                    "current" => None,
                    other => Some(parse_index(other)?),
                };
                parsed.edits.push(Edit::Delete(index));
            }
            "--swap" => {
                let raw = value("--swap")?;
                let (from, to) = parse_pair(&raw)?;
                parsed.edits.push(Edit::Swap(parse_index(from)?, parse_index(to)?));
            }
            "--stretch" => {
                let raw = value("--stretch")?;
                parsed.edits.push(Edit::Stretch(parse_index(&raw)?));
            }
            flag if flag.starts_with("--") => bail!("unknown option {flag}"),
            path => {
                if input.replace(path.to_string()).is_some() {
                    bail!("only one input may be given");
                }
            }
        }
    }

    match input.as_deref() {
        None => bail!("missing <INPUT>"),
        Some("-") => parsed.input = None,
        Some(path) => parsed.input = Some(PathBuf::from(path)),
    }
    Ok(Some(parsed))
}

async fn read_input(input: Option<&PathBuf>) -> anyhow::Result<String> {
    match input {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading {}", path.display())),
        None => {
            let mut text = String::new();
            tokio::io::stdin()
                .read_to_string(&mut text)
                .await
                .context("reading stdin")?;
            Ok(text)
        }
    }
}

async fn apply(editor: &Editor, edit: &Edit) -> anyhow::Result<()> {
    let blocks = editor.blocks();
    match edit {
        Edit::Convert { index, tool } => {
            let key = editor.manager().lock().get_block_by_index(*index)?.key();
            let info = editor.converter().convert(&key, tool).await?;
            tracing::info!("converted block {} to {} ({})", index, tool, info.key.short());
        }
        Edit::Delete(index) => blocks.delete(*index)?,
        Edit::Swap(from, to) => blocks.swap(*from, *to)?,
        Edit::Stretch(index) => blocks.stretch_block(*index, true),
    }
    Ok(())
}

/// Load, edit, and save. Returns the saved document.
async fn run(args: &Args, input: String) -> anyhow::Result<OutputData> {
    let config = match &args.config {
        Some(path) => EditorConfig::load(path).await?,
        None => EditorConfig::default(),
    };
    let editor = Editor::new(config, Tools::with_builtin())?;

    if args.html {
        editor.blocks().render_from_html(&input).await?;
    } else {
        let doc: OutputData = serde_json::from_str(&input).context("parsing document")?;
        editor.blocks().render(doc).await?;
    }

    for edit in &args.edits {
        apply(&editor, edit)
            .await
            .with_context(|| format!("applying {edit:?}"))?;
    }

    Ok(editor.blocks().save().await)
}

#[tokio::main]
async fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = match parse_args(env::args().skip(1)) {
        Ok(Some(args)) => args,
        Ok(None) => {
            print_usage();
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            eprintln!("error: {e:#}\n");
            print_usage();
            return ExitCode::from(2);
        }
    };

    let result = async {
        let input = read_input(args.input.as_ref()).await?;
        let doc = run(&args, input).await?;
        Ok::<_, anyhow::Error>(serde_json::to_string_pretty(&doc)?)
    }
    .await;

    match result {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
