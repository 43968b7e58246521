//! # Markflow - A Rich-Text Editing Core
//!
//! Replays keystrokes through the editor and prints the resulting document.
//!
//! ## Quick Start
//!
//! ```bash
//! # Type into the saved document and save it again
//! printf '# Groceries\n* milk' | cargo run -- --save
//!
//! # Start from scratch and print the raw form
//! cargo run -- --no-load --json keys.txt
//! ```
//!
//! In the input, a newline is a line break, `\x08` is backspace and
//! `\x7f` deletes forward.

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use markflow_core::persistence;
use markflow_core::style::{FontWeight, TextDecoration};
use markflow_core::{Config, Editor, FileStorage, Persistence, StyleAttributes};
use markflow_model::{Block, Document, Selection, StyleSet};

const BACKSPACE: char = '\x08';
const DELETE: char = '\x7f';

/// Markflow - replay keystrokes into a rich-text document
#[derive(Parser, Debug)]
#[command(name = "markflow")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// File of keystrokes (stdin if omitted)
    #[arg(value_name = "INPUT")]
    input: Option<PathBuf>,

    /// Config file to use instead of the default
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Directory holding the saved document
    #[arg(short, long, value_name = "DIR")]
    storage: Option<PathBuf>,

    /// Start from an empty document
    #[arg(long)]
    no_load: bool,

    /// Save the document afterwards
    #[arg(long)]
    save: bool,

    /// Print the raw JSON form
    #[arg(long)]
    json: bool,

    /// Verbose logging
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    let log_level = match args.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_level(true),
        )
        .with(tracing_subscriber::filter::LevelFilter::from_level(
            log_level,
        ))
        .init();

    tracing::info!("Starting Markflow v{}", env!("CARGO_PKG_VERSION"));

    let config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load(),
    };

    let input = match &args.input {
        Some(path) => std::fs::read_to_string(path)?,
        None => std::io::read_to_string(std::io::stdin())?,
    };

    let editor = execute(&args, &config, &input)?;

    if args.json {
        let raw = persistence::save(editor.document());
        println!("{}", serde_json::to_string_pretty(&raw)?);
    } else {
        print!("{}", render(editor.document()));
    }

    Ok(())
}

/// Restores the saved document, replays `input` and saves if asked.
fn execute(args: &Args, config: &Config, input: &str) -> anyhow::Result<Editor> {
    let directory = match &args.storage {
        Some(dir) => dir.clone(),
        None => config.storage.resolved_directory()?,
    };
    let mut store = Persistence::with_key(FileStorage::new(directory), config.storage.key.clone());

    let mut editor = Editor::with_config(config);
    if !args.no_load {
        editor.restore(&store)?;
    }

    place_caret_at_end(&mut editor)?;
    replay(&mut editor, input)?;

    if args.save {
        editor.save(&mut store)?;
        tracing::info!("Saved under {}", store.key());
    }

    Ok(editor)
}

/// Puts a focused caret after the last character of the document.
fn place_caret_at_end(editor: &mut Editor) -> anyhow::Result<()> {
    let snapshot = editor.snapshot();
    if let Some(last) = snapshot.document().blocks().last() {
        editor.place_caret(Selection::caret(last.key().clone(), last.len()).with_focus(true))?;
    }
    Ok(())
}

/// Feeds keystrokes to the editor. A single trailing newline is ignored.
fn replay(editor: &mut Editor, input: &str) -> anyhow::Result<()> {
    let input = input.strip_suffix('\n').unwrap_or(input);
    for ch in input.chars() {
        match ch {
            BACKSPACE => editor.backspace()?,
            DELETE => editor.delete_forward()?,
            '\r' => {}
            _ => {
                editor.handle_before_input(ch)?;
            }
        }
    }
    Ok(())
}

/// Renders each block on its own line, with ANSI styling per run.
fn render(document: &Document) -> String {
    document
        .blocks()
        .map(|block| format!("{:<10} {}\n", block.block_type().as_str(), render_block(block)))
        .collect()
}

fn render_block(block: &Block) -> String {
    let mut out = String::new();
    let mut run = String::new();
    let mut run_style = StyleSet::new();

    for (offset, ch) in block.text().chars().enumerate() {
        let style = block.style_at(offset);
        if style != run_style && !run.is_empty() {
            push_run(&mut out, &run, &run_style);
            run.clear();
        }
        run_style = style;
        run.push(ch);
    }
    push_run(&mut out, &run, &run_style);
    out
}

fn push_run(out: &mut String, text: &str, style: &StyleSet) {
    if text.is_empty() {
        return;
    }
    match sgr(&StyleAttributes::resolve(style)) {
        Some(codes) => out.push_str(&format!("\x1b[{codes}m{text}\x1b[0m")),
        None => out.push_str(text),
    }
}

/// SGR parameters for a style, or `None` when it is plain.
fn sgr(attrs: &StyleAttributes) -> Option<String> {
    if attrs.is_plain() {
        return None;
    }

    let mut codes = Vec::new();
    if attrs.font_weight == FontWeight::Bold {
        codes.push("1".to_string());
    }
    if attrs.text_decoration == TextDecoration::Underline {
        codes.push("4".to_string());
    }
    if let Some(color) = attrs.color {
        codes.push(format!("38;2;{};{};{}", color.r, color.g, color.b));
    }
    Some(codes.join(";"))
}
