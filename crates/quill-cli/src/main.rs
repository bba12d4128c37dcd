use std::io::Read;
use std::path::{Path, PathBuf};

use clap::Parser;
use miette::{IntoDiagnostic, Result};
use quill_markdown::{ConvertOptions, markdown_to_requests};
use smol_str::SmolStr;

#[derive(Parser)]
#[command(version, about = "Quill - compile markdown into document edit batches", long_about = None)]
struct Cli {
    /// Markdown file to compile; '-' or absent reads stdin
    input: Option<PathBuf>,

    /// Write the batch to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Document offset the first insertion lands at
    #[arg(long, default_value_t = 1)]
    start_index: i64,

    /// Tab identifier stamped on every emitted location and range
    #[arg(long)]
    tab_id: Option<String>,

    /// Style the first level-1 heading as the document title
    #[arg(long)]
    title: bool,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,

    /// Emit the full `{"requests": [...]}` body instead of the bare array
    #[arg(long)]
    body: bool,
}

fn main() -> Result<()> {
    init_miette();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    let markdown = read_input(cli.input.as_deref())?;

    let options = ConvertOptions {
        start_index: cli.start_index,
        tab_id: cli.tab_id.as_deref().map(SmolStr::new),
        promote_first_heading: cli.title,
    };
    let requests = markdown_to_requests(&markdown, &options)?;
    tracing::debug!(count = requests.len(), "compiled request batch");

    let json = if cli.body {
        serialize(&serde_json::json!({ "requests": requests }), cli.pretty)?
    } else {
        serialize(&requests, cli.pretty)?
    };

    match cli.output {
        Some(path) => std::fs::write(&path, json).into_diagnostic()?,
        None => println!("{json}"),
    }

    Ok(())
}

fn read_input(input: Option<&Path>) -> Result<String> {
    match input {
        Some(path) if path.as_os_str() != "-" => {
            if !path.exists() {
                return Err(miette::miette!("Input file not found: {}", path.display()));
            }
            std::fs::read_to_string(path).into_diagnostic()
        }
        _ => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .into_diagnostic()?;
            Ok(buffer)
        }
    }
}

fn serialize<T: serde::Serialize>(value: &T, pretty: bool) -> Result<String> {
    if pretty {
        serde_json::to_string_pretty(value).into_diagnostic()
    } else {
        serde_json::to_string(value).into_diagnostic()
    }
}

fn init_miette() {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .with_cause_chain()
                .color(true)
                .build(),
        )
    }))
    .expect("couldn't set the miette hook");
}
