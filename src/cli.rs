use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::warn;

use crate::config::Config;
use crate::decision::{detect_meeting, extract_decisions};
use crate::document::{Document, EquationRecord, SectionRange, TocNode, load_document};
use crate::equation::{convert_document, unconverted_records};
use crate::section::{SectionQuery, locate_node, locate_or_empty};

#[derive(Parser, Debug)]
#[command(
    name = "minutex",
    version,
    about = "Structure and content extraction for .docx meeting reports"
)]
pub struct Cli {
    /// Configuration file to use instead of the user config
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the formatting-annotated document text
    Annotate(FileArgs),
    /// Print the reconstructed table of contents
    Toc(TocArgs),
    /// Print the text of one section
    Section(SectionArgs),
    /// Convert every equation and print the records
    Equations(FileArgs),
    /// Extract decisions
    Decisions(DecisionArgs),
    /// Show or initialize the configuration file
    Config(ConfigArgs),
}

#[derive(Args, Debug, Clone)]
pub struct FileArgs {
    /// Input .docx file
    pub file: PathBuf,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum TocFormat {
    Text,
    Json,
}

#[derive(Args, Debug, Clone)]
pub struct TocArgs {
    pub file: PathBuf,

    #[arg(long, value_enum, default_value_t = TocFormat::Text)]
    pub format: TocFormat,
}

#[derive(Args, Debug, Clone)]
pub struct SectionArgs {
    pub file: PathBuf,

    /// Section id as it appears in the table of contents (e.g. "8.1" or "8v2")
    pub id: String,
}

#[derive(Args, Debug, Clone)]
pub struct DecisionArgs {
    pub file: PathBuf,

    /// Meeting id, detected from the document when omitted
    #[arg(long)]
    pub meeting: Option<String>,

    /// Only extract decisions from this section
    #[arg(long)]
    pub section: Option<String>,

    /// Skip equation conversion; equations keep their plain text
    #[arg(long, default_value_t = false)]
    pub no_convert: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    /// Write the default configuration file
    #[arg(long, default_value_t = false)]
    pub init: bool,

    /// Print the effective configuration
    #[arg(long, default_value_t = false)]
    pub show: bool,
}

pub async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::from_path(path)?,
        None => Config::load()?,
    };

    match cli.command {
        Commands::Annotate(args) => {
            let document = load(&args.file)?;
            println!("{}", document.text);
        }
        Commands::Toc(args) => {
            let document = load(&args.file)?;
            match args.format {
                TocFormat::Text => print!("{}", render_toc(&document.toc)),
                TocFormat::Json => print_json(&document.toc)?,
            }
        }
        Commands::Section(args) => {
            let document = load(&args.file)?;
            let range = match document.toc_node(&args.id) {
                Some(_) => locate_node(&document, &args.id, &config.locator).unwrap_or_else(|err| {
                    warn!(section = %args.id, error = %err, "section boundary not found");
                    SectionRange::empty()
                }),
                // Not in the TOC: search the text for the bare id
                None => locate_or_empty(
                    &document.text,
                    &SectionQuery::new(&args.id, &args.id),
                    None,
                    &config.locator,
                ),
            };
            println!("{}", document.text.slice(&range));
        }
        Commands::Equations(args) => {
            let document = load(&args.file)?;
            let records = convert_document(&document, &config).await;
            print_json(&records)?;
        }
        Commands::Decisions(args) => {
            let document = load(&args.file)?;
            let records = equation_records(&document, &config, args.no_convert).await;
            let meeting = detect_meeting(&document, args.meeting.as_deref());
            let decisions = extract_decisions(
                &document,
                &records,
                &meeting,
                &config,
                args.section.as_deref(),
            )?;
            print_json(&decisions)?;
        }
        Commands::Config(args) => {
            if args.init {
                match Config::init_default()? {
                    Some(path) => println!("Wrote default configuration to {}", path.display()),
                    None => anyhow::bail!("no configuration directory available"),
                }
            }
            if args.show || !args.init {
                print!("{}", toml::to_string_pretty(&config)?);
            }
        }
    }

    Ok(())
}

fn load(path: &Path) -> Result<Document> {
    load_document(path).with_context(|| format!("failed to load {}", path.display()))
}

async fn equation_records(
    document: &Document,
    config: &Config,
    no_convert: bool,
) -> Vec<EquationRecord> {
    if no_convert {
        unconverted_records(&document.equations)
    } else {
        convert_document(document, config).await
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Indented outline, one node per line
pub fn render_toc(toc: &[TocNode]) -> String {
    let mut out = String::new();
    for node in toc {
        let indent = "  ".repeat(node.depth.saturating_sub(1) as usize);
        if node.is_virtual {
            out.push_str(&format!("{indent}{} [{}]\n", node.title, node.id));
        } else {
            out.push_str(&format!("{indent}{} {}\n", node.id, node.title));
        }
    }
    out
}
