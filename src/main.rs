use clap::{Parser, Subcommand};
use frontstack::config;
use frontstack::output;
use frontstack::pipeline::{Order, Pipeline, PipelineError};
use frontstack::types::Record;
use frontstack::value::Value;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "frontstack")]
#[command(about = "Process a directory of frontmatter files through a middleware pipeline")]
#[command(long_about = "\
Process a directory of frontmatter files through a middleware pipeline

Every regular file directly inside the source directory is a document: an
optional YAML (---) or TOML (+++) header followed by a body. Documents pass
through the configured middleware in order and are written to the
destination directory under their original filenames.

  blog/
  ├── frontstack.toml         # Pipeline config (optional)
  ├── src/
  │   ├── hello.md            # ---\\ntitle: Hello\\ndate: 2013-06-07\\n---\\nBody
  │   └── draft.md            # draft: true → dropped by the drafts step
  └── build/                  # Written by `frontstack build`

Built-in middleware: drafts, dates, markdown, sanitize, linkify, templates.
Layouts: `page` and `article` are built in. A document picks one with a
`template` header field. Custom layouts are Rust functions registered with
Templates::with_layout; the CLI cannot load layout files.

Set RUST_LOG=frontstack=debug to trace each step.
Run 'frontstack gen-config' to generate a documented frontstack.toml.")]
#[command(version)]
struct Cli {
    /// Config file
    #[arg(long, default_value = config::CONFIG_FILENAME, global = true)]
    config: PathBuf,

    /// Source directory (overrides config)
    #[arg(long, global = true)]
    source: Option<PathBuf>,

    /// Destination directory (overrides config)
    #[arg(long, global = true)]
    dest: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the pipeline and write every document to the destination
    Build,
    /// List documents in filename order
    List {
        /// Descending filename order
        #[arg(long)]
        reverse: bool,
    },
    /// Process a single document and print it
    Show {
        filename: String,
        /// Print the full record as JSON instead of the content
        #[arg(long)]
        metadata: bool,
    },
    /// Export processed documents as JSON
    Serialize {
        /// Object keyed by filename instead of an array
        #[arg(long)]
        map: bool,
        /// `natural`, or a metadata key to sort by
        #[arg(long, conflicts_with = "map")]
        sort: Option<String>,
        #[arg(long)]
        pretty: bool,
    },
    /// Run the pipeline without writing anything
    Check,
    /// Print a stock frontstack.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("frontstack=info")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let open = || -> Result<Pipeline, PipelineError> {
        let mut pipeline = Pipeline::from_config_file(&cli.config)?;
        if let Some(source) = &cli.source {
            pipeline.set_source(source);
        }
        if let Some(dest) = &cli.dest {
            pipeline.set_dest(dest);
        }
        Ok(pipeline)
    };

    match &cli.command {
        Command::Build => {
            let mut pipeline = open()?;
            let written = pipeline.build(None)?;
            if let Some(dest) = pipeline.dest() {
                output::print_build_output(&written, dest);
            }
        }
        Command::List { reverse } => {
            let mut pipeline = open()?;
            let docs = pipeline.iter(false, *reverse)?.collect::<Result<Vec<_>, _>>()?;
            output::print_list_output(&docs);
        }
        Command::Show { filename, metadata } => {
            let mut pipeline = open()?;
            let doc = pipeline.get(filename, false)?;
            if *metadata {
                println!("{}", serde_json::to_string_pretty(&doc.to_record())?);
            } else {
                print!("{}", doc.content);
            }
        }
        Command::Serialize { map, sort, pretty } => {
            let mut pipeline = open()?;
            let json = if *map {
                to_json(&pipeline.serialize_map()?, *pretty)?
            } else {
                let records = match sort.as_deref() {
                    None => pipeline.serialize(Order::Unsorted)?,
                    Some("natural") => pipeline.serialize(Order::Natural)?,
                    Some(key) => {
                        let by_key = |record: &Record| record.get(key).cloned().unwrap_or(Value::Null);
                        pipeline.serialize(Order::By(&by_key))?
                    }
                };
                to_json(&records, *pretty)?
            };
            println!("{json}");
        }
        Command::Check => {
            let mut pipeline = open()?;
            println!("==> Checking {}", pipeline.source().display());
            pipeline.run()?;
            let names = pipeline.middleware_names();
            output::print_check_output(pipeline.files().iter(), pipeline.metadata(), &names);
            println!("==> Documents are valid");
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

fn to_json<T: serde::Serialize>(value: &T, pretty: bool) -> serde_json::Result<String> {
    if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
}
