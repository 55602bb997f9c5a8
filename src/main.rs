// SPDX-License-Identifier: MIT

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use dotenv::dotenv;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use statechange_rs::render::{render, RenderedWorkflow};
use statechange_rs::server::{self, AppState};
use statechange_rs::source::{FileSource, FrappeSource, WorkflowSource};
use statechange_rs::workflow::condition::{evaluate_condition, translate, validate};
use statechange_rs::workflow::document::DocumentRecord;
use statechange_rs::workflow::history::{user_summaries, user_summary, Timeline, UserSummary};
use statechange_rs::workflow::progress::{generate_status_indicators, MarkerConfig};
use statechange_rs::workflow::reminder::plan_reminder;
use statechange_rs::workflow::transitions::apply_transition;
use statechange_rs::workflow::types::{StateHistoryEntry, Timestamp};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Json,
    Mermaid,
    Dot,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate an authored condition and check that it parses
    Translate {
        condition: String,
    },
    /// Evaluate a condition against a JSON document
    Eval {
        condition: String,

        /// Document as inline JSON
        #[arg(short, long, default_value = "{}")]
        doc: String,
    },
    /// Render a document's workflow from a YAML/JSON bundle
    Render {
        /// Path to the bundle file
        #[arg(short, long)]
        bundle: PathBuf,

        /// Document name within the bundle
        #[arg(short, long)]
        name: String,

        #[arg(short, long, value_enum, default_value = "json")]
        format: Format,
    },
    /// Render a document's workflow fetched from a Frappe site
    Remote {
        #[arg(short, long)]
        doctype: String,

        #[arg(short, long)]
        name: String,

        #[arg(short, long, value_enum, default_value = "json")]
        format: Format,
    },
    /// Print status-marker rows for items over ordered states
    Status {
        /// Declared states in progression order
        #[arg(short, long, value_delimiter = ',', required = true)]
        states: Vec<String>,

        /// Each item's current state; pass an empty string for none
        #[arg(short, long)]
        item: Vec<String>,
    },
    /// Print the state-change timeline of a bundled document
    Timeline {
        #[arg(short, long)]
        bundle: PathBuf,

        #[arg(short, long)]
        name: String,

        /// Only changes made by this user
        #[arg(short, long)]
        user: Option<String>,
    },
    /// Apply an action to a bundled document and print the moved document
    Apply {
        #[arg(short, long)]
        bundle: PathBuf,

        #[arg(short, long)]
        name: String,

        #[arg(short, long)]
        action: String,

        #[arg(short, long)]
        user: String,

        #[arg(short, long, default_value = "")]
        role: String,
    },
    /// Work out who to remind about a bundled document, and when
    Remind {
        #[arg(short, long)]
        bundle: PathBuf,

        #[arg(short, long)]
        name: String,

        /// When the document entered its state; defaults to now
        #[arg(long)]
        from: Option<Timestamp>,
    },
    /// Average time each user takes between changes, across the bundle
    Summary {
        #[arg(short, long)]
        bundle: PathBuf,

        /// Only this user
        #[arg(short, long)]
        user: Option<String>,
    },
    /// Serve the HTTP API
    Serve {
        #[arg(short, long, default_value_t = 3000)]
        port: u16,

        /// Serve documents from this bundle instead of the Frappe site
        #[arg(short, long)]
        bundle: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();
    let markers = MarkerConfig::default();

    match args.command {
        Commands::Translate { condition } => {
            let translated = translate(&condition);
            println!("{}", translated);
            if let Err(e) = validate(&condition) {
                anyhow::bail!("condition does not parse: {}", e);
            }
        }
        Commands::Eval { condition, doc } => {
            let value: Value = serde_json::from_str(&doc).context("--doc must be valid JSON")?;
            let doc = DocumentRecord::from_json(value);
            println!("{}", evaluate_condition(&translate(&condition), &doc));
        }
        Commands::Render {
            bundle,
            name,
            format,
        } => {
            let source = load(&bundle)?;
            let doctype = source.bundle().doctype.clone();
            let rendered = render(&source, &doctype, &name, &markers).await?;
            print_rendered(&rendered, format)?;
        }
        Commands::Remote {
            doctype,
            name,
            format,
        } => {
            let source = FrappeSource::from_env()?;
            let rendered = render(&source, &doctype, &name, &markers).await?;
            print_rendered(&rendered, format)?;
        }
        Commands::Status { states, item } => {
            let items: Vec<StateHistoryEntry> = item
                .into_iter()
                .map(|state| StateHistoryEntry {
                    workflow_state: Some(state).filter(|s| !s.is_empty()),
                    ..Default::default()
                })
                .collect();
            for row in generate_status_indicators(&items, &states, &markers) {
                println!("{}", serde_json::to_string(&row)?);
            }
        }
        Commands::Timeline { bundle, name, user } => {
            let source = load(&bundle)?;
            let doctype = source.bundle().doctype.clone();
            let history = source.fetch_document(&doctype, &name).await?.state_history();
            let timeline = match user {
                Some(user) => Timeline::for_user(&history, &user),
                None => Timeline::build(&history),
            };
            for row in &timeline.rows {
                println!(
                    "{}\t{}\t{}\t{}",
                    row.modification_time
                        .map(|t| t.to_string())
                        .unwrap_or_default(),
                    row.workflow_state,
                    row.username,
                    row.duration
                );
            }
            println!("average\t{}", timeline.average_duration);
        }
        Commands::Apply {
            bundle,
            name,
            action,
            user,
            role,
        } => {
            let source = load(&bundle)?;
            let doctype = source.bundle().doctype.clone();
            let doc = source.fetch_document(&doctype, &name).await?;
            let at = now();
            let transitions = &source.bundle().transitions;
            let moved = apply_transition(&doc, transitions, &action, &user, &role, at)?;
            println!("{}", serde_json::to_string_pretty(&moved.to_json())?);
        }
        Commands::Remind { bundle, name, from } => {
            let source = load(&bundle)?;
            let bundle = source.bundle();
            let shift = bundle
                .shift
                .as_ref()
                .context("bundle has no shift to schedule reminders over")?;
            let doc = source.fetch_document(&bundle.doctype, &name).await?;
            let from = from.unwrap_or_else(now);
            let plan = plan_reminder(shift, &doc, &bundle.transitions, from, &bundle.holidays)?;
            println!("{}", serde_json::to_string_pretty(&plan)?);
        }
        Commands::Summary { bundle, user } => {
            let source = load(&bundle)?;
            let histories: Vec<Vec<StateHistoryEntry>> = source
                .bundle()
                .documents
                .values()
                .map(|value| DocumentRecord::from_json(value.clone()).state_history())
                .collect();
            let summaries: Vec<UserSummary> = match user {
                Some(user) => vec![user_summary(&histories, &user)],
                None => user_summaries(&histories),
            };
            for s in &summaries {
                println!("{}\t{}\t{}", s.username, s.average_duration, s.transition_count);
            }
        }
        Commands::Serve { port, bundle } => {
            let source: Arc<dyn WorkflowSource> = match bundle {
                Some(path) => Arc::new(FileSource::load(&path)?),
                None => Arc::new(FrappeSource::from_env()?),
            };
            let state = AppState {
                source: Some(source),
                markers,
            };
            server::serve(port, state).await?;
        }
    }

    Ok(())
}

fn now() -> Timestamp {
    Timestamp::from(chrono::Local::now().naive_local())
}

fn load(bundle: &Path) -> anyhow::Result<FileSource> {
    FileSource::load(bundle).with_context(|| format!("loading bundle {}", bundle.display()))
}

fn print_rendered(rendered: &RenderedWorkflow, format: Format) -> anyhow::Result<()> {
    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(rendered)?),
        Format::Mermaid => println!("{}", rendered.diagram.to_mermaid()),
        Format::Dot => println!("{}", rendered.diagram.to_dot()),
    }
    Ok(())
}
