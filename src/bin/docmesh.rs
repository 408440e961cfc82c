//! Docmesh CLI — register files, drive reconciliation, inspect the store.
//!
//! Usage:
//!   docmesh register <pdf> [--aux path]
//!   docmesh reconcile [--max-items N]
//!   docmesh watch [--interval-secs N] [--max-items N]
//!   docmesh docs | links <title> | status <file-id>

use clap::{Parser, Subcommand};
use docmesh::{
    DocFileId, DocmeshApi, OpenStore, SqliteContentStore, SqliteStagingStore, DEFAULT_MAX_ITEMS,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

#[derive(Parser)]
#[command(
    name = "docmesh",
    version,
    about = "Document/link reconciliation engine"
)]
struct Cli {
    /// Directory holding content.db and staging.db
    #[arg(long, global = true)]
    db_dir: Option<PathBuf>,

    /// Emit projection output as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register an uploaded PDF and stage its path for the pipeline
    Register {
        /// Path of the uploaded PDF
        pdf: PathBuf,
        /// Optional secondary file used for extraction
        #[arg(long)]
        aux: Option<PathBuf>,
    },
    /// Run one reconciliation batch
    Reconcile {
        /// Upper bound on staged rows consumed in this run
        #[arg(long, default_value_t = DEFAULT_MAX_ITEMS)]
        max_items: usize,
    },
    /// Run reconciliation on an interval until interrupted
    Watch {
        /// Seconds between runs
        #[arg(long, default_value_t = 30)]
        interval_secs: u64,
        /// Upper bound on staged rows consumed per run
        #[arg(long, default_value_t = DEFAULT_MAX_ITEMS)]
        max_items: usize,
    },
    /// List documents
    Docs,
    /// List links originating from a document title
    Links {
        /// Title of the source document
        title: String,
    },
    /// Show processing status for a registered file
    Status {
        /// Id of the registered file
        file_id: String,
    },
}

/// Get the default database directory (~/.local/share/docmesh)
fn default_db_dir() -> PathBuf {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_default().join(".local/share"));
    data_dir.join("docmesh")
}

fn open_api(db_dir: Option<PathBuf>) -> Result<DocmeshApi, String> {
    let dir = db_dir.unwrap_or_else(default_db_dir);
    let content = SqliteContentStore::open(dir.join("content.db"))
        .map_err(|e| format!("Failed to open content store: {}", e))?;
    let staging = SqliteStagingStore::open(dir.join("staging.db"))
        .map_err(|e| format!("Failed to open staging store: {}", e))?;
    Ok(DocmeshApi::new(Arc::new(content), Arc::new(staging)))
}

fn cmd_register(api: &DocmeshApi, pdf: &PathBuf, aux: Option<&PathBuf>) -> i32 {
    let pdf = pdf.to_string_lossy();
    let aux = aux.map(|p| p.to_string_lossy().into_owned());
    match api.register_file(&pdf, aux.as_deref()) {
        Ok(id) => {
            println!("Registered '{}' ({})", pdf, id);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_reconcile(api: &DocmeshApi, max_items: usize, json: bool) -> i32 {
    match api.reconcile(max_items) {
        Ok(report) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&report).unwrap());
            } else {
                println!(
                    "Ingested {} documents ({} failed), {} links ({} failed); swept {} failed rows",
                    report.docs_ingested,
                    report.docs_failed,
                    report.links_ingested,
                    report.links_failed,
                    report.failed_paths_swept
                        + report.failed_docs_swept
                        + report.failed_links_swept,
                );
            }
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_watch(api: &DocmeshApi, interval_secs: u64, max_items: usize) -> i32 {
    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: failed to start runtime: {}", e);
            return 1;
        }
    };

    info!(interval_secs, max_items, "watching staging store");
    rt.block_on(async {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match api.reconcile(max_items) {
                        Ok(report) => {
                            if report != Default::default() {
                                info!(
                                    docs = report.docs_ingested,
                                    links = report.links_ingested,
                                    "reconciled"
                                );
                            }
                        }
                        Err(e) => error!(error = %e, "reconcile run failed"),
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("shutting down");
                    break;
                }
            }
        }
    });
    0
}

fn cmd_docs(api: &DocmeshApi, json: bool) -> i32 {
    match api.docs() {
        Ok(docs) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&docs).unwrap());
                return 0;
            }
            if docs.is_empty() {
                println!("No documents.");
                return 0;
            }
            println!("{:<36}  {:<40}  {:>7}", "ID", "TITLE", "TRACKED");
            println!("{}", "-".repeat(88));
            for doc in docs {
                println!(
                    "{:<36}  {:<40}  {:>7}",
                    doc.id,
                    doc.title,
                    if doc.tracked { "yes" } else { "no" }
                );
            }
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_links(api: &DocmeshApi, title: &str, json: bool) -> i32 {
    match api.links_for(title) {
        Ok(links) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&links).unwrap());
                return 0;
            }
            if links.is_empty() {
                println!("No links from '{}'.", title);
                return 0;
            }
            for link in links {
                println!("{} -> {}", link.from, link.to);
            }
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_status(api: &DocmeshApi, file_id: &str, json: bool) -> i32 {
    let id: DocFileId = match file_id.parse() {
        Ok(id) => id,
        Err(_) => {
            eprintln!("Error: '{}' is not a valid file id", file_id);
            return 1;
        }
    };
    match api.status_of(id) {
        Ok(Some(status)) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&status).unwrap());
            } else {
                println!("doc: {}", status.doc_status);
                println!("links: {}", status.links_status);
            }
            0
        }
        Ok(None) => {
            eprintln!("Error: file '{}' not found", file_id);
            1
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let api = match open_api(cli.db_dir) {
        Ok(api) => api,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let code = match cli.command {
        Commands::Register { pdf, aux } => cmd_register(&api, &pdf, aux.as_ref()),
        Commands::Reconcile { max_items } => cmd_reconcile(&api, max_items, cli.json),
        Commands::Watch {
            interval_secs,
            max_items,
        } => cmd_watch(&api, interval_secs, max_items),
        Commands::Docs => cmd_docs(&api, cli.json),
        Commands::Links { title } => cmd_links(&api, &title, cli.json),
        Commands::Status { file_id } => cmd_status(&api, &file_id, cli.json),
    };
    std::process::exit(code);
}
