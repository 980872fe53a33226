// Statement Analyzer - CLI
// import / show / history / list over the local statement store

#[cfg(feature = "tui")]
use statement_analyzer::ui;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use statement_analyzer::{
    init_logging, process_upload, Config, Statement, StatementStore,
};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Parser, Debug)]
#[command(
    name = "statement-analyzer",
    version,
    about = "Import financial statements and chart equity exposure"
)]
struct Cli {
    /// Config file (defaults to ./statement-analyzer.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Database file; overrides config and environment
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract, normalize and store a PDF, CSV or spreadsheet statement
    Import {
        path: PathBuf,

        /// Store under this name instead of the file's own name
        #[arg(long)]
        name: Option<String>,
    },

    /// Show the latest stored version of a file
    Show { filename: String },

    /// List stored versions of a file, newest first
    History { filename: String },

    /// List stored files
    List,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref()).context("failed to load config")?;
    if let Some(db) = cli.db {
        config.database.path = db;
    }
    init_logging(config.logging.format, &config.logging.level);
    debug!(?config, "configuration loaded");

    let store = StatementStore::open(&config.database.path).with_context(|| {
        format!(
            "failed to open database {}",
            config.database.path.display()
        )
    })?;

    match cli.command {
        Command::Import { path, name } => run_import(&store, &path, name)?,
        Command::Show { filename } => run_show(&store, &filename)?,
        Command::History { filename } => run_history(&store, &filename)?,
        Command::List => run_list(&store)?,
    }

    Ok(())
}

fn run_import(store: &StatementStore, path: &Path, name: Option<String>) -> Result<()> {
    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let filename = match name {
        Some(name) => name,
        None => path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .with_context(|| format!("{} has no file name", path.display()))?,
    };

    let upload = process_upload(store, &filename, &bytes)
        .with_context(|| format!("failed to import {}", filename))?;

    println!("📂 {} ({})", upload.filename, upload.source_format.name());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("✓ Stored as version #{}", upload.id);
    println!(
        "✓ {} rows kept, {} dropped",
        upload.statement.len(),
        upload.rows_dropped()
    );

    let s = &upload.summary;
    println!("\n📊 Summary");
    println!("   Period:       {} → {}", s.first_date, s.last_date);
    println!("   Inflow:       {:.2}", s.total_inflow);
    println!("   Outflow:      {:.2}", s.total_outflow);
    println!("   Net equity:   {:.2}", s.net_equity_exposure);
    println!("   Mean risk:    {:.6}", s.mean_risk_score);

    println!("\n🧩 Composition");
    for c in &upload.charts.composition {
        println!("   {:<20} {:>14.2}  ({} rows)", c.category, c.total, c.count);
    }

    if !upload.warnings.is_empty() {
        println!("\n⚠️  {} lines skipped", upload.warnings.len());
        for w in &upload.warnings {
            println!("   {}", w);
        }
    }

    Ok(())
}

fn load_latest(store: &StatementStore, filename: &str) -> Result<Statement> {
    store
        .get_latest(filename)
        .with_context(|| format!("failed to load {}", filename))?
        .with_context(|| format!("no stored statement named {}", filename))
}

#[cfg(feature = "tui")]
fn run_show(store: &StatementStore, filename: &str) -> Result<()> {
    let statement = load_latest(store, filename)?;

    let mut app = ui::App::new(filename, statement);
    ui::run_ui(&mut app).context("dashboard failed")?;

    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_show(store: &StatementStore, filename: &str) -> Result<()> {
    let statement = load_latest(store, filename)?;

    println!(
        "{:<12} {:>14} {:<20} {:>16} {:>12}",
        "Date", "Amount", "Category", "Equity Exposure", "Risk Score"
    );
    for tx in &statement {
        println!(
            "{:<12} {:>14.2} {:<20} {:>16.2} {:>12.6}",
            tx.date.to_string(),
            tx.amount,
            tx.category,
            tx.equity_exposure,
            tx.risk_score
        );
    }

    let s = statement_analyzer::summarize(&statement);
    println!(
        "\n{} rows, {} → {}, net equity {:.2}",
        s.row_count, s.first_date, s.last_date, s.net_equity_exposure
    );

    Ok(())
}

fn run_history(store: &StatementStore, filename: &str) -> Result<()> {
    let versions = store.history(filename)?;
    if versions.is_empty() {
        println!("No stored versions of {}", filename);
        return Ok(());
    }

    println!("🕒 {} ({} versions)", filename, versions.len());
    for v in versions {
        println!(
            "   #{:<6} {}  {} rows",
            v.id,
            v.uploaded_at.format("%Y-%m-%d %H:%M:%S UTC"),
            v.row_count
        );
    }

    Ok(())
}

fn run_list(store: &StatementStore) -> Result<()> {
    let files = store.list_files()?;
    if files.is_empty() {
        println!("No statements stored yet. Run: statement-analyzer import <path>");
        return Ok(());
    }

    for f in files {
        println!(
            "   {:<40} {:>3} versions  last {}",
            f.filename,
            f.versions,
            f.last_upload.format("%Y-%m-%d %H:%M:%S UTC")
        );
    }

    Ok(())
}
