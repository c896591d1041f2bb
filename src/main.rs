//! CLI entry point for qc-capture
//!
//! Provides the command-line interface for running a capture session,
//! listing and clearing records, parsing payloads, and exporting CSV.

use clap::{Parser, Subcommand};
use colored::*;
use qc_capture::core::parse_payload;
use qc_capture::export::write_export;
use qc_capture::store::RecordStore;
use qc_capture::ui::{CaptureSession, SessionOptions};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

/// Default location of the record store.
const DEFAULT_DATA_DIR: &str = "~/.local/share/qc-capture";

#[derive(Parser)]
#[command(name = "qc-capture")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the interactive capture session
    Capture {
        /// Directory holding the record store
        #[arg(short, long, default_value = DEFAULT_DATA_DIR)]
        data_dir: PathBuf,

        /// Operator initials stamped on every record
        #[arg(short, long, default_value = "")]
        operator: String,

        /// Append every scan, even exact duplicates
        #[arg(long)]
        no_dedupe: bool,

        /// Disable audio cues
        #[arg(long)]
        no_beep: bool,
    },

    /// List captured records
    List {
        /// Directory holding the record store
        #[arg(short, long, default_value = DEFAULT_DATA_DIR)]
        data_dir: PathBuf,
    },

    /// Parse one payload string and show the extracted fields
    Parse {
        /// The scan payload, e.g. "case=25-12345&slide=A1"
        payload: String,
    },

    /// Set the issue type and/or notes of one record
    Annotate {
        /// Directory holding the record store
        #[arg(short, long, default_value = DEFAULT_DATA_DIR)]
        data_dir: PathBuf,

        /// Record index as shown by `list` (0 = newest)
        index: usize,

        /// Issue-type label; unknown labels are added to the known list
        #[arg(short, long)]
        issue_type: Option<String>,

        /// Free-text notes
        #[arg(short, long)]
        notes: Option<String>,
    },

    /// Delete one record
    Delete {
        /// Directory holding the record store
        #[arg(short, long, default_value = DEFAULT_DATA_DIR)]
        data_dir: PathBuf,

        /// Record index as shown by `list` (0 = newest)
        index: usize,
    },

    /// List the known issue-type labels, optionally adding one
    IssueTypes {
        /// Directory holding the record store
        #[arg(short, long, default_value = DEFAULT_DATA_DIR)]
        data_dir: PathBuf,

        /// Label to add to the known list
        #[arg(short, long)]
        add: Option<String>,
    },

    /// Export all records as CSV
    Export {
        /// Directory holding the record store
        #[arg(short, long, default_value = DEFAULT_DATA_DIR)]
        data_dir: PathBuf,

        /// Directory the CSV is written into
        #[arg(short, long, default_value = ".")]
        out: PathBuf,
    },

    /// Delete all captured records
    Clear {
        /// Directory holding the record store
        #[arg(short, long, default_value = DEFAULT_DATA_DIR)]
        data_dir: PathBuf,

        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Capture {
            data_dir,
            operator,
            no_dedupe,
            no_beep,
        } => run_capture(&data_dir, operator, !no_dedupe, !no_beep)?,
        Commands::List { data_dir } => list_records(&data_dir)?,
        Commands::Parse { payload } => show_parse(&payload),
        Commands::Annotate {
            data_dir,
            index,
            issue_type,
            notes,
        } => annotate_record(&data_dir, index, issue_type, notes)?,
        Commands::Delete { data_dir, index } => remove_record(&data_dir, index)?,
        Commands::IssueTypes { data_dir, add } => manage_issue_types(&data_dir, add)?,
        Commands::Export { data_dir, out } => export_records(&data_dir, &out)?,
        Commands::Clear { data_dir, yes } => clear_records(&data_dir, yes)?,
    }

    Ok(())
}

/// Expand tilde in a user-supplied path
fn expand_path(path: &Path) -> anyhow::Result<PathBuf> {
    let expanded = shellexpand::tilde(
        path.to_str()
            .ok_or_else(|| anyhow::anyhow!("Invalid path encoding"))?,
    );
    Ok(PathBuf::from(expanded.as_ref()))
}

/// Run the interactive capture session
fn run_capture(
    data_dir: &Path,
    operator: String,
    dedupe: bool,
    beep: bool,
) -> anyhow::Result<()> {
    let store = RecordStore::open(expand_path(data_dir)?)?;

    let session = CaptureSession::new(
        store,
        SessionOptions {
            operator,
            dedupe,
            beep,
        },
    );
    session.run()?;

    Ok(())
}

/// List all captured records, newest first
fn list_records(data_dir: &Path) -> anyhow::Result<()> {
    let store = RecordStore::open(expand_path(data_dir)?)?;

    if store.is_empty() {
        println!("{}", "No records captured yet.".yellow());
        return Ok(());
    }

    println!("{}", format!("{} records (newest first)\n", store.len()).bold());

    for (i, record) in store.records().iter().enumerate() {
        let ids = [
            ("case", &record.case_id),
            ("slide", &record.slide_id),
            ("block", &record.block_id),
            ("container", &record.container_id),
        ]
        .iter()
        .filter(|(_, v)| !v.is_empty())
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(" ");

        println!(
            "{} {} {} {} {}",
            format!("{:>3}.", i).dimmed(),
            record.timestamp.dimmed(),
            ids.cyan(),
            record.issue_type.magenta(),
            format!("({})", record.raw).dimmed(),
        );
        if !record.notes.is_empty() {
            println!("      {}", record.notes);
        }
    }

    Ok(())
}

/// Parse a payload string and display the extracted fields
fn show_parse(payload: &str) {
    let parsed = parse_payload(payload);

    println!("{} Parsing: {}", "→".cyan(), payload);
    println!();
    println!("  raw        {}", parsed.raw());
    println!("  case       {}", highlight(parsed.case_id()));
    println!("  slide      {}", highlight(parsed.slide_id()));
    println!("  block      {}", highlight(parsed.block_id()));
    println!("  container  {}", highlight(parsed.container_id()));
}

fn highlight(value: &str) -> ColoredString {
    if value.is_empty() {
        "-".dimmed()
    } else {
        value.green()
    }
}

/// Set the issue type and/or notes of the record at `index`
fn annotate_record(
    data_dir: &Path,
    index: usize,
    issue_type: Option<String>,
    notes: Option<String>,
) -> anyhow::Result<()> {
    if issue_type.is_none() && notes.is_none() {
        anyhow::bail!("Nothing to change: pass --issue-type and/or --notes");
    }

    let mut store = RecordStore::open(expand_path(data_dir)?)?;

    if let Some(label) = issue_type {
        let label = label.trim().to_string();
        store.add_issue_type(&label)?;
        store.set_issue_type(index, &label)?;
        println!(
            "{} Record {}: issue type set to {}",
            "✓".green(),
            index,
            label.magenta()
        );
    }
    if let Some(notes) = notes {
        store.set_notes(index, &notes)?;
        println!("{} Record {}: notes updated", "✓".green(), index);
    }

    Ok(())
}

/// Delete the record at `index`
fn remove_record(data_dir: &Path, index: usize) -> anyhow::Result<()> {
    let mut store = RecordStore::open(expand_path(data_dir)?)?;
    let removed = store.delete_record(index)?;

    println!(
        "{} Deleted record {} ({})",
        "✓".green(),
        index,
        removed.raw.dimmed()
    );

    Ok(())
}

/// List the known issue-type labels, adding one first when requested
fn manage_issue_types(data_dir: &Path, add: Option<String>) -> anyhow::Result<()> {
    let mut store = RecordStore::open(expand_path(data_dir)?)?;

    if let Some(label) = add {
        store.add_issue_type(&label)?;
        println!("{} Added issue type {}", "✓".green(), label.trim());
    }

    // The first eight are reachable from the capture session via F1-F8.
    for (i, label) in store.issue_types().iter().enumerate() {
        let key = if i < 8 {
            format!("{:<3}", format!("F{}", i + 1))
        } else {
            "   ".to_string()
        };
        println!("  {} {}", key.cyan(), label);
    }

    Ok(())
}

/// Export all records as CSV into the given directory
fn export_records(data_dir: &Path, out: &Path) -> anyhow::Result<()> {
    let store = RecordStore::open(expand_path(data_dir)?)?;
    let path = write_export(store.records(), &expand_path(out)?)?;

    println!(
        "{} Exported {} record{} to {}",
        "✓".green(),
        store.len(),
        if store.len() == 1 { "" } else { "s" },
        path.display(),
    );

    Ok(())
}

/// Delete all records, with confirmation unless --yes was given
fn clear_records(data_dir: &Path, yes: bool) -> anyhow::Result<()> {
    let mut store = RecordStore::open(expand_path(data_dir)?)?;

    if store.is_empty() {
        println!("{}", "Nothing to clear.".yellow());
        return Ok(());
    }

    if !yes {
        print!(
            "This deletes all {} records. Type 'yes' to confirm: ",
            store.len()
        );
        io::stdout().flush()?;

        let mut answer = String::new();
        io::stdin().lock().read_line(&mut answer)?;
        if answer.trim() != "yes" {
            println!("{}", "Aborted.".yellow());
            return Ok(());
        }
    }

    let count = store.len();
    store.clear_records()?;
    println!("{} Cleared {} records", "✓".green(), count);

    Ok(())
}
