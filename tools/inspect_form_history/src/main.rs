use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use librewrite_core::{FormHistory, FormType};
use std::path::PathBuf;

/// Inspect or reset the learned character-form history of a redb file.
#[derive(Parser)]
struct Args {
    /// Path to the history database
    #[arg(long, default_value = "form_history.redb")]
    db: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print every learned group and its width
    List {
        /// Emit a JSON object instead of text lines
        #[arg(long)]
        json: bool,
    },
    /// Forget everything that was learned
    Clear,
}

fn form_name(form: FormType) -> &'static str {
    match form {
        FormType::HalfWidth => "half",
        FormType::FullWidth => "full",
        FormType::Unknown => "unknown",
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    if !args.db.exists() {
        bail!("no history database at {}", args.db.display());
    }
    let history = FormHistory::open(&args.db)?;

    match args.command {
        Command::List { json } => {
            let mut entries: Vec<(String, FormType)> = history.snapshot()?.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            if json {
                let map: serde_json::Map<String, serde_json::Value> = entries
                    .into_iter()
                    .map(|(k, v)| (k, serde_json::Value::from(form_name(v))))
                    .collect();
                println!("{}", serde_json::to_string_pretty(&map)?);
            } else {
                println!("Opened history: {:?} ({} entries)", args.db, entries.len());
                for (key, form) in entries {
                    println!("  {:<24} {}", key, form_name(form));
                }
            }
        }
        Command::Clear => {
            history.clear()?;
            println!("Cleared {:?}", args.db);
        }
    }
    Ok(())
}
