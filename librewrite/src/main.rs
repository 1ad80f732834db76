use anyhow::{Context, Result};
use clap::Parser;
use librewrite::{
    default_converter, CharacterFormManager, CharacterFormObserver, Config, ConversionRequest,
    DictionarySource, FormHistory, RequestType, SessionCommand, SessionObserver,
    SessionObserverHandler, Segments,
};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Run the rewriter chain over segmented readings read from stdin.
///
/// Each input line is one conversion; `|` separates segment keys, e.g.
/// `1+|2=` or `abc`.
#[derive(Parser)]
struct Args {
    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// redb file holding learned width preferences (in-memory if omitted)
    #[arg(long)]
    history: Option<PathBuf>,

    /// Tab-separated dictionary: reading, value, cost
    #[arg(long)]
    dict: Option<PathBuf>,

    /// Disable the calculator regardless of the configuration
    #[arg(long)]
    no_calculator: bool,

    /// Run as a suggestion request with conversion results mixed in
    #[arg(long)]
    mixed: bool,

    /// Commit the top candidate of every segment and learn from it
    #[arg(long)]
    learn: bool,
}

fn load_dictionary(path: &Path) -> Result<DictionarySource> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading dictionary {}", path.display()))?;
    let mut dict = DictionarySource::new();
    for (lineno, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let parts: Vec<&str> = line.split('\t').collect();
        if parts.len() < 2 {
            eprintln!("⚠ {}:{}: expected reading<TAB>value[<TAB>cost]", path.display(), lineno + 1);
            continue;
        }
        let cost = parts
            .get(2)
            .and_then(|c| c.trim().parse().ok())
            .unwrap_or(0);
        dict.insert(parts[0], parts[1], cost);
    }
    Ok(dict)
}

fn print_segments(segments: &Segments) {
    for (i, segment) in segments.conversion_segments().iter().enumerate() {
        println!("[{}] {}", i, segment.key());
        for (j, candidate) in segment.candidates().iter().enumerate() {
            if candidate.description.is_empty() {
                println!("  {:>2}. {}", j, candidate.value);
            } else {
                println!("  {:>2}. {}  ({})", j, candidate.value, candidate.description);
            }
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load_toml(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => Config::default(),
    };
    if args.no_calculator {
        config.set_use_calculator(false);
    }

    let store = match &args.history {
        Some(path) => FormHistory::open(path)?,
        None => FormHistory::new_in_memory(),
    };
    let manager = Arc::new(CharacterFormManager::from_config(&config, store)?);

    let dict = match &args.dict {
        Some(path) => load_dictionary(path)?,
        None => DictionarySource::new(),
    };
    let converter = default_converter(Box::new(dict), Arc::clone(&manager));

    let mut observers = SessionObserverHandler::new();
    observers.add_observer(Arc::new(CharacterFormObserver::new(Arc::clone(&manager))));

    let mut request = ConversionRequest::new(Arc::new(config));
    if args.mixed {
        request = request
            .with_request_type(RequestType::Suggestion)
            .with_mixed_conversion(true);
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    for line in stdin.lock().lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let keys: Vec<&str> = line.split('|').filter(|k| !k.is_empty()).collect();
        let mut segments = Segments::new();
        if !converter.start_conversion(&request, &mut segments, &keys) {
            eprintln!("⚠ no conversion for {:?}", line);
            continue;
        }
        print_segments(&segments);

        if args.learn {
            for segment in segments.conversion_segments() {
                if let Some(top) = segment.candidate(0) {
                    observers.eval_command_handler(&SessionCommand::Commit {
                        candidate: top.clone(),
                    });
                }
            }
        }
        stdout.flush()?;
    }

    Ok(())
}
