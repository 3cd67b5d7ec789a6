// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! CLI tool for interacting with word indexes

use clap::{ArgAction, CommandFactory, Parser, Subcommand, ValueEnum};
use humansize::{SizeFormatter, BINARY};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing_subscriber::{
    filter::{EnvFilter, LevelFilter},
    prelude::*,
    registry::Registry,
};
use word_index::{
    config::DEFAULT_MERGE_THRESHOLD, BlockFormat, Config, Index, TextDocument, WordEntry,
    WordSplitter,
};

macro_rules! die {
    ($fmt:literal, $($arg:tt)*) => {{
        eprintln!($fmt, $($arg)*);
        std::process::exit(1);
    }};

    ($msg:literal) => {{
        eprintln!($msg);
        std::process::exit(1);
    }};
}

#[allow(unused_imports)]
use tracing::{debug, error, info, trace, warn};

pub fn init_tracing(quiet: bool, verbose: u8) -> (bool, LevelFilter) {
    let is_verbose = !quiet && verbose > 0;

    let level_filter = if quiet {
        LevelFilter::ERROR
    } else {
        match verbose {
            0 => LevelFilter::WARN,
            1 => LevelFilter::INFO,
            2 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    };

    // Bridge log crate macros to tracing (for library code that uses log::*)
    if tracing_log::LogTracer::init().is_err() {
        die!("INTERNAL ERROR: setting log tracer failed");
    }

    let env_filter = EnvFilter::builder()
        .with_default_directive(level_filter.into())
        .with_env_var("WORDIDX_LOG")
        .from_env_lossy();

    let subscriber = Registry::default().with(env_filter).with(
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .compact(),
    );

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        die!("INTERNAL ERROR: setting default tracing::subscriber failed");
    }

    let prev_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        tracing_panic::panic_hook(info);
        prev_hook(info); // daisy-chain to old panic hook
    }));

    (is_verbose, level_filter)
}

fn parse_size_as_usize(s: &str) -> Result<usize, String> {
    let cfg = parse_size::Config::new().with_binary();
    cfg.parse_size(s)
        .map_err(|e| e.to_string())
        .and_then(|size| usize::try_from(size).map_err(|e| e.to_string()))
}

static DEFAULT_THRESHOLD: LazyLock<String> =
    LazyLock::new(|| SizeFormatter::new(DEFAULT_MERGE_THRESHOLD, BINARY).to_string());

#[derive(ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    /// Plain u32 posting lists
    Simple,

    /// Gamma-coded posting deltas
    Gamma,
}

impl From<FormatArg> for BlockFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Simple => Self::Simple,
            FormatArg::Gamma => Self::GammaCompressed,
        }
    }
}

/// CLI tool for interacting with word indexes
#[derive(Parser, Debug)]
#[command(name = "wordidx")]
#[command(about = "CLI tool for interacting with word indexes")]
struct ToolArgs {
    /// Suppress all output except for errors. This overrides the -v flag.
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Turn on verbose output. Supply -v multiple times to increase verbosity.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to the index file (will be created if it doesn't exist)
    index_path: PathBuf,

    /// Memtable size that triggers a merge (e.g., "1MiB", "4096")
    #[arg(
        short = 't', long,
        default_value = &**DEFAULT_THRESHOLD,
        value_parser = parse_size_as_usize,
        value_name = "THRESHOLD",
    )]
    merge_threshold: usize,

    /// Encoding of word blocks (must match the format the index was written with)
    #[arg(short, long, value_enum, default_value_t = FormatArg::Gamma)]
    format: FormatArg,

    /// Command to run
    #[command(subcommand)]
    command: ToolCommand,
}

#[derive(Subcommand, Debug, Clone)]
enum ToolCommand {
    /// Index text files (re-adding a file replaces it)
    Add {
        /// Files to index
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Lowercase all words
        #[arg(short = 'l', long = "lowercase")]
        lowercase: bool,
    },
    /// Remove documents by path
    #[command(visible_alias = "rm")]
    Remove {
        /// Document paths, as listed by `files`
        #[arg(required = true)]
        paths: Vec<String>,
    },
    /// List documents containing a word
    Query {
        /// The word to look up
        word: String,
    },
    /// List words starting with a prefix
    Prefix {
        /// The word prefix
        prefix: String,

        /// Ignore case
        #[arg(short = 'i', long = "ignore-case")]
        ignore_case: bool,

        /// List the referring documents instead of the words
        #[arg(short = 'd', long = "documents")]
        documents: bool,
    },
    /// List words matching a wildcard pattern (`*` and `?`)
    Match {
        /// The wildcard pattern
        pattern: String,

        /// Ignore case
        #[arg(short = 'i', long = "ignore-case")]
        ignore_case: bool,
    },
    /// List documents, optionally filtered by a path substring
    #[command(visible_alias = "ls")]
    Files {
        /// Optional path substring
        substring: Option<String>,
    },
    /// Force a merge
    Merge,
    /// Show index statistics
    Info,
}

fn handle_add(index: &mut Index, files: &[PathBuf], lowercase: bool) -> word_index::Result<()> {
    let mut splitter = WordSplitter::new().lowercase(lowercase);

    for file in files {
        let text = match std::fs::read_to_string(file) {
            Ok(text) => text,
            Err(e) => {
                eprintln!("Skipping {}: {e}", file.display());
                continue;
            }
        };

        let document = TextDocument::new(file.to_string_lossy(), text);
        index.add(&document, &mut splitter)?;
        debug!("Indexed {}", file.display());
    }

    index.save()?;
    println!("OK ({} documents)", index.num_documents()?);
    Ok(())
}

fn handle_remove(index: &mut Index, paths: &[String]) -> word_index::Result<()> {
    let mut missing = None;

    for path in paths {
        match index.remove(path) {
            Ok(()) => {}
            Err(word_index::Error::DocumentNotFound(path)) => {
                eprintln!("Not found: {path}");
                missing.get_or_insert(path);
            }
            Err(e) => return Err(e),
        }
    }

    // Documents that were found are removed regardless
    index.save()?;

    if let Some(path) = missing {
        return Err(word_index::Error::DocumentNotFound(path));
    }

    println!("OK ({} documents)", index.num_documents()?);
    Ok(())
}

fn print_paths(paths: &[String]) {
    for path in paths {
        println!("{path}");
    }
    println!("OK ({} documents)", paths.len());
}

fn print_entries(entries: &[WordEntry]) {
    for entry in entries {
        println!("{} ({})", entry.word(), entry.len());
    }
    println!("OK ({} words)", entries.len());
}

fn handle_info(index: &mut Index, path: &Path) -> word_index::Result<()> {
    println!("Path: {}", path.display());
    println!("Documents: {}", index.num_documents()?);
    println!("Words: {}", index.num_words()?);
    println!(
        "Disk space: {}",
        SizeFormatter::new(index.disk_size()?, BINARY)
    );
    Ok(())
}

fn execute_command(index: &mut Index, path: &Path, cmd: ToolCommand) -> word_index::Result<()> {
    match cmd {
        ToolCommand::Add { files, lowercase } => handle_add(index, &files, lowercase),
        ToolCommand::Remove { paths } => handle_remove(index, &paths),
        ToolCommand::Query { word } => {
            print_paths(&index.query(&word)?);
            Ok(())
        }
        ToolCommand::Prefix {
            prefix,
            ignore_case,
            documents,
        } => {
            if documents {
                print_paths(&index.query_files_referring_to_prefix(&prefix)?);
            } else {
                print_entries(&index.query_entries_prefixed_by(&prefix, !ignore_case)?);
            }
            Ok(())
        }
        ToolCommand::Match {
            pattern,
            ignore_case,
        } => {
            print_entries(&index.query_entries_matching(&pattern, !ignore_case)?);
            Ok(())
        }
        ToolCommand::Files { substring } => {
            print_paths(&index.query_in_document_names(substring.as_deref().unwrap_or(""))?);
            Ok(())
        }
        ToolCommand::Merge => {
            index.merge()?;
            println!("OK (merged)");
            Ok(())
        }
        ToolCommand::Info => handle_info(index, path),
    }
}

fn main() {
    let args = ToolArgs::parse();
    let (verbose, level_filter) = init_tracing(args.quiet, args.verbose);

    let cmd = ToolArgs::command();

    info!(
        "starting {} ({} {}), log level: {level_filter}",
        cmd.get_name(),
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    );

    let note = if verbose {
        ""
    } else {
        ". Note: Use -v (one or multiple times) for more information"
    };

    let mut index = match Config::new(&args.index_path)
        .merge_threshold(args.merge_threshold)
        .block_format(args.format.into())
        .open()
    {
        Ok(index) => index,
        Err(e) => die!("Error opening index: {}{}", e, note),
    };

    if let Err(e) = execute_command(&mut index, &args.index_path, args.command) {
        die!("Error: {}{}", e, note);
    }

    if let Err(e) = index.close() {
        die!("Error closing index: {}{}", e, note);
    }
}
