//! mdc-studio: CLI tool to open MDC markdown as editor documents and save
//! them back

mod config;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rayon::prelude::*;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use config::{CONFIG_FILE_NAME, Config};
use mdc_ast::{WriterOptions, tree_to_markdown};
use mdc_editor::{
    EditorDoc, ReverseOptions, SyntaxHighlighter, editor_to_markup_with_options,
    markup_to_editor_with_options, word_diff_with_options,
};
use mdc_parser::parse;

#[derive(Parser, Debug)]
#[command(name = "mdc-studio")]
#[command(about = "Open MDC markdown as editor documents and save them back")]
#[command(version)]
#[command(after_help = "Examples:
  mdc-studio open page.md -o page.json     # Markdown to editor JSON
  mdc-studio save page.json -o page.md     # Editor JSON back to markdown
  mdc-studio check content/ -r -j4         # Round-trip check a directory
  mdc-studio diff old.md new.md            # Word diff as JSON spans")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Configuration file (defaults to _mdc-studio.toml next to the input)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode - only show errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert a markdown file to an editor document (JSON)
    Open {
        /// Input markdown file
        input: PathBuf,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Keep `:shortcode:` text instead of emoji nodes
        #[arg(long)]
        no_emoji: bool,
    },

    /// Convert an editor document (JSON) back to markdown
    Save {
        /// Input editor document
        input: PathBuf,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write the markup tree as JSON instead of markdown
        #[arg(long)]
        ast: bool,

        /// Highlight code blocks (decoration shows in --ast output)
        #[arg(long)]
        highlight: bool,

        /// Do not write the frontmatter block
        #[arg(long)]
        no_frontmatter: bool,
    },

    /// Check that markdown files survive an editor round trip
    Check {
        /// Input markdown file or directory
        input: PathBuf,

        /// Process directories recursively
        #[arg(short, long)]
        recursive: bool,

        /// Number of parallel jobs (defaults to number of CPUs)
        #[arg(short, long)]
        jobs: Option<usize>,
    },

    /// Word diff of two text files
    Diff {
        /// Original text
        original: PathBuf,

        /// Updated text
        updated: PathBuf,
    },

    /// Write a sample configuration file
    Init {
        /// Directory to write the configuration file into
        #[arg(default_value = ".")]
        dir: PathBuf,

        /// Overwrite an existing configuration file
        #[arg(long)]
        force: bool,
    },

    /// Print the JSON schema of the configuration file
    Schema,
}

impl Command {
    /// Path whose directory is searched for a configuration file
    fn input(&self) -> Option<&Path> {
        match self {
            Command::Open { input, .. }
            | Command::Save { input, .. }
            | Command::Check { input, .. } => Some(input),
            Command::Diff { updated, .. } => Some(updated),
            Command::Init { .. } | Command::Schema => None,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let config = load_config(cli.config.as_deref(), cli.command.input())?;

    match cli.command {
        Command::Open {
            input,
            output,
            no_emoji,
        } => open(&input, output.as_deref(), no_emoji, &config, cli.quiet),
        Command::Save {
            input,
            output,
            ast,
            highlight,
            no_frontmatter,
        } => {
            let options = SaveOptions {
                ast,
                highlight: highlight || config.highlight_enabled(),
                writer: WriterOptions {
                    skip_frontmatter: no_frontmatter,
                },
            };
            save(&input, output.as_deref(), &options, &config, cli.quiet)
        }
        Command::Check {
            input,
            recursive,
            jobs,
        } => check(&input, recursive, jobs, &config, cli.quiet),
        Command::Diff { original, updated } => diff(&original, &updated, &config),
        Command::Init { dir, force } => init(&dir, force, cli.quiet),
        Command::Schema => {
            println!("{}", Config::json_schema_string()?);
            Ok(())
        }
    }
}

fn init_logging(verbose: bool, quiet: bool) {
    let default = if quiet {
        "error"
    } else if verbose {
        "info"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Explicit `--config` wins; otherwise look next to the input, then in the
/// working directory
fn load_config(explicit: Option<&Path>, input: Option<&Path>) -> Result<Config> {
    if let Some(path) = explicit {
        return Config::load(path);
    }

    let dir = match input {
        Some(path) if path.is_dir() => path.to_path_buf(),
        Some(path) => path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(".")),
        None => PathBuf::from("."),
    };

    match Config::load_from_dir(&dir)? {
        Some(config) => {
            info!("Using {}", dir.join(CONFIG_FILE_NAME).display());
            Ok(config)
        }
        None => Ok(Config::default()),
    }
}

/// Markdown file to editor document
fn open(
    input: &Path,
    output: Option<&Path>,
    no_emoji: bool,
    config: &Config,
    quiet: bool,
) -> Result<()> {
    let content = fs::read_to_string(input)
        .with_context(|| format!("Failed to read: {}", input.display()))?;
    let tree = parse(&content).with_context(|| format!("Failed to parse: {}", input.display()))?;

    let mut options = config.forward_options();
    if no_emoji {
        options.resolve_emoji = false;
    }
    let doc = markup_to_editor_with_options(&tree, &options);
    debug!(nodes = doc.content.len(), "Opened {}", input.display());

    let json = to_json(&doc, config.pretty())?;
    emit(output, &json, quiet)
}

struct SaveOptions {
    ast: bool,
    highlight: bool,
    writer: WriterOptions,
}

/// Editor document back to markdown (or markup JSON)
fn save(
    input: &Path,
    output: Option<&Path>,
    options: &SaveOptions,
    config: &Config,
    quiet: bool,
) -> Result<()> {
    let content = fs::read_to_string(input)
        .with_context(|| format!("Failed to read: {}", input.display()))?;
    let doc = EditorDoc::from_json(&content)
        .with_context(|| format!("Invalid editor document: {}", input.display()))?;

    let highlighter = options.highlight.then(SyntaxHighlighter::new);
    let themes = config.themes();
    if let Some(highlighter) = &highlighter {
        for theme in std::iter::once(&themes.default).chain(themes.variants.values()) {
            if !highlighter.has_theme(theme) {
                warn!("Unknown highlight theme: {}", theme);
            }
        }
    }
    let reverse = ReverseOptions {
        highlighter: highlighter.as_ref(),
        themes,
    };
    let tree = editor_to_markup_with_options(&doc, &reverse);

    let rendered = if options.ast {
        to_json(&tree, config.pretty())?
    } else {
        tree_to_markdown(&tree, &options.writer)
    };
    emit(output, &rendered, quiet)
}

/// Round-trip check of markdown files
fn check(
    input: &Path,
    recursive: bool,
    jobs: Option<usize>,
    config: &Config,
    quiet: bool,
) -> Result<()> {
    let files = if input.is_file() {
        vec![input.to_path_buf()]
    } else if input.is_dir() {
        collect_md_files(input, recursive)?
    } else {
        anyhow::bail!("Input path does not exist: {}", input.display());
    };

    if files.is_empty() {
        if !quiet {
            eprintln!("No .md files found in {}", input.display());
        }
        return Ok(());
    }
    info!("Found {} .md files", files.len());

    // Configure thread pool if jobs specified
    if let Some(n) = jobs {
        rayon::ThreadPoolBuilder::new()
            .num_threads(n)
            .build_global()
            .ok(); // Ignore error if already initialized
    }

    let passed = AtomicUsize::new(0);
    let failed = AtomicUsize::new(0);

    let errors: Vec<_> = files
        .par_iter()
        .filter_map(|file| match check_file(file, config) {
            Ok(()) => {
                passed.fetch_add(1, Ordering::Relaxed);
                None
            }
            Err(e) => {
                failed.fetch_add(1, Ordering::Relaxed);
                Some((file.clone(), e))
            }
        })
        .collect();

    for (file, e) in &errors {
        eprintln!("{}: {:#}", file.display(), e);
    }

    let passed_count = passed.load(Ordering::Relaxed);
    let failed_count = failed.load(Ordering::Relaxed);

    if !quiet {
        eprintln!("Checked {} files, {} failed", passed_count + failed_count, failed_count);
    }

    if failed_count > 0 {
        anyhow::bail!("{} files failed the round trip", failed_count);
    }

    Ok(())
}

/// Parse, convert there and back, and compare rendered markdown
fn check_file(path: &Path, config: &Config) -> Result<()> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read: {}", path.display()))?;
    let tree = parse(&content)?;

    let writer = WriterOptions::default();
    let expected = tree_to_markdown(&tree, &writer);

    let doc = markup_to_editor_with_options(&tree, &config.forward_options());
    let back = editor_to_markup_with_options(&doc, &ReverseOptions::default());
    let actual = tree_to_markdown(&back, &writer);

    if actual != expected {
        let changed = word_diff_with_options(&expected, &actual, &config.diff_options())
            .into_iter()
            .filter(|span| span.kind == mdc_editor::SpanKind::Added)
            .map(|span| span.text)
            .collect::<Vec<_>>();
        anyhow::bail!("round trip differs (added: {:?})", changed);
    }
    Ok(())
}

fn diff(original: &Path, updated: &Path, config: &Config) -> Result<()> {
    let before = fs::read_to_string(original)
        .with_context(|| format!("Failed to read: {}", original.display()))?;
    let after = fs::read_to_string(updated)
        .with_context(|| format!("Failed to read: {}", updated.display()))?;

    let spans = word_diff_with_options(&before, &after, &config.diff_options());
    println!("{}", to_json(&spans, config.pretty())?);
    Ok(())
}

fn init(dir: &Path, force: bool, quiet: bool) -> Result<()> {
    let path = dir.join(CONFIG_FILE_NAME);
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }

    let content = Config::sample().to_toml_with_schema()?;
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
    fs::write(&path, content).with_context(|| format!("Failed to write: {}", path.display()))?;

    if !quiet {
        println!("{}", path.display());
    }
    Ok(())
}

/// Collect all .md files in a directory
fn collect_md_files(dir: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in
        fs::read_dir(dir).with_context(|| format!("Failed to read directory: {}", dir.display()))?
    {
        let entry = entry?;
        let path = entry.path();

        if path.is_file() {
            if let Some(ext) = path.extension()
                && ext.eq_ignore_ascii_case("md")
            {
                files.push(path);
            }
        } else if path.is_dir() && recursive {
            files.extend(collect_md_files(&path, recursive)?);
        }
    }

    files.sort();
    Ok(files)
}

fn to_json<T: Serialize>(value: &T, pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    json.context("Failed to serialize JSON")
}

/// Write to a file, or to stdout without one
fn emit(output: Option<&Path>, content: &str, quiet: bool) -> Result<()> {
    let Some(path) = output else {
        print!("{content}");
        if !content.ends_with('\n') {
            println!();
        }
        return Ok(());
    };

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    fs::write(path, content).with_context(|| format!("Failed to write: {}", path.display()))?;

    if !quiet {
        println!("{}", path.display());
    }
    Ok(())
}
