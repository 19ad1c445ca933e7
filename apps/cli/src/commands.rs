//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use docdigest_core::{
    FileSummary, IngestOptions, MultiFileSummary, ReductionPath, RunReport, SummaryPipeline,
    SummaryProgress, SummaryValidator, prepare_file, write_summary,
};
use docdigest_generation::OpenRouterGenerator;
use docdigest_shared::{
    AppConfig, FileId, OutputFormat, PipelineConfig, init_config, load_config, validate_api_key,
};
use docdigest_storage::Storage;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// docdigest: budget-aware summaries of long documents.
#[derive(Parser)]
#[command(
    name = "docdigest",
    version,
    about = "Ingest text documents and turn them into sized, structured summaries.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Database path (overrides `[storage].db_path`).
    #[arg(long, global = true, env = "DOCDIGEST_DB")]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Chunk plain-text files and store them for summarization.
    Ingest {
        /// Files to ingest (UTF-8 text; form feeds separate pages).
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Words per fragment (overrides `[ingest].chunk_words`).
        #[arg(long)]
        chunk_words: Option<usize>,

        /// Words shared by consecutive fragments (overrides `[ingest].overlap`).
        #[arg(long)]
        overlap: Option<usize>,
    },

    /// List ingested files.
    Files,

    /// Summarize one file, or several files plus a combined summary.
    Summarize {
        /// File IDs, in the order they should be combined.
        #[arg(required = true)]
        ids: Vec<String>,

        /// Output markup: latex or markdown.
        #[arg(long)]
        format: Option<OutputFormat>,

        /// Word budget per batch.
        #[arg(long)]
        batch_words: Option<usize>,

        /// Final summary length as a fraction of the input.
        #[arg(long)]
        ratio: Option<f64>,

        /// Join batch summaries instead of running a reduction call.
        #[arg(long)]
        no_hierarchical: bool,

        /// Also write each produced summary to this directory.
        #[arg(long)]
        export_dir: Option<PathBuf>,

        /// Print the full result as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Print a stored summary.
    Show {
        /// Summary ID.
        summary_id: String,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

/// Overrides from `summarize` flags.
struct SummarizeOverrides {
    format: Option<OutputFormat>,
    batch_words: Option<usize>,
    ratio: Option<f64>,
    no_hierarchical: bool,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "docdigest=info",
        1 => "docdigest=debug",
        _ => "docdigest=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let db = cli.db;
    match cli.command {
        Command::Ingest {
            paths,
            chunk_words,
            overlap,
        } => cmd_ingest(db.as_deref(), &paths, chunk_words, overlap).await,
        Command::Files => cmd_files(db.as_deref()).await,
        Command::Summarize {
            ids,
            format,
            batch_words,
            ratio,
            no_hierarchical,
            export_dir,
            json,
        } => {
            let overrides = SummarizeOverrides {
                format,
                batch_words,
                ratio,
                no_hierarchical,
            };
            cmd_summarize(db.as_deref(), &ids, overrides, export_dir.as_deref(), json).await
        }
        Command::Show { summary_id } => cmd_show(db.as_deref(), &summary_id).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

fn db_path(config: &AppConfig, db: Option<&Path>) -> Result<PathBuf> {
    match db {
        Some(p) => Ok(p.to_path_buf()),
        None => Ok(config.storage.resolve_db_path()?),
    }
}

/// MIME type hint from the file extension.
fn content_type_for(path: &Path) -> Option<&'static str> {
    match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
        "txt" | "text" => Some("text/plain"),
        "md" | "markdown" => Some("text/markdown"),
        "tex" => Some("text/x-tex"),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_ingest(
    db: Option<&Path>,
    paths: &[PathBuf],
    chunk_words: Option<usize>,
    overlap: Option<usize>,
) -> Result<()> {
    let config = load_config()?;
    let mut options = IngestOptions::from(&config.ingest);
    if let Some(words) = chunk_words {
        options.chunk_words = words;
    }
    if let Some(overlap) = overlap {
        options.overlap = overlap;
    }

    let storage = Storage::open(&db_path(&config, db)?).await?;

    for path in paths {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| eyre!("'{}' has no file name", path.display()))?;
        let bytes =
            std::fs::read(path).map_err(|e| eyre!("cannot read '{}': {e}", path.display()))?;

        let prepared = prepare_file(&name, &bytes, content_type_for(path), &options)?;
        storage
            .ingest_file(&prepared.meta, &prepared.fragments)
            .await?;

        info!(
            file_id = %prepared.meta.id,
            name = %name,
            fragments = prepared.fragments.len(),
            "ingested file"
        );
        println!(
            "  {}  {name}  ({} fragments)",
            prepared.meta.id,
            prepared.fragments.len()
        );
    }

    Ok(())
}

async fn cmd_files(db: Option<&Path>) -> Result<()> {
    let config = load_config()?;
    let path = db_path(&config, db)?;
    if !path.exists() {
        println!("No files ingested yet.");
        return Ok(());
    }
    let storage = Storage::open_readonly(&path).await?;
    let files = storage.list_files().await?;

    if files.is_empty() {
        println!("No files ingested yet.");
        return Ok(());
    }

    for file in files {
        println!(
            "  {}  {}  {} bytes  {}",
            file.id,
            file.original_name,
            file.size,
            file.uploaded_at.format("%Y-%m-%d %H:%M")
        );
    }

    Ok(())
}

async fn cmd_summarize(
    db: Option<&Path>,
    ids: &[String],
    overrides: SummarizeOverrides,
    export_dir: Option<&Path>,
    json: bool,
) -> Result<()> {
    let config = load_config()?;
    let api_key = validate_api_key(&config)?;

    let file_ids = ids
        .iter()
        .map(|id| {
            id.parse::<FileId>()
                .map_err(|e| eyre!("invalid file id '{id}': {e}"))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut pipeline_config = PipelineConfig::from(&config);
    if let Some(format) = overrides.format {
        pipeline_config.output_format = format;
    }
    if let Some(words) = overrides.batch_words {
        if words == 0 {
            return Err(eyre!("--batch-words must be at least 1"));
        }
        pipeline_config.batch_words = words;
    }
    if let Some(ratio) = overrides.ratio {
        if !(ratio > 0.0 && ratio <= 1.0) {
            return Err(eyre!("--ratio must be in (0, 1], got {ratio}"));
        }
        pipeline_config.target_ratio = ratio;
    }
    if overrides.no_hierarchical {
        pipeline_config.hierarchical = false;
    }
    let format = pipeline_config.output_format;

    let storage = Storage::open(&db_path(&config, db)?).await?;
    let generator = OpenRouterGenerator::from_config(&config.openrouter, api_key)?;

    info!(
        files = file_ids.len(),
        model = generator.model(),
        format = %format,
        "starting summarization"
    );

    let reporter = CliProgress::new();
    let pipeline = SummaryPipeline::new(&storage, &generator, pipeline_config)
        .with_gate(SummaryValidator::from_config(&config.validator))
        .with_progress(&reporter);

    if let [file_id] = file_ids.as_slice() {
        let result = pipeline.summarize_file(file_id).await;
        reporter.finish();
        let result = result?;

        if let Some(dir) = export_dir {
            export_file_summary(&result, dir, format)?;
        }
        if json {
            println!("{}", serde_json::to_string_pretty(&result)?);
        } else {
            print_file_summary(&result, true);
        }
    } else {
        let result = pipeline.summarize_files(&file_ids).await;
        reporter.finish();
        let result = result?;

        if let Some(dir) = export_dir {
            export_multi_summary(&result, dir, format)?;
        }
        if json {
            println!("{}", serde_json::to_string_pretty(&result)?);
        } else {
            print_multi_summary(&result);
        }
    }

    Ok(())
}

async fn cmd_show(db: Option<&Path>, summary_id: &str) -> Result<()> {
    let config = load_config()?;
    let path = db_path(&config, db)?;
    if !path.exists() {
        return Err(eyre!("no database at '{}'", path.display()));
    }
    let storage = Storage::open_readonly(&path).await?;

    let record = storage
        .get_summary_by_id(summary_id)
        .await?
        .ok_or_else(|| eyre!("no summary with id '{summary_id}'"))?;

    let owner = record
        .file_id
        .map(|id| id.to_string())
        .unwrap_or_else(|| "combined".to_string());
    println!("  ID:      {}", record.id);
    println!("  File:    {owner}");
    println!("  Created: {}", record.created_at.to_rfc3339());
    println!();
    println!("{}", record.text);

    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

fn describe_path(path: Option<&ReductionPath>) -> String {
    match path {
        None | Some(ReductionPath::Empty) => "none".into(),
        Some(ReductionPath::Single) => "single batch".into(),
        Some(ReductionPath::Joined) => "joined".into(),
        Some(ReductionPath::Reduced) => "reduced".into(),
        Some(ReductionPath::FellBack(reason)) => format!("joined after failed reduction ({reason})"),
    }
}

fn describe_report(report: &RunReport) -> String {
    format!(
        "{}/{} valid ({} failed, {} rejected)",
        report.succeeded, report.attempted, report.failed, report.rejected
    )
}

fn print_file_summary(result: &FileSummary, with_text: bool) {
    println!();
    println!("  File:      {} ({})", result.file_name, result.file_id);
    println!(
        "  Summary:   {}",
        result.summary_id.as_deref().unwrap_or("not saved")
    );
    println!("  Batches:   {}", describe_report(&result.report));
    println!("  Reduction: {}", describe_path(result.reduction.as_ref()));
    if let Some(target) = result.target {
        println!(
            "  Target:    {} words ({} tokens)",
            target.target_words, target.token_budget
        );
    }
    if let Some(note) = &result.note {
        println!("  Note:      {note}");
    }
    if with_text && !result.summary.is_empty() {
        println!();
        println!("{}", result.summary);
    }
}

fn print_multi_summary(result: &MultiFileSummary) {
    for file in &result.per_file {
        print_file_summary(file, false);
    }

    let combined = &result.combined;
    println!();
    println!(
        "  Combined:  {}",
        combined.summary_id.as_deref().unwrap_or("not saved")
    );
    println!("  Batches:   {}", describe_report(&combined.report));
    println!("  Reduction: {}", describe_path(combined.reduction.as_ref()));
    if let Some(note) = &combined.note {
        println!("  Note:      {note}");
    }
    if !combined.summary.is_empty() {
        println!();
        println!("{}", combined.summary);
    }
}

fn export_prefix(file_name: &str) -> String {
    let stem = Path::new(file_name)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "document".to_string());
    format!("{stem}_summary")
}

fn export_file_summary(result: &FileSummary, dir: &Path, format: OutputFormat) -> Result<()> {
    if result.summary.is_empty() {
        return Ok(());
    }
    let path = write_summary(&result.summary, dir, &export_prefix(&result.file_name), format)?;
    println!("  Exported:  {}", path.display());
    Ok(())
}

fn export_multi_summary(result: &MultiFileSummary, dir: &Path, format: OutputFormat) -> Result<()> {
    for file in &result.per_file {
        export_file_summary(file, dir, format)?;
    }
    if !result.combined.summary.is_empty() {
        let path = write_summary(&result.combined.summary, dir, "combined_summary", format)?;
        println!("  Exported:  {}", path.display());
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl SummaryProgress for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn batch_progress(&self, current: usize, total: usize, detail: &str) {
        self.spinner
            .set_message(format!("Summarizing batch [{current}/{total}] {detail}"));
    }
}
