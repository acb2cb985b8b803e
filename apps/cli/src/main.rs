use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info};
use serde::de::DeserializeOwned;
use tokio::fs;

use clipdex_core::{
    CustomTagSpec, IndexBatch, Ingestor, IntervalAggregator, IntervalConfig, ReportOutcome,
    ReportSource, SearchClient, SearchConfig, StatusConfig, StatusLog, StorageConfig,
    VideoIndexReport, config::DEFAULT_INTERVAL_MS, source::decode_report_text,
};

#[derive(Parser)]
#[command(name = "clipdex")]
#[command(about = "Cut video-indexer insight reports into time buckets and index them for search")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the documents built from one report without uploading them
    Parse(ParseArgs),

    /// Create the search index from its schema file
    CreateIndex {
        #[command(flatten)]
        search: SearchArgs,

        #[command(flatten)]
        schema: SchemaArgs,
    },

    /// Upload every processed report of a source to the search index
    Ingest(IngestArgs),
}

#[derive(Args)]
struct IntervalArgs {
    /// Width of each time bucket in milliseconds
    #[arg(long, env = "MILLISECONDS_INTERVAL", default_value_t = DEFAULT_INTERVAL_MS)]
    interval_ms: u64,
}

impl IntervalArgs {
    fn aggregator(&self) -> Result<IntervalAggregator> {
        Ok(IntervalAggregator::new(IntervalConfig::new(self.interval_ms)?))
    }
}

#[derive(Args)]
struct ParseArgs {
    /// Insight report (JSON)
    report: PathBuf,

    #[command(flatten)]
    interval: IntervalArgs,

    /// Custom vision model predictions to merge (JSON array)
    #[arg(long, requires_all = ["tag_field", "tag_group"])]
    custom_tags: Option<PathBuf>,

    /// Field name of each custom tag record (e.g. "logo")
    #[arg(long)]
    tag_field: Option<String>,

    /// Slot the custom tag records are grouped under (e.g. "logos")
    #[arg(long)]
    tag_group: Option<String>,

    /// Print compact JSON instead of pretty-printed
    #[arg(long)]
    compact: bool,
}

#[derive(Args)]
struct SearchArgs {
    /// Search service name
    #[arg(long, env = "SEARCH_SERVICE_NAME")]
    search_service: String,

    /// Search REST API version
    #[arg(long, env = "SEARCH_API_VERSION")]
    search_api_version: String,

    /// Search admin API key
    #[arg(long, env = "SEARCH_API_KEY", hide_env_values = true)]
    search_api_key: String,

    /// Target index name
    #[arg(long, env = "SEARCH_INDEX_NAME")]
    index_name: String,
}

impl SearchArgs {
    fn client(&self) -> Result<SearchClient> {
        let config = SearchConfig::new(
            &self.search_service,
            &self.search_api_version,
            &self.search_api_key,
            &self.index_name,
        )?;
        Ok(SearchClient::new(config))
    }
}

#[derive(Args)]
struct SchemaArgs {
    /// Index schema (JSON)
    #[arg(long, env = "INDEX_SCHEMA_PATH")]
    schema: Option<PathBuf>,
}

#[derive(Args)]
struct IngestArgs {
    #[command(subcommand)]
    source: SourceCommand,

    #[command(flatten)]
    search: SearchArgs,

    #[command(flatten)]
    interval: IntervalArgs,

    /// Create the index before uploading
    #[arg(long)]
    create_index: bool,

    #[command(flatten)]
    schema: SchemaArgs,

    /// Reports processed at the same time
    #[arg(long, default_value_t = 1)]
    concurrency: usize,

    /// Directory of the ingested / failed report lists
    #[arg(long, env = "FILE_PROCESSING_LOGS_DIR")]
    status_dir: Option<PathBuf>,

    /// File listing ingested reports
    #[arg(long, env = "INGEST_LOG_FILENAME")]
    ingested_file: Option<String>,

    /// File listing reports that failed to ingest
    #[arg(long, env = "INGEST_FAILURE_LOG_FILENAME")]
    failed_file: Option<String>,
}

#[derive(Subcommand)]
enum SourceCommand {
    /// Reports in a local directory
    Local {
        #[arg(long, env = "VI_OUTPUT_DIRECTORY")]
        dir: PathBuf,
    },

    /// Reports in an Azure storage container
    Storage {
        #[arg(long, env = "STORAGE_CONNECTION_STRING", hide_env_values = true)]
        connection_string: String,

        #[arg(long, env = "INSIGHTS_CONTAINER_NAME")]
        container: String,
    },
}

fn create_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(spinner_style) = ProgressStyle::default_spinner()
        .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
        .template("{spinner:.cyan} {msg}")
    {
        pb.set_style(spinner_style);
    }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = fs::read(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&decode_report_text(&bytes)?)
        .with_context(|| format!("decoding {}", path.display()))
}

async fn parse(args: ParseArgs) -> Result<()> {
    let aggregator = args.interval.aggregator()?;
    let report: VideoIndexReport = read_json(&args.report).await?;
    debug!(
        "parsing {} with {} ms buckets",
        args.report.display(),
        aggregator.tokenizer().width_ms()
    );
    let mut intervals = aggregator.parse_report(&report)?;

    if let Some(path) = &args.custom_tags {
        let (Some(tag_field), Some(tag_group)) = (args.tag_field, args.tag_group) else {
            bail!("--custom-tags needs --tag-field and --tag-group");
        };
        let items: serde_json::Value = read_json(path).await?;
        let spec = CustomTagSpec {
            tag_field,
            tag_group,
        };
        aggregator.merge_custom_tags(&items, &spec, &mut intervals)?;
    }

    let batch = IndexBatch::upload(intervals);
    let json = if args.compact {
        serde_json::to_string(&batch)?
    } else {
        serde_json::to_string_pretty(&batch)?
    };
    println!("{json}");
    Ok(())
}

async fn create_index(client: &SearchClient, schema: &SchemaArgs) -> Result<()> {
    let Some(path) = &schema.schema else {
        bail!("no index schema given (--schema or INDEX_SCHEMA_PATH)");
    };
    let spinner = create_spinner(&format!(
        "Creating index {}...",
        client.config().index_name
    ));
    client.create_index(path).await?;
    spinner.finish_with_message(format!(
        "{} Index created: {}",
        style("✓").green().bold(),
        style(&client.config().index_name).cyan()
    ));
    Ok(())
}

async fn ingest(args: IngestArgs) -> Result<()> {
    let aggregator = args.interval.aggregator()?;
    let client = args.search.client()?;

    let source = match &args.source {
        SourceCommand::Local { dir } => ReportSource::local(dir)?,
        SourceCommand::Storage {
            connection_string,
            container,
        } => ReportSource::azure(&StorageConfig::from_connection_string(
            connection_string,
            container,
        )?)?,
    };
    let status = StatusLog::new(&StatusConfig::new(
        args.status_dir,
        args.ingested_file,
        args.failed_file,
    ));

    if args.create_index {
        create_index(&client, &args.schema).await?;
    }
    info!(
        "ingesting into index {} with {} ms buckets, concurrency {}",
        client.config().index_name,
        aggregator.tokenizer().width_ms(),
        args.concurrency
    );

    let ingestor = Ingestor {
        source: &source,
        aggregator: &aggregator,
        sink: &client,
        status: &status,
        concurrency: args.concurrency,
    };

    let spinner = create_spinner("Ingesting reports...");
    let mut done = 0;
    let summary = ingestor
        .run(|entry, outcome| {
            done += 1;
            match outcome {
                ReportOutcome::Ingested { documents } => spinner.println(format!(
                    "{} {} {}",
                    style("✓").green().bold(),
                    entry.name,
                    style(format!("({documents} documents)")).dim()
                )),
                ReportOutcome::Skipped { state } => spinner.println(format!(
                    "{} {} {}",
                    style("-").yellow().bold(),
                    entry.name,
                    style(format!("(state: {state})")).dim()
                )),
                ReportOutcome::Failed { reason } => spinner.println(format!(
                    "{} {}: {}",
                    style("✗").red().bold(),
                    entry.name,
                    reason
                )),
            }
            spinner.set_message(format!("Ingesting reports... {done} done"));
        })
        .await?;
    spinner.finish_and_clear();

    println!(
        "\n{} {} ingested, {} skipped, {} failed ({} documents)",
        style("Done:").dim(),
        style(summary.ingested.len()).green(),
        style(summary.skipped.len()).yellow(),
        style(summary.failed.len()).red(),
        summary.documents
    );
    println!(
        "{} {}",
        style("Status:").dim(),
        style(status.ingested_path().display()).cyan()
    );

    if !summary.failed.is_empty() {
        std::process::exit(1);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match cli.command {
        Command::Parse(args) => parse(args).await,
        Command::CreateIndex { search, schema } => {
            println!(
                "\n{}  {}\n",
                style("clipdex").cyan().bold(),
                style("Insight Indexer").dim()
            );
            create_index(&search.client()?, &schema).await
        }
        Command::Ingest(args) => {
            println!(
                "\n{}  {}\n",
                style("clipdex").cyan().bold(),
                style("Insight Indexer").dim()
            );
            ingest(args).await
        }
    }
}
