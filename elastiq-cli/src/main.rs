#[macro_use]
extern crate tracing;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use mimalloc::MiMalloc;
use query_executor::{
    ExecutionResult,
    ExecutorConfig,
    HttpTransport,
    MemoryTransport,
    QueryExecutor,
    Transport,
};
use search_query::{IndexDeclaration, QueryAggregator, QueryPayload, ResultShape, Validate};
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Debug, Parser)]
#[clap(name = "elastiq", about, version)]
struct Settings {
    /// The log level filter, any logs that are above this level won't
    /// be displayed.
    ///
    /// For more detailed control you can use the `RUST_LOG` env var.
    #[clap(long, default_value = "info", env)]
    log_level: Level,

    /// An optional bool to disable ASNI colours and pretty formatting for logs.
    /// You probably want to disable this if using file-based logging.
    #[clap(long, env)]
    disable_pretty_logs: bool,

    /// A optional directory to send persistent logs.
    ///
    /// Logs are split into hourly chunks.
    #[clap(long, env)]
    log_dir: Option<String>,

    /// The path of the index declaration (JSON).
    #[clap(long, short, env)]
    schema: PathBuf,

    /// The path of the query payload (JSON).
    #[clap(long, short, env)]
    query: PathBuf,

    /// The base url of the search backend.
    #[clap(long, short, default_value = "http://127.0.0.1:9200", env)]
    url: String,

    /// Runs the query against the documents of a local JSON array
    /// instead of the search backend.
    #[clap(long, env)]
    documents: Option<PathBuf>,

    /// Prints the compiled request without executing it.
    #[clap(long, env)]
    dry_run: bool,

    /// The largest result window the backend allows.
    #[clap(long, default_value = "10000", env)]
    max_result_window: usize,

    /// The number of groups fetched for a grouped query.
    ///
    /// If this is not set, the backend's default page size is used.
    #[clap(long, env)]
    group_bucket_size: Option<usize>,

    /// The number of documents fetched per group.
    #[clap(long, env)]
    group_hits_size: Option<usize>,
}

fn main() {
    let settings = Settings::parse();

    let _guard = setup_logger(
        settings.log_level,
        &settings.log_dir,
        !settings.disable_pretty_logs,
    );

    if let Err(e) = run(settings) {
        error!("error during query execution: {:?}", e);
        std::process::exit(1);
    }
}

fn setup_logger(
    level: Level,
    log_dir: &Option<String>,
    pretty: bool,
) -> Option<WorkerGuard> {
    if std::env::var_os("RUST_LOG").is_none() {
        std::env::set_var("RUST_LOG", format!("{},hyper=info", level));
    }

    // Results are written to stdout, logs never are.
    if let Some(dir) = log_dir {
        let file_appender = tracing_appender::rolling::hourly(dir, "elastiq_.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        let fmt = tracing_subscriber::fmt()
            .with_target(true)
            .with_writer(std::io::stderr.and(non_blocking))
            .with_env_filter(EnvFilter::from_default_env());

        if pretty {
            fmt.pretty().with_ansi(true).init();
        } else {
            fmt.json().with_ansi(false).init();
        }

        Some(guard)
    } else {
        let fmt = tracing_subscriber::fmt()
            .with_target(false)
            .with_writer(std::io::stderr)
            .with_env_filter(EnvFilter::from_default_env());

        if pretty {
            fmt.pretty().with_ansi(true).init();
        } else {
            fmt.compact().with_ansi(false).init();
        }

        None
    }
}

fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let buff = fs::read(path).with_context(|| format!("failed to read {:?}", path))?;
    let value = serde_json::from_slice(&buff)
        .with_context(|| format!("failed to deserialize {:?}", path))?;

    Ok(value)
}

fn run(settings: Settings) -> Result<()> {
    let schema: IndexDeclaration = load_json(&settings.schema)?;
    schema.validate()?;

    let payload: QueryPayload = load_json(&settings.query)?;

    let config = ExecutorConfig {
        index: schema.name().to_string(),
        max_result_window: settings.max_result_window,
        group_bucket_size: settings.group_bucket_size,
        group_hits_size: settings.group_hits_size,
    };
    config.validate()?;

    let (agg, shape) = payload.into_aggregator(&schema)?;
    info!(
        index = schema.name(),
        clauses = agg.clauses().len(),
        shape = ?shape,
        "compiled query"
    );

    if settings.dry_run {
        let executor = QueryExecutor::new(config, MemoryTransport::new(), &schema);
        let body = if shape == ResultShape::Count {
            serde_json::to_value(executor.build_count(&agg))?
        } else {
            serde_json::to_value(executor.build_search(&agg, shape)?)?
        };

        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    let result = match settings.documents {
        Some(ref path) => {
            let documents: Vec<JsonValue> = load_json(path)?;
            info!("loaded {} documents from {:?}", documents.len(), path);

            let transport = MemoryTransport::with_documents(schema.name(), documents);
            execute(config, transport, &schema, &agg, shape)?
        },
        None => {
            let transport = HttpTransport::new(settings.url.as_str())?;
            execute(config, transport, &schema, &agg, shape)?
        },
    };

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

#[instrument(name = "execute-query", level = "info", skip_all)]
fn execute<T: Transport>(
    config: ExecutorConfig,
    transport: T,
    schema: &IndexDeclaration,
    agg: &QueryAggregator,
    shape: ResultShape,
) -> Result<ExecutionResult<JsonValue>> {
    let executor = QueryExecutor::new(config, transport, schema);
    let result = executor.execute(agg, shape)?;

    Ok(result)
}
