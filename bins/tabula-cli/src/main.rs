mod source;

use std::sync::Arc;

use clap::{Parser, Subcommand};

use tabula_api::query::Query;
use tabula_config_hcl::HclParser;
use tabula_engine::config::{TabulaConfig, TomlParser};
use tabula_engine::{Client, EngineError};

use crate::source::JsonDirExecutor;

#[derive(Parser)]
#[command(name = "tabula", about = "Query tabular sources and inspect their column types")]
struct Cli {
    /// Path to a TOML or HCL configuration file. Defaults apply when absent.
    #[arg(long, env = "TABULA_CONFIG")]
    config: Option<String>,

    /// Directory holding `<source>.json` row files.
    #[arg(long, default_value = ".", env = "TABULA_DATA")]
    data: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the rows of a query as JSON.
    Fetch {
        #[command(flatten)]
        query: QueryArgs,

        /// Run the query this many times; repeats are served from cache.
        #[arg(long, default_value_t = 1)]
        repeat: usize,

        /// Bypass the cache on the first run.
        #[arg(long)]
        refresh: bool,
    },
    /// Show which column type each column resolves to.
    Describe {
        #[command(flatten)]
        query: QueryArgs,
    },
}

#[derive(clap::Args)]
struct QueryArgs {
    /// Source to query; repeatable.
    #[arg(long = "source", required = true)]
    sources: Vec<String>,

    /// Input parameter as `name=value`; repeatable.
    #[arg(long = "input", value_parser = parse_input)]
    inputs: Vec<(String, String)>,
}

impl QueryArgs {
    fn to_query(&self) -> Query {
        let query = self.sources.iter().fold(Query::new(), |q, s| q.source(s));
        self.inputs
            .iter()
            .fold(query, |q, (name, value)| q.input(name, value))
    }
}

fn parse_input(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected name=value, got '{raw}'"))
}

fn load_config(path: Option<&str>) -> Result<TabulaConfig, EngineError> {
    match path {
        Some(path) => TabulaConfig::load_with(path, &[&TomlParser, &HclParser]),
        None => Ok(TabulaConfig::default()),
    }
}

async fn fetch(client: &Client, query: &Query, repeat: usize, refresh: bool) -> Result<(), EngineError> {
    for run in 0..repeat.max(1) {
        let rows = client.fetch(query, refresh && run == 0).await?;
        if run == 0 {
            let json = serde_json::to_string_pretty(&*rows).map_err(std::io::Error::from)?;
            println!("{json}");
        }
    }

    let stats = client.cache().stats();
    tracing::info!(
        hits = stats.hits,
        misses = stats.misses,
        fetches = stats.fetches,
        "cache statistics"
    );
    Ok(())
}

async fn describe(client: &Client, query: &Query) -> Result<(), EngineError> {
    let rows = client.fetch(query, false).await?;
    let Some(example) = rows.example_row() else {
        println!("no rows");
        return Ok(());
    };

    let registry = client.mapper().registry();
    let mut columns: Vec<&str> = example.columns().filter(|c| !c.contains('/')).collect();
    columns.sort_unstable();

    for column in columns {
        let column_type = registry.resolve(example, column);
        let representations: Vec<String> = column_type
            .representations()
            .iter()
            .map(|r| r.to_string())
            .collect();
        println!("{column}\t{}\t{}", column_type.name(), representations.join(","));
        for representation in column_type.representations() {
            match column_type.value_as(example, column, *representation) {
                Ok(value) => println!("  {representation}: {value}"),
                Err(e) => println!("  {representation}: <{e}>"),
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "failed to load config");
            std::process::exit(1);
        }
    };

    let executor = Arc::new(JsonDirExecutor::new(&cli.data));
    let client = match Client::from_config(executor, &config) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "failed to build client");
            std::process::exit(1);
        }
    };

    let result = match &cli.command {
        Command::Fetch {
            query,
            repeat,
            refresh,
        } => fetch(&client, &query.to_query(), *repeat, *refresh).await,
        Command::Describe { query } => describe(&client, &query.to_query()).await,
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "command failed");
        std::process::exit(1);
    }
}
