use anyhow::Context;
use clap::{Parser, ValueEnum};
use futures::future::join_all;
use rgs_a2s::{Client, ClientBuilder, QueryError};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Query {
    Info,
    Players,
    Rules,
    All,
}

/// Query Source engine game servers over A2S
#[derive(Parser, Debug)]
#[command(name = "rgs-a2s")]
struct Args {
    /// Servers to query, as host:port
    #[arg(required = true)]
    targets: Vec<String>,

    /// Which query to run against every target
    #[arg(short, long, value_enum, default_value = "info")]
    query: Query,

    /// Receive timeout per datagram, in milliseconds
    #[arg(short, long, default_value_t = 1000)]
    timeout_ms: u64,

    /// Give up on a target after this many milliseconds in total
    #[arg(long, default_value_t = 15000)]
    deadline_ms: u64,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn render<T: serde::Serialize>(result: Result<T, QueryError>) -> Value {
    match result {
        Ok(v) => serde_json::to_value(v).unwrap_or_else(|e| json!({ "error": e.to_string() })),
        Err(e) => json!({ "error": e.to_string() }),
    }
}

fn run(client: &Client, query: Query) -> Value {
    match query {
        Query::Info => render(client.query_server_info()),
        Query::Players => render(client.query_players()),
        Query::Rules => render(client.query_rules()),
        Query::All => json!({
            "info": render(client.query_server_info()),
            "players": render(client.query_players()),
            "rules": render(client.query_rules()),
        }),
    }
}

async fn query_target(target: String, args: &Args) -> Value {
    let client = match ClientBuilder::resolve(target.as_str()) {
        Ok(builder) => builder
            .with_timeout(Duration::from_millis(args.timeout_ms))
            .build(),
        Err(e) => return json!({ "target": target, "error": e.to_string() }),
    };
    let query = args.query;
    let deadline = Duration::from_millis(args.deadline_ms);

    // Each target gets its own connection on a blocking worker.
    let task = tokio::task::spawn_blocking(move || run(&client, query));
    let result = match tokio::time::timeout(deadline, task).await {
        Ok(Ok(v)) => v,
        Ok(Err(e)) => json!({ "error": format!("Query task failed: {}", e) }),
        Err(_) => json!({ "error": "Deadline exceeded" }),
    };
    debug!(%target, "Finished");

    json!({ "target": target, "result": result })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&args.log_level))
        .context("Invalid log filter")?;
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let results = join_all(
        args.targets
            .iter()
            .cloned()
            .map(|target| query_target(target, &args)),
    )
    .await;

    println!(
        "{}",
        serde_json::to_string_pretty(&results).context("Failed to render results")?
    );

    Ok(())
}
