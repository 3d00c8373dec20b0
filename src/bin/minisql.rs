use std::fs;
use std::io::Read;

use minisql_router::config::{ClusterOverrides, ConfigOverrides, TimeoutOverrides};
use minisql_router::{ResolutionMode, RouterConfig, Session};
use tracing_subscriber::EnvFilter;

fn parse_arg(flag: &str) -> Option<String> {
    let mut args = std::env::args();
    while let Some(arg) = args.next() {
        if arg == flag {
            return args.next();
        }
    }
    None
}

fn has_flag(flag: &str) -> bool {
    std::env::args().any(|arg| arg == flag)
}

fn print_help() {
    eprintln!(
        r#"minisql - route SQL statements across a MiniSQL cluster

USAGE:
    minisql [OPTIONS]

OPTIONS:
    -c, --config <FILE>          Path to config file (TOML)
    -e, --sql <TEXT>             SQL to execute (statements separated by ';')
    -f, --file <FILE>            Read SQL from a file (default: stdin)
    -m, --coordinators <ADDRS>   Override coordinator addresses (comma-separated)
        --resolution <MODE>      'cached' or 'failover'
        --coordinator-timeout <MS>
        --storage-timeout <MS>
        --tables                 List tables known to the cluster and exit
    -h, --help                   Print help

ENVIRONMENT:
    MINISQL_CONFIG                     Path to config file
    MINISQL_ROUTER__COORDINATORS       Coordinator addresses, e.g. '["10.0.0.1:8081"]'
    MINISQL_TIMEOUTS__COORDINATOR_MS   Coordinator deadline
    RUST_LOG                           Log filter (default: info)

CONFIG FILE (minisql.toml):
    [router]
    coordinators = ["10.0.0.1:8081", "10.0.0.2:8081"]
    resolution = "cached"

    [storage]
    port = 9090
"#
    );
}

fn build_overrides() -> anyhow::Result<ConfigOverrides> {
    let mut cluster = ClusterOverrides::default();
    let mut timeouts = TimeoutOverrides::default();

    if let Some(addrs) = parse_arg("--coordinators").or_else(|| parse_arg("-m")) {
        let coordinators: Vec<String> = addrs
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
            .collect();
        cluster.coordinators = Some(coordinators);
    }

    if let Some(mode) = parse_arg("--resolution") {
        cluster.resolution = Some(match mode.as_str() {
            "cached" => ResolutionMode::Cached,
            "failover" => ResolutionMode::Failover,
            other => anyhow::bail!("unknown resolution mode '{other}'"),
        });
    }

    if let Some(ms) = parse_arg("--coordinator-timeout") {
        timeouts.coordinator_ms = Some(ms.parse()?);
    }
    if let Some(ms) = parse_arg("--storage-timeout") {
        timeouts.storage_ms = Some(ms.parse()?);
    }

    let mut overrides = ConfigOverrides::default();
    if cluster.coordinators.is_some() || cluster.resolution.is_some() {
        overrides.router = Some(cluster);
    }
    if timeouts.coordinator_ms.is_some() || timeouts.storage_ms.is_some() {
        overrides.timeouts = Some(timeouts);
    }
    Ok(overrides)
}

fn read_sql() -> anyhow::Result<String> {
    if let Some(sql) = parse_arg("--sql").or_else(|| parse_arg("-e")) {
        return Ok(sql);
    }
    if let Some(path) = parse_arg("--file").or_else(|| parse_arg("-f")) {
        return Ok(fs::read_to_string(path)?);
    }
    let mut sql = String::new();
    std::io::stdin().read_to_string(&mut sql)?;
    Ok(sql)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if has_flag("-h") || has_flag("--help") {
        print_help();
        return Ok(());
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    // Load config: CLI > Env > File > Defaults
    let config_path = parse_arg("--config")
        .or_else(|| parse_arg("-c"))
        .or_else(|| std::env::var("MINISQL_CONFIG").ok());
    let config = RouterConfig::load(config_path.as_deref(), build_overrides()?)?;
    let mut session = Session::new(&config)?;

    if has_flag("--tables") {
        for table in session.list_tables().await? {
            println!("{table}");
        }
        return Ok(());
    }

    let sql = read_sql()?;
    let result = session.execute(&sql).await;

    for message in session.feed().iter() {
        println!("{message}");
    }
    if !session.table().is_empty() {
        println!();
        print!("{}", session.table());
    }

    let summary = result?;
    tracing::info!(
        succeeded = summary.succeeded,
        failed = summary.failed,
        "run complete"
    );
    Ok(())
}
