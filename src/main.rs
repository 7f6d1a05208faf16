use clap::{Args, Parser, Subcommand};
use std::io::Write;
use tailview_client::{IngestRecord, QueryClient, Session, SessionUpdate, ViewMode};
use tailview_core::config::Config;
use tailview_core::filter::TimeRange;
use tailview_core::{FilterCriteria, LogLevel, Pagination};
use tailview::render;

#[derive(Parser)]
#[command(name = "tailview", about = "Live-tail and search client for the logging service")]
struct Cli {
    /// Write debug logs to /tmp/tailview-debug.log (tail -f to inspect).
    #[arg(long)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Follow the live stream, printing entries as they are admitted.
    Tail {
        #[command(flatten)]
        filter: FilterArgs,
        /// Maximum entries kept in the live buffer.
        #[arg(long)]
        capacity: Option<usize>,
    },
    /// Run one historical query and print the resulting page.
    Search {
        #[command(flatten)]
        filter: FilterArgs,
        #[command(flatten)]
        range: RangeArgs,
        #[arg(long, default_value_t = 1)]
        page: usize,
        #[arg(long)]
        size: Option<usize>,
    },
    /// List service names for an environment.
    Services {
        #[arg(long)]
        env: Option<String>,
    },
    /// Send one test record through the ingest pipeline.
    Send {
        #[arg(long, default_value = "tailview")]
        module: String,
        #[arg(long, default_value = "test-service")]
        service: String,
        #[arg(long)]
        env: Option<String>,
        #[arg(long, default_value = "INFO")]
        level: String,
        #[arg(long)]
        message: String,
    },
    /// Download an NDJSON export of everything matching the filter.
    Export {
        #[command(flatten)]
        filter: FilterArgs,
        #[command(flatten)]
        range: RangeArgs,
        /// Output path; stdout when omitted.
        #[arg(long)]
        out: Option<std::path::PathBuf>,
    },
    /// Delete records older than the cutoff, optionally for one module.
    Purge {
        /// RFC 3339 cutoff; everything older is deleted.
        #[arg(long)]
        cutoff: String,
        #[arg(long)]
        module: Option<String>,
    },
    /// Read-only statistics and aggregations.
    Stats {
        #[command(subcommand)]
        command: StatsCommand,
    },
}

#[derive(Subcommand)]
enum StatsCommand {
    /// Per-level and per-module record counts.
    Overview,
    /// Hourly counts for one level over the last N hours.
    Hourly {
        #[arg(long, default_value = "ERROR")]
        level: String,
        #[arg(long, default_value_t = 24)]
        hours: u32,
    },
    /// Bucketed counts for a filter.
    Histogram {
        #[command(flatten)]
        filter: FilterArgs,
        #[command(flatten)]
        range: RangeArgs,
        #[arg(long, default_value = "hour")]
        interval: String,
    },
    /// Busiest services in a time window.
    TopServices(TopArgs),
    /// Busiest origin addresses in a time window.
    TopAddresses(TopArgs),
    /// Most frequent error types in a time window.
    TopErrors(TopArgs),
}

#[derive(Args)]
struct FilterArgs {
    #[arg(long)]
    module: Option<String>,
    #[arg(long)]
    service: Option<String>,
    #[arg(long)]
    env: Option<String>,
    /// TRACE, DEBUG, INFO, WARN, or ERROR (case-insensitive).
    #[arg(long)]
    level: Option<String>,
    /// Case-insensitive substring matched against the whole entry.
    #[arg(long)]
    keyword: Option<String>,
}

impl FilterArgs {
    fn to_criteria(&self, config: &Config, range: Option<TimeRange>) -> anyhow::Result<FilterCriteria> {
        let level = match self.level.as_deref() {
            Some(s) => Some(s.parse::<LogLevel>()?),
            None => None,
        };
        Ok(FilterCriteria {
            module: self.module.clone(),
            service: self.service.clone(),
            env: Some(self.env.clone().unwrap_or_else(|| config.query.default_env.clone())),
            level,
            keyword: self.keyword.clone(),
            range,
        }
        .normalized())
    }
}

#[derive(Args)]
struct RangeArgs {
    /// RFC 3339 window start; defaults to one hour before the end.
    #[arg(long)]
    start: Option<String>,
    /// RFC 3339 window end; defaults to now.
    #[arg(long)]
    end: Option<String>,
}

impl RangeArgs {
    fn to_range(&self) -> anyhow::Result<Option<TimeRange>> {
        if self.start.is_none() && self.end.is_none() {
            return Ok(None);
        }
        let end = match self.end.as_deref() {
            Some(s) => parse_instant(s)?,
            None => chrono::Utc::now(),
        };
        let start = match self.start.as_deref() {
            Some(s) => parse_instant(s)?,
            None => end - chrono::Duration::hours(1),
        };
        Ok(Some(TimeRange::new(start, end)?))
    }

    /// Like [`to_range`](Self::to_range) but falls back to the last 24 hours
    /// for endpoints that always need a window.
    fn to_range_or_last_day(&self) -> anyhow::Result<TimeRange> {
        if let Some(range) = self.to_range()? {
            return Ok(range);
        }
        let end = chrono::Utc::now();
        let range = TimeRange::new(end - chrono::Duration::hours(24), end)
            .expect("24h window is ordered");
        Ok(range)
    }
}

#[derive(Args)]
struct TopArgs {
    #[command(flatten)]
    range: RangeArgs,
    #[arg(long, default_value_t = 10)]
    limit: usize,
}

fn parse_instant(s: &str) -> anyhow::Result<chrono::DateTime<chrono::Utc>> {
    Ok(chrono::DateTime::parse_from_rfc3339(s)
        .map_err(|e| anyhow::anyhow!("invalid instant {s:?}: {e}"))?
        .with_timezone(&chrono::Utc))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug)?;

    let config = Config::load().unwrap_or_else(|_| Config::defaults());
    run(cli.command, config).await
}

fn init_tracing(debug: bool) -> anyhow::Result<()> {
    if debug {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open("/tmp/tailview-debug.log")?;
        tracing_subscriber::fmt()
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_env("RUST_LOG")
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
            )
            .init();
        tracing::info!("tailview debug log started — tail -f /tmp/tailview-debug.log");
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_env("RUST_LOG")
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .init();
    }
    Ok(())
}

async fn run(command: Command, config: Config) -> anyhow::Result<()> {
    match command {
        Command::Tail { filter, capacity } => tail(&config, filter, capacity).await,
        Command::Search { filter, range, page, size } => {
            search(&config, filter, range, page, size).await
        }
        Command::Services { env } => {
            let client = QueryClient::new(&config.api);
            let env = env.unwrap_or_else(|| config.query.default_env.clone());
            for service in client.services(Some(&env)).await? {
                println!("{service}");
            }
            Ok(())
        }
        Command::Send { module, service, env, level, message } => {
            let client = QueryClient::new(&config.api);
            let record = IngestRecord {
                module,
                service,
                env: env.unwrap_or_else(|| config.query.default_env.clone()),
                level: level.parse::<LogLevel>()?,
                message,
                timestamp: chrono::Utc::now(),
            };
            let id = client.ingest(&record).await?;
            println!("sent: {id}");
            Ok(())
        }
        Command::Export { filter, range, out } => {
            let client = QueryClient::new(&config.api);
            let criteria = filter.to_criteria(&config, range.to_range()?)?;
            let body = client.export(&criteria).await?;
            match out {
                Some(path) => {
                    std::fs::write(&path, &body)?;
                    eprintln!("wrote {} bytes to {}", body.len(), path.display());
                }
                None => std::io::stdout().write_all(&body)?,
            }
            Ok(())
        }
        Command::Purge { cutoff, module } => {
            let client = QueryClient::new(&config.api);
            let cutoff = parse_instant(&cutoff)?;
            match module {
                Some(module) => {
                    client.delete_module_before(&module, cutoff).await?;
                    println!("purged {module} records before {cutoff}");
                }
                None => {
                    client.delete_before(cutoff).await?;
                    println!("purged records before {cutoff}");
                }
            }
            Ok(())
        }
        Command::Stats { command } => stats(&config, command).await,
    }
}

/// Live mode: run the session and print every admitted entry as it arrives.
async fn tail(config: &Config, filter: FilterArgs, capacity: Option<usize>) -> anyhow::Result<()> {
    let mut session = Session::new(config, ViewMode::Live);
    session.set_filter(filter.to_criteria(config, None)?);
    if let Some(capacity) = capacity {
        session.set_live_capacity(capacity);
    }

    while let Some(update) = session.next_update().await {
        match update {
            SessionUpdate::Display => {
                // Newest-first buffer: the entry that was just admitted is
                // at the front.
                if let Some(entry) = session.displayed().first() {
                    println!("{}", render::line(entry));
                }
            }
            SessionUpdate::Connection(state) => {
                tracing::info!(%state, "stream");
            }
            SessionUpdate::QueryFailed(reason) => {
                tracing::warn!(%reason, "query failed");
            }
        }
    }
    Ok(())
}

/// Historical mode as a one-shot: one query, one printed page.
async fn search(
    config: &Config,
    filter: FilterArgs,
    range: RangeArgs,
    page: usize,
    size: Option<usize>,
) -> anyhow::Result<()> {
    let client = QueryClient::new(&config.api);
    let criteria = filter.to_criteria(config, range.to_range()?)?;
    let mut pagination = Pagination::default();
    pagination.set_size(size.unwrap_or(config.query.page_size));
    pagination.set_page(page);

    let result = client.search(&criteria, &pagination).await?;
    for entry in &result.items {
        println!("{}", render::line(entry));
    }
    let pages = result.total.div_ceil(pagination.size()).max(1);
    eprintln!(
        "page {}/{pages} — {} of {} entries",
        pagination.page(),
        result.items.len(),
        result.total
    );
    Ok(())
}

async fn stats(config: &Config, command: StatsCommand) -> anyhow::Result<()> {
    let client = QueryClient::new(&config.api);
    match command {
        StatsCommand::Overview => {
            let overview = client.stats_overview().await?;
            let mut levels: Vec<_> = overview.levels.iter().collect();
            levels.sort();
            for (level, count) in levels {
                println!("{level:<6} {count}");
            }
            let mut modules: Vec<_> = overview.modules.iter().collect();
            modules.sort();
            for (module, count) in modules {
                println!("{module} {count}");
            }
        }
        StatsCommand::Hourly { level, hours } => {
            let series = client.stats_hourly(level.parse::<LogLevel>()?, hours).await?;
            for (bucket, count) in series {
                println!("{bucket} {count}");
            }
        }
        StatsCommand::Histogram { filter, range, interval } => {
            let criteria = filter.to_criteria(config, range.to_range()?)?;
            for (bucket, count) in client.histogram(&criteria, &interval).await? {
                println!("{bucket} {count}");
            }
        }
        StatsCommand::TopServices(args) => {
            for row in client.top_services(args.range.to_range_or_last_day()?, args.limit).await? {
                println!("{} {}", row.name, row.count);
            }
        }
        StatsCommand::TopAddresses(args) => {
            for row in client.top_addresses(args.range.to_range_or_last_day()?, args.limit).await? {
                println!("{} {}", row.name, row.count);
            }
        }
        StatsCommand::TopErrors(args) => {
            for row in client.top_errors(args.range.to_range_or_last_day()?, args.limit).await? {
                println!("{} {}", row.name, row.count);
            }
        }
    }
    Ok(())
}
