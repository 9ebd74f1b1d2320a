use reactive_list_bench::bench::{BenchConfig, BenchmarkDriver, PhaseFilter};
use reactive_list_bench::format_measure;
use anyhow::bail;
use std::env;
use std::time::Instant;
use tokio::task::LocalSet;
use tracing::{info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Debug, Clone)]
struct AppConfig {
    filter: PhaseFilter,
    list_len: usize,
    update_count: usize,
    json: bool,
    log_level: Level,
}

impl AppConfig {
    fn from_args() -> anyhow::Result<Self> {
        Self::parse(env::args().skip(1))
    }

    fn parse<I>(args: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let args: Vec<String> = args.into_iter().collect();
        let mut config = Self::default();

        let mut i = 0;
        while i < args.len() {
            match args[i].as_str() {
                flag @ ("--benchmark" | "--items" | "--updates") => {
                    let Some(value) = args.get(i + 1) else {
                        bail!("{} expects a value", flag);
                    };
                    match flag {
                        "--benchmark" => config.filter = PhaseFilter::only(value.clone()),
                        "--items" => config.list_len = value.parse()?,
                        _ => config.update_count = value.parse()?,
                    }
                    i += 1;
                }
                "--json" => config.json = true,
                "--debug" => config.log_level = Level::DEBUG,
                "--trace" => config.log_level = Level::TRACE,
                // `benchmark=update`, `?benchmark=update` or a page URL.
                query if query.contains('=') => config.filter = PhaseFilter::from_query(query),
                _ => {}
            }
            i += 1;
        }

        Ok(config)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        let bench = BenchConfig::default();
        Self {
            filter: bench.filter,
            list_len: bench.list_len,
            update_count: bench.update_count,
            json: false,
            log_level: Level::WARN,
        }
    }
}

/// `RUST_LOG` wins over the command-line level when set.
fn setup_logging(level: Level) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let app_config = AppConfig::from_args()?;
    setup_logging(app_config.log_level)?;

    let bench_config = BenchConfig {
        filter: app_config.filter.clone(),
        list_len: app_config.list_len,
        update_count: app_config.update_count,
    };
    info!("starting benchmark with {:?}", bench_config);

    let started = Instant::now();
    let local = LocalSet::new();
    let json = app_config.json;
    let output = local
        .run_until(async move {
            let driver = BenchmarkDriver::new(bench_config)?;
            let measures = driver.run().await?;
            let output = if json {
                serde_json::to_string_pretty(&driver.report(&measures))?
            } else {
                measures
                    .iter()
                    .map(format_measure)
                    .collect::<Vec<_>>()
                    .join("\n")
            };
            anyhow::Ok(output)
        })
        .await?;

    if !output.is_empty() {
        println!("{}", output);
    }
    info!("benchmark finished in {:?}", started.elapsed());

    Ok(())
}
