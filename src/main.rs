use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use logreplay::config::{ConfigLoader, ConfigOverrides, ReplayConfig};
use logreplay::metrics::snapshot::ReplaySnapshot;
use logreplay::replay::ReplayEngine;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "logreplay")]
#[command(version = "0.1.0")]
#[command(about = "Replay GET requests from an access log against a base URL", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay an access log and report throughput
    Run {
        #[command(flatten)]
        args: RunArgs,

        /// Show a progress spinner (stderr)
        #[arg(long, default_value_t = false)]
        progress: bool,
    },
    /// Validate a configuration file
    Check {
        /// Path to the configuration file
        #[arg(long)]
        config: PathBuf,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Configuration file (JSON/YAML/TOML); flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Access log file to replay
    #[arg(short = 'l', long)]
    log_file: Option<PathBuf>,

    /// Number of concurrent workers
    #[arg(short = 'c', long)]
    concurrency: Option<usize>,

    /// Comma-separated substrings excluded from replay
    #[arg(short = 'f', long, value_delimiter = ',')]
    filters: Option<Vec<String>>,

    /// Seconds between throughput reports
    #[arg(short = 'r', long)]
    report_interval: Option<u64>,

    /// Prefix prepended to every path from the log
    #[arg(short = 'b', long)]
    base_url: Option<String>,

    /// Keep cookies per worker across requests
    #[arg(short = 'k', long)]
    keep_cookies: bool,

    /// Log every issued URL
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Do not log failed requests
    #[arg(short = 's', long)]
    suppress_errors: bool,

    /// Start over at the end of the log until interrupted
    #[arg(long)]
    repeat: bool,

    /// Per-request timeout in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Lines the pump may read ahead of the workers
    #[arg(long)]
    queue_size: Option<usize>,
}

impl RunArgs {
    fn into_parts(self) -> (Option<PathBuf>, ConfigOverrides) {
        let overrides = ConfigOverrides {
            log_file: self.log_file,
            concurrency: self.concurrency,
            filters: self.filters,
            report_interval: self.report_interval,
            base_url: self.base_url,
            keep_cookies: self.keep_cookies,
            verbose: self.verbose,
            suppress_errors: self.suppress_errors,
            repeat: self.repeat,
            timeout_secs: self.timeout_secs,
            queue_size: self.queue_size,
        };
        (self.config, overrides)
    }
}

fn echo_config(config: &ReplayConfig) {
    log::info!("Access log file: {}", config.log_file.display());
    log::info!("Concurrent requests: {}", config.concurrency);
    log::info!("Filters: {:?}", config.filters);
    log::info!("Report every: {} seconds", config.report_interval);
    log::info!("Base URL: {}", config.base_url);
    log::info!("Keep cookies: {}", config.keep_cookies);
    log::info!("Verbose output: {}", config.verbose);
    log::info!("Suppress errors: {}", config.suppress_errors);
    log::info!("Repeat after done with log file: {}", config.repeat);
}

fn progress_message(snapshot: &ReplaySnapshot) -> String {
    format!(
        "Hits: {} | Failed: {} | Filtered: {} | {} req/s",
        snapshot.hits, snapshot.failures, snapshot.filtered, snapshot.last_rate
    )
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if std::env::var("RUST_LOG").is_err() {
        unsafe { std::env::set_var("RUST_LOG", "info"); }
    }
    let cli = Cli::parse();
    let logger = env_logger::Builder::from_default_env().build();
    let multi = indicatif::MultiProgress::new();

    match cli.command {
        Commands::Run { args, progress } => {
            if progress {
                indicatif_log_bridge::LogWrapper::new(multi.clone(), logger).try_init()?;
            } else {
                let level = logger.filter();
                log::set_boxed_logger(Box::new(logger))?;
                log::set_max_level(level);
            }

            let (config_path, overrides) = args.into_parts();
            let config = ConfigLoader::resolve(config_path.as_deref(), overrides)?;
            echo_config(&config);

            let engine = ReplayEngine::new(Arc::new(config));

            let shutdown = engine.shutdown_handle();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    log::info!("Shutting down...");
                    shutdown.trigger();
                }
            });

            let mut progress_bar: Option<ProgressBar> = None;
            let mut _progress_task = None;
            if progress {
                let pb = multi.add(ProgressBar::new_spinner());
                pb.set_style(ProgressStyle::default_spinner()
                    .template("{spinner:.green} [{elapsed_precise}] {msg}")?);
                pb.enable_steady_tick(Duration::from_millis(100));

                let mut metrics_rx = engine.watch_metrics();
                let pb_clone = pb.clone();
                progress_bar = Some(pb);
                _progress_task = Some(tokio::spawn(async move {
                    while metrics_rx.changed().await.is_ok() {
                        let snapshot = metrics_rx.borrow().clone();
                        pb_clone.set_message(progress_message(&snapshot));
                    }
                }));
            }

            log::info!("Starting replay...");
            let result = engine.run().await;

            if let Some(task) = _progress_task {
                task.abort();
            }
            let summary = result?;
            if let Some(pb) = progress_bar {
                pb.finish_with_message(format!("{} - Completed", progress_message(&summary)));
            }

            println!("\n✅ Replay Completed:");
            println!("   Hits: {}", summary.hits);
            println!("   Failed Requests: {}", summary.failures);
            println!("   Filtered Paths: {}", summary.filtered);
            println!("   Skipped Lines: {}", summary.skipped);
            println!("   Average Rate: {:.2} req/s", summary.requests_per_second);
            println!("   Total Time: {:.1}s", summary.elapsed_seconds);
        }
        Commands::Check { config } => {
            match ConfigLoader::load(&config) {
                Ok(cfg) => {
                    println!("✅ Config is valid:");
                    println!("   Log file: {}", cfg.log_file.display());
                    println!("   Base URL: {}", cfg.base_url);
                    println!("   Concurrency: {}", cfg.concurrency);
                    println!("   Filters: {}", cfg.filters.len());
                }
                Err(e) => {
                    eprintln!("❌ Config error: {}", e);
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}
