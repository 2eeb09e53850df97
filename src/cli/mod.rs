//! CLI argument parsing and command dispatch

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use query_bench::server;
use query_bench::server::worker::WorkerState;
use query_bench::{DispatcherSettings, Launcher};
use query_bench_core::{derive_test_id, Dispatcher, RunSummary, TemplateStore, TestDescriptor};
use query_bench_samplers::{ParameterBindings, ParameterResolver, QuerySelector};
use query_bench_storage::{GcsTemplateStore, LocalTemplateStore};
use query_bench_vendors::{
    BigQueryClient, EndpointConfig, HttpClientPool, PubSubPublisher, Service,
};

/// query-bench - Distributed load generation for BigQuery
#[derive(Parser, Debug)]
#[command(name = "query-bench")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true, env = "QUERY_BENCH_JSON_LOGS")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve the HTTP dispatcher that fans launch requests out to workers
    Dispatch {
        #[command(flatten)]
        listen: ListenArgs,

        /// Launch topic name
        #[arg(long, env = "LAUNCH_QUERIES_TOPIC")]
        topic: Option<String>,

        /// Project owning the launch topic
        #[arg(long, env = "ADMIN_PROJECT")]
        admin_project: Option<String>,

        #[command(flatten)]
        google: GoogleArgs,
    },

    /// Serve the Pub/Sub push endpoint that runs launch messages
    Worker {
        #[command(flatten)]
        listen: ListenArgs,

        #[command(flatten)]
        templates: TemplateArgs,

        #[command(flatten)]
        google: GoogleArgs,
    },

    /// Run one test in-process
    Run {
        /// Project the queries run in
        #[arg(long)]
        project_id: String,

        /// Bucket holding the query templates
        #[arg(long)]
        bucket_name: String,

        /// Queries per cycle
        #[arg(long, default_value = "1")]
        n_queries: usize,

        /// Queries in flight
        #[arg(short, long, default_value = "10")]
        concurrency: usize,

        /// Number of cycles
        #[arg(long, default_value = "1")]
        cycles: usize,

        /// Seconds between cycles, fractions allowed
        #[arg(long, default_value = "0")]
        wait_time: f64,

        /// Test id label (derived from the current time when absent)
        #[arg(long)]
        test_id: Option<String>,

        #[command(flatten)]
        templates: TemplateArgs,

        #[command(flatten)]
        google: GoogleArgs,
    },
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Address to bind
    #[arg(long, default_value = "0.0.0.0", env = "HOST")]
    pub host: IpAddr,

    /// Port to bind
    #[arg(short, long, default_value = "8080", env = "PORT")]
    pub port: u16,
}

impl ListenArgs {
    fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

#[derive(Args, Debug)]
pub struct TemplateArgs {
    /// JSON file of parameter bindings
    #[arg(long, env = "QUERY_BENCH_BINDINGS")]
    pub bindings: Option<PathBuf>,

    /// Read buckets from this local directory instead of Cloud Storage
    #[arg(long, env = "QUERY_BENCH_TEMPLATES_DIR")]
    pub templates_dir: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct GoogleArgs {
    /// OAuth access token sent as a bearer token
    #[arg(long, env = "GOOGLE_OAUTH_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    /// Cloud Storage endpoint override
    #[arg(long, env = "QUERY_BENCH_STORAGE_URL")]
    pub storage_url: Option<String>,

    /// BigQuery endpoint override
    #[arg(long, env = "QUERY_BENCH_BIGQUERY_URL")]
    pub bigquery_url: Option<String>,

    /// Pub/Sub endpoint override
    #[arg(long, env = "QUERY_BENCH_PUBSUB_URL")]
    pub pubsub_url: Option<String>,

    /// Milliseconds between BigQuery job polls
    #[arg(long, default_value = "1000")]
    pub poll_interval_ms: u64,
}

impl GoogleArgs {
    fn endpoint_config(&self) -> Result<EndpointConfig> {
        let mut config = EndpointConfig::default()
            .with_poll_interval(Duration::from_millis(self.poll_interval_ms));

        for (service, url) in [
            (Service::Storage, &self.storage_url),
            (Service::BigQuery, &self.bigquery_url),
            (Service::PubSub, &self.pubsub_url),
        ] {
            if let Some(url) = url {
                config = config.with_endpoint(service, url.clone());
            }
        }
        if let Some(token) = &self.access_token {
            config = config.with_access_token(token.clone());
        }

        config.validate().context("invalid endpoint configuration")?;
        Ok(config)
    }
}

impl Cli {
    /// Run the selected command
    pub async fn run(self) -> Result<()> {
        match self.command {
            Commands::Dispatch {
                listen,
                topic,
                admin_project,
                google,
            } => {
                let settings = DispatcherSettings::resolve(topic, admin_project)?;
                let config = google.endpoint_config()?;
                let pool = HttpClientPool::new(&config.http_config())
                    .context("failed to build HTTP client")?;
                let publisher = PubSubPublisher::from_config(pool.client().clone(), &config);

                let dispatcher = Dispatcher::new(Arc::new(publisher), settings.topic);
                tracing::info!(topic = %dispatcher.topic(), "Starting dispatcher");
                server::serve(server::dispatch::router(Arc::new(dispatcher)), listen.addr()).await
            }

            Commands::Worker {
                listen,
                templates,
                google,
            } => {
                let launcher = build_launcher(&templates, &google)?;
                tracing::info!(launcher = ?launcher, "Starting worker");
                let worker = Arc::new(WorkerState::new(launcher));
                server::serve(server::worker::router(Arc::clone(&worker)), listen.addr()).await?;
                worker.drain().await;
                Ok(())
            }

            Commands::Run {
                project_id,
                bucket_name,
                n_queries,
                concurrency,
                cycles,
                wait_time,
                test_id,
                templates,
                google,
            } => {
                let wait_time = Duration::try_from_secs_f64(wait_time)
                    .with_context(|| format!("invalid --wait-time {wait_time}"))?;
                let descriptor = TestDescriptor {
                    n_queries,
                    n_functions: 1,
                    test_id: test_id.unwrap_or_else(|| derive_test_id(Utc::now(), &project_id)),
                    bucket_name,
                    concurrency,
                    cycles,
                    wait_time,
                    project_id,
                };
                descriptor.validate()?;

                let launcher = build_launcher(&templates, &google)?;
                let orchestrator = launcher.prepare(&descriptor).await?;
                let summary = orchestrator.run_with_signal_handling().await;
                print_summary(&summary);
                Ok(())
            }
        }
    }
}

fn build_launcher(templates: &TemplateArgs, google: &GoogleArgs) -> Result<Launcher> {
    let config = google.endpoint_config()?;
    let pool =
        HttpClientPool::new(&config.http_config()).context("failed to build HTTP client")?;

    let store: Arc<dyn TemplateStore> = match &templates.templates_dir {
        Some(dir) => Arc::new(LocalTemplateStore::new(dir)),
        None => {
            let store = GcsTemplateStore::new(pool.client().clone())
                .with_base_url(config.base_url(Service::Storage));
            match &config.access_token {
                Some(token) => Arc::new(store.with_access_token(token)),
                None => Arc::new(store),
            }
        }
    };
    let engine = Arc::new(BigQueryClient::from_config(pool.client().clone(), &config));

    Ok(Launcher::new(store, engine, selector(templates.bindings.as_deref())?))
}

fn selector(bindings: Option<&Path>) -> Result<QuerySelector> {
    let bindings = match bindings {
        Some(path) => ParameterBindings::from_path(path)
            .with_context(|| format!("failed to load bindings from {}", path.display()))?,
        None => ParameterBindings::new(),
    };
    tracing::info!(templates = bindings.len(), "Parameter bindings loaded");
    Ok(QuerySelector::new(ParameterResolver::new(bindings)))
}

fn print_summary(summary: &RunSummary) {
    let aggregated = summary.aggregate();

    println!("\n{}", "=".repeat(70));
    println!("   Test {}", summary.test_id);
    println!("{}", "=".repeat(70));
    println!(
        "{:>6}  {:>10}  {:>8}  {:>10}  {:>10}",
        "cycle", "succeeded", "failed", "timed out", "seconds"
    );
    for cycle in &summary.cycles {
        println!(
            "{:>6}  {:>10}  {:>8}  {:>10}  {:>10.2}",
            cycle.stats.cycle,
            cycle.stats.succeeded,
            cycle.stats.failed,
            cycle.stats.timed_out,
            cycle.stats.elapsed().unwrap_or_default().as_secs_f64()
        );
    }
    println!("{}", "-".repeat(70));
    println!(
        "Total: {} queries, {:.1}% succeeded, {:.2} queries/s",
        aggregated.total_units(),
        aggregated.success_rate() * 100.0,
        aggregated.queries_per_second
    );
    if summary.interrupted {
        println!("Interrupted after {} cycle(s)", summary.completed_cycles());
    }
    println!("{}", "=".repeat(70));
}
