use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use matrix_ci::prelude::*;
use matrix_ci::workflow::matrix::expand;
use matrix_ci::RunId;
use tracing_subscriber::EnvFilter;
#[cfg(feature = "otel")]
use tracing_subscriber::layer::SubscriberExt;
#[cfg(feature = "otel")]
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "matrix-ci")]
#[command(about = "Orchestrate matrix test pipelines", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute the pipeline for one trigger
    Run {
        /// Path to the pipeline YAML file
        #[arg(short, long, value_name = "FILE", default_value = "pipeline.yaml")]
        config: PathBuf,

        /// Change-request number (omit for a branch push)
        #[arg(long)]
        change_request: Option<u64>,

        /// Branch reference the trigger points at
        #[arg(long)]
        branch: Option<String>,

        /// Read the trigger from a JSON event payload instead of flags
        #[arg(long, value_name = "FILE", conflicts_with_all = ["change_request", "branch"])]
        trigger_file: Option<PathBuf>,

        /// Maximum number of parallel jobs (overrides config)
        #[arg(short, long)]
        parallel: Option<usize>,
    },

    /// Print the expanded job matrix
    Matrix {
        /// Path to the pipeline YAML file
        #[arg(value_name = "FILE", default_value = "pipeline.yaml")]
        config: PathBuf,
    },

    /// Validate a pipeline file without running it
    Validate {
        /// Path to the pipeline YAML file
        #[arg(value_name = "FILE", default_value = "pipeline.yaml")]
        config: PathBuf,
    },
}

#[cfg(feature = "otel")]
fn init_otel_tracing(verbose: bool) {
    use opentelemetry::trace::TracerProvider as _;
    use opentelemetry_otlp::WithExportConfig;
    use opentelemetry_sdk::runtime::Tokio;
    use opentelemetry_sdk::trace::TracerProvider;

    let filter = if verbose {
        "matrix_ci=debug"
    } else {
        "matrix_ci=info"
    };

    let otlp_endpoint = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
        .unwrap_or_else(|_| "http://localhost:4317".to_string());

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(&otlp_endpoint)
        .build()
        .expect("Failed to create OTLP exporter");

    let provider = TracerProvider::builder()
        .with_batch_exporter(exporter, Tokio)
        .build();

    let tracer = provider.tracer("matrix-ci");
    let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);

    tracing_subscriber::registry()
        .with(EnvFilter::new(filter))
        .with(tracing_subscriber::fmt::layer())
        .with(otel_layer)
        .init();

    opentelemetry::global::set_tracer_provider(provider);
}

#[cfg(not(feature = "otel"))]
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        "matrix_ci=debug"
    } else {
        "matrix_ci=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    #[cfg(feature = "otel")]
    init_otel_tracing(cli.verbose);

    #[cfg(not(feature = "otel"))]
    init_tracing(cli.verbose);

    let result = run(cli).await;

    #[cfg(feature = "otel")]
    opentelemetry::global::shutdown_tracer_provider();

    match result {
        Ok(success) => {
            if success {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "Pipeline failed");
            ExitCode::from(2)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<bool> {
    match cli.command {
        Commands::Run {
            config,
            change_request,
            branch,
            trigger_file,
            parallel,
        } => run_pipeline(config, change_request, branch, trigger_file, parallel).await,
        Commands::Matrix { config } => print_matrix(config),
        Commands::Validate { config } => validate(config),
    }
}

async fn run_pipeline(
    config_path: PathBuf,
    change_request: Option<u64>,
    branch: Option<String>,
    trigger_file: Option<PathBuf>,
    parallel: Option<usize>,
) -> anyhow::Result<bool> {
    if !config_path.exists() {
        anyhow::bail!("Pipeline file not found: {}", config_path.display());
    }

    let mut config = ConfigLoader::load_file(&config_path)?;
    if let Some(p) = parallel {
        config.parallel = p;
    }
    config.validate()?;

    let trigger = build_trigger(&config, change_request, branch, trigger_file)?;

    println!(
        "Running pipeline: {} ({})\n",
        config.name,
        trigger.group_key()
    );

    let runner = Arc::new(ProcessTestRunner::new(config.runner.clone()));
    let mut pipeline = Pipeline::new(config.clone(), runner);
    if let Some(report) = &config.report {
        pipeline = pipeline.with_reporting_sink(Arc::new(HttpReportingSink::new(report)));
    }
    if let Some(status) = &config.status {
        pipeline = pipeline.with_status_signal(Arc::new(HttpStatusSignal::new(status)));
    }

    let outcome = pipeline.run(trigger).await?;
    print_outcome(&outcome);

    Ok(matches!(outcome.verdict(), Some(Verdict::Success)))
}

fn build_trigger(
    config: &PipelineConfig,
    change_request: Option<u64>,
    branch: Option<String>,
    trigger_file: Option<PathBuf>,
) -> anyhow::Result<Trigger> {
    if let Some(path) = trigger_file {
        let content = std::fs::read_to_string(&path)?;
        let trigger: Trigger = serde_json::from_str(&content)?;
        return Ok(trigger);
    }

    let branch = branch.unwrap_or_else(|| "refs/heads/main".to_string());
    Ok(match change_request {
        Some(number) => Trigger::change_request(&config.name, number, branch),
        None => Trigger::branch_push(&config.name, branch),
    })
}

fn print_matrix(config_path: PathBuf) -> anyhow::Result<bool> {
    if !config_path.exists() {
        anyhow::bail!("Pipeline file not found: {}", config_path.display());
    }

    let config = ConfigLoader::load_file(&config_path)?;
    config.validate()?;

    let specs = expand(RunId::new(), &config.matrix)?;

    println!("Jobs for pipeline {}:\n", config.name);
    for spec in &specs {
        println!("  {}. {}", spec.index() + 1, spec.label());
    }
    println!("\n{} jobs, up to {} in parallel", specs.len(), config.parallel);

    Ok(true)
}

fn validate(config_path: PathBuf) -> anyhow::Result<bool> {
    if !config_path.exists() {
        anyhow::bail!("Pipeline file not found: {}", config_path.display());
    }

    let config = ConfigLoader::load_file(&config_path)?;
    config.validate()?;

    let job_count: usize = config.matrix.iter().map(|d| d.values.len()).product();
    println!("✓ {} is valid ({} jobs)", config_path.display(), job_count);

    Ok(true)
}

fn print_outcome(outcome: &PipelineOutcome) {
    match outcome {
        PipelineOutcome::Superseded { run_id } => {
            println!("\n=== Run superseded ===\n");
            println!("Run {} was displaced by a newer trigger; results discarded.", run_id);
        }
        PipelineOutcome::Completed {
            run_id,
            verdict,
            aggregate,
            report,
        } => {
            println!("\n=== Pipeline Result ===\n");
            println!("Verdict: {}", if verdict.is_success() { "PASS" } else { "FAIL" });
            println!("Run ID: {}\n", run_id);

            for job in &aggregate.jobs {
                match job.state() {
                    matrix_ci::CompletionState::Completed(summary) => {
                        let ok = summary.errors == 0 && summary.failures == 0;
                        let status = if ok { "✓" } else { "✗" };
                        println!(
                            "{} {} ({} errors, {} failures, {:.1}s)",
                            status,
                            job.spec().label(),
                            summary.errors,
                            summary.failures,
                            job.duration().as_secs_f64()
                        );
                    }
                    matrix_ci::CompletionState::Cancelled => {
                        println!("- {} (cancelled)", job.spec().label());
                    }
                    matrix_ci::CompletionState::CrashedInfra(reason) => {
                        println!("✗ {} (infrastructure: {})", job.spec().label(), reason);
                    }
                }
            }

            println!(
                "\nTotals: {} errors, {} failures",
                aggregate.errors, aggregate.failures
            );
            match report {
                ReportOutcome::Submitted => println!("Report: submitted"),
                ReportOutcome::Skipped => {}
                ReportOutcome::Failed(e) => println!("Report: not posted ({})", e),
            }
        }
    }
}
