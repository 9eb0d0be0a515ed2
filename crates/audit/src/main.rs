//! pagecheck - page quality audit entry point
//!
//! Exit status is 0 unless a link assertion failed (1) or the run could not
//! be set up (2). Findings never change the exit status.

use std::path::PathBuf;

use clap::Parser;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use pagecheck_audit::playwright::{Browser, PlaywrightConfig, PlaywrightNavigator};
use pagecheck_audit::{
    AuditCategory, AuditConfig, AuditEngine, AuditError, AuditResult, AuditRunner, RunnerConfig,
};

#[derive(Parser, Debug)]
#[command(name = "pagecheck")]
#[command(author, version, about = "Non-blocking SEO and accessibility audit of a fixed page list")]
struct Args {
    /// YAML audit config (targets, tags, markers, link checks)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Audit only targets with this label (repeatable)
    #[arg(short, long)]
    label: Vec<String>,

    /// Run only one audit category (quality, functional)
    #[arg(long)]
    category: Option<AuditCategory>,

    /// Browser to use (chromium, firefox, webkit)
    #[arg(long, default_value = "chromium")]
    browser: Browser,

    /// Run in headless mode
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    headless: bool,

    /// Viewport width
    #[arg(long, default_value = "1280")]
    viewport_width: u32,

    /// Viewport height
    #[arg(long, default_value = "720")]
    viewport_height: u32,

    /// Page load timeout in milliseconds
    #[arg(long, default_value = "30000")]
    navigation_timeout_ms: u64,

    /// Directory containing node_modules with playwright and @axe-core/playwright
    #[arg(long, default_value = ".")]
    node_project_dir: PathBuf,

    /// Maximum pages audited at once
    #[arg(long, default_value = "4")]
    concurrency: usize,

    /// Audit one page at a time
    #[arg(long)]
    sequential: bool,

    /// Output directory for results
    #[arg(short, long, default_value = "test-results")]
    output: PathBuf,

    /// Skip writing the results file
    #[arg(long)]
    no_write: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: failed to create tokio runtime: {}", e);
            std::process::exit(2);
        }
    };

    match rt.block_on(async_main(args)) {
        Ok(true) => std::process::exit(0),
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    }
}

async fn async_main(args: Args) -> AuditResult<bool> {
    let audit_config = match &args.config {
        Some(path) => AuditConfig::from_file(path)?,
        None => AuditConfig::default(),
    };

    let targets = audit_config.select_targets(&args.label);
    if targets.is_empty() {
        return Err(AuditError::Config(format!(
            "no target matches label(s) {:?}",
            args.label
        )));
    }

    let engine = AuditEngine::from_config(&audit_config)?;

    let navigator = PlaywrightNavigator::new(PlaywrightConfig {
        browser: args.browser,
        headless: args.headless,
        viewport_width: args.viewport_width,
        viewport_height: args.viewport_height,
        navigation_timeout_ms: args.navigation_timeout_ms,
        node_project_dir: args.node_project_dir,
        ..Default::default()
    })?;

    let runner = AuditRunner::new(
        navigator,
        engine,
        RunnerConfig {
            categories: match args.category {
                Some(category) => vec![category],
                None => AuditCategory::ALL.to_vec(),
            },
            concurrency: if args.sequential { 1 } else { args.concurrency.max(1) },
            output_dir: args.output,
        },
    );

    let summary = runner.run(&targets).await;

    if !args.no_write {
        if let Err(e) = runner.write_results(&summary) {
            warn!("Could not write results: {}", e);
        }
    }

    Ok(summary.success())
}
