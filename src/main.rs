//! Edge Speed Tester - Main CLI Application
//!
//! Loads candidate edge addresses, ranks them by latency and then by
//! download throughput, and prints the best ones.

use clap::Parser;
use edge_speed_tester::{
    cli::Cli,
    config::{display_config_summary, load_config, validate_config, EnvManager},
    error::{install_panic_hook, AppError, ErrorReporter, Result},
    log_info,
    logging::LoggerFactory,
    models::Config,
    output::render_report,
    Pipeline, PipelineReport, PKG_NAME, VERSION,
};
use std::process;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() {
    install_panic_hook();

    let cli = Cli::parse();
    let reporter = ErrorReporter::new(cli.use_colors(), cli.verbose || cli.debug);

    let result = match tokio::spawn(run_application(cli)).await {
        Ok(result) => result,
        Err(e) if e.is_panic() => Err(AppError::internal("the application panicked")),
        Err(e) => Err(AppError::internal(format!("application task failed: {}", e))),
    };

    if let Err(e) = result {
        reporter.report_error(&e);
        print_error_suggestions(&e);

        process::exit(e.exit_code());
    }
}

/// Main application logic
async fn run_application(cli: Cli) -> Result<()> {
    if cli.debug {
        print_debug_banner();
        for warning in EnvManager::validate_current_env() {
            eprintln!("{}", warning);
        }
    }

    let config = load_config(cli)?;

    for warning in validate_config(&config)? {
        eprintln!("{}", warning.format(config.enable_color));
    }

    if config.verbose && !config.debug {
        eprintln!("{}", display_config_summary(&config));
        eprintln!();
    }

    let report = run_pipeline(&config).await?;

    let output = render_report(&report, &config)?;
    print!("{}", output);

    Ok(())
}

/// Run the pipeline, cancelling it on the first Ctrl-C
async fn run_pipeline(config: &Config) -> Result<PipelineReport> {
    let factory = LoggerFactory::new(config.clone());
    let logger = factory.create_logger("MAIN");
    log_info!(
        logger,
        "Session {} testing {} via {} ({})",
        factory.session_id(),
        config.host,
        config.candidate_file,
        config.scheme
    );

    let pipeline = Pipeline::from_factory(&factory)?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    let signal_task = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Interrupted, finishing the current stage...");
            on_signal.cancel();
        }
    });

    let result = pipeline.run_with_cancel(cancel).await;
    signal_task.abort();

    if config.verbose || config.debug {
        if let Err(e) = &result {
            factory.create_error_logger().log_error(e, Some("pipeline run"), None).await;
        }
    }
    result
}

fn print_debug_banner() {
    eprintln!("{} v{}", PKG_NAME, VERSION);
    eprintln!(
        "Built {} from {} for {}",
        option_env!("BUILD_TIME").unwrap_or("unknown"),
        option_env!("GIT_COMMIT").unwrap_or("unknown"),
        option_env!("TARGET_TRIPLE").unwrap_or("unknown")
    );
    eprintln!("Debug mode enabled");
    eprintln!();
}

/// Print helpful suggestions for common errors
fn print_error_suggestions(error: &AppError) {
    match error {
        AppError::Config(_) => {
            eprintln!();
            eprintln!("Configuration help:");
            eprintln!("  - Check your .env file format (see EST_* variables)");
            eprintln!("  - --host takes a bare hostname such as jp.test4x.com");
            eprintln!("  - DNS servers must be IP addresses, optionally with a port");
        }
        AppError::SourceUnavailable(_) => {
            eprintln!();
            eprintln!("No candidates to test:");
            eprintln!("  - Put one IP address per line in the candidate file (--file)");
            eprintln!("  - Or allow the DNS fallback (drop --no-dns, set EST_DNS_FALLBACK=true)");
            eprintln!("  - Check that the resolvers in --dns-servers are reachable");
        }
        AppError::Network(_) => {
            eprintln!();
            eprintln!("Network troubleshooting:");
            eprintln!("  - Check your internet connection");
            eprintln!("  - Verify firewall settings");
            eprintln!("  - Try --plain if the target has no TLS listener");
        }
        AppError::DnsResolution(_) => {
            eprintln!();
            eprintln!("DNS resolution help:");
            eprintln!("  - Try using public DNS servers (8.8.8.8, 1.1.1.1)");
            eprintln!("  - Check if the host name exists");
            eprintln!("  - Test DNS resolution manually with 'nslookup' or 'dig'");
        }
        _ => {}
    }
}
