use registry_compare::cli::{self, Args, Comparison, Runner};
use registry_compare::logging::{self, Logger};
use registry_compare::{OutputManager, RegistryError, Result};
use std::io;
use std::process::ExitCode;
use tokio::signal;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse_args();
    logging::init_tracing(args.verbose);

    let output = if args.quiet {
        Logger::new_quiet()
    } else {
        Logger::new(args.verbose)
    };

    let outcome = run(&args, &output).await;
    match &outcome {
        Err(e) => output.error(&e.to_string()),
        Ok(comparison) if !comparison.is_complete() => {
            output.warning("Some repositories could not be listed; the result above is partial")
        }
        Ok(_) => {}
    }

    ExitCode::from(cli::exit_status(&outcome))
}

async fn run(args: &Args, output: &Logger) -> Result<Comparison> {
    // validate everything before touching the network
    let (source, target) = args.endpoints()?;
    let config = args.to_config()?;

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_shutdown(cancel.clone()));

    let runner = Runner::new(source, target, config.clone(), output.clone());
    let comparison = runner.run(&cancel).await?;

    OutputManager::new(config.output)
        .render(&comparison, &mut io::stdout().lock(), &mut io::stderr().lock())
        .map_err(|e| RegistryError::Config(format!("Failed to write output: {}", e)))?;

    Ok(comparison)
}

async fn cancel_on_shutdown(cancel: CancellationToken) {
    let ctrl_c = async {
        if signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::warn!("shutdown signal received, cancelling outstanding requests");
    cancel.cancel();
}
