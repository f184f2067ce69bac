use std::{process, sync::Arc, time::Duration};

use clap::Parser;
use mibtail::{
    cli::Args,
    config::Config,
    core::{
        catalog::Catalog,
        emitter::{header_line, RowSink, WriterSink},
        fetch::Fetcher,
        scheduler::Scheduler,
    },
    logger::LoggerManager,
    print_error,
};
use mibtail_snmp::{Oid, Session};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Rejects catalog entries whose address is not a valid object identifier.
fn validate_addresses(catalog: &Catalog) -> Result<(), mibtail_snmp::SnmpError> {
    for metric in catalog.iter() {
        metric.address.parse::<Oid>()?;
    }
    Ok(())
}

/// Resolves once Ctrl+C or, on Unix, SIGTERM is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, stopping..."),
        _ = terminate => info!("Received SIGTERM, stopping..."),
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let cfg = Config::from_args(&args).unwrap_or_else(|e| {
        print_error!("{}", e);
        process::exit(1);
    });

    let mut logger_manager = LoggerManager::new(cfg.logger.clone()).unwrap_or_else(|e| {
        print_error!("Failed to setup Log Manager: {}", e);
        process::exit(1);
    });
    logger_manager.init().unwrap_or_else(|e| {
        print_error!("Failed to init Log Manager: {}", e);
        process::exit(1);
    });
    info!("Starting mibtail version {}...", env!("CARGO_PKG_VERSION"));
    debug!("{:#?}", cfg.transport);
    info!("Log level: {}", cfg.logger.level);

    let catalog = Catalog::load(&cfg.poller.catalog).unwrap_or_else(|e| {
        print_error!("{}", e);
        process::exit(1);
    });
    validate_addresses(&catalog).unwrap_or_else(|e| {
        print_error!("Invalid catalog entry: {}", e);
        process::exit(1);
    });
    for metric in catalog.unknown_formats() {
        warn!(
            "Metric '{}' has unknown disp value '{}', it will be shown as '?'",
            metric.label,
            metric.format.tag()
        );
    }
    info!(
        "Loaded {} metric(s) from {}, {} shown as delta or rate",
        catalog.len(),
        cfg.poller.catalog.display(),
        catalog.iter().filter(|m| m.format.is_delta_family()).count()
    );

    let session = Session::connect(&cfg.transport).await.unwrap_or_else(|e| {
        print_error!("Failed to open SNMP session: {}", e);
        process::exit(1);
    });
    info!("SNMP session open to {}", session.peer());
    let worst_case = cfg.transport.max_request_time();
    if worst_case > Duration::from_secs(cfg.poller.interval_secs) {
        warn!(
            "A poll may take up to {:?}, longer than the {}s interval; slow rounds delay the schedule",
            worst_case, cfg.poller.interval_secs
        );
    }

    let mut sink = WriterSink::stdout();
    for line in [cfg.banner(), header_line(&catalog)] {
        if let Err(e) = sink.write_line(&line) {
            print_error!("Failed to write to stdout: {}", e);
            process::exit(1);
        }
    }

    let scheduler = Scheduler::new(
        Arc::new(catalog),
        Arc::new(session) as Arc<dyn Fetcher>,
        Box::new(sink),
        cfg.poller.interval_secs,
    );

    let shutdown = CancellationToken::new();
    let handle = tokio::spawn(scheduler.run(shutdown.clone()));

    shutdown_signal().await;
    shutdown.cancel();
    if let Err(e) = handle.await {
        error!("Scheduler task failed: {}", e);
        process::exit(1);
    }
    info!("Shutdown complete");
}
