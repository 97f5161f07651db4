use clap::Parser; // for cli
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

use url_tracker::config::Args;
use url_tracker::fetcher::{self, FetchExecutor};
use url_tracker::rate_limit::{self, Throttle};
use url_tracker::registry::Registry;
use url_tracker::router::build_router;
use url_tracker::scheduler::FetchScheduler;
use url_tracker::snapshot;
use url_tracker::state::AppState;
use url_tracker::telemetry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init();
    let args = Args::parse();
    args.validate()?;

    // hydrate before anything can touch the registry
    let registry = Arc::new(Registry::new());
    snapshot::restore(&registry, &args.data_file).await;

    let client = fetcher::build_client(args.fetch_timeout())?;
    let fetcher = FetchExecutor::new(client, Arc::clone(&registry), args.max_downloads);
    let throttle = Arc::new(Throttle::new(args.throttle_interval()));

    let state = Arc::new(AppState {
        registry: Arc::clone(&registry),
        throttle: Arc::clone(&throttle),
        fetcher: fetcher.clone(),
        refresh_on_lookup: args.refresh_on_lookup,
    });

    // background loops
    let scheduler = FetchScheduler::new(
        Arc::clone(&registry),
        fetcher,
        args.top_n,
        args.fetch_interval(),
    );
    tokio::spawn(scheduler.run());
    tokio::spawn(snapshot::saver(
        Arc::clone(&registry),
        args.data_file.clone(),
        args.save_interval(),
    ));
    tokio::spawn(rate_limit::sweeper(throttle, args.throttle_sweep_interval()));

    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!(%addr, "url tracker listening");
    info!(
        data_file = %args.data_file.display(),
        fetch_interval_secs = args.fetch_interval,
        save_interval_secs = args.save_interval,
        max_downloads = args.max_downloads,
        "configuration"
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("shutting down, saving data");
    snapshot::persist(&registry, &args.data_file).await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
