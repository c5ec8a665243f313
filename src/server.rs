use std::future::{Future, IntoFuture};
use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use snafu::ResultExt as _;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use crate::error::{ApplicationError, BindAddressSnafu, WebServerSnafu};

/// Bind the listener for the HTTP surface.
pub async fn bind(address: SocketAddr) -> Result<TcpListener, ApplicationError> {
    TcpListener::bind(address)
        .await
        .context(BindAddressSnafu { address })
}

/// Serve `router` until `shutdown` resolves. After that no new connections are accepted and
/// in-flight requests get `grace` to finish before the server is aborted.
///
/// Aborting only stops the accept loop. Connections that are still open at that point run on
/// their own tasks until the runtime is dropped, so callers should return from `main` promptly
/// and expect those requests to see a closed store in the meantime.
pub async fn serve(
    listener: TcpListener, router: Router, shutdown: impl Future<Output = ()>, grace: Duration,
) -> Result<(), ApplicationError> {
    let (stop, stopped) = oneshot::channel::<()>();

    let server = axum::serve(listener, router).with_graceful_shutdown(async move {
        let _ = stopped.await;
    });
    let mut handle = tokio::spawn(server.into_future());

    tokio::select! {
        result = &mut handle => {
            // the server stopped on its own, without a shutdown signal
            return flatten(result);
        }
        _ = shutdown => {}
    }

    tracing::info!(grace = %humantime::format_duration(grace), "draining in-flight requests");
    let _ = stop.send(());

    match tokio::time::timeout(grace, &mut handle).await {
        Ok(result) => flatten(result),
        Err(_) => {
            tracing::warn!("grace period elapsed, closing remaining connections");
            handle.abort();
            Ok(())
        }
    }
}

fn flatten(
    result: Result<std::io::Result<()>, tokio::task::JoinError>,
) -> Result<(), ApplicationError> {
    match result {
        Ok(served) => served.context(WebServerSnafu),
        Err(error) if error.is_cancelled() => Ok(()),
        Err(error) => std::panic::resume_unwind(error.into_panic()),
    }
}

/// Resolves on Ctrl+C or, on unix, SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::error!(%error, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                tracing::error!(%error, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received Ctrl+C"),
        _ = terminate => tracing::info!("received terminate signal"),
    }
}
