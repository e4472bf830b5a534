use std::future::Future;

use chronicle::shutdown::{ShutdownSignal, shutdown_channel};
use console::Term;

/// Resolves on Ctrl+C. A handler that cannot be installed never resolves,
/// leaving SIGTERM as the only way in.
async fn interrupt(ctrl_c: impl Future<Output = std::io::Result<()>>) {
    if let Err(e) = ctrl_c.await {
        tracing::warn!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
}

async fn terminate() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    }
    #[cfg(not(unix))]
    std::future::pending::<()>().await;
}

/// Whichever of Ctrl+C and `terminate` arrives first.
async fn first_signal(
    ctrl_c: impl Future<Output = std::io::Result<()>>,
    terminate: impl Future<Output = ()>,
) {
    tokio::select! {
        () = interrupt(ctrl_c) => {}
        () = terminate => {}
    }
}

/// Set up the Ctrl+C / SIGTERM handler for graceful shutdown.
///
/// The first signal fires the returned [`ShutdownSignal`]; a second Ctrl+C
/// exits immediately with status 130.
pub(crate) fn setup_shutdown_handler() -> ShutdownSignal {
    let (trigger, signal) = shutdown_channel();

    tokio::spawn(async move {
        first_signal(tokio::signal::ctrl_c(), terminate()).await;

        let is_tty = Term::stdout().is_term();
        if is_tty {
            eprintln!("\n\nShutdown requested, finishing current operations...");
            eprintln!("Press Ctrl+C again to force quit.");
        } else {
            tracing::warn!("Shutdown requested, finishing current operations");
        }

        trigger.trigger();

        // Wait for second Ctrl+C for force quit
        if tokio::signal::ctrl_c().await.is_ok() {
            if is_tty {
                eprintln!("Force quit!");
            }
            std::process::exit(130);
        }
    });

    signal
}
