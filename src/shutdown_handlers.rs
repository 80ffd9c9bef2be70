use tokio_util::sync::CancellationToken;
use tracing::info;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Cancels `interrupt` on Ctrl+C or SIGTERM. The task ends on its own once
/// `interrupt` is cancelled by anyone.
pub fn setup_signal_shutdown_handler(
    interrupt: &CancellationToken,
) -> tokio::task::JoinHandle<()> {
    let interrupt = interrupt.clone();
    tokio::spawn(async move {
        #[cfg(unix)]
        let mut term_signal = match signal(SignalKind::terminate()) {
            Ok(signal) => Some(signal),
            Err(err) => {
                eprintln!("Failed to register SIGTERM handler: {}", err);
                None
            }
        };

        #[cfg(unix)]
        {
            tokio::select! {
                () = interrupt.cancelled() => {}
                _ = tokio::signal::ctrl_c() => {
                    info!("Ctrl+C received, stopping run");
                    interrupt.cancel();
                }
                () = async {
                    if let Some(signal) = term_signal.as_mut() {
                        signal.recv().await;
                    } else {
                        std::future::pending::<()>().await;
                    }
                } => {
                    info!("SIGTERM received, stopping run");
                    interrupt.cancel();
                }
            }
        }

        #[cfg(not(unix))]
        {
            tokio::select! {
                () = interrupt.cancelled() => {}
                _ = tokio::signal::ctrl_c() => {
                    info!("Ctrl+C received, stopping run");
                    interrupt.cancel();
                }
            }
        }
    })
}
