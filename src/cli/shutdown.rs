use anyhow::{Context, Result};
use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Interrupt handler registered with the OS. Signals that arrive after [InterruptListener::install]
/// are not lost even if nothing is waiting on the listener yet.
pub struct InterruptListener {
    #[cfg(unix)]
    signal: tokio::signal::unix::Signal,
    #[cfg(windows)]
    signal: tokio::signal::windows::CtrlC,
}

impl InterruptListener {
    /// Must be called from within the runtime.
    pub fn install() -> Result<Self> {
        #[cfg(unix)]
        let signal = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt());
        #[cfg(windows)]
        let signal = tokio::signal::windows::ctrl_c();

        Ok(Self {
            signal: signal.context("Failed to install the interrupt handler")?,
        })
    }

    /// Cancels `cancelation` once the user interrupts the process.
    pub async fn cancel_on_interrupt(mut self, cancelation: CancellationToken) {
        select! {
            _ = self.signal.recv() => {
                info!("Received interrupt");
                cancelation.cancel();
            },
            _ = cancelation.cancelled() => (),
        };
    }
}
