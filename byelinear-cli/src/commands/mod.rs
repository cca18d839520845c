//! CLI command implementations

pub mod export;
pub mod fetch;
pub mod status;

pub use export::ExportArgs;
pub use fetch::FetchArgs;
pub use status::StatusArgs;

use std::future::Future;

use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Run a phase on its own task, cancelling it on Ctrl-C
///
/// An interrupted phase still finishes its in-flight step before returning.
pub async fn run_cancellable<F, Fut, T>(work: F) -> anyhow::Result<T>
where
    F: FnOnce(CancellationToken) -> Fut,
    Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    T: Send + 'static,
{
    let cancel = CancellationToken::new();
    let mut task = tokio::spawn(work(cancel.clone()));

    tokio::select! {
        joined = &mut task => return joined?,
        signal = tokio::signal::ctrl_c() => {
            signal?;
            warn!("Interrupt received, stopping after the current step");
            cancel.cancel();
        }
    }

    task.await?
}
