//! Worker pool shared by sender implementations

use std::future::Future;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, instrument};

use crate::Signal;

/// One consumer of a destination's outbound channel
pub(crate) trait Worker: Send + 'static {
    fn handle(
        &mut self,
        signal: Signal,
        cancel: &CancellationToken,
    ) -> impl Future<Output = ()> + Send;
}

/// Drive `workers` against the shared `inbound` channel and wait for all of them
#[instrument(
    name = "sender_workers",
    skip(workers, cancel, inbound),
    fields(workers = workers.len())
)]
pub(crate) async fn run_workers<W: Worker>(
    destination: &str,
    workers: Vec<W>,
    cancel: CancellationToken,
    inbound: async_channel::Receiver<Signal>,
) {
    let mut set = JoinSet::new();

    for (index, mut worker) in workers.into_iter().enumerate() {
        let cancel = cancel.clone();
        let inbound = inbound.clone();
        set.spawn(async move {
            loop {
                let signal = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    received = inbound.recv() => match received {
                        Ok(signal) => signal,
                        Err(_) => break,
                    },
                };
                worker.handle(signal, &cancel).await;
            }
            debug!(worker = index, "worker stopped");
        });
    }
    drop(inbound);

    while let Some(joined) = set.join_next().await {
        if let Err(e) = joined {
            error!(destination = %destination, error = ?e, "worker task panicked");
        }
    }
}
