use futures_util::StreamExt;
use reqwest_eventsource::{Event, EventSource};
use tokio::sync::mpsc;

use super::{Project, SnapshotEvent, StoreError};

/// SSE event name carrying a full collection snapshot
const SNAPSHOT_EVENT: &str = "snapshot";

/// Start the listener task behind a REST subscription.
///
/// Decodes `snapshot` events into full collection views and forwards them on
/// the subscription channel. Any stream error is terminal for the
/// subscription: one `SnapshotEvent::Failed` is delivered and the task ends.
/// Re-establishing a subscription is the caller's decision, never automatic.
pub(crate) fn spawn_snapshot_listener(
    request: reqwest::RequestBuilder,
    scope: String,
    events_tx: mpsc::Sender<SnapshotEvent>,
    mut shutdown_rx: mpsc::Receiver<()>,
) {
    tokio::spawn(async move {
        let mut source = match EventSource::new(request) {
            Ok(source) => source,
            Err(e) => {
                log::error!("listen: failed to open event stream for {}: {}", scope, e);
                let _ = events_tx
                    .send(SnapshotEvent::Failed(StoreError::Stream(e.to_string())))
                    .await;
                return;
            }
        };

        loop {
            tokio::select! {
                event = source.next() => {
                    match event {
                        Some(Ok(Event::Open)) => {
                            log::info!("listen: snapshot stream opened for {}", scope);
                        }
                        Some(Ok(Event::Message(msg))) => {
                            if msg.event != SNAPSHOT_EVENT {
                                log::debug!("listen: ignoring event '{}' for {}", msg.event, scope);
                                continue;
                            }
                            match serde_json::from_str::<Vec<Project>>(&msg.data) {
                                Ok(docs) => {
                                    log::debug!(
                                        "listen: snapshot with {} project(s) for {}",
                                        docs.len(),
                                        scope,
                                    );
                                    if events_tx.send(SnapshotEvent::Snapshot(docs)).await.is_err() {
                                        // Subscription dropped on the consumer side
                                        source.close();
                                        return;
                                    }
                                }
                                Err(e) => {
                                    log::error!(
                                        "listen: undecodable snapshot for {}: {}",
                                        scope,
                                        e,
                                    );
                                    let _ = events_tx
                                        .send(SnapshotEvent::Failed(StoreError::Json(e)))
                                        .await;
                                    source.close();
                                    return;
                                }
                            }
                        }
                        Some(Err(e)) => {
                            log::error!("listen: stream error for {}: {}", scope, e);
                            let _ = events_tx
                                .send(SnapshotEvent::Failed(StoreError::Stream(e.to_string())))
                                .await;
                            source.close();
                            return;
                        }
                        None => {
                            log::warn!("listen: stream ended for {}", scope);
                            let _ = events_tx
                                .send(SnapshotEvent::Failed(StoreError::StreamClosed))
                                .await;
                            return;
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    log::info!("listen: subscription for {} cancelled", scope);
                    source.close();
                    return;
                }
            }
        }
    });
}
