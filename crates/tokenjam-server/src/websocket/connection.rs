//! Per-connection read and write loops.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tokenjam_core::PositionUpdate;
use tokenjam_runtime::{SessionHandle, Subscription};
use tracing::{debug, info, trace, warn};

/// Serve one upgraded socket until either side goes away.
///
/// The subscriber is registered before the first frame and removed when
/// the connection ends, whichever loop notices first.
pub async fn handle_socket(
    socket: WebSocket,
    session: SessionHandle,
    heartbeat: Duration,
    connections: Arc<AtomicUsize>,
) {
    let Subscription { id, mut updates, stop } = match session.subscribe().await {
        Ok(sub) => sub,
        Err(e) => {
            warn!(error = %e, "rejecting connection, session unavailable");
            return;
        }
    };
    let _ = connections.fetch_add(1, Ordering::Relaxed);
    info!(subscriber_id = %id, "websocket connected");

    let (mut ws_tx, mut ws_rx) = socket.split();

    // Writer: snapshots out, plus periodic pings.
    let writer_stop = stop.clone();
    let mut writer = tokio::spawn(async move {
        let mut ping_interval = tokio::time::interval(heartbeat);
        let _ = ping_interval.tick().await;

        loop {
            tokio::select! {
                () = writer_stop.cancelled() => break,
                view = updates.recv() => {
                    let Some(view) = view else { break };
                    let json = match serde_json::to_string(&view) {
                        Ok(json) => json,
                        Err(e) => {
                            warn!(subscriber_id = %id, error = %e, "failed to serialize snapshot");
                            continue;
                        }
                    };
                    if ws_tx.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
                _ = ping_interval.tick() => {
                    if ws_tx.send(Message::Ping(Vec::new().into())).await.is_err() {
                        break;
                    }
                    trace!(subscriber_id = %id, "sent ping");
                }
            }
        }
        let _ = ws_tx.close().await;
    });

    // Reader: position updates in; malformed frames are discarded.
    let reader_session = session.clone();
    let mut reader = tokio::spawn(async move {
        while let Some(Ok(msg)) = ws_rx.next().await {
            let payload = match &msg {
                Message::Text(text) => text.as_bytes(),
                Message::Binary(bytes) => &bytes[..],
                Message::Close(_) => break,
                Message::Ping(_) | Message::Pong(_) => continue,
            };
            match decode_update(payload) {
                Some(update) => {
                    let _ = reader_session.update_position(id, update);
                }
                None => debug!(subscriber_id = %id, "discarding malformed frame"),
            }
        }
    });

    tokio::select! {
        _ = &mut writer => reader.abort(),
        _ = &mut reader => writer.abort(),
    }

    stop.cancel();
    let _ = session.unsubscribe(id).await;
    let _ = connections.fetch_sub(1, Ordering::Relaxed);
    info!(subscriber_id = %id, "websocket disconnected");
}

/// Text and binary frames carry the same JSON payload.
fn decode_update(payload: &[u8]) -> Option<PositionUpdate> {
    std::str::from_utf8(payload).ok().and_then(PositionUpdate::parse)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_json_payload() {
        let update = decode_update(br#"{"puzzleId":1,"x":0.25,"y":0.5}"#).unwrap();
        assert_eq!(update.puzzle_id, 1);
        assert!((update.x - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn rejects_invalid_utf8_and_json() {
        assert!(decode_update(&[0xff, 0xfe, 0x7b]).is_none());
        assert!(decode_update(b"not json").is_none());
    }
}
