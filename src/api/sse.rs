//! Server-Sent Events support

use super::types::StreamEvent;
use crate::runtime::ChatEvent;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

/// Convert broadcast stream to SSE stream, starting with `init`
pub fn sse_stream(
    init_event: StreamEvent,
    broadcast_rx: tokio::sync::broadcast::Receiver<ChatEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let init = futures::stream::once(async move { Ok(to_sse_event(&init_event)) });

    let broadcasts = BroadcastStream::new(broadcast_rx).map(|result| {
        let event = match result {
            Ok(event) => StreamEvent::from(event),
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                // Client refetches /api/conversation on `lagged`
                tracing::warn!(skipped, "SSE subscriber lagged");
                StreamEvent::Lagged { skipped }
            }
        };
        Ok(to_sse_event(&event))
    });

    Sse::new(init.chain(broadcasts)).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

fn to_sse_event(event: &StreamEvent) -> Event {
    let data = serde_json::to_string(event).unwrap_or_else(|e| {
        tracing::error!(error = %e, "Failed to serialize stream event");
        String::from("{}")
    });
    Event::default().event(event.name()).data(data)
}
