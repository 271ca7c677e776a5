//! Server-sent change events.
//!
//! Streams the acting user's family (or solo) change feed. Events carry no
//! payload; a client that receives one re-issues its list queries. The
//! subscription is released when the client disconnects and the stream is
//! dropped.

use std::convert::Infallible;

use api_types::events::ChangeEventView;
use axum::{
    Extension,
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::Stream;

use engine::{ChangeEvent, Profile, WatchMessage};

use crate::server::ServerState;

fn change_event(event: &ChangeEvent) -> Event {
    let view = ChangeEventView {
        collection: event.collection.as_str().to_string(),
        kind: event.kind.as_str().to_string(),
        record_id: event.record_id,
    };
    match Event::default().event("change").json_data(&view) {
        Ok(sse_event) => sse_event,
        Err(err) => {
            tracing::error!("failed to serialize change event: {err}");
            Event::default().event("change")
        }
    }
}

pub async fn stream(
    Extension(profile): Extension<Profile>,
    State(state): State<ServerState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let watcher = match profile.user.family_id {
        Some(family_id) => state.engine.subscribe_family(family_id),
        None => state.engine.subscribe_user(profile.user.id),
    };

    let stream = futures::stream::unfold(watcher, |mut watcher| async move {
        let message = watcher.recv().await?;
        let event = match message {
            WatchMessage::Event(event) => change_event(&event),
            // The client missed events; tell it to refetch everything.
            WatchMessage::Lagged => Event::default().event("lagged"),
        };
        Some((Ok::<_, Infallible>(event), watcher))
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
