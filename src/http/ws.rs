use super::state::AppState;
use crate::events::Subscription;
use crate::session::{SessionId, SessionRegistry};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    #[serde(rename = "sessionId")]
    pub session_id: String,
}

/// GET /events?sessionId=<id>
/// Join a session's room; the connection leaves it when the socket closes
pub async fn events(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    let Ok(session_id) = query.session_id.parse::<SessionId>() else {
        return (StatusCode::BAD_REQUEST, "invalid sessionId").into_response();
    };

    let registry = state.registry().clone();
    ws.on_upgrade(move |socket| forward_events(socket, registry, session_id))
}

async fn forward_events(mut socket: WebSocket, registry: SessionRegistry, session_id: SessionId) {
    let mut subscription: Subscription = registry.subscribe(session_id);
    debug!("WebSocket joined session {}", session_id);

    loop {
        tokio::select! {
            event = subscription.events.recv() => {
                let Some(event) = event else { break };
                let payload = match serde_json::to_string(&event) {
                    Ok(payload) => payload,
                    Err(e) => {
                        warn!("Failed to encode {} event: {}", event.name(), e);
                        continue;
                    }
                };
                if socket.send(Message::Text(payload)).await.is_err() {
                    break;
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                    // Clients have nothing to say on this channel
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    registry.unsubscribe(&subscription);
    debug!("WebSocket left session {}", session_id);
}
