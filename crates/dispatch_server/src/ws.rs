//! WebSocket endpoint.
//!
//! Clients connect to `GET /ws`. The first frame they receive is `CONNECTED` with the
//! identity assigned to the connection; after that, inbound frames are decoded and routed
//! to the dispatch service while events queued for this identity are written back.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use dispatch_core::events::{InboundEvent, OutboundEvent};
use dispatch_core::registry::MpscChannel;
use dispatch_core::service::Handled;
use dispatch_core::ParticipantId;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::ProtocolError;
use crate::protocol::{decode_frame, encode_frame};
use crate::state::AppState;

/// # Route
///
/// `GET /ws`
pub async fn ws_dispatch(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_ws(socket, state))
}

async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
    let participant = ParticipantId::new(Uuid::new_v4().to_string());
    let (channel, mut outbound) = MpscChannel::pair();
    state
        .service()
        .connect(participant.clone(), Arc::new(channel));
    info!(%participant, "client connected");

    loop {
        tokio::select! {
            event = outbound.recv() => {
                let Some(event) = event else {
                    debug!(%participant, "outbound channel closed");
                    break;
                };
                if !send_event(&mut socket, &participant, &event).await {
                    debug!(%participant, "send failed");
                    break;
                }
            }
            msg = socket.recv() => {
                let frame = match msg {
                    Some(Ok(Message::Text(text))) => decode_frame(text.as_str().as_bytes()),
                    Some(Ok(Message::Binary(bytes))) => decode_frame(&bytes),
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                        continue;
                    }
                    Some(Ok(Message::Pong(_))) => continue,
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        debug!(%participant, error = %e, "websocket error");
                        break;
                    }
                };
                match frame {
                    Ok(event) => route(&state, &participant, event),
                    Err(error) => {
                        if !reject_frame(&mut socket, &participant, &error).await {
                            break;
                        }
                    }
                }
            }
        }
    }

    state.service().disconnect(&participant);
    info!(%participant, "client disconnected");
}

fn route(state: &AppState, participant: &ParticipantId, event: InboundEvent) {
    match state.service().handle(participant, event) {
        // The attempt reports its own outcome under its span.
        Handled::Search(_) | Handled::Done | Handled::Relayed(_) => {}
        Handled::Refused => debug!(%participant, "inbound event refused"),
    }
}

async fn reject_frame(
    socket: &mut WebSocket,
    participant: &ParticipantId,
    error: &ProtocolError,
) -> bool {
    warn!(%participant, %error, "rejected inbound frame");
    let reply = OutboundEvent::Error {
        message: error.to_string(),
    };
    send_event(socket, participant, &reply).await
}

/// Returns `false` once the socket can no longer be written to.
async fn send_event(
    socket: &mut WebSocket,
    participant: &ParticipantId,
    event: &OutboundEvent,
) -> bool {
    let json = match encode_frame(event) {
        Ok(json) => json,
        Err(error) => {
            warn!(%participant, event = event.name(), %error, "failed to encode event");
            return true;
        }
    };
    socket.send(Message::Text(json.into())).await.is_ok()
}
