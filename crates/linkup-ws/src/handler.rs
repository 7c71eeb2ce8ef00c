use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use linkup_core::presence::Push;
use linkup_core::AppState;
use linkup_models::gateway::{
    GatewayMessage, EVENT_MESSAGE_CREATE, EVENT_NOTIFICATION, EVENT_READY, OP_DISPATCH,
    OP_HEARTBEAT, OP_HEARTBEAT_ACK, OP_HELLO, OP_IDENTIFY, OP_INVALID_SESSION,
};
use serde_json::{json, Value};
use tokio::time::Instant;

use crate::session::Session;

const HEARTBEAT_INTERVAL_MS: u64 = 41_250;
const HEARTBEAT_TIMEOUT_MS: u64 = 90_000;
const IDENTIFY_TIMEOUT_SECS: u64 = 30;

pub async fn handle_connection(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();

    let hello = json!({
        "op": OP_HELLO,
        "d": { "heartbeat_interval": HEARTBEAT_INTERVAL_MS }
    });
    if sender
        .send(Message::Text(hello.to_string().into()))
        .await
        .is_err()
    {
        return;
    }

    // Wait for IDENTIFY; an unauthenticated socket never reaches presence.
    let identify_timeout = Duration::from_secs(IDENTIFY_TIMEOUT_SECS);
    let mut session = match tokio::time::timeout(
        identify_timeout,
        wait_for_identify(&mut receiver, &state),
    )
    .await
    {
        Ok(Some(session)) => session,
        _ => {
            let _ = sender
                .send(Message::Text(
                    json!({"op": OP_INVALID_SESSION, "d": false}).to_string().into(),
                ))
                .await;
            return;
        }
    };

    // Connect lifecycle: open one delivery channel for this socket.
    let (channel, mut push_rx) = state.presence.register(session.user_id);
    tracing::info!(
        user_id = session.user_id,
        session_id = %session.session_id,
        "gateway: session ready"
    );

    let ready = json!({
        "op": OP_DISPATCH,
        "t": EVENT_READY,
        "s": session.next_sequence(),
        "d": {
            "session_id": &session.session_id,
            "user_id": session.user_id.to_string(),
        }
    });
    if sender
        .send(Message::Text(ready.to_string().into()))
        .await
        .is_err()
    {
        state.presence.unregister(session.user_id, channel.id());
        return;
    }

    let heartbeat_timeout = Duration::from_millis(HEARTBEAT_TIMEOUT_MS);
    let mut ws_ping_interval = tokio::time::interval(Duration::from_secs(20));
    ws_ping_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let heartbeat_sleep = tokio::time::sleep(heartbeat_timeout);
    tokio::pin!(heartbeat_sleep);

    let disconnect_reason = loop {
        tokio::select! {
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let Ok(frame) = serde_json::from_str::<GatewayMessage>(&text) else {
                            continue;
                        };
                        if frame.op == OP_HEARTBEAT {
                            heartbeat_sleep
                                .as_mut()
                                .reset(Instant::now() + heartbeat_timeout);
                            let ack = json!({"op": OP_HEARTBEAT_ACK});
                            if sender
                                .send(Message::Text(ack.to_string().into()))
                                .await
                                .is_err()
                            {
                                break "websocket send error (heartbeat ack)";
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) => break "client close frame",
                    Some(Ok(_)) => {}
                    Some(Err(_)) => break "websocket receive error",
                    None => break "websocket stream ended",
                }
            }
            push = push_rx.recv() => {
                match push {
                    Some(push) => {
                        let frame = dispatch_frame(&mut session, push);
                        if sender
                            .send(Message::Text(frame.into()))
                            .await
                            .is_err()
                        {
                            break "websocket send error (dispatch)";
                        }
                    }
                    // Registry dropped this channel (push failure or shutdown).
                    None => break "delivery channel closed",
                }
            }
            _ = ws_ping_interval.tick() => {
                if sender.send(Message::Ping(Vec::new().into())).await.is_err() {
                    break "websocket send error (ping)";
                }
            }
            _ = &mut heartbeat_sleep => break "heartbeat timeout",
        }
    };

    // Disconnect lifecycle: every exit path releases the channel.
    state.presence.unregister(session.user_id, channel.id());
    tracing::info!(
        user_id = session.user_id,
        session_id = %session.session_id,
        reason = disconnect_reason,
        "gateway: session closed"
    );
}

/// Read frames until a valid IDENTIFY arrives. Returns `None` on an invalid
/// token or a closed socket.
async fn wait_for_identify(
    receiver: &mut (impl StreamExt<Item = Result<Message, axum::Error>> + Unpin),
    state: &AppState,
) -> Option<Session> {
    while let Some(Ok(msg)) = receiver.next().await {
        let Message::Text(text) = msg else {
            continue;
        };
        let Ok(frame) = serde_json::from_str::<GatewayMessage>(&text) else {
            continue;
        };
        if frame.op != OP_IDENTIFY {
            continue;
        }
        let token = frame
            .d
            .as_ref()
            .and_then(|d| d.get("token"))
            .and_then(|t| t.as_str())?;

        return match linkup_core::identity::validate_token(token, &state.config.jwt_secret) {
            Ok(claims) => Some(Session::new(claims.sub)),
            Err(_) => {
                tracing::debug!("gateway: identify rejected (invalid token)");
                None
            }
        };
    }
    None
}

fn dispatch_frame(session: &mut Session, push: Push) -> String {
    let (event_type, payload) = match push {
        Push::Message(message) => (
            EVENT_MESSAGE_CREATE,
            serde_json::to_value(message).unwrap_or(Value::Null),
        ),
        Push::Notification(event) => (
            EVENT_NOTIFICATION,
            serde_json::to_value(event).unwrap_or(Value::Null),
        ),
    };
    json!({
        "op": OP_DISPATCH,
        "t": event_type,
        "s": session.next_sequence(),
        "d": payload
    })
    .to_string()
}
