//! WebSocket subscription endpoint (`graphql-ws` sub-protocol).
//!
//! Only the connection bootstrap is handled here. There is no operation
//! executor, so started operations are completed immediately.

mod initializer;
mod session;

pub use initializer::{ConnectionInitRequest, ConnectionInitializer, NoopConnectionInitializer};
pub use session::{
    ClientMessage, ConnectionSession, ErrorPayload, GRAPHQL_WS_PROTOCOL, ServerMessage,
    SessionAction,
};

use axum::{
    extract::{
        Extension,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::{debug, error};

pub async fn subscriptions(
    ws: WebSocketUpgrade,
    initializer: Extension<Arc<dyn ConnectionInitializer>>,
) -> impl IntoResponse {
    let initializer = initializer.0;
    ws.protocols([GRAPHQL_WS_PROTOCOL])
        .on_upgrade(move |socket| serve(socket, initializer))
}

async fn serve(mut socket: WebSocket, initializer: Arc<dyn ConnectionInitializer>) {
    let mut session = ConnectionSession::new();
    debug!(session = %session.id(), "Subscription connection opened");

    while let Some(message) = socket.recv().await {
        let text = match message {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(err) => {
                debug!("Subscription connection error: {err}");
                break;
            }
        };

        let action = match serde_json::from_str::<ClientMessage>(text.as_str()) {
            Ok(message) => session.handle(message, initializer.as_ref()).await,
            Err(err) => {
                debug!("Unparseable subscription message: {err}");
                SessionAction::Reply(ServerMessage::connection_error("Invalid message"))
            }
        };

        let reply = match action {
            SessionAction::Reply(reply) => reply,
            SessionAction::Execute { id, payload: _ } => {
                session.complete(&id);
                ServerMessage::Complete { id }
            }
            SessionAction::Close => break,
            SessionAction::Ignore => continue,
        };

        if let Err(err) = send(&mut socket, &reply).await {
            debug!("Failed to send subscription message: {err}");
            break;
        }
    }

    debug!(session = %session.id(), "Subscription connection closed");
}

async fn send(socket: &mut WebSocket, message: &ServerMessage) -> Result<(), axum::Error> {
    match serde_json::to_string(message) {
        Ok(json) => socket.send(Message::Text(json.into())).await,
        Err(err) => {
            error!("Failed to serialize subscription message: {err}");
            Ok(())
        }
    }
}
