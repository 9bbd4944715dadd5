//! WebSocket command channel.
//!
//! Each text frame carries one `{"command": ..., "context": ...}` request and
//! is answered with the same payload `POST /v1/commands` returns, or an
//! error body. Frames on one socket are handled in order.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use std::sync::Arc;

use deskpilot_core::{
    traits::CommandHandler,
    types::{CommandRequest, CommandResponse},
    Error,
};

use crate::server::{AppState, ErrorResponse};

pub(crate) async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| command_socket(socket, state))
}

async fn command_socket(stream: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = stream.split();
    tracing::debug!("WebSocket client connected");

    while let Some(Ok(message)) = receiver.next().await {
        let reply = match message {
            Message::Text(text) => reply_to(state.handler.as_ref(), &text).await,
            Message::Close(_) => break,
            _ => continue,
        };
        if sender.send(Message::Text(reply)).await.is_err() {
            break;
        }
    }

    tracing::debug!("WebSocket client disconnected");
}

/// Handle one text frame and render the reply frame.
pub async fn reply_to(handler: &dyn CommandHandler, frame: &str) -> String {
    let request: CommandRequest = match serde_json::from_str(frame) {
        Ok(request) => request,
        Err(e) => return render(&ErrorResponse::from(&Error::invalid_request(e.to_string()))),
    };

    match handler.handle(request).await {
        Ok(outcome) => render(&CommandResponse::from(&outcome)),
        Err(e) => {
            tracing::warn!(error = %e, "WebSocket command failed");
            render(&ErrorResponse::from(&e))
        }
    }
}

fn render<T: Serialize>(body: &T) -> String {
    serde_json::to_string(body).unwrap_or_else(|e| {
        format!(r#"{{"code":"SERIALIZATION_ERROR","message":"{}"}}"#, e.to_string().replace('"', "'"))
    })
}
