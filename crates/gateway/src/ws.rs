use std::{net::SocketAddr, sync::Arc};

use {
    axum::extract::ws::{Message, WebSocket},
    futures::{SinkExt, StreamExt},
    lansite_protocol::{ClientFrame, ErrorShape, ServerFrame, error_codes},
    lansite_sessions::Connection,
    tracing::{debug, info, warn},
    uuid::Uuid,
};

use crate::{
    methods::{SocketContext, disconnect, dispatch},
    state::{ConnectedSocket, GatewayState},
};

/// Drive one WebSocket until it closes.
///
/// Outbound frames go through an unbounded channel drained by a writer task,
/// so broadcasts never wait on a slow socket while the stream lock is held.
pub async fn handle_connection(socket: WebSocket, state: Arc<GatewayState>, remote: SocketAddr) {
    let conn_id = Uuid::new_v4().to_string();
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (conn, mut outbound) = Connection::channel(conn_id.clone());

    let writer = tokio::spawn(async move {
        while let Some(frame) = outbound.recv().await {
            if ws_tx.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    state
        .register_socket(ConnectedSocket {
            conn_id: conn_id.clone(),
            remote,
        })
        .await;
    info!(conn_id = %conn_id, remote = %remote, "ws: connected");

    let mut ctx = SocketContext::new(conn);
    while let Some(msg) = ws_rx.next().await {
        let text = match msg {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                debug!(conn_id = %conn_id, error = %e, "ws: read error");
                break;
            },
        };
        match serde_json::from_str::<ClientFrame>(text.as_str()) {
            Ok(frame) => dispatch(&state, &mut ctx, frame).await,
            Err(e) => {
                warn!(conn_id = %conn_id, error = %e, "ws: invalid frame");
                ctx.reply(&ServerFrame::Error(ErrorShape::new(
                    error_codes::INVALID_REQUEST,
                    format!("invalid frame: {e}"),
                )));
            },
        }
    }

    disconnect(&state, &ctx).await;
    state.remove_socket(&conn_id).await;
    info!(
        conn_id = %conn_id,
        identity = ?ctx.binding.identity,
        duration_secs = ctx.conn.connected_secs(),
        "ws: disconnected"
    );
    drop(ctx);
    writer.abort();
}
