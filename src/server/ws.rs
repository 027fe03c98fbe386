//! WebSocket endpoint that feeds connections into the signaling hub.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::AppState;
use crate::signaling::Envelope;

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle a WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let hub = state.hub;
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::channel::<String>(100);

    // Spawn task to forward messages to client
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(Message::Text(msg)).await.is_err() {
                break;
            }
        }
    });

    let id = hub.register(tx.clone()).await;
    info!("Peer {} connected", id);

    // The newcomer learns its identifier first; then everyone, newcomer
    // included, hears the fresh connection count.
    let _ = tx.send(Envelope::client_id(id).to_text()).await;
    hub.broadcast(&Envelope::user_count(hub.count().await), None)
        .await;

    // Process incoming frames
    while let Some(result) = receiver.next().await {
        let text = match result {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                debug!("WebSocket error from peer {}: {}", id, e);
                break;
            }
        };

        let Some(mut envelope) = Envelope::from_text(&text) else {
            debug!("Peer {} sent an undecodable frame, dropping it", id);
            continue;
        };

        envelope.stamp_from(id);
        hub.broadcast(&envelope, Some(id)).await;
    }

    // Whatever ended the loop: leave the membership set before announcing
    // the new count, then stop this peer's share on its behalf.
    hub.unregister(id).await;
    hub.broadcast(&Envelope::user_count(hub.count().await), None)
        .await;
    hub.broadcast(&Envelope::stop_sharing(id), None).await;

    info!("Peer {} disconnected", id);
    send_task.abort();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signaling::SignalingHub;
    use futures::{SinkExt, StreamExt};
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio_tungstenite::{connect_async, tungstenite::Message};

    type WsStream = tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >;
    type WsWrite = futures::stream::SplitSink<WsStream, Message>;
    type WsRead = futures::stream::SplitStream<WsStream>;

    async fn setup_test_server() -> (String, Arc<SignalingHub>) {
        let hub = Arc::new(SignalingHub::new());

        // Find available port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let state = AppState {
            hub: hub.clone(),
            stun_port: 0,
        };

        let app = axum::Router::new()
            .route("/ws", axum::routing::any(ws_handler))
            .with_state(state);

        tokio::spawn(async move {
            let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
            axum::serve(listener, app).await.unwrap();
        });

        tokio::time::sleep(Duration::from_millis(100)).await;

        (addr.to_string(), hub)
    }

    async fn recv_json(read: &mut WsRead) -> serde_json::Value {
        let response = tokio::time::timeout(Duration::from_secs(2), read.next())
            .await
            .expect("Timeout waiting for message")
            .unwrap()
            .unwrap();
        serde_json::from_str(response.to_text().unwrap()).unwrap()
    }

    /// Connect and consume the two greeting envelopes every newcomer gets.
    async fn join(addr: &str) -> (WsWrite, WsRead, u64) {
        let url = format!("ws://{}/ws", addr);
        let (ws_stream, _) = connect_async(&url).await.expect("Failed to connect");
        let (write, mut read) = ws_stream.split();

        let greeting = recv_json(&mut read).await;
        assert_eq!(greeting["type"], "client-id");
        let id = greeting["data"].as_u64().expect("client-id carries a number");

        let count = recv_json(&mut read).await;
        assert_eq!(count["type"], "user-count");

        (write, read, id)
    }

    #[tokio::test]
    async fn newcomer_gets_its_id_then_the_count() {
        let (addr, _hub) = setup_test_server().await;

        let url = format!("ws://{}/ws", addr);
        let (ws_stream, _) = connect_async(&url).await.expect("Failed to connect");
        let (_write, mut read) = ws_stream.split();

        let greeting = recv_json(&mut read).await;
        assert_eq!(greeting["type"], "client-id");
        assert!(greeting["data"].is_u64());

        let count = recv_json(&mut read).await;
        assert_eq!(count["type"], "user-count");
        assert_eq!(count["data"], 1);
    }

    #[tokio::test]
    async fn every_peer_hears_the_new_count() {
        let (addr, hub) = setup_test_server().await;

        let (_wa, mut ra, id_a) = join(&addr).await;
        let (_wb, _rb, id_b) = join(&addr).await;
        assert_ne!(id_a, id_b);

        // The first peer gets the updated count when the second one joins.
        let update = recv_json(&mut ra).await;
        assert_eq!(update["type"], "user-count");
        assert_eq!(update["data"], 2);

        assert_eq!(hub.count().await, 2);
    }

    #[tokio::test]
    async fn relay_stamps_from_and_skips_the_sender() {
        let (addr, _hub) = setup_test_server().await;

        let (mut wa, mut ra, id_a) = join(&addr).await;
        let (_wb, mut rb, _id_b) = join(&addr).await;
        let _ = recv_json(&mut ra).await; // second peer's arrival

        wa.send(Message::Text(json!({"type": "start-sharing"}).to_string()))
            .await
            .unwrap();

        let relayed = recv_json(&mut rb).await;
        assert_eq!(relayed["type"], "start-sharing");
        assert_eq!(relayed["from"], id_a);

        // The sender hears nothing back.
        let echo = tokio::time::timeout(Duration::from_millis(200), ra.next()).await;
        assert!(echo.is_err(), "sender received its own broadcast");
    }

    #[tokio::test]
    async fn payload_and_target_pass_through_untouched() {
        let (addr, _hub) = setup_test_server().await;

        let (mut wa, mut ra, id_a) = join(&addr).await;
        let (_wb, mut rb, id_b) = join(&addr).await;
        let _ = recv_json(&mut ra).await;

        let sdp = json!({
            "type": "offer",
            "sdp": "v=0\r\no=- 4611731400430051336 2 IN IP4 127.0.0.1\r\n",
        });
        wa.send(Message::Text(
            json!({"type": "offer", "data": sdp, "targetId": id_b}).to_string(),
        ))
        .await
        .unwrap();

        let relayed = recv_json(&mut rb).await;
        assert_eq!(relayed["type"], "offer");
        assert_eq!(relayed["data"], sdp);
        assert_eq!(relayed["targetId"], id_b);
        assert_eq!(relayed["from"], id_a);
    }

    #[tokio::test]
    async fn null_payloads_and_extra_fields_relay_intact() {
        let (addr, _hub) = setup_test_server().await;

        let (mut wa, mut ra, id_a) = join(&addr).await;
        let (_wb, mut rb, _id_b) = join(&addr).await;
        let _ = recv_json(&mut ra).await;

        // A null end-of-candidates marker and a field the relay has never
        // heard of must both survive the trip.
        wa.send(Message::Text(
            r#"{"type":"ice-candidate","data":null,"targetId":7,"final":true}"#.to_string(),
        ))
        .await
        .unwrap();

        let relayed = recv_json(&mut rb).await;
        assert_eq!(relayed["type"], "ice-candidate");
        assert!(relayed.as_object().unwrap().contains_key("data"));
        assert_eq!(relayed["data"], serde_json::Value::Null);
        assert_eq!(relayed["targetId"], 7);
        assert_eq!(relayed["final"], true);
        assert_eq!(relayed["from"], id_a);
    }

    #[tokio::test]
    async fn undecodable_frames_do_not_kill_the_connection() {
        let (addr, hub) = setup_test_server().await;

        let (mut wa, mut ra, _id_a) = join(&addr).await;
        let (_wb, mut rb, _id_b) = join(&addr).await;
        let _ = recv_json(&mut ra).await;

        wa.send(Message::Text("not json".to_string())).await.unwrap();
        wa.send(Message::Text(json!({"data": "no type field"}).to_string()))
            .await
            .unwrap();
        wa.send(Message::Text(
            json!({"type": "ice-candidate", "data": {"candidate": "candidate:0"}}).to_string(),
        ))
        .await
        .unwrap();

        // Only the well-formed envelope comes through, and the sender is
        // still a member.
        let relayed = recv_json(&mut rb).await;
        assert_eq!(relayed["type"], "ice-candidate");
        assert_eq!(hub.count().await, 2);
    }

    #[tokio::test]
    async fn non_text_frames_are_skipped() {
        let (addr, _hub) = setup_test_server().await;

        let (mut wa, mut ra, _id_a) = join(&addr).await;
        let (_wb, mut rb, _id_b) = join(&addr).await;
        let _ = recv_json(&mut ra).await;

        wa.send(Message::Binary(vec![0x01, 0x02, 0x03])).await.unwrap();
        wa.send(Message::Text(json!({"type": "start-sharing"}).to_string()))
            .await
            .unwrap();

        let relayed = recv_json(&mut rb).await;
        assert_eq!(relayed["type"], "start-sharing");
    }

    #[tokio::test]
    async fn departure_broadcasts_count_then_stop() {
        let (addr, hub) = setup_test_server().await;

        let (mut wa, mut ra, id_a) = join(&addr).await;
        let (_wb, mut rb, _id_b) = join(&addr).await;
        let _ = recv_json(&mut ra).await;

        wa.send(Message::Close(None)).await.unwrap();

        // Remaining peers see the decremented count first, then the
        // synthetic stop on the departed peer's behalf.
        let count = recv_json(&mut rb).await;
        assert_eq!(count["type"], "user-count");
        assert_eq!(count["data"], 1);

        let stop = recv_json(&mut rb).await;
        assert_eq!(stop["type"], "stop-sharing");
        assert_eq!(stop["from"], id_a);

        assert_eq!(hub.count().await, 1);
    }

    #[tokio::test]
    async fn abrupt_disconnect_is_announced_too() {
        let (addr, hub) = setup_test_server().await;

        let (wa, mut ra, id_a) = join(&addr).await;
        let (_wb, mut rb, _id_b) = join(&addr).await;
        let _ = recv_json(&mut ra).await;

        // Tear the TCP stream down without a close handshake.
        drop(wa);
        drop(ra);

        let count = recv_json(&mut rb).await;
        assert_eq!(count["type"], "user-count");
        assert_eq!(count["data"], 1);

        let stop = recv_json(&mut rb).await;
        assert_eq!(stop["type"], "stop-sharing");
        assert_eq!(stop["from"], id_a);

        assert_eq!(hub.count().await, 1);
    }
}
