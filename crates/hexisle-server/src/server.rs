//! WebSocket server and connection handling.

use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::connection::{ConnectionManager, Heartbeat, Liveness, Outbound};
use crate::coordinator::{Coordinator, Event};
use crate::protocol::{ClientMessage, ServerMessage};

/// Run the WebSocket server.
pub async fn run_server(config: Arc<ServerConfig>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(config.addr).await?;
    info!("Hexisle server listening on {}", config.addr);

    let connections = Arc::new(ConnectionManager::new());
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let coordinator = Coordinator::new(Arc::clone(&config), Arc::clone(&connections), events_tx.clone());
    tokio::spawn(coordinator.run(events_rx));

    while let Ok((stream, peer_addr)) = listener.accept().await {
        let connections = Arc::clone(&connections);
        let events = events_tx.clone();
        let config = Arc::clone(&config);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, peer_addr, connections, events, config).await {
                error!("Connection error from {}: {}", peer_addr, e);
            }
        });
    }

    Ok(())
}

/// Handle a single WebSocket connection.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    connections: Arc<ConnectionManager>,
    events: mpsc::UnboundedSender<Event>,
    config: Arc<ServerConfig>,
) -> anyhow::Result<()> {
    let ws_stream = accept_async(stream).await?;
    info!("New WebSocket connection from {}", addr);

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    let connection_id = Uuid::new_v4();

    // Create channel for outgoing frames
    let (tx, mut rx) = mpsc::unbounded_channel::<Outbound>();
    connections.register(connection_id, tx);

    let welcome = ServerMessage::Welcome { connection_id };
    let msg_text = serde_json::to_string(&welcome)?;
    ws_sender.send(Message::Text(msg_text.into())).await?;
    let _ = events.send(Event::Connected { connection_id });

    // Spawn task to forward frames from channel to WebSocket
    let send_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            let ws_msg = match frame {
                Outbound::Message(msg) => match serde_json::to_string(&msg) {
                    Ok(text) => Message::Text(text.into()),
                    Err(e) => {
                        error!("Failed to encode message: {}", e);
                        continue;
                    }
                },
                Outbound::Ping => Message::Ping(Vec::new()),
            };
            if ws_sender.send(ws_msg).await.is_err() {
                break;
            }
        }
    });

    let mut heartbeat = Heartbeat::new();
    let mut ticker = tokio::time::interval(config.heartbeat_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticker.tick().await;

    loop {
        tokio::select! {
            msg = ws_receiver.next() => {
                let Some(msg) = msg else { break };
                heartbeat.on_activity();
                match msg {
                    Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                        Ok(ClientMessage::Ping) => connections.send(connection_id, ServerMessage::Pong),
                        Ok(message) => {
                            let _ = events.send(Event::Client { connection_id, message });
                        }
                        Err(e) => {
                            warn!("Invalid message from {}: {}", connection_id, e);
                            connections.send(
                                connection_id,
                                ServerMessage::Error {
                                    message: format!("Invalid message: {}", e),
                                },
                            );
                        }
                    },
                    Ok(Message::Close(_)) => {
                        info!("Client {} closing connection", connection_id);
                        break;
                    }
                    Err(e) => {
                        error!("WebSocket error from {}: {}", connection_id, e);
                        break;
                    }
                    // Pings are answered by tungstenite; pongs only count as activity.
                    Ok(_) => {}
                }
            }
            _ = ticker.tick() => {
                match heartbeat.on_tick() {
                    Liveness::Alive => connections.ping(connection_id),
                    Liveness::Expired => {
                        warn!(connection = %connection_id, "Heartbeat expired, dropping connection");
                        break;
                    }
                }
            }
        }
    }

    // Clean up on disconnect
    connections.unregister(connection_id);
    let _ = events.send(Event::Disconnected { connection_id });
    send_task.abort();

    debug!(remaining = connections.len(), "connection cleaned up");
    info!("Connection closed for {}", connection_id);
    Ok(())
}
