use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{error, info, warn};

use crate::error::ServerError;
use crate::protocol::{Envelope, FrameSnapshot, PlayerInput, ServerMessage};

/// Channel for sending serialized frames to the connected client.
type FrameTx = mpsc::UnboundedSender<Vec<u8>>;

/// The websocket host.
///
/// Serves a single client: msgpack `PlayerInput` batches come in, one
/// msgpack `ServerMessage` per simulation tick goes out.
pub struct GameServer {
    /// Sender half – the game loop serializes frames and pushes the bytes
    /// here for the write task.
    client_tx: Option<FrameTx>,

    /// Receiver half – the game loop drains this for decoded `PlayerInput`.
    pub input_rx: mpsc::UnboundedReceiver<PlayerInput>,
}

impl GameServer {
    /// Bind `addr` and wait for exactly one WebSocket client. Once connected,
    /// two background tasks are spawned:
    ///
    /// 1. **Write task** – forwards serialized binary frames from `client_tx`
    ///    to the WebSocket sink.
    /// 2. **Read task** – decodes binary frames as `PlayerInput` and pushes
    ///    them into the input channel.
    pub async fn start(addr: &str) -> Result<Self, ServerError> {
        let (input_tx, input_rx) = mpsc::unbounded_channel::<PlayerInput>();

        let listener = TcpListener::bind(addr).await?;
        info!("Office server listening on ws://{}", addr);
        info!("Waiting for a client connection...");

        let (stream, peer) = listener.accept().await?;
        info!("Client connected from {}", peer);

        let ws_stream = accept_async(stream).await?;
        let (mut ws_write, mut ws_read) = ws_stream.split();

        // Channel: game loop -> write task -> WebSocket
        let (client_tx, mut client_rx) = mpsc::unbounded_channel::<Vec<u8>>();

        // ── Write task ──────────────────────────────────────────────
        tokio::spawn(async move {
            while let Some(bytes) = client_rx.recv().await {
                if let Err(e) = ws_write.send(Message::Binary(bytes.into())).await {
                    error!("Failed to send WebSocket message: {}", e);
                    break;
                }
            }
            info!("Write task shutting down");
        });

        // ── Read task ───────────────────────────────────────────────
        tokio::spawn(async move {
            while let Some(result) = ws_read.next().await {
                match result {
                    Ok(msg) if msg.is_binary() => match decode_input(&msg.into_data()) {
                        Ok(input) => {
                            if let Err(e) = input_tx.send(input) {
                                warn!("Input channel closed: {}", e);
                                break;
                            }
                        }
                        Err(e) => warn!("Failed to decode PlayerInput: {}", e),
                    },
                    Ok(msg) if msg.is_close() => break,
                    Ok(_) => {}
                    Err(e) => {
                        error!("WebSocket read error: {}", e);
                        break;
                    }
                }
            }
            info!("Read task shutting down");
        });

        Ok(Self {
            client_tx: Some(client_tx),
            input_rx,
        })
    }

    pub fn is_connected(&self) -> bool {
        self.client_tx.is_some()
    }

    /// One tick's events and the resulting state.
    pub fn send_frame(&mut self, events: Vec<Envelope>, snapshot: FrameSnapshot) {
        self.send_message(&ServerMessage::Frame { events, snapshot });
    }

    pub fn send_rejection(&mut self, command: String, reason: String) {
        self.send_message(&ServerMessage::CommandRejected { command, reason });
    }

    /// Send any ServerMessage to the client. A dropped channel marks the
    /// client as gone and later sends become no-ops.
    pub fn send_message(&mut self, msg: &ServerMessage) {
        let Some(tx) = &self.client_tx else {
            return;
        };
        match encode_message(msg) {
            Ok(bytes) => {
                if tx.send(bytes).is_err() {
                    warn!("Client disconnected; stopping sends");
                    self.client_tx = None;
                }
            }
            Err(e) => error!("Failed to serialize ServerMessage: {}", e),
        }
    }
}

pub fn encode_message(msg: &ServerMessage) -> Result<Vec<u8>, rmp_serde::encode::Error> {
    rmp_serde::to_vec_named(msg)
}

pub fn decode_input(data: &[u8]) -> Result<PlayerInput, rmp_serde::decode::Error> {
    rmp_serde::from_slice(data)
}
