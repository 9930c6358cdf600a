//! WebSocket observer gateway.
//!
//! Each accepted connection gets its own Tokio task. The flow:
//!   1. Receive `Hello` → check protocol version, trust the player id
//!      (identity is the external auth layer's responsibility)
//!   2. Send `Welcome`, the current session, and the caller's balance
//!   3. Loop: inbound intents are dispatched to the service; every
//!      session commit and relevant balance change is pushed out
//!
//! Pushes come from the store's commit fan-out, so observers always
//! converge on the latest committed value — a slow reader skips
//! intermediate snapshots rather than falling behind.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use kingfall_protocol::{ClientFrame, PlayerId, ServerFrame, PROTOCOL_VERSION};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use crate::{GameService, GatewayError};

/// How long a fresh connection gets to present its `Hello`.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

type WsStream = WebSocketStream<TcpStream>;

/// The WebSocket gateway: accepts observer connections and binds each
/// to the shared [`GameService`].
pub struct Gateway {
    listener: TcpListener,
    service: Arc<GameService>,
}

impl Gateway {
    /// Binds the gateway to `addr`.
    pub async fn bind(
        addr: &str,
        service: Arc<GameService>,
    ) -> Result<Self, GatewayError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(GatewayError::Bind)?;
        tracing::info!(addr, "gateway listening");
        Ok(Self { listener, service })
    }

    /// The locally bound address (useful with port 0).
    pub fn local_addr(&self) -> Result<std::net::SocketAddr, GatewayError> {
        self.listener.local_addr().map_err(GatewayError::Bind)
    }

    /// Accept loop. Runs until the listener fails.
    pub async fn run(self) -> Result<(), GatewayError> {
        loop {
            let (stream, addr) = self
                .listener
                .accept()
                .await
                .map_err(GatewayError::Accept)?;
            let service = Arc::clone(&self.service);

            tokio::spawn(async move {
                let ws = match tokio_tungstenite::accept_async(stream).await {
                    Ok(ws) => ws,
                    Err(e) => {
                        tracing::debug!(%addr, error = %e, "websocket upgrade failed");
                        return;
                    }
                };
                if let Err(e) = handle_connection(ws, service).await {
                    tracing::debug!(%addr, error = %e, "connection ended with error");
                }
            });
        }
    }
}

/// Handles one observer from handshake to close.
async fn handle_connection(
    mut ws: WsStream,
    service: Arc<GameService>,
) -> Result<(), GatewayError> {
    let player = perform_handshake(&mut ws).await?;
    tracing::info!(%player, "observer connected");

    send(&mut ws, &ServerFrame::Welcome { player }).await?;

    // Seed the observer with the current state before streaming deltas.
    let mut sessions = service.subscribe();
    let snapshot = sessions.borrow_and_update().clone();
    send(
        &mut ws,
        &ServerFrame::Session {
            session: snapshot.value,
            version: snapshot.version.0,
        },
    )
    .await?;
    let coins = service.balance(player).await;
    send(&mut ws, &ServerFrame::Balance { player, coins }).await?;

    let mut balances = service.subscribe_balances();

    loop {
        tokio::select! {
            inbound = ws.next() => {
                match inbound {
                    Some(Ok(msg)) => {
                        if handle_client_message(&mut ws, &service, player, msg)
                            .await?
                        {
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        tracing::debug!(%player, error = %e, "recv error");
                        break;
                    }
                    None => break,
                }
            }

            changed = sessions.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = sessions.borrow_and_update().clone();
                send(
                    &mut ws,
                    &ServerFrame::Session {
                        session: snapshot.value,
                        version: snapshot.version.0,
                    },
                )
                .await?;
            }

            event = balances.recv() => {
                match event {
                    Ok(balance) if balance.player == player => {
                        send(
                            &mut ws,
                            &ServerFrame::Balance {
                                player,
                                coins: balance.coins,
                            },
                        )
                        .await?;
                    }
                    Ok(_) => {} // someone else's balance
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        // Dropped events only ever hide stale values;
                        // re-send the current balance to resync.
                        tracing::debug!(%player, skipped, "balance stream lagged");
                        let coins = service.balance(player).await;
                        send(&mut ws, &ServerFrame::Balance { player, coins })
                            .await?;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    tracing::info!(%player, "observer disconnected");
    Ok(())
}

/// Receives and validates the `Hello` frame.
async fn perform_handshake(ws: &mut WsStream) -> Result<PlayerId, GatewayError> {
    let msg = tokio::time::timeout(HANDSHAKE_TIMEOUT, ws.next())
        .await
        .map_err(|_| GatewayError::Handshake("handshake timed out".into()))?
        .ok_or_else(|| {
            GatewayError::Handshake("connection closed before handshake".into())
        })?
        .map_err(GatewayError::Transport)?;

    let frame = match decode(&msg) {
        Some(Ok(frame)) => frame,
        Some(Err(_)) | None => {
            send_error(ws, 400, "first frame must be Hello").await?;
            return Err(GatewayError::Handshake("unreadable first frame".into()));
        }
    };

    match frame {
        ClientFrame::Hello { version, player } => {
            if version != PROTOCOL_VERSION {
                let reason = format!(
                    "version mismatch: expected {PROTOCOL_VERSION}, got {version}"
                );
                send_error(ws, 400, &reason).await?;
                return Err(GatewayError::Handshake(reason));
            }
            Ok(player)
        }
        _ => {
            send_error(ws, 400, "first frame must be Hello").await?;
            Err(GatewayError::Handshake("first frame was not Hello".into()))
        }
    }
}

/// Decodes and dispatches one inbound message. Returns `true` when the
/// connection should close.
async fn handle_client_message(
    ws: &mut WsStream,
    service: &GameService,
    player: PlayerId,
    msg: Message,
) -> Result<bool, GatewayError> {
    let frame = match decode(&msg) {
        Some(Ok(frame)) => frame,
        Some(Err(e)) => {
            tracing::debug!(%player, error = %e, "undecodable frame");
            send_error(ws, 400, "malformed frame").await?;
            return Ok(false);
        }
        None => {
            // Close, or a control frame the library already answered.
            return Ok(matches!(msg, Message::Close(_)));
        }
    };

    let rejection = match frame {
        ClientFrame::Hello { .. } => {
            send_error(ws, 400, "already connected").await?;
            return Ok(false);
        }
        ClientFrame::Join => service.join(player).await.err(),
        ClientFrame::Leave => service.leave(player).await.err(),
        ClientFrame::Move { from, to } => {
            service.make_move(player, from, to).await.err()
        }
        ClientFrame::Reset => service.reset().await.err(),
        ClientFrame::Exchange { units, external_ref } => service
            .exchange(player, units, &external_ref)
            .await
            .err(),
    };

    if let Some(reason) = rejection {
        tracing::debug!(%player, %reason, "intent rejected");
        send(
            ws,
            &ServerFrame::Rejected {
                reason: reason.to_string(),
            },
        )
        .await?;
    }
    Ok(false)
}

/// Extracts a [`ClientFrame`] from a websocket message. `None` for
/// control frames and close.
fn decode(msg: &Message) -> Option<Result<ClientFrame, serde_json::Error>> {
    match msg {
        Message::Text(text) => Some(serde_json::from_str(text.as_str())),
        Message::Binary(data) => Some(serde_json::from_slice(data)),
        _ => None,
    }
}

async fn send(ws: &mut WsStream, frame: &ServerFrame) -> Result<(), GatewayError> {
    let text = serde_json::to_string(frame)?;
    ws.send(Message::Text(text.into()))
        .await
        .map_err(GatewayError::Transport)
}

async fn send_error(
    ws: &mut WsStream,
    code: u16,
    message: &str,
) -> Result<(), GatewayError> {
    send(
        ws,
        &ServerFrame::Error {
            code,
            message: message.to_string(),
        },
    )
    .await
}
