//! The per-connection transport loop: upgraded WebSocket in, `Spectator`
//! queues out. Grounded on the teacher's `run_client_loop`
//! (one `tokio::select!` over socket reads and an outbound channel) and on
//! `game_anywhere/network/spectator.py`'s `_run`/`read_all_messages`/
//! `send_all_messages` split.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tracing::{debug, warn};

use crate::core::frame::ServerFrame;
use crate::core::spectator::Spectator;

/// Sent as a bare text frame (not a tagged `ServerFrame`) when a client
/// answer arrives while no one is blocked in `GetSync`, mirroring the
/// original's literal `"!Not listening"` string.
const NOT_LISTENING_HINT: &str = "!Not listening";

/// Drives one connection until the client disconnects or the spectator is
/// interrupted. Caller is responsible for having already transitioned the
/// spectator to `CONNECTED` (and sent any greeting) before calling this.
pub async fn run_transport(socket: WebSocket, spectator: Arc<Spectator>) {
    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            incoming = stream.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        if spectator.deliver_inbound(text.to_string()) {
                            if sink.send(Message::Text(NOT_LISTENING_HINT.into())).await.is_err() {
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("client closed connection");
                        break;
                    }
                    Some(Ok(_)) => {
                        // Ping/Pong/Binary frames carry no protocol meaning here.
                    }
                    Some(Err(err)) => {
                        warn!(error = %err, "websocket read error");
                        break;
                    }
                }
            }

            frame = spectator.recv_outbound() => {
                match frame {
                    Some(frame) => {
                        if !forward_outbound(&mut sink, frame).await {
                            break;
                        }
                    }
                    None => break,
                }
            }

            () = spectator.wait_interrupted() => {
                debug!("spectator interrupted; closing transport");
                break;
            }
        }
    }

    spectator.mark_disconnected();
    let _ = sink.close().await;
}

async fn forward_outbound(
    sink: &mut (impl futures_util::Sink<Message, Error = axum::Error> + Unpin),
    frame: ServerFrame,
) -> bool {
    match frame.into_wire_text() {
        Ok(text) => sink.send(Message::Text(text.into())).await.is_ok(),
        Err(err) => {
            warn!(error = %err, "failed to serialize outbound frame");
            true
        }
    }
}
