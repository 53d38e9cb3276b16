//! TCP transport layer feeding the session event queue
//!
//! One reader task and one writer task per connection. Readers decode
//! length-delimited `ClientEvent` frames and forward them as intents; the
//! writer drains the connection's outbound channel. All events funnel into
//! the single queue consumed by the session task, so the transport never
//! touches game state itself.

use crate::clients::ConnId;
use crate::session::SessionEvent;
use log::{debug, error, info, warn};
use shared::codec;
use shared::{ClientEvent, ServerEvent};
use std::time::Duration;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

/// Accept loop: registers each connection with the session and spawns its
/// reader and writer tasks. Runs until the listener fails permanently or
/// the session side of the queue is gone.
pub async fn serve(listener: TcpListener, events_tx: mpsc::UnboundedSender<SessionEvent>) {
    let mut next_conn_id: ConnId = 1;

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let conn = next_conn_id;
                next_conn_id += 1;
                info!("Connection {} accepted from {}", conn, addr);

                let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
                if events_tx
                    .send(SessionEvent::Connected {
                        conn,
                        sender: outbound_tx,
                    })
                    .is_err()
                {
                    // Session loop is gone; nothing left to serve.
                    return;
                }

                let (read_half, write_half) = stream.into_split();
                tokio::spawn(writer_task(conn, write_half, outbound_rx));
                tokio::spawn(reader_task(conn, read_half, events_tx.clone()));
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        }
    }
}

/// Drains the connection's outbound channel into framed writes. Ends when
/// the channel closes (connection unregistered) or a write fails.
async fn writer_task(
    conn: ConnId,
    mut write_half: OwnedWriteHalf,
    mut outbound_rx: mpsc::UnboundedReceiver<ServerEvent>,
) {
    while let Some(event) = outbound_rx.recv().await {
        let payload = match bincode::serialize(&event) {
            Ok(payload) => payload,
            Err(e) => {
                error!("Connection {}: failed to serialize event: {}", conn, e);
                continue;
            }
        };
        if let Err(e) = codec::write_frame(&mut write_half, &payload).await {
            debug!("Connection {}: write failed: {}", conn, e);
            break;
        }
    }
}

/// Reads frames until the peer goes away. Undecodable frames are dropped
/// without reaching the session; stream errors and EOF become a single
/// disconnect event.
async fn reader_task(
    conn: ConnId,
    mut read_half: OwnedReadHalf,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
) {
    loop {
        match codec::read_frame(&mut read_half).await {
            Ok(payload) => match bincode::deserialize::<ClientEvent>(&payload) {
                Ok(event) => {
                    if events_tx
                        .send(SessionEvent::Intent { conn, event })
                        .is_err()
                    {
                        return;
                    }
                }
                Err(e) => {
                    warn!("Connection {}: dropping undecodable frame: {}", conn, e);
                }
            },
            Err(e) => {
                debug!("Connection {} closed: {}", conn, e);
                let _ = events_tx.send(SessionEvent::Disconnected { conn });
                return;
            }
        }
    }
}
