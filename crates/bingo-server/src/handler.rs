//! Per-connection handler: join, catch up, then relay.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Join the room → card + catch-up snapshot
//!   2. Send `bingo_card`, then the snapshot messages
//!   3. Loop: forward room events out, route client frames in

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use bingo_protocol::{ClientMessage, Codec, NumberStatus, PlayerId, ServerMessage};
use bingo_room::RoomHandle;
use tokio::sync::mpsc;

use crate::BingoError;
use crate::server::ServerState;
use crate::transport::{FrameWriter, WebSocketConnection};

/// Counter for assigning participant IDs.
static NEXT_PLAYER_ID: AtomicU64 = AtomicU64::new(1);

/// Drop guard that removes the participant from the room when the
/// handler exits, however it exits.
///
/// `Drop` is synchronous, so the leave is a fire-and-forget task.
struct LeaveGuard {
    player_id: PlayerId,
    room: RoomHandle,
}

impl Drop for LeaveGuard {
    fn drop(&mut self) {
        let player_id = self.player_id;
        let room = self.room.clone();
        if let Ok(rt) = tokio::runtime::Handle::try_current() {
            rt.spawn(async move {
                if let Err(e) = room.leave(player_id).await {
                    tracing::debug!(%player_id, error = %e, "leave failed");
                }
            });
        }
    }
}

/// Handles a single connection from upgrade to close.
pub(crate) async fn handle_connection(
    conn: WebSocketConnection,
    state: Arc<ServerState>,
) -> Result<(), BingoError> {
    let conn_id = conn.id();
    let peer = conn.peer_addr();
    let player_id = PlayerId(NEXT_PLAYER_ID.fetch_add(1, Ordering::Relaxed));
    let (mut writer, mut reader) = conn.into_split();

    // --- Step 1: Join ---
    let (events_tx, mut events) = mpsc::unbounded_channel();
    let (card, snapshot) = match state.room.join(player_id, events_tx).await {
        Ok(joined) => joined,
        Err(e) => {
            send_error(&mut writer, &state, 503, &e.to_string()).await?;
            writer.close().await;
            return Err(e.into());
        }
    };
    let _guard = LeaveGuard {
        player_id,
        room: state.room.clone(),
    };
    tracing::info!(%conn_id, %peer, %player_id, "participant connected");

    // --- Step 2: Catch up ---
    send(&mut writer, &state, &ServerMessage::BingoCard { card }).await?;
    for msg in snapshot.messages() {
        send(&mut writer, &state, &msg).await?;
    }

    // --- Step 3: Relay ---
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(msg) => send(&mut writer, &state, &msg).await?,
                None => {
                    tracing::debug!(%player_id, "room closed the event stream");
                    break;
                }
            },
            frame = reader.recv() => match frame {
                Ok(Some(data)) => {
                    handle_frame(&mut writer, &state, player_id, &data).await?;
                }
                Ok(None) => {
                    tracing::info!(%player_id, "connection closed cleanly");
                    break;
                }
                Err(e) => {
                    tracing::debug!(%player_id, error = %e, "recv error");
                    break;
                }
            },
        }
    }

    // _guard drops here → leave fires.
    Ok(())
}

/// Decodes one client frame and acts on it.
///
/// Undecodable frames are answered with a 400 and otherwise ignored.
async fn handle_frame(
    writer: &mut FrameWriter,
    state: &ServerState,
    player_id: PlayerId,
    data: &[u8],
) -> Result<(), BingoError> {
    let msg: ClientMessage = match state.codec.decode(data) {
        Ok(msg) => msg,
        Err(e) => {
            tracing::debug!(%player_id, error = %e, "failed to decode client message");
            return send_error(writer, state, 400, &format!("invalid message: {e}")).await;
        }
    };

    match msg {
        ClientMessage::CheckNumber { number } => {
            let status = if state.room.is_drawn(number).await? {
                NumberStatus::Generated
            } else {
                NumberStatus::NotGenerated
            };
            send(writer, state, &ServerMessage::NumberStatus { number, status }).await
        }
        ClientMessage::ClaimWin { card } => {
            // The room tells the claimant (and, on a win, everyone) itself.
            let outcome = state.room.submit_win_claim(player_id, card).await?;
            tracing::debug!(%player_id, ?outcome, "claim processed");
            Ok(())
        }
    }
}

async fn send(
    writer: &mut FrameWriter,
    state: &ServerState,
    msg: &ServerMessage,
) -> Result<(), BingoError> {
    let bytes = state.codec.encode(msg)?;
    writer.send(bytes).await?;
    Ok(())
}

async fn send_error(
    writer: &mut FrameWriter,
    state: &ServerState,
    code: u16,
    message: &str,
) -> Result<(), BingoError> {
    let msg = ServerMessage::Error {
        code,
        message: message.to_string(),
    };
    send(writer, state, &msg).await
}
