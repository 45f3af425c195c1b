//! Per-event dispatch: decode, route to the room, answer the sender.
//!
//! A transport owns the sockets. For every inbound frame it knows which
//! room the connection targets, which player it authenticated as, and
//! which connection it came from; it hands those to [`Gateway::receive`]
//! along with the push channel for that connection. The flow is:
//!   1. Decode bytes → [`ClientEvent`], reject garbage
//!   2. Look up the room handle (the manager lock is held only for this)
//!   3. Forward the event to the room actor and wait for its verdict
//!   4. On failure, push `Rejected` to the originating connection only

use std::sync::Arc;

use bullpen_protocol::{ClientEvent, Codec, ConnectionId, PlayerId, RoomSlug, ServerPush};
use bullpen_room::{
    Attach, JoinRequest, NameGenerator, PushSender, RoomHandle, RoomManager, RoomStore,
};
use tokio::sync::Mutex;

use crate::BullpenError;

/// Where an inbound event came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    pub slug: RoomSlug,
    pub player_id: PlayerId,
    pub connection: ConnectionId,
}

impl Origin {
    pub fn new(slug: RoomSlug, player_id: PlayerId, connection: ConnectionId) -> Self {
        Self {
            slug,
            player_id,
            connection,
        }
    }
}

/// Routes tagged inbound events to their rooms.
///
/// Cheap to clone; every connection task can hold its own copy.
pub struct Gateway<S: RoomStore, N: NameGenerator, C: Codec> {
    rooms: Arc<Mutex<RoomManager<S, N>>>,
    codec: C,
}

impl<S: RoomStore, N: NameGenerator, C: Codec + Clone> Clone for Gateway<S, N, C> {
    fn clone(&self) -> Self {
        Self {
            rooms: Arc::clone(&self.rooms),
            codec: self.codec.clone(),
        }
    }
}

impl<S: RoomStore, N: NameGenerator, C: Codec> Gateway<S, N, C> {
    pub fn new(rooms: Arc<Mutex<RoomManager<S, N>>>, codec: C) -> Self {
        Self { rooms, codec }
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    /// Serializes a push for the wire.
    pub fn encode(&self, push: &ServerPush) -> Result<Vec<u8>, BullpenError> {
        Ok(self.codec.encode(push)?)
    }

    /// Decodes one inbound frame and dispatches it.
    ///
    /// # Errors
    /// Whatever rejected the event. The reason has already been pushed to
    /// `sender` as [`ServerPush::Rejected`]; the caller only logs it.
    pub async fn receive(
        &self,
        origin: &Origin,
        sender: &PushSender,
        data: &[u8],
    ) -> Result<(), BullpenError> {
        let event = match self.codec.decode_event(data) {
            Ok(event) => event,
            Err(err) => {
                tracing::debug!(
                    room = %origin.slug,
                    player = %origin.player_id,
                    error = %err,
                    "failed to decode event"
                );
                let err = BullpenError::from(err);
                reject(sender, &err);
                return Err(err);
            }
        };
        self.dispatch(origin, sender, event).await
    }

    /// Dispatches an already-decoded event.
    ///
    /// # Errors
    /// See [`receive`](Self::receive).
    pub async fn dispatch(
        &self,
        origin: &Origin,
        sender: &PushSender,
        event: ClientEvent,
    ) -> Result<(), BullpenError> {
        let result = self.route(origin, sender, event).await;
        if let Err(err) = &result {
            tracing::debug!(
                room = %origin.slug,
                player = %origin.player_id,
                kind = ?err.kind(),
                error = %err,
                "event rejected"
            );
            reject(sender, err);
        }
        result
    }

    /// Tells the room a connection dropped. Stale connections are ignored
    /// by the room; the return value says whether this one applied.
    pub async fn disconnected(&self, origin: &Origin) -> Result<bool, BullpenError> {
        let handle = self.handle(&origin.slug).await?;
        Ok(handle
            .disconnect(origin.player_id, origin.connection)
            .await?)
    }

    async fn route(
        &self,
        origin: &Origin,
        sender: &PushSender,
        event: ClientEvent,
    ) -> Result<(), BullpenError> {
        event.validate()?;
        // The lock covers only the lookup; the room call happens without it.
        let handle = self.handle(&origin.slug).await?;
        let player_id = origin.player_id;

        match event {
            ClientEvent::Join { name, secret } => {
                let attach = handle
                    .join(JoinRequest {
                        player_id,
                        name: name.trim().to_string(),
                        secret,
                        connection: origin.connection,
                        sender: sender.clone(),
                    })
                    .await?;
                if attach == Attach::Rejoin {
                    tracing::debug!(room = %origin.slug, player = %player_id, "connection replaced");
                }
            }
            ClientEvent::Leave => handle.leave(player_id).await?,
            ClientEvent::StartGame => handle.start_game(player_id).await?,
            ClientEvent::SubmitMove { card_id } => handle.submit_move(player_id, card_id).await?,
            ClientEvent::ChooseSlot { index } => handle.choose_slot(player_id, index).await?,
            ClientEvent::RestartRound => handle.restart_round(player_id).await?,
            ClientEvent::Chat { text } => handle.chat(player_id, text).await?,
        }
        Ok(())
    }

    async fn handle(&self, slug: &RoomSlug) -> Result<RoomHandle, BullpenError> {
        Ok(self.rooms.lock().await.room(slug)?.clone())
    }
}

/// Pushes the reason to the sender alone.
fn reject(sender: &PushSender, err: &BullpenError) {
    let _ = sender.send(ServerPush::Rejected {
        reason: err.to_string(),
    });
}
