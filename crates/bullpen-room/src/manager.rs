//! Room manager: creates, tracks, and routes requests to rooms.

use std::collections::HashMap;
use std::sync::Arc;

use bullpen_protocol::{Card, ConnectionId, PlayerId, RoomSlug};
use tokio::time::Instant;

use crate::names::{NameGenerator, WordNames};
use crate::presence::Attach;
use crate::room::{RoomSeed, spawn_room};
use crate::store::{MemoryStore, RoomStore, StoreError};
use crate::{JoinRequest, RoomConfig, RoomError, RoomHandle, RoomInfo, RoomSnapshot};

/// Slug candidates tried before giving up on a new room.
const NAME_ATTEMPTS: usize = 16;

/// Options for a new room.
#[derive(Debug, Clone)]
pub struct NewRoom {
    pub host: PlayerId,
    pub host_name: String,
    pub secret: Option<String>,
    /// Overrides the manager's defaults for this room.
    pub config: Option<RoomConfig>,
}

impl NewRoom {
    pub fn hosted_by(host: PlayerId, host_name: impl Into<String>) -> Self {
        Self {
            host,
            host_name: host_name.into(),
            secret: None,
            config: None,
        }
    }

    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    pub fn with_config(mut self, config: RoomConfig) -> Self {
        self.config = Some(config);
        self
    }
}

/// Owns every live room.
///
/// This is the entry point for room operations from higher layers. The
/// manager itself is not shared; wrap it in a mutex to hand it to
/// several tasks.
pub struct RoomManager<S: RoomStore = MemoryStore, N: NameGenerator = WordNames> {
    rooms: HashMap<RoomSlug, RoomHandle>,
    store: Arc<S>,
    names: N,
    defaults: RoomConfig,
}

impl RoomManager {
    /// An in-memory manager with default settings and random slugs.
    pub fn in_memory() -> Self {
        Self {
            rooms: HashMap::new(),
            store: Arc::new(MemoryStore::new()),
            names: WordNames::new(),
            defaults: RoomConfig::default(),
        }
    }
}

impl<S: RoomStore, N: NameGenerator> RoomManager<S, N> {
    /// # Errors
    /// [`RoomError::InvalidConfiguration`] if `defaults` don't validate.
    pub fn new(store: Arc<S>, names: N, defaults: RoomConfig) -> Result<Self, RoomError> {
        Ok(Self {
            rooms: HashMap::new(),
            store,
            names,
            defaults: defaults.validated()?,
        })
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn defaults(&self) -> &RoomConfig {
        &self.defaults
    }

    // -- Lifecycle ---------------------------------------------------------

    /// Creates a room with the host already seated and returns its slug.
    ///
    /// Slugs come from the name generator; a candidate is skipped while a
    /// live room or a stored record already uses it.
    pub async fn create_room(&mut self, request: NewRoom) -> Result<RoomSlug, RoomError> {
        let config = match request.config {
            Some(config) => config.validated()?,
            None => self.defaults.clone(),
        };
        let slug = self.free_slug().await?;
        let handle = spawn_room(
            RoomSeed {
                slug: slug.clone(),
                config,
                secret: request.secret,
                host: request.host,
                host_name: request.host_name,
            },
            Arc::clone(&self.store),
        )?;
        self.rooms.insert(slug.clone(), handle);
        tracing::info!(room = %slug, host = %request.host, "room created");
        Ok(slug)
    }

    async fn free_slug(&self) -> Result<RoomSlug, RoomError> {
        for attempt in 1..=NAME_ATTEMPTS {
            let slug = RoomSlug::new(self.names.next_name());
            if self.rooms.contains_key(&slug) || self.store.exists(&slug.store_key()).await? {
                tracing::debug!(room = %slug, attempt, "room name taken, retrying");
                continue;
            }
            return Ok(slug);
        }
        Err(RoomError::NameExhausted(NAME_ATTEMPTS))
    }

    /// Stops the room, cancelling its timers, and deletes its stored keys.
    pub async fn close_room(&mut self, slug: &RoomSlug) -> Result<(), RoomError> {
        let handle = self
            .rooms
            .remove(slug)
            .ok_or_else(|| RoomError::NotFound(slug.clone()))?;

        // An actor that already stopped has nothing left to cancel.
        let _ = handle.shutdown().await;

        match self.purge(slug).await {
            Ok(removed) => tracing::info!(room = %slug, keys = removed, "room closed"),
            Err(err) => {
                tracing::warn!(room = %slug, error = %err, "room closed, store cleanup failed");
            }
        }
        Ok(())
    }

    /// Deletes `room:<slug>` and every `room:<slug>:<round>`.
    async fn purge(&self, slug: &RoomSlug) -> Result<usize, StoreError> {
        let key = slug.store_key();
        let mut removed = usize::from(self.store.delete(&key).await?);
        for round_key in self.store.list_keys(&format!("{key}:")).await? {
            if self.store.delete(&round_key).await? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Closes every room idle past its grace period, and forgets rooms
    /// whose actor already stopped. Returns the closed slugs.
    pub async fn reap_idle(&mut self, now: Instant) -> Vec<RoomSlug> {
        let mut expired = Vec::new();
        for (slug, handle) in &self.rooms {
            match handle.get_info().await {
                Ok(info) if info.reap_at.is_some_and(|at| at <= now) => {
                    expired.push(slug.clone());
                }
                Ok(_) => {}
                Err(_) => expired.push(slug.clone()),
            }
        }
        for slug in &expired {
            tracing::info!(room = %slug, "reaping idle room");
            let _ = self.close_room(slug).await;
        }
        expired
    }

    // -- Routing -----------------------------------------------------------

    /// The handle of a live room.
    pub fn room(&self, slug: &RoomSlug) -> Result<&RoomHandle, RoomError> {
        self.rooms
            .get(slug)
            .ok_or_else(|| RoomError::NotFound(slug.clone()))
    }

    pub async fn join(&self, slug: &RoomSlug, request: JoinRequest) -> Result<Attach, RoomError> {
        self.room(slug)?.join(request).await
    }

    pub async fn leave(&self, slug: &RoomSlug, player_id: PlayerId) -> Result<(), RoomError> {
        self.room(slug)?.leave(player_id).await
    }

    pub async fn disconnect(
        &self,
        slug: &RoomSlug,
        player_id: PlayerId,
        connection: ConnectionId,
    ) -> Result<bool, RoomError> {
        self.room(slug)?.disconnect(player_id, connection).await
    }

    pub async fn kick(&self, slug: &RoomSlug, player_id: PlayerId) -> Result<(), RoomError> {
        self.room(slug)?.kick(player_id).await
    }

    pub async fn start_game(&self, slug: &RoomSlug, player_id: PlayerId) -> Result<(), RoomError> {
        self.room(slug)?.start_game(player_id).await
    }

    pub async fn submit_move(
        &self,
        slug: &RoomSlug,
        player_id: PlayerId,
        card_id: u32,
    ) -> Result<(), RoomError> {
        self.room(slug)?.submit_move(player_id, card_id).await
    }

    pub async fn choose_slot(
        &self,
        slug: &RoomSlug,
        player_id: PlayerId,
        index: usize,
    ) -> Result<(), RoomError> {
        self.room(slug)?.choose_slot(player_id, index).await
    }

    pub async fn restart_round(&self, slug: &RoomSlug, player_id: PlayerId) -> Result<(), RoomError> {
        self.room(slug)?.restart_round(player_id).await
    }

    pub async fn chat(
        &self,
        slug: &RoomSlug,
        player_id: PlayerId,
        text: String,
    ) -> Result<(), RoomError> {
        self.room(slug)?.chat(player_id, text).await
    }

    pub async fn hand(&self, slug: &RoomSlug, player_id: PlayerId) -> Result<Vec<Card>, RoomError> {
        self.room(slug)?.hand(player_id).await
    }

    // -- Queries -----------------------------------------------------------

    pub async fn room_info(&self, slug: &RoomSlug) -> Result<RoomInfo, RoomError> {
        self.room(slug)?.get_info().await
    }

    pub async fn snapshot(&self, slug: &RoomSlug) -> Result<RoomSnapshot, RoomError> {
        self.room(slug)?.snapshot().await
    }

    /// Info for every responsive room, sorted by slug. Rooms that fail to
    /// answer (shutting down) are skipped.
    pub async fn list_rooms(&self) -> Vec<RoomInfo> {
        let mut infos = Vec::with_capacity(self.rooms.len());
        for handle in self.rooms.values() {
            if let Ok(info) = handle.get_info().await {
                infos.push(info);
            }
        }
        infos.sort_by(|a, b| a.slug.cmp(&b.slug));
        infos
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn room_slugs(&self) -> Vec<RoomSlug> {
        self.rooms.keys().cloned().collect()
    }
}
