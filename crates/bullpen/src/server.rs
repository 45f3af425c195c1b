//! `BullpenServer` builder and background reaper.
//!
//! This is the entry point for embedding Bullpen. It ties together the
//! layers below it: protocol → room manager → room actors. Transports
//! plug in through the [`Gateway`] it hands out.

use std::sync::Arc;
use std::time::Duration;

use bullpen_protocol::{JsonCodec, PlayerId, RoomSlug};
use bullpen_room::{
    MemoryStore, NameGenerator, NewRoom, RoomConfig, RoomInfo, RoomManager, RoomStore, WordNames,
};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::{BullpenError, Gateway};

/// How often the reaper looks for idle rooms by default.
pub const DEFAULT_REAP_INTERVAL: Duration = Duration::from_secs(10);

/// Builder for configuring and starting a Bullpen server.
///
/// # Example
///
/// ```rust,no_run
/// use bullpen::prelude::*;
///
/// # async fn run() -> Result<(), BullpenError> {
/// let server = BullpenServer::builder()
///     .room_config(RoomConfig { countdown_secs: 20, ..RoomConfig::default() })
///     .build()?;
/// let slug = server.create_room(NewRoom::hosted_by(PlayerId(1), "ada")).await?;
/// let gateway = server.gateway();
/// # let _ = (slug, gateway);
/// # Ok(())
/// # }
/// ```
pub struct BullpenServerBuilder<S: RoomStore = MemoryStore, N: NameGenerator = WordNames> {
    store: Arc<S>,
    names: N,
    room_config: RoomConfig,
    reap_interval: Duration,
}

impl BullpenServerBuilder {
    /// Creates a builder with an in-memory store and random room names.
    pub fn new() -> Self {
        Self {
            store: Arc::new(MemoryStore::new()),
            names: WordNames::new(),
            room_config: RoomConfig::default(),
            reap_interval: DEFAULT_REAP_INTERVAL,
        }
    }
}

impl Default for BullpenServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: RoomStore, N: NameGenerator> BullpenServerBuilder<S, N> {
    /// Persists room snapshots to `store` instead of memory.
    pub fn store<S2: RoomStore>(self, store: Arc<S2>) -> BullpenServerBuilder<S2, N> {
        BullpenServerBuilder {
            store,
            names: self.names,
            room_config: self.room_config,
            reap_interval: self.reap_interval,
        }
    }

    /// Draws room slugs from `names`.
    pub fn names<N2: NameGenerator>(self, names: N2) -> BullpenServerBuilder<S, N2> {
        BullpenServerBuilder {
            store: self.store,
            names,
            room_config: self.room_config,
            reap_interval: self.reap_interval,
        }
    }

    /// Settings for rooms created without their own.
    pub fn room_config(mut self, config: RoomConfig) -> Self {
        self.room_config = config;
        self
    }

    /// Period of the idle-room reaper. `Duration::ZERO` disables it.
    pub fn reap_interval(mut self, interval: Duration) -> Self {
        self.reap_interval = interval;
        self
    }

    /// Builds the server and starts its reaper.
    ///
    /// Must be called from within a Tokio runtime when the reaper is
    /// enabled.
    ///
    /// # Errors
    /// [`BullpenError::Room`] if the room config doesn't validate.
    pub fn build(self) -> Result<BullpenServer<S, N>, BullpenError> {
        let manager = RoomManager::new(self.store, self.names, self.room_config)?;
        let rooms = Arc::new(Mutex::new(manager));
        let reaper = (!self.reap_interval.is_zero())
            .then(|| spawn_reaper(Arc::clone(&rooms), self.reap_interval));
        tracing::info!(reap_interval = ?self.reap_interval, "bullpen server ready");
        Ok(BullpenServer { rooms, reaper })
    }
}

/// A running Bullpen server: the room manager plus its reaper task.
///
/// Dropping the server stops the reaper; rooms stop once their last
/// handle is gone.
pub struct BullpenServer<S: RoomStore = MemoryStore, N: NameGenerator = WordNames> {
    rooms: Arc<Mutex<RoomManager<S, N>>>,
    reaper: Option<JoinHandle<()>>,
}

impl BullpenServer {
    pub fn builder() -> BullpenServerBuilder {
        BullpenServerBuilder::new()
    }
}

impl<S: RoomStore, N: NameGenerator> BullpenServer<S, N> {
    /// A JSON gateway for a transport to feed inbound frames into.
    pub fn gateway(&self) -> Gateway<S, N, JsonCodec> {
        Gateway::new(Arc::clone(&self.rooms), JsonCodec)
    }

    /// Shared access to the manager for the API surface.
    pub fn rooms(&self) -> &Arc<Mutex<RoomManager<S, N>>> {
        &self.rooms
    }

    pub async fn create_room(&self, request: NewRoom) -> Result<RoomSlug, BullpenError> {
        Ok(self.rooms.lock().await.create_room(request).await?)
    }

    pub async fn close_room(&self, slug: &RoomSlug) -> Result<(), BullpenError> {
        Ok(self.rooms.lock().await.close_room(slug).await?)
    }

    pub async fn kick(&self, slug: &RoomSlug, player_id: PlayerId) -> Result<(), BullpenError> {
        Ok(self.rooms.lock().await.kick(slug, player_id).await?)
    }

    pub async fn list_rooms(&self) -> Vec<RoomInfo> {
        self.rooms.lock().await.list_rooms().await
    }

    /// Runs one reaper pass now.
    pub async fn reap_idle(&self) -> Vec<RoomSlug> {
        self.rooms.lock().await.reap_idle(Instant::now()).await
    }

    /// Stops the reaper and closes every room.
    pub async fn shutdown(mut self) {
        if let Some(reaper) = self.reaper.take() {
            reaper.abort();
        }
        let mut rooms = self.rooms.lock().await;
        for slug in rooms.room_slugs() {
            if let Err(err) = rooms.close_room(&slug).await {
                tracing::warn!(room = %slug, error = %err, "failed to close room on shutdown");
            }
        }
        tracing::info!("bullpen server stopped");
    }
}

impl<S: RoomStore, N: NameGenerator> Drop for BullpenServer<S, N> {
    fn drop(&mut self) {
        if let Some(reaper) = self.reaper.take() {
            reaper.abort();
        }
    }
}

fn spawn_reaper<S: RoomStore, N: NameGenerator>(
    rooms: Arc<Mutex<RoomManager<S, N>>>,
    period: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            let reaped = rooms.lock().await.reap_idle(Instant::now()).await;
            if !reaped.is_empty() {
                tracing::info!(count = reaped.len(), "idle rooms reaped");
            }
        }
    })
}
