//! Room actor: an isolated Tokio task that owns one table.
//!
//! Everything that can change a room's state arrives through the actor's
//! command channel or fires from one of its two timers, and all three are
//! polled from a single `select!` loop. That loop is the room's only
//! writer, so a submitted move can never interleave with a paced
//! resolution step or a countdown expiry.
//!
//! Resolution is paced: once every player has a card in, the [`Pacer`]
//! is armed and each firing resolves exactly one play. Moves arriving
//! while it is armed are refused with [`RoomError::Busy`], not queued.

use std::sync::Arc;

use bullpen_game::{ErrorKind, Game, GameError, Placement, RoundEnd, Step};
use bullpen_protocol::{
    Card, ConnectionId, GameStatus, MemberView, PlayerId, Recipient, RoomSlug, SLOT_COUNT,
    ServerPush, Standing,
};
use bullpen_tick::{Countdown, CountdownTick, Pacer};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

use crate::presence::{Attach, PushSender, Roster};
use crate::store::{Fields, RoomStore, StoreError, encode};
use crate::{ExpiryPolicy, RoomConfig, RoomError};

/// Everything a transport knows about a joining connection.
#[derive(Debug)]
pub struct JoinRequest {
    pub player_id: PlayerId,
    pub name: String,
    pub secret: Option<String>,
    pub connection: ConnectionId,
    pub sender: PushSender,
}

/// Commands sent to a room actor through its channel.
pub(crate) enum RoomCommand {
    Join {
        request: JoinRequest,
        reply: oneshot::Sender<Result<Attach, RoomError>>,
    },
    Leave {
        player_id: PlayerId,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },
    /// Transport noticed a dropped connection.
    Disconnect {
        player_id: PlayerId,
        connection: ConnectionId,
        reply: oneshot::Sender<bool>,
    },
    Kick {
        player_id: PlayerId,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },
    StartGame {
        player_id: PlayerId,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },
    SubmitMove {
        player_id: PlayerId,
        card_id: u32,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },
    ChooseSlot {
        player_id: PlayerId,
        index: usize,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },
    RestartRound {
        player_id: PlayerId,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },
    Chat {
        player_id: PlayerId,
        text: String,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },
    /// Makes the next paced resolution step fail as if the engine state
    /// were corrupted.
    FailNextStep {
        reply: oneshot::Sender<()>,
    },
    Hand {
        player_id: PlayerId,
        reply: oneshot::Sender<Result<Vec<Card>, RoomError>>,
    },
    GetInfo {
        reply: oneshot::Sender<RoomInfo>,
    },
    Snapshot {
        reply: oneshot::Sender<RoomSnapshot>,
    },
    /// Cancel timers, notify members, stop.
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Room metadata for listings and the idle reaper.
#[derive(Debug, Clone)]
pub struct RoomInfo {
    pub slug: RoomSlug,
    pub status: GameStatus,
    pub round: u32,
    pub player_count: usize,
    pub max_players: usize,
    pub connected_count: usize,
    pub has_secret: bool,
    pub halted: bool,
    /// When the last connected member left; `None` while anyone is here.
    pub idle_since: Option<Instant>,
    /// When the idle reaper may close the room.
    pub reap_at: Option<Instant>,
}

/// The public state of a room at one instant. Hands are not included.
#[derive(Debug, Clone)]
pub struct RoomSnapshot {
    pub slug: RoomSlug,
    pub status: GameStatus,
    pub round: u32,
    pub host: Option<PlayerId>,
    pub members: Vec<MemberView>,
    pub board: [Vec<Card>; SLOT_COUNT],
    pub waiting_on: Vec<PlayerId>,
    /// A play is queued on the pacer.
    pub resolving: bool,
    pub halted: Option<String>,
    pub standings: Vec<Standing>,
    /// Seconds left while the countdown runs.
    pub countdown: Option<u32>,
}

/// Handle to a running room actor.
///
/// Cheap to clone; it's an `mpsc::Sender` wrapper. The `RoomManager`
/// holds one per room.
#[derive(Clone)]
pub struct RoomHandle {
    slug: RoomSlug,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    pub fn slug(&self) -> &RoomSlug {
        &self.slug
    }

    /// `true` once the actor has stopped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> RoomCommand,
    ) -> Result<T, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(command(reply_tx))
            .await
            .map_err(|_| RoomError::Unavailable(self.slug.clone()))?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.slug.clone()))
    }

    /// Seats a new player or reattaches a known one.
    pub async fn join(&self, request: JoinRequest) -> Result<Attach, RoomError> {
        self.request(|reply| RoomCommand::Join { request, reply })
            .await?
    }

    pub async fn leave(&self, player_id: PlayerId) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::Leave { player_id, reply })
            .await?
    }

    /// Returns whether the notice applied; stale connections are ignored.
    pub async fn disconnect(
        &self,
        player_id: PlayerId,
        connection: ConnectionId,
    ) -> Result<bool, RoomError> {
        self.request(|reply| RoomCommand::Disconnect {
            player_id,
            connection,
            reply,
        })
        .await
    }

    pub async fn kick(&self, player_id: PlayerId) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::Kick { player_id, reply })
            .await?
    }

    pub async fn start_game(&self, player_id: PlayerId) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::StartGame { player_id, reply })
            .await?
    }

    pub async fn submit_move(&self, player_id: PlayerId, card_id: u32) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::SubmitMove {
            player_id,
            card_id,
            reply,
        })
        .await?
    }

    pub async fn choose_slot(&self, player_id: PlayerId, index: usize) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::ChooseSlot {
            player_id,
            index,
            reply,
        })
        .await?
    }

    pub async fn restart_round(&self, player_id: PlayerId) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::RestartRound { player_id, reply })
            .await?
    }

    /// Broadcasts a chat line from a seated player.
    pub async fn chat(&self, player_id: PlayerId, text: String) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::Chat {
            player_id,
            text,
            reply,
        })
        .await?
    }

    /// Fault injection for recovery tests: the next paced resolution step
    /// fails and halts the room.
    #[doc(hidden)]
    pub async fn fail_next_step(&self) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::FailNextStep { reply })
            .await
    }

    pub async fn hand(&self, player_id: PlayerId) -> Result<Vec<Card>, RoomError> {
        self.request(|reply| RoomCommand::Hand { player_id, reply })
            .await?
    }

    pub async fn get_info(&self) -> Result<RoomInfo, RoomError> {
        self.request(|reply| RoomCommand::GetInfo { reply }).await
    }

    pub async fn snapshot(&self) -> Result<RoomSnapshot, RoomError> {
        self.request(|reply| RoomCommand::Snapshot { reply }).await
    }

    /// Stops the room and waits until its timers are cancelled.
    pub async fn shutdown(&self) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::Shutdown { reply }).await
    }
}

/// The internal room actor state. Runs inside a Tokio task.
struct RoomActor<S: RoomStore> {
    slug: RoomSlug,
    config: RoomConfig,
    secret: Option<String>,
    game: Game,
    roster: Roster,
    countdown: Countdown,
    pacer: Pacer,
    rng: StdRng,
    /// Set when resolution failed internally; cleared by `RestartRound`.
    halted: Option<String>,
    fail_next_step: bool,
    /// Round record to delete on the next persist.
    stale_round: Option<u32>,
    store: Arc<S>,
    receiver: mpsc::Receiver<RoomCommand>,
}

impl<S: RoomStore> RoomActor<S> {
    /// Runs the actor loop until shutdown or until every handle is gone.
    async fn run(mut self) {
        tracing::info!(room = %self.slug, "room actor started");
        self.persist().await;

        loop {
            tokio::select! {
                cmd = self.receiver.recv() => {
                    let Some(cmd) = cmd else {
                        self.teardown();
                        break;
                    };
                    if self.handle(cmd).await {
                        break;
                    }
                }
                tick = self.countdown.wait_for_tick() => self.on_countdown(tick).await,
                () = self.pacer.wait() => self.on_pace().await,
            }
        }

        tracing::info!(room = %self.slug, "room actor stopped");
    }

    /// Applies one command. Returns `true` when the actor should stop.
    async fn handle(&mut self, cmd: RoomCommand) -> bool {
        match cmd {
            RoomCommand::Join { request, reply } => {
                let result = self.handle_join(request);
                self.commit_if(result.is_ok()).await;
                let _ = reply.send(result);
            }
            RoomCommand::Leave { player_id, reply } => {
                let result = self.handle_leave(player_id);
                self.commit_if(result.is_ok()).await;
                let _ = reply.send(result);
            }
            RoomCommand::Disconnect {
                player_id,
                connection,
                reply,
            } => {
                let applied = self.roster.detach(player_id, Some(connection));
                if applied {
                    tracing::info!(room = %self.slug, player = %player_id, %connection, "player disconnected");
                } else {
                    tracing::debug!(room = %self.slug, player = %player_id, %connection, "stale disconnect ignored");
                }
                self.commit_if(applied).await;
                let _ = reply.send(applied);
            }
            RoomCommand::Kick { player_id, reply } => {
                let result = self.handle_kick(player_id);
                self.commit_if(result.is_ok()).await;
                let _ = reply.send(result);
            }
            RoomCommand::StartGame { player_id, reply } => {
                let result = self.handle_start(player_id);
                self.commit_if(result.is_ok()).await;
                let _ = reply.send(result);
            }
            RoomCommand::SubmitMove {
                player_id,
                card_id,
                reply,
            } => {
                let result = self.handle_submit(player_id, card_id);
                self.commit_if(result.is_ok()).await;
                let _ = reply.send(result);
            }
            RoomCommand::ChooseSlot {
                player_id,
                index,
                reply,
            } => {
                let result = self.handle_choose(player_id, index);
                // A halt mid-choice changed state too.
                self.commit_if(result.is_ok() || self.halted.is_some()).await;
                let _ = reply.send(result);
            }
            RoomCommand::RestartRound { player_id, reply } => {
                let result = self.handle_restart(player_id);
                self.commit_if(result.is_ok()).await;
                let _ = reply.send(result);
            }
            RoomCommand::Chat {
                player_id,
                text,
                reply,
            } => {
                // No state changes, so nothing to publish or persist.
                let _ = reply.send(self.handle_chat(player_id, text));
            }
            RoomCommand::FailNextStep { reply } => {
                self.fail_next_step = true;
                let _ = reply.send(());
            }
            RoomCommand::Hand { player_id, reply } => {
                let hand = self
                    .game
                    .player(player_id)
                    .map(|p| p.hand().to_vec())
                    .ok_or_else(|| RoomError::NotInRoom(player_id, self.slug.clone()));
                let _ = reply.send(hand);
            }
            RoomCommand::GetInfo { reply } => {
                let _ = reply.send(self.info());
            }
            RoomCommand::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
            RoomCommand::Shutdown { reply } => {
                tracing::info!(room = %self.slug, "room shutting down");
                self.teardown();
                let _ = reply.send(());
                return true;
            }
        }
        false
    }

    // -- Membership --------------------------------------------------------

    fn handle_join(&mut self, request: JoinRequest) -> Result<Attach, RoomError> {
        let JoinRequest {
            player_id,
            name,
            secret,
            connection,
            sender,
        } = request;

        if self.roster.contains(player_id) {
            self.roster.attach(player_id, &name, connection, sender);
            tracing::info!(room = %self.slug, player = %player_id, %connection, "player rejoined");
            return Ok(Attach::Rejoin);
        }
        if let Some(expected) = &self.secret {
            if secret.as_deref() != Some(expected.as_str()) {
                return Err(RoomError::WrongSecret(self.slug.clone()));
            }
        }
        if self.game.status() != GameStatus::Unstarted {
            return Err(RoomError::GameStarted(self.slug.clone()));
        }
        if self.roster.len() >= self.config.max_players {
            return Err(RoomError::RoomFull(self.slug.clone()));
        }

        self.game.seat(player_id, &name)?;
        let attach = self.roster.attach(player_id, &name, connection, sender);
        tracing::info!(
            room = %self.slug,
            player = %player_id,
            players = self.roster.len(),
            "player joined"
        );
        Ok(attach)
    }

    fn handle_leave(&mut self, player_id: PlayerId) -> Result<(), RoomError> {
        if !self.roster.contains(player_id) {
            return Err(RoomError::NotInRoom(player_id, self.slug.clone()));
        }
        if self.game.status().is_running() {
            // The seat stays so the game can go on when they come back.
            self.roster.detach(player_id, None);
            self.roster.hand_off_host(player_id);
            tracing::info!(room = %self.slug, player = %player_id, "player stepped away mid-game");
            return Ok(());
        }
        self.game.unseat(player_id)?;
        self.roster.remove(player_id);
        tracing::info!(
            room = %self.slug,
            player = %player_id,
            players = self.roster.len(),
            "player left"
        );
        Ok(())
    }

    fn handle_kick(&mut self, player_id: PlayerId) -> Result<(), RoomError> {
        if self.game.status().is_running() {
            return Err(RoomError::GameRunning(self.slug.clone()));
        }
        if !self.roster.contains(player_id) {
            return Err(RoomError::NotInRoom(player_id, self.slug.clone()));
        }
        self.game.unseat(player_id)?;
        self.roster.deliver(Recipient::Player(player_id), ServerPush::Closed);
        self.roster.remove(player_id);
        tracing::info!(room = %self.slug, player = %player_id, "player kicked");
        Ok(())
    }

    fn handle_chat(&self, player_id: PlayerId, text: String) -> Result<(), RoomError> {
        if !self.roster.contains(player_id) {
            return Err(RoomError::NotInRoom(player_id, self.slug.clone()));
        }
        tracing::debug!(room = %self.slug, player = %player_id, len = text.len(), "chat");
        self.roster
            .deliver(Recipient::All, ServerPush::Chat { player_id, text });
        Ok(())
    }

    // -- Game flow ---------------------------------------------------------

    fn handle_start(&mut self, player_id: PlayerId) -> Result<(), RoomError> {
        if !self.roster.contains(player_id) {
            return Err(RoomError::NotInRoom(player_id, self.slug.clone()));
        }
        if !self.roster.is_host(player_id) {
            return Err(RoomError::NotHost(player_id));
        }
        let previous_round = self.game.round();
        self.game.start(&mut self.rng)?;
        if previous_round > 0 {
            self.stale_round = Some(previous_round);
        }
        self.halted = None;
        self.pacer.cancel();
        self.roster.deliver(Recipient::All, ServerPush::GameStarted {
            round: self.game.round(),
        });
        self.countdown.restart();
        tracing::info!(
            room = %self.slug,
            players = self.game.players().len(),
            "game started"
        );
        Ok(())
    }

    fn handle_submit(&mut self, player_id: PlayerId, card_id: u32) -> Result<(), RoomError> {
        self.ensure_accepting()?;
        if !self.roster.contains(player_id) {
            return Err(RoomError::NotInRoom(player_id, self.slug.clone()));
        }
        if let Err(err) = self.game.play(player_id, card_id) {
            tracing::debug!(room = %self.slug, player = %player_id, error = %err, "move rejected");
            return Err(err.into());
        }
        if self.game.everyone_played() {
            self.countdown.cancel();
            self.pacer.arm();
            tracing::debug!(room = %self.slug, round = self.game.round(), "all cards in, resolving");
        }
        Ok(())
    }

    fn handle_choose(&mut self, player_id: PlayerId, index: usize) -> Result<(), RoomError> {
        self.ensure_accepting()?;
        match self.game.choose_slot(player_id, index) {
            Ok((placement, round_end)) => {
                self.countdown.cancel();
                self.after_placement(placement, round_end);
                Ok(())
            }
            Err(err) => {
                if err.kind() == ErrorKind::Internal {
                    self.halt(&err);
                } else {
                    tracing::debug!(room = %self.slug, player = %player_id, error = %err, "slot choice rejected");
                }
                Err(err.into())
            }
        }
    }

    fn handle_restart(&mut self, player_id: PlayerId) -> Result<(), RoomError> {
        if !self.roster.is_host(player_id) {
            return Err(RoomError::NotHost(player_id));
        }
        if self.halted.is_none() {
            return Err(RoomError::NotHalted);
        }
        let returned = self.game.rewind_round()?;
        self.halted = None;
        self.countdown.restart();
        tracing::info!(
            room = %self.slug,
            round = self.game.round(),
            returned = returned.len(),
            "round restarted by host"
        );
        Ok(())
    }

    /// Rejects moves while halted or while a play is queued.
    fn ensure_accepting(&self) -> Result<(), RoomError> {
        if let Some(reason) = &self.halted {
            return Err(RoomError::Halted(reason.clone()));
        }
        if self.pacer.is_armed() {
            return Err(RoomError::Busy);
        }
        Ok(())
    }

    /// Pushes a resolved play and moves the round along.
    fn after_placement(&mut self, placement: Placement, round_end: Option<RoundEnd>) {
        self.roster.deliver(Recipient::All, ServerPush::Placed {
            player_id: placement.player,
            penalty: placement.penalty(),
            card: placement.card,
            slot: placement.slot,
        });
        match round_end {
            None => self.pacer.arm(),
            Some(RoundEnd::Next { round }) => {
                self.stale_round = Some(round - 1);
                self.roster.deliver(Recipient::All, ServerPush::RoundStarted { round });
                self.countdown.restart();
                tracing::info!(room = %self.slug, round, "round started");
            }
            Some(RoundEnd::GameOver { standings }) => {
                self.countdown.cancel();
                tracing::info!(
                    room = %self.slug,
                    winner = ?standings.first().map(|s| s.player_id),
                    "game ended"
                );
                self.roster.deliver(Recipient::All, ServerPush::Winners { standings });
            }
        }
    }

    /// Stops pacing and the countdown. Committed penalties are kept; the
    /// host must restart the round.
    fn halt(&mut self, err: &GameError) {
        let reason = err.to_string();
        self.pacer.cancel();
        self.countdown.cancel();
        tracing::warn!(room = %self.slug, round = self.game.round(), %reason, "room halted");
        self.roster.deliver(Recipient::All, ServerPush::Halted {
            reason: reason.clone(),
        });
        self.halted = Some(reason);
    }

    // -- Timers ------------------------------------------------------------

    async fn on_pace(&mut self) {
        let step = if std::mem::take(&mut self.fail_next_step) {
            Err(GameError::Corrupted("injected resolution fault".into()))
        } else {
            self.game.resolve_next()
        };
        match step {
            Ok(Step::Placed {
                placement,
                round_end,
            }) => self.after_placement(placement, round_end),
            Ok(Step::AwaitingSlot { player, card }) => {
                tracing::debug!(
                    room = %self.slug,
                    player = %player,
                    card = card.rank,
                    "waiting for a slot choice"
                );
                self.countdown.restart();
            }
            // Nothing resolving should fail; whatever did is internal.
            Err(err) => self.halt(&err),
        }
        self.commit().await;
    }

    async fn on_countdown(&mut self, tick: CountdownTick) {
        self.roster.deliver(Recipient::All, ServerPush::Countdown {
            remaining: tick.remaining,
        });
        if !tick.expired || self.config.expiry == ExpiryPolicy::Advisory {
            return;
        }
        if self.halted.is_some() || self.pacer.is_armed() {
            return;
        }

        match self.game.status() {
            GameStatus::ChooseCard => {
                let played = self.game.auto_play();
                tracing::info!(room = %self.slug, auto_played = played.len(), "countdown expired");
                if self.game.everyone_played() {
                    self.pacer.arm();
                }
            }
            GameStatus::ChooseSlot => {
                let Some(chooser) = self.game.chooser() else {
                    return;
                };
                let slot = self.game.board().cheapest_slot();
                tracing::info!(room = %self.slug, player = %chooser, slot, "countdown expired, choosing slot");
                match self.game.choose_slot(chooser, slot) {
                    Ok((placement, round_end)) => self.after_placement(placement, round_end),
                    Err(err) => self.halt(&err),
                }
            }
            GameStatus::Unstarted | GameStatus::Ended => return,
        }
        self.commit().await;
    }

    fn teardown(&mut self) {
        self.pacer.cancel();
        self.countdown.cancel();
        self.roster.deliver(Recipient::All, ServerPush::Closed);
    }

    // -- Publishing --------------------------------------------------------

    async fn commit_if(&mut self, changed: bool) {
        if changed {
            self.commit().await;
        }
    }

    /// Pushes the full snapshot and writes it to the store.
    async fn commit(&mut self) {
        self.publish();
        self.persist().await;
    }

    fn publish(&self) {
        let waiting_on = self.game.waiting_on();
        self.roster.deliver(Recipient::All, ServerPush::Members {
            members: self.member_views(&waiting_on),
        });
        self.roster.deliver(Recipient::All, ServerPush::Board {
            slots: self.game.board().view(),
        });
        for player in self.game.players() {
            self.roster.deliver(
                Recipient::Player(player.id),
                ServerPush::Hand {
                    cards: player.hand().to_vec(),
                },
            );
        }
        self.roster.deliver(Recipient::All, ServerPush::WhoMustMove {
            players: waiting_on,
            choosing_slot: self.game.status() == GameStatus::ChooseSlot,
        });
    }

    /// Members in join order. During a slot choice only the chooser is
    /// flagged as having to move.
    fn member_views(&self, waiting_on: &[PlayerId]) -> Vec<MemberView> {
        self.roster
            .members()
            .iter()
            .filter_map(|member| {
                let player = self.game.player(member.player_id)?;
                let mut view =
                    player.view(self.roster.is_host(member.player_id), member.is_connected());
                view.must_move = waiting_on.contains(&member.player_id);
                Some(view)
            })
            .collect()
    }

    async fn persist(&mut self) {
        if let Some(round) = self.stale_round.take() {
            if let Err(err) = self.store.delete(&self.slug.round_key(round)).await {
                tracing::warn!(room = %self.slug, round, error = %err, "failed to discard round record");
            }
        }
        if let Err(err) = self.write_snapshot().await {
            tracing::warn!(room = %self.slug, error = %err, "failed to persist room snapshot");
        }
    }

    async fn write_snapshot(&self) -> Result<(), StoreError> {
        let waiting_on = self.game.waiting_on();
        let mut room = Fields::new();
        room.insert("maxPlayers".into(), encode("maxPlayers", &self.config.max_players)?);
        room.insert("currentPlayers".into(), encode("currentPlayers", &self.roster.len())?);
        room.insert("password".into(), encode("password", &self.secret)?);
        room.insert("users".into(), encode("users", &self.member_views(&waiting_on))?);
        room.insert("host".into(), encode("host", &self.roster.host())?);
        room.insert("status".into(), encode("status", &self.game.status())?);
        room.insert("currentRound".into(), encode("currentRound", &self.game.round())?);
        room.insert("board".into(), encode("board", &self.game.board().view())?);
        room.insert("playerHasToPlay".into(), encode("playerHasToPlay", &self.game.chooser())?);
        self.store.set(&self.slug.store_key(), room).await?;

        if self.game.round() > 0 {
            let mut round = Fields::new();
            round.insert("cards".into(), encode("cards", self.game.plays())?);
            self.store
                .set(&self.slug.round_key(self.game.round()), round)
                .await?;
        }
        Ok(())
    }

    // -- Queries -----------------------------------------------------------

    fn info(&self) -> RoomInfo {
        let idle_since = self.roster.idle_since();
        RoomInfo {
            slug: self.slug.clone(),
            status: self.game.status(),
            round: self.game.round(),
            player_count: self.roster.len(),
            max_players: self.config.max_players,
            connected_count: self.roster.connected_count(),
            has_secret: self.secret.is_some(),
            halted: self.halted.is_some(),
            idle_since,
            reap_at: idle_since.map(|since| since + self.config.empty_room_grace),
        }
    }

    fn snapshot(&self) -> RoomSnapshot {
        let waiting_on = self.game.waiting_on();
        RoomSnapshot {
            slug: self.slug.clone(),
            status: self.game.status(),
            round: self.game.round(),
            host: self.roster.host(),
            members: self.member_views(&waiting_on),
            board: self.game.board().view(),
            waiting_on,
            resolving: self.pacer.is_armed(),
            halted: self.halted.clone(),
            standings: self.game.standings().to_vec(),
            countdown: self
                .countdown
                .is_running()
                .then(|| self.countdown.remaining()),
        }
    }
}

/// What the manager decided about a new room.
pub(crate) struct RoomSeed {
    pub slug: RoomSlug,
    pub config: RoomConfig,
    pub secret: Option<String>,
    pub host: PlayerId,
    pub host_name: String,
}

/// Spawns a room actor with the host already seated and returns a handle.
pub(crate) fn spawn_room<S: RoomStore>(
    seed: RoomSeed,
    store: Arc<S>,
) -> Result<RoomHandle, RoomError> {
    let RoomSeed {
        slug,
        config,
        secret,
        host,
        host_name,
    } = seed;

    let mut game = Game::new(config.min_players)?;
    game.seat(host, &host_name)?;
    let rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let (tx, rx) = mpsc::channel(config.channel_size);

    let actor = RoomActor {
        slug: slug.clone(),
        countdown: Countdown::new(config.countdown()),
        pacer: Pacer::new(config.play_delay),
        roster: Roster::with_host(host, &host_name),
        config,
        secret,
        game,
        rng,
        halted: None,
        fail_next_step: false,
        stale_round: None,
        store,
        receiver: rx,
    };
    tokio::spawn(actor.run());

    Ok(RoomHandle { slug, sender: tx })
}
