//! Integration tests for rooms driven through the manager.
//!
//! Time-dependent tests run with paused time; `sleep` advances the clock
//! as soon as every task is idle, so pacing and countdowns fire exactly on
//! schedule.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bullpen_game::ErrorKind;
use bullpen_protocol::{ConnectionId, GameStatus, PlayerId, RoomSlug, ServerPush};
use bullpen_room::{
    Attach, ExpiryPolicy, JoinRequest, MemoryStore, NameGenerator, NewRoom, RoomConfig,
    RoomError, RoomManager, RoomSnapshot, RoomStore, WordNames,
};
use tokio::sync::mpsc;
use tokio::time::Instant;

// =========================================================================
// Helpers
// =========================================================================

type Manager = RoomManager<MemoryStore, WordNames>;
type Inbox = mpsc::UnboundedReceiver<ServerPush>;

fn pid(id: u64) -> PlayerId {
    PlayerId(id)
}

fn config() -> RoomConfig {
    RoomConfig {
        seed: Some(7),
        ..RoomConfig::default()
    }
}

fn manager_with(config: RoomConfig) -> Manager {
    RoomManager::new(Arc::new(MemoryStore::new()), WordNames::seeded(1), config).unwrap()
}

fn manager() -> Manager {
    manager_with(config())
}

fn join_request(id: u64, connection: u64) -> (JoinRequest, Inbox) {
    let (tx, rx) = mpsc::unbounded_channel();
    let request = JoinRequest {
        player_id: pid(id),
        name: format!("player-{id}"),
        secret: None,
        connection: ConnectionId::new(connection),
        sender: tx,
    };
    (request, rx)
}

/// Creates a room hosted by player 1 and connects players `1..=count`.
async fn room_with(manager: &mut Manager, count: u64) -> (RoomSlug, Vec<Inbox>) {
    let slug = manager
        .create_room(NewRoom::hosted_by(pid(1), "player-1"))
        .await
        .unwrap();
    let mut inboxes = Vec::new();
    for id in 1..=count {
        let (request, rx) = join_request(id, id * 10);
        manager.join(&slug, request).await.unwrap();
        inboxes.push(rx);
    }
    (slug, inboxes)
}

fn drain(inbox: &mut Inbox) -> Vec<ServerPush> {
    let mut pushes = Vec::new();
    while let Ok(push) = inbox.try_recv() {
        pushes.push(push);
    }
    pushes
}

fn board_size(snapshot: &RoomSnapshot) -> usize {
    snapshot.board.iter().map(Vec::len).sum()
}

/// Every waiting player submits their first card.
async fn submit_all(manager: &Manager, slug: &RoomSlug) {
    let snapshot = manager.snapshot(slug).await.unwrap();
    for player in snapshot.waiting_on {
        let hand = manager.hand(slug, player).await.unwrap();
        manager.submit_move(slug, player, hand[0].id).await.unwrap();
    }
}

/// Plays first cards and slot 0 until the game ends.
async fn drive_to_end(manager: &Manager, slug: &RoomSlug) -> RoomSnapshot {
    for _ in 0..2_000 {
        let snapshot = manager.snapshot(slug).await.unwrap();
        match snapshot.status {
            GameStatus::Ended => return snapshot,
            GameStatus::ChooseSlot => {
                manager
                    .choose_slot(slug, snapshot.waiting_on[0], 0)
                    .await
                    .unwrap();
            }
            GameStatus::ChooseCard if !snapshot.resolving => submit_all(manager, slug).await,
            _ => {}
        }
        tokio::time::sleep(Duration::from_millis(250)).await;
    }
    panic!("game did not finish");
}

struct ScriptedNames(Mutex<VecDeque<&'static str>>);

impl ScriptedNames {
    fn new(names: &[&'static str]) -> Self {
        Self(Mutex::new(names.iter().copied().collect()))
    }
}

impl NameGenerator for ScriptedNames {
    fn next_name(&self) -> String {
        self.0
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or("last-resort-name")
            .to_string()
    }
}

// =========================================================================
// Creation and naming
// =========================================================================

#[tokio::test]
async fn test_create_room_seats_host_without_connection() {
    let mut manager = manager();
    let slug = manager
        .create_room(NewRoom::hosted_by(pid(1), "ada"))
        .await
        .unwrap();

    let info = manager.room_info(&slug).await.unwrap();
    assert_eq!(info.player_count, 1);
    assert_eq!(info.connected_count, 0);
    assert_eq!(info.status, GameStatus::Unstarted);
    assert_eq!(info.max_players, 10);

    let snapshot = manager.snapshot(&slug).await.unwrap();
    assert_eq!(snapshot.host, Some(pid(1)));
    assert_eq!(snapshot.slug.as_str().split('-').count(), 3);

    let stored = manager.store().get(&slug.store_key()).await.unwrap().unwrap();
    assert_eq!(stored["currentPlayers"], "1");
    assert_eq!(stored["status"], "\"UNSTARTED\"");
}

#[tokio::test]
async fn test_slug_collision_retries() {
    let store = Arc::new(MemoryStore::new());
    store
        .set("room:taken-in-store", Default::default())
        .await
        .unwrap();
    let names = ScriptedNames::new(&["calm-jade-otter", "calm-jade-otter", "taken-in-store", "shy-teal-lynx"]);
    let mut manager = RoomManager::new(store, names, config()).unwrap();

    let first = manager
        .create_room(NewRoom::hosted_by(pid(1), "ada"))
        .await
        .unwrap();
    let second = manager
        .create_room(NewRoom::hosted_by(pid(2), "bob"))
        .await
        .unwrap();
    assert_eq!(first.as_str(), "calm-jade-otter");
    assert_eq!(second.as_str(), "shy-teal-lynx");
}

#[tokio::test]
async fn test_slug_exhaustion_is_conflict() {
    let mut manager =
        RoomManager::new(Arc::new(MemoryStore::new()), ScriptedNames::new(&[]), config()).unwrap();
    manager
        .create_room(NewRoom::hosted_by(pid(1), "ada"))
        .await
        .unwrap();
    let err = manager
        .create_room(NewRoom::hosted_by(pid(2), "bob"))
        .await
        .unwrap_err();
    assert!(matches!(err, RoomError::NameExhausted(_)));
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[tokio::test]
async fn test_invalid_room_config_rejected() {
    let mut manager = manager();
    let bad = RoomConfig {
        max_players: 12,
        ..config()
    };
    let err = manager
        .create_room(NewRoom::hosted_by(pid(1), "ada").with_config(bad))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidConfiguration);
    assert_eq!(manager.room_count(), 0);
}

// =========================================================================
// Membership
// =========================================================================

#[tokio::test]
async fn test_join_publishes_snapshot_and_hand() {
    let mut manager = manager();
    let (_slug, mut inboxes) = room_with(&mut manager, 2).await;

    let pushes = drain(&mut inboxes[1]);
    assert!(pushes.iter().any(|p| matches!(p, ServerPush::Members { members } if members.len() == 2)));
    assert!(pushes.iter().any(|p| matches!(p, ServerPush::Board { .. })));
    assert!(pushes.iter().any(|p| matches!(p, ServerPush::Hand { cards } if cards.is_empty())));
    assert!(pushes.iter().any(|p| matches!(p, ServerPush::WhoMustMove { .. })));
}

#[tokio::test]
async fn test_full_room_rejects_new_player_but_accepts_rejoin() {
    let mut manager = manager_with(RoomConfig {
        max_players: 2,
        ..config()
    });
    let (slug, _inboxes) = room_with(&mut manager, 2).await;

    let (stranger, _rx) = join_request(3, 30);
    let err = manager.join(&slug, stranger).await.unwrap_err();
    assert!(matches!(err, RoomError::RoomFull(_)));
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let (rejoin, _rx) = join_request(2, 21);
    assert_eq!(manager.join(&slug, rejoin).await.unwrap(), Attach::Rejoin);
    let info = manager.room_info(&slug).await.unwrap();
    assert_eq!(info.player_count, 2);
    assert_eq!(info.connected_count, 2);
}

#[tokio::test]
async fn test_secret_checked_on_first_join_only() {
    let mut manager = manager();
    let slug = manager
        .create_room(NewRoom::hosted_by(pid(1), "ada").with_secret("hunter2"))
        .await
        .unwrap();

    let (host, _rx1) = join_request(1, 10);
    assert_eq!(manager.join(&slug, host).await.unwrap(), Attach::Rejoin);

    let (wrong, _rx2) = join_request(2, 20);
    let err = manager.join(&slug, wrong).await.unwrap_err();
    assert!(matches!(err, RoomError::WrongSecret(_)));
    assert_eq!(err.kind(), ErrorKind::IllegalMove);

    let (mut right, _rx3) = join_request(2, 21);
    right.secret = Some("hunter2".into());
    assert_eq!(manager.join(&slug, right).await.unwrap(), Attach::New);
    assert!(manager.room_info(&slug).await.unwrap().has_secret);
}

#[tokio::test]
async fn test_new_player_cannot_join_started_game() {
    let mut manager = manager();
    let (slug, _inboxes) = room_with(&mut manager, 2).await;
    manager.start_game(&slug, pid(1)).await.unwrap();

    let (late, _rx) = join_request(3, 30);
    let err = manager.join(&slug, late).await.unwrap_err();
    assert!(matches!(err, RoomError::GameStarted(_)));
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[tokio::test]
async fn test_leave_before_start_removes_and_transfers_host() {
    let mut manager = manager();
    let (slug, _inboxes) = room_with(&mut manager, 3).await;

    manager.leave(&slug, pid(1)).await.unwrap();
    let snapshot = manager.snapshot(&slug).await.unwrap();
    assert_eq!(snapshot.members.len(), 2);
    assert_eq!(snapshot.host, Some(pid(2)));
    assert!(snapshot.members[0].is_host);

    let err = manager.leave(&slug, pid(1)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_leave_mid_game_keeps_seat() {
    let mut manager = manager();
    let (slug, _inboxes) = room_with(&mut manager, 2).await;
    manager.start_game(&slug, pid(1)).await.unwrap();

    manager.leave(&slug, pid(2)).await.unwrap();
    let info = manager.room_info(&slug).await.unwrap();
    assert_eq!(info.player_count, 2);
    assert_eq!(info.connected_count, 1);

    let (back, _rx) = join_request(2, 22);
    assert_eq!(manager.join(&slug, back).await.unwrap(), Attach::Rejoin);
    assert_eq!(manager.hand(&slug, pid(2)).await.unwrap().len(), 10);
}

#[tokio::test]
async fn test_stale_disconnect_ignored() {
    let mut manager = manager();
    let (slug, _inboxes) = room_with(&mut manager, 2).await;
    let (rejoin, _rx) = join_request(2, 21);
    manager.join(&slug, rejoin).await.unwrap();

    assert!(!manager.disconnect(&slug, pid(2), ConnectionId::new(20)).await.unwrap());
    assert_eq!(manager.room_info(&slug).await.unwrap().connected_count, 2);
    assert!(manager.disconnect(&slug, pid(2), ConnectionId::new(21)).await.unwrap());
    assert_eq!(manager.room_info(&slug).await.unwrap().connected_count, 1);
}

#[tokio::test]
async fn test_kick_only_while_no_game_runs() {
    let mut manager = manager();
    let (slug, mut inboxes) = room_with(&mut manager, 3).await;

    manager.kick(&slug, pid(3)).await.unwrap();
    assert!(drain(&mut inboxes[2]).contains(&ServerPush::Closed));
    assert_eq!(manager.room_info(&slug).await.unwrap().player_count, 2);

    let err = manager.kick(&slug, pid(3)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    manager.start_game(&slug, pid(1)).await.unwrap();
    let err = manager.kick(&slug, pid(2)).await.unwrap_err();
    assert!(matches!(err, RoomError::GameRunning(_)));
}

#[tokio::test]
async fn test_chat_reaches_every_member() {
    let mut manager = manager();
    let (slug, mut inboxes) = room_with(&mut manager, 2).await;
    for inbox in &mut inboxes {
        drain(inbox);
    }

    manager
        .chat(&slug, pid(2), "good luck".to_string())
        .await
        .unwrap();
    let expected = ServerPush::Chat {
        player_id: pid(2),
        text: "good luck".to_string(),
    };
    for inbox in &mut inboxes {
        assert_eq!(drain(inbox), vec![expected.clone()]);
    }

    let err = manager
        .chat(&slug, pid(9), "hello?".to_string())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(drain(&mut inboxes[0]).is_empty());
}

// =========================================================================
// Game flow
// =========================================================================

#[tokio::test]
async fn test_non_host_start_rejected() {
    let mut manager = manager();
    let (slug, _inboxes) = room_with(&mut manager, 2).await;

    let err = manager.start_game(&slug, pid(2)).await.unwrap_err();
    assert!(matches!(err, RoomError::NotHost(_)));
    assert_eq!(err.kind(), ErrorKind::IllegalMove);
    assert_eq!(
        manager.room_info(&slug).await.unwrap().status,
        GameStatus::Unstarted
    );
}

#[tokio::test]
async fn test_start_deals_and_announces() {
    let mut manager = manager();
    let (slug, mut inboxes) = room_with(&mut manager, 2).await;
    drain(&mut inboxes[0]);

    manager.start_game(&slug, pid(1)).await.unwrap();
    let snapshot = manager.snapshot(&slug).await.unwrap();
    assert_eq!(snapshot.status, GameStatus::ChooseCard);
    assert_eq!(snapshot.round, 1);
    assert_eq!(board_size(&snapshot), 4);
    assert_eq!(snapshot.waiting_on, vec![pid(1), pid(2)]);
    assert_eq!(snapshot.countdown, Some(30));

    let pushes = drain(&mut inboxes[0]);
    assert!(pushes.contains(&ServerPush::GameStarted { round: 1 }));
    assert!(pushes.iter().any(|p| matches!(p, ServerPush::Hand { cards } if cards.len() == 10)));
}

#[tokio::test]
async fn test_start_needs_min_players() {
    let mut manager = manager();
    let (slug, _inboxes) = room_with(&mut manager, 1).await;
    let err = manager.start_game(&slug, pid(1)).await.unwrap_err();
    assert!(matches!(err, RoomError::Game(_)));
    assert_eq!(err.kind(), ErrorKind::InvalidConfiguration);
}

#[tokio::test]
async fn test_second_move_rejected_to_sender_only() {
    let mut manager = manager();
    let (slug, _inboxes) = room_with(&mut manager, 3).await;
    manager.start_game(&slug, pid(1)).await.unwrap();

    let hand = manager.hand(&slug, pid(1)).await.unwrap();
    manager.submit_move(&slug, pid(1), hand[0].id).await.unwrap();
    let err = manager
        .submit_move(&slug, pid(1), hand[1].id)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IllegalMove);
    assert_eq!(manager.hand(&slug, pid(1)).await.unwrap().len(), 9);
}

#[tokio::test(start_paused = true)]
async fn test_resolution_is_paced_and_rejects_moves_in_flight() {
    let mut manager = manager();
    let (slug, mut inboxes) = room_with(&mut manager, 2).await;
    manager.start_game(&slug, pid(1)).await.unwrap();
    submit_all(&manager, &slug).await;
    drain(&mut inboxes[0]);

    let snapshot = manager.snapshot(&slug).await.unwrap();
    assert!(snapshot.resolving);
    assert!(snapshot.waiting_on.is_empty());
    assert_eq!(snapshot.countdown, None, "countdown cancelled once everyone moved");

    let hand = manager.hand(&slug, pid(2)).await.unwrap();
    let err = manager
        .submit_move(&slug, pid(2), hand[0].id)
        .await
        .unwrap_err();
    assert!(matches!(err, RoomError::Busy));

    // Nothing resolves before the first delay elapses.
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(board_size(&manager.snapshot(&slug).await.unwrap()), 4);

    tokio::time::sleep(Duration::from_millis(600)).await;
    let snapshot = manager.snapshot(&slug).await.unwrap();
    let pushes = drain(&mut inboxes[0]);
    match snapshot.status {
        GameStatus::ChooseSlot => {
            assert_eq!(snapshot.waiting_on.len(), 1);
            assert!(pushes.iter().any(|p| matches!(
                p,
                ServerPush::WhoMustMove { choosing_slot: true, .. }
            )));
        }
        _ => {
            let placed = pushes
                .iter()
                .filter(|p| matches!(p, ServerPush::Placed { .. }))
                .count();
            assert_eq!(placed, 1, "one play per delay");
        }
    }
}

#[tokio::test(start_paused = true)]
async fn test_full_game_reaches_winners() {
    let mut manager = manager();
    let (slug, mut inboxes) = room_with(&mut manager, 3).await;
    manager.start_game(&slug, pid(1)).await.unwrap();

    let snapshot = drive_to_end(&manager, &slug).await;
    assert_eq!(snapshot.round, 10);
    assert_eq!(snapshot.standings.len(), 3);
    assert!(
        snapshot
            .standings
            .windows(2)
            .all(|w| w[0].penalty <= w[1].penalty)
    );
    for member in &snapshot.members {
        let standing = snapshot
            .standings
            .iter()
            .find(|s| s.player_id == member.player_id)
            .unwrap();
        assert_eq!(standing.penalty, member.penalty);
    }

    let pushes = drain(&mut inboxes[2]);
    let winners = pushes
        .iter()
        .filter(|p| matches!(p, ServerPush::Winners { .. }))
        .count();
    assert_eq!(winners, 1);
    assert!(pushes.contains(&ServerPush::RoundStarted { round: 10 }));

    // Only the last round's record is left behind.
    let prefix = format!("{}:", slug.store_key());
    let keys = manager.store().list_keys(&prefix).await.unwrap();
    assert_eq!(keys.into_iter().collect::<Vec<_>>(), vec![slug.round_key(10)]);

    // Rematch from ENDED.
    manager.start_game(&slug, pid(1)).await.unwrap();
    let snapshot = manager.snapshot(&slug).await.unwrap();
    assert_eq!(snapshot.round, 1);
    assert!(snapshot.members.iter().all(|m| m.penalty == 0));
    let keys = manager.store().list_keys(&prefix).await.unwrap();
    assert_eq!(keys.into_iter().collect::<Vec<_>>(), vec![slug.round_key(1)]);
}

#[tokio::test(start_paused = true)]
async fn test_advisory_countdown_only_counts() {
    let mut manager = manager_with(RoomConfig {
        countdown_secs: 3,
        ..config()
    });
    let (slug, mut inboxes) = room_with(&mut manager, 2).await;
    manager.start_game(&slug, pid(1)).await.unwrap();
    drain(&mut inboxes[0]);

    tokio::time::sleep(Duration::from_secs(5)).await;
    let pushes = drain(&mut inboxes[0]);
    let remaining: Vec<u32> = pushes
        .iter()
        .filter_map(|p| match p {
            ServerPush::Countdown { remaining } => Some(*remaining),
            _ => None,
        })
        .collect();
    assert_eq!(remaining, vec![2, 1, 0]);

    let snapshot = manager.snapshot(&slug).await.unwrap();
    assert_eq!(snapshot.waiting_on.len(), 2, "advisory expiry forces nothing");
}

#[tokio::test(start_paused = true)]
async fn test_autoplay_countdown_plays_for_slow_players() {
    let mut manager = manager_with(RoomConfig {
        countdown_secs: 3,
        expiry: ExpiryPolicy::AutoPlay,
        ..config()
    });
    let (slug, _inboxes) = room_with(&mut manager, 2).await;
    manager.start_game(&slug, pid(1)).await.unwrap();

    let hand = manager.hand(&slug, pid(1)).await.unwrap();
    manager.submit_move(&slug, pid(1), hand[0].id).await.unwrap();
    let lowest = manager
        .hand(&slug, pid(2))
        .await
        .unwrap()
        .iter()
        .map(|c| c.rank)
        .min()
        .unwrap();

    tokio::time::sleep(Duration::from_millis(3_500)).await;
    let snapshot = manager.snapshot(&slug).await.unwrap();
    assert!(snapshot.waiting_on.is_empty());
    assert!(snapshot.resolving);
    let hand = manager.hand(&slug, pid(2)).await.unwrap();
    assert_eq!(hand.len(), 9);
    assert!(hand.iter().all(|c| c.rank != lowest));
}

#[tokio::test]
async fn test_restart_round_requires_halt() {
    let mut manager = manager();
    let (slug, _inboxes) = room_with(&mut manager, 2).await;
    manager.start_game(&slug, pid(1)).await.unwrap();

    let err = manager.restart_round(&slug, pid(2)).await.unwrap_err();
    assert!(matches!(err, RoomError::NotHost(_)));
    let err = manager.restart_round(&slug, pid(1)).await.unwrap_err();
    assert!(matches!(err, RoomError::NotHalted));
}

#[tokio::test(start_paused = true)]
async fn test_halt_freezes_room_until_host_restarts_round() {
    let mut manager = manager();
    let (slug, mut inboxes) = room_with(&mut manager, 2).await;
    manager.start_game(&slug, pid(1)).await.unwrap();
    manager.room(&slug).unwrap().fail_next_step().await.unwrap();
    submit_all(&manager, &slug).await;
    drain(&mut inboxes[1]);

    tokio::time::sleep(Duration::from_millis(1_100)).await;
    let pushes = drain(&mut inboxes[1]);
    assert!(
        pushes
            .iter()
            .any(|p| matches!(p, ServerPush::Halted { .. }))
    );
    assert!(
        !pushes
            .iter()
            .any(|p| matches!(p, ServerPush::Placed { .. }))
    );

    let snapshot = manager.snapshot(&slug).await.unwrap();
    assert!(snapshot.halted.is_some());
    assert!(!snapshot.resolving);
    assert_eq!(snapshot.countdown, None);
    assert_eq!(board_size(&snapshot), 4);

    // Frozen: no moves, no slot choices, and no timers running.
    let hand = manager.hand(&slug, pid(1)).await.unwrap();
    let err = manager.submit_move(&slug, pid(1), hand[0].id).await.unwrap_err();
    assert!(matches!(err, RoomError::Halted(_)));
    let err = manager.choose_slot(&slug, pid(1), 0).await.unwrap_err();
    assert!(matches!(err, RoomError::Halted(_)));
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert!(drain(&mut inboxes[1]).is_empty());

    let err = manager.restart_round(&slug, pid(2)).await.unwrap_err();
    assert!(matches!(err, RoomError::NotHost(_)));
    manager.restart_round(&slug, pid(1)).await.unwrap();

    let snapshot = manager.snapshot(&slug).await.unwrap();
    assert_eq!(snapshot.status, GameStatus::ChooseCard);
    assert_eq!(snapshot.round, 1);
    assert!(snapshot.halted.is_none());
    assert!(snapshot.countdown.is_some());
    let mut waiting = snapshot.waiting_on.clone();
    waiting.sort();
    assert_eq!(waiting, vec![pid(1), pid(2)]);
    for id in [1, 2] {
        assert_eq!(manager.hand(&slug, pid(id)).await.unwrap().len(), 10);
    }

    // Play resumes and resolves normally.
    submit_all(&manager, &slug).await;
    tokio::time::sleep(Duration::from_millis(1_100)).await;
    assert!(
        drain(&mut inboxes[1])
            .iter()
            .any(|p| matches!(p, ServerPush::Placed { .. }))
    );
}

// =========================================================================
// Persistence
// =========================================================================

#[tokio::test]
async fn test_snapshot_persisted_after_moves() {
    let mut manager = manager();
    let (slug, _inboxes) = room_with(&mut manager, 2).await;
    manager.start_game(&slug, pid(1)).await.unwrap();
    let hand = manager.hand(&slug, pid(2)).await.unwrap();
    manager.submit_move(&slug, pid(2), hand[0].id).await.unwrap();

    let store = manager.store();
    let room = store.get(&slug.store_key()).await.unwrap().unwrap();
    assert_eq!(room["status"], "\"CHOOSE_CARD\"");
    assert_eq!(room["currentRound"], "1");
    assert_eq!(room["maxPlayers"], "10");
    assert_eq!(room["host"], "1");
    assert_eq!(room["playerHasToPlay"], "null");
    let users: serde_json::Value = serde_json::from_str(&room["users"]).unwrap();
    assert_eq!(users.as_array().unwrap().len(), 2);

    let round = store.get(&slug.round_key(1)).await.unwrap().unwrap();
    let cards: serde_json::Value = serde_json::from_str(&round["cards"]).unwrap();
    assert_eq!(cards.as_array().unwrap().len(), 1);
    assert_eq!(cards[0]["card"]["id"], hand[0].id);
}

#[tokio::test]
async fn test_store_failure_never_fails_the_move() {
    let mut manager = manager();
    let (slug, _inboxes) = room_with(&mut manager, 2).await;
    manager.store().set_failing(true);

    manager.start_game(&slug, pid(1)).await.unwrap();
    let hand = manager.hand(&slug, pid(1)).await.unwrap();
    manager.submit_move(&slug, pid(1), hand[0].id).await.unwrap();

    manager.store().set_failing(false);
    let room = manager.store().get(&slug.store_key()).await.unwrap().unwrap();
    assert_eq!(room["status"], "\"UNSTARTED\"", "last good write survives");
}

// =========================================================================
// Teardown and reaping
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_close_room_cancels_resolution_and_purges_store() {
    let mut manager = manager();
    let (slug, mut inboxes) = room_with(&mut manager, 2).await;
    manager.start_game(&slug, pid(1)).await.unwrap();
    submit_all(&manager, &slug).await;
    let handle = manager.room(&slug).unwrap().clone();
    drain(&mut inboxes[0]);

    manager.close_room(&slug).await.unwrap();
    assert_eq!(drain(&mut inboxes[0]), vec![ServerPush::Closed]);

    // The queued play never resolves.
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(drain(&mut inboxes[0]).is_empty());

    assert!(matches!(
        handle.get_info().await,
        Err(RoomError::Unavailable(_))
    ));
    assert!(matches!(
        manager.room_info(&slug).await,
        Err(RoomError::NotFound(_))
    ));
    assert!(!manager.store().exists(&slug.store_key()).await.unwrap());
    assert!(
        manager
            .store()
            .list_keys(&slug.store_key())
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test(start_paused = true)]
async fn test_reap_idle_closes_only_empty_rooms_past_grace() {
    let mut manager = manager();
    let empty = manager
        .create_room(NewRoom::hosted_by(pid(1), "ada"))
        .await
        .unwrap();
    let (busy, _inboxes) = room_with(&mut manager, 2).await;

    assert!(manager.reap_idle(Instant::now()).await.is_empty());

    tokio::time::sleep(Duration::from_secs(61)).await;
    let reaped = manager.reap_idle(Instant::now()).await;
    assert_eq!(reaped, vec![empty.clone()]);
    assert_eq!(manager.room_slugs(), vec![busy.clone()]);

    manager.disconnect(&busy, pid(1), ConnectionId::new(10)).await.unwrap();
    manager.disconnect(&busy, pid(2), ConnectionId::new(20)).await.unwrap();
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert!(manager.reap_idle(Instant::now()).await.is_empty());
    tokio::time::sleep(Duration::from_secs(31)).await;
    assert_eq!(manager.reap_idle(Instant::now()).await, vec![busy]);
    assert_eq!(manager.room_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_room_everyone_left_is_reaped() {
    let mut manager = manager();
    let (left, _inboxes) = room_with(&mut manager, 2).await;
    manager.leave(&left, pid(2)).await.unwrap();
    manager.leave(&left, pid(1)).await.unwrap();
    assert_eq!(manager.room_info(&left).await.unwrap().player_count, 0);

    let (kicked, _inboxes) = room_with(&mut manager, 1).await;
    manager.kick(&kicked, pid(1)).await.unwrap();

    assert!(manager.reap_idle(Instant::now()).await.is_empty());
    tokio::time::sleep(Duration::from_secs(61)).await;
    let mut reaped = manager.reap_idle(Instant::now()).await;
    reaped.sort();
    let mut expected = vec![left, kicked];
    expected.sort();
    assert_eq!(reaped, expected);
    assert_eq!(manager.room_count(), 0);
}

#[tokio::test]
async fn test_list_rooms_sorted() {
    let mut manager = manager();
    for id in 1..=3 {
        manager
            .create_room(NewRoom::hosted_by(pid(id), "host"))
            .await
            .unwrap();
    }
    let rooms = manager.list_rooms().await;
    assert_eq!(rooms.len(), 3);
    assert!(rooms.windows(2).all(|w| w[0].slug < w[1].slug));
}
