//! Who is in a room and how to reach them.
//!
//! The roster mirrors the engine's seats in the same join order and adds
//! what the engine doesn't care about: the host role, each member's live
//! connection, and when the room last went quiet.
//!
//! ```text
//!   Connected ──(leave / disconnect)──→ Disconnected
//!       ↑                                    │
//!       └──────────────(join)────────────────┘
//! ```

use bullpen_protocol::{ConnectionId, PlayerId, Recipient, ServerPush};
use tokio::sync::mpsc;
use tokio::time::Instant;

/// Channel the room pushes a member's notifications into. The transport
/// owns the receiving end.
pub type PushSender = mpsc::UnboundedSender<ServerPush>;

/// A member's link to the transport.
#[derive(Debug, Clone)]
pub enum Presence {
    Connected {
        connection: ConnectionId,
        sender: PushSender,
    },
    /// Seat kept, nobody listening. `since` feeds idle-room reaping.
    Disconnected { since: Instant },
}

#[derive(Debug, Clone)]
pub struct Member {
    pub player_id: PlayerId,
    pub name: String,
    pub presence: Presence,
}

impl Member {
    pub fn is_connected(&self) -> bool {
        matches!(self.presence, Presence::Connected { .. })
    }
}

/// Whether [`Roster::attach`] created a member or replaced a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attach {
    New,
    Rejoin,
}

#[derive(Debug, Default)]
pub struct Roster {
    /// Join order.
    members: Vec<Member>,
    host: Option<PlayerId>,
    /// When the connected count last dropped to zero. Outlives the members
    /// themselves, so a room everyone left still ages.
    quiet_since: Option<Instant>,
}

impl Roster {
    /// A roster holding only the host, seated with no connection.
    pub fn with_host(player_id: PlayerId, name: &str) -> Self {
        Self {
            members: vec![Member {
                player_id,
                name: name.to_string(),
                presence: Presence::Disconnected {
                    since: Instant::now(),
                },
            }],
            host: Some(player_id),
            quiet_since: Some(Instant::now()),
        }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn host(&self) -> Option<PlayerId> {
        self.host
    }

    pub fn is_host(&self, player_id: PlayerId) -> bool {
        self.host == Some(player_id)
    }

    pub fn contains(&self, player_id: PlayerId) -> bool {
        self.get(player_id).is_some()
    }

    pub fn get(&self, player_id: PlayerId) -> Option<&Member> {
        self.members.iter().find(|m| m.player_id == player_id)
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn connected_count(&self) -> usize {
        self.members.iter().filter(|m| m.is_connected()).count()
    }

    /// When the last connected member went away, or `None` while anyone
    /// is connected.
    pub fn idle_since(&self) -> Option<Instant> {
        if self.connected_count() > 0 {
            return None;
        }
        self.members
            .iter()
            .filter_map(|m| match m.presence {
                Presence::Disconnected { since } => Some(since),
                Presence::Connected { .. } => None,
            })
            .chain(self.quiet_since)
            .max()
    }

    /// Starts the idle clock if nobody is connected any more.
    fn note_quiet(&mut self) {
        if self.connected_count() == 0 && self.quiet_since.is_none() {
            self.quiet_since = Some(Instant::now());
        }
    }

    /// Adds a member or points an existing one at a new connection. The
    /// first member of an empty roster becomes host.
    pub fn attach(
        &mut self,
        player_id: PlayerId,
        name: &str,
        connection: ConnectionId,
        sender: PushSender,
    ) -> Attach {
        let presence = Presence::Connected { connection, sender };
        self.quiet_since = None;
        if let Some(member) = self.members.iter_mut().find(|m| m.player_id == player_id) {
            member.presence = presence;
            return Attach::Rejoin;
        }
        self.members.push(Member {
            player_id,
            name: name.to_string(),
            presence,
        });
        if self.host.is_none() {
            self.host = Some(player_id);
        }
        Attach::New
    }

    /// Marks a member disconnected.
    ///
    /// With `connection` set, the notice only applies if it names the
    /// member's current connection; a stale notice from a replaced
    /// connection returns `false` and changes nothing.
    pub fn detach(&mut self, player_id: PlayerId, connection: Option<ConnectionId>) -> bool {
        let Some(member) = self.members.iter_mut().find(|m| m.player_id == player_id) else {
            return false;
        };
        let current = match &member.presence {
            Presence::Connected { connection, .. } => *connection,
            Presence::Disconnected { .. } => return false,
        };
        if connection.is_some_and(|notice| notice != current) {
            return false;
        }
        member.presence = Presence::Disconnected {
            since: Instant::now(),
        };
        self.note_quiet();
        true
    }

    /// Removes a member. If they held the host role it passes to the next
    /// member in join order.
    pub fn remove(&mut self, player_id: PlayerId) -> Option<Member> {
        let index = self.members.iter().position(|m| m.player_id == player_id)?;
        let member = self.members.remove(index);
        if self.host == Some(player_id) {
            self.host = self.members.first().map(|m| m.player_id);
            if let Some(next) = self.host {
                tracing::info!(from = %player_id, to = %next, "host role transferred");
            }
        }
        self.note_quiet();
        Some(member)
    }

    /// Passes the host role from `from` to the first other connected
    /// member, keeping every seat. No-op if `from` isn't host or nobody
    /// else is connected.
    pub fn hand_off_host(&mut self, from: PlayerId) -> Option<PlayerId> {
        if self.host != Some(from) {
            return None;
        }
        let next = self
            .members
            .iter()
            .find(|m| m.player_id != from && m.is_connected())?
            .player_id;
        self.host = Some(next);
        tracing::info!(from = %from, to = %next, "host role transferred");
        Some(next)
    }

    /// Delivers a push to whoever `recipient` names.
    pub fn deliver(&self, recipient: Recipient, push: ServerPush) {
        match recipient {
            Recipient::All => self.broadcast(&push),
            Recipient::Player(player_id) => self.send(player_id, push),
        }
    }

    /// Delivers to one member. Dropped silently if they aren't connected.
    pub fn send(&self, player_id: PlayerId, push: ServerPush) {
        if let Some(Member {
            presence: Presence::Connected { sender, .. },
            ..
        }) = self.get(player_id)
        {
            let _ = sender.send(push);
        }
    }

    /// Delivers to every connected member.
    pub fn broadcast(&self, push: &ServerPush) {
        for member in &self.members {
            if let Presence::Connected { sender, .. } = &member.presence {
                let _ = sender.send(push.clone());
            }
        }
    }
}
