//! Plays one game of Bullpen between bots on an in-process server.
//!
//! Every bot talks to its room through the same JSON gateway a network
//! transport would use, so a run exercises decoding, routing, pacing and
//! persistence end to end.
//!
//! ```text
//! RUST_LOG=bullpen_room=debug bullpen-sim --players 5 --seed 42
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use bullpen::prelude::*;
use clap::Parser;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(author, version, about = "Play a game of Bullpen between bots")]
struct Args {
    /// Number of bots at the table
    #[arg(short, long, default_value_t = 4)]
    players: usize,

    /// Seed for the deal and for the bots' choices
    #[arg(short, long)]
    seed: Option<u64>,

    /// Pause between two resolved plays, in milliseconds
    #[arg(long, default_value_t = 50)]
    play_delay_ms: u64,

    /// JSON file with room settings; flags override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Give up if the game hasn't ended after this many seconds
    #[arg(long, default_value_t = 300)]
    timeout_secs: u64,

    /// Print the final standings as JSON on stdout
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
struct Report {
    room: RoomSlug,
    rounds: u32,
    standings: Vec<Standing>,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "simulation failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), BullpenError> {
    let mut config = match &args.config {
        Some(path) => load_config(path).await?,
        None => RoomConfig::default(),
    };
    config.play_delay = Duration::from_millis(args.play_delay_ms);
    config.max_players = args.players.max(config.min_players);
    if args.seed.is_some() {
        config.seed = args.seed;
    }

    let server = BullpenServer::builder().room_config(config).build()?;
    let host = PlayerId(1);
    let slug = server
        .create_room(NewRoom::hosted_by(host, "bot-1"))
        .await?;
    let gateway = server.gateway();

    let mut bots = Vec::with_capacity(args.players);
    let mut host_link = None;
    for id in 1..=args.players as u64 {
        let (tx, rx) = mpsc::unbounded_channel();
        let origin = Origin::new(slug.clone(), PlayerId(id), ConnectionId::new(id));
        let join = ClientEvent::Join {
            name: format!("bot-{id}"),
            secret: None,
        };
        gateway
            .receive(&origin, &tx, &gateway.codec().encode(&join)?)
            .await?;
        if origin.player_id == host {
            host_link = Some((origin.clone(), tx.clone()));
        }
        let rng = match args.seed {
            Some(seed) => StdRng::seed_from_u64(seed ^ id),
            None => StdRng::from_os_rng(),
        };
        let bot = Bot {
            origin,
            gateway: gateway.clone(),
            sender: tx,
            inbox: rx,
            rng,
        };
        bots.push(tokio::spawn(bot.play()));
    }

    if let Some((origin, tx)) = &host_link {
        gateway.dispatch(origin, tx, ClientEvent::StartGame).await?;
    }

    let finished = tokio::time::timeout(Duration::from_secs(args.timeout_secs), async {
        let mut standings = None;
        for bot in bots {
            if let Ok(Some(result)) = bot.await {
                standings.get_or_insert(result);
            }
        }
        standings
    })
    .await;

    let rounds = server.rooms().lock().await.snapshot(&slug).await?.round;
    server.close_room(&slug).await?;
    server.shutdown().await;

    let standings = match finished {
        Ok(Some(standings)) => standings,
        Ok(None) => {
            tracing::warn!(room = %slug, "room closed before the game ended");
            return Ok(());
        }
        Err(_) => {
            tracing::warn!(room = %slug, timeout_secs = args.timeout_secs, "game did not finish in time");
            return Ok(());
        }
    };

    let report = Report {
        room: slug,
        rounds,
        standings,
    };
    if args.json {
        match serde_json::to_string_pretty(&report) {
            Ok(text) => println!("{text}"),
            Err(err) => tracing::error!(error = %err, "failed to encode report"),
        }
    } else {
        for standing in &report.standings {
            tracing::info!(
                position = standing.position,
                player = %standing.player_id,
                name = %standing.name,
                penalty = standing.penalty,
                "final standing"
            );
        }
    }
    Ok(())
}

async fn load_config(path: &Path) -> Result<RoomConfig, BullpenError> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| BullpenError::Io {
            path: path.display().to_string(),
            source,
        })?;
    serde_json::from_str(&text).map_err(|source| BullpenError::Config {
        path: path.display().to_string(),
        source,
    })
}

// ---------------------------------------------------------------------------
// Bot
// ---------------------------------------------------------------------------

struct Bot {
    origin: Origin,
    gateway: Gateway<MemoryStore, WordNames, JsonCodec>,
    sender: PushSender,
    inbox: mpsc::UnboundedReceiver<ServerPush>,
    rng: StdRng,
}

impl Bot {
    /// Reacts to pushes until the game ends. Returns the final standings,
    /// or `None` if the room closed first.
    async fn play(mut self) -> Option<Vec<Standing>> {
        let me = self.origin.player_id;
        let mut hand: Vec<Card> = Vec::new();
        let mut board: [Vec<Card>; SLOT_COUNT] = Default::default();
        let mut round = 0;
        // Pushes queued before our own move was committed are stale; these
        // keep us from answering them twice.
        let mut played_in = 0;
        let mut chose_in = 0;

        while let Some(push) = self.inbox.recv().await {
            match push {
                ServerPush::Hand { cards } => hand = cards,
                ServerPush::Board { slots } => board = slots,
                ServerPush::GameStarted { round: r } | ServerPush::RoundStarted { round: r } => {
                    round = r;
                }
                ServerPush::WhoMustMove {
                    players,
                    choosing_slot,
                } if players.contains(&me) => {
                    if choosing_slot && chose_in != round {
                        chose_in = round;
                        let index = cheapest_slot(&board);
                        if self.send(ClientEvent::ChooseSlot { index }).await.is_err() {
                            chose_in = 0;
                        }
                    } else if !choosing_slot && played_in != round {
                        let Some(card) = hand.choose(&mut self.rng) else {
                            continue;
                        };
                        played_in = round;
                        let event = ClientEvent::SubmitMove { card_id: card.id };
                        if self.send(event).await.is_err() {
                            played_in = 0;
                        }
                    }
                }
                ServerPush::Winners { standings } => return Some(standings),
                ServerPush::Closed => return None,
                _ => {}
            }
        }
        None
    }

    async fn send(&self, event: ClientEvent) -> Result<(), BullpenError> {
        let bytes = self.gateway.codec().encode(&event)?;
        self.gateway.receive(&self.origin, &self.sender, &bytes).await
    }
}

/// Lowest penalty sum, lowest index on ties.
fn cheapest_slot(board: &[Vec<Card>; SLOT_COUNT]) -> usize {
    board
        .iter()
        .enumerate()
        .min_by_key(|(index, slot)| (slot.iter().map(|c| c.penalty).sum::<u32>(), *index))
        .map_or(0, |(index, _)| index)
}
