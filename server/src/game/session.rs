//! One async task per live match.
//!
//! The actor owns the [`Match`] and both outboxes; nothing else touches
//! them. Command loops, the two mana regenerators and the match timer only
//! talk to it through [`SessionEvent`]s. When the match ends the actor
//! flips the `over` watch so every task bound to the session winds down.

use std::{sync::Arc, time::Duration};

use thiserror::Error;
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
    time::{interval_at, sleep, Instant},
};
use uuid::Uuid;

use crate::{
    catalog::TroopCatalog,
    game::{
        logic::{Match, Outbound},
        types::Seat,
    },
};

/// Outbound line channel of one connection.
pub type Outbox = mpsc::UnboundedSender<String>;

/// Timing knobs for a match.
#[derive(Debug, Clone, Copy)]
pub struct MatchRules {
    pub match_duration: Duration,
    pub mana_interval: Duration,
}

impl Default for MatchRules {
    fn default() -> Self {
        MatchRules {
            match_duration: Duration::from_secs(60),
            mana_interval: Duration::from_secs(1),
        }
    }
}

/// A paired, authenticated player about to take a seat.
#[derive(Debug, Clone)]
pub struct Participant {
    pub username: String,
    pub outbox: Outbox,
}

#[derive(Debug)]
pub enum SessionEvent {
    Command { seat: Seat, line: String },
    ManaTick(Seat),
    TimerFired,
    Disconnected(Seat),
}

#[derive(Debug, Error)]
pub enum DispatchErr {
    #[error("session channel closed")]
    ChannelClosed,
}

/// A connection's view of the match it is seated in.
#[derive(Debug)]
pub struct SeatHandle {
    pub session_id: Uuid,
    pub seat: Seat,
    events: mpsc::Sender<SessionEvent>,
    over: watch::Receiver<bool>,
}

impl SeatHandle {
    /// Forwards one raw line to the session.
    pub async fn submit(&self, line: String) -> Result<(), DispatchErr> {
        self.events
            .send(SessionEvent::Command {
                seat: self.seat,
                line,
            })
            .await
            .map_err(|_| DispatchErr::ChannelClosed)
    }

    /// Reports that this seat's connection is gone.
    pub async fn disconnect(&self) {
        let _ = self
            .events
            .send(SessionEvent::Disconnected(self.seat))
            .await;
    }

    pub fn is_over(&self) -> bool {
        *self.over.borrow()
    }

    /// Resolves once the match is over (or the actor vanished).
    pub async fn ended(&mut self) {
        cancelled(&mut self.over).await;
    }
}

/// Handles returned by [`start`].
pub struct Session {
    pub id: Uuid,
    pub p1: SeatHandle,
    pub p2: SeatHandle,
    /// Yields the final match state once the actor stops.
    pub task: JoinHandle<Match>,
}

/// Creates a brand-new match for two paired players and spawns its actor,
/// both regenerators and the timer.
pub fn start(
    p1: Participant,
    p2: Participant,
    catalog: Arc<TroopCatalog>,
    rules: MatchRules,
) -> Session {
    let id = Uuid::new_v4();
    let (tx, rx) = mpsc::channel::<SessionEvent>(64);
    let (over_tx, over_rx) = watch::channel(false);

    log::info!("Match {id} started: {} vs {}", p1.username, p2.username);

    let game = Match::new(p1.username, p2.username);
    let outboxes = [p1.outbox, p2.outbox];

    for seat in Seat::BOTH {
        tokio::spawn(regenerate(
            seat,
            rules.mana_interval,
            tx.clone(),
            over_rx.clone(),
        ));
    }
    tokio::spawn(match_timer(rules.match_duration, tx.clone(), over_rx.clone()));

    let task = tokio::spawn(run(id, game, outboxes, catalog, rx, over_tx));

    let handle = |seat| SeatHandle {
        session_id: id,
        seat,
        events: tx.clone(),
        over: over_rx.clone(),
    };
    Session {
        id,
        p1: handle(Seat::P1),
        p2: handle(Seat::P2),
        task,
    }
}

async fn run(
    id: Uuid,
    mut game: Match,
    outboxes: [Outbox; 2],
    catalog: Arc<TroopCatalog>,
    mut rx: mpsc::Receiver<SessionEvent>,
    over: watch::Sender<bool>,
) -> Match {
    while let Some(event) = rx.recv().await {
        let out = match event {
            SessionEvent::Command { seat, line } => {
                let reply = game.process(seat, &line, &catalog);
                if !reply.handled {
                    log::debug!("Match {id}: unhandled line from {seat:?}: {line:?}");
                }
                reply.outbound
            }
            SessionEvent::ManaTick(seat) => game.regen_mana(seat).into_iter().collect(),
            SessionEvent::TimerFired => {
                log::info!("Match {id}: timer fired");
                game.time_up()
            }
            SessionEvent::Disconnected(seat) => {
                log::info!(
                    "Match {id}: {} disconnected",
                    game.player(seat).username
                );
                game.forfeit(seat)
            }
        };
        deliver(&outboxes, out);

        if let Some(outcome) = game.outcome() {
            let winner = outcome
                .winner()
                .map_or("nobody", |seat| game.player(seat).username.as_str());
            log::info!("Match {id} over ({outcome:?}), winner: {winner}");
            break;
        }
    }

    // Refuse new events, then answer commands that were already queued.
    rx.close();
    while let Ok(event) = rx.try_recv() {
        if let SessionEvent::Command { seat, line } = event {
            deliver(&outboxes, game.process(seat, &line, &catalog).outbound);
        }
    }

    over.send_replace(true);
    game
}

fn deliver(outboxes: &[Outbox; 2], out: Vec<Outbound>) {
    for Outbound { to, text } in out {
        // A closed outbox means that side already left.
        let _ = outboxes[to.index()].send(text);
    }
}

/// Per-player mana regenerator.
async fn regenerate(
    seat: Seat,
    period: Duration,
    events: mpsc::Sender<SessionEvent>,
    mut over: watch::Receiver<bool>,
) {
    let mut ticker = interval_at(Instant::now() + period, period);
    loop {
        tokio::select! {
            _ = cancelled(&mut over) => break,
            _ = ticker.tick() => {
                if events.send(SessionEvent::ManaTick(seat)).await.is_err() {
                    break;
                }
            }
        }
    }
}

/// One-shot match timer.
async fn match_timer(
    duration: Duration,
    events: mpsc::Sender<SessionEvent>,
    mut over: watch::Receiver<bool>,
) {
    tokio::select! {
        _ = cancelled(&mut over) => {}
        _ = sleep(duration) => {
            let _ = events.send(SessionEvent::TimerFired).await;
        }
    }
}

async fn cancelled(over: &mut watch::Receiver<bool>) {
    while !*over.borrow_and_update() {
        // Err means the actor dropped the sender, which also ends the match.
        if over.changed().await.is_err() {
            break;
        }
    }
}
