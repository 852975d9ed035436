//! Waiting queue that pairs authenticated connections into matches.
//
//  Pairing is strictly FIFO: the two oldest entries form a match, the
//  older one takes seat P1.

use std::{collections::VecDeque, sync::Arc};

use tokio::sync::{oneshot, Mutex};
use uuid::Uuid;

use crate::{
    catalog::TroopCatalog,
    game::session::{self, MatchRules, Outbox, Participant, SeatHandle},
    protocol,
};

/// Plain FIFO with pair extraction; the lobby wraps it in a lock.
#[derive(Debug)]
pub struct WaitingQueue<T> {
    entries: VecDeque<(Uuid, T)>,
}

impl<T> Default for WaitingQueue<T> {
    fn default() -> Self {
        WaitingQueue {
            entries: VecDeque::new(),
        }
    }
}

impl<T> WaitingQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `entry`; if two or more are waiting, removes and returns the
    /// two oldest in arrival order.
    pub fn push(&mut self, id: Uuid, entry: T) -> Option<(T, T)> {
        self.entries.push_back((id, entry));
        if self.entries.len() < 2 {
            return None;
        }
        let (_, first) = self.entries.pop_front()?;
        let (_, second) = self.entries.pop_front()?;
        Some((first, second))
    }

    /// Drops a waiting entry, e.g. when its connection closed before pairing.
    pub fn remove(&mut self, id: Uuid) -> Option<T> {
        let pos = self.entries.iter().position(|(eid, _)| *eid == id)?;
        self.entries.remove(pos).map(|(_, entry)| entry)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// What a connection leaves in the queue.
#[derive(Debug)]
struct Ticket {
    participant: Participant,
    assign: oneshot::Sender<SeatHandle>,
}

/// Returned to a connection that just joined the queue.
#[derive(Debug)]
pub struct Enqueued {
    pub id: Uuid,
    /// Resolves with the seat once an opponent arrives.
    pub assignment: oneshot::Receiver<SeatHandle>,
}

/// Matchmaking service: owns the queue plus what every new match needs.
pub struct Lobby {
    queue: Mutex<WaitingQueue<Ticket>>,
    catalog: Arc<TroopCatalog>,
    rules: MatchRules,
}

impl Lobby {
    pub fn new(catalog: Arc<TroopCatalog>, rules: MatchRules) -> Self {
        Lobby {
            queue: Mutex::new(WaitingQueue::new()),
            catalog,
            rules,
        }
    }

    /// Puts an authenticated player in line. Starts a match right away when
    /// this completes a pair.
    pub async fn enqueue(&self, username: String, outbox: Outbox) -> Enqueued {
        let id = Uuid::new_v4();
        let (assign, assignment) = oneshot::channel();
        let ticket = Ticket {
            participant: Participant {
                username: username.clone(),
                outbox: outbox.clone(),
            },
            assign,
        };

        let pair = self.queue.lock().await.push(id, ticket);
        match pair {
            Some((first, second)) => self.start_match(first, second).await,
            None => {
                log::info!("{username} is waiting for an opponent");
                let _ = outbox.send(protocol::WAITING.to_string());
            }
        }

        Enqueued { id, assignment }
    }

    /// Removes a still-waiting entry. `false` means it was already paired.
    pub async fn leave(&self, id: Uuid) -> bool {
        self.queue.lock().await.remove(id).is_some()
    }

    pub async fn waiting(&self) -> usize {
        self.queue.lock().await.len()
    }

    async fn start_match(&self, first: Ticket, second: Ticket) {
        let banner = protocol::match_banner(
            &first.participant.username,
            &second.participant.username,
        );
        let outboxes = [
            first.participant.outbox.clone(),
            second.participant.outbox.clone(),
        ];
        let session = session::start(
            first.participant,
            second.participant,
            self.catalog.clone(),
            self.rules,
        );

        // Seat both connections before announcing, so a fast client's first
        // command already reaches the session.
        let mut seated = true;
        for (assign, seat) in [(first.assign, session.p1), (second.assign, session.p2)] {
            // The connection went away between pairing and assignment.
            if let Err(seat) = assign.send(seat) {
                seat.disconnect().await;
                seated = false;
            }
        }
        if seated {
            for outbox in outboxes {
                let _ = outbox.send(banner.clone());
            }
        }
    }
}
