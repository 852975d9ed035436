//! Per-connection task: login, queueing, the in-match command loop and the
//! post-match replay/quit prompt.

use std::{sync::Arc, time::Duration};

use tokio::{
    io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader},
    net::{
        tcp::{OwnedReadHalf, OwnedWriteHalf},
        TcpStream,
    },
    sync::mpsc,
    time::timeout,
};

use crate::{
    auth::UserStore,
    game::session::{Outbox, SeatHandle},
    matchmaking::Lobby,
    protocol::{self, Login, ReplayChoice},
};

/// Longest accepted client line, newline excluded.
pub const MAX_LINE_LEN: usize = 1024;

/// Newline-framed reader with a length cap. Bytes are decoded lossily so a
/// malformed line still reaches the command parser.
struct LineReader {
    inner: BufReader<OwnedReadHalf>,
    // Survives a cancelled read inside `select!`.
    buf: Vec<u8>,
}

impl LineReader {
    fn new(rd: OwnedReadHalf) -> Self {
        LineReader {
            inner: BufReader::new(rd),
            buf: Vec::new(),
        }
    }

    /// `Ok(None)` on a clean EOF.
    async fn next_line(&mut self) -> std::io::Result<Option<String>> {
        let budget = (MAX_LINE_LEN + 1).saturating_sub(self.buf.len()) as u64;
        let n = (&mut self.inner)
            .take(budget)
            .read_until(b'\n', &mut self.buf)
            .await?;

        let terminated = self.buf.last() == Some(&b'\n');
        if !terminated && self.buf.len() > MAX_LINE_LEN {
            self.buf.clear();
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("line longer than {MAX_LINE_LEN} bytes"),
            ));
        }
        if n == 0 && self.buf.is_empty() {
            return Ok(None);
        }

        let line = String::from_utf8_lossy(&self.buf).into_owned();
        self.buf.clear();
        Ok(Some(line))
    }
}

/// How an in-match command loop ended.
enum Flow {
    MatchOver,
    Disconnected,
}

pub async fn handle_client(
    stream: TcpStream,
    lobby: Arc<Lobby>,
    users: Arc<UserStore>,
) -> anyhow::Result<()> {
    let peer = stream.peer_addr()?;
    let (rd, wr) = stream.into_split();
    let (outbox, rx) = mpsc::unbounded_channel::<String>();
    let writer = tokio::spawn(write_lines(wr, rx));
    let mut lines = LineReader::new(rd);

    let _ = outbox.send(protocol::WELCOME.to_string());
    let result = serve(&mut lines, &outbox, &lobby, &users).await;

    // Let the writer flush whatever is left, then close the socket.
    drop(outbox);
    if timeout(Duration::from_secs(5), writer).await.is_err() {
        log::warn!("writer for {peer} did not drain in time");
    }
    log::info!("Connection {peer} closed");
    result
}

async fn serve(
    lines: &mut LineReader,
    outbox: &Outbox,
    lobby: &Lobby,
    users: &UserStore,
) -> anyhow::Result<()> {
    let Some(username) = login(lines, outbox, users).await else {
        return Ok(());
    };

    loop {
        let Some(mut seat) = wait_for_match(lines, outbox, lobby, &username).await else {
            return Ok(());
        };
        log::debug!("{username} seated as {:?} in {}", seat.seat, seat.session_id);

        if let Flow::Disconnected = play(lines, outbox, &mut seat).await {
            return Ok(());
        }

        match replay_prompt(lines, outbox).await {
            Some(ReplayChoice::Replay) => {
                log::info!("{username} requested a replay");
            }
            Some(ReplayChoice::Quit) => {
                let _ = outbox.send(protocol::GOODBYE.to_string());
                return Ok(());
            }
            None => return Ok(()),
        }
    }
}

/// Handshake. `None` means the connection should be closed.
async fn login(lines: &mut LineReader, outbox: &Outbox, users: &UserStore) -> Option<String> {
    let line = read_line(lines).await?;
    let login = match line.parse::<Login>() {
        Ok(login) => login,
        Err(e) => {
            let _ = outbox.send(e.to_string());
            return None;
        }
    };

    if !users.check(&login.username, &login.password) {
        log::info!("Rejected login for {}", login.username);
        let _ = outbox.send(protocol::LOGIN_REJECTED.to_string());
        return None;
    }

    log::info!("User logged in: {}", login.username);
    let _ = outbox.send(protocol::LOGIN_OK.to_string());
    Some(login.username)
}

/// Joins the queue and blocks until seated. `None` if the client left first.
async fn wait_for_match(
    lines: &mut LineReader,
    outbox: &Outbox,
    lobby: &Lobby,
    username: &str,
) -> Option<SeatHandle> {
    let mut ticket = lobby.enqueue(username.to_string(), outbox.clone()).await;
    loop {
        tokio::select! {
            seat = &mut ticket.assignment => return seat.ok(),
            line = read_line(lines) => match line {
                Some(_) => {
                    let _ = outbox.send(protocol::WAITING.to_string());
                }
                None => {
                    if !lobby.leave(ticket.id).await {
                        // Already paired: the seat is on its way, give it up.
                        if let Ok(seat) = ticket.assignment.await {
                            seat.disconnect().await;
                        }
                    }
                    return None;
                }
            }
        }
    }
}

/// In-match loop: forwards every line to the session until it ends.
async fn play(lines: &mut LineReader, outbox: &Outbox, seat: &mut SeatHandle) -> Flow {
    if seat.is_over() {
        return Flow::MatchOver;
    }
    loop {
        tokio::select! {
            _ = seat.ended() => return Flow::MatchOver,
            line = read_line(lines) => match line {
                Some(line) => {
                    if seat.submit(line).await.is_err() {
                        let _ = outbox.send(protocol::MATCH_ALREADY_ENDED.to_string());
                        return Flow::MatchOver;
                    }
                }
                None => {
                    seat.disconnect().await;
                    return Flow::Disconnected;
                }
            }
        }
    }
}

/// Post-match prompt. Only `replay` and `quit` are accepted.
async fn replay_prompt(lines: &mut LineReader, outbox: &Outbox) -> Option<ReplayChoice> {
    let _ = outbox.send(protocol::REPLAY_PROMPT.to_string());
    loop {
        let line = read_line(lines).await?;
        if let Some(choice) = ReplayChoice::parse(&line) {
            return Some(choice);
        }
        let _ = outbox.send(protocol::MATCH_ALREADY_ENDED.to_string());
        let _ = outbox.send(protocol::REPLAY_PROMPT.to_string());
    }
}

/// Next line with surrounding whitespace trimmed; `None` on EOF or read error.
async fn read_line(lines: &mut LineReader) -> Option<String> {
    match lines.next_line().await {
        Ok(line) => line.map(|l| l.trim().to_string()),
        Err(e) => {
            log::warn!("read failed: {e}");
            None
        }
    }
}

async fn write_lines(mut wr: OwnedWriteHalf, mut rx: mpsc::UnboundedReceiver<String>) {
    while let Some(line) = rx.recv().await {
        let mut buf = line.into_bytes();
        buf.push(b'\n');
        if let Err(e) = wr.write_all(&buf).await {
            log::debug!("write failed: {e}");
            break;
        }
    }
    let _ = wr.shutdown().await;
}
