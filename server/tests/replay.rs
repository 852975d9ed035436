//! End-to-end over real sockets: login, a timed-out match, replay into a
//! fresh match.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use tcr_server::{
    auth::UserStore,
    catalog::TroopCatalog,
    game::{session::MatchRules, types::Troop},
    matchmaking::Lobby,
    net::{self, connection::MAX_LINE_LEN},
    protocol,
};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines},
    net::{tcp::OwnedReadHalf, tcp::OwnedWriteHalf, TcpListener, TcpStream},
    time::timeout,
};

struct Client {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl Client {
    async fn connect(addr: SocketAddr) -> Client {
        let stream = TcpStream::connect(addr).await.expect("connect");
        let (rd, wr) = stream.into_split();
        let mut client = Client {
            lines: BufReader::new(rd).lines(),
            writer: wr,
        };
        client.expect(protocol::WELCOME).await;
        client
    }

    async fn send(&mut self, line: &str) {
        self.send_raw(format!("{line}\n").as_bytes()).await;
    }

    async fn send_raw(&mut self, bytes: &[u8]) {
        self.writer.write_all(bytes).await.expect("write");
    }

    /// Reads until a line containing `needle` shows up.
    async fn expect(&mut self, needle: &str) -> String {
        let wait = async {
            loop {
                match self.lines.next_line().await.expect("read") {
                    Some(line) if line.contains(needle) => return line,
                    Some(_) => continue,
                    None => panic!("connection closed while waiting for {needle:?}"),
                }
            }
        };
        timeout(Duration::from_secs(5), wait)
            .await
            .unwrap_or_else(|_| panic!("timed out waiting for {needle:?}"))
    }

    async fn login(&mut self, user: &str, password: &str) {
        self.send(&format!("{user}|{password}")).await;
        self.expect(protocol::LOGIN_OK).await;
    }
}

async fn spawn_server(rules: MatchRules) -> SocketAddr {
    let catalog = TroopCatalog::from_troops([Troop {
        name: "Pawn".into(),
        hp: 50,
        atk: 200,
        def: 100,
        mana: 3,
        exp: 5,
        special: String::new(),
    }]);
    let users = UserStore::from_pairs([("alice", "a"), ("bob", "b")]);
    let lobby = Arc::new(Lobby::new(Arc::new(catalog), rules));

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(net::serve(listener, lobby, Arc::new(users)));
    addr
}

#[tokio::test]
async fn bad_login_is_refused_and_closed() {
    let addr = spawn_server(MatchRules::default()).await;

    let mut malformed = Client::connect(addr).await;
    malformed.send("alice").await;
    malformed.expect("Invalid login format").await;
    assert_eq!(malformed.lines.next_line().await.expect("read"), None);

    let mut wrong = Client::connect(addr).await;
    wrong.send("alice|nope").await;
    wrong.expect(protocol::LOGIN_REJECTED).await;
    assert_eq!(wrong.lines.next_line().await.expect("read"), None);
}

#[tokio::test]
async fn replay_starts_a_fresh_match() {
    let addr = spawn_server(MatchRules {
        match_duration: Duration::from_millis(400),
        mana_interval: Duration::from_secs(30),
    })
    .await;

    let mut alice = Client::connect(addr).await;
    alice.login("alice", "a").await;
    alice.expect(protocol::WAITING).await;

    let mut bob = Client::connect(addr).await;
    bob.login("bob", "b").await;
    alice.expect("Match started: alice vs bob").await;
    bob.expect("Match started: alice vs bob").await;

    // Match one: bob cannot move first, alice spends mana and damages g1.
    bob.send("end").await;
    bob.expect(protocol::NOT_YOUR_TURN).await;
    alice.send("summon pawn").await;
    alice.expect("Mana left: 2").await;
    alice.send("attack g1").await;
    alice.expect("(900 HP left)").await;
    bob.expect("alice attacked your Guard Tower 1 with Pawn! (900 HP left)").await;

    // Timer: equal kings.
    alice.expect("It's a draw!").await;
    bob.expect("It's a draw!").await;
    alice.expect(protocol::REPLAY_PROMPT).await;
    bob.expect(protocol::REPLAY_PROMPT).await;

    // Anything but replay/quit re-prompts.
    alice.send("attack g1").await;
    alice.expect(protocol::MATCH_ALREADY_ENDED).await;
    alice.expect(protocol::REPLAY_PROMPT).await;

    alice.send("replay").await;
    alice.expect(protocol::WAITING).await;
    bob.send("replay").await;
    alice.expect("Match started: alice vs bob").await;
    bob.expect("Match started: alice vs bob").await;

    // Match two starts from scratch: mana back at 5, bob's g1 back at 1000.
    alice.send("summon pawn").await;
    alice.expect("Summoned Pawn! Mana left: 2").await;
    alice.send("attack g1").await;
    bob.expect("(900 HP left)").await;

    bob.expect(protocol::REPLAY_PROMPT).await;
    bob.send("quit").await;
    bob.expect(protocol::GOODBYE).await;
}

#[tokio::test]
async fn dropping_mid_match_hands_opponent_the_win() {
    let addr = spawn_server(MatchRules::default()).await;

    let mut alice = Client::connect(addr).await;
    alice.login("alice", "a").await;
    let mut bob = Client::connect(addr).await;
    bob.login("bob", "b").await;
    alice.expect("Match started").await;
    bob.expect("Match started").await;

    drop(bob);

    alice.expect("bob disconnected. You win by forfeit!").await;
    alice.expect(protocol::REPLAY_PROMPT).await;
}

#[tokio::test]
async fn non_utf8_input_is_answered_not_dropped() {
    let addr = spawn_server(MatchRules::default()).await;

    let mut alice = Client::connect(addr).await;
    alice.login("alice", "a").await;
    let mut bob = Client::connect(addr).await;
    bob.login("bob", "b").await;
    alice.expect("Match started").await;
    bob.expect("Match started").await;

    bob.send_raw(b"summon caf\xe9\n").await;
    bob.expect(protocol::NOT_YOUR_TURN).await;

    alice.send_raw(b"\xff\xfe\n").await;
    alice.expect("Invalid command").await;

    // Both connections are still in the match.
    alice.send("summon pawn").await;
    alice.expect("Summoned Pawn! Mana left: 2").await;
    alice.send("end").await;
    bob.expect("It's bob's turn.").await;
}

#[tokio::test]
async fn overlong_line_closes_the_connection() {
    let addr = spawn_server(MatchRules::default()).await;

    let mut client = Client::connect(addr).await;
    client.send_raw(&vec![b'a'; MAX_LINE_LEN * 4]).await;

    let closed = async {
        // EOF or a reset, depending on how much the server left unread.
        while let Ok(Some(_)) = client.lines.next_line().await {}
    };
    timeout(Duration::from_secs(5), closed)
        .await
        .expect("connection closed");
}
