//! Integration tests for the tile-hunt game server
//!
//! These tests drive a real server instance over TCP sockets and validate
//! the full path: framing, intent decoding, session state machine, and
//! broadcast delivery.

use server::network;
use server::session::{Session, Timings};
use shared::codec;
use shared::{ClientEvent, GameSnapshot, ServerEvent};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::timeout;

/// Spawns a complete in-process server (accept loop + session loop) on an
/// ephemeral port and returns its address.
async fn spawn_server(timings: Timings) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let session = Session::with_options(events_tx.clone(), timings, Some(42));
    tokio::spawn(network::serve(listener, events_tx));
    tokio::spawn(session.run(events_rx));

    addr
}

/// Long turn deadline so tests never hit it by accident, short cooldown so
/// tests that wait for it stay fast.
fn test_timings() -> Timings {
    Timings {
        turn: Duration::from_secs(30),
        start_grace: Duration::ZERO,
        cooldown: Duration::from_millis(100),
    }
}

struct TestClient {
    stream: TcpStream,
}

impl TestClient {
    async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.unwrap();
        Self { stream }
    }

    async fn send(&mut self, event: &ClientEvent) {
        let payload = bincode::serialize(event).unwrap();
        codec::write_frame(&mut self.stream, &payload).await.unwrap();
    }

    async fn recv(&mut self) -> ServerEvent {
        let payload = timeout(Duration::from_secs(2), codec::read_frame(&mut self.stream))
            .await
            .expect("timed out waiting for a server event")
            .unwrap();
        bincode::deserialize(&payload).unwrap()
    }

    /// Reads events, discarding everything until `pred` matches one.
    async fn recv_until<F: Fn(&ServerEvent) -> bool>(&mut self, pred: F) -> ServerEvent {
        loop {
            let event = self.recv().await;
            if pred(&event) {
                return event;
            }
        }
    }

    /// Connects the handshake and joins under `name`, returning the
    /// `JoinResult` fields.
    async fn join(&mut self, name: &str) -> (bool, Option<String>, bool, GameSnapshot) {
        self.recv_until(|e| matches!(e, ServerEvent::ConnectResult { .. }))
            .await;
        self.send(&ClientEvent::Join { name: name.into() }).await;
        match self
            .recv_until(|e| matches!(e, ServerEvent::JoinResult { .. }))
            .await
        {
            ServerEvent::JoinResult {
                success,
                name,
                waiting,
                state,
                ..
            } => (success, name, waiting, state),
            _ => unreachable!(),
        }
    }

    /// Presses the first unpressed tile of `state`.
    async fn press_first_unpressed(&mut self, state: &GameSnapshot) {
        let tile = state.board.unpressed_tiles()[0];
        self.send(&ClientEvent::Press {
            x: tile.x,
            y: tile.y,
        })
        .await;
    }
}

/// CONNECTION AND JOIN TESTS
mod join_tests {
    use super::*;

    /// A fresh connection is greeted with the current public state.
    #[tokio::test]
    async fn connect_receives_state_snapshot() {
        let addr = spawn_server(test_timings()).await;
        let mut client = TestClient::connect(addr).await;

        match client.recv().await {
            ServerEvent::ConnectResult { state } => {
                assert!(!state.in_progress);
                assert!(state.can_start_new_game);
                assert!(state.players.is_empty());
            }
            other => panic!("expected ConnectResult, got {other:?}"),
        }
    }

    /// Names collide case-insensitively across the whole session.
    #[tokio::test]
    async fn duplicate_join_is_refused() {
        let addr = spawn_server(test_timings()).await;

        let mut alice = TestClient::connect(addr).await;
        let (success, name, _, _) = alice.join("alice").await;
        assert!(success);
        assert_eq!(name.as_deref(), Some("ALICE"));

        let mut imposter = TestClient::connect(addr).await;
        let (success, _, _, state) = imposter.join("  Alice ").await;
        assert!(!success);
        assert_eq!(state.players, vec!["ALICE".to_string()]);
    }

    /// Joining mid-round lands in the waiting room, visible to everyone.
    #[tokio::test]
    async fn mid_round_join_waits_for_next_round() {
        let addr = spawn_server(test_timings()).await;

        let mut alice = TestClient::connect(addr).await;
        alice.join("alice").await;
        alice.send(&ClientEvent::Start).await;
        alice
            .recv_until(|e| matches!(e, ServerEvent::GameStart { .. }))
            .await;

        let mut bob = TestClient::connect(addr).await;
        let (success, _, waiting, state) = bob.join("bob").await;
        assert!(success);
        assert!(waiting);
        assert_eq!(state.players, vec!["ALICE".to_string()]);
        assert_eq!(state.waiting, vec!["BOB".to_string()]);
    }
}

/// ROUND LIFECYCLE TESTS
mod round_tests {
    use super::*;

    /// Two players alternate pressing tiles until one of them finds the
    /// hidden one; the ledger records exactly one win.
    #[tokio::test]
    async fn full_round_ends_in_victory() {
        let addr = spawn_server(test_timings()).await;

        let mut alice = TestClient::connect(addr).await;
        alice.join("alice").await;
        let mut bob = TestClient::connect(addr).await;
        bob.join("bob").await;

        alice.send(&ClientEvent::Start).await;
        let mut state = match alice
            .recv_until(|e| matches!(e, ServerEvent::GameStart { .. }))
            .await
        {
            ServerEvent::GameStart { state } => state,
            _ => unreachable!(),
        };
        assert!(state.in_progress);
        assert!(state.winning_tile.is_none());

        // Alternate presses, following the authoritative turn index, until
        // the round ends. 16 tiles bound the loop.
        let final_state = loop {
            let on_turn = state.players[state.current_turn.unwrap()].clone();
            if on_turn == "ALICE" {
                alice.press_first_unpressed(&state).await;
            } else {
                bob.press_first_unpressed(&state).await;
            }

            match alice
                .recv_until(|e| {
                    matches!(
                        e,
                        ServerEvent::TilePress { .. } | ServerEvent::Victory { .. }
                    )
                })
                .await
            {
                ServerEvent::TilePress { state: next } => state = next,
                ServerEvent::Victory { state: final_state } => break final_state,
                _ => unreachable!(),
            }
        };

        assert!(final_state.winning_tile.is_some());
        let total_wins: u32 = final_state.wins.values().sum();
        assert_eq!(total_wins, 1);

        // The post-victory update shows the round over with both players
        // still on the roster.
        let after = alice
            .recv_until(|e| matches!(e, ServerEvent::PlayerListUpdate { .. }))
            .await;
        assert!(!after.state().in_progress);
        assert_eq!(after.state().players.len(), 2);
    }

    /// The waiting room folds into the roster once the round ends, and the
    /// cooldown briefly blocks the next start.
    #[tokio::test]
    async fn waiting_room_and_cooldown_lifecycle() {
        let addr = spawn_server(test_timings()).await;

        let mut alice = TestClient::connect(addr).await;
        alice.join("alice").await;
        alice.send(&ClientEvent::Start).await;
        let mut state = match alice
            .recv_until(|e| matches!(e, ServerEvent::GameStart { .. }))
            .await
        {
            ServerEvent::GameStart { state } => state,
            _ => unreachable!(),
        };

        let mut bob = TestClient::connect(addr).await;
        bob.join("bob").await;

        // Alice plays the round out alone.
        loop {
            alice.press_first_unpressed(&state).await;
            match alice
                .recv_until(|e| {
                    matches!(
                        e,
                        ServerEvent::TilePress { .. } | ServerEvent::Victory { .. }
                    )
                })
                .await
            {
                ServerEvent::TilePress { state: next } => state = next,
                ServerEvent::Victory { .. } => break,
                _ => unreachable!(),
            }
        }

        // A start during the cooldown is ignored; once the cooldown window
        // passes the server announces starts are possible again.
        alice.send(&ClientEvent::Start).await;
        let reopened = alice
            .recv_until(|e| {
                matches!(e, ServerEvent::PlayerListUpdate { state } if state.can_start_new_game)
            })
            .await;
        // Bob moved from the waiting room into the roster at round end.
        assert_eq!(
            reopened.state().players,
            vec!["ALICE".to_string(), "BOB".to_string()]
        );
        assert!(!reopened.state().in_progress);

        alice.send(&ClientEvent::Start).await;
        let restarted = alice
            .recv_until(|e| matches!(e, ServerEvent::GameStart { .. }))
            .await;
        assert_eq!(restarted.state().players.len(), 2);
    }
}

/// FAILURE AND RECOVERY TESTS
mod recovery_tests {
    use super::*;

    /// Dropping an active player's connection mid-round resets the round
    /// and names the player.
    #[tokio::test]
    async fn disconnect_mid_round_resets_round() {
        let addr = spawn_server(test_timings()).await;

        let mut alice = TestClient::connect(addr).await;
        alice.join("alice").await;
        let mut bob = TestClient::connect(addr).await;
        bob.join("bob").await;

        alice.send(&ClientEvent::Start).await;
        alice
            .recv_until(|e| matches!(e, ServerEvent::GameStart { .. }))
            .await;

        drop(bob);

        match alice
            .recv_until(|e| matches!(e, ServerEvent::GameReset { .. }))
            .await
        {
            ServerEvent::GameReset { message, state } => {
                assert_eq!(message, "BOB disconnected!");
                assert!(!state.in_progress);
                assert_eq!(state.players, vec!["ALICE".to_string()]);
            }
            _ => unreachable!(),
        }
    }

    /// A player who never presses forfeits the round to the turn deadline.
    #[tokio::test]
    async fn turn_timeout_resets_round() {
        let timings = Timings {
            turn: Duration::from_millis(200),
            start_grace: Duration::ZERO,
            cooldown: Duration::from_millis(100),
        };
        let addr = spawn_server(timings).await;

        let mut alice = TestClient::connect(addr).await;
        alice.join("alice").await;
        alice.send(&ClientEvent::Start).await;
        alice
            .recv_until(|e| matches!(e, ServerEvent::GameStart { .. }))
            .await;

        match alice
            .recv_until(|e| matches!(e, ServerEvent::GameReset { .. }))
            .await
        {
            ServerEvent::GameReset { message, state } => {
                assert_eq!(message, "ALICE took too long!");
                assert!(!state.in_progress);
                assert_eq!(state.current_turn, None);
            }
            _ => unreachable!(),
        }
    }

    /// An explicit exit followed by the socket closing must not reset the
    /// session twice.
    #[tokio::test]
    async fn exit_then_disconnect_is_processed_once() {
        let addr = spawn_server(test_timings()).await;

        let mut alice = TestClient::connect(addr).await;
        alice.join("alice").await;
        let mut bob = TestClient::connect(addr).await;
        bob.join("bob").await;

        alice.send(&ClientEvent::Start).await;
        bob.recv_until(|e| matches!(e, ServerEvent::GameStart { .. }))
            .await;

        alice.send(&ClientEvent::Exit).await;
        drop(alice);

        match bob
            .recv_until(|e| matches!(e, ServerEvent::GameReset { .. }))
            .await
        {
            ServerEvent::GameReset { state, .. } => {
                assert_eq!(state.players, vec!["BOB".to_string()]);
            }
            _ => unreachable!(),
        }

        // Had the socket drop been processed as a second departure, the
        // next event on Bob's stream would be another GameReset. It is the
        // list update from Bob's own exit instead.
        bob.send(&ClientEvent::Exit).await;
        match bob.recv().await {
            ServerEvent::PlayerListUpdate { state } => {
                assert!(state.players.is_empty());
                assert!(state.wins.is_empty());
            }
            other => panic!("expected PlayerListUpdate, got {other:?}"),
        }
    }
}
