//! Authoritative session state machine for the tile-hunt game
//!
//! One `Session` owns the roster, the board, the score ledger, and both
//! timers. Every participant intent, connection event, and timer firing is
//! delivered as a [`SessionEvent`] through a single queue and handled to
//! completion before the next one, so the state is never observed half
//! updated. Precondition-violating intents are dropped silently (logged at
//! debug); the only user-visible rejection is a failed join.

use crate::clients::{ClientRegistry, ConnId};
use crate::timer::EventTimer;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::{
    Board, ClientEvent, GameSnapshot, ServerEvent, Tile, TileState, GAME_SPACER_TIMEOUT_SECS,
    GAME_START_FLASH_TIMEOUT_SECS, GRID_SIZE, MAX_NAME_LEN, PRESS_TIMEOUT_SECS,
};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;

/// Everything the session reacts to, in one queue: participant intents,
/// connection lifecycle, and timer firings.
#[derive(Debug)]
pub enum SessionEvent {
    Connected {
        conn: ConnId,
        sender: mpsc::UnboundedSender<ServerEvent>,
    },
    Intent {
        conn: ConnId,
        event: ClientEvent,
    },
    Disconnected {
        conn: ConnId,
    },
    TurnTimeout,
    CooldownOver,
}

/// Gameplay timings. Fixed in production (see the constants in `shared`);
/// the constructor takes them so tests can run against short deadlines.
#[derive(Debug, Clone, Copy)]
pub struct Timings {
    /// Per-move deadline.
    pub turn: Duration,
    /// Extra time on the first move, covering the client start animation
    /// during which presses are not yet accepted.
    pub start_grace: Duration,
    /// Post-victory window during which no new round may start.
    pub cooldown: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            turn: Duration::from_secs(PRESS_TIMEOUT_SECS),
            start_grace: Duration::from_secs(GAME_START_FLASH_TIMEOUT_SECS),
            cooldown: Duration::from_secs(GAME_SPACER_TIMEOUT_SECS),
        }
    }
}

pub struct Session {
    registry: ClientRegistry,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
    timings: Timings,

    /// Active participants; insertion order is turn order.
    roster: Vec<String>,
    /// Joined mid-round, folded into the roster when the round ends.
    waiting: Vec<String>,
    board: Board,
    in_progress: bool,
    can_start_new_game: bool,
    current_turn: Option<usize>,
    /// The hidden coordinate. Assigned exactly while a round is in progress.
    winning_tile: Option<Tile>,
    /// Last revealed winning coordinate, shown to clients until a new round
    /// resets the board.
    revealed_tile: Option<Tile>,
    wins: HashMap<String, u32>,

    turn_timer: EventTimer,
    cooldown_timer: EventTimer,
    rng: StdRng,
}

impl Session {
    pub fn new(events_tx: mpsc::UnboundedSender<SessionEvent>) -> Self {
        Self::with_options(events_tx, Timings::default(), None)
    }

    /// Full constructor: custom timings and an optional fixed RNG seed for
    /// reproducible turn order and tile placement.
    pub fn with_options(
        events_tx: mpsc::UnboundedSender<SessionEvent>,
        timings: Timings,
        seed: Option<u64>,
    ) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            registry: ClientRegistry::new(),
            events_tx,
            timings,
            roster: Vec::new(),
            waiting: Vec::new(),
            board: Board::new(),
            in_progress: false,
            can_start_new_game: true,
            current_turn: None,
            winning_tile: None,
            revealed_tile: None,
            wins: HashMap::new(),
            turn_timer: EventTimer::new(),
            cooldown_timer: EventTimer::new(),
            rng,
        }
    }

    /// Consumes events until the queue closes. The session task created from
    /// this is the only place the state is ever mutated.
    pub async fn run(mut self, mut events_rx: mpsc::UnboundedReceiver<SessionEvent>) {
        while let Some(event) = events_rx.recv().await {
            self.handle_event(event);
        }
    }

    pub fn handle_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Connected { conn, sender } => self.handle_connected(conn, sender),
            SessionEvent::Intent { conn, event } => {
                debug!("Received {:?} from connection {}", event, conn);
                match event {
                    ClientEvent::Join { name } => self.handle_join(conn, name),
                    ClientEvent::Start => self.handle_start(conn),
                    ClientEvent::Press { x, y } => self.handle_press(conn, x, y),
                    ClientEvent::Exit => self.handle_leave(conn),
                }
            }
            SessionEvent::Disconnected { conn } => self.handle_disconnected(conn),
            SessionEvent::TurnTimeout => self.handle_turn_timeout(),
            SessionEvent::CooldownOver => self.handle_cooldown_over(),
        }
    }

    fn handle_connected(&mut self, conn: ConnId, sender: mpsc::UnboundedSender<ServerEvent>) {
        self.registry.register(conn, sender);
        // Greet the newcomer with who is present and whether a round runs.
        self.registry.send_to(
            conn,
            ServerEvent::ConnectResult {
                state: self.snapshot(),
            },
        );
    }

    fn handle_join(&mut self, conn: ConnId, raw_name: String) {
        if self.registry.name_of(conn).is_some() {
            debug!("join: connection {} already joined", conn);
            return;
        }

        let name = sanitize_name(&raw_name);
        if name.is_empty() {
            debug!("join: empty name after sanitizing");
            self.send_join_failure(conn, "Name cannot be empty");
            return;
        }
        if self.roster.contains(&name) || self.waiting.contains(&name) {
            debug!("join: name {} already taken", name);
            self.send_join_failure(conn, "That name is already taken");
            return;
        }

        let waiting = self.in_progress;
        if waiting {
            self.waiting.push(name.clone());
        } else {
            self.roster.push(name.clone());
        }
        self.registry.associate_name(conn, name.clone());
        info!(
            "{} joined{}",
            name,
            if waiting { " the waiting room" } else { "" }
        );

        self.registry.send_to(
            conn,
            ServerEvent::JoinResult {
                success: true,
                message: None,
                name: Some(name),
                waiting,
                state: self.snapshot(),
            },
        );
        let update = ServerEvent::PlayerListUpdate {
            state: self.snapshot(),
        };
        self.registry.broadcast(&update);
    }

    fn send_join_failure(&self, conn: ConnId, reason: &str) {
        self.registry.send_to(
            conn,
            ServerEvent::JoinResult {
                success: false,
                message: Some(reason.to_string()),
                name: None,
                waiting: false,
                state: self.snapshot(),
            },
        );
    }

    fn handle_start(&mut self, conn: ConnId) {
        if self.registry.name_of(conn).is_none() {
            debug!("start: connection {} has not joined", conn);
            return;
        }
        if self.in_progress {
            debug!("start: round already in progress");
            return;
        }
        if !self.can_start_new_game {
            debug!("start: starting disabled during cooldown");
            return;
        }
        if self.roster.is_empty() {
            debug!("start: no players");
            return;
        }

        self.board = Board::new();
        self.revealed_tile = None;
        self.current_turn = Some(self.rng.gen_range(0..self.roster.len()));
        self.winning_tile = Some(Tile {
            x: self.rng.gen_range(0..GRID_SIZE),
            y: self.rng.gen_range(0..GRID_SIZE),
        });
        self.in_progress = true;
        info!("Round started with {} players", self.roster.len());

        let event = ServerEvent::GameStart {
            state: self.snapshot(),
        };
        self.registry.broadcast(&event);
        // The first press window includes the start animation clients play,
        // during which presses are not yet accepted.
        self.arm_turn_timer(self.timings.turn + self.timings.start_grace);
    }

    fn handle_press(&mut self, conn: ConnId, x: usize, y: usize) {
        if !self.in_progress {
            debug!("press: no round in progress");
            return;
        }
        let Some(turn) = self.current_turn else {
            return;
        };
        if self.registry.name_of(conn) != Some(self.roster[turn].as_str()) {
            debug!("press: received out of turn from connection {}", conn);
            return;
        }
        if !Board::in_bounds(x, y) {
            debug!("press: coordinates ({}, {}) off the board", x, y);
            return;
        }
        if self.board.state(x, y) != TileState::Unpressed {
            debug!("press: tile ({}, {}) already pressed", x, y);
            return;
        }

        if self.winning_tile == Some(Tile { x, y }) {
            self.finish_with_victory();
            return;
        }

        self.board.set(x, y, TileState::Pressed);
        if self.board.unpressed_count() == 1 {
            // Only the hidden tile is left, so whoever is next trivially
            // finds it: the round ends in their favor.
            self.advance_turn();
            self.finish_with_victory();
            return;
        }

        self.advance_turn();
        let event = ServerEvent::TilePress {
            state: self.snapshot(),
        };
        self.registry.broadcast(&event);
        self.arm_turn_timer(self.timings.turn);
    }

    /// Credits the round to the participant currently on turn, reveals the
    /// hidden tile, opens the cooldown window, and resets for the next round.
    fn finish_with_victory(&mut self) {
        let (Some(turn), Some(tile)) = (self.current_turn, self.winning_tile) else {
            return;
        };
        let winner = self.roster[turn].clone();
        info!(
            "{} found the hidden tile at ({}, {})",
            winner, tile.x, tile.y
        );

        self.board.set(tile.x, tile.y, TileState::Winning);
        self.revealed_tile = Some(tile);
        *self.wins.entry(winner).or_insert(0) += 1;

        // Hold new rounds back briefly so clients can finish the victory
        // presentation.
        self.can_start_new_game = false;
        self.cooldown_timer.arm(
            self.events_tx.clone(),
            self.timings.cooldown,
            SessionEvent::CooldownOver,
        );

        let event = ServerEvent::Victory {
            state: self.snapshot(),
        };
        self.registry.broadcast(&event);

        self.end_round();
        let update = ServerEvent::PlayerListUpdate {
            state: self.snapshot(),
        };
        self.registry.broadcast(&update);
    }

    fn handle_turn_timeout(&mut self) {
        if !self.in_progress {
            debug!("turn timeout fired after the round ended");
            return;
        }
        let name = match self.current_turn {
            Some(turn) => self.roster[turn].clone(),
            None => return,
        };
        info!("{} ran out of time", name);

        self.end_round();
        let event = ServerEvent::GameReset {
            message: format!("{name} took too long!"),
            state: self.snapshot(),
        };
        self.registry.broadcast(&event);
    }

    fn handle_cooldown_over(&mut self) {
        self.can_start_new_game = true;
        let update = ServerEvent::PlayerListUpdate {
            state: self.snapshot(),
        };
        self.registry.broadcast(&update);
    }

    fn handle_leave(&mut self, conn: ConnId) {
        let Some(name) = self.registry.clear_name(conn) else {
            debug!("exit: connection {} never joined", conn);
            return;
        };
        info!("{} left", name);

        let was_active = if let Some(pos) = self.roster.iter().position(|n| *n == name) {
            self.roster.remove(pos);
            true
        } else {
            self.waiting.retain(|n| *n != name);
            false
        };

        if self.roster.is_empty() {
            // Last participant gone; the scoreboard starts over next time.
            self.wins.clear();
        }

        if self.in_progress && was_active {
            self.end_round();
            let event = ServerEvent::GameReset {
                message: format!("{name} disconnected!"),
                state: self.snapshot(),
            };
            self.registry.broadcast(&event);
        } else {
            let update = ServerEvent::PlayerListUpdate {
                state: self.snapshot(),
            };
            self.registry.broadcast(&update);
        }
    }

    fn handle_disconnected(&mut self, conn: ConnId) {
        self.handle_leave(conn);
        self.registry.unregister(conn);
    }

    /// Ends the current round: stops the turn clock and promotes the waiting
    /// room into the roster, preserving join order.
    fn end_round(&mut self) {
        self.in_progress = false;
        self.current_turn = None;
        self.winning_tile = None;
        self.turn_timer.cancel();
        self.roster.append(&mut self.waiting);
    }

    fn advance_turn(&mut self) {
        if let Some(turn) = self.current_turn {
            if !self.roster.is_empty() {
                self.current_turn = Some((turn + 1) % self.roster.len());
            }
        }
    }

    fn arm_turn_timer(&mut self, delay: Duration) {
        self.turn_timer
            .arm(self.events_tx.clone(), delay, SessionEvent::TurnTimeout);
    }

    fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            in_progress: self.in_progress,
            can_start_new_game: self.can_start_new_game,
            players: self.roster.clone(),
            waiting: self.waiting.clone(),
            board: self.board.clone(),
            current_turn: self.current_turn,
            winning_tile: self.revealed_tile,
            wins: self.wins.clone(),
        }
    }
}

/// Normalizes a raw display name: trim, cap the length, uppercase. Names
/// collide case-insensitively because of the final uppercasing.
pub fn sanitize_name(raw: &str) -> String {
    raw.trim()
        .chars()
        .take(MAX_NAME_LEN)
        .collect::<String>()
        .to_uppercase()
}
