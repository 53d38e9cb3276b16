//! # Find Me Game Server Library
//!
//! This library provides the authoritative server for the shared "find the
//! hidden tile" party game. A single process owns all game state in memory;
//! participants connect over persistent TCP channels, issue intents (join,
//! start, press a tile, leave), and receive state-synchronized broadcasts.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Session
//! The server holds the only copy of the session: who is playing, whose
//! turn it is, what has been revealed, and how wins are tallied. Clients
//! re-derive their entire display from the snapshot attached to every
//! outbound event, so they can never diverge from the server's view.
//!
//! ### Intent Validation
//! Every inbound intent is checked against the session's preconditions
//! before it mutates anything. Intents that arrive in the wrong state
//! (pressing out of turn, starting mid-round) are dropped silently — they
//! come from stale or buggy clients, not adversaries, and the next
//! broadcast resynchronizes them. The one user-visible rejection is a
//! failed join, where the participant has to act differently.
//!
//! ### Inactivity Recovery
//! A per-move deadline forcibly ends rounds whose current player has gone
//! quiet, and a short post-victory cooldown keeps the next round from
//! starting while clients finish their victory presentation. Both timers
//! deliver their firings through the same queue as participant intents.
//!
//! ## Architecture Design
//!
//! All state mutations happen on one task that consumes a single event
//! queue. The network layer (accept loop plus one reader and one writer
//! task per connection) only translates between framed TCP messages and
//! queue events; it never touches game state. This serialization removes
//! every race between presses, departures, and timer firings without any
//! locking.
//!
//! ## Module Organization
//!
//! - [`session`] — the session state machine: roster, waiting room, board,
//!   score ledger, turn/timer coordination, and broadcast assembly.
//! - [`clients`] — connection registry: outbound channels and the
//!   connection-to-name association used for turn ownership.
//! - [`timer`] — one-shot cancelable delayed events for the turn deadline
//!   and the post-victory cooldown.
//! - [`network`] — TCP accept loop, per-connection reader/writer tasks,
//!   and the typed decode step that drops malformed frames.

pub mod clients;
pub mod network;
pub mod session;
pub mod timer;
