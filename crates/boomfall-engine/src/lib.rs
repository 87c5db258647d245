//! Simulation core for a falling-block puzzle with connected block groups and
//! chain-reaction "boom" blocks.
//!
//! - [`core`] holds the board data model: cell positions, blocks, the
//!   occupancy grid, block groups, the board itself and cascade computation.
//! - [`engine`] drives the board: configuration, the weighted piece selector,
//!   wall generation, statistics, events and the phase-driven [`GameSession`].
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//!
//! use boomfall_engine::{BoardConfig, GameSession, MoveDirection};
//!
//! let mut session = GameSession::new(BoardConfig::default()).unwrap();
//! session.subscribe(|event: &boomfall_engine::BoardEvent| {
//!     let _ = event.to_string();
//! });
//!
//! for _ in 0..200 {
//!     // Rejected moves are part of normal play.
//!     let _ = session.try_move(MoveDirection::Left);
//!     session.advance(Duration::from_millis(16));
//! }
//! assert!(session.stats().simulated_time() >= Duration::from_millis(3000));
//! ```

pub use self::{core::*, engine::*};

pub mod core;
pub mod engine;

/// Error returned by the write entry points of [`GameSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum InputError {
    /// The move or rotation would put a block outside the board or onto a
    /// cell owned by another group; nothing was changed.
    #[display("move rejected by collision")]
    Rejected,
    /// The request was issued in a phase that does not accept it.
    #[display("request not accepted while in {state}")]
    NotAccepting { state: BoardState },
}

/// Error returned when a piece cannot be placed at its spawn cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("spawn cells are blocked")]
pub struct SpawnBlockedError;

/// A movement or rotation was refused as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("group movement blocked")]
pub struct MoveRejected;
