//! Game flow on top of the board model.
//!
//! - [`BoardConfig`] - Board size, timing, scoring, difficulty, walls and the
//!   piece table
//! - [`WeightedPieceSelector`] - Adaptive weighted choice of the next piece
//! - [`WallBuilder`] - Row-by-row generation of wall bands
//! - [`GameStats`] - Totals folded from the event stream
//! - [`GameSession`] - The phase-driven state machine
//! - [`SessionSeed`] - Seed for reproducible sessions
//!
//! # Game Flow
//!
//! 1. A piece spawns at the top of the buffer and falls one row per fall
//!    interval while the player moves and rotates it
//! 2. Once it cannot fall further it locks; groups are reconciled and any boom
//!    block that landed against another group explodes frame by frame
//! 3. Loose groups settle under gravity, and are reconciled again after moving
//! 4. When the breakthrough zone is empty the level rises and a new wall band
//!    is built above the board
//! 5. Repeat until a piece cannot spawn

pub use self::{config::*, piece_selector::*, seed::*, session::*, stats::*, wall::*};

mod config;
mod piece_selector;
mod seed;
mod serde_duration;
mod session;
mod stats;
mod wall;
