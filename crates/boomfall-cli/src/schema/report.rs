use boomfall_engine::{BoardConfig, BoardState, GameStats, SessionSeed};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Result of a `simulate` run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationReport {
    /// When the report was produced (ISO 8601)
    pub generated_at: DateTime<Utc>,
    /// Configuration shared by every session
    pub config: BoardConfig,
    pub sessions: Vec<SessionReport>,
}

/// Outcome of one simulated session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    /// Seed that reproduces the session, player included
    pub seed: SessionSeed,
    /// Phase the session was in when the simulation stopped
    pub final_state: BoardState,
    pub stats: GameStats,
    /// Blocks left on the board
    pub remaining_blocks: usize,
}
