use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::{BlockKind, BoardEvent};

use super::serde_duration;

/// Blocks destroyed so far, per kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestroyedCounter {
    pub plain: usize,
    pub wall: usize,
    pub boom: usize,
}

impl DestroyedCounter {
    #[must_use]
    pub const fn total(&self) -> usize {
        self.plain + self.wall + self.boom
    }
}

/// Running totals of a session, fed from its event stream.
///
/// - **Score**: points of destroyed blocks plus breakthrough awards
/// - **Level**: number of breakthroughs so far; drives difficulty
/// - **Pieces placed**: pieces locked onto the board
/// - **Destroyed**: destroyed blocks by kind
/// - **Cascades**: explosions played back, chained ones included
///
/// # Example
///
/// ```
/// use boomfall_engine::{BoardEvent, GameStats};
///
/// let mut stats = GameStats::new();
/// stats.record(&BoardEvent::Breakthrough { level: 1, points: 1000 });
///
/// assert_eq!(stats.score(), 1000);
/// assert_eq!(stats.level(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStats {
    score: u64,
    level: u32,
    pieces_placed: usize,
    breakthroughs: usize,
    cascades: usize,
    merges: usize,
    destroyed: DestroyedCounter,
    #[serde(with = "serde_duration")]
    simulated_time: Duration,
}

impl GameStats {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            score: 0,
            level: 0,
            pieces_placed: 0,
            breakthroughs: 0,
            cascades: 0,
            merges: 0,
            destroyed: DestroyedCounter {
                plain: 0,
                wall: 0,
                boom: 0,
            },
            simulated_time: Duration::ZERO,
        }
    }

    #[must_use]
    pub const fn score(&self) -> u64 {
        self.score
    }

    #[must_use]
    pub const fn level(&self) -> u32 {
        self.level
    }

    #[must_use]
    pub const fn pieces_placed(&self) -> usize {
        self.pieces_placed
    }

    #[must_use]
    pub const fn breakthroughs(&self) -> usize {
        self.breakthroughs
    }

    #[must_use]
    pub const fn cascades(&self) -> usize {
        self.cascades
    }

    /// Number of group merges performed by reconciliation passes.
    #[must_use]
    pub const fn merges(&self) -> usize {
        self.merges
    }

    #[must_use]
    pub const fn destroyed(&self) -> &DestroyedCounter {
        &self.destroyed
    }

    /// Total time passed to [`GameSession::advance`](super::GameSession::advance)
    /// before the game ended.
    #[must_use]
    pub const fn simulated_time(&self) -> Duration {
        self.simulated_time
    }

    /// Folds one event into the totals.
    pub fn record(&mut self, event: &BoardEvent) {
        match *event {
            BoardEvent::PieceLocked { .. } => self.pieces_placed += 1,
            BoardEvent::BlockDestroyed { kind, points, .. } => {
                self.score += points;
                match kind {
                    BlockKind::Plain => self.destroyed.plain += 1,
                    BlockKind::Wall { .. } => self.destroyed.wall += 1,
                    BlockKind::Boom(_) => self.destroyed.boom += 1,
                }
            }
            BoardEvent::GroupsMerged { .. } => self.merges += 1,
            BoardEvent::CascadeStarted { .. } => self.cascades += 1,
            BoardEvent::Breakthrough { level, points } => {
                self.score += points;
                self.level = level;
                self.breakthroughs += 1;
            }
            BoardEvent::PhaseChanged { .. }
            | BoardEvent::PieceSpawned { .. }
            | BoardEvent::BlockDamaged { .. }
            | BoardEvent::CascadeFrameResolved { .. }
            | BoardEvent::WallRowGenerated { .. }
            | BoardEvent::GameOver { .. } => {}
        }
    }

    pub(crate) fn add_time(&mut self, dt: Duration) {
        self.simulated_time = self.simulated_time.saturating_add(dt);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{BlockId, BoomPattern, Position};

    fn destroyed(kind: BlockKind, points: u64) -> BoardEvent {
        BoardEvent::BlockDestroyed {
            block: BlockId(0),
            position: Position::new(0, 0),
            kind,
            points,
        }
    }

    #[test]
    fn test_destroyed_blocks_score_by_kind() {
        let mut stats = GameStats::new();
        stats.record(&destroyed(BlockKind::Plain, 10));
        stats.record(&destroyed(BlockKind::Wall { crack_stage: 2 }, 25));
        stats.record(&destroyed(
            BlockKind::Boom(BoomPattern::Surround { radius: 1 }),
            5,
        ));
        assert_eq!(stats.score(), 40);
        assert_eq!(
            *stats.destroyed(),
            DestroyedCounter {
                plain: 1,
                wall: 1,
                boom: 1
            }
        );
        assert_eq!(stats.destroyed().total(), 3);
    }

    #[test]
    fn test_time_accumulates() {
        let mut stats = GameStats::default();
        stats.add_time(Duration::from_millis(16));
        stats.add_time(Duration::from_millis(16));
        assert_eq!(stats.simulated_time(), Duration::from_millis(32));
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["simulated_time"], 32);
    }
}
