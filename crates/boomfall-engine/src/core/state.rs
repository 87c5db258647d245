use serde::{Deserialize, Serialize};

/// Phase of the board state machine.
///
/// | From                 | Condition                     | To                   |
/// |----------------------|-------------------------------|----------------------|
/// | `SPAWNING_PIECE`     | piece placed                  | `FALLING_PIECE`      |
/// | `SPAWNING_PIECE`     | spawn cells occupied          | `GAME_OVER`          |
/// | `FALLING_PIECE`      | piece blocked below           | `MERGE_RECONCILE`    |
/// | `MERGE_RECONCILE`    | armed boom blocks             | `CASCADE_RESOLVE`    |
/// | `MERGE_RECONCILE`    | otherwise                     | `GROUP_SETTLING`     |
/// | `GROUP_SETTLING`     | rest reached after movement   | `MERGE_RECONCILE`    |
/// | `GROUP_SETTLING`     | nothing moved                 | `BREAKTHROUGH_CHECK` |
/// | `CASCADE_RESOLVE`    | all frames resolved           | `MERGE_RECONCILE`    |
/// | `BREAKTHROUGH_CHECK` | zone empty                    | `WALL_GENERATION`    |
/// | `BREAKTHROUGH_CHECK` | zone occupied                 | `SPAWNING_PIECE`     |
/// | `WALL_GENERATION`    | all rows generated            | `MERGE_RECONCILE`    |
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::IsVariant,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BoardState {
    #[display("SPAWNING_PIECE")]
    SpawningPiece,
    #[display("FALLING_PIECE")]
    FallingPiece,
    #[display("MERGE_RECONCILE")]
    MergeReconcile,
    #[display("GROUP_SETTLING")]
    GroupSettling,
    #[display("CASCADE_RESOLVE")]
    CascadeResolve,
    #[display("BREAKTHROUGH_CHECK")]
    BreakthroughCheck,
    #[display("WALL_GENERATION")]
    WallGeneration,
    #[display("GAME_OVER")]
    GameOver,
}

impl BoardState {
    /// Phases that complete within the tick that enters them.
    #[must_use]
    pub const fn is_instant(self) -> bool {
        matches!(self, Self::MergeReconcile | Self::BreakthroughCheck)
    }
}
